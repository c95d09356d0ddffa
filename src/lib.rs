use log::info;
use nalgebra::Vector4;

use crate::app::{Session, SessionConfig};
use crate::display::HeadlessImage;
use crate::renderer::Scene;

pub mod app;
pub mod camera;
pub mod display;
pub mod error;
pub mod input;
pub mod renderer;

pub use error::{Error, Result};

/// Clamps a linear color to [0, 1] and packs it as RGBA8, red in the low byte.
/// No gamma correction.
pub fn vec4_to_rgba(color: &Vector4<f32>) -> u32 {
    let channel = |value: f32| (value.clamp(0.0, 1.0) * 255.0) as u32;

    (channel(color.w) << 24) | (channel(color.z) << 16) | (channel(color.y) << 8) | channel(color.x)
}

/// Renders the showcase scene offscreen and writes the accumulated frame out.
pub fn run() -> Result<()> {
    env_logger::init();

    let config = SessionConfig::default();
    let display = HeadlessImage::new(config.width, config.height, "Ember Output");
    let mut session = Session::new(&config, Scene::default_showcase(), display);

    for _ in 0..config.frames {
        session.render()?;
    }
    info!(
        "Accumulated {} frames, last render {:.3}ms",
        config.frames,
        session.last_render_time()
    );

    if let Some(output) = &config.output {
        session.display().save(output)?;
    }

    Ok(())
}
