use std::path::PathBuf;
use std::time::Instant;

use log::{info, trace};

use crate::camera::Camera;
use crate::display::DisplaySink;
use crate::error::Result;
use crate::input::InputState;
use crate::renderer::{Renderer, Scene};

pub struct SessionConfig {
    pub width: u32,
    pub height: u32,
    /// Frames accumulated by [`crate::run`] before the snapshot is written.
    pub frames: u32,
    /// Degrees.
    pub vertical_fov: f32,
    pub near: f32,
    pub far: f32,
    pub output: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            frames: 16,
            vertical_fov: 45.0,
            near: 0.1,
            far: 100.0,
            output: Some(PathBuf::from("ember.png")),
        }
    }
}

/// One viewer: a scene, the camera looking at it and the renderer feeding a display.
pub struct Session<D: DisplaySink> {
    pub scene: Scene,
    pub camera: Camera,
    pub renderer: Renderer,
    display: D,
    last_render_time: f32,
}

impl<D: DisplaySink> Session<D> {
    pub fn new(config: &SessionConfig, scene: Scene, display: D) -> Self {
        info!(
            "Starting session with {} spheres and {} materials",
            scene.spheres.len(),
            scene.materials.len()
        );

        Self {
            scene,
            camera: Camera::new(config.vertical_fov, config.near, config.far),
            renderer: Renderer::new(),
            display,
            last_render_time: 0.0,
        }
    }

    /// Moves the camera. Accumulation restarts whenever it actually moved.
    pub fn update<I: InputState + ?Sized>(&mut self, input: &mut I, time_step: f32) -> bool {
        let moved = self.camera.on_update(input, time_step);
        if moved {
            self.renderer.reset_frame_index();
        }
        moved
    }

    /// Call after editing the scene so old samples are not blended in.
    pub fn reset(&mut self) {
        self.renderer.reset_frame_index();
    }

    pub fn render(&mut self) -> Result<()> {
        let timer = Instant::now();

        let size = self.display.size();
        self.renderer.on_resize(size.width, size.height);
        self.camera.on_resize(size.width, size.height);
        self.renderer.render(&self.scene, &self.camera)?;
        self.display.set_data(self.renderer.final_image_bytes())?;

        self.last_render_time = timer.elapsed().as_secs_f32() * 1000.0;
        trace!("Last render: {:.3}ms", self.last_render_time);

        Ok(())
    }

    /// Milliseconds spent in the last [`Session::render`].
    pub fn last_render_time(&self) -> f32 {
        self.last_render_time
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn display_mut(&mut self) -> &mut D {
        &mut self.display
    }
}
