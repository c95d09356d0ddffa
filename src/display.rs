use std::path::Path;

use image::{ImageFormat, RgbaImage};
use log::info;
use winit::dpi::PhysicalSize;

use crate::error::{Error, Result};

/// Where finished frames go.
///
/// The sink also owns the viewport size; the frame loop reads it each frame
/// and resizes the camera and renderer to match.
pub trait DisplaySink {
    fn size(&self) -> PhysicalSize<u32>;

    /// `rgba` holds exactly `width * height` 8-bit RGBA pixels.
    fn set_data(&mut self, rgba: &[u8]) -> Result<()>;
}

/// An offscreen sink backed by an `image` buffer, for snapshots and tests.
pub struct HeadlessImage {
    image: RgbaImage,
    pub name: String,
}

impl HeadlessImage {
    pub fn new(width: u32, height: u32, label: &str) -> Self {
        Self {
            image: RgbaImage::new(width, height),
            name: label.to_string(),
        }
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if self.size() == new_size {
            return;
        }

        self.image = RgbaImage::new(new_size.width, new_size.height);
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.image.save_with_format(&path, ImageFormat::Png)?;
        info!("Saved {} to {}", self.name, path.as_ref().display());
        Ok(())
    }
}

impl DisplaySink for HeadlessImage {
    fn size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.image.width(), self.image.height())
    }

    fn set_data(&mut self, rgba: &[u8]) -> Result<()> {
        let expected = (self.image.width() * self.image.height()) as usize;
        if rgba.len() != expected * 4 {
            return Err(Error::SizeMismatch {
                expected,
                actual: rgba.len() / 4,
            });
        }

        self.image.copy_from_slice(rgba);
        Ok(())
    }
}
