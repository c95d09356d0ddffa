use bytemuck::cast_slice;
use log::{debug, trace, warn};
use nalgebra::{Point3, Unit, Vector3, Vector4};
use rayon::prelude::*;
use winit::dpi::PhysicalSize;

use crate::camera::Camera;
use crate::error::{Error, Result};
use crate::vec4_to_rgba;

pub use ray::Ray;
pub use scene::{Material, Scene, Sphere};
pub use shading::{DirectionalLight, Shading};

mod ray;
pub mod scene;
pub mod shading;

pub struct Settings {
    pub accumulate: bool,
    /// Dispatch pixel rows over the rayon pool. Output is identical either way.
    pub multithreaded: bool,
    /// Linear color for rays that hit nothing.
    pub background: Vector4<f32>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            accumulate: true,
            multithreaded: true,
            background: Vector4::new(0.0, 0.0, 0.0, 1.0),
        }
    }
}

/// What a single ray found. Only describes the path, coloring happens later.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitPayload {
    /// Negative on a miss.
    pub hit_distance: f32,
    pub world_position: Point3<f32>,
    pub world_normal: Unit<Vector3<f32>>,
    /// Index into [`Scene::spheres`], `None` on a miss.
    pub object_index: Option<usize>,
}

impl HitPayload {
    pub fn miss() -> Self {
        Self {
            hit_distance: -1.0,
            world_position: Point3::origin(),
            world_normal: Vector3::y_axis(),
            object_index: None,
        }
    }

    pub fn is_hit(&self) -> bool {
        self.object_index.is_some()
    }
}

/// Progressive CPU renderer.
///
/// Owns the linear accumulation buffer and the presentable 8-bit image, both
/// `width * height` long and reallocated on every size change.
pub struct Renderer {
    final_image_data: Vec<u32>,
    accumulation: Vec<Vector4<f32>>,
    size: PhysicalSize<u32>,
    frame_index: u32,
    pub settings: Settings,
    shading: Box<dyn Shading>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            final_image_data: vec![],
            accumulation: vec![],
            size: PhysicalSize::new(0, 0),
            frame_index: 1,
            settings: Default::default(),
            shading: Box::new(DirectionalLight::default()),
        }
    }

    pub fn with_shading<S: Shading + 'static>(mut self, shading: S) -> Self {
        self.shading = Box::new(shading);
        self
    }

    pub fn set_shading<S: Shading + 'static>(&mut self, shading: S) {
        self.shading = Box::new(shading);
        self.reset_frame_index();
    }

    pub fn on_resize(&mut self, width: u32, height: u32) {
        let new_size = PhysicalSize::new(width, height);
        if self.size == new_size {
            return;
        }

        if width == 0 || height == 0 {
            warn!("Render viewport is empty ({width}x{height}), nothing will be traced");
        }

        let pixel_count = width as usize * height as usize;
        self.size = new_size;
        self.final_image_data = vec![0; pixel_count];
        self.accumulation = vec![Vector4::zeros(); pixel_count];
        self.frame_index = 1;

        debug!("Reallocated render buffers for {width}x{height}");
    }

    pub fn reset_frame_index(&mut self) {
        self.frame_index = 1;
    }

    pub fn settings(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Packed RGBA, red in the low byte.
    pub fn final_image_data(&self) -> &[u32] {
        &self.final_image_data
    }

    pub fn final_image_bytes(&self) -> &[u8] {
        cast_slice(&self.final_image_data)
    }

    pub fn accumulation_data(&self) -> &[Vector4<f32>] {
        &self.accumulation
    }

    /// Traces every pixel once and refreshes the presentable image.
    ///
    /// The scene is checked up front; a dangling material index rejects the
    /// whole frame and leaves both buffers and the frame index untouched.
    pub fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<()> {
        scene.validate()?;

        let camera_size = camera.viewport_size();
        if camera_size != self.size {
            return Err(Error::ViewportMismatch {
                renderer: (self.size.width, self.size.height),
                camera: (camera_size.width, camera_size.height),
            });
        }

        let width = self.size.width as usize;
        if width == 0 || self.size.height == 0 {
            return Ok(());
        }

        if self.settings.accumulate && self.frame_index == 1 {
            self.accumulation.fill(Vector4::zeros());
        }

        let tracer = Tracer {
            scene,
            camera,
            shading: self.shading.as_ref(),
            background: self.settings.background,
        };
        let pass = Pass {
            accumulate: self.settings.accumulate,
            frame_index: self.frame_index as f32,
        };

        if self.settings.multithreaded {
            self.final_image_data
                .par_chunks_mut(width)
                .zip(self.accumulation.par_chunks_mut(width))
                .enumerate()
                .for_each(|(y, (image_row, accumulation_row))| {
                    pass.row(&tracer, y as u32, image_row, accumulation_row)
                });
        } else {
            let rows = self.final_image_data.chunks_mut(width);
            for (y, (image_row, accumulation_row)) in
                rows.zip(self.accumulation.chunks_mut(width)).enumerate()
            {
                pass.row(&tracer, y as u32, image_row, accumulation_row);
            }
        }

        if self.settings.accumulate {
            self.frame_index += 1;
        } else {
            self.frame_index = 1;
        }

        trace!("Rendered {}x{} frame", self.size.width, self.size.height);
        Ok(())
    }

    /// Linear color seen through pixel `(x, y)` of the camera's viewport.
    ///
    /// Panics if `(x, y)` lies outside the camera's ray cache, or if a hit sphere's material index is out of range; `render`
    /// validates the scene before calling into this.
    pub fn per_pixel(&self, scene: &Scene, camera: &Camera, x: u32, y: u32) -> Vector4<f32> {
        Tracer {
            scene,
            camera,
            shading: self.shading.as_ref(),
            background: self.settings.background,
        }
        .per_pixel(x, y)
    }

    pub fn trace_ray(ray: &Ray, scene: &Scene) -> HitPayload {
        let mut closest: Option<usize> = None;
        let mut hit_distance = f32::INFINITY;

        for (index, sphere) in scene.spheres.iter().enumerate() {
            // o = ray origin
            // d = ray direction
            // r = sphere radius
            // t = distance along the ray where it meets the sphere, if it does
            // (dx^2 + dy^2 + dz^2) t^2 + 2 (ox dx + oy dy + oz dz) t + (ox^2 + oy^2 + oz^2 - r^2) = 0
            // This assumes a sphere centered at the origin, so the ray is shifted by
            // the sphere's position instead of moving the sphere.
            let origin = ray.origin - sphere.position;

            let a = ray.direction.dot(&ray.direction);
            let b = 2.0 * origin.dot(&ray.direction);
            let c = origin.dot(&origin) - sphere.radius * sphere.radius;

            // b^2 - 4ac: negative means no real root, the ray passes the sphere by.
            let discriminant = b * b - 4.0 * a * c;
            if discriminant < 0.0 {
                continue;
            }

            // (-b +- sqrt(discriminant)) / 2a. Only the near root counts; the far one
            // is where the ray would leave the sphere again.
            // let far_t = (-b + discriminant.sqrt()) / (2.0 * a);
            let closest_t = (-b - discriminant.sqrt()) / (2.0 * a);
            if closest_t > 0.0 && closest_t < hit_distance {
                hit_distance = closest_t;
                closest = Some(index);
            }
        }

        match closest {
            Some(index) => Self::closest_hit(ray, hit_distance, index, scene),
            None => HitPayload::miss(),
        }
    }

    fn closest_hit(ray: &Ray, hit_distance: f32, object_index: usize, scene: &Scene) -> HitPayload {
        let sphere = &scene.spheres[object_index];

        // Same shift as in trace_ray: in sphere space the hit point is also the
        // outward normal, scaled by the radius.
        let local_ray = Ray::new(Point3::origin() + (ray.origin - sphere.position), ray.direction);
        let local_position = local_ray.at(hit_distance);

        HitPayload {
            hit_distance,
            world_position: local_position + sphere.position.coords,
            world_normal: Unit::new_normalize(local_position.coords),
            object_index: Some(object_index),
        }
    }
}

// Everything a pixel needs, passed down explicitly for the length of one pass.
struct Tracer<'a> {
    scene: &'a Scene,
    camera: &'a Camera,
    shading: &'a dyn Shading,
    background: Vector4<f32>,
}

impl Tracer<'_> {
    fn per_pixel(&self, x: u32, y: u32) -> Vector4<f32> {
        // The ray cache is laid out by the camera's viewport, not the image buffer.
        let width = self.camera.viewport_size().width as usize;
        let index = x as usize + y as usize * width;
        let ray = Ray::new(self.camera.position(), self.camera.ray_directions()[index]);

        let payload = Renderer::trace_ray(&ray, self.scene);
        let Some(object_index) = payload.object_index else {
            return self.background;
        };

        let sphere = &self.scene.spheres[object_index];
        let material = &self.scene.materials[sphere.material_index];
        let color = self.shading.shade(&payload.world_normal, &material.albedo);

        Vector4::new(color.x, color.y, color.z, 1.0)
    }
}

#[derive(Clone, Copy)]
struct Pass {
    accumulate: bool,
    frame_index: f32,
}

impl Pass {
    fn row(&self, tracer: &Tracer, y: u32, image_row: &mut [u32], accumulation_row: &mut [Vector4<f32>]) {
        for (x, (pixel, accumulated)) in image_row.iter_mut().zip(accumulation_row).enumerate() {
            let color = tracer.per_pixel(x as u32, y);

            let presented = if self.accumulate {
                *accumulated += color;
                *accumulated / self.frame_index
            } else {
                color
            };

            *pixel = vec4_to_rgba(&presented);
        }
    }
}
