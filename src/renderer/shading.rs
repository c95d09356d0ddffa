use nalgebra::{Unit, Vector3};

/// Turns a surface normal and material albedo into a linear RGB color.
///
/// The trace loop only calls this on hits; misses use the background color.
pub trait Shading: Send + Sync {
    fn shade(&self, normal: &Unit<Vector3<f32>>, albedo: &Vector3<f32>) -> Vector3<f32>;
}

impl<F> Shading for F
where
    F: Fn(&Unit<Vector3<f32>>, &Vector3<f32>) -> Vector3<f32> + Send + Sync,
{
    fn shade(&self, normal: &Unit<Vector3<f32>>, albedo: &Vector3<f32>) -> Vector3<f32> {
        self(normal, albedo)
    }
}

/// A single directional light with a Lambertian cosine term.
/// No ambient term, shadows or falloff.
#[derive(Debug, Clone, Copy)]
pub struct DirectionalLight {
    pub direction: Unit<Vector3<f32>>,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            direction: Unit::new_normalize(Vector3::new(-1.0, -1.0, -1.0)),
        }
    }
}

impl DirectionalLight {
    pub fn intensity(&self, normal: &Unit<Vector3<f32>>) -> f32 {
        normal.dot(&-self.direction.into_inner()).max(0.0) // == cos(angle)
    }
}

impl Shading for DirectionalLight {
    fn shade(&self, normal: &Unit<Vector3<f32>>, albedo: &Vector3<f32>) -> Vector3<f32> {
        albedo * self.intensity(normal)
    }
}
