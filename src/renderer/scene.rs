use nalgebra::{Point3, Vector3};

use crate::error::SceneError;

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub albedo: Vector3<f32>,
    // Not read by the shading model yet, but editable alongside albedo.
    pub roughness: f32,
    pub metallic: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo: Vector3::new(1.0, 1.0, 1.0),
            roughness: 1.0,
            metallic: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sphere {
    pub position: Point3<f32>,
    pub radius: f32,
    /// Index into [`Scene::materials`].
    pub material_index: usize,
}

impl Default for Sphere {
    fn default() -> Self {
        Self {
            position: Point3::origin(),
            radius: 0.5,
            material_index: 0,
        }
    }
}

/// Spheres refer to materials by index so either list can be edited on its own.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub spheres: Vec<Sphere>,
    pub materials: Vec<Material>,
}

impl Scene {
    /// A pink sphere resting above a large blue ground sphere.
    pub fn default_showcase() -> Self {
        let materials = vec![
            Material {
                albedo: Vector3::new(1.0, 0.0, 1.0),
                roughness: 0.0,
                ..Default::default()
            },
            Material {
                albedo: Vector3::new(0.2, 0.3, 1.0),
                roughness: 0.1,
                ..Default::default()
            },
        ];

        let spheres = vec![
            Sphere {
                position: Point3::new(0.0, 0.0, -3.0),
                radius: 1.0,
                material_index: 0,
            },
            Sphere {
                position: Point3::new(1.0, -101.0, -5.0),
                radius: 100.0,
                material_index: 1,
            },
        ];

        Self { spheres, materials }
    }

    /// Pushes a material and returns the index spheres should use for it.
    pub fn add_material(&mut self, material: Material) -> usize {
        self.materials.push(material);
        self.materials.len() - 1
    }

    pub fn add_sphere(&mut self, sphere: Sphere) -> usize {
        self.spheres.push(sphere);
        self.spheres.len() - 1
    }

    pub fn material_of(&self, sphere: &Sphere) -> Option<&Material> {
        self.materials.get(sphere.material_index)
    }

    /// Every sphere must point at an existing material before the scene is traced.
    pub fn validate(&self) -> Result<(), SceneError> {
        let materials = self.materials.len();
        match self
            .spheres
            .iter()
            .position(|sphere| sphere.material_index >= materials)
        {
            Some(sphere) => Err(SceneError::MaterialIndexOutOfRange {
                sphere,
                index: self.spheres[sphere].material_index,
                materials,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn showcase_is_valid() {
        let scene = Scene::default_showcase();
        assert_eq!(scene.spheres.len(), 2);
        assert_eq!(scene.materials.len(), 2);
        assert!(scene.validate().is_ok());
    }

    #[test]
    fn empty_scene_is_valid() {
        assert!(Scene::default().validate().is_ok());
    }

    #[test]
    fn dangling_material_index_is_reported() {
        let mut scene = Scene::default();
        scene.add_material(Material::default());
        scene.add_sphere(Sphere::default());
        scene.add_sphere(Sphere {
            material_index: 3,
            ..Default::default()
        });

        assert_eq!(
            scene.validate(),
            Err(SceneError::MaterialIndexOutOfRange {
                sphere: 1,
                index: 3,
                materials: 1,
            })
        );
    }

    #[test]
    fn materials_can_be_edited_independently() {
        let mut scene = Scene::default_showcase();
        scene.materials[0].albedo = Vector3::new(0.0, 1.0, 0.0);

        let material = scene.material_of(&scene.spheres[0]).unwrap();
        assert_eq!(material.albedo, Vector3::new(0.0, 1.0, 0.0));
    }
}
