use nalgebra::Vector3;
use thiserror::Error;

/// 렌더러가 읽기만 하는 장면. 에디터가 프레임 사이에 자유롭게 고칠 수 있음.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub spheres: Vec<Sphere>,
    pub materials: Vec<Material>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Sphere {
    pub position: Vector3<f32>,
    pub radius: f32,
    pub material_index: usize,
}

impl Default for Sphere {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            radius: 0.5,
            material_index: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    pub albedo: Vector3<f32>,
    pub roughness: f32,
    pub metallic: f32,
    pub emission_color: Vector3<f32>,
    pub emission_power: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            albedo: Vector3::new(1.0, 1.0, 1.0),
            roughness: 1.0,
            metallic: 0.0,
            emission_color: Vector3::zeros(),
            emission_power: 0.0,
        }
    }
}

impl Material {
    pub fn emission(&self) -> Vector3<f32> {
        self.emission_color * self.emission_power
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SceneError {
    #[error("sphere {sphere} uses material {index}, but the scene only has {count} materials")]
    MaterialOutOfRange {
        sphere: usize,
        index: usize,
        count: usize,
    },

    #[error("sphere {sphere} has an invalid radius ({radius})")]
    InvalidRadius { sphere: usize, radius: f32 },
}

impl Scene {
    /// 분홍 구, 바닥 역할을 하는 큰 파란 구, 빛나는 주황 구
    pub fn demo() -> Self {
        let pink = Material {
            albedo: Vector3::new(1.0, 0.0, 1.0),
            roughness: 0.0,
            ..Default::default()
        };
        let blue = Material {
            albedo: Vector3::new(0.2, 0.3, 1.0),
            roughness: 0.1,
            ..Default::default()
        };
        let orange = Material {
            albedo: Vector3::new(0.8, 0.5, 0.2),
            roughness: 0.1,
            emission_color: Vector3::new(0.8, 0.5, 0.2),
            emission_power: 2.0,
            ..Default::default()
        };

        Self {
            spheres: vec![
                Sphere {
                    position: Vector3::zeros(),
                    radius: 1.0,
                    material_index: 0,
                },
                Sphere {
                    position: Vector3::new(0.0, -101.0, 0.0),
                    radius: 100.0,
                    material_index: 1,
                },
                Sphere {
                    position: Vector3::new(2.0, 0.0, 0.0),
                    radius: 1.0,
                    material_index: 2,
                },
            ],
            materials: vec![pink, blue, orange],
        }
    }

    /// 렌더러는 재질 인덱스를 검사하지 않음 (범위 밖이면 그냥 패닉).
    /// 에디터 쪽에서 미리 확인하고 싶을 때 사용.
    pub fn validate(&self) -> Result<(), SceneError> {
        for (index, sphere) in self.spheres.iter().enumerate() {
            if !sphere.radius.is_finite() || sphere.radius <= 0.0 {
                return Err(SceneError::InvalidRadius {
                    sphere: index,
                    radius: sphere.radius,
                });
            }

            if sphere.material_index >= self.materials.len() {
                return Err(SceneError::MaterialOutOfRange {
                    sphere: index,
                    index: sphere.material_index,
                    count: self.materials.len(),
                });
            }
        }

        Ok(())
    }

    pub fn material_of(&self, sphere: &Sphere) -> &Material {
        &self.materials[sphere.material_index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emission_is_color_times_power() {
        let material = Material {
            emission_color: Vector3::new(0.8, 0.5, 0.2),
            emission_power: 2.0,
            ..Default::default()
        };

        let emission = material.emission();
        assert!((emission - Vector3::new(1.6, 1.0, 0.4)).norm() < 1e-6);
    }

    #[test]
    fn demo_scene_is_valid() {
        let scene = Scene::demo();
        assert_eq!(scene.spheres.len(), 3);
        assert_eq!(scene.materials.len(), 3);
        assert_eq!(scene.validate(), Ok(()));
        assert_eq!(scene.material_of(&scene.spheres[2]).emission_power, 2.0);
    }

    #[test]
    fn validate_reports_bad_material_index() {
        let mut scene = Scene::demo();
        scene.spheres[1].material_index = 7;

        assert_eq!(
            scene.validate(),
            Err(SceneError::MaterialOutOfRange {
                sphere: 1,
                index: 7,
                count: 3
            })
        );
    }

    #[test]
    fn validate_reports_bad_radius() {
        let mut scene = Scene::demo();
        scene.spheres[0].radius = 0.0;

        assert!(matches!(
            scene.validate(),
            Err(SceneError::InvalidRadius { sphere: 0, .. })
        ));
    }
}
