use nalgebra::{Point3, Vector3, Vector4};
use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

use crate::camera::RaySource;
use crate::renderer::ray::Ray;
use crate::renderer::sampling::BounceSampler;
use crate::renderer::scene::Scene;
use crate::renderer::settings::{Settings, Shading};
use crate::renderer::trace::{trace_ray, HitPayload};
use crate::util::random_vec;

pub const SKY_COLOR: Vector3<f32> = Vector3::new(0.6, 0.7, 0.9);

// 교차점 바로 위에서 다시 출발하면 자기 자신과 부딪힘. 법선 방향으로 조금 띄움
const RAY_BIAS: f32 = 0.0001;

/// 렌더 한 번 동안만 장면, 카메라를 빌려오는 적분기. DirectX의 RayGen 쉐이더와 같은 역할
pub struct PathIntegrator<'a, C: ?Sized, S: ?Sized> {
    scene: &'a Scene,
    camera: &'a C,
    sampler: &'a S,
    settings: &'a Settings,
}

impl<'a, C, S> PathIntegrator<'a, C, S>
where
    C: RaySource + ?Sized,
    S: BounceSampler + ?Sized,
{
    pub fn new(scene: &'a Scene, camera: &'a C, sampler: &'a S, settings: &'a Settings) -> Self {
        Self {
            scene,
            camera,
            sampler,
            settings,
        }
    }

    /// index = x + y * width. 알파는 언제나 1
    pub fn per_pixel(&self, index: usize, rng: &mut dyn RngCore) -> Vector4<f32> {
        let ray = Ray::new(self.camera.position(), self.camera.ray_directions()[index]);

        let light = match self.settings.shading {
            Shading::PathTraced => self.path_traced(ray, rng),
            Shading::DirectLight => self.direct_light(ray, rng),
        };

        Vector4::new(light.x, light.y, light.z, 1.0)
    }

    fn path_traced(&self, mut ray: Ray, rng: &mut dyn RngCore) -> Vector3<f32> {
        let mut light = Vector3::zeros();
        let mut contribution = Vector3::new(1.0, 1.0, 1.0);

        for _ in 0..self.settings.bounces {
            let Some(hit) = trace_ray(&ray, self.scene) else {
                if self.settings.sky_light {
                    light += SKY_COLOR.component_mul(&contribution);
                }
                break;
            };

            let material = self.scene.material_of(&self.scene.spheres[hit.object_index]);

            contribution.component_mul_assign(&material.albedo);
            // 발광은 contribution을 곱하지 않고 그대로 더함. 물리적으로 정확하지는 않음
            light += material.emission();

            ray = self.next_diffuse_ray(&hit, rng);
        }

        light
    }

    fn next_diffuse_ray(&self, hit: &HitPayload, rng: &mut dyn RngCore) -> Ray {
        Ray::new(
            offset_origin(hit),
            self.sampler.bounce_direction(&hit.normal, rng),
        )
    }

    fn direct_light(&self, mut ray: Ray, rng: &mut dyn RngCore) -> Vector3<f32> {
        let light_direction = Vector3::new(-1.0, -1.0, -1.0).normalize();

        let mut light = Vector3::zeros();
        let mut multiplier = 1.0;

        for _ in 0..self.settings.bounces {
            let Some(hit) = trace_ray(&ray, self.scene) else {
                if self.settings.sky_light {
                    light += SKY_COLOR * multiplier;
                }
                break;
            };

            let material = self.scene.material_of(&self.scene.spheres[hit.object_index]);

            // cos(v1, v2) = v1 * v2 IF both normal
            let intensity = hit.normal.dot(&-light_direction).max(0.0);
            light += material.albedo * intensity * multiplier;
            multiplier *= 0.5;

            let direction = rough_reflection(&ray.direction, &hit, material.roughness, rng);
            ray = Ray::new(offset_origin(&hit), direction);
        }

        light
    }
}

fn offset_origin(hit: &HitPayload) -> Point3<f32> {
    hit.position + hit.normal.into_inner() * RAY_BIAS
}

/// 거칠기만큼 법선을 흔들고 정규화 없이 반사
fn rough_reflection(
    incident: &Vector3<f32>,
    hit: &HitPayload,
    roughness: f32,
    rng: &mut dyn RngCore,
) -> Vector3<f32> {
    let perturbed = hit.normal.into_inner() + roughness * random_vec(rng, -0.5f32..0.5);
    reflect(incident, &perturbed)
}

/// I - 2 * dot(N, I) * N. normal이 단위 벡터가 아니면 결과 길이도 바뀜
fn reflect(incident: &Vector3<f32>, normal: &Vector3<f32>) -> Vector3<f32> {
    incident - normal * (2.0 * normal.dot(incident))
}

/// 스레드 배치와 상관없이 같은 (seed, pass, index)면 같은 난수열
pub fn pixel_rng(seed: u64, pass: u64, index: usize) -> SmallRng {
    let mut state = seed ^ pass.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    state ^= (index as u64).wrapping_mul(0xBF58_476D_1CE4_E5B9);

    // splitmix64 마무리 단계
    state = (state ^ (state >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    state = (state ^ (state >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    state ^= state >> 31;

    SmallRng::seed_from_u64(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::sampling::UnitSphereSampler;
    use crate::renderer::scene::{Material, Sphere};

    /// 모든 픽셀이 같은 방향을 보는 카메라
    struct FixedCamera {
        origin: Point3<f32>,
        rays: Vec<Vector3<f32>>,
    }

    impl RaySource for FixedCamera {
        fn position(&self) -> Point3<f32> {
            self.origin
        }

        fn ray_directions(&self) -> &[Vector3<f32>] {
            &self.rays
        }
    }

    fn looking_down_z() -> FixedCamera {
        FixedCamera {
            origin: Point3::new(0.0, 0.0, 5.0),
            rays: vec![Vector3::new(0.0, 0.0, -1.0)],
        }
    }

    fn looking_away() -> FixedCamera {
        FixedCamera {
            origin: Point3::new(0.0, 0.0, 5.0),
            rays: vec![Vector3::new(0.0, 0.0, 1.0)],
        }
    }

    fn single_sphere(material: Material) -> Scene {
        Scene {
            spheres: vec![Sphere {
                position: Vector3::zeros(),
                radius: 1.0,
                material_index: 0,
            }],
            materials: vec![material],
        }
    }

    fn pink() -> Material {
        Material {
            albedo: Vector3::new(1.0, 0.0, 1.0),
            ..Default::default()
        }
    }

    fn sample(scene: &Scene, camera: &FixedCamera, settings: &Settings) -> Vector4<f32> {
        let integrator = PathIntegrator::new(scene, camera, &UnitSphereSampler, settings);
        integrator.per_pixel(0, &mut pixel_rng(settings.seed, 0, 0))
    }

    fn close(a: Vector4<f32>, b: Vector4<f32>) -> bool {
        (a - b).norm() < 1e-5
    }

    #[test]
    fn unlit_sphere_is_black() {
        let settings = Settings {
            bounces: 1,
            sky_light: false,
            ..Default::default()
        };

        let color = sample(&single_sphere(pink()), &looking_down_z(), &settings);
        assert!(close(color, Vector4::new(0.0, 0.0, 0.0, 1.0)));
    }

    #[test]
    fn missed_ray_sees_the_sky_only_when_enabled() {
        let scene = single_sphere(pink());
        let mut settings = Settings {
            bounces: 1,
            ..Default::default()
        };

        let color = sample(&scene, &looking_away(), &settings);
        assert!(close(color, Vector4::new(0.6, 0.7, 0.9, 1.0)));

        settings.sky_light = false;
        let color = sample(&scene, &looking_away(), &settings);
        assert!(close(color, Vector4::new(0.0, 0.0, 0.0, 1.0)));
    }

    #[test]
    fn emission_is_added_once_per_hit_unweighted() {
        let emissive = Material {
            albedo: Vector3::new(0.1, 0.1, 0.1),
            emission_color: Vector3::new(0.8, 0.5, 0.2),
            emission_power: 2.0,
            ..Default::default()
        };
        let settings = Settings {
            bounces: 1,
            sky_light: false,
            ..Default::default()
        };

        // albedo가 0.1이어도 첫 충돌의 발광은 그대로
        let color = sample(&single_sphere(emissive), &looking_down_z(), &settings);
        assert!(close(color, Vector4::new(1.6, 1.0, 0.4, 1.0)));
    }

    #[test]
    fn sky_after_a_bounce_is_tinted_by_albedo() {
        // 구 밖으로 튕겨나간 빔은 다시 구를 만날 수 없음 (볼록하니까)
        let settings = Settings {
            bounces: 2,
            ..Default::default()
        };

        let color = sample(&single_sphere(pink()), &looking_down_z(), &settings);
        assert!(close(color, Vector4::new(0.6, 0.0, 0.9, 1.0)));
    }

    #[test]
    fn exhausted_budget_adds_nothing() {
        let settings = Settings {
            bounces: 0,
            ..Default::default()
        };

        let color = sample(&single_sphere(pink()), &looking_away(), &settings);
        assert!(close(color, Vector4::new(0.0, 0.0, 0.0, 1.0)));
    }

    #[test]
    fn emission_is_collected_before_escaping() {
        let glow = Material {
            albedo: Vector3::new(0.5, 0.5, 0.5),
            emission_color: Vector3::new(1.0, 1.0, 1.0),
            emission_power: 0.25,
            ..Default::default()
        };
        let settings = Settings {
            bounces: 5,
            sky_light: false,
            ..Default::default()
        };

        // 한 번 맞고 밖으로 튕겨나가 끝남. 남은 바운스는 아무것도 더하지 않음
        let color = sample(&single_sphere(glow), &looking_down_z(), &settings);
        assert!(close(color, Vector4::new(0.25, 0.25, 0.25, 1.0)));
    }

    #[test]
    fn direct_light_shades_by_light_angle() {
        let settings = Settings {
            bounces: 1,
            sky_light: false,
            shading: Shading::DirectLight,
            ..Default::default()
        };

        // 법선 (0,0,1), 빛 방향 -(1,1,1)/sqrt(3) -> 세기 1/sqrt(3)
        let color = sample(&single_sphere(pink()), &looking_down_z(), &settings);
        let intensity = 1.0 / 3.0f32.sqrt();
        assert!(close(color, Vector4::new(intensity, 0.0, intensity, 1.0)));
    }

    #[test]
    fn direct_light_mirror_bounce_reaches_the_sky() {
        let mut material = pink();
        material.roughness = 0.0;
        let settings = Settings {
            bounces: 2,
            sky_light: true,
            shading: Shading::DirectLight,
            ..Default::default()
        };

        // 정면으로 맞고 그대로 튕겨 나가서 하늘색 * 0.5
        let color = sample(&single_sphere(material), &looking_down_z(), &settings);
        let intensity = 1.0 / 3.0f32.sqrt();
        let expected = Vector4::new(intensity + 0.3, 0.35, intensity + 0.45, 1.0);
        assert!(close(color, expected));
    }

    #[test]
    fn direct_light_sky_follows_the_toggle() {
        let mut settings = Settings {
            sky_light: false,
            shading: Shading::DirectLight,
            ..Default::default()
        };

        let scene = single_sphere(pink());
        let color = sample(&scene, &looking_away(), &settings);
        assert!(close(color, Vector4::new(0.0, 0.0, 0.0, 1.0)));

        settings.sky_light = true;
        let color = sample(&scene, &looking_away(), &settings);
        assert!(close(color, Vector4::new(0.6, 0.7, 0.9, 1.0)));
    }

    #[test]
    fn reflection_uses_the_unnormalized_normal() {
        let incident = Vector3::new(0.0, 0.0, -1.0);
        let normal = Vector3::new(0.0, 0.0, 1.0) + Vector3::new(0.4, -0.3, 0.2);

        // dot = -1.2 -> I + 2.4 * N
        let reflected = reflect(&incident, &normal);
        assert!((reflected - Vector3::new(0.96, -0.72, 1.88)).norm() < 1e-5);

        let heading = reflected.normalize();
        assert!((heading - Vector3::new(0.430, -0.323, 0.843)).norm() < 1e-3);
        // 정규화한 축으로 반사하면 (0.568, -0.426, 0.704)
        assert!((heading - Vector3::new(0.568, -0.426, 0.704)).norm() > 0.1);

        let mirrored = reflect(&incident, &Vector3::new(0.0, 0.0, 1.0));
        assert!((mirrored - Vector3::new(0.0, 0.0, 1.0)).norm() < 1e-6);
    }

    #[test]
    fn rough_reflection_perturbs_the_normal_by_roughness() {
        let scene = single_sphere(pink());
        let camera = looking_down_z();
        let incident = camera.rays[0];
        let hit = trace_ray(&Ray::new(camera.origin, incident), &scene).unwrap();

        // 같은 난수열을 다시 뽑아서 기대 방향을 만듦
        let jitter = random_vec(&mut pixel_rng(7, 0, 0), -0.5f32..0.5);
        let perturbed = Vector3::new(0.0, 0.0, 1.0) + 0.8 * jitter;
        let expected = incident - perturbed * (2.0 * perturbed.dot(&incident));

        let direction = rough_reflection(&incident, &hit, 0.8, &mut pixel_rng(7, 0, 0));
        assert!((direction - expected).norm() < 1e-5);

        // 거칠기 0이면 난수와 상관없이 거울 반사
        let mirror = rough_reflection(&incident, &hit, 0.0, &mut pixel_rng(7, 0, 0));
        assert!((mirror - Vector3::new(0.0, 0.0, 1.0)).norm() < 1e-6);
    }

    #[test]
    fn pixel_rng_is_deterministic_and_distinct() {
        let mut a = pixel_rng(1, 2, 3);
        let mut b = pixel_rng(1, 2, 3);
        let mut c = pixel_rng(1, 2, 4);
        let mut d = pixel_rng(1, 3, 3);

        let first = a.next_u64();
        assert_eq!(first, b.next_u64());
        assert_ne!(first, c.next_u64());
        assert_ne!(first, d.next_u64());
    }
}
