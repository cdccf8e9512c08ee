use nalgebra::{Point3, Unit, Vector3};

use crate::renderer::ray::Ray;
use crate::renderer::scene::Scene;

// HitPayload는 빛의 경로에 대한 정보만 담고, 이를 이용해 색상을 알아내는건 적분기가 나중에 함
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitPayload {
    pub distance: f32,
    pub object_index: usize,
    pub position: Point3<f32>,
    pub normal: Unit<Vector3<f32>>,
}

impl HitPayload {
    pub const MISS_DISTANCE: f32 = -1.0;

    /// 빗나간 경우 음수 거리(-1)를 돌려주는 sentinel 형태
    pub fn distance_or_miss(hit: Option<&HitPayload>) -> f32 {
        hit.map_or(Self::MISS_DISTANCE, |hit| hit.distance)
    }
}

/// 모든 구를 선형으로 훑어서 가장 가까운 교차점을 찾음. 가속 구조 없음.
pub fn trace_ray(ray: &Ray, scene: &Scene) -> Option<HitPayload> {
    // a = 빔 방향의 길이 제곱. 0이면 이차방정식이 성립하지 않으니 빗나간 것으로 취급
    let a = ray.direction.magnitude_squared();
    if !(a > 0.0) || !a.is_finite() {
        return None;
    }

    let mut closest: Option<(usize, f32)> = None;
    for (index, sphere) in scene.spheres.iter().enumerate() {
        // 구가 원점에 있다고 가정하고 푼 식. 구를 옮기는 대신 빔 시작점을 그만큼 옮김.
        // a * t^2 + b * t + c = 0
        let origin = ray.origin.coords - sphere.position;

        let b = 2.0 * origin.dot(&ray.direction);
        let c = origin.magnitude_squared() - sphere.radius * sphere.radius;

        // 판별식
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            continue;
        }

        let distance = (-b - discriminant.sqrt()) / (2.0 * a);
        if distance <= 0.0 {
            continue;
        }

        // 같은 거리면 먼저 나온 구가 이김
        match closest {
            Some((_, best)) if best <= distance => {}
            _ => closest = Some((index, distance)),
        }
    }

    closest.map(|(index, distance)| closest_hit(ray, scene, distance, index))
}

pub fn closest_hit(ray: &Ray, scene: &Scene, distance: f32, object_index: usize) -> HitPayload {
    let sphere = &scene.spheres[object_index];

    let position = ray.at(distance);
    let normal = Unit::new_normalize(position.coords - sphere.position);

    HitPayload {
        distance,
        object_index,
        position,
        normal,
    }
}
