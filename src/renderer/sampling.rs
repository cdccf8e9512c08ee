use nalgebra::{Unit, Vector3};
use rand::RngCore;

use crate::util::random_in_unit_sphere;

/// 확산 반사 이후 다음 빔 방향을 고르는 방법.
/// 적분기의 흐름을 건드리지 않고 다른 중요도 샘플링으로 바꿔 끼울 수 있게 따로 뺌.
pub trait BounceSampler: Sync {
    fn bounce_direction(&self, normal: &Unit<Vector3<f32>>, rng: &mut dyn RngCore) -> Vector3<f32>;
}

/// normalize(normal + 단위 구 내부의 무작위 점)
#[derive(Clone, Copy, Debug, Default)]
pub struct UnitSphereSampler;

impl BounceSampler for UnitSphereSampler {
    fn bounce_direction(&self, normal: &Unit<Vector3<f32>>, rng: &mut dyn RngCore) -> Vector3<f32> {
        let direction = normal.as_ref() + random_in_unit_sphere(rng);

        // 무작위 점이 -normal 근처면 길이가 0에 가까워짐
        direction
            .try_normalize(1.0e-6)
            .unwrap_or_else(|| normal.into_inner())
    }
}
