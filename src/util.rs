use nalgebra::{Vector3, Vector4};
use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::Rng;
use std::ops::RangeBounds;

pub fn random_vec<T, G, R>(rng: &mut G, range: R) -> Vector3<T>
where
    T: SampleUniform + nalgebra::Scalar,
    G: Rng + ?Sized,
    R: RangeBounds<T> + SampleRange<T> + Clone,
{
    Vector3::new(
        rng.gen_range(range.clone()),
        rng.gen_range(range.clone()),
        rng.gen_range(range),
    )
}

/// 단위 구 내부의 균일한 점. 기각 샘플링 (평균 두 번 안쪽으로 끝남)
pub fn random_in_unit_sphere<G: Rng + ?Sized>(rng: &mut G) -> Vector3<f32> {
    loop {
        let candidate = random_vec(rng, -1.0f32..1.0);
        if candidate.magnitude_squared() < 1.0 {
            return candidate;
        }
    }
}

/// R이 가장 낮은 바이트, A가 가장 높은 바이트. 반올림 없이 잘라냄.
pub fn vec4_to_rgba(color: &Vector4<f32>) -> u32 {
    let r = (color.x * 255.0) as u8;
    let g = (color.y * 255.0) as u8;
    let b = (color.z * 255.0) as u8;
    let a = (color.w * 255.0) as u8;

    u32::from_le_bytes([r, g, b, a])
}
