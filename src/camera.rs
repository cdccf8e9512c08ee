use nalgebra::{Isometry3, Perspective3, Point3, Unit, UnitQuaternion, Vector2, Vector3, Vector4};
use rayon::prelude::*;

/// 렌더러가 카메라에게 필요로 하는 것: 빔 시작점과 픽셀마다 미리 계산된 빔 방향 (행 우선).
pub trait RaySource {
    fn position(&self) -> Point3<f32>;
    fn ray_directions(&self) -> &[Vector3<f32>];
}

/// 이동 입력. WASD SPACE SHIFT
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Movement {
    pub forward: bool,
    pub left: bool,
    pub backward: bool,
    pub right: bool,
    pub up: bool,
    pub down: bool,
}

pub struct Camera {
    projection: Perspective3<f32>,
    view: Isometry3<f32>,

    vertical_fov: f32,
    near: f32,
    far: f32,

    position: Point3<f32>,
    forward: Unit<Vector3<f32>>,

    rays: Vec<Vector3<f32>>,
    viewport: (u32, u32),
}

impl Camera {
    /// vertical_fov는 도(degree) 단위
    pub fn new(vertical_fov: f32, near: f32, far: f32) -> Self {
        let vertical_fov = vertical_fov.to_radians();
        let position = Point3::new(0.0, 0.0, 6.0);
        let forward = Unit::new_unchecked(Vector3::new(0.0, 0.0, -1.0));

        let mut camera = Self {
            projection: Perspective3::new(1.0, vertical_fov, near, far),
            view: Isometry3::identity(),
            vertical_fov,
            near,
            far,
            position,
            forward,
            rays: vec![],
            viewport: (0, 0),
        };
        camera.reevaluate_view();

        camera
    }

    pub fn with_pose(mut self, position: Point3<f32>, forward: Vector3<f32>) -> Self {
        self.position = position;
        self.forward = Unit::new_normalize(forward);
        self.reevaluate_view();
        self.reevaluate_rays();
        self
    }

    pub fn forward(&self) -> Unit<Vector3<f32>> {
        self.forward
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    pub fn rotation_speed(&self) -> f32 {
        0.3
    }

    pub fn movement_speed(&self) -> f32 {
        5.0
    }

    /// 크기가 같거나 0이면 아무것도 안함
    pub fn resize(&mut self, width: u32, height: u32) {
        if self.viewport == (width, height) || width == 0 || height == 0 {
            return;
        }

        self.viewport = (width, height);
        self.reevaluate_projection();
        self.reevaluate_rays();
    }

    /// delta는 픽셀 단위 마우스 이동량. 움직였으면 true
    pub fn rotate(&mut self, delta: Vector2<f32>) -> bool {
        let delta = delta * 0.002;
        if delta.x == 0.0 && delta.y == 0.0 {
            return false;
        }

        let up = Vector3::y_axis();
        let Some(right) = Unit::try_new(self.forward.cross(up.as_ref()), 1.0e-6) else {
            return false;
        };

        let pitch_delta = delta.y * self.rotation_speed();
        let yaw_delta = delta.x * self.rotation_speed();

        let q = UnitQuaternion::from_axis_angle(&right, -pitch_delta)
            * UnitQuaternion::from_axis_angle(&up, -yaw_delta);

        self.forward = q * self.forward;
        self.forward.renormalize_fast();

        self.reevaluate_view();
        self.reevaluate_rays();

        true
    }

    /// time_step은 초 단위. 움직였으면 true
    pub fn update(&mut self, movement: &Movement, time_step: f32) -> bool {
        let up = Vector3::y();
        let right = self.forward.cross(&up);
        let step = self.movement_speed() * time_step;

        let mut offset = Vector3::zeros();
        if movement.forward {
            offset += self.forward.into_inner();
        }
        if movement.backward {
            offset -= self.forward.into_inner();
        }
        if movement.right {
            offset += right;
        }
        if movement.left {
            offset -= right;
        }
        if movement.up {
            offset += up;
        }
        if movement.down {
            offset -= up;
        }

        if offset == Vector3::zeros() || step == 0.0 {
            return false;
        }

        self.position += offset * step;
        self.reevaluate_view();
        self.reevaluate_rays();

        true
    }

    fn reevaluate_projection(&mut self) {
        let aspect = self.viewport.0 as f32 / self.viewport.1 as f32;
        self.projection = Perspective3::new(aspect, self.vertical_fov, self.near, self.far);
    }

    fn reevaluate_view(&mut self) {
        let target = self.position + self.forward.into_inner();
        self.view = Isometry3::look_at_rh(&self.position, &target, &Vector3::y());
    }

    fn reevaluate_rays(&mut self) {
        let (width, height) = self.viewport;
        if width == 0 || height == 0 {
            self.rays.clear();
            return;
        }

        let inverse_projection = self.projection.inverse();
        let view = self.view;

        self.rays = (0..(width as usize * height as usize))
            .into_par_iter()
            .map(|index| {
                let y = (index / width as usize) as f32;
                let x = (index % width as usize) as f32;

                let mut coord = Vector2::new(x / width as f32, y / height as f32);
                coord *= 2.0;
                coord -= Vector2::new(1.0, 1.0);

                // 먼 평면 위의 점 (카메라 좌표계)
                let target = inverse_projection * Vector4::new(coord.x, coord.y, 1.0, 1.0);
                let direction = (target.xyz() / target.w).normalize();

                view.inverse_transform_vector(&direction)
            })
            .collect();
    }
}

impl RaySource for Camera {
    fn position(&self) -> Point3<f32> {
        self.position
    }

    fn ray_directions(&self) -> &[Vector3<f32>] {
        &self.rays
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: &Vector3<f32>, b: &Vector3<f32>) -> bool {
        (a - b).norm() < 1e-4
    }

    #[test]
    fn rays_follow_viewport_size() {
        let mut camera = Camera::new(45.0, 0.1, 100.0);
        assert!(camera.ray_directions().is_empty());

        camera.resize(8, 4);
        assert_eq!(camera.ray_directions().len(), 32);
        assert!(camera
            .ray_directions()
            .iter()
            .all(|ray| (ray.norm() - 1.0).abs() < 1e-4));

        camera.resize(0, 4);
        assert_eq!(camera.viewport(), (8, 4));
        assert_eq!(camera.ray_directions().len(), 32);
    }

    #[test]
    fn center_pixel_looks_forward() {
        let mut camera = Camera::new(45.0, 0.1, 100.0);
        camera.resize(4, 4);

        let center = camera.ray_directions()[2 * 4 + 2];
        assert!(close(&center, &Vector3::new(0.0, 0.0, -1.0)));
        assert_eq!(camera.position(), Point3::new(0.0, 0.0, 6.0));
    }

    #[test]
    fn first_row_is_the_bottom_of_the_image() {
        let mut camera = Camera::new(45.0, 0.1, 100.0);
        camera.resize(4, 4);

        let rays = camera.ray_directions();
        assert!(rays[0].y < 0.0);
        assert!(rays[0].x < 0.0);
        assert!(rays[15].y > 0.0);
        assert!(rays[15].x > 0.0);
    }

    #[test]
    fn rotating_turns_the_rays() {
        let mut camera = Camera::new(45.0, 0.1, 100.0);
        camera.resize(4, 4);
        let before = camera.ray_directions()[10];

        assert!(camera.rotate(Vector2::new(200.0, 0.0)));
        let after = camera.ray_directions()[10];

        assert!(!close(&before, &after));
        assert!(close(&after, &camera.forward().into_inner()));
        assert!(!camera.rotate(Vector2::zeros()));
    }

    #[test]
    fn movement_translates_position() {
        let mut camera = Camera::new(45.0, 0.1, 100.0);
        camera.resize(2, 2);

        let moved = camera.update(
            &Movement {
                forward: true,
                ..Default::default()
            },
            0.1,
        );
        assert!(moved);
        assert!((camera.position() - Point3::new(0.0, 0.0, 5.5)).norm() < 1e-5);

        assert!(!camera.update(&Movement::default(), 0.1));
    }

    #[test]
    fn pose_can_be_overridden() {
        let mut camera = Camera::new(45.0, 0.1, 100.0)
            .with_pose(Point3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        camera.resize(4, 4);

        assert!(close(&camera.ray_directions()[10], &Vector3::x()));
    }
}
