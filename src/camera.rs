use log::{debug, warn};
use nalgebra::{
    Isometry3, Matrix4, Perspective3, Point3, Unit, UnitQuaternion, Vector2, Vector3, Vector4,
};
use rayon::prelude::*;
use winit::dpi::PhysicalSize;
use winit::event::{MouseButton, VirtualKeyCode};

use crate::input::{CursorMode, InputState};

/// How held movement keys combine within one update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MovementPolicy {
    /// Only the first held key in W, S, A, D, Q, E order moves the camera.
    #[default]
    FirstKeyWins,
    /// Every held key contributes.
    AllHeldKeys,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub mouse_sensitivity: f32,
    pub rotation_speed: f32,
    /// Units per second.
    pub movement_speed: f32,
    pub look_button: MouseButton,
    pub movement: MovementPolicy,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            mouse_sensitivity: 0.002,
            rotation_speed: 0.3,
            movement_speed: 5.0,
            look_button: MouseButton::Right,
            movement: MovementPolicy::FirstKeyWins,
        }
    }
}

// Sign applied along forward, right and up.
const MOVEMENT_KEYS: [(VirtualKeyCode, [f32; 3]); 6] = [
    (VirtualKeyCode::W, [1.0, 0.0, 0.0]),
    (VirtualKeyCode::S, [-1.0, 0.0, 0.0]),
    (VirtualKeyCode::A, [0.0, -1.0, 0.0]),
    (VirtualKeyCode::D, [0.0, 1.0, 0.0]),
    (VirtualKeyCode::Q, [0.0, 0.0, -1.0]),
    (VirtualKeyCode::E, [0.0, 0.0, 1.0]),
];

// Rotations that would leave forward this close to world up are dropped,
// the look-at basis degenerates there.
const MAX_UP_ALIGNMENT: f32 = 0.9999;

/// A fly camera with a per-pixel cache of world space ray directions.
pub struct Camera {
    projection: Matrix4<f32>,
    view: Matrix4<f32>,
    inverse_projection: Matrix4<f32>,
    inverse_view: Matrix4<f32>,

    /// Degrees.
    vertical_fov: f32,
    near: f32,
    far: f32,

    position: Point3<f32>,
    forward: Unit<Vector3<f32>>,

    /// Indexed `x + y * width`.
    rays: Vec<Vector3<f32>>,
    last_mouse: Vector2<f32>,

    viewport_size: PhysicalSize<u32>,
    pub settings: CameraSettings,
}

impl Camera {
    pub fn new(vertical_fov: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            projection: Matrix4::identity(),
            view: Matrix4::identity(),
            inverse_projection: Matrix4::identity(),
            inverse_view: Matrix4::identity(),
            vertical_fov,
            near,
            far,
            position: Point3::new(0.0, 0.0, 3.0),
            forward: -Vector3::z_axis(),
            rays: vec![],
            last_mouse: Vector2::zeros(),
            viewport_size: PhysicalSize::new(0, 0),
            settings: CameraSettings::default(),
        };
        camera.reevaluate_view();

        camera
    }

    pub fn with_settings(mut self, settings: CameraSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Applies one frame of mouse look and key movement.
    /// Returns whether the camera moved, in which case the ray cache was rebuilt.
    pub fn on_update<I: InputState + ?Sized>(&mut self, input: &mut I, time_step: f32) -> bool {
        let mouse = input.mouse_position();
        let delta = (mouse - self.last_mouse) * self.settings.mouse_sensitivity;
        self.last_mouse = mouse;

        if !input.is_mouse_button_down(self.settings.look_button) {
            input.set_cursor_mode(CursorMode::Normal);
            return false;
        }

        input.set_cursor_mode(CursorMode::Locked);

        let right = Unit::try_new(self.forward.cross(&Vector3::y()), f32::EPSILON);

        let mut moved = self.translate(input, right, time_step);

        if delta.x != 0.0 || delta.y != 0.0 {
            moved |= self.rotate(delta, right);
        }

        if moved {
            self.reevaluate_view();
            self.reevaluate_rays();
        }

        moved
    }

    fn translate<I: InputState + ?Sized>(
        &mut self,
        input: &I,
        right: Option<Unit<Vector3<f32>>>,
        time_step: f32,
    ) -> bool {
        let axes = [
            self.forward.into_inner(),
            right.map_or_else(Vector3::zeros, Unit::into_inner),
            Vector3::y(),
        ];
        let held = MOVEMENT_KEYS
            .iter()
            .filter(|(key, _)| input.is_key_down(*key))
            .map(|(_, signs)| signs);

        let mut offset = Vector3::zeros();
        let mut moved = false;
        let mut apply = |signs: &[f32; 3]| {
            for (axis, sign) in axes.iter().zip(signs) {
                offset += axis * *sign;
            }
            moved = true;
        };

        match self.settings.movement {
            MovementPolicy::FirstKeyWins => held.take(1).for_each(&mut apply),
            MovementPolicy::AllHeldKeys => held.for_each(&mut apply),
        }

        self.position += offset * self.movement_speed() * time_step;
        moved
    }

    fn rotate(&mut self, delta: Vector2<f32>, right: Option<Unit<Vector3<f32>>>) -> bool {
        let pitch_delta = delta.y * self.rotation_speed();
        let yaw_delta = delta.x * self.rotation_speed();

        let yaw = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), -yaw_delta);
        let rotation = match right {
            Some(right) => UnitQuaternion::from_axis_angle(&right, -pitch_delta) * yaw,
            None => yaw,
        };

        let forward = Unit::new_normalize(rotation * self.forward.into_inner());
        if forward.dot(&Vector3::y()).abs() > MAX_UP_ALIGNMENT {
            return false;
        }

        self.forward = forward;
        true
    }

    /// Rebuilds the projection and ray cache when the viewport actually changed.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        let new_size = PhysicalSize::new(width, height);
        if self.viewport_size == new_size {
            return;
        }

        self.viewport_size = new_size;
        if width == 0 || height == 0 {
            warn!("Camera viewport is empty ({width}x{height}), dropping ray cache");
            self.rays = vec![];
            return;
        }

        self.reevaluate_projection();
        self.reevaluate_rays();
    }

    pub fn rotation_speed(&self) -> f32 {
        self.settings.rotation_speed
    }

    pub fn movement_speed(&self) -> f32 {
        self.settings.movement_speed
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn direction(&self) -> Unit<Vector3<f32>> {
        self.forward
    }

    pub fn set_position(&mut self, position: Point3<f32>) {
        self.position = position;
        self.reevaluate_view();
        self.reevaluate_rays();
    }

    pub fn set_direction(&mut self, direction: Unit<Vector3<f32>>) {
        self.forward = direction;
        self.reevaluate_view();
        self.reevaluate_rays();
    }

    pub fn ray_directions(&self) -> &[Vector3<f32>] {
        &self.rays
    }

    pub fn viewport_size(&self) -> PhysicalSize<u32> {
        self.viewport_size
    }

    pub fn projection(&self) -> &Matrix4<f32> {
        &self.projection
    }

    pub fn inverse_projection(&self) -> &Matrix4<f32> {
        &self.inverse_projection
    }

    pub fn view(&self) -> &Matrix4<f32> {
        &self.view
    }

    pub fn inverse_view(&self) -> &Matrix4<f32> {
        &self.inverse_view
    }

    fn reevaluate_projection(&mut self) {
        let aspect = self.viewport_size.width as f32 / self.viewport_size.height as f32;
        let perspective =
            Perspective3::new(aspect, self.vertical_fov.to_radians(), self.near, self.far);

        self.projection = perspective.to_homogeneous();
        self.inverse_projection = perspective.inverse();
    }

    fn reevaluate_view(&mut self) {
        let target = self.position + self.forward.into_inner();
        let view = Isometry3::look_at_rh(&self.position, &target, &Vector3::y());

        self.view = view.to_homogeneous();
        self.inverse_view = view.inverse().to_homogeneous();
    }

    fn reevaluate_rays(&mut self) {
        let PhysicalSize { width, height } = self.viewport_size;
        if width == 0 || height == 0 {
            return;
        }

        let inverse_projection = &self.inverse_projection;
        let inverse_view = &self.inverse_view;

        let (width, height) = (width as usize, height as usize);
        self.rays = (0..width * height)
            .into_par_iter()
            .map(|index| {
                let x = index % width;
                let y = index / width;

                // Pixel to normalized device coordinates. Rows are not flipped here,
                // the image consumer decides which way is up.
                let mut coord = Vector2::new(x as f32 / width as f32, y as f32 / height as f32);
                coord *= 2.0;
                coord -= Vector2::new(1.0, 1.0); // -1 -> 1

                // Unproject a point on the far plane back into view space; the
                // perspective divide turns the homogeneous result into a position.
                let target = inverse_projection * Vector4::new(coord.x, coord.y, 1.0, 1.0);
                let direction = (target.xyz() / target.w).normalize();

                // w = 0 so only the rotation of the inverse view applies, the camera
                // position is added back as the ray origin.
                (inverse_view * direction.push(0.0)).xyz() // world space
            })
            .collect();

        debug!("Rebuilt {} camera rays", self.rays.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashSet;

    #[derive(Default)]
    struct FakeInput {
        mouse: Vector2<f32>,
        looking: bool,
        keys: HashSet<VirtualKeyCode>,
        cursor: CursorMode,
    }

    impl InputState for FakeInput {
        fn mouse_position(&self) -> Vector2<f32> {
            self.mouse
        }

        fn is_mouse_button_down(&self, button: MouseButton) -> bool {
            self.looking && button == MouseButton::Right
        }

        fn is_key_down(&self, key: VirtualKeyCode) -> bool {
            self.keys.contains(&key)
        }

        fn set_cursor_mode(&mut self, mode: CursorMode) {
            self.cursor = mode;
        }
    }

    fn camera(width: u32, height: u32) -> Camera {
        let mut camera = Camera::new(45.0, 0.1, 100.0);
        camera.on_resize(width, height);
        camera
    }

    #[test]
    fn ray_cache_covers_every_pixel_with_unit_vectors() {
        let camera = camera(16, 9);

        assert_eq!(camera.ray_directions().len(), 16 * 9);
        for direction in camera.ray_directions() {
            assert_relative_eq!(direction.norm(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn center_ray_matches_forward() {
        let camera = camera(8, 8);
        let center = camera.ray_directions()[4 + 4 * 8];

        assert_relative_eq!(center, camera.direction().into_inner(), epsilon = 1e-5);
    }

    #[test]
    fn ray_rows_are_not_flipped() {
        let camera = camera(4, 4);
        let first_row = camera.ray_directions()[2];
        let last_row = camera.ray_directions()[2 + 3 * 4];

        assert!(first_row.y < 0.0);
        assert!(last_row.y > 0.0);
    }

    #[test]
    fn corner_rays_follow_the_field_of_view() {
        let camera = camera(2, 2);
        // Pixel (0, 1) maps to ndc (-1, 0): left edge, vertical center.
        let edge = camera.ray_directions()[2];
        let half_horizontal = (22.5f32.to_radians().tan()).atan();

        assert_relative_eq!((-edge.x).atan2(-edge.z), half_horizontal, epsilon = 1e-4);
    }

    #[test]
    fn resize_to_same_size_is_a_no_op() {
        let mut camera = camera(4, 4);
        let rays = camera.ray_directions().as_ptr();

        camera.on_resize(4, 4);
        assert_eq!(camera.ray_directions().as_ptr(), rays);

        camera.on_resize(6, 2);
        assert_eq!(camera.ray_directions().len(), 12);
    }

    #[test]
    fn wide_viewport_keeps_row_major_layout() {
        let camera = camera(7, 3);
        let rays = camera.ray_directions();

        assert_eq!(rays.len(), 21);
        // Same row: only x changes across it.
        assert_relative_eq!(rays[7].y / rays[7].z, rays[13].y / rays[13].z, epsilon = 1e-5);
        assert!(rays[7].x < rays[13].x);
    }

    #[test]
    fn zero_sized_viewport_has_no_rays() {
        let mut camera = camera(4, 4);
        camera.on_resize(0, 4);

        assert!(camera.ray_directions().is_empty());
        assert_eq!(camera.viewport_size(), PhysicalSize::new(0, 4));
    }

    #[test]
    fn nothing_moves_without_the_look_button() {
        let mut camera = camera(4, 4);
        let mut input = FakeInput {
            mouse: Vector2::new(50.0, 0.0),
            ..Default::default()
        };
        input.keys.insert(VirtualKeyCode::W);

        assert!(!camera.on_update(&mut input, 1.0));
        assert_eq!(input.cursor, CursorMode::Normal);
        assert_eq!(camera.position(), Point3::new(0.0, 0.0, 3.0));
    }

    #[test]
    fn forward_key_moves_along_forward() {
        let mut camera = camera(4, 4);
        let mut input = FakeInput {
            looking: true,
            ..Default::default()
        };
        input.keys.insert(VirtualKeyCode::W);

        camera.settings.movement_speed = 2.0;
        assert!(camera.on_update(&mut input, 0.5));
        assert_eq!(input.cursor, CursorMode::Locked);
        assert_eq!(camera.movement_speed(), 2.0);
        assert_relative_eq!(camera.position(), Point3::new(0.0, 0.0, 2.0), epsilon = 1e-5);
    }

    #[test]
    fn first_held_key_wins_by_default() {
        let mut camera = camera(4, 4);
        let mut input = FakeInput {
            looking: true,
            ..Default::default()
        };
        input.keys.insert(VirtualKeyCode::D);
        input.keys.insert(VirtualKeyCode::E);

        camera.on_update(&mut input, 1.0);
        // Facing -z, right is +x.
        assert_relative_eq!(camera.position(), Point3::new(5.0, 0.0, 3.0), epsilon = 1e-5);
    }

    #[test]
    fn all_held_keys_combine_when_configured() {
        let mut camera = camera(4, 4).with_settings(CameraSettings {
            movement: MovementPolicy::AllHeldKeys,
            ..Default::default()
        });
        let mut input = FakeInput {
            looking: true,
            ..Default::default()
        };
        input.keys.insert(VirtualKeyCode::D);
        input.keys.insert(VirtualKeyCode::E);

        camera.on_update(&mut input, 1.0);
        assert_relative_eq!(camera.position(), Point3::new(5.0, 5.0, 3.0), epsilon = 1e-5);
    }

    #[test]
    fn dragging_right_turns_right() {
        let mut camera = camera(4, 4);
        let mut input = FakeInput {
            looking: true,
            ..Default::default()
        };
        camera.on_update(&mut input, 0.016);

        input.mouse = Vector2::new(100.0, 0.0);
        assert!(camera.on_update(&mut input, 0.016));

        let forward = camera.direction();
        assert!(forward.x > 0.0);
        assert_relative_eq!(forward.y, 0.0, epsilon = 1e-5);
        assert_relative_eq!(forward.norm(), 1.0, epsilon = 1e-5);

        let center = camera.ray_directions()[2 + 2 * 4];
        assert_relative_eq!(center, forward.into_inner(), epsilon = 1e-5);
    }

    #[test]
    fn dragging_down_pitches_down() {
        let mut camera = camera(4, 4);
        let mut input = FakeInput {
            looking: true,
            ..Default::default()
        };
        camera.on_update(&mut input, 0.016);

        input.mouse = Vector2::new(0.0, 100.0);
        camera.on_update(&mut input, 0.016);

        assert!(camera.direction().y < 0.0);
    }

    #[test]
    fn pointer_delta_is_tracked_while_not_looking() {
        let mut camera = camera(4, 4);
        let mut input = FakeInput {
            mouse: Vector2::new(300.0, 300.0),
            ..Default::default()
        };
        camera.on_update(&mut input, 0.016);

        input.looking = true;
        assert!(!camera.on_update(&mut input, 0.016));
        assert_eq!(camera.direction(), -Vector3::z_axis());
    }
}
