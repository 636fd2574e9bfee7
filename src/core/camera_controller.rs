//! Orbit camera controller
//!
//! Drag to orbit around a target point, pan the target, dolly with the wheel.
//! Input is accumulated between ticks and applied by [`OrbitControls::update`],
//! which reports whether the camera actually moved so callers can treat that
//! as the "changed" event.

use std::f32::consts::PI;

use crate::core::camera::Camera;
use crate::core::types::{Quat, Vec3};

const EPS: f32 = 1e-6;

/// Lifecycle events emitted by the controls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlsEvent {
    /// A pointer interaction began.
    Start,
    /// The camera moved.
    Change,
    /// A pointer interaction ended.
    End,
}

/// Spherical coordinates around the target, Y up.
#[derive(Clone, Copy, Debug)]
struct Spherical {
    radius: f32,
    /// Polar angle from +Y
    phi: f32,
    /// Azimuth around Y, measured from +Z
    theta: f32,
}

impl Spherical {
    fn from_offset(offset: Vec3) -> Self {
        let radius = offset.length();
        if radius <= EPS {
            return Self { radius: 0.0, phi: 0.0, theta: 0.0 };
        }
        Self {
            radius,
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            theta: offset.x.atan2(offset.z),
        }
    }

    fn to_offset(self) -> Vec3 {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vec3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

/// Camera placement captured by [`OrbitControls::save_state`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControlsState {
    pub target: Vec3,
    pub position: Vec3,
}

/// Orbit-style camera controller
pub struct OrbitControls {
    /// Point the camera orbits around
    pub target: Vec3,
    /// Closest allowed camera distance to the target
    pub min_distance: f32,
    /// Farthest allowed camera distance to the target
    pub max_distance: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
    /// Spin around the target while no interaction is in progress
    pub auto_rotate: bool,
    /// 2.0 is one revolution per 30 seconds at 60 ticks per second
    pub auto_rotate_speed: f32,
    delta_theta: f32,
    delta_phi: f32,
    scale: f32,
    pan_offset: Vec3,
    interacting: bool,
    saved: ControlsState,
    last_position: Vec3,
    last_rotation: Quat,
}

impl OrbitControls {
    pub fn new() -> Self {
        Self {
            target: Vec3::ZERO,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
            auto_rotate: false,
            auto_rotate_speed: 2.0,
            delta_theta: 0.0,
            delta_phi: 0.0,
            scale: 1.0,
            pan_offset: Vec3::ZERO,
            interacting: false,
            saved: ControlsState { target: Vec3::ZERO, position: Vec3::new(0.0, 0.0, 5.0) },
            last_position: Vec3::splat(f32::NAN),
            last_rotation: Quat::IDENTITY,
        }
    }

    /// Mark the start of a pointer interaction.
    pub fn begin_interaction(&mut self) -> ControlsEvent {
        self.interacting = true;
        ControlsEvent::Start
    }

    /// Mark the end of a pointer interaction.
    pub fn end_interaction(&mut self) -> ControlsEvent {
        self.interacting = false;
        ControlsEvent::End
    }

    pub fn is_interacting(&self) -> bool {
        self.interacting
    }

    /// Queue an orbit by a pointer drag of `(dx, dy)` pixels.
    pub fn rotate(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        if viewport_height <= 0.0 {
            return;
        }
        self.delta_theta -= 2.0 * PI * dx / viewport_height * self.rotate_speed;
        self.delta_phi -= 2.0 * PI * dy / viewport_height * self.rotate_speed;
    }

    /// Queue a dolly. Positive steps move towards the target.
    pub fn dolly(&mut self, steps: f32) {
        let zoom_scale = 0.95f32.powf(self.zoom_speed);
        self.scale *= zoom_scale.powf(steps);
    }

    /// Queue a pan of the target by a pointer drag of `(dx, dy)` pixels.
    pub fn pan(&mut self, dx: f32, dy: f32, camera: &Camera, viewport_height: f32) {
        if viewport_height <= 0.0 {
            return;
        }
        let distance = (camera.position - self.target).length() * (camera.fov_y * 0.5).tan();
        let left = 2.0 * dx * distance / viewport_height * self.pan_speed;
        let up = 2.0 * dy * distance / viewport_height * self.pan_speed;
        self.pan_offset += -camera.right() * left + camera.up() * up;
    }

    fn auto_rotation_angle(&self) -> f32 {
        2.0 * PI / 60.0 / 60.0 * self.auto_rotate_speed
    }

    /// Apply queued input and auto-rotation to `camera`.
    ///
    /// Returns `true` when the camera moved, i.e. a [`ControlsEvent::Change`].
    pub fn update(&mut self, camera: &mut Camera) -> bool {
        let mut spherical = Spherical::from_offset(camera.position - self.target);

        if self.auto_rotate && !self.interacting {
            self.delta_theta -= self.auto_rotation_angle();
        }

        spherical.theta += self.delta_theta;
        spherical.phi = (spherical.phi + self.delta_phi)
            .clamp(self.min_polar_angle, self.max_polar_angle)
            .clamp(EPS, PI - EPS);
        spherical.radius = (spherical.radius * self.scale)
            .max(self.min_distance)
            .min(self.max_distance);

        self.target += self.pan_offset;
        camera.position = self.target + spherical.to_offset();
        camera.look_at(self.target);

        self.delta_theta = 0.0;
        self.delta_phi = 0.0;
        self.scale = 1.0;
        self.pan_offset = Vec3::ZERO;

        let moved = !((camera.position - self.last_position).length_squared() <= EPS
            && 8.0 * (1.0 - self.last_rotation.dot(camera.rotation)) <= EPS);
        if moved {
            self.last_position = camera.position;
            self.last_rotation = camera.rotation;
        }
        moved
    }

    /// Remember the current placement as the "reset view" baseline.
    pub fn save_state(&mut self, camera: &Camera) {
        self.saved = ControlsState {
            target: self.target,
            position: camera.position,
        };
    }

    pub fn saved_state(&self) -> ControlsState {
        self.saved
    }

    /// Restore the baseline captured by [`save_state`](Self::save_state).
    pub fn reset(&mut self, camera: &mut Camera) -> ControlsEvent {
        self.target = self.saved.target;
        camera.position = self.saved.position;
        camera.look_at(self.target);
        self.delta_theta = 0.0;
        self.delta_phi = 0.0;
        self.scale = 1.0;
        self.pan_offset = Vec3::ZERO;
        ControlsEvent::Change
    }
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (OrbitControls, Camera) {
        let controls = OrbitControls::new();
        let mut camera = Camera::default();
        camera.position = Vec3::new(0.0, 0.0, 10.0);
        (controls, camera)
    }

    #[test]
    fn test_first_update_reports_change_then_settles() {
        let (mut controls, mut camera) = setup();
        assert!(controls.update(&mut camera));
        assert!(!controls.update(&mut camera));
    }

    #[test]
    fn test_rotate_keeps_distance() {
        let (mut controls, mut camera) = setup();
        controls.update(&mut camera);
        controls.rotate(100.0, 0.0, 600.0);
        assert!(controls.update(&mut camera));
        assert!((camera.position.length() - 10.0).abs() < 1e-4);
        assert!(camera.position.x.abs() > 1.0);
        assert!((camera.forward() - (-camera.position).normalize()).length() < 1e-4);
    }

    #[test]
    fn test_max_distance_clamps_dolly() {
        let (mut controls, mut camera) = setup();
        controls.max_distance = 12.0;
        controls.dolly(-50.0);
        controls.update(&mut camera);
        assert!((camera.position.length() - 12.0).abs() < 1e-4);
    }

    #[test]
    fn test_dolly_in_moves_closer() {
        let (mut controls, mut camera) = setup();
        controls.dolly(1.0);
        controls.update(&mut camera);
        assert!((camera.position.length() - 9.5).abs() < 1e-4);
    }

    #[test]
    fn test_pan_moves_target() {
        let (mut controls, mut camera) = setup();
        controls.update(&mut camera);
        controls.pan(10.0, 0.0, &camera, 600.0);
        controls.update(&mut camera);
        assert!(controls.target.x < 0.0);
        assert!((camera.position - controls.target).length() - 10.0 < 1e-4);
    }

    #[test]
    fn test_auto_rotate_changes_every_tick() {
        let (mut controls, mut camera) = setup();
        controls.auto_rotate = true;
        controls.update(&mut camera);
        assert!(controls.update(&mut camera));
        assert!(controls.update(&mut camera));
    }

    #[test]
    fn test_auto_rotate_paused_while_interacting() {
        let (mut controls, mut camera) = setup();
        controls.auto_rotate = true;
        controls.update(&mut camera);
        assert_eq!(controls.begin_interaction(), ControlsEvent::Start);
        assert!(!controls.update(&mut camera));
        assert_eq!(controls.end_interaction(), ControlsEvent::End);
        assert!(controls.update(&mut camera));
    }

    #[test]
    fn test_reset_restores_saved_state() {
        let (mut controls, mut camera) = setup();
        camera.position = Vec3::new(4.0, 4.0, 4.0);
        controls.target = Vec3::new(1.0, 0.0, 0.0);
        controls.save_state(&camera);

        controls.rotate(200.0, 50.0, 600.0);
        controls.dolly(3.0);
        controls.update(&mut camera);
        assert!((camera.position - Vec3::new(4.0, 4.0, 4.0)).length() > 0.1);

        assert_eq!(controls.reset(&mut camera), ControlsEvent::Change);
        assert_eq!(camera.position, Vec3::new(4.0, 4.0, 4.0));
        assert_eq!(controls.target, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_polar_angle_never_flips() {
        let (mut controls, mut camera) = setup();
        controls.rotate(0.0, 10_000.0, 600.0);
        controls.update(&mut camera);
        assert!(camera.position.is_finite());
        assert!(camera.rotation.is_finite());
    }
}
