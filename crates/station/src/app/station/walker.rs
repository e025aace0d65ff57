use std::f32::consts::FRAC_PI_2;

use station_engine::math::{forward_from_yaw, wrap_angle};
use station_engine::nav::{CameraRig, LocomotionFlag};
use station_engine::{InputAction, InputSnapshot, Pose, Vec3};

pub(crate) const EYE_HEIGHT: f32 = 2.6;
pub(crate) const WALK_SPEED: f32 = 7.2;
const ACCELERATION: f32 = 14.0;
const DECELERATION: f32 = 12.0;
const SPEED_RESPONSE_SCALE: f32 = 0.1;
const LOOK_SENSITIVITY: f32 = 0.0025;
const MAX_PITCH: f32 = FRAC_PI_2 - 0.05;
const BOB_FREQUENCY: f32 = 16.0;
const BOB_AMPLITUDE_Y: f32 = 0.07;
const BOB_AMPLITUDE_X: f32 = 0.025;
const BOB_SETTLE_RATE: f32 = 10.0;
const BOB_REST_THRESHOLD: f32 = 0.001;

/// Walkable rectangle centered on the origin, already shrunk by the margin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct WalkBounds {
    half_width: f32,
    half_depth: f32,
}

impl WalkBounds {
    pub(crate) fn new(width: f32, depth: f32, margin: f32) -> Self {
        Self {
            half_width: (width * 0.5 - margin).max(0.0),
            half_depth: (depth * 0.5 - margin).max(0.0),
        }
    }

    pub(crate) fn clamp(&self, position: Vec3) -> Vec3 {
        Vec3::new(
            position.x.clamp(-self.half_width, self.half_width),
            position.y,
            position.z.clamp(-self.half_depth, self.half_depth),
        )
    }
}

/// First-person walker. Owns the camera pose whenever the view is docked and
/// hands it to the transition controller while traveling.
#[derive(Debug)]
pub(crate) struct Walker {
    /// Eye position without head bob.
    position: Vec3,
    yaw: f32,
    pitch: f32,
    current_speed: f32,
    bob_time: f32,
    bob_amount: f32,
    bob_offset: Vec3,
    bounds: WalkBounds,
    locomotion: LocomotionFlag,
}

impl Walker {
    pub(crate) fn new(spawn: Pose, bounds: WalkBounds, locomotion: LocomotionFlag) -> Self {
        Self {
            position: spawn.position,
            yaw: spawn.yaw,
            pitch: spawn.pitch,
            current_speed: 0.0,
            bob_time: 0.0,
            bob_amount: 0.0,
            bob_offset: Vec3::ZERO,
            bounds,
            locomotion,
        }
    }

    #[cfg(test)]
    pub(crate) fn current_speed(&self) -> f32 {
        self.current_speed
    }

    /// Walking needs both the navigation switch and a captured pointer.
    pub(crate) fn is_active(&self, input: &InputSnapshot) -> bool {
        self.locomotion.is_enabled() && input.pointer_captured()
    }

    pub(crate) fn update(&mut self, dt_seconds: f32, input: &InputSnapshot) {
        if !self.is_active(input) {
            return;
        }

        let look = input.look_delta_px();
        self.yaw = wrap_angle(self.yaw - look.x * LOOK_SENSITIVITY);
        self.pitch = (self.pitch - look.y * LOOK_SENSITIVITY).clamp(-MAX_PITCH, MAX_PITCH);

        let forward = forward_from_yaw(self.yaw);
        let right = forward.cross(Vec3::UP);
        let mut wish = Vec3::ZERO;
        if input.is_down(InputAction::MoveForward) {
            wish += forward;
        }
        if input.is_down(InputAction::MoveBack) {
            wish += -forward;
        }
        if input.is_down(InputAction::StrafeLeft) {
            wish += -right;
        }
        if input.is_down(InputAction::StrafeRight) {
            wish += right;
        }
        let direction = wish.try_normalize();
        let moving = direction.is_some();

        let target_speed = if moving { WALK_SPEED } else { 0.0 };
        let rate = if target_speed > self.current_speed {
            ACCELERATION
        } else {
            DECELERATION
        };
        self.current_speed += (target_speed - self.current_speed)
            * (rate * dt_seconds * SPEED_RESPONSE_SCALE).min(1.0);
        if let Some(direction) = direction {
            self.position += direction * (self.current_speed * dt_seconds);
        }

        let speed_ratio = self.current_speed / WALK_SPEED;
        let target_bob = if moving { speed_ratio } else { 0.0 };
        self.bob_amount += (target_bob - self.bob_amount) * (BOB_SETTLE_RATE * dt_seconds).min(1.0);
        if self.bob_amount < BOB_REST_THRESHOLD {
            self.bob_time = 0.0;
        } else {
            self.bob_time += dt_seconds * BOB_FREQUENCY * speed_ratio;
        }

        self.position = self.bounds.clamp(self.position);
        self.position.y = EYE_HEIGHT;
        let sway = (self.bob_time * 0.5).sin() * BOB_AMPLITUDE_X * self.bob_amount;
        let lift = self.bob_time.sin() * BOB_AMPLITUDE_Y * self.bob_amount;
        self.bob_offset = right * sway + Vec3::new(0.0, lift, 0.0);
    }

    fn reset_motion(&mut self) {
        self.current_speed = 0.0;
        self.bob_time = 0.0;
        self.bob_amount = 0.0;
        self.bob_offset = Vec3::ZERO;
    }
}

impl CameraRig for Walker {
    fn pose(&self) -> Pose {
        Pose::new(self.position + self.bob_offset, self.yaw, self.pitch)
    }

    fn rest_pose(&self) -> Pose {
        Pose::new(self.position, self.yaw, self.pitch)
    }

    fn set_pose(&mut self, position: Vec3, yaw: f32, pitch: f32) {
        self.position = position;
        self.yaw = yaw;
        self.pitch = pitch;
        self.bob_offset = Vec3::ZERO;
    }

    fn teleport(&mut self, position: Vec3, yaw: f32) {
        self.set_pose(position, yaw, 0.0);
        self.reset_motion();
    }
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use station_engine::nav::LocomotionControl;
    use station_engine::Vec2;

    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn walker_at(position: Vec3, yaw: f32) -> (Walker, LocomotionFlag) {
        let flag = LocomotionFlag::new(true);
        let walker = Walker::new(
            Pose::new(position, yaw, 0.0),
            WalkBounds::new(40.0, 74.0, 1.0),
            flag.clone(),
        );
        (walker, flag)
    }

    fn captured() -> InputSnapshot {
        InputSnapshot::empty().with_pointer_captured(true)
    }

    #[test]
    fn forward_follows_yaw_and_accelerates() {
        let (mut walker, _) = walker_at(Vec3::new(0.0, EYE_HEIGHT, 10.0), PI);
        let input = captured().with_action_down(InputAction::MoveForward, true);
        let mut previous_speed = 0.0;
        for _ in 0..30 {
            walker.update(DT, &input);
            assert!(walker.current_speed() > previous_speed);
            previous_speed = walker.current_speed();
        }
        assert!(walker.current_speed() < WALK_SPEED);
        let pose = walker.pose();
        assert!(pose.position.z < 10.0);
        assert!(pose.position.x.abs() < 0.05, "x={}", pose.position.x);
    }

    #[test]
    fn strafe_right_moves_toward_positive_x_when_facing_negative_z() {
        let (mut walker, _) = walker_at(Vec3::new(0.0, EYE_HEIGHT, 0.0), PI);
        let input = captured().with_action_down(InputAction::StrafeRight, true);
        for _ in 0..20 {
            walker.update(DT, &input);
        }
        assert!(walker.pose().position.x > 0.0);
    }

    #[test]
    fn speed_decays_after_keys_release() {
        let (mut walker, _) = walker_at(Vec3::new(0.0, EYE_HEIGHT, 0.0), 0.0);
        let walking = captured().with_action_down(InputAction::MoveForward, true);
        for _ in 0..60 {
            walker.update(DT, &walking);
        }
        let cruising = walker.current_speed();
        let resting = captured();
        for _ in 0..60 {
            walker.update(DT, &resting);
        }
        assert!(walker.current_speed() < cruising);
    }

    #[test]
    fn disabled_locomotion_blocks_movement_and_look() {
        let (mut walker, mut flag) = walker_at(Vec3::new(0.0, EYE_HEIGHT, 0.0), 0.0);
        flag.set_locomotion_enabled(false);
        let input = captured()
            .with_action_down(InputAction::MoveForward, true)
            .with_look_delta_px(Vec2::new(40.0, 10.0));
        let before = walker.pose();
        walker.update(DT, &input);
        assert_eq!(walker.pose(), before);
    }

    #[test]
    fn released_pointer_blocks_movement() {
        let (mut walker, _) = walker_at(Vec3::new(0.0, EYE_HEIGHT, 0.0), 0.0);
        let input = InputSnapshot::empty().with_action_down(InputAction::MoveForward, true);
        let before = walker.pose();
        walker.update(DT, &input);
        assert_eq!(walker.pose(), before);
    }

    #[test]
    fn pitch_is_clamped_short_of_vertical() {
        let (mut walker, _) = walker_at(Vec3::new(0.0, EYE_HEIGHT, 0.0), 0.0);
        walker.update(DT, &captured().with_look_delta_px(Vec2::new(0.0, -5000.0)));
        assert!((walker.pose().pitch - MAX_PITCH).abs() < 1e-6);
        walker.update(DT, &captured().with_look_delta_px(Vec2::new(0.0, 10000.0)));
        assert!((walker.pose().pitch + MAX_PITCH).abs() < 1e-6);
    }

    #[test]
    fn position_stays_inside_bounds() {
        let (mut walker, _) = walker_at(Vec3::new(0.0, EYE_HEIGHT, -34.0), PI);
        let input = captured().with_action_down(InputAction::MoveForward, true);
        for _ in 0..300 {
            walker.update(DT, &input);
        }
        let pose = walker.pose();
        assert!(pose.position.z >= -36.0 - 1e-3, "z={}", pose.position.z);
    }

    #[test]
    fn teleport_levels_pitch_and_stops_motion() {
        let (mut walker, _) = walker_at(Vec3::new(0.0, EYE_HEIGHT, 0.0), 0.0);
        let input = captured()
            .with_action_down(InputAction::MoveForward, true)
            .with_look_delta_px(Vec2::new(0.0, -100.0));
        for _ in 0..20 {
            walker.update(DT, &input);
        }
        walker.teleport(Vec3::new(14.0, EYE_HEIGHT, 0.0), FRAC_PI_2);
        let pose = walker.pose();
        assert_eq!(pose.position, Vec3::new(14.0, EYE_HEIGHT, 0.0));
        assert_eq!(pose.yaw, FRAC_PI_2);
        assert_eq!(pose.pitch, 0.0);
        assert_eq!(walker.current_speed(), 0.0);
    }

    #[test]
    fn rest_pose_leaves_out_head_bob() {
        let (mut walker, _) = walker_at(Vec3::new(0.0, EYE_HEIGHT, 10.0), PI);
        let input = captured().with_action_down(InputAction::MoveForward, true);
        for _ in 0..30 {
            walker.update(DT, &input);
        }
        let rest = walker.rest_pose();
        let pose = walker.pose();
        assert!(pose.position.distance(rest.position) > 1.0e-3);
        assert_eq!(rest.position.y, EYE_HEIGHT);
        assert_eq!(rest.position, walker.position);
        assert_eq!((rest.yaw, rest.pitch), (pose.yaw, pose.pitch));
    }
}
