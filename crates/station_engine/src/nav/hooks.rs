use std::cell::Cell;
use std::rc::Rc;

use super::{DestinationId, HookError};
use crate::math::{Pose, Vec3};

/// Pose owner the transition controller drives while traveling.
pub trait CameraRig {
    fn pose(&self) -> Pose;

    /// Pose without transient offsets such as head bob. Cancelled travel
    /// returns here.
    fn rest_pose(&self) -> Pose {
        self.pose()
    }

    fn set_pose(&mut self, position: Vec3, yaw: f32, pitch: f32);

    /// Places the rig at `position` facing `yaw` with level pitch, dropping any
    /// movement velocity the rig carries.
    fn teleport(&mut self, position: Vec3, yaw: f32);
}

/// Scene reactions to travel. Both calls must be idempotent: cancellation and
/// failure paths may call `on_travel_end` without a matching begin.
pub trait TravelHooks {
    fn on_travel_begin(&mut self, destination: &DestinationId) -> Result<(), HookError>;

    fn on_travel_end(&mut self, destination: &DestinationId) -> Result<(), HookError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHooks;

impl TravelHooks for NoopHooks {
    fn on_travel_begin(&mut self, _destination: &DestinationId) -> Result<(), HookError> {
        Ok(())
    }

    fn on_travel_end(&mut self, _destination: &DestinationId) -> Result<(), HookError> {
        Ok(())
    }
}

pub trait LocomotionControl {
    fn set_locomotion_enabled(&mut self, enabled: bool);
}

/// Shared on/off switch for walking. The input gate writes it, the walker
/// reads it.
#[derive(Debug, Clone, Default)]
pub struct LocomotionFlag(Rc<Cell<bool>>);

impl LocomotionFlag {
    pub fn new(enabled: bool) -> Self {
        Self(Rc::new(Cell::new(enabled)))
    }

    pub fn is_enabled(&self) -> bool {
        self.0.get()
    }
}

impl LocomotionControl for LocomotionFlag {
    fn set_locomotion_enabled(&mut self, enabled: bool) {
        self.0.set(enabled);
    }
}
