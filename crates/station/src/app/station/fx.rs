use station_engine::nav::{DestinationId, HookError, TravelHooks};
use station_engine::Vec3;
use tracing::debug;

const DOOR_SETTLE_EPSILON: f32 = 0.001;
const EFFECT_OFFSET: Vec3 = Vec3::new(0.0, -1.0, 0.0);
const FLICKER_RATE: f32 = 60.0;
const BASE_INTENSITY: f32 = 2.0;
const INTENSITY_SWING: f32 = 0.5;

/// Sliding tunnel doors. `progress` runs from 0 (closed) to 1 (open) at a
/// fixed rate toward the current target.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct DoorAnimator {
    progress: f32,
    target: f32,
    open_seconds: f32,
    slide: f32,
}

impl DoorAnimator {
    pub(crate) fn new(open_seconds: f32, slide: f32) -> Self {
        Self {
            progress: 0.0,
            target: 0.0,
            open_seconds: open_seconds.max(f32::EPSILON),
            slide,
        }
    }

    pub(crate) fn open(&mut self) {
        self.target = 1.0;
    }

    pub(crate) fn close(&mut self) {
        self.target = 0.0;
    }

    pub(crate) fn update(&mut self, dt_seconds: f32) {
        let gap = self.target - self.progress;
        if gap.abs() <= DOOR_SETTLE_EPSILON {
            self.progress = self.target;
            return;
        }
        self.progress += gap.signum() * dt_seconds / self.open_seconds;
        self.progress = self.progress.clamp(0.0, 1.0);
    }

    pub(crate) fn progress(&self) -> f32 {
        self.progress
    }

    /// How far each panel has slid away from the door center.
    pub(crate) fn panel_offset(&self) -> f32 {
        self.slide * self.progress
    }
}

/// The craft shown under the camera during travel.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TravelEffect {
    visible: bool,
    position: Vec3,
    flicker_time: f32,
    intensity: f32,
}

impl Default for TravelEffect {
    fn default() -> Self {
        Self {
            visible: false,
            position: Vec3::ZERO,
            flicker_time: 0.0,
            intensity: BASE_INTENSITY,
        }
    }
}

impl TravelEffect {
    pub(crate) fn is_visible(&self) -> bool {
        self.visible
    }

    pub(crate) fn position(&self) -> Vec3 {
        self.position
    }

    #[cfg(test)]
    pub(crate) fn intensity(&self) -> f32 {
        self.intensity
    }

    fn show(&mut self) {
        self.visible = true;
    }

    fn hide(&mut self) {
        self.visible = false;
    }

    fn update(&mut self, dt_seconds: f32, camera_position: Vec3) {
        if !self.visible {
            return;
        }
        self.position = camera_position + EFFECT_OFFSET;
        self.flicker_time += dt_seconds * FLICKER_RATE;
        self.intensity = BASE_INTENSITY + (self.flicker_time * 0.25).sin() * INTENSITY_SWING;
    }
}

/// Scene reactions to travel: doors open and the travel effect appears when
/// a trip is requested, and both revert when it ends or is cancelled.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StationFx {
    doors: DoorAnimator,
    effect: TravelEffect,
}

impl StationFx {
    pub(crate) fn new(doors: DoorAnimator) -> Self {
        Self {
            doors,
            effect: TravelEffect::default(),
        }
    }

    pub(crate) fn doors(&self) -> &DoorAnimator {
        &self.doors
    }

    pub(crate) fn effect(&self) -> &TravelEffect {
        &self.effect
    }

    pub(crate) fn update(&mut self, dt_seconds: f32, camera_position: Vec3) {
        self.doors.update(dt_seconds);
        self.effect.update(dt_seconds, camera_position);
    }
}

impl TravelHooks for StationFx {
    fn on_travel_begin(&mut self, destination: &DestinationId) -> Result<(), HookError> {
        debug!(destination = %destination, "doors_opening");
        self.doors.open();
        self.effect.show();
        Ok(())
    }

    fn on_travel_end(&mut self, destination: &DestinationId) -> Result<(), HookError> {
        debug!(destination = %destination, "doors_closing");
        self.doors.close();
        self.effect.hide();
        Ok(())
    }
}
