use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{
    AbortCause, Anchor, AnchorRegistry, CameraRig, CatmullRomCurve, DestinationId, Mode,
    ModeStore, NavError, StateChange, Subscription, TravelHooks,
};
use crate::math::{ease_in_out_cubic, yaw_pitch_toward, Pose, Vec3};

const MIN_HORIZONTAL_LOOK: f32 = 1.0e-3;

/// Timing and shape of automatic travel.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransitionConfig {
    /// Delay between the travel request and the camera leaving, while doors
    /// open and the travel effect appears.
    pub priming_delay_seconds: f32,
    pub travel_seconds: f32,
    /// Height of the second control point above the start position.
    pub start_loft: f32,
    /// Height of the third control point above the destination anchor.
    pub end_loft: f32,
    /// Fraction of the remaining distance to the sampled path point covered
    /// each tick.
    pub follow_blend: f32,
    /// Eased-progress offset of the point the camera looks at.
    pub look_ahead: f32,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            priming_delay_seconds: 0.9,
            travel_seconds: 6.0,
            start_loft: 20.0,
            end_loft: 25.0,
            follow_blend: 0.9,
            look_ahead: 0.002,
        }
    }
}

impl TransitionConfig {
    /// Replaces out-of-range values with their defaults.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        let non_negative = |value: f32, fallback: f32| {
            if value.is_finite() && value >= 0.0 {
                value
            } else {
                fallback
            }
        };
        let finite = |value: f32, fallback: f32| if value.is_finite() { value } else { fallback };
        let follow_blend = if self.follow_blend.is_finite() && self.follow_blend > 0.0 {
            self.follow_blend.min(1.0)
        } else {
            defaults.follow_blend
        };

        Self {
            priming_delay_seconds: non_negative(
                self.priming_delay_seconds,
                defaults.priming_delay_seconds,
            ),
            travel_seconds: non_negative(self.travel_seconds, defaults.travel_seconds),
            start_loft: finite(self.start_loft, defaults.start_loft),
            end_loft: finite(self.end_loft, defaults.end_loft),
            follow_blend,
            look_ahead: non_negative(self.look_ahead, defaults.look_ahead),
        }
    }
}

/// Camera path for one trip. Progress only moves forward and stops at 1.
#[derive(Debug, Clone)]
pub struct TransitionPath {
    destination: DestinationId,
    anchor: Anchor,
    curve: CatmullRomCurve,
    duration_seconds: f32,
    look_ahead: f32,
    progress: f32,
}

impl TransitionPath {
    pub fn build(
        start: Vec3,
        destination: DestinationId,
        anchor: Anchor,
        config: &TransitionConfig,
    ) -> Self {
        let end = anchor.position;
        let curve = CatmullRomCurve::through([
            start,
            start.raised(config.start_loft),
            end.raised(config.end_loft),
            end,
        ]);
        Self {
            destination,
            anchor,
            curve,
            duration_seconds: config.travel_seconds,
            look_ahead: config.look_ahead,
            progress: 0.0,
        }
    }

    pub fn advance(&mut self, dt_seconds: f32) {
        let dt_seconds = dt_seconds.max(0.0);
        if self.duration_seconds <= 0.0 {
            self.progress = 1.0;
            return;
        }
        self.progress = (self.progress + dt_seconds / self.duration_seconds).clamp(0.0, 1.0);
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn eased_progress(&self) -> f32 {
        ease_in_out_cubic(self.progress)
    }

    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }

    /// Point on the path for the current progress, and the point slightly
    /// further along that the camera looks at.
    pub fn sample(&self) -> (Vec3, Vec3) {
        let eased = self.eased_progress();
        let ahead = (eased + self.look_ahead).min(1.0);
        (self.curve.point_at(eased), self.curve.point_at(ahead))
    }

    pub fn destination(&self) -> &DestinationId {
        &self.destination
    }

    pub fn anchor(&self) -> Anchor {
        self.anchor
    }

    pub fn curve(&self) -> &CatmullRomCurve {
        &self.curve
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPhaseKind {
    Idle,
    Priming,
    Enroute,
}

impl TransitionPhaseKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            TransitionPhaseKind::Idle => "idle",
            TransitionPhaseKind::Priming => "priming",
            TransitionPhaseKind::Enroute => "enroute",
        }
    }
}

#[derive(Debug)]
enum Phase {
    Idle,
    Priming {
        destination: DestinationId,
        remaining_seconds: f32,
    },
    Enroute {
        path: TransitionPath,
    },
}

/// What a tick did. When several things happen in one tick the last one is
/// reported.
#[derive(Debug, Clone, PartialEq)]
pub enum TravelEvent {
    None,
    Priming(DestinationId),
    Departed(DestinationId),
    Arrived(DestinationId),
    Aborted(NavError),
}

impl TravelEvent {
    pub fn is_none(&self) -> bool {
        matches!(self, TravelEvent::None)
    }
}

/// Everything the controller drives during one tick.
pub struct TravelContext<'a> {
    pub rig: &'a mut dyn CameraRig,
    pub hooks: &'a mut dyn TravelHooks,
}

impl<'a> TravelContext<'a> {
    pub fn new(rig: &'a mut dyn CameraRig, hooks: &'a mut dyn TravelHooks) -> Self {
        Self { rig, hooks }
    }
}

/// Turns `Traveling` requests on the mode store into camera motion.
///
/// The controller listens to the store and reacts on its next tick: a
/// request starts priming, priming turns into an arc-length sampled flight
/// along a [`TransitionPath`], and arrival docks the store again. An external
/// `Docked` during priming or flight, or [`TransitionController::abort`],
/// returns the rig to the pose it held when travel began.
pub struct TransitionController {
    store: ModeStore,
    registry: Rc<AnchorRegistry>,
    config: TransitionConfig,
    phase: Phase,
    safe_pose: Pose,
    abort_requested: bool,
    inbox: Rc<RefCell<VecDeque<StateChange>>>,
    subscription: Option<Subscription>,
}

impl TransitionController {
    pub fn new(
        store: ModeStore,
        registry: Rc<AnchorRegistry>,
        config: TransitionConfig,
        safe_pose: Pose,
    ) -> Self {
        let inbox = Rc::new(RefCell::new(VecDeque::new()));
        let state = store.state();
        if !state.is_docked() {
            inbox.borrow_mut().push_back(StateChange {
                prev: super::NavigationState::docked(),
                current: state,
            });
        }
        let sink = Rc::clone(&inbox);
        let subscription =
            store.on_state_change(move |change| sink.borrow_mut().push_back(change.clone()));

        Self {
            store,
            registry,
            config: config.sanitized(),
            phase: Phase::Idle,
            safe_pose,
            abort_requested: false,
            inbox,
            subscription: Some(subscription),
        }
    }

    pub fn config(&self) -> &TransitionConfig {
        &self.config
    }

    pub fn phase(&self) -> TransitionPhaseKind {
        match self.phase {
            Phase::Idle => TransitionPhaseKind::Idle,
            Phase::Priming { .. } => TransitionPhaseKind::Priming,
            Phase::Enroute { .. } => TransitionPhaseKind::Enroute,
        }
    }

    /// Raw path progress in `[0, 1]`; zero until the camera leaves.
    pub fn progress(&self) -> f32 {
        match &self.phase {
            Phase::Enroute { path } => path.progress(),
            Phase::Idle | Phase::Priming { .. } => 0.0,
        }
    }

    pub fn active_destination(&self) -> Option<&DestinationId> {
        match &self.phase {
            Phase::Idle => None,
            Phase::Priming { destination, .. } => Some(destination),
            Phase::Enroute { path } => Some(path.destination()),
        }
    }

    pub fn active_path(&self) -> Option<&TransitionPath> {
        match &self.phase {
            Phase::Enroute { path } => Some(path),
            Phase::Idle | Phase::Priming { .. } => None,
        }
    }

    /// Pose the rig returns to if the current trip is cancelled.
    pub fn safe_pose(&self) -> Pose {
        self.safe_pose
    }

    /// Cancels the current trip on the next tick. Does nothing while idle.
    pub fn abort(&mut self) {
        if !matches!(self.phase, Phase::Idle) {
            debug!("travel_abort_requested");
            self.abort_requested = true;
        }
    }

    pub fn tick(&mut self, dt_seconds: f32, ctx: &mut TravelContext<'_>) -> TravelEvent {
        let dt_seconds = if dt_seconds.is_finite() {
            dt_seconds.max(0.0)
        } else {
            0.0
        };
        let mut event = TravelEvent::None;

        while let Some(change) = self.next_change() {
            if let Some(next) = self.apply_change(change, ctx) {
                event = next;
            }
        }

        if self.abort_requested {
            self.abort_requested = false;
            if let Some(next) = self.cancel(AbortCause::Requested, ctx) {
                event = next;
            }
        }

        if let Some(next) = self.advance(dt_seconds, ctx) {
            event = next;
        }
        event
    }

    fn next_change(&self) -> Option<StateChange> {
        self.inbox.borrow_mut().pop_front()
    }

    fn apply_change(
        &mut self,
        change: StateChange,
        ctx: &mut TravelContext<'_>,
    ) -> Option<TravelEvent> {
        match (change.current.mode, change.current.destination) {
            (Mode::Traveling, Some(destination)) => self.request_travel(destination, ctx),
            (Mode::Docked, _) => self.cancel(AbortCause::ExternalReset, ctx),
            (Mode::Traveling, None) => None,
        }
    }

    fn request_travel(
        &mut self,
        destination: DestinationId,
        ctx: &mut TravelContext<'_>,
    ) -> Option<TravelEvent> {
        match &mut self.phase {
            Phase::Idle => {
                self.safe_pose = ctx.rig.rest_pose();
                self.abort_requested = false;
                info!(destination = %destination, "travel_priming");
                run_hook("on_travel_begin", ctx.hooks.on_travel_begin(&destination));
                self.phase = Phase::Priming {
                    destination: destination.clone(),
                    remaining_seconds: self.config.priming_delay_seconds,
                };
                Some(TravelEvent::Priming(destination))
            }
            Phase::Priming {
                destination: current,
                remaining_seconds,
            } => {
                if *current == destination {
                    return None;
                }
                info!(from = %current, to = %destination, "travel_retargeted");
                *current = destination.clone();
                *remaining_seconds = self.config.priming_delay_seconds;
                run_hook("on_travel_begin", ctx.hooks.on_travel_begin(&destination));
                Some(TravelEvent::Priming(destination))
            }
            Phase::Enroute { path } => {
                if *path.destination() == destination {
                    return None;
                }
                let committed = path.destination().clone();
                warn!(
                    requested = %destination,
                    committed = %committed,
                    "travel_retarget_ignored_enroute"
                );
                if let Err(error) = self.store.set_mode(Mode::Traveling, Some(committed)) {
                    warn!(error = %error, "travel_state_restore_failed");
                }
                None
            }
        }
    }

    fn cancel(&mut self, cause: AbortCause, ctx: &mut TravelContext<'_>) -> Option<TravelEvent> {
        let destination = match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => return None,
            Phase::Priming { destination, .. } => destination,
            Phase::Enroute { path } => path.destination().clone(),
        };
        self.abort_requested = false;

        let safe = self.safe_pose;
        ctx.rig.teleport(safe.position, safe.yaw);
        // An external reset already docked the store; anything queued after
        // it is a newer request the inbox still has to deliver.
        if cause == AbortCause::Requested && self.store.mode() != Mode::Docked {
            if let Err(error) = self.store.set_mode(Mode::Docked, None) {
                warn!(error = %error, "travel_state_restore_failed");
            }
        }
        run_hook("on_travel_end", ctx.hooks.on_travel_end(&destination));

        let error = NavError::TransitionAborted { destination, cause };
        warn!(error = %error, "travel_aborted");
        Some(TravelEvent::Aborted(error))
    }

    fn advance(&mut self, dt_seconds: f32, ctx: &mut TravelContext<'_>) -> Option<TravelEvent> {
        let mut event = None;
        let mut step = dt_seconds;

        if let Phase::Priming {
            destination,
            remaining_seconds,
        } = &mut self.phase
        {
            *remaining_seconds -= step;
            if *remaining_seconds > 0.0 {
                return None;
            }
            step = -*remaining_seconds;
            let destination = destination.clone();
            event = Some(self.depart(destination, ctx));
        }

        let arrived = match &mut self.phase {
            Phase::Enroute { path } => {
                path.advance(step);
                if path.is_complete() {
                    true
                } else {
                    steer(path, &self.config, ctx.rig);
                    false
                }
            }
            Phase::Idle | Phase::Priming { .. } => false,
        };

        if arrived {
            event = self.arrive(ctx);
        }
        event
    }

    fn depart(&mut self, destination: DestinationId, ctx: &mut TravelContext<'_>) -> TravelEvent {
        let anchor = match self.registry.resolve(destination.as_str()) {
            Ok(anchor) => anchor,
            Err(error) => {
                warn!(error = %error, "travel_path_failed");
                self.phase = Phase::Idle;
                self.safe_pose = ctx.rig.rest_pose();
                if self.store.mode() != Mode::Docked {
                    if let Err(restore) = self.store.set_mode(Mode::Docked, None) {
                        warn!(error = %restore, "travel_state_restore_failed");
                    }
                }
                run_hook("on_travel_end", ctx.hooks.on_travel_end(&destination));
                return TravelEvent::Aborted(error);
            }
        };

        let path = TransitionPath::build(
            ctx.rig.pose().position,
            destination.clone(),
            anchor,
            &self.config,
        );
        info!(
            destination = %destination,
            length = path.curve().length(),
            seconds = self.config.travel_seconds,
            "travel_departed"
        );
        self.phase = Phase::Enroute { path };
        TravelEvent::Departed(destination)
    }

    fn arrive(&mut self, ctx: &mut TravelContext<'_>) -> Option<TravelEvent> {
        let Phase::Enroute { path } = std::mem::replace(&mut self.phase, Phase::Idle) else {
            return None;
        };
        let anchor = path.anchor();
        let destination = path.destination().clone();

        ctx.rig.teleport(anchor.position, anchor.facing_yaw);
        self.safe_pose = anchor.pose();
        if let Err(error) = self.store.set_mode(Mode::Docked, None) {
            warn!(error = %error, "travel_state_restore_failed");
        }
        run_hook("on_travel_end", ctx.hooks.on_travel_end(&destination));
        info!(destination = %destination, "travel_arrived");
        Some(TravelEvent::Arrived(destination))
    }
}

impl Drop for TransitionController {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

fn steer(path: &TransitionPath, config: &TransitionConfig, rig: &mut dyn CameraRig) {
    let (point, ahead) = path.sample();
    let current = rig.pose();
    let position = current.position.lerp(point, config.follow_blend);
    let (yaw, pitch) = match yaw_pitch_toward(ahead - point) {
        Some((yaw, pitch)) => {
            let horizontal = Vec3::new(ahead.x - point.x, 0.0, ahead.z - point.z);
            if horizontal.length() < MIN_HORIZONTAL_LOOK * ahead.distance(point) {
                (current.yaw, pitch)
            } else {
                (yaw, pitch)
            }
        }
        None => (current.yaw, current.pitch),
    };
    rig.set_pose(position, yaw, pitch);
}

fn run_hook(hook: &'static str, outcome: Result<(), super::HookError>) {
    if let Err(error) = outcome {
        warn!(hook, error = %error, "travel_hook_failed");
    }
}
