//! Navigation core: which mode the station view is in, where travel is headed,
//! and how the camera gets there.
//!
//! All types here are single-threaded. The [`ModeStore`] handle is `Rc`-based
//! and is cloned into every consumer by the composition root; every mutation
//! goes through [`ModeStore::set_mode`] on the simulation tick.

use std::fmt;
use std::str::FromStr;

mod anchors;
mod curve;
mod error;
mod hooks;
mod input_gate;
mod mode_store;
mod transition;


pub use anchors::{Anchor, AnchorRegistry, AnchorRegistryError};
pub use curve::CatmullRomCurve;
pub use error::{AbortCause, HookError, NavError};
pub use hooks::{CameraRig, LocomotionControl, LocomotionFlag, NoopHooks, TravelHooks};
pub use input_gate::{InputGate, SelectionOutcome};
pub use mode_store::{ModeStore, StateChange, Subscription, SubscriptionId};
pub use transition::{
    TransitionConfig, TransitionController, TransitionPath, TransitionPhaseKind, TravelContext,
    TravelEvent,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DestinationId(String);

impl DestinationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DestinationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for DestinationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl std::borrow::Borrow<str> for DestinationId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    #[default]
    Docked,
    Traveling,
}

impl Mode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Mode::Docked => "docked",
            Mode::Traveling => "traveling",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = NavError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "docked" => Ok(Mode::Docked),
            "traveling" => Ok(Mode::Traveling),
            other => Err(NavError::InvalidMode {
                mode: other.to_string(),
                reason: "unrecognized mode name",
            }),
        }
    }
}

/// `destination` is `Some` exactly when `mode` is [`Mode::Traveling`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationState {
    pub mode: Mode,
    pub destination: Option<DestinationId>,
}

impl NavigationState {
    pub fn docked() -> Self {
        Self::default()
    }

    pub fn traveling(destination: DestinationId) -> Self {
        Self {
            mode: Mode::Traveling,
            destination: Some(destination),
        }
    }

    pub fn is_docked(&self) -> bool {
        self.mode == Mode::Docked
    }
}
