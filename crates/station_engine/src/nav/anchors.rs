use std::collections::BTreeMap;

use thiserror::Error;

use super::{DestinationId, NavError};
use crate::math::{Pose, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub position: Vec3,
    pub facing_yaw: f32,
}

impl Anchor {
    pub fn new(position: Vec3, facing_yaw: f32) -> Self {
        Self {
            position,
            facing_yaw,
        }
    }

    /// Docked pose at this anchor: anchor yaw, level pitch.
    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.facing_yaw, 0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnchorRegistryError {
    #[error("destination `{0}` is registered more than once")]
    Duplicate(DestinationId),
    #[error("anchor for `{0}` has a non-finite position or yaw")]
    NonFinite(DestinationId),
    #[error("destination id must not be empty")]
    EmptyId,
}

/// Closed set of travel destinations, fixed when the scene is built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnchorRegistry {
    anchors: BTreeMap<DestinationId, Anchor>,
}

impl AnchorRegistry {
    pub fn from_entries(
        entries: impl IntoIterator<Item = (DestinationId, Anchor)>,
    ) -> Result<Self, AnchorRegistryError> {
        let mut anchors = BTreeMap::new();
        for (id, anchor) in entries {
            if id.as_str().trim().is_empty() {
                return Err(AnchorRegistryError::EmptyId);
            }
            if !anchor.position.is_finite() || !anchor.facing_yaw.is_finite() {
                return Err(AnchorRegistryError::NonFinite(id));
            }
            if anchors.contains_key(&id) {
                return Err(AnchorRegistryError::Duplicate(id));
            }
            anchors.insert(id, anchor);
        }
        Ok(Self { anchors })
    }

    pub fn resolve(&self, id: &str) -> Result<Anchor, NavError> {
        self.anchors
            .get(id)
            .copied()
            .ok_or_else(|| NavError::UnknownDestination(DestinationId::new(id)))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.anchors.contains_key(id)
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> impl Iterator<Item = &DestinationId> {
        self.anchors.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DestinationId, &Anchor)> {
        self.anchors.iter()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}
