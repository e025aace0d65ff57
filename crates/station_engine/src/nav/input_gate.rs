use std::rc::Rc;

use tracing::{debug, info, warn};

use super::{
    AnchorRegistry, DestinationId, LocomotionControl, Mode, ModeStore, NavError, Subscription,
    TransitionPhaseKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionOutcome {
    /// Travel started.
    Accepted,
    /// A pending trip now heads somewhere else.
    Retargeted,
    /// Dropped because the view is not accepting selections right now.
    Ignored,
}

/// Decides which user input reaches the mode store.
///
/// Selection and walking are only live while docked. The walking switch is
/// pushed to the locomotion layer from a store subscription, so it follows
/// every mode change no matter who made it.
pub struct InputGate {
    store: ModeStore,
    registry: Rc<AnchorRegistry>,
    subscription: Option<Subscription>,
}

impl InputGate {
    pub fn new(
        store: ModeStore,
        registry: Rc<AnchorRegistry>,
        locomotion: impl LocomotionControl + 'static,
    ) -> Self {
        let mut locomotion = locomotion;
        locomotion.set_locomotion_enabled(store.mode() == Mode::Docked);
        let subscription = store.on_state_change(move |change| {
            locomotion.set_locomotion_enabled(change.current.mode == Mode::Docked);
        });
        Self {
            store,
            registry,
            subscription: Some(subscription),
        }
    }

    pub fn is_selection_enabled(&self) -> bool {
        self.store.mode() == Mode::Docked
    }

    pub fn is_locomotion_enabled(&self) -> bool {
        self.store.mode() == Mode::Docked
    }

    /// Console or hotkey selection. Unknown ids are reported without any
    /// state change; selections while traveling are dropped.
    pub fn select(&self, destination: &str) -> Result<SelectionOutcome, NavError> {
        if !self.is_selection_enabled() {
            debug!(destination, mode = %self.store.mode(), "selection_dropped");
            return Ok(SelectionOutcome::Ignored);
        }
        let id = self.validate(destination)?;
        self.store.set_mode(Mode::Traveling, Some(id.clone()))?;
        info!(destination = %id, "selection_accepted");
        Ok(SelectionOutcome::Accepted)
    }

    /// HUD destination-button path. While docked this is [`select`]; while a
    /// trip is still priming a different destination replaces it.
    ///
    /// [`select`]: InputGate::select
    pub fn redirect(
        &self,
        destination: &str,
        phase: TransitionPhaseKind,
    ) -> Result<SelectionOutcome, NavError> {
        if self.is_selection_enabled() {
            return self.select(destination);
        }
        if phase == TransitionPhaseKind::Enroute {
            debug!(destination, "redirect_dropped_enroute");
            return Ok(SelectionOutcome::Ignored);
        }
        let id = self.validate(destination)?;
        if self.store.destination().as_ref() == Some(&id) {
            return Ok(SelectionOutcome::Ignored);
        }
        self.store.set_mode(Mode::Traveling, Some(id.clone()))?;
        info!(destination = %id, "selection_retargeted");
        Ok(SelectionOutcome::Retargeted)
    }

    fn validate(&self, destination: &str) -> Result<DestinationId, NavError> {
        match self.registry.resolve(destination) {
            Ok(_) => Ok(DestinationId::new(destination)),
            Err(error) => {
                warn!(error = %error, "selection_rejected");
                Err(error)
            }
        }
    }
}

impl Drop for InputGate {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;
    use crate::nav::{Anchor, LocomotionFlag};

    fn gate() -> (ModeStore, InputGate, LocomotionFlag) {
        let store = ModeStore::new();
        let registry = AnchorRegistry::from_entries([(
            DestinationId::new("projects"),
            Anchor::new(Vec3::new(10.0, 0.0, 5.0), 0.0),
        )])
        .expect("registry");
        let flag = LocomotionFlag::new(false);
        let gate = InputGate::new(store.clone(), Rc::new(registry), flag.clone());
        (store, gate, flag)
    }

    #[test]
    fn new_gate_pushes_current_locomotion_state() {
        let (_, gate, flag) = gate();
        assert!(flag.is_enabled());
        assert!(gate.is_selection_enabled());
    }

    #[test]
    fn select_while_docked_starts_travel() {
        let (store, gate, flag) = gate();
        assert_eq!(gate.select("projects"), Ok(SelectionOutcome::Accepted));
        assert_eq!(store.mode(), Mode::Traveling);
        assert_eq!(store.destination(), Some(DestinationId::new("projects")));
        assert!(!flag.is_enabled());
        assert!(!gate.is_locomotion_enabled());
    }

    #[test]
    fn unknown_destination_leaves_state_alone() {
        let (store, gate, _) = gate();
        let error = gate.select("mars").expect_err("mars is unknown");
        assert!(error.is_unknown_destination());
        assert_eq!(store.mode(), Mode::Docked);
    }

    #[test]
    fn redirect_while_enroute_is_dropped() {
        let (store, gate, _) = gate();
        gate.select("projects").expect("select");
        store.set_mode(Mode::Traveling, None).expect("still traveling");
        assert_eq!(
            gate.redirect("projects", TransitionPhaseKind::Enroute),
            Ok(SelectionOutcome::Ignored)
        );
        assert_eq!(
            gate.redirect("projects", TransitionPhaseKind::Priming),
            Ok(SelectionOutcome::Ignored)
        );
    }

    #[test]
    fn dropping_gate_removes_its_listener() {
        let (store, gate, _) = gate();
        assert_eq!(store.subscriber_count(), 1);
        drop(gate);
        assert_eq!(store.subscriber_count(), 0);
    }
}
