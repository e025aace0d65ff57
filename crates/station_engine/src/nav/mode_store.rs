use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use tracing::{debug, info, warn};

use super::{DestinationId, Mode, NavError, NavigationState};

type Listener = Rc<RefCell<Box<dyn FnMut(&StateChange)>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub prev: NavigationState,
    pub current: NavigationState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct StoreInner {
    state: RefCell<NavigationState>,
    listeners: RefCell<BTreeMap<SubscriptionId, Listener>>,
    next_subscription: Cell<u64>,
    pending: RefCell<VecDeque<StateChange>>,
    dispatching: Cell<bool>,
}

/// Shared handle to the one navigation state of the application.
///
/// Cloning the handle shares the state. Listeners run synchronously inside
/// [`ModeStore::set_mode`]; a change requested from inside a listener is
/// applied immediately and delivered after the current pass finishes, so every
/// listener sees changes one at a time and in order.
#[derive(Clone, Default)]
pub struct ModeStore {
    inner: Rc<StoreInner>,
}

impl ModeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> NavigationState {
        self.inner.state.borrow().clone()
    }

    pub fn mode(&self) -> Mode {
        self.inner.state.borrow().mode
    }

    pub fn destination(&self) -> Option<DestinationId> {
        self.inner.state.borrow().destination.clone()
    }

    /// Moves to `mode`. For [`Mode::Traveling`] an omitted destination keeps
    /// the current one; [`Mode::Docked`] always clears it.
    pub fn set_mode(
        &self,
        mode: Mode,
        destination: Option<DestinationId>,
    ) -> Result<(), NavError> {
        let change = {
            let mut state = self.inner.state.borrow_mut();
            let next = match resolve_next_state(&state, mode, destination) {
                Ok(next) => next,
                Err(error) => {
                    warn!(error = %error, current = %state.mode, "mode_request_rejected");
                    return Err(error);
                }
            };
            let prev = std::mem::replace(&mut *state, next.clone());
            StateChange { prev, current: next }
        };

        info!(
            from = %change.prev.mode,
            to = %change.current.mode,
            destination = change
                .current
                .destination
                .as_ref()
                .map(DestinationId::as_str)
                .unwrap_or("-"),
            "mode_changed"
        );
        self.inner.pending.borrow_mut().push_back(change);
        self.dispatch_pending();
        Ok(())
    }

    /// String-keyed entry point for callers that carry mode names (debug
    /// commands, config); unknown names are rejected without touching state.
    pub fn set_mode_named(
        &self,
        mode_name: &str,
        destination: Option<DestinationId>,
    ) -> Result<(), NavError> {
        let mode = mode_name.parse::<Mode>().map_err(|error| {
            warn!(error = %error, "mode_request_rejected");
            error
        })?;
        self.set_mode(mode, destination)
    }

    /// Registers `listener`. Keep the returned handle to remove it later;
    /// dropping the handle leaves the listener registered.
    pub fn on_state_change(&self, listener: impl FnMut(&StateChange) + 'static) -> Subscription {
        let id = SubscriptionId(self.inner.next_subscription.get());
        self.inner
            .next_subscription
            .set(self.inner.next_subscription.get().saturating_add(1));
        let boxed: Box<dyn FnMut(&StateChange)> = Box::new(listener);
        self.inner
            .listeners
            .borrow_mut()
            .insert(id, Rc::new(RefCell::new(boxed)));
        debug!(subscription = id.0, "state_listener_added");
        Subscription {
            id,
            store: Rc::downgrade(&self.inner),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    fn dispatch_pending(&self) {
        if self.inner.dispatching.replace(true) {
            return;
        }

        loop {
            let Some(change) = self.inner.pending.borrow_mut().pop_front() else {
                break;
            };
            let snapshot: Vec<(SubscriptionId, Listener)> = self
                .inner
                .listeners
                .borrow()
                .iter()
                .map(|(id, listener)| (*id, Rc::clone(listener)))
                .collect();

            for (id, listener) in snapshot {
                let Ok(mut callback) = listener.try_borrow_mut() else {
                    continue;
                };
                let outcome =
                    panic::catch_unwind(AssertUnwindSafe(|| (&mut **callback)(&change)));
                if outcome.is_err() {
                    warn!(subscription = id.0, "state_listener_panicked");
                }
            }
        }

        self.inner.dispatching.set(false);
    }
}

fn resolve_next_state(
    state: &NavigationState,
    mode: Mode,
    destination: Option<DestinationId>,
) -> Result<NavigationState, NavError> {
    match mode {
        Mode::Docked => {
            if let Some(destination) = destination {
                return Err(NavError::InvalidMode {
                    mode: format!("{mode}:{destination}"),
                    reason: "docked mode cannot carry a destination",
                });
            }
            Ok(NavigationState::docked())
        }
        Mode::Traveling => destination
            .or_else(|| state.destination.clone())
            .map(NavigationState::traveling)
            .ok_or_else(|| NavError::InvalidMode {
                mode: mode.to_string(),
                reason: "traveling requires a destination",
            }),
    }
}

/// Handle returned by [`ModeStore::on_state_change`].
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    store: Weak<StoreInner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns `false` if the listener was already gone.
    pub fn unsubscribe(self) -> bool {
        let Some(store) = self.store.upgrade() else {
            return false;
        };
        let removed = store.listeners.borrow_mut().remove(&self.id).is_some();
        if removed {
            debug!(subscription = self.id.0, "state_listener_removed");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    fn dest(id: &str) -> DestinationId {
        DestinationId::new(id)
    }

    fn recorder(store: &ModeStore) -> (Rc<RefCell<Vec<StateChange>>>, Subscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let subscription =
            store.on_state_change(move |change| sink.borrow_mut().push(change.clone()));
        (seen, subscription)
    }

    #[test]
    fn starts_docked_without_destination() {
        let store = ModeStore::new();
        assert_eq!(store.state(), NavigationState::docked());
    }

    #[test]
    fn set_mode_notifies_with_prev_and_current_snapshots() {
        let store = ModeStore::new();
        let (seen, _subscription) = recorder(&store);

        store
            .set_mode(Mode::Traveling, Some(dest("projects")))
            .expect("travel");

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].prev, NavigationState::docked());
        assert_eq!(seen[0].current, NavigationState::traveling(dest("projects")));
    }

    #[test]
    fn traveling_without_destination_keeps_previous_one() {
        let store = ModeStore::new();
        store
            .set_mode(Mode::Traveling, Some(dest("skills")))
            .expect("travel");
        store.set_mode(Mode::Traveling, None).expect("keep");
        assert_eq!(store.destination(), Some(dest("skills")));
    }

    #[test]
    fn docked_always_clears_destination() {
        let store = ModeStore::new();
        store
            .set_mode(Mode::Traveling, Some(dest("skills")))
            .expect("travel");
        store.set_mode(Mode::Docked, None).expect("dock");
        assert_eq!(store.state(), NavigationState::docked());
    }

    #[test]
    fn invalid_requests_leave_state_untouched_and_silent() {
        let store = ModeStore::new();
        let (seen, _subscription) = recorder(&store);

        let missing = store.set_mode(Mode::Traveling, None);
        let docked_with_dest = store.set_mode(Mode::Docked, Some(dest("skills")));
        let bad_name = store.set_mode_named("warping", Some(dest("skills")));

        assert!(matches!(missing, Err(NavError::InvalidMode { .. })));
        assert!(matches!(docked_with_dest, Err(NavError::InvalidMode { .. })));
        assert!(matches!(bad_name, Err(NavError::InvalidMode { .. })));
        assert_eq!(store.state(), NavigationState::docked());
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn named_modes_parse() {
        let store = ModeStore::new();
        store
            .set_mode_named("traveling", Some(dest("home")))
            .expect("named travel");
        assert_eq!(store.mode(), Mode::Traveling);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let store = ModeStore::new();
        let (seen, subscription) = recorder(&store);
        assert!(subscription.unsubscribe());

        store
            .set_mode(Mode::Traveling, Some(dest("projects")))
            .expect("travel");
        assert!(seen.borrow().is_empty());
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn subscribing_during_notification_waits_for_next_change() {
        let store = ModeStore::new();
        let late_calls = Rc::new(RefCell::new(0u32));
        let store_for_listener = store.clone();
        let late_calls_for_listener = Rc::clone(&late_calls);
        let _subscription = store.on_state_change(move |_| {
            let counter = Rc::clone(&late_calls_for_listener);
            let _late = store_for_listener.on_state_change(move |_| *counter.borrow_mut() += 1);
        });

        store
            .set_mode(Mode::Traveling, Some(dest("projects")))
            .expect("travel");
        assert_eq!(*late_calls.borrow(), 0);

        store.set_mode(Mode::Docked, None).expect("dock");
        assert_eq!(*late_calls.borrow(), 1);
    }

    #[test]
    fn unsubscribing_during_notification_keeps_current_pass() {
        let store = ModeStore::new();
        let victim_calls = Rc::new(RefCell::new(0u32));
        let victim_slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));

        let slot = Rc::clone(&victim_slot);
        let _remover = store.on_state_change(move |_| {
            if let Some(victim) = slot.borrow_mut().take() {
                victim.unsubscribe();
            }
        });
        let counter = Rc::clone(&victim_calls);
        let victim = store.on_state_change(move |_| *counter.borrow_mut() += 1);
        *victim_slot.borrow_mut() = Some(victim);

        store
            .set_mode(Mode::Traveling, Some(dest("projects")))
            .expect("travel");
        assert_eq!(*victim_calls.borrow(), 1);

        store.set_mode(Mode::Docked, None).expect("dock");
        assert_eq!(*victim_calls.borrow(), 1);
    }

    #[test]
    fn reentrant_set_mode_is_delivered_after_current_pass() {
        let store = ModeStore::new();
        let store_for_listener = store.clone();
        let _bouncer = store.on_state_change(move |change| {
            if change.current.mode == Mode::Traveling {
                store_for_listener
                    .set_mode(Mode::Docked, None)
                    .expect("bounce back");
            }
        });
        let (seen, _subscription) = recorder(&store);

        store
            .set_mode(Mode::Traveling, Some(dest("projects")))
            .expect("travel");

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].current.mode, Mode::Traveling);
        assert_eq!(seen[1].prev.mode, Mode::Traveling);
        assert_eq!(seen[1].current.mode, Mode::Docked);
        assert_eq!(store.mode(), Mode::Docked);
    }

    #[test]
    fn panicking_listener_does_not_starve_others() {
        let store = ModeStore::new();
        let _bad = store.on_state_change(|_| panic!("listener failure"));
        let (seen, _subscription) = recorder(&store);

        store
            .set_mode(Mode::Traveling, Some(dest("projects")))
            .expect("travel");
        store.set_mode(Mode::Docked, None).expect("dock");

        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn unsubscribe_after_store_dropped_reports_false() {
        let store = ModeStore::new();
        let subscription = store.on_state_change(|_| {});
        drop(store);
        assert!(!subscription.unsubscribe());
    }
}
