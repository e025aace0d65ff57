use std::cell::RefCell;
use std::rc::Rc;

use station_engine::nav::{Mode, ModeStore, NavError, NavigationState, Subscription};

pub(crate) const RESUME_PROMPT: &str = "CLICK TO RE-ENTER WALK MODE";
const TITLE: &str = "Station";

#[derive(Debug, Default)]
struct HudState {
    status: String,
    failure: Option<String>,
    resume_prompt: bool,
}

/// Status line shown in the window title. Follows the mode store through a
/// subscription; the scene only reports failures and pointer capture.
pub(crate) struct Hud {
    state: Rc<RefCell<HudState>>,
    subscription: Option<Subscription>,
}

impl Hud {
    pub(crate) fn new(store: &ModeStore) -> Self {
        let state = Rc::new(RefCell::new(HudState {
            status: status_line(&store.state()),
            failure: None,
            resume_prompt: true,
        }));
        let sink = Rc::clone(&state);
        let subscription = store.on_state_change(move |change| {
            let mut hud = sink.borrow_mut();
            hud.status = status_line(&change.current);
            if change.current.mode == Mode::Traveling {
                hud.failure = None;
            }
        });
        Self {
            state,
            subscription: Some(subscription),
        }
    }

    pub(crate) fn status(&self) -> String {
        self.state.borrow().status.clone()
    }

    pub(crate) fn failure(&self) -> Option<String> {
        self.state.borrow().failure.clone()
    }

    pub(crate) fn resume_prompt_visible(&self) -> bool {
        self.state.borrow().resume_prompt
    }

    pub(crate) fn set_resume_prompt(&self, visible: bool) {
        self.state.borrow_mut().resume_prompt = visible;
    }

    pub(crate) fn report_failure(&self, error: &NavError) {
        self.state.borrow_mut().failure = Some(failure_text(error));
    }

    pub(crate) fn title(&self) -> String {
        let state = self.state.borrow();
        let mut title = format!("{TITLE} | {}", state.status);
        if let Some(failure) = &state.failure {
            title.push_str(" | ");
            title.push_str(failure);
        }
        if state.resume_prompt {
            title.push_str(" | ");
            title.push_str(RESUME_PROMPT);
        }
        title
    }
}

impl Drop for Hud {
    fn drop(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }
}

fn status_line(state: &NavigationState) -> String {
    match (&state.mode, &state.destination) {
        (Mode::Traveling, Some(destination)) => {
            format!("TRAVELING → {}", destination.as_str().to_uppercase())
        }
        (Mode::Traveling, None) => "TRAVELING".to_string(),
        (Mode::Docked, _) => "DOCKED".to_string(),
    }
}

fn failure_text(error: &NavError) -> String {
    match error {
        NavError::UnknownDestination(destination) => {
            format!("destination unavailable: {destination}")
        }
        NavError::TransitionAborted { destination, .. } => {
            format!("travel to {destination} cancelled")
        }
        NavError::InvalidMode { .. } => "navigation request rejected".to_string(),
    }
}
