// src/app/state.rs

use crate::session::{SessionEvent, SessionState};

/// Which top-level view the presentation layer should show.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Login,
    /// Back on the login view, with a reason to show above the form.
    LoginWithNotice(String),
    Dashboard,
}

impl Screen {
    /// Initial screen once the stored session has been restored (or not).
    pub fn for_state(state: &SessionState) -> Self {
        if state.is_authenticated() {
            Self::Dashboard
        } else {
            Self::Login
        }
    }

    /// Navigation in response to a session transition. `None` means stay put.
    pub fn after(event: &SessionEvent) -> Option<Self> {
        match event {
            SessionEvent::SignedIn(_) => Some(Self::Dashboard),
            SessionEvent::SignedOut => Some(Self::Login),
            SessionEvent::Expired { message } => Some(Self::LoginWithNotice(message.clone())),
            SessionEvent::Renewed => None,
        }
    }

    pub fn is_login(&self) -> bool {
        !matches!(self, Self::Dashboard)
    }
}
