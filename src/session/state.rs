use crate::domain::UserProfile;

/// `Anonymous -> Authenticating -> Authenticated (-> renewal pending) -> Authenticated | Anonymous`
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SessionState {
    #[default]
    Anonymous,
    /// Only entered by an explicit login, registration or restore.
    Authenticating,
    Authenticated {
        user: UserProfile,
        /// A silent renewal is in flight. The current token stays usable meanwhile.
        renewal_pending: bool,
    },
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    pub fn user(&self) -> Option<&UserProfile> {
        match self {
            Self::Authenticated { user, .. } => Some(user),
            _ => None,
        }
    }
}

/// Navigation-worthy transitions, for the presentation layer to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Login or registration completed; show the main app.
    SignedIn(UserProfile),
    /// Explicit logout; show the login view.
    SignedOut,
    /// Silent renewal failed; show the login view with `message`.
    Expired { message: String },
    Renewed,
}
