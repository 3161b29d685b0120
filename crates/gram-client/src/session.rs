use gram_types::api::UserResponse;

/// Client-side session state, passed explicitly into every command.
/// Transitions: Anonymous -> Authenticated on login, back to Anonymous
/// on logout. No ambient globals.
pub enum Session {
    Anonymous,
    Authenticated { token: String, user: UserResponse },
}

impl Session {
    pub fn token(&self) -> Option<&str> {
        match self {
            Session::Anonymous => None,
            Session::Authenticated { token, .. } => Some(token),
        }
    }

    pub fn user(&self) -> Option<&UserResponse> {
        match self {
            Session::Anonymous => None,
            Session::Authenticated { user, .. } => Some(user),
        }
    }
}
