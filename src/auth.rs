use serde::{Deserialize, Serialize};

use crate::errors::AppError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Client-side authentication state.
///
/// Any operation can surface an authentication failure; routing those
/// through `absorb` guarantees a single logout path instead of scattered
/// per-caller handling.
#[derive(Debug, Clone, Default)]
pub struct AuthState {
    user: Option<UserProfile>,
}

impl AuthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.user.as_ref()
    }

    pub fn login(&mut self, user: UserProfile) {
        tracing::info!("Authenticated as user {}", user.id);
        self.user = Some(user);
    }

    pub fn logout(&mut self) {
        if let Some(user) = self.user.take() {
            tracing::info!("Logged out user {}", user.id);
        }
    }

    /// Inspects an error from any operation; an authentication failure
    /// (however deeply wrapped) clears the session. Returns true when a
    /// logout happened.
    pub fn absorb(&mut self, error: &AppError) -> bool {
        if is_unauthorized(error) && self.user.is_some() {
            tracing::warn!("Session rejected by the API, logging out");
            self.logout();
            return true;
        }
        false
    }
}

fn is_unauthorized(error: &AppError) -> bool {
    match error {
        AppError::Unauthorized(_) => true,
        AppError::WithContext { source, .. } => is_unauthorized(source),
        _ => false,
    }
}
