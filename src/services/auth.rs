use std::sync::Arc;

use crate::models::Role;

/// Called when the backend rejects the session token, so the embedding
/// application can route to re-authentication. Injected instead of any
/// process-global session state.
pub type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

/// An authenticated session, threaded explicitly through every component
/// that issues requests. The token is read-only for the lifetime of the
/// context; re-authentication produces a fresh context.
#[derive(Clone)]
pub struct AuthContext {
    username: String,
    role: Role,
    token: String,
}

impl AuthContext {
    pub fn new(username: impl Into<String>, role: Role, token: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            role,
            token: token.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn token(&self) -> &str {
        &self.token
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("username", &self.username)
            .field("role", &self.role)
            .field("token", &"<redacted>")
            .finish()
    }
}
