//! Authentication session state.
//!
//! A [`Session`] holds the bearer token used by [`crate::client`]. It is
//! created explicitly at login, shared (via `Arc`) with every component
//! that issues API calls, and torn down explicitly at logout — there is no
//! ambient global token lookup.
//!
//! A session without a token is valid: requests go out unauthenticated and
//! the backend is expected to reject them with 401.

use parking_lot::RwLock;

/// Process-wide authentication session.
///
/// # Examples
///
/// ```
/// use mrced::Session;
///
/// let session = Session::new();
/// assert!(!session.is_authenticated());
///
/// session.login("t0k3n".to_string());
/// assert_eq!(session.token(), Some("t0k3n".to_string()));
///
/// session.logout();
/// assert!(session.token().is_none());
/// ```
#[derive(Debug, Default)]
pub struct Session {
    token: RwLock<Option<String>>,
}

impl Session {
    /// Create an unauthenticated session.
    #[must_use]
    pub fn new() -> Self {
        Session {
            token: RwLock::new(None),
        }
    }

    /// Create a session already holding a bearer token.
    #[must_use]
    pub fn with_token(token: String) -> Self {
        Session {
            token: RwLock::new(Some(token)),
        }
    }

    /// Store the bearer token obtained at login.
    pub fn login(&self, token: String) {
        *self.token.write() = Some(token);
    }

    /// Discard the bearer token. Subsequent requests go out unauthenticated.
    pub fn logout(&self) {
        *self.token.write() = None;
    }

    /// Current bearer token, if any.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    /// Whether a bearer token is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.token.read().is_some()
    }
}
