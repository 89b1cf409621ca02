//! Auth-session state for the current browser user.
//!
//! SYSTEM CONTEXT
//! ==============
//! One `SessionState` handle is created at the app root and passed to every
//! consumer that needs identity (the HTTP client for bearer tokens, the auth
//! gate for composer access). Only [`SessionState::login`] and
//! [`SessionState::logout`] write it; everyone else reads it, and reads
//! inside a reactive scope (views, effects) re-run on every write.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use leptos::prelude::*;

use crate::error::ApiError;
use crate::net::api::ReviewApi;
use crate::net::types::{LoginResponse, MemberId};

/// Identity of the signed-in member. Every field is empty until login.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    pub member_id: Option<MemberId>,
    pub github_id: Option<String>,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub follower_count: Option<u32>,
    pub following_count: Option<u32>,
    /// Whether the member finished the post-signup profile step.
    pub register_completed: bool,
    pub token: Option<String>,
}

impl Session {
    #[must_use]
    pub fn from_login(response: LoginResponse) -> Self {
        let member = response.member;
        Self {
            member_id: Some(member.id),
            github_id: member.git_hub_id,
            display_name: member.name,
            avatar_url: member.image_url,
            follower_count: member.follower_count,
            following_count: member.following,
            register_completed: response.register_completed,
            token: Some(response.token),
        }
    }
}

/// Logged-in status, derived purely from token presence.
#[must_use]
pub fn is_logged_in(session: &Session) -> bool {
    session.token.is_some()
}

/// Logged-in status before and after a session write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionChange {
    pub was_logged_in: bool,
    pub is_logged_in: bool,
}

impl SessionChange {
    #[must_use]
    pub fn logged_out(self) -> bool {
        self.was_logged_in && !self.is_logged_in
    }

    #[must_use]
    pub fn logged_in(self) -> bool {
        !self.was_logged_in && self.is_logged_in
    }
}

/// Shared handle to the process-wide session.
#[derive(Clone)]
pub struct SessionState {
    session: ArcRwSignal<Session>,
    logged_in: ArcMemo<bool>,
}

impl Default for SessionState {
    fn default() -> Self {
        let session = ArcRwSignal::new(Session::default());
        let reader = session.clone();
        let logged_in = ArcMemo::new(move |_| reader.with(is_logged_in));
        Self { session, logged_in }
    }
}

impl SessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> Session {
        self.session.get()
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.logged_in.get()
    }

    /// Memo over [`is_logged_in`]; it only notifies when the status flips.
    #[must_use]
    pub fn logged_in(&self) -> ArcMemo<bool> {
        self.logged_in.clone()
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.session.with_untracked(|session| session.token.clone())
    }

    /// Replace the session with the identity from a login response.
    pub fn login(&self, response: LoginResponse) {
        self.replace(Session::from_login(response));
    }

    /// Clear the session in full.
    pub fn logout(&self) {
        self.replace(Session::default());
    }

    fn replace(&self, next: Session) {
        let change = SessionChange {
            was_logged_in: self.session.with_untracked(is_logged_in),
            is_logged_in: is_logged_in(&next),
        };
        self.session.set(next);
        if change.logged_in() {
            leptos::logging::log!("session: logged in");
        } else if change.logged_out() {
            leptos::logging::log!("session: logged out");
        }
    }
}

impl std::fmt::Debug for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionState")
            .field("is_logged_in", &self.logged_in.get_untracked())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// ACTIONS
// =============================================================================

/// Exchange an OAuth code for a session and store it.
///
/// # Errors
///
/// Returns the API error when the exchange fails; the session is untouched.
pub async fn login<A: ReviewApi>(api: &A, session: &SessionState, code: &str) -> Result<(), ApiError> {
    let response = api.login(code.to_owned()).await?;
    session.login(response);
    Ok(())
}

/// Log out. The local session is cleared even when the API call fails.
pub async fn logout<A: ReviewApi>(api: &A, session: &SessionState) {
    if let Err(e) = api.logout().await {
        leptos::logging::warn!("logout request failed: {e}");
    }
    session.logout();
}
