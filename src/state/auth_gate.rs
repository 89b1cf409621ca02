//! Login gate in front of the review composer.
//!
//! SYSTEM CONTEXT
//! ==============
//! The floating "write a review" button goes through [`AuthGate::attempt_open`].
//! Logged-out users get a blocking sign-in notice and nothing else happens.
//! The gate also runs an effect over the session's logged-in memo: when a
//! logged-in user logs out, an open or opening sheet is force-closed on the
//! next tick without any user action.

#[cfg(test)]
#[path = "auth_gate_test.rs"]
mod auth_gate_test;

use std::rc::Rc;

use leptos::prelude::{Effect, Get, GetUntracked, LocalStorage};

use crate::state::session::{SessionChange, SessionState};
use crate::state::sheet::Sheet;

pub const SIGN_IN_NOTICE: &str = "sign in to write a review";

/// Blocking user-facing message (alert, modal, toast).
pub trait Notice {
    fn show(&self, message: &str);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateOutcome {
    /// The user is logged in; the sheet was toggled.
    Toggled,
    /// The user is logged in but the sheet is mid-animation; nothing moved.
    Ignored,
    /// The user is logged out; the sign-in notice was shown.
    SignInRequired,
}

pub struct AuthGate {
    session: SessionState,
    sheet: Sheet,
    notice: Rc<dyn Notice>,
    logout_watch: Effect<LocalStorage>,
}

impl AuthGate {
    pub fn new(session: SessionState, sheet: Sheet, notice: Rc<dyn Notice>) -> Self {
        let logged_in = session.logged_in();
        let at_start = logged_in.get_untracked();
        let watched = sheet.clone();
        let logout_watch = Effect::new(move |was_logged_in: Option<bool>| {
            let is_logged_in = logged_in.get();
            let change = SessionChange { was_logged_in: was_logged_in.unwrap_or(at_start), is_logged_in };
            if change.logged_out() {
                watched.force_close();
            }
            is_logged_in
        });
        Self { session, sheet, notice, logout_watch }
    }

    /// Toggle the composer for a logged-in user, otherwise ask them to sign in.
    pub fn attempt_open(&self) -> GateOutcome {
        if self.session.is_logged_in() {
            if self.sheet.toggle() { GateOutcome::Toggled } else { GateOutcome::Ignored }
        } else {
            self.notice.show(SIGN_IN_NOTICE);
            GateOutcome::SignInRequired
        }
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in()
    }
}

impl Drop for AuthGate {
    fn drop(&mut self) {
        self.logout_watch.stop();
    }
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("session", &self.session)
            .field("sheet", &self.sheet)
            .finish_non_exhaustive()
    }
}
