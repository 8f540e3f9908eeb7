//! Observable [`State`] of the [`Service`] session.
//!
//! [`Service`]: crate::Service

use tokio::sync::watch;

use crate::domain::{
    user::{self, session},
    User,
};

/// Snapshot of the current session state.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct State {
    /// [`Phase`] of the session lifecycle.
    pub phase: Phase,

    /// Indicator whether an operation upon the session is in flight.
    pub is_loading: bool,
}

impl State {
    /// Indicates whether a [`User`] is signed in.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self.phase, Phase::Authenticated(_))
    }

    /// Returns the [`Session`] of the signed in [`User`], if any.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match &self.phase {
            Phase::Authenticated(s) => Some(s),
            Phase::Uninitialized | Phase::Restoring | Phase::Unauthenticated => {
                None
            }
        }
    }

    /// Returns the signed in [`User`], if any.
    #[must_use]
    pub fn current_user(&self) -> Option<&User> {
        self.session().map(|s| &s.user)
    }

    /// Indicates whether the signed in [`User`] is an administrator.
    ///
    /// Always `false` if nobody is signed in.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.current_user()
            .is_some_and(|u| u.role == user::Role::Admin)
    }

    /// Indicates whether the signed in [`User`] is a moderator.
    ///
    /// Always `false` if nobody is signed in.
    #[must_use]
    pub fn is_moderator(&self) -> bool {
        self.current_user()
            .is_some_and(|u| u.role == user::Role::Moderator)
    }
}

/// Phase of the session lifecycle.
///
/// ```text
/// Uninitialized -> Restoring -> Authenticated <-> Unauthenticated
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum Phase {
    /// Session has not been restored from the storage yet.
    #[default]
    Uninitialized,

    /// Session is being restored from the storage.
    Restoring,

    /// [`User`] is signed in.
    Authenticated(Session),

    /// Nobody is signed in.
    Unauthenticated,
}

/// Session of a signed in [`User`].
///
/// Exists only while both its [`session::Token`] and its [`User`] are
/// persisted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Session {
    /// Persisted access [`session::Token`].
    pub token: session::Token,

    /// Signed in [`User`].
    pub user: User,

    /// [`DateTime`] when the [`session::Token`] expires.
    ///
    /// [`DateTime`]: common::DateTime
    pub expires_at: session::ExpirationDateTime,
}

/// Guard marking the [`State`] as loading for its lifetime.
///
/// Dropping the guard without [`Loading::finish()`]ing it resets the loading
/// flag, keeping the [`Phase`] untouched.
#[derive(Debug)]
pub(crate) struct Loading<'s> {
    /// [`watch::Sender`] of the guarded [`State`].
    state: &'s watch::Sender<State>,
}

impl<'s> Loading<'s> {
    /// Marks the provided [`State`] as loading, optionally moving it into the
    /// provided [`Phase`].
    pub(crate) fn start(
        state: &'s watch::Sender<State>,
        phase: Option<Phase>,
    ) -> Self {
        state.send_modify(|s| {
            s.is_loading = true;
            if let Some(phase) = phase {
                s.phase = phase;
            }
        });
        Self { state }
    }

    /// Moves the guarded [`State`] into the provided [`Phase`] and resets the
    /// loading flag in a single notification.
    pub(crate) fn finish(self, phase: Phase) {
        self.state.send_modify(|s| {
            s.phase = phase;
            s.is_loading = false;
        });
    }
}

impl Drop for Loading<'_> {
    fn drop(&mut self) {
        _ = self.state.send_if_modified(|s| {
            let was_loading = s.is_loading;
            s.is_loading = false;
            was_loading
        });
    }
}

#[cfg(test)]
mod spec {
    use tokio::sync::watch;

    use super::{Loading, Phase, State};

    #[test]
    fn nobody_is_privileged_when_signed_out() {
        for phase in [
            Phase::Uninitialized,
            Phase::Restoring,
            Phase::Unauthenticated,
        ] {
            let state = State {
                phase,
                is_loading: false,
            };

            assert!(!state.is_authenticated());
            assert!(!state.is_admin());
            assert!(!state.is_moderator());
            assert!(state.current_user().is_none());
        }
    }

    #[test]
    fn loading_is_reset_on_drop() {
        let (tx, rx) = watch::channel(State::default());

        {
            let _guard = Loading::start(&tx, Some(Phase::Restoring));
            assert!(rx.borrow().is_loading);
            assert_eq!(rx.borrow().phase, Phase::Restoring);
        }

        assert!(!rx.borrow().is_loading);
        assert_eq!(rx.borrow().phase, Phase::Restoring);
    }

    #[test]
    fn finish_updates_phase_and_loading_together() {
        let (tx, mut rx) = watch::channel(State::default());

        let guard = Loading::start(&tx, None);
        rx.mark_unchanged();
        guard.finish(Phase::Unauthenticated);

        assert!(rx.has_changed().unwrap());
        assert_eq!(
            *rx.borrow_and_update(),
            State {
                phase: Phase::Unauthenticated,
                is_loading: false,
            },
        );
        assert!(!rx.has_changed().unwrap());
    }
}
