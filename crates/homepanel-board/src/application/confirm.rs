//! Two-step confirmation for destructive actions.
//!
//! Deleting or renaming a room does not open a modal dialog.  The first press
//! *arms* the action; a second press on the same action within the confirm
//! window executes it.  If the window lapses the gate silently reverts, and
//! the next press arms again.
//!
//! ```text
//! press(A) ──► Armed(A) ──press(A) within window──► Confirmed
//!                 │
//!                 ├──press(A) after window──► Armed(A)   (re-armed)
//!                 └──press(B)───────────────► Armed(B)   (A forgotten)
//! ```
//!
//! Time is passed in explicitly so the gate stays deterministic under test.

use std::time::{Duration, Instant};

/// Result of pressing the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmState {
    /// First press: the action is armed until `expires_at`.
    Armed { expires_at: Instant },
    /// Second press within the window: go ahead.
    Confirmed,
}

/// Arm/confirm gate for actions identified by `K`.
#[derive(Debug)]
pub struct ConfirmGate<K> {
    window: Duration,
    armed: Option<(K, Instant)>,
}

impl<K: PartialEq> ConfirmGate<K> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            armed: None,
        }
    }

    pub fn press(&mut self, action: K, now: Instant) -> ConfirmState {
        if self.is_armed(&action, now) {
            self.armed = None;
            return ConfirmState::Confirmed;
        }
        self.armed = Some((action, now));
        ConfirmState::Armed {
            expires_at: now + self.window,
        }
    }

    /// `true` while `action` is armed and its window has not lapsed.
    pub fn is_armed(&self, action: &K, now: Instant) -> bool {
        match &self.armed {
            Some((armed, at)) => armed == action && now.saturating_duration_since(*at) <= self.window,
            None => false,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
