//! Debounced auto-save scheduling.
//!
//! [`AutoSave`] drives the editor's inactivity commit: every keystroke
//! (re)arms two timers, a long *commit delay* and a short *typing grace*
//! window. When the commit delay elapses with no further keystrokes, and
//! the grace window has passed, and auto-save is enabled, the supplied
//! commit closure runs. A keystroke inside either window supersedes both
//! timers.
//!
//! The session moves through four phases: idle, typing (grace window
//! open), pending (commit timer armed), and saving (commit running).
//! Typing and pending are tracked here; the saving phase and its
//! per-index in-flight guard live in [`crate::editor`], which also guards
//! explicit saves.
//!
//! Cancellation is by epoch: each keystroke bumps a counter and spawned
//! timer tasks capture the value they were armed under. A timer that
//! wakes under a newer epoch was superseded and does nothing. This is how
//! "cancel prior timer" is expressed without holding task handles.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Timing and gating configuration for auto-save.
#[derive(Debug, Clone)]
pub struct AutoSaveConfig {
    /// Whether the inactivity commit path is active at all.
    pub enabled: bool,
    /// Inactivity window after the last keystroke before a commit fires.
    pub commit_delay: Duration,
    /// Grace window after a keystroke during which commits are suppressed.
    pub typing_grace: Duration,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            commit_delay: Duration::from_secs(4),
            typing_grace: Duration::from_millis(500),
        }
    }
}

/// Debounce scheduler for field commits.
///
/// Timer callbacks are spawned on the ambient tokio runtime; constructing
/// an `AutoSave` is cheap, but [`AutoSave::keystroke`] must be called from
/// within a runtime.
#[derive(Debug)]
pub struct AutoSave {
    commit_delay: Duration,
    typing_grace: Duration,
    state: Arc<Mutex<TimerState>>,
}

#[derive(Debug)]
struct TimerState {
    epoch: u64,
    typing: bool,
    enabled: bool,
}

impl AutoSave {
    /// Create a scheduler with the given configuration.
    #[must_use]
    pub fn new(config: &AutoSaveConfig) -> Self {
        AutoSave {
            commit_delay: config.commit_delay,
            typing_grace: config.typing_grace,
            state: Arc::new(Mutex::new(TimerState {
                epoch: 0,
                typing: false,
                enabled: config.enabled,
            })),
        }
    }

    /// Record a keystroke and (re)arm both timers.
    ///
    /// `commit` runs once the commit delay elapses, provided no further
    /// keystroke arrived, the typing grace has passed, and auto-save is
    /// enabled. At most one armed commit exists at a time; earlier armed
    /// commits are superseded.
    pub fn keystroke<F, Fut>(&self, commit: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let epoch = {
            let mut state = self.state.lock();
            state.epoch += 1;
            state.typing = true;
            state.epoch
        };
        trace!(epoch, "keystroke");

        let state = Arc::clone(&self.state);
        let typing_grace = self.typing_grace;
        tokio::spawn(async move {
            tokio::time::sleep(typing_grace).await;
            let mut state = state.lock();
            if state.epoch == epoch {
                state.typing = false;
            }
        });

        let state = Arc::clone(&self.state);
        let commit_delay = self.commit_delay;
        tokio::spawn(async move {
            tokio::time::sleep(commit_delay).await;
            {
                let state = state.lock();
                if state.epoch != epoch || state.typing || !state.enabled {
                    trace!(epoch, "armed commit superseded or suppressed");
                    return;
                }
            }
            commit().await;
        });
    }

    /// Invalidate all armed timers.
    ///
    /// Called on explicit cancel, on teardown, and after a successful
    /// mutation (the buffers an armed commit would have flushed are gone).
    pub fn cancel_all(&self) {
        let mut state = self.state.lock();
        state.epoch += 1;
        state.typing = false;
    }

    /// Toggle the inactivity commit path. Armed timers observe the flag
    /// at fire time.
    pub fn set_enabled(&self, enabled: bool) {
        self.state.lock().enabled = enabled;
    }

    /// Whether the inactivity commit path is active.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// Whether a typing grace window is currently open.
    #[must_use]
    pub fn is_typing(&self) -> bool {
        self.state.lock().typing
    }
}
