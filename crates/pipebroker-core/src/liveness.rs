//! Shared liveness flag for monitored remote peers.
//!
//! A [`LivenessCell`] shadows one remote peer's connectivity. It starts alive
//! and transitions to dead exactly once; a `false -> true` transition is
//! impossible. Clones share state, so a death observed through any clone is
//! visible through all of them.
//!
//! The flip itself is restricted by construction: `LivenessCell` exposes no
//! public mutator. The only way to mark a cell dead is through the
//! [`DeathNotice`] created from it, which is handed to the transport layer
//! when monitoring starts and fired from its disconnect path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

/// A shared one-way alive/dead flag for one monitored remote peer.
///
/// # Example
///
/// ```
/// use pipebroker_core::liveness::LivenessCell;
///
/// let cell = LivenessCell::new();
/// let notice = cell.death_notice();
/// assert!(cell.is_alive());
///
/// // Transport observed a disconnect
/// notice.notify();
/// assert!(!cell.is_alive());
/// ```
#[derive(Debug, Clone)]
pub struct LivenessCell {
    alive: Arc<AtomicBool>,
}

impl LivenessCell {
    /// Create a new cell in the alive state.
    pub fn new() -> Self {
        Self {
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Check whether the monitored peer is still considered connected.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Create the death notice bound to this cell.
    ///
    /// The notice holds the cell weakly: the cell lives exactly as long as
    /// its handles, and a notice whose handles are all gone has nothing left
    /// to observe it.
    pub fn death_notice(&self) -> DeathNotice {
        DeathNotice {
            alive: Arc::downgrade(&self.alive),
        }
    }
}

impl Default for LivenessCell {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot notification that flips a [`LivenessCell`] to dead.
///
/// Handed to the transport layer at monitoring time and fired from whatever
/// task observes the disconnect. Firing is idempotent: a second `notify` on
/// the same cell is a no-op.
#[derive(Debug, Clone)]
pub struct DeathNotice {
    alive: Weak<AtomicBool>,
}

impl DeathNotice {
    /// Mark the peer dead. Side-effect-free if already dead or if no cell
    /// remains to observe the death.
    pub fn notify(&self) {
        if let Some(alive) = self.alive.upgrade() {
            alive.store(false, Ordering::SeqCst);
        }
    }

    /// Whether any cell still observes this notice.
    ///
    /// A transport holding a list of linked notices can unlink the ones
    /// whose handles have all been dropped; without that, a long-lived
    /// connection accumulates one dead entry per discarded handle.
    pub fn has_observers(&self) -> bool {
        self.alive.strong_count() > 0
    }
}
