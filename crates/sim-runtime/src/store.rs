//! Tick-scoped transaction manager over the canonical world state.

use sim_core::WorldState;
use tracing::warn;

use crate::SimError;

/// Owns the single canonical [`WorldState`] plus, while a tick is open,
/// the working copy every mutation targets.
///
/// Readers always observe either the fully-committed pre-tick state (from
/// outside a tick) or the working copy with every mutation applied so far
/// (from inside it) — never a mix of pre- and post-tick values.
#[derive(Debug)]
pub struct WorldStore {
    canonical: WorldState,
    working: Option<WorldState>,
}

impl WorldStore {
    pub fn new(world: WorldState) -> Self {
        Self {
            canonical: world,
            working: None,
        }
    }

    pub fn in_tick(&self) -> bool {
        self.working.is_some()
    }

    /// Open the tick transaction by snapshotting the canonical state into
    /// the working copy. Opening twice is a programmer error.
    pub fn begin_tick(&mut self) -> Result<(), SimError> {
        if self.working.is_some() {
            return Err(SimError::TransactionAlreadyOpen);
        }
        self.working = Some(self.canonical.clone());
        Ok(())
    }

    /// Install the working copy as the new canonical state.
    pub fn end_tick(&mut self) -> Result<(), SimError> {
        let committed = self.working.take().ok_or(SimError::NoOpenTransaction)?;
        self.canonical = committed;
        Ok(())
    }

    /// The state reads and mutations currently target.
    pub fn state(&self) -> &WorldState {
        self.working.as_ref().unwrap_or(&self.canonical)
    }

    /// Owned snapshot of [`state`](Self::state).
    pub fn snapshot(&self) -> WorldState {
        self.state().clone()
    }

    /// Apply a mutation to the working copy, or run an implicit
    /// single-mutation transaction (apply and commit immediately) when no
    /// tick is open — the path player-issued commands take.
    ///
    /// A closure returning `None` signals an invariant violation: the
    /// mutation is logged and dropped, and the prior state stays intact.
    /// It is never silently substituted.
    pub fn mutate<F>(&mut self, label: &str, f: F)
    where
        F: FnOnce(WorldState) -> Option<WorldState>,
    {
        match self.working.take() {
            Some(current) => {
                let backup = current.clone();
                match f(current) {
                    Some(next) => self.working = Some(next),
                    None => {
                        warn!(mutation = label, "mutation returned no state; dropped");
                        self.working = Some(backup);
                    }
                }
            }
            None => match f(self.canonical.clone()) {
                Some(next) => self.canonical = next,
                None => warn!(mutation = label, "mutation returned no state; dropped"),
            },
        }
    }
}
