#![deny(warnings)]

//! Simulation runtime: the transactional world store, the tick-indexed
//! timer scheduler, the claim/unclaim and travel lifecycles, and the tick
//! orchestrator that drives them in a fixed order once per burst.

mod lifecycle;
mod notify;
pub mod scheduler;
mod sim;
mod store;
mod travel;

pub use notify::{
    CollectingSink, Notification, NotificationBus, NotificationSink, NotifyCategory, TracingSink,
};
pub use sim::{Simulation, TickReport};
pub use store::WorldStore;
pub use travel::{location_recovery, travel_ticks};

use sim_core::{Coord, WorldState};
use thiserror::Error;

/// Hard failures: logic bugs upstream, not data or timing issues.
///
/// Timing and content-lookup problems (a timer naming a vanished node, a
/// festival id nobody knows) are recovered locally — skipped and logged —
/// so one bad timer cannot stall the scheduler. These variants, by
/// contrast, abort the current call.
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    #[error("a tick transaction is already open")]
    TransactionAlreadyOpen,
    #[error("no tick transaction is open")]
    NoOpenTransaction,
    #[error("unknown node at {0}")]
    UnknownNode(Coord),
    #[error("hero party has no position")]
    PartyUnplaced,
}

/// Receives the committed world after each processed burst.
pub trait Persister {
    fn persist(&mut self, world: &WorldState) -> anyhow::Result<()>;
}

impl Persister for persistence::SnapshotFile {
    fn persist(&mut self, world: &WorldState) -> anyhow::Result<()> {
        self.save(world)?;
        Ok(())
    }
}
