//! Claim/unclaim lifecycle.
//!
//! Claiming grants recurring production and schedules the unclaim timer;
//! unclaiming (driven by that timer) revokes production and regenerates
//! the node's guardians and loot through the worldgen oracle, seeded so
//! regeneration replays identically.

use sim_core::{Coord, NodeKind, Timer};
use tracing::{debug, warn};

use crate::notify::NotifyCategory;
use crate::scheduler;
use crate::sim::Simulation;
use crate::SimError;

fn kind_label(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Town => "town",
        NodeKind::Village => "village",
        NodeKind::Cave => "cave",
        NodeKind::Dungeon => "dungeon",
        NodeKind::Castle => "castle",
        NodeKind::Empty => "empty ground",
    }
}

impl Simulation {
    /// Claim a node for the player. Claiming an already-held node is a
    /// no-op; an unknown coordinate is a hard error (a logic bug in the
    /// caller, not a timing issue).
    pub fn claim(&mut self, coord: Coord) -> Result<(), SimError> {
        let world = self.store.state();
        let node = world.node(coord).ok_or(SimError::UnknownNode(coord))?;
        if node.currently_claimed {
            debug!(%coord, "claim ignored; node already held");
            return Ok(());
        }
        let kind = node.kind;
        let permanent = node.permanently_claimed;
        let duration = self.claim_policy.claim_duration(node);
        let rates = sim_econ::production_rates(node.kind, node.element);
        let fire_tick = world.clock.num_ticks + duration;

        self.store.mutate("claim-node", move |mut w| {
            scheduler::cancel_unclaim(&mut w, coord);
            {
                let node = w.nodes.get_mut(&coord)?;
                node.currently_claimed = true;
                node.claim_count += 1;
                node.guardians.clear();
                node.loot.clear();
                node.unclaim_at_tick = if permanent { 0 } else { fire_tick };
            }
            if !permanent {
                scheduler::schedule(&mut w, Timer::UnclaimNode { coord }, fire_tick);
            }
            w.ledger.grant_production(coord, rates);
            Some(w)
        });
        self.bus.publish(
            NotifyCategory::Claim,
            format!("Claimed the {} at {coord}.", kind_label(kind)),
        );
        Ok(())
    }

    /// Revoke a lapsed claim. Invoked by the scheduler when an unclaim
    /// timer fires; a timer naming a vanished or unheld node is skipped
    /// with a log line so the drain keeps going.
    pub fn unclaim(&mut self, coord: Coord) -> Result<(), SimError> {
        let world = self.store.state();
        let Some(node) = world.node(coord) else {
            warn!(%coord, "unclaim skipped; node is not on the map");
            return Ok(());
        };
        if !node.currently_claimed {
            debug!(%coord, "unclaim ignored; node is not held");
            return Ok(());
        }
        let kind = node.kind;
        let key = format!(
            "unclaim:{}:{}:{}",
            coord.x, coord.y, world.clock.num_ticks
        );
        let mut rng = self.rng.stream(&key);
        let guardians = self.worldgen.regenerate_guardians(&mut rng, node);
        let loot = self.worldgen.regenerate_loot(&mut rng, node);

        self.store.mutate("unclaim-node", move |mut w| {
            w.ledger.revoke_production(&coord);
            let node = w.nodes.get_mut(&coord)?;
            node.currently_claimed = false;
            node.unclaim_at_tick = 0;
            node.claim_count = node.claim_count.saturating_sub(1);
            node.guardians = guardians;
            node.loot = loot;
            Some(w)
        });
        self.bus.publish(
            NotifyCategory::Unclaim,
            format!("The {} at {coord} has been lost.", kind_label(kind)),
        );
        Ok(())
    }
}
