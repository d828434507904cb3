//! Travel subsystem: starting a move, advancing it, and arrival.
//!
//! State machine: `Idle -> Traveling` on [`Simulation::start_travel`],
//! `-> Idle` on arrival. Reaching zero remaining ticks is the only path
//! that updates the party position.

use sim_core::{Coord, TravelState};
use tracing::warn;

use crate::notify::NotifyCategory;
use crate::sim::Simulation;
use crate::SimError;

/// Travel time from Euclidean distance, average party speed and the
/// external modifier, floored at one tick. Higher speed shortens the
/// trip; the modifier stretches or shrinks it.
pub fn travel_ticks(distance: f64, avg_speed: f64, multiplier: f64) -> u32 {
    let speed = if avg_speed > 0.0 { avg_speed } else { 1.0 };
    let raw = (distance * multiplier / speed).ceil();
    if raw.is_nan() || raw < 1.0 {
        return 1;
    }
    if raw > f64::from(u32::MAX) {
        u32::MAX
    } else {
        raw as u32
    }
}

/// Ticks the party spends securing a freshly-reached location: none on
/// friendly ground, otherwise scaled by the encounter level.
pub fn location_recovery(encounter_level: u32, claimed: bool) -> u32 {
    if claimed {
        0
    } else {
        (encounter_level + 1) * 5
    }
}

impl Simulation {
    /// Begin moving the party toward `destination`.
    ///
    /// An in-progress move is replaced. The decision engine never issues a
    /// replacement, but the subsystem stays robust if a caller does.
    pub fn start_travel(&mut self, destination: Coord) -> Result<(), SimError> {
        let world = self.store.state();
        if world.node(destination).is_none() {
            return Err(SimError::UnknownNode(destination));
        }
        let from = world.party.position.ok_or(SimError::PartyUnplaced)?;
        let distance = from.distance(destination);
        let multiplier = self.travel_mod.travel_multiplier(world);
        let ticks = travel_ticks(distance, world.party.average_speed(), multiplier);

        self.store.mutate("start-travel", move |mut w| {
            w.party.travel = Some(TravelState {
                destination,
                ticks_remaining: ticks,
            });
            Some(w)
        });
        self.bus.publish(
            NotifyCategory::Travel,
            format!("The party sets out for {destination} ({ticks} ticks away)."),
        );
        Ok(())
    }

    /// Advance an in-progress move by a whole burst of ticks. On
    /// completion: commit the new position, clear the travel state, arm
    /// the location-recovery countdown and announce the arrival.
    pub(crate) fn advance_travel(&mut self, ticks: u64) {
        let Some(travel) = self.store.state().party.travel else {
            return;
        };
        let step = u32::try_from(ticks).unwrap_or(u32::MAX);
        let remaining = travel.ticks_remaining.saturating_sub(step);
        if remaining > 0 {
            self.store.mutate("advance-travel", move |mut w| {
                let t = w.party.travel.as_mut()?;
                t.ticks_remaining = remaining;
                Some(w)
            });
            return;
        }

        let destination = travel.destination;
        let recovery = self
            .store
            .state()
            .node(destination)
            .map(|n| location_recovery(n.encounter_level, n.currently_claimed));
        match recovery {
            Some(recovery) => {
                self.store.mutate("arrive", move |mut w| {
                    w.party.travel = None;
                    w.party.position = Some(destination);
                    w.party.recovery_remaining = recovery;
                    Some(w)
                });
                self.bus.publish(
                    NotifyCategory::Arrival,
                    format!("The party arrives at {destination}."),
                );
            }
            None => {
                // Content error: destination vanished from the map. Drop
                // the move rather than stall the tick.
                warn!(%destination, "travel destination is no longer on the map");
                self.store.mutate("abort-travel", |mut w| {
                    w.party.travel = None;
                    Some(w)
                });
            }
        }
    }
}
