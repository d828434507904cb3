//! Tick-indexed timer scheduling over the world's action clock.
//!
//! The pending table lives inside [`WorldState`] so timers commit and
//! persist with everything else. Entries fire in `(fire_tick, seq)` order:
//! earlier ticks first, insertion order within a tick. The orchestrator
//! drains the table one tick at a time — never with a single "everything
//! `<= now`" sweep — so a timer due at T+1 cannot be skipped or reordered
//! by a catch-up burst that jumps to T+5.

use sim_core::{Coord, Timer, TimerEntry, TimerId, WorldState};

/// Insert a timer firing at `fire_tick`; returns its id.
pub fn schedule(world: &mut WorldState, timer: Timer, fire_tick: u64) -> TimerId {
    let clock = &mut world.clock;
    let id = TimerId(clock.next_timer_id);
    clock.next_timer_id += 1;
    let seq = clock.next_seq;
    clock.next_seq += 1;
    clock.timers.push(TimerEntry {
        id,
        fire_tick,
        seq,
        timer,
    });
    id
}

/// Remove a pending timer; returns whether anything was removed.
pub fn cancel(world: &mut WorldState, id: TimerId) -> bool {
    let before = world.clock.timers.len();
    world.clock.timers.retain(|e| e.id != id);
    world.clock.timers.len() != before
}

/// Drop any pending unclaim timers for a node (a re-claim replaces them);
/// returns how many were removed.
pub fn cancel_unclaim(world: &mut WorldState, coord: Coord) -> usize {
    let before = world.clock.timers.len();
    world
        .clock
        .timers
        .retain(|e| !matches!(e.timer, Timer::UnclaimNode { coord: c } if c == coord));
    before - world.clock.timers.len()
}

/// Remove and return every timer due at the current clock value, ordered
/// by `(fire_tick, seq)`.
pub fn drain_due(world: &mut WorldState) -> Vec<TimerEntry> {
    let now = world.clock.num_ticks;
    let mut due = Vec::new();
    let mut pending = Vec::with_capacity(world.clock.timers.len());
    for entry in world.clock.timers.drain(..) {
        if entry.fire_tick <= now {
            due.push(entry);
        } else {
            pending.push(entry);
        }
    }
    world.clock.timers = pending;
    due.sort_by_key(|e| (e.fire_tick, e.seq));
    due
}
