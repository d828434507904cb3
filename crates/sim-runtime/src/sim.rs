//! Tick orchestrator.
//!
//! One `process_ticks` invocation handles a whole (possibly multiplied)
//! burst: the per-subsystem passes each run exactly once against the open
//! transaction with the full tick count — their effects are plain
//! arithmetic over the burst — while the timer table is drained strictly
//! one tick at a time. That asymmetry is deliberate: accrual scales,
//! timers do not.

use modkit::FestivalSpec;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use sim_core::env::{
    ClaimPolicy, DefaultClaimPolicy, DefaultWorldgen, FestivalTravelModifier, TravelModifier,
    WorldgenOracle,
};
use sim_core::{
    BuildingKind, CurrencyKind, FestivalId, NodeKind, RngProvider, SimConfig, Timer, TimerEntry,
    WorldState,
};
use tracing::{debug, warn};

use crate::notify::{NotificationBus, NotificationSink, NotifyCategory};
use crate::scheduler;
use crate::store::WorldStore;
use crate::{Persister, SimError};

/// KPI summary of one `process_ticks` invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    /// Ticks processed by this invocation.
    pub ticks_run: u64,
    /// World clock after the commit.
    pub num_ticks: u64,
    /// Timers drained and dispatched during the burst.
    pub timers_fired: usize,
    /// Nodes currently held.
    pub claimed_nodes: usize,
    /// Gold balance after the commit.
    pub gold: Decimal,
}

/// The simulation core: canonical state behind the tick transaction
/// manager, the scheduler, the collaborator seams and the notification
/// bus.
pub struct Simulation {
    pub(crate) store: WorldStore,
    pub(crate) bus: NotificationBus,
    pub(crate) rng: RngProvider,
    pub(crate) claim_policy: Box<dyn ClaimPolicy>,
    pub(crate) worldgen: Box<dyn WorldgenOracle>,
    pub(crate) travel_mod: Box<dyn TravelModifier>,
    festival_schedule: Vec<FestivalSpec>,
    persister: Option<Box<dyn Persister>>,
    config: SimConfig,
}

impl Simulation {
    /// Build a simulation over `world` with the default collaborators.
    pub fn new(world: WorldState, config: SimConfig) -> Self {
        Self {
            store: WorldStore::new(world),
            bus: NotificationBus::new(),
            rng: RngProvider::new(config.rng_seed),
            claim_policy: Box::new(DefaultClaimPolicy),
            worldgen: Box::new(DefaultWorldgen),
            travel_mod: Box::new(FestivalTravelModifier),
            festival_schedule: Vec::new(),
            persister: None,
            config,
        }
    }

    pub fn with_claim_policy(mut self, policy: Box<dyn ClaimPolicy>) -> Self {
        self.claim_policy = policy;
        self
    }

    pub fn with_worldgen(mut self, worldgen: Box<dyn WorldgenOracle>) -> Self {
        self.worldgen = worldgen;
        self
    }

    pub fn with_travel_modifier(mut self, travel_mod: Box<dyn TravelModifier>) -> Self {
        self.travel_mod = travel_mod;
        self
    }

    pub fn with_festival_schedule(mut self, schedule: Vec<FestivalSpec>) -> Self {
        self.festival_schedule = schedule;
        self
    }

    pub fn set_persister(&mut self, persister: Box<dyn Persister>) {
        self.persister = Some(persister);
    }

    pub fn attach_sink(&mut self, sink: Box<dyn NotificationSink>) {
        self.bus.attach(sink);
    }

    pub fn config(&self) -> SimConfig {
        self.config
    }

    /// Read-only view of the current state: the working copy while a tick
    /// transaction is open, the canonical state otherwise.
    pub fn world(&self) -> &WorldState {
        self.store.state()
    }

    /// Owned snapshot of [`world`](Self::world).
    pub fn snapshot(&self) -> WorldState {
        self.store.snapshot()
    }

    /// The sanctioned mutation path for external collaborators (player
    /// commands, combat, worldgen): applies inside the open tick, or as
    /// an implicit single-mutation transaction outside one.
    pub fn with_transaction<F>(&mut self, label: &str, f: F)
    where
        F: FnOnce(WorldState) -> Option<WorldState>,
    {
        self.store.mutate(label, f);
    }

    /// Scheduler surface for collaborators: defer an action to
    /// `fire_tick`.
    pub fn schedule_timer(&mut self, timer: Timer, fire_tick: u64) {
        self.store.mutate("schedule-timer", move |mut w| {
            scheduler::schedule(&mut w, timer, fire_tick);
            Some(w)
        });
    }

    /// Process a burst of simulated ticks (already speed-multiplied by
    /// the caller).
    pub fn process_ticks(&mut self, total_ticks: u64) -> Result<TickReport, SimError> {
        if self.store.state().paused {
            debug!("simulation is paused; ignoring tick burst");
            return Ok(self.report(0, 0));
        }
        if !self.store.state().victory_claimed && self.store.state().all_claimable_claimed() {
            self.store.mutate("claim-victory", |mut w| {
                w.victory_claimed = true;
                w.paused = true;
                Some(w)
            });
            self.bus.publish(
                NotifyCategory::Victory,
                "Every claimable node is held; the realm is at peace.",
            );
            return Ok(self.report(0, 0));
        }
        if total_ticks == 0 {
            return Ok(self.report(0, 0));
        }

        self.store.begin_tick()?;

        // Scalable passes, once each against the open transaction.
        self.accrue_currency(total_ticks);
        self.town_bookkeeping(total_ticks);
        self.advance_travel(total_ticks);
        self.autotravel()?;
        self.exploration_bookkeeping(total_ticks);
        self.festival_bookkeeping(total_ticks);

        // Timer drain, one tick at a time.
        let mut fired = 0;
        for _ in 0..total_ticks {
            self.store.mutate("advance-clock", |mut w| {
                w.clock.num_ticks += 1;
                Some(w)
            });
            let mut due = Vec::new();
            self.store.mutate("drain-timers", |mut w| {
                due = scheduler::drain_due(&mut w);
                Some(w)
            });
            fired += due.len();
            self.run_actions(due)?;
        }

        self.store.end_tick()?;

        if let Some(persister) = self.persister.as_mut() {
            if let Err(e) = persister.persist(self.store.state()) {
                warn!(error = %e, "failed to persist committed world");
            }
        }
        Ok(self.report(total_ticks, fired))
    }

    /// Dispatch drained timers to their handlers in drain order.
    fn run_actions(&mut self, entries: Vec<TimerEntry>) -> Result<(), SimError> {
        for entry in entries {
            match entry.timer {
                Timer::UnclaimNode { coord } => self.unclaim(coord)?,
                Timer::EndFestival { festival } => self.end_festival(festival),
            }
        }
        Ok(())
    }

    fn end_festival(&mut self, id: FestivalId) {
        let Some(name) = self.store.state().festivals.get(id).map(|f| f.name.clone()) else {
            warn!(festival = id.0, "end-festival timer for unknown festival; skipped");
            return;
        };
        self.store.mutate("end-festival", move |mut w| {
            let festival = w.festivals.get_mut(id)?;
            festival.active = false;
            Some(w)
        });
        self.bus
            .publish(NotifyCategory::Festival, format!("The {name} has ended."));
    }

    /// Currency accrual: recurring production × burst length × festival
    /// multiplier, credited as one scalable pass.
    fn accrue_currency(&mut self, ticks: u64) {
        let world = self.store.state();
        let multiplier = sim_econ::festival_production_multiplier(world.festivals.active());
        match sim_econ::tick_income(&world.ledger, multiplier, ticks) {
            Ok(income) => {
                if income.is_empty() {
                    return;
                }
                self.store.mutate("accrue-currency", move |mut w| {
                    for (kind, amount) in income {
                        w.ledger.credit(kind, amount);
                    }
                    Some(w)
                });
            }
            Err(e) => warn!(error = %e, "currency accrual skipped"),
        }
    }

    /// Town bookkeeping: heroes resting in a town heal at the Inn rate.
    fn town_bookkeeping(&mut self, ticks: u64) {
        let world = self.store.state();
        let in_town = matches!(world.current_node().map(|n| n.kind), Some(NodeKind::Town));
        if !in_town || world.party.is_traveling() || !world.party.any_below_max_health() {
            return;
        }
        let heal = sim_econ::heal_over(world.town.level(BuildingKind::Inn), ticks);
        self.store.mutate("town-recovery", move |mut w| {
            for hero in &mut w.party.heroes {
                hero.hp = hero.hp.saturating_add(heal).min(hero.max_hp);
            }
            Some(w)
        });
    }

    /// Apply the once-per-invocation autotravel decision: set or clear
    /// the idle status, or start the chosen trip. Status notifications
    /// fire only on change.
    fn autotravel(&mut self) -> Result<(), SimError> {
        match sim_ai::decide(self.store.state()) {
            sim_ai::Decision::Continue => Ok(()),
            sim_ai::Decision::Idle(reason) => {
                let status = reason.to_string();
                let changed =
                    self.store.state().party.idle_status.as_deref() != Some(status.as_str());
                if changed {
                    let publish = status.clone();
                    self.store.mutate("idle-status", move |mut w| {
                        w.party.idle_status = Some(status);
                        Some(w)
                    });
                    self.bus.publish(NotifyCategory::Idle, publish);
                }
                Ok(())
            }
            sim_ai::Decision::Travel(destination) => {
                if self.store.state().party.idle_status.is_some() {
                    self.store.mutate("clear-idle-status", |mut w| {
                        w.party.idle_status = None;
                        Some(w)
                    });
                }
                self.start_travel(destination)
            }
        }
    }

    /// Exploration bookkeeping: run down the location-recovery countdown
    /// armed on arrival. The exploration/combat collaborator takes over
    /// from there through the transaction surface.
    fn exploration_bookkeeping(&mut self, ticks: u64) {
        if self.store.state().party.recovery_remaining == 0 {
            return;
        }
        let step = u32::try_from(ticks).unwrap_or(u32::MAX);
        self.store.mutate("location-recovery", move |mut w| {
            w.party.recovery_remaining = w.party.recovery_remaining.saturating_sub(step);
            Some(w)
        });
    }

    /// Festival bookkeeping: register scheduled festivals whose start
    /// falls inside this burst and arm their end timers. Registration is
    /// idempotent by festival name.
    fn festival_bookkeeping(&mut self, ticks: u64) {
        let end_of_burst = self.store.state().clock.num_ticks + ticks;
        let due: Vec<FestivalSpec> = self
            .festival_schedule
            .iter()
            .filter(|s| {
                s.start_tick <= end_of_burst
                    && !self.store.state().festivals.known_by_name(&s.name)
            })
            .cloned()
            .collect();
        for spec in due {
            let ends_at = spec.start_tick + spec.duration;
            let production = Decimal::from_f64(spec.production_mult).unwrap_or(Decimal::ONE);
            let travel_mult = spec.travel_mult;
            let name = spec.name.clone();
            self.store.mutate("start-festival", move |mut w| {
                let id = w.festivals.register(name, production, travel_mult, ends_at);
                scheduler::schedule(&mut w, Timer::EndFestival { festival: id }, ends_at);
                Some(w)
            });
            self.bus.publish(
                NotifyCategory::Festival,
                format!("The {} begins!", spec.name),
            );
        }
    }

    fn report(&self, ticks_run: u64, timers_fired: usize) -> TickReport {
        let world = self.store.state();
        TickReport {
            ticks_run,
            num_ticks: world.clock.num_ticks,
            timers_fired,
            claimed_nodes: world
                .nodes
                .values()
                .filter(|n| n.currently_claimed)
                .count(),
            gold: world.ledger.balance(CurrencyKind::Gold),
        }
    }
}
