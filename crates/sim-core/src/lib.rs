#![deny(warnings)]

//! Core domain models and invariants for Hearthvale.
//!
//! This crate defines the serializable world state shared by every
//! simulation crate, with validation helpers to guarantee structural
//! invariants: a claimed node carries a live unclaim timer, hero health
//! never exceeds its maximum, currency balances stay non-negative.

pub mod env;
pub mod rng;

pub use rng::RngProvider;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Integer map coordinates; the unique key of a [`MapNode`].
///
/// Serialized as the string `"x,y"` so it can key JSON maps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another coordinate.
    pub fn distance(self, other: Coord) -> f64 {
        let dx = f64::from(self.x - other.x);
        let dy = f64::from(self.y - other.y);
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl FromStr for Coord {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (x, y) = s
            .split_once(',')
            .ok_or_else(|| ValidationError::InvalidCoord(s.to_string()))?;
        let parse = |v: &str| {
            v.trim()
                .parse::<i32>()
                .map_err(|_| ValidationError::InvalidCoord(s.to_string()))
        };
        Ok(Coord::new(parse(x)?, parse(y)?))
    }
}

impl Serialize for Coord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&format_args!("{},{}", self.x, self.y))
    }
}

impl<'de> Deserialize<'de> for Coord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// What stands (or once stood) at a map node.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum NodeKind {
    Town,
    Village,
    Cave,
    Dungeon,
    Castle,
    /// Nothing to claim here.
    Empty,
}

impl NodeKind {
    /// Whether the node participates in claiming (and the victory set).
    pub fn is_claimable(self) -> bool {
        !matches!(self, NodeKind::Empty)
    }
}

/// Elemental flavor of a node; drives the production mix of its claim.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Element {
    Neutral,
    Forest,
    Stone,
    Arcane,
}

/// Loot rarity tiers, ordered from most to least common.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

/// Identifier of a generated guardian.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct GuardianId(pub u64);

/// Identifier of a generated loot item.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LootId(pub u64);

/// Identifier of a registered festival.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct FestivalId(pub u64);

/// Identifier of a hero in the party.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct HeroId(pub u32);

/// Identifier of a pending timer entry.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TimerId(pub u64);

/// A loot reward waiting at a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LootDrop {
    pub id: LootId,
    pub rarity: Rarity,
}

/// A single location on the world map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapNode {
    /// Unique key on the map.
    pub coord: Coord,
    /// What stands here.
    pub kind: NodeKind,
    /// Elemental flavor, affecting production.
    pub element: Element,
    /// Whether the player currently holds this node.
    pub currently_claimed: bool,
    /// Exempt from unclaim timers (towns).
    pub permanently_claimed: bool,
    /// Running count of claims held on this node.
    pub claim_count: u32,
    /// Tick at which the current claim expires; 0 when none is scheduled.
    pub unclaim_at_tick: u64,
    /// Guardians defending the node while unclaimed.
    pub guardians: Vec<GuardianId>,
    /// Loot awaiting a successful claim.
    pub loot: Vec<LootDrop>,
    /// Difficulty rating compared against party level.
    pub encounter_level: u32,
}

impl MapNode {
    pub fn new(coord: Coord, kind: NodeKind, element: Element, encounter_level: u32) -> Self {
        Self {
            coord,
            kind,
            element,
            currently_claimed: false,
            permanently_claimed: false,
            claim_count: 0,
            unclaim_at_tick: 0,
            guardians: Vec::new(),
            loot: Vec::new(),
            encounter_level,
        }
    }

    /// The best rarity among the node's pending loot, if any.
    pub fn highest_loot_rarity(&self) -> Option<Rarity> {
        self.loot.iter().map(|l| l.rarity).max()
    }
}

/// A deferred action keyed by the tick at which it must fire.
///
/// Closed sum type: the scheduler dispatches with an exhaustive match, so
/// adding a timer kind is a compile-time-checked change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Timer {
    /// Stop a running festival.
    EndFestival { festival: FestivalId },
    /// Expire the claim on a node.
    UnclaimNode { coord: Coord },
}

/// A pending timer with its ordering keys.
///
/// Entries fire in `(fire_tick, seq)` order; `seq` is assigned at
/// insertion, so ties within a tick drain in registration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerEntry {
    pub id: TimerId,
    pub fire_tick: u64,
    pub seq: u64,
    pub timer: Timer,
}

/// The world clock and the pending-timer table it owns.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionClock {
    /// Monotonic count of simulated ticks.
    pub num_ticks: u64,
    /// Pending deferred actions, unordered; drained by `(fire_tick, seq)`.
    pub timers: Vec<TimerEntry>,
    /// Next timer id to hand out.
    pub next_timer_id: u64,
    /// Next insertion sequence number.
    pub next_seq: u64,
}

/// An in-progress party move. `ticks_remaining > 0` is the sole
/// definition of "the party is traveling".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelState {
    pub destination: Coord,
    pub ticks_remaining: u32,
}

/// Player-set appetite for dangerous destinations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTolerance {
    Low,
    Medium,
    High,
}

impl RiskTolerance {
    /// How far above average party level a node may sit and still pass
    /// the preference filter.
    pub fn max_level_delta(self) -> u32 {
        match self {
            RiskTolerance::Low => 0,
            RiskTolerance::Medium => 2,
            RiskTolerance::High => 5,
        }
    }
}

/// Player-set travel preferences consulted by the autotravel engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TravelPreferences {
    pub risk: RiskTolerance,
    /// Node kinds the party will travel to.
    pub node_kinds: BTreeSet<NodeKind>,
    /// Loot rarities worth traveling for.
    pub loot_rarities: BTreeSet<Rarity>,
    /// Nodes skipped after a failed attempt; de-prioritized, not excluded.
    pub too_hard: BTreeSet<Coord>,
}

impl Default for TravelPreferences {
    fn default() -> Self {
        Self {
            risk: RiskTolerance::Medium,
            node_kinds: [
                NodeKind::Town,
                NodeKind::Village,
                NodeKind::Cave,
                NodeKind::Dungeon,
                NodeKind::Castle,
            ]
            .into_iter()
            .collect(),
            loot_rarities: [
                Rarity::Common,
                Rarity::Uncommon,
                Rarity::Rare,
                Rarity::Epic,
                Rarity::Legendary,
            ]
            .into_iter()
            .collect(),
            too_hard: BTreeSet::new(),
        }
    }
}

impl TravelPreferences {
    pub fn allows_kind(&self, kind: NodeKind) -> bool {
        self.node_kinds.contains(&kind)
    }

    /// A node with no loot cannot be excluded on rarity grounds.
    pub fn allows_rarity(&self, highest: Option<Rarity>) -> bool {
        match highest {
            Some(r) => self.loot_rarities.contains(&r),
            None => true,
        }
    }

    pub fn mark_too_hard(&mut self, coord: Coord) {
        self.too_hard.insert(coord);
    }

    pub fn clear_too_hard(&mut self) {
        self.too_hard.clear();
    }
}

/// A single member of the hero party.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hero {
    pub id: HeroId,
    pub name: String,
    pub level: u32,
    pub hp: u32,
    pub max_hp: u32,
    /// Travel speed contribution; the party moves at the average.
    pub speed: f64,
}

/// The hero party: members, position, travel and status.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HeroParty {
    pub heroes: Vec<Hero>,
    /// Current position; `None` until placed by worldgen.
    pub position: Option<Coord>,
    /// In-progress move, if any.
    pub travel: Option<TravelState>,
    pub preferences: TravelPreferences,
    /// Set by the external exploration/combat collaborator.
    pub exploring: bool,
    /// Ticks left before a freshly-reached location is secured.
    pub recovery_remaining: u32,
    /// Human-readable reason the party is idle, for UI consumption.
    pub idle_status: Option<String>,
}

impl HeroParty {
    pub fn is_traveling(&self) -> bool {
        self.travel.map_or(false, |t| t.ticks_remaining > 0)
    }

    pub fn average_level(&self) -> f64 {
        if self.heroes.is_empty() {
            return 0.0;
        }
        let total: u64 = self.heroes.iter().map(|h| u64::from(h.level)).sum();
        total as f64 / self.heroes.len() as f64
    }

    /// Mean hero speed; 1.0 for an empty party so travel math stays sane.
    pub fn average_speed(&self) -> f64 {
        if self.heroes.is_empty() {
            return 1.0;
        }
        let total: f64 = self.heroes.iter().map(|h| h.speed).sum();
        total / self.heroes.len() as f64
    }

    pub fn all_defeated(&self) -> bool {
        !self.heroes.is_empty() && self.heroes.iter().all(|h| h.hp == 0)
    }

    pub fn any_below_max_health(&self) -> bool {
        self.heroes.iter().any(|h| h.hp < h.max_hp)
    }

    /// Party-wide health ratio in whole percent.
    pub fn recovery_percent(&self) -> u32 {
        let max: u64 = self.heroes.iter().map(|h| u64::from(h.max_hp)).sum();
        if max == 0 {
            return 100;
        }
        let hp: u64 = self.heroes.iter().map(|h| u64::from(h.hp)).sum();
        ((hp * 100) / max) as u32
    }
}

/// Currencies produced by claimed nodes.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum CurrencyKind {
    Gold,
    Lumber,
    Stone,
    Mana,
}

/// One recurring production grant from a claimed node.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductionEntry {
    pub currency: CurrencyKind,
    pub per_tick: Decimal,
}

/// Balances plus the recurring production granted by claimed nodes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrencyLedger {
    pub balances: BTreeMap<CurrencyKind, Decimal>,
    /// Recurring production keyed by the claimed node that grants it.
    pub production: BTreeMap<Coord, Vec<ProductionEntry>>,
}

impl CurrencyLedger {
    pub fn balance(&self, kind: CurrencyKind) -> Decimal {
        self.balances.get(&kind).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn credit(&mut self, kind: CurrencyKind, amount: Decimal) {
        *self.balances.entry(kind).or_insert(Decimal::ZERO) += amount;
    }

    pub fn grant_production(&mut self, coord: Coord, entries: Vec<ProductionEntry>) {
        self.production.insert(coord, entries);
    }

    pub fn revoke_production(&mut self, coord: &Coord) -> bool {
        self.production.remove(coord).is_some()
    }

    /// Total production rate of one currency across all claimed nodes.
    pub fn production_rate(&self, kind: CurrencyKind) -> Decimal {
        self.production
            .values()
            .flatten()
            .filter(|e| e.currency == kind)
            .map(|e| e.per_tick)
            .sum()
    }
}

/// Town buildings whose levels modify bookkeeping (the Inn drives hero
/// recovery).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum BuildingKind {
    Inn,
    Barracks,
    Workshop,
    Shrine,
}

/// Building levels of the home town.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TownState {
    pub buildings: BTreeMap<BuildingKind, u8>,
}

impl TownState {
    pub fn level(&self, kind: BuildingKind) -> u8 {
        self.buildings.get(&kind).copied().unwrap_or(0)
    }
}

/// A running or finished festival with its world-wide modifiers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Festival {
    pub id: FestivalId,
    pub name: String,
    /// Multiplier applied to currency production while active.
    pub production_multiplier: Decimal,
    /// Multiplier applied to travel time while active (below 1.0 = faster).
    pub travel_multiplier: f64,
    pub ends_at_tick: u64,
    pub active: bool,
}

/// Registry of festivals, past and present.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FestivalRegistry {
    pub festivals: BTreeMap<FestivalId, Festival>,
    pub next_id: u64,
}

impl FestivalRegistry {
    pub fn register(
        &mut self,
        name: String,
        production_multiplier: Decimal,
        travel_multiplier: f64,
        ends_at_tick: u64,
    ) -> FestivalId {
        let id = FestivalId(self.next_id);
        self.next_id += 1;
        self.festivals.insert(
            id,
            Festival {
                id,
                name,
                production_multiplier,
                travel_multiplier,
                ends_at_tick,
                active: true,
            },
        );
        id
    }

    pub fn get(&self, id: FestivalId) -> Option<&Festival> {
        self.festivals.get(&id)
    }

    pub fn get_mut(&mut self, id: FestivalId) -> Option<&mut Festival> {
        self.festivals.get_mut(&id)
    }

    pub fn active(&self) -> impl Iterator<Item = &Festival> {
        self.festivals.values().filter(|f| f.active)
    }

    /// Whether a festival with this name was ever registered. Keeps
    /// content schedules idempotent across catch-up bursts and reloads.
    pub fn known_by_name(&self, name: &str) -> bool {
        self.festivals.values().any(|f| f.name == name)
    }
}

/// Root aggregate of simulation truth. Exactly one canonical value exists
/// outside an open tick transaction; all mutation goes through the store.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldState {
    pub clock: ActionClock,
    pub nodes: BTreeMap<Coord, MapNode>,
    pub party: HeroParty,
    pub ledger: CurrencyLedger,
    pub festivals: FestivalRegistry,
    pub town: TownState,
    pub victory_claimed: bool,
    pub paused: bool,
}

impl WorldState {
    pub fn node(&self, coord: Coord) -> Option<&MapNode> {
        self.nodes.get(&coord)
    }

    pub fn node_mut(&mut self, coord: Coord) -> Option<&mut MapNode> {
        self.nodes.get_mut(&coord)
    }

    /// The node the party currently stands on.
    pub fn current_node(&self) -> Option<&MapNode> {
        self.party.position.and_then(|c| self.node(c))
    }

    /// Victory condition: at least one claimable node exists and every
    /// claimable node is held.
    pub fn all_claimable_claimed(&self) -> bool {
        let mut any = false;
        for node in self.nodes.values() {
            if node.kind.is_claimable() {
                any = true;
                if !node.currently_claimed {
                    return false;
                }
            }
        }
        any
    }
}

/// Simulation configuration parameters.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SimConfig {
    /// Seed for the deterministic RNG provider.
    pub rng_seed: u64,
    /// Debug/speed multiplier applied upstream of the orchestrator.
    pub speed_multiplier: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            rng_seed: 42,
            speed_multiplier: 1,
        }
    }
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A name field is blank.
    #[error("empty name")]
    EmptyName,
    /// Hero health above its maximum.
    #[error("hero {0:?} has hp above max_hp")]
    HpAboveMax(HeroId),
    /// Hero speed must be finite and strictly positive.
    #[error("hero {0:?} has a non-positive or non-finite speed")]
    InvalidSpeed(HeroId),
    /// A currency balance is negative.
    #[error("negative balance for {0:?}")]
    NegativeBalance(CurrencyKind),
    /// A claimed, non-exempt node has no matching unclaim timer.
    #[error("node {0} is claimed but has no live unclaim timer")]
    ClaimedWithoutTimer(Coord),
    /// A permanently-claimed node must not carry an unclaim timer.
    #[error("node {0} is permanently claimed but schedules an unclaim")]
    PermanentWithTimer(Coord),
    /// Timer ids must be unique within the pending table.
    #[error("duplicate timer id {0}")]
    DuplicateTimerId(u64),
    /// The party is traveling to a node that does not exist.
    #[error("travel destination {0} is not on the map")]
    TravelDestinationUnknown(Coord),
    /// The ledger grants production for a node that does not exist.
    #[error("production granted for unknown node {0}")]
    ProductionForUnknownNode(Coord),
    /// A coordinate literal failed to parse.
    #[error("invalid coordinate literal: {0}")]
    InvalidCoord(String),
}

/// Validate a single hero.
pub fn validate_hero(hero: &Hero) -> Result<(), ValidationError> {
    if hero.name.trim().is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if hero.hp > hero.max_hp {
        return Err(ValidationError::HpAboveMax(hero.id));
    }
    if !hero.speed.is_finite() || hero.speed <= 0.0 {
        return Err(ValidationError::InvalidSpeed(hero.id));
    }
    Ok(())
}

/// Validate a node in isolation (cross-references are checked by
/// [`validate_world`]).
pub fn validate_node(node: &MapNode) -> Result<(), ValidationError> {
    if node.permanently_claimed && node.unclaim_at_tick != 0 {
        return Err(ValidationError::PermanentWithTimer(node.coord));
    }
    Ok(())
}

/// Validate the world, including the claim/timer cross-reference.
pub fn validate_world(world: &WorldState) -> Result<(), ValidationError> {
    for hero in &world.party.heroes {
        validate_hero(hero)?;
    }
    for (kind, balance) in &world.ledger.balances {
        if *balance < Decimal::ZERO {
            return Err(ValidationError::NegativeBalance(*kind));
        }
    }

    let mut timer_ids = BTreeSet::new();
    for entry in &world.clock.timers {
        if !timer_ids.insert(entry.id.0) {
            return Err(ValidationError::DuplicateTimerId(entry.id.0));
        }
    }

    for node in world.nodes.values() {
        validate_node(node)?;
        if node.currently_claimed && !node.permanently_claimed {
            let live = world.clock.timers.iter().any(|e| {
                e.fire_tick == node.unclaim_at_tick
                    && matches!(e.timer, Timer::UnclaimNode { coord } if coord == node.coord)
            });
            if !live {
                return Err(ValidationError::ClaimedWithoutTimer(node.coord));
            }
        }
    }

    if let Some(travel) = &world.party.travel {
        if !world.nodes.contains_key(&travel.destination) {
            return Err(ValidationError::TravelDestinationUnknown(travel.destination));
        }
    }
    for coord in world.ledger.production.keys() {
        if !world.nodes.contains_key(coord) {
            return Err(ValidationError::ProductionForUnknownNode(*coord));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hero(id: u32, hp: u32, max_hp: u32) -> Hero {
        Hero {
            id: HeroId(id),
            name: format!("hero-{id}"),
            level: 3,
            hp,
            max_hp,
            speed: 1.0,
        }
    }

    fn small_world() -> WorldState {
        let mut world = WorldState::default();
        let town = Coord::new(0, 0);
        let cave = Coord::new(3, 4);
        let mut town_node = MapNode::new(town, NodeKind::Town, Element::Neutral, 0);
        town_node.currently_claimed = true;
        town_node.permanently_claimed = true;
        world.nodes.insert(town, town_node);
        world
            .nodes
            .insert(cave, MapNode::new(cave, NodeKind::Cave, Element::Stone, 2));
        world.party.heroes = vec![hero(1, 10, 10), hero(2, 8, 10)];
        world.party.position = Some(town);
        world
    }

    #[test]
    fn coord_display_and_parse_roundtrip() {
        let c = Coord::new(-3, 12);
        assert_eq!(c.to_string(), "(-3, 12)");
        let parsed: Coord = "-3,12".parse().unwrap();
        assert_eq!(parsed, c);
        assert!("nope".parse::<Coord>().is_err());
    }

    #[test]
    fn world_json_roundtrip_with_timers() {
        let mut world = small_world();
        let cave = Coord::new(3, 4);
        world.clock.timers.push(TimerEntry {
            id: TimerId(7),
            fire_tick: 120,
            seq: 0,
            timer: Timer::UnclaimNode { coord: cave },
        });
        world.clock.timers.push(TimerEntry {
            id: TimerId(8),
            fire_tick: 50,
            seq: 1,
            timer: Timer::EndFestival {
                festival: FestivalId(0),
            },
        });
        world
            .ledger
            .credit(CurrencyKind::Gold, Decimal::new(125, 1));
        let text = serde_json::to_string_pretty(&world).unwrap();
        let back: WorldState = serde_json::from_str(&text).unwrap();
        assert_eq!(back, world);
    }

    #[test]
    fn validate_catches_claimed_without_timer() {
        let mut world = small_world();
        let cave = Coord::new(3, 4);
        {
            let node = world.node_mut(cave).unwrap();
            node.currently_claimed = true;
            node.unclaim_at_tick = 90;
        }
        assert_eq!(
            validate_world(&world),
            Err(ValidationError::ClaimedWithoutTimer(cave))
        );
        world.clock.timers.push(TimerEntry {
            id: TimerId(1),
            fire_tick: 90,
            seq: 0,
            timer: Timer::UnclaimNode { coord: cave },
        });
        assert!(validate_world(&world).is_ok());
    }

    #[test]
    fn validate_catches_hp_above_max() {
        let mut world = small_world();
        world.party.heroes[0].hp = 99;
        assert_eq!(
            validate_world(&world),
            Err(ValidationError::HpAboveMax(HeroId(1)))
        );
    }

    #[test]
    fn permanent_claim_needs_no_timer() {
        let world = small_world();
        assert!(validate_world(&world).is_ok());
    }

    #[test]
    fn victory_requires_every_claimable_node() {
        let mut world = small_world();
        assert!(!world.all_claimable_claimed());
        let cave = Coord::new(3, 4);
        world.node_mut(cave).unwrap().currently_claimed = true;
        assert!(world.all_claimable_claimed());
    }

    #[test]
    fn ledger_rates_sum_across_nodes() {
        let mut ledger = CurrencyLedger::default();
        ledger.grant_production(
            Coord::new(1, 1),
            vec![ProductionEntry {
                currency: CurrencyKind::Gold,
                per_tick: Decimal::new(2, 0),
            }],
        );
        ledger.grant_production(
            Coord::new(2, 2),
            vec![
                ProductionEntry {
                    currency: CurrencyKind::Gold,
                    per_tick: Decimal::new(3, 0),
                },
                ProductionEntry {
                    currency: CurrencyKind::Mana,
                    per_tick: Decimal::ONE,
                },
            ],
        );
        assert_eq!(
            ledger.production_rate(CurrencyKind::Gold),
            Decimal::new(5, 0)
        );
        assert!(ledger.revoke_production(&Coord::new(1, 1)));
        assert_eq!(
            ledger.production_rate(CurrencyKind::Gold),
            Decimal::new(3, 0)
        );
    }

    #[test]
    fn highest_loot_rarity_picks_best() {
        let mut node = MapNode::new(Coord::new(1, 0), NodeKind::Cave, Element::Stone, 1);
        assert_eq!(node.highest_loot_rarity(), None);
        node.loot = vec![
            LootDrop {
                id: LootId(1),
                rarity: Rarity::Common,
            },
            LootDrop {
                id: LootId(2),
                rarity: Rarity::Epic,
            },
            LootDrop {
                id: LootId(3),
                rarity: Rarity::Uncommon,
            },
        ];
        assert_eq!(node.highest_loot_rarity(), Some(Rarity::Epic));
    }

    proptest! {
        #[test]
        fn recovery_percent_is_bounded(
            pairs in proptest::collection::vec((0u32..1000, 1u32..1000), 1..6)
        ) {
            let heroes: Vec<Hero> = pairs
                .iter()
                .enumerate()
                .map(|(i, &(hp, max))| {
                    let max = max.max(1);
                    hero(i as u32, hp.min(max), max)
                })
                .collect();
            let party = HeroParty { heroes, ..HeroParty::default() };
            prop_assert!(party.recovery_percent() <= 100);
        }

        #[test]
        fn distance_is_symmetric_and_non_negative(
            ax in -100i32..100, ay in -100i32..100,
            bx in -100i32..100, by in -100i32..100
        ) {
            let a = Coord::new(ax, ay);
            let b = Coord::new(bx, by);
            prop_assert!(a.distance(b) >= 0.0);
            prop_assert!((a.distance(b) - b.distance(a)).abs() < 1e-9);
        }
    }
}
