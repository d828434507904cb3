#![deny(warnings)]

//! Autotravel decision engine.
//!
//! Once per tick invocation the orchestrator asks this engine where an
//! idle hero party should go next. The engine is a pure function over the
//! world state: it either stays quiet (`Continue`), reports a
//! human-readable idle reason, or names a destination. Applying the
//! decision (status strings, travel start) is the runtime's job.
//!
//! The search is deliberately two-pass: first "is there *any* unclaimed
//! node", then "is there one the player's preferences allow". Collapsing
//! the passes would make "nothing to do" and "your settings forbid it"
//! indistinguishable in the UI.

use std::cmp::Ordering;
use std::fmt;

use sim_core::{Coord, HeroParty, MapNode, NodeKind, WorldState};
use tracing::debug;

/// Outcome of one decision pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Nothing to do or say (mid-exploration, mid-travel, unplaced party).
    Continue,
    /// Party stays put; the reason is surfaced to the player.
    Idle(IdleReason),
    /// Start traveling to this node.
    Travel(Coord),
}

/// Why the party is not traveling. `Display` renders the exact
/// player-facing strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdleReason {
    AllDefeated,
    RecoveringInTown { percent: u32 },
    NoUnclaimedNodes,
    PreferencesExcludeAll,
}

impl fmt::Display for IdleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdleReason::AllDefeated => write!(f, "All heroes are defeated; cannot travel."),
            IdleReason::RecoveringInTown { percent } => write!(
                f,
                "Heroes are recovering in town; cannot travel ({percent}% recovered)."
            ),
            IdleReason::NoUnclaimedNodes => write!(f, "No unclaimed nodes available; idle."),
            IdleReason::PreferencesExcludeAll => {
                write!(f, "Hero party idle; adjust risk tolerance.")
            }
        }
    }
}

/// Pick the next move for the party, short-circuiting at the first branch
/// that applies.
pub fn decide(world: &WorldState) -> Decision {
    let party = &world.party;

    if party.exploring {
        return Decision::Continue;
    }
    if party.is_traveling() {
        return Decision::Continue;
    }
    if party.all_defeated() {
        return Decision::Idle(IdleReason::AllDefeated);
    }
    if matches!(world.current_node().map(|n| n.kind), Some(NodeKind::Town))
        && party.any_below_max_health()
    {
        return Decision::Idle(IdleReason::RecoveringInTown {
            percent: party.recovery_percent(),
        });
    }
    let Some(position) = party.position else {
        // No resolvable position; nothing sensible to report.
        return Decision::Continue;
    };

    let ordered = nodes_by_distance(world, position);
    if !ordered.iter().any(|n| is_candidate(n, position)) {
        return Decision::Idle(IdleReason::NoUnclaimedNodes);
    }

    match preferred_candidate(&ordered, party, position) {
        Some(node) => {
            debug!(destination = %node.coord, "autotravel target selected");
            Decision::Travel(node.coord)
        }
        None => Decision::Idle(IdleReason::PreferencesExcludeAll),
    }
}

/// Whether a node is worth considering at all: claimable, unclaimed, and
/// not the ground the party already stands on.
fn is_candidate(node: &MapNode, position: Coord) -> bool {
    node.kind.is_claimable() && !node.currently_claimed && node.coord != position
}

/// Whether a candidate survives the player's preference filters.
fn passes_preferences(node: &MapNode, party: &HeroParty) -> bool {
    let prefs = &party.preferences;
    let threshold = party.average_level() + f64::from(prefs.risk.max_level_delta());
    f64::from(node.encounter_level) <= threshold
        && prefs.allows_kind(node.kind)
        && prefs.allows_rarity(node.highest_loot_rarity())
}

/// All nodes ordered by distance from `from`, ties broken by coordinate
/// so the ordering is fully deterministic.
fn nodes_by_distance(world: &WorldState, from: Coord) -> Vec<&MapNode> {
    let mut nodes: Vec<(f64, &MapNode)> = world
        .nodes
        .values()
        .map(|n| (from.distance(n.coord), n))
        .collect();
    nodes.sort_by(|(da, a), (db, b)| {
        da.partial_cmp(db)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.coord.cmp(&b.coord))
    });
    nodes.into_iter().map(|(_, n)| n).collect()
}

/// Nearest candidate that passes preferences. Nodes on the too-hard list
/// are de-prioritized — considered only after every other candidate — but
/// never excluded outright.
fn preferred_candidate<'a>(
    ordered: &[&'a MapNode],
    party: &HeroParty,
    position: Coord,
) -> Option<&'a MapNode> {
    let too_hard = &party.preferences.too_hard;
    ordered
        .iter()
        .find(|n| {
            !too_hard.contains(&n.coord)
                && is_candidate(n, position)
                && passes_preferences(n, party)
        })
        .or_else(|| {
            ordered.iter().find(|n| {
                too_hard.contains(&n.coord)
                    && is_candidate(n, position)
                    && passes_preferences(n, party)
            })
        })
        .copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_core::{Element, Hero, HeroId, LootDrop, LootId, MapNode, Rarity, RiskTolerance};

    fn hero(level: u32, hp: u32) -> Hero {
        Hero {
            id: HeroId(1),
            name: "Wren".into(),
            level,
            hp,
            max_hp: 10,
            speed: 1.0,
        }
    }

    fn add_node(world: &mut WorldState, x: i32, y: i32, kind: NodeKind, level: u32) {
        let coord = Coord::new(x, y);
        world
            .nodes
            .insert(coord, MapNode::new(coord, kind, Element::Neutral, level));
    }

    fn base_world() -> WorldState {
        let mut world = WorldState::default();
        let town = Coord::new(0, 0);
        let mut town_node = MapNode::new(town, NodeKind::Town, Element::Neutral, 0);
        town_node.currently_claimed = true;
        town_node.permanently_claimed = true;
        world.nodes.insert(town, town_node);
        world.party.heroes = vec![hero(3, 10)];
        world.party.position = Some(town);
        world
    }

    #[test]
    fn travels_to_nearest_matching_node() {
        let mut world = base_world();
        add_node(&mut world, 3, 4, NodeKind::Cave, 2);
        add_node(&mut world, 10, 10, NodeKind::Cave, 2);
        assert_eq!(decide(&world), Decision::Travel(Coord::new(3, 4)));
    }

    #[test]
    fn exploring_and_traveling_short_circuit_silently() {
        let mut world = base_world();
        add_node(&mut world, 3, 4, NodeKind::Cave, 2);
        world.party.exploring = true;
        assert_eq!(decide(&world), Decision::Continue);

        world.party.exploring = false;
        world.party.travel = Some(sim_core::TravelState {
            destination: Coord::new(3, 4),
            ticks_remaining: 2,
        });
        assert_eq!(decide(&world), Decision::Continue);
    }

    #[test]
    fn defeated_party_reports_defeat() {
        let mut world = base_world();
        add_node(&mut world, 3, 4, NodeKind::Cave, 2);
        world.party.heroes = vec![hero(3, 0)];
        assert_eq!(decide(&world), Decision::Idle(IdleReason::AllDefeated));
        assert_eq!(
            IdleReason::AllDefeated.to_string(),
            "All heroes are defeated; cannot travel."
        );
    }

    #[test]
    fn wounded_party_recovers_in_town() {
        let mut world = base_world();
        add_node(&mut world, 3, 4, NodeKind::Cave, 2);
        world.party.heroes = vec![hero(3, 5)];
        let decision = decide(&world);
        assert_eq!(
            decision,
            Decision::Idle(IdleReason::RecoveringInTown { percent: 50 })
        );
        assert_eq!(
            IdleReason::RecoveringInTown { percent: 50 }.to_string(),
            "Heroes are recovering in town; cannot travel (50% recovered)."
        );
    }

    #[test]
    fn wounded_party_outside_town_still_travels() {
        let mut world = base_world();
        add_node(&mut world, 1, 1, NodeKind::Empty, 0);
        add_node(&mut world, 3, 4, NodeKind::Cave, 2);
        world.party.heroes = vec![hero(3, 5)];
        world.party.position = Some(Coord::new(1, 1));
        assert_eq!(decide(&world), Decision::Travel(Coord::new(3, 4)));
    }

    #[test]
    fn no_unclaimed_beats_preference_filtering() {
        // (a) zero unclaimed nodes anywhere.
        let world = base_world();
        assert_eq!(decide(&world), Decision::Idle(IdleReason::NoUnclaimedNodes));
        assert_eq!(
            IdleReason::NoUnclaimedNodes.to_string(),
            "No unclaimed nodes available; idle."
        );

        // (b) unclaimed nodes exist but every one fails the filters.
        let mut world = base_world();
        add_node(&mut world, 3, 4, NodeKind::Cave, 30);
        world.party.preferences.risk = RiskTolerance::Low;
        assert_eq!(
            decide(&world),
            Decision::Idle(IdleReason::PreferencesExcludeAll)
        );
        assert_eq!(
            IdleReason::PreferencesExcludeAll.to_string(),
            "Hero party idle; adjust risk tolerance."
        );
    }

    #[test]
    fn risk_tolerance_widens_the_level_window() {
        let mut world = base_world();
        add_node(&mut world, 3, 4, NodeKind::Cave, 7);
        world.party.preferences.risk = RiskTolerance::Medium;
        assert_eq!(
            decide(&world),
            Decision::Idle(IdleReason::PreferencesExcludeAll)
        );
        world.party.preferences.risk = RiskTolerance::High;
        assert_eq!(decide(&world), Decision::Travel(Coord::new(3, 4)));
    }

    #[test]
    fn disabled_node_kind_is_filtered() {
        let mut world = base_world();
        add_node(&mut world, 3, 4, NodeKind::Dungeon, 2);
        world.party.preferences.node_kinds.remove(&NodeKind::Dungeon);
        assert_eq!(
            decide(&world),
            Decision::Idle(IdleReason::PreferencesExcludeAll)
        );
    }

    #[test]
    fn rarity_filter_uses_highest_drop_and_ignores_lootless_nodes() {
        let mut world = base_world();
        add_node(&mut world, 3, 4, NodeKind::Cave, 2);
        world
            .nodes
            .get_mut(&Coord::new(3, 4))
            .unwrap()
            .loot
            .push(LootDrop {
                id: LootId(1),
                rarity: Rarity::Common,
            });
        world.party.preferences.loot_rarities.remove(&Rarity::Common);
        assert_eq!(
            decide(&world),
            Decision::Idle(IdleReason::PreferencesExcludeAll)
        );

        // A lootless node cannot be excluded on rarity grounds.
        world.nodes.get_mut(&Coord::new(3, 4)).unwrap().loot.clear();
        assert_eq!(decide(&world), Decision::Travel(Coord::new(3, 4)));
    }

    #[test]
    fn too_hard_nodes_lose_to_farther_candidates_but_stay_reachable() {
        let mut world = base_world();
        add_node(&mut world, 1, 1, NodeKind::Cave, 2);
        add_node(&mut world, 6, 6, NodeKind::Cave, 2);
        world.party.preferences.mark_too_hard(Coord::new(1, 1));
        assert_eq!(decide(&world), Decision::Travel(Coord::new(6, 6)));

        // With no other option, a too-hard node is still chosen.
        world.nodes.remove(&Coord::new(6, 6));
        assert_eq!(decide(&world), Decision::Travel(Coord::new(1, 1)));

        world.party.preferences.clear_too_hard();
        assert_eq!(decide(&world), Decision::Travel(Coord::new(1, 1)));
    }

    #[test]
    fn unplaced_party_stays_silent() {
        let mut world = base_world();
        add_node(&mut world, 3, 4, NodeKind::Cave, 2);
        world.party.position = None;
        assert_eq!(decide(&world), Decision::Continue);
    }
}
