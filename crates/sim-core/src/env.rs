//! Environment collaborator traits.
//!
//! The core invokes its external collaborators (claim-duration formulas,
//! world generation, travel modifiers) through these seams. The default
//! implementations keep a headless simulation self-contained; content
//! packs and game layers substitute their own.

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::{GuardianId, LootDrop, LootId, MapNode, NodeKind, Rarity, WorldState};

/// Computes how long a fresh claim lasts.
pub trait ClaimPolicy {
    /// Number of ticks the claim on `node` holds before it expires.
    fn claim_duration(&self, node: &MapNode) -> u64;
}

/// Built-in claim durations: a per-kind base, extended a little by every
/// claim already held on the node.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultClaimPolicy;

impl DefaultClaimPolicy {
    pub fn base_duration(kind: NodeKind) -> u64 {
        match kind {
            NodeKind::Town => 600,
            NodeKind::Village => 300,
            NodeKind::Cave => 240,
            NodeKind::Dungeon => 360,
            NodeKind::Castle => 480,
            NodeKind::Empty => 60,
        }
    }
}

impl ClaimPolicy for DefaultClaimPolicy {
    fn claim_duration(&self, node: &MapNode) -> u64 {
        Self::base_duration(node.kind) + 30 * u64::from(node.claim_count)
    }
}

/// Regenerates a node's defenses and rewards after its claim lapses.
///
/// Implementations must be pure functions of the supplied stream: the
/// caller seeds `rng` from the deterministic provider so regeneration is
/// reproducible.
pub trait WorldgenOracle {
    fn regenerate_guardians(&self, rng: &mut ChaCha8Rng, node: &MapNode) -> Vec<GuardianId>;
    fn regenerate_loot(&self, rng: &mut ChaCha8Rng, node: &MapNode) -> Vec<LootDrop>;
}

/// Built-in worldgen: guardian and loot counts scale with encounter level,
/// rarities roll on a d100. Non-empty nodes always regenerate at least one
/// guardian and one drop.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultWorldgen;

fn roll_rarity(rng: &mut ChaCha8Rng) -> Rarity {
    match rng.gen_range(1..=100u32) {
        1..=50 => Rarity::Common,
        51..=75 => Rarity::Uncommon,
        76..=90 => Rarity::Rare,
        91..=98 => Rarity::Epic,
        _ => Rarity::Legendary,
    }
}

impl WorldgenOracle for DefaultWorldgen {
    fn regenerate_guardians(&self, rng: &mut ChaCha8Rng, node: &MapNode) -> Vec<GuardianId> {
        if node.kind == NodeKind::Empty {
            return Vec::new();
        }
        let count = (1 + node.encounter_level / 2).min(6);
        (0..count).map(|_| GuardianId(rng.gen())).collect()
    }

    fn regenerate_loot(&self, rng: &mut ChaCha8Rng, node: &MapNode) -> Vec<LootDrop> {
        if node.kind == NodeKind::Empty {
            return Vec::new();
        }
        let count = (1 + node.encounter_level / 3).min(4);
        (0..count)
            .map(|_| LootDrop {
                id: LootId(rng.gen()),
                rarity: roll_rarity(rng),
            })
            .collect()
    }
}

/// Supplies the travel-time multiplier (1.0 = neutral, smaller = faster).
pub trait TravelModifier {
    fn travel_multiplier(&self, world: &WorldState) -> f64;
}

/// Ignores the world entirely.
#[derive(Clone, Copy, Debug, Default)]
pub struct NeutralTravel;

impl TravelModifier for NeutralTravel {
    fn travel_multiplier(&self, _world: &WorldState) -> f64 {
        1.0
    }
}

/// Folds the travel multipliers of every active festival, clamped so a
/// misconfigured content pack cannot zero out travel time.
#[derive(Clone, Copy, Debug, Default)]
pub struct FestivalTravelModifier;

impl TravelModifier for FestivalTravelModifier {
    fn travel_multiplier(&self, world: &WorldState) -> f64 {
        let product = world
            .festivals
            .active()
            .map(|f| f.travel_multiplier)
            .product::<f64>();
        if product.is_finite() {
            product.max(0.05)
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Coord, Element, RngProvider};
    use rust_decimal::Decimal;

    fn cave(level: u32) -> MapNode {
        MapNode::new(Coord::new(3, 4), NodeKind::Cave, Element::Stone, level)
    }

    #[test]
    fn default_durations_are_positive_and_grow_with_claims() {
        let policy = DefaultClaimPolicy;
        let mut node = cave(2);
        let first = policy.claim_duration(&node);
        assert!(first > 0);
        node.claim_count = 3;
        assert!(policy.claim_duration(&node) > first);
    }

    #[test]
    fn worldgen_is_reproducible_and_non_empty() {
        let provider = RngProvider::new(7);
        let oracle = DefaultWorldgen;
        let node = cave(3);

        let mut a = provider.stream("unclaim:3:4:100");
        let mut b = provider.stream("unclaim:3:4:100");
        let guardians_a = oracle.regenerate_guardians(&mut a, &node);
        let guardians_b = oracle.regenerate_guardians(&mut b, &node);
        assert_eq!(guardians_a, guardians_b);
        assert!(!guardians_a.is_empty());

        let loot_a = oracle.regenerate_loot(&mut a, &node);
        let loot_b = oracle.regenerate_loot(&mut b, &node);
        assert_eq!(loot_a, loot_b);
        assert!(!loot_a.is_empty());
    }

    #[test]
    fn empty_nodes_regenerate_nothing() {
        let provider = RngProvider::new(7);
        let oracle = DefaultWorldgen;
        let node = MapNode::new(Coord::new(9, 9), NodeKind::Empty, Element::Neutral, 4);
        let mut rng = provider.stream("unclaim:9:9:1");
        assert!(oracle.regenerate_guardians(&mut rng, &node).is_empty());
        assert!(oracle.regenerate_loot(&mut rng, &node).is_empty());
    }

    #[test]
    fn festival_modifier_folds_active_festivals() {
        let mut world = WorldState::default();
        assert_eq!(FestivalTravelModifier.travel_multiplier(&world), 1.0);

        world
            .festivals
            .register("Harvest Fair".into(), Decimal::new(2, 0), 0.5, 100);
        let id = world
            .festivals
            .register("Lantern Rite".into(), Decimal::ONE, 0.8, 200);
        assert!((FestivalTravelModifier.travel_multiplier(&world) - 0.4).abs() < 1e-9);

        world.festivals.get_mut(id).unwrap().active = false;
        assert!((FestivalTravelModifier.travel_multiplier(&world) - 0.5).abs() < 1e-9);
    }
}
