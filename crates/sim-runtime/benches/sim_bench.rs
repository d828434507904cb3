use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sim_core::{Coord, Element, Hero, HeroId, MapNode, NodeKind, SimConfig, WorldState};
use sim_runtime::Simulation;

fn build_world(side: i32) -> WorldState {
    let mut world = WorldState::default();
    let town = Coord::new(0, 0);
    let mut town_node = MapNode::new(town, NodeKind::Town, Element::Neutral, 0);
    town_node.currently_claimed = true;
    town_node.permanently_claimed = true;
    world.nodes.insert(town, town_node);
    for x in 1..side {
        for y in 0..side {
            let coord = Coord::new(x, y);
            let kind = match (x + y) % 4 {
                0 => NodeKind::Village,
                1 => NodeKind::Cave,
                2 => NodeKind::Dungeon,
                _ => NodeKind::Empty,
            };
            world.nodes.insert(
                coord,
                MapNode::new(coord, kind, Element::Neutral, ((x + y) % 6) as u32),
            );
        }
    }
    world.party.heroes = vec![Hero {
        id: HeroId(1),
        name: "Wren".into(),
        level: 4,
        hp: 10,
        max_hp: 10,
        speed: 1.0,
    }];
    world.party.position = Some(town);
    world
}

fn bench_single_ticks(c: &mut Criterion) {
    let mut sim = Simulation::new(
        build_world(16),
        SimConfig {
            rng_seed: 42,
            speed_multiplier: 1,
        },
    );
    c.bench_function("process one tick, 256-node world", |b| {
        b.iter(|| {
            let _ = black_box(sim.process_ticks(1));
        })
    });
}

fn bench_catch_up_burst(c: &mut Criterion) {
    c.bench_function("catch-up burst of 500 ticks", |b| {
        b.iter(|| {
            let mut sim = Simulation::new(
                build_world(16),
                SimConfig {
                    rng_seed: 42,
                    speed_multiplier: 1,
                },
            );
            let _ = black_box(sim.process_ticks(500));
        })
    });
}

criterion_group!(benches, bench_single_ticks, bench_catch_up_burst);
criterion_main!(benches);
