use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sim_core::{Coord, Element, Hero, HeroId, MapNode, NodeKind, WorldState};

fn build_world(side: i32) -> WorldState {
    let mut world = WorldState::default();
    for x in 0..side {
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
    world.party.position = Some(Coord::new(0, 0));
    world
}

fn bench_decide(c: &mut Criterion) {
    let world = build_world(32);
    c.bench_function("autotravel decide over 1024 nodes", |b| {
        b.iter(|| black_box(sim_ai::decide(&world)))
    });
}

criterion_group!(benches, bench_decide);
criterion_main!(benches);
