#![deny(warnings)]

//! Headless CLI: build the starter world, run catch-up bursts through the
//! orchestrator and print a KPI summary plus the notification feed.

use anyhow::Result;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sim_core::{
    validate_world, BuildingKind, Coord, CurrencyKind, Element, Hero, HeroId, MapNode, NodeKind,
    SimConfig, WorldState,
};
use sim_runtime::{CollectingSink, Simulation, TracingSink};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

struct Args {
    ticks: u64,
    seed: u64,
    speed: u32,
    chunks: u64,
    save: Option<String>,
    content: Option<String>,
    telemetry: Option<String>,
}

fn parse_args() -> Args {
    let mut args = Args {
        ticks: 100,
        seed: 42,
        speed: 1,
        chunks: 1,
        save: None,
        content: None,
        telemetry: None,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--ticks" => args.ticks = it.next().and_then(|s| s.parse().ok()).unwrap_or(args.ticks),
            "--seed" => args.seed = it.next().and_then(|s| s.parse().ok()).unwrap_or(args.seed),
            "--speed" => args.speed = it.next().and_then(|s| s.parse().ok()).unwrap_or(args.speed),
            "--chunks" => {
                args.chunks = it.next().and_then(|s| s.parse().ok()).unwrap_or(args.chunks)
            }
            "--save" => args.save = it.next(),
            "--content" => args.content = it.next(),
            "--telemetry" => args.telemetry = it.next(),
            _ => {}
        }
    }
    args
}

fn starter_world() -> WorldState {
    let mut world = WorldState::default();
    let node = |x, y, kind, element, level| {
        let mut n = MapNode::new(Coord::new(x, y), kind, element, level);
        if kind == NodeKind::Town {
            n.currently_claimed = true;
            n.permanently_claimed = true;
        }
        n
    };
    for n in [
        node(0, 0, NodeKind::Town, Element::Neutral, 0),
        node(2, 3, NodeKind::Village, Element::Forest, 1),
        node(3, 4, NodeKind::Cave, Element::Stone, 2),
        node(7, 1, NodeKind::Dungeon, Element::Arcane, 4),
        node(10, 8, NodeKind::Castle, Element::Neutral, 6),
        node(5, 5, NodeKind::Empty, Element::Neutral, 0),
    ] {
        world.nodes.insert(n.coord, n);
    }

    let hero = |id, name: &str, level, speed| Hero {
        id: HeroId(id),
        name: name.to_string(),
        level,
        hp: 10,
        max_hp: 10,
        speed,
    };
    world.party.heroes = vec![
        hero(1, "Wren", 3, 1.0),
        hero(2, "Maela", 3, 1.2),
        hero(3, "Tob", 4, 0.8),
    ];
    world.party.position = Some(Coord::new(0, 0));
    world.town.buildings.insert(BuildingKind::Inn, 1);
    world.ledger.credit(CurrencyKind::Gold, Decimal::new(25, 0));
    world
}

fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .init();

    let args = parse_args();
    info!(
        ticks = args.ticks,
        seed = args.seed,
        speed = args.speed,
        git = env!("GIT_SHA"),
        "starting hearthvale"
    );

    let world = starter_world();
    validate_world(&world)?;
    let total_nodes = world.nodes.len();
    let claimable = world
        .nodes
        .values()
        .filter(|n| n.kind.is_claimable())
        .count();

    let mut sim = Simulation::new(
        world,
        SimConfig {
            rng_seed: args.seed,
            speed_multiplier: args.speed,
        },
    );
    if let Some(dir) = &args.content {
        let mut content = modkit::ContentEngine::new(dir);
        content.load_all()?;
        sim = sim
            .with_claim_policy(Box::new(content.claim_policy()?))
            .with_festival_schedule(content.festival_schedule()?);
        info!(packs = content.packs().len(), "content packs loaded");
    }
    if let Some(path) = &args.save {
        sim.set_persister(Box::new(persistence::SnapshotFile::new(path)));
    }
    let sink = CollectingSink::new();
    sim.attach_sink(Box::new(sink.clone()));
    sim.attach_sink(Box::new(TracingSink));

    let mut telemetry = match &args.telemetry {
        Some(path) => Some(data_pipeline::TelemetryWriter::create(path)?),
        None => None,
    };

    // The speed multiplier is applied here, upstream of the orchestrator.
    let total = args.ticks.saturating_mul(u64::from(args.speed.max(1)));
    let chunks = args.chunks.max(1);
    let per_chunk = total / chunks;
    let remainder = total % chunks;
    let mut last = None;
    for i in 0..chunks {
        let burst = per_chunk + if i + 1 == chunks { remainder } else { 0 };
        if burst == 0 {
            continue;
        }
        let report = sim.process_ticks(burst)?;
        if let Some(writer) = telemetry.as_mut() {
            writer.append(&data_pipeline::TickRow {
                tick: report.num_ticks,
                gold: report.gold.to_f64().unwrap_or(0.0),
                claimed_nodes: report.claimed_nodes as u64,
                timers_fired: report.timers_fired as u64,
            })?;
        }
        last = Some(report);
    }
    if let Some(writer) = telemetry.as_mut() {
        writer.flush()?;
    }

    println!(
        "World OK | nodes: {} | claimable: {} | heroes: {}",
        total_nodes,
        claimable,
        sim.world().party.heroes.len()
    );
    if let Some(report) = last {
        let world = sim.world();
        let status = world
            .party
            .idle_status
            .clone()
            .unwrap_or_else(|| "active".to_string());
        println!(
            "KPI | ticks: {} | gold: {} | stone: {} | claimed: {}/{} | timers fired: {} | status: {}",
            report.num_ticks,
            report.gold,
            world.ledger.balance(CurrencyKind::Stone),
            report.claimed_nodes,
            claimable,
            report.timers_fired,
            status
        );
    }
    for n in sink.drain() {
        println!("[{:?}] {}", n.category, n.message);
    }

    Ok(())
}
