#![deny(warnings)]

//! Rhai-based content packs supplying the simulation's external formulas.
//!
//! A pack is a directory with a `metadata.yaml`, an optional
//! `script.rhai` and an optional `tunables.yaml`. Packs contribute two
//! things to the core:
//!
//! - a [`TunedClaimPolicy`] (how long claims hold, from tunables with an
//!   optional `claim_duration(kind, count)` script override), and
//! - a festival schedule (scripted map trigger, metadata fallback)
//!   consumed by the orchestrator's festival bookkeeping.

use rhai::{Engine, AST};
use serde::Deserialize;
use sim_core::env::{ClaimPolicy, DefaultClaimPolicy};
use sim_core::{MapNode, NodeKind};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Metadata for a content pack.
#[derive(Debug, Clone, Deserialize)]
pub struct PackMeta {
    pub id: String,
    pub name: String,
    pub version: String,
    pub engine_schema_version: u32,
    pub compat: Option<String>,
    pub hooks: Option<Vec<String>>, // e.g., ["festival", "claim_duration"]
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("invalid metadata: {0}")]
    InvalidMeta(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("rhai error: {0}")]
    Rhai(String),
}

impl From<std::io::Error> for ContentError {
    fn from(e: std::io::Error) -> Self {
        ContentError::Io(e.to_string())
    }
}

impl From<rhai::EvalAltResult> for ContentError {
    fn from(e: rhai::EvalAltResult) -> Self {
        ContentError::Rhai(e.to_string())
    }
}
impl From<rhai::ParseError> for ContentError {
    fn from(e: rhai::ParseError) -> Self {
        ContentError::Rhai(e.to_string())
    }
}

/// Claim-duration tunables shipped in `tunables.yaml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Tunables {
    /// Base claim duration per node kind, in ticks.
    #[serde(default)]
    pub claim_durations: BTreeMap<NodeKind, u64>,
    /// Extra ticks granted per claim already held on the node.
    #[serde(default)]
    pub repeat_claim_bonus: Option<u64>,
}

/// A festival a content pack wants on the calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct FestivalSpec {
    pub name: String,
    pub start_tick: u64,
    pub duration: u64,
    pub production_mult: f64,
    pub travel_mult: f64,
}

/// Loaded pack with metadata, optional script and tunables.
#[derive(Debug, Clone)]
pub struct ContentPack {
    pub meta: PackMeta,
    pub dir: PathBuf,
    pub script_path: Option<PathBuf>,
    pub tunables: Tunables,
}

/// Content engine: loads packs and derives policies and schedules.
pub struct ContentEngine {
    root: PathBuf,
    engine: Engine,
    packs: Vec<ContentPack>,
}

impl ContentEngine {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            engine: Engine::new(),
            packs: vec![],
        }
    }

    pub fn packs(&self) -> &[ContentPack] {
        &self.packs
    }

    pub fn load_all(&mut self) -> Result<(), ContentError> {
        let entries = fs::read_dir(&self.root)?;
        self.packs.clear();
        for ent in entries {
            let ent = ent?;
            if !ent.file_type()?.is_dir() {
                continue;
            }
            let dir = ent.path();
            let meta_path = dir.join("metadata.yaml");
            if !meta_path.exists() {
                continue;
            }
            let meta_text = fs::read_to_string(&meta_path)?;
            let meta: PackMeta = serde_yaml::from_str(&meta_text)
                .map_err(|e| ContentError::InvalidMeta(e.to_string()))?;

            let script_path = dir.join("script.rhai");
            let script_path = script_path.exists().then_some(script_path);

            let tunables_path = dir.join("tunables.yaml");
            let tunables = if tunables_path.exists() {
                let text = fs::read_to_string(&tunables_path)?;
                serde_yaml::from_str(&text)
                    .map_err(|e| ContentError::InvalidMeta(e.to_string()))?
            } else {
                Tunables::default()
            };

            info!(pack = %meta.id, "loaded content pack");
            self.packs.push(ContentPack {
                meta,
                dir,
                script_path,
                tunables,
            });
        }
        Ok(())
    }

    /// Build the claim policy from every pack's tunables (later packs
    /// override earlier ones) plus the first scripted `claim_duration`
    /// hook found.
    pub fn claim_policy(&self) -> Result<TunedClaimPolicy, ContentError> {
        let mut durations = BTreeMap::new();
        let mut repeat_bonus = 30;
        for pack in &self.packs {
            durations.extend(pack.tunables.claim_durations.iter().map(|(k, v)| (*k, *v)));
            if let Some(bonus) = pack.tunables.repeat_claim_bonus {
                repeat_bonus = bonus;
            }
        }

        let mut hook = None;
        for pack in &self.packs {
            let Some(script_path) = &pack.script_path else {
                continue;
            };
            let script = fs::read_to_string(script_path)?;
            let engine = Engine::new();
            let ast = engine.compile(&script).map_err(ContentError::from)?;
            if ast.iter_functions().any(|f| f.name == "claim_duration") {
                hook = Some((engine, ast));
                break;
            }
        }

        Ok(TunedClaimPolicy {
            durations,
            repeat_bonus,
            hook,
        })
    }

    /// Festivals requested by the loaded packs, script first, metadata
    /// fallback second.
    pub fn festival_schedule(&self) -> Result<Vec<FestivalSpec>, ContentError> {
        let mut specs = Vec::new();
        for pack in &self.packs {
            if let Some(spec) = self.eval_festival_trigger(pack)? {
                specs.push(spec);
            } else if let Some(spec) = festival_from_meta(pack)? {
                specs.push(spec);
            }
        }
        Ok(specs)
    }

    /// Evaluate a pack script; a map return value describes a festival.
    fn eval_festival_trigger(
        &self,
        pack: &ContentPack,
    ) -> Result<Option<FestivalSpec>, ContentError> {
        let Some(script_path) = &pack.script_path else {
            return Ok(None);
        };
        let script = fs::read_to_string(script_path).unwrap_or_default();
        let ast = self.engine.compile(&script).map_err(ContentError::from)?;
        let scope = &mut rhai::Scope::new();
        let result = self
            .engine
            .eval_ast_with_scope::<rhai::Dynamic>(scope, &ast);
        match result {
            Ok(val) => {
                if !val.is_map() {
                    return Ok(None);
                }
                let map = val.cast::<rhai::Map>();
                let name = map
                    .get("name")
                    .and_then(|v| v.clone().try_cast::<String>());
                let Some(name) = name else {
                    return Ok(None);
                };
                Ok(Some(FestivalSpec {
                    name,
                    start_tick: int_field(&map, "start_tick").unwrap_or(0).max(0) as u64,
                    duration: int_field(&map, "duration").unwrap_or(1).max(1) as u64,
                    production_mult: num_field(&map, "production_mult").unwrap_or(1.0),
                    travel_mult: num_field(&map, "travel_mult").unwrap_or(1.0),
                }))
            }
            Err(_) => Ok(None),
        }
    }
}

fn int_field(map: &rhai::Map, key: &str) -> Option<i64> {
    map.get(key).and_then(|v| v.clone().try_cast::<i64>())
}

fn num_field(map: &rhai::Map, key: &str) -> Option<f64> {
    let v = map.get(key)?.clone();
    v.clone()
        .try_cast::<f64>()
        .or_else(|| v.try_cast::<i64>().map(|i| i as f64))
}

/// Fallback: parse a `festival:` block from `metadata.yaml`.
fn festival_from_meta(pack: &ContentPack) -> Result<Option<FestivalSpec>, ContentError> {
    #[derive(Deserialize)]
    struct FestivalBlock {
        name: String,
        start_tick: u64,
        duration: u64,
        #[serde(default = "one")]
        production_mult: f64,
        #[serde(default = "one")]
        travel_mult: f64,
    }
    fn one() -> f64 {
        1.0
    }
    #[derive(Deserialize)]
    struct MetaFile {
        #[serde(default)]
        festival: Option<FestivalBlock>,
    }
    let meta_path = pack.dir.join("metadata.yaml");
    let text = fs::read_to_string(meta_path)?;
    let mf: MetaFile =
        serde_yaml::from_str(&text).map_err(|e| ContentError::InvalidMeta(e.to_string()))?;
    Ok(mf.festival.map(|f| FestivalSpec {
        name: f.name,
        start_tick: f.start_tick,
        duration: f.duration.max(1),
        production_mult: f.production_mult,
        travel_mult: f.travel_mult,
    }))
}

/// Claim policy backed by pack tunables with an optional script hook.
pub struct TunedClaimPolicy {
    durations: BTreeMap<NodeKind, u64>,
    repeat_bonus: u64,
    hook: Option<(Engine, AST)>,
}

impl ClaimPolicy for TunedClaimPolicy {
    fn claim_duration(&self, node: &MapNode) -> u64 {
        if let Some((engine, ast)) = &self.hook {
            let mut scope = rhai::Scope::new();
            let result = engine.call_fn::<i64>(
                &mut scope,
                ast,
                "claim_duration",
                (format!("{:?}", node.kind), i64::from(node.claim_count)),
            );
            match result {
                Ok(v) if v > 0 => return v as u64,
                Ok(v) => warn!(value = v, "claim_duration hook returned a non-positive value"),
                Err(e) => warn!(error = %e, "claim_duration hook failed; using tunables"),
            }
        }
        let base = self
            .durations
            .get(&node.kind)
            .copied()
            .unwrap_or_else(|| DefaultClaimPolicy::base_duration(node.kind));
        base + self.repeat_bonus * u64::from(node.claim_count)
    }
}

/// Returns a fresh Rhai engine with default configuration.
pub fn new_engine() -> Engine {
    Engine::new()
}
