//! Simulate Command - Run a scripted scenario against a fresh runtime
//!
//! A scenario declares pools and an ordered list of steps:
//!
//! ```toml
//! [[pools]]
//! name = "eth-usdc"
//! owner = "0xa1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1"
//! currency0 = "0x0101010101010101010101010101010101010101"
//! currency1 = "0x0202020202020202020202020202020202020202"
//! fee = 3000
//! tick_spacing = 60
//!
//! [[steps]]
//! action = "modify_liquidity"
//! pool = "eth-usdc"
//! delta = 1000
//!
//! [[steps]]
//! action = "request_decryption"
//! pool = "eth-usdc"
//!
//! [[steps]]
//! action = "fulfil"
//!
//! [[steps]]
//! action = "retrieve"
//! pool = "eth-usdc"
//! expect = [1000, 0]
//! ```
//!
//! Owner-gated steps default to the pool's owner as caller.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use clap::Args;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use cloak::{CloakRuntime, RuntimeError};
use cloak_defi::{CallContext, HookEvent, ModifyLiquidityParams, PoolId, PoolKey};
use cloak_fhe::{Address, CiphertextBackend};

use crate::config::{BackendKind, CloakConfig};

/// Run a scripted scenario
#[derive(Args)]
pub struct SimulateCommand {
    /// Scenario file (TOML)
    scenario: PathBuf,

    /// Print step results and events as JSON lines
    #[arg(long)]
    json: bool,

    /// Stop at the first rejected step
    #[arg(long)]
    strict: bool,
}

/// Pool declared by a scenario
#[derive(Debug, Clone, Deserialize)]
pub struct PoolSpec {
    pub name: String,
    /// Transaction originator at initialization, becomes the owner
    pub owner: Address,
    pub currency0: Address,
    pub currency1: Address,
    #[serde(default = "default_fee")]
    pub fee: u32,
    #[serde(default = "default_tick_spacing")]
    pub tick_spacing: i32,
}

fn default_fee() -> u32 {
    3000
}

fn default_tick_spacing() -> i32 {
    60
}

/// One scripted action
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    ModifyLiquidity {
        pool: String,
        delta: i128,
        #[serde(default)]
        sender: Option<Address>,
    },
    RequestDecryption {
        pool: String,
        #[serde(default)]
        caller: Option<Address>,
    },
    Poll {
        pool: String,
    },
    Fulfil,
    Wait {
        pool: String,
        #[serde(default = "default_wait_ms")]
        timeout_ms: u64,
    },
    Retrieve {
        pool: String,
        #[serde(default)]
        expect: Option<(u64, u64)>,
    },
    Reset {
        pool: String,
        #[serde(default)]
        caller: Option<Address>,
    },
}

fn default_wait_ms() -> u64 {
    cloak::config::DEFAULT_DISCLOSURE_TIMEOUT_MS
}

/// Parsed scenario file
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub pools: Vec<PoolSpec>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let scenario: Self = toml::from_str(content)?;
        let mut names = std::collections::HashSet::new();
        for pool in &scenario.pools {
            if !names.insert(pool.name.as_str()) {
                bail!("Duplicate pool name '{}'", pool.name);
            }
        }
        for step in &scenario.steps {
            if let Some(pool) = step.pool() {
                if !names.contains(pool) {
                    bail!("Step references unknown pool '{}'", pool);
                }
            }
        }
        Ok(scenario)
    }
}

impl Step {
    fn pool(&self) -> Option<&str> {
        match self {
            Step::ModifyLiquidity { pool, .. }
            | Step::RequestDecryption { pool, .. }
            | Step::Poll { pool }
            | Step::Wait { pool, .. }
            | Step::Retrieve { pool, .. }
            | Step::Reset { pool, .. } => Some(pool),
            Step::Fulfil => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Step::ModifyLiquidity { .. } => "modify_liquidity",
            Step::RequestDecryption { .. } => "request_decryption",
            Step::Poll { .. } => "poll",
            Step::Fulfil => "fulfil",
            Step::Wait { .. } => "wait",
            Step::Retrieve { .. } => "retrieve",
            Step::Reset { .. } => "reset",
        }
    }
}

/// Outcome of one step
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Ok,
    Readiness { requested: bool, ready: bool },
    Fulfilled { published: usize },
    Disclosed { token0: u64, token1: u64 },
    Rejected { error: String },
}

#[derive(Serialize)]
struct StepReport<'a> {
    step: usize,
    action: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pool: Option<&'a str>,
    #[serde(flatten)]
    outcome: &'a StepOutcome,
}

struct Pool {
    id: PoolId,
    key: PoolKey,
    owner: Address,
}

impl SimulateCommand {
    pub async fn execute(self, config: CloakConfig) -> anyhow::Result<()> {
        let scenario = Scenario::load(&self.scenario)?;
        info!(
            scenario = %self.scenario.display(),
            pools = scenario.pools.len(),
            steps = scenario.steps.len(),
            backend = %config.coprocessor.backend,
            "Running scenario"
        );

        match config.coprocessor.backend {
            BackendKind::Clear => {
                let runtime = CloakRuntime::clear(config.runtime_config());
                self.run(&runtime, &config, &scenario).await
            }
            #[cfg(feature = "tfhe")]
            BackendKind::Tfhe => {
                info!("Generating TFHE keys, this takes a while");
                let runtime = CloakRuntime::tfhe(&config.coprocessor.fhe, config.runtime_config())?;
                self.run(&runtime, &config, &scenario).await
            }
            #[cfg(not(feature = "tfhe"))]
            BackendKind::Tfhe => bail!("This build of cloak does not include the tfhe backend"),
        }
    }

    async fn run<B: CiphertextBackend>(
        &self,
        runtime: &CloakRuntime<B>,
        config: &CloakConfig,
        scenario: &Scenario,
    ) -> anyhow::Result<()> {
        let mut events = runtime.subscribe();
        if config.oracle.background {
            runtime.start_oracle()?;
        }

        let hook_address = config.hook.address;
        let mut pools = HashMap::new();
        for spec in &scenario.pools {
            let key = PoolKey::new(spec.currency0, spec.currency1, spec.fee, spec.tick_spacing, hook_address)
                .map_err(|e| anyhow!("Pool '{}': {}", spec.name, e))?;
            let id = runtime.initialize_pool(&CallContext::new(spec.owner, spec.owner), &key)?;
            if !self.json {
                println!("pool {} -> {} (owner {})", spec.name, id, spec.owner);
            }
            pools.insert(spec.name.as_str(), Pool { id, key, owner: spec.owner });
        }

        let mut rejected = 0;
        for (index, step) in scenario.steps.iter().enumerate() {
            let pool = match step.pool() {
                Some(name) => Some(pools.get(name).ok_or_else(|| anyhow!("Unknown pool '{}'", name))?),
                None => None,
            };
            let outcome = execute_step(runtime, step, pool).await;

            if let Some(expected) = expected_totals(step) {
                match &outcome {
                    StepOutcome::Disclosed { token0, token1 } if (*token0, *token1) == expected => {}
                    other => bail!("Step {}: expected {:?}, got {:?}", index + 1, expected, other),
                }
            }
            if let StepOutcome::Rejected { error } = &outcome {
                rejected += 1;
                warn!(step = index + 1, action = step.name(), %error, "Step rejected");
            }

            self.report(index + 1, step, &outcome)?;
            if self.strict && matches!(outcome, StepOutcome::Rejected { .. }) {
                bail!("Step {} rejected in strict mode", index + 1);
            }
        }

        runtime.stop_oracle();

        while let Ok(event) = events.try_recv() {
            self.report_event(&event, &pools)?;
        }

        if !self.json {
            println!();
            println!("{} steps, {} rejected", scenario.steps.len(), rejected);
        }
        Ok(())
    }

    fn report(&self, index: usize, step: &Step, outcome: &StepOutcome) -> anyhow::Result<()> {
        if self.json {
            let report = StepReport {
                step: index,
                action: step.name(),
                pool: step.pool(),
                outcome,
            };
            println!("{}", serde_json::to_string(&report)?);
            return Ok(());
        }

        let target = step.pool().map(|p| format!(" {}", p)).unwrap_or_default();
        let result = match outcome {
            StepOutcome::Ok => "ok".to_string(),
            StepOutcome::Readiness { requested, ready } => {
                format!("requested={} ready={}", requested, ready)
            }
            StepOutcome::Fulfilled { published } => format!("published {}", published),
            StepOutcome::Disclosed { token0, token1 } => format!("token0={} token1={}", token0, token1),
            StepOutcome::Rejected { error } => format!("rejected: {}", error),
        };
        println!("[{:>3}] {}{}: {}", index, step.name(), target, result);
        Ok(())
    }

    fn report_event(&self, event: &HookEvent, pools: &HashMap<&str, Pool>) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string(event)?);
            return Ok(());
        }
        let name = pools
            .iter()
            .find(|(_, p)| &p.id == event.pool_id())
            .map(|(name, _)| *name)
            .unwrap_or("?");
        println!("event {:?} ({})", event, name);
        Ok(())
    }
}

fn expected_totals(step: &Step) -> Option<(u64, u64)> {
    match step {
        Step::Retrieve { expect, .. } => *expect,
        _ => None,
    }
}

async fn execute_step<B: CiphertextBackend>(
    runtime: &CloakRuntime<B>,
    step: &Step,
    pool: Option<&Pool>,
) -> StepOutcome {
    let result: Result<StepOutcome, RuntimeError> = match (step, pool) {
        (Step::Fulfil, _) => runtime
            .fulfill_blocking()
            .await
            .map(|published| StepOutcome::Fulfilled { published }),
        (Step::ModifyLiquidity { delta, sender, .. }, Some(pool)) => {
            let sender = sender.unwrap_or(pool.owner);
            let params = ModifyLiquidityParams::new(-pool.key.tick_spacing, pool.key.tick_spacing, *delta);
            runtime
                .modify_liquidity(&CallContext::new(sender, sender), &pool.key, &params)
                .map(|_| StepOutcome::Ok)
        }
        (Step::RequestDecryption { caller, .. }, Some(pool)) => runtime
            .request_decryption(&pool.id, &caller.unwrap_or(pool.owner))
            .map(|_| StepOutcome::Ok),
        (Step::Poll { .. }, Some(pool)) => {
            let (requested, ready) = runtime.is_decryption_ready(&pool.id);
            Ok(StepOutcome::Readiness { requested, ready })
        }
        (Step::Wait { timeout_ms, .. }, Some(pool)) => runtime
            .wait_for_disclosure(&pool.id, Duration::from_millis(*timeout_ms))
            .await
            .map(|(token0, token1)| StepOutcome::Disclosed { token0, token1 }),
        (Step::Retrieve { .. }, Some(pool)) => runtime
            .get_decrypted_metrics(&pool.id)
            .map(|(token0, token1)| StepOutcome::Disclosed { token0, token1 }),
        (Step::Reset { caller, .. }, Some(pool)) => runtime
            .reset_tracking(&pool.id, &caller.unwrap_or(pool.owner))
            .map(|_| StepOutcome::Ok),
        (_, None) => Ok(StepOutcome::Rejected {
            error: "step has no pool".to_string(),
        }),
    };

    result.unwrap_or_else(|e| StepOutcome::Rejected { error: e.to_string() })
}
