//! `parkwiz replay` — run a scripted session.
//!
//! A script names a flow, seeds the in-memory backend, and lists intents:
//!
//! ```yaml
//! flow: password_reset
//! backend:
//!   latency_ms: 0
//!   accounts:
//!     - email: ops@harbour.example
//!       password: Old-pass1
//!   fail_next:
//!     - kind: network_error
//! intents:
//!   - intent: set_field
//!     field: email
//!     value: ops@harbour.example
//!   - intent: submit
//! ```
//!
//! Each intent is dispatched in order and followed by a snapshot. Field
//! values never appear in the output except through the redacted snapshot.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};

use parkwiz_core::{EngineConfig, ErrorKind};
use parkwiz_flows::{build_flow, FlowKind, FlowPhase, FlowSnapshot, InMemoryBackend, Intent, IntentOutcome};

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// YAML script to run.
    pub script: PathBuf,

    /// Print one JSON document per intent instead of a summary line.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    pub flow: FlowKind,
    #[serde(default)]
    pub backend: BackendScript,
    #[serde(default)]
    pub intents: Vec<Intent>,
}

/// How to seed the in-memory backend.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendScript {
    /// Overrides `backend_latency_ms` from the configuration.
    pub latency_ms: Option<u64>,
    #[serde(default)]
    pub accounts: Vec<AccountSeed>,
    /// Failures returned by the next backend calls, in order.
    #[serde(default)]
    pub fail_next: Vec<ErrorKind>,
}

#[derive(Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountSeed {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for AccountSeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountSeed")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// One dispatched intent and what the page looked like afterwards.
#[derive(Debug, Serialize)]
pub struct ReplayStep {
    pub index: usize,
    pub intent: &'static str,
    pub outcome: IntentOutcome,
    pub snapshot: FlowSnapshot,
}

#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub flow: FlowKind,
    pub steps: Vec<ReplayStep>,
    pub final_phase: FlowPhase,
}

impl Script {
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing script {}", path.display()))
    }
}

/// Run `script` to the end. Intents after completion or teardown are still
/// dispatched and reported as such.
pub async fn execute(script: Script, config: &EngineConfig) -> Result<ReplayReport> {
    let latency = script
        .backend
        .latency_ms
        .unwrap_or(config.backend_latency_ms);
    let backend = script.backend.accounts.iter().fold(
        InMemoryBackend::new(Duration::from_millis(latency)),
        |backend, seed| backend.with_account(&seed.email, seed.password.clone()),
    );
    for failure in script.backend.fail_next {
        backend.fail_next(failure);
    }

    let mut flow = build_flow(script.flow, config, Arc::new(backend))
        .with_context(|| format!("building {} flow", script.flow))?;
    tracing::info!(flow = %script.flow, id = %flow.id(), intents = script.intents.len(), "replay started");

    let mut steps = Vec::with_capacity(script.intents.len());
    for (index, intent) in script.intents.into_iter().enumerate() {
        let name = intent.name();
        let outcome = flow.dispatch(intent).await;
        steps.push(ReplayStep {
            index,
            intent: name,
            outcome,
            snapshot: flow.snapshot(),
        });
    }
    let final_phase = flow.phase();
    flow.teardown();

    Ok(ReplayReport {
        flow: script.flow,
        steps,
        final_phase,
    })
}

pub fn run_replay(args: &ReplayArgs, config: &EngineConfig) -> Result<u8> {
    let script = Script::from_yaml_file(&args.script)?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    let report = runtime.block_on(execute(script, config))?;

    if args.json {
        for step in &report.steps {
            println!("{}", serde_json::to_string(step)?);
        }
    } else {
        print!("{}", render(&report)?);
    }
    Ok(0)
}

/// One line per intent: outcome, then where the wizard ended up.
pub fn render(report: &ReplayReport) -> Result<String> {
    let mut out = String::new();
    for step in &report.steps {
        let wizard = &step.snapshot.wizard;
        out.push_str(&format!(
            "{:>3} {:<10} {} -> step {}/{} {} ({:?})\n",
            step.index + 1,
            step.intent,
            serde_json::to_string(&step.outcome)?,
            wizard.step_index + 1,
            wizard.step_count,
            wizard.step_id,
            step.snapshot.phase,
        ));
    }
    out.push_str(&format!("{}: {:?}\n", report.flow, report.final_phase));
    Ok(out)
}
