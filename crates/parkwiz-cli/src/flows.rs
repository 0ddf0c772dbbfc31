//! `parkwiz flows` — list the pages and what each step asks for.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use parkwiz_core::EngineConfig;
use parkwiz_flows::{steps_for, FlowKind};
use parkwiz_validation::{FieldRule, Rule};

#[derive(Args, Debug)]
pub struct FlowsArgs {
    /// Print the listing as JSON.
    #[arg(long)]
    pub json: bool,
}

/// One page as printed by `parkwiz flows`.
#[derive(Debug, Serialize)]
pub struct FlowListing {
    pub flow: FlowKind,
    pub steps: Vec<StepListing>,
}

#[derive(Debug, Serialize)]
pub struct StepListing {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub fields: Vec<FieldRule>,
}

pub fn listing(config: &EngineConfig) -> Vec<FlowListing> {
    FlowKind::ALL
        .into_iter()
        .map(|flow| FlowListing {
            flow,
            steps: steps_for(flow, config)
                .into_iter()
                .map(|step| StepListing {
                    id: step.id.to_string(),
                    title: step.title,
                    fields: step.rules,
                })
                .collect(),
        })
        .collect()
}

pub fn run_flows(args: &FlowsArgs, config: &EngineConfig) -> Result<u8> {
    let flows = listing(config);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&flows)?);
    } else {
        print!("{}", render(&flows));
    }
    Ok(0)
}

fn describe(rule: &Rule) -> String {
    match rule {
        Rule::NonEmpty => "non-empty".to_string(),
        Rule::Email => "email".to_string(),
        Rule::MinLength { min } => format!("min {min} chars"),
        Rule::Matches { field } => format!("matches {field}"),
        Rule::MinStrength { level } => format!("strength >= {level}"),
        Rule::Accepted => "accepted".to_string(),
        Rule::PositiveInteger => "positive integer".to_string(),
        Rule::Custom(custom) => format!("custom:{}", custom.name()),
    }
}

pub fn render(flows: &[FlowListing]) -> String {
    let mut out = String::new();
    for flow in flows {
        out.push_str(&format!("{}\n", flow.flow));
        for (index, step) in flow.steps.iter().enumerate() {
            let title = step.title.as_deref().unwrap_or("");
            out.push_str(&format!("  {}. {:<14} {title}\n", index + 1, step.id));
            for field in &step.fields {
                let mut notes = vec![if field.required { "required" } else { "optional" }.to_string()];
                notes.extend(field.checks.iter().map(describe));
                if field.sensitive {
                    notes.push("sensitive".to_string());
                }
                out.push_str(&format!("       - {:<16} {}\n", field.field.as_str(), notes.join(", ")));
            }
        }
    }
    out
}
