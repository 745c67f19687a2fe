use super::commands::PayloadArgs;
use crate::cascade::{CheckRunEvent, PipelineLayout, StageResolver};
use crate::config::CascadeConfig;
use anyhow::{Context, Result};
use std::io::Read;
use std::path::Path;
use tracing::{debug, error};

/// Reads a webhook payload from a file, or stdin for `None` / `-`
pub fn read_event(path: Option<&Path>) -> Result<CheckRunEvent> {
    let raw = match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read payload from {}", path.display()))?,
        _ => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read payload from stdin")?;
            buf
        }
    };

    serde_json::from_str(&raw).context("Payload is not a check_run webhook event")
}

pub async fn handle_event(args: &PayloadArgs) -> i32 {
    match run_event(args).await {
        Ok(outcome) => {
            println!("{}", outcome.trim_end());
            0
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

async fn run_event(args: &PayloadArgs) -> Result<String> {
    let config = CascadeConfig::default();
    config.validate()?;
    debug!("{:?}", config);

    let event = read_event(args.payload.as_deref())?;
    let orchestrator = config.create_orchestrator()?;
    Ok(orchestrator.handle(&event).await?)
}

pub fn handle_resolve(args: &PayloadArgs) -> i32 {
    match run_resolve(args, &CascadeConfig::default().layout) {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    }
}

fn run_resolve(args: &PayloadArgs, layout: &PipelineLayout) -> Result<String> {
    let event = read_event(args.payload.as_deref())?;
    resolve_event(&event, layout)
}

/// Describes the stage an event resolves to, without side effects
pub fn resolve_event(event: &CheckRunEvent, layout: &PipelineLayout) -> Result<String> {
    let resolver = StageResolver::new(layout);
    match resolver.resolve(&event.check_run)? {
        Some(stage) => Ok(serde_json::to_string_pretty(&stage)?),
        None => Ok(format!("Not a cascading run: {}", event.check_run.name)),
    }
}
