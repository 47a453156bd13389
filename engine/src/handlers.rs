//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - summarize: Generate the summary of a document
//! - plan: Show the section plan
//! - doctor: Validate configuration and check the provider

use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

use crate::conductor::{SectionPlan, SummaryOrchestrator};
use crate::config::Config;
use crate::llm::build_provider;
use crate::secrets::{SecretManager, OPENAI_KEY_ENV, OPENAI_KEY_NAME};

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Summarize a document and print the result
///
/// Credentials and the plan are checked before the document is read.
/// With `output`, the summary text is also written to that file.
pub async fn handle_summarize(
    file: &Path,
    output: Option<&Path>,
    plan_override: Option<&Path>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let plan = SectionPlan::resolve(plan_override, &config.pipeline)
        .context("Failed to load section plan")?;
    let orchestrator =
        SummaryOrchestrator::from_config(config, &SecretManager::default(), Arc::new(plan))?;

    let summary = orchestrator
        .generate(file)
        .await
        .with_context(|| format!("Failed to summarize {}", file.display()))?;
    let text = summary.text();

    if let Some(output) = output {
        tokio::fs::write(output, &text)
            .await
            .with_context(|| format!("Failed to write summary to {}", output.display()))?;
        tracing::info!("Summary written to {}", output.display());
    }

    match format {
        OutputFormat::Text => println!("{}", text),
        OutputFormat::Json => {
            let output = json!({
                "run_id": summary.run_id,
                "document": summary.document,
                "digest": summary.digest,
                "generated_at": summary.generated_at,
                "sections": summary.sections,
                "summary": text,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// List the sections, query counts and fallbacks of the active plan
pub async fn handle_plan(
    plan_override: Option<&Path>,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let plan = SectionPlan::resolve(plan_override, &config.pipeline)
        .context("Failed to load section plan")?;
    let fallbacks: Vec<&str> = plan
        .fallback_policy()
        .missing_defaults()
        .keys()
        .map(|id| id.as_str())
        .collect();

    match format {
        OutputFormat::Text => {
            println!("Section Plan");
            println!("============================");
            println!();
            for entry in plan.sections() {
                println!(
                    "  {:<25} {} context question(s) + instruction",
                    format!("{}:", entry.name),
                    entry.context_queries().len()
                );
            }
            println!();
            if fallbacks.is_empty() {
                println!("Fallbacks: none");
            } else {
                println!("Fallbacks: {}", fallbacks.join(", "));
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "sections": plan.sections().iter().map(|entry| {
                    json!({
                        "id": entry.name,
                        "queries": entry.queries.len(),
                    })
                }).collect::<Vec<_>>(),
                "fallbacks": fallbacks,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Validate configuration, plan, credentials and provider reachability
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(&str, String)> = Vec::new();

    // Config is already validated when loaded
    checks.push(("Configuration", "Valid".to_string()));
    checks.push(("Provider", config.llm.default_provider.clone()));

    match SectionPlan::resolve(None, &config.pipeline) {
        Ok(plan) => checks.push((
            "Section plan",
            format!(
                "{} sections, {} fallbacks",
                plan.len(),
                plan.fallback_policy().missing_defaults().len()
            ),
        )),
        Err(e) => {
            checks.push(("Section plan", "Invalid".to_string()));
            issues.push(format!("Cannot load section plan: {}", e));
        }
    }

    let secrets = SecretManager::default();
    if config.llm.default_provider == "openai" {
        if secrets.has_secret(OPENAI_KEY_ENV, OPENAI_KEY_NAME) {
            checks.push(("OpenAI API key", "Configured".to_string()));
        } else {
            checks.push(("OpenAI API key", "Not configured".to_string()));
            issues.push(format!(
                "Set {} or store the key in the keychain (service 'kisum', key '{}')",
                OPENAI_KEY_ENV, OPENAI_KEY_NAME
            ));
        }
    }

    match build_provider(config, &secrets) {
        Ok(provider) => {
            if provider.check_health().await {
                checks.push(("Provider health", "Reachable".to_string()));
            } else {
                checks.push(("Provider health", "Unreachable".to_string()));
                issues.push(format!("Cannot reach the {} API", provider.name()));
            }
        }
        Err(e) => {
            checks.push(("Provider health", "Not checked".to_string()));
            tracing::debug!("Provider not built: {}", e);
        }
    }

    match format {
        OutputFormat::Text => {
            println!("Kisum System Diagnostics");
            println!("============================");
            println!();

            println!("System Checks:");
            for (check, status) in &checks {
                println!("  {:<25} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
