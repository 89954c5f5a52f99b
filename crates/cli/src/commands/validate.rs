//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    source_uri: String,
    output_directory: String,
    profile_count: usize,
    segment_duration_secs: u32,
    reconnect_interval_secs: u64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(plan) => {
            let warnings = collect_warnings(&plan);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", plan.version),
                    source_uri: plan.source.uri.clone(),
                    output_directory: plan.output.directory.display().to_string(),
                    profile_count: plan.profiles.len(),
                    segment_duration_secs: plan.profiles[0].segment_duration_secs,
                    reconnect_interval_secs: plan.timing.reconnect_interval_secs,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(plan: &contracts::StreamPlan) -> Vec<String> {
    let mut warnings = Vec::new();

    if plan.profiles.len() == 1 {
        warnings.push(
            "Only one profile configured - output will not be adaptive-bitrate".to_string(),
        );
    }

    for profile in &plan.profiles {
        if profile.width > plan.canonical.width || profile.height > plan.canonical.height {
            warnings.push(format!(
                "Profile '{}' upscales beyond the canonical format ({}x{})",
                profile.id, plan.canonical.width, plan.canonical.height
            ));
        }
    }

    if plan.timing.grace_period_ms == 0 {
        warnings.push(
            "Zero grace period - switches to live happen without warm-up".to_string(),
        );
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Source: {}", summary.source_uri);
            println!("  Output: {}", summary.output_directory);
            println!("  Profiles: {}", summary.profile_count);
            println!("  Segment duration: {} s", summary.segment_duration_secs);
            println!(
                "  Reconnect interval: {} s",
                summary.reconnect_interval_secs
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args_for(path: std::path::PathBuf) -> ValidateArgs {
        ValidateArgs {
            config: path,
            json: false,
        }
    }

    #[test]
    fn test_validate_missing_file() {
        let result = validate_config(&args_for("/nonexistent/stream.toml".into()));
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("File not found"));
    }

    #[test]
    fn test_validate_good_config() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[source]
uri = "rtsp://cam/stream"

[output]
directory = "/srv/dash"

[[profiles]]
id = "hd"
width = 1280
height = 720
bitrate_kbps = 3000
"#
        )
        .unwrap();

        let result = validate_config(&args_for(file.path().to_path_buf()));
        assert!(result.valid, "{:?}", result.error);
        let summary = result.summary.unwrap();
        assert_eq!(summary.profile_count, 1);
        // Single-profile ladder should warn
        assert!(result.warnings.is_some());
    }

    #[test]
    fn test_validate_bad_config() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(
            file,
            r#"
[source]
uri = "rtsp://cam/stream"

[output]
directory = "/srv/dash"
"#
        )
        .unwrap();

        let result = validate_config(&args_for(file.path().to_path_buf()));
        assert!(!result.valid);
    }
}
