//! Command line interface for the wrapper build pipeline.

mod args;

pub use args::Args;

use crate::error::PipelineError;
use crate::notify::WebhookNotifier;
use crate::orchestrator::{GradleToolchain, OrchestratorConfig, SigningConfig, Toolchain};
use crate::pipeline::{self, JobReport, JobState, Pipeline, REASON_PUBLISH_FAILED};
use crate::publisher::http::HttpArtifactStore;
use crate::publisher::local::LocalArtifactStore;
use crate::publisher::ArtifactStore;
use std::time::Duration;

/// Main CLI entry point; returns the process exit code.
pub async fn run() -> anyhow::Result<i32> {
    let args = Args::parse_args();
    let payload = args.payload()?;

    if args.generate_only {
        return generate_only(&args, payload);
    }

    let notifier = WebhookNotifier::new(args.webhook_url.clone());
    let orchestrator = orchestrator_config(&args);
    let toolchain = match &args.keystore {
        Some(keystore) => {
            let keystore_pass = args
                .keystore_pass
                .clone()
                .ok_or_else(|| anyhow::anyhow!("--keystore requires --keystore-pass"))?;
            GradleToolchain::with_signing(SigningConfig {
                keystore: keystore.clone(),
                keystore_pass,
                key_alias: args.key_alias.clone(),
            })?
        }
        None => GradleToolchain::new(),
    };

    let result = match &args.store_url {
        Some(url) => {
            let store = match HttpArtifactStore::new(url.clone(), args.store_token.clone()) {
                Ok(store) => store,
                Err(e) => return Err(e.into()),
            };
            execute(&args, payload, toolchain, store, notifier, orchestrator).await
        }
        None => {
            let store = LocalArtifactStore::new(&args.output_dir);
            execute(&args, payload, toolchain, store, notifier, orchestrator).await
        }
    };

    match result {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(report_exit_code(&report))
        }
        Err(e @ PipelineError::Validation(_)) => {
            eprintln!("{e}");
            Ok(e.exit_code())
        }
        Err(e) => {
            eprintln!("Error: {e}");
            Ok(e.exit_code())
        }
    }
}

async fn execute<T: Toolchain, S: ArtifactStore>(
    args: &Args,
    payload: serde_json::Value,
    toolchain: T,
    store: S,
    notifier: WebhookNotifier,
    orchestrator: OrchestratorConfig,
) -> Result<JobReport, PipelineError> {
    let workdir = args.output_dir.join("work");
    std::fs::create_dir_all(&workdir)?;

    let pipeline = Pipeline::new(toolchain, store, notifier, orchestrator);
    pipeline.run_job(payload, &workdir).await
}

/// Generate and hash the project tree without invoking the toolchain.
fn generate_only(args: &Args, payload: serde_json::Value) -> anyhow::Result<i32> {
    match pipeline::generate_tree(payload) {
        Ok((config, tree)) => {
            let root = args.output_dir.join("project");
            tree.materialize(&root)?;
            println!("generated {} for {}", root.display(), config.host_name);
            println!("content hash: {}", tree.content_hash);
            Ok(0)
        }
        Err(e) => {
            eprintln!("{e}");
            Ok(e.exit_code())
        }
    }
}

fn orchestrator_config(args: &Args) -> OrchestratorConfig {
    let mut config = OrchestratorConfig::default();
    if let Some(max_attempts) = args.max_attempts {
        config.max_attempts = max_attempts.max(1);
    }
    if let Some(secs) = args.job_timeout_secs {
        config.job_timeout = Duration::from_secs(secs);
    }
    config
}

/// Exit code for a terminal job report.
///
/// `Completed` is 0 even with a release sub-failure: the primary artifact
/// exists.
pub fn report_exit_code(report: &JobReport) -> i32 {
    match report.state {
        JobState::Completed => 0,
        JobState::Failed => match report.reason.as_deref() {
            Some(REASON_PUBLISH_FAILED) => 4,
            Some(reason) if reason.starts_with("build-") => 3,
            Some("validation-failed") => 2,
            _ => 1,
        },
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn failed(reason: &str) -> JobReport {
        let mut report = JobReport::completed_for_test(Uuid::new_v4());
        report.state = JobState::Failed;
        report.reason = Some(reason.to_string());
        report
    }

    #[test]
    fn exit_codes_distinguish_failure_classes() {
        let completed = JobReport::completed_for_test(Uuid::new_v4());
        assert_eq!(report_exit_code(&completed), 0);
        assert_eq!(report_exit_code(&failed("build-fatal")), 3);
        assert_eq!(report_exit_code(&failed("build-exhausted-retries")), 3);
        assert_eq!(report_exit_code(&failed("build-cancelled")), 3);
        assert_eq!(report_exit_code(&failed(REASON_PUBLISH_FAILED)), 4);
    }

    #[test]
    fn release_sub_failure_still_exits_zero() {
        let mut report = JobReport::completed_for_test(Uuid::new_v4());
        report.release_error = Some("release API returned 503".to_string());
        assert_eq!(report_exit_code(&report), 0);
    }
}
