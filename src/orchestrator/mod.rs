//! Build orchestration: bounded-retry state machine around the toolchain.
//!
//! One [`run_build`] call drives the `Pending -> Running -> Success | Failure`
//! machine for a single job. Retry state lives entirely inside that call and
//! is discarded with it; nothing is shared across jobs.

pub mod signing;
pub mod toolchain;

pub use signing::SigningConfig;
pub use toolchain::{BuiltPackage, GradleToolchain, Toolchain};

use crate::error::BuildError;
use std::path::Path;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Retry and timeout knobs.
///
/// The retry bound and backoff curve are deliberately configuration, not
/// constants.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum toolchain invocations per job (first attempt included)
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles each retry
    pub base_delay: Duration,
    /// Backoff ceiling
    pub max_delay: Duration,
    /// Overall per-job budget; elapsing it cancels the build
    pub job_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        OrchestratorConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            job_timeout: Duration::from_secs(1200),
        }
    }
}

/// Build sub-machine states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Pending,
    Running,
    Success,
    Failure,
}

/// Machine-readable terminal failure reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// Transient failures persisted through the retry bound
    ExhaustedRetries,
    /// Non-retryable toolchain failure
    Fatal,
    /// Per-job timeout elapsed
    Cancelled,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureReason::ExhaustedRetries => "build-exhausted-retries",
            FailureReason::Fatal => "build-fatal",
            FailureReason::Cancelled => "build-cancelled",
        }
    }
}

/// Terminal result of one job's build phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Package produced; carries provenance for the publisher
    Success {
        /// The built package
        package: BuiltPackage,
        /// Content hash of the tree the package was built from
        content_hash: String,
        /// Toolchain invocations used
        attempts: u32,
    },
    /// Terminal failure
    Failure {
        /// Machine-readable reason
        reason: FailureReason,
        /// Human-readable message
        message: String,
        /// Toolchain invocations used
        attempts: u32,
    },
}

/// Drives the build state machine for one job.
///
/// Transient failures are retried up to `config.max_attempts` with
/// exponential backoff and jitter; fatal failures and timeout cancellation
/// are immediately terminal. The job never remains `Running` past its
/// timeout: cancellation transitions straight to `Failure`.
pub async fn run_build<T: Toolchain>(
    toolchain: &T,
    project_root: &Path,
    content_hash: &str,
    config: &OrchestratorConfig,
) -> BuildOutcome {
    let mut state = BuildState::Pending;
    let started = Instant::now();
    let deadline = started + config.job_timeout;
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;
        advance(&mut state, BuildState::Running, attempt);

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            advance(&mut state, BuildState::Failure, attempt);
            return cancelled(started, attempt);
        }

        let result = tokio::time::timeout(remaining, toolchain.build(project_root)).await;

        match result {
            Err(_elapsed) => {
                advance(&mut state, BuildState::Failure, attempt);
                return cancelled(started, attempt);
            }
            Ok(Ok(package)) => {
                advance(&mut state, BuildState::Success, attempt);
                return BuildOutcome::Success {
                    package,
                    content_hash: content_hash.to_string(),
                    attempts: attempt,
                };
            }
            Ok(Err(BuildError::Cancelled { .. })) => {
                advance(&mut state, BuildState::Failure, attempt);
                return cancelled(started, attempt);
            }
            Ok(Err(err)) if err.is_transient() && attempt < config.max_attempts => {
                let delay = backoff_delay(config, attempt);
                log::warn!(
                    "attempt {attempt}/{} failed transiently ({err}), retrying in {delay:?}",
                    config.max_attempts
                );
                tokio::time::sleep(delay).await;
            }
            Ok(Err(err)) => {
                advance(&mut state, BuildState::Failure, attempt);
                let reason = if err.is_transient() {
                    FailureReason::ExhaustedRetries
                } else {
                    FailureReason::Fatal
                };
                return BuildOutcome::Failure {
                    reason,
                    message: err.to_string(),
                    attempts: attempt,
                };
            }
        }
    }
}

fn cancelled(started: Instant, attempts: u32) -> BuildOutcome {
    BuildOutcome::Failure {
        reason: FailureReason::Cancelled,
        message: BuildError::Cancelled {
            elapsed_secs: started.elapsed().as_secs(),
        }
        .to_string(),
        attempts,
    }
}

fn advance(state: &mut BuildState, to: BuildState, attempt: u32) {
    if *state != to {
        log::debug!("build state {:?} -> {:?} (attempt {attempt})", *state, to);
        *state = to;
    }
}

/// Exponential backoff with +/-25% jitter.
///
/// Jitter keeps concurrent jobs from retrying in lockstep against shared
/// build infrastructure.
fn backoff_delay(config: &OrchestratorConfig, attempt: u32) -> Duration {
    let exp = config
        .base_delay
        .saturating_mul(1u32 << (attempt - 1).min(16))
        .min(config.max_delay);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0) as u64;
    // Scale into [-25%, +25%] of the base delay.
    let quarter = exp.as_millis() as u64 / 4;
    let jitter_ms = if quarter == 0 { 0 } else { nanos % (2 * quarter) };
    let base_ms = exp.as_millis() as u64;

    Duration::from_millis(base_ms - quarter + jitter_ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Scripted toolchain: pops one result per invocation.
    struct ScriptedToolchain {
        script: Mutex<Vec<Result<BuiltPackage, BuildError>>>,
        calls: Mutex<u32>,
    }

    impl ScriptedToolchain {
        fn new(script: Vec<Result<BuiltPackage, BuildError>>) -> Self {
            ScriptedToolchain {
                script: Mutex::new(script),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> u32 {
            *self.calls.lock().expect("lock")
        }
    }

    impl Toolchain for ScriptedToolchain {
        async fn build(&self, _root: &Path) -> Result<BuiltPackage, BuildError> {
            *self.calls.lock().expect("lock") += 1;
            self.script
                .lock()
                .expect("lock")
                .remove(0)
        }
    }

    fn package() -> BuiltPackage {
        BuiltPackage {
            apk_path: PathBuf::from("app/build/outputs/apk/release/app-release.apk"),
        }
    }

    fn transient() -> BuildError {
        BuildError::Transient {
            reason: "Could not resolve".to_string(),
        }
    }

    fn config() -> OrchestratorConfig {
        OrchestratorConfig {
            base_delay: Duration::from_millis(10),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_first_attempt() {
        let tc = ScriptedToolchain::new(vec![Ok(package())]);
        let outcome = run_build(&tc, Path::new("."), "hash", &config()).await;
        assert_eq!(
            outcome,
            BuildOutcome::Success {
                package: package(),
                content_hash: "hash".to_string(),
                attempts: 1
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_retry_then_succeed() {
        let tc = ScriptedToolchain::new(vec![Err(transient()), Err(transient()), Ok(package())]);
        let outcome = run_build(&tc, Path::new("."), "hash", &config()).await;
        assert!(matches!(outcome, BuildOutcome::Success { attempts: 3, .. }));
        assert_eq!(tc.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_exhaust_the_bound() {
        let tc = ScriptedToolchain::new(vec![Err(transient()), Err(transient()), Err(transient())]);
        let outcome = run_build(&tc, Path::new("."), "hash", &config()).await;
        match outcome {
            BuildOutcome::Failure {
                reason, attempts, ..
            } => {
                assert_eq!(reason, FailureReason::ExhaustedRetries);
                assert_eq!(reason.as_str(), "build-exhausted-retries");
                assert_eq!(attempts, 3);
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(tc.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_failure_is_terminal_on_first_occurrence() {
        let tc = ScriptedToolchain::new(vec![Err(BuildError::Fatal {
            reason: "cannot find symbol".to_string(),
        })]);
        let outcome = run_build(&tc, Path::new("."), "hash", &config()).await;
        match outcome {
            BuildOutcome::Failure {
                reason, attempts, ..
            } => {
                assert_eq!(reason, FailureReason::Fatal);
                assert_eq!(reason.as_str(), "build-fatal");
                assert_eq!(attempts, 1);
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert_eq!(tc.calls(), 1);
    }

    /// Toolchain that never finishes inside the job timeout.
    struct StalledToolchain;

    impl Toolchain for StalledToolchain {
        async fn build(&self, _root: &Path) -> Result<BuiltPackage, BuildError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(BuiltPackage {
                apk_path: PathBuf::from("never"),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_cancels_instead_of_hanging() {
        let config = OrchestratorConfig {
            job_timeout: Duration::from_secs(5),
            ..config()
        };
        let outcome = run_build(&StalledToolchain, Path::new("."), "hash", &config).await;
        match outcome {
            BuildOutcome::Failure { reason, .. } => {
                assert_eq!(reason, FailureReason::Cancelled);
                assert_eq!(reason.as_str(), "build-cancelled");
            }
            other => panic!("expected cancellation, got {other:?}"),
        }
    }

    /// Cancellation must take the toolchain process down with the job, not
    /// leave it building in the background.
    #[cfg(unix)]
    #[tokio::test]
    async fn cancellation_kills_the_toolchain_process() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let script = dir.path().join("gradlew");
        std::fs::write(&script, "#!/bin/sh\necho $$ > gradle.pid\nexec sleep 30\n")
            .expect("write script");
        let mut perms = std::fs::metadata(&script).expect("metadata").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&script, perms).expect("chmod");

        let config = OrchestratorConfig {
            job_timeout: Duration::from_millis(500),
            ..Default::default()
        };
        let outcome = run_build(&GradleToolchain::new(), dir.path(), "hash", &config).await;
        assert!(matches!(
            outcome,
            BuildOutcome::Failure {
                reason: FailureReason::Cancelled,
                ..
            }
        ));

        let pid: u32 = std::fs::read_to_string(dir.path().join("gradle.pid"))
            .expect("pid file")
            .trim()
            .parse()
            .expect("pid");

        // The kill lands on drop; allow for reaping lag and accept a zombie.
        let dead = |pid: u32| match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => stat.split_whitespace().nth(2) == Some("Z"),
            Err(_) => true,
        };
        for _ in 0..40 {
            if dead(pid) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("toolchain process {pid} survived cancellation");
    }

    #[test]
    fn backoff_grows_and_caps() {
        let config = OrchestratorConfig {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            ..Default::default()
        };
        // With +/-25% jitter, attempt 1 stays within [375, 625] ms.
        let d1 = backoff_delay(&config, 1);
        assert!(d1 >= Duration::from_millis(375) && d1 <= Duration::from_millis(625));

        // Attempt 10 would be 256s un-capped; cap keeps it near 8s.
        let d10 = backoff_delay(&config, 10);
        assert!(d10 <= Duration::from_millis(10_000));
    }
}
