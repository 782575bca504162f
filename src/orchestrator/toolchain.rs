//! External build toolchain invocation.
//!
//! [`Toolchain`] is the seam between the orchestrator and the real Android
//! build system; tests substitute scripted implementations. The production
//! [`GradleToolchain`] shells out to Gradle and classifies failures from the
//! process output.

use super::signing::{ApkSigner, SigningConfig};
use crate::error::BuildError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::SystemTime;
use tokio::process::Command;

/// A package produced by a successful toolchain run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPackage {
    /// Path to the installable package on local disk
    pub apk_path: PathBuf,
}

/// External build toolchain: generated project tree in, package out.
#[allow(async_fn_in_trait)]
pub trait Toolchain {
    /// Builds the project rooted at `project_root`.
    ///
    /// Failures must be classified: [`BuildError::Transient`] for dependency
    /// fetch or contention problems, [`BuildError::Fatal`] for anything that
    /// retrying cannot fix.
    async fn build(&self, project_root: &Path) -> Result<BuiltPackage, BuildError>;
}

/// Location of a system `gradle`, probed once.
pub static GRADLE_PATH: LazyLock<Option<PathBuf>> = LazyLock::new(|| match which::which("gradle") {
    Ok(path) => {
        log::debug!("found gradle at {}", path.display());
        Some(path)
    }
    Err(e) => {
        log::debug!("gradle not found in PATH: {e}");
        None
    }
});

/// Output substrings that indicate a retryable toolchain failure.
///
/// Dependency resolution and lock contention come and go; compile errors do
/// not.
const TRANSIENT_MARKERS: &[&str] = &[
    "Could not resolve",
    "Could not GET",
    "Could not download",
    "Connection reset",
    "Connection refused",
    "Read timed out",
    "Timeout waiting to lock",
    "Received status code 5",
];

/// Gradle-backed toolchain.
///
/// Prefers the project's own `gradlew` wrapper when present, falling back to
/// a system `gradle`. With a keystore configured the built package is
/// aligned, signed, and verified before it is handed to the publisher.
#[derive(Debug, Clone, Default)]
pub struct GradleToolchain {
    signer: Option<ApkSigner>,
}

impl GradleToolchain {
    /// Unsigned toolchain; `assembleRelease` output is published as-is.
    pub fn new() -> Self {
        GradleToolchain { signer: None }
    }

    /// Toolchain that signs the built package with the given keystore.
    pub fn with_signing(config: SigningConfig) -> Result<Self, BuildError> {
        Ok(GradleToolchain {
            signer: Some(ApkSigner::new(config)?),
        })
    }

    fn launcher(&self, project_root: &Path) -> Result<PathBuf, BuildError> {
        let wrapper = project_root.join("gradlew");
        if wrapper.is_file() {
            return Ok(wrapper);
        }
        GRADLE_PATH.clone().ok_or_else(|| BuildError::Fatal {
            reason: "no gradlew wrapper in project and no gradle in PATH".to_string(),
        })
    }
}

impl Toolchain for GradleToolchain {
    async fn build(&self, project_root: &Path) -> Result<BuiltPackage, BuildError> {
        let launcher = self.launcher(project_root)?;

        log::info!(
            "invoking {} assembleRelease in {}",
            launcher.display(),
            project_root.display()
        );

        // Timeout cancellation drops this future; the child must die with it
        // instead of building on as an orphan.
        let output = Command::new(&launcher)
            .arg("assembleRelease")
            .arg("--no-daemon")
            .current_dir(project_root)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| BuildError::Fatal {
                reason: format!("failed to spawn {}: {e}", launcher.display()),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(classify_failure(
                output.status.code(),
                &format!("{stdout}\n{stderr}"),
            ));
        }

        let apk_path = find_apk(project_root).ok_or_else(|| BuildError::Fatal {
            reason: "gradle reported success but no .apk was found under app/build/outputs"
                .to_string(),
        })?;

        let apk_path = match &self.signer {
            Some(signer) => signer.sign(&apk_path).await?,
            None => {
                log::debug!("no keystore configured, package stays unsigned");
                apk_path
            }
        };

        Ok(BuiltPackage { apk_path })
    }
}

/// Classifies a failed toolchain run from its exit code and combined output.
pub fn classify_failure(exit_code: Option<i32>, output: &str) -> BuildError {
    let reason = match exit_code {
        Some(code) => format!("toolchain exited with status {code}"),
        None => "toolchain terminated by signal".to_string(),
    };

    if TRANSIENT_MARKERS.iter().any(|m| output.contains(m)) {
        BuildError::Transient {
            reason: format!("{reason}: {}", summarize(output)),
        }
    } else {
        BuildError::Fatal {
            reason: format!("{reason}: {}", summarize(output)),
        }
    }
}

/// Locates the newest `.apk` under the toolchain's output directories.
pub fn find_apk(project_root: &Path) -> Option<PathBuf> {
    let outputs = project_root.join("app").join("build").join("outputs");

    let mut candidates: Vec<(SystemTime, PathBuf)> = walkdir::WalkDir::new(outputs)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "apk"))
        .filter_map(|e| {
            let modified = e.metadata().ok()?.modified().ok()?;
            Some((modified, e.into_path()))
        })
        .collect();

    candidates.sort_by(|a, b| b.0.cmp(&a.0));
    candidates.into_iter().map(|(_, path)| path).next()
}

/// Last few non-empty output lines, enough to identify the failure.
pub(super) fn summarize(output: &str) -> String {
    let lines: Vec<&str> = output
        .lines()
        .filter(|l| !l.trim().is_empty())
        .collect();
    let tail = lines.len().saturating_sub(5);
    lines[tail..].join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_fetch_failures_are_transient() {
        let err = classify_failure(
            Some(1),
            "FAILURE: Build failed\n> Could not resolve com.android.tools.build:gradle:8.2.0",
        );
        assert!(err.is_transient());
    }

    #[test]
    fn compile_errors_are_fatal() {
        let err = classify_failure(
            Some(1),
            "MainActivity.java:12: error: cannot find symbol",
        );
        assert!(!err.is_transient());
    }

    #[test]
    fn signal_termination_is_fatal() {
        assert!(!classify_failure(None, "").is_transient());
    }

    #[test]
    fn find_apk_prefers_newest() {
        let dir = tempfile::tempdir().expect("tempdir");
        let outputs = dir.path().join("app/build/outputs/apk/release");
        std::fs::create_dir_all(&outputs).expect("mkdir");

        let old = outputs.join("app-release-old.apk");
        std::fs::write(&old, b"old").expect("write");
        // Distinct mtimes without sleeping.
        let past = std::time::SystemTime::now() - std::time::Duration::from_secs(60);
        let file = std::fs::File::open(&old).expect("open");
        file.set_modified(past).expect("set mtime");

        let new = outputs.join("app-release.apk");
        std::fs::write(&new, b"new").expect("write");

        assert_eq!(find_apk(dir.path()), Some(new));
    }

    #[test]
    fn find_apk_ignores_other_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let outputs = dir.path().join("app/build/outputs/apk/release");
        std::fs::create_dir_all(&outputs).expect("mkdir");
        std::fs::write(outputs.join("output-metadata.json"), b"{}").expect("write");

        assert_eq!(find_apk(dir.path()), None);
    }
}
