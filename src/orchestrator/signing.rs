//! Post-build package signing.
//!
//! `assembleRelease` without a Gradle signing config emits an unsigned
//! package. When a keystore is configured the package is zipaligned, signed
//! with `apksigner`, and verified before the publisher sees it. Signing
//! failures are never retried; a bad keystore does not get better.

use super::toolchain::summarize;
use crate::error::BuildError;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::process::Command;

/// Location of a system `zipalign`, probed once.
pub static ZIPALIGN_PATH: LazyLock<Option<PathBuf>> =
    LazyLock::new(|| probe_tool("zipalign"));

/// Location of a system `apksigner`, probed once.
pub static APKSIGNER_PATH: LazyLock<Option<PathBuf>> =
    LazyLock::new(|| probe_tool("apksigner"));

fn probe_tool(name: &str) -> Option<PathBuf> {
    match which::which(name) {
        Ok(path) => {
            log::debug!("found {name} at {}", path.display());
            Some(path)
        }
        Err(e) => {
            log::debug!("{name} not found in PATH: {e}");
            None
        }
    }
}

/// Keystore parameters for package signing.
#[derive(Debug, Clone)]
pub struct SigningConfig {
    /// Keystore file
    pub keystore: PathBuf,
    /// Keystore password
    pub keystore_pass: String,
    /// Key alias within the keystore; the keystore's single key when absent
    pub key_alias: Option<String>,
}

/// Aligns, signs, and verifies built packages.
#[derive(Debug, Clone)]
pub struct ApkSigner {
    config: SigningConfig,
    zipalign: PathBuf,
    apksigner: PathBuf,
}

impl ApkSigner {
    /// Probes the signing tools and fails fast when either is missing.
    pub fn new(config: SigningConfig) -> Result<Self, BuildError> {
        let zipalign = ZIPALIGN_PATH.clone().ok_or_else(|| BuildError::Fatal {
            reason: "keystore configured but no zipalign in PATH".to_string(),
        })?;
        let apksigner = APKSIGNER_PATH.clone().ok_or_else(|| BuildError::Fatal {
            reason: "keystore configured but no apksigner in PATH".to_string(),
        })?;
        Ok(ApkSigner {
            config,
            zipalign,
            apksigner,
        })
    }

    #[cfg(test)]
    fn with_tools(config: SigningConfig, zipalign: PathBuf, apksigner: PathBuf) -> Self {
        ApkSigner {
            config,
            zipalign,
            apksigner,
        }
    }

    /// Produces the aligned, signed package next to the unsigned input.
    pub async fn sign(&self, apk: &Path) -> Result<PathBuf, BuildError> {
        let aligned = aligned_path(apk);

        let mut align = Command::new(&self.zipalign);
        align.arg("-f").arg("4").arg(apk).arg(&aligned);
        run_tool(align, "zipalign").await?;

        let mut sign = Command::new(&self.apksigner);
        sign.arg("sign")
            .arg("--ks")
            .arg(&self.config.keystore)
            .arg("--ks-pass")
            .arg(format!("pass:{}", self.config.keystore_pass));
        if let Some(alias) = &self.config.key_alias {
            sign.arg("--ks-key-alias").arg(alias);
        }
        sign.arg(&aligned);
        run_tool(sign, "apksigner sign").await?;

        let mut verify = Command::new(&self.apksigner);
        verify.arg("verify").arg(&aligned);
        run_tool(verify, "apksigner verify").await?;

        log::info!("signed package at {}", aligned.display());
        Ok(aligned)
    }
}

/// `app-release.apk` -> `app-release-aligned.apk`, same directory.
fn aligned_path(apk: &Path) -> PathBuf {
    let stem = apk
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "app".to_string());
    apk.with_file_name(format!("{stem}-aligned.apk"))
}

async fn run_tool(mut command: Command, tool: &str) -> Result<(), BuildError> {
    let output = command
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| BuildError::Fatal {
            reason: format!("failed to spawn {tool}: {e}"),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stdout = String::from_utf8_lossy(&output.stdout);
        return Err(BuildError::Fatal {
            reason: format!("{tool} failed: {}", summarize(&format!("{stdout}\n{stderr}"))),
        });
    }
    Ok(())
}
