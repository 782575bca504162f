//! Command line argument parsing.
//!
//! All BuildConfig fields are accepted as flags; alternatively (or in
//! addition) `--request` points at a JSON file in either accepted payload
//! shape. Flags override file values, and the merged payload goes through
//! the same normalization and validation as a dispatched event.

use clap::Parser;
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Android WebView wrapper build pipeline
#[derive(Parser, Debug)]
#[command(
    name = "apkwrap",
    version,
    about = "Builds and publishes an Android WebView wrapper for a website",
    long_about = "Turns a declarative site description (package id, display name, launch URL, \
theming, icon choice) into a buildable Android WebView wrapper project, drives the build \
toolchain, and publishes the resulting package.

Usage:
  apkwrap --host-name com.example.myapp --name \"My App\" --launch-url https://example.com
  apkwrap --request build.json --create-release
  apkwrap --request build.json --generate-only --output-dir ./out

Exit codes: 0 completed (release sub-failures included), 2 validation failure, \
3 build failure, 4 publish failure, 1 anything else."
)]
pub struct Args {
    /// JSON request file (flat or nested under "buildConfig")
    #[arg(short = 'r', long, value_name = "PATH")]
    pub request: Option<PathBuf>,

    /// Reverse-domain package id, e.g. com.example.myapp
    #[arg(long, value_name = "PACKAGE")]
    pub host_name: Option<String>,

    /// Display name
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Absolute http/https URL opened on launch
    #[arg(long, value_name = "URL")]
    pub launch_url: Option<String>,

    /// Short launcher label (defaults to the display name)
    #[arg(long, value_name = "NAME")]
    pub launcher_name: Option<String>,

    /// Primary theme color, #RRGGBB
    #[arg(long, value_name = "COLOR")]
    pub theme_color: Option<String>,

    /// Dark-variant theme color, #RRGGBB
    #[arg(long, value_name = "COLOR")]
    pub theme_color_dark: Option<String>,

    /// Window background color, #RRGGBB
    #[arg(long, value_name = "COLOR")]
    pub background_color: Option<String>,

    /// Launcher icon key from the registry
    #[arg(long, value_name = "KEY")]
    pub icon_choice: Option<String>,

    /// Destination repository / artifact bundle name
    #[arg(long, value_name = "NAME")]
    pub repo_name: Option<String>,

    /// Create a tagged release after a successful build
    #[arg(long)]
    pub create_release: bool,

    /// Output directory for local artifacts and generated trees
    #[arg(short = 'o', long, value_name = "DIR", default_value = "apkwrap-out")]
    pub output_dir: PathBuf,

    /// Remote artifact store base URL; local filesystem store when absent
    #[arg(long, value_name = "URL", env = "APKWRAP_STORE_URL")]
    pub store_url: Option<String>,

    /// Bearer token for the remote artifact store
    #[arg(long, value_name = "TOKEN", env = "APKWRAP_STORE_TOKEN", hide_env_values = true)]
    pub store_token: Option<String>,

    /// Webhook notified of terminal job states
    #[arg(long, value_name = "URL", env = "APKWRAP_WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Keystore for signing the built package; unsigned when absent
    #[arg(long, value_name = "PATH", env = "APKWRAP_KEYSTORE")]
    pub keystore: Option<PathBuf>,

    /// Keystore password (required with --keystore)
    #[arg(
        long,
        value_name = "PASS",
        env = "APKWRAP_KEYSTORE_PASS",
        hide_env_values = true,
        requires = "keystore"
    )]
    pub keystore_pass: Option<String>,

    /// Key alias within the keystore
    #[arg(long, value_name = "ALIAS", requires = "keystore")]
    pub key_alias: Option<String>,

    /// Maximum toolchain invocations per job
    #[arg(long, value_name = "N")]
    pub max_attempts: Option<u32>,

    /// Overall per-job timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub job_timeout_secs: Option<u64>,

    /// Generate and hash the project tree without building or publishing
    #[arg(long)]
    pub generate_only: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Merges the request file (if any) and flags into a single payload.
    ///
    /// The file may use either accepted shape; flags override its fields.
    pub fn payload(&self) -> anyhow::Result<Value> {
        let mut fields: Map<String, Value> = match &self.request {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display()))?;
                let value: Value = serde_json::from_str(&raw)
                    .map_err(|e| anyhow::anyhow!("parsing {}: {e}", path.display()))?;
                // Collapse the nested shape before merging flags.
                let inner = match value {
                    Value::Object(mut map) => match map.remove("buildConfig") {
                        Some(Value::Object(nested)) => nested,
                        Some(other) => {
                            anyhow::bail!("buildConfig must be an object, got {other}")
                        }
                        None => map,
                    },
                    other => anyhow::bail!("request file must contain a JSON object, got {other}"),
                };
                inner
            }
            None => Map::new(),
        };

        let overrides = [
            ("hostName", &self.host_name),
            ("name", &self.name),
            ("launchUrl", &self.launch_url),
            ("launcherName", &self.launcher_name),
            ("themeColor", &self.theme_color),
            ("themeColorDark", &self.theme_color_dark),
            ("backgroundColor", &self.background_color),
            ("iconChoice", &self.icon_choice),
            ("repoName", &self.repo_name),
        ];
        for (key, value) in overrides {
            if let Some(value) = value {
                fields.insert(key.to_string(), Value::String(value.clone()));
            }
        }
        if self.create_release {
            fields.insert("createRelease".to_string(), Value::Bool(true));
        }

        Ok(Value::Object(fields))
    }
}
