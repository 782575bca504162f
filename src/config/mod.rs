//! Request payload normalization and validation.
//!
//! Two historical request shapes exist: the fields flat at the top level, or
//! nested under a `buildConfig` object. [`RawConfig::from_payload`] collapses
//! both into one raw form before any validation runs, so nothing downstream
//! ever branches on shape.
//!
//! Validation collects every violation before returning: a caller gets the
//! complete list of offending fields in one round trip. Defaults are applied
//! only to absent fields; a present-but-invalid value is reported, never
//! silently replaced.

mod validate;

pub use validate::FieldError;

use crate::registry;
use serde::{Deserialize, Serialize};

/// Raw build request as received, before validation.
///
/// Every field is optional here; requiredness is enforced by
/// [`RawConfig::validate`] so that all violations can be reported together.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConfig {
    pub host_name: Option<String>,
    pub name: Option<String>,
    pub launch_url: Option<String>,
    pub launcher_name: Option<String>,
    pub theme_color: Option<String>,
    pub theme_color_dark: Option<String>,
    pub background_color: Option<String>,
    pub icon_choice: Option<String>,
    pub repo_name: Option<String>,
    pub create_release: Option<bool>,
}

/// Envelope for the nested request shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NestedPayload {
    build_config: RawConfig,
}

impl RawConfig {
    /// Normalizes a request payload of either accepted shape.
    ///
    /// A payload carrying a `buildConfig` object is unwrapped; anything else
    /// is treated as the flat shape.
    pub fn from_payload(payload: serde_json::Value) -> Result<Self, serde_json::Error> {
        if payload.get("buildConfig").is_some() {
            let nested: NestedPayload = serde_json::from_value(payload)?;
            Ok(nested.build_config)
        } else {
            serde_json::from_value(payload)
        }
    }

    /// Validates and normalizes into an immutable [`BuildConfig`].
    ///
    /// Checks run in field declaration order and never short-circuit.
    pub fn validate(self) -> Result<BuildConfig, ValidationError> {
        let mut errors = Vec::new();

        let host_name = validate::required("hostName", self.host_name, &mut errors)
            .and_then(|v| validate::package_name("hostName", v, &mut errors));

        let name = validate::required("name", self.name, &mut errors)
            .and_then(|v| validate::non_empty("name", v, &mut errors));

        let launch_url = validate::required("launchUrl", self.launch_url, &mut errors)
            .and_then(|v| validate::launch_url("launchUrl", v, &mut errors));

        let theme_color = validate::hex_color(
            "themeColor",
            self.theme_color,
            registry::DEFAULT_THEME_COLOR,
            &mut errors,
        );
        let theme_color_dark = validate::hex_color(
            "themeColorDark",
            self.theme_color_dark,
            registry::DEFAULT_THEME_COLOR_DARK,
            &mut errors,
        );
        let background_color = validate::hex_color(
            "backgroundColor",
            self.background_color,
            registry::DEFAULT_BACKGROUND_COLOR,
            &mut errors,
        );

        let icon_choice = validate::icon_choice("iconChoice", self.icon_choice, &mut errors);

        if !errors.is_empty() {
            return Err(ValidationError { errors });
        }

        // All Options are Some here: a None without a recorded error is
        // unreachable given the checks above.
        let name = name.ok_or_else(ValidationError::internal)?;
        let launcher_name = self.launcher_name.unwrap_or_else(|| name.clone());

        Ok(BuildConfig {
            host_name: host_name.ok_or_else(ValidationError::internal)?,
            launcher_name,
            name,
            launch_url: launch_url.ok_or_else(ValidationError::internal)?,
            theme_color: theme_color.ok_or_else(ValidationError::internal)?,
            theme_color_dark: theme_color_dark.ok_or_else(ValidationError::internal)?,
            background_color: background_color.ok_or_else(ValidationError::internal)?,
            icon_choice: icon_choice.ok_or_else(ValidationError::internal)?,
            repo_name: self.repo_name,
            create_release: self.create_release.unwrap_or(false),
        })
    }
}

/// Validated, normalized build request.
///
/// Immutable once constructed; every derived resource is a pure function of
/// this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    /// Reverse-domain application id, e.g. `com.example.myapp`
    pub host_name: String,
    /// Display name
    pub name: String,
    /// Absolute http/https URL the wrapper opens on launch
    pub launch_url: String,
    /// Short launcher label; defaults to `name`
    pub launcher_name: String,
    /// Primary theme color, `#RRGGBB`
    pub theme_color: String,
    /// Dark-variant theme color, `#RRGGBB`
    pub theme_color_dark: String,
    /// Window background color, `#RRGGBB`
    pub background_color: String,
    /// Key into the icon registry
    pub icon_choice: String,
    /// Destination repository / artifact bundle name
    pub repo_name: Option<String>,
    /// Whether to create a tagged release after a successful build
    pub create_release: bool,
}

impl BuildConfig {
    /// Source file path segment for the application package
    /// (`com.example.app` becomes `com/example/app`).
    pub fn package_path(&self) -> String {
        self.host_name.replace('.', "/")
    }
}

/// Terminal validation failure carrying the full list of field errors.
#[derive(Debug)]
pub struct ValidationError {
    /// All offending fields, in declaration order
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    /// Field names of every violation, in declaration order.
    pub fn fields(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.field.as_str()).collect()
    }

    fn internal() -> Self {
        ValidationError {
            errors: vec![FieldError {
                field: "internal".to_string(),
                reason: "validator accepted a field it failed to produce".to_string(),
            }],
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "validation failed for {} field(s):", self.errors.len())?;
        for err in &self.errors {
            write!(f, "\n  {}: {}", err.field, err.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
