//! Deterministic resource generation.
//!
//! [`generate`] is a pure function of a validated [`BuildConfig`]: the same
//! config always yields a byte-identical [`ResourceBundle`], which is what
//! makes content-addressable caching of generation results sound. Nothing
//! here reads the clock, the environment, or any external input.

pub mod icons;

use crate::config::BuildConfig;
use crate::error::GenerationError;
use crate::registry;
use std::collections::BTreeMap;

/// Generated resource files, keyed by path relative to `app/src/main/res/`.
///
/// A `BTreeMap` keeps iteration order sorted, so downstream hashing sees the
/// files in a stable order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBundle {
    /// res-relative path -> file content
    pub files: BTreeMap<String, Vec<u8>>,
}

/// Derives the full resource bundle for a validated config.
///
/// Produces launcher icons at every registry density, the strings manifest
/// fragment, and the light/dark color sets. The three configured colors are
/// used verbatim; there is no blending or derivation.
pub fn generate(config: &BuildConfig) -> Result<ResourceBundle, GenerationError> {
    let spec = registry::icon(&config.icon_choice).ok_or_else(|| {
        // Validation guarantees registry membership; reaching this is a bug.
        GenerationError::UnknownIconKey {
            key: config.icon_choice.clone(),
        }
    })?;

    let mut files = BTreeMap::new();

    for density in registry::DENSITIES {
        let png = icons::render_png(spec, density.size_px)?;
        files.insert(
            format!("mipmap-{}/ic_launcher.png", density.qualifier),
            png,
        );
    }

    files.insert("values/strings.xml".to_string(), strings_xml(config).into_bytes());
    files.insert("values/colors.xml".to_string(), colors_xml(config).into_bytes());
    files.insert(
        "values-night/colors.xml".to_string(),
        colors_night_xml(config).into_bytes(),
    );

    Ok(ResourceBundle { files })
}

/// Manifest fragment: identity strings consumed by the wrapper activity.
fn strings_xml(config: &BuildConfig) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<resources>
    <string name="app_name">{name}</string>
    <string name="launcher_name">{launcher}</string>
    <string name="host_name">{host}</string>
    <string name="launch_url">{url}</string>
</resources>
"#,
        name = xml_escape(&config.name),
        launcher = xml_escape(&config.launcher_name),
        host = xml_escape(&config.host_name),
        url = xml_escape(&config.launch_url),
    )
}

/// Light color set, values taken verbatim from the config.
fn colors_xml(config: &BuildConfig) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<resources>
    <color name="colorPrimary">{theme}</color>
    <color name="colorPrimaryDark">{dark}</color>
    <color name="backgroundColor">{background}</color>
    <color name="navigationBarColor">{dark}</color>
</resources>
"#,
        theme = config.theme_color,
        dark = config.theme_color_dark,
        background = config.background_color,
    )
}

/// Dark color set: the dark variant becomes primary, background unchanged.
fn colors_night_xml(config: &BuildConfig) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<resources>
    <color name="colorPrimary">{dark}</color>
    <color name="colorPrimaryDark">{dark}</color>
    <color name="backgroundColor">{background}</color>
    <color name="navigationBarColor">{dark}</color>
</resources>
"#,
        dark = config.theme_color_dark,
        background = config.background_color,
    )
}

fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RawConfig;
    use serde_json::json;

    fn config() -> BuildConfig {
        RawConfig::from_payload(json!({
            "hostName": "com.example.myapp",
            "name": "My <App> & Co",
            "launchUrl": "https://example.com",
            "themeColor": "#112233",
            "themeColorDark": "#001122",
            "backgroundColor": "#FAFAFA"
        }))
        .expect("parse")
        .validate()
        .expect("valid")
    }

    #[test]
    fn generation_is_byte_identical_across_runs() {
        let config = config();
        let first = generate(&config).expect("generate");
        let second = generate(&config).expect("generate");
        assert_eq!(first, second);
    }

    #[test]
    fn bundle_contains_every_density() {
        let bundle = generate(&config()).expect("generate");
        for density in registry::DENSITIES {
            let path = format!("mipmap-{}/ic_launcher.png", density.qualifier);
            assert!(bundle.files.contains_key(&path), "missing {path}");
        }
    }

    #[test]
    fn icon_pngs_decode_at_registry_sizes() {
        let bundle = generate(&config()).expect("generate");
        for density in registry::DENSITIES {
            let path = format!("mipmap-{}/ic_launcher.png", density.qualifier);
            let bytes = &bundle.files[&path];
            let img = image::load_from_memory(bytes).expect("valid png");
            assert_eq!(img.width(), density.size_px);
            assert_eq!(img.height(), density.size_px);
        }
    }

    #[test]
    fn colors_are_used_verbatim() {
        let bundle = generate(&config()).expect("generate");
        let colors = String::from_utf8(bundle.files["values/colors.xml"].clone()).expect("utf8");
        assert!(colors.contains("#112233"));
        assert!(colors.contains("#001122"));
        assert!(colors.contains("#FAFAFA"));

        let night =
            String::from_utf8(bundle.files["values-night/colors.xml"].clone()).expect("utf8");
        assert!(night.contains("#001122"));
        assert!(!night.contains("#112233"));
    }

    #[test]
    fn strings_fragment_is_escaped() {
        let bundle = generate(&config()).expect("generate");
        let strings = String::from_utf8(bundle.files["values/strings.xml"].clone()).expect("utf8");
        assert!(strings.contains("My &lt;App&gt; &amp; Co"));
        assert!(strings.contains("com.example.myapp"));
        assert!(strings.contains("https://example.com"));
    }

    #[test]
    fn different_icon_choice_changes_the_bundle() {
        let mut other = config();
        other.icon_choice = "globe".to_string();
        let phone = generate(&config()).expect("generate");
        let globe = generate(&other).expect("generate");
        assert_ne!(
            phone.files["mipmap-xhdpi/ic_launcher.png"],
            globe.files["mipmap-xhdpi/ic_launcher.png"]
        );
    }
}
