//! Project templating: skeleton + resource bundle -> build-input tree.
//!
//! The skeleton is static and versioned; substitution is total. Handlebars
//! runs in strict mode so any placeholder without a config-derived value
//! fails the render instead of leaking `{{...}}` into the generated project.

pub mod hash;
mod skeleton;

pub use skeleton::SKELETON_VERSION;

use crate::config::BuildConfig;
use crate::error::GenerationError;
use crate::generator::ResourceBundle;
use handlebars::Handlebars;
use std::collections::BTreeMap;
use std::path::Path;

/// A complete, content-addressed build-input tree.
#[derive(Debug, Clone)]
pub struct ProjectTree {
    /// project-root-relative path -> file content
    pub files: BTreeMap<String, Vec<u8>>,
    /// SHA-256 content hash of the tree; attributes build results and keys
    /// the generation cache
    pub content_hash: String,
}

impl ProjectTree {
    /// Writes the tree to disk under `root`, creating directories as needed.
    pub fn materialize(&self, root: &Path) -> std::io::Result<()> {
        for (rel_path, content) in &self.files {
            let path = root.join(rel_path);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, content)?;
        }
        Ok(())
    }
}

/// Merges the resource bundle into the rendered skeleton.
///
/// Pure function of its inputs: the same config and bundle always produce
/// the same tree and hash.
pub fn render(
    config: &BuildConfig,
    bundle: &ResourceBundle,
) -> Result<ProjectTree, GenerationError> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars.set_strict_mode(true);

    let data = template_data(config);
    let mut files = BTreeMap::new();

    for (path_template, content_template) in skeleton::SKELETON {
        let path = handlebars
            .render_template(path_template, &data)
            .map_err(|e| GenerationError::UnresolvedPlaceholder {
                template: path_template.to_string(),
                reason: e.to_string(),
            })?;
        let content = handlebars
            .render_template(content_template, &data)
            .map_err(|e| GenerationError::UnresolvedPlaceholder {
                template: path_template.to_string(),
                reason: e.to_string(),
            })?;
        files.insert(path, content.into_bytes());
    }

    for (rel_path, content) in &bundle.files {
        files.insert(format!("app/src/main/res/{rel_path}"), content.clone());
    }

    let content_hash = hash::tree_hash(&files);
    Ok(ProjectTree {
        files,
        content_hash,
    })
}

fn template_data(config: &BuildConfig) -> BTreeMap<&'static str, String> {
    let mut data = BTreeMap::new();
    data.insert("package_name", config.host_name.clone());
    data.insert("package_path", config.package_path());
    data.insert("app_name", config.name.clone());
    data.insert("launcher_name", config.launcher_name.clone());
    data.insert("host_name", config.host_name.clone());
    data.insert("launch_url", config.launch_url.clone());
    data.insert("theme_color", config.theme_color.clone());
    data.insert("theme_color_dark", config.theme_color_dark.clone());
    data.insert("background_color", config.background_color.clone());
    data
}
