use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::Path;

use crate::common;
use crate::error::{GeneratorError, Result};

/// Name of the optional per-project config file looked up at the project root.
pub const CONFIG_FILENAME: &str = "node-getters.json";

/// Configuration for a generation run.
/// Controls which files are walked, how scene nodes are defaulted, and how
/// strictly class verification treats scenes it cannot find.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratorConfig {
    /// Extensions (without dot) of annotated source files.
    /// Default: ["cs"]
    pub source_extensions: BTreeSet<String>,

    /// Extensions (without dot) of scene-description files.
    /// Default: ["tscn"]
    pub scene_extensions: BTreeSet<String>,

    /// Directory names never descended into.
    /// Default: [".git", ".godot", ".import", "bin", "obj", "node_modules"]
    pub skip_dirs: BTreeSet<String>,

    /// Type recorded for scene nodes that declare none (instanced scenes).
    /// Default: "PackedScene"
    pub default_node_type: String,

    /// Parent value meaning "child of the scene root".
    /// Default: "."
    pub root_parent: String,

    /// Report a diagnostic when a verified class names a scene that was not found.
    /// Default: false (skip validation silently)
    pub strict_scene_lookup: bool,

    /// Emit the attribute-definition source alongside the accessors.
    /// Default: true
    pub emit_attribute_source: bool,

    /// Node method generated accessors call; must return null when the node is absent.
    /// Default: "GetNodeOrNull"
    pub lookup_method: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            source_extensions: ["cs"].iter().map(|s| s.to_string()).collect(),
            scene_extensions: ["tscn"].iter().map(|s| s.to_string()).collect(),
            skip_dirs: [".git", ".godot", ".import", "bin", "obj", "node_modules"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            default_node_type: "PackedScene".to_string(),
            root_parent: ".".to_string(),
            strict_scene_lookup: false,
            emit_attribute_source: true,
            lookup_method: "GetNodeOrNull".to_string(),
        }
    }
}

impl GeneratorConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a config from a JSON file. Missing keys fall back to defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = common::read_text_file(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: GeneratorConfig = serde_json::from_str(content)?;
        if config.root_parent.is_empty() {
            return Err(GeneratorError::Config("rootParent must not be empty".to_string()));
        }
        if config.lookup_method.is_empty()
            || !config.lookup_method.chars().all(|c| c.is_alphanumeric() || c == '_')
        {
            return Err(GeneratorError::Config(format!(
                "lookupMethod '{}' is not a method name",
                config.lookup_method
            )));
        }
        Ok(config)
    }

    /// Load `node-getters.json` from the project root if present, else defaults.
    pub fn discover(project_root: &Path) -> Result<Self> {
        let candidate = project_root.join(CONFIG_FILENAME);
        if candidate.is_file() {
            log::debug!("Loading generator config from {}", candidate.display());
            Self::from_file(candidate)
        } else {
            Ok(Self::default())
        }
    }

    pub fn is_source_file(&self, path: &Path) -> bool {
        has_extension(path, &self.source_extensions)
    }

    pub fn is_scene_file(&self, path: &Path) -> bool {
        has_extension(path, &self.scene_extensions)
    }

    pub fn is_skipped_dir(&self, name: &str) -> bool {
        self.skip_dirs.contains(name)
    }

    /// Add a scene-file extension, with or without the leading dot.
    pub fn add_scene_extension(&mut self, ext: &str) {
        self.scene_extensions.insert(normalize_extension(ext));
    }

    /// Add a source-file extension, with or without the leading dot.
    pub fn add_source_extension(&mut self, ext: &str) {
        self.source_extensions.insert(normalize_extension(ext));
    }

    pub fn add_skip_dir(&mut self, name: &str) {
        self.skip_dirs.insert(name.to_string());
    }

    pub fn remove_skip_dir(&mut self, name: &str) {
        self.skip_dirs.remove(name);
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim_start_matches('.').to_lowercase()
}

fn has_extension(path: &Path, set: &BTreeSet<String>) -> bool {
    path.extension()
        .is_some_and(|ext| set.contains(&ext.to_string_lossy().to_lowercase()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = GeneratorConfig::default();
        assert!(config.is_source_file(Path::new("Game/Main.cs")));
        assert!(config.is_scene_file(Path::new("Scenes/Main.tscn")));
        assert!(!config.is_scene_file(Path::new("Scenes/Main.tres")));
        assert!(config.is_skipped_dir(".godot"));
        assert_eq!(config.default_node_type, "PackedScene");
        assert_eq!(config.root_parent, ".");
        assert!(!config.strict_scene_lookup);
    }

    #[test]
    fn test_add_scene_extension_normalizes() {
        let mut config = GeneratorConfig::default();
        assert!(!config.is_scene_file(Path::new("level.escn")));
        config.add_scene_extension(".ESCN");
        assert!(config.is_scene_file(Path::new("level.escn")));
    }

    #[test]
    fn test_skip_dir_mutators() {
        let mut config = GeneratorConfig::default();
        config.add_skip_dir("addons");
        assert!(config.is_skipped_dir("addons"));
        config.remove_skip_dir("addons");
        assert!(!config.is_skipped_dir("addons"));
    }

    #[test]
    fn test_from_json_partial_overrides() {
        let config = GeneratorConfig::from_json(
            r#"{ "strictSceneLookup": true, "sceneExtensions": ["tscn", "escn"] }"#,
        )
        .unwrap();
        assert!(config.strict_scene_lookup);
        assert!(config.is_scene_file(Path::new("a.escn")));
        // Untouched keys keep their defaults
        assert_eq!(config.default_node_type, "PackedScene");
        assert!(config.emit_attribute_source);
    }

    #[test]
    fn test_from_json_rejects_empty_root_parent() {
        let result = GeneratorConfig::from_json(r#"{ "rootParent": "" }"#);
        assert!(matches!(result, Err(GeneratorError::Config(_))));
    }

    #[test]
    fn test_from_json_rejects_bad_lookup_method() {
        let result = GeneratorConfig::from_json(r#"{ "lookupMethod": "Get Node" }"#);
        assert!(matches!(result, Err(GeneratorError::Config(_))));

        let config = GeneratorConfig::from_json(r#"{ "lookupMethod": "GetNode" }"#).unwrap();
        assert_eq!(config.lookup_method, "GetNode");
    }

    #[test]
    fn test_from_json_invalid() {
        let result = GeneratorConfig::from_json("{ not json");
        assert!(matches!(result, Err(GeneratorError::Config(_))));
    }

    #[test]
    fn test_discover_missing_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = GeneratorConfig::discover(tmp.path()).unwrap();
        assert_eq!(config.root_parent, ".");
    }

    #[test]
    fn test_discover_reads_project_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILENAME),
            r#"{ "defaultNodeType": "Node" }"#,
        )
        .unwrap();
        let config = GeneratorConfig::discover(tmp.path()).unwrap();
        assert_eq!(config.default_node_type, "Node");
    }
}
