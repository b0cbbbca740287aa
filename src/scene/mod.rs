pub mod parser;
pub mod path;

use napi_derive::napi;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::common::{self, ParsedScene};
use crate::config::GeneratorConfig;
use crate::error::{GeneratorError, Result};
use parser::TscnParser;

/// Parsed scenes keyed by root node name. Built once per run, then read-only.
pub type SceneMap = BTreeMap<String, ParsedScene>;

/// Parse one scene file from disk
pub fn parse_scene_path(path: &Path, config: &GeneratorConfig) -> Result<ParsedScene> {
    let content = common::read_text_file(path)?;
    TscnParser::parse_with_config(&content, config)
}

/// Parse scene files in parallel and index them by root node name.
///
/// Scenes without node declarations contribute no entry. When two scenes
/// share a root name, the one whose path sorts first is kept.
pub fn build_scene_map(files: &[PathBuf], config: &GeneratorConfig) -> Result<SceneMap> {
    let mut sorted: Vec<&PathBuf> = files.iter().collect();
    sorted.sort();

    let parsed: Vec<(&PathBuf, Option<ParsedScene>)> = sorted
        .par_iter()
        .map(|file| match parse_scene_path(file, config) {
            Ok(scene) => Ok((*file, Some(scene))),
            Err(GeneratorError::Io { path, source }) => {
                log::warn!("Skipping unreadable scene {}: {}", path, source);
                Ok((*file, None))
            }
            Err(e) => Err(e),
        })
        .collect::<Result<Vec<_>>>()?;

    let mut map = SceneMap::new();
    for (file, scene) in parsed {
        let Some(scene) = scene else { continue };
        if scene.is_empty() {
            log::debug!("Scene {} declares no nodes", file.display());
            continue;
        }
        if map.contains_key(&scene.root_name) {
            log::warn!(
                "Scene root '{}' in {} is already defined by another scene; ignoring",
                scene.root_name,
                file.display()
            );
            continue;
        }
        map.insert(scene.root_name.clone(), scene);
    }

    Ok(map)
}

/// Parse a Godot text scene and return its node declarations.
#[napi]
pub fn parse_scene_file(file: String) -> napi::Result<ParsedScene> {
    Ok(parse_scene_path(Path::new(&file), &GeneratorConfig::default())?)
}

/// Resolve the root-relative path of every node in a scene file, in declaration order.
#[napi]
pub fn resolve_scene_paths(file: String) -> napi::Result<Vec<String>> {
    let config = GeneratorConfig::default();
    let scene = parse_scene_path(Path::new(&file), &config)?;
    Ok(path::resolve_all(&scene, &config.root_parent)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_build_scene_map_keys_by_root() {
        let tmp = tempfile::tempdir().unwrap();
        let main = tmp.path().join("main.tscn");
        let hud = tmp.path().join("hud.tscn");
        let empty = tmp.path().join("theme.tscn");
        fs::write(&main, "[node name=\"Main\" type=\"Node\"]\n[node name=\"HUD\" parent=\".\"]\n").unwrap();
        fs::write(&hud, "[node name=\"HUD\" type=\"CanvasLayer\"]\n").unwrap();
        fs::write(&empty, "[gd_resource type=\"Theme\" format=3]\n").unwrap();

        let map = build_scene_map(&[main, hud, empty], &GeneratorConfig::default()).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["Main"].nodes.len(), 2);
        assert_eq!(map["HUD"].nodes[0].type_name, "CanvasLayer");
        assert!(!map.contains_key(""));
    }

    #[test]
    fn test_duplicate_root_keeps_first_sorted_path() {
        let tmp = tempfile::tempdir().unwrap();
        let a = tmp.path().join("a.tscn");
        let b = tmp.path().join("b.tscn");
        fs::write(&a, "[node name=\"Level\" type=\"Node2D\"]\n").unwrap();
        fs::write(&b, "[node name=\"Level\" type=\"Node3D\"]\n").unwrap();

        let map = build_scene_map(&[b, a], &GeneratorConfig::default()).unwrap();
        assert_eq!(map["Level"].nodes[0].type_name, "Node2D");
    }

    #[test]
    fn test_missing_file_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let map = build_scene_map(&[tmp.path().join("gone.tscn")], &GeneratorConfig::default()).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_nameless_node_fails_the_map() {
        let tmp = tempfile::tempdir().unwrap();
        let bad = tmp.path().join("bad.tscn");
        fs::write(&bad, "[node type=\"Node\"]\n").unwrap();
        let result = build_scene_map(&[bad], &GeneratorConfig::default());
        assert!(matches!(result, Err(GeneratorError::MissingNodeName(_))));
    }
}
