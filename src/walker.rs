use napi_derive::napi;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::GeneratorConfig;

/// Source and scene files found under a project root, each sorted by path
#[derive(Debug, Default, Clone)]
pub struct ProjectFiles {
    pub sources: Vec<PathBuf>,
    pub scenes: Vec<PathBuf>,
}

impl ProjectFiles {
    pub fn total(&self) -> usize {
        self.sources.len() + self.scenes.len()
    }
}

/// Walk a Godot project and collect files matching the given extensions.
///
/// Skips the configured noise directories (`.godot`, `.import`, `bin`, ...)
/// plus any extra `exclude_dirs`. Results are sorted.
#[napi]
pub fn walk_project_files(
    project_path: String,
    extensions: Vec<String>,
    exclude_dirs: Option<Vec<String>>,
) -> Vec<String> {
    let mut config = GeneratorConfig::default();
    for dir in exclude_dirs.unwrap_or_default() {
        config.add_skip_dir(&dir);
    }

    let ext_set: BTreeSet<String> = extensions
        .iter()
        .map(|e| e.trim_start_matches('.').to_lowercase())
        .collect();

    let mut result: Vec<String> = walk_dir_filtered(Path::new(&project_path), &config)
        .into_iter()
        .filter(|path| {
            path.extension()
                .is_some_and(|ext| ext_set.contains(&ext.to_string_lossy().to_lowercase()))
        })
        .map(|path| path.to_string_lossy().to_string())
        .collect();
    result.sort();
    result
}

/// Split a project's files into annotated sources and scene descriptions
pub fn collect_project_files(root: &Path, config: &GeneratorConfig) -> ProjectFiles {
    let mut files = ProjectFiles::default();
    for path in walk_dir_filtered(root, config) {
        if config.is_source_file(&path) {
            files.sources.push(path);
        } else if config.is_scene_file(&path) {
            files.scenes.push(path);
        }
    }
    files.sources.sort();
    files.scenes.sort();
    files
}

/// Every regular file under `root`, never descending into skipped directories
fn walk_dir_filtered(root: &Path, config: &GeneratorConfig) -> Vec<PathBuf> {
    let mut result = Vec::new();
    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() > 0 && e.file_type().is_dir() {
                if let Some(name) = e.file_name().to_str() {
                    return !config.is_skipped_dir(name);
                }
            }
            true
        })
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                log::debug!("Skipping unreadable entry under {}: {}", root.display(), e);
                continue;
            }
        };

        if entry.file_type().is_file() {
            result.push(entry.into_path());
        }
    }
    result
}

// ========== Tests ==========

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Create a minimal Godot project layout for isolated tests.
    fn create_temp_project() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("project.godot"), "config_version=5\n").unwrap();
        fs::write(tmp.path().join("Main.tscn"), "[node name=\"Main\" type=\"Node\"]\n").unwrap();
        fs::write(tmp.path().join("Main.cs"), "public partial class Main { }\n").unwrap();

        let hud = tmp.path().join("ui");
        fs::create_dir_all(&hud).unwrap();
        fs::write(hud.join("Hud.tscn"), "[node name=\"HUD\" type=\"CanvasLayer\"]\n").unwrap();
        fs::write(hud.join("Hud.CS"), "public partial class Hud { }\n").unwrap();

        // Editor cache and build output should be skipped
        let cache = tmp.path().join(".godot").join("mono");
        fs::create_dir_all(&cache).unwrap();
        fs::write(cache.join("Stale.cs"), "// should be skipped").unwrap();
        let obj = tmp.path().join("obj");
        fs::create_dir_all(&obj).unwrap();
        fs::write(obj.join("Generated.cs"), "// should be skipped").unwrap();

        tmp
    }

    #[test]
    fn test_walk_finds_cs_files() {
        let tmp = create_temp_project();
        let files = walk_project_files(
            tmp.path().to_string_lossy().to_string(),
            vec![".cs".to_string()],
            None,
        );
        assert_eq!(files.len(), 2, "got {:?}", files);
        assert!(files.iter().any(|f| f.ends_with("Main.cs")));
        assert!(files.iter().any(|f| f.ends_with("Hud.CS")));
    }

    #[test]
    fn test_walk_skips_editor_dirs() {
        let tmp = create_temp_project();
        let files = walk_project_files(
            tmp.path().to_string_lossy().to_string(),
            vec!["cs".to_string()],
            None,
        );
        assert!(!files.iter().any(|f| f.contains(".godot")));
        assert!(!files.iter().any(|f| f.contains("Generated.cs")));
    }

    #[test]
    fn test_walk_extra_exclude_dirs() {
        let tmp = create_temp_project();
        let files = walk_project_files(
            tmp.path().to_string_lossy().to_string(),
            vec!["tscn".to_string()],
            Some(vec!["ui".to_string()]),
        );
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("Main.tscn"));
    }

    #[test]
    fn test_walk_nonexistent_path_returns_empty() {
        let files = walk_project_files(
            "/nonexistent/path/12345".to_string(),
            vec![".cs".to_string()],
            None,
        );
        assert!(files.is_empty());
    }

    #[test]
    fn test_collect_project_files_splits_and_sorts() {
        let tmp = create_temp_project();
        let files = collect_project_files(tmp.path(), &GeneratorConfig::default());
        assert_eq!(files.sources.len(), 2);
        assert_eq!(files.scenes.len(), 2);
        assert_eq!(files.total(), 4);
        assert!(files.sources.windows(2).all(|w| w[0] <= w[1]));
        assert!(files.scenes[0].ends_with("Main.tscn"));
        assert!(files.scenes[1].ends_with("ui/Hud.tscn"));
    }

    #[test]
    fn test_root_named_like_skip_dir_is_still_walked() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("bin");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("Main.tscn"), "[node name=\"Main\"]\n").unwrap();
        let files = collect_project_files(&root, &GeneratorConfig::default());
        assert_eq!(files.scenes.len(), 1);
    }
}
