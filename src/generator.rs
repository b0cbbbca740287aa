use napi_derive::napi;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

use crate::common::{GenerateOptions, GeneratedSource, GenerationResult, NodeGetterDiagnostic};
use crate::config::GeneratorConfig;
use crate::csharp::collect_bindings;
use crate::emit::{emit_attribute_source, emit_class};
use crate::error::{GeneratorError, Result};
use crate::scene::build_scene_map;
use crate::validate::validate_class;
use crate::walker::collect_project_files;

/// Node-getter source generator for a Godot C# project
#[napi]
pub struct NodeGetterGenerator {
    config: GeneratorConfig,
}

impl Default for NodeGetterGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[napi]
impl NodeGetterGenerator {
    #[napi(constructor)]
    pub fn new() -> Self {
        NodeGetterGenerator {
            config: GeneratorConfig::default(),
        }
    }

    pub fn with_config(config: GeneratorConfig) -> Self {
        NodeGetterGenerator { config }
    }

    /// Treat files with this extension as scene descriptions.
    #[napi]
    pub fn add_scene_extension(&mut self, ext: String) {
        self.config.add_scene_extension(&ext);
    }

    /// Treat files with this extension as annotated sources.
    #[napi]
    pub fn add_source_extension(&mut self, ext: String) {
        self.config.add_source_extension(&ext);
    }

    /// Never descend into directories with this name.
    #[napi]
    pub fn add_skip_dir(&mut self, name: String) {
        self.config.add_skip_dir(&name);
    }

    /// Report verified classes whose scene cannot be found.
    #[napi]
    pub fn set_strict_scene_lookup(&mut self, strict: bool) {
        self.config.strict_scene_lookup = strict;
    }

    #[napi]
    pub fn set_default_node_type(&mut self, type_name: String) {
        self.config.default_node_type = type_name;
    }

    pub fn get_config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Run the generator over a project; optionally write the sources to `output_dir`.
    #[napi]
    pub fn generate(&self, project_root: String, output_dir: Option<String>) -> napi::Result<GenerationResult> {
        let mut result = self.run(Path::new(&project_root))?;
        if let Some(dir) = output_dir {
            result.written_files = Some(write_sources(Path::new(&dir), &result.sources)?);
        }
        Ok(result)
    }

    /// Full pass: walk, parse scenes and sources, validate, emit.
    ///
    /// Scenes and sources are processed in parallel with each other and
    /// across files; the scene map is read-only once built. Output order is
    /// the attribute unit first, then classes by fully qualified name.
    pub fn run(&self, project_root: &Path) -> Result<GenerationResult> {
        if !project_root.is_dir() {
            return Err(GeneratorError::ProjectNotFound(
                project_root.to_string_lossy().to_string(),
            ));
        }

        let files = collect_project_files(project_root, &self.config);
        log::debug!(
            "Found {} source and {} scene files under {}",
            files.sources.len(),
            files.scenes.len(),
            project_root.display()
        );

        let (scenes, classes) = rayon::join(
            || build_scene_map(&files.scenes, &self.config),
            || collect_bindings(&files.sources, Some(project_root)),
        );
        let scenes = scenes?;

        let per_class: Vec<(GeneratedSource, Vec<NodeGetterDiagnostic>)> = classes
            .par_iter()
            .map(|class| {
                let mut diagnostics = validate_class(class, &scenes, &self.config)?;
                let emission = emit_class(class, &self.config);
                diagnostics.extend(emission.diagnostics);
                Ok((emission.source, diagnostics))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut sources = Vec::with_capacity(per_class.len() + 1);
        if self.config.emit_attribute_source {
            sources.push(emit_attribute_source());
        }
        let mut diagnostics = Vec::new();
        for (source, class_diagnostics) in per_class {
            sources.push(source);
            diagnostics.extend(class_diagnostics);
        }

        log::info!(
            "Generated {} accessor units for {} classes ({} scenes, {} diagnostics)",
            sources.len(),
            classes.len(),
            scenes.len(),
            diagnostics.len()
        );
        for diagnostic in &diagnostics {
            log::debug!("{} {}: {}", diagnostic.id, diagnostic.owner_class, diagnostic.message);
        }

        Ok(GenerationResult {
            sources,
            diagnostics,
            classes_processed: classes.len() as u32,
            scenes_parsed: scenes.len() as u32,
            files_scanned: files.total() as u32,
            written_files: None,
        })
    }
}

/// Write generated units into `output_dir`, creating it if needed.
///
/// Returns the written paths in the order given.
pub fn write_sources(output_dir: &Path, sources: &[GeneratedSource]) -> Result<Vec<String>> {
    fs::create_dir_all(output_dir)
        .map_err(|e| GeneratorError::io(output_dir.to_string_lossy(), e))?;

    let mut written = Vec::with_capacity(sources.len());
    for source in sources {
        let target: PathBuf = output_dir.join(&source.hint_name);
        fs::write(&target, &source.content)
            .map_err(|e| GeneratorError::io(target.to_string_lossy(), e))?;
        written.push(target.to_string_lossy().to_string());
    }
    Ok(written)
}

/// Generate node getters for a project in one call.
///
/// The config is read from `configPath` when given, else from
/// `node-getters.json` at the project root, else defaults.
#[napi]
pub fn generate_node_getters(options: GenerateOptions) -> napi::Result<GenerationResult> {
    let project_root = PathBuf::from(&options.project_root);
    let mut config = match &options.config_path {
        Some(path) => GeneratorConfig::from_file(path)?,
        None => GeneratorConfig::discover(&project_root)?,
    };
    if let Some(strict) = options.strict_scene_lookup {
        config.strict_scene_lookup = strict;
    }

    let generator = NodeGetterGenerator::with_config(config);
    generator.generate(options.project_root, options.output_dir)
}

// ========== Tests ==========

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics;

    const MAIN_TSCN: &str = r#"[gd_scene load_steps=5 format=3 uid="uid://b2l1hcqx7qv4e"]

[ext_resource type="Script" path="res://Main.cs" id="1_0"]
[ext_resource type="PackedScene" uid="uid://rkdnhqgf2hpj" path="res://Player.tscn" id="2_1"]
[ext_resource type="PackedScene" path="res://HUD.tscn" id="4_2"]

[sub_resource type="Curve2D" id="Curve2D_1"]
_data = {
"points": PackedVector2Array(0, 0, 0, 0, 0, 0, 480, 0, 0, 0, 0, 0, 480, 720)
}
point_count = 3

[node name="Main" type="Node"]
script = ExtResource("1_0")

[node name="Player" parent="." instance=ExtResource("2_1")]

[node name="MobTimer" type="Timer" parent="."]
wait_time = 0.5

[node name="ScoreTimer" type="Timer" parent="."]

[node name="StartTimer" type="Timer" parent="."]
one_shot = true

[node name="StartPosition" type="Marker2D" parent="."]
position = Vector2(240, 450)

[node name="MobPath" type="Path2D" parent="."]
curve = SubResource("Curve2D_1")

[node name="MobSpawnLocation" type="PathFollow2D" parent="MobPath"]

[node name="HUD" parent="." instance=ExtResource("4_2")]
"#;

    const HUD_TSCN: &str = "[gd_scene load_steps=2 format=3]\r\n\r\n\
[ext_resource type=\"Script\" path=\"res://Hud.cs\" id=\"1\"]\r\n\r\n\
[node name=\"HUD\" type=\"CanvasLayer\"]\r\n\
script = ExtResource(\"1\")\r\n\r\n\
[node name=\"ScoreLabel\" type=\"Label\" parent=\".\"]\r\n\r\n\
[node name=\"Message\" type=\"Label\" parent=\".\"]\r\n\r\n\
[node name=\"StartButton\" type=\"Button\" parent=\".\"]\r\n\r\n\
[node name=\"MessageTimer\" type=\"Timer\" parent=\".\"]\r\n";

    const MAIN_CS: &str = r#"using Godot;
using NodeGetterGenerators;

namespace DodgeTheCreeps;

[GenerateNodeGetter(typeof(Player), "Player")]
[GenerateNodeGetter(typeof(Timer), "MobTimer")]
[GenerateNodeGetter(typeof(Timer), "ScoreTimer")]
[GenerateNodeGetter(typeof(Timer), "StartTimer")]
[GenerateNodeGetter(typeof(Marker2D), "StartPosition")]
[GenerateNodeGetter(typeof(PathFollow2D), "MobPath/MobSpawnLocation", true)]
[GenerateNodeGetter(typeof(Hud), "HUD")]
[VerifyNodeGetters("Main")]
public partial class Main : Node
{
    public void NewGame()
    {
        GetNodeStartTimer().Start();
    }
}
"#;

    const HUD_CS: &str = r#"using Godot;
using NodeGetterGenerators;

namespace DodgeTheCreeps;

[VerifyNodeGetters("HUD")]
public partial class Hud : CanvasLayer
{
    [NodeGetter("ScoreLabel")]
    public partial Label ScoreLabel { get; }

    [NodeGetter("Message", cache: true)]
    private partial Label Message { get; }

    [NodeGetter("StartButton")]
    private partial Button StartButton { get; }

    [NodeGetter("MessageTimer")]
    private partial Timer MessageTimer { get; }
}
"#;

    fn create_project(main_cs: &str) -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("project.godot"), "config_version=5\n").unwrap();
        fs::write(tmp.path().join("Main.tscn"), MAIN_TSCN).unwrap();
        fs::write(tmp.path().join("HUD.tscn"), HUD_TSCN).unwrap();
        fs::write(tmp.path().join("Main.cs"), main_cs).unwrap();
        fs::write(tmp.path().join("Hud.cs"), HUD_CS).unwrap();
        let stale = tmp.path().join(".godot").join("mono");
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("Old.cs"), "[GenerateNodeGetter(typeof(Node), \"X\")] partial class Old { }").unwrap();
        tmp
    }

    #[test]
    fn test_run_valid_project() {
        let tmp = create_project(MAIN_CS);
        let result = NodeGetterGenerator::new().run(tmp.path()).unwrap();

        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        assert_eq!(result.classes_processed, 2);
        assert_eq!(result.scenes_parsed, 2);
        assert_eq!(result.files_scanned, 4);

        let names: Vec<&str> = result.sources.iter().map(|s| s.hint_name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "GenerateNodeGetterAttribute.g.cs",
                "NodeGetter.DodgeTheCreeps.Hud.g.cs",
                "NodeGetter.DodgeTheCreeps.Main.g.cs",
            ]
        );

        let main = &result.sources[2].content;
        assert!(main.contains("private Timer GetNodeMobTimer()"));
        assert!(main.contains("private PathFollow2D? _cacheGetNodeMobPathMobSpawnLocation;"));
        assert!(main.contains("GetNodeOrNull<Hud>(\"HUD\")"));

        let hud = &result.sources[1].content;
        assert!(hud.contains("public partial Label ScoreLabel => "));
        assert!(hud.contains("private Label? message;"));
    }

    #[test]
    fn test_run_reports_missing_node() {
        let broken = MAIN_CS.replace("\"MobTimer\"", "\"MobTimr\"");
        let tmp = create_project(&broken);
        let result = NodeGetterGenerator::new().run(tmp.path()).unwrap();

        assert_eq!(result.diagnostics.len(), 1);
        let diag = &result.diagnostics[0];
        assert_eq!(diag.id, diagnostics::UNRESOLVED_PATH);
        assert_eq!(diag.owner_class, "DodgeTheCreeps.Main");
        assert_eq!(diag.message, "Could not find a node with path 'MobTimr' within scene 'Main'");

        // Validation does not block emission
        assert!(result.sources[2].content.contains("GetNodeMobTimr()"));
    }

    #[test]
    fn test_run_is_deterministic() {
        let tmp = create_project(MAIN_CS);
        let generator = NodeGetterGenerator::new();
        let first = generator.run(tmp.path()).unwrap();
        let second = generator.run(tmp.path()).unwrap();
        assert_eq!(first.sources, second.sources);
    }

    #[test]
    fn test_missing_scene_respects_strict_mode() {
        let tmp = create_project(MAIN_CS);
        fs::remove_file(tmp.path().join("HUD.tscn")).unwrap();

        let lenient = NodeGetterGenerator::new().run(tmp.path()).unwrap();
        assert!(lenient.diagnostics.is_empty());

        let mut strict = NodeGetterGenerator::new();
        strict.set_strict_scene_lookup(true);
        let result = strict.run(tmp.path()).unwrap();
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].id, diagnostics::MISSING_SCENE);
        assert_eq!(result.diagnostics[0].owner_class, "DodgeTheCreeps.Hud");
    }

    #[test]
    fn test_malformed_scene_aborts_run() {
        let tmp = create_project(MAIN_CS);
        fs::write(
            tmp.path().join("HUD.tscn"),
            "[node name=\"HUD\" type=\"CanvasLayer\"]\n[node name=\"Label\" parent=\"Missing\"]\n",
        )
        .unwrap();
        let result = NodeGetterGenerator::new().run(tmp.path());
        assert!(matches!(result, Err(GeneratorError::MissingParent { .. })));
    }

    #[test]
    fn test_run_missing_project() {
        let result = NodeGetterGenerator::new().run(Path::new("/nonexistent/project/12345"));
        assert!(matches!(result, Err(GeneratorError::ProjectNotFound(_))));
    }

    #[test]
    fn test_attribute_source_can_be_disabled() {
        let tmp = create_project(MAIN_CS);
        let config = GeneratorConfig {
            emit_attribute_source: false,
            ..Default::default()
        };
        let result = NodeGetterGenerator::with_config(config).run(tmp.path()).unwrap();
        assert_eq!(result.sources.len(), 2);
        assert!(result.sources.iter().all(|s| s.owner_class.is_some()));
    }

    #[test]
    fn test_write_sources() {
        let tmp = create_project(MAIN_CS);
        let out = tmp.path().join("generated").join("nodes");
        let result = NodeGetterGenerator::new()
            .generate(
                tmp.path().to_string_lossy().to_string(),
                Some(out.to_string_lossy().to_string()),
            )
            .unwrap();

        let written = result.written_files.unwrap();
        assert_eq!(written.len(), 3);
        let on_disk = fs::read_to_string(out.join("NodeGetter.DodgeTheCreeps.Main.g.cs")).unwrap();
        assert_eq!(on_disk, result.sources[2].content);
    }

    #[test]
    fn test_generate_node_getters_reads_project_config() {
        let tmp = create_project(MAIN_CS);
        fs::write(
            tmp.path().join(crate::config::CONFIG_FILENAME),
            r#"{ "emitAttributeSource": false, "lookupMethod": "GetNode" }"#,
        )
        .unwrap();

        let result = generate_node_getters(GenerateOptions {
            project_root: tmp.path().to_string_lossy().to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(result.sources.len(), 2);
        assert!(result.sources[1].content.contains("GetNode<Timer>(\"MobTimer\")"));
        assert!(result.written_files.is_none());
    }

    #[test]
    fn test_generate_node_getters_strict_override() {
        let tmp = create_project(MAIN_CS);
        fs::remove_file(tmp.path().join("Main.tscn")).unwrap();
        let result = generate_node_getters(GenerateOptions {
            project_root: tmp.path().to_string_lossy().to_string(),
            strict_scene_lookup: Some(true),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].scene.as_deref(), Some("Main"));
    }
}
