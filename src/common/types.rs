use napi_derive::napi;
use serde::{Deserialize, Serialize};

/// One `[node ...]` declaration from a scene file
#[napi(object)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    #[napi(js_name = "type")]
    pub type_name: String,
    #[napi(ts_type = "string | undefined")]
    pub parent: Option<String>,
}

/// Result of parsing a single scene file.
///
/// An empty `root_name` with no nodes means the file declared no nodes at all.
#[napi(object)]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedScene {
    pub root_name: String,
    pub nodes: Vec<SceneNode>,
}

impl ParsedScene {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Which annotation style produced a binding request
#[napi(string_enum)]
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BindingStyle {
    /// Repeatable class-level `[GenerateNodeGetter(typeof(T), "Path")]`
    Class,
    /// `[NodeGetter("Path")]` on a partial property
    Member,
}

/// One requested accessor
#[napi(object)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingRequest {
    /// Fully qualified owning class (e.g., "tutorial.Main")
    pub owner_class: String,
    /// Generated method name (class style) or the annotated property name (member style)
    pub accessor_name: String,
    /// Storage for the memoized node, present only when `cached` is set
    #[napi(ts_type = "string | undefined")]
    pub backing_field: Option<String>,
    pub declared_type: String,
    pub relative_path: String,
    pub cached: bool,
    pub access_modifier: String,
    pub style: BindingStyle,
}

/// Scene a class's requests are checked against
#[napi(object)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationSpec {
    pub owner_class: String,
    /// Scene root name, optionally followed by `/`-separated prefix segments
    pub scene_root_name: String,
}

/// Everything extracted for one class, merged across partial declarations
#[napi(object)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassBindings {
    pub owner_class: String,
    pub class_name: String,
    #[napi(ts_type = "string | undefined")]
    pub namespace: Option<String>,
    /// Enclosing classes, outermost first
    pub containing_types: Vec<String>,
    pub requests: Vec<BindingRequest>,
    #[napi(ts_type = "VerificationSpec | undefined")]
    pub verification: Option<VerificationSpec>,
    pub source_files: Vec<String>,
}

/// A build diagnostic produced during validation or emission
#[napi(object)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeGetterDiagnostic {
    pub id: String,
    pub severity: String,
    pub message: String,
    pub owner_class: String,
    #[napi(ts_type = "string | undefined")]
    pub scene: Option<String>,
    #[napi(ts_type = "string | undefined")]
    pub path: Option<String>,
}

/// One generated C# compilation unit
#[napi(object)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedSource {
    pub hint_name: String,
    #[napi(ts_type = "string | undefined")]
    pub owner_class: Option<String>,
    pub content: String,
}

/// Options for a full generation run
#[napi(object)]
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub project_root: String,
    #[napi(ts_type = "string | undefined")]
    pub output_dir: Option<String>,
    #[napi(ts_type = "string | undefined")]
    pub config_path: Option<String>,
    #[napi(ts_type = "boolean | undefined")]
    pub strict_scene_lookup: Option<bool>,
}

/// Full generation result
#[napi(object)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub sources: Vec<GeneratedSource>,
    pub diagnostics: Vec<NodeGetterDiagnostic>,
    pub classes_processed: u32,
    pub scenes_parsed: u32,
    pub files_scanned: u32,
    #[napi(ts_type = "string[] | undefined")]
    pub written_files: Option<Vec<String>>,
}
