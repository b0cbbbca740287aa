use crate::common::{BindingRequest, NodeGetterDiagnostic};

/// A requested node path does not exist in the verified scene
pub const UNRESOLVED_PATH: &str = "GODOTNODEGETTERGEN01";
/// Two requests in one class derive the same accessor name
pub const DUPLICATE_ACCESSOR: &str = "NODEGETTERGEN02";
/// A verified class names a scene root no parsed scene has (strict mode only)
pub const MISSING_SCENE: &str = "NODEGETTERGEN03";

pub const SEVERITY_ERROR: &str = "error";

pub fn unresolved_path(owner_class: &str, scene: &str, relative_path: &str) -> NodeGetterDiagnostic {
    NodeGetterDiagnostic {
        id: UNRESOLVED_PATH.to_string(),
        severity: SEVERITY_ERROR.to_string(),
        message: format!(
            "Could not find a node with path '{}' within scene '{}'",
            relative_path, scene
        ),
        owner_class: owner_class.to_string(),
        scene: Some(scene.to_string()),
        path: Some(relative_path.to_string()),
    }
}

pub fn duplicate_accessor(request: &BindingRequest) -> NodeGetterDiagnostic {
    NodeGetterDiagnostic {
        id: DUPLICATE_ACCESSOR.to_string(),
        severity: SEVERITY_ERROR.to_string(),
        message: format!(
            "Accessor '{}' for path '{}' is already generated in class '{}'",
            request.accessor_name, request.relative_path, request.owner_class
        ),
        owner_class: request.owner_class.clone(),
        scene: None,
        path: Some(request.relative_path.clone()),
    }
}

pub fn missing_scene(owner_class: &str, scene: &str) -> NodeGetterDiagnostic {
    NodeGetterDiagnostic {
        id: MISSING_SCENE.to_string(),
        severity: SEVERITY_ERROR.to_string(),
        message: format!(
            "Class '{}' is verified against scene '{}', but no scene has that root node",
            owner_class, scene
        ),
        owner_class: owner_class.to_string(),
        scene: Some(scene.to_string()),
        path: None,
    }
}
