use crate::common::{ClassBindings, NodeGetterDiagnostic};
use crate::config::GeneratorConfig;
use crate::diagnostics;
use crate::error::Result;
use crate::scene::path::find_by_path;
use crate::scene::SceneMap;

/// Split a verification root into the scene key and the full path a request must resolve to.
///
/// `"Main"` + `"HUD"` checks `HUD` in scene `Main`; `"Main/HUD"` + `"ScoreLabel"`
/// checks `HUD/ScoreLabel` in scene `Main`.
pub fn verification_target(scene_root_name: &str, relative_path: &str) -> (String, String) {
    let mut segments = scene_root_name.split('/');
    let scene_key = segments.next().unwrap_or_default().to_string();
    let full_path = segments
        .chain(std::iter::once(relative_path))
        .collect::<Vec<_>>()
        .join("/");
    (scene_key, full_path)
}

/// Check every request of a class against its verified scene.
///
/// Classes without a verification spec, and classes whose scene is not in
/// the map, are not checked. Unresolved paths become diagnostics; only a
/// malformed scene (dangling or cyclic parent) is an error.
pub fn validate_class(
    class: &ClassBindings,
    scenes: &SceneMap,
    config: &GeneratorConfig,
) -> Result<Vec<NodeGetterDiagnostic>> {
    let mut diagnostics = Vec::new();
    let Some(verification) = &class.verification else {
        return Ok(diagnostics);
    };
    if class.requests.is_empty() {
        return Ok(diagnostics);
    }

    let (scene_key, _) = verification_target(&verification.scene_root_name, "");
    let Some(scene) = scenes.get(&scene_key) else {
        if config.strict_scene_lookup {
            diagnostics.push(diagnostics::missing_scene(
                &class.owner_class,
                &verification.scene_root_name,
            ));
        } else {
            log::debug!(
                "No scene with root '{}' for {}; skipping verification",
                scene_key,
                class.owner_class
            );
        }
        return Ok(diagnostics);
    };

    // `..` and `$` segments are matched literally, and node types are not compared.
    for request in &class.requests {
        let (_, full_path) = verification_target(&verification.scene_root_name, &request.relative_path);
        if find_by_path(scene, &full_path, &config.root_parent)?.is_none() {
            diagnostics.push(diagnostics::unresolved_path(
                &class.owner_class,
                &verification.scene_root_name,
                &request.relative_path,
            ));
        }
    }

    Ok(diagnostics)
}
