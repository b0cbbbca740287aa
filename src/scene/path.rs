use crate::common::{ParsedScene, SceneNode};
use crate::error::{GeneratorError, Result};

/// Resolve a node's `/`-separated path from the scene root.
///
/// The root itself and direct children of the root resolve to their own
/// name, whether the child names the root sentinel or the root node itself
/// as its parent. Deeper nodes are prefixed with their parent's resolved path. The
/// parent is found by the first sibling with a matching name. A parent that
/// is itself written as a path (`parent="HUD/Panel"`) and matches no name is
/// located by resolved path instead.
pub fn resolve_path(node: &SceneNode, siblings: &[SceneNode], root_parent: &str) -> Result<String> {
    resolve_with_depth(node, siblings, root_parent, 0)
}

fn resolve_with_depth(
    node: &SceneNode,
    siblings: &[SceneNode],
    root_parent: &str,
    depth: usize,
) -> Result<String> {
    if depth > siblings.len() {
        return Err(GeneratorError::ParentCycle(node.name.clone()));
    }

    let parent = match node.parent.as_deref() {
        None => return Ok(node.name.clone()),
        Some(p) if p == root_parent => return Ok(node.name.clone()),
        Some(p) => p,
    };

    if let Some(parent_node) = siblings.iter().find(|s| s.name == parent) {
        if parent_node.parent.is_none() {
            return Ok(node.name.clone());
        }
        let parent_path = resolve_with_depth(parent_node, siblings, root_parent, depth + 1)?;
        return Ok(format!("{}/{}", parent_path, node.name));
    }

    if let Some((_, leaf)) = parent.rsplit_once('/') {
        // A same-named node elsewhere in a broken branch is just not the parent
        for candidate in siblings.iter().filter(|s| s.name == leaf) {
            match resolve_with_depth(candidate, siblings, root_parent, depth + 1) {
                Ok(candidate_path) if candidate_path == parent => {
                    return Ok(format!("{}/{}", parent, node.name));
                }
                Ok(_) | Err(GeneratorError::MissingParent { .. }) => continue,
                Err(e) => return Err(e),
            }
        }
    }

    Err(GeneratorError::MissingParent {
        node: node.name.clone(),
        parent: parent.to_string(),
    })
}

/// Resolve every node of a scene, in declaration order
pub fn resolve_all(scene: &ParsedScene, root_parent: &str) -> Result<Vec<String>> {
    scene
        .nodes
        .iter()
        .map(|node| resolve_path(node, &scene.nodes, root_parent))
        .collect()
}

/// Find the first node whose resolved path equals `full_path`
pub fn find_by_path<'a>(
    scene: &'a ParsedScene,
    full_path: &str,
    root_parent: &str,
) -> Result<Option<&'a SceneNode>> {
    for node in &scene.nodes {
        if resolve_path(node, &scene.nodes, root_parent)? == full_path {
            return Ok(Some(node));
        }
    }
    Ok(None)
}
