use regex::Regex;
use std::sync::LazyLock;

use crate::common::{ParsedScene, SceneNode};
use crate::config::GeneratorConfig;
use crate::error::{GeneratorError, Result};

static NODE_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(\[\s*node.*\])\s*").unwrap());
static ATTRIBUTE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([\w_]+)="([^"]*)""#).unwrap());

/// Godot text-scene parser for node declarations
pub struct TscnParser;

impl TscnParser {
    /// Parse all `[node ...]` declarations using the default config
    pub fn parse(content: &str) -> Result<ParsedScene> {
        Self::parse_with_config(content, &GeneratorConfig::default())
    }

    /// Parse all `[node ...]` declarations.
    ///
    /// The first declaration is taken as the scene root. Parent references are
    /// not checked here; that happens when a node's path is resolved.
    pub fn parse_with_config(content: &str, config: &GeneratorConfig) -> Result<ParsedScene> {
        let nodes = NODE_LINE_RE
            .captures_iter(content)
            .filter_map(|cap| cap.get(1))
            .map(|m| Self::node_from_line(m.as_str(), &config.default_node_type))
            .collect::<Result<Vec<SceneNode>>>()?;

        let root_name = match nodes.first() {
            Some(root) => root.name.clone(),
            None => return Ok(ParsedScene::default()),
        };

        Ok(ParsedScene { root_name, nodes })
    }

    /// Collect the `key="value"` pairs of one declaration line.
    /// The first occurrence of a repeated key wins.
    pub fn parse_attributes(line: &str) -> Vec<(String, String)> {
        let mut attributes: Vec<(String, String)> = Vec::new();
        for cap in ATTRIBUTE_RE.captures_iter(line) {
            let key = &cap[1];
            if attributes.iter().any(|(k, _)| k == key) {
                continue;
            }
            attributes.push((key.to_string(), cap[2].to_string()));
        }
        attributes
    }

    fn node_from_line(line: &str, default_type: &str) -> Result<SceneNode> {
        let attributes = Self::parse_attributes(line);
        let lookup = |key: &str| {
            attributes
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        };

        let name = lookup("name").ok_or_else(|| GeneratorError::MissingNodeName(line.to_string()))?;

        Ok(SceneNode {
            name,
            type_name: lookup("type").unwrap_or_else(|| default_type.to_string()),
            parent: lookup("parent"),
        })
    }
}
