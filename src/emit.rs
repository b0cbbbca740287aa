use std::collections::HashSet;

use crate::common::{BindingRequest, BindingStyle, ClassBindings, GeneratedSource, NodeGetterDiagnostic};
use crate::config::GeneratorConfig;
use crate::csharp::attributes::ATTRIBUTE_NAMESPACE;
use crate::diagnostics;

/// Hint name of the attribute-definition unit
pub const ATTRIBUTE_SOURCE_NAME: &str = "GenerateNodeGetterAttribute.g.cs";

const HEADER: &str = "// <auto-generated/>";
const INDENT: &str = "    ";

/// Output of emitting one class
#[derive(Debug, Clone)]
pub struct ClassEmission {
    pub source: GeneratedSource,
    pub diagnostics: Vec<NodeGetterDiagnostic>,
}

/// Turn a node path into an identifier fragment.
///
/// Non-alphanumeric characters are dropped and the character following
/// each one is upper-cased: `"MobPath/MobSpawnLocation"` becomes
/// `"MobPathMobSpawnLocation"`, `"hud/score_label"` becomes `"HudScoreLabel"`.
pub fn accessor_fragment(path: &str) -> String {
    let mut fragment = String::with_capacity(path.len());
    let mut boundary = true;
    for c in path.chars() {
        if c.is_alphanumeric() {
            if boundary {
                fragment.extend(c.to_uppercase());
            } else {
                fragment.push(c);
            }
            boundary = false;
        } else {
            boundary = true;
        }
    }
    fragment
}

/// File name for a class's generated unit, e.g. `NodeGetter.tutorial.Main.g.cs`
pub fn hint_name(owner_class: &str) -> String {
    let sanitized: String = owner_class
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '.' || c == '_' { c } else { '_' })
        .collect();
    format!("NodeGetter.{}.g.cs", sanitized)
}

/// Indentation-aware line buffer for generated C#
struct CodeWriter {
    out: String,
    depth: usize,
}

impl CodeWriter {
    fn new() -> Self {
        CodeWriter { out: String::with_capacity(2048), depth: 0 }
    }

    fn line(&mut self, text: &str) {
        if text.is_empty() {
            self.out.push('\n');
            return;
        }
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn open(&mut self, declaration: &str) {
        self.line(declaration);
        self.line("{");
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }

    fn finish(self) -> String {
        self.out
    }
}

/// Emit the accessors of one class as a partial-class addition.
///
/// Requests are emitted in declaration order. A request whose accessor name
/// or cache field name clashes with one already emitted is dropped with a
/// duplicate diagnostic.
pub fn emit_class(class: &ClassBindings, config: &GeneratorConfig) -> ClassEmission {
    let mut diagnostics = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut accepted: Vec<&BindingRequest> = Vec::with_capacity(class.requests.len());
    for request in &class.requests {
        let field = request.backing_field.as_deref().filter(|_| request.cached);
        let clashes = seen.contains(request.accessor_name.as_str())
            || field.is_some_and(|f| f == request.accessor_name || seen.contains(f));
        if clashes {
            diagnostics.push(diagnostics::duplicate_accessor(request));
            continue;
        }
        seen.insert(request.accessor_name.as_str());
        if let Some(f) = field {
            seen.insert(f);
        }
        accepted.push(request);
    }

    let mut w = CodeWriter::new();
    w.line(HEADER);
    w.line("#nullable enable");
    w.line("");
    w.line("using System.Collections.Generic;");
    w.line("");
    if let Some(ns) = &class.namespace {
        w.line(&format!("namespace {};", ns));
        w.line("");
    }

    for outer in &class.containing_types {
        w.open(&format!("partial class {}", outer));
    }
    w.open(&format!("partial class {}", class.class_name));

    for (i, request) in accepted.iter().enumerate() {
        if i > 0 {
            w.line("");
        }
        match request.style {
            BindingStyle::Class => emit_method(&mut w, request, config),
            BindingStyle::Member => emit_property(&mut w, request, config),
        }
    }

    w.close();
    for _ in &class.containing_types {
        w.close();
    }

    ClassEmission {
        source: GeneratedSource {
            hint_name: hint_name(&class.owner_class),
            owner_class: Some(class.owner_class.clone()),
            content: w.finish(),
        },
        diagnostics,
    }
}

/// `GetNode<Fragment>()` method for a class-level request
fn emit_method(w: &mut CodeWriter, request: &BindingRequest, config: &GeneratorConfig) {
    let lookup = lookup_expression(request, config);
    match &request.backing_field {
        Some(field) if request.cached => {
            w.line(&format!("private {}? {};", request.declared_type, field));
            w.line("");
            w.open(&format!(
                "{} {} {}()",
                request.access_modifier, request.declared_type, request.accessor_name
            ));
            emit_cached_body(w, field, &lookup);
            w.close();
        }
        _ => {
            w.open(&format!(
                "{} {} {}()",
                request.access_modifier, request.declared_type, request.accessor_name
            ));
            w.line(&format!("return {};", lookup));
            w.close();
        }
    }
}

/// Implementing declaration of an annotated partial property
fn emit_property(w: &mut CodeWriter, request: &BindingRequest, config: &GeneratorConfig) {
    let lookup = lookup_expression(request, config);
    let declaration = format!(
        "{} partial {} {}",
        request.access_modifier, request.declared_type, request.accessor_name
    );
    match &request.backing_field {
        Some(field) if request.cached => {
            w.line(&format!("private {}? {};", request.declared_type, field));
            w.line("");
            w.open(&declaration);
            w.open("get");
            emit_cached_body(w, field, &lookup);
            w.close();
            w.close();
        }
        _ => {
            w.line(&format!("{} => {};", declaration, lookup));
        }
    }
}

fn emit_cached_body(w: &mut CodeWriter, field: &str, lookup: &str) {
    w.open(&format!("if ({} is null)", field));
    w.line(&format!("{} = {};", field, lookup));
    w.close();
    w.line(&format!("return {};", field));
}

/// Lookup that throws when the node is absent at runtime
fn lookup_expression(request: &BindingRequest, config: &GeneratorConfig) -> String {
    format!(
        "{}<{}>({}) ?? throw new KeyNotFoundException({})",
        config.lookup_method,
        request.declared_type,
        string_literal(&request.relative_path),
        string_literal(&format!(
            "Could not find node '{}' of type '{}'",
            request.relative_path, request.declared_type
        ))
    )
}

/// Quote text as a regular C# string literal
fn string_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Definitions of the three attributes consumers annotate with
pub fn emit_attribute_source() -> GeneratedSource {
    let mut w = CodeWriter::new();
    w.line(HEADER);
    w.line("#nullable enable");
    w.line("");
    w.line("using System;");
    w.line("");
    w.line(&format!("namespace {};", ATTRIBUTE_NAMESPACE));
    w.line("");

    w.line("[AttributeUsage(AttributeTargets.Class, AllowMultiple = true, Inherited = false)]");
    w.open("internal sealed class GenerateNodeGetterAttribute : Attribute");
    w.open("public GenerateNodeGetterAttribute(Type nodeType, string nodePath, bool cache = false)");
    w.line("NodeType = nodeType;");
    w.line("NodePath = nodePath;");
    w.line("Cache = cache;");
    w.close();
    w.line("");
    w.line("public Type NodeType { get; }");
    w.line("public string NodePath { get; }");
    w.line("public bool Cache { get; }");
    w.close();
    w.line("");

    w.line("[AttributeUsage(AttributeTargets.Property, AllowMultiple = false, Inherited = false)]");
    w.open("internal sealed class NodeGetterAttribute : Attribute");
    w.open("public NodeGetterAttribute(string nodePath, bool cache = false)");
    w.line("NodePath = nodePath;");
    w.line("Cache = cache;");
    w.close();
    w.line("");
    w.line("public string NodePath { get; }");
    w.line("public bool Cache { get; }");
    w.close();
    w.line("");

    w.line("[AttributeUsage(AttributeTargets.Class, AllowMultiple = false, Inherited = false)]");
    w.open("internal sealed class VerifyNodeGettersAttribute : Attribute");
    w.open("public VerifyNodeGettersAttribute(string sceneRootName)");
    w.line("SceneRootName = sceneRootName;");
    w.close();
    w.line("");
    w.line("public string SceneRootName { get; }");
    w.close();

    GeneratedSource {
        hint_name: ATTRIBUTE_SOURCE_NAME.to_string(),
        owner_class: None,
        content: w.finish(),
    }
}
