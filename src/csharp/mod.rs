pub mod attributes;
pub mod source;

use napi_derive::napi;
use rayon::prelude::*;
use regex::Regex;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::common::{self, BindingRequest, BindingStyle, ClassBindings, VerificationSpec};
use crate::emit::accessor_fragment;
use attributes::{bind_arguments, parse_section, typeof_target, AttributeUse, ConstantTable};
use source::SourceText;

/// Class-level, repeatable: `[GenerateNodeGetter(typeof(T), "Path", cache)]`
pub const CLASS_GETTER_ATTRIBUTE: &str = "GenerateNodeGetter";
/// Member-level: `[NodeGetter("Path", cache)]`
pub const MEMBER_GETTER_ATTRIBUTE: &str = "NodeGetter";
/// Class-level, single: `[VerifyNodeGetters("SceneRoot")]`
pub const VERIFY_ATTRIBUTE: &str = "VerifyNodeGetters";

const CLASS_MODIFIERS: &[&str] = &[
    "public", "internal", "private", "protected", "abstract", "sealed", "static",
    "partial", "unsafe", "new", "file", "record",
];
const MEMBER_MODIFIERS: &[&str] = &[
    "public", "internal", "private", "protected", "partial", "static", "readonly",
    "virtual", "override", "sealed", "abstract", "required", "new", "unsafe", "extern",
    "volatile",
];
const ACCESS_MODIFIERS: &[&str] = &["public", "protected", "internal", "private"];
const NON_MEMBER_KEYWORDS: &[&str] = &[
    "class", "struct", "interface", "enum", "record", "delegate", "event",
];

// Compiled-once regexes for declaration scanning (shared across rayon threads)
static FILE_SCOPED_NS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bnamespace\s+([\w.]+)\s*;").unwrap());
static BRACED_NS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bnamespace\s+([\w.]+)\s*\{").unwrap());
static CLASS_DECL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bclass\s+([A-Za-z_]\w*)").unwrap());
static TRAILING_IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z_]\w*)\s*$").unwrap());

/// A class declaration located in one file
struct ClassDecl {
    /// Declared name including any type parameter list (`Pool<T>`)
    name: String,
    keyword_start: usize,
    attribute_sections: Vec<(usize, usize)>,
    body: (usize, usize),
}

/// A member declaration carrying attribute sections
struct MemberDecl {
    name: String,
    type_name: String,
    modifiers: Vec<String>,
    is_property: bool,
    attribute_sections: Vec<(usize, usize)>,
}

/// Extract node-getter bindings from a single .cs file.
///
/// Returns one entry per class carrying getter or verification attributes.
/// Partial declarations of the same class within the file are merged.
#[napi]
pub fn extract_node_getters(path: String) -> Vec<ClassBindings> {
    extract_from_file(Path::new(&path), None)
}

/// Extract and merge bindings from many source files in parallel.
///
/// Files are processed in sorted order so merged request lists are stable
/// across runs. Classes without any getter request are dropped.
pub fn collect_bindings(files: &[PathBuf], project_root: Option<&Path>) -> Vec<ClassBindings> {
    let mut sorted: Vec<&PathBuf> = files.iter().collect();
    sorted.sort();

    let per_file: Vec<Vec<ClassBindings>> = sorted
        .par_iter()
        .map(|file| extract_from_file(file, project_root))
        .collect();

    merge_classes(per_file.into_iter().flatten())
        .into_iter()
        .filter(|class| !class.requests.is_empty())
        .collect()
}

/// Group class entries by fully qualified name.
///
/// Requests keep their encounter order; the first verification spec wins.
pub fn merge_classes<I: IntoIterator<Item = ClassBindings>>(classes: I) -> Vec<ClassBindings> {
    let mut merged: BTreeMap<String, ClassBindings> = BTreeMap::new();
    for class in classes {
        match merged.entry(class.owner_class.clone()) {
            Entry::Vacant(slot) => {
                slot.insert(class);
            }
            Entry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                existing.requests.extend(class.requests);
                for file in class.source_files {
                    if !existing.source_files.contains(&file) {
                        existing.source_files.push(file);
                    }
                }
                if let Some(other) = class.verification {
                    if existing.verification.is_none() {
                        existing.verification = Some(other);
                    } else if existing.verification.as_ref() != Some(&other) {
                        log::warn!(
                            "Class {} has more than one [{}]; ignoring '{}'",
                            existing.owner_class,
                            VERIFY_ATTRIBUTE,
                            other.scene_root_name
                        );
                    }
                }
            }
        }
    }
    merged.into_values().collect()
}

fn extract_from_file(file: &Path, project_root: Option<&Path>) -> Vec<ClassBindings> {
    let content = match common::read_text_file(file) {
        Ok(c) => c,
        Err(e) => {
            log::warn!("Skipping unreadable source: {}", e);
            return vec![];
        }
    };

    let rel_path = match project_root {
        Some(root) => file
            .strip_prefix(root)
            .unwrap_or(file)
            .to_string_lossy()
            .to_string(),
        None => file.to_string_lossy().to_string(),
    };

    extract_classes(&content, &rel_path)
}

/// Parse C# source for classes carrying node-getter attributes.
///
/// Strategy:
/// 1. Blank comments and literal contents so nesting can be tracked by braces
/// 2. Locate namespaces (file-scoped and braced) and class bodies
/// 3. Read class-level attribute sections and depth-1 member attribute sections
///
/// Attribute arguments must be compile-time constants; anything else makes
/// the attribute opt out silently.
pub fn extract_classes(content: &str, file_path: &str) -> Vec<ClassBindings> {
    let text = SourceText::new(content);
    let constants = ConstantTable::from_source(&text.code);

    let file_namespace = FILE_SCOPED_NS_RE
        .captures(&text.masked)
        .map(|c| c[1].to_string());
    let braced_namespaces: Vec<(String, usize, usize)> = BRACED_NS_RE
        .captures_iter(&text.masked)
        .filter_map(|caps| {
            let open = caps.get(0)?.end() - 1;
            let close = text.matching_brace(open)?;
            Some((caps[1].to_string(), open, close))
        })
        .collect();

    let classes = find_class_decls(&text);
    let mut result = Vec::new();

    for class in &classes {
        let at = class.keyword_start;
        let mut namespace_parts: Vec<&str> = Vec::new();
        if let Some(ns) = &file_namespace {
            namespace_parts.push(ns);
        }
        let mut enclosing_ns: Vec<&(String, usize, usize)> = braced_namespaces
            .iter()
            .filter(|(_, open, close)| *open < at && at < *close)
            .collect();
        enclosing_ns.sort_by_key(|(_, open, _)| *open);
        namespace_parts.extend(enclosing_ns.iter().map(|(name, _, _)| name.as_str()));
        let namespace = if namespace_parts.is_empty() {
            None
        } else {
            Some(namespace_parts.join("."))
        };

        let mut containing: Vec<&ClassDecl> = classes
            .iter()
            .filter(|outer| outer.body.0 < at && at < outer.body.1)
            .collect();
        containing.sort_by_key(|outer| outer.body.0);
        let containing_types: Vec<String> = containing.iter().map(|c| c.name.clone()).collect();

        let mut qualified: Vec<&str> = Vec::new();
        if let Some(ns) = &namespace {
            qualified.push(ns);
        }
        qualified.extend(containing_types.iter().map(String::as_str));
        qualified.push(&class.name);
        let owner_class = qualified.join(".");

        let mut requests = Vec::new();
        let mut verification: Option<VerificationSpec> = None;

        for attr in section_attributes(&text, &class.attribute_sections) {
            if attr.is(CLASS_GETTER_ATTRIBUTE) {
                if let Some(request) = class_request(&attr, &constants, &owner_class) {
                    requests.push(request);
                }
            } else if attr.is(VERIFY_ATTRIBUTE) && verification.is_none() {
                verification = verification_spec(&attr, &constants, &owner_class);
            }
        }

        for member in find_member_decls(&text, class.body) {
            for attr in section_attributes(&text, &member.attribute_sections) {
                if !attr.is(MEMBER_GETTER_ATTRIBUTE) {
                    continue;
                }
                if let Some(request) = member_request(&attr, &member, &constants, &owner_class) {
                    requests.push(request);
                }
            }
        }

        if requests.is_empty() && verification.is_none() {
            continue;
        }

        result.push(ClassBindings {
            owner_class,
            class_name: class.name.clone(),
            namespace,
            containing_types,
            requests,
            verification,
            source_files: vec![file_path.to_string()],
        });
    }

    merge_classes(result)
}

fn section_attributes(text: &SourceText, sections: &[(usize, usize)]) -> Vec<AttributeUse> {
    sections
        .iter()
        .flat_map(|&(open, close)| parse_section(&text.code[open + 1..close]))
        .collect()
}

fn find_class_decls(text: &SourceText) -> Vec<ClassDecl> {
    let masked = text.masked.as_bytes();
    let mut classes = Vec::new();

    for caps in CLASS_DECL_RE.captures_iter(&text.masked) {
        let (Some(keyword), Some(name_match)) = (caps.get(0), caps.get(1)) else {
            continue;
        };

        let mut name = name_match.as_str().to_string();
        let mut cursor = skip_whitespace(masked, name_match.end());
        if masked.get(cursor) == Some(&b'<') {
            if let Some(close) = matching_angle(masked, cursor) {
                let params = text.code[cursor..=close].split_whitespace().collect::<Vec<_>>().join(" ");
                name.push_str(&params);
                cursor = close + 1;
            }
        }

        let Some(offset) = text.masked[cursor..].find(|c: char| c == '{' || c == ';') else {
            continue;
        };
        let open = cursor + offset;
        if masked[open] != b'{' {
            continue;
        }
        let Some(close) = text.matching_brace(open) else {
            continue;
        };

        let modifiers_start = skip_modifiers_backward(&text.masked, keyword.start(), CLASS_MODIFIERS);
        let attribute_sections = attribute_sections_before(text, modifiers_start);

        classes.push(ClassDecl {
            name,
            keyword_start: keyword.start(),
            attribute_sections,
            body: (open, close),
        });
    }

    classes
}

/// Members declared directly in a class body that carry attribute sections
fn find_member_decls(text: &SourceText, body: (usize, usize)) -> Vec<MemberDecl> {
    let masked = text.masked.as_bytes();
    let (open, close) = body;
    let mut members = Vec::new();
    let mut depth = 0i32;
    let mut i = open + 1;

    while i < close {
        match masked[i] {
            b'{' => depth += 1,
            b'}' => depth -= 1,
            b'[' if depth == 0 && starts_statement(masked, open, i) => {
                let mut sections = Vec::new();
                let mut cursor = i;
                while masked.get(cursor) == Some(&b'[') {
                    let Some(end) = text.matching_close_bracket(cursor) else {
                        break;
                    };
                    // An unbalanced section running past the class body ends the scan
                    if end >= close {
                        break;
                    }
                    sections.push((cursor, end));
                    cursor = skip_whitespace(masked, end + 1);
                }
                if sections.is_empty() {
                    i += 1;
                    continue;
                }
                let Some(term_offset) = text
                    .masked
                    .get(cursor..close)
                    .and_then(|rest| rest.find(|c: char| matches!(c, '{' | ';' | '=' | '(')))
                else {
                    break;
                };
                let term = cursor + term_offset;
                if let Some(member) = parse_member(&text.code[cursor..term], masked[term], sections) {
                    members.push(member);
                }
                // Resume at the terminator so a property body is still counted
                i = term;
                continue;
            }
            _ => {}
        }
        i += 1;
    }

    members
}

fn parse_member(decl: &str, terminator: u8, sections: Vec<(usize, usize)>) -> Option<MemberDecl> {
    if terminator == b'(' {
        return None;
    }
    let decl = decl.trim();
    if decl
        .split_whitespace()
        .any(|word| NON_MEMBER_KEYWORDS.contains(&word))
    {
        return None;
    }

    let caps = TRAILING_IDENT_RE.captures(decl)?;
    let name_match = caps.get(1)?;
    let mut rest = decl[..name_match.start()].trim();
    let mut modifiers = Vec::new();
    loop {
        let word_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let word = &rest[..word_end];
        if word.is_empty() || !MEMBER_MODIFIERS.contains(&word) {
            break;
        }
        modifiers.push(word.to_string());
        rest = rest[word_end..].trim_start();
    }

    let type_name = rest.split_whitespace().collect::<Vec<_>>().join(" ");
    if type_name.is_empty() {
        return None;
    }

    Some(MemberDecl {
        name: name_match.as_str().to_string(),
        type_name,
        modifiers,
        is_property: terminator == b'{',
        attribute_sections: sections,
    })
}

fn class_request(attr: &AttributeUse, constants: &ConstantTable, owner_class: &str) -> Option<BindingRequest> {
    let bound = bind_arguments(&attr.args, &[&["nodeType"], &["nodePath", "path"], &["cache"]])?;
    let declared_type = typeof_target(bound[0]?)?;
    let relative_path = constant_path(bound[1]?, constants)?;
    let cached = match bound[2] {
        Some(expr) => constants.eval_bool(expr)?,
        None => false,
    };

    let accessor_name = format!("GetNode{}", accessor_fragment(&relative_path));
    let backing_field = cached.then(|| format!("_cache{}", accessor_name));

    Some(BindingRequest {
        owner_class: owner_class.to_string(),
        accessor_name,
        backing_field,
        declared_type,
        relative_path,
        cached,
        access_modifier: "private".to_string(),
        style: BindingStyle::Class,
    })
}

fn member_request(
    attr: &AttributeUse,
    member: &MemberDecl,
    constants: &ConstantTable,
    owner_class: &str,
) -> Option<BindingRequest> {
    let bound = bind_arguments(&attr.args, &[&["nodePath", "path"], &["cache"]])?;
    let relative_path = constant_path(bound[0]?, constants)?;
    let cached = match bound[1] {
        Some(expr) => constants.eval_bool(expr)?,
        None => false,
    };

    if !member.is_property {
        log::warn!(
            "[{}] on {}.{} ignored: only properties can be generated",
            MEMBER_GETTER_ATTRIBUTE,
            owner_class,
            member.name
        );
        return None;
    }
    if member.modifiers.iter().any(|m| m == "static") {
        log::warn!(
            "[{}] on {}.{} ignored: static properties have no node to look up from",
            MEMBER_GETTER_ATTRIBUTE,
            owner_class,
            member.name
        );
        return None;
    }

    let access: Vec<&str> = member
        .modifiers
        .iter()
        .map(String::as_str)
        .filter(|m| ACCESS_MODIFIERS.contains(m))
        .collect();
    let access_modifier = if access.is_empty() {
        "private".to_string()
    } else {
        access.join(" ")
    };

    let declared_type = member.type_name.trim_end_matches('?').to_string();
    let backing_field = cached.then(|| backing_field_name(&member.name));

    Some(BindingRequest {
        owner_class: owner_class.to_string(),
        accessor_name: member.name.clone(),
        backing_field,
        declared_type,
        relative_path,
        cached,
        access_modifier,
        style: BindingStyle::Member,
    })
}

fn verification_spec(attr: &AttributeUse, constants: &ConstantTable, owner_class: &str) -> Option<VerificationSpec> {
    if attr.args.len() != 1 {
        return None;
    }
    let scene_root_name = constants.eval_string(&attr.args[0].expr)?;
    Some(VerificationSpec {
        owner_class: owner_class.to_string(),
        scene_root_name,
    })
}

/// A constant, non-empty path without empty segments
fn constant_path(expr: &str, constants: &ConstantTable) -> Option<String> {
    let path = constants.eval_string(expr);
    match path {
        Some(p) if !p.is_empty() && p.split('/').all(|segment| !segment.is_empty()) => Some(p),
        Some(p) => {
            log::debug!("Ignoring malformed node path '{}'", p);
            None
        }
        None => {
            log::debug!("Ignoring non-constant node path argument `{}`", expr);
            None
        }
    }
}

/// Cache field for a member-style accessor; never equal to the property name
fn backing_field_name(property: &str) -> String {
    let field = lower_first(property);
    if field == property {
        format!("_{}", property)
    } else {
        field
    }
}

fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn skip_whitespace(bytes: &[u8], mut idx: usize) -> usize {
    while idx < bytes.len() && bytes[idx].is_ascii_whitespace() {
        idx += 1;
    }
    idx
}

/// Whether the `[` at `idx` begins an attribute rather than an indexer or array
fn starts_statement(bytes: &[u8], body_open: usize, idx: usize) -> bool {
    let mut j = idx;
    while j > body_open {
        j -= 1;
        if !bytes[j].is_ascii_whitespace() {
            return matches!(bytes[j], b'{' | b'}' | b';' | b']');
        }
    }
    true
}

fn matching_angle(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, &b) in bytes.iter().enumerate().skip(open) {
        match b {
            b'<' => depth += 1,
            b'>' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx);
                }
            }
            b'{' | b';' | b'(' => return None,
            _ => {}
        }
    }
    None
}

/// Walk back over modifier keywords preceding a declaration keyword
fn skip_modifiers_backward(masked: &str, mut pos: usize, modifiers: &[&str]) -> usize {
    loop {
        let before = masked[..pos].trim_end();
        let word_start = before
            .char_indices()
            .rev()
            .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        let word = &before[word_start..];
        if word.is_empty() || !modifiers.contains(&word) {
            return pos;
        }
        pos = word_start;
    }
}

/// Attribute sections immediately preceding `pos`, in source order
fn attribute_sections_before(text: &SourceText, mut pos: usize) -> Vec<(usize, usize)> {
    let mut sections = Vec::new();
    loop {
        let before = text.masked[..pos].trim_end();
        if !before.ends_with(']') {
            break;
        }
        let close = before.len() - 1;
        let Some(open) = text.matching_open_bracket(close) else {
            break;
        };
        sections.push((open, close));
        pos = open;
    }
    sections.reverse();
    sections
}

// ========== Tests ==========
