use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Namespace the generator's attributes are declared in.
pub const ATTRIBUTE_NAMESPACE: &str = "NodeGetterGenerators";

const MAX_EVAL_DEPTH: usize = 64;

static CONST_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bconst\s+(?:string|bool|String|Boolean|System\.String|System\.Boolean)\s+(\w+)\s*=\s*([^;]+);")
        .unwrap()
});
static TYPEOF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^typeof\s*\((.+)\)$").unwrap());
static NAMEOF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^nameof\s*\(\s*([\w.]+)\s*\)$").unwrap());
static QUALIFIED_IDENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:global::)?[A-Za-z_]\w*(?:\.[A-Za-z_]\w*)*$").unwrap());

/// One attribute inside an attribute section
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeUse {
    /// Simple name without namespace or `Attribute` suffix
    pub name: String,
    /// Namespace qualifier as written, if any
    pub qualifier: Option<String>,
    pub args: Vec<Argument>,
}

impl AttributeUse {
    /// Whether this is `name`, written bare or qualified with the generator namespace
    pub fn is(&self, name: &str) -> bool {
        self.name == name
            && self
                .qualifier
                .as_deref()
                .is_none_or(|q| q == ATTRIBUTE_NAMESPACE)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    /// `cache: true` and `Cache = true` both record "cache"
    pub name: Option<String>,
    pub expr: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Str(String),
    Bool(bool),
}

/// Parse the text between the brackets of one attribute section.
pub fn parse_section(section: &str) -> Vec<AttributeUse> {
    let body = strip_target(section);
    split_top_level(body, ',')
        .into_iter()
        .filter_map(|part| parse_attribute(part.trim()))
        .collect()
}

/// Skip an `[assembly: ...]`/`[property: ...]` style target specifier
fn strip_target(section: &str) -> &str {
    let trimmed = section.trim_start();
    let ident_len = trimmed
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(trimmed.len());
    if ident_len == 0 {
        return section;
    }
    let rest = trimmed[ident_len..].trim_start();
    if rest.starts_with(':') && !rest.starts_with("::") {
        &rest[1..]
    } else {
        section
    }
}

fn parse_attribute(text: &str) -> Option<AttributeUse> {
    if text.is_empty() {
        return None;
    }
    let (full_name, args_text) = match text.find('(') {
        Some(open) => {
            let close = text.rfind(')')?;
            if close < open {
                return None;
            }
            (text[..open].trim(), Some(&text[open + 1..close]))
        }
        None => (text.trim(), None),
    };

    let full_name = full_name.trim_start_matches("global::");
    let (qualifier, simple) = match full_name.rsplit_once('.') {
        Some((q, s)) => (Some(q.to_string()), s),
        None => (None, full_name),
    };
    let name = simple.strip_suffix("Attribute").unwrap_or(simple);
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }

    let args = match args_text {
        Some(inner) if !inner.trim().is_empty() => split_top_level(inner, ',')
            .into_iter()
            .map(parse_argument)
            .collect(),
        _ => Vec::new(),
    };

    Some(AttributeUse { name: name.to_string(), qualifier, args })
}

fn parse_argument(raw: &str) -> Argument {
    let raw = raw.trim();
    let ident_len = raw
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(raw.len());
    if ident_len > 0 {
        let rest = raw[ident_len..].trim_start();
        let named = (rest.starts_with(':') && !rest.starts_with("::"))
            || (rest.starts_with('=') && !rest.starts_with("=="));
        if named {
            return Argument {
                name: Some(raw[..ident_len].to_lowercase()),
                expr: rest[1..].trim().to_string(),
            };
        }
    }
    Argument { name: None, expr: raw.to_string() }
}

/// Bind arguments to parameters. Positional arguments fill parameters in
/// order, named ones are matched case-insensitively against each
/// parameter's accepted names. Returns None on surplus or unknown arguments.
pub fn bind_arguments<'a>(args: &'a [Argument], params: &[&[&str]]) -> Option<Vec<Option<&'a str>>> {
    let mut bound: Vec<Option<&str>> = vec![None; params.len()];
    let mut position = 0;
    for arg in args {
        let slot = match &arg.name {
            None => {
                let slot = position;
                position += 1;
                slot
            }
            Some(name) => params
                .iter()
                .position(|accepted| accepted.iter().any(|a| a.eq_ignore_ascii_case(name)))?,
        };
        if slot >= params.len() || bound[slot].is_some() {
            return None;
        }
        bound[slot] = Some(arg.expr.as_str());
    }
    Some(bound)
}

/// Type named by a `typeof(T)` expression, whitespace-normalized
pub fn typeof_target(expr: &str) -> Option<String> {
    let caps = TYPEOF_RE.captures(expr.trim())?;
    let ty = caps[1].split_whitespace().collect::<Vec<_>>().join(" ");
    if ty.is_empty() {
        None
    } else {
        Some(ty)
    }
}

/// `const string`/`const bool` declarations visible to attribute arguments in one file
#[derive(Debug, Default)]
pub struct ConstantTable {
    exprs: HashMap<String, String>,
}

impl ConstantTable {
    /// Collect constant declarations from comment-free source
    pub fn from_source(code: &str) -> Self {
        let mut exprs = HashMap::new();
        for caps in CONST_DECL_RE.captures_iter(code) {
            exprs
                .entry(caps[1].to_string())
                .or_insert_with(|| caps[2].trim().to_string());
        }
        ConstantTable { exprs }
    }

    pub fn eval_string(&self, expr: &str) -> Option<String> {
        match self.eval(expr)? {
            ConstValue::Str(s) => Some(s),
            ConstValue::Bool(_) => None,
        }
    }

    pub fn eval_bool(&self, expr: &str) -> Option<bool> {
        match self.eval(expr)? {
            ConstValue::Bool(b) => Some(b),
            ConstValue::Str(_) => None,
        }
    }

    /// Evaluate a compile-time constant expression; None if it is not one
    pub fn eval(&self, expr: &str) -> Option<ConstValue> {
        self.eval_depth(expr, 0)
    }

    fn eval_depth(&self, expr: &str, depth: usize) -> Option<ConstValue> {
        // Constants referring to each other in a loop are not constant
        if depth > MAX_EVAL_DEPTH {
            return None;
        }
        let expr = strip_parens(expr.trim());

        let parts = split_top_level(expr, '+');
        if parts.len() > 1 {
            let mut joined = String::new();
            for part in parts {
                match self.eval_depth(part, depth + 1)? {
                    ConstValue::Str(s) => joined.push_str(&s),
                    ConstValue::Bool(_) => return None,
                }
            }
            return Some(ConstValue::Str(joined));
        }

        match expr {
            "true" => return Some(ConstValue::Bool(true)),
            "false" => return Some(ConstValue::Bool(false)),
            _ => {}
        }

        if let Some(s) = parse_string_literal(expr) {
            return Some(ConstValue::Str(s));
        }

        if let Some(caps) = NAMEOF_RE.captures(expr) {
            let target = &caps[1];
            let last = target.rsplit('.').next().unwrap_or(target);
            return Some(ConstValue::Str(last.to_string()));
        }

        if QUALIFIED_IDENT_RE.is_match(expr) {
            let last = expr.rsplit('.').next().unwrap_or(expr);
            let referenced = self.exprs.get(last)?;
            return self.eval_depth(referenced, depth + 1);
        }

        None
    }
}

fn strip_parens(mut expr: &str) -> &str {
    while expr.starts_with('(') && expr.ends_with(')') {
        let inner = &expr[1..expr.len() - 1];
        // `(a) + (b)` is not wrapped as a whole
        if !balanced(inner) {
            break;
        }
        expr = inner.trim();
    }
    expr
}

fn balanced(text: &str) -> bool {
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut prev = '\0';
    for c in text.chars() {
        if in_string {
            if c == '"' && prev != '\\' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if c == '(' {
            depth += 1;
        } else if c == ')' {
            depth -= 1;
            if depth < 0 {
                return false;
            }
        }
        prev = c;
    }
    depth == 0
}

/// Decode a regular (`"..."`) or verbatim (`@"..."`) string literal that spans the whole expression.
pub fn parse_string_literal(expr: &str) -> Option<String> {
    if let Some(body) = expr.strip_prefix("@\"") {
        let body = body.strip_suffix('"')?;
        let mut out = String::new();
        let mut chars = body.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '"' {
                // Only doubled quotes may appear inside
                if chars.next() != Some('"') {
                    return None;
                }
            }
            out.push(c);
        }
        return Some(out);
    }

    let body = expr.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = String::new();
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => return None,
            '\\' => match chars.next()? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                'r' => out.push('\r'),
                '0' => out.push('\0'),
                '\\' => out.push('\\'),
                '"' => out.push('"'),
                '\'' => out.push('\''),
                'u' => {
                    let hex: String = chars.by_ref().take(4).collect();
                    let code = u32::from_str_radix(&hex, 16).ok()?;
                    out.push(char::from_u32(code)?);
                }
                _ => return None,
            },
            _ => out.push(c),
        }
    }
    Some(out)
}

/// Split on `sep` outside of string literals and (), [], {} nesting
pub fn split_top_level(text: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut verbatim = false;
    let mut escaped = false;
    let mut start = 0;
    let mut prev = '\0';
    let mut iter = text.char_indices().peekable();

    while let Some((idx, c)) = iter.next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' && !verbatim {
                escaped = true;
            } else if c == '"' {
                if verbatim && iter.peek().map(|&(_, n)| n) == Some('"') {
                    iter.next();
                } else {
                    in_string = false;
                }
            }
            prev = c;
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                verbatim = prev == '@';
            }
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            _ if c == sep && depth == 0 => {
                parts.push(&text[start..idx]);
                start = idx + c.len_utf8();
            }
            _ => {}
        }
        prev = c;
    }
    parts.push(&text[start..]);
    parts
}
