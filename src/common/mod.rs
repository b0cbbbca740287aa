pub mod types;

pub use types::*;

use std::fs;
use std::path::Path;

use crate::error::{GeneratorError, Result};

const UTF8_BOM: char = '\u{feff}';

/// Load a `.cs`, `.tscn` or config file as scanner-ready text.
///
/// A leading byte-order mark is dropped and CRLF line endings become LF, so
/// every regex and byte offset downstream sees the same text on every
/// platform. Failures carry the offending path.
pub fn read_text_file<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|e| GeneratorError::io(path.to_string_lossy(), e))?;
    Ok(normalize_text(&raw))
}

/// Strip a leading BOM and convert CRLF to LF
pub fn normalize_text(raw: &str) -> String {
    let text = raw.strip_prefix(UTF8_BOM).unwrap_or(raw);
    if text.contains("\r\n") {
        text.replace("\r\n", "\n")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("[node name=\"Main\"]\r\n\r\n"), "[node name=\"Main\"]\n\n");
        assert_eq!(normalize_text("\u{feff}namespace Game;\n"), "namespace Game;\n");
        // A lone CR is content, not a line ending
        assert_eq!(normalize_text("a\rb\n"), "a\rb\n");
    }

    #[test]
    fn test_read_text_file_from_visual_studio() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("Main.cs");
        fs::write(&file, b"\xEF\xBB\xBFnamespace tutorial;\r\npublic partial class Main { }\r\n").unwrap();
        assert_eq!(
            read_text_file(&file).unwrap(),
            "namespace tutorial;\npublic partial class Main { }\n"
        );
    }

    #[test]
    fn test_read_text_file_error_names_path() {
        let err = read_text_file("/nonexistent/scenes/Main.tscn").unwrap_err();
        assert!(matches!(err, GeneratorError::Io { ref path, .. } if path.ends_with("Main.tscn")));
    }
}
