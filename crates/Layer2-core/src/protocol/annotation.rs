//! Source annotations - `File_name:` / `Project:` in comment lines
//!
//! Only comment lines (and lines inside a `/* ... */` block) are searched, so
//! a `Project:` inside code does not count.

use regex::Regex;
use std::path::{Component, Path};

lazy_static::lazy_static! {
    static ref COMMENT_LINES: Vec<Regex> = [
        r"^#.*$",
        r"^//.*$",
        r"^/\*.*\*/$",
        r"^<!--.*-->$",
        r#"^".*"$"#,
        r"^;.*$",
        r"^--",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid comment regex"))
    .collect();

    static ref BLOCK_LINE: Regex = Regex::new(r"^/\*.*\*/$").expect("valid regex");
    static ref BLOCK_START: Regex = Regex::new(r"^/\*").expect("valid regex");
    static ref BLOCK_END: Regex = Regex::new(r"\*/$").expect("valid regex");

    static ref FILE_NAME: Regex = Regex::new(r"File_name[ \t]*:[ \t]*(.*)").expect("valid regex");
    static ref PROJECT: Regex = Regex::new(r"Project[ \t]*:[ \t]*(.*)").expect("valid regex");
}

/// Where a submitted source file goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIdentity {
    pub project: String,
    pub file_name: String,
}

/// Comment lines of `message`, one per line
pub fn annotation_buffer(message: &str) -> String {
    let mut buffer = String::new();
    let mut in_block = false;

    for line in message.split('\n') {
        let line = line.trim_end_matches('\r');

        let keep = if BLOCK_LINE.is_match(line) {
            true
        } else if BLOCK_START.is_match(line) {
            in_block = true;
            true
        } else if in_block && BLOCK_END.is_match(line) {
            in_block = false;
            true
        } else {
            in_block || COMMENT_LINES.iter().any(|re| re.is_match(line))
        };

        if keep {
            buffer.push_str(line);
            buffer.push('\n');
        }
    }

    buffer
}

/// Project and file name from the annotations. `None` unless both are present,
/// non-empty and stay inside the project directory.
pub fn extract_identity(message: &str) -> Option<FileIdentity> {
    let buffer = annotation_buffer(message);

    let file_name = capture(&FILE_NAME, &buffer)?;
    let project = capture(&PROJECT, &buffer)?;

    if !is_plain_relative(&project) || !is_plain_relative(&file_name) {
        return None;
    }

    Some(FileIdentity { project, file_name })
}

fn capture(re: &Regex, buffer: &str) -> Option<String> {
    let value = re.captures(buffer)?.get(1)?.as_str().trim();
    // value written inside a one-line block or html comment
    let value = value
        .strip_suffix("*/")
        .or_else(|| value.strip_suffix("-->"))
        .unwrap_or(value)
        .trim();

    (!value.is_empty()).then(|| value.to_string())
}

/// Relative path made only of normal components (no `..`, no root)
fn is_plain_relative(value: &str) -> bool {
    Path::new(value)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_comments() {
        let message = "# File_name: app.py\n# Project: demo\nprint('hi')\n";
        assert_eq!(
            extract_identity(message),
            Some(FileIdentity {
                project: "demo".into(),
                file_name: "app.py".into(),
            })
        );
    }

    #[test]
    fn test_slash_comments_with_crlf() {
        let message = "// File_name : main.c \r\n// Project:  hello \r\nint main() {}\r\n";
        let identity = extract_identity(message).unwrap();
        assert_eq!(identity.file_name, "main.c");
        assert_eq!(identity.project, "hello");
    }

    #[test]
    fn test_block_comment_span() {
        let message = "/*\n File_name: Program.cs\n Project: web\n*/\nclass P {}\n";
        let buffer = annotation_buffer(message);
        assert!(buffer.contains(" File_name: Program.cs"));
        assert!(!buffer.contains("class P"));

        let identity = extract_identity(message).unwrap();
        assert_eq!(identity.project, "web");
    }

    #[test]
    fn test_single_line_block_and_html() {
        let message = "/* File_name: a.c */\n<!-- Project: site -->\n";
        let identity = extract_identity(message).unwrap();
        assert_eq!(identity.file_name, "a.c");
        assert_eq!(identity.project, "site");
    }

    #[test]
    fn test_code_lines_ignored() {
        let message = "x = 'Project: demo'\n# File_name: app.py\n";
        assert_eq!(extract_identity(message), None);
    }

    #[test]
    fn test_missing_file_name() {
        assert_eq!(extract_identity("# Project: demo\n"), None);
        assert_eq!(extract_identity("# File_name:\n# Project: demo\n"), None);
    }

    #[test]
    fn test_path_escape_rejected() {
        assert_eq!(
            extract_identity("# File_name: ../../etc/passwd\n# Project: demo\n"),
            None
        );
        assert_eq!(extract_identity("# File_name: a.py\n# Project: /tmp\n"), None);
        let nested = extract_identity("# File_name: src/lib.rs\n# Project: demo\n").unwrap();
        assert_eq!(nested.file_name, "src/lib.rs");
    }

    #[test]
    fn test_other_comment_styles() {
        let message = "-- File_name: q.sql\n; Project: db\n";
        let identity = extract_identity(message).unwrap();
        assert_eq!(identity.file_name, "q.sql");
        assert_eq!(identity.project, "db");
    }
}
