//! Line-addressed editing of manifest text
//!
//! Lines are 1-indexed and split with `str::lines` semantics. A trailing newline
//! on the original text survives edits; inserted text that ends in a newline
//! does not produce an extra empty line.

use thiserror::Error;
use tracing::debug;

/// Example manifest restored by `reset`
pub const EXAMPLE_MANIFEST: &str = r##"version: 6.5.0
type: DeclarativeSource

check:
  type: CheckStream
  stream_names:
    - posts

definitions:
  base_requester:
    type: HttpRequester
    url_base: https://jsonplaceholder.typicode.com

streams:
  - type: DeclarativeStream
    name: posts
    primary_key:
      - id
    retriever:
      type: SimpleRetriever
      requester:
        $ref: "#/definitions/base_requester"
        path: /posts
        http_method: GET
      record_selector:
        type: RecordSelector
        extractor:
          type: DpathExtractor
          field_path: []

spec:
  type: Spec
  connection_specification:
    type: object
    properties: {}
"##;

/// Editor contents before anything has been written
pub const EMPTY_MANIFEST: &str = "# Note: This is an empty YAML configuration.\n\
# Ask the assistant to help you build a connector manifest.\n";

/// Expected manifest failures; each renders as an `Error:` string for the agent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    #[error("Error: No manifest content available")]
    Empty,

    #[error("Error: start_line {start} is out of range (1-{total})")]
    StartOutOfRange { start: i64, total: usize },

    #[error("Error: end_line {end} is before start_line {start}")]
    EndBeforeStart { end: i64, start: i64 },

    #[error("Error: end_line {end} is out of range (1-{total})")]
    EndOutOfRange { end: i64, total: usize },

    #[error("Error: line_number must be >= 1 (got {0})")]
    InvalidLineNumber(i64),
}

/// Result of an edit: the new text and the confirmation for the agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEdit {
    pub content: String,
    pub message: String,
}

#[derive(Debug)]
struct Lines {
    lines: Vec<String>,
    trailing_newline: bool,
    /// Line ending of the document, `\r\n` when its first line ends that way
    eol: &'static str,
}

impl Lines {
    fn parse(text: &str) -> Self {
        let eol = match text.find('\n') {
            Some(i) if text[..i].ends_with('\r') => "\r\n",
            _ => "\n",
        };
        Self {
            lines: split(text),
            trailing_newline: text.ends_with('\n'),
            eol,
        }
    }

    fn total(&self) -> usize {
        self.lines.len()
    }

    fn render(self) -> String {
        if self.lines.is_empty() {
            return String::new();
        }
        let mut out = self.lines.join(self.eol);
        if self.trailing_newline {
            out.push_str(self.eol);
        }
        out
    }
}

fn split(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

/// Read the manifest, optionally a 1-indexed inclusive slice, optionally numbered
pub fn read_lines(
    content: &str,
    with_line_numbers: bool,
    start_line: Option<i64>,
    end_line: Option<i64>,
) -> Result<String, ManifestError> {
    debug!(?start_line, ?end_line, with_line_numbers, "manifest::read_lines: called");
    let lines = Lines::parse(content);
    let total = lines.total();
    if total == 0 {
        return Err(ManifestError::Empty);
    }

    let start = start_line.unwrap_or(1);
    if start < 1 || start as usize > total {
        return Err(ManifestError::StartOutOfRange { start, total });
    }
    let end = end_line.unwrap_or(total as i64);
    if end < start {
        return Err(ManifestError::EndBeforeStart { end, start });
    }
    if end as usize > total {
        return Err(ManifestError::EndOutOfRange { end, total });
    }

    let (start, end) = (start as usize, end as usize);
    let selected = lines.lines[start - 1..end].iter().enumerate().map(|(offset, line)| {
        if with_line_numbers {
            format!("{:>4} | {}", start + offset, line)
        } else {
            line.clone()
        }
    });
    Ok(selected.collect::<Vec<_>>().join("\n"))
}

/// Insert `text` before `line_number`; numbers past the end append
pub fn insert_lines(content: &str, line_number: i64, text: &str) -> Result<ManifestEdit, ManifestError> {
    debug!(line_number, "manifest::insert_lines: called");
    if line_number < 1 {
        return Err(ManifestError::InvalidLineNumber(line_number));
    }

    let mut lines = Lines::parse(content);
    let new_lines = split(text);
    let count = new_lines.len();
    let index = (line_number as usize - 1).min(lines.total());
    lines.lines.splice(index..index, new_lines);

    Ok(ManifestEdit {
        content: lines.render(),
        message: format!("Successfully inserted {} line(s) at line {}", count, index + 1),
    })
}

/// Replace the inclusive range `start_line..=end_line` with `text`'s lines
pub fn replace_lines(
    content: &str,
    start_line: i64,
    end_line: i64,
    text: &str,
) -> Result<ManifestEdit, ManifestError> {
    debug!(start_line, end_line, "manifest::replace_lines: called");
    let mut lines = Lines::parse(content);
    let total = lines.total();
    if start_line < 1 || start_line as usize > total {
        return Err(ManifestError::StartOutOfRange {
            start: start_line,
            total,
        });
    }
    if end_line < start_line {
        return Err(ManifestError::EndBeforeStart {
            end: end_line,
            start: start_line,
        });
    }
    if end_line as usize > total {
        return Err(ManifestError::EndOutOfRange { end: end_line, total });
    }

    let (start, end) = (start_line as usize, end_line as usize);
    let new_lines = split(text);
    let inserted = new_lines.len();
    lines.lines.splice(start - 1..end, new_lines);

    Ok(ManifestEdit {
        content: lines.render(),
        message: format!(
            "Successfully replaced {} line(s) (lines {}-{}) with {} new line(s)",
            end - start + 1,
            start,
            end,
            inserted
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn twenty_lines() -> String {
        (1..=20).map(|i| format!("line {}\n", i)).collect()
    }

    #[test]
    fn test_read_empty_is_error() {
        assert_eq!(read_lines("", false, None, None), Err(ManifestError::Empty));
        assert!(
            read_lines("", false, None, None)
                .unwrap_err()
                .to_string()
                .starts_with("Error:")
        );
    }

    #[test]
    fn test_read_range_with_numbers() {
        let out = read_lines(&twenty_lines(), true, Some(5), Some(10)).unwrap();
        let lines: Vec<&str> = out.split('\n').collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "   5 | line 5");
        assert_eq!(lines[5], "  10 | line 10");
    }

    #[test]
    fn test_read_open_ranges() {
        let out = read_lines(&twenty_lines(), false, Some(15), None).unwrap();
        assert_eq!(out.split('\n').count(), 6);

        let out = read_lines(&twenty_lines(), false, None, Some(5)).unwrap();
        assert_eq!(out.split('\n').collect::<Vec<_>>(), vec!["line 1", "line 2", "line 3", "line 4", "line 5"]);
    }

    #[test]
    fn test_read_range_errors() {
        let content = twenty_lines();
        let err = read_lines(&content, false, Some(100), None).unwrap_err().to_string();
        assert!(err.starts_with("Error: start_line") && err.contains("out of range"));

        let err = read_lines(&content, false, Some(5), Some(2)).unwrap_err().to_string();
        assert!(err.starts_with("Error: end_line") && err.contains("before start_line"));

        let err = read_lines(&content, false, None, Some(21)).unwrap_err().to_string();
        assert!(err.starts_with("Error: end_line") && err.contains("out of range"));

        assert!(read_lines(&content, false, Some(0), None).is_err());
    }

    #[test]
    fn test_insert_in_middle() {
        let edit = insert_lines("a\nb\nc", 2, "X").unwrap();
        assert_eq!(edit.content, "a\nX\nb\nc");
        assert_eq!(edit.message, "Successfully inserted 1 line(s) at line 2");
    }

    #[test]
    fn test_insert_past_end_appends() {
        let edit = insert_lines("a\nb\n", 999, "# End comment").unwrap();
        assert_eq!(edit.content, "a\nb\n# End comment\n");
        assert!(edit.message.contains("at line 3"));
    }

    #[test]
    fn test_insert_multiple_and_trailing_newline_in_text() {
        let edit = insert_lines("a\nb", 1, "x\ny\nz\n").unwrap();
        assert_eq!(edit.content, "x\ny\nz\na\nb");
        assert!(edit.message.starts_with("Successfully inserted 3 line(s)"));
    }

    #[test]
    fn test_insert_into_empty() {
        let edit = insert_lines("", 1, "name: test").unwrap();
        assert_eq!(edit.content, "name: test");
    }

    #[test]
    fn test_insert_rejects_zero() {
        let err = insert_lines("a", 0, "x").unwrap_err();
        assert!(err.to_string().starts_with("Error: line_number must be >= 1"));
    }

    #[test]
    fn test_replace_range_on_twenty_lines() {
        let edit = replace_lines(&twenty_lines(), 5, 8, "new 1\nnew 2").unwrap();
        assert_eq!(
            edit.message,
            "Successfully replaced 4 line(s) (lines 5-8) with 2 new line(s)"
        );
        let lines: Vec<&str> = edit.content.lines().collect();
        assert_eq!(lines.len(), 18);
        assert_eq!(lines[3], "line 4");
        assert_eq!(lines[4], "new 1");
        assert_eq!(lines[5], "new 2");
        assert_eq!(lines[6], "line 9");
        assert!(edit.content.ends_with('\n'));
    }

    #[test]
    fn test_replace_with_empty_text_deletes() {
        let edit = replace_lines("a\nb\nc", 2, 2, "").unwrap();
        assert_eq!(edit.content, "a\nc");
        assert!(edit.message.ends_with("with 0 new line(s)"));
    }

    #[test]
    fn test_replace_errors() {
        let content = twenty_lines();
        let err = replace_lines(&content, 100, 101, "x").unwrap_err().to_string();
        assert!(err.contains("start_line") && err.contains("out of range"));
        let err = replace_lines(&content, 5, 2, "x").unwrap_err().to_string();
        assert!(err.contains("before start_line"));
        let err = replace_lines(&content, 5, 100, "x").unwrap_err().to_string();
        assert!(err.starts_with("Error: end_line") && err.contains("out of range"));
        assert!(replace_lines("", 1, 1, "x").is_err());
    }

    #[test]
    fn test_crlf_manifest_keeps_line_endings() {
        let content = "a: 1\r\nb: 2\r\nc: 3\r\n";

        let edit = insert_lines(content, 2, "x: 9").unwrap();
        assert_eq!(edit.content, "a: 1\r\nx: 9\r\nb: 2\r\nc: 3\r\n");

        let edit = replace_lines(content, 2, 2, "y: 8").unwrap();
        assert_eq!(edit.content, "a: 1\r\ny: 8\r\nc: 3\r\n");

        let edit = replace_lines(content, 1, 3, "z: 0\r\n").unwrap();
        assert_eq!(edit.content, "z: 0\r\n");
    }

    #[test]
    fn test_crlf_read_strips_carriage_returns() {
        assert_eq!(read_lines("a\r\nb\r\n", true, None, None).unwrap(), "   1 | a\n   2 | b");
    }

    #[test]
    fn test_default_manifests() {
        assert_eq!(EMPTY_MANIFEST.lines().count(), 2);
        assert!(EMPTY_MANIFEST.lines().all(|l| l.starts_with('#')));
        let parsed: serde_yaml::Value = serde_yaml::from_str(EXAMPLE_MANIFEST).unwrap();
        assert_eq!(parsed["type"], "DeclarativeSource");
    }

    fn arb_doc() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-z][a-z ]{0,7}", 1..30)
    }

    proptest! {
        #[test]
        fn prop_replace_changes_line_count(
            doc in arb_doc(),
            a in 0usize..30,
            b in 0usize..30,
            repl in prop::collection::vec("[a-z]{1,5}", 0..6),
        ) {
            let total = doc.len();
            let s = a % total + 1;
            let e = s + b % (total - s + 1);
            let content = doc.join("\n");
            let text = repl.join("\n");

            let edit = replace_lines(&content, s as i64, e as i64, &text).unwrap();
            let new_total = edit.content.lines().count();
            prop_assert_eq!(new_total as i64, total as i64 + repl.len() as i64 - (e - s + 1) as i64);
        }

        #[test]
        fn prop_read_is_idempotent(doc in arb_doc()) {
            let content = doc.join("\n");
            let first = read_lines(&content, true, None, None).unwrap();
            let second = read_lines(&content, true, None, None).unwrap();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_insert_then_read(
            doc in arb_doc(),
            at in 1usize..40,
            new in prop::collection::vec("[A-Z]{1,5}", 1..5),
        ) {
            let content = doc.join("\n");
            let edit = insert_lines(&content, at as i64, &new.join("\n")).unwrap();
            let landed = at.min(doc.len() + 1) as i64;
            let read = read_lines(&edit.content, false, Some(landed), Some(landed + new.len() as i64 - 1)).unwrap();
            prop_assert_eq!(read, new.join("\n"));
        }
    }
}
