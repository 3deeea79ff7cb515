//! Immutable buffer contents.
//!
//! A [`Content`] is the text held by one pipeline stage: an ordered
//! sequence of lines. It is built once (from command output, a file, or
//! literal lines) and never mutated afterwards. Stages own their content
//! exclusively; dropping the stage releases it.
//!
//! # Example
//!
//! ```rust
//! use bufpipe_core::content::Content;
//!
//! let c = Content::from_text("a\nb\nc\n");
//! assert_eq!(c.line_count(), 3);
//! assert_eq!(c.to_text(), "a\nb\nc\n");
//! ```

/// The text of a pipeline stage, stored as lines without terminators.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Content {
    lines: Box<[String]>,
}

impl Content {
    /// Content with no lines.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Split `text` into lines.
    ///
    /// Follows [`str::lines`]: `\n` and `\r\n` both terminate a line and a
    /// single trailing terminator does not produce an extra empty line.
    pub fn from_text(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    /// Build content from already-split lines.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Decode raw command output. Invalid UTF-8 is replaced rather than
    /// rejected so binary-ish output still lands in a stage.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::from_text(&String::from_utf8_lossy(bytes))
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// True when there is nothing worth keeping: no lines at all, or only
    /// empty lines. Command output in this state is reported as
    /// "produced no output" instead of becoming a stage.
    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|l| l.is_empty())
    }

    /// Join the lines back into text, each terminated by `\n`.
    ///
    /// This is the form written to a command's stdin.
    pub fn to_text(&self) -> String {
        let size: usize = self.lines.iter().map(|l| l.len() + 1).sum();
        let mut out = String::with_capacity(size);
        for line in self.lines.iter() {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::from_text(text)
    }
}
