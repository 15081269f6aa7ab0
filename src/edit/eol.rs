//! Line-terminator detection and the line buffer all edit operators work on.

/// Line terminator family of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eol {
    Lf,
    CrLf,
}

impl Eol {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
        }
    }

    /// Detect the predominant terminator. Mixed input resolves to whichever
    /// form dominates; a file with no newlines reads as LF.
    #[must_use]
    pub fn detect(text: &str) -> Self {
        let crlf = text.matches("\r\n").count();
        let total = text.matches('\n').count();
        let lf = total - crlf;
        if crlf > 0 && crlf >= lf { Self::CrLf } else { Self::Lf }
    }
}

/// A file's content split into logical lines (no terminators inside), with
/// enough bookkeeping to re-render byte-faithfully: the dominant terminator
/// and whether the file ended with a newline.
#[derive(Debug, Clone)]
pub struct Buffer {
    pub lines: Vec<String>,
    pub trailing_newline: bool,
    pub eol: Eol,
}

impl Buffer {
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let eol = Eol::detect(text);
        let normalized = text.replace("\r\n", "\n");
        let trailing_newline = normalized.ends_with('\n');
        let body = normalized.strip_suffix('\n').unwrap_or(&normalized);
        let lines = if body.is_empty() && !trailing_newline {
            Vec::new()
        } else {
            body.split('\n').map(String::from).collect()
        };
        Self {
            lines,
            trailing_newline,
            eol,
        }
    }

    /// Render with the dominant terminator; mixed input comes out normalized.
    #[must_use]
    pub fn render(&self) -> String {
        if self.lines.is_empty() {
            return String::new();
        }
        let mut out = self.lines.join(self.eol.as_str());
        if self.trailing_newline {
            out.push_str(self.eol.as_str());
        }
        out
    }

    /// LF-normalized text for regex operators (`^`/`$` match line bounds).
    #[must_use]
    pub fn to_lf_text(&self) -> String {
        if self.lines.is_empty() {
            return String::new();
        }
        let mut out = self.lines.join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }

    /// Replace content from LF-normalized text, keeping the detected
    /// terminator for rendering.
    pub fn set_from_lf_text(&mut self, text: &str) {
        let eol = self.eol;
        *self = Self::parse(text);
        self.eol = eol;
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

/// Split an operation body into logical lines. A trailing newline on the
/// body does not produce a phantom empty line.
#[must_use]
pub fn split_body(body: &str) -> Vec<String> {
    if body.is_empty() {
        return Vec::new();
    }
    let normalized = body.replace("\r\n", "\n");
    let trimmed = normalized.strip_suffix('\n').unwrap_or(&normalized);
    trimmed.split('\n').map(String::from).collect()
}
