//! Rendering of lookup results.

mod text_table;

use thiserror::Error;

use crate::dataset::DatasetRecord;

pub use text_table::TextTableRenderer;

/// Errors that can occur while rendering records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("nothing to render")]
    NoRecords,

    #[error("rendered table is {length} characters, limit is {limit}")]
    TooLarge { length: usize, limit: usize },
}

/// A rendered result ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTable {
    /// HTML caption line(s).
    pub caption: String,

    /// HTML body holding the table itself.
    pub body: String,
}

impl RenderedTable {
    /// Caption and body joined into one HTML message.
    #[must_use]
    pub fn to_html(&self) -> String {
        format!("{}\n\n{}", self.caption, self.body)
    }
}

/// Turns matching records for one ID into a sendable table.
pub trait TableRenderer: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the records cannot be rendered.
    fn render(&self, id: &str, records: &[DatasetRecord]) -> Result<RenderedTable, RenderError>;
}

/// Escapes text for Telegram HTML parse mode.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b> & \"c\""), "a&lt;b&gt; &amp; &quot;c&quot;");
        assert_eq!(escape_html("plain"), "plain");
    }
}
