//! Monospace table renderer.

use super::{RenderError, RenderedTable, TableRenderer, escape_html};
use crate::dataset::DatasetRecord;

/// Telegram's maximum message length in characters.
pub const MESSAGE_LIMIT: usize = 4096;

/// Renders records as an aligned table inside a `<pre>` block.
#[derive(Debug, Clone)]
pub struct TextTableRenderer {
    admin_contact: String,
    limit: usize,
}

impl TextTableRenderer {
    #[must_use]
    pub fn new(admin_contact: impl Into<String>) -> Self {
        Self {
            admin_contact: admin_contact.into(),
            limit: MESSAGE_LIMIT,
        }
    }

    /// Overrides the maximum rendered length.
    #[must_use]
    pub const fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }
}

impl TableRenderer for TextTableRenderer {
    fn render(&self, id: &str, records: &[DatasetRecord]) -> Result<RenderedTable, RenderError> {
        let first = records.first().ok_or(RenderError::NoRecords)?;

        let header: Vec<String> = first.columns().map(str::to_owned).collect();
        let rows: Vec<Vec<String>> = records
            .iter()
            .map(|record| header.iter().map(|column| cell_text(record, column)).collect())
            .collect();

        let widths: Vec<usize> = header
            .iter()
            .enumerate()
            .map(|(i, name)| {
                rows.iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(name.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let mut table = String::new();
        push_row(&mut table, &header, &widths);
        push_separator(&mut table, &widths);
        for row in &rows {
            push_row(&mut table, row, &widths);
        }

        let rendered = RenderedTable {
            caption: format!(
                "📊 <b>Data for ID {}</b>\nAdmin: {}",
                escape_html(id),
                escape_html(&self.admin_contact)
            ),
            body: format!("<pre>{}</pre>", escape_html(table.trim_end())),
        };

        let length = rendered.to_html().chars().count();
        if length > self.limit {
            return Err(RenderError::TooLarge {
                length,
                limit: self.limit,
            });
        }
        Ok(rendered)
    }
}

fn cell_text(record: &DatasetRecord, column: &str) -> String {
    record
        .get(column)
        .map(ToString::to_string)
        .unwrap_or_default()
        .replace(['\n', '\r'], " ")
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect();
    out.push_str(line.join(" | ").trim_end());
    out.push('\n');
}

fn push_separator(out: &mut String, widths: &[usize]) {
    let line: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&line.join("-+-"));
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::CellValue;

    fn record(id: i64, name: &str) -> DatasetRecord {
        DatasetRecord::new(vec![
            ("ID".to_owned(), CellValue::Integer(id)),
            ("Name".to_owned(), CellValue::Text(name.to_owned())),
        ])
    }

    #[test]
    fn test_renders_aligned_table() {
        let renderer = TextTableRenderer::new("@admin");
        let table = renderer
            .render("7", &[record(7, "Ann"), record(7, "Christopher")])
            .unwrap();

        assert_eq!(table.caption, "📊 <b>Data for ID 7</b>\nAdmin: @admin");
        assert_eq!(
            table.body,
            "<pre>ID | Name\n---+------------\n7  | Ann\n7  | Christopher</pre>"
        );
    }

    #[test]
    fn test_cells_are_escaped() {
        let renderer = TextTableRenderer::new("@admin");
        let table = renderer.render("1", &[record(1, "<b>&")]).unwrap();
        assert!(table.body.contains("&lt;b&gt;&amp;"));
    }

    #[test]
    fn test_no_records_is_an_error() {
        let renderer = TextTableRenderer::new("@admin");
        assert_eq!(renderer.render("1", &[]), Err(RenderError::NoRecords));
    }

    #[test]
    fn test_oversized_table_is_rejected() {
        let renderer = TextTableRenderer::new("@admin").with_limit(40);
        let result = renderer.render("1", &[record(1, &"x".repeat(100))]);
        assert!(matches!(result, Err(RenderError::TooLarge { limit: 40, .. })));
    }
}
