//! Minimal reader for the first worksheet of an `.xlsx` workbook.
//!
//! Opens the OOXML zip package, resolves the first sheet through
//! `xl/workbook.xml` and its relationships, and flattens the sheet XML
//! into a dense grid of [`CellValue`]s trimmed to the used range.

use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use thiserror::Error;
use zip::ZipArchive;
use zip::result::ZipError;

use super::record::CellValue;

/// Largest uncompressed workbook part we are willing to inflate.
const MAX_PART_BYTES: u64 = 100 * 1024 * 1024;

/// Largest dense grid (rows times header width) we build from a sheet.
const MAX_GRID_CELLS: usize = 5_000_000;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// Structural problems with an uploaded workbook.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("not an xlsx file (not a zip archive)")]
    NotZip,

    #[error("zip error: {0}")]
    Zip(String),

    #[error("workbook part missing: {0}")]
    MissingPart(String),

    #[error("workbook part '{path}' is too large: {size} bytes")]
    PartTooLarge { path: String, size: u64 },

    #[error("workbook has no sheets")]
    NoSheets,

    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("invalid cell address: {0}")]
    InvalidAddress(String),

    #[error("shared string index {0} out of bounds")]
    SharedStringOutOfBounds(usize),

    #[error("sheet is too large: {rows} rows x {columns} columns")]
    TooManyCells { rows: usize, columns: usize },
}

/// Cell contents of one worksheet, row-major. Only rows holding a value are
/// kept, each as wide as the header row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetGrid {
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetGrid {
    #[must_use]
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }
}

/// Reads the first worksheet of an xlsx workbook.
///
/// # Errors
///
/// Returns an error if the bytes are not a readable xlsx package.
pub fn read_first_sheet(bytes: &[u8]) -> Result<SheetGrid, SheetError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|err| match err {
        ZipError::InvalidArchive(_) | ZipError::UnsupportedArchive(_) => SheetError::NotZip,
        other => SheetError::Zip(other.to_string()),
    })?;

    let workbook = read_part(&mut archive, WORKBOOK_PART)?
        .ok_or_else(|| SheetError::MissingPart(WORKBOOK_PART.to_owned()))?;
    let sheets = parse_workbook_xml(&workbook)?;
    let first = sheets.first().ok_or(SheetError::NoSheets)?;

    let relationships = match read_part(&mut archive, WORKBOOK_RELS_PART)? {
        Some(xml) => parse_relationships(&xml)?,
        None => HashMap::new(),
    };
    let target = resolve_sheet_target(first, &relationships);

    let shared_strings = match read_part(&mut archive, SHARED_STRINGS_PART)? {
        Some(xml) => parse_shared_strings(&xml)?,
        None => Vec::new(),
    };

    let sheet = read_part(&mut archive, &target)?.ok_or(SheetError::MissingPart(target))?;
    parse_sheet_xml(&sheet, &shared_strings)
}

fn read_part(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<Option<Vec<u8>>, SheetError> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(SheetError::Zip(e.to_string())),
    };

    if file.size() > MAX_PART_BYTES {
        return Err(SheetError::PartTooLarge {
            path: name.to_owned(),
            size: file.size(),
        });
    }

    let mut buf = Vec::new();
    file.read_to_end(&mut buf)
        .map_err(|e| SheetError::Zip(format!("failed to read '{name}': {e}")))?;
    Ok(Some(buf))
}

struct SheetDescriptor {
    rel_id: Option<String>,
    sheet_id: Option<u32>,
}

fn parse_workbook_xml(xml: &[u8]) -> Result<Vec<SheetDescriptor>, SheetError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut sheets = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) if e.local_name().as_ref() == b"sheet" => {
                let mut rel_id = None;
                let mut sheet_id = None;
                for attr in e.attributes() {
                    let attr = attr.map_err(|e| SheetError::Xml(e.to_string()))?;
                    match attr.key.as_ref() {
                        b"sheetId" => {
                            sheet_id = attr.unescape_value().map_err(to_xml_err)?.parse().ok();
                        }
                        b"r:id" => {
                            rel_id = Some(attr.unescape_value().map_err(to_xml_err)?.into_owned());
                        }
                        _ => {}
                    }
                }
                sheets.push(SheetDescriptor { rel_id, sheet_id });
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(to_xml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}

fn parse_relationships(xml: &[u8]) -> Result<HashMap<String, String>, SheetError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut map = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) if e.local_name().as_ref() == b"Relationship" => {
                let id = get_attr_value(&e, b"Id")?;
                let target = get_attr_value(&e, b"Target")?;
                let rel_type = get_attr_value(&e, b"Type")?;

                if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type)
                    && rel_type.ends_with("/worksheet")
                {
                    map.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(to_xml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(map)
}

fn resolve_sheet_target(sheet: &SheetDescriptor, relationships: &HashMap<String, String>) -> String {
    if let Some(rel_id) = &sheet.rel_id
        && let Some(target) = relationships.get(rel_id)
    {
        return normalize_target(target);
    }

    let guessed = format!("worksheets/sheet{}.xml", sheet.sheet_id.unwrap_or(1));
    normalize_target(&guessed)
}

fn normalize_target(target: &str) -> String {
    let trimmed = target.trim_start_matches('/');
    if trimmed.starts_with("xl/") {
        trimmed.to_owned()
    } else {
        format!("xl/{trimmed}")
    }
}

fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>, SheetError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    // Phonetic runs carry their own <t> elements that are not part of the value.
    let mut in_phonetic = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"si" => {
                    current.clear();
                    in_si = true;
                }
                b"rPh" => in_phonetic = true,
                b"t" if in_si && !in_phonetic => {
                    let text = reader.read_text(e.name()).map_err(to_xml_err)?;
                    current.push_str(&unescape(&text)?);
                }
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"si" => strings.push(String::new()),
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"si" => {
                    strings.push(std::mem::take(&mut current));
                    in_si = false;
                }
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(to_xml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

fn parse_sheet_xml(xml: &[u8], shared_strings: &[String]) -> Result<SheetGrid, SheetError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();

    let mut cells: BTreeMap<u32, BTreeMap<u32, CellValue>> = BTreeMap::new();
    let mut current_row: u32 = 0;
    let mut next_col: u32 = 0;
    let mut seen_row = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e) | Event::Empty(e)) if e.local_name().as_ref() == b"row" => {
                current_row = match get_attr_value(&e, b"r")? {
                    Some(r) => r
                        .trim()
                        .parse::<u32>()
                        .ok()
                        .and_then(|r| r.checked_sub(1))
                        .ok_or(SheetError::InvalidAddress(r))?,
                    None if seen_row => current_row + 1,
                    None => 0,
                };
                seen_row = true;
                next_col = 0;
            }
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"c" => {
                let (row, col, value) =
                    parse_cell(&mut reader, &e, shared_strings, current_row, next_col)?;
                next_col = col + 1;
                if !value.is_empty() {
                    cells.entry(row).or_default().insert(col, value);
                }
            }
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"c" => {
                let (_, col) = cell_position(&e, current_row, next_col)?;
                next_col = col + 1;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(to_xml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    build_grid(&cells)
}

fn cell_position(start: &BytesStart<'_>, row: u32, next_col: u32) -> Result<(u32, u32), SheetError> {
    match get_attr_value(start, b"r")? {
        Some(address) => {
            address_to_index(&address).ok_or(SheetError::InvalidAddress(address))
        }
        None => Ok((row, next_col)),
    }
}

fn parse_cell(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart<'_>,
    shared_strings: &[String],
    row: u32,
    next_col: u32,
) -> Result<(u32, u32, CellValue), SheetError> {
    let (row, col) = cell_position(start, row, next_col)?;
    let cell_type = get_attr_value(start, b"t")?;

    let mut value_text: Option<String> = None;
    let mut inline_text: Option<String> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"v" => {
                let text = reader.read_text(e.name()).map_err(to_xml_err)?;
                value_text = Some(unescape(&text)?);
            }
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"is" => {
                inline_text = Some(read_inline_string(reader)?);
            }
            Ok(Event::End(e)) if e.name().as_ref() == start.name().as_ref() => break,
            Ok(Event::Eof) => {
                return Err(SheetError::Xml("unexpected EOF inside cell".into()));
            }
            Err(e) => return Err(to_xml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    let value = match inline_text {
        Some(text) => text_cell(text),
        None => convert_value(value_text.as_deref(), cell_type.as_deref(), shared_strings)?,
    };

    Ok((row, col, value))
}

fn read_inline_string(reader: &mut Reader<&[u8]>) -> Result<String, SheetError> {
    let mut buf = Vec::new();
    let mut value = String::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => {
                let text = reader.read_text(e.name()).map_err(to_xml_err)?;
                value.push_str(&unescape(&text)?);
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"is" => break,
            Ok(Event::Eof) => {
                return Err(SheetError::Xml("unexpected EOF inside inline string".into()));
            }
            Err(e) => return Err(to_xml_err(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(value)
}

fn convert_value(
    value_text: Option<&str>,
    cell_type: Option<&str>,
    shared_strings: &[String],
) -> Result<CellValue, SheetError> {
    let Some(raw) = value_text else {
        return Ok(CellValue::Empty);
    };

    let trimmed = raw.trim();
    match cell_type {
        Some("s") => {
            let idx = trimmed
                .parse::<usize>()
                .map_err(|e| SheetError::Xml(format!("bad shared string index: {e}")))?;
            let text = shared_strings
                .get(idx)
                .ok_or(SheetError::SharedStringOutOfBounds(idx))?;
            Ok(text_cell(text.clone()))
        }
        Some("b") => Ok(match trimmed {
            "1" => CellValue::Text("TRUE".to_owned()),
            "0" => CellValue::Text("FALSE".to_owned()),
            _ => CellValue::Empty,
        }),
        Some("e" | "d") => Ok(text_cell(trimmed.to_owned())),
        Some("str" | "inlineStr") => Ok(text_cell(raw.to_owned())),
        _ => Ok(match trimmed.parse::<f64>() {
            Ok(n) => CellValue::number(n),
            Err(_) => text_cell(trimmed.to_owned()),
        }),
    }
}

fn text_cell(text: String) -> CellValue {
    if text.is_empty() {
        CellValue::Empty
    } else {
        CellValue::Text(text)
    }
}

/// Converts sparse cells into dense rows.
///
/// The first non-empty row is the header and fixes the width: columns run
/// from the leftmost used column to the header's last cell, and anything
/// further right is dropped. Rows without cells are left out.
fn build_grid(cells: &BTreeMap<u32, BTreeMap<u32, CellValue>>) -> Result<SheetGrid, SheetError> {
    let Some(header) = cells.values().next() else {
        return Ok(SheetGrid::default());
    };
    let Some(min_col) = cells.values().filter_map(|row| row.keys().next()).min().copied() else {
        return Ok(SheetGrid::default());
    };
    let last_col = header.keys().next_back().copied().unwrap_or(min_col).max(min_col);

    let width = (last_col - min_col + 1) as usize;
    let cell_count = cells.len().saturating_mul(width);
    if cell_count > MAX_GRID_CELLS {
        return Err(SheetError::TooManyCells {
            rows: cells.len(),
            columns: width,
        });
    }

    let rows = cells
        .values()
        .map(|values| {
            let mut row = vec![CellValue::Empty; width];
            for (&c, value) in values.range(min_col..=last_col) {
                row[(c - min_col) as usize] = value.clone();
            }
            row
        })
        .collect();

    Ok(SheetGrid { rows })
}

/// Converts an A1-style address into zero-based `(row, col)`.
fn address_to_index(a1: &str) -> Option<(u32, u32)> {
    let a1 = a1.trim().replace('$', "");
    let split = a1.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = a1.split_at(split);
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let mut col: u32 = 0;
    for ch in letters.bytes() {
        col = col
            .checked_mul(26)?
            .checked_add(u32::from(ch.to_ascii_uppercase() - b'A' + 1))?;
    }
    let row: u32 = digits.parse().ok()?;

    Some((row.checked_sub(1)?, col.checked_sub(1)?))
}

fn get_attr_value(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, SheetError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| SheetError::Xml(e.to_string()))?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value().map_err(to_xml_err)?.into_owned()));
        }
    }
    Ok(None)
}

fn unescape(text: &str) -> Result<String, SheetError> {
    quick_xml::escape::unescape(text)
        .map(std::borrow::Cow::into_owned)
        .map_err(|e| SheetError::Xml(e.to_string()))
}

fn to_xml_err(err: quick_xml::Error) -> SheetError {
    SheetError::Xml(err.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    use super::*;

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"></Types>"#;

    const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"
          xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets>
</workbook>"#;

    const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

    /// Escapes text for use inside an XML element.
    fn escape(text: &str) -> String {
        text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
    }

    /// Builds an xlsx workbook whose first sheet holds `rows`.
    ///
    /// Cells that parse as numbers are written as numeric cells, everything
    /// else as inline strings; empty strings are left out.
    pub(crate) fn workbook_bytes(rows: &[&[&str]]) -> Vec<u8> {
        let mut sheet = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
        );
        for (r, row) in rows.iter().enumerate() {
            sheet.push_str(&format!(r#"<row r="{}">"#, r + 1));
            for (c, value) in row.iter().enumerate() {
                if value.is_empty() {
                    continue;
                }
                let col = char::from(b'A' + u8::try_from(c).unwrap());
                let address = format!("{col}{}", r + 1);
                if value.parse::<f64>().is_ok() {
                    sheet.push_str(&format!(r#"<c r="{address}"><v>{value}</v></c>"#));
                } else {
                    sheet.push_str(&format!(
                        r#"<c r="{address}" t="inlineStr"><is><t>{}</t></is></c>"#,
                        escape(value)
                    ));
                }
            }
            sheet.push_str("</row>");
        }
        sheet.push_str("</sheetData></worksheet>");

        package(&[
            ("[Content_Types].xml", CONTENT_TYPES),
            (WORKBOOK_PART, WORKBOOK),
            (WORKBOOK_RELS_PART, WORKBOOK_RELS),
            ("xl/worksheets/sheet1.xml", &sheet),
        ])
    }

    fn package(parts: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in parts {
            writer.start_file(*name, SimpleFileOptions::default()).unwrap();
            writer.write_all(body.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_reads_inline_and_numeric_cells() {
        let bytes = workbook_bytes(&[&["ID", "Name", "Score"], &["7", "Ann", "9.5"]]);
        let grid = read_first_sheet(&bytes).unwrap();
        assert_eq!(grid.width(), 3);
        assert_eq!(
            grid.rows[1],
            vec![
                CellValue::Integer(7),
                CellValue::Text("Ann".to_owned()),
                CellValue::Float(9.5),
            ]
        );
    }

    #[test]
    fn test_shared_strings_and_types() {
        let shared = r#"<sst><si><t>ID</t></si><si><r><t>Tom</t></r><r><t xml:space="preserve"> &amp; Jerry</t></r><rPh><t>x</t></rPh></si></sst>"#;
        let sheet = r#"<worksheet><sheetData>
            <row r="2"><c r="B2" t="s"><v>0</v></c><c r="C2" t="b"><v>1</v></c></row>
            <row r="3"><c r="B3" t="s"><v>1</v></c><c r="C3" t="e"><v>#N/A</v></c></row>
        </sheetData></worksheet>"#;
        let bytes = package(&[
            (WORKBOOK_PART, WORKBOOK),
            (WORKBOOK_RELS_PART, WORKBOOK_RELS),
            (SHARED_STRINGS_PART, shared),
            ("xl/worksheets/sheet1.xml", sheet),
        ]);

        let grid = read_first_sheet(&bytes).unwrap();
        // Leading empty row and column are trimmed away.
        assert_eq!(grid.rows.len(), 2);
        assert_eq!(grid.rows[0][0], CellValue::Text("ID".to_owned()));
        assert_eq!(grid.rows[0][1], CellValue::Text("TRUE".to_owned()));
        assert_eq!(grid.rows[1][0], CellValue::Text("Tom & Jerry".to_owned()));
        assert_eq!(grid.rows[1][1], CellValue::Text("#N/A".to_owned()));
    }

    #[test]
    fn test_sheet_without_relationships_uses_sheet_id() {
        let sheet = r#"<worksheet><sheetData><row><c t="inlineStr"><is><t>ID</t></is></c></row></sheetData></worksheet>"#;
        let bytes = package(&[(WORKBOOK_PART, WORKBOOK), ("xl/worksheets/sheet1.xml", sheet)]);
        let grid = read_first_sheet(&bytes).unwrap();
        assert_eq!(grid.rows, vec![vec![CellValue::Text("ID".to_owned())]]);
    }

    #[test]
    fn test_not_a_zip() {
        assert!(matches!(
            read_first_sheet(b"ID,Name\n7,Ann\n"),
            Err(SheetError::NotZip)
        ));
    }

    #[test]
    fn test_missing_workbook_part() {
        let bytes = package(&[("[Content_Types].xml", CONTENT_TYPES)]);
        assert!(matches!(
            read_first_sheet(&bytes),
            Err(SheetError::MissingPart(part)) if part == WORKBOOK_PART
        ));
    }

    #[test]
    fn test_shared_string_out_of_bounds() {
        let sheet = r#"<worksheet><sheetData><row r="1"><c r="A1" t="s"><v>3</v></c></row></sheetData></worksheet>"#;
        let bytes = package(&[(WORKBOOK_PART, WORKBOOK), ("xl/worksheets/sheet1.xml", sheet)]);
        assert!(matches!(
            read_first_sheet(&bytes),
            Err(SheetError::SharedStringOutOfBounds(3))
        ));
    }

    #[test]
    fn test_far_away_cells_do_not_widen_the_grid() {
        let sheet = r#"<worksheet><sheetData>
            <row r="1"><c r="A1" t="inlineStr"><is><t>ID</t></is></c></row>
            <row r="2"><c r="A2"><v>7</v></c></row>
            <row r="5000"><c r="ZZ5000" t="inlineStr"><is><t>x</t></is></c></row>
            <row r="1048576"><c r="XFD1048576"><v>1</v></c></row>
        </sheetData></worksheet>"#;
        let bytes = package(&[(WORKBOOK_PART, WORKBOOK), ("xl/worksheets/sheet1.xml", sheet)]);

        let grid = read_first_sheet(&bytes).unwrap();
        assert_eq!(grid.width(), 1);
        assert_eq!(
            grid.rows,
            vec![
                vec![CellValue::Text("ID".to_owned())],
                vec![CellValue::Integer(7)],
                vec![CellValue::Empty],
                vec![CellValue::Empty],
            ]
        );
    }

    #[test]
    fn test_oversized_grid_is_rejected() {
        let mut cells: BTreeMap<u32, BTreeMap<u32, CellValue>> = BTreeMap::new();
        cells.entry(0).or_default().insert(0, CellValue::Text("ID".to_owned()));
        cells.entry(0).or_default().insert(16_383, CellValue::Text("far".to_owned()));
        for row in 1..400 {
            cells.entry(row).or_default().insert(0, CellValue::Integer(i64::from(row)));
        }

        assert!(matches!(
            build_grid(&cells),
            Err(SheetError::TooManyCells { rows: 400, columns: 16_384 })
        ));
    }

    #[test]
    fn test_address_to_index() {
        assert_eq!(address_to_index("A1"), Some((0, 0)));
        assert_eq!(address_to_index("$C$12"), Some((11, 2)));
        assert_eq!(address_to_index("AA3"), Some((2, 26)));
        assert_eq!(address_to_index("1A"), None);
        assert_eq!(address_to_index("A0"), None);
    }
}
