//! DOCX (OOXML word-processing) extraction.

use super::FormatExtractor;
use crate::error::{IngestError, IngestResult};
use litrev_core::FormatTag;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read};

const MAX_XML_ENTRY_BYTES: u64 = 64 * 1024 * 1024;

const DOCUMENT_XML: &str = "word/document.xml";
const STYLES_XML: &str = "word/styles.xml";
const CORE_XML: &str = "docProps/core.xml";

type Archive<'a> = zip::ZipArchive<Cursor<&'a [u8]>>;

fn ooxml_error(message: impl std::fmt::Display) -> IngestError {
    IngestError::extraction(FormatTag::Docx, message)
}

/// Read one archive entry, `None` if the entry does not exist.
fn read_zip_entry(archive: &mut Archive<'_>, name: &str) -> IngestResult<Option<Vec<u8>>> {
    let entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(ooxml_error(e)),
    };
    let mut out = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(ooxml_error)?;
    if out.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ooxml_error(format!(
            "ZIP entry {} exceeds size limit ({} bytes)",
            name, MAX_XML_ENTRY_BYTES
        )));
    }
    Ok(Some(out))
}

fn attr_value(e: &BytesStart<'_>, local: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == local)
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

/// Word numbers its built-in heading styles 1 through 9.
const MAX_HEADING_LEVEL: u32 = 9;

/// Heading style of a paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    /// `Heading N` with N in 1..=9.
    Numbered(u32),
    /// A heading style with no usable level; rendered as level 1 and not counted.
    Unnumbered,
}

impl Heading {
    pub fn depth(self) -> u32 {
        match self {
            Heading::Numbered(level) => level,
            Heading::Unnumbered => 1,
        }
    }
}

/// Heading kind for a paragraph style name such as `Heading 2`.
fn heading_for_style(style_name: &str) -> Option<Heading> {
    let lower = style_name.trim().to_lowercase();
    let rest = lower.strip_prefix("heading")?;
    Some(match rest.trim().parse::<u32>() {
        Ok(level) if (1..=MAX_HEADING_LEVEL).contains(&level) => Heading::Numbered(level),
        _ => Heading::Unnumbered,
    })
}

/// A top-level body element, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum DocxBlock {
    Paragraph {
        text: String,
        heading: Option<Heading>,
    },
    Table {
        rows: Vec<Vec<String>>,
    },
}

impl DocxBlock {
    fn render(&self) -> String {
        match self {
            DocxBlock::Paragraph {
                text,
                heading: Some(heading),
            } => format!("\n{} {}", "#".repeat(heading.depth() as usize), text),
            DocxBlock::Paragraph { text, .. } => text.clone(),
            DocxBlock::Table { rows } => {
                let rows: Vec<String> = rows.iter().map(|cells| cells.join(" | ")).collect();
                format!("\n{}\n", rows.join("\n"))
            }
        }
    }
}

/// Descriptive properties from `docProps/core.xml`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocxProperties {
    pub title: String,
    pub author: String,
    pub subject: String,
}

/// Parsed body structure of a DOCX file.
#[derive(Debug, Clone, Default)]
pub struct DocxStructure {
    pub blocks: Vec<DocxBlock>,
    pub properties: DocxProperties,
}

impl DocxStructure {
    /// Parse the body, styles and core properties of a DOCX archive.
    pub fn parse(bytes: &[u8]) -> IngestResult<Self> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(ooxml_error)?;

        let document = read_zip_entry(&mut archive, DOCUMENT_XML)?
            .ok_or_else(|| ooxml_error(format!("{} not found", DOCUMENT_XML)))?;
        let styles = match read_zip_entry(&mut archive, STYLES_XML)? {
            Some(xml) => parse_style_names(&xml)?,
            None => HashMap::new(),
        };
        let properties = match read_zip_entry(&mut archive, CORE_XML)? {
            Some(xml) => parse_core_properties(&xml)?,
            None => DocxProperties::default(),
        };

        Ok(Self {
            blocks: parse_body(&document, &styles)?,
            properties,
        })
    }

    /// Plain text in document order.
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .map(DocxBlock::render)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Number of top-level paragraphs, headings included.
    pub fn paragraph_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, DocxBlock::Paragraph { .. }))
            .count()
    }

    pub fn table_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, DocxBlock::Table { .. }))
            .count()
    }

    /// Number of numbered headings per level.
    pub fn heading_counts(&self) -> BTreeMap<u32, usize> {
        let mut counts = BTreeMap::new();
        for block in &self.blocks {
            if let DocxBlock::Paragraph {
                heading: Some(Heading::Numbered(level)),
                ..
            } = block
            {
                *counts.entry(*level).or_insert(0) += 1;
            }
        }
        counts
    }
}

/// Map of style id to display name from `word/styles.xml`.
fn parse_style_names(xml: &[u8]) -> IngestResult<HashMap<String, String>> {
    let mut names = HashMap::new();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut current_id: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"style" => {
                current_id = attr_value(&e, b"styleId");
            }
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"name" => {
                if let (Some(id), Some(name)) = (current_id.as_ref(), attr_value(&e, b"val")) {
                    names.insert(id.clone(), name);
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"style" => current_id = None,
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_error(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(names)
}

fn parse_core_properties(xml: &[u8]) -> IngestResult<DocxProperties> {
    let mut props = DocxProperties::default();
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut field: Option<&'static str> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                field = match e.local_name().as_ref() {
                    b"title" => Some("title"),
                    b"creator" => Some("author"),
                    b"subject" => Some("subject"),
                    _ => None,
                };
            }
            Ok(Event::Text(t)) => {
                if let Some(name) = field {
                    let text = t.unescape().map_err(ooxml_error)?;
                    let slot = match name {
                        "title" => &mut props.title,
                        "author" => &mut props.author,
                        _ => &mut props.subject,
                    };
                    slot.push_str(&text);
                }
            }
            Ok(Event::End(_)) => field = None,
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_error(e)),
            _ => {}
        }
        buf.clear();
    }
    Ok(props)
}

#[derive(Default)]
struct ParagraphState {
    text: String,
    style_id: Option<String>,
}

#[derive(Default)]
struct TableState {
    rows: Vec<Vec<String>>,
    row: Option<Vec<String>>,
    cell: Option<String>,
    cell_paragraphs: usize,
    /// Depth of tables nested inside the current cell.
    nested: usize,
}

impl TableState {
    fn start_cell_paragraph(&mut self) {
        if let Some(cell) = self.cell.as_mut() {
            if self.cell_paragraphs > 0 {
                cell.push('\n');
            }
            self.cell_paragraphs += 1;
        }
    }
}

/// Walk `word/document.xml`, collecting top-level paragraphs and tables.
fn parse_body(xml: &[u8], styles: &HashMap<String, String>) -> IngestResult<Vec<DocxBlock>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut blocks = Vec::new();

    let mut depth = 0usize;
    let mut body_depth: Option<usize> = None;
    let mut paragraph: Option<ParagraphState> = None;
    let mut table: Option<TableState> = None;
    let mut in_text = false;

    let finish_paragraph = |state: ParagraphState, blocks: &mut Vec<DocxBlock>| {
        let heading = state
            .style_id
            .as_deref()
            .map(|id| styles.get(id).map(String::as_str).unwrap_or(id))
            .and_then(heading_for_style);
        blocks.push(DocxBlock::Paragraph {
            text: state.text,
            heading,
        });
    };

    loop {
        let event = reader.read_event_into(&mut buf).map_err(ooxml_error)?;
        match event {
            Event::Start(e) => {
                depth += 1;
                let at_body_level = body_depth == Some(depth - 1);
                match e.local_name().as_ref() {
                    b"body" if body_depth.is_none() => body_depth = Some(depth),
                    b"p" if at_body_level => paragraph = Some(ParagraphState::default()),
                    b"tbl" if at_body_level => table = Some(TableState::default()),
                    b"tbl" => {
                        if let Some(t) = table.as_mut() {
                            t.nested += 1;
                        }
                    }
                    b"tr" => {
                        if let Some(t) = table.as_mut().filter(|t| t.nested == 0) {
                            t.row = Some(Vec::new());
                        }
                    }
                    b"tc" => {
                        if let Some(t) = table.as_mut().filter(|t| t.nested == 0) {
                            t.cell = Some(String::new());
                            t.cell_paragraphs = 0;
                        }
                    }
                    b"p" => {
                        if let Some(t) = table.as_mut() {
                            t.start_cell_paragraph();
                        }
                    }
                    b"t" => in_text = true,
                    _ => {}
                }
            }
            Event::Empty(e) => {
                let at_body_level = body_depth == Some(depth);
                match e.local_name().as_ref() {
                    b"p" if at_body_level => finish_paragraph(ParagraphState::default(), &mut blocks),
                    b"p" => {
                        if let Some(t) = table.as_mut() {
                            t.start_cell_paragraph();
                        }
                    }
                    b"pStyle" => {
                        if let Some(p) = paragraph.as_mut() {
                            p.style_id = attr_value(&e, b"val");
                        }
                    }
                    b"tab" => {
                        if let Some(s) = text_sink(&mut paragraph, &mut table) {
                            s.push('\t');
                        }
                    }
                    b"br" | b"cr" => {
                        if let Some(s) = text_sink(&mut paragraph, &mut table) {
                            s.push('\n');
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(t) if in_text => {
                let text = t.unescape().map_err(ooxml_error)?;
                if let Some(s) = text_sink(&mut paragraph, &mut table) {
                    s.push_str(&text);
                }
            }
            Event::End(e) => {
                let at_body_level = body_depth == Some(depth - 1);
                match e.local_name().as_ref() {
                    b"t" => in_text = false,
                    b"p" if at_body_level => {
                        if let Some(state) = paragraph.take() {
                            finish_paragraph(state, &mut blocks);
                        }
                    }
                    b"tbl" if at_body_level => {
                        if let Some(state) = table.take() {
                            blocks.push(DocxBlock::Table { rows: state.rows });
                        }
                    }
                    b"tbl" => {
                        if let Some(t) = table.as_mut() {
                            t.nested = t.nested.saturating_sub(1);
                        }
                    }
                    b"tc" => {
                        if let Some(t) = table.as_mut().filter(|t| t.nested == 0) {
                            if let (Some(row), Some(cell)) = (t.row.as_mut(), t.cell.take()) {
                                row.push(cell);
                            }
                        }
                    }
                    b"tr" => {
                        if let Some(t) = table.as_mut().filter(|t| t.nested == 0) {
                            if let Some(row) = t.row.take() {
                                t.rows.push(row);
                            }
                        }
                    }
                    b"body" if body_depth == Some(depth) => body_depth = None,
                    _ => {}
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(blocks)
}

/// Where run text currently goes: the open table cell, else the open paragraph.
fn text_sink<'a>(
    paragraph: &'a mut Option<ParagraphState>,
    table: &'a mut Option<TableState>,
) -> Option<&'a mut String> {
    if let Some(cell) = table.as_mut().and_then(|t| t.cell.as_mut()) {
        return Some(cell);
    }
    paragraph.as_mut().map(|p| &mut p.text)
}

/// Parser for DOCX files.
#[derive(Debug, Default)]
pub struct DocxExtractor;

impl DocxExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl FormatExtractor for DocxExtractor {
    fn format(&self) -> FormatTag {
        FormatTag::Docx
    }

    fn extract(&self, bytes: &[u8]) -> IngestResult<String> {
        Ok(DocxStructure::parse(bytes)?.text())
    }
}
