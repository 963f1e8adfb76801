//! Format readers, writers and converters for fileconv.
//!
//! Every format is a thin adapter over an ecosystem crate. Enable formats via
//! feature flags; converters that need two formats are registered only when
//! both are enabled.
//!
//! # Features
//!
//! - `json` (default) - JSON documents via serde_json
//! - `csv` (default) - CSV tables via csv
//! - `xml` (default) - XML documents via quick-xml
//! - `spreadsheet` (default) - XLSX/XLS reading via calamine
//! - `image` (default) - raster images and animated GIF via image
//! - `pdf` (default) - images to PDF pages and PDF image extraction via lopdf
//! - `all` - all formats
//!
//! Plain text and markdown need no feature.

use fileconv_core::{
    Content, ConvertError, ConverterDescriptor, FileTypeKind, ReadError, Reader, Registry,
    WriteError, Writer,
};
use std::path::Path;
use tracing::debug;

/// Register all enabled converters with the registry.
pub fn register_all(registry: &mut Registry) {
    registry.register(text_to_markdown());
    registry.register(text_concat());

    #[cfg(all(feature = "xml", feature = "json"))]
    registry.register(xml_to_json());

    #[cfg(all(feature = "json", feature = "csv"))]
    {
        registry.register(json_to_csv());
        registry.register(csv_to_json());
    }

    #[cfg(all(feature = "csv", feature = "xml"))]
    registry.register(csv_to_xml());

    #[cfg(all(feature = "spreadsheet", feature = "csv"))]
    registry.register(excel_to_csv());

    #[cfg(feature = "image")]
    registry.register(images_to_gif());

    #[cfg(feature = "pdf")]
    {
        registry.register(images_to_pdf());
        registry.register(pdf_to_images());
    }

    debug!(converters = registry.len(), "registered format converters");
}

fn expect_text(content: &Content) -> Result<&str, ConvertError> {
    content.as_text().ok_or(ConvertError::UnexpectedContent {
        expected: "text",
        found: content.shape(),
    })
}

#[cfg(any(
    all(feature = "json", feature = "csv"),
    all(feature = "csv", feature = "xml"),
    all(feature = "spreadsheet", feature = "csv"),
))]
fn expect_rows(content: &Content) -> Result<&[Vec<String>], ConvertError> {
    content.as_rows().ok_or(ConvertError::UnexpectedContent {
        expected: "rows",
        found: content.shape(),
    })
}

#[cfg(all(feature = "json", feature = "csv"))]
fn expect_json(content: &Content) -> Result<&serde_json::Value, ConvertError> {
    content.as_json().ok_or(ConvertError::UnexpectedContent {
        expected: "json",
        found: content.shape(),
    })
}

// ============================================
// TEXT
// ============================================

/// UTF-8 text files. Also used for markdown.
pub struct TextFile;

impl Reader for TextFile {
    fn read(&self, path: &Path) -> Result<Content, ReadError> {
        std::fs::read_to_string(path)
            .map(Content::Text)
            .map_err(|e| ReadError::io(path, e))
    }

    fn check_format(&self, content: &Content) -> bool {
        content.as_text().is_some()
    }
}

impl Writer for TextFile {
    fn check_format(&self, content: &Content) -> bool {
        content.as_text().is_some()
    }

    fn write(&self, path: &Path, content: &Content) -> Result<(), WriteError> {
        let text = content
            .as_text()
            .ok_or(WriteError::UnexpectedContent(content.shape()))?;
        std::fs::write(path, text).map_err(|e| WriteError::io(path, e))
    }
}

/// Plain text to markdown, one input per paragraph line.
pub fn text_to_markdown() -> ConverterDescriptor {
    ConverterDescriptor::buffered(
        "text-to-markdown",
        FileTypeKind::Text,
        FileTypeKind::Markdown,
        TextFile,
        TextFile,
        |inputs| {
            let parts = inputs.iter().map(expect_text).collect::<Result<Vec<_>, _>>()?;
            Ok(Content::Text(parts.join("\n")))
        },
    )
    .description("Copy plain text into a markdown file")
}

/// Concatenate text files, writing straight to the output.
pub fn text_concat() -> ConverterDescriptor {
    ConverterDescriptor::direct(
        "text-concat",
        FileTypeKind::Text,
        FileTypeKind::Text,
        TextFile,
        |inputs, path| {
            use std::io::Write;

            let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
            for input in inputs {
                out.write_all(expect_text(input)?.as_bytes())?;
            }
            out.flush()?;
            Ok(())
        },
    )
    .description("Concatenate text files")
}

// ============================================
// JSON
// ============================================

#[cfg(feature = "json")]
mod json_impl {
    use super::*;

    /// JSON documents, held as `serde_json::Value`.
    pub struct JsonFile;

    impl Reader for JsonFile {
        fn read(&self, path: &Path) -> Result<Content, ReadError> {
            let data = std::fs::read(path).map_err(|e| ReadError::io(path, e))?;
            serde_json::from_slice(&data)
                .map(Content::Json)
                .map_err(|e| ReadError::decode(path, format!("invalid JSON: {e}")))
        }

        fn check_format(&self, content: &Content) -> bool {
            content.as_json().is_some()
        }
    }

    impl Writer for JsonFile {
        fn check_format(&self, content: &Content) -> bool {
            content.as_json().is_some()
        }

        fn write(&self, path: &Path, content: &Content) -> Result<(), WriteError> {
            let value = content
                .as_json()
                .ok_or(WriteError::UnexpectedContent(content.shape()))?;
            let text = serde_json::to_string_pretty(value)
                .map_err(|e| WriteError::encode(path, format!("JSON serialization failed: {e}")))?;
            std::fs::write(path, text).map_err(|e| WriteError::io(path, e))
        }
    }

    /// One input keeps its value; several are collected into an array.
    pub(crate) fn merge(values: Vec<serde_json::Value>) -> serde_json::Value {
        if values.len() == 1 {
            values.into_iter().next().unwrap_or_default()
        } else {
            serde_json::Value::Array(values)
        }
    }
}

#[cfg(feature = "json")]
pub use json_impl::JsonFile;

// ============================================
// CSV
// ============================================

#[cfg(feature = "csv")]
mod csv_impl {
    use super::*;

    /// CSV tables, held as rows of cells. The header is just the first row.
    pub struct CsvFile;

    impl Reader for CsvFile {
        fn read(&self, path: &Path) -> Result<Content, ReadError> {
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(false)
                .flexible(true)
                .from_path(path)
                .map_err(|e| ReadError::decode(path, e))?;

            let mut rows = Vec::new();
            for record in reader.records() {
                let record =
                    record.map_err(|e| ReadError::decode(path, format!("invalid CSV: {e}")))?;
                rows.push(record.iter().map(str::to_string).collect());
            }
            Ok(Content::Rows(rows))
        }

        fn check_format(&self, content: &Content) -> bool {
            content.as_rows().is_some()
        }
    }

    impl Writer for CsvFile {
        fn check_format(&self, content: &Content) -> bool {
            content.as_rows().is_some()
        }

        fn write(&self, path: &Path, content: &Content) -> Result<(), WriteError> {
            let rows = content
                .as_rows()
                .ok_or(WriteError::UnexpectedContent(content.shape()))?;

            let mut writer = csv::WriterBuilder::new()
                .flexible(true)
                .from_path(path)
                .map_err(|e| WriteError::encode(path, e))?;
            for row in rows {
                writer
                    .write_record(row)
                    .map_err(|e| WriteError::encode(path, e))?;
            }
            writer.flush().map_err(|e| WriteError::io(path, e))
        }
    }

    /// Header of a table, naming columns past its end `col_<n>`.
    pub(crate) fn column_name(header: &[String], index: usize) -> String {
        header
            .get(index)
            .filter(|name| !name.is_empty())
            .cloned()
            .unwrap_or_else(|| format!("col_{index}"))
    }
}

#[cfg(feature = "csv")]
pub use csv_impl::CsvFile;

#[cfg(all(feature = "json", feature = "csv"))]
mod tabular_json {
    use super::*;
    use indexmap::IndexSet;
    use serde_json::{Map, Value};

    /// Arrays of flat objects to a header row plus one row per object.
    ///
    /// Columns follow first appearance across all records. Nested values are
    /// written as JSON text.
    pub fn json_to_csv() -> ConverterDescriptor {
        ConverterDescriptor::buffered(
            "json-to-csv",
            FileTypeKind::Json,
            FileTypeKind::Csv,
            JsonFile,
            CsvFile,
            |inputs| {
                let mut records: Vec<&Map<String, Value>> = Vec::new();
                for input in inputs {
                    match expect_json(input)? {
                        Value::Object(obj) => records.push(obj),
                        Value::Array(items) => {
                            for item in items {
                                let obj = item.as_object().ok_or_else(|| {
                                    ConvertError::InvalidInput(format!(
                                        "expected an array of objects, found an element {item}"
                                    ))
                                })?;
                                records.push(obj);
                            }
                        }
                        other => {
                            return Err(ConvertError::InvalidInput(format!(
                                "expected an object or an array of objects, found {other}"
                            )));
                        }
                    }
                }

                let header: IndexSet<&str> = records
                    .iter()
                    .flat_map(|obj| obj.keys().map(String::as_str))
                    .collect();

                let mut rows = Vec::with_capacity(records.len() + 1);
                rows.push(header.iter().map(|key| key.to_string()).collect());
                for obj in records {
                    rows.push(
                        header
                            .iter()
                            .map(|key| obj.get(*key).map(cell_text).unwrap_or_default())
                            .collect(),
                    );
                }
                Ok(Content::Rows(rows))
            },
        )
        .description("Flatten an array of JSON objects into a CSV table")
    }

    /// Header-keyed objects, one per data row.
    pub fn csv_to_json() -> ConverterDescriptor {
        ConverterDescriptor::buffered(
            "csv-to-json",
            FileTypeKind::Csv,
            FileTypeKind::Json,
            CsvFile,
            JsonFile,
            |inputs| {
                let mut objects = Vec::new();
                for input in inputs {
                    let rows = expect_rows(input)?;
                    let Some((header, data)) = rows.split_first() else {
                        continue;
                    };
                    for row in data {
                        let obj: Map<String, Value> = row
                            .iter()
                            .enumerate()
                            .map(|(i, cell)| {
                                (csv_impl::column_name(header, i), Value::String(cell.clone()))
                            })
                            .collect();
                        objects.push(Value::Object(obj));
                    }
                }
                Ok(Content::Json(Value::Array(objects)))
            },
        )
        .description("Turn CSV rows into JSON objects keyed by the header")
    }

    fn cell_text(value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(all(feature = "json", feature = "csv"))]
pub use tabular_json::{csv_to_json, json_to_csv};

// ============================================
// XML
// ============================================

#[cfg(feature = "xml")]
mod xml_impl {
    use super::*;
    use quick_xml::events::Event;

    /// XML documents, held as text and checked for well-formedness on read
    /// and write.
    pub struct XmlFile;

    impl Reader for XmlFile {
        fn read(&self, path: &Path) -> Result<Content, ReadError> {
            let text = std::fs::read_to_string(path).map_err(|e| ReadError::io(path, e))?;
            check_well_formed(&text)
                .map_err(|e| ReadError::decode(path, format!("invalid XML: {e}")))?;
            Ok(Content::Text(text))
        }

        fn check_format(&self, content: &Content) -> bool {
            content.as_text().is_some()
        }
    }

    impl Writer for XmlFile {
        fn check_format(&self, content: &Content) -> bool {
            content
                .as_text()
                .is_some_and(|text| check_well_formed(text).is_ok())
        }

        fn write(&self, path: &Path, content: &Content) -> Result<(), WriteError> {
            let text = content
                .as_text()
                .ok_or(WriteError::UnexpectedContent(content.shape()))?;
            std::fs::write(path, text).map_err(|e| WriteError::io(path, e))
        }
    }

    /// Walk every event; tags must balance and there must be a root element.
    pub(crate) fn check_well_formed(text: &str) -> Result<(), String> {
        let mut reader = quick_xml::Reader::from_str(text);
        let mut depth = 0usize;
        let mut seen_root = false;
        loop {
            match reader.read_event() {
                Ok(Event::Start(_)) => {
                    depth += 1;
                    seen_root = true;
                }
                Ok(Event::End(_)) => depth = depth.saturating_sub(1),
                Ok(Event::Empty(_)) => seen_root = true,
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(format!(
                        "{e} at position {}",
                        reader.error_position()
                    ));
                }
            }
        }
        if depth != 0 {
            return Err(format!("{depth} unclosed element(s)"));
        }
        if !seen_root {
            return Err("no root element".into());
        }
        Ok(())
    }

    /// Element tree to JSON, keyed by the root element's name.
    ///
    /// Attributes become `@name` keys, repeated child elements collect into
    /// an array, and text next to attributes or children is kept under
    /// `#text`. Declarations, processing instructions, comments and
    /// whitespace-only text are dropped.
    #[cfg(feature = "json")]
    pub fn xml_to_json() -> ConverterDescriptor {
        ConverterDescriptor::buffered(
            "xml-to-json",
            FileTypeKind::Xml,
            FileTypeKind::Json,
            XmlFile,
            JsonFile,
            |inputs| {
                let values = inputs
                    .iter()
                    .map(|input| {
                        xml_to_value(expect_text(input)?)
                            .map_err(|e| ConvertError::InvalidInput(format!("Invalid XML: {e}")))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Content::Json(json_impl::merge(values)))
            },
        )
        .description("Map an XML element tree onto JSON")
    }

    /// An element whose end tag hasn't been seen yet.
    #[cfg(feature = "json")]
    struct Element {
        name: String,
        fields: serde_json::Map<String, serde_json::Value>,
        text: String,
    }

    #[cfg(feature = "json")]
    impl Element {
        fn open(start: &quick_xml::events::BytesStart<'_>) -> Result<Self, String> {
            let mut fields = serde_json::Map::new();
            for attr in start.attributes() {
                let attr = attr.map_err(|e| e.to_string())?;
                let key = format!("@{}", String::from_utf8_lossy(attr.key.as_ref()));
                let value = unescape(&String::from_utf8_lossy(&attr.value))?;
                fields.insert(key, serde_json::Value::String(value));
            }
            Ok(Self {
                name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
                fields,
                text: String::new(),
            })
        }

        /// Add a finished child; a repeated name turns into an array.
        fn push_child(&mut self, name: String, value: serde_json::Value) {
            use serde_json::Value;

            match self.fields.get_mut(&name) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    self.fields.insert(name, value);
                }
            }
        }

        fn close(self) -> (String, serde_json::Value) {
            use serde_json::Value;

            let text = self.text.trim();
            if self.fields.is_empty() {
                let value = if text.is_empty() {
                    Value::Null
                } else {
                    Value::String(text.to_string())
                };
                return (self.name, value);
            }
            let mut fields = self.fields;
            if !text.is_empty() {
                fields.insert("#text".into(), Value::String(text.to_string()));
            }
            (self.name, Value::Object(fields))
        }
    }

    #[cfg(feature = "json")]
    fn unescape(raw: &str) -> Result<String, String> {
        quick_xml::escape::unescape(raw)
            .map(|text| text.into_owned())
            .map_err(|e| e.to_string())
    }

    /// Build a JSON value from the events of one XML document.
    #[cfg(feature = "json")]
    pub(crate) fn xml_to_value(text: &str) -> Result<serde_json::Value, String> {
        let mut reader = quick_xml::Reader::from_str(text);
        let mut stack: Vec<Element> = Vec::new();
        let mut root = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| format!("{e} at position {}", reader.error_position()))?;
            match event {
                Event::Start(start) => stack.push(Element::open(&start)?),
                Event::Empty(start) => {
                    let (name, value) = Element::open(&start)?.close();
                    match stack.last_mut() {
                        Some(parent) => parent.push_child(name, value),
                        None => root = Some((name, value)),
                    }
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or("unexpected end tag")?;
                    let (name, value) = element.close();
                    match stack.last_mut() {
                        Some(parent) => parent.push_child(name, value),
                        None => root = Some((name, value)),
                    }
                }
                Event::Text(chunk) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&unescape(&String::from_utf8_lossy(&chunk))?);
                    }
                }
                Event::CData(chunk) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&chunk));
                    }
                }
                Event::GeneralRef(entity) => {
                    if let Some(current) = stack.last_mut() {
                        let entity = format!("&{};", String::from_utf8_lossy(&entity));
                        current.text.push_str(&unescape(&entity)?);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(format!("{} unclosed element(s)", stack.len()));
        }
        let (name, value) = root.ok_or("no root element")?;
        let mut doc = serde_json::Map::new();
        doc.insert(name, value);
        Ok(serde_json::Value::Object(doc))
    }

    /// Rows to `<rows><row><cell column="...">` with the first row as header.
    #[cfg(feature = "csv")]
    pub fn csv_to_xml() -> ConverterDescriptor {
        use quick_xml::escape::escape;
        use std::fmt::Write as _;

        ConverterDescriptor::buffered(
            "csv-to-xml",
            FileTypeKind::Csv,
            FileTypeKind::Xml,
            csv_impl::CsvFile,
            XmlFile,
            |inputs| {
                let mut doc = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rows>\n");
                for input in inputs {
                    let rows = expect_rows(input)?;
                    let Some((header, data)) = rows.split_first() else {
                        continue;
                    };
                    for row in data {
                        doc.push_str("  <row>\n");
                        for (i, cell) in row.iter().enumerate() {
                            let column = csv_impl::column_name(header, i);
                            // Infallible for String.
                            let _ = writeln!(
                                doc,
                                "    <cell column=\"{}\">{}</cell>",
                                escape(column.as_str()),
                                escape(cell.as_str())
                            );
                        }
                        doc.push_str("  </row>\n");
                    }
                }
                doc.push_str("</rows>\n");
                Ok(Content::Text(doc))
            },
        )
        .description("Write CSV rows as an XML document")
    }
}

#[cfg(feature = "xml")]
pub use xml_impl::XmlFile;
#[cfg(all(feature = "xml", feature = "csv"))]
pub use xml_impl::csv_to_xml;
#[cfg(all(feature = "xml", feature = "json"))]
pub use xml_impl::xml_to_json;

// ============================================
// SPREADSHEETS
// ============================================

#[cfg(feature = "spreadsheet")]
mod spreadsheet_impl {
    use super::*;
    use calamine::{Data, Reader as _, open_workbook_auto};

    /// Spreadsheet workbooks; only the first worksheet is read.
    pub struct Spreadsheet;

    impl Reader for Spreadsheet {
        fn read(&self, path: &Path) -> Result<Content, ReadError> {
            let mut workbook = open_workbook_auto(path)
                .map_err(|e| ReadError::decode(path, format!("failed to open spreadsheet: {e}")))?;
            let range = workbook
                .worksheet_range_at(0)
                .ok_or_else(|| ReadError::decode(path, "workbook has no worksheets"))?
                .map_err(|e| ReadError::decode(path, e))?;

            let rows = range
                .rows()
                .map(|row| row.iter().map(cell_text).collect())
                .collect();
            Ok(Content::Rows(rows))
        }

        fn check_format(&self, content: &Content) -> bool {
            content.as_rows().is_some()
        }
    }

    fn cell_text(cell: &Data) -> String {
        match cell {
            Data::Empty => String::new(),
            Data::String(s) => s.clone(),
            Data::Int(n) => n.to_string(),
            Data::Float(f) => f.to_string(),
            Data::Bool(b) => b.to_string(),
            Data::Error(e) => format!("#ERROR:{:?}", e),
            Data::DateTime(dt) => format!("{}", dt),
            Data::DateTimeIso(s) => s.clone(),
            Data::DurationIso(s) => s.clone(),
        }
    }

    #[cfg(feature = "csv")]
    pub fn excel_to_csv() -> ConverterDescriptor {
        ConverterDescriptor::buffered(
            "excel-to-csv",
            FileTypeKind::Excel,
            FileTypeKind::Csv,
            Spreadsheet,
            csv_impl::CsvFile,
            |inputs| {
                let mut rows = Vec::new();
                for (index, input) in inputs.iter().enumerate() {
                    // Later workbooks repeat the header row of the first.
                    let skip = usize::from(index > 0);
                    rows.extend(expect_rows(input)?.iter().skip(skip).cloned());
                }
                Ok(Content::Rows(rows))
            },
        )
        .description("Export the first worksheet as CSV")
    }
}

#[cfg(feature = "spreadsheet")]
pub use spreadsheet_impl::Spreadsheet;
#[cfg(all(feature = "spreadsheet", feature = "csv"))]
pub use spreadsheet_impl::excel_to_csv;

// ============================================
// IMAGES
// ============================================

#[cfg(feature = "image")]
mod image_impl {
    use super::*;
    use image::codecs::gif::{GifEncoder, Repeat};
    use image::imageops::FilterType;
    use image::{Delay, DynamicImage, Frame};

    /// Delay between animation frames.
    pub const FRAME_DELAY_MS: u32 = 100;

    /// Raster images, decoded into memory.
    pub struct ImageFile;

    impl Reader for ImageFile {
        fn read(&self, path: &Path) -> Result<Content, ReadError> {
            let data = std::fs::read(path).map_err(|e| ReadError::io(path, e))?;
            let img = image::load_from_memory(&data)
                .map_err(|e| ReadError::decode(path, format!("failed to decode image: {e}")))?;
            Ok(Content::opaque(img))
        }

        fn check_format(&self, content: &Content) -> bool {
            content.downcast_ref::<DynamicImage>().is_some()
        }
    }

    pub(crate) fn expect_image(content: &Content) -> Result<&DynamicImage, ConvertError> {
        content
            .downcast_ref::<DynamicImage>()
            .ok_or(ConvertError::UnexpectedContent {
                expected: "image",
                found: content.shape(),
            })
    }

    /// Every input becomes one frame of a looping GIF. Frames are scaled to
    /// the size of the first one.
    pub fn images_to_gif() -> ConverterDescriptor {
        ConverterDescriptor::direct(
            "images-to-gif",
            FileTypeKind::Image,
            FileTypeKind::Gif,
            ImageFile,
            |inputs, path| {
                let images = inputs.iter().map(expect_image).collect::<Result<Vec<_>, _>>()?;
                let first = images
                    .first()
                    .ok_or_else(|| ConvertError::InvalidInput("no frames to encode".into()))?;
                let (width, height) = (first.width(), first.height());

                let file = std::io::BufWriter::new(std::fs::File::create(path)?);
                let mut encoder = GifEncoder::new(file);
                encoder
                    .set_repeat(Repeat::Infinite)
                    .map_err(|e| ConvertError::Failed(format!("Failed to encode GIF: {e}")))?;

                let frames = images.into_iter().map(|img| {
                    let rgba = if (img.width(), img.height()) == (width, height) {
                        img.to_rgba8()
                    } else {
                        img.resize_exact(width, height, FilterType::Triangle).to_rgba8()
                    };
                    Frame::from_parts(rgba, 0, 0, Delay::from_numer_denom_ms(FRAME_DELAY_MS, 1))
                });
                encoder
                    .encode_frames(frames)
                    .map_err(|e| ConvertError::Failed(format!("Failed to encode GIF: {e}")))?;
                Ok(())
            },
        )
        .description("Combine images into an animated GIF")
    }
}

#[cfg(feature = "image")]
pub use image_impl::{FRAME_DELAY_MS, ImageFile, images_to_gif};

// ============================================
// PDF
// ============================================

#[cfg(feature = "pdf")]
mod pdf_impl {
    use super::*;
    use image::codecs::jpeg::JpegEncoder;
    use image::{DynamicImage, GrayImage, RgbImage};
    use lopdf::content::{Content as PageContent, Operation};
    use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

    /// JPEG quality of images placed on PDF pages.
    pub const JPEG_QUALITY: u8 = 90;

    /// Page tree levels searched for inherited resources.
    const MAX_PAGE_TREE_DEPTH: usize = 32;

    /// PDF documents. Kept as raw bytes once they have parsed.
    pub struct PdfFile;

    impl Reader for PdfFile {
        fn read(&self, path: &Path) -> Result<Content, ReadError> {
            let data = std::fs::read(path).map_err(|e| ReadError::io(path, e))?;
            Document::load_mem(&data)
                .map_err(|e| ReadError::decode(path, format!("invalid PDF: {e}")))?;
            Ok(Content::Bytes(data))
        }

        fn check_format(&self, content: &Content) -> bool {
            content
                .as_bytes()
                .is_some_and(|data| data.starts_with(b"%PDF-"))
        }
    }

    /// One page per input image, each page the size of its image.
    pub fn images_to_pdf() -> ConverterDescriptor {
        ConverterDescriptor::direct(
            "images-to-pdf",
            FileTypeKind::Image,
            FileTypeKind::Pdf,
            image_impl::ImageFile,
            |inputs, path| {
                let images = inputs
                    .iter()
                    .map(image_impl::expect_image)
                    .collect::<Result<Vec<_>, _>>()?;
                let mut doc = build_document(&images)?;
                doc.save(path)
                    .map_err(|e| ConvertError::Failed(format!("failed to write PDF: {e}")))?;
                Ok(())
            },
        )
        .description("Place each image on its own PDF page")
    }

    /// Embedded images of every page, written into the output folder as
    /// `page<N>-fig<M>.<ext>`.
    pub fn pdf_to_images() -> ConverterDescriptor {
        ConverterDescriptor::direct(
            "pdf-extract-images",
            FileTypeKind::Pdf,
            FileTypeKind::Image,
            PdfFile,
            |inputs, folder| {
                std::fs::create_dir_all(folder)?;
                for (index, input) in inputs.iter().enumerate() {
                    let data = input.as_bytes().ok_or(ConvertError::UnexpectedContent {
                        expected: "bytes",
                        found: input.shape(),
                    })?;
                    let doc = Document::load_mem(data)
                        .map_err(|e| ConvertError::InvalidInput(format!("invalid PDF: {e}")))?;
                    let prefix = if inputs.len() > 1 {
                        format!("doc{}-", index + 1)
                    } else {
                        String::new()
                    };
                    let written = extract_images(&doc, folder, &prefix)?;
                    debug!(images = written, folder = %folder.display(), "extracted PDF images");
                }
                Ok(())
            },
        )
        .writes_folder()
        .description("Extract the images embedded in PDF pages into a folder")
    }

    fn build_document(images: &[&DynamicImage]) -> Result<Document, ConvertError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids = Vec::with_capacity(images.len());

        for img in images {
            let rgb = img.to_rgb8();
            let (width, height) = (i64::from(rgb.width()), i64::from(rgb.height()));

            let mut jpeg = Vec::new();
            JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
                .encode_image(&rgb)
                .map_err(|e| ConvertError::Failed(format!("failed to encode page image: {e}")))?;
            let image_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => width,
                    "Height" => height,
                    "ColorSpace" => "DeviceRGB",
                    "BitsPerComponent" => 8_i64,
                    "Filter" => "DCTDecode",
                },
                jpeg,
            ));

            let content = PageContent {
                operations: vec![
                    Operation::new("q", vec![]),
                    Operation::new(
                        "cm",
                        vec![
                            Object::Integer(width),
                            Object::Integer(0),
                            Object::Integer(0),
                            Object::Integer(height),
                            Object::Integer(0),
                            Object::Integer(0),
                        ],
                    ),
                    Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                    Operation::new("Q", vec![]),
                ],
            };
            let encoded = content
                .encode()
                .map_err(|e| ConvertError::Failed(format!("failed to encode page: {e}")))?;
            let content_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(width),
                    Object::Integer(height),
                ],
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "XObject" => dictionary! { "Im0" => image_id },
                },
            });
            kids.push(Object::Reference(page_id));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        Ok(doc)
    }

    fn extract_images(doc: &Document, folder: &Path, prefix: &str) -> Result<usize, ConvertError> {
        let mut written = 0;
        for (page_number, page_id) in doc.get_pages() {
            for (index, stream) in page_images(doc, page_id).into_iter().enumerate() {
                let stem = folder.join(format!("{prefix}page{page_number}-fig{}", index + 1));
                if save_image(stream, &stem)? {
                    written += 1;
                }
            }
        }
        Ok(written)
    }

    fn resolve_dict<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Dictionary> {
        doc.dereference(object).ok()?.1.as_dict().ok()
    }

    /// Image XObjects of a page, from the nearest `Resources` up the page tree.
    fn page_images(doc: &Document, page_id: ObjectId) -> Vec<&Stream> {
        let mut node = doc.get_dictionary(page_id).ok();
        for _ in 0..MAX_PAGE_TREE_DEPTH {
            let Some(dict) = node else {
                break;
            };
            let xobjects = dict
                .get(b"Resources")
                .ok()
                .and_then(|resources| resolve_dict(doc, resources))
                .and_then(|resources| resources.get(b"XObject").ok())
                .and_then(|xobjects| resolve_dict(doc, xobjects));
            if let Some(xobjects) = xobjects {
                return xobjects
                    .iter()
                    .filter_map(|(_, object)| doc.dereference(object).ok())
                    .filter_map(|(_, object)| object.as_stream().ok())
                    .filter(|stream| {
                        stream
                            .dict
                            .get(b"Subtype")
                            .and_then(Object::as_name)
                            .is_ok_and(|subtype| subtype == b"Image")
                    })
                    .collect();
            }
            node = dict
                .get(b"Parent")
                .ok()
                .and_then(|parent| resolve_dict(doc, parent));
        }
        Vec::new()
    }

    /// Write one image XObject next to `stem`. Returns false for encodings
    /// that can't be exported.
    fn save_image(stream: &Stream, stem: &Path) -> Result<bool, ConvertError> {
        let filter = stream.dict.get(b"Filter").ok().and_then(|filter| match filter {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(filters) => filters.last().and_then(|f| f.as_name().ok()),
            _ => None,
        });

        match filter {
            Some(b"DCTDecode") => {
                std::fs::write(stem.with_extension("jpg"), &stream.content)?;
                return Ok(true);
            }
            Some(b"JPXDecode") => {
                std::fs::write(stem.with_extension("jp2"), &stream.content)?;
                return Ok(true);
            }
            _ => {}
        }

        let samples = match filter {
            None => stream.content.clone(),
            Some(_) => match stream.decompressed_content() {
                Ok(samples) => samples,
                Err(e) => {
                    debug!(error = %e, "skipping image with an unsupported filter");
                    return Ok(false);
                }
            },
        };
        let dimension = |key: &[u8]| {
            stream
                .dict
                .get(key)
                .and_then(Object::as_i64)
                .ok()
                .and_then(|n| u32::try_from(n).ok())
        };
        let (Some(width), Some(height)) = (dimension(b"Width"), dimension(b"Height")) else {
            return Ok(false);
        };
        let color_space = stream.dict.get(b"ColorSpace").and_then(Object::as_name).ok();
        let bits = stream.dict.get(b"BitsPerComponent").and_then(Object::as_i64).ok();

        let image = match (color_space, bits) {
            (Some(b"DeviceRGB"), Some(8)) => {
                RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8)
            }
            (Some(b"DeviceGray"), Some(8)) => {
                GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8)
            }
            _ => None,
        };
        let Some(image) = image else {
            debug!(stem = %stem.display(), "skipping image with an unsupported color space");
            return Ok(false);
        };
        image
            .save(stem.with_extension("png"))
            .map_err(|e| ConvertError::Failed(format!("failed to write extracted image: {e}")))?;
        Ok(true)
    }
}

#[cfg(feature = "pdf")]
pub use pdf_impl::{JPEG_QUALITY, PdfFile, images_to_pdf, pdf_to_images};
