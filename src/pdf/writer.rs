//! # Serializer
//!
//! One forward pass over the object store:
//!
//! ```text
//! Preparing -> WritingObjects -> WritingXref -> WritingTrailer -> Done
//! ```
//!
//! `Preparing` resolves the links that can only be known once the document
//! is complete (page kids, page contents, outline siblings) into a
//! [`Prepared`] table. It never touches the store, so object numbers are the
//! ones handed out at append time. Each object then renders its body into an
//! [`ObjectWriter`], which owns the per-object encryption key so that every
//! string and stream of the object is encrypted the same way.

use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};

use miniz_oxide::deflate::compress_to_vec_zlib;
use tracing::debug;

use super::structure::{Anchor, PdfInfo};
use super::{object_number, ObjectKind, ObjectStore, PdfObject};
use crate::crypto::{hex, SecurityHandler};
use crate::error::{FolioError, Result};
use crate::font::SubsetFont;

const HEADER: &[u8] = b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n";

/// Named resources of the shared resource dictionary, besides fonts.
#[derive(Debug, Default, Clone)]
pub struct ResourceDict {
    /// Image and form XObjects: name -> store index.
    pub xobjects: BTreeMap<String, usize>,
    /// Graphics states: name -> store index.
    pub ext_gstates: BTreeMap<String, usize>,
}

/// Everything outside the store that object bodies read from.
pub struct WriteInput<'a> {
    pub fonts: &'a [SubsetFont],
    pub resources: &'a ResourceDict,
    pub anchors: &'a HashMap<String, Anchor>,
    pub info: &'a PdfInfo,
    pub compress_level: u8,
    pub security: Option<&'a SecurityHandler>,
}

/// Links resolved during `Preparing`. All values are object numbers.
#[derive(Debug, Default)]
pub struct Prepared {
    pub catalog: usize,
    pub pages: usize,
    pub procset: usize,
    pub outlines: usize,
    pub info: usize,
    pub encryption: Option<usize>,
    /// Page objects in store order.
    pub kids: Vec<usize>,
    /// Page store index -> content object number.
    pub page_contents: HashMap<usize, usize>,
    /// Outline item objects in store order.
    pub outline_items: Vec<usize>,
}

impl Prepared {
    /// Resolve structural links from the store contents.
    pub fn resolve(store: &ObjectStore) -> Result<Self> {
        let singleton = |kind: ObjectKind| -> Result<usize> {
            store
                .indices_of(kind)
                .next()
                .map(object_number)
                .ok_or(FolioError::OutOfRange {
                    index: store.len(),
                    len: store.len(),
                })
        };

        let mut prepared = Prepared {
            catalog: singleton(ObjectKind::Catalog)?,
            pages: singleton(ObjectKind::Pages)?,
            procset: singleton(ObjectKind::ProcSet)?,
            outlines: singleton(ObjectKind::Outlines)?,
            info: singleton(ObjectKind::Info)?,
            encryption: store.indices_of(ObjectKind::Encryption).next().map(object_number),
            ..Default::default()
        };

        prepared.kids = store.indices_of(ObjectKind::Page).map(object_number).collect();
        prepared.outline_items = store
            .indices_of(ObjectKind::OutlineItem)
            .map(object_number)
            .collect();

        for (i, object) in store.iter().enumerate() {
            if let PdfObject::Content(content) = object {
                match store.get(content.page)? {
                    PdfObject::Page(_) => {
                        prepared.page_contents.insert(content.page, object_number(i));
                    }
                    _ => return Err(FolioError::InvalidPageNumber(content.page)),
                }
            }
        }

        Ok(prepared)
    }

    /// Object number of the page with zero-based position `page`.
    pub fn page_object(&self, page: usize) -> Result<usize> {
        self.kids
            .get(page)
            .copied()
            .ok_or(FolioError::InvalidPageNumber(page + 1))
    }

    /// (Prev, Next) siblings of the outline item with object number `number`.
    pub fn outline_siblings(&self, number: usize) -> (Option<usize>, Option<usize>) {
        match self.outline_items.iter().position(|&n| n == number) {
            Some(pos) => (
                pos.checked_sub(1).and_then(|p| self.outline_items.get(p).copied()),
                self.outline_items.get(pos + 1).copied(),
            ),
            None => (None, None),
        }
    }
}

/// What an object's `write` sees.
pub struct WriteContext<'a> {
    pub input: &'a WriteInput<'a>,
    pub prepared: &'a Prepared,
}

impl<'a> WriteContext<'a> {
    pub fn font(&self, id: usize) -> Result<&'a SubsetFont> {
        self.input.fonts.get(id).ok_or(FolioError::OutOfRange {
            index: id,
            len: self.input.fonts.len(),
        })
    }
}

/// Body buffer of one object.
pub struct ObjectWriter<'a> {
    number: usize,
    buf: Vec<u8>,
    security: Option<&'a SecurityHandler>,
    compress_level: u8,
}

impl<'a> ObjectWriter<'a> {
    pub fn new(number: usize, security: Option<&'a SecurityHandler>, compress_level: u8) -> Self {
        Self {
            number,
            buf: Vec::new(),
            security,
            compress_level,
        }
    }

    pub fn number(&self) -> usize {
        self.number
    }

    /// Append dictionary or operator text as is.
    pub fn raw(&mut self, text: &str) {
        self.buf.extend_from_slice(text.as_bytes());
    }

    pub fn raw_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Write a string object. Encrypted strings and anything that is not
    /// printable ASCII are written as hex.
    pub fn string(&mut self, bytes: &[u8]) {
        if let Some(security) = self.security {
            let encrypted = security.encrypt(self.number, bytes);
            let _ = write!(self.buf, "<{}>", hex(&encrypted));
            return;
        }
        if bytes.iter().all(|b| (0x20..0x7F).contains(b)) {
            let text = String::from_utf8_lossy(bytes);
            let _ = write!(self.buf, "({})", super::escape_pdf_string(&text));
        } else {
            let _ = write!(self.buf, "<{}>", hex(bytes));
        }
    }

    /// Write a text string (PDFDocEncoding for ASCII, UTF-16BE otherwise).
    pub fn text(&mut self, s: &str) {
        self.string(&super::text_string_bytes(s));
    }

    /// Write a complete stream object. `dict` holds the entries besides
    /// `/Filter` and `/Length`.
    pub fn stream(&mut self, dict: &str, data: &[u8], compress: bool) {
        let compressed;
        let (payload, filter) = if compress && self.compress_level > 0 {
            compressed = compress_to_vec_zlib(data, self.compress_level);
            (compressed.as_slice(), " /Filter /FlateDecode")
        } else {
            (data, "")
        };
        let encrypted;
        let payload = match self.security {
            Some(security) => {
                encrypted = security.encrypt(self.number, payload);
                encrypted.as_slice()
            }
            None => payload,
        };

        let _ = self.buf.write_all(b"<<");
        if !dict.is_empty() {
            let _ = write!(self.buf, " {}", dict);
        }
        let _ = write!(self.buf, "{} /Length {} >>\nstream\n", filter, payload.len());
        let _ = self.buf.write_all(payload);
        let _ = self.buf.write_all(b"\nendstream");
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl Write for ObjectWriter<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Preparing,
    WritingObjects,
    WritingXref,
    WritingTrailer,
    Done,
}

/// Tracks how many bytes went through the sink.
struct CountingSink<'a, W: Write> {
    inner: &'a mut W,
    written: usize,
}

impl<W: Write> CountingSink<'_, W> {
    fn put(&mut self, data: &[u8]) -> Result<()> {
        self.inner.write_all(data)?;
        self.written += data.len();
        Ok(())
    }
}

pub struct PdfWriter<'a> {
    store: &'a ObjectStore,
    input: WriteInput<'a>,
    state: WriterState,
}

impl<'a> PdfWriter<'a> {
    pub fn new(store: &'a ObjectStore, input: WriteInput<'a>) -> Self {
        Self {
            store,
            input,
            state: WriterState::Preparing,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    fn transition(&mut self, next: WriterState) {
        debug!(from = ?self.state, to = ?next, "serializer state");
        self.state = next;
    }

    /// Serialize the whole document into `sink`, returning the byte count.
    /// Any I/O error aborts the pass; the partial output is not usable.
    pub fn write<W: Write>(mut self, sink: &mut W) -> Result<usize> {
        let prepared = Prepared::resolve(self.store)?;
        let mut out = CountingSink {
            inner: sink,
            written: 0,
        };

        self.transition(WriterState::WritingObjects);
        out.put(HEADER)?;
        let ctx = WriteContext {
            input: &self.input,
            prepared: &prepared,
        };
        let mut offsets = Vec::with_capacity(self.store.len());
        for (i, object) in self.store.iter().enumerate() {
            let number = object_number(i);
            let mut w = ObjectWriter::new(number, self.input.security, self.input.compress_level);
            object.write(&mut w, &ctx)?;

            offsets.push(out.written);
            out.put(format!("{} 0 obj\n", number).as_bytes())?;
            out.put(&w.into_bytes())?;
            out.put(b"\nendobj\n")?;
        }

        self.transition(WriterState::WritingXref);
        let xref_offset = out.written;
        let mut xref = String::with_capacity(20 * (offsets.len() + 1) + 16);
        xref.push_str(&format!("xref\n0 {}\n", offsets.len() + 1));
        xref.push_str("0000000000 65535 f \n");
        for offset in &offsets {
            xref.push_str(&format!("{:010} 00000 n \n", offset));
        }
        out.put(xref.as_bytes())?;

        self.transition(WriterState::WritingTrailer);
        let mut trailer = format!(
            "trailer\n<< /Size {} /Root {} 0 R /Info {} 0 R",
            offsets.len() + 1,
            prepared.catalog,
            prepared.info
        );
        if let (Some(encryption), Some(security)) = (prepared.encryption, self.input.security) {
            let id = hex(&security.file_id);
            trailer.push_str(&format!(
                " /Encrypt {} 0 R /ID [<{}> <{}>]",
                encryption, id, id
            ));
        }
        trailer.push_str(&format!(" >>\nstartxref\n{}\n%%EOF\n", xref_offset));
        out.put(trailer.as_bytes())?;

        self.transition(WriterState::Done);
        debug!(objects = offsets.len(), bytes = out.written, "document written");
        Ok(out.written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SecurityHandler;
    use crate::config::Protection;

    #[test]
    fn test_object_writer_literal_and_hex_strings() {
        let mut w = ObjectWriter::new(1, None, 0);
        w.string(b"Hi (there)");
        w.string(&[0xFE, 0xFF, 0x00, 0xE9]);
        assert_eq!(w.into_bytes(), b"(Hi \\(there\\))<FEFF00E9>".to_vec());
    }

    #[test]
    fn test_object_writer_encrypts_strings_as_hex() {
        let handler = SecurityHandler::new(&Protection::default(), [0u8; 16]);
        let mut w = ObjectWriter::new(7, Some(&handler), 0);
        w.string(b"abc");
        let body = String::from_utf8(w.into_bytes()).unwrap();
        let expected = format!("<{}>", hex(&handler.encrypt(7, b"abc")));
        assert_eq!(body, expected);
    }

    #[test]
    fn test_stream_uncompressed_at_level_zero() {
        let mut w = ObjectWriter::new(1, None, 0);
        w.stream("", b"0 0 m", true);
        let body = String::from_utf8(w.into_bytes()).unwrap();
        assert_eq!(body, "<< /Length 5 >>\nstream\n0 0 m\nendstream");
    }

    #[test]
    fn test_stream_compressed_declares_filter() {
        let mut w = ObjectWriter::new(1, None, 6);
        w.stream("/Length1 5", b"hello", true);
        let body = w.into_bytes();
        let head = String::from_utf8_lossy(&body);
        assert!(head.starts_with("<< /Length1 5 /Filter /FlateDecode /Length "));
    }
}
