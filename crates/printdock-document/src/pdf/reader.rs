// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: open and inspect existing PDF documents using the `lopdf`
// crate.

use std::path::Path;

use lopdf::{Document, Object, ObjectId};
use printdock_core::error::PrintdockError;
use tracing::{debug, info, instrument};

/// Page trees deeper than this are treated as malformed (or cyclic).
pub(crate) const MAX_TREE_DEPTH: usize = 64;

/// Reads existing PDF files.
///
/// Wraps `lopdf::Document`; failures are reported as transform errors since
/// every caller is about to rewrite or print the document.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PrintdockError> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            PrintdockError::Transform(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");

        Ok(Self {
            document,
            source_path: Some(path_ref.display().to_string()),
        })
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, PrintdockError> {
        let document = Document::load_mem(data).map_err(|err| {
            PrintdockError::Transform(format!("failed to load PDF from memory: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self {
            document,
            source_path: None,
        })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Return the source path if the reader was created via [`PdfReader::open`].
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    /// Whether the page (1-indexed) draws nothing: no /Contents entry, or only
    /// empty content streams.
    pub fn is_blank_page(&self, page_number: u32) -> Result<bool, PrintdockError> {
        let page_id = self.page_id(page_number)?;
        let page = self.document.get_dictionary(page_id).map_err(|err| {
            PrintdockError::Transform(format!("page {} is not a dictionary: {}", page_number, err))
        })?;

        if !page.has(b"Contents") {
            return Ok(true);
        }
        let content = self.document.get_page_content(page_id).map_err(|err| {
            PrintdockError::Transform(format!("page {} content unreadable: {}", page_number, err))
        })?;
        Ok(content.iter().all(u8::is_ascii_whitespace))
    }

    /// The effective MediaBox of a page (1-indexed), following inheritance
    /// through the page tree.
    pub fn media_box(&self, page_number: u32) -> Result<[f32; 4], PrintdockError> {
        let page_id = self.page_id(page_number)?;
        let value = attribute_or_inherited(&self.document, page_id, b"MediaBox").ok_or_else(|| {
            PrintdockError::Transform(format!("page {} has no MediaBox", page_number))
        })?;

        let array = match value {
            Object::Array(items) => items,
            Object::Reference(id) => match self.document.get_object(id) {
                Ok(Object::Array(items)) => items.clone(),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };

        let numbers: Vec<f32> = array.iter().filter_map(number).collect();
        match numbers.as_slice() {
            [a, b, c, d] => Ok([*a, *b, *c, *d]),
            _ => Err(PrintdockError::Transform(format!(
                "page {} has a malformed MediaBox",
                page_number
            ))),
        }
    }

    /// Consume the reader, yielding the parsed document for rewriting.
    pub fn into_document(self) -> Document {
        self.document
    }

    // -- Helpers --------------------------------------------------------------

    fn page_id(&self, page_number: u32) -> Result<ObjectId, PrintdockError> {
        let pages = self.document.get_pages();
        pages.get(&page_number).copied().ok_or_else(|| {
            PrintdockError::Transform(format!(
                "page {} out of range (document has {} pages)",
                page_number,
                pages.len()
            ))
        })
    }
}

/// Look up `key` on the page itself, then on each ancestor /Pages node.
pub(crate) fn attribute_or_inherited(
    doc: &Document,
    page_id: ObjectId,
    key: &[u8],
) -> Option<Object> {
    let mut current = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(current).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        current = node.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(value) => Some(*value as f32),
        Object::Real(value) => Some(*value as f32),
        _ => None,
    }
}
