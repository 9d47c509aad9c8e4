// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Simplex emulation for duplex-only printers.
//
// Most shared printers duplex by default and ignore driver-level "one-sided"
// flags.  Inserting a blank page after every content page (except the last)
// puts each original page on the front of its own sheet:
//
//   N pages in  ->  2N - 1 pages out
//   1 2 3       ->  1 _ 2 _ 3
//
// The page tree is rebuilt flat under the root /Pages node.  Inheritable
// attributes are copied onto each page first so nothing is lost when the
// intermediate nodes disappear.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};
use printdock_core::error::PrintdockError;
use tracing::{debug, info, instrument};

use super::reader::{PdfReader, attribute_or_inherited};

/// Attributes a page may inherit from its ancestors (ISO 32000-1 §7.7.3.4).
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Attributes copied onto a blank page so its sheet matches the page before it.
const SHEET_ATTRIBUTES: [&[u8]; 3] = [b"MediaBox", b"CropBox", b"Rotate"];

/// Used only when a page has no MediaBox anywhere in its ancestry (A4, points).
const FALLBACK_MEDIA_BOX: [i64; 4] = [0, 0, 595, 842];

/// Page counts before and after a transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimplexOutput {
    pub input_pages: usize,
    pub output_pages: usize,
}

/// Rewrites documents so every original page lands on the front of a sheet.
pub struct SimplexTransformer;

impl SimplexTransformer {
    /// Transform the PDF at `input` and write the result to `output`.
    ///
    /// `input` is never modified.  Any failure, including a document with no
    /// pages, is a [`PrintdockError::Transform`].
    #[instrument(skip_all, fields(input = %input.as_ref().display(), output = %output.as_ref().display()))]
    pub fn transform_file(
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<SimplexOutput, PrintdockError> {
        let mut document = PdfReader::open(input.as_ref())?.into_document();
        let result = Self::interleave(&mut document)?;

        let output = output.as_ref();
        if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|err| {
                PrintdockError::Transform(format!("cannot create {}: {}", dir.display(), err))
            })?;
        }
        let file = File::create(output).map_err(|err| {
            PrintdockError::Transform(format!("cannot create {}: {}", output.display(), err))
        })?;
        let mut writer = BufWriter::new(file);
        document.save_to(&mut writer).map_err(|err| {
            PrintdockError::Transform(format!("failed to write {}: {}", output.display(), err))
        })?;

        info!(
            input_pages = result.input_pages,
            output_pages = result.output_pages,
            "simplex transform written"
        );
        Ok(result)
    }

    /// Transform an in-memory PDF, returning the serialised result.
    pub fn transform_bytes(data: &[u8]) -> Result<Vec<u8>, PrintdockError> {
        let mut document = PdfReader::from_bytes(data)?.into_document();
        Self::interleave(&mut document)?;

        let mut output = Vec::new();
        document.save_to(&mut output).map_err(|err| {
            PrintdockError::Transform(format!("failed to serialise simplex PDF: {}", err))
        })?;
        Ok(output)
    }

    /// Interleave blank pages into `document` in place.
    pub fn interleave(document: &mut Document) -> Result<SimplexOutput, PrintdockError> {
        let pages: Vec<ObjectId> = document.get_pages().into_values().collect();
        let input_pages = pages.len();

        if input_pages == 0 {
            return Err(PrintdockError::Transform("document has no pages".into()));
        }
        if input_pages == 1 {
            debug!("single page document, nothing to interleave");
            return Ok(SimplexOutput {
                input_pages,
                output_pages: 1,
            });
        }

        let root_id = pages_root(document)?;

        for &page_id in &pages {
            materialise_inherited(document, page_id)?;
        }

        let mut kids = Vec::with_capacity(2 * input_pages - 1);
        for (index, &page_id) in pages.iter().enumerate() {
            page_dict_mut(document, page_id)?.set("Parent", Object::Reference(root_id));
            kids.push(Object::Reference(page_id));

            if index + 1 < input_pages {
                let blank = blank_page_after(document, page_id, root_id)?;
                let blank_id = document.add_object(blank);
                kids.push(Object::Reference(blank_id));
            }
        }

        let output_pages = kids.len();
        let root = page_dict_mut(document, root_id)?;
        root.set("Kids", Object::Array(kids));
        root.set("Count", Object::Integer(output_pages as i64));

        // Intermediate /Pages nodes of a nested tree are now unreachable.
        let pruned = document.prune_objects();
        debug!(input_pages, output_pages, pruned = pruned.len(), "page tree rebuilt");

        Ok(SimplexOutput {
            input_pages,
            output_pages,
        })
    }
}

// -- Helpers ------------------------------------------------------------------

/// Object ID of the catalog's root /Pages node.
fn pages_root(document: &Document) -> Result<ObjectId, PrintdockError> {
    document
        .catalog()
        .map_err(|err| PrintdockError::Transform(format!("no catalog: {}", err)))?
        .get(b"Pages")
        .and_then(Object::as_reference)
        .map_err(|err| PrintdockError::Transform(format!("no /Pages reference: {}", err)))
}

fn page_dict_mut(
    document: &mut Document,
    id: ObjectId,
) -> Result<&mut Dictionary, PrintdockError> {
    document.get_dictionary_mut(id).map_err(|err| {
        PrintdockError::Transform(format!("object {:?} is not a dictionary: {}", id, err))
    })
}

/// Copy every inheritable attribute the page does not set itself.
fn materialise_inherited(document: &mut Document, page_id: ObjectId) -> Result<(), PrintdockError> {
    let mut inherited = Vec::new();
    {
        let page = document.get_dictionary(page_id).map_err(|err| {
            PrintdockError::Transform(format!("page {:?} is not a dictionary: {}", page_id, err))
        })?;
        for key in INHERITABLE {
            if !page.has(key) {
                if let Some(value) = attribute_or_inherited(document, page_id, key) {
                    inherited.push((key, value));
                }
            }
        }
    }

    let page = page_dict_mut(document, page_id)?;
    for (key, value) in inherited {
        page.set(key.to_vec(), value);
    }
    Ok(())
}

/// A content-less page sized like `previous`.
fn blank_page_after(
    document: &Document,
    previous: ObjectId,
    parent: ObjectId,
) -> Result<Dictionary, PrintdockError> {
    let source = document.get_dictionary(previous).map_err(|err| {
        PrintdockError::Transform(format!("page {:?} is not a dictionary: {}", previous, err))
    })?;

    let mut blank = Dictionary::new();
    blank.set("Type", Object::Name(b"Page".to_vec()));
    blank.set("Parent", Object::Reference(parent));
    blank.set("Resources", Object::Dictionary(Dictionary::new()));
    for key in SHEET_ATTRIBUTES {
        if let Ok(value) = source.get(key) {
            blank.set(key.to_vec(), value.clone());
        }
    }
    if !blank.has(b"MediaBox") {
        let media_box = FALLBACK_MEDIA_BOX.iter().map(|&v| Object::Integer(v)).collect();
        blank.set("MediaBox", Object::Array(media_box));
    }
    Ok(blank)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::fixtures::{build_empty_pdf, build_nested_pdf, build_pdf};

    fn transformed(data: &[u8]) -> PdfReader {
        let bytes = SimplexTransformer::transform_bytes(data).expect("transform");
        PdfReader::from_bytes(&bytes).expect("reload")
    }

    #[test]
    fn interleaves_blank_pages_between_content() {
        for n in 2..=5u32 {
            let reader = transformed(&build_pdf(n as usize));
            assert_eq!(reader.page_count(), (2 * n - 1) as usize, "n = {n}");

            for position in 1..=(2 * n - 1) {
                let blank = reader.is_blank_page(position).expect("inspect page");
                assert_eq!(blank, position % 2 == 0, "n = {n}, position = {position}");
            }
        }
    }

    #[test]
    fn no_blank_after_last_page() {
        let reader = transformed(&build_pdf(3));
        assert!(!reader.is_blank_page(5).expect("last page"));
    }

    #[test]
    fn single_page_is_unchanged() {
        let reader = transformed(&build_pdf(1));
        assert_eq!(reader.page_count(), 1);
        assert!(!reader.is_blank_page(1).expect("page 1"));
    }

    #[test]
    fn empty_document_is_a_transform_error() {
        let err = SimplexTransformer::transform_bytes(&build_empty_pdf()).unwrap_err();
        assert!(matches!(err, PrintdockError::Transform(_)));
    }

    #[test]
    fn malformed_input_is_a_transform_error() {
        let err = SimplexTransformer::transform_bytes(b"%PDF-1.5 truncated").unwrap_err();
        assert!(matches!(err, PrintdockError::Transform(_)));
    }

    #[test]
    fn nested_tree_keeps_page_sizes() {
        // Two 612-wide pages then one 842-wide page.
        let reader = transformed(&build_nested_pdf(2, 1));
        assert_eq!(reader.page_count(), 5);

        let widths: Vec<f32> = (1..=5)
            .map(|p| reader.media_box(p).expect("media box")[2])
            .collect();
        // Blank pages copy the size of the page they follow.
        assert_eq!(widths, vec![612.0, 612.0, 612.0, 612.0, 842.0]);

        for position in [2, 4] {
            assert!(reader.is_blank_page(position).expect("blank"));
        }
    }

    #[test]
    fn file_transform_leaves_input_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("in.pdf");
        let output = dir.path().join("out").join("simplex.pdf");
        let original = build_pdf(3);
        std::fs::write(&input, &original).expect("write input");

        let result = SimplexTransformer::transform_file(&input, &output).expect("transform");
        assert_eq!(
            result,
            SimplexOutput {
                input_pages: 3,
                output_pages: 5
            }
        );

        assert_eq!(std::fs::read(&input).expect("reread input"), original);
        let reader = PdfReader::open(&output).expect("open output");
        assert_eq!(reader.page_count(), 5);
    }

    #[test]
    fn missing_input_is_a_transform_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = SimplexTransformer::transform_file(
            dir.path().join("absent.pdf"),
            dir.path().join("out.pdf"),
        )
        .unwrap_err();
        assert!(matches!(err, PrintdockError::Transform(_)));
        assert!(!dir.path().join("out.pdf").exists());
    }
}
