// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory PDF builders for unit tests.

use lopdf::{Document, Object, Stream, dictionary};

/// A flat `pages`-page document; every page has a content stream and the
/// page size lives on the root /Pages node.
pub(crate) fn build_pdf(pages: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(pages);
    for number in 1..=pages {
        let content = Stream::new(
            dictionary! {},
            format!("BT /F1 12 Tf 72 720 Td (page {number}) Tj ET").into_bytes(),
        );
        let content_id = doc.add_object(content);
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    finish(doc, pages_id)
}

/// A document whose pages sit under two intermediate /Pages nodes, each
/// carrying its own MediaBox, so flattening must carry the size down.
pub(crate) fn build_nested_pdf(left: usize, right: usize) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let root_id = doc.new_object_id();

    let mut branches: Vec<Object> = Vec::new();
    for (count, width) in [(left, 612_i64), (right, 842_i64)] {
        let branch_id = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::new();
        for number in 1..=count {
            let content = Stream::new(
                dictionary! {},
                format!("BT /F1 12 Tf 72 720 Td (w{width} p{number}) Tj ET").into_bytes(),
            );
            let content_id = doc.add_object(content);
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => branch_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }
        doc.objects.insert(
            branch_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Parent" => root_id,
                "Kids" => kids,
                "Count" => count as i64,
                "MediaBox" => vec![0.into(), 0.into(), width.into(), 1000.into()],
            }),
        );
        branches.push(branch_id.into());
    }

    doc.objects.insert(
        root_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => branches,
            "Count" => (left + right) as i64,
        }),
    );
    finish(doc, root_id)
}

/// A structurally valid document with an empty page tree.
pub(crate) fn build_empty_pdf() -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.add_object(dictionary! {
        "Type" => "Pages",
        "Kids" => Vec::<Object>::new(),
        "Count" => 0,
    });
    finish(doc, pages_id)
}

fn finish(mut doc: Document, pages_id: lopdf::ObjectId) -> Vec<u8> {
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("serialise fixture");
    out
}
