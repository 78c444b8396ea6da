//! Citation markers in answer text.
//!
//! Answers cite reference documents with footnote markers of the form
//! `[^N]`, where `N` is the 1-based position of the document in the most
//! recent `docs` list.

use std::collections::BTreeSet;

use scriba_protocol::Document;

/// Whether `text` contains the marker for document `position`.
pub fn cites(text: &str, position: usize) -> bool {
    text.contains(&format!("[^{position}]"))
}

/// Every position cited by a well-formed `[^N]` marker in `text`.
pub fn cited_positions(text: &str) -> BTreeSet<usize> {
    let mut positions = BTreeSet::new();
    let mut rest = text;

    while let Some(start) = rest.find("[^") {
        rest = &rest[start + 2..];
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits > 0 && rest[digits..].starts_with(']') {
            if let Ok(n) = rest[..digits].parse() {
                positions.insert(n);
            }
        }
    }

    positions
}

/// Recompute `is_referenced` on every document against the final answer.
pub fn mark_referenced(documents: &mut [Document], answer: &str) {
    for (index, doc) in documents.iter_mut().enumerate() {
        doc.is_referenced = cites(answer, index + 1);
    }
}
