//! Naming for delivered files.
//!
//! The source URL usually carries a human-readable slug after the
//! document id; that makes a far better filename than a bare number.
//! Naming is boundary work: the resolver hands back bytes, the pipeline
//! decides what to call them.

use crate::classify::DocumentReference;

/// Telegram truncates longer filenames in the chat UI.
const MAX_FILENAME_CHARS: usize = 60;

const PDF_SUFFIX: &str = ".pdf";

/// Filename for a resolved document.
///
/// Derived from the URL slug when one exists, sanitized down to word
/// characters and underscores; otherwise `scribd_document_{id}.pdf`.
pub fn artifact_name(reference: &DocumentReference) -> String {
    let stem = slug_of(reference)
        .map(sanitize)
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("scribd_document_{}", reference.id));

    let budget = MAX_FILENAME_CHARS - PDF_SUFFIX.len();
    let stem: String = stem.chars().take(budget).collect();
    let stem = stem.trim_end_matches('_');

    format!("{stem}{PDF_SUFFIX}")
}

/// The path segment after the document id, if the link carried one.
fn slug_of(reference: &DocumentReference) -> Option<&str> {
    let (_, tail) = reference.source_url.split_once(&format!("/{}/", reference.id))?;
    let slug = tail
        .split(['?', '#'])
        .next()
        .unwrap_or("")
        .trim_end_matches('/');
    if slug.is_empty() { None } else { Some(slug) }
}

/// Keep word characters, fold runs of spaces and dashes into a single
/// underscore, drop everything else.
fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_separator = false;

    for c in raw.chars() {
        if c.is_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            out.push(c);
        } else if matches!(c, ' ' | '-' | '_') {
            pending_separator = true;
        }
        // Other punctuation is dropped without becoming a separator,
        // matching "My-Title!" -> "My_Title".
    }

    out
}
