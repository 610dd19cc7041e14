//! Scribd URL classification.
//!
//! Runs before any network work to decide whether chat text carries a
//! downloadable document link. Matching is pure: no I/O, deterministic
//! for identical input. A non-match is a normal outcome, not an error.

use regex::Regex;
use tracing::debug;

/// A parsed reference to a Scribd document.
///
/// Immutable once extracted; the resolver consumes it as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReference {
    /// Numeric document id from the URL path.
    pub id: String,
    /// The link as it appeared in the user's message, slug included.
    pub source_url: String,
}

impl DocumentReference {
    /// Canonical document URL, for services that want a full link
    /// rather than a bare id.
    pub fn canonical_url(&self) -> String {
        format!("https://scribd.com/document/{}", self.id)
    }
}

/// A single accepted path shape with a compiled regex.
#[derive(Debug, Clone)]
struct PathPattern {
    /// Path segment this pattern accepts, for logging.
    label: &'static str,
    /// Capture group 1 is the document id; group 0 spans the whole link.
    regex: Regex,
}

/// Classifier for chat text that may contain a Scribd link.
///
/// Patterns are compiled once at construction and evaluated in order;
/// the first match wins. All patterns capture the same id for any text
/// where they overlap, so ordering never changes the extracted id.
pub struct UrlClassifier {
    patterns: Vec<PathPattern>,
}

impl UrlClassifier {
    pub fn new() -> Self {
        let patterns = vec![
            PathPattern {
                label: "document",
                regex: Regex::new(
                    r"(?i)https?://(?:www\.)?scribd\.com/document/(\d+)(?:/[^\s?#]*)?",
                )
                .unwrap(),
            },
            PathPattern {
                label: "doc",
                regex: Regex::new(r"(?i)https?://(?:www\.)?scribd\.com/doc/(\d+)(?:/[^\s?#]*)?")
                    .unwrap(),
            },
            PathPattern {
                label: "presentation",
                regex: Regex::new(
                    r"(?i)https?://(?:www\.)?scribd\.com/presentation/(\d+)(?:/[^\s?#]*)?",
                )
                .unwrap(),
            },
        ];

        Self { patterns }
    }

    /// Extract a document reference from free-form chat text.
    ///
    /// Returns `None` when no accepted path shape matches — the text is
    /// simply not a supported link.
    pub fn classify(&self, text: &str) -> Option<DocumentReference> {
        for pattern in &self.patterns {
            if let Some(caps) = pattern.regex.captures(text) {
                let id = caps[1].to_string();
                let source_url = caps[0].to_string();
                debug!(path = pattern.label, id = %id, "Extracted document reference");
                return Some(DocumentReference { id, source_url });
            }
        }
        None
    }

    /// Whether the text carries something that looks like a link to the
    /// document site, however malformed.
    ///
    /// Separates a broken Scribd link (worth an error reply) from
    /// unrelated chat (worth a usage hint). Requires both the hostname
    /// and a scheme so a casual mention of the site stays casual.
    pub fn mentions_source_site(&self, text: &str) -> bool {
        let lower = text.to_ascii_lowercase();
        lower.contains("scribd.com") && (lower.contains("http://") || lower.contains("https://"))
    }
}

impl Default for UrlClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_id_from_document_url_with_slug() {
        let classifier = UrlClassifier::new();
        let reference = classifier
            .classify("https://www.scribd.com/document/123456789/My-Title")
            .unwrap();
        assert_eq!(reference.id, "123456789");
    }

    #[test]
    fn source_url_keeps_slug() {
        let classifier = UrlClassifier::new();
        let reference = classifier
            .classify("https://www.scribd.com/document/123456789/My-Title")
            .unwrap();
        assert_eq!(
            reference.source_url,
            "https://www.scribd.com/document/123456789/My-Title"
        );
    }

    #[test]
    fn extracts_doc_path() {
        let classifier = UrlClassifier::new();
        let reference = classifier
            .classify("http://scribd.com/doc/456")
            .unwrap();
        assert_eq!(reference.id, "456");
    }

    #[test]
    fn extracts_presentation_path() {
        let classifier = UrlClassifier::new();
        let reference = classifier
            .classify("https://scribd.com/presentation/99887766/slides")
            .unwrap();
        assert_eq!(reference.id, "99887766");
    }

    #[test]
    fn matches_case_insensitively() {
        let classifier = UrlClassifier::new();
        let reference = classifier
            .classify("HTTPS://WWW.SCRIBD.COM/DOCUMENT/42/Loud-Title")
            .unwrap();
        assert_eq!(reference.id, "42");
    }

    #[test]
    fn finds_link_inside_longer_message() {
        let classifier = UrlClassifier::new();
        let reference = classifier
            .classify("can you grab https://scribd.com/document/31337/report for me? thanks")
            .unwrap();
        assert_eq!(reference.id, "31337");
        assert_eq!(reference.source_url, "https://scribd.com/document/31337/report");
    }

    #[test]
    fn id_unaffected_by_query_string() {
        let classifier = UrlClassifier::new();
        let reference = classifier
            .classify("https://scribd.com/document/123?ref=share")
            .unwrap();
        assert_eq!(reference.id, "123");
    }

    #[test]
    fn returns_none_for_plain_text() {
        let classifier = UrlClassifier::new();
        assert!(classifier.classify("not a url").is_none());
    }

    #[test]
    fn returns_none_for_unsupported_site_path() {
        let classifier = UrlClassifier::new();
        assert!(classifier.classify("https://scribd.com/home").is_none());
        assert!(classifier.classify("https://scribd.com/document/abc").is_none());
    }

    #[test]
    fn returns_none_for_other_sites() {
        let classifier = UrlClassifier::new();
        assert!(classifier
            .classify("https://example.com/document/123456")
            .is_none());
    }

    #[test]
    fn mentions_site_needs_host_and_scheme() {
        let classifier = UrlClassifier::new();
        assert!(classifier.mentions_source_site("try https://scribd.com/home maybe"));
        assert!(classifier.mentions_source_site("HTTP://SCRIBD.COM/BROKEN"));
        assert!(!classifier.mentions_source_site("scribd.com is down?"));
        assert!(!classifier.mentions_source_site("https://example.com/doc"));
        assert!(!classifier.mentions_source_site("just chatting"));
    }

    #[test]
    fn canonical_url_uses_document_path() {
        let reference = DocumentReference {
            id: "555".into(),
            source_url: "https://scribd.com/doc/555".into(),
        };
        assert_eq!(reference.canonical_url(), "https://scribd.com/document/555");
    }
}
