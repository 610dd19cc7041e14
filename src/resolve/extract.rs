//! Link extraction strategies for wrapped service responses.
//!
//! A download service rarely hands back the PDF on the first call; it
//! answers with JSON or an HTML page pointing at the real file. Each
//! strategy knows one reply dialect. The resolver picks the strategy
//! from the endpoint shape and never looks inside the bytes itself.

use regex::Regex;

/// Pulls the download link out of a service response body.
pub trait LinkExtractor: Send + Sync {
    fn extract(&self, body: &[u8]) -> Option<String>;
}

/// Reads the link from a field in a JSON reply.
///
/// A `success` flag is honored when the reply carries one: a false-like
/// value (false, null, 0, empty string) is a refusal regardless of what
/// else the reply contains. Replies without the flag are taken at face
/// value so the strategy also works against services that answer with
/// the link field alone.
pub struct JsonFieldExtractor {
    field: String,
}

impl JsonFieldExtractor {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }
}

impl LinkExtractor for JsonFieldExtractor {
    fn extract(&self, body: &[u8]) -> Option<String> {
        let data: serde_json::Value = serde_json::from_slice(body).ok()?;

        if let Some(flag) = data.get("success") {
            if !truthy(flag) {
                return None;
            }
        }

        data.get(&self.field)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(String::from)
    }
}

/// Scrapes the link out of an HTML page with a configured pattern.
///
/// The pattern's first capture group is the link. Deliberately dumb:
/// page layouts shift under us, so the pattern is configuration and a
/// non-match is just a miss, not an error.
pub struct HtmlPatternExtractor {
    pattern: Regex,
}

impl HtmlPatternExtractor {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }
}

impl LinkExtractor for HtmlPatternExtractor {
    fn extract(&self, body: &[u8]) -> Option<String> {
        let text = String::from_utf8_lossy(body);
        let caps = self.pattern.captures(&text)?;
        caps.get(1).map(|m| m.as_str().to_string())
    }
}

/// Make an extracted link absolute against the page it came from.
/// Already-absolute links pass through unchanged.
pub fn absolutize(base: &str, link: &str) -> Option<String> {
    let base = url::Url::parse(base).ok()?;
    base.join(link).ok().map(String::from)
}

fn truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Null => false,
        serde_json::Value::Number(n) => n.as_f64().is_none_or(|f| f != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
