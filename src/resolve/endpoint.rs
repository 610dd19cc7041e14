//! Download service endpoint definitions.
//!
//! Endpoints are configuration data: an ordered list, read once at
//! startup, never mutated afterwards. Each entry names a remote service,
//! a URL template, and the response shape the service answers with.

use serde::{Deserialize, Serialize};

/// How a download service hands over the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum EndpointShape {
    /// GET the rendered URL; the body is the document itself.
    DirectBinary,
    /// POST `{"url": <canonical document url>}`; the JSON reply carries
    /// the download link under `url_field`. Follow-up GET fetches it.
    JsonWrapped { url_field: String },
    /// GET the rendered URL as an HTML page; `link_pattern`'s first
    /// capture group is the download link. Follow-up GET fetches it.
    HtmlEmbedded { link_pattern: String },
}

/// One remote download service in the fallback order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    /// Short name for logs.
    pub name: String,
    /// URL template; every `{id}` is replaced with the document id.
    pub url: String,
    #[serde(flatten)]
    pub shape: EndpointShape,
}

impl ServiceEndpoint {
    /// Render the concrete request URL for a document id.
    pub fn render_url(&self, id: &str) -> String {
        self.url.replace("{id}", id)
    }
}

/// Built-in fallback order used when no service list is configured.
///
/// Three JSON-wrapped downloader APIs tried first, then a mirror that
/// serves the PDF bytes directly.
pub fn default_endpoints() -> Vec<ServiceEndpoint> {
    vec![
        ServiceEndpoint {
            name: "scribd-downloader-api".into(),
            url: "https://api.scribd-downloader.co/v1/download".into(),
            shape: EndpointShape::JsonWrapped {
                url_field: "pdf_url".into(),
            },
        },
        ServiceEndpoint {
            name: "heroku-mirror".into(),
            url: "https://scribd-downloader-api.herokuapp.com/download".into(),
            shape: EndpointShape::JsonWrapped {
                url_field: "pdf_url".into(),
            },
        },
        ServiceEndpoint {
            name: "onrender-mirror".into(),
            url: "https://scribd-dl.onrender.com/api/download".into(),
            shape: EndpointShape::JsonWrapped {
                url_field: "pdf_url".into(),
            },
        },
        ServiceEndpoint {
            name: "direct-mirror".into(),
            url: "https://scribd-downloader.co/download/{id}".into(),
            shape: EndpointShape::DirectBinary,
        },
    ]
}
