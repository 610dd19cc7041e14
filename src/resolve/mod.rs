//! Multi-service document resolution.
//!
//! A resolution walks the configured endpoint list in order and returns
//! the first payload that passes the signature gate. Attempts run
//! strictly sequentially so an early hit short-circuits the slower
//! mirrors, and the endpoint list itself is the retry policy: there are
//! no retries within a single attempt.

pub mod endpoint;
pub mod extract;
pub mod transport;

pub use endpoint::{EndpointShape, ServiceEndpoint, default_endpoints};
pub use transport::{HttpResponse, HttpSession, HttpTransport, ReqwestTransport};

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::classify::DocumentReference;
use crate::error::{ConfigError, ResolveError, TransportFault};
use crate::resolve::extract::{
    HtmlPatternExtractor, JsonFieldExtractor, LinkExtractor, absolutize,
};

/// Leading bytes every delivered payload must carry.
const PDF_SIGNATURE: &[u8] = b"%PDF";

/// A payload that passed validation, tagged with the endpoint that
/// produced it. Built exactly once per resolution, never mutated.
#[derive(Debug, Clone)]
pub struct ResolvedDocument {
    pub data: Vec<u8>,
    /// Name of the endpoint the payload came from.
    pub source: String,
}

impl ResolvedDocument {
    pub fn byte_length(&self) -> usize {
        self.data.len()
    }
}

/// Why one endpoint attempt failed. Stays inside the resolver; only the
/// aggregate verdict leaves as a `ResolveError`.
#[derive(Debug)]
enum AttemptError {
    /// The time budget ran out before the service ever answered.
    Timeout,
    /// Connection-level fault before the service ever answered.
    Unreachable(String),
    /// Non-success HTTP status.
    BadStatus(u16),
    /// The reply carried no usable download link.
    MissingLink,
    /// A follow-up call failed after the service had answered.
    FollowUpFailed(String),
    /// The body did not start with the document signature.
    NotDocument,
}

impl AttemptError {
    /// Whether the service produced any HTTP response during the attempt.
    fn answered(&self) -> bool {
        matches!(
            self,
            Self::BadStatus(_) | Self::MissingLink | Self::FollowUpFailed(_) | Self::NotDocument
        )
    }
}

/// How to execute one endpoint's attempt, with its extraction strategy
/// compiled up front. New reply dialects plug in here; the resolution
/// loop itself never changes.
enum FetchPlan {
    /// GET the rendered URL; the body is the document.
    Direct,
    /// POST the canonical document URL as JSON, extract the download
    /// link from the reply, then GET it.
    PostThenFollow { extractor: Box<dyn LinkExtractor> },
    /// GET the rendered URL as a page, extract the link, then GET it.
    GetThenFollow { extractor: Box<dyn LinkExtractor> },
}

struct EndpointPlan {
    name: String,
    url_template: String,
    fetch: FetchPlan,
}

impl EndpointPlan {
    fn compile(endpoint: &ServiceEndpoint) -> Result<Self, ConfigError> {
        if endpoint.name.is_empty() || endpoint.url.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "services".into(),
                message: "endpoint name and url must be non-empty".into(),
            });
        }

        let fetch = match &endpoint.shape {
            EndpointShape::DirectBinary => {
                require_id_placeholder(endpoint)?;
                FetchPlan::Direct
            }
            EndpointShape::JsonWrapped { url_field } => FetchPlan::PostThenFollow {
                extractor: Box::new(JsonFieldExtractor::new(url_field.clone())),
            },
            EndpointShape::HtmlEmbedded { link_pattern } => {
                require_id_placeholder(endpoint)?;
                let extractor = HtmlPatternExtractor::new(link_pattern).map_err(|e| {
                    ConfigError::InvalidValue {
                        key: format!("services.{}.link_pattern", endpoint.name),
                        message: e.to_string(),
                    }
                })?;
                FetchPlan::GetThenFollow {
                    extractor: Box::new(extractor),
                }
            }
        };

        Ok(Self {
            name: endpoint.name.clone(),
            url_template: endpoint.url.clone(),
            fetch,
        })
    }

    fn render_url(&self, id: &str) -> String {
        self.url_template.replace("{id}", id)
    }
}

fn require_id_placeholder(endpoint: &ServiceEndpoint) -> Result<(), ConfigError> {
    if endpoint.url.contains("{id}") {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: format!("services.{}.url", endpoint.name),
            message: "url template must contain {id}".into(),
        })
    }
}

/// Walks the endpoint list for one document and returns the first
/// validated payload.
///
/// Holds no mutable state: a single instance serves concurrent
/// resolutions, each opening and releasing its own transport session.
pub struct Resolver {
    plans: Vec<EndpointPlan>,
    transport: Arc<dyn HttpTransport>,
    per_call_timeout: Duration,
}

impl Resolver {
    /// Compile the endpoint list into executable plans.
    ///
    /// Bad service definitions (uncompilable link pattern, missing id
    /// placeholder) surface here at startup, not mid-request.
    pub fn new(
        endpoints: &[ServiceEndpoint],
        transport: Arc<dyn HttpTransport>,
        per_call_timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let plans = endpoints
            .iter()
            .map(EndpointPlan::compile)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            plans,
            transport,
            per_call_timeout,
        })
    }

    /// Resolve a document reference to validated PDF bytes.
    ///
    /// Per-endpoint faults are absorbed until the list is exhausted;
    /// the returned error classifies the whole run, not any single
    /// attempt. Size policy is the caller's concern.
    pub async fn resolve(
        &self,
        reference: &DocumentReference,
    ) -> Result<ResolvedDocument, ResolveError> {
        if self.plans.is_empty() {
            warn!(id = %reference.id, "No download services configured");
            return Err(ResolveError::NotRetrievable {
                id: reference.id.clone(),
            });
        }

        let session = self.transport.open().await.map_err(|fault| match fault {
            TransportFault::TimedOut(_) => ResolveError::Timeout {
                per_call: self.per_call_timeout,
            },
            TransportFault::Network(reason) => ResolveError::TransportError(reason),
        })?;

        let mut answered = false;
        let mut network_fault = None;

        for plan in &self.plans {
            match self.attempt(session.as_ref(), plan, reference).await {
                Ok(data) => {
                    info!(
                        endpoint = %plan.name,
                        id = %reference.id,
                        bytes = data.len(),
                        "Document resolved"
                    );
                    return Ok(ResolvedDocument {
                        data,
                        source: plan.name.clone(),
                    });
                }
                Err(err) => {
                    warn!(
                        endpoint = %plan.name,
                        id = %reference.id,
                        error = ?err,
                        "Endpoint attempt failed"
                    );
                    if err.answered() {
                        answered = true;
                    }
                    if let AttemptError::Unreachable(reason) = err {
                        network_fault = Some(reason);
                    }
                }
            }
        }

        warn!(
            id = %reference.id,
            attempts = self.plans.len(),
            "All download services exhausted"
        );

        if answered {
            Err(ResolveError::NotRetrievable {
                id: reference.id.clone(),
            })
        } else if let Some(reason) = network_fault {
            Err(ResolveError::TransportError(reason))
        } else {
            Err(ResolveError::Timeout {
                per_call: self.per_call_timeout,
            })
        }
    }

    async fn attempt(
        &self,
        session: &dyn HttpSession,
        plan: &EndpointPlan,
        reference: &DocumentReference,
    ) -> Result<Vec<u8>, AttemptError> {
        let url = plan.render_url(&reference.id);
        debug!(endpoint = %plan.name, id = %reference.id, "Trying download service");

        match &plan.fetch {
            FetchPlan::Direct => {
                let resp = session
                    .get(&url, self.per_call_timeout)
                    .await
                    .map_err(unanswered)?;
                validate_payload(resp)
            }
            FetchPlan::PostThenFollow { extractor } => {
                let body = serde_json::json!({ "url": reference.canonical_url() });
                let resp = session
                    .post_json(&url, &body, self.per_call_timeout)
                    .await
                    .map_err(unanswered)?;
                self.follow_extracted(session, &url, resp, extractor.as_ref())
                    .await
            }
            FetchPlan::GetThenFollow { extractor } => {
                let resp = session
                    .get(&url, self.per_call_timeout)
                    .await
                    .map_err(unanswered)?;
                self.follow_extracted(session, &url, resp, extractor.as_ref())
                    .await
            }
        }
    }

    /// Extract the link from a first-stage reply and fetch it. By this
    /// point the service has answered once, so every further fault
    /// lands in the "answered" bucket.
    async fn follow_extracted(
        &self,
        session: &dyn HttpSession,
        page_url: &str,
        resp: HttpResponse,
        extractor: &dyn LinkExtractor,
    ) -> Result<Vec<u8>, AttemptError> {
        if !resp.is_success() {
            return Err(AttemptError::BadStatus(resp.status));
        }

        let link = extractor
            .extract(&resp.body)
            .and_then(|link| absolutize(page_url, &link))
            .ok_or(AttemptError::MissingLink)?;

        debug!(link = %link, "Following extracted download link");

        let resp = session
            .get(&link, self.per_call_timeout)
            .await
            .map_err(|fault| AttemptError::FollowUpFailed(fault.to_string()))?;

        validate_payload(resp)
    }
}

/// Signature gate: only `%PDF`-leading success bodies count as
/// documents. Everything else is discarded.
fn validate_payload(resp: HttpResponse) -> Result<Vec<u8>, AttemptError> {
    if !resp.is_success() {
        return Err(AttemptError::BadStatus(resp.status));
    }
    if !resp.body.starts_with(PDF_SIGNATURE) {
        return Err(AttemptError::NotDocument);
    }
    Ok(resp.body)
}

fn unanswered(fault: TransportFault) -> AttemptError {
    match fault {
        TransportFault::TimedOut(_) => AttemptError::Timeout,
        TransportFault::Network(reason) => AttemptError::Unreachable(reason),
    }
}

// ── Tests ───────────────────────────────────────────────────────────
