//! HTTP transport capability for the resolver.
//!
//! The resolver never talks to a concrete client. It opens one session
//! per resolution through `HttpTransport` and releases it when the call
//! returns, whatever the outcome. Tests substitute scripted sessions;
//! the bot wires `ReqwestTransport`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};

use crate::error::TransportFault;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const BROWSER_ACCEPT: &str = "application/json, text/html, */*";
const BROWSER_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

/// A response as the resolver sees it: status code plus raw body bytes.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Opens one HTTP session per resolution call.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn open(&self) -> Result<Box<dyn HttpSession>, TransportFault>;
}

/// A scoped HTTP session. Every call carries its own time budget;
/// blowing it fails that call only.
#[async_trait]
pub trait HttpSession: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, TransportFault>;

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportFault>;
}

/// Production transport backed by reqwest.
///
/// Each session gets a fresh client carrying browser-style headers; the
/// download services answer differently to clients that look like bots.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestTransport;

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn open(&self) -> Result<Box<dyn HttpSession>, TransportFault> {
        let client = reqwest::Client::builder()
            .default_headers(browser_headers())
            .build()
            .map_err(|e| TransportFault::Network(e.to_string()))?;

        Ok(Box::new(ReqwestSession { client }))
    }
}

struct ReqwestSession {
    client: reqwest::Client,
}

#[async_trait]
impl HttpSession for ReqwestSession {
    async fn get(&self, url: &str, timeout: Duration) -> Result<HttpResponse, TransportFault> {
        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| fault_from(e, timeout))?;

        read_response(resp, timeout).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportFault> {
        let resp = self
            .client
            .post(url)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| fault_from(e, timeout))?;

        read_response(resp, timeout).await
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static(BROWSER_ACCEPT_LANGUAGE),
    );
    headers.insert("DNT", HeaderValue::from_static("1"));
    headers
}

fn fault_from(err: reqwest::Error, timeout: Duration) -> TransportFault {
    if err.is_timeout() {
        TransportFault::TimedOut(timeout)
    } else {
        TransportFault::Network(err.to_string())
    }
}

/// Read the full body under the same time budget as the request itself.
async fn read_response(
    resp: reqwest::Response,
    timeout: Duration,
) -> Result<HttpResponse, TransportFault> {
    let status = resp.status().as_u16();
    let body = resp
        .bytes()
        .await
        .map_err(|e| fault_from(e, timeout))?
        .to_vec();

    Ok(HttpResponse { status, body })
}

// ── Tests ───────────────────────────────────────────────────────────
