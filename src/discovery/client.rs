//! Registry HTTP client with conditional refresh.
//!
//! # Responsibilities
//! - Fetch the relations of a service name or of a local IP
//! - Echo the previous check code so the registry can answer 304
//! - Report local-origin health verdicts back to the registry
//!
//! # Design Decisions
//! - One attempt per call with a short timeout; the caller owns retry cadence
//! - 304 produces a successor set that keeps the rotation cursor
//! - Failures are returned, never cached: callers keep the last good set

use reqwest::StatusCode;
use std::time::Duration;
use url::Url;

use crate::discovery::types::{DiscoveryError, DiscoveryResult, RelationsBody};
use crate::load_balancer::RelationSet;

const PATH_BY_NAME: &str = "relation/getsFromName";
const PATH_BY_IP: &str = "relation/getsFromIp";
const PATH_REPORT_OFF: &str = "relation/reportOff";

/// Client for the upstream registry.
#[derive(Debug, Clone)]
pub struct DiscoveryClient {
    http: reqwest::Client,
}

impl DiscoveryClient {
    /// Create a client whose every request is bounded by `timeout`.
    pub fn new(timeout: Duration) -> DiscoveryResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()?;
        Ok(Self { http })
    }

    /// Conditionally refresh the relations registered under `name`.
    pub async fn relations_by_name(
        &self,
        registry: &str,
        name: &str,
        previous: Option<&RelationSet>,
    ) -> DiscoveryResult<RelationSet> {
        let check_code = previous.map(RelationSet::check_code).unwrap_or_default();
        let num = previous.map(RelationSet::request_count).unwrap_or(0).to_string();
        let url = endpoint(
            registry,
            PATH_BY_NAME,
            &[("name", name), ("cc", check_code), ("num", &num)],
        )?;
        self.fetch(url, previous).await
    }

    /// Conditionally refresh the relations whose backends run on `ip`.
    pub async fn relations_by_ip(
        &self,
        registry: &str,
        ip: &str,
        previous: Option<&RelationSet>,
    ) -> DiscoveryResult<RelationSet> {
        let check_code = previous.map(RelationSet::check_code).unwrap_or_default();
        let url = endpoint(registry, PATH_BY_IP, &[("ip", ip), ("cc", check_code)])?;
        self.fetch(url, previous).await
    }

    /// Tell the registry whether a locally hosted `addr` is off.
    pub async fn report_off(&self, registry: &str, addr: &str, off: bool) -> DiscoveryResult<()> {
        let off = if off { "true" } else { "false" };
        let url = endpoint(registry, PATH_REPORT_OFF, &[("ipport", addr), ("off", off)])?;

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(DiscoveryError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn fetch(&self, url: Url, previous: Option<&RelationSet>) -> DiscoveryResult<RelationSet> {
        tracing::trace!(url = %url, "Registry request");
        let response = self.http.get(url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            return previous
                .map(RelationSet::not_modified)
                .ok_or(DiscoveryError::NotModifiedWithoutBaseline);
        }

        let body = response.bytes().await?;
        if status != StatusCode::OK {
            return Err(DiscoveryError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        let parsed: RelationsBody = serde_json::from_slice(&body)?;
        Ok(parsed.into_relation_set())
    }
}

fn endpoint(registry: &str, path: &str, params: &[(&str, &str)]) -> DiscoveryResult<Url> {
    let mut url = Url::parse(&format!("http://{}/{}", registry, path))?;
    url.query_pairs_mut().extend_pairs(params);
    Ok(url)
}
