//! Registry wire types and error definitions.

use serde::Deserialize;
use thiserror::Error;

use crate::load_balancer::{Relation, RelationSet, Transport};

/// Errors that can occur while talking to the registry.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The registry address or query could not form a URL.
    #[error("Invalid registry URL: {0}")]
    Url(#[from] url::ParseError),

    /// Transport failure or timeout.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Anything other than 200 (or 304 where allowed).
    #[error("Registry returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The 200 body was not a relation list.
    #[error("Malformed registry body: {0}")]
    Decode(#[from] serde_json::Error),

    /// A 304 arrived for a request that carried no previous set.
    #[error("Registry answered 304 without a previous relation set")]
    NotModifiedWithoutBaseline,
}

/// Result type for registry operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// One relation as the registry encodes it.
#[derive(Debug, Clone, Deserialize)]
pub struct RelationWire {
    #[serde(rename = "Name", alias = "name", default)]
    pub name: String,
    #[serde(rename = "Ip", alias = "ip", alias = "IP")]
    pub ip: String,
    #[serde(rename = "Port", alias = "port")]
    pub port: u16,
    #[serde(rename = "Udp", alias = "udp", alias = "UDP", default)]
    pub udp: bool,
    #[serde(rename = "Weight", alias = "weight", default)]
    pub weight: u32,
}

impl From<RelationWire> for Relation {
    fn from(wire: RelationWire) -> Self {
        Relation {
            name: wire.name,
            ip: wire.ip,
            port: wire.port,
            transport: if wire.udp { Transport::Udp } else { Transport::Tcp },
            weight: wire.weight,
        }
    }
}

/// Body of a 200 answer from `getsFromName` / `getsFromIp`.
#[derive(Debug, Clone, Deserialize)]
pub struct RelationsBody {
    #[serde(rename = "Rels", alias = "rels", default)]
    pub rels: Option<Vec<RelationWire>>,
    #[serde(rename = "cc", alias = "CC", alias = "CheckCode", default)]
    pub check_code: String,
}

impl RelationsBody {
    pub fn into_relation_set(self) -> RelationSet {
        let relations = self
            .rels
            .unwrap_or_default()
            .into_iter()
            .map(Relation::from)
            .collect();
        RelationSet::new(relations, self.check_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_canonical_body() {
        let body = r#"{
            "Rels": [
                {"Name": "svc.a", "Ip": "10.0.0.1", "Port": 9000, "Udp": false, "Weight": 5},
                {"Name": "svc.a", "Ip": "10.0.0.2", "Port": 9001, "Udp": true, "Weight": 1}
            ],
            "cc": "v7"
        }"#;
        let set = serde_json::from_str::<RelationsBody>(body)
            .unwrap()
            .into_relation_set();

        assert_eq!(set.check_code(), "v7");
        assert_eq!(set.relations().len(), 2);
        assert_eq!(set.relations()[1].transport, Transport::Udp);
        assert_eq!(set.relations()[1].addr(), "10.0.0.2:9001");
        assert_eq!(set.rotation().max_weight, 5);
        assert_eq!(set.rotation().current_index, None);
    }

    #[test]
    fn test_decode_lowercase_and_null() {
        let body = r#"{"rels": [{"ip": "10.0.0.3", "port": 53, "weight": 2}], "cc": "x"}"#;
        let set = serde_json::from_str::<RelationsBody>(body)
            .unwrap()
            .into_relation_set();
        assert_eq!(set.relations()[0].addr(), "10.0.0.3:53");
        assert_eq!(set.relations()[0].transport, Transport::Tcp);

        let empty = serde_json::from_str::<RelationsBody>(r#"{"Rels": null, "cc": ""}"#)
            .unwrap()
            .into_relation_set();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_error_display() {
        let err = DiscoveryError::Status {
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(err.to_string(), "Registry returned status 500: boom");
    }
}
