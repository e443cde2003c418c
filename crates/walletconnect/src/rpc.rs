//! JSON-RPC payloads of the WalletConnect sign (`wc_session*`) methods.

use crate::session::{Metadata, ProposalNamespaces, SessionNamespaces};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

pub const WC_SESSION_PROPOSE: &str = "wc_sessionPropose";
pub const WC_SESSION_SETTLE: &str = "wc_sessionSettle";
pub const WC_SESSION_UPDATE: &str = "wc_sessionUpdate";
pub const WC_SESSION_EXTEND: &str = "wc_sessionExtend";
pub const WC_SESSION_REQUEST: &str = "wc_sessionRequest";
pub const WC_SESSION_EVENT: &str = "wc_sessionEvent";
pub const WC_SESSION_DELETE: &str = "wc_sessionDelete";
pub const WC_SESSION_PING: &str = "wc_sessionPing";

/// Relay tag and TTL for one direction of a sign method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishOpts {
    pub tag: u32,
    pub ttl_secs: u64,
    pub prompt: bool,
}

const FIVE_MINUTES: u64 = 300;
const ONE_DAY: u64 = 86_400;
const THIRTY_SECONDS: u64 = 30;

/// Publish options for requests of `method`.
pub fn request_opts(method: &str) -> Option<PublishOpts> {
    let (tag, ttl_secs, prompt) = match method {
        WC_SESSION_PROPOSE => (1100, FIVE_MINUTES, true),
        WC_SESSION_SETTLE => (1102, FIVE_MINUTES, false),
        WC_SESSION_UPDATE => (1104, ONE_DAY, false),
        WC_SESSION_EXTEND => (1106, ONE_DAY, false),
        WC_SESSION_REQUEST => (1108, FIVE_MINUTES, true),
        WC_SESSION_EVENT => (1110, FIVE_MINUTES, true),
        WC_SESSION_DELETE => (1112, ONE_DAY, false),
        WC_SESSION_PING => (1114, THIRTY_SECONDS, false),
        _ => return None,
    };
    Some(PublishOpts {
        tag,
        ttl_secs,
        prompt,
    })
}

/// Publish options for responses to `method` (request tag + 1, no prompt).
pub fn response_opts(method: &str) -> Option<PublishOpts> {
    request_opts(method).map(|o| PublishOpts {
        tag: o.tag + 1,
        ttl_secs: o.ttl_secs,
        prompt: false,
    })
}

/// Message ids: unix millis scaled by 1000 plus three random digits.
pub fn payload_id(now_millis: u64) -> u64 {
    now_millis * 1000 + rand::thread_rng().gen_range(0..1000)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request<T> {
    pub id: u64,
    pub jsonrpc: String,
    pub method: String,
    pub params: T,
}

impl<T> Request<T> {
    pub fn new(id: u64, method: &str, params: T) -> Self {
        Self {
            id,
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.to_string(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorData {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub id: u64,
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorData>,
}

impl Response {
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            id,
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: u64, code: i64, message: &str) -> Self {
        Self {
            id,
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(ErrorData {
                code,
                message: message.to_string(),
                data: None,
            }),
        }
    }
}

/// A decoded inbound JSON-RPC payload.
#[derive(Debug, Clone)]
pub enum Payload {
    Request(Request<Value>),
    Response(Response),
}

impl Payload {
    pub fn parse(bytes: &[u8]) -> serde_json::Result<Self> {
        let v: Value = serde_json::from_slice(bytes)?;
        if v.get("method").is_some() {
            Ok(Payload::Request(serde_json::from_value(v)?))
        } else {
            Ok(Payload::Response(serde_json::from_value(v)?))
        }
    }
}

// Sign methods.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relay {
    pub protocol: String,
}

impl Default for Relay {
    fn default() -> Self {
        Self {
            protocol: crate::pairing::RELAY_PROTOCOL_IRN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub public_key: String,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProposeParams {
    pub relays: Vec<Relay>,
    pub required_namespaces: ProposalNamespaces,
    #[serde(default)]
    pub optional_namespaces: ProposalNamespaces,
    pub proposer: Participant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProposeResponse {
    pub relay: Relay,
    pub responder_public_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSettleParams {
    pub relay: Relay,
    pub controller: Participant,
    pub namespaces: SessionNamespaces,
    pub expiry: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUpdateParams {
    pub namespaces: SessionNamespaces,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionExtendParams {
    pub expiry: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestMethod {
    pub method: String,
    pub params: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequestParams {
    pub request: RequestMethod,
    pub chain_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub name: String,
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEventParams {
    pub event: EventData,
    pub chain_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDeleteParams {
    pub code: i64,
    pub message: String,
}

impl SessionDeleteParams {
    pub fn user_disconnected() -> Self {
        Self {
            code: 6000,
            message: "User disconnected.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn response_tags_follow_requests() {
        assert_eq!(request_opts(WC_SESSION_PROPOSE).unwrap().tag, 1100);
        assert_eq!(response_opts(WC_SESSION_PROPOSE).unwrap().tag, 1101);
        assert_eq!(response_opts(WC_SESSION_REQUEST).unwrap().tag, 1109);
        assert!(!response_opts(WC_SESSION_REQUEST).unwrap().prompt);
        assert!(request_opts("eth_sign").is_none());
    }

    #[test]
    fn payload_ids_are_time_ordered() {
        let a = payload_id(1_700_000_000_000);
        let b = payload_id(1_700_000_000_001);
        assert!(a < b);
        assert!(a >= 1_700_000_000_000_000);
    }

    #[test]
    fn payload_parse_distinguishes_requests_and_responses() {
        let req = json!({"id": 1, "jsonrpc": "2.0", "method": "wc_sessionPing", "params": {}});
        assert!(matches!(
            Payload::parse(req.to_string().as_bytes()).unwrap(),
            Payload::Request(r) if r.method == WC_SESSION_PING
        ));

        let err = json!({"id": 2, "jsonrpc": "2.0", "error": {"code": 5000, "message": "User rejected."}});
        match Payload::parse(err.to_string().as_bytes()).unwrap() {
            Payload::Response(r) => {
                assert_eq!(r.id, 2);
                assert_eq!(r.error.unwrap().code, 5000);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn session_request_uses_camel_case() {
        let v = serde_json::to_value(SessionRequestParams {
            request: RequestMethod {
                method: "tron_signTransaction".to_string(),
                params: json!({}),
            },
            chain_id: "tron:0x2b6653dc".to_string(),
        })
        .unwrap();
        assert_eq!(v["chainId"], "tron:0x2b6653dc");
        assert_eq!(v["request"]["method"], "tron_signTransaction");
    }
}
