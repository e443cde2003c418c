use crate::crypto::SymKey;
use crate::error::{Error, Result};
use relay_rpc::domain::Topic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// App/wallet self-description exchanged during pairing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub icons: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalNamespace {
    #[serde(default)]
    pub chains: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub events: Vec<String>,
}

pub type ProposalNamespaces = BTreeMap<String, ProposalNamespace>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionNamespace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chains: Option<Vec<String>>,
    pub accounts: Vec<String>,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub events: Vec<String>,
}

pub type SessionNamespaces = BTreeMap<String, SessionNamespace>;

/// A CAIP-10 account: `namespace:reference:address`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionAccount {
    pub chain_id: String,
    pub address: String,
}

impl SessionAccount {
    pub fn parse(caip10: &str) -> Result<Self> {
        let mut parts = caip10.rsplitn(2, ':');
        let address = parts.next().unwrap_or_default();
        let chain_id = parts.next().unwrap_or_default();
        if address.is_empty() || !chain_id.contains(':') {
            return Err(Error::Protocol(format!("invalid CAIP-10 account: {caip10}")));
        }
        Ok(Self {
            chain_id: chain_id.to_string(),
            address: address.to_string(),
        })
    }
}

/// A settled session, persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub topic: Topic,
    pub sym_key: SymKey,
    pub pairing_topic: Topic,
    pub namespaces: SessionNamespaces,
    pub peer: Metadata,
    /// Unix seconds.
    pub expiry: u64,
}

impl Session {
    pub fn is_expired(&self, now_secs: u64) -> bool {
        self.expiry <= now_secs
    }

    pub fn accounts(&self) -> Vec<SessionAccount> {
        self.namespaces
            .values()
            .flat_map(|ns| ns.accounts.iter())
            .filter_map(|a| SessionAccount::parse(a).ok())
            .collect()
    }

    /// First account the wallet exposed on `chain_id`.
    pub fn account_on(&self, chain_id: &str) -> Option<SessionAccount> {
        self.accounts().into_iter().find(|a| a.chain_id == chain_id)
    }

    pub fn supports_method(&self, method: &str) -> bool {
        self.namespaces
            .values()
            .any(|ns| ns.methods.iter().any(|m| m == method))
    }
}

/// Notifications surfaced to the application.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Settled { topic: Topic },
    Updated { topic: Topic },
    Extended { topic: Topic, expiry: u64 },
    Event { topic: Topic, name: String, data: Value },
    Deleted { topic: Topic, reason: String },
}
