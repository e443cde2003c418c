//! WalletConnect side of the wallet context: pairing, session persistence and signing with
//! method fallback.

use super::detect::WalletKind;
use super::session_store;
use super::{SignOutcome, TxSigner};
use crate::config::WalletConnectConfig;
use crate::network::TronNetwork;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::{debug, info, warn};
use tron::{Transaction, TronAddress};
use walletconnect::auth::ClientIdentity;
use walletconnect::{
    Metadata, PairingUri, ProposalNamespace, ProposalNamespaces, RelayConfig, RelayTransport,
    Session, SessionEvent, SignClient, Topic,
};

pub const TRON_SIGN_TRANSACTION: &str = "tron_signTransaction";
pub const TRON_SIGN: &str = "tron_sign";
const TRON_SIGN_MESSAGE: &str = "tron_signMessage";

const SESSION_EVENTS: [&str; 2] = ["accountsChanged", "chainChanged"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookStatus {
    Disconnected,
    Connecting,
    /// Pairing URI waiting to be scanned.
    QrReady(String),
    Connected(TronAddress),
}

impl fmt::Display for HookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connecting => f.write_str("connecting"),
            Self::QrReady(_) => f.write_str("waiting for wallet approval"),
            Self::Connected(addr) => write!(f, "connected ({addr})"),
        }
    }
}

/// One `wc_sessionRequest` round trip.
#[async_trait]
pub trait SessionRequester: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> Result<Value, walletconnect::Error>;
}

pub struct WalletConnectHook {
    cfg: WalletConnectConfig,
    network: TronNetwork,
    metadata: Metadata,
    client: Option<SignClient>,
    events: Option<broadcast::Receiver<SessionEvent>>,
    session: Option<Session>,
    status: HookStatus,
}

impl WalletConnectHook {
    /// Loads the persisted session (if any) without touching the relay.
    pub fn open(cfg: WalletConnectConfig, network: TronNetwork) -> Result<Self> {
        let stored = session_store::load(&cfg.session_file, now_secs())?;
        let mut hook = Self {
            cfg,
            network,
            metadata: app_metadata(),
            client: None,
            events: None,
            session: None,
            status: HookStatus::Disconnected,
        };
        if let Some(session) = stored {
            match hook.adopt(session) {
                Ok(addr) => debug!(address = %addr, "restored WalletConnect session"),
                Err(e) => warn!(error = %e, "ignoring stored WalletConnect session"),
            }
        }
        Ok(hook)
    }

    pub fn status(&self) -> &HookStatus {
        &self.status
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn address(&self) -> Option<TronAddress> {
        match self.status {
            HookStatus::Connected(addr) => Some(addr),
            _ => None,
        }
    }

    pub fn kind(&self) -> Option<WalletKind> {
        self.session
            .as_ref()
            .map(|s| WalletKind::from_metadata(&s.peer))
    }

    /// Pairs with a wallet. `on_uri` receives the pairing URI to display.
    pub async fn connect<F>(&mut self, on_uri: F) -> Result<TronAddress>
    where
        F: FnOnce(&PairingUri) + Send,
    {
        self.sync_events().await;
        if let HookStatus::Connected(addr) = self.status {
            info!(address = %addr, "WalletConnect session already active");
            return Ok(addr);
        }

        self.status = HookStatus::Connecting;
        let res = self.pair(on_uri).await;
        if res.is_err() {
            self.status = HookStatus::Disconnected;
        }
        res
    }

    async fn pair<F>(&mut self, on_uri: F) -> Result<TronAddress>
    where
        F: FnOnce(&PairingUri) + Send,
    {
        let client = self.ensure_client().await?;
        let (required, optional) = namespaces(self.network);
        let (uri, approval) = client
            .connect(required, optional)
            .await
            .context("publish session proposal")?;

        self.status = HookStatus::QrReady(uri.to_string());
        on_uri(&uri);
        info!(
            chain_id = self.network.chain_id(),
            timeout_secs = self.cfg.connect_timeout.as_secs(),
            "waiting for wallet to approve the session"
        );

        let session = approval
            .wait(self.cfg.connect_timeout)
            .await
            .context("wallet did not approve the session")?;
        let topic = session.topic.clone();
        let addr = match self.adopt(session) {
            Ok(addr) => addr,
            Err(e) => {
                if let Err(de) = client.disconnect(&topic).await {
                    debug!(error = %de, "disconnect after rejected session failed");
                }
                return Err(e);
            }
        };
        if let Some(session) = &self.session {
            session_store::save(&self.cfg.session_file, session)?;
        }
        info!(address = %addr, wallet = ?self.kind(), "WalletConnect session established");
        Ok(addr)
    }

    /// Ends the session with the wallet and forgets it locally.
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.session.is_some() {
            match self.ensure_client().await {
                Ok(client) => {
                    if let Some(session) = &self.session
                        && let Err(e) = client.disconnect(&session.topic).await
                    {
                        warn!(error = %e, "could not notify wallet about disconnect");
                    }
                }
                Err(e) => warn!(error = %e, "relay unavailable; dropping session locally"),
            }
        }
        self.forget()?;
        info!("WalletConnect session cleared");
        Ok(())
    }

    /// Applies session events the relay delivered since the last call.
    pub async fn sync_events(&mut self) {
        let mut deleted = false;
        let mut touched = false;
        if let Some(events) = self.events.as_mut() {
            loop {
                match events.try_recv() {
                    Ok(SessionEvent::Deleted { topic, reason }) => {
                        if self.session.as_ref().is_some_and(|s| s.topic == topic) {
                            info!(%reason, "wallet ended the WalletConnect session");
                            deleted = true;
                        }
                    }
                    Ok(SessionEvent::Updated { .. } | SessionEvent::Extended { .. }) => {
                        touched = true;
                    }
                    Ok(SessionEvent::Event { name, data, .. }) => {
                        debug!(%name, %data, "wallet event");
                    }
                    Ok(SessionEvent::Settled { .. }) => {}
                    Err(TryRecvError::Lagged(n)) => warn!(skipped = n, "session events lagged"),
                    Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                }
            }
        }

        if deleted {
            if let Err(e) = self.forget() {
                warn!(error = %e, "failed to clear deleted session");
            }
            return;
        }
        if touched
            && let (Some(client), Some(current)) = (&self.client, &self.session)
            && let Some(updated) = client.session(&current.topic).await
        {
            match self.adopt(updated) {
                Ok(_) => {
                    if let Some(session) = &self.session
                        && let Err(e) = session_store::save(&self.cfg.session_file, session)
                    {
                        warn!(error = %e, "failed to persist updated session");
                    }
                }
                Err(e) => {
                    warn!(error = %e, "updated session no longer usable");
                    if let Err(e) = self.forget() {
                        warn!(error = %e, "failed to clear session");
                    }
                }
            }
        }
    }

    /// A signer bound to the current session; dials the relay when needed.
    pub async fn signer(&mut self) -> Result<WalletConnectSigner> {
        let address = self
            .address()
            .context("no WalletConnect session; run `approver connect` first")?;
        let client = self.ensure_client().await?;
        let session = self.session.as_ref().context("no WalletConnect session")?;
        Ok(WalletConnectSigner {
            client,
            topic: session.topic.clone(),
            chain_id: self.network.chain_id().to_string(),
            address,
            kind: WalletKind::from_metadata(&session.peer),
            timeout: self.cfg.request_timeout,
        })
    }

    fn adopt(&mut self, session: Session) -> Result<TronAddress> {
        let chain_id = self.network.chain_id();
        let account = session
            .account_on(chain_id)
            .with_context(|| format!("wallet approved no account on {chain_id}"))?;
        let addr = TronAddress::parse_text(&account.address)
            .with_context(|| format!("wallet returned invalid address {}", account.address))?;
        self.session = Some(session);
        self.status = HookStatus::Connected(addr);
        Ok(addr)
    }

    fn forget(&mut self) -> Result<()> {
        self.session = None;
        self.status = HookStatus::Disconnected;
        session_store::clear(&self.cfg.session_file)
    }

    async fn ensure_client(&mut self) -> Result<SignClient> {
        let client = match &self.client {
            Some(client) => client.clone(),
            None => {
                let relay = RelayConfig {
                    relay_url: self.cfg.relay_url.clone(),
                    project_id: self.cfg.project_id.clone(),
                    ..RelayConfig::new(self.cfg.project_id.clone())
                };
                let identity = ClientIdentity::generate();
                let (transport, inbound) = RelayTransport::connect(&relay, &identity)
                    .await
                    .with_context(|| format!("connect to relay {}", relay.relay_url))?;
                let client = SignClient::new(Arc::new(transport), inbound, self.metadata.clone());
                self.events = Some(client.events());
                self.client = Some(client.clone());
                client
            }
        };
        if let Some(session) = &self.session
            && client.session(&session.topic).await.is_none()
        {
            client
                .restore(session.clone())
                .await
                .context("restore WalletConnect session")?;
        }
        Ok(client)
    }
}

pub struct WalletConnectSigner {
    client: SignClient,
    topic: Topic,
    chain_id: String,
    address: TronAddress,
    kind: WalletKind,
    timeout: Duration,
}

#[async_trait]
impl SessionRequester for WalletConnectSigner {
    async fn request(&self, method: &str, params: Value) -> Result<Value, walletconnect::Error> {
        self.client
            .request(&self.topic, &self.chain_id, method, params, self.timeout)
            .await
    }
}

#[async_trait]
impl TxSigner for WalletConnectSigner {
    fn address(&self) -> TronAddress {
        self.address
    }

    fn kind(&self) -> WalletKind {
        self.kind
    }

    async fn sign(&self, tx: &Transaction) -> Result<SignOutcome> {
        info!(wallet = %self.kind, "check your wallet to approve the transaction");
        sign_with_fallback(self, tx).await
    }
}

/// Method and params of each signing attempt, in order. Wallets disagree on whether the
/// transaction is passed positionally or wrapped in an object.
fn sign_attempts(tx: &Transaction) -> [(&'static str, Value); 3] {
    [
        (TRON_SIGN_TRANSACTION, json!([tx])),
        (TRON_SIGN_TRANSACTION, json!({ "transaction": tx })),
        (TRON_SIGN, json!([tx])),
    ]
}

/// Walks [`sign_attempts`]. Unsupported-method and invalid-params answers move on to the
/// next attempt; any other wallet error (including a user rejection) is returned as is.
pub async fn sign_with_fallback(
    requester: &dyn SessionRequester,
    tx: &Transaction,
) -> Result<SignOutcome> {
    let mut last: Option<walletconnect::Error> = None;
    for (method, params) in sign_attempts(tx) {
        debug!(method, txid = %tx.tx_id, "requesting wallet signature");
        match requester.request(method, params).await {
            Ok(result) => return parse_sign_result(method, tx, result),
            Err(e) if e.is_unsupported_method() || e.is_invalid_params() => {
                warn!(method, error = %e, "wallet refused this request shape; trying next");
                last = Some(e);
            }
            Err(e) => return Err(anyhow::Error::new(e).context(format!("{method} failed"))),
        }
    }

    let err = match last {
        Some(e) => anyhow::Error::new(e),
        None => anyhow::anyhow!("no signing method attempted"),
    };
    Err(err.context(format!(
        "all signing methods failed ({TRON_SIGN_TRANSACTION}, {TRON_SIGN})"
    )))
}

/// Interprets a wallet's answer: a signed tx, a bare signature, or a broadcast txid.
fn parse_sign_result(method: &str, tx: &Transaction, result: Value) -> Result<SignOutcome> {
    let result = match result {
        Value::Object(mut m) if m.contains_key("transaction") && !m.contains_key("signature") => {
            m.remove("transaction").unwrap_or(Value::Null)
        }
        Value::String(s) if s.trim_start().starts_with('{') => {
            serde_json::from_str(&s).with_context(|| format!("{method} returned malformed JSON"))?
        }
        other => other,
    };

    match result {
        Value::String(s) => {
            let txid = parse_txid(&s).with_context(|| format!("unrecognised {method} result: {s}"))?;
            Ok(SignOutcome::Broadcast { txid })
        }
        Value::Object(m) if m.contains_key("signature") => {
            let signature = match &m["signature"] {
                Value::String(s) => vec![s.clone()],
                other => serde_json::from_value::<Vec<String>>(other.clone())
                    .with_context(|| format!("{method} returned a malformed signature"))?,
            };
            if signature.is_empty() {
                anyhow::bail!("{method} returned no signature");
            }

            let signed = if m.contains_key("raw_data_hex") {
                let signed: Transaction = serde_json::from_value(Value::Object(m))
                    .with_context(|| format!("{method} returned a malformed transaction"))?;
                if signed.tx_id != tx.tx_id || signed.raw_data_hex != tx.raw_data_hex {
                    anyhow::bail!(
                        "wallet signed a different transaction (expected txID {}, got {})",
                        tx.tx_id,
                        signed.tx_id
                    );
                }
                signed
            } else {
                let mut signed = tx.clone();
                signed.signature = signature;
                signed
            };
            Ok(SignOutcome::Signed(signed))
        }
        Value::Object(m) => {
            if m.get("result").and_then(Value::as_bool) == Some(false) {
                let msg = m
                    .get("message")
                    .and_then(Value::as_str)
                    .map(tron::http::decode_node_message)
                    .unwrap_or_else(|| "unknown error".to_string());
                anyhow::bail!("wallet broadcast failed: {msg}");
            }
            let txid = m
                .get("txid")
                .or_else(|| m.get("txID"))
                .and_then(Value::as_str)
                .with_context(|| format!("unrecognised {method} result: {}", Value::Object(m.clone())))?;
            Ok(SignOutcome::Broadcast {
                txid: parse_txid(txid)?,
            })
        }
        other => anyhow::bail!("unrecognised {method} result: {other}"),
    }
}

fn parse_txid(s: &str) -> Result<[u8; 32]> {
    let s = s.trim();
    let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(s)).context("txid is not hex")?;
    bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow::anyhow!("txid must be 32 bytes (got {})", b.len()))
}

fn namespaces(network: TronNetwork) -> (ProposalNamespaces, ProposalNamespaces) {
    let chains = vec![network.chain_id().to_string()];
    let events: Vec<String> = SESSION_EVENTS.iter().map(|e| e.to_string()).collect();

    let mut required = ProposalNamespaces::new();
    required.insert(
        "tron".to_string(),
        ProposalNamespace {
            chains: chains.clone(),
            methods: vec![TRON_SIGN_TRANSACTION.to_string()],
            events: events.clone(),
        },
    );

    let mut optional = ProposalNamespaces::new();
    optional.insert(
        "tron".to_string(),
        ProposalNamespace {
            chains,
            methods: vec![TRON_SIGN.to_string(), TRON_SIGN_MESSAGE.to_string()],
            events,
        },
    );
    (required, optional)
}

fn app_metadata() -> Metadata {
    Metadata {
        name: "Tron USDT Approver".to_string(),
        description: "Approve USDT spending on Tron".to_string(),
        url: "https://github.com/tron-usdt-approver".to_string(),
        icons: Vec::new(),
    }
}

pub(super) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
