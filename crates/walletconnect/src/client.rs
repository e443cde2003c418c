//! Dapp-side sign client: proposes sessions, answers wallet requests and sends signing requests.

use crate::crypto::{self, KeyPair, SymKey};
use crate::error::{Error, Result};
use crate::pairing::PairingUri;
use crate::rpc::{
    self, Participant, Payload, Relay, Request, RequestMethod, Response, SessionDeleteParams,
    SessionEventParams, SessionExtendParams, SessionProposeParams, SessionProposeResponse,
    SessionRequestParams, SessionSettleParams, SessionUpdateParams, WC_SESSION_DELETE,
    WC_SESSION_EVENT, WC_SESSION_EXTEND, WC_SESSION_PING, WC_SESSION_PROPOSE,
    WC_SESSION_REQUEST, WC_SESSION_SETTLE, WC_SESSION_UPDATE,
};
use crate::session::{Metadata, ProposalNamespaces, Session, SessionEvent};
use crate::transport::{InboundMessage, InboundReceiver, Transport};
use crate::{now_millis, now_secs};
use relay_rpc::domain::Topic;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, info, warn};

const EVENT_CHANNEL_CAPACITY: usize = 32;

struct Inner {
    transport: Arc<dyn Transport>,
    metadata: Metadata,
    keychain: Mutex<HashMap<Topic, SymKey>>,
    pending: Mutex<HashMap<u64, oneshot::Sender<Response>>>,
    settles: Mutex<HashMap<Topic, oneshot::Sender<SessionSettleParams>>>,
    sessions: Mutex<HashMap<Topic, Session>>,
    events: broadcast::Sender<SessionEvent>,
}

struct RouterHandle(JoinHandle<()>);

impl Drop for RouterHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[derive(Clone)]
pub struct SignClient {
    inner: Arc<Inner>,
    _router: Arc<RouterHandle>,
}

/// Resolves once the wallet has answered the proposal and settled the session.
pub struct SessionApproval {
    client: SignClient,
    pairing_topic: Topic,
    keypair: KeyPair,
    response: oneshot::Receiver<Response>,
}

impl SignClient {
    pub fn new(transport: Arc<dyn Transport>, inbound: InboundReceiver, metadata: Metadata) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let inner = Arc::new(Inner {
            transport,
            metadata,
            keychain: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            settles: Mutex::new(HashMap::new()),
            sessions: Mutex::new(HashMap::new()),
            events,
        });
        let router = tokio::spawn(route_inbound(Arc::downgrade(&inner), inbound));
        Self {
            inner,
            _router: Arc::new(RouterHandle(router)),
        }
    }

    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Creates a pairing and publishes `wc_sessionPropose` on it.
    pub async fn connect(
        &self,
        required_namespaces: ProposalNamespaces,
        optional_namespaces: ProposalNamespaces,
    ) -> Result<(PairingUri, SessionApproval)> {
        let uri = PairingUri::new(SymKey::generate(), now_secs());
        self.inner
            .keychain
            .lock()
            .await
            .insert(uri.topic.clone(), uri.sym_key);
        self.inner.transport.subscribe(&uri.topic).await?;

        let keypair = KeyPair::generate();
        let params = SessionProposeParams {
            relays: vec![Relay::default()],
            required_namespaces,
            optional_namespaces,
            proposer: Participant {
                public_key: keypair.public_hex(),
                metadata: self.inner.metadata.clone(),
            },
        };
        let (_id, response) = self
            .inner
            .send_request(&uri.topic, WC_SESSION_PROPOSE, params)
            .await?;
        info!(pairing_topic = %uri.topic, "session proposal published");

        Ok((
            uri.clone(),
            SessionApproval {
                client: self.clone(),
                pairing_topic: uri.topic,
                keypair,
                response,
            },
        ))
    }

    /// Sends `wc_sessionRequest` and waits for the wallet's answer.
    pub async fn request(
        &self,
        topic: &Topic,
        chain_id: &str,
        method: &str,
        params: Value,
        wait: Duration,
    ) -> Result<Value> {
        let session = self
            .session(topic)
            .await
            .ok_or_else(|| Error::SessionNotFound(topic.to_string()))?;
        if session.is_expired(now_secs()) {
            return Err(Error::SessionExpired);
        }

        let req = SessionRequestParams {
            request: RequestMethod {
                method: method.to_string(),
                params,
            },
            chain_id: chain_id.to_string(),
        };
        let (id, rx) = self.inner.send_request(topic, WC_SESSION_REQUEST, req).await?;
        debug!(%topic, method, id, "session request sent");
        self.inner.await_response(id, rx, wait, method).await
    }

    pub async fn ping(&self, topic: &Topic, wait: Duration) -> Result<()> {
        let (id, rx) = self
            .inner
            .send_request(topic, WC_SESSION_PING, serde_json::json!({}))
            .await?;
        self.inner.await_response(id, rx, wait, WC_SESSION_PING).await?;
        Ok(())
    }

    /// Tells the wallet the session is over and forgets its key.
    pub async fn disconnect(&self, topic: &Topic) -> Result<()> {
        let sent = self
            .inner
            .send_request(topic, WC_SESSION_DELETE, SessionDeleteParams::user_disconnected())
            .await;
        if let Ok((id, _)) = &sent {
            self.inner.pending.lock().await.remove(id);
        }
        self.inner.forget_session(topic).await;
        sent.map(|_| ())
    }

    /// Re-adds a persisted session and resubscribes to its topic.
    pub async fn restore(&self, session: Session) -> Result<()> {
        if session.is_expired(now_secs()) {
            return Err(Error::SessionExpired);
        }
        self.inner
            .keychain
            .lock()
            .await
            .insert(session.topic.clone(), session.sym_key);
        let topic = session.topic.clone();
        self.inner.sessions.lock().await.insert(topic.clone(), session);
        self.inner.transport.subscribe(&topic).await
    }

    pub async fn session(&self, topic: &Topic) -> Option<Session> {
        self.inner.sessions.lock().await.get(topic).cloned()
    }

    pub async fn sessions(&self) -> Vec<Session> {
        self.inner.sessions.lock().await.values().cloned().collect()
    }
}

impl SessionApproval {
    pub fn pairing_topic(&self) -> &Topic {
        &self.pairing_topic
    }

    pub async fn wait(mut self, wait: Duration) -> Result<Session> {
        let deadline = Instant::now() + wait;
        let inner = Arc::clone(&self.client.inner);
        let result = self.settle(&inner, deadline).await;
        inner.keychain.lock().await.remove(&self.pairing_topic);
        if let Err(e) = inner.transport.unsubscribe(&self.pairing_topic).await {
            debug!(error = %e, "pairing unsubscribe failed");
        }
        result
    }

    async fn settle(&mut self, inner: &Inner, deadline: Instant) -> Result<Session> {
        let resp = match timeout_at(deadline, &mut self.response).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(_)) => return Err(Error::ChannelClosed),
            Err(_) => return Err(Error::Timeout("wallet did not answer the proposal".into())),
        };
        let answer: SessionProposeResponse = serde_json::from_value(response_result(resp)?)?;
        let sym_key = self.keypair.derive_sym_key(&answer.responder_public_key)?;
        let topic = sym_key.topic();

        // The settle waiter and key must exist before the topic is subscribed.
        let (tx, rx) = oneshot::channel();
        inner.keychain.lock().await.insert(topic.clone(), sym_key);
        inner.settles.lock().await.insert(topic.clone(), tx);
        if let Err(e) = inner.transport.subscribe(&topic).await {
            inner.settles.lock().await.remove(&topic);
            inner.keychain.lock().await.remove(&topic);
            return Err(e);
        }

        let settle = match timeout_at(deadline, rx).await {
            Ok(Ok(settle)) => settle,
            Ok(Err(_)) => return Err(Error::ChannelClosed),
            Err(_) => {
                inner.settles.lock().await.remove(&topic);
                inner.forget_session(&topic).await;
                return Err(Error::Timeout("wallet did not settle the session".into()));
            }
        };
        if settle.expiry <= now_secs() {
            inner.forget_session(&topic).await;
            return Err(Error::SessionExpired);
        }

        let session = Session {
            topic: topic.clone(),
            sym_key,
            pairing_topic: self.pairing_topic.clone(),
            namespaces: settle.namespaces,
            peer: settle.controller.metadata,
            expiry: settle.expiry,
        };
        inner.sessions.lock().await.insert(topic.clone(), session.clone());
        info!(topic = %topic, wallet = %session.peer.name, "session settled");
        inner.emit(SessionEvent::Settled { topic });
        Ok(session)
    }
}

async fn route_inbound(inner: Weak<Inner>, mut inbound: InboundReceiver) {
    while let Some(msg) = inbound.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        if let Err(e) = inner.handle_inbound(msg).await {
            warn!(error = %e, "dropping inbound walletconnect message");
        }
    }
}

impl Inner {
    async fn send_request<P: Serialize>(
        &self,
        topic: &Topic,
        method: &str,
        params: P,
    ) -> Result<(u64, oneshot::Receiver<Response>)> {
        let key = self
            .keychain
            .lock()
            .await
            .get(topic)
            .copied()
            .ok_or_else(|| Error::SessionNotFound(topic.to_string()))?;
        let opts = rpc::request_opts(method)
            .ok_or_else(|| Error::Protocol(format!("no publish options for {method}")))?;

        let id = rpc::payload_id(now_millis());
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let payload = serde_json::to_vec(&Request::new(id, method, params))?;
        let message = crypto::encrypt(&key, &payload)?;
        if let Err(e) = self
            .transport
            .publish(topic, &message, opts.tag, opts.ttl_secs, opts.prompt)
            .await
        {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }
        Ok((id, rx))
    }

    async fn await_response(
        &self,
        id: u64,
        rx: oneshot::Receiver<Response>,
        wait: Duration,
        what: &str,
    ) -> Result<Value> {
        match timeout(wait, rx).await {
            Ok(Ok(resp)) => response_result(resp),
            Ok(Err(_)) => Err(Error::ChannelClosed),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(Error::Timeout(format!("{what} got no answer within {wait:?}")))
            }
        }
    }

    async fn send_response(&self, topic: &Topic, method: &str, resp: Response) -> Result<()> {
        let Some(opts) = rpc::response_opts(method) else {
            return Err(Error::Protocol(format!("cannot answer {method}")));
        };
        let key = self
            .keychain
            .lock()
            .await
            .get(topic)
            .copied()
            .ok_or_else(|| Error::SessionNotFound(topic.to_string()))?;
        let message = crypto::encrypt(&key, &serde_json::to_vec(&resp)?)?;
        self.transport
            .publish(topic, &message, opts.tag, opts.ttl_secs, opts.prompt)
            .await
    }

    async fn forget_session(&self, topic: &Topic) {
        self.sessions.lock().await.remove(topic);
        self.keychain.lock().await.remove(topic);
        if let Err(e) = self.transport.unsubscribe(topic).await {
            debug!(%topic, error = %e, "unsubscribe failed");
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    async fn handle_inbound(&self, msg: InboundMessage) -> Result<()> {
        let key = self
            .keychain
            .lock()
            .await
            .get(&msg.topic)
            .copied()
            .ok_or_else(|| Error::SessionNotFound(msg.topic.to_string()))?;
        let plaintext = crypto::decrypt(&key, &msg.message)?;

        match Payload::parse(&plaintext)? {
            Payload::Response(resp) => {
                match self.pending.lock().await.remove(&resp.id) {
                    Some(tx) => {
                        let _ = tx.send(resp);
                    }
                    None => debug!(id = resp.id, "response for unknown request"),
                }
                Ok(())
            }
            Payload::Request(req) => self.handle_request(&msg.topic, req).await,
        }
    }

    async fn handle_request(&self, topic: &Topic, req: Request<Value>) -> Result<()> {
        let ack = Response::success(req.id, Value::Bool(true));
        match req.method.as_str() {
            WC_SESSION_SETTLE => {
                let params: SessionSettleParams = serde_json::from_value(req.params)?;
                match self.settles.lock().await.remove(topic) {
                    Some(tx) => {
                        let _ = tx.send(params);
                        self.send_response(topic, WC_SESSION_SETTLE, ack).await
                    }
                    None => {
                        let resp = Response::error(req.id, 7001, "no pending session proposal");
                        self.send_response(topic, WC_SESSION_SETTLE, resp).await
                    }
                }
            }
            WC_SESSION_PING => self.send_response(topic, WC_SESSION_PING, ack).await,
            WC_SESSION_DELETE => {
                let params: SessionDeleteParams = serde_json::from_value(req.params)?;
                let answered = self.send_response(topic, WC_SESSION_DELETE, ack).await;
                self.forget_session(topic).await;
                info!(%topic, code = params.code, reason = %params.message, "wallet deleted session");
                self.emit(SessionEvent::Deleted {
                    topic: topic.clone(),
                    reason: params.message,
                });
                answered
            }
            WC_SESSION_UPDATE => {
                let params: SessionUpdateParams = serde_json::from_value(req.params)?;
                if let Some(s) = self.sessions.lock().await.get_mut(topic) {
                    s.namespaces = params.namespaces;
                }
                self.emit(SessionEvent::Updated {
                    topic: topic.clone(),
                });
                self.send_response(topic, WC_SESSION_UPDATE, ack).await
            }
            WC_SESSION_EXTEND => {
                let params: SessionExtendParams = serde_json::from_value(req.params)?;
                if let Some(s) = self.sessions.lock().await.get_mut(topic) {
                    s.expiry = params.expiry;
                }
                self.emit(SessionEvent::Extended {
                    topic: topic.clone(),
                    expiry: params.expiry,
                });
                self.send_response(topic, WC_SESSION_EXTEND, ack).await
            }
            WC_SESSION_EVENT => {
                let params: SessionEventParams = serde_json::from_value(req.params)?;
                self.emit(SessionEvent::Event {
                    topic: topic.clone(),
                    name: params.event.name,
                    data: params.event.data,
                });
                self.send_response(topic, WC_SESSION_EVENT, ack).await
            }
            other => {
                warn!(%topic, method = other, "unsupported inbound walletconnect method");
                Ok(())
            }
        }
    }
}

fn response_result(resp: Response) -> Result<Value> {
    if let Some(err) = resp.error {
        return Err(Error::Wallet {
            code: err.code,
            message: err.message,
        });
    }
    Ok(resp.result.unwrap_or(Value::Null))
}
