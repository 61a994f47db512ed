// SPDX-License-Identifier: Apache-2.0
//! The client-side connection driver: performs the transport handshake,
//! then a single background task owns the link for the rest of the
//! connection's life, answering peer-initiated pings, mirroring listed
//! entities and state changes into a local registry, and fanning log lines
//! out on a local bus.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use hearth_bus::{Bus, Event, Subscription};
use hearth_proto::messages::{
    ConnectRequest, DisconnectRequest, DisconnectResponse, HelloRequest, ListEntitiesDoneResponse,
    ListEntitiesRequest, ListEntitiesResponse, PingResponse, StateResponse, SubscribeLogsRequest,
    SubscribeStatesRequest,
};
use hearth_proto::{Catalog, Domain, EntityInfo, Message};
use hearth_registry::{EntityRecord, Registry, RegistryError, StateCell};
use hearth_transport::noise::{client_handshake, NoiseSession, Psk};
use hearth_transport::FrameLink;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::ClientError;
use crate::logs::LogLine;

const OUTBOUND_QUEUE_DEPTH: usize = 64;

/// The major API version this client speaks.
pub const API_VERSION_MAJOR: u32 = 1;
/// The minor API version this client speaks.
pub const API_VERSION_MINOR: u32 = 10;

#[derive(Default)]
struct Listing {
    active: bool,
    entities: Vec<(Domain, EntityInfo)>,
    completion: Option<oneshot::Sender<Vec<(Domain, EntityInfo)>>>,
}

/// A connected, authenticated session against a peer node. Owns a local
/// mirror [`Registry`] and [`Bus`], populated as `ListEntitiesResponse` and
/// `StateResponse` frames arrive.
pub struct ClientSession {
    tx: mpsc::Sender<Message>,
    registry: Arc<Registry>,
    bus: Arc<Bus>,
    listing: Arc<Mutex<Listing>>,
    subscribed_states: Arc<AtomicBool>,
    cancel: CancellationToken,
    driver: JoinHandle<()>,
}

impl ClientSession {
    /// Connect over `stream`: run the transport handshake (Noise if `psk`
    /// is given, plaintext otherwise), then issue `HelloRequest` and
    /// `ConnectRequest` back to back and wait for `HelloResponse` followed
    /// by `ConnectResponse`.
    ///
    /// # Errors
    /// Returns [`ClientError::InvalidPassword`] if the server rejected
    /// `password`, [`ClientError::UnexpectedHandshakeMessage`] if a
    /// handshake-phase frame arrived out of order, or propagates a
    /// transport/catalog failure.
    pub async fn connect<S>(
        stream: S,
        client_info: impl Into<String>,
        password: impl Into<String>,
        psk: Option<Psk>,
    ) -> Result<Self, ClientError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut raw_r, mut raw_w) = tokio::io::split(stream);
        let mut link = if let Some(psk) = psk {
            let (transport, _server_name) = client_handshake(&mut raw_r, &mut raw_w, &psk).await?;
            FrameLink::noise(tokio::io::join(raw_r, raw_w), NoiseSession::new(transport))
        } else {
            FrameLink::plaintext(tokio::io::join(raw_r, raw_w))
        };

        let catalog = Catalog::new();
        link.write_frame(&catalog.encode_one(&Message::HelloRequest(HelloRequest {
            api_version_major: API_VERSION_MAJOR,
            api_version_minor: API_VERSION_MINOR,
            client_info: client_info.into(),
        }))?)
        .await?;
        link.write_frame(&catalog.encode_one(&Message::ConnectRequest(ConnectRequest {
            password: password.into(),
        }))?)
        .await?;

        let frame = link.read_frame().await?;
        let Message::HelloResponse(_hello) = catalog.decode(&frame)? else {
            return Err(ClientError::UnexpectedHandshakeMessage("HelloResponse"));
        };
        let frame = link.read_frame().await?;
        let Message::ConnectResponse(connect) = catalog.decode(&frame)? else {
            return Err(ClientError::UnexpectedHandshakeMessage("ConnectResponse"));
        };
        if connect.invalid {
            return Err(ClientError::InvalidPassword);
        }

        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        let registry = Arc::new(Registry::new());
        let bus = Arc::new(Bus::new());
        let listing = Arc::new(Mutex::new(Listing::default()));
        let cancel = CancellationToken::new();

        let driver = tokio::spawn(drive(
            link,
            catalog,
            rx,
            Arc::clone(&registry),
            Arc::clone(&bus),
            Arc::clone(&listing),
            cancel.clone(),
        ));

        Ok(Self {
            tx,
            registry,
            bus,
            listing,
            subscribed_states: Arc::new(AtomicBool::new(false)),
            cancel,
            driver,
        })
    }

    /// The local mirror registry, populated by [`ClientSession::list_entities`]
    /// and kept current by any active state subscription.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// The session's local bus. Carries [`hearth_registry::StateChange`]
    /// events for mirrored entities and [`LogLine`] events from
    /// [`ClientSession::start_logs`].
    #[must_use]
    pub fn bus(&self) -> &Arc<Bus> {
        &self.bus
    }

    /// Request the full entity listing and wait for it to complete,
    /// mirroring every entity into the local registry along the way.
    ///
    /// # Errors
    /// Returns [`ClientError::AlreadyInProgress`] if a previous call hasn't
    /// finished yet, or [`ClientError::Timeout`] if `timeout` elapses
    /// before `ListEntitiesDoneResponse` arrives.
    pub async fn list_entities(
        &self,
        timeout: Duration,
    ) -> Result<Vec<(Domain, EntityInfo)>, ClientError> {
        let rx = {
            let mut listing = self.listing.lock().await;
            if listing.active {
                return Err(ClientError::AlreadyInProgress);
            }
            listing.active = true;
            listing.entities.clear();
            let (tx, rx) = oneshot::channel();
            listing.completion = Some(tx);
            rx
        };
        self.send(Message::ListEntitiesRequest(ListEntitiesRequest))
            .await?;
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(entities)) => Ok(entities),
            Ok(Err(_)) => Err(ClientError::ConnectionClosed),
            Err(_) => {
                let mut listing = self.listing.lock().await;
                listing.active = false;
                listing.completion = None;
                Err(ClientError::Timeout)
            }
        }
    }

    /// Subscribe to state-change notifications. A second call on an
    /// already-subscribed session is a no-op.
    ///
    /// # Errors
    /// Propagates a transport/catalog failure from the underlying send.
    pub async fn subscribe_states(&self) -> Result<(), ClientError> {
        if self.subscribed_states.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.send(Message::SubscribeStatesRequest(SubscribeStatesRequest))
            .await
    }

    /// Subscribe to log lines at or above `level`, delivered through
    /// [`ClientSession::on_log_line`].
    ///
    /// # Errors
    /// Propagates a transport/catalog failure from the underlying send.
    pub async fn start_logs(&self, level: u8) -> Result<(), ClientError> {
        self.send(Message::SubscribeLogsRequest(SubscribeLogsRequest { level }))
            .await
    }

    /// Register `handler` to observe every [`LogLine`] streamed in by
    /// [`ClientSession::start_logs`].
    ///
    /// # Errors
    /// Returns [`ClientError::Bus`] if the bus's `log_line` signal is
    /// already bound to an incompatible type (unreachable in practice,
    /// since this crate is the only writer of that tag).
    pub fn on_log_line<F, Fut>(&self, handler: F) -> Result<Subscription, ClientError>
    where
        F: Fn(Event<LogLine>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        Ok(self.bus.subscribe_events::<LogLine, _, _>(handler)?)
    }

    /// Request an orderly close.
    ///
    /// # Errors
    /// Propagates a transport/catalog failure from the underlying send.
    pub async fn request_disconnect(&self) -> Result<(), ClientError> {
        self.send(Message::DisconnectRequest(DisconnectRequest)).await
    }

    /// Stop the driver task and release the connection.
    pub async fn close(self) {
        self.cancel.cancel();
        drop(self.tx);
        let _ = self.driver.await;
    }

    async fn send(&self, message: Message) -> Result<(), ClientError> {
        self.tx
            .send(message)
            .await
            .map_err(|_| ClientError::ConnectionClosed)
    }
}

#[allow(clippy::too_many_arguments)]
async fn drive<S>(
    mut link: FrameLink<S>,
    catalog: Catalog,
    mut outbound: mpsc::Receiver<Message>,
    registry: Arc<Registry>,
    bus: Arc<Bus>,
    listing: Arc<Mutex<Listing>>,
    cancel: CancellationToken,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            outgoing = outbound.recv() => {
                let Some(message) = outgoing else { break };
                match catalog.encode_one(&message) {
                    Ok(frame) => {
                        if let Err(err) = link.write_frame(&frame).await {
                            tracing::debug!(?err, "outbound write failed, ending session driver");
                            break;
                        }
                    }
                    Err(err) => tracing::warn!(?err, "failed to encode outbound message"),
                }
            }
            frame = link.read_frame_cancellable(&cancel) => {
                let frame = match frame {
                    Ok(Some(frame)) => frame,
                    Ok(None) => break,
                    Err(err) => {
                        tracing::debug!(?err, "read failed, ending session driver");
                        break;
                    }
                };
                let message = match catalog.decode(&frame) {
                    Ok(message) => message,
                    Err(err) => {
                        tracing::warn!(?err, message_type = frame.message_type, "malformed frame");
                        continue;
                    }
                };
                if handle_inbound(message, &mut link, &catalog, &registry, &bus, &listing).await {
                    break;
                }
            }
        }
    }
}

/// Handle one inbound message; returns `true` if the driver should stop.
async fn handle_inbound<S>(
    message: Message,
    link: &mut FrameLink<S>,
    catalog: &Catalog,
    registry: &Registry,
    bus: &Arc<Bus>,
    listing: &Mutex<Listing>,
) -> bool
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match message {
        Message::ListEntitiesResponse(r) => {
            mirror_entity(registry, bus, listing, r).await;
            false
        }
        Message::ListEntitiesDoneResponse(ListEntitiesDoneResponse) => {
            finish_listing(listing).await;
            false
        }
        Message::StateResponse(r) => {
            apply_state(registry, r).await;
            false
        }
        Message::SubscribeLogsResponse(r) => {
            bus.emit_event(LogLine {
                level: r.level,
                message: r.message,
            })
            .await;
            false
        }
        Message::PingRequest(_) => {
            reply(link, catalog, Message::PingResponse(PingResponse)).await;
            false
        }
        Message::DisconnectRequest(_) => {
            reply(
                link,
                catalog,
                Message::DisconnectResponse(DisconnectResponse),
            )
            .await;
            true
        }
        Message::Acknowledged(_) | Message::PingResponse(_) | Message::DisconnectResponse(_) => false,
        other => {
            tracing::debug!(
                message_type = other.message_type_code(),
                "unexpected message from server, dropping"
            );
            false
        }
    }
}

async fn reply<S>(link: &mut FrameLink<S>, catalog: &Catalog, message: Message)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match catalog.encode_one(&message) {
        Ok(frame) => {
            if let Err(err) = link.write_frame(&frame).await {
                tracing::debug!(?err, "failed to send reply");
            }
        }
        Err(err) => tracing::warn!(?err, "failed to encode reply"),
    }
}

async fn mirror_entity(
    registry: &Registry,
    bus: &Arc<Bus>,
    listing: &Mutex<Listing>,
    response: ListEntitiesResponse,
) {
    let ListEntitiesResponse { domain, info } = response;
    if let Err(err) = registry.create_domain(domain) {
        tracing::warn!(?err, "failed to create mirror domain slot");
        return;
    }
    let state = domain
        .default_state()
        .map(|initial| Arc::new(StateCell::new(info.hash_key, Arc::clone(bus), initial)));
    let record = EntityRecord {
        domain,
        info: info.clone(),
        state,
    };
    match registry.register(domain, record) {
        Ok(()) => {}
        Err(RegistryError::DuplicateKey(_)) => {
            tracing::debug!(object_id = %info.object_id, "entity already mirrored, ignoring re-list");
        }
        Err(err) => tracing::warn!(?err, "failed to mirror entity"),
    }

    let mut listing = listing.lock().await;
    if listing.active {
        listing.entities.push((domain, info));
    }
}

async fn finish_listing(listing: &Mutex<Listing>) {
    let mut listing = listing.lock().await;
    if listing.active {
        listing.active = false;
        if let Some(tx) = listing.completion.take() {
            let _ = tx.send(std::mem::take(&mut listing.entities));
        }
    }
}

async fn apply_state(registry: &Registry, response: StateResponse) {
    match registry.by_key(response.domain, response.key) {
        Ok(Some(record)) => {
            if let Some(cell) = &record.state {
                cell.set(response.state).await;
            }
        }
        Ok(None) => {
            tracing::debug!(
                key = response.key,
                domain = ?response.domain,
                "state update for unknown key, dropping"
            );
        }
        Err(err) => tracing::debug!(?err, "state update for unregistered domain, dropping"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use hearth_proto::messages::{ConnectResponse, HelloResponse};
    use hearth_transport::plaintext;
    use tokio::io::duplex;

    async fn accept_hello_and_connect<S>(
        server: &mut S,
        catalog: &Catalog,
        invalid: bool,
    ) where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let hello = plaintext::read_frame(server).await.expect("hello frame");
        assert!(matches!(catalog.decode(&hello).unwrap(), Message::HelloRequest(_)));
        let connect = plaintext::read_frame(server).await.expect("connect frame");
        assert!(matches!(
            catalog.decode(&connect).unwrap(),
            Message::ConnectRequest(_)
        ));

        plaintext::write_frame(
            server,
            &catalog
                .encode_one(&Message::HelloResponse(HelloResponse {
                    api_version_major: 1,
                    api_version_minor: 10,
                    name: "peer".to_owned(),
                    server_info: "test".to_owned(),
                }))
                .unwrap(),
        )
        .await
        .unwrap();
        plaintext::write_frame(
            server,
            &catalog
                .encode_one(&Message::ConnectResponse(ConnectResponse { invalid }))
                .unwrap(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn connect_succeeds_after_hello_and_connect() {
        let (client_io, mut server_io) = duplex(8192);
        let catalog = Catalog::new();
        let server = tokio::spawn(async move {
            accept_hello_and_connect(&mut server_io, &catalog, false).await;
            server_io
        });

        let session = ClientSession::connect(client_io, "tester", "", None)
            .await
            .expect("connect should succeed");
        server.await.unwrap();
        session.close().await;
    }

    #[tokio::test]
    async fn invalid_password_is_reported() {
        let (client_io, mut server_io) = duplex(8192);
        let catalog = Catalog::new();
        tokio::spawn(async move {
            accept_hello_and_connect(&mut server_io, &catalog, true).await;
        });

        let err = ClientSession::connect(client_io, "tester", "wrong", None)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidPassword));
    }

    #[tokio::test]
    async fn list_entities_mirrors_into_the_local_registry() {
        let (client_io, mut server_io) = duplex(8192);
        let catalog = Catalog::new();
        let server = tokio::spawn(async move {
            accept_hello_and_connect(&mut server_io, &catalog, false).await;

            let list_req = plaintext::read_frame(&mut server_io).await.unwrap();
            assert!(matches!(
                catalog.decode(&list_req).unwrap(),
                Message::ListEntitiesRequest(_)
            ));

            let info = EntityInfo::new("motion", "Motion").unwrap();
            plaintext::write_frame(
                &mut server_io,
                &catalog
                    .encode_one(&Message::ListEntitiesResponse(ListEntitiesResponse {
                        domain: Domain::BinarySensor,
                        info,
                    }))
                    .unwrap(),
            )
            .await
            .unwrap();
            plaintext::write_frame(
                &mut server_io,
                &catalog
                    .encode_one(&Message::ListEntitiesDoneResponse(ListEntitiesDoneResponse))
                    .unwrap(),
            )
            .await
            .unwrap();
            server_io
        });

        let session = ClientSession::connect(client_io, "tester", "", None)
            .await
            .unwrap();
        let entities = session
            .list_entities(Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].0, Domain::BinarySensor);
        assert_eq!(
            session
                .registry()
                .snapshot(Domain::BinarySensor)
                .unwrap()
                .len(),
            1
        );

        server.await.unwrap();
        session.close().await;
    }

    #[tokio::test]
    async fn second_list_entities_while_in_progress_is_rejected() {
        let (client_io, mut server_io) = duplex(8192);
        let catalog = Catalog::new();
        tokio::spawn(async move {
            accept_hello_and_connect(&mut server_io, &catalog, false).await;
            // Never answers ListEntitiesRequest; the server_io lives on so
            // the first call's timeout, not a closed connection, is what
            // would eventually resolve it.
            std::future::pending::<()>().await;
        });

        let session = ClientSession::connect(client_io, "tester", "", None)
            .await
            .unwrap();
        let session = Arc::new(session);
        let first = tokio::spawn({
            let session = Arc::clone(&session);
            async move { session.list_entities(Duration::from_secs(5)).await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = session.list_entities(Duration::from_secs(5)).await;
        assert!(matches!(second, Err(ClientError::AlreadyInProgress)));
        first.abort();
    }

    #[tokio::test]
    async fn subscribe_states_updates_mirrored_entity() {
        let (client_io, mut server_io) = duplex(8192);
        let catalog = Catalog::new();
        let server = tokio::spawn(async move {
            accept_hello_and_connect(&mut server_io, &catalog, false).await;

            let list_req = plaintext::read_frame(&mut server_io).await.unwrap();
            assert!(matches!(
                catalog.decode(&list_req).unwrap(),
                Message::ListEntitiesRequest(_)
            ));
            let info = EntityInfo::new("temp", "Temperature").unwrap();
            let key = info.hash_key;
            plaintext::write_frame(
                &mut server_io,
                &catalog
                    .encode_one(&Message::ListEntitiesResponse(ListEntitiesResponse {
                        domain: Domain::Sensor,
                        info,
                    }))
                    .unwrap(),
            )
            .await
            .unwrap();
            plaintext::write_frame(
                &mut server_io,
                &catalog
                    .encode_one(&Message::ListEntitiesDoneResponse(ListEntitiesDoneResponse))
                    .unwrap(),
            )
            .await
            .unwrap();

            let sub_req = plaintext::read_frame(&mut server_io).await.unwrap();
            assert!(matches!(
                catalog.decode(&sub_req).unwrap(),
                Message::SubscribeStatesRequest(_)
            ));
            plaintext::write_frame(
                &mut server_io,
                &catalog
                    .encode_one(&Message::StateResponse(StateResponse {
                        domain: Domain::Sensor,
                        key,
                        state: hearth_proto::EntityState::Sensor {
                            value: 21.5,
                            missing: false,
                        },
                    }))
                    .unwrap(),
            )
            .await
            .unwrap();
            server_io
        });

        let session = ClientSession::connect(client_io, "tester", "", None)
            .await
            .unwrap();
        session.list_entities(Duration::from_secs(5)).await.unwrap();
        session.subscribe_states().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        let record = session
            .registry()
            .snapshot(Domain::Sensor)
            .unwrap()
            .into_iter()
            .next()
            .unwrap();
        let state = record.state.unwrap().get();
        assert_eq!(
            state,
            hearth_proto::EntityState::Sensor {
                value: 21.5,
                missing: false
            }
        );

        server.await.unwrap();
        session.close().await;
    }
}
