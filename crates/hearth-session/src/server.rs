// SPDX-License-Identifier: Apache-2.0
//! The server-side per-connection driver: runs the transport handshake
//! then the session state machine until the connection closes.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use hearth_bus::Event;
use hearth_config::{NodeConfig, PasswordCheck};
use hearth_node::Context;
use hearth_proto::messages::GetTimeResponse;
use hearth_proto::{Catalog, Frame, Message, Source};
use hearth_registry::StateChange;
use hearth_transport::noise::{self, NoiseSession, Psk};
use hearth_transport::{SharedNoiseSession, TransportError};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::connection::{ConnectionInfo, FrameReader, FrameWriter};
use crate::error::SessionError;
use crate::identity::{device_info_response, hello_response};
use crate::logging::{self, LogMessage};
use crate::services::dispatch_command;
use crate::state::SessionState;
use crate::watchdog::with_keepalive;

const OUTBOUND_QUEUE_DEPTH: usize = 64;

/// Run one accepted connection to completion: perform the configured
/// transport handshake, then drive the session state machine until the
/// peer disconnects, a protocol violation occurs, or `cancel` fires.
///
/// `psk` is only consulted when `config.api.encryption` is set; the
/// caller is expected to have already decoded it from config.
///
/// # Errors
/// Returns the terminating [`SessionError`]. [`SessionError::CloseConnection`]
/// indicates an orderly close, not a failure.
pub async fn run_session<S>(
    stream: S,
    config: Arc<NodeConfig>,
    psk: Option<Psk>,
    password_check: Arc<dyn PasswordCheck>,
    ctx: Context,
    cancel: CancellationToken,
) -> Result<(), SessionError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut raw_r, mut raw_w) = tokio::io::split(stream);

    let (reader, writer) = if let Some(psk) = psk {
        let state = noise::server_handshake(&mut raw_r, &mut raw_w, &psk, &config.name).await?;
        let shared = SharedNoiseSession::new(NoiseSession::new(state));
        (
            FrameReader::Noise(raw_r, shared.clone()),
            FrameWriter::Noise(raw_w, shared),
        )
    } else {
        (
            FrameReader::Plaintext(raw_r),
            FrameWriter::Plaintext(raw_w),
        )
    };

    run_ready_session(reader, writer, &config, password_check, ctx, cancel).await
}

async fn run_ready_session<R, W>(
    mut reader: FrameReader<R>,
    mut writer: FrameWriter<W>,
    config: &NodeConfig,
    password_check: Arc<dyn PasswordCheck>,
    ctx: Context,
    cancel: CancellationToken,
) -> Result<(), SessionError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<Frame>(OUTBOUND_QUEUE_DEPTH);
    let writer_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if let Err(err) = writer.send(&frame).await {
                tracing::debug!(?err, "outbound write failed, ending writer task");
                break;
            }
        }
    });

    let catalog = Catalog::new();
    let mut state = SessionState::Start;
    let mut conn = ConnectionInfo::default();
    let mut state_subscription: Option<hearth_bus::Subscription> = None;
    let mut log_subscription: Option<hearth_bus::Subscription> = None;

    let result = loop {
        if state == SessionState::Disconnecting || state == SessionState::Closed {
            break Ok(());
        }
        let frame = tokio::select! {
            biased;
            () = cancel.cancelled() => break Ok(()),
            read = with_keepalive(reader.recv()) => read,
        };
        let frame = match frame {
            Ok(frame) => frame,
            Err(SessionError::Transport(TransportError::ShortRead)) => break Ok(()),
            Err(err) => break Err(err),
        };

        let message = match catalog.decode(&frame) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(?err, message_type = frame.message_type, "malformed frame");
                logging::log(
                    &ctx.bus,
                    3,
                    format!("malformed frame (type {}): {err}", frame.message_type),
                )
                .await;
                continue;
            }
        };

        if matches!(message.source(), Source::Server) {
            break Err(SessionError::UnexpectedMessage {
                state: state.label(),
                message_type: frame.message_type,
            });
        }

        match handle_message(
            message,
            frame.message_type,
            &mut state,
            &mut conn,
            &mut state_subscription,
            &mut log_subscription,
            config,
            &password_check,
            &ctx,
            &catalog,
            &tx,
        )
        .await
        {
            Ok(()) => {}
            Err(SessionError::CloseConnection) => break Ok(()),
            Err(err) => break Err(err),
        }
    };

    drop(state_subscription);
    drop(log_subscription);
    drop(tx);
    let _ = writer_task.await;
    result
}

#[allow(clippy::too_many_arguments)]
async fn handle_message(
    message: Message,
    message_type: u16,
    state: &mut SessionState,
    conn: &mut ConnectionInfo,
    state_subscription: &mut Option<hearth_bus::Subscription>,
    log_subscription: &mut Option<hearth_bus::Subscription>,
    config: &NodeConfig,
    password_check: &Arc<dyn PasswordCheck>,
    ctx: &Context,
    catalog: &Catalog,
    tx: &mpsc::Sender<Frame>,
) -> Result<(), SessionError> {
    match message {
        Message::HelloRequest(req) => {
            if *state == SessionState::Start {
                *state = SessionState::Connecting;
            }
            conn.client_info = req.client_info;
            send(tx, catalog, Message::HelloResponse(hello_response(config))).await
        }
        Message::ConnectRequest(req) => {
            let valid = password_check.check(&req.password);
            if valid {
                conn.authenticated = true;
                *state = SessionState::Ready;
            }
            send(
                tx,
                catalog,
                Message::ConnectResponse(hearth_proto::messages::ConnectResponse {
                    invalid: !valid,
                }),
            )
            .await
        }
        Message::PingRequest(_) => {
            send(
                tx,
                catalog,
                Message::PingResponse(hearth_proto::messages::PingResponse),
            )
            .await
        }
        Message::GetTimeRequest(_) => {
            let epoch_seconds = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default();
            send(
                tx,
                catalog,
                Message::GetTimeResponse(GetTimeResponse { epoch_seconds }),
            )
            .await
        }
        Message::DeviceInfoRequest(_) => {
            send(
                tx,
                catalog,
                Message::DeviceInfoResponse(device_info_response(config)),
            )
            .await
        }
        Message::ListEntitiesRequest(_) => {
            if !state.is_authenticated_ready(conn.authenticated) {
                return Err(SessionError::UnauthenticatedAccess);
            }
            list_entities(ctx, catalog, tx).await
        }
        Message::SubscribeStatesRequest(_) => {
            if !state.is_authenticated_ready(conn.authenticated) {
                return Err(SessionError::UnauthenticatedAccess);
            }
            if conn.subscribed_states {
                return Ok(());
            }
            let subscription = subscribe_states(ctx, catalog, tx).await?;
            *state_subscription = Some(subscription);
            conn.subscribed_states = true;
            Ok(())
        }
        Message::Command(command) => {
            if *state != SessionState::Ready {
                return Err(SessionError::UnexpectedMessage {
                    state: state.label(),
                    message_type,
                });
            }
            dispatch_command(&ctx.bus, command).await;
            Ok(())
        }
        Message::DisconnectRequest(_) => {
            *state = SessionState::Disconnecting;
            send(
                tx,
                catalog,
                Message::DisconnectResponse(hearth_proto::messages::DisconnectResponse),
            )
            .await?;
            Err(SessionError::CloseConnection)
        }
        Message::Acknowledged(_) | Message::PingResponse(_) | Message::DisconnectResponse(_) => {
            // Both-sourced messages the client may legitimately send
            // unsolicited (e.g. a peer-initiated ping reply); nothing to do.
            Ok(())
        }
        Message::SubscribeLogsRequest(req) => {
            if !state.is_authenticated_ready(conn.authenticated) {
                return Err(SessionError::UnauthenticatedAccess);
            }
            if conn.subscribed_logs {
                return Ok(());
            }
            let subscription = subscribe_logs(ctx, catalog, tx, req.level)?;
            *log_subscription = Some(subscription);
            conn.subscribed_logs = true;
            Ok(())
        }
        other => Err(SessionError::UnexpectedMessage {
            state: state.label(),
            message_type: other.message_type_code(),
        }),
    }
}

async fn send(tx: &mpsc::Sender<Frame>, catalog: &Catalog, message: Message) -> Result<(), SessionError> {
    let frame = catalog.encode_one(&message)?;
    let _ = tx.send(frame).await;
    Ok(())
}

async fn list_entities(
    ctx: &Context,
    catalog: &Catalog,
    tx: &mpsc::Sender<Frame>,
) -> Result<(), SessionError> {
    for (domain, record) in ctx.registry.iter_all() {
        if record.info.internal {
            continue;
        }
        send(
            tx,
            catalog,
            Message::ListEntitiesResponse(hearth_proto::messages::ListEntitiesResponse {
                domain,
                info: record.info,
            }),
        )
        .await?;
    }
    send(
        tx,
        catalog,
        Message::ListEntitiesDoneResponse(hearth_proto::messages::ListEntitiesDoneResponse),
    )
    .await
}

fn subscribe_logs(
    ctx: &Context,
    catalog: &Catalog,
    tx: &mpsc::Sender<Frame>,
    level: u8,
) -> Result<hearth_bus::Subscription, SessionError> {
    let tx = tx.clone();
    let catalog = *catalog;
    let subscription = ctx.bus.subscribe_events::<LogMessage, _, _>(move |event: Event<LogMessage>| {
        let tx = tx.clone();
        let catalog = catalog;
        async move {
            if event.data.level < level {
                return;
            }
            let message = Message::SubscribeLogsResponse(hearth_proto::messages::SubscribeLogsResponse {
                level: event.data.level,
                message: event.data.message,
            });
            if let Ok(frame) = catalog.encode_one(&message) {
                let _ = tx.send(frame).await;
            }
        }
    })?;
    Ok(subscription)
}

async fn subscribe_states(
    ctx: &Context,
    catalog: &Catalog,
    tx: &mpsc::Sender<Frame>,
) -> Result<hearth_bus::Subscription, SessionError> {
    let mut domain_by_key = std::collections::HashMap::new();
    for (domain, record) in ctx.registry.iter_all() {
        if record.info.internal {
            continue;
        }
        let Some(cell) = &record.state else {
            continue;
        };
        domain_by_key.insert(record.hash_key(), domain);
        send(
            tx,
            catalog,
            Message::StateResponse(hearth_proto::messages::StateResponse {
                domain,
                key: record.hash_key(),
                state: cell.get(),
            }),
        )
        .await?;
    }

    let tx = tx.clone();
    let catalog = *catalog;
    let domain_by_key = Arc::new(domain_by_key);
    let subscription = ctx.bus.subscribe_events::<StateChange<hearth_proto::EntityState>, _, _>(
        move |event: Event<StateChange<hearth_proto::EntityState>>| {
            let tx = tx.clone();
            let catalog = catalog;
            let domain_by_key = Arc::clone(&domain_by_key);
            async move {
                let Some(&domain) = domain_by_key.get(&event.data.key) else {
                    tracing::debug!(key = event.data.key, "state change for unknown key, dropping");
                    return;
                };
                let message = Message::StateResponse(hearth_proto::messages::StateResponse {
                    domain,
                    key: event.data.key,
                    state: event.data.new,
                });
                if let Ok(frame) = catalog.encode_one(&message) {
                    let _ = tx.send(frame).await;
                }
            }
        },
    )?;
    Ok(subscription)
}
