// SPDX-License-Identifier: Apache-2.0
//! The `"api"` component: binds the ESPHome-Native-API-compatible listener
//! and spawns one [`hearth_session::run_session`] per accepted connection.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hearth_config::{ApiConfig, BcryptPasswordCheck, NodeConfig, OpenAccess, PasswordCheck};
use hearth_node::{Component, Context, InitializationPriority};
use hearth_transport::noise::{validate_psk, Psk};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;

/// Decode and validate `api.encryption.key`, if set. Absent encryption
/// selects the plaintext transport for every accepted connection.
fn resolve_psk(api: &ApiConfig) -> Result<Option<Psk>, ServiceError> {
    let Some(encryption) = &api.encryption else {
        return Ok(None);
    };
    let bytes = STANDARD.decode(&encryption.key)?;
    let len = bytes.len();
    validate_psk(&bytes)
        .map(Some)
        .map_err(|_source| ServiceError::BadKeyLength(len))
}

/// Build the connect-password validator from `api.password`: bcrypt-hash a
/// configured plaintext password, or accept everything if none is set.
fn resolve_password_check(api: &ApiConfig) -> Result<Arc<dyn PasswordCheck>, ServiceError> {
    match &api.password {
        Some(password) => Ok(Arc::new(BcryptPasswordCheck::hash(password)?)),
        None => Ok(Arc::new(OpenAccess)),
    }
}

/// The ESPHome-Native-API-compatible TCP listener, run as a node component
/// so it participates in the ordinary startup/shutdown lifecycle.
pub struct ApiServer {
    config: Arc<NodeConfig>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl ApiServer {
    /// Build a server around `config`. Nothing is bound until `setup()`
    /// runs.
    #[must_use]
    pub fn new(config: Arc<NodeConfig>) -> Self {
        Self {
            config,
            accept_task: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Component for ApiServer {
    fn name(&self) -> &str {
        "api"
    }

    fn priority(&self) -> InitializationPriority {
        InitializationPriority::AfterWifi
    }

    async fn setup(&self, ctx: &Context) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let psk = resolve_psk(&self.config.api)?;
        let password_check = resolve_password_check(&self.config.api)?;

        let address = format!("{}:{}", self.config.api.address, self.config.api.port);
        let listener =
            TcpListener::bind(&address)
                .await
                .map_err(|source| ServiceError::Bind {
                    address: address.clone(),
                    source,
                })?;
        tracing::info!(%address, "api server listening");

        let config = Arc::clone(&self.config);
        let ctx = ctx.clone();
        let cancel = ctx.root_cancellation.child_token();
        let accept_cancel = cancel.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = accept_cancel.cancelled() => break,
                    accepted = listener.accept() => {
                        let (stream, peer) = match accepted {
                            Ok(accepted) => accepted,
                            Err(err) => {
                                tracing::warn!(error = %err, "api server accept failed");
                                continue;
                            }
                        };
                        tracing::debug!(%peer, "api client connected");
                        let config = Arc::clone(&config);
                        let psk = psk;
                        let password_check = Arc::clone(&password_check);
                        let ctx = ctx.clone();
                        let session_cancel = accept_cancel.child_token();
                        tokio::spawn(async move {
                            if let Err(err) = hearth_session::run_session(
                                stream,
                                config,
                                psk,
                                password_check,
                                ctx,
                                session_cancel,
                            )
                            .await
                            {
                                tracing::debug!(%peer, error = %err, "api session ended");
                            }
                        });
                    }
                }
            }
        });

        *self
            .accept_task
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    async fn close(&self, ctx: &Context) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let _ = ctx;
        let task = self
            .accept_task
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            let _ = task.await;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use hearth_config::EncryptionConfig;

    fn base_api() -> ApiConfig {
        ApiConfig {
            address: "127.0.0.1".to_owned(),
            port: 0,
            password: None,
            encryption: None,
        }
    }

    #[test]
    fn no_encryption_resolves_to_plaintext() {
        assert!(resolve_psk(&base_api()).unwrap().is_none());
    }

    #[test]
    fn valid_encryption_key_resolves_to_a_psk() {
        let key = STANDARD.encode([7u8; 32]);
        let api = ApiConfig {
            encryption: Some(EncryptionConfig { key }),
            ..base_api()
        };
        assert!(resolve_psk(&api).unwrap().is_some());
    }

    #[test]
    fn short_encryption_key_is_rejected() {
        let key = STANDARD.encode([7u8; 16]);
        let api = ApiConfig {
            encryption: Some(EncryptionConfig { key }),
            ..base_api()
        };
        assert!(matches!(
            resolve_psk(&api),
            Err(ServiceError::BadKeyLength(16))
        ));
    }

    #[test]
    fn malformed_base64_key_is_rejected() {
        let api = ApiConfig {
            encryption: Some(EncryptionConfig {
                key: "not base64!!".to_owned(),
            }),
            ..base_api()
        };
        assert!(matches!(
            resolve_psk(&api),
            Err(ServiceError::BadKeyEncoding(_))
        ));
    }

    #[test]
    fn no_password_is_open_access() {
        let checker = resolve_password_check(&base_api()).unwrap();
        assert!(checker.check("anything"));
    }

    #[test]
    fn configured_password_is_bcrypt_checked() {
        let api = ApiConfig {
            password: Some("hunter2".to_owned()),
            ..base_api()
        };
        let checker = resolve_password_check(&api).unwrap();
        assert!(checker.check("hunter2"));
        assert!(!checker.check("wrong"));
    }
}
