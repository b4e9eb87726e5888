//! Wallet session: the single source of truth for "connected as whom, on
//! which chain".
//!
//! [`WalletSession`] is a cheap handle onto an actor task. Requests
//! (`connect`, `disconnect`, `subscribe`) and provider-pushed events travel
//! through one mailbox and are applied strictly in order. The wallet's
//! approval prompt is awaited off the mailbox, so it never blocks them. Every transition
//! publishes a fresh, versioned [`SessionSnapshot`]; nothing outside the actor
//! can mutate session state.

mod actor;
mod ingress;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::config::RestorePolicy;
use crate::storage::SessionStore;
use crate::transactions::TransportCache;
use crate::wallet::errors::WalletError;
use crate::wallet::guard::NetworkGuard;
use crate::wallet::locator::ProviderLocator;
use crate::wallet::provider::ProviderHandle;
use crate::wallet::types::WalletState;

use actor::Actor;
use ingress::Mailbox;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Immutable point-in-time copy of session state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Increments on every publication.
    pub version: u64,
    pub status: SessionStatus,
    pub wallet: Option<WalletState>,
}

impl SessionSnapshot {
    pub fn is_connected(&self) -> bool {
        self.status == SessionStatus::Connected && self.wallet.is_some()
    }
}

/// Result of a successful connect. `warnings` holds the advisory network
/// checks that failed; they do not prevent the connection.
#[derive(Debug, Clone)]
pub struct ConnectReport {
    pub wallet: WalletState,
    pub warnings: Vec<WalletError>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Published {
    snapshot: SessionSnapshot,
    provider: Option<ProviderHandle>,
}

/// Stream of snapshots for one subscriber. Dropping it unsubscribes.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<SessionSnapshot>,
}

impl Subscription {
    /// Next published snapshot, or `None` once the session has shut down.
    pub async fn next(&mut self) -> Option<SessionSnapshot> {
        self.receiver.recv().await
    }

    /// A snapshot that has already been published, without waiting.
    pub fn try_next(&mut self) -> Option<SessionSnapshot> {
        self.receiver.try_recv().ok()
    }

    pub fn unsubscribe(mut self) {
        self.receiver.close();
    }
}

/// Handle onto the session actor. Clones share the same session.
#[derive(Clone)]
pub struct WalletSession {
    mailbox: Mailbox,
    observer: watch::Receiver<Published>,
    restored: Option<WalletState>,
}

impl WalletSession {
    /// Apply the restore policy to whatever is stored and spawn the session
    /// actor. Must be called from within a Tokio runtime.
    pub fn start(
        locator: Arc<ProviderLocator>,
        guard: NetworkGuard,
        store: Arc<dyn SessionStore>,
        cache: Arc<TransportCache>,
        policy: RestorePolicy,
    ) -> Self {
        let restored = match policy {
            RestorePolicy::Discard => {
                if let Err(e) = store.clear() {
                    warn!("Failed to discard stored wallet session: {}", e);
                }
                None
            }
            RestorePolicy::Advisory => match store.load() {
                Ok(hint) => {
                    if let Some(wallet) = &hint {
                        debug!("Restored advisory session hint for {}", wallet.address.short());
                    }
                    hint
                }
                Err(e) => {
                    warn!("Failed to load stored wallet session: {}", e);
                    None
                }
            },
        };

        let (actor, mailbox, observer) = Actor::new(locator, guard, store, cache);
        actor.start();

        Self {
            mailbox,
            observer,
            restored,
        }
    }

    /// Locate the provider, request account access and publish the connected
    /// snapshot. May wait indefinitely on the wallet's approval prompt; a
    /// [`disconnect`](Self::disconnect) meanwhile ends it with
    /// [`WalletError::ConnectCancelled`]. Concurrent calls share one prompt.
    pub async fn connect(&self) -> Result<ConnectReport, WalletError> {
        self.mailbox.connect().await
    }

    /// Always succeeds locally; the only error is a session that has shut down.
    pub async fn disconnect(&self) -> Result<(), WalletError> {
        self.mailbox.disconnect().await
    }

    /// Register a subscriber. When a session is connecting or connected its
    /// current snapshot is the first item delivered.
    pub async fn subscribe(&self) -> Result<Subscription, WalletError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.mailbox.subscribe(sender).await?;
        Ok(Subscription { receiver })
    }

    /// Latest published snapshot.
    pub fn current(&self) -> SessionSnapshot {
        self.observer.borrow().snapshot.clone()
    }

    /// Connected wallet state, if any.
    pub fn wallet(&self) -> Option<WalletState> {
        let published = self.observer.borrow();
        if published.snapshot.is_connected() {
            published.snapshot.wallet.clone()
        } else {
            None
        }
    }

    /// Provider of the current connection.
    pub fn active_provider(&self) -> Option<ProviderHandle> {
        self.observer.borrow().provider.clone()
    }

    /// Snapshot loaded from storage under [`RestorePolicy::Advisory`]. Display
    /// only; it is never treated as a live connection.
    pub fn restored_hint(&self) -> Option<&WalletState> {
        self.restored.as_ref()
    }
}
