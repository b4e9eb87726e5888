use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::session::{ConnectReport, SessionSnapshot};
use crate::wallet::errors::WalletError;
use crate::wallet::provider::{ProviderEvent, ProviderHandle};
use crate::wallet::types::WalletState;

/// Capacity of the session mailbox.
pub(crate) const MAILBOX_SIZE: usize = 64;

/// Messages processed one at a time, in arrival order, by the session actor.
pub(crate) enum Message {
    Connect {
        response: oneshot::Sender<Result<ConnectReport, WalletError>>,
    },
    Disconnect {
        response: oneshot::Sender<()>,
    },
    Subscribe {
        sender: mpsc::UnboundedSender<SessionSnapshot>,
        response: oneshot::Sender<()>,
    },
    /// An event pushed by the provider attached during connection `epoch`.
    Provider { epoch: u64, event: ProviderEvent },
    /// Outcome of the account request started for connection `epoch`.
    Established {
        epoch: u64,
        result: Result<Established, WalletError>,
    },
}

/// A provider that granted account access and passed the advisory checks.
pub(crate) struct Established {
    pub(crate) handle: ProviderHandle,
    pub(crate) wallet: WalletState,
    pub(crate) warnings: Vec<WalletError>,
}

/// Sending half of the session mailbox.
#[derive(Clone)]
pub(crate) struct Mailbox {
    sender: mpsc::Sender<Message>,
}

impl Mailbox {
    pub(crate) fn new(sender: mpsc::Sender<Message>) -> Self {
        Self { sender }
    }

    pub(crate) async fn connect(&self) -> Result<ConnectReport, WalletError> {
        let (response, receiver) = oneshot::channel();
        if self.sender.send(Message::Connect { response }).await.is_err() {
            warn!("session mailbox closed; connect dropped");
            return Err(WalletError::SessionClosed);
        }
        receiver.await.map_err(|_| WalletError::SessionClosed)?
    }

    pub(crate) async fn disconnect(&self) -> Result<(), WalletError> {
        let (response, receiver) = oneshot::channel();
        if self
            .sender
            .send(Message::Disconnect { response })
            .await
            .is_err()
        {
            warn!("session mailbox closed; disconnect dropped");
            return Err(WalletError::SessionClosed);
        }
        receiver.await.map_err(|_| WalletError::SessionClosed)
    }

    pub(crate) async fn subscribe(
        &self,
        sender: mpsc::UnboundedSender<SessionSnapshot>,
    ) -> Result<(), WalletError> {
        let (response, receiver) = oneshot::channel();
        if self
            .sender
            .send(Message::Subscribe { sender, response })
            .await
            .is_err()
        {
            warn!("session mailbox closed; subscribe dropped");
            return Err(WalletError::SessionClosed);
        }
        receiver.await.map_err(|_| WalletError::SessionClosed)
    }

    pub(crate) fn downgrade(&self) -> mpsc::WeakSender<Message> {
        self.sender.downgrade()
    }
}
