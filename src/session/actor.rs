use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::ingress::{Established, Mailbox, Message, MAILBOX_SIZE};
use super::{ConnectReport, Published, SessionSnapshot, SessionStatus};
use crate::storage::SessionStore;
use crate::transactions::TransportCache;
use crate::wallet::errors::WalletError;
use crate::wallet::guard::NetworkGuard;
use crate::wallet::locator::ProviderLocator;
use crate::wallet::provider::{parse_accounts, parse_chain_id, ProviderEvent, ProviderHandle, RpcRequest};
use crate::wallet::types::{Address, ChainId, WalletState};

type ConnectResponse = oneshot::Sender<Result<ConnectReport, WalletError>>;

/// An account request waiting on the wallet prompt.
struct PendingConnect {
    epoch: u64,
    waiters: Vec<ConnectResponse>,
    task: JoinHandle<()>,
}

/// Owns the wallet connection state. All transitions happen inside
/// [`Actor::run`]. The account request runs in a child task and reports
/// back through the mailbox, so subscribe and disconnect are served while
/// the wallet prompt is open.
pub(crate) struct Actor {
    locator: Arc<ProviderLocator>,
    guard: NetworkGuard,
    store: Arc<dyn SessionStore>,
    cache: Arc<TransportCache>,

    mailbox: mpsc::Receiver<Message>,
    loopback: mpsc::WeakSender<Message>,
    published: watch::Sender<Published>,
    subscribers: Vec<mpsc::UnboundedSender<SessionSnapshot>>,

    status: SessionStatus,
    wallet: Option<WalletState>,
    provider: Option<ProviderHandle>,
    version: u64,
    /// Bumped on every connect and disconnect. Events from an older
    /// connection are dropped.
    epoch: u64,
    forwarder: Option<JoinHandle<()>>,
    pending: Option<PendingConnect>,
}

impl Actor {
    pub(crate) fn new(
        locator: Arc<ProviderLocator>,
        guard: NetworkGuard,
        store: Arc<dyn SessionStore>,
        cache: Arc<TransportCache>,
    ) -> (Self, Mailbox, watch::Receiver<Published>) {
        let (sender, mailbox) = mpsc::channel(MAILBOX_SIZE);
        let mailbox_handle = Mailbox::new(sender);
        let (published, observer) = watch::channel(Published::default());

        let actor = Self {
            locator,
            guard,
            store,
            cache,
            mailbox,
            loopback: mailbox_handle.downgrade(),
            published,
            subscribers: Vec::new(),
            status: SessionStatus::Disconnected,
            wallet: None,
            provider: None,
            version: 0,
            epoch: 0,
            forwarder: None,
            pending: None,
        };
        (actor, mailbox_handle, observer)
    }

    pub(crate) fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        while let Some(message) = self.mailbox.recv().await {
            match message {
                Message::Connect { response } => self.begin_connect(response),
                Message::Established { epoch, result } => self.finish_connect(epoch, result),
                Message::Disconnect { response } => {
                    self.disconnect("requested");
                    let _ = response.send(());
                }
                Message::Subscribe { sender, response } => {
                    if self.status != SessionStatus::Disconnected {
                        let _ = sender.send(self.snapshot());
                    }
                    self.subscribers.push(sender);
                    let _ = response.send(());
                }
                Message::Provider { epoch, event } => {
                    if epoch != self.epoch {
                        debug!("Dropping {:?} from stale connection {}", event, epoch);
                        continue;
                    }
                    self.handle_event(event).await;
                }
            }
        }

        debug!("Session mailbox closed, stopping actor");
        if let Some(pending) = self.pending.take() {
            pending.task.abort();
        }
        self.detach_listener();
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            version: self.version,
            status: self.status,
            wallet: self.wallet.clone(),
        }
    }

    fn publish(&mut self) {
        self.version += 1;
        let snapshot = self.snapshot();
        debug!(
            "Publishing session v{} ({:?}) to {} subscriber(s)",
            snapshot.version,
            snapshot.status,
            self.subscribers.len()
        );

        self.published.send_replace(Published {
            snapshot: snapshot.clone(),
            provider: self.provider.clone(),
        });
        self.subscribers
            .retain(|subscriber| subscriber.send(snapshot.clone()).is_ok());
    }

    fn persist(&self, wallet: &WalletState) {
        if let Err(e) = self.store.save(wallet) {
            warn!("Failed to persist wallet session: {}", e);
        }
    }

    fn begin_connect(&mut self, response: ConnectResponse) {
        if let (SessionStatus::Connected, Some(wallet)) = (self.status, &self.wallet) {
            debug!("Already connected as {}", wallet.address.short());
            let _ = response.send(Ok(ConnectReport {
                wallet: wallet.clone(),
                warnings: Vec::new(),
            }));
            return;
        }

        if let Some(pending) = self.pending.as_mut() {
            debug!("Connect {} already waiting on the wallet", pending.epoch);
            pending.waiters.push(response);
            return;
        }

        self.detach_listener();
        self.epoch += 1;
        self.provider = None;
        self.wallet = None;
        self.status = SessionStatus::Connecting;
        self.publish();

        let epoch = self.epoch;
        let locator = self.locator.clone();
        let guard = self.guard.clone();
        let loopback = self.loopback.clone();
        let task = tokio::spawn(async move {
            let result = establish(&locator, &guard).await;
            if let Some(sender) = loopback.upgrade() {
                let _ = sender.send(Message::Established { epoch, result }).await;
            }
        });

        self.pending = Some(PendingConnect {
            epoch,
            waiters: vec![response],
            task,
        });
    }

    fn finish_connect(&mut self, epoch: u64, result: Result<Established, WalletError>) {
        let pending = match self.pending.take() {
            Some(pending) if pending.epoch == epoch => pending,
            other => {
                debug!("Dropping result of abandoned connect {}", epoch);
                self.pending = other;
                return;
            }
        };

        let outcome = match result {
            Ok(Established {
                handle,
                wallet,
                warnings,
            }) => {
                self.persist(&wallet);
                self.cache.invalidate();
                self.attach_listener(&handle);

                info!(
                    "Connected {} on chain {} via {}",
                    wallet.address.short(),
                    wallet.chain_id,
                    handle.kind()
                );
                self.provider = Some(handle);
                self.wallet = Some(wallet.clone());
                self.status = SessionStatus::Connected;
                self.publish();

                Ok(ConnectReport { wallet, warnings })
            }
            Err(err) => {
                warn!("Connect failed: {}", err);
                self.status = SessionStatus::Disconnected;
                self.publish();
                Err(err)
            }
        };

        for waiter in pending.waiters {
            let _ = waiter.send(outcome.clone());
        }
    }

    fn disconnect(&mut self, reason: &str) {
        info!("Disconnecting wallet ({})", reason);
        if let Some(pending) = self.pending.take() {
            debug!("Abandoning connect {} still waiting on the wallet", pending.epoch);
            pending.task.abort();
            for waiter in pending.waiters {
                let _ = waiter.send(Err(WalletError::ConnectCancelled));
            }
        }
        self.detach_listener();
        self.epoch += 1;
        self.provider = None;
        self.wallet = None;
        self.status = SessionStatus::Disconnected;
        if let Err(e) = self.store.clear() {
            warn!("Failed to clear stored wallet session: {}", e);
        }
        self.cache.invalidate();
        self.publish();
    }

    async fn handle_event(&mut self, event: ProviderEvent) {
        match event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.first() {
                None => self.disconnect("wallet revoked all accounts"),
                Some(address) => self.change_address(address.clone()),
            },
            ProviderEvent::ChainChanged(chain_id) => self.change_chain(chain_id).await,
            ProviderEvent::Disconnect => self.disconnect("provider disconnected"),
        }
    }

    fn change_address(&mut self, address: Address) {
        let Some(current) = &self.wallet else {
            debug!("Ignoring account change while not connected");
            return;
        };

        let next = current.with_address(address);
        debug!("Account changed to {}", next.address.short());
        self.persist(&next);
        self.wallet = Some(next);
        self.publish();
    }

    async fn change_chain(&mut self, chain_id: ChainId) {
        self.cache.invalidate();

        let (Some(current), Some(handle)) = (self.wallet.clone(), self.provider.clone()) else {
            debug!("Ignoring chain change while not connected");
            return;
        };

        if let Err(e) = self.guard.check_mandatory(&handle, &chain_id).await {
            warn!("Chain switch to {} failed validation: {}", chain_id, e);
            self.disconnect("unvalidated chain switch");
            return;
        }

        let next = current.with_chain(chain_id);
        info!("Chain changed to {}", next.chain_id);
        self.persist(&next);
        self.wallet = Some(next);
        self.publish();
    }

    fn attach_listener(&mut self, handle: &ProviderHandle) {
        self.detach_listener();

        let mut events = handle.events();
        let loopback = self.loopback.clone();
        let epoch = self.epoch;

        self.forwarder = Some(tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Missed {} provider event(s)", skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };

                let Some(sender) = loopback.upgrade() else {
                    break;
                };
                if sender.send(Message::Provider { epoch, event }).await.is_err() {
                    break;
                }
            }
        }));
    }

    fn detach_listener(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}

async fn establish(locator: &ProviderLocator, guard: &NetworkGuard) -> Result<Established, WalletError> {
    let handle = locator.locate().into_result()?;

    // No timeout here: the wallet may sit on its approval prompt for as
    // long as the user likes.
    let accounts = handle.request(RpcRequest::request_accounts()).await?;
    let address = first_account(&accounts)?.ok_or(WalletError::NoAccounts)?;

    let chain = handle.request(RpcRequest::chain_id()).await?;
    let chain_id = parse_chain_id(&chain).map_err(|e| WalletError::InvalidResponse(e.message))?;

    let warnings = guard.check_advisory(&handle, &chain_id).await;
    Ok(Established {
        handle,
        wallet: WalletState::connected(address, chain_id),
        warnings,
    })
}

fn first_account(value: &serde_json::Value) -> Result<Option<Address>, WalletError> {
    let accounts = parse_accounts(value).map_err(|e| WalletError::InvalidResponse(e.message))?;
    Ok(accounts.into_iter().next())
}
