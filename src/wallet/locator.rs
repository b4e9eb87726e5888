//! Provider discovery.
//!
//! Wallet extensions inject themselves into one shared namespace and several
//! of them claim to be MetaMask so dapps keep working. The locator walks every
//! injected candidate and applies a ranked list of capability predicates; the
//! first predicate that matches exactly one candidate wins. Two or more
//! equally qualified candidates are reported as ambiguous instead of picking
//! one arbitrarily.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use crate::wallet::errors::WalletError;
use crate::wallet::provider::{same_object, ProviderHandle, ProviderInfo, WalletProvider};
use crate::wallet::types::WalletKind;

/// The shapes the shared injection namespace can take.
#[derive(Clone, Default)]
pub enum InjectedProviders {
    #[default]
    Absent,
    Single(Arc<dyn WalletProvider>),
    List(Vec<Arc<dyn WalletProvider>>),
    /// A primary object that also exposes a `providers` list, which usually
    /// repeats the primary.
    Nested {
        primary: Arc<dyn WalletProvider>,
        providers: Vec<Arc<dyn WalletProvider>>,
    },
}

impl InjectedProviders {
    /// Flatten into a candidate list, de-duplicated by object identity.
    pub fn candidates(&self) -> Vec<Arc<dyn WalletProvider>> {
        let raw: Vec<Arc<dyn WalletProvider>> = match self {
            InjectedProviders::Absent => Vec::new(),
            InjectedProviders::Single(provider) => vec![provider.clone()],
            InjectedProviders::List(providers) => providers.clone(),
            InjectedProviders::Nested { primary, providers } => {
                let mut all = providers.clone();
                all.push(primary.clone());
                all
            }
        };

        let mut unique: Vec<Arc<dyn WalletProvider>> = Vec::with_capacity(raw.len());
        for candidate in raw {
            if !unique.iter().any(|seen| same_object(seen, &candidate)) {
                unique.push(candidate);
            }
        }
        unique
    }
}

/// The global namespace providers are injected into.
pub trait ProviderSource: Send + Sync {
    fn injected(&self) -> InjectedProviders;
}

/// In-process injection point. Embedders (and the CLI) place providers here.
#[derive(Default)]
pub struct StaticInjection {
    injected: Mutex<InjectedProviders>,
}

impl StaticInjection {
    pub fn new(injected: InjectedProviders) -> Self {
        Self {
            injected: Mutex::new(injected),
        }
    }

    pub fn single(provider: Arc<dyn WalletProvider>) -> Self {
        Self::new(InjectedProviders::Single(provider))
    }

    /// Replace what is injected, as an extension being enabled or removed would.
    pub fn set(&self, injected: InjectedProviders) {
        match self.injected.lock() {
            Ok(mut slot) => *slot = injected,
            Err(poisoned) => *poisoned.into_inner() = injected,
        }
    }
}

impl ProviderSource for StaticInjection {
    fn injected(&self) -> InjectedProviders {
        match self.injected.lock() {
            Ok(slot) => slot.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Outcome of one discovery pass.
#[derive(Debug, Clone)]
pub enum LocateResult {
    Found(ProviderHandle),
    Ambiguous {
        required: WalletKind,
        candidates: Vec<ProviderHandle>,
    },
    NotFound {
        required: WalletKind,
        /// Other known wallet kinds that were injected.
        detected: Vec<WalletKind>,
    },
}

impl LocateResult {
    pub fn into_handle(self) -> Option<ProviderHandle> {
        match self {
            LocateResult::Found(handle) => Some(handle),
            _ => None,
        }
    }

    /// Turn a miss into the error shown to the user.
    pub fn into_result(self) -> Result<ProviderHandle, WalletError> {
        match self {
            LocateResult::Found(handle) => Ok(handle),
            LocateResult::Ambiguous {
                required,
                candidates,
            } => Err(WalletError::AmbiguousProvider {
                required,
                candidates: candidates.len(),
            }),
            LocateResult::NotFound { required, detected } => {
                Err(WalletError::ProviderUnavailable { required, detected })
            }
        }
    }
}

type Predicate = fn(&ProviderInfo, WalletKind) -> bool;

fn exclusive_with_namespace(info: &ProviderInfo, kind: WalletKind) -> bool {
    info.claims_exclusively(kind) && info.vendor_namespace
}

fn exclusive(info: &ProviderInfo, kind: WalletKind) -> bool {
    info.claims_exclusively(kind)
}

/// Strongest evidence first.
const RANKED_PREDICATES: [(&str, Predicate); 2] = [
    ("exclusive claim with vendor namespace", exclusive_with_namespace),
    ("exclusive claim", exclusive),
];

pub struct ProviderLocator {
    source: Arc<dyn ProviderSource>,
    required: WalletKind,
    last_good: Mutex<Option<ProviderHandle>>,
}

impl ProviderLocator {
    pub fn new(source: Arc<dyn ProviderSource>, required: WalletKind) -> Self {
        Self {
            source,
            required,
            last_good: Mutex::new(None),
        }
    }

    pub fn required(&self) -> WalletKind {
        self.required
    }

    /// The handle returned by the most recent successful [`locate`](Self::locate).
    pub fn last_good(&self) -> Option<ProviderHandle> {
        self.last_good.lock().ok().and_then(|slot| slot.clone())
    }

    /// Run discovery against the current contents of the namespace. Never
    /// fails; safe to call repeatedly.
    pub fn locate(&self) -> LocateResult {
        let candidates: Vec<(Arc<dyn WalletProvider>, ProviderInfo)> = self
            .source
            .injected()
            .candidates()
            .into_iter()
            .map(|provider| {
                let info = provider.info();
                (provider, info)
            })
            .collect();

        debug!(
            "Locating {} among {} injected provider(s)",
            self.required,
            candidates.len()
        );

        for (label, predicate) in RANKED_PREDICATES.iter() {
            let matches: Vec<&Arc<dyn WalletProvider>> = candidates
                .iter()
                .filter(|(_, info)| predicate(info, self.required))
                .map(|(provider, _)| provider)
                .collect();

            match matches.len() {
                0 => continue,
                1 => {
                    let handle = ProviderHandle::new(matches[0].clone(), self.required);
                    debug!("Selected {:?} by {}", handle, label);
                    if let Ok(mut slot) = self.last_good.lock() {
                        *slot = Some(handle.clone());
                    }
                    return LocateResult::Found(handle);
                }
                count => {
                    warn!(
                        "{} providers qualify as {} by {}",
                        count, self.required, label
                    );
                    return LocateResult::Ambiguous {
                        required: self.required,
                        candidates: matches
                            .into_iter()
                            .map(|provider| ProviderHandle::new(provider.clone(), self.required))
                            .collect(),
                    };
                }
            }
        }

        let detected: BTreeSet<WalletKind> = candidates
            .iter()
            .flat_map(|(_, info)| info.kinds.iter().copied())
            .filter(|kind| *kind != self.required)
            .collect();

        LocateResult::NotFound {
            required: self.required,
            detected: detected.into_iter().collect(),
        }
    }
}
