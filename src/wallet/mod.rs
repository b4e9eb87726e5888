pub mod errors;
pub mod guard;
pub mod http;
pub mod locator;
pub mod provider;
pub mod types;

pub use errors::{ProviderError, WalletError};
pub use guard::NetworkGuard;
pub use http::HttpRpcProvider;
pub use locator::{InjectedProviders, LocateResult, ProviderLocator, ProviderSource, StaticInjection};
pub use provider::{ProviderEvent, ProviderHandle, ProviderInfo, RpcRequest, WalletProvider};
pub use types::{Address, ChainId, WalletKind, WalletState};
