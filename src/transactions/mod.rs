pub mod abi;
pub mod cache;
pub mod submitter;
pub mod types;

pub use cache::{ContractHandle, TransportCache};
pub use submitter::TransactionSubmitter;
pub use types::{
    generate_local_game_id, GameId, MoveRequest, PendingTransaction, ReceiptStatus,
    TransactionReceipt,
};
