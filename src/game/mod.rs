pub mod coordinator;
pub mod errors;
pub mod lobby;
pub mod rules;

pub use coordinator::MoveCoordinator;
pub use errors::GameError;
pub use lobby::GameLobby;
pub use rules::{AppliedMove, IllegalMove, Promotion, RulesEngine, Square};
