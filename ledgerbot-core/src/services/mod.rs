// File: ledgerbot-core/src/services/mod.rs

pub mod access;
pub mod notification;
pub mod session_store;
pub mod lot_tokens;
pub mod reward_service;
pub mod approval_service;
pub mod inventory_service;
pub mod ledger_bot;

pub use access::{AdminGate, MembershipGate};
pub use notification::NotificationDispatcher;
pub use session_store::SessionStore;
pub use lot_tokens::LotTokenTable;
pub use reward_service::RewardService;
pub use approval_service::ApprovalService;
pub use inventory_service::InventoryService;
pub use ledger_bot::{AdminDialog, ClearTarget, DialogReply, InventoryOp, InventoryOutcome, LedgerBot, LotGroup};
