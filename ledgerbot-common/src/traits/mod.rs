// File: ledgerbot-common/src/traits/mod.rs
pub mod repository_traits;
pub mod collaborator_traits;
