//! Pure decision logic. Nothing in here touches a store or the network:
//! `rules` decides how balances move, `dialog` decides where a multi-step
//! conversation goes next.

pub mod rules;
pub mod dialog;

pub use rules::RewardPolicy;
pub use dialog::{DialogEffect, DialogState, Prompt, Transition};
