//! Authentication: token persistence and session state

pub mod session;
pub mod token_store;
