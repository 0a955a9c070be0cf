//! Route groups. Each module exposes a `router()` over [`AppState`](crate::state::AppState).

pub mod blockchain;
pub mod health;
pub mod identity;
pub mod records;
pub mod zkp;
