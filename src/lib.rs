//! Coinshop Server - HTTP front for the coinshop coin-economy service.
//!
//! Every request passes the admission layer from `coinshop-admission`:
//! temporary bans for clients that keep causing server errors, then
//! per-endpoint fixed-window quotas. The business handlers themselves are
//! supplied by the embedding application through [`router_with`].

pub mod admission;
pub mod config;
pub mod error;
pub mod request_id;
pub mod routes;
pub mod state;

pub use routes::{router, router_with};
pub use state::AppState;
