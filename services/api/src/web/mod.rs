pub mod auth;
pub mod catalog;
pub mod dto;
pub mod middleware;
pub mod progress;
pub mod rest;
pub mod state;
pub mod users;


pub use middleware::resolve_caller;
pub use rest::{router, ApiDoc};
pub use state::{AppState, Stores};
