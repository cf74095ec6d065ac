use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
#[cfg(test)]
pub(crate) mod memory;
pub mod password;
pub mod repo;
pub mod repo_types;
pub mod service;
pub mod validation;

pub fn router() -> Router<AppState> {
    handlers::user_routes()
}
