pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod mask;
pub mod middleware;
pub mod services;
pub mod state;

pub use app::app;
pub use state::AppState;
