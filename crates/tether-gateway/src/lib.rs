//! HTTP surface for the Tether link shortener.

pub mod app;
pub mod bootstrap;
pub mod cli;
pub mod error;
pub mod handlers;
pub mod model;
pub mod principal;
pub mod state;

pub use app::App;
pub use state::AppState;
