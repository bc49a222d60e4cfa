//! HTTP shell for the planauth token service

pub mod cli;
pub mod handlers;
pub mod server;

pub use cli::*;
pub use handlers::*;
pub use server::*;
