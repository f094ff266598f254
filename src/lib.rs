pub mod assignment;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod workflow;

pub use error::ReviewError;
