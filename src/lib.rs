pub mod config;
pub mod database;
pub mod engine;
pub mod entities;
pub mod error;
pub mod models;
pub mod services;

pub use config::Config;
pub use error::{EngineError, EngineResult};
