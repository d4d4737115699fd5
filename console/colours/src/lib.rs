pub mod config;
pub mod gateway;
pub mod init;
pub mod models;
pub mod navigation;
pub mod prelude;
pub mod stores;

pub use anyhow::Result;
pub use colours_storage as storage;

use crate::{gateway::GatewayError, models::colour::ColourParseError};
use thiserror::Error as ErrorTrait;

/// The sum type of all errors a store operation may run into.
///
/// Stores never hand these to their callers. They are flattened into their
/// display message and reported through the notification channel instead.
#[derive(ErrorTrait, Debug)]
pub enum Error {
    #[error("{}", .0)]
    Gateway(#[from] GatewayError),
    #[error("{}", .0)]
    Colour(#[from] ColourParseError),
    #[error("Failed to persist session: {}", .0)]
    Storage(#[from] storage::StorageError),
    #[error("Failed to encode session: {}", .0)]
    Json(#[from] serde_json::Error),
}
