// Library exports for integration tests
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod server;
pub mod state;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use error::AppError;
pub use server::create_app;
pub use state::AppState;
pub use storage::{BlobPermissions, LocalStorage, S3Storage, Storage, StorageBackend, StorageError};
