//! SQLite-backed record storage for spenttime.
//!
//! [`RecordDb`] owns a single connection behind a mutex and exposes
//! synchronous queries; [`SqliteRepository`] adapts it to the async
//! [`spenttime_core::RecordRepository`] trait.

mod db;
mod error;
mod repository;

pub use db::RecordDb;
pub use error::SqliteRepositoryError;
pub use repository::SqliteRepository;
