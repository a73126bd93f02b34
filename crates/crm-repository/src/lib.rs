//! Generic CRUD repository for CRM business records.
//!
//! A [`Repository<T>`] is one generic type parameterized by an [`Entity`]
//! with a fixed type tag. Every mutation follows the audit-then-write rule:
//! the hash-chained audit entry is durably stored before the document store
//! is touched, and a failed audit write aborts the mutation.

pub mod config;
pub mod entity;
pub mod error;
pub mod page;
pub mod repository;

pub use config::RepositoryConfig;
pub use entity::Entity;
pub use error::{RepositoryError, RepositoryResult};
pub use page::{FindOptions, Page};
pub use repository::Repository;
