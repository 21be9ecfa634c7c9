#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    AttemptRepository, IdentityRepository, InMemoryRepository, Storage, StorageError,
};
