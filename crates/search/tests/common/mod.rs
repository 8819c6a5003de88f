//! Test infrastructure for inventory search.
//!
//! Provides an in-memory backend factory and the standard seed data the
//! integration tests query against.

#![allow(dead_code)]

pub mod fixtures;

pub use fixtures::*;

use stockroom_search::backends::sqlite::SqliteBackend;

/// Creates an in-memory backend with the schema applied.
pub fn create_backend() -> SqliteBackend {
    let backend = SqliteBackend::in_memory().expect("Failed to create SQLite backend");
    backend.init_schema().expect("Failed to initialize schema");
    backend
}

/// Creates a backend loaded with rows A-E.
pub fn seeded_backend() -> (SqliteBackend, StandardIds) {
    let backend = create_backend();
    let ids = seed_standard(&backend);
    (backend, ids)
}
