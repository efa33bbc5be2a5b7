//! Storage adapters that live inside the domain crate.
//!
//! The in-memory store is the only backend: state lasts for the process
//! lifetime and is used by the API server, the demo CLI and the tests.

pub mod memory_repo;
