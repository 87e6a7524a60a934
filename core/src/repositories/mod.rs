//! Persistence ports for credential records.

pub mod credential;

pub use credential::{ConsumeOutcome, CredentialStore, InMemoryCredentialStore};
