//! MySQL implementations of the core persistence ports

mod credential_store_impl;

pub use credential_store_impl::MySqlCredentialStore;
