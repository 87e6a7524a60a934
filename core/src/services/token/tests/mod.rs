//! Tests for the token services

mod retention_tests;
mod service_tests;
