//! Unit tests for the Stage SDK
//!
//! Hop classification runs against WireMock stand-ins for the next stage;
//! upload parsing runs through an in-memory axum router.

pub mod upload_tests;
