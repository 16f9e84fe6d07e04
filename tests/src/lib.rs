//! Shared fakes for the workspace integration tests.

pub mod support;
