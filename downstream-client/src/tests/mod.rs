//! Unit tests for the downstream client
//!
//! Mock-server tests exercise the real HTTP path against WireMock; shared
//! fixtures live in `support`.

pub mod support;

pub mod config_tests;
