//! Integration tests for the lobby server
//!
//! These tests run the real server on an ephemeral port and talk to it over
//! WebSocket and HTTP.

mod lifecycle_test;
mod ws_client;
mod ws_test_harness;
