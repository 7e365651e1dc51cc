//! Unit tests for the core lobby components
//!
//! These exercise the event bus, session manager and monitoring state against
//! an in-memory transport, without opening sockets.
