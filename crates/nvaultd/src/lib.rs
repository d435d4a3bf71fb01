//! NoteVault server library.
//! Exposes the daemon's modules for integration testing.
//! The binary entry point is in main.rs.

pub mod auth;
pub mod daemon;
pub mod db;
pub mod keys;
pub mod metrics;
pub mod notes;
pub mod routes;
pub mod state;
