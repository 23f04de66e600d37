// src/rpc/mod.rs

//! Remote control of supervisord.
//!
//! - [`client`] exposes the calls the listener makes and implements
//!   [`ProcessStarter`](crate::dispatch::ProcessStarter).
//! - [`transport`] speaks HTTP to the unix or TCP endpoint.
//! - [`xmlrpc`] encodes calls and decodes responses and faults.

pub mod client;
pub mod transport;
pub mod xmlrpc;

pub use client::SupervisorClient;
pub use transport::{DEFAULT_SERVER_URL, SERVER_URL_ENV, ServerUrl};
