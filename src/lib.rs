//! urlnav: a bookmark tree with Netscape HTML and JSON interchange.
//!
//! This library crate exposes all modules for use by the binary and integration tests.

pub mod app;
pub mod codecs;
pub mod events;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod types;
