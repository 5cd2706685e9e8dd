// urlnav shared type definitions
// Each submodule defines value types used across the crate.

pub mod errors;
pub mod node;
pub mod search;
pub mod settings;
pub mod url;
