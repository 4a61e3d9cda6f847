// ABOUTME: Protocol module - MCP message types and the JSON-RPC envelope codec.
// ABOUTME: Pure data and parsing; no I/O happens here.

mod codec;
mod types;

pub use codec::{Codec, Incoming};
pub use types::*;

#[cfg(test)]
mod codec_test;
