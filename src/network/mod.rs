//! Network layer: a single-threaded `mio` event loop accepting RESP
//! clients over TCP (§4.8).
//!
//! ## Submodules
//!
//! - `connection`: per-client read/write buffering and RESP framing.
//! - `server`: the `mio::Poll`-driven reactor — accept, read, dispatch,
//!   write, plus the periodic maintenance tick (§4.7, §4.8).

pub mod connection;
pub mod server;

pub use server::{run, ServerOptions};
