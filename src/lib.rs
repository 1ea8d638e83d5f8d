//! Vellum — an in-memory, RESP-compatible key-value store.
//!
//! Main modules:
//! - `command` — the dispatch table and per-type command handlers (SET,
//!   GET, HSET, SADD, SETBIT, ...)
//! - `config` — startup configuration (`VELLUM_*` environment layering)
//! - `database` — the keyspace and its data structures: the
//!   incrementally-rehashing `Dict`, the adaptive int/hash `SetValue`,
//!   `Bitmap`, and the expiry index
//! - `error` — the typed command error hierarchy
//! - `logging` — structured logging setup
//! - `network` — the single-threaded `mio` event loop and RESP
//!   connection handling
//! - `resp` — the RESP wire codec (`Frame`, encoder, parser)

pub mod command;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod network;
pub mod resp;

pub use command::dispatch;
pub use config::Settings;
pub use database::{Bitmap, Db, Dict, DictIter, Entry, SetValue, Value};
pub use error::CommandError;
pub use network::{run, ServerOptions};
pub use resp::{Frame, ParseError, Parser};
