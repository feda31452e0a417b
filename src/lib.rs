//! Reel - HTTP record-replay cassettes for deterministic tests
//!
//! Wrap the real transport in a [`Vcr`], hand the `Vcr` to the code under
//! test as its transport, and bracket the test with [`Vcr::start`] and
//! [`Vcr::stop`]. The first run records every exchange into a cassette file;
//! later runs answer from the cassette without touching the network.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::cast_possible_truncation,
    clippy::field_reassign_with_default,
    clippy::multiple_crate_versions
)]

pub mod config;
pub mod episode;
pub mod error;
pub mod filter;
pub mod matcher;
pub mod network;
pub mod storage;
pub mod vcr;

pub use config::{Mode, VcrConfig};
pub use episode::{Episode, HttpRequest, HttpResponse};
pub use error::{ReelError, Result};
pub use network::{HyperTransport, Transport};
pub use vcr::{SessionSummary, Vcr};
