//! Tabrec - browser tab diagnostic session recorder
//!
//! Ingests the tagged protocol event stream of a recorded tab (console calls,
//! log entries, network lifecycle, security/page events) and correlates it
//! into typed console and network records for bug reporting.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs, clippy::all, clippy::pedantic, clippy::cargo)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::multiple_crate_versions
)]

pub mod config;
pub mod correlate;
pub mod display;
pub mod error;
pub mod expand;
pub mod host;
pub mod protocol;
pub mod record;
pub mod report;
pub mod sanitize;
pub mod session;
pub mod urlinfo;

pub use error::{Result, TabrecError};
