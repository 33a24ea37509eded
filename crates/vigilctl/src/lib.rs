//! Vigil Control - command-line front end for the audit engine.
//!
//! `audit` runs in-process; every other command talks to vigild over HTTP.

pub mod client;
pub mod commands;
pub mod output;
pub mod progress;
