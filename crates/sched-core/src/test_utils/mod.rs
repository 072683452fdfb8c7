//! Shared helpers for scheduler tests.
//!
//! Execution-order assertions dominate this crate's test suite; [`ExecLog`]
//! gives every test the same cheap way to record which blocks ran and in
//! what order.

pub mod helpers;

pub use helpers::{method_port, rdy_port, ExecLog};
