//! menuctl CLI library
//!
//! Command implementations and terminal output shared by the `menuctl`
//! binary.

pub mod approver;
pub mod commands;
pub mod output;
