//! Parallel passphrase-cracking engine library: candidate sources, the
//! backend plug-in contract, the worker run loop, and the supervisor that
//! ties them together.

pub mod backend;
pub mod backends;
pub mod cli;
pub mod error;
pub mod rules;
pub mod source;
pub mod supervisor;
pub mod worker;
