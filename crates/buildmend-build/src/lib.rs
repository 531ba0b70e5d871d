//! buildmend build collaborator
//!
//! Runs a project's build command as a child process with a timeout and
//! bounded spawn retries, and exposes it to the convergence loop through
//! [`buildmend_core::BuildRunner`].

pub mod command;
pub mod runner;

pub use command::BuildCommand;
pub use runner::CommandBuildRunner;
