//! `car-doctor` command-line front end.
//!
//! [`Cli`] is the clap definition; the handlers in [`handlers`] drive the
//! library for each subcommand.

pub mod handlers;
pub mod parser;

pub use handlers::CliContext;
pub use parser::{Cli, Commands, DiagnoseArgs, ReportsCommand};
