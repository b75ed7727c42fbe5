//! CarDoctor: photograph a vehicle problem, get a spoken mechanic's
//! diagnosis, keep the reports that matter.

pub mod audio;
pub mod cli;
pub mod config;
pub mod pipeline;
pub mod remote;
pub mod reports;
pub mod share;
