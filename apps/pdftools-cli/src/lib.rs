//! pdftools command-line front end
//!
//! Subcommands save results next to each other in an output directory;
//! `stdio` serves raw JSON envelopes for other processes.

pub mod commands;
pub mod stdio;
