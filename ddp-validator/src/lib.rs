//! Command-line front end for the `ddp-validator` interactive program tester.

pub mod args;
pub mod config;
pub mod discovery;
pub mod entry;
pub mod events;
mod productinfo;
