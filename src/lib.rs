//! `sweep` runs one command template over a list of objects, one object at
//! a time, with a live view of the running job.

pub mod cli;
pub mod command;
pub mod controller;
pub mod logging;
pub mod objects;
pub mod process_manager;
pub mod runner;
pub mod tui;
pub mod ui;

/// Every object ran; some may have failed and been skipped.
pub const EXIT_OK: i32 = 0;
/// Terminal or output failure.
pub const EXIT_FAILURE: i32 = 1;
/// Bad arguments, template or object list.
pub const EXIT_USAGE: i32 = 2;
/// The run was aborted by the user or stopped at a failure.
pub const EXIT_ABORTED: i32 = 3;
