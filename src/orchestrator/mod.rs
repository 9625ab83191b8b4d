//! Application-level orchestration.
//!
//! `submission` holds the controller that owns one submit/await/display cycle,
//! `controller` drives it from interactive UI commands, and `post_process` turns a
//! finished cycle into a report and exports. UI/CLI layers call into this module
//! to keep responsibilities separated.

mod controller;
mod post_process;
mod submission;

#[cfg(feature = "tui")]
pub(crate) use controller::{run_controller, UiCommand};
pub(crate) use controller::read_selection;
pub(crate) use post_process::{process_submission, ExportTargets};
pub(crate) use submission::SubmissionController;
