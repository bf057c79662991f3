pub mod check;
pub mod install;
pub mod list;

use colored::Colorize;

use crate::error::Error;

/// The single place failures become user-facing text.
pub fn report_failure(err: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    if let Some(hint) = err.hint() {
        eprintln!("{} {}", "hint:".yellow(), hint);
    }
}
