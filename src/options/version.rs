use colored::Colorize;

use crate::utils::{INDEX_ORIGIN, PLATFORM};

pub fn show() {
    let version = env!("CARGO_PKG_VERSION");
    let name = env!("CARGO_PKG_NAME");

    println!("{} v{}", name.bright_green(), version.bright_white());
    println!("Author: {}", env!("CARGO_PKG_AUTHORS").bright_blue());
    println!("Platform: {} from {}", PLATFORM.yellow(), INDEX_ORIGIN);
}
