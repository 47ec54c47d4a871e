// src/utils/log.rs

//! Console presentation helpers with server-style formatting.
//!
//! Level-filtered logging goes through the `log` macros; these helpers only
//! shape the run banner and the end-of-run summary.

use chrono::Local;

fn stamped(message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    format!("[{}] [INFO] {}", timestamp, message)
}

/// Print a header banner.
pub fn header(title: &str) {
    let border = "═".repeat(60);
    println!("{}", stamped(&border));
    println!("{}", stamped(&format!("  {}", title)));
    println!("{}", stamped(&border));
}

/// Print a step in a process.
pub fn step(step_num: usize, total: usize, message: &str) {
    println!("{}", stamped(&format!("[STEP {}/{}] {}", step_num, total, message)));
}

/// Print a success message.
pub fn success(message: &str) {
    println!("{}", stamped(message));
}

/// Print an indented sub-item.
pub fn sub_item(message: &str) {
    println!("{}", stamped(&format!("    {}", message)));
}

/// Print a summary section.
pub fn summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("{}", stamped(&format!("[SUMMARY] {}", title)));
    for (key, value) in items {
        println!("{}", stamped(&format!("    {}: {}", key, value)));
    }
}
