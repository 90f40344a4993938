//! Terminal presentation. Everything that colours text lives here.

use colored::Colorize;

pub fn banner() {
    println!("{}", "=====================================================".blue().bold());
    println!("{}", "        GIT AUTOPILOT (Beginner Friendly)            ".blue().bold());
    println!("{}", "=====================================================".blue().bold());
}

pub fn header(text: &str) {
    println!("\n{}", format!("=== {text} ===").magenta().bold());
}

pub fn success(text: &str) {
    println!("{} {}", "✔".green(), text.green());
}

pub fn failure(text: &str) {
    println!("{} {}", "✖".red(), text.red());
}

pub fn info(text: &str) {
    println!("{}", text.cyan());
}

pub fn warning(text: &str) {
    println!("{}", text.yellow());
}

pub fn plain(text: &str) {
    println!("{text}");
}

/// Failure line followed by the captured diagnostic text
pub fn failure_with_output(text: &str, output: &str) {
    failure(text);
    if !output.trim().is_empty() {
        println!("{}", output.trim().dimmed());
    }
}

/// Numbered list, 1-based, with an optional marker on one entry
pub fn numbered(items: &[String], marked: Option<usize>) {
    for (index, item) in items.iter().enumerate() {
        if Some(index) == marked {
            println!("  {}. {} {}", index + 1, item.bold(), "(default)".dimmed());
        } else {
            println!("  {}. {}", index + 1, item);
        }
    }
}
