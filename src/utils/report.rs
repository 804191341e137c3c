// src/utils/report.rs

//! Console report blocks with server-style timestamps.
//!
//! These print the end-of-run summary for interactive and CI use. Diagnostic
//! logging goes through the `log` facade instead.

use chrono::Local;

const WIDTH: usize = 60;

/// Prefix a line with the local timestamp.
fn format_line(message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    format!("[{timestamp}] {message}")
}

/// Print a separator line
pub fn separator() {
    println!("{}", format_line(&"─".repeat(WIDTH)));
}

/// Print a boxed header
pub fn header(title: &str) {
    let border = "═".repeat(WIDTH);
    println!("{}", format_line(&border));
    println!("{}", format_line(&format!("  {title}")));
    println!("{}", format_line(&border));
}

/// Print an indented item
pub fn sub_item(message: &str) {
    println!("{}", format_line(&format!("    {message}")));
}

/// Print a titled list of key/value pairs
pub fn summary(title: &str, items: &[(&str, String)]) {
    separator();
    println!("{}", format_line(&format!("[SUMMARY] {title}")));
    for line in summary_lines(items) {
        println!("{}", format_line(&line));
    }
}

fn summary_lines(items: &[(&str, String)]) -> Vec<String> {
    let width = items.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    items
        .iter()
        .map(|(key, value)| format!("    {key:<width$} : {value}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line_has_timestamp() {
        let line = format_line("hello");
        assert!(line.starts_with('['));
        assert!(line.ends_with("] hello"));
    }

    #[test]
    fn test_summary_lines_align_keys() {
        let lines = summary_lines(&[("Jobs", "3".into()), ("Errors", "1".into())]);
        assert_eq!(lines, vec!["    Jobs   : 3", "    Errors : 1"]);
    }
}
