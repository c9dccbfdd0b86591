//! Terminal output formatting with colors and box drawing.

use colored::Colorize;

use crate::adaptive::BumpReport;

/// Format a [`BumpReport`] for human-readable terminal output.
pub fn format_report(report: &BumpReport) -> String {
    let mut output = String::new();

    let header = format!("Bump test: {}", report.result.covariate.bold());
    output.push_str(&format_box_top());
    output.push_str(&format_box_line(&header));
    output.push_str(&format_box_separator());

    let p = report.result.p;
    let p_str = format!("p = {}", format_p(p));
    let p_colored = if p < 0.01 {
        p_str.red().bold()
    } else if p < 0.05 {
        p_str.yellow()
    } else {
        p_str.green()
    };
    output.push_str(&format_box_line(&p_colored.to_string()));
    output.push_str(&format_box_line(&format!(
        "Mean coefficient: {:.4}",
        report.result.coefficient
    )));
    output.push_str(&format_box_line(&format!(
        "Sites fit: {}",
        report.coefficients.len()
    )));
    output.push_str(&format_box_line(&format!(
        "Observed statistic: {:.4}",
        report.observed_statistic
    )));

    output.push_str(&format_box_separator());
    for level in &report.levels {
        let marker = if level.escalated {
            "\u{2191}".yellow().to_string()
        } else {
            "\u{2713}".green().to_string()
        };
        output.push_str(&format_box_line(&format!(
            "{} {:>6} trials  {:>6} valid  {:>5} exceed",
            marker, level.n_trials, level.n_valid, level.exceed
        )));
    }
    output.push_str(&format_box_bottom());

    output
}

fn format_p(p: f64) -> String {
    if p < 1e-3 {
        format!("{:.2e}", p)
    } else {
        format!("{:.4}", p)
    }
}

// Box drawing helpers

const BOX_WIDTH: usize = 60;

fn format_box_top() -> String {
    format!("\u{250C}{}\u{2510}\n", "\u{2500}".repeat(BOX_WIDTH))
}

fn format_box_bottom() -> String {
    format!("\u{2514}{}\u{2518}\n", "\u{2500}".repeat(BOX_WIDTH))
}

fn format_box_separator() -> String {
    format!("\u{251C}{}\u{2524}\n", "\u{2500}".repeat(BOX_WIDTH))
}

fn format_box_line(content: &str) -> String {
    let visible_len = strip_ansi_codes(content).chars().count();
    let padding = (BOX_WIDTH - 2).saturating_sub(visible_len);
    format!("\u{2502} {}{} \u{2502}\n", content, " ".repeat(padding))
}

/// Strip ANSI escape codes for accurate length calculation.
fn strip_ansi_codes(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // Skip until 'm' (end of ANSI sequence)
            while let Some(&next) = chars.peek() {
                chars.next();
                if next == 'm' {
                    break;
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}
