//! Output formatting for CLI responses

use std::time::Duration;

use acpi_backlight_driver::{PanelSnapshot, PropertyMap};
use anyhow::Error;
use colored::Colorize;
use serde::Serialize;
use serde_json::json;

use crate::commands::{FadeTrace, MappingReport, SetReport, TableReport};

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    let error_json = json!({
        "success": false,
        "error": {
            "message": error.to_string(),
            "code": crate::error::exit_code(error),
        }
    });
    match serde_json::to_string_pretty(&error_json) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format error as JSON: {e}"),
    }
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

fn print_json<T: Serialize>(field: &str, value: &T) {
    let mut output = serde_json::Map::new();
    output.insert("success".into(), true.into());
    match serde_json::to_value(value) {
        Ok(value) => {
            output.insert(field.into(), value);
        }
        Err(e) => {
            eprintln!("Failed to format {field} as JSON: {e}");
            return;
        }
    }
    match serde_json::to_string_pretty(&output) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Failed to format {field} as JSON: {e}"),
    }
}

fn format_raw(raw: Option<u32>) -> String {
    raw.map_or_else(|| "-".dimmed().to_string(), |raw| format!("{raw:#06x} ({raw})"))
}

pub fn print_table(report: &TableReport, json: bool) {
    if json {
        print_json("table", report);
        return;
    }

    println!("{} {}", "Backlight:".bold(), report.backlight_path);
    println!("  Control: {}", report.control_path);
    println!(
        "  Methods: {}",
        if report.extended { "XBCM/XBQC" } else { "_BCM/_BQC" }
    );
    println!(
        "  AC minimum: {} (index {})",
        report.raw_ac_min, report.ac_min_index
    );
    println!(
        "  Battery maximum: {} (index {})",
        report.raw_bat_max, report.bat_max_index
    );
    println!("{}", "Levels:".bold());
    for (index, level) in report.levels.iter().enumerate() {
        let mut marks = Vec::new();
        if index == report.ac_min_index {
            marks.push("ac-min");
        }
        if index == report.bat_max_index {
            marks.push("bat-max");
        }
        let marks = if marks.is_empty() {
            String::new()
        } else {
            format!("  {}", marks.join(", ").cyan())
        };
        println!("  [{index:>3}] {level:>6}{marks}");
    }
}

pub fn print_mapping(report: &MappingReport, json: bool) {
    if json {
        print_json("mapping", report);
        return;
    }

    println!("{} {}", "Level:".bold(), report.level);
    println!("  Index: {}", report.index);
    println!("  Remainder: {}/1024", report.remainder);
    println!("  Raw: {}", format_raw(report.raw));
    if report.extended {
        println!("  {}", "Remainder interpolated (extended device)".dimmed());
    }
}

pub fn print_set(report: &SetReport, json: bool) {
    if json {
        print_json("set", report);
        return;
    }

    println!(
        "{} {} {}",
        "Brightness:".bold(),
        report.fade.current.to_string().green(),
        format!("(requested {})", report.requested).dimmed()
    );
    match report.raw {
        Some(raw) => println!("  Raw: {raw}"),
        None => println!("  Raw: {}", "unknown".yellow()),
    }
    println!("  Firmware writes: {}", report.writes.len());
    if report.committed {
        println!("  {} committed level {}", "✓".green(), report.fade.committed);
    }
}

pub fn print_fade(trace: &FadeTrace, json: bool) {
    if json {
        print_json("fade", trace);
        return;
    }

    let mode = if trace.smoothing {
        "smoothed".green()
    } else {
        "immediate".yellow()
    };
    println!(
        "{} {} -> {} ({mode})",
        "Fade:".bold(),
        trace.from,
        trace.to
    );
    for step in &trace.steps {
        let at = format!("{:?}", Duration::from_micros(step.at_us));
        println!(
            "  {:>4}  {at:>10}  level {:>4}  raw {}",
            step.tick,
            step.level,
            format_raw(step.raw)
        );
    }
    println!(
        "  {} ticks over {:?}",
        trace.steps.len(),
        Duration::from_micros(trace.duration_us())
    );
}

pub fn print_properties(properties: &PropertyMap, json: bool) {
    if json {
        print_json("properties", properties);
        return;
    }

    if properties.is_empty() {
        println!("{}", "No properties published".yellow());
        return;
    }
    println!("{}", "Properties:".bold());
    for (key, value) in properties {
        println!("  {:<16} {}", key.cyan(), value);
    }
}

pub fn print_status(snapshot: &PanelSnapshot, json: bool) {
    if json {
        print_json("status", snapshot);
        return;
    }

    println!("{} {}", "Backlight:".bold(), snapshot.backlight_path);
    println!("  Control: {}", snapshot.control_path);
    println!("  Levels: {}", snapshot.levels.len());
    println!(
        "  Smoothing: {}",
        if snapshot.smoothing {
            "enabled".green()
        } else {
            "disabled".yellow()
        }
    );
    println!("  Current: {}", snapshot.fade.current);
    println!("  Target: {}", snapshot.fade.target);
    println!("  Committed: {}", snapshot.fade.committed);
}
