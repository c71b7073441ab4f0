//! Usage and markdown rendering of the option table.

use super::descriptor::{OptionDescriptor, ValueKind};
use super::table::OptionTable;
use std::fmt::Write;

const SELECTION_NOTE: &str = "At least one flow must be selected, to run Load";
const LICENSE_NOTE: &str = "This release is licensed under the Apache Software License 2.0.";
const ALIAS_COLUMN: usize = 44;

/// Plain usage text for a terminal.
pub fn render_usage(table: &OptionTable) -> String {
    let mut out = String::new();
    out.push_str("Usage:\n\n");
    out.push_str("load [param] [param] ...\n\n");
    out.push_str(SELECTION_NOTE);
    out.push_str("\n\n");

    for descriptor in table.descriptors() {
        let _ = writeln!(out, "{}", usage_line(descriptor));
    }

    out.push('\n');
    out.push_str(LICENSE_NOTE);
    out.push('\n');
    out
}

/// The option table as a GitHub Flavored Markdown document.
pub fn render_markdown(table: &OptionTable) -> String {
    let mut out = String::new();
    out.push_str("Load - Command Line Reference\n");
    out.push_str("=============================\n");
    out.push_str("    load [param] [param] ...\n\n");
    out.push_str(SELECTION_NOTE);
    out.push_str("\n\n<table>\n");

    for descriptor in table.descriptors() {
        let _ = writeln!(out, "{}", markdown_row(descriptor));
    }

    out.push_str("</table>\n\n");
    out.push_str(LICENSE_NOTE);
    out.push('\n');
    out
}

fn usage_line(descriptor: &OptionDescriptor) -> String {
    let mut spelling = descriptor.aliases().join("|");
    match descriptor.value_kind() {
        ValueKind::Flag => {}
        ValueKind::Integer => spelling.push_str(" <integer>"),
        ValueKind::Float => spelling.push_str(" <number>"),
        ValueKind::Text => spelling.push_str(" <text>"),
    }

    let mut line = format!("{spelling:<ALIAS_COLUMN$} {}", descriptor.description());
    if descriptor.is_required() {
        line.push_str(" (required)");
    }
    line
}

fn markdown_row(descriptor: &OptionDescriptor) -> String {
    let requirement = if descriptor.takes_value() {
        "requires argument"
    } else {
        ""
    };
    format!(
        "<tr><td><code>{}</code></td><td>{}</td><td>{}</td></tr>",
        descriptor.aliases().join("|"),
        descriptor.description(),
        requirement
    )
}
