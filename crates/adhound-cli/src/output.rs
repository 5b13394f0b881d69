//! Result rendering for the terminal and for `-o` file output.

use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

use adhound_domain::AceResult;

const RULE: &str = "==================================================";
const SEP: &str = "--------------------------------------------------";

/// Renders resolved ACEs as labeled blocks, one per edge.
///
/// Disabled targets stay in the listing with an explicit marker, since a
/// disabled account that something holds GenericAll over is still a
/// finding worth reporting.
pub fn render_aces(heading: &str, aces: &[AceResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{heading}");
    let _ = writeln!(out, "{RULE}");

    if aces.is_empty() {
        let _ = writeln!(out, "No ACEs found");
        return out;
    }

    for ace in aces {
        let _ = writeln!(out, "\nSource: {}", ace.source);
        let _ = writeln!(out, "Source kind: {}", ace.source_kind);
        let _ = writeln!(out, "Source domain: {}", ace.source_domain);
        if ace.target_enabled {
            let _ = writeln!(out, "Target: {}", ace.target);
        } else {
            let _ = writeln!(out, "Target: {} (disabled)", ace.target);
        }
        let _ = writeln!(out, "Target kind: {}", ace.target_kind);
        let _ = writeln!(out, "Target domain: {}", ace.target_domain);
        let _ = writeln!(out, "Permission: {}", ace.relation);
        let _ = writeln!(out, "{SEP}");
    }
    out
}

/// Renders an entity listing, one name per line.
pub fn render_lines(heading: &str, names: &[String]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{heading} ({})", names.len());
    let _ = writeln!(out, "{RULE}");
    for name in names {
        let _ = writeln!(out, "{name}");
    }
    out
}

/// Prints to stdout, and additionally writes the raw names to a file
/// when an output path was given.
pub fn emit(rendered: &str, names: &[String], output: Option<&Path>) -> io::Result<()> {
    print!("{rendered}");
    if let Some(path) = output {
        fs::write(path, names.join("\n") + "\n")?;
    }
    Ok(())
}
