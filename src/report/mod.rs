//! Renders a finished [`Report`] for the terminal.
mod text;

#[cfg(test)]
mod tests;

use std::io::Write;

use crate::args::OutputFormat;
use crate::metrics::Report;

/// Writes `report` in the requested format.
///
/// # Errors
///
/// Returns an error when writing to `out` fails.
pub fn render<W: Write>(report: &Report, format: OutputFormat, out: &mut W) -> std::io::Result<()> {
    match format {
        OutputFormat::Text => text::render_text(report, out),
        // Per-request rows are not retained, so there is nothing to print.
        OutputFormat::Csv => Ok(()),
    }
}
