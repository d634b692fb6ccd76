//! CLI command implementations.

pub mod cart;
pub mod search;

use std::io::Write;

use serde::Serialize;

/// Write a value to stdout as pretty JSON.
///
/// # Errors
///
/// Returns an error if encoding or writing fails.
pub fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
