//! Transport that prints batches.

use std::io::{self, Write};

use cwreport_sdk::{Transport, TransportError};
use cwreport_types::Batch;

/// Prints each batch to stdout as one line of JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutTransport;

impl StdoutTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for StdoutTransport {
    fn deliver(&self, batch: &Batch) -> Result<(), TransportError> {
        let line = serde_json::to_string(batch)?;
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", line)?;
        stdout.flush()?;
        Ok(())
    }
}
