use std::io::{self, Write};

use serde::Serialize;

use crate::domain::StrainMetadata;
use crate::sync::SyncReport;

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_metadata(metadata: &StrainMetadata) -> io::Result<()> {
        Self::print_json(metadata)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct TextOutput;

impl TextOutput {
    pub fn print_sync(report: &SyncReport) -> io::Result<()> {
        let mut stdout = io::stdout();
        writeln!(stdout, "{report}")?;
        Ok(())
    }
}
