use std::io::Write;

use serde::Serialize;

use crate::error::Result;
use crate::types::TranscriptResult;

#[derive(Serialize)]
struct ErrorReport<'a> {
    error: &'a str,
}

/// Write `result` as one JSON object and flush.
///
/// The document is fully serialized before the first byte is written.
pub fn write_result<W: Write>(mut writer: W, result: &TranscriptResult) -> Result<()> {
    let json = serde_json::to_string(result)?;
    writer.write_all(json.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Write `{"error": message}` and flush.
///
/// Write failures are returned so the caller can fall back to another channel.
pub fn write_error<W: Write>(mut writer: W, message: &str) -> Result<()> {
    let json = serde_json::to_string(&ErrorReport { error: message })?;
    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}
