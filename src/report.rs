//! Duration report writer

use crate::duration::DurationRecord;
use crate::error::Result;
use std::io;
use std::path::Path;

pub const HEADER: [&str; 5] = ["Lesson", "Subtitle", "Video", "Title", "Duration"];

/// Write `records` as `;`-delimited rows under a header line.
pub fn write_records<W: io::Write>(writer: W, records: &[DurationRecord]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_writer(writer);

    wtr.write_record(HEADER)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Create (or truncate) `path` and write the report into it.
pub fn save(path: &Path, records: &[DurationRecord]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_records(io::BufWriter::new(file), records)?;
    println!("✅ Data saved to {}", path.display());
    Ok(())
}
