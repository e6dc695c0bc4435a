use std::io::Write;

use anyhow::Context;
use csv::Writer;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct AccountRow<'a> {
    pub id: &'a str,
    pub pub_key: &'a str,
    pub profile_fields: usize,
}

/// Writes `records` as CSV, header taken from the first record's field names.
pub fn print_records<W, T>(
    output: &mut W,
    records: impl IntoIterator<Item = T>,
) -> anyhow::Result<()>
where
    W: Write,
    T: Serialize,
{
    let mut writer = Writer::from_writer(output);
    for record in records {
        writer
            .serialize(record)
            .context("Failed to write record to CSV")?;
    }
    writer.flush().context("Failed to flush CSV writer")?;
    Ok(())
}
