use crate::error::Result;
use crate::types::ScrapedRecord;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Destination for scraped records
pub trait RecordSink {
    fn emit(&mut self, record: &ScrapedRecord) -> Result<()>;
}

/// One JSON document per line
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> RecordSink for JsonLinesSink<W> {
    fn emit(&mut self, record: &ScrapedRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// One pretty-printed file per record under `<dir>/<session>/<chamber>/`
pub struct DirectorySink {
    root: PathBuf,
}

impl DirectorySink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Where a record is written
    pub fn path_for(&self, record: &ScrapedRecord) -> PathBuf {
        match record {
            ScrapedRecord::Bill(bill) => self
                .root
                .join(&bill.legislative_session)
                .join(bill.chamber.as_str())
                .join("bills")
                .join(format!("{}.json", bill.identifier.replace(' ', ""))),
            ScrapedRecord::Vote(vote) => {
                let key = vote
                    .dedupe_key
                    .clone()
                    .unwrap_or_else(|| format!("{}:{}", vote.bill_identifier, vote.motion_text));
                self.root
                    .join(&vote.legislative_session)
                    .join(vote.chamber.as_str())
                    .join("votes")
                    .join(format!("{}.json", short_hash(&key)))
            }
        }
    }
}

/// First 16 hex digits of the key's SHA-256
fn short_hash(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let mut hex = format!("{:x}", digest);
    hex.truncate(16);
    hex
}

fn write_json(path: &Path, record: &ScrapedRecord) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(record)?;
    fs::write(path, json)?;
    Ok(())
}

impl RecordSink for DirectorySink {
    fn emit(&mut self, record: &ScrapedRecord) -> Result<()> {
        write_json(&self.path_for(record), record)
    }
}
