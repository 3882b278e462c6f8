use crate::service::Document;
use std::borrow::Cow;

/// Decode one raw line, dropping its `\n` / `\r\n` terminator. Invalid UTF-8
/// becomes U+FFFD instead of failing the read.
pub fn decode_line(raw: &[u8]) -> Cow<'_, str> {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw)
}

/// One `<key><sep><payload>` line from an ingest file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestRecord {
    pub key: String,
    pub payload: String,
}

impl IngestRecord {
    /// Split at the first separator. `None` when the separator is absent.
    pub fn parse(line: &str, separator: char) -> Option<Self> {
        let (key, payload) = line.split_once(separator)?;
        Some(Self {
            key: key.to_string(),
            payload: payload.to_string(),
        })
    }

    pub fn to_document(&self, key_field: &str, payload_field: &str) -> Document {
        let mut doc = Document::new();
        doc.add_field(key_field, self.key.as_str());
        doc.add_field(payload_field, self.payload.as_str());
        doc
    }
}

/// Bounded, reusable record buffer. Flushed when full or at end of file.
#[derive(Debug)]
pub struct Batch {
    records: Vec<IngestRecord>,
    capacity: usize,
}

impl Batch {
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0, "batch capacity must be at least 1");
        Self {
            records: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, record: IngestRecord) {
        self.records.push(record);
    }

    pub fn is_full(&self) -> bool {
        self.records.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn to_documents(&self, key_field: &str, payload_field: &str) -> Vec<Document> {
        self.records
            .iter()
            .map(|r| r.to_document(key_field, payload_field))
            .collect()
    }

    /// Empty the buffer, keeping its allocation for the next batch.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
