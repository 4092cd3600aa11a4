//! Text persistence for trained memories and item memories.
//!
//! One line per vector, one ASCII digit per element: `'1'` for a set
//! element, `'0'` otherwise (`-1` in the bipolar domain). This is the
//! format the hardware testbench reads golden memories from.
//!
//! [`fingerprint`] hashes the same text with SHA-256 so two runs can be
//! compared without diffing whole files.

use crate::assoc_memory::AssociativeMemory;
use crate::error::{HdcError, Result};
use crate::item_memory::ItemMemory;
use crate::primitives::Primitives;
use crate::vector::{Domain, Hypervector};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Render vectors in the line format, each line newline-terminated.
pub fn to_text<'a, I>(vectors: I) -> String
where
    I: IntoIterator<Item = &'a Hypervector>,
{
    let mut out = String::new();
    for v in vectors {
        out.push_str(&v.to_bit_string());
        out.push('\n');
    }
    out
}

/// Parse the line format. Blank lines are skipped; all lines must be the
/// same length.
pub fn parse_text<R: BufRead>(reader: R, domain: Domain) -> Result<Vec<Hypervector>> {
    let mut vectors: Vec<Hypervector> = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }
        let v = Hypervector::from_bit_string(line, domain).map_err(|e| match e {
            HdcError::Parse { message, .. } => HdcError::Parse { line: i + 1, message },
            other => other,
        })?;
        if let Some(first) = vectors.first() {
            Primitives::check_dims(first.dimensions(), v.dimensions()).map_err(|_| HdcError::Parse {
                line: i + 1,
                message: format!("expected {} elements, got {}", first.dimensions(), v.dimensions()),
            })?;
        }
        vectors.push(v);
    }
    Ok(vectors)
}

fn write_vectors<'a, I>(path: impl AsRef<Path>, vectors: I) -> Result<()>
where
    I: IntoIterator<Item = &'a Hypervector>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(to_text(vectors).as_bytes())?;
    writer.flush()?;
    Ok(())
}

fn read_vectors(path: impl AsRef<Path>, domain: Domain) -> Result<Vec<Hypervector>> {
    parse_text(BufReader::new(File::open(path)?), domain)
}

/// Save a binarized associative memory, one class per line.
pub fn save_am(memory: &AssociativeMemory, path: impl AsRef<Path>) -> Result<()> {
    let vectors = memory.class_vectors().ok_or_else(|| {
        HdcError::InvalidConfig("quantized associative memories have no text form".into())
    })?;
    write_vectors(path, vectors)
}

/// Load an associative memory saved by [`save_am`].
pub fn load_am(path: impl AsRef<Path>, domain: Domain) -> Result<AssociativeMemory> {
    AssociativeMemory::from_class_vectors(read_vectors(path, domain)?, domain)
}

pub fn save_item_memory(memory: &ItemMemory, path: impl AsRef<Path>) -> Result<()> {
    write_vectors(path, memory)
}

pub fn load_item_memory(path: impl AsRef<Path>, domain: Domain) -> Result<ItemMemory> {
    ItemMemory::new(read_vectors(path, domain)?)
}

/// SHA-256 of the line format, as lowercase hex.
pub fn fingerprint<'a, I>(vectors: I) -> String
where
    I: IntoIterator<Item = &'a Hypervector>,
{
    let mut hasher = Sha256::new();
    hasher.update(to_text(vectors).as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
