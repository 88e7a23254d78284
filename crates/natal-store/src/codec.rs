//! Chart blob encoding: JSON, then gzip.
//!
//! Raw charts are tens of kilobytes of repetitive structured text, so a
//! general-purpose compressor shrinks them several-fold.

use std::io::{Read, Write};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde_json::Value;

use crate::error::StoreError;

pub fn encode_chart(chart: &Value) -> Result<Vec<u8>, StoreError> {
    let json = serde_json::to_vec(chart)?;
    let mut encoder = GzEncoder::new(Vec::with_capacity(json.len() / 4), Compression::default());
    encoder.write_all(&json)?;
    Ok(encoder.finish()?)
}

pub fn decode_chart(bytes: &[u8]) -> Result<Value, StoreError> {
    let mut json = Vec::with_capacity(bytes.len() * 4);
    GzDecoder::new(bytes).read_to_end(&mut json)?;
    Ok(serde_json::from_slice(&json)?)
}
