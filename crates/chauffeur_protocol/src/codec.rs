//! Compact string encodings used inside message envelopes.
//!
//! Tile paths travel as `;`-delimited `x,y` pairs (`"3,4;3,5;"`), pick-up
//! and route lists as `;`-delimited names (`"Alice;Bob;"`). Both encodings
//! carry a trailing delimiter; decoding skips empty entries so the same
//! routines accept strings with or without it.

use crate::error::ProtocolError;
use crate::types::Tile;

/// Encode an ordered tile sequence as `;`-delimited `x,y` pairs.
pub fn encode_path(path: &[Tile]) -> String {
    let mut buf = String::new();
    for tile in path {
        buf.push_str(&tile.x.to_string());
        buf.push(',');
        buf.push_str(&tile.y.to_string());
        buf.push(';');
    }
    buf
}

/// Decode a `;`-delimited `x,y` tile sequence.
pub fn decode_path(text: &str) -> Result<Vec<Tile>, ProtocolError> {
    text.split(';')
        .filter(|step| !step.is_empty())
        .map(|step| {
            let (x, y) = step
                .split_once(',')
                .ok_or_else(|| ProtocolError::BadCoordinate(step.to_string()))?;
            let x = x
                .trim()
                .parse()
                .map_err(|_| ProtocolError::BadCoordinate(step.to_string()))?;
            let y = y
                .trim()
                .parse()
                .map_err(|_| ProtocolError::BadCoordinate(step.to_string()))?;
            Ok(Tile::new(x, y))
        })
        .collect()
}

/// Encode a name list as a `;`-delimited string.
pub fn encode_names<S: AsRef<str>>(names: &[S]) -> String {
    let mut buf = String::new();
    for name in names {
        buf.push_str(name.as_ref());
        buf.push(';');
    }
    buf
}

/// Decode a `;`-delimited name list, skipping empty entries.
pub fn decode_names(text: &str) -> Vec<String> {
    text.split(';')
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
