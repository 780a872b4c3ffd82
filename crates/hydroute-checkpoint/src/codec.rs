//! Little-endian primitives for the checkpoint format.
//!
//! Variable-length sequences carry a `u32` length prefix.

use std::io::{Read, Write};

use crate::error::CheckpointError;

/// Longest sequence a reader accepts, guarding against corrupt lengths.
pub const MAX_SEQUENCE: u32 = 1 << 24;

// ── Writers ─────────────────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), CheckpointError> {
    w.write_all(&[v])?;
    Ok(())
}

/// Write a little-endian u16.
pub fn write_u16_le(w: &mut dyn Write, v: u16) -> Result<(), CheckpointError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), CheckpointError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian u64.
pub fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), CheckpointError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian i32.
pub fn write_i32_le(w: &mut dyn Write, v: i32) -> Result<(), CheckpointError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian f64.
pub fn write_f64_le(w: &mut dyn Write, v: f64) -> Result<(), CheckpointError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a fixed number of f64 values, no length prefix.
pub fn write_f64_array(w: &mut dyn Write, values: &[f64]) -> Result<(), CheckpointError> {
    for &v in values {
        write_f64_le(w, v)?;
    }
    Ok(())
}

/// Write a length-prefixed f64 sequence.
pub fn write_f64_seq(w: &mut dyn Write, values: &[f64]) -> Result<(), CheckpointError> {
    let len = u32::try_from(values.len())
        .ok()
        .filter(|&len| len <= MAX_SEQUENCE)
        .ok_or_else(|| CheckpointError::Malformed {
            detail: format!("sequence of {} values too long", values.len()),
        })?;
    write_u32_le(w, len)?;
    write_f64_array(w, values)
}

// ── Readers ─────────────────────────────────────────────────────

/// Read a single byte.
pub fn read_u8(r: &mut dyn Read) -> Result<u8, CheckpointError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Read a little-endian u16.
pub fn read_u16_le(r: &mut dyn Read) -> Result<u16, CheckpointError> {
    let mut buf = [0u8; 2];
    r.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn Read) -> Result<u32, CheckpointError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a little-endian u64.
pub fn read_u64_le(r: &mut dyn Read) -> Result<u64, CheckpointError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read a little-endian i32.
pub fn read_i32_le(r: &mut dyn Read) -> Result<i32, CheckpointError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

/// Read a little-endian f64.
pub fn read_f64_le(r: &mut dyn Read) -> Result<f64, CheckpointError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

/// Fill `out` with f64 values, no length prefix.
pub fn read_f64_array(r: &mut dyn Read, out: &mut [f64]) -> Result<(), CheckpointError> {
    for v in out.iter_mut() {
        *v = read_f64_le(r)?;
    }
    Ok(())
}

/// Read a length-prefixed f64 sequence.
pub fn read_f64_seq(r: &mut dyn Read) -> Result<Vec<f64>, CheckpointError> {
    let len = read_u32_le(r)?;
    if len > MAX_SEQUENCE {
        return Err(CheckpointError::Malformed {
            detail: format!("sequence length {len} exceeds {MAX_SEQUENCE}"),
        });
    }
    (0..len).map(|_| read_f64_le(r)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f64_bits_survive() {
        let mut buf = Vec::new();
        for v in [0.0, -0.0, 1e-310, f64::MAX] {
            write_f64_le(&mut buf, v).unwrap();
        }
        let mut r = buf.as_slice();
        for v in [0.0, -0.0, 1e-310, f64::MAX] {
            assert_eq!(read_f64_le(&mut r).unwrap().to_bits(), v.to_bits());
        }
    }

    #[test]
    fn truncated_input_is_io_error() {
        let mut r: &[u8] = &[1, 2, 3];
        assert!(matches!(read_u32_le(&mut r), Err(CheckpointError::Io(_))));
    }

    #[test]
    fn oversized_sequence_rejected() {
        let mut buf = Vec::new();
        write_u32_le(&mut buf, MAX_SEQUENCE + 1).unwrap();
        assert!(matches!(
            read_f64_seq(&mut buf.as_slice()),
            Err(CheckpointError::Malformed { .. })
        ));
    }
}
