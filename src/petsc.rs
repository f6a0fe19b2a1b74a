//! PETSc binary vectors as written by `VecView` with a binary viewer.
//!
//! Layout (big-endian): `i32` class id, `i32` length, then the `f64` values.

use {
    anyhow::{Context, Result},
    byteorder::{BigEndian, ByteOrder, WriteBytesExt},
    std::{
        fs::{self, File},
        io::{BufWriter, Write},
        path::Path,
    },
    thiserror::Error,
};

/// Class id PETSc writes in front of a `Vec`
pub const VEC_FILE_CLASSID: i32 = 1_211_214;

#[derive(Debug, Error, PartialEq)]
pub enum PetscError {
    #[error("file too short for a vector header ({0} bytes)")]
    MissingHeader(usize),
    #[error("unexpected class id {0}, expected a Vec ({})", VEC_FILE_CLASSID)]
    ClassId(i32),
    #[error("negative vector length {0}")]
    NegativeLength(i32),
    #[error("vector of length {expected} holds only {found} values")]
    Truncated { expected: usize, found: usize },
    #[error("{0} trailing byte(s) after the vector values")]
    Trailing(usize),
}

/// Decodes a single PETSc vector from a byte buffer
pub fn decode_vec(bytes: &[u8]) -> Result<Vec<f64>, PetscError> {
    if bytes.len() < 8 {
        return Err(PetscError::MissingHeader(bytes.len()));
    }

    let classid = BigEndian::read_i32(&bytes[0..4]);
    if classid != VEC_FILE_CLASSID {
        return Err(PetscError::ClassId(classid));
    }

    let n = BigEndian::read_i32(&bytes[4..8]);
    if n < 0 {
        return Err(PetscError::NegativeLength(n));
    }
    let n = n as usize;

    let body = &bytes[8..];
    if body.len() < 8 * n {
        return Err(PetscError::Truncated {
            expected: n,
            found: body.len() / 8,
        });
    }

    if body.len() > 8 * n {
        return Err(PetscError::Trailing(body.len() - 8 * n));
    }

    Ok(body
        .chunks(8)
        .map(BigEndian::read_f64)
        .collect())
}

pub fn read_vec<P: AsRef<Path>>(path: P) -> Result<Vec<f64>> {
    let path = path.as_ref();
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    decode_vec(&bytes).with_context(|| format!("Invalid PETSc vector in {}", path.display()))
}

pub fn write_vec<P: AsRef<Path>>(path: P, values: &[f64]) -> Result<()> {
    let path = path.as_ref();
    let mut f = BufWriter::new(
        File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
    );

    f.write_i32::<BigEndian>(VEC_FILE_CLASSID)?;
    f.write_i32::<BigEndian>(values.len() as i32)?;
    for &value in values {
        f.write_f64::<BigEndian>(value)?;
    }
    f.flush()?;

    Ok(())
}
