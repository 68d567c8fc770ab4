use std::path::PathBuf;
use thiserror::Error;

/// Failures raised by the on-disk array store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Zarr error: {0}")]
    Zarr(String),
    #[error("{} is not a zarr group", .0.display())]
    NotAGroup(PathBuf),
    #[error("refusing to overwrite {}: it exists and is not a zarr store", .0.display())]
    Occupied(PathBuf),
    #[error("array `{0}` not found in store")]
    MissingArray(String),
    #[error("invalid store key `{0}`")]
    InvalidKey(String),
    #[error("array `{key}` has data type {found}, expected {expected}")]
    DType {
        key: String,
        found: String,
        expected: String,
    },
    #[error("Shape error: {0}")]
    Shape(String),
    #[error("Encoding error: {0}")]
    Encoding(String),
}
