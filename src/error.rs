use thiserror::Error;

/// Errors surfaced by a [`crate::Writer`] or [`crate::Reader`].
///
/// Every error reaching an archive's caller is one of these three kinds,
/// mirroring the taxonomy the wire format itself distinguishes between.
#[derive(Debug, Error)]
pub enum Error {
    /// The sink accepted fewer bytes than the Writer asked it to write.
    #[error("write failed: sink accepted {written} of {requested} requested bytes")]
    WriteFailed {
        /// Bytes actually written.
        written: usize,
        /// Bytes requested.
        requested: usize,
    },

    /// The source delivered fewer bytes than requested, a string payload was
    /// not valid UTF-8, or a tagged-union discriminant had no matching variant.
    #[error("read failed: {0}")]
    ReadFailed(String),

    /// The header's `encodingVersion` field was not `1`.
    #[error("incompatible archiver: expected encoding version 1, found {0}")]
    IncompatibleArchiver(i64),

    /// The underlying sink or source reported an I/O failure not already
    /// classified as one of the kinds above.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
