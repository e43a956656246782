use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;

/// Possible errors that arise while reading distance-matrix input or
/// serializing the finished tree.
#[derive(Debug)]
pub enum NjError {
    /// The distance file could not be read or written.
    Io(io::Error),
    /// The distance file is malformed: a token was not numeric where a
    /// number was required, or the declared taxon count disagrees with
    /// the data that follows it.
    InputFormat(String),
    /// Fewer than three taxa were supplied; no unrooted binary tree exists.
    TooFewTaxa(usize),
    /// An internal consistency check failed. This indicates a bug in the
    /// joining engines, not a problem with the input.
    InternalInvariant(String),
}

impl Error for NjError {}

impl Display for NjError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            NjError::Io(err) => format!("I/O error: {err}"),
            NjError::InputFormat(msg) => format!("Malformed distance matrix: {msg}"),
            NjError::TooFewTaxa(n) => {
                format!("At least 3 taxa are needed for an unrooted binary tree, got {n}")
            }
            NjError::InternalInvariant(msg) => format!("Internal invariant violated: {msg}"),
        };
        write!(f, "{message}")
    }
}

impl From<io::Error> for NjError {
    fn from(err: io::Error) -> Self {
        NjError::Io(err)
    }
}
