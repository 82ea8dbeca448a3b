use std::path::PathBuf;
use thiserror::Error;

/// The error type for alignment, parsing, and IO failures in alnseq.
///
/// Kernels and the alignment builder are all-or-nothing: on failure they
/// release everything they own and surface one of these variants. Usage
/// errors are handled by clap before any of this code runs.
#[derive(Debug, Error)]
pub enum AlnError {
    /// An allocation for a score row, direction matrix, or alignment buffer
    /// failed.
    #[error("failed to allocate {bytes} bytes for {what}")]
    Memory { what: &'static str, bytes: usize },

    /// The FASTA input was malformed.
    #[error("invalid FASTA{}: {reason}", display_path(.path))]
    InvalidFasta { reason: String, path: Option<PathBuf> },

    /// A line in the scoring-matrix file could not be parsed.
    #[error("invalid scoring-matrix file{}: malformed line {line}", display_path(.path))]
    InvalidScoreFile { line: usize, path: Option<PathBuf> },

    /// An underlying IO failure when opening, reading, or writing files.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AlnError {
    /// Attaches a path to the FASTA and score-file variants for better
    /// diagnostics at the CLI boundary.
    #[must_use]
    pub fn with_path(self, new_path: impl Into<PathBuf>) -> Self {
        match self {
            AlnError::InvalidFasta { reason, .. } => AlnError::InvalidFasta {
                reason,
                path: Some(new_path.into()),
            },
            AlnError::InvalidScoreFile { line, .. } => AlnError::InvalidScoreFile {
                line,
                path: Some(new_path.into()),
            },
            other => other,
        }
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(path) => format!(" ({})", path.display()),
        None => String::new(),
    }
}

/// Allocates a `Vec` filled with `value`, converting allocation failure into
/// [`AlnError::Memory`] instead of aborting.
pub(crate) fn try_filled_vec<T: Clone>(value: T, len: usize, what: &'static str) -> Result<Vec<T>, AlnError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| AlnError::Memory {
        what,
        bytes: len * size_of::<T>(),
    })?;
    v.resize(len, value);
    Ok(v)
}
