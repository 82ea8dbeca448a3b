mod fasta;
mod readers;
mod score_file;
mod writers;

pub use fasta::*;
pub use readers::*;
pub use score_file::*;
pub use writers::*;

use std::path::Path;

/// Whether a path should be treated as gzip compressed, based on its
/// extension.
#[inline]
#[must_use]
pub fn is_gz(path: impl AsRef<Path>) -> bool {
    path.as_ref().extension().is_some_and(|ext| ext == "gz")
}
