use crate::io::is_gz;
use flate2::read::MultiGzDecoder;
use std::{fs::File, io::Read, path::Path};

/// A reader over either a regular file or a gzip compressed file, chosen by
/// the `.gz` extension.
pub enum ReadFileZip {
    /// A regular uncompressed file.
    File(File),
    /// A gzip compressed file, decoded lazily.
    Zipped(MultiGzDecoder<File>),
}

impl ReadFileZip {
    /// Opens a [`ReadFileZip`] from a path, using the [`Zipped`] variant if
    /// the file ends in `.gz`.
    ///
    /// ## Errors
    ///
    /// Any IO errors when opening the file are propagated.
    ///
    /// [`Zipped`]: ReadFileZip::Zipped
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::open(&path)?;

        if is_gz(path) {
            Ok(Self::Zipped(MultiGzDecoder::new(file)))
        } else {
            Ok(Self::File(file))
        }
    }
}

impl Read for ReadFileZip {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            ReadFileZip::File(file) => file.read(buf),
            ReadFileZip::Zipped(decoder) => decoder.read(buf),
        }
    }
}
