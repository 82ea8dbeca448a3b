use crate::io::is_gz;
use flate2::{Compression, write::GzEncoder};
use std::{
    fs::File,
    io::{BufWriter, Stdout, Write, stdout},
    path::Path,
};

/// A writer over a regular file, a gzip compressed file, or stdout. A
/// [`BufWriter`] is used for all variants.
pub enum WriteFileZipStdout {
    /// A writer for a regular uncompressed file.
    File(BufWriter<File>),
    /// A writer for a gzip compressed file.
    Zipped(GzEncoder<BufWriter<File>>),
    /// A writer for uncompressed data to stdout.
    Stdout(BufWriter<Stdout>),
}

impl WriteFileZipStdout {
    /// Creates a writer for `path`, zipped if the path ends in `.gz`, or
    /// for stdout when no path is given.
    ///
    /// ## Errors
    ///
    /// If a path was provided, IO errors when creating the file are
    /// propagated.
    pub fn create(path: Option<impl AsRef<Path>>) -> std::io::Result<Self> {
        let writer = match path {
            Some(path) => {
                let bufwriter = BufWriter::new(File::create(&path)?);

                if is_gz(path) {
                    Self::Zipped(GzEncoder::new(bufwriter, Compression::default()))
                } else {
                    Self::File(bufwriter)
                }
            }
            None => Self::Stdout(BufWriter::new(stdout())),
        };

        Ok(writer)
    }
}

impl Write for WriteFileZipStdout {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            WriteFileZipStdout::File(writer) => writer.write(buf),
            WriteFileZipStdout::Zipped(writer) => writer.write(buf),
            WriteFileZipStdout::Stdout(writer) => writer.write(buf),
        }
    }

    #[inline]
    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            WriteFileZipStdout::File(writer) => writer.flush(),
            WriteFileZipStdout::Zipped(writer) => writer.flush(),
            WriteFileZipStdout::Stdout(writer) => writer.flush(),
        }
    }
}
