use crate::{error::AlnError, io::ReadFileZip, seq::Sequence};
use std::{
    io::{BufRead, BufReader, Read},
    path::Path,
};

/// Reads the single FASTA record of a file into a [`Sequence`].
///
/// The file may be gzip compressed (`.gz`). The header line must start
/// with `>`; its remainder (trimmed) becomes the sequence id. Sequence
/// lines are uppercased with all whitespace stripped.
///
/// ## Errors
///
/// Returns [`AlnError::InvalidFasta`] for a missing or empty header,
/// non-alphabetic sequence bytes, an empty sequence, or a second record,
/// and propagates IO errors. The path is attached for diagnostics.
pub fn read_fasta_file(path: impl AsRef<Path>) -> Result<Sequence, AlnError> {
    let reader = ReadFileZip::open(&path)?;
    read_fasta(reader).map_err(|e| e.with_path(path.as_ref()))
}

/// Reads one FASTA record from any readable source. See
/// [`read_fasta_file`] for the format rules.
///
/// ## Errors
///
/// As for [`read_fasta_file`], without path context.
pub fn read_fasta<R: Read>(reader: R) -> Result<Sequence, AlnError> {
    let reader = BufReader::new(reader);
    let mut id = None;
    let mut seq: Vec<u8> = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        if let Some(header) = trimmed.strip_prefix('>') {
            if id.is_some() {
                return Err(invalid("more than one record in the file"));
            }
            let header = header.trim();
            if header.is_empty() {
                return Err(invalid("record header is empty"));
            }
            id = Some(header.to_string());
        } else {
            if id.is_none() {
                return Err(invalid("missing '>' header line"));
            }
            for byte in trimmed.bytes() {
                if byte.is_ascii_whitespace() {
                    continue;
                }
                if !byte.is_ascii_alphabetic() {
                    return Err(invalid(format!("non-alphabetic sequence byte {:?}", byte as char)));
                }
                seq.push(byte.to_ascii_uppercase());
            }
        }
    }

    let Some(id) = id else {
        return Err(invalid("file holds no FASTA record"));
    };

    if seq.is_empty() {
        return Err(invalid("record has no sequence"));
    }

    Ok(Sequence::new(id, seq))
}

fn invalid(reason: impl Into<String>) -> AlnError {
    AlnError::InvalidFasta {
        reason: reason.into(),
        path:   None,
    }
}
