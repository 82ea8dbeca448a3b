use crate::{align::settings::AlnSettings, error::AlnError, io::ReadFileZip};
use std::{
    io::{BufRead, BufReader, Read},
    path::Path,
};

/// Applies a scoring-matrix file to `settings`.
///
/// One rule per line: `<ref_sym> <qry_sym> <signed_int>`. Blank lines are
/// ignored and lines starting with `\\` or `//` are comments. Pairs not
/// mentioned keep their current (default) scores.
///
/// ## Errors
///
/// Returns [`AlnError::InvalidScoreFile`] with the 1-based line number of
/// the first malformed line, and propagates IO errors.
pub fn read_score_file(path: impl AsRef<Path>, settings: &mut AlnSettings) -> Result<(), AlnError> {
    let reader = ReadFileZip::open(&path)?;
    apply_score_rules(reader, settings).map_err(|e| e.with_path(path.as_ref()))
}

/// Parses scoring rules from any readable source. See [`read_score_file`].
///
/// ## Errors
///
/// As for [`read_score_file`], without path context.
pub fn apply_score_rules<R: Read>(reader: R, settings: &mut AlnSettings) -> Result<(), AlnError> {
    let reader = BufReader::new(reader);

    for (line_on, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with("\\\\") || trimmed.starts_with("//") {
            continue;
        }

        let mut fields = trimmed.split_ascii_whitespace();
        let rule = (fields.next(), fields.next(), fields.next(), fields.next());

        let (Some(ref_sym), Some(qry_sym), Some(score), None) = rule else {
            return Err(malformed(line_on));
        };

        let (&[ref_sym], &[qry_sym]) = (ref_sym.as_bytes(), qry_sym.as_bytes()) else {
            return Err(malformed(line_on));
        };

        if !ref_sym.is_ascii_alphabetic() || !qry_sym.is_ascii_alphabetic() {
            return Err(malformed(line_on));
        }

        let Ok(score) = score.parse::<i16>() else {
            return Err(malformed(line_on));
        };

        settings.set_score(ref_sym, qry_sym, score);
    }

    Ok(())
}

fn malformed(line_on: usize) -> AlnError {
    AlnError::InvalidScoreFile {
        line: line_on + 1,
        path: None,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::align::settings::{DEFAULT_MATCH, DEFAULT_MISMATCH};

    #[test]
    fn test_rules_update_cells() {
        let mut settings = AlnSettings::default();
        let input = b"a t -2\n\n// a comment\n\\\\ another comment\nG G 9\n";

        apply_score_rules(&input[..], &mut settings).unwrap();

        assert_eq!(settings.score(b'A', b'T'), -2);
        assert_eq!(settings.score(b'G', b'G'), 9);
        // Unmentioned pairs keep their defaults
        assert_eq!(settings.score(b'T', b'A'), DEFAULT_MISMATCH);
        assert_eq!(settings.score(b'C', b'C'), DEFAULT_MATCH);
    }

    #[test]
    fn test_malformed_line_is_reported_with_number() {
        let mut settings = AlnSettings::default();
        let input = b"a t -2\na c\n";

        let err = apply_score_rules(&input[..], &mut settings).unwrap_err();
        assert!(matches!(err, AlnError::InvalidScoreFile { line: 2, .. }));
    }

    #[test]
    fn test_non_numeric_score_is_malformed() {
        let mut settings = AlnSettings::default();
        let input = b"a t five\n";

        let err = apply_score_rules(&input[..], &mut settings).unwrap_err();
        assert!(matches!(err, AlnError::InvalidScoreFile { line: 1, .. }));
    }

    #[test]
    fn test_extra_fields_are_malformed() {
        let mut settings = AlnSettings::default();
        let input = b"a t -2 junk\n";

        let err = apply_score_rules(&input[..], &mut settings).unwrap_err();
        assert!(matches!(err, AlnError::InvalidScoreFile { line: 1, .. }));
    }
}
