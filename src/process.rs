use crate::{
    align::{
        hirschberg::hirschberg,
        matrix::AlignmentMatrix,
        multi::{collect_alt_alignments, filter_overlap_ref_qry},
        needleman::needleman,
        settings::{AlnSettings, Kernel, MultiReport},
        traceback::Alignment,
        waterman::waterman,
    },
    args::{AlnSeqArgs, ParsedArgs, parse_args},
    error::AlnError,
    fmt::{PrintOptions, write_alignment},
    io::WriteFileZipStdout,
    seq::Sequence,
};
use std::{
    io::Write,
    path::{Path, PathBuf},
};

/// Runs one alignment from parsed command line arguments: load inputs,
/// run the selected kernel, rebuild the alignment(s), and print them.
///
/// ## Errors
///
/// Propagates input parsing, kernel, and output IO errors; `main` turns
/// them into a diagnostic line and a nonzero exit.
pub fn align_process(args: AlnSeqArgs) -> Result<(), AlnError> {
    let ParsedArgs {
        mut reference,
        mut query,
        settings,
        output,
        print,
    } = parse_args(args)?;

    reference.to_index();
    query.to_index();

    let mut writer = WriteFileZipStdout::create(output.as_ref())?;

    match settings.kernel {
        Kernel::Needleman => {
            let matrix = needleman(&reference, &query, &settings)?;
            let aln = Alignment::from_matrix(&reference, &query, &matrix, &matrix.best, true)?;

            reference.from_index();
            query.from_index();
            write_alignment(&mut writer, &aln, &reference, &query, matrix.best.score, &print)?;
        }

        Kernel::Hirschberg => {
            let tape = hirschberg(&reference, &query, &settings)?;
            let aln = Alignment::from_tape(&reference, &query, &tape)?;
            let score = aln.rescore(&reference, &query, &settings);

            reference.from_index();
            query.from_index();
            write_alignment(&mut writer, &aln, &reference, &query, score, &print)?;
        }

        Kernel::Waterman => {
            run_waterman(&mut reference, &mut query, &settings, output.as_deref(), &mut writer, &print)?;
        }
    }

    writer.flush()?;
    Ok(())
}

/// The Smith-Waterman arm of [`align_process`], including the two
/// multi-report modes.
fn run_waterman(
    reference: &mut Sequence, query: &mut Sequence, settings: &AlnSettings, output: Option<&Path>,
    writer: &mut WriteFileZipStdout, print: &PrintOptions,
) -> Result<(), AlnError> {
    let mut scan_writer = match settings.multi {
        MultiReport::MatrixScan => Some(WriteFileZipStdout::create(Some(matrix_scan_path(output)))?),
        _ => None,
    };

    let matrix = waterman(
        reference,
        query,
        settings,
        scan_writer.as_mut().map(|writer| writer as &mut dyn Write),
    )?;

    let best = Alignment::from_matrix(reference, query, &matrix, &matrix.best, true)?;
    let alternates = collect_alternates(reference, query, settings, &matrix)?;

    reference.from_index();
    query.from_index();

    write_alignment(writer, &best, reference, query, matrix.best.score, print)?;

    for (aln, score) in alternates {
        writeln!(writer)?;
        write_alignment(writer, &aln, reference, query, score, print)?;
    }

    if let Some(mut scan_writer) = scan_writer {
        scan_writer.flush()?;
    }

    Ok(())
}

/// Rebuilds the kept alternative alignments of the ref/query scan mode:
/// overlap-filtered, above the score threshold, and long enough.
fn collect_alternates(
    reference: &Sequence, query: &Sequence, settings: &AlnSettings, matrix: &AlignmentMatrix,
) -> Result<Vec<(Alignment, i64)>, AlnError> {
    if settings.multi != MultiReport::RefQueryScan {
        return Ok(Vec::new());
    }

    let kept = filter_overlap_ref_qry(collect_alt_alignments(matrix));
    let mut alternates = Vec::new();

    for alt in kept {
        if alt.entry.score < settings.min_score {
            continue;
        }
        let aln = Alignment::from_matrix(reference, query, matrix, &alt.entry, true)?;
        if aln.aligned_len() < settings.min_bases {
            continue;
        }
        alternates.push((aln, alt.entry.score));
    }

    Ok(alternates)
}

/// The side-channel path for matrix-scan output: `<prefix>--matrix-scan.aln`
/// next to the main output, or under a fixed prefix when writing to stdout.
fn matrix_scan_path(output: Option<&Path>) -> PathBuf {
    let prefix = match output {
        Some(path) => path.to_string_lossy().into_owned(),
        None => String::from("alnseq"),
    };
    PathBuf::from(format!("{prefix}--matrix-scan.aln"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_matrix_scan_path_uses_output_prefix() {
        assert_eq!(
            matrix_scan_path(Some(Path::new("results/run1.aln"))),
            PathBuf::from("results/run1.aln--matrix-scan.aln")
        );
        assert_eq!(matrix_scan_path(None), PathBuf::from("alnseq--matrix-scan.aln"));
    }
}
