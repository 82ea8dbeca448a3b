use crate::{
    align::settings::{
        AlnSettings, DEFAULT_GAP_EXTEND, DEFAULT_GAP_OPEN, DEFAULT_MIN_BASES, DEFAULT_MIN_SCORE, Kernel, MultiReport,
        TieBreak,
    },
    error::AlnError,
    fmt::{OutputFormat, PrintOptions},
    io::{read_fasta_file, read_score_file},
    seq::Sequence,
};
use clap::{ArgGroup, Parser};
use std::path::PathBuf;

/// The command line arguments for alnseq
#[derive(Parser, Debug)]
#[command(name = "alnseq", version, about = "Pairwise sequence alignment with selectable kernels")]
#[command(group(ArgGroup::new("kernel").args(["use_needle", "use_water", "use_hirschberg"])))]
#[command(group(ArgGroup::new("tie_break").args([
    "match_ins_del", "match_del_ins", "ins_match_del", "del_match_ins", "ins_del_match", "del_ins_match",
])))]
#[command(group(ArgGroup::new("format").args([
    "format_expand_cig", "format_emboss", "format_clustal", "format_fasta",
])))]
pub struct AlnSeqArgs {
    /// Path to the FASTA file containing the query sequence
    #[arg(long)]
    pub query: PathBuf,

    /// Path to the FASTA file containing the reference sequence
    #[arg(long = "ref")]
    pub ref_file: PathBuf,

    /// Output filepath for the alignment; prints to STDOUT if not provided
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Cost of the first position of a gap (negative is a penalty)
    #[arg(long, default_value_t = DEFAULT_GAP_OPEN, allow_negative_numbers = true)]
    pub gap_open: i32,

    /// Cost of each gap position after the first
    #[arg(long, default_value_t = DEFAULT_GAP_EXTEND, allow_negative_numbers = true)]
    pub gap_extend: i32,

    /// File with substitution-score rules (`ref qry score` per line);
    /// unspecified pairs keep the built-in IUPAC defaults
    #[arg(long)]
    pub score_matrix: Option<PathBuf>,

    /// Use the Needleman-Wunsch (global) aligner [default]
    #[arg(long)]
    pub use_needle: bool,

    /// Use the Smith-Waterman (local) aligner
    #[arg(long)]
    pub use_water: bool,

    /// Use the Hirschberg (linear-space global) aligner
    #[arg(long)]
    pub use_hirschberg: bool,

    /// Smith-Waterman only: also report the best alignment ending at each
    /// reference and query base
    #[arg(long, conflicts_with_all = ["use_needle", "use_hirschberg", "matrix_scan_water"])]
    pub query_ref_scan_water: bool,

    /// Smith-Waterman only: write one CIGAR line per local-alignment
    /// terminus to `<prefix>--matrix-scan.aln`
    #[arg(long, conflicts_with_all = ["use_needle", "use_hirschberg"])]
    pub matrix_scan_water: bool,

    /// Minimum score for keeping a non-best alignment in the multi-report
    /// modes
    #[arg(long, default_value_t = DEFAULT_MIN_SCORE, allow_negative_numbers = true)]
    pub min_score: i64,

    /// Minimum number of aligned bases for keeping a non-best alignment
    #[arg(long, default_value_t = DEFAULT_MIN_BASES)]
    pub min_bases: usize,

    /// On equal scores prefer matches/SNPs, then insertions, then
    /// deletions [default]
    #[arg(long)]
    pub match_ins_del: bool,

    /// On equal scores prefer matches/SNPs, then deletions, then
    /// insertions
    #[arg(long)]
    pub match_del_ins: bool,

    /// On equal scores prefer insertions, then matches/SNPs, then
    /// deletions
    #[arg(long)]
    pub ins_match_del: bool,

    /// On equal scores prefer deletions, then matches/SNPs, then
    /// insertions
    #[arg(long)]
    pub del_match_ins: bool,

    /// On equal scores prefer insertions, then deletions, then
    /// matches/SNPs
    #[arg(long)]
    pub ins_del_match: bool,

    /// On equal scores prefer deletions, then insertions, then
    /// matches/SNPs
    #[arg(long)]
    pub del_ins_match: bool,

    /// Print query, `= X I D S` annotation, and reference lines [default]
    #[arg(long)]
    pub format_expand_cig: bool,

    /// Print EMBOSS-style blocks
    #[arg(long)]
    pub format_emboss: bool,

    /// Print clustal-style blocks
    #[arg(long)]
    pub format_clustal: bool,

    /// Print the two gapped sequences as FASTA records
    #[arg(long)]
    pub format_fasta: bool,

    /// Maximum alignment characters per output line (0 disables wrapping)
    #[arg(long, default_value_t = 59)]
    pub line_wrap: usize,

    /// Print only the aligned region
    #[arg(long, conflicts_with = "print_unaligned")]
    pub print_aligned: bool,

    /// Print the full sequences, soft-masking the unaligned flanks
    /// [default]
    #[arg(long)]
    pub print_unaligned: bool,

    /// Print base-position columns [default]
    #[arg(long, conflicts_with = "no_positions")]
    pub print_positions: bool,

    /// Omit base-position columns
    #[arg(long)]
    pub no_positions: bool,
}

/// The parsed and validated inputs for one alignment run.
pub struct ParsedArgs {
    pub reference: Sequence,
    pub query:     Sequence,
    pub settings:  AlnSettings,
    pub output:    Option<PathBuf>,
    pub print:     PrintOptions,
}

/// Loads the sequences and scoring matrix and folds the flag soup into the
/// settings and print options.
///
/// ## Errors
///
/// Propagates FASTA, scoring-matrix, and IO errors with the offending path
/// attached. Flag conflicts are already rejected by clap.
pub fn parse_args(args: AlnSeqArgs) -> Result<ParsedArgs, AlnError> {
    let mut settings = AlnSettings {
        gap_open: args.gap_open,
        gap_extend: args.gap_extend,
        min_score: args.min_score,
        min_bases: args.min_bases,
        ..AlnSettings::default()
    };

    settings.kernel = if args.use_water || args.query_ref_scan_water || args.matrix_scan_water {
        Kernel::Waterman
    } else if args.use_hirschberg {
        Kernel::Hirschberg
    } else {
        Kernel::Needleman
    };

    settings.multi = if args.query_ref_scan_water {
        MultiReport::RefQueryScan
    } else if args.matrix_scan_water {
        MultiReport::MatrixScan
    } else {
        MultiReport::Off
    };

    settings.tie_break = if args.match_del_ins {
        TieBreak::MatchDelIns
    } else if args.ins_match_del {
        TieBreak::InsMatchDel
    } else if args.del_match_ins {
        TieBreak::DelMatchIns
    } else if args.ins_del_match {
        TieBreak::InsDelMatch
    } else if args.del_ins_match {
        TieBreak::DelInsMatch
    } else {
        TieBreak::MatchInsDel
    };

    if let Some(path) = &args.score_matrix {
        read_score_file(path, &mut settings)?;
    }

    let reference = read_fasta_file(&args.ref_file)?;
    let query = read_fasta_file(&args.query)?;

    let print = PrintOptions {
        format:       if args.format_emboss {
            OutputFormat::Emboss
        } else if args.format_clustal {
            OutputFormat::Clustal
        } else if args.format_fasta {
            OutputFormat::Fasta
        } else {
            OutputFormat::ExpandedCigar
        },
        line_wrap:    args.line_wrap,
        positions:    !args.no_positions,
        aligned_only: args.print_aligned,
    };

    Ok(ParsedArgs {
        reference,
        query,
        settings,
        output: args.out,
        print,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_clap_definition_is_valid() {
        AlnSeqArgs::command().debug_assert();
    }

    #[test]
    fn test_scan_flags_select_waterman() {
        let args = AlnSeqArgs::parse_from(["alnseq", "--query", "q.fa", "--ref", "r.fa", "--matrix-scan-water"]);
        assert!(!args.use_water);
        assert!(args.matrix_scan_water);
    }

    #[test]
    fn test_kernel_flags_conflict() {
        let result =
            AlnSeqArgs::try_parse_from(["alnseq", "--query", "q.fa", "--ref", "r.fa", "--use-needle", "--use-water"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_scan_modes_conflict() {
        let result = AlnSeqArgs::try_parse_from([
            "alnseq",
            "--query",
            "q.fa",
            "--ref",
            "r.fa",
            "--query-ref-scan-water",
            "--matrix-scan-water",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_penalties_parse() {
        let args = AlnSeqArgs::parse_from([
            "alnseq",
            "--query",
            "q.fa",
            "--ref",
            "r.fa",
            "--gap-open",
            "-12",
            "--gap-extend",
            "-2",
        ]);
        assert_eq!(args.gap_open, -12);
        assert_eq!(args.gap_extend, -2);
    }
}
