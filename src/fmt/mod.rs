//! Rendering of built alignments in the four supported output formats.
//!
//! All formats are driven by the same three gapped rows (query, annotation,
//! reference) derived from the alignment codes; sequences must be back in
//! letter form when rendering.

use crate::{
    align::{iupac::bases_match, traceback::AlnCode, traceback::Alignment},
    seq::Sequence,
};
use std::io::Write;

/// The output format for alignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Query, annotation (`= X I D S`), and reference lines.
    #[default]
    ExpandedCigar,
    /// EMBOSS-style blocks with `|` marking matches.
    Emboss,
    /// Clustal-style blocks with `*` marking matches.
    Clustal,
    /// Two gapped FASTA records.
    Fasta,
}

impl OutputFormat {
    /// The smallest permitted wrap column for this format.
    #[inline]
    #[must_use]
    pub fn min_line_wrap(self) -> usize {
        match self {
            OutputFormat::Fasta => 10,
            OutputFormat::Clustal => 32,
            OutputFormat::ExpandedCigar | OutputFormat::Emboss => 42,
        }
    }
}

/// Presentation options for [`write_alignment`].
#[derive(Debug, Clone)]
pub struct PrintOptions {
    pub format:       OutputFormat,
    /// Wrap column; 0 disables wrapping. Values below the format's minimum
    /// are raised to it.
    pub line_wrap:    usize,
    /// Whether to print base-position columns (where the format has them).
    pub positions:    bool,
    /// Whether to print only the aligned region, dropping soft-masked
    /// flanks.
    pub aligned_only: bool,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            format:       OutputFormat::default(),
            line_wrap:    59,
            positions:    true,
            aligned_only: false,
        }
    }
}

/// Renders `aln` between `ref_seq` and `qry_seq` (in letter form) to
/// `out`.
///
/// ## Errors
///
/// Propagates IO errors from the writer.
pub fn write_alignment<W: Write>(
    out: &mut W, aln: &Alignment, ref_seq: &Sequence, qry_seq: &Sequence, score: i64, opts: &PrintOptions,
) -> std::io::Result<()> {
    let rows = Rows::build(aln, ref_seq, qry_seq, opts.aligned_only);

    match opts.format {
        OutputFormat::ExpandedCigar => write_expanded_cigar(out, &rows, ref_seq, qry_seq, score, opts),
        OutputFormat::Emboss => write_emboss(out, &rows, ref_seq, qry_seq, score, opts),
        OutputFormat::Clustal => write_clustal(out, &rows, ref_seq, qry_seq, opts),
        OutputFormat::Fasta => write_fasta(out, &rows, ref_seq, qry_seq, opts),
    }
}

/// The three gapped display rows plus the 1-based position of the first
/// real base each row starts at.
struct Rows {
    qry:       Vec<u8>,
    refr:      Vec<u8>,
    /// Annotation in expanded-CIGAR letters: `=`, `X`, `I`, `D`, `S`.
    ann:       Vec<u8>,
    qry_from:  usize,
    ref_from:  usize,
}

impl Rows {
    fn build(aln: &Alignment, ref_seq: &Sequence, qry_seq: &Sequence, aligned_only: bool) -> Self {
        // Soft head codes consume bases before the aligned start
        let mut head_q = 0;
        let mut head_r = 0;
        for code in &aln.codes {
            match code {
                AlnCode::SoftQ => head_q += 1,
                AlnCode::SoftR => head_r += 1,
                AlnCode::SoftBoth => {
                    head_q += 1;
                    head_r += 1;
                }
                _ => break,
            }
        }

        let mut qc = aln.qry_start - head_q;
        let mut rc = aln.ref_start - head_r;
        let mut rows = Self {
            qry:      Vec::with_capacity(aln.codes.len()),
            refr:     Vec::with_capacity(aln.codes.len()),
            ann:      Vec::with_capacity(aln.codes.len()),
            qry_from: if aligned_only { aln.qry_start + 1 } else { qc + 1 },
            ref_from: if aligned_only { aln.ref_start + 1 } else { rc + 1 },
        };

        for code in &aln.codes {
            let soft = matches!(code, AlnCode::SoftQ | AlnCode::SoftR | AlnCode::SoftBoth);
            if !(soft && aligned_only) {
                let (q_char, r_char, ann) = match code {
                    AlnCode::Base => {
                        let (q, r) = (qry_seq.seq[qc], ref_seq.seq[rc]);
                        (q, r, if bases_match(q, r) { b'=' } else { b'X' })
                    }
                    AlnCode::Ins => (qry_seq.seq[qc], b'-', b'I'),
                    AlnCode::Del => (b'-', ref_seq.seq[rc], b'D'),
                    AlnCode::SoftQ => (qry_seq.seq[qc], b'-', b'S'),
                    AlnCode::SoftR => (b'-', ref_seq.seq[rc], b'S'),
                    AlnCode::SoftBoth => (qry_seq.seq[qc], ref_seq.seq[rc], b'S'),
                };
                rows.qry.push(q_char);
                rows.refr.push(r_char);
                rows.ann.push(ann);
            }

            match code {
                AlnCode::Base | AlnCode::SoftBoth => {
                    qc += 1;
                    rc += 1;
                }
                AlnCode::Ins | AlnCode::SoftQ => qc += 1,
                AlnCode::Del | AlnCode::SoftR => rc += 1,
            }
        }

        rows
    }

    fn len(&self) -> usize {
        self.ann.len()
    }
}

fn effective_wrap(opts: &PrintOptions) -> usize {
    if opts.line_wrap == 0 {
        usize::MAX
    } else {
        opts.line_wrap.max(opts.format.min_line_wrap())
    }
}

/// The number of real (non-gap) bases in a row chunk.
fn bases_in(chunk: &[u8]) -> usize {
    chunk.iter().filter(|&&b| b != b'-').count()
}

/// The first whitespace-delimited token of an id, truncated for display.
fn display_name(id: &str, width: usize) -> String {
    let token = id.split_whitespace().next().unwrap_or("?");
    let mut name = String::with_capacity(width);
    name.push_str(if token.len() > width { &token[..width] } else { token });
    name
}

fn write_expanded_cigar<W: Write>(
    out: &mut W, rows: &Rows, ref_seq: &Sequence, qry_seq: &Sequence, score: i64, opts: &PrintOptions,
) -> std::io::Result<()> {
    writeln!(out, "# Query: {}", qry_seq.id)?;
    writeln!(out, "# Ref:   {}", ref_seq.id)?;
    writeln!(out, "# Score: {score}")?;

    let wrap = effective_wrap(opts);
    let mut qry_on = rows.qry_from;
    let mut ref_on = rows.ref_from;
    let mut start = 0;

    while start < rows.len() {
        let stop = rows.len().min(start.saturating_add(wrap));
        let (q_chunk, r_chunk, a_chunk) = (&rows.qry[start..stop], &rows.refr[start..stop], &rows.ann[start..stop]);

        let q_bases = bases_in(q_chunk);
        let r_bases = bases_in(r_chunk);

        writeln!(out)?;
        if opts.positions {
            writeln!(
                out,
                "Qry: {:>8} {} {}",
                qry_on,
                String::from_utf8_lossy(q_chunk),
                qry_on + q_bases.saturating_sub(1)
            )?;
            writeln!(out, "     {:>8} {}", "", String::from_utf8_lossy(a_chunk))?;
            writeln!(
                out,
                "Ref: {:>8} {} {}",
                ref_on,
                String::from_utf8_lossy(r_chunk),
                ref_on + r_bases.saturating_sub(1)
            )?;
        } else {
            writeln!(out, "Qry: {}", String::from_utf8_lossy(q_chunk))?;
            writeln!(out, "     {}", String::from_utf8_lossy(a_chunk))?;
            writeln!(out, "Ref: {}", String::from_utf8_lossy(r_chunk))?;
        }

        qry_on += q_bases;
        ref_on += r_bases;
        start = stop;
    }

    Ok(())
}

fn write_emboss<W: Write>(
    out: &mut W, rows: &Rows, ref_seq: &Sequence, qry_seq: &Sequence, score: i64, opts: &PrintOptions,
) -> std::io::Result<()> {
    writeln!(out, "########################################")?;
    writeln!(out, "# Program: alnseq")?;
    writeln!(out, "# Aligned_sequences: 2")?;
    writeln!(out, "# 1: {}", qry_seq.id)?;
    writeln!(out, "# 2: {}", ref_seq.id)?;
    writeln!(out, "# Score: {score}")?;
    writeln!(out, "########################################")?;

    let qry_name = display_name(&qry_seq.id, 13);
    let ref_name = display_name(&ref_seq.id, 13);

    let wrap = effective_wrap(opts);
    let mut qry_on = rows.qry_from;
    let mut ref_on = rows.ref_from;
    let mut start = 0;

    while start < rows.len() {
        let stop = rows.len().min(start.saturating_add(wrap));
        let (q_chunk, r_chunk) = (&rows.qry[start..stop], &rows.refr[start..stop]);

        let marks: String = rows.ann[start..stop]
            .iter()
            .map(|&a| if a == b'=' { '|' } else { ' ' })
            .collect();

        let q_bases = bases_in(q_chunk);
        let r_bases = bases_in(r_chunk);

        writeln!(out)?;
        if opts.positions {
            writeln!(
                out,
                "{qry_name:<13} {:>6} {} {}",
                qry_on,
                String::from_utf8_lossy(q_chunk),
                qry_on + q_bases.saturating_sub(1)
            )?;
            writeln!(out, "{:<13} {:>6} {marks}", "", "")?;
            writeln!(
                out,
                "{ref_name:<13} {:>6} {} {}",
                ref_on,
                String::from_utf8_lossy(r_chunk),
                ref_on + r_bases.saturating_sub(1)
            )?;
        } else {
            writeln!(out, "{qry_name:<13} {}", String::from_utf8_lossy(q_chunk))?;
            writeln!(out, "{:<13} {marks}", "")?;
            writeln!(out, "{ref_name:<13} {}", String::from_utf8_lossy(r_chunk))?;
        }

        qry_on += q_bases;
        ref_on += r_bases;
        start = stop;
    }

    Ok(())
}

fn write_clustal<W: Write>(
    out: &mut W, rows: &Rows, ref_seq: &Sequence, qry_seq: &Sequence, opts: &PrintOptions,
) -> std::io::Result<()> {
    writeln!(out, "CLUSTAL format alignment by alnseq")?;

    let qry_name = display_name(&qry_seq.id, 16);
    let ref_name = display_name(&ref_seq.id, 16);

    let wrap = effective_wrap(opts);
    let mut start = 0;

    while start < rows.len() {
        let stop = rows.len().min(start.saturating_add(wrap));

        let stars: String = rows.ann[start..stop]
            .iter()
            .map(|&a| if a == b'=' { '*' } else { ' ' })
            .collect();

        writeln!(out)?;
        writeln!(out, "{qry_name:<16} {}", String::from_utf8_lossy(&rows.qry[start..stop]))?;
        writeln!(out, "{ref_name:<16} {}", String::from_utf8_lossy(&rows.refr[start..stop]))?;
        writeln!(out, "{:<16} {stars}", "")?;

        start = stop;
    }

    Ok(())
}

fn write_fasta<W: Write>(
    out: &mut W, rows: &Rows, ref_seq: &Sequence, qry_seq: &Sequence, opts: &PrintOptions,
) -> std::io::Result<()> {
    let wrap = effective_wrap(opts);

    for (id, row) in [(&qry_seq.id, &rows.qry), (&ref_seq.id, &rows.refr)] {
        writeln!(out, ">{id}")?;
        for chunk in row.chunks(wrap) {
            writeln!(out, "{}", String::from_utf8_lossy(chunk))?;
        }
    }

    Ok(())
}
