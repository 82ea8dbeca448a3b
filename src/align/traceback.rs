use crate::{
    align::{
        iupac::bases_match_indexed,
        matrix::{AlignmentMatrix, ScoreEntry},
        settings::AlnSettings,
        two_bit::{Direction, TwoBitArray},
    },
    error::AlnError,
    seq::Sequence,
};

/// One position of a built alignment.
///
/// `Base` covers both matches and mismatches; the distinction is made
/// against the sequences when counting and rendering. The soft codes mark
/// unaligned flank bases carried along for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlnCode {
    /// A reference base with no query partner.
    Del,
    /// A query base with no reference partner.
    Ins,
    /// A reference and a query base aligned to each other.
    Base,
    /// A soft-masked query base.
    SoftQ,
    /// A soft-masked reference base.
    SoftR,
    /// A soft-masked query base paired with a soft-masked reference base.
    SoftBoth,
}

impl AlnCode {
    #[inline]
    #[must_use]
    fn consumes_qry(self) -> bool {
        matches!(self, AlnCode::Ins | AlnCode::Base | AlnCode::SoftQ | AlnCode::SoftBoth)
    }

    #[inline]
    #[must_use]
    fn consumes_ref(self) -> bool {
        matches!(self, AlnCode::Del | AlnCode::Base | AlnCode::SoftR | AlnCode::SoftBoth)
    }
}

/// A structured alignment: the code sequence, per-kind counts, and the
/// inclusive index-0 coordinates of the aligned region in each sequence.
///
/// Walking the code sequence advances the reference and query cursors
/// exactly to the end coordinates. When one side contributes no bases at
/// all, its end coordinate degenerates to its start.
#[derive(Debug, Clone)]
pub struct Alignment {
    pub codes: Vec<AlnCode>,

    pub num_matches:    usize,
    pub num_mismatches: usize,
    pub num_insertions: usize,
    pub num_deletions:  usize,

    pub ref_start: usize,
    pub ref_end:   usize,
    pub qry_start: usize,
    pub qry_end:   usize,
}

impl Alignment {
    /// Builds an alignment by walking a direction matrix back from
    /// `anchor` to a stop, then reversing the collected codes.
    ///
    /// With `soft_mask`, the unaligned flanks of both aligned sub-ranges
    /// are attached as soft codes, and hanging insertions or deletions at
    /// either end of the path (possible only when the gap-open penalty is
    /// zero) are rewritten into soft codes as well.
    ///
    /// The sequences must be the ones the kernel aligned, still in
    /// lookup-index form.
    ///
    /// ## Errors
    ///
    /// Returns [`AlnError::Memory`] if the code buffer cannot be
    /// allocated.
    pub fn from_matrix(
        ref_seq: &Sequence, qry_seq: &Sequence, matrix: &AlignmentMatrix, anchor: &ScoreEntry, soft_mask: bool,
    ) -> Result<Self, AlnError> {
        let row_len = matrix.ref_len + 1;
        let (end_i, end_j) = matrix.cell_coords(anchor.index);

        let mut codes = try_code_vec(matrix.ref_len + matrix.qry_len)?;
        let mut idx = anchor.index as usize;

        loop {
            match matrix.directions.peek(idx) {
                Direction::Stop => break,
                Direction::Ins => {
                    codes.push(AlnCode::Ins);
                    idx -= row_len;
                }
                Direction::Diag => {
                    codes.push(AlnCode::Base);
                    idx -= row_len + 1;
                }
                Direction::Del => {
                    codes.push(AlnCode::Del);
                    idx -= 1;
                }
            }
            debug_assert!(codes.len() <= matrix.ref_len + matrix.qry_len + 1);
        }

        codes.reverse();

        let (start_i, start_j) = ((idx / row_len), (idx % row_len));

        // Consumed ranges as half-open absolute coordinates
        let qry_from = qry_seq.offset + start_i;
        let qry_to = qry_seq.offset + end_i;
        let ref_from = ref_seq.offset + start_j;
        let ref_to = ref_seq.offset + end_j;

        Self::finish(codes, ref_seq, qry_seq, (ref_from, ref_to), (qry_from, qry_to), soft_mask)
    }

    /// Builds an alignment from a Hirschberg direction tape; the tape is
    /// already in forward order, so this is a single linear walk.
    ///
    /// ## Errors
    ///
    /// Returns [`AlnError::Memory`] if the code buffer cannot be
    /// allocated.
    pub fn from_tape(ref_seq: &Sequence, qry_seq: &Sequence, tape: &TwoBitArray) -> Result<Self, AlnError> {
        let mut codes = try_code_vec(tape.len())?;
        let mut consumed_q = 0;
        let mut consumed_r = 0;

        for pos in 0..tape.len() {
            match tape.peek(pos) {
                Direction::Stop => break,
                Direction::Ins => {
                    codes.push(AlnCode::Ins);
                    consumed_q += 1;
                }
                Direction::Diag => {
                    codes.push(AlnCode::Base);
                    consumed_q += 1;
                    consumed_r += 1;
                }
                Direction::Del => {
                    codes.push(AlnCode::Del);
                    consumed_r += 1;
                }
            }
        }

        Self::finish(
            codes,
            ref_seq,
            qry_seq,
            (ref_seq.offset, ref_seq.offset + consumed_r),
            (qry_seq.offset, qry_seq.offset + consumed_q),
            false,
        )
    }

    /// Shared tail of the builders: hanging-indel rewriting, counting,
    /// flank masking, and coordinate bookkeeping.
    fn finish(
        mut codes: Vec<AlnCode>, ref_seq: &Sequence, qry_seq: &Sequence, ref_range: (usize, usize),
        qry_range: (usize, usize), soft_mask: bool,
    ) -> Result<Self, AlnError> {
        let (orig_ref_from, orig_ref_to) = ref_range;
        let (orig_qry_from, orig_qry_to) = qry_range;

        let (mut ref_from, mut ref_to) = ref_range;
        let (mut qry_from, mut qry_to) = qry_range;

        if soft_mask {
            for code in codes.iter_mut() {
                match code {
                    AlnCode::Ins => {
                        *code = AlnCode::SoftQ;
                        qry_from += 1;
                    }
                    AlnCode::Del => {
                        *code = AlnCode::SoftR;
                        ref_from += 1;
                    }
                    _ => break,
                }
            }
            for code in codes.iter_mut().rev() {
                match code {
                    AlnCode::Ins => {
                        *code = AlnCode::SoftQ;
                        qry_to -= 1;
                    }
                    AlnCode::Del => {
                        *code = AlnCode::SoftR;
                        ref_to -= 1;
                    }
                    _ => break,
                }
            }
        }

        let mut aln = Self {
            codes: Vec::new(),
            num_matches: 0,
            num_mismatches: 0,
            num_insertions: 0,
            num_deletions: 0,
            ref_start: ref_from,
            ref_end: if ref_to > ref_from { ref_to - 1 } else { ref_from },
            qry_start: qry_from,
            qry_end: if qry_to > qry_from { qry_to - 1 } else { qry_from },
        };

        let mut qc = orig_qry_from;
        let mut rc = orig_ref_from;
        for code in &codes {
            match code {
                AlnCode::Base => {
                    if bases_match_indexed(qry_seq.seq[qc], ref_seq.seq[rc]) {
                        aln.num_matches += 1;
                    } else {
                        aln.num_mismatches += 1;
                    }
                }
                AlnCode::Ins => aln.num_insertions += 1,
                AlnCode::Del => aln.num_deletions += 1,
                _ => {}
            }
            if code.consumes_qry() {
                qc += 1;
            }
            if code.consumes_ref() {
                rc += 1;
            }
        }

        if soft_mask {
            let head_q = orig_qry_from - qry_seq.offset;
            let head_r = orig_ref_from - ref_seq.offset;
            let tail_q = (qry_seq.end_aln + 1).saturating_sub(orig_qry_to.max(qry_seq.offset));
            let tail_r = (ref_seq.end_aln + 1).saturating_sub(orig_ref_to.max(ref_seq.offset));

            let mut masked = try_code_vec(codes.len() + head_q + head_r + tail_q + tail_r)?;
            push_flank(&mut masked, head_q, head_r);
            masked.extend_from_slice(&codes);
            push_flank(&mut masked, tail_q, tail_r);
            codes = masked;
        }

        aln.codes = codes;
        Ok(aln)
    }

    /// The number of aligned positions (matches, mismatches, and indels).
    #[inline]
    #[must_use]
    pub fn aligned_len(&self) -> usize {
        self.num_matches + self.num_mismatches + self.num_insertions + self.num_deletions
    }

    /// Recomputes the alignment's score from its codes: substitution
    /// scores for aligned pairs plus affine costs for each gap run. Soft
    /// flanks contribute nothing.
    ///
    /// For a global alignment this equals the kernel's reported best
    /// score, which also makes it the score source for Hirschberg tapes.
    #[must_use]
    pub fn rescore(&self, ref_seq: &Sequence, qry_seq: &Sequence, settings: &AlnSettings) -> i64 {
        // Soft head codes consume bases before the aligned start
        let mut head_q = 0;
        let mut head_r = 0;
        for code in &self.codes {
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

        let mut qc = self.qry_start - head_q;
        let mut rc = self.ref_start - head_r;
        let mut score = 0i64;
        let mut prev: Option<AlnCode> = None;

        for code in &self.codes {
            match code {
                AlnCode::Base => {
                    score += i64::from(settings.score_indexed(ref_seq.seq[rc], qry_seq.seq[qc]));
                }
                AlnCode::Ins | AlnCode::Del => {
                    score += if prev == Some(*code) {
                        i64::from(settings.gap_extend)
                    } else {
                        i64::from(settings.gap_open)
                    };
                }
                _ => {}
            }
            prev = Some(*code);
            if code.consumes_qry() {
                qc += 1;
            }
            if code.consumes_ref() {
                rc += 1;
            }
        }

        score
    }
}

fn try_code_vec(capacity: usize) -> Result<Vec<AlnCode>, AlnError> {
    let mut v = Vec::new();
    v.try_reserve(capacity).map_err(|_| AlnError::Memory {
        what:  "alignment code buffer",
        bytes: capacity,
    })?;
    Ok(v)
}

/// Appends a soft-masked flank covering `n_qry` query bases and `n_ref`
/// reference bases: paired bases first, then whichever side runs longer.
fn push_flank(codes: &mut Vec<AlnCode>, n_qry: usize, n_ref: usize) {
    let paired = n_qry.min(n_ref);
    for _ in 0..paired {
        codes.push(AlnCode::SoftBoth);
    }
    for _ in paired..n_qry {
        codes.push(AlnCode::SoftQ);
    }
    for _ in paired..n_ref {
        codes.push(AlnCode::SoftR);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::align::{
        hirschberg::hirschberg,
        needleman::needleman,
        settings::{Kernel, MultiReport},
        waterman::waterman,
    };
    use pretty_assertions::assert_eq;

    fn indexed(id: &str, seq: &[u8]) -> Sequence {
        let mut seq = Sequence::new(id, seq.to_vec());
        seq.to_index();
        seq
    }

    #[test]
    fn test_global_identity_alignment() {
        let r = indexed("r", b"ACGT");
        let q = indexed("q", b"ACGT");
        let settings = AlnSettings::default();

        let matrix = needleman(&r, &q, &settings).unwrap();
        let aln = Alignment::from_matrix(&r, &q, &matrix, &matrix.best, false).unwrap();

        assert_eq!(aln.codes, vec![AlnCode::Base; 4]);
        assert_eq!(aln.num_matches, 4);
        assert_eq!(aln.num_mismatches, 0);
        assert_eq!((aln.ref_start, aln.ref_end), (0, 3));
        assert_eq!((aln.qry_start, aln.qry_end), (0, 3));
        assert_eq!(aln.rescore(&r, &q, &settings), matrix.best.score);
    }

    #[test]
    fn test_global_alignment_with_deletion() {
        use AlnCode::{Base, Del};

        let r = indexed("r", b"ACGT");
        let q = indexed("q", b"AGT");
        let settings = AlnSettings::default();

        let matrix = needleman(&r, &q, &settings).unwrap();
        let aln = Alignment::from_matrix(&r, &q, &matrix, &matrix.best, false).unwrap();

        assert_eq!(aln.codes, vec![Base, Del, Base, Base]);
        assert_eq!(aln.num_matches, 3);
        assert_eq!(aln.num_deletions, 1);
        assert_eq!((aln.ref_start, aln.ref_end), (0, 3));
        assert_eq!((aln.qry_start, aln.qry_end), (0, 2));

        // The rebuilt score agrees with the matrix corner score
        assert_eq!(aln.rescore(&r, &q, &settings), 5);
    }

    #[test]
    fn test_empty_query_alignment() {
        let r = indexed("r", b"AAAA");
        let q = indexed("q", b"");
        let settings = AlnSettings::default();

        let matrix = needleman(&r, &q, &settings).unwrap();
        let aln = Alignment::from_matrix(&r, &q, &matrix, &matrix.best, false).unwrap();

        assert_eq!(aln.codes, vec![AlnCode::Del; 4]);
        assert_eq!(aln.num_deletions, 4);
        assert_eq!(aln.rescore(&r, &q, &settings), -13);
    }

    #[test]
    fn test_local_alignment_soft_masks_flanks() {
        use AlnCode::{Base, SoftBoth, SoftQ, SoftR};

        let r = indexed("r", b"GATTACA");
        let q = indexed("q", b"GCATGCU");
        let settings = AlnSettings {
            kernel: Kernel::Waterman,
            ..AlnSettings::default()
        };

        let matrix = waterman(&r, &q, &settings, None).unwrap();
        let aln = Alignment::from_matrix(&r, &q, &matrix, &matrix.best, true).unwrap();

        // The "AT" span: query bases 2..=3 against reference bases 1..=2
        assert_eq!((aln.qry_start, aln.qry_end), (2, 3));
        assert_eq!((aln.ref_start, aln.ref_end), (1, 2));
        assert_eq!(aln.num_matches, 2);
        assert_eq!(aln.aligned_len(), 2);

        // Head: two query + one reference base; tail: three query + four
        // reference bases
        assert_eq!(
            aln.codes,
            vec![SoftBoth, SoftQ, Base, Base, SoftBoth, SoftBoth, SoftBoth, SoftR]
        );
    }

    #[test]
    fn test_hanging_deletions_become_soft_masks() {
        use AlnCode::{Base, SoftR};

        let r = indexed("r", b"GGGA");
        let q = indexed("q", b"A");
        let settings = AlnSettings {
            gap_open: 0,
            ..AlnSettings::default()
        };

        let matrix = needleman(&r, &q, &settings).unwrap();
        let aln = Alignment::from_matrix(&r, &q, &matrix, &matrix.best, true).unwrap();

        assert_eq!(aln.codes, vec![SoftR, SoftR, SoftR, Base]);
        assert_eq!(aln.num_deletions, 0);
        assert_eq!(aln.num_matches, 1);
        assert_eq!((aln.ref_start, aln.ref_end), (3, 3));
    }

    #[test]
    fn test_from_tape_matches_from_matrix() {
        let settings = AlnSettings::default();

        for (r, q) in [
            (&b"ACGT"[..], &b"ACGT"[..]),
            (b"ACGT", b"AGT"),
            (b"AAAA", b""),
            (b"", b"AAAA"),
        ] {
            let r = indexed("r", r);
            let q = indexed("q", q);

            let matrix = needleman(&r, &q, &settings).unwrap();
            let by_matrix = Alignment::from_matrix(&r, &q, &matrix, &matrix.best, false).unwrap();

            let tape = hirschberg(&r, &q, &settings).unwrap();
            let by_tape = Alignment::from_tape(&r, &q, &tape).unwrap();

            assert_eq!(by_tape.codes, by_matrix.codes);
            assert_eq!(by_tape.rescore(&r, &q, &settings), matrix.best.score);
            assert_eq!((by_tape.ref_start, by_tape.ref_end), (by_matrix.ref_start, by_matrix.ref_end));
        }
    }

    #[test]
    fn test_hirschberg_score_equals_needleman() {
        let settings = AlnSettings::default();

        for (r, q) in [
            (&b"GATTACA"[..], &b"GCATGCU"[..]),
            (b"ACGTACGTAC", b"CGTACGGT"),
            (b"TTTTACGT", b"ACGT"),
        ] {
            let r = indexed("r", r);
            let q = indexed("q", q);

            let matrix = needleman(&r, &q, &settings).unwrap();
            let tape = hirschberg(&r, &q, &settings).unwrap();
            let aln = Alignment::from_tape(&r, &q, &tape).unwrap();

            assert_eq!(aln.rescore(&r, &q, &settings), matrix.best.score);
        }
    }

    #[test]
    fn test_multi_report_entries_rebuild() {
        let r = indexed("r", b"ACGTTTTTTACGT");
        let q = indexed("q", b"ACGT");
        let settings = AlnSettings {
            kernel: Kernel::Waterman,
            multi: MultiReport::RefQueryScan,
            min_score: 10,
            ..AlnSettings::default()
        };

        let matrix = waterman(&r, &q, &settings, None).unwrap();
        let first = matrix.ref_bests.as_ref().unwrap()[3];
        let aln = Alignment::from_matrix(&r, &q, &matrix, &first, true).unwrap();

        assert_eq!(aln.num_matches, 4);
        assert_eq!((aln.ref_start, aln.ref_end), (0, 3));
        assert_eq!((aln.qry_start, aln.qry_end), (0, 3));
    }
}
