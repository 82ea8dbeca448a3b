use crate::{
    align::{
        cell::{gap_run_cost, gap_successor},
        matrix::{AlignmentMatrix, ScoreEntry},
        settings::AlnSettings,
        two_bit::{Direction, TwoBitArray},
    },
    error::{AlnError, try_filled_vec},
    seq::Sequence,
};

/// Runs a global (Needleman-Wunsch) alignment over the aligned sub-ranges
/// of `ref_seq` and `qry_seq`, which must be in lookup-index form.
///
/// The full direction matrix is recorded for traceback; scores are kept in
/// two ping-ponged rows of `ref_len + 1` cells, so score memory stays O(m)
/// while the packed direction matrix is the only per-cell storage. The
/// best cell is always the bottom-right corner.
///
/// ## Errors
///
/// Returns [`AlnError::Memory`] if the direction matrix or score rows
/// cannot be allocated. Nothing is retained on failure.
pub fn needleman(ref_seq: &Sequence, qry_seq: &Sequence, settings: &AlnSettings) -> Result<AlignmentMatrix, AlnError> {
    let r = ref_seq.window();
    let q = qry_seq.window();
    let m = r.len();
    let n = q.len();
    let row_len = m + 1;

    let mut dirs = TwoBitArray::new(row_len * (n + 1))?;
    let mut prev = try_filled_vec(0i64, row_len, "score row")?;
    let mut cur = try_filled_vec(0i64, row_len, "score row")?;

    // Gap row: deleting the first j reference bases
    dirs.set(Direction::Stop);
    dirs.advance();
    for j in 1..=m {
        prev[j] = gap_run_cost(j, settings);
        dirs.set(Direction::Del);
        dirs.advance();
    }

    for i in 1..=n {
        // Gap column: inserting the first i query bases
        cur[0] = gap_run_cost(i, settings);
        dirs.set(Direction::Ins);
        dirs.advance();

        let qry_base = q[i - 1];
        let mut left_dir = Direction::Ins;

        for j in 1..=m {
            let above_dir = dirs.peek((i - 1) * row_len + j);

            let diag = prev[j - 1] + i64::from(settings.score_indexed(r[j - 1], qry_base));
            let up = gap_successor(prev[j], above_dir, Direction::Ins, settings);
            let left = gap_successor(cur[j - 1], left_dir, Direction::Del, settings);

            let (dir, score) = settings.tie_break.choose(diag, up, left);
            dirs.set(dir);
            dirs.advance();
            cur[j] = score;
            left_dir = dir;
        }

        std::mem::swap(&mut prev, &mut cur);
    }

    let best = ScoreEntry {
        index: (n as u64) * (row_len as u64) + m as u64,
        score: prev[m],
    };

    Ok(AlignmentMatrix {
        directions: dirs,
        best,
        ref_bests: None,
        qry_bests: None,
        ref_len: m,
        qry_len: n,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::align::settings::TieBreak;
    use pretty_assertions::assert_eq;

    fn indexed(id: &str, seq: &[u8]) -> Sequence {
        let mut seq = Sequence::new(id, seq.to_vec());
        seq.to_index();
        seq
    }

    /// Walks the direction matrix back from the best cell and returns the
    /// path in forward order.
    fn traceback_dirs(matrix: &AlignmentMatrix) -> Vec<Direction> {
        let row_len = matrix.ref_len + 1;
        let mut idx = matrix.best.index as usize;
        let mut path = Vec::new();

        loop {
            let dir = matrix.directions.peek(idx);
            match dir {
                Direction::Stop => break,
                Direction::Ins => idx -= row_len,
                Direction::Diag => idx -= row_len + 1,
                Direction::Del => idx -= 1,
            }
            path.push(dir);
        }

        path.reverse();
        path
    }

    #[test]
    fn test_identical_sequences() {
        use Direction::Diag;

        let r = indexed("r", b"ACGT");
        let q = indexed("q", b"ACGT");
        let matrix = needleman(&r, &q, &AlnSettings::default()).unwrap();

        assert_eq!(matrix.best.score, 20);
        assert_eq!(matrix.best.index, 4 * 5 + 4);
        assert_eq!(traceback_dirs(&matrix), vec![Diag, Diag, Diag, Diag]);
    }

    #[test]
    fn test_single_deletion() {
        use Direction::{Del, Diag};

        let r = indexed("r", b"ACGT");
        let q = indexed("q", b"AGT");
        let matrix = needleman(&r, &q, &AlnSettings::default()).unwrap();

        // One match, the C deleted for gap_open, then two matches
        assert_eq!(matrix.best.score, 5 - 10 + 5 + 5);
        assert_eq!(traceback_dirs(&matrix), vec![Diag, Del, Diag, Diag]);
    }

    #[test]
    fn test_all_mismatches_is_deterministic() {
        use Direction::Diag;

        let r = indexed("r", b"ACGT");
        let q = indexed("q", b"TGCA");

        for tie_break in [TieBreak::MatchInsDel, TieBreak::MatchDelIns] {
            let settings = AlnSettings {
                tie_break,
                ..AlnSettings::default()
            };
            let matrix = needleman(&r, &q, &settings).unwrap();
            assert_eq!(matrix.best.score, -16);
            assert_eq!(traceback_dirs(&matrix), vec![Diag, Diag, Diag, Diag]);
        }
    }

    #[test]
    fn test_empty_query_is_all_deletions() {
        use Direction::Del;

        let r = indexed("r", b"AAAA");
        let q = indexed("q", b"");
        let matrix = needleman(&r, &q, &AlnSettings::default()).unwrap();

        assert_eq!(matrix.best.score, -13);
        assert_eq!(traceback_dirs(&matrix), vec![Del; 4]);
    }

    #[test]
    fn test_empty_reference_is_all_insertions() {
        use Direction::Ins;

        let r = indexed("r", b"");
        let q = indexed("q", b"AAAA");
        let matrix = needleman(&r, &q, &AlnSettings::default()).unwrap();

        assert_eq!(matrix.best.score, -13);
        assert_eq!(traceback_dirs(&matrix), vec![Ins; 4]);
    }

    #[test]
    fn test_sub_range_alignment() {
        let mut r = indexed("r", b"TTACGTTT");
        r.offset = 2;
        r.end_aln = 5;
        let q = indexed("q", b"ACGT");

        let matrix = needleman(&r, &q, &AlnSettings::default()).unwrap();
        assert_eq!(matrix.best.score, 20);
        assert_eq!(matrix.ref_len, 4);
    }
}
