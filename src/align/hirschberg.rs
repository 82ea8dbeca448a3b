use crate::{
    align::{
        cell::{gap_run_cost, gap_successor},
        settings::AlnSettings,
        two_bit::{Direction, TwoBitArray},
    },
    error::{AlnError, try_filled_vec},
    seq::Sequence,
};

/// Runs a global alignment in linear score memory (Hirschberg) over the
/// aligned sub-ranges of `ref_seq` and `qry_seq`, which must be in
/// lookup-index form.
///
/// Instead of a full direction matrix, the result is a direction tape: at
/// most `ref_len + qry_len` codes in forward order, terminated by a
/// `Stop`. Peak working memory is two score rows and one direction row of
/// `ref_len + 1` cells, shared across the whole recursion, plus the tape.
///
/// ## Errors
///
/// Returns [`AlnError::Memory`] if the tape or the score rows cannot be
/// allocated. Nothing is retained on failure.
pub fn hirschberg(ref_seq: &Sequence, qry_seq: &Sequence, settings: &AlnSettings) -> Result<TwoBitArray, AlnError> {
    let r = ref_seq.window();
    let q = qry_seq.window();

    let mut tape = TwoBitArray::new(r.len() + q.len() + 1)?;
    let mut forward = try_filled_vec(0i64, r.len() + 1, "score row")?;
    let mut reverse = try_filled_vec(0i64, r.len() + 1, "score row")?;
    let mut dir_row = TwoBitArray::new(r.len() + 1)?;

    align_window(r, q, &mut forward, &mut reverse, &mut dir_row, &mut tape, settings);

    // Terminate the tape where the recursion stopped writing
    tape.set(Direction::Stop);
    tape.seek(0);
    Ok(tape)
}

/// The recursive divide step: aligns one reference/query window and
/// appends its codes to the tape.
fn align_window(
    r: &[u8], q: &[u8], forward: &mut [i64], reverse: &mut [i64], dir_row: &mut TwoBitArray, tape: &mut TwoBitArray,
    settings: &AlnSettings,
) {
    if r.is_empty() {
        for _ in 0..q.len() {
            tape.set(Direction::Ins);
            tape.advance();
        }
        return;
    }

    if q.is_empty() {
        for _ in 0..r.len() {
            tape.set(Direction::Del);
            tape.advance();
        }
        return;
    }

    if r.len() == 1 {
        position_single_ref_base(r[0], q, tape, settings);
        return;
    }

    if q.len() == 1 {
        position_single_qry_base(q[0], r, tape, settings);
        return;
    }

    let mid = q.len() / 2;

    forward_row(r, &q[..mid], forward, dir_row, settings);
    reverse_row(r, &q[mid..], reverse, dir_row, settings);

    // Join the halves at the reference split maximizing the summed score;
    // slot 0 of each row is its indel column, so the k = 0 and k = |R|
    // boundaries need no special casing. Ties go to the largest k.
    let mut split = 0;
    let mut split_score = i64::MIN;
    for k in 0..=r.len() {
        let total = forward[k] + reverse[r.len() - k];
        if total >= split_score {
            split_score = total;
            split = k;
        }
    }

    align_window(&r[..split], &q[..mid], forward, reverse, dir_row, tape, settings);
    align_window(&r[split..], &q[mid..], forward, reverse, dir_row, tape, settings);
}

/// Aligns one reference base against a query window: insertions up to the
/// best-scoring column, the match/mismatch, then insertions to the end.
/// Ties prefer the rightmost column, matching the split tie-break.
fn position_single_ref_base(ref_base: u8, q: &[u8], tape: &mut TwoBitArray, settings: &AlnSettings) {
    let mut best_at = 0;
    let mut best_score = i64::MIN;

    for (k, qry_base) in q.iter().enumerate() {
        let score = gap_run_cost(k, settings)
            + i64::from(settings.score_indexed(ref_base, *qry_base))
            + gap_run_cost(q.len() - 1 - k, settings);
        if score >= best_score {
            best_score = score;
            best_at = k;
        }
    }

    for k in 0..q.len() {
        tape.set(if k == best_at { Direction::Diag } else { Direction::Ins });
        tape.advance();
    }
}

/// The mirror of [`position_single_ref_base`]: one query base against a
/// reference window, with deletions around the chosen column.
fn position_single_qry_base(qry_base: u8, r: &[u8], tape: &mut TwoBitArray, settings: &AlnSettings) {
    let mut best_at = 0;
    let mut best_score = i64::MIN;

    for (k, ref_base) in r.iter().enumerate() {
        let score = gap_run_cost(k, settings)
            + i64::from(settings.score_indexed(*ref_base, qry_base))
            + gap_run_cost(r.len() - 1 - k, settings);
        if score >= best_score {
            best_score = score;
            best_at = k;
        }
    }

    for k in 0..r.len() {
        tape.set(if k == best_at { Direction::Diag } else { Direction::Del });
        tape.advance();
    }
}

/// Fills `row[0..=r.len()]` with the last row of global-alignment scores
/// for `r` against `q_half`, in a single in-place row sweep. `row[0]`
/// finishes as the indel-column score (aligning all of `q_half` against an
/// empty reference). `dir_row` carries the previous row's directions so
/// gap extension is charged correctly down each column.
fn forward_row(r: &[u8], q_half: &[u8], row: &mut [i64], dir_row: &mut TwoBitArray, settings: &AlnSettings) {
    row[0] = 0;
    dir_row.seek(0);
    dir_row.set(Direction::Stop);
    for j in 1..=r.len() {
        row[j] = gap_run_cost(j, settings);
        dir_row.advance();
        dir_row.set(Direction::Del);
    }

    for i in 1..=q_half.len() {
        let qry_base = q_half[i - 1];
        let mut diag_prev = row[0];
        row[0] = gap_run_cost(i, settings);
        let mut left_dir = Direction::Ins;

        for j in 1..=r.len() {
            let above_dir = dir_row.peek(j);

            let diag = diag_prev + i64::from(settings.score_indexed(r[j - 1], qry_base));
            let up = gap_successor(row[j], above_dir, Direction::Ins, settings);
            let left = gap_successor(row[j - 1], left_dir, Direction::Del, settings);

            let (dir, score) = settings.tie_break.choose(diag, up, left);
            diag_prev = row[j];
            row[j] = score;
            dir_row.seek(j);
            dir_row.set(dir);
            left_dir = dir;
        }
    }
}

/// The reversed twin of [`forward_row`]: scores `r` read backwards against
/// the back half of the query read backwards, so that `row[t]` finishes as
/// the score of aligning the last `t` reference bases against all of
/// `q_half`.
fn reverse_row(r: &[u8], q_half: &[u8], row: &mut [i64], dir_row: &mut TwoBitArray, settings: &AlnSettings) {
    row[0] = 0;
    dir_row.seek(0);
    dir_row.set(Direction::Stop);
    for t in 1..=r.len() {
        row[t] = gap_run_cost(t, settings);
        dir_row.advance();
        dir_row.set(Direction::Del);
    }

    for i in 1..=q_half.len() {
        let qry_base = q_half[q_half.len() - i];
        let mut diag_prev = row[0];
        row[0] = gap_run_cost(i, settings);
        let mut left_dir = Direction::Ins;

        for t in 1..=r.len() {
            let ref_base = r[r.len() - t];
            let above_dir = dir_row.peek(t);

            let diag = diag_prev + i64::from(settings.score_indexed(ref_base, qry_base));
            let up = gap_successor(row[t], above_dir, Direction::Ins, settings);
            let left = gap_successor(row[t - 1], left_dir, Direction::Del, settings);

            let (dir, score) = settings.tie_break.choose(diag, up, left);
            diag_prev = row[t];
            row[t] = score;
            dir_row.seek(t);
            dir_row.set(dir);
            left_dir = dir;
        }
    }
}
