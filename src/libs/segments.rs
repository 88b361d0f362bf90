//! Maximal scoring subsequences (Ruzzo-Tompa).
//!
//! Given a sequence of signed scores, `max_segments` enumerates every
//! locally-maximal contiguous segment: no sub-range of a returned segment
//! scores strictly higher, no containing range scores at least as high, and
//! no merge of adjacent returned segments can improve on them.

/// A maximal segment over score indices, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaxSeg {
    pub from_idx: usize,
    pub to_idx: usize,
    pub score: f64,
}

/// A partially-built candidate. `lvalue` is the cumulative score just before
/// the candidate starts, `rvalue` the cumulative score at its end, so the
/// candidate's own score is `rvalue - lvalue`.
#[derive(Debug, Clone, Copy)]
struct Cand {
    from: usize,
    to: usize,
    lvalue: f64,
    rvalue: f64,
    // index of the rightmost earlier candidate with a lower lvalue
    prev: Option<usize>,
}

/// Returns all maximal scoring subsequences, left to right.
///
/// Single linear pass over the scores with an explicit Vec-backed stack of
/// candidates; merging pops the stack, so the work is amortized O(n).
/// When every element is <= 0.0 no segment is emitted.
pub fn max_segments(xs: &[f64]) -> Vec<MaxSeg> {
    let mut stack: Vec<Cand> = Vec::new();
    let mut cum = 0.0_f64;

    for (i, &x) in xs.iter().enumerate() {
        if x <= 0.0 {
            cum += x;
            continue;
        }
        let mut cur = Cand {
            from: i,
            to: i,
            lvalue: cum,
            rvalue: cum + x,
            prev: None,
        };
        cum += x;

        loop {
            // rightmost candidate whose prefix level lies below cur's,
            // found by hopping back pointers instead of scanning
            let mut j = stack.len().checked_sub(1);
            while let Some(k) = j {
                if stack[k].lvalue < cur.lvalue {
                    break;
                }
                j = stack[k].prev;
            }

            match j {
                Some(k) if stack[k].rvalue < cur.rvalue => {
                    // the union scores at least as high as either part
                    cur.from = stack[k].from;
                    cur.lvalue = stack[k].lvalue;
                    stack.truncate(k);
                }
                _ => {
                    cur.prev = j;
                    stack.push(cur);
                    break;
                }
            }
        }
    }

    stack
        .iter()
        .map(|c| MaxSeg {
            from_idx: c.from,
            to_idx: c.to,
            score: c.rvalue - c.lvalue,
        })
        .collect()
}

/// Score of the single best contiguous run (Kadane's scan).
///
/// 0.0 when no window has a positive sum; this is the per-trial statistic of
/// the Monte Carlo engine, so it has to be cheap.
pub fn maximum_segment(xs: &[f64]) -> f64 {
    let mut best = 0.0_f64;
    let mut run = 0.0_f64;
    for &x in xs {
        run += x;
        if run < 0.0 {
            run = 0.0;
        }
        if run > best {
            best = run;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_trivial() {
        let xs = max_segments(&[1.0, 1.0, 1.0]);
        assert_eq!(xs.len(), 1);
        assert_eq!(xs[0].score, 3.0);
        assert_eq!((xs[0].from_idx, xs[0].to_idx), (0, 2));
    }

    #[test]
    fn test_trivial_gap() {
        let xs = max_segments(&[1.0, -1.0, 1.0]);
        assert_eq!(xs.len(), 2);
        assert_eq!(xs[0].score, 1.0);
        assert_eq!(xs[1].score, 1.0);
        // the negative middle bin belongs to neither segment
        assert_eq!((xs[0].from_idx, xs[0].to_idx), (0, 0));
        assert_eq!((xs[1].from_idx, xs[1].to_idx), (2, 2));
    }

    #[test]
    fn test_merged_gap() {
        let xs = max_segments(&[1.0, 1.0, -1.0, 1.0, 1.0]);
        assert_eq!(xs.len(), 1);
        assert_eq!(xs[0].score, 3.0);
        assert_eq!((xs[0].from_idx, xs[0].to_idx), (0, 4));
    }

    #[test]
    fn test_largescore_trivial() {
        let xs = max_segments(&[3.0, 2.0]);
        assert_eq!(xs.len(), 1);
        assert_eq!(xs[0].score, 5.0);
    }

    #[test]
    fn test_largescore_wnegative() {
        let xs = max_segments(&[3.0, -2.0, 4.0]);
        assert_eq!(xs.len(), 1);
        assert_eq!(xs[0].score, 5.0);
    }

    #[test]
    fn test_largescore_negfloat() {
        let xs = max_segments(&[3.5, -0.5, 2.5]);
        assert_eq!(xs.len(), 1);
        assert_abs_diff_eq!(xs[0].score, 5.5, epsilon = 1e-9);
    }

    #[test]
    fn test_all_nonpositive() {
        assert!(max_segments(&[-1.0, -2.0, 0.0]).is_empty());
        assert!(max_segments(&[]).is_empty());
    }

    #[test]
    fn test_deep_dip_keeps_segments_apart() {
        // the dip costs more than the right side is worth
        let xs = max_segments(&[2.0, -5.0, 1.0]);
        assert_eq!(xs.len(), 2);
        assert_eq!(xs[0].score, 2.0);
        assert_eq!(xs[1].score, 1.0);
    }

    #[test]
    fn test_trailing_negative_excluded() {
        let xs = max_segments(&[1.0, 2.0, -1.0]);
        assert_eq!(xs.len(), 1);
        assert_eq!((xs[0].from_idx, xs[0].to_idx), (0, 1));
        assert_eq!(xs[0].score, 3.0);
    }

    #[test]
    fn test_sorted_and_disjoint() {
        let scores = [
            0.5, -1.0, 2.0, 0.5, -3.0, 1.0, 1.0, -0.5, 0.7, -2.0, 4.0, -1.0, 0.2,
        ];
        let xs = max_segments(&scores);
        for w in xs.windows(2) {
            assert!(w[0].to_idx < w[1].from_idx);
        }
        for x in &xs {
            assert!(x.score > 0.0);
        }
    }

    #[test]
    fn test_no_improving_merge() {
        // re-finding segments over the union of two neighbors plus the bins
        // between them never beats the neighbors found in the first pass
        let scores = [
            1.0, -0.5, 2.0, -4.0, 3.0, -1.0, 0.5, 0.5, -2.0, 1.5, -0.1, 0.3,
        ];
        let xs = max_segments(&scores);
        for w in xs.windows(2) {
            let merged_sum: f64 = scores[w[0].from_idx..=w[1].to_idx].iter().sum();
            assert!(merged_sum <= w[0].score.max(w[1].score) + 1e-9);
        }
    }

    #[test]
    fn test_no_improving_subrange() {
        let scores = [0.5, 1.5, -1.0, 2.0, -0.5, 0.2, -3.0, 1.0];
        for seg in max_segments(&scores) {
            let sum: f64 = scores[seg.from_idx..=seg.to_idx].iter().sum();
            assert_abs_diff_eq!(sum, seg.score, epsilon = 1e-9);
            for a in seg.from_idx..=seg.to_idx {
                for b in a..=seg.to_idx {
                    let sub: f64 = scores[a..=b].iter().sum();
                    assert!(sub <= seg.score + 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_maximum_segment() {
        assert_eq!(maximum_segment(&[1.0, 1.0, 1.0]), 3.0);
        assert_eq!(maximum_segment(&[3.0, -2.0, 4.0]), 5.0);
        assert_eq!(maximum_segment(&[-1.0, -2.0]), 0.0);
        assert_eq!(maximum_segment(&[]), 0.0);
    }

    #[test]
    fn test_maximum_segment_matches_best_max_segment() {
        let scores = [
            0.5, -1.0, 2.0, 0.5, -3.0, 1.0, 1.0, -0.5, 0.7, -2.0, 4.0, -1.0,
        ];
        let best = max_segments(&scores)
            .iter()
            .map(|x| x.score)
            .fold(0.0_f64, f64::max);
        assert_abs_diff_eq!(maximum_segment(&scores), best, epsilon = 1e-9);
    }
}
