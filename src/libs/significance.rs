//! Empirical p-values against the Monte Carlo null distribution and
//! Benjamini-Hochberg false-discovery-rate correction.

use crate::libs::bed::Segment;
use anyhow::{ensure, Result};
use indexmap::IndexMap;

/// A candidate segment with its empirical p-value and FDR-corrected q-value.
#[derive(Debug, Clone)]
pub struct ScoredSegment {
    pub segment: Segment,
    pub pvalue: f64,
    pub qvalue: f64,
}

pub struct IntervalTest {
    null: Vec<f64>,
}

impl IntervalTest {
    pub fn new(mut null: Vec<f64>) -> Result<Self> {
        ensure!(!null.is_empty(), "empty null distribution");
        null.sort_by(|a, b| a.total_cmp(b));
        Ok(IntervalTest { null })
    }

    /// Empirical p-value of one observed score: `(#null >= score + 1) / (M + 1)`.
    /// The Laplace correction counts the observation itself as one more
    /// potential draw and keeps p away from zero.
    pub fn pvalue(&self, score: f64) -> f64 {
        let m = self.null.len();
        let ge = m - self.null.partition_point(|&x| x < score);
        (ge as f64 + 1.0) / (m as f64 + 1.0)
    }

    /// P-values for every observed segment, flattened across chromosomes.
    pub fn pvalues(&self, segments: &IndexMap<String, Vec<Segment>>) -> Vec<(Segment, f64)> {
        segments
            .values()
            .flatten()
            .map(|x| (x.clone(), self.pvalue(x.score)))
            .collect()
    }

    /// P-value, q-value and threshold filter in one pass: segments with
    /// `qvalue < below`, sorted by chromosome then start.
    pub fn significant(
        &self,
        segments: &IndexMap<String, Vec<Segment>>,
        below: f64,
    ) -> Vec<ScoredSegment> {
        let scored = self.pvalues(segments);
        let pvals: Vec<f64> = scored.iter().map(|x| x.1).collect();
        let qvals = fdr_adjust(&pvals);

        let mut res: Vec<ScoredSegment> = scored
            .into_iter()
            .zip(qvals)
            .filter(|(_, q)| *q < below)
            .map(|((segment, pvalue), qvalue)| ScoredSegment {
                segment,
                pvalue,
                qvalue,
            })
            .collect();
        res.sort_by(|a, b| {
            a.segment
                .chrom
                .cmp(&b.segment.chrom)
                .then(a.segment.start.cmp(&b.segment.start))
        });
        res
    }
}

/// Benjamini-Hochberg adjustment, matching R's `p.adjust(method = "fdr")`:
/// `q_i = min_{j: p_j >= p_i} (p_j * m / rank_j)`, capped at 1.
pub fn fdr_adjust(pvals: &[f64]) -> Vec<f64> {
    let m = pvals.len();
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&a, &b| pvals[a].total_cmp(&pvals[b]));

    let mut qvals = vec![0.0; m];
    let mut running = 1.0_f64;
    for rank in (1..=m).rev() {
        let idx = order[rank - 1];
        let q = (pvals[idx] * m as f64 / rank as f64).min(running).min(1.0);
        running = q;
        qvals[idx] = q;
    }
    qvals
}
