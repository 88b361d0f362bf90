//! Chooses the score threshold that separates "positive" from "negative"
//! bins in binary mode, by maximizing an information-content statistic over
//! adjacent-positive-bin pairs.

use anyhow::{ensure, Result};
use indexmap::IndexMap;
use itertools::Itertools;

pub const SCAN_POINTS: usize = 1000;

pub struct ScoreCutoff {
    // per-chromosome score arrays; adjacency only counts within a chromosome
    scores: Vec<Vec<f64>>,
    pub min_score: f64,
    pub max_score: f64,
}

/// Result of one optimization scan.
pub struct CutoffScan {
    pub cutoffs: Vec<f64>,
    pub info_scores: Vec<f64>,
    /// Cutoff with the best information score.
    pub lim_value: f64,
}

impl ScoreCutoff {
    pub fn from_chrom_scores(chrom_scores: &IndexMap<String, Vec<f64>>) -> Result<Self> {
        let scores: Vec<Vec<f64>> = chrom_scores.values().cloned().collect();
        let n: usize = scores.iter().map(|v| v.len()).sum();
        ensure!(n > 0, "no scores to optimize a cutoff over");
        let min_score = scores
            .iter()
            .flatten()
            .copied()
            .fold(f64::INFINITY, f64::min);
        let max_score = scores
            .iter()
            .flatten()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        Ok(ScoreCutoff {
            scores,
            min_score,
            max_score,
        })
    }

    /// Scans evenly spaced candidate cutoffs between the extreme scores and
    /// keeps the one maximizing the summed per-chromosome information score.
    pub fn optimize(&self) -> CutoffScan {
        let cutoffs: Vec<f64> = (0..SCAN_POINTS)
            .map(|i| {
                self.min_score
                    + (self.max_score - self.min_score) * i as f64 / (SCAN_POINTS - 1) as f64
            })
            .collect();
        let info_scores: Vec<f64> = cutoffs
            .iter()
            .map(|&cutoff| self.information_score(cutoff))
            .collect();
        let max_idx = info_scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap_or(0);
        CutoffScan {
            lim_value: cutoffs[max_idx],
            cutoffs,
            info_scores,
        }
    }

    fn information_score(&self, cutoff: f64) -> f64 {
        self.scores
            .iter()
            .map(|xs| {
                let bins: Vec<bool> = xs.iter().map(|&x| x > cutoff).collect();
                information_score_helper(&bins)
            })
            .sum()
    }

    /// Fraction of bins above `lim`.
    pub fn ratio(&self, lim: f64) -> f64 {
        let n: usize = self.scores.iter().map(|v| v.len()).sum();
        let npos: usize = self
            .scores
            .iter()
            .flatten()
            .filter(|&&x| x > lim)
            .count();
        npos as f64 / n as f64
    }

    /// Fallback cutoff: score at the `ratio`-th quantile from the top, so
    /// the positive-bin fraction lands at `ratio`.
    pub fn limit_score(&self, ratio: f64) -> f64 {
        let mut all: Vec<f64> = self.scores.iter().flatten().copied().collect();
        all.sort_by(|a, b| b.total_cmp(a));
        let idx = ((all.len() as f64 * ratio) as usize).min(all.len() - 1);
        all[idx]
    }

    /// Applies the positive-bin-ratio bound to a candidate cutoff: above the
    /// bound, warn and fall back to the cutoff at the bound's quantile.
    /// Returns the cutoff and the final ratio.
    pub fn check_ratio(&self, lim_value: f64, max_ratio: f64) -> (f64, f64) {
        let ratio = self.ratio(lim_value);
        if ratio > max_ratio {
            let fallback = self.limit_score(max_ratio);
            eprintln!(
                "Warning: optimal cutoff gives a too high positive bin ratio ({:.2} > {:.2}); \
                 consider increasing the bin size",
                ratio, max_ratio
            );
            eprintln!(
                "Using non-optimal {:.4} as cutoff, giving a ratio of {:.2}",
                fallback,
                self.ratio(fallback)
            );
            (fallback, self.ratio(fallback))
        } else {
            (lim_value, ratio)
        }
    }
}

/// log((observed adjacent positive pairs + 1) / (expected + 1)), weighted by
/// the positive bin count. Rewards cutoffs under which positives clump
/// together far more often than chance while still covering many bins.
fn information_score_helper(bins: &[bool]) -> f64 {
    let n = bins.len();
    let npos = bins.iter().filter(|&&b| b).count();
    if n < 2 || npos == 0 {
        return 0.0;
    }
    let r = npos as f64 / n as f64;
    let expected = r * r * (n - 1) as f64;
    let observed = bins.iter().tuple_windows().filter(|(&a, &b)| a && b).count();
    let information_content = ((observed as f64 + 1.0) / (expected + 1.0)).ln();
    information_content * npos as f64
}
