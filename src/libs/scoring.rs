//! Turns raw IP/control read counts into per-bin enrichment scores.
//!
//! One documented method: the control counts are normalized by the global
//! IP/control scale factor, the per-bin IP proportion gets a Wilson 95%
//! interval, and bins whose interval is tight enough score `logit(p)`.
//! Wide-interval ("low information") bins are extrapolated to the median
//! negative score so they act as mild segment breakers instead of noise.

use crate::libs::bed::{Bin, CountBin};
use anyhow::{ensure, Result};
use indexmap::IndexMap;

const Z95: f64 = 1.96;

/// log(p / (1 - p)); caller guarantees 0 < p < 1.
pub fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

/// Wilson score interval for a binomial proportion.
pub fn wilson_interval(pos: f64, n: f64) -> (f64, f64) {
    let p = pos / n;
    let z2 = Z95 * Z95;
    let center = p + z2 / (2.0 * n);
    let spread = Z95 * ((p * (1.0 - p) + z2 / (4.0 * n)) / n).sqrt();
    let divisor = 1.0 + z2 / n;
    ((center - spread) / divisor, (center + spread) / divisor)
}

#[derive(Debug, Clone, Copy)]
pub struct ScoreStats {
    /// Bins scored by extrapolation rather than measurement.
    pub low_info: usize,
    pub total: usize,
}

impl ScoreStats {
    pub fn low_info_ratio(&self) -> f64 {
        self.low_info as f64 / self.total as f64
    }
}

/// Scores every bin. `ci_min` is the widest Wilson interval still accepted
/// as a measured bin.
pub fn score_bins(
    counts: &IndexMap<String, Vec<CountBin>>,
    ci_min: f64,
) -> Result<(IndexMap<String, Vec<Bin>>, ScoreStats)> {
    let ip_sum: f64 = counts.values().flatten().map(|x| x.ip).sum();
    let input_sum: f64 = counts.values().flatten().map(|x| x.input).sum();
    ensure!(ip_sum > 0.0 && input_sum > 0.0, "no reads to score");
    let scale = ip_sum / input_sum;

    // first pass: score the well-measured bins
    let mut scored: IndexMap<String, Vec<(CountBin, Option<f64>)>> = IndexMap::new();
    let mut measured: Vec<f64> = Vec::new();
    let mut total = 0;
    for (chrom, bins) in counts {
        let mut ys = Vec::with_capacity(bins.len());
        for x in bins {
            total += 1;
            let input = x.input * scale;
            let tot = x.ip + input;
            let score = if tot > 0.0 {
                let p = x.ip / tot;
                let (lo, hi) = wilson_interval(x.ip, tot);
                // zeroed bins never reach here, so p stays inside (0, 1)
                (hi - lo <= ci_min).then(|| logit(p))
            } else {
                None
            };
            if let Some(s) = score {
                measured.push(s);
            }
            ys.push((x.clone(), score));
        }
        scored.insert(chrom.clone(), ys);
    }
    ensure!(!measured.is_empty(), "every bin has a too-wide interval");

    // second pass: extrapolate the rest to the median negative score
    let fill = median_negative(&measured);
    let mut res: IndexMap<String, Vec<Bin>> = IndexMap::new();
    let mut low_info = 0;
    for (chrom, ys) in scored {
        let bins = ys
            .into_iter()
            .map(|(x, score)| {
                let score = score.unwrap_or_else(|| {
                    low_info += 1;
                    fill
                });
                Bin {
                    chrom: x.chrom,
                    start: x.start,
                    end: x.end,
                    score,
                }
            })
            .collect();
        res.insert(chrom, bins);
    }

    Ok((res, ScoreStats { low_info, total }))
}

/// Median of the negative scores; the overall minimum when none are
/// negative, so extrapolated bins never look enriched.
fn median_negative(scores: &[f64]) -> f64 {
    let mut neg: Vec<f64> = scores.iter().copied().filter(|&x| x < 0.0).collect();
    if neg.is_empty() {
        return scores.iter().copied().fold(f64::INFINITY, f64::min).min(0.0);
    }
    neg.sort_by(|a, b| a.total_cmp(b));
    let n = neg.len();
    if n % 2 == 1 {
        neg[n / 2]
    } else {
        (neg[n / 2 - 1] + neg[n / 2]) / 2.0
    }
}
