//! Calibrates the gap penalty (the multiplier on negative bin scores) by
//! golden-section search over a peak-quality fitness function.
//!
//! Every fitness evaluation is a full segment-finding plus Monte Carlo
//! significance pass, so evaluations are memoized by penalty value.

use crate::libs::bed::{Bin, Segment};
use crate::libs::genome::GenomeBins;
use crate::libs::monte_carlo::MonteCarlo;
use crate::libs::significance::IntervalTest;
use anyhow::{ensure, Result};
use fxhash::FxHashMap;
use indexmap::IndexMap;

const PHI: f64 = 1.618033988749895;
const RESPHI: f64 = 2.0 - PHI;

/// Golden-section search for the maximum of `f` over `[left, right]`,
/// narrowing the bracket until `|left - right| < precision`. Requires `f`
/// to be unimodal over the bracket; this is assumed, not verified, so a
/// multimodal fitness may converge to a local optimum.
pub fn golden_search<F>(
    f: &mut F,
    left: f64,
    mid: f64,
    right: f64,
    precision: f64,
) -> Result<f64>
where
    F: FnMut(f64) -> Result<f64>,
{
    if (left - right).abs() < precision {
        return Ok((left + right) / 2.0);
    }
    // probe between mid and right, pushed against mid
    let mid_right = mid + RESPHI * (right - mid);
    if f(mid_right)? > f(mid)? {
        golden_search(f, mid, mid_right, right, precision)
    } else {
        golden_search(f, mid_right, mid, left, precision)
    }
}

/// One memoized fitness evaluation.
#[derive(Debug, Clone, Copy)]
pub struct PenaltyFit {
    pub gap_penalty: f64,
    /// Enriched input bins covered by peaks.
    pub eib: usize,
    /// Depleted input bins covered by peaks.
    pub dib: usize,
    pub npeaks: usize,
    pub peak_eib_ratio: f64,
    pub global_eib_coverage: f64,
    pub score: f64,
}

pub struct GapPenalty<'a> {
    bins: &'a GenomeBins,
    mc_trials: usize,
    nprocs: usize,
    pval_lim: f64,
    precision: f64,
    seed: u64,
    genome_eib: usize,
    cache: FxHashMap<u64, PenaltyFit>,
}

impl<'a> GapPenalty<'a> {
    pub fn new(
        bins: &'a GenomeBins,
        mc_trials: usize,
        nprocs: usize,
        pval_lim: f64,
        precision: f64,
        seed: u64,
    ) -> Result<Self> {
        let genome_eib = bins.num_positive_bins();
        ensure!(genome_eib > 0, "no enriched bins in the genome");
        Ok(GapPenalty {
            bins,
            mc_trials,
            nprocs,
            pval_lim,
            precision,
            seed,
            genome_eib,
            cache: FxHashMap::default(),
        })
    }

    /// Searches the default bracket of the original method.
    pub fn search_default(&mut self) -> Result<f64> {
        self.search(2.0, 10.0, 24.0)
    }

    pub fn search(&mut self, left: f64, mid: f64, right: f64) -> Result<f64> {
        let precision = self.precision;
        let mut f = |penalty: f64| self.comp_score(penalty);
        golden_search(&mut f, left, mid, right, precision)
    }

    /// Every evaluated penalty, sorted by penalty value, for diagnostics.
    pub fn evaluations(&self) -> Vec<PenaltyFit> {
        let mut xs: Vec<PenaltyFit> = self.cache.values().copied().collect();
        xs.sort_by(|a, b| a.gap_penalty.total_cmp(&b.gap_penalty));
        xs
    }

    /// Fitness of one penalty: scale negative scores, call peaks at
    /// `pval_lim`, then reward peak sets that are pure in enriched bins and
    /// still cover much of the genome-wide enrichment.
    fn comp_score(&mut self, gap_penalty: f64) -> Result<f64> {
        let key = gap_penalty.to_bits();
        if let Some(fit) = self.cache.get(&key) {
            return Ok(fit.score);
        }

        let scaled = self.bins.scale_neg_scores(gap_penalty);
        let observed = scaled.max_segments(0.0);
        let mc = MonteCarlo::from_scores(scaled.chrom_scores())?;
        let null = mc.run_simulation(self.mc_trials, self.nprocs, self.seed)?;
        let tester = IntervalTest::new(null)?;

        let mut peaks: IndexMap<String, Vec<Segment>> = IndexMap::new();
        for (segment, pval) in tester.pvalues(&observed) {
            if pval < self.pval_lim {
                peaks.entry(segment.chrom.clone()).or_default().push(segment);
            }
        }
        let npeaks = peaks.values().map(|v| v.len()).sum();

        let (eib, dib) = count_covered_bins(&self.bins.bins_by_true_chrom(), &peaks);
        let covered = eib + dib;
        let peak_eib_ratio = if covered > 0 {
            eib as f64 / covered as f64
        } else {
            0.0
        };
        let global_eib_coverage = eib as f64 / self.genome_eib as f64;
        let score = peak_eib_ratio.powi(5) * global_eib_coverage;

        eprintln!(
            "Gap penalty of {:.2} gives a score of {:.3} ({} peaks)",
            gap_penalty, score, npeaks
        );
        self.cache.insert(
            key,
            PenaltyFit {
                gap_penalty,
                eib,
                dib,
                npeaks,
                peak_eib_ratio,
                global_eib_coverage,
                score,
            },
        );
        Ok(score)
    }
}

/// Counts bins overlapping any peak, split into enriched (score > 0) and
/// depleted. Both sides are sorted by start, so a single sweep suffices.
fn count_covered_bins(
    bins_by_chrom: &IndexMap<String, Vec<&Bin>>,
    peaks: &IndexMap<String, Vec<Segment>>,
) -> (usize, usize) {
    let mut eib = 0;
    let mut dib = 0;
    for (chrom, bins) in bins_by_chrom {
        let peaks = match peaks.get(chrom) {
            Some(p) => p,
            None => continue,
        };
        let mut pi = 0;
        for bin in bins {
            while pi < peaks.len() && peaks[pi].end <= bin.start {
                pi += 1;
            }
            if pi < peaks.len() && peaks[pi].start < bin.end {
                if bin.score > 0.0 {
                    eib += 1;
                } else {
                    dib += 1;
                }
            }
        }
    }
    (eib, dib)
}
