//! Genome-wide bins with scores, the driver for segment finding.

use crate::libs::bed::{Bin, Segment};
use crate::libs::gaps;
use crate::libs::segments::max_segments;
use anyhow::{ensure, Result};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Per-chromosome scored bins. Keys may be synthetic split names
/// (`"{chrom}_{i}"`) when the genome was partitioned on gaps; the reverse
/// mapping restores true names when segments are reported.
pub struct GenomeBins {
    chrom_bins: IndexMap<String, Vec<Bin>>,
    chrom_scores: IndexMap<String, Vec<f64>>,
    rev_gaps: HashMap<String, String>,
}

impl GenomeBins {
    pub fn new(chrom_bins: IndexMap<String, Vec<Bin>>) -> Result<Self> {
        ensure!(!chrom_bins.is_empty(), "no chromosomes with bins");
        for (chrom, bins) in &chrom_bins {
            ensure!(!bins.is_empty(), "chromosome {} has no bins", chrom);
        }
        let chrom_scores = chrom_bins
            .iter()
            .map(|(k, v)| (k.clone(), v.iter().map(|x| x.score).collect()))
            .collect();
        Ok(GenomeBins {
            chrom_bins,
            chrom_scores,
            rev_gaps: HashMap::new(),
        })
    }

    /// Builds genome bins split at the gaps of `gap_file` (if given); gaps
    /// smaller than `min_gap` are ignored.
    pub fn with_gaps(
        chrom_bins: IndexMap<String, Vec<Bin>>,
        gap_file: Option<&str>,
        min_gap: u64,
    ) -> Result<Self> {
        let gap_file = match gap_file {
            Some(path) => path,
            None => return Self::new(chrom_bins),
        };
        let g = gaps::read_gap_file(gap_file, min_gap)?;
        let split = gaps::split_on_gaps(&chrom_bins, &g)?;
        if split.ndropped > 0 {
            eprintln!("Dropped {} bins overlapping gaps", split.ndropped);
        }
        let mut gb = Self::new(split.chrom_bins)?;
        gb.rev_gaps = split.rev;
        Ok(gb)
    }

    pub fn chrom_scores(&self) -> &IndexMap<String, Vec<f64>> {
        &self.chrom_scores
    }

    pub fn num_bins(&self) -> usize {
        self.chrom_bins.values().map(|v| v.len()).sum()
    }

    /// Iterates all bins grouped per true chromosome, each group sorted by
    /// start. Used for peak/bin overlap accounting.
    pub fn bins_by_true_chrom(&self) -> IndexMap<String, Vec<&Bin>> {
        let mut res: IndexMap<String, Vec<&Bin>> = IndexMap::new();
        for (key, bins) in &self.chrom_bins {
            let chrom = self.rev_gaps.get(key).unwrap_or(key).clone();
            res.entry(chrom).or_default().extend(bins.iter());
        }
        for bins in res.values_mut() {
            bins.sort_by_key(|b| b.start);
        }
        res
    }

    /// Count of bins with a positive score.
    pub fn num_positive_bins(&self) -> usize {
        self.chrom_scores
            .values()
            .flatten()
            .filter(|&&x| x > 0.0)
            .count()
    }

    /// A copy with every negative score multiplied by `penalty`.
    pub fn scale_neg_scores(&self, penalty: f64) -> GenomeBins {
        let scale = |x: f64| if x < 0.0 { x * penalty } else { x };
        let chrom_bins: IndexMap<String, Vec<Bin>> = self
            .chrom_bins
            .iter()
            .map(|(k, v)| {
                let bins = v
                    .iter()
                    .map(|b| Bin {
                        score: scale(b.score),
                        ..b.clone()
                    })
                    .collect();
                (k.clone(), bins)
            })
            .collect();
        let chrom_scores = chrom_bins
            .iter()
            .map(|(k, v)| (k.clone(), v.iter().map(|x| x.score).collect()))
            .collect();
        GenomeBins {
            chrom_bins,
            chrom_scores,
            rev_gaps: self.rev_gaps.clone(),
        }
    }

    /// A copy with scores mapped to +1 (above `cutoff`) or -1.
    pub fn as_binary(&self, cutoff: f64) -> GenomeBins {
        let chrom_bins: IndexMap<String, Vec<Bin>> = self
            .chrom_bins
            .iter()
            .map(|(k, v)| {
                let bins = v
                    .iter()
                    .map(|b| Bin {
                        score: if b.score > cutoff { 1.0 } else { -1.0 },
                        ..b.clone()
                    })
                    .collect();
                (k.clone(), bins)
            })
            .collect();
        let chrom_scores = chrom_bins
            .iter()
            .map(|(k, v)| (k.clone(), v.iter().map(|x| x.score).collect()))
            .collect();
        GenomeBins {
            chrom_bins,
            chrom_scores,
            rev_gaps: self.rev_gaps.clone(),
        }
    }

    /// `(positive_bins, total_bins)` per (sub-)chromosome, the compact input
    /// of the binary Monte Carlo mode.
    pub fn binary_stats(&self) -> IndexMap<String, (usize, usize)> {
        self.chrom_scores
            .iter()
            .map(|(k, v)| {
                let npos = v.iter().filter(|&&x| x > 0.0).count();
                (k.clone(), (npos, v.len()))
            })
            .collect()
    }

    /// Runs the segment finder per (sub-)chromosome, maps index ranges back
    /// to genomic coordinates, drops segments scoring <= `filter_trivial`
    /// and re-joins split chromosomes in start order.
    pub fn max_segments(&self, filter_trivial: f64) -> IndexMap<String, Vec<Segment>> {
        let mut per_key: IndexMap<String, Vec<Segment>> = IndexMap::new();
        for (key, scores) in &self.chrom_scores {
            let bins = &self.chrom_bins[key];
            let segments: Vec<Segment> = max_segments(scores)
                .iter()
                .filter(|x| x.score > filter_trivial)
                .map(|x| Segment {
                    chrom: bins[x.from_idx].chrom.clone(),
                    start: bins[x.from_idx].start,
                    end: bins[x.to_idx].end,
                    score: x.score,
                })
                .collect();
            per_key.insert(key.clone(), segments);
        }
        gaps::join_segments(per_key, &self.rev_gaps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bins_from_scores(chrom: &str, scores: &[f64]) -> Vec<Bin> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &score)| Bin {
                chrom: chrom.to_string(),
                start: i as u64 * 100,
                end: (i as u64 + 1) * 100,
                score,
            })
            .collect()
    }

    fn genome(scores: &[(&str, &[f64])]) -> GenomeBins {
        let mut m = IndexMap::new();
        for (chrom, xs) in scores {
            m.insert(chrom.to_string(), bins_from_scores(chrom, xs));
        }
        GenomeBins::new(m).unwrap()
    }

    #[test]
    fn test_max_segments_coordinates() {
        let gb = genome(&[("chr1", &[1.0, 1.0, -1.0, 1.0, 1.0])]);
        let res = gb.max_segments(0.0);
        let xs = &res["chr1"];
        assert_eq!(xs.len(), 1);
        assert_eq!(xs[0].start, 0);
        assert_eq!(xs[0].end, 500);
        assert_eq!(xs[0].score, 3.0);
    }

    #[test]
    fn test_filter_trivial() {
        let gb = genome(&[("chr1", &[1.0, -1.0, 5.0])]);
        let res = gb.max_segments(2.0);
        assert_eq!(res["chr1"].len(), 1);
        assert_eq!(res["chr1"][0].score, 5.0);
    }

    #[test]
    fn test_scale_neg_scores_merges_across_dip() {
        let gb = genome(&[("chr1", &[2.0, -3.0, 2.0])]);
        assert_eq!(gb.max_segments(0.0)["chr1"].len(), 2);
        // halving the dip makes the merge worthwhile
        let scaled = gb.scale_neg_scores(0.5);
        let xs = scaled.max_segments(0.0);
        assert_eq!(xs["chr1"].len(), 1);
        assert_eq!(xs["chr1"][0].score, 2.5);
    }

    #[test]
    fn test_as_binary_and_stats() {
        let gb = genome(&[("chr1", &[0.4, -0.2, 0.9]), ("chr2", &[-1.0, 2.0])]);
        let b = gb.as_binary(0.5);
        assert_eq!(b.chrom_scores()["chr1"], vec![-1.0, -1.0, 1.0]);
        let stats = b.binary_stats();
        assert_eq!(stats["chr1"], (1, 3));
        assert_eq!(stats["chr2"], (1, 2));
    }

    #[test]
    fn test_empty_genome_rejected() {
        assert!(GenomeBins::new(IndexMap::new()).is_err());
    }
}
