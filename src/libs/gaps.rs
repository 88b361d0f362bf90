//! Splits per-chromosome bin runs at excluded regions so that segments can
//! never bridge an unalignable part of the genome.
//!
//! Each contiguous run becomes a synthetic chromosome named `"{chrom}_{i}"`;
//! a reverse mapping restores the true names after segment finding.

use crate::libs::bed::{Bin, Gap, Segment};
use anyhow::{bail, ensure, Context, Result};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::io::BufRead;

/// Outcome of splitting the genome on gaps.
pub struct SplitBins {
    /// Bin runs keyed by synthetic name (or the true name if a chromosome
    /// carries no gap).
    pub chrom_bins: IndexMap<String, Vec<Bin>>,
    /// Synthetic name back to true chromosome.
    pub rev: HashMap<String, String>,
    /// Bins dropped because they overlapped a gap.
    pub ndropped: usize,
}

/// Reads a 3-column interval list into sorted, merged gaps per chromosome.
/// Gaps smaller than `drop_smaller_than` (after merging) are discarded.
pub fn read_gap_file(input: &str, drop_smaller_than: u64) -> Result<IndexMap<String, Vec<Gap>>> {
    let reader = crate::reader(input)?;
    let mut raw: IndexMap<String, Vec<Gap>> = IndexMap::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            bail!("{}:{}: expected 3 fields, got {}", input, i + 1, fields.len());
        }
        let start: u64 = fields[1]
            .parse()
            .with_context(|| format!("{}:{}: bad coordinate", input, i + 1))?;
        let end: u64 = fields[2]
            .parse()
            .with_context(|| format!("{}:{}: bad coordinate", input, i + 1))?;
        ensure!(start < end, "{}:{}: empty gap interval", input, i + 1);
        raw.entry(fields[0].to_string()).or_default().push(Gap {
            chrom: fields[0].to_string(),
            start,
            end,
        });
    }

    let mut res: IndexMap<String, Vec<Gap>> = IndexMap::new();
    for (chrom, mut gaps) in raw {
        gaps.sort_by_key(|g| g.start);
        let mut merged: Vec<Gap> = Vec::new();
        for g in gaps {
            match merged.last_mut() {
                Some(last) if g.start <= last.end => {
                    last.end = last.end.max(g.end);
                }
                _ => merged.push(g),
            }
        }
        merged.retain(|g| g.end - g.start >= drop_smaller_than);
        if !merged.is_empty() {
            res.insert(chrom, merged);
        }
    }
    Ok(res)
}

/// Partitions each chromosome's bins into runs separated at gap-overlapping
/// bins. Overlapping bins are dropped and counted; chromosomes without gaps
/// pass through under their own name.
///
/// Fails if a synthetic run name is already taken by an input chromosome.
pub fn split_on_gaps(
    bins_per_chrom: &IndexMap<String, Vec<Bin>>,
    gaps: &IndexMap<String, Vec<Gap>>,
) -> Result<SplitBins> {
    let mut chrom_bins: IndexMap<String, Vec<Bin>> = IndexMap::new();
    let mut rev: HashMap<String, String> = HashMap::new();
    let mut ndropped = 0;

    for (chrom, bins) in bins_per_chrom {
        let chrom_gaps = match gaps.get(chrom) {
            Some(g) => g,
            None => {
                chrom_bins.insert(chrom.clone(), bins.clone());
                continue;
            }
        };

        let mut groups: Vec<Vec<Bin>> = Vec::new();
        let mut cur: Vec<Bin> = Vec::new();
        let mut gi = 0;
        for bin in bins {
            while gi < chrom_gaps.len() && chrom_gaps[gi].end <= bin.start {
                gi += 1;
            }
            if gi < chrom_gaps.len() && chrom_gaps[gi].overlaps(bin.start, bin.end) {
                if !cur.is_empty() {
                    groups.push(std::mem::take(&mut cur));
                }
                ndropped += 1;
            } else {
                cur.push(bin.clone());
            }
        }
        if !cur.is_empty() {
            groups.push(cur);
        }

        for (i, group) in groups.into_iter().enumerate() {
            let name = format!("{}_{}", chrom, i);
            ensure!(
                !bins_per_chrom.contains_key(&name),
                "run name {} collides with an input chromosome",
                name
            );
            rev.insert(name.clone(), chrom.clone());
            chrom_bins.insert(name, group);
        }
    }

    Ok(SplitBins {
        chrom_bins,
        rev,
        ndropped,
    })
}

/// Re-keys per-(sub-)chromosome segments back to true chromosome names and
/// restores start order within each chromosome.
pub fn join_segments(
    segments_per_key: IndexMap<String, Vec<Segment>>,
    rev: &HashMap<String, String>,
) -> IndexMap<String, Vec<Segment>> {
    let mut res: IndexMap<String, Vec<Segment>> = IndexMap::new();
    for (key, segments) in segments_per_key {
        let chrom = rev.get(&key).unwrap_or(&key).clone();
        res.entry(chrom).or_default().extend(segments);
    }
    for segments in res.values_mut() {
        segments.sort_by_key(|s| s.start);
    }
    res
}
