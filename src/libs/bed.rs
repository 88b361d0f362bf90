use anyhow::{bail, ensure, Context, Result};
use indexmap::IndexMap;
use std::io::{BufRead, Write};

/// A scored genomic bin, half-open `[start, end)`.
///
/// Bins of one chromosome form an ordered, non-overlapping sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub score: f64,
}

/// A contiguous run of bins with the sum of their scores.
/// `start`/`end` come from the first/last contributing bin.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub score: f64,
}

/// An excluded genomic interval, half-open `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gap {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
}

impl Gap {
    /// True if the two half-open intervals share at least one base.
    pub fn overlaps(&self, start: u64, end: u64) -> bool {
        self.start < end && start < self.end
    }
}

/// A bin holding raw IP and control read counts.
#[derive(Debug, Clone, PartialEq)]
pub struct CountBin {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub ip: f64,
    pub input: f64,
}

fn parse_coord(field: &str, input: &str, lineno: usize) -> Result<u64> {
    field
        .parse()
        .with_context(|| format!("{}:{}: bad coordinate {:?}", input, lineno, field))
}

fn is_data_line(line: &str) -> bool {
    !line.trim().is_empty() && !line.starts_with('#') && !line.starts_with("track")
}

/// Reads a 4-column bedgraph (`chrom start end score`) into per-chromosome
/// bin vectors, preserving the order chromosomes first appear in.
///
/// Bins of one chromosome must be sorted and non-overlapping; anything else
/// is a hard error, never silently dropped.
pub fn read_score_bedgraph(input: &str) -> Result<IndexMap<String, Vec<Bin>>> {
    let reader = crate::reader(input)?;
    let mut chromd: IndexMap<String, Vec<Bin>> = IndexMap::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if !is_data_line(&line) {
            continue;
        }
        let lineno = i + 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 4 {
            bail!("{}:{}: expected 4 fields, got {}", input, lineno, fields.len());
        }
        let start = parse_coord(fields[1], input, lineno)?;
        let end = parse_coord(fields[2], input, lineno)?;
        ensure!(start < end, "{}:{}: empty interval", input, lineno);
        let score: f64 = fields[3]
            .parse()
            .with_context(|| format!("{}:{}: bad score {:?}", input, lineno, fields[3]))?;
        ensure!(score.is_finite(), "{}:{}: non-finite score", input, lineno);

        let bins = chromd.entry(fields[0].to_string()).or_default();
        if let Some(prev) = bins.last() {
            ensure!(
                start >= prev.end,
                "{}:{}: bins unsorted or overlapping on {}",
                input,
                lineno,
                fields[0]
            );
        }
        bins.push(Bin {
            chrom: fields[0].to_string(),
            start,
            end,
            score,
        });
    }

    ensure!(!chromd.is_empty(), "no bins read from {}", input);
    Ok(chromd)
}

/// Reads a 5-column count bedgraph (`chrom start end ip input`).
///
/// A bin where either count is zero is zeroed in both; nearly every real bin
/// has some background, so a zero on either side marks an unmeasured bin.
pub fn read_count_bedgraph(input: &str) -> Result<IndexMap<String, Vec<CountBin>>> {
    let reader = crate::reader(input)?;
    let mut chromd: IndexMap<String, Vec<CountBin>> = IndexMap::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if !is_data_line(&line) {
            continue;
        }
        let lineno = i + 1;
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 5 {
            bail!("{}:{}: expected 5 fields, got {}", input, lineno, fields.len());
        }
        let start = parse_coord(fields[1], input, lineno)?;
        let end = parse_coord(fields[2], input, lineno)?;
        ensure!(start < end, "{}:{}: empty interval", input, lineno);
        let mut ip: f64 = fields[3]
            .parse()
            .with_context(|| format!("{}:{}: bad count {:?}", input, lineno, fields[3]))?;
        let mut ctrl: f64 = fields[4]
            .parse()
            .with_context(|| format!("{}:{}: bad count {:?}", input, lineno, fields[4]))?;
        ensure!(
            ip >= 0.0 && ctrl >= 0.0,
            "{}:{}: negative read count",
            input,
            lineno
        );
        if ip == 0.0 || ctrl == 0.0 {
            ip = 0.0;
            ctrl = 0.0;
        }

        let bins = chromd.entry(fields[0].to_string()).or_default();
        if let Some(prev) = bins.last() {
            ensure!(
                start >= prev.end,
                "{}:{}: bins unsorted or overlapping on {}",
                input,
                lineno,
                fields[0]
            );
        }
        bins.push(CountBin {
            chrom: fields[0].to_string(),
            start,
            end,
            ip,
            input: ctrl,
        });
    }

    ensure!(!chromd.is_empty(), "no bins read from {}", input);
    Ok(chromd)
}

/// Writes segments as `chrom\tstart\tend\tscore` lines, sorted by
/// chromosome then start.
pub fn write_peaks<W: Write>(writer: &mut W, segments: &[Segment]) -> Result<()> {
    let mut sorted: Vec<&Segment> = segments.iter().collect();
    sorted.sort_by(|a, b| a.chrom.cmp(&b.chrom).then(a.start.cmp(&b.start)));
    for x in sorted {
        writeln!(writer, "{}\t{}\t{}\t{}", x.chrom, x.start, x.end, x.score)?;
    }
    Ok(())
}
