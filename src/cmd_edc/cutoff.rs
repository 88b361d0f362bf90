use clap::*;
use std::io::Write;

use edc::libs::bed;
use edc::libs::cutoff::ScoreCutoff;
use edc::libs::genome::GenomeBins;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("cutoff")
        .about("Pick the score cutoff separating positive from negative bins")
        .after_help(
            r###"
* <infile> is a 4-column bedgraph: chrom, start, end, score
    * .gz is supported, infile can be stdin

* Scans evenly spaced cutoffs and keeps the one maximizing
  log((observed adjacent positive pairs + 1) / (expected + 1)) * npos,
  summed over chromosomes.

* When the resulting positive-bin ratio exceeds --max-ratio, a warning is
  printed and the cutoff falls back to the score at the --max-ratio
  quantile from the top.

* Output is a single line: cutoff, positive-bin ratio.

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .index(1)
                .help("Input score bedgraph"),
        )
        .arg(
            Arg::new("max-ratio")
                .long("max-ratio")
                .num_args(1)
                .default_value("0.4")
                .value_parser(value_parser!(f64))
                .help("Upper bound on the positive-bin ratio"),
        )
        .arg(
            Arg::new("stats-out")
                .long("stats-out")
                .num_args(1)
                .help("Write the scanned (cutoff, information score) table to this file"),
        )
        .arg(
            Arg::new("outfile")
                .short('o')
                .long("outfile")
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let infile = args.get_one::<String>("infile").unwrap();
    let outfile = args.get_one::<String>("outfile").unwrap();
    let opt_max_ratio = *args.get_one::<f64>("max-ratio").unwrap();

    //----------------------------
    // Operating
    //----------------------------
    let chromd = bed::read_score_bedgraph(infile)?;
    let gb = GenomeBins::new(chromd)?;
    let sc = ScoreCutoff::from_chrom_scores(gb.chrom_scores())?;

    eprintln!(
        "Searching for the optimal cutoff between {:.3} and {:.3}",
        sc.min_score, sc.max_score
    );
    let scan = sc.optimize();
    let (lim_value, ratio) = sc.check_ratio(scan.lim_value, opt_max_ratio);

    if let Some(stats_out) = args.get_one::<String>("stats-out") {
        let mut writer = edc::writer(stats_out)?;
        writeln!(writer, "#cutoff\tinformation_score")?;
        for (cutoff, score) in scan.cutoffs.iter().zip(scan.info_scores.iter()) {
            writeln!(writer, "{}\t{}", cutoff, score)?;
        }
    }

    let mut writer = edc::writer(outfile)?;
    writeln!(writer, "{}\t{}", lim_value, ratio)?;

    Ok(())
}
