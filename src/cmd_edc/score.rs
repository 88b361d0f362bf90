use clap::*;
use std::io::Write;

use edc::libs::bed;
use edc::libs::scoring;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("score")
        .about("Score binned read counts into per-bin enrichment scores")
        .after_help(
            r###"
* <infile> is a 5-column bedgraph: chrom, start, end, ip_count, input_count
    * .gz is supported, infile can be stdin
    * bins per chromosome must be sorted and non-overlapping
    * a bin with a zero count on either side is treated as unmeasured

* Control counts are normalized by the genome-wide IP/control ratio.
  Bins whose Wilson 95% interval is narrower than --ci-min score
  logit(ip / total); the rest get the median negative score.

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .index(1)
                .help("Input count bedgraph"),
        )
        .arg(
            Arg::new("ci-min")
                .long("ci-min")
                .num_args(1)
                .default_value("0.25")
                .value_parser(value_parser!(f64))
                .help("Widest Wilson interval accepted as a measured bin"),
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
    let opt_ci_min = *args.get_one::<f64>("ci-min").unwrap();

    //----------------------------
    // Operating
    //----------------------------
    let counts = bed::read_count_bedgraph(infile)?;
    let (scored, stats) = scoring::score_bins(&counts, opt_ci_min)?;

    eprintln!(
        "{} of {} bins are low-information ({:.2}%)",
        stats.low_info,
        stats.total,
        stats.low_info_ratio() * 100.0
    );

    let mut writer = edc::writer(outfile)?;
    for bins in scored.values() {
        for x in bins {
            writeln!(writer, "{}\t{}\t{}\t{}", x.chrom, x.start, x.end, x.score)?;
        }
    }

    Ok(())
}
