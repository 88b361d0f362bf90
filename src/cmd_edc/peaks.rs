use clap::*;
use std::io::Write;

use edc::libs::bed;
use edc::libs::cutoff::ScoreCutoff;
use edc::libs::genome::GenomeBins;
use edc::libs::monte_carlo::MonteCarlo;
use edc::libs::penalty::GapPenalty;
use edc::libs::significance::IntervalTest;

// p-value threshold for peaks during gap penalty calibration
const CALIB_PVAL: f64 = 0.05;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("peaks")
        .about("Call significant enriched domains from scored bins")
        .after_help(
            r###"
* <infile> is a 4-column bedgraph: chrom, start, end, score
    * .gz is supported, infile can be stdin
    * bins per chromosome must be sorted and non-overlapping

* Candidate domains are maximal scoring segments; their significance comes
  from a permutation null model: each trial shuffles all bin scores
  genome-wide, deals them back out at the original chromosome lengths and
  records the best segment score. Empirical p-values are FDR-corrected and
  peaks with q-value below --fdr are reported.

* --gaps excludes unalignable regions; segments never bridge a gap

* Without --gap-penalty, the penalty on negative bin scores is calibrated
  by golden-section search, which reruns the whole pipeline per candidate
  penalty. Pass a value to skip calibration.

* --binary maps bins to +1/-1 at an optimized score cutoff first; the
  calibration step is skipped in this mode (penalty defaults to 1)

"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .index(1)
                .help("Input score bedgraph"),
        )
        .arg(
            Arg::new("gaps")
                .long("gaps")
                .num_args(1)
                .help("3-column interval list of excluded regions"),
        )
        .arg(
            Arg::new("min-gap")
                .long("min-gap")
                .num_args(1)
                .default_value("1000")
                .value_parser(value_parser!(u64))
                .help("Ignore gaps smaller than this size"),
        )
        .arg(
            Arg::new("trials")
                .long("trials")
                .num_args(1)
                .default_value("10000")
                .value_parser(value_parser!(usize))
                .help("Number of Monte Carlo trials"),
        )
        .arg(
            Arg::new("parallel")
                .short('p')
                .long("parallel")
                .num_args(1)
                .default_value("4")
                .value_parser(value_parser!(usize))
                .help("Number of threads for parallel processing"),
        )
        .arg(
            Arg::new("fdr")
                .long("fdr")
                .num_args(1)
                .default_value("0.05")
                .value_parser(value_parser!(f64))
                .help("Report peaks with q-value below this"),
        )
        .arg(
            Arg::new("gap-penalty")
                .long("gap-penalty")
                .num_args(1)
                .value_parser(value_parser!(f64))
                .help("Multiplier on negative bin scores; omit to calibrate"),
        )
        .arg(
            Arg::new("precision")
                .long("precision")
                .num_args(1)
                .default_value("0.2")
                .value_parser(value_parser!(f64))
                .help("Bracket width at which calibration stops"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .num_args(1)
                .value_parser(value_parser!(u64))
                .help("Seed for the permutation null model; omit for random"),
        )
        .arg(
            Arg::new("binary")
                .long("binary")
                .action(ArgAction::SetTrue)
                .help("Map bins to +1/-1 at an optimized cutoff first"),
        )
        .arg(
            Arg::new("max-ratio")
                .long("max-ratio")
                .num_args(1)
                .default_value("0.4")
                .value_parser(value_parser!(f64))
                .help("Upper bound on the positive-bin ratio in binary mode"),
        )
        .arg(
            Arg::new("null-out")
                .long("null-out")
                .num_args(1)
                .help("Write the null distribution to this file"),
        )
        .arg(
            Arg::new("penalty-out")
                .long("penalty-out")
                .num_args(1)
                .help("Write the calibration table to this file"),
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
    let gap_file = args.get_one::<String>("gaps").map(|x| x.as_str());

    let opt_min_gap = *args.get_one::<u64>("min-gap").unwrap();
    let opt_trials = *args.get_one::<usize>("trials").unwrap();
    let opt_parallel = *args.get_one::<usize>("parallel").unwrap();
    let opt_fdr = *args.get_one::<f64>("fdr").unwrap();
    let opt_precision = *args.get_one::<f64>("precision").unwrap();
    let opt_max_ratio = *args.get_one::<f64>("max-ratio").unwrap();
    let is_binary = args.get_flag("binary");

    let seed = match args.get_one::<u64>("seed") {
        Some(&s) => s,
        None => rand::random(),
    };

    //----------------------------
    // Operating
    //----------------------------
    let chromd = bed::read_score_bedgraph(infile)?;
    let mut gb = GenomeBins::with_gaps(chromd, gap_file, opt_min_gap)?;
    eprintln!("{} bins loaded", gb.num_bins());

    if is_binary {
        let sc = ScoreCutoff::from_chrom_scores(gb.chrom_scores())?;
        let scan = sc.optimize();
        let (lim_value, ratio) = sc.check_ratio(scan.lim_value, opt_max_ratio);
        eprintln!(
            "Binary mode: cutoff {:.4}, positive bin ratio {:.2}",
            lim_value, ratio
        );
        gb = gb.as_binary(lim_value);
    }

    let gap_penalty = match args.get_one::<f64>("gap-penalty") {
        Some(&x) => x,
        None if is_binary => 1.0,
        None => {
            eprintln!("Estimating gap penalty");
            let mut search = GapPenalty::new(
                &gb,
                opt_trials,
                opt_parallel,
                CALIB_PVAL,
                opt_precision,
                seed,
            )?;
            let penalty = search.search_default()?;
            eprintln!("Gap penalty estimated to {:.2}", penalty);
            if let Some(penalty_out) = args.get_one::<String>("penalty-out") {
                let mut writer = edc::writer(penalty_out)?;
                writeln!(
                    writer,
                    "#gap_penalty\teib\tdib\tnpeaks\tpeak_eib_ratio\tglobal_eib_coverage\tscore"
                )?;
                for fit in search.evaluations() {
                    writeln!(
                        writer,
                        "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                        fit.gap_penalty,
                        fit.eib,
                        fit.dib,
                        fit.npeaks,
                        fit.peak_eib_ratio,
                        fit.global_eib_coverage,
                        fit.score
                    )?;
                }
            }
            penalty
        }
    };

    let scaled = gb.scale_neg_scores(gap_penalty);
    let observed = scaled.max_segments(0.0);
    let ncandidates: usize = observed.values().map(|v| v.len()).sum();
    eprintln!("{} candidate domains", ncandidates);

    eprintln!("Performing {} Monte Carlo trials", opt_trials);
    let mc = if is_binary {
        MonteCarlo::from_binary_stats(&gb.binary_stats(), gap_penalty)?
    } else {
        MonteCarlo::from_scores(scaled.chrom_scores())?
    };
    let null = mc.run_simulation(opt_trials, opt_parallel, seed)?;

    if let Some(null_out) = args.get_one::<String>("null-out") {
        let mut writer = edc::writer(null_out)?;
        for x in &null {
            writeln!(writer, "{}", x)?;
        }
    }

    let tester = IntervalTest::new(null)?;
    let significant = tester.significant(&observed, opt_fdr);
    eprintln!(
        "Got {} peaks with q-value below {:.2}, from {} possible",
        significant.len(),
        opt_fdr,
        ncandidates
    );

    let segments: Vec<bed::Segment> = significant.into_iter().map(|x| x.segment).collect();
    let mut writer = edc::writer(outfile)?;
    bed::write_peaks(&mut writer, &segments)?;

    Ok(())
}
