extern crate clap;
use clap::*;

mod cmd_edc;

fn main() -> anyhow::Result<()> {
    let app = Command::new("edc")
        .version(crate_version!())
        .about("`edc` - Enriched Domain Caller")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .subcommand(cmd_edc::score::make_subcommand())
        .subcommand(cmd_edc::cutoff::make_subcommand())
        .subcommand(cmd_edc::peaks::make_subcommand())
        .after_help(
            r###"Subcommands:

* score  - score binned read counts into per-bin enrichment scores
* cutoff - pick the score cutoff separating positive from negative bins
* peaks  - call significant enriched domains from scored bins

A typical run:

    edc score counts.bedgraph -o scores.bedgraph
    edc peaks scores.bedgraph --gaps gaps.bed --trials 10000 -o peaks.bed

"###,
        );

    // Check which subcomamnd the user ran...
    match app.get_matches().subcommand() {
        Some(("score", sub_matches)) => cmd_edc::score::execute(sub_matches),
        Some(("cutoff", sub_matches)) => cmd_edc::cutoff::execute(sub_matches),
        Some(("peaks", sub_matches)) => cmd_edc::peaks::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
