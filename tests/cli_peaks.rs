use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn command_peaks() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("edc")?;
    let output = cmd
        .arg("peaks")
        .arg("tests/peaks/scores.bedgraph")
        .arg("--trials")
        .arg("200")
        .arg("--seed")
        .arg("7")
        .arg("--gap-penalty")
        .arg("5")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(output.status.success());
    // the strong block is the only significant domain
    assert_eq!(stdout.lines().count(), 1);
    assert!(stdout.contains("chr1\t8000\t24000\t80"));

    Ok(())
}

#[test]
fn command_peaks_with_gaps() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("edc")?;
    let output = cmd
        .arg("peaks")
        .arg("tests/peaks/scores.bedgraph")
        .arg("--gaps")
        .arg("tests/peaks/gaps.bed")
        .arg("--min-gap")
        .arg("100")
        .arg("--trials")
        .arg("200")
        .arg("--seed")
        .arg("7")
        .arg("--gap-penalty")
        .arg("5")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(output.status.success());
    // the gap splits the block; no peak may bridge it
    assert_eq!(stdout.lines().count(), 2);
    assert!(stdout.contains("chr1\t8000\t14000\t30"));
    assert!(stdout.contains("chr1\t16000\t24000\t40"));

    Ok(())
}

#[test]
fn command_peaks_binary() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("edc")?;
    let output = cmd
        .arg("peaks")
        .arg("tests/peaks/scores.bedgraph")
        .arg("--binary")
        .arg("--trials")
        .arg("200")
        .arg("--seed")
        .arg("7")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(output.status.success());
    // in binary mode the block scores one per bin
    assert_eq!(stdout.lines().count(), 1);
    assert!(stdout.contains("chr1\t8000\t24000\t16"));

    Ok(())
}

#[test]
fn command_peaks_calibrates_penalty() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("edc")?;
    cmd.arg("peaks")
        .arg("tests/peaks/scores.bedgraph")
        .arg("--trials")
        .arg("200")
        .arg("--seed")
        .arg("7")
        .assert()
        .success()
        .stderr(predicate::str::contains("Gap penalty estimated to"))
        .stdout(predicate::str::contains("chr1\t8000\t24000\t80"));

    Ok(())
}

#[test]
fn command_peaks_null_out() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let null_path = dir.path().join("null.tsv");
    let out_path = dir.path().join("peaks.bed");

    let mut cmd = Command::cargo_bin("edc")?;
    let output = cmd
        .arg("peaks")
        .arg("tests/peaks/scores.bedgraph")
        .arg("--trials")
        .arg("200")
        .arg("--seed")
        .arg("7")
        .arg("--gap-penalty")
        .arg("5")
        .arg("--null-out")
        .arg(null_path.to_str().unwrap())
        .arg("-o")
        .arg(out_path.to_str().unwrap())
        .output()?;

    assert!(output.status.success());

    // one null statistic per trial, sorted ascending
    let null = std::fs::read_to_string(&null_path)?;
    let values: Vec<f64> = null.lines().map(|x| x.parse().unwrap()).collect();
    assert_eq!(values.len(), 200);
    assert!(values.windows(2).all(|w| w[0] <= w[1]));

    let peaks = std::fs::read_to_string(&out_path)?;
    assert!(peaks.contains("chr1\t8000\t24000\t80"));

    Ok(())
}

#[test]
fn command_peaks_reproducible() -> anyhow::Result<()> {
    let run = || -> anyhow::Result<String> {
        let mut cmd = Command::cargo_bin("edc")?;
        let output = cmd
            .arg("peaks")
            .arg("tests/peaks/scores.bedgraph")
            .arg("--trials")
            .arg("100")
            .arg("--seed")
            .arg("11")
            .arg("--gap-penalty")
            .arg("5")
            .arg("--fdr")
            .arg("0.5")
            .output()?;
        Ok(String::from_utf8(output.stdout)?)
    };
    assert_eq!(run()?, run()?);

    Ok(())
}

#[test]
fn command_peaks_rejects_malformed() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("bad.bedgraph");
    std::fs::write(&path, "chr1\t1000\t2000\t1\nchr1\t0\t1000\t1\n")?;

    let mut cmd = Command::cargo_bin("edc")?;
    cmd.arg("peaks")
        .arg(path.to_str().unwrap())
        .arg("--trials")
        .arg("10")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsorted"));

    Ok(())
}
