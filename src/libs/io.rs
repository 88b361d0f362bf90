use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, BufWriter, Write};

/// Opens a line reader, transparently decompressing `.gz` files.
/// `"stdin"` reads from standard input.
///
/// ```
/// use std::io::BufRead;
/// let reader = edc::reader("tests/peaks/scores.bedgraph").unwrap();
/// assert!(reader.lines().count() > 0);
/// ```
pub fn reader(input: &str) -> Result<Box<dyn BufRead>> {
    let reader: Box<dyn BufRead> = if input == "stdin" {
        Box::new(BufReader::new(std::io::stdin()))
    } else {
        let path = std::path::Path::new(input);
        let file = std::fs::File::open(path)
            .with_context(|| format!("could not open {}", path.display()))?;

        if path.extension() == Some(std::ffi::OsStr::new("gz")) {
            Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        }
    };

    Ok(reader)
}

/// Opens a buffered writer. `"stdout"` writes to standard output.
pub fn writer(output: &str) -> Result<Box<dyn Write>> {
    let writer: Box<dyn Write> = if output == "stdout" {
        Box::new(BufWriter::new(std::io::stdout()))
    } else {
        let file = std::fs::File::create(output)
            .with_context(|| format!("could not create {}", output))?;
        Box::new(BufWriter::new(file))
    };

    Ok(writer)
}
