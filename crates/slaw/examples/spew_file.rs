//! Prints an overview of every record in a binary slaw file.
//!
//! ```text
//! cargo run --example spew_file -- path/to/file.slaw
//! ```

use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;

use slaw::{overview, SlawReader};

fn main() -> ExitCode {
    let Some(path) = std::env::args().nth(1) else {
        eprintln!("usage: spew_file <file.slaw>");
        return ExitCode::FAILURE;
    };

    println!("Reading: {}", path);
    let file = match File::open(&path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("cannot open {}: {}", path, e);
            return ExitCode::FAILURE;
        }
    };

    let mut reader = match SlawReader::new(BufReader::new(file)) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("not a slaw stream: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let header = *reader.header();
    println!(
        "Version {}, {}-endian{}",
        header.version,
        if header.is_big_endian() { "big" } else { "little" },
        if header.needs_swap() { " (swapped on read)" } else { "" }
    );

    let mut count = 0usize;
    loop {
        match reader.read() {
            Ok(Some(s)) => {
                println!("\n=== Record {} ({} bytes) ===", count, s.len_bytes());
                print!("{}", overview(s.view()));
                count += 1;
            }
            Ok(None) => break,
            Err(e) => {
                eprintln!("record {}: {} ({})", count, e, e.code().description());
                return ExitCode::FAILURE;
            }
        }
    }

    println!("\n{} records", count);
    ExitCode::SUCCESS
}
