// SPDX-FileCopyrightText: 2024 Andrew Gunnerson
// SPDX-License-Identifier: GPL-2.0-or-later

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{ArgAction, Args, ValueEnum};

use crate::{
    cvt, metadata,
    report::{self, SizeUnit},
    util::{self, HostPath},
};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Human readable report.
    #[default]
    Text,
    /// TOML metadata document.
    Toml,
}

/// Read a container from disk. The size is checked against the file metadata
/// first so that implausibly large files are never loaded.
fn read_container(path: &Path) -> Result<Vec<u8>> {
    let size = fs::metadata(path)
        .with_context(|| format!("Failed to stat file: {:?}", HostPath(path)))?
        .len();
    cvt::check_size(size).with_context(|| format!("Invalid container: {:?}", HostPath(path)))?;

    fs::read(path).with_context(|| format!("Failed to read file: {:?}", HostPath(path)))
}

pub fn info_main(input: &Path, cli: InfoCli) -> Result<()> {
    if cli.verbose > 0 && !util::has_cvt_extension(input) {
        eprintln!("Warning: file does not have a .cvt extension: {:?}", HostPath(input));
    }

    let data = read_container(input)?;

    if cli.verbose > 0 {
        eprintln!("Container: {:?} ({} bytes)", HostPath(input), data.len());
    }

    let metadata = cvt::decode(&data)
        .with_context(|| format!("Failed to decode container: {:?}", HostPath(input)))?;

    if cli.verbose > 0 && metadata.modified.to_civil().is_none() {
        eprintln!(
            "Warning: modification time is not a valid date: {}",
            metadata.modified
        );
    }
    if cli.verbose > 1 {
        eprintln!("Metadata: {metadata:#?}");
    }

    let output = match cli.format {
        OutputFormat::Text => report::render(&metadata, cli.size_unit),
        OutputFormat::Toml => metadata::to_string(&metadata::CvtInfo::from(&metadata))?,
    };

    match &cli.output {
        Some(path) => fs::write(path, output)
            .with_context(|| format!("Failed to write report: {:?}", HostPath(path)))?,
        None => io::stdout()
            .lock()
            .write_all(output.as_bytes())
            .context("Failed to write report to stdout")?,
    }

    Ok(())
}

/// Report options.
#[derive(Debug, Args)]
pub struct InfoCli {
    /// Input CVT container.
    #[arg(value_parser, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Unit for the reported container size.
    #[arg(short = 'u', long, value_enum, default_value_t)]
    size_unit: SizeUnit,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t)]
    format: OutputFormat,

    /// Write the output to a file instead of stdout.
    #[arg(short, long, value_parser, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Verbose output.
    ///
    /// When specified once, the container path and size are printed out along
    /// with warnings about unusual, but not fatal, contents. When specified
    /// twice, the full decoded metadata is printed out as well.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}
