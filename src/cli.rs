// SPDX-FileCopyrightText: 2024 Andrew Gunnerson
// SPDX-License-Identifier: GPL-2.0-or-later

use std::process::ExitCode;

use anyhow::Result;
use clap::{error::ErrorKind, Parser};

use crate::info::{self, InfoCli};

const MISSING_FILE: &str = "\
geoinfo: missing file name.
Usage: geoinfo [FILE].cvt

Try `geoinfo --help` for more information.";

/// Display the metadata stored in a GEOS Convert (CVT) container.
///
/// GEOS files carry resource-fork-like metadata in their directory entry and
/// file header. Outside of a GEOS file system, they are transported inside CVT
/// containers that preserve this metadata. Only CVT files made for the
/// Commodore 8-bit computers are supported.
///
/// Report fields:
///
/// CONTAINER TYPE: "Blaster's Convert" if the container was written by
/// Blaster's Convert, by far the most common CVT utility. Anything else is
/// listed as "Unknown".
///
/// VERSION: Container version string. 2.5 is the most common.
///
/// FORMAT: PRG or SEQ. This is the file type reported in a directory listing
/// once the container is copied to a Commodore file system.
///
/// PAYLOAD: Either a GEOS SEQ or a GEOS VLIR file.
///
/// FILE NAME: Native GEOS file name from the header. This is unrelated to the
/// name of the container on the host file system. Up to 16 ASCII characters.
///
/// FILE CLASS: Class signature associating the file with its application.
///
/// FILE TYPE: One of the 16 GEOS file types (application, font, driver, ...).
///
/// AUTHOR: Optional attribution. "n/a" when missing.
///
/// LAST MODIFIED: GEOS time stamps only have minute granularity, so seconds
/// are always 00. Years are stored with 2 digits and 1986, the release year of
/// GEOS, is taken as the epoch: '87 is 1987 and '17 is 2017.
///
/// SIZE: Container size. GEOS VLIR files are limited to just under 8 MiB.
///
/// INFOBOX: Optional free text (up to 96 characters) describing the file.
#[derive(Debug, Parser)]
#[command(name = "geoinfo", version)]
pub struct Cli {
    #[command(flatten)]
    pub info: InfoCli,
}

pub fn main() -> Result<ExitCode> {
    let mut cli = match Cli::try_parse() {
        Ok(c) => c,
        // Help and version output never counts as a successful run.
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.print()?;
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => e.exit(),
    };

    let Some(input) = cli.info.input.take() else {
        println!("{MISSING_FILE}");
        return Ok(ExitCode::FAILURE);
    };

    info::info_main(&input, cli.info)?;

    Ok(ExitCode::SUCCESS)
}
