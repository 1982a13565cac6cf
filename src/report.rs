// SPDX-FileCopyrightText: 2024 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use std::fmt::Write;

use clap::ValueEnum;

use crate::{cvt::CvtMetadata, util};

const LABEL_WIDTH: usize = 14;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum SizeUnit {
    /// Bytes.
    #[default]
    #[value(name = "b")]
    Bytes,
    /// Kilobytes (1024 bytes).
    #[value(name = "kb")]
    Kilobytes,
    /// Megabytes (1048576 bytes).
    #[value(name = "mb")]
    Megabytes,
}

/// Format a byte count with thousands separators in the requested unit.
pub fn format_size(size: u64, unit: SizeUnit) -> String {
    match unit {
        SizeUnit::Bytes => format!("{} bytes", util::group_digits(&size.to_string())),
        SizeUnit::Kilobytes => {
            let n = format!("{:.2}", size as f64 / 1024.0);
            format!("{} kB", util::group_digits(&n))
        }
        SizeUnit::Megabytes => {
            let n = format!("{:.2}", size as f64 / 1_048_576.0);
            format!("{} MB", util::group_digits(&n))
        }
    }
}

fn line(out: &mut String, label: &str, value: impl std::fmt::Display) {
    // Writing to a String cannot fail.
    let _ = writeln!(out, "{label:>width$}: {value}", width = LABEL_WIDTH);
}

/// Render the human readable report. The whole report is built up front so
/// that nothing is printed if a later step fails.
pub fn render(metadata: &CvtMetadata, unit: SizeUnit) -> String {
    let mut out = String::new();

    line(&mut out, "Container Type", metadata.vendor);
    line(&mut out, "Version", &metadata.version);
    line(&mut out, "Format", &metadata.format);
    line(&mut out, "Payload", metadata.payload);
    out.push('\n');
    line(&mut out, "File Name", &metadata.file_name);
    line(&mut out, "File Class", &metadata.file_class);
    line(&mut out, "File Type", metadata.file_type);
    line(&mut out, "Author", metadata.author.as_deref().unwrap_or("n/a"));
    line(&mut out, "Last Modified", metadata.modified);
    line(&mut out, "Size", format_size(metadata.size, unit));
    line(&mut out, "Infobox", metadata.infobox.as_deref().unwrap_or(""));

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cvt::{self, tests::sample_container};

    #[test]
    fn render_sample() {
        let metadata = cvt::decode(&sample_container()).unwrap();

        // Empty values keep the space after the colon.
        let expected = [
            "Container Type: Blaster's Convert",
            "       Version: 3.0",
            "        Format: PRG",
            "       Payload: GEOS VLIR",
            "",
            "     File Name: TESTFILE",
            "    File Class: ",
            "     File Type: Application",
            "        Author: n/a",
            " Last Modified: 2023-05-10 at 14:30:00",
            "          Size: 512 bytes",
            "       Infobox: ",
            "",
        ]
        .join("\n");
        assert_eq!(render(&metadata, SizeUnit::Bytes), expected);
    }

    #[test]
    fn render_optional_fields() {
        let mut metadata = cvt::decode(&sample_container()).unwrap();
        metadata.author = Some("Berkeley Softworks".into());
        metadata.infobox = Some("Hello".into());
        metadata.version = cvt::ContainerVersion::Unknown;
        metadata.vendor = cvt::ContainerVendor::Unknown;

        let report = render(&metadata, SizeUnit::Bytes);
        assert!(report.contains("Container Type: Unknown\n"));
        assert!(report.contains("       Version: Unknown\n"));
        assert!(report.contains("        Author: Berkeley Softworks\n"));
        assert!(report.ends_with("       Infobox: Hello\n"));
    }

    #[test]
    fn size_units() {
        assert_eq!(format_size(512, SizeUnit::Bytes), "512 bytes");
        assert_eq!(format_size(8_388_607, SizeUnit::Bytes), "8,388,607 bytes");
        assert_eq!(format_size(1536, SizeUnit::Kilobytes), "1.50 kB");
        assert_eq!(format_size(2_097_152, SizeUnit::Kilobytes), "2,048.00 kB");
        assert_eq!(format_size(3_145_728, SizeUnit::Megabytes), "3.00 MB");
        assert_eq!(format_size(512, SizeUnit::Megabytes), "0.00 MB");
    }
}
