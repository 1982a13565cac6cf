// SPDX-FileCopyrightText: 2024 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

//! Decoder for the header of GEOS Convert (CVT) containers, as produced for
//! the Commodore 8-bit line of computers.
//!
//! Every field lives at an absolute offset into the container. Text fields are
//! ASCII by definition of the format, so each byte is mapped straight to the
//! character with the same value without any range checks. Only structural
//! problems (bad container size, truncated fields) are errors. Unrecognized
//! codes are reported as explicit unknown values.

use std::{fmt, ops::Range};

use bstr::ByteSlice;
use jiff::civil;
use thiserror::Error;

use crate::util;

/// Containers must be strictly larger than this.
pub const MIN_SIZE: u64 = 256;
/// Containers must be strictly smaller than this.
pub const MAX_SIZE: u64 = 8_388_608;

/// Signature written by Blaster's Convert.
pub const BLASTERS_CONVERT_MAGIC: &[u8; 19] = b"BLASTER'S CONVERTER";

const FILE_NAME: Range<usize> = 0x03..0x13;
const PAYLOAD_KIND: usize = 0x15;
const FILE_TYPE: usize = 0x16;
const TIMESTAMP: Range<usize> = 0x17..0x1c;
const FORMAT: Range<usize> = 0x1e..0x21;
const VENDOR_MAGIC: Range<usize> = 0x9e..0xb1;
const VERSION: Range<usize> = 0xb2..0xb6;
const FILE_CLASS: usize = 0x149;
const AUTHOR: usize = 0x15d;
// The presence flag doubles as the first byte of the infobox text.
const INFOBOX: usize = 0x19c;

const TERMINATOR: u8 = 0x00;

/// Header field, for error reporting.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Field {
    FileName,
    PayloadKind,
    FileType,
    Timestamp,
    Format,
    VendorMagic,
    Version,
    FileClass,
    Author,
    InfoboxPresent,
    Infobox,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FileName => "file name",
            Self::PayloadKind => "payload kind",
            Self::FileType => "file type",
            Self::Timestamp => "timestamp",
            Self::Format => "format",
            Self::VendorMagic => "container signature",
            Self::Version => "container version",
            Self::FileClass => "file class",
            Self::Author => "author",
            Self::InfoboxPresent => "infobox flag",
            Self::Infobox => "infobox",
        })
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum Error {
    #[error("{size} bytes is the wrong size to be a valid GEOS CVT file")]
    InvalidContainerSize { size: u64 },
    #[error("{field} field at offset {offset:#x} has no terminator before the end of the container")]
    UnterminatedField { field: Field, offset: usize },
    #[error("{field} field at offset {offset:#x} ({width} bytes) is past the end of the container ({size} bytes)")]
    FieldOutOfBounds {
        field: Field,
        offset: usize,
        width: usize,
        size: usize,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContainerVendor {
    BlastersConvert,
    Unknown,
}

impl ContainerVendor {
    pub fn from_magic(magic: &[u8]) -> Self {
        if magic == BLASTERS_CONVERT_MAGIC {
            Self::BlastersConvert
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for ContainerVendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlastersConvert => f.write_str("Blaster's Convert"),
            Self::Unknown => f.write_str("Unknown"),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ContainerVersion {
    /// Version text following the leading `V`.
    Version(String),
    Unknown,
}

impl ContainerVersion {
    pub fn from_raw(raw: &[u8]) -> Self {
        let text = util::collapse_whitespace(&util::ascii(raw));

        match text.strip_prefix('V') {
            Some(v) => Self::Version(v.to_owned()),
            None => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Version(v) => Some(v),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for ContainerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or("Unknown"))
    }
}

/// Record structure of the GEOS payload. This is unrelated to the CBM DOS file
/// type the container itself presents as.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PayloadKind {
    GeosSeq,
    GeosVlir,
    NotGeos(u8),
}

impl PayloadKind {
    pub fn from_raw(value: u8) -> Self {
        match value {
            0 => Self::GeosSeq,
            1 => Self::GeosVlir,
            v => Self::NotGeos(v),
        }
    }

    pub fn to_raw(self) -> u8 {
        match self {
            Self::GeosSeq => 0,
            Self::GeosVlir => 1,
            Self::NotGeos(v) => v,
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GeosSeq => f.write_str("GEOS SEQ"),
            Self::GeosVlir => f.write_str("GEOS VLIR"),
            Self::NotGeos(_) => f.write_str("NOT GEOS"),
        }
    }
}

/// GEOS file class, as stored in the directory entry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum GeosFileType {
    Unknown(u8),
    NonGeos,
    Basic,
    Assembler,
    DataFile,
    SystemFile,
    DeskAccessory,
    Application,
    ApplicationData,
    Font,
    PrintDriver,
    InputDriver,
    DiskDriver,
    SystemBootFile,
    TemporaryFile,
    AutoExec,
    C128InputDriver,
}

impl GeosFileType {
    pub fn from_raw(value: u8) -> Self {
        match value {
            0x0 => Self::NonGeos,
            0x1 => Self::Basic,
            0x2 => Self::Assembler,
            0x3 => Self::DataFile,
            0x4 => Self::SystemFile,
            0x5 => Self::DeskAccessory,
            0x6 => Self::Application,
            0x7 => Self::ApplicationData,
            0x8 => Self::Font,
            0x9 => Self::PrintDriver,
            0xa => Self::InputDriver,
            0xb => Self::DiskDriver,
            0xc => Self::SystemBootFile,
            0xd => Self::TemporaryFile,
            0xe => Self::AutoExec,
            0xf => Self::C128InputDriver,
            v => Self::Unknown(v),
        }
    }

    pub fn to_raw(self) -> u8 {
        match self {
            Self::Unknown(v) => v,
            Self::NonGeos => 0x0,
            Self::Basic => 0x1,
            Self::Assembler => 0x2,
            Self::DataFile => 0x3,
            Self::SystemFile => 0x4,
            Self::DeskAccessory => 0x5,
            Self::Application => 0x6,
            Self::ApplicationData => 0x7,
            Self::Font => 0x8,
            Self::PrintDriver => 0x9,
            Self::InputDriver => 0xa,
            Self::DiskDriver => 0xb,
            Self::SystemBootFile => 0xc,
            Self::TemporaryFile => 0xd,
            Self::AutoExec => 0xe,
            Self::C128InputDriver => 0xf,
        }
    }
}

impl fmt::Display for GeosFileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(_) => f.write_str("UNKNOWN"),
            Self::NonGeos => f.write_str("non-GEOS"),
            Self::Basic => f.write_str("BASIC"),
            Self::Assembler => f.write_str("Assembler"),
            Self::DataFile => f.write_str("Data File"),
            Self::SystemFile => f.write_str("System File"),
            Self::DeskAccessory => f.write_str("Desk Accessory"),
            Self::Application => f.write_str("Application"),
            Self::ApplicationData => f.write_str("Application Data"),
            Self::Font => f.write_str("Font"),
            Self::PrintDriver => f.write_str("Print Driver"),
            Self::InputDriver => f.write_str("Input Driver"),
            Self::DiskDriver => f.write_str("Disk Driver"),
            Self::SystemBootFile => f.write_str("System Boot File"),
            Self::TemporaryFile => f.write_str("Temporary File"),
            Self::AutoExec => f.write_str("Auto Exec"),
            Self::C128InputDriver => f.write_str("Commodore 128 Input Driver"),
        }
    }
}

/// Last modification time. GEOS only records minutes, so seconds are always 0.
/// No calendar validation is done: whatever is stored is reported.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GeosTimestamp {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
}

impl GeosTimestamp {
    /// Expand a 2-digit year, taking 1986 (the release of GEOS) as the epoch.
    /// This stops working for 2086 and later.
    pub fn expand_year(raw: u8) -> u16 {
        if raw > 85 {
            1900 + u16::from(raw)
        } else {
            2000 + u16::from(raw)
        }
    }

    /// Fields are plain binary, not BCD.
    pub fn from_raw(raw: [u8; 5]) -> Self {
        let [year, month, day, hour, minute] = raw;

        Self {
            year: Self::expand_year(year),
            month,
            day,
            hour,
            minute,
        }
    }

    pub fn second(&self) -> u8 {
        0
    }

    /// Convert to a calendar date/time if the stored values form a valid one.
    pub fn to_civil(&self) -> Option<civil::DateTime> {
        let date = civil::Date::new(
            i16::try_from(self.year).ok()?,
            i8::try_from(self.month).ok()?,
            i8::try_from(self.day).ok()?,
        )
        .ok()?;
        let time = civil::Time::new(
            i8::try_from(self.hour).ok()?,
            i8::try_from(self.minute).ok()?,
            0,
            0,
        )
        .ok()?;

        Some(date.to_datetime(time))
    }
}

impl fmt::Display for GeosTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} at {:02}:{:02}:{:02}",
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second(),
        )
    }
}

/// Everything reported about a container.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CvtMetadata {
    pub vendor: ContainerVendor,
    pub version: ContainerVersion,
    /// CBM DOS file type the container presents as. Normally `PRG` or `SEQ`.
    pub format: String,
    pub payload: PayloadKind,
    /// Native GEOS file name, which is unrelated to the host file name.
    pub file_name: String,
    /// Class signature associating the file with its application.
    pub file_class: String,
    pub file_type: GeosFileType,
    pub author: Option<String>,
    pub modified: GeosTimestamp,
    /// Size of the whole container in bytes.
    pub size: u64,
    pub infobox: Option<String>,
}

/// Check that a container of `size` bytes is plausible. This must pass before
/// any field is read.
pub fn check_size(size: u64) -> Result<()> {
    if size <= MIN_SIZE || size >= MAX_SIZE {
        return Err(Error::InvalidContainerSize { size });
    }

    Ok(())
}

fn fixed(data: &[u8], field: Field, range: Range<usize>) -> Result<&[u8]> {
    data.get(range.clone()).ok_or(Error::FieldOutOfBounds {
        field,
        offset: range.start,
        width: range.len(),
        size: data.len(),
    })
}

fn fixed_byte(data: &[u8], field: Field, offset: usize) -> Result<u8> {
    fixed(data, field, offset..offset + 1).map(|b| b[0])
}

/// Return the bytes from `offset` up to, but not including, the next
/// `terminator`. Reaching the end of the buffer first is an error.
fn sentinel_run(data: &[u8], field: Field, offset: usize, terminator: u8) -> Result<&[u8]> {
    let tail = data.get(offset..).unwrap_or_default();
    let len = tail
        .find_byte(terminator)
        .ok_or(Error::UnterminatedField { field, offset })?;

    Ok(&tail[..len])
}

fn sentinel_text(data: &[u8], field: Field, offset: usize) -> Result<String> {
    let raw = sentinel_run(data, field, offset, TERMINATOR)?;

    Ok(util::collapse_whitespace(&util::ascii(raw)))
}

/// Like [`sentinel_text`], but a blank field is reported as absent.
fn optional_sentinel_text(data: &[u8], field: Field, offset: usize) -> Result<Option<String>> {
    let text = sentinel_text(data, field, offset)?;

    Ok(Some(text).filter(|t| !t.is_empty()))
}

/// The name is a fixed-width field. Embedded NUL bytes do not end it early.
fn file_name(data: &[u8]) -> Result<String> {
    let raw = fixed(data, Field::FileName, FILE_NAME)?;

    Ok(util::trim_field(&util::ascii(raw)).to_owned())
}

fn timestamp(data: &[u8]) -> Result<GeosTimestamp> {
    let raw = fixed(data, Field::Timestamp, TIMESTAMP)?;
    let mut fields = [0u8; 5];
    fields.copy_from_slice(raw);

    Ok(GeosTimestamp::from_raw(fields))
}

fn infobox(data: &[u8]) -> Result<Option<String>> {
    if fixed_byte(data, Field::InfoboxPresent, INFOBOX)? == 0 {
        return Ok(None);
    }

    optional_sentinel_text(data, Field::Infobox, INFOBOX)
}

/// Decode the header of an in-memory CVT container.
pub fn decode(data: &[u8]) -> Result<CvtMetadata> {
    let size = data.len() as u64;
    check_size(size)?;

    Ok(CvtMetadata {
        vendor: ContainerVendor::from_magic(fixed(data, Field::VendorMagic, VENDOR_MAGIC)?),
        version: ContainerVersion::from_raw(fixed(data, Field::Version, VERSION)?),
        format: util::ascii(fixed(data, Field::Format, FORMAT)?),
        payload: PayloadKind::from_raw(fixed_byte(data, Field::PayloadKind, PAYLOAD_KIND)?),
        file_name: file_name(data)?,
        file_class: sentinel_text(data, Field::FileClass, FILE_CLASS)?,
        file_type: GeosFileType::from_raw(fixed_byte(data, Field::FileType, FILE_TYPE)?),
        author: optional_sentinel_text(data, Field::Author, AUTHOR)?,
        modified: timestamp(data)?,
        size,
        infobox: infobox(data)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeSet;

    use super::*;

    /// Build a 512-byte Blaster's Convert container for an application.
    pub(crate) fn sample_container() -> Vec<u8> {
        let mut data = vec![0u8; 512];

        data[FILE_NAME].copy_from_slice(b"TESTFILE        ");
        data[PAYLOAD_KIND] = 0x01;
        data[FILE_TYPE] = 0x06;
        data[TIMESTAMP].copy_from_slice(&[23, 5, 10, 14, 30]);
        data[FORMAT].copy_from_slice(b"PRG");
        data[VENDOR_MAGIC].copy_from_slice(BLASTERS_CONVERT_MAGIC);
        data[VERSION].copy_from_slice(b"V3.0");

        data
    }

    fn put_text(data: &mut [u8], offset: usize, text: &[u8]) {
        data[offset..offset + text.len()].copy_from_slice(text);
        data[offset + text.len()] = TERMINATOR;
    }

    #[test]
    fn size_gate_bounds() {
        assert_eq!(
            check_size(256),
            Err(Error::InvalidContainerSize { size: 256 })
        );
        assert!(check_size(257).is_ok());
        assert!(check_size(8_388_607).is_ok());
        assert_eq!(
            check_size(8_388_608),
            Err(Error::InvalidContainerSize { size: 8_388_608 })
        );
        assert!(check_size(0).is_err());
    }

    #[test]
    fn size_gate_runs_before_fields() {
        // Would otherwise be a perfectly good header.
        let mut data = sample_container();
        data.truncate(256);

        assert_eq!(
            decode(&data),
            Err(Error::InvalidContainerSize { size: 256 })
        );
    }

    #[test]
    fn decode_sample() {
        let metadata = decode(&sample_container()).unwrap();

        assert_eq!(metadata.vendor, ContainerVendor::BlastersConvert);
        assert_eq!(metadata.version, ContainerVersion::Version("3.0".into()));
        assert_eq!(metadata.format, "PRG");
        assert_eq!(metadata.payload, PayloadKind::GeosVlir);
        assert_eq!(metadata.file_name, "TESTFILE");
        assert_eq!(metadata.file_class, "");
        assert_eq!(metadata.file_type, GeosFileType::Application);
        assert_eq!(metadata.author, None);
        assert_eq!(
            metadata.modified,
            GeosTimestamp {
                year: 2023,
                month: 5,
                day: 10,
                hour: 14,
                minute: 30,
            }
        );
        assert_eq!(metadata.modified.to_string(), "2023-05-10 at 14:30:00");
        assert_eq!(metadata.size, 512);
        assert_eq!(metadata.infobox, None);
    }

    #[test]
    fn payload_kind_branches() {
        let mut data = sample_container();

        for (raw, expected) in [
            (0x00, PayloadKind::GeosSeq),
            (0x01, PayloadKind::GeosVlir),
            (0x02, PayloadKind::NotGeos(0x02)),
            (0xff, PayloadKind::NotGeos(0xff)),
        ] {
            data[PAYLOAD_KIND] = raw;
            let payload = decode(&data).unwrap().payload;
            assert_eq!(payload, expected);
            assert_eq!(payload.to_raw(), raw);
        }

        assert_eq!(PayloadKind::NotGeos(7).to_string(), "NOT GEOS");
    }

    #[test]
    fn file_type_is_total() {
        let mut names = BTreeSet::new();

        for raw in 0..=u8::MAX {
            let file_type = GeosFileType::from_raw(raw);
            assert_eq!(file_type.to_raw(), raw);

            if raw < 0x10 {
                assert!(!matches!(file_type, GeosFileType::Unknown(_)), "{raw:#x}");
                names.insert(file_type.to_string());
            } else {
                assert_eq!(file_type, GeosFileType::Unknown(raw));
                assert_eq!(file_type.to_string(), "UNKNOWN");
            }
        }

        assert_eq!(names.len(), 16);
        assert!(!names.contains("UNKNOWN"));
        assert_eq!(GeosFileType::from_raw(0xf).to_string(), "Commodore 128 Input Driver");
    }

    #[test]
    fn vendor_requires_exact_magic() {
        let mut data = sample_container();

        for i in VENDOR_MAGIC {
            let original = data[i];
            data[i] = original.wrapping_add(1);
            assert_eq!(decode(&data).unwrap().vendor, ContainerVendor::Unknown, "{i:#x}");
            data[i] = original;
        }

        data[VENDOR_MAGIC].copy_from_slice(b"blaster's converter");
        assert_eq!(decode(&data).unwrap().vendor, ContainerVendor::Unknown);
    }

    #[test]
    fn version_window() {
        assert_eq!(
            ContainerVersion::from_raw(b"V2.5"),
            ContainerVersion::Version("2.5".into())
        );
        assert_eq!(ContainerVersion::from_raw(b"2.50"), ContainerVersion::Unknown);
        assert_eq!(ContainerVersion::from_raw(b"    "), ContainerVersion::Unknown);
        assert_eq!(ContainerVersion::from_raw(b"v2.5"), ContainerVersion::Unknown);
        assert_eq!(ContainerVersion::Unknown.to_string(), "Unknown");
    }

    #[test]
    fn year_expansion_boundary() {
        assert_eq!(GeosTimestamp::expand_year(86), 1986);
        assert_eq!(GeosTimestamp::expand_year(85), 2085);
        assert_eq!(GeosTimestamp::expand_year(0), 2000);
        assert_eq!(GeosTimestamp::expand_year(99), 1999);
    }

    #[test]
    fn invalid_calendar_values_pass_through() {
        let mut data = sample_container();
        data[TIMESTAMP].copy_from_slice(&[87, 13, 40, 25, 61]);

        let modified = decode(&data).unwrap().modified;
        assert_eq!(modified.to_string(), "1987-13-40 at 25:61:00");
        assert_eq!(modified.to_civil(), None);
    }

    #[test]
    fn valid_calendar_values_convert() {
        let modified = GeosTimestamp::from_raw([88, 2, 29, 23, 59]);

        assert_eq!(
            modified.to_civil(),
            Some(civil::date(1988, 2, 29).at(23, 59, 0, 0))
        );
    }

    #[test]
    fn sentinel_fields_are_normalized() {
        let mut data = sample_container();
        // Fits in front of the author slot, terminator included.
        put_text(&mut data, FILE_CLASS, b" geoWrite \t  V2.1 ");
        put_text(&mut data, AUTHOR, b"Berkeley\r\nSoftworks");

        let metadata = decode(&data).unwrap();
        assert_eq!(metadata.file_class, "geoWrite V2.1");
        assert_eq!(metadata.author.as_deref(), Some("Berkeley Softworks"));
    }

    #[test]
    fn blank_author_is_absent() {
        let mut data = sample_container();
        put_text(&mut data, AUTHOR, b"   ");

        assert_eq!(decode(&data).unwrap().author, None);
    }

    #[test]
    fn unterminated_field() {
        let mut data = sample_container();
        data[FILE_CLASS..].fill(b'A');

        assert_eq!(
            decode(&data),
            Err(Error::UnterminatedField {
                field: Field::FileClass,
                offset: FILE_CLASS,
            })
        );
    }

    #[test]
    fn sentinel_start_past_end() {
        let mut data = sample_container();
        data.truncate(300);

        assert_eq!(
            decode(&data),
            Err(Error::UnterminatedField {
                field: Field::FileClass,
                offset: FILE_CLASS,
            })
        );
    }

    #[test]
    fn infobox_flag_past_end() {
        let mut data = sample_container();
        data.truncate(400);

        assert_eq!(
            decode(&data),
            Err(Error::FieldOutOfBounds {
                field: Field::InfoboxPresent,
                offset: INFOBOX,
                width: 1,
                size: 400,
            })
        );
    }

    #[test]
    fn absent_infobox_is_not_scanned() {
        // No terminator anywhere after the flag, which would fail a scan.
        let mut data = sample_container();
        data[INFOBOX + 1..].fill(b'X');

        assert_eq!(decode(&data).unwrap().infobox, None);
    }

    #[test]
    fn present_infobox() {
        let mut data = sample_container();
        put_text(&mut data, INFOBOX, b"Word processor   for GEOS");

        assert_eq!(
            decode(&data).unwrap().infobox.as_deref(),
            Some("Word processor for GEOS")
        );
    }

    #[test]
    fn infobox_flag_is_first_character() {
        let mut data = sample_container();
        data[INFOBOX] = 0x01;
        put_text(&mut data, INFOBOX + 1, b"Hello");

        assert_eq!(decode(&data).unwrap().infobox.as_deref(), Some("\u{1}Hello"));
    }

    #[test]
    fn present_infobox_unterminated() {
        let mut data = sample_container();
        data[INFOBOX..].fill(b'X');

        assert_eq!(
            decode(&data),
            Err(Error::UnterminatedField {
                field: Field::Infobox,
                offset: INFOBOX,
            })
        );
    }

    #[test]
    fn file_name_is_fixed_width() {
        let mut data = sample_container();
        data[FILE_NAME].copy_from_slice(b"  AB\0CD         ");
        // Would be picked up if the name were allowed to run on.
        data[FILE_NAME.end] = b'Z';

        assert_eq!(decode(&data).unwrap().file_name, "AB\0CD");
    }

    #[test]
    fn format_is_verbatim() {
        let mut data = sample_container();
        data[FORMAT].copy_from_slice(b"SEQ");
        assert_eq!(decode(&data).unwrap().format, "SEQ");

        data[FORMAT].copy_from_slice(b"U  ");
        assert_eq!(decode(&data).unwrap().format, "U  ");
    }
}
