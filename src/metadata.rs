// SPDX-FileCopyrightText: 2024 Andrew Gunnerson
// SPDX-License-Identifier: GPL-3.0-only

use anyhow::{Context, Result};
use jiff::civil;
use serde::{Deserialize, Serialize};

use crate::cvt::CvtMetadata;

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ContainerInfo {
    /// Program that created the container.
    pub vendor: String,

    /// Container version. Missing if the version string is not recognized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// CBM DOS file type the container presents as.
    pub format: String,

    /// Record structure of the GEOS payload.
    pub payload: String,

    /// Raw payload structure byte.
    pub payload_code: u8,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct FileInfo {
    /// Native GEOS file name.
    pub name: String,

    /// Class signature.
    pub class: String,

    /// GEOS file type.
    #[serde(rename = "type")]
    pub file_type: String,

    /// Raw GEOS file type byte.
    pub type_code: u8,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    /// Modification time exactly as stored, even if it is not a real date.
    pub modified: String,

    /// Modification time, if it is a valid date and time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_iso: Option<civil::DateTime>,

    /// Container size in bytes.
    pub size: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infobox: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct CvtInfo {
    pub container: ContainerInfo,
    pub file: FileInfo,
}

impl From<&CvtMetadata> for CvtInfo {
    fn from(metadata: &CvtMetadata) -> Self {
        Self {
            container: ContainerInfo {
                vendor: metadata.vendor.to_string(),
                version: metadata.version.as_str().map(str::to_owned),
                format: metadata.format.clone(),
                payload: metadata.payload.to_string(),
                payload_code: metadata.payload.to_raw(),
            },
            file: FileInfo {
                name: metadata.file_name.clone(),
                class: metadata.file_class.clone(),
                file_type: metadata.file_type.to_string(),
                type_code: metadata.file_type.to_raw(),
                author: metadata.author.clone(),
                modified: metadata.modified.to_string(),
                modified_iso: metadata.modified.to_civil(),
                size: metadata.size,
                infobox: metadata.infobox.clone(),
            },
        }
    }
}

pub fn to_string(info: &CvtInfo) -> Result<String> {
    toml_edit::ser::to_string_pretty(info).context("Failed to serialize metadata TOML")
}
