/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::FtpFileFactsParseError;

mod entry_type;
mod time_val;

pub use entry_type::FtpFileEntryType;

/// One MLST / MLSD entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpFileFacts {
    entry_path: String,
    entry_type: FtpFileEntryType,
    size: Option<u64>,
    modify_time: Option<DateTime<Utc>>,
}

impl FtpFileFacts {
    fn new(path: &str) -> Self {
        FtpFileFacts {
            entry_path: path.to_string(),
            entry_type: FtpFileEntryType::Unknown,
            size: None,
            modify_time: None,
        }
    }

    #[inline]
    pub fn entry_path(&self) -> &str {
        self.entry_path.as_str()
    }

    #[inline]
    pub fn entry_type(&self) -> &FtpFileEntryType {
        &self.entry_type
    }

    #[inline]
    pub fn maybe_file(&self) -> bool {
        self.entry_type.maybe_file()
    }

    #[inline]
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    #[inline]
    pub fn mtime(&self) -> Option<&DateTime<Utc>> {
        self.modify_time.as_ref()
    }

    pub fn parse_line(line: &str) -> Result<Self, FtpFileFactsParseError> {
        let Some((facts, path)) = line.trim_start().split_once(' ') else {
            return Err(FtpFileFactsParseError::NoSpaceDelimiter);
        };

        let mut ff = FtpFileFacts::new(path);
        for fact in facts.split(';') {
            if fact.is_empty() {
                continue;
            }

            if let Some((key, value)) = fact.split_once('=') {
                ff.set_fact(key, value)?;
            } else {
                return Err(FtpFileFactsParseError::NoDelimiterInFact(fact.to_string()));
            }
        }
        Ok(ff)
    }

    fn set_fact(&mut self, key: &str, value: &str) -> Result<(), FtpFileFactsParseError> {
        match key.to_lowercase().as_str() {
            "type" => self.entry_type = FtpFileEntryType::parse(value),
            "modify" => {
                let dt = time_val::parse_from_str(value)
                    .map_err(FtpFileFactsParseError::InvalidModifyTime)?;
                self.modify_time = Some(dt);
            }
            "size" | "sizd" => {
                let size = u64::from_str(value).map_err(|_| FtpFileFactsParseError::InvalidSize)?;
                self.size = Some(size);
            }
            _ => {}
        }
        Ok(())
    }
}
