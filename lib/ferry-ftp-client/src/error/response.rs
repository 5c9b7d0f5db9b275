/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Failure to read one reply from the control connection.
#[derive(Debug, Error)]
pub enum FtpRawResponseError {
    #[error("control connection read failed: {0}")]
    ReadFailed(io::Error),
    #[error("control connection closed by server")]
    ConnectionClosed,
    #[error("reply line exceeds {0} bytes")]
    LineTooLong(usize),
    #[error("malformed reply line '{0}'")]
    InvalidLineFormat(String),
    #[error("reply code {0} out of range 100..=599")]
    InvalidReplyCode(u16),
    #[error("reply line is not valid utf-8")]
    LineIsNotUtf8,
    #[error("multi-line reply exceeds {0} lines")]
    TooManyLines(usize),
    #[error("no reply for '{0}' within {1:?}")]
    ReadResponseTimedOut(&'static str, Duration),
}

impl FtpRawResponseError {
    pub(crate) fn invalid_line(line: &[u8]) -> Self {
        let line = String::from_utf8_lossy(line);
        FtpRawResponseError::InvalidLineFormat(line.trim_end().to_string())
    }
}
