/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FtpFileFactsParseError {
    #[error("no space delimiter")]
    NoSpaceDelimiter,
    #[error("no delimiter in fact ({0})")]
    NoDelimiterInFact(String),
    #[error("invalid modify time: {0}")]
    InvalidModifyTime(chrono::ParseError),
    #[error("invalid size")]
    InvalidSize,
}
