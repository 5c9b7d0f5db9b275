/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

use crate::transfer::FtpDataType;

#[cfg(feature = "yaml")]
mod yaml;

const DEFAULT_MAX_LINE_LEN: usize = 2048;
const DEFAULT_MAX_MULTI_LINES: usize = 128;
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpControlConfig {
    pub max_line_len: usize,
    pub max_multi_lines: usize,
    pub command_timeout: Duration,
}

impl Default for FtpControlConfig {
    fn default() -> Self {
        FtpControlConfig {
            max_line_len: DEFAULT_MAX_LINE_LEN,
            max_multi_lines: DEFAULT_MAX_MULTI_LINES,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

/// How the data channel of local transfers is set up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FtpDataConnectionType {
    /// EPSV first, then PASV / CPSV if the server refuses it
    #[default]
    AutoPassive,
    Pasv,
    Epsv,
    /// listen locally and announce with PORT
    Port,
    /// listen locally and announce with EPRT
    Eprt,
}

impl FtpDataConnectionType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" | "auto_passive" | "autopassive" => Some(FtpDataConnectionType::AutoPassive),
            "pasv" => Some(FtpDataConnectionType::Pasv),
            "epsv" => Some(FtpDataConnectionType::Epsv),
            "port" => Some(FtpDataConnectionType::Port),
            "eprt" => Some(FtpDataConnectionType::Eprt),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpTransferConfig {
    pub list_max_entries: usize,
    pub list_max_line_len: usize,
    pub end_wait_timeout: Duration,
    pub buffer_size: usize,
    pub data_connection_type: FtpDataConnectionType,
    pub upload_data_type: FtpDataType,
    pub download_data_type: FtpDataType,
}

impl Default for FtpTransferConfig {
    fn default() -> Self {
        FtpTransferConfig {
            list_max_entries: 65536,
            list_max_line_len: 2048,
            end_wait_timeout: Duration::from_secs(60),
            buffer_size: 64 * 1024,
            data_connection_type: FtpDataConnectionType::default(),
            upload_data_type: FtpDataType::Binary,
            download_data_type: FtpDataType::Binary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpFxpConfig {
    pub data_type: FtpDataType,
    /// interval between two SIZE polls on the progress session
    pub progress_interval: Duration,
    /// upper bound for both legs of one server to server copy
    pub transfer_timeout: Duration,
    /// use EPSV / EPRT instead of PASV / PORT
    pub use_epsv: bool,
}

impl Default for FtpFxpConfig {
    fn default() -> Self {
        FtpFxpConfig {
            data_type: FtpDataType::Binary,
            progress_interval: Duration::from_millis(1000),
            transfer_timeout: Duration::from_secs(30 * 60),
            use_epsv: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpClientConfig {
    pub control: FtpControlConfig,
    pub transfer: FtpTransferConfig,
    pub fxp: FtpFxpConfig,
    pub connect_timeout: Duration,
    pub greeting_timeout: Duration,
    pub retry_attempts: usize,
    /// open a dedicated cloned session for every data operation
    pub thread_safe_data_channels: bool,
}

impl Default for FtpClientConfig {
    fn default() -> Self {
        FtpClientConfig {
            control: Default::default(),
            transfer: Default::default(),
            fxp: Default::default(),
            connect_timeout: Duration::from_secs(30),
            greeting_timeout: Duration::from_secs(10),
            retry_attempts: 3,
            thread_safe_data_channels: false,
        }
    }
}

impl FtpClientConfig {
    pub(crate) fn verify_attempts(&self, retry: bool) -> usize {
        if retry { self.retry_attempts.max(1) } else { 1 }
    }
}
