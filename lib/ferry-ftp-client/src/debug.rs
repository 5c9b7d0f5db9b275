/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use log::Level;

pub const FTP_DEBUG_LOG_LEVEL: Level = Level::Debug;
pub const FTP_DEBUG_LOG_TARGET: &str = "ferry_ftp::raw";

#[cfg(feature = "log-raw-io")]
#[inline]
pub(crate) fn log_cmd(cmd: &str) {
    if cmd.get(..5).is_some_and(|p| p.eq_ignore_ascii_case("PASS ")) {
        log::log!(target: FTP_DEBUG_LOG_TARGET, FTP_DEBUG_LOG_LEVEL, "> PASS ***");
    } else {
        log::log!(target: FTP_DEBUG_LOG_TARGET, FTP_DEBUG_LOG_LEVEL, "> {cmd}");
    }
}

#[cfg(feature = "log-raw-io")]
#[inline]
pub(crate) fn log_rsp(rsp: &str) {
    log::log!(target: FTP_DEBUG_LOG_TARGET, FTP_DEBUG_LOG_LEVEL, "< {rsp}");
}
