/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io::{self, Write};

use ferry_ftp_client::{FtpProgress, FtpProgressReceiver};

/// Print progress samples on one refreshed stderr line.
#[derive(Default)]
pub(crate) struct StderrProgress {
    printed: bool,
}

impl FtpProgressReceiver for StderrProgress {
    fn report(&mut self, p: &FtpProgress) {
        let mut stderr = io::stderr().lock();
        let percent = if p.progress() < 0.0 {
            "?".to_string()
        } else {
            format!("{:.1}%", p.progress())
        };
        let _ = write!(
            stderr,
            "\r[{}/{}] {} {percent} {} bytes {} eta {}s   ",
            p.file_index() + 1,
            p.file_count(),
            p.remote_path(),
            p.transferred_bytes(),
            p.transfer_speed_to_string(),
            p.eta().as_secs()
        );
        let _ = stderr.flush();
        self.printed = true;
    }
}

impl Drop for StderrProgress {
    fn drop(&mut self) {
        if self.printed {
            eprintln!();
        }
    }
}
