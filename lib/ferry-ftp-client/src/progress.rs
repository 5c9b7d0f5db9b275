/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::time::Duration;

/// Position of one file inside a multi file operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FtpProgressMeta {
    pub file_index: usize,
    pub file_count: usize,
}

impl FtpProgressMeta {
    pub fn new(file_index: usize, file_count: usize) -> Self {
        FtpProgressMeta {
            file_index,
            file_count,
        }
    }

    pub fn single() -> Self {
        FtpProgressMeta::new(0, 1)
    }
}

/// One progress sample of a single file transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct FtpProgress {
    progress: f64,
    transferred_bytes: u64,
    transfer_speed: f64,
    eta: Duration,
    local_path: String,
    remote_path: String,
    meta: FtpProgressMeta,
}

impl FtpProgress {
    /// Build a sample from raw counters.
    ///
    /// `progress` is -1 when the total size is unknown, the speed is in bytes
    /// per second.
    pub fn generate(
        file_size: Option<u64>,
        transferred_bytes: u64,
        elapsed: Duration,
        local_path: &str,
        remote_path: &str,
        meta: FtpProgressMeta,
    ) -> Self {
        let secs = elapsed.as_secs_f64();
        let transfer_speed = if secs > 0.0 {
            transferred_bytes as f64 / secs
        } else {
            0.0
        };

        let mut progress = -1.0;
        let mut eta = Duration::ZERO;
        if let Some(size) = file_size.filter(|s| *s > 0) {
            progress = transferred_bytes as f64 / size as f64 * 100.0;
            if transfer_speed > 0.0 {
                let left = size.saturating_sub(transferred_bytes) as f64 / transfer_speed;
                eta = Duration::try_from_secs_f64(left).unwrap_or(Duration::ZERO);
            }
        }
        if !progress.is_finite() {
            progress = -1.0;
        }

        FtpProgress {
            progress,
            transferred_bytes,
            transfer_speed,
            eta,
            local_path: local_path.to_string(),
            remote_path: remote_path.to_string(),
            meta,
        }
    }

    /// The sample reported for a file that needed no transfer.
    pub fn completed(local_path: &str, remote_path: &str, meta: FtpProgressMeta) -> Self {
        FtpProgress {
            progress: 100.0,
            transferred_bytes: 0,
            transfer_speed: 0.0,
            eta: Duration::ZERO,
            local_path: local_path.to_string(),
            remote_path: remote_path.to_string(),
            meta,
        }
    }

    #[inline]
    pub fn progress(&self) -> f64 {
        self.progress
    }

    #[inline]
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes
    }

    #[inline]
    pub fn transfer_speed(&self) -> f64 {
        self.transfer_speed
    }

    #[inline]
    pub fn eta(&self) -> Duration {
        self.eta
    }

    #[inline]
    pub fn local_path(&self) -> &str {
        &self.local_path
    }

    #[inline]
    pub fn remote_path(&self) -> &str {
        &self.remote_path
    }

    #[inline]
    pub fn file_index(&self) -> usize {
        self.meta.file_index
    }

    #[inline]
    pub fn file_count(&self) -> usize {
        self.meta.file_count
    }

    pub fn transfer_speed_to_string(&self) -> String {
        let kb = self.transfer_speed.max(0.0) / 1024.0;
        if kb < 1024.0 {
            format!("{kb:.2} KB/s")
        } else {
            format!("{:.2} MB/s", kb / 1024.0)
        }
    }
}

/// Anything that wants progress samples.
///
/// Called synchronously from the transfer loop, so it must return quickly.
pub trait FtpProgressReceiver: Send {
    fn report(&mut self, progress: &FtpProgress);
}

impl<F> FtpProgressReceiver for F
where
    F: FnMut(&FtpProgress) + Send,
{
    fn report(&mut self, progress: &FtpProgress) {
        self(progress)
    }
}

/// An optional receiver plus the meta info to stamp on every sample.
pub struct FtpProgressSink<'a> {
    receiver: Option<&'a mut dyn FtpProgressReceiver>,
    meta: FtpProgressMeta,
}

impl<'a> FtpProgressSink<'a> {
    pub fn new(receiver: &'a mut dyn FtpProgressReceiver, meta: FtpProgressMeta) -> Self {
        FtpProgressSink {
            receiver: Some(receiver),
            meta,
        }
    }

    pub fn none() -> Self {
        FtpProgressSink {
            receiver: None,
            meta: FtpProgressMeta::single(),
        }
    }

    pub fn from_option(
        receiver: Option<&'a mut dyn FtpProgressReceiver>,
        meta: FtpProgressMeta,
    ) -> Self {
        FtpProgressSink { receiver, meta }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.receiver.is_some()
    }

    #[inline]
    pub fn meta(&self) -> FtpProgressMeta {
        self.meta
    }

    pub(crate) fn set_meta(&mut self, meta: FtpProgressMeta) {
        self.meta = meta;
    }

    /// A shorter lived sink reporting to the same receiver.
    pub fn reborrow(&mut self) -> FtpProgressSink<'_> {
        let receiver = match &mut self.receiver {
            Some(r) => Some(&mut **r as &mut dyn FtpProgressReceiver),
            None => None,
        };
        FtpProgressSink {
            receiver,
            meta: self.meta,
        }
    }

    pub(crate) fn report(&mut self, progress: &FtpProgress) {
        if let Some(r) = &mut self.receiver {
            r.report(progress);
        }
    }

    pub(crate) fn report_sample(
        &mut self,
        file_size: Option<u64>,
        transferred_bytes: u64,
        elapsed: Duration,
        local_path: &str,
        remote_path: &str,
    ) {
        if self.receiver.is_some() {
            let p = FtpProgress::generate(
                file_size,
                transferred_bytes,
                elapsed,
                local_path,
                remote_path,
                self.meta,
            );
            self.report(&p);
        }
    }

    pub(crate) fn report_completed(&mut self, local_path: &str, remote_path: &str) {
        if self.receiver.is_some() {
            let p = FtpProgress::completed(local_path, remote_path, self.meta);
            self.report(&p);
        }
    }
}
