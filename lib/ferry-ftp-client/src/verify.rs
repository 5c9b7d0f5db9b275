/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use async_trait::async_trait;
use bitflags::bitflags;
use log::{debug, info, warn};

use crate::config::FtpClientConfig;
use crate::error::{FtpCommandError, FtpTransferError};
use crate::hash::FtpHash;
use crate::progress::FtpProgressSink;
use crate::transfer::{FtpRemoteExists, FtpStatus, TransferJob};

bitflags! {
    /// What to do when checking a transferred file.
    ///
    /// Any flag enables verification, an empty set disables it.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FtpVerify: u8 {
        /// retry the transfer, with overwrite, on mismatch
        const RETRY = 1 << 0;
        /// delete the destination if it is still unverified at the end
        const DELETE = 1 << 1;
        /// fail with an error if it is still unverified at the end
        const THROW = 1 << 2;
        /// never fall back to size comparison
        const ONLY_CHECKSUM = 1 << 3;
    }
}

impl FtpVerify {
    pub const NONE: FtpVerify = FtpVerify::empty();

    pub fn parse(s: &str) -> Option<Self> {
        let mut v = FtpVerify::NONE;
        for item in s.split([',', '|', '+']).map(str::trim).filter(|s| !s.is_empty()) {
            v |= match item.to_ascii_lowercase().as_str() {
                "none" => FtpVerify::NONE,
                "retry" => FtpVerify::RETRY,
                "delete" => FtpVerify::DELETE,
                "throw" => FtpVerify::THROW,
                "only_checksum" | "onlychecksum" | "checksum" => FtpVerify::ONLY_CHECKSUM,
                _ => return None,
            };
        }
        Some(v)
    }

    #[inline]
    pub fn is_requested(&self) -> bool {
        !self.is_empty()
    }
}

/// One kind of single file transfer, driven by [`run_verified`].
#[async_trait]
pub(crate) trait VerifiedTransfer: Send {
    fn config(&self) -> &FtpClientConfig;

    /// Run the transfer state machine once.
    async fn attempt(
        &mut self,
        job: &mut TransferJob,
        progress: FtpProgressSink<'_>,
    ) -> Result<FtpStatus, FtpTransferError>;

    /// Compare source and destination, `true` if they are equal.
    async fn verify(&mut self, job: &TransferJob) -> Result<bool, FtpTransferError>;

    async fn delete_destination(&mut self, job: &TransferJob) -> Result<(), FtpTransferError>;
}

/// The retry and verification loop shared by every single file transfer.
pub(crate) async fn run_verified<T>(
    transfer: &mut T,
    mut job: TransferJob,
    mut progress: FtpProgressSink<'_>,
) -> Result<FtpStatus, FtpTransferError>
where
    T: VerifiedTransfer,
{
    job.attempts_left = transfer
        .config()
        .verify_attempts(job.verify.contains(FtpVerify::RETRY));

    let mut transferred;
    let mut verified = true;
    loop {
        let status = transfer.attempt(&mut job, progress.reborrow()).await?;
        job.attempts_left = job.attempts_left.saturating_sub(1);
        if status == FtpStatus::Skipped {
            return Ok(FtpStatus::Skipped);
        }
        transferred = status == FtpStatus::Success;

        if transferred && job.verify.is_requested() {
            verified = transfer.verify(&job).await?;
            info!(
                "file verification of {}: {}",
                job.dest_path,
                if verified { "PASS" } else { "FAIL" }
            );
            if !verified && job.attempts_left > 0 {
                debug!(
                    "retry {} with overwrite, {} attempts left",
                    job.dest_path, job.attempts_left
                );
                job.exists = FtpRemoteExists::Overwrite;
            }
        }
        if verified || job.attempts_left == 0 {
            break;
        }
    }

    if transferred && !verified {
        if job.verify.contains(FtpVerify::DELETE) {
            transfer.delete_destination(&job).await?;
        }
        if job.verify.contains(FtpVerify::THROW) {
            return Err(FtpTransferError::VerificationFailed(job.dest_path));
        }
    }

    if transferred && verified {
        Ok(FtpStatus::Success)
    } else {
        Ok(FtpStatus::Failed)
    }
}

/// A checksum the server refused or garbled counts as a mismatch.
pub(crate) fn usable_hash(
    r: Result<FtpHash, FtpTransferError>,
) -> Result<Option<FtpHash>, FtpTransferError> {
    match r {
        Ok(hash) => Ok(Some(hash)),
        Err(
            e @ (FtpTransferError::CommandRejected(..)
            | FtpTransferError::HashUnsupported(_)
            | FtpTransferError::CommandFailed(
                FtpCommandError::InvalidReplySyntax(..) | FtpCommandError::UnexpectedReply(..),
            )),
        ) => {
            warn!("unable to get checksum: {e}");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
