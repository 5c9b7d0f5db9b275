/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::pin::pin;

use async_trait::async_trait;
use log::{debug, info};
use tokio::time::{Instant, MissedTickBehavior};

use super::{
    FtpRemoteExists, FtpStatus, TransferJob, drain_final_reply, resolve_remote_offset,
    wait_final_reply,
};
use crate::config::FtpClientConfig;
use crate::control::{FtpCommand, FtpReply};
use crate::error::FtpTransferError;
use crate::fxp::FtpFxpSession;
use crate::hash::{checksum, first_mutual_algorithm};
use crate::path;
use crate::progress::FtpProgressSink;
use crate::session::{FtpSession, FtpSessionExt};
use crate::verify::{FtpVerify, VerifiedTransfer, run_verified, usable_hash};

async fn execute_expect_success<S: FtpSession>(
    session: &mut S,
    cmd: FtpCommand,
    param: &str,
) -> Result<FtpReply, FtpTransferError> {
    let reply = session.execute(&cmd.line_with(param)).await?;
    if reply.is_success() {
        Ok(reply)
    } else {
        Err(FtpTransferError::CommandRejected(cmd.name(), reply))
    }
}

/// A server to server copy, one attempt per call to `attempt`.
pub(crate) struct FxpTransfer<'a, S, D> {
    source: &'a mut S,
    target: &'a mut D,
}

impl<'a, S, D> FxpTransfer<'a, S, D>
where
    S: FtpSession,
    D: FtpSession,
{
    pub(crate) fn new(source: &'a mut S, target: &'a mut D) -> Self {
        FxpTransfer { source, target }
    }
}

async fn run_fxp<S, D>(
    fxp: &mut FtpFxpSession<'_, S, D>,
    job: &TransferJob,
    file_size: Option<u64>,
    mut progress: FtpProgressSink<'_>,
) -> Result<(), FtpTransferError>
where
    S: FtpSession,
    D: FtpSession,
{
    let source_path = job.source_path.as_str();
    let dest_path = job.dest_path.as_str();

    let store_cmd = if job.offset == 0 && !job.exists.appends() {
        FtpCommand::STOR
    } else {
        execute_expect_success(fxp.source(), FtpCommand::REST, &job.offset.to_string()).await?;
        FtpCommand::APPE
    };
    let retr_reply = execute_expect_success(fxp.source(), FtpCommand::RETR, source_path).await?;
    if let Err(e) = execute_expect_success(fxp.target(), store_cmd, dest_path).await {
        if retr_reply.is_positive_preliminary() {
            drain_final_reply(fxp.source()).await;
        }
        return Err(e);
    }

    let config = fxp.source().state().config().fxp.clone();
    let started = Instant::now();
    let (source, target, mut observer) = fxp.parts();
    let mut source_final: Option<FtpReply> = None;
    let mut target_final: Option<FtpReply> = None;

    let poll = async {
        let mut source_fut = pin!(wait_final_reply(&mut *source));
        let mut target_fut = pin!(wait_final_reply(&mut *target));

        let period = config.progress_interval;
        let mut interval = tokio::time::interval_at(started + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_size = job.offset;

        loop {
            tokio::select! {
                r = &mut source_fut, if source_final.is_none() => {
                    source_final = Some(r?);
                }
                r = &mut target_fut, if target_final.is_none() => {
                    target_final = Some(r?);
                }
                _ = interval.tick() => {
                    let Some(observer) = observer.as_mut() else {
                        continue;
                    };
                    match observer.file_size(dest_path).await {
                        Ok(Some(size)) if size > last_size => {
                            last_size = size;
                            progress.report_sample(
                                file_size.map(|n| n.saturating_sub(job.offset)),
                                size - job.offset,
                                started.elapsed(),
                                source_path,
                                dest_path,
                            );
                        }
                        Ok(_) => {}
                        Err(e) => debug!("progress poll of {dest_path} failed: {e}"),
                    }
                }
            }

            if let (Some(s), Some(t)) = (&source_final, &target_final) {
                return Ok::<_, FtpTransferError>((s.clone(), t.clone()));
            }
        }
    };

    let polled = match tokio::time::timeout(config.transfer_timeout, poll).await {
        Ok(r) => r,
        Err(_) => Err(FtpTransferError::TimedOut("FXP transfer")),
    };
    let (source_reply, target_reply) = match polled {
        Ok(replies) => replies,
        Err(e) => {
            if source_final.is_none() {
                drain_final_reply(source).await;
            }
            if target_final.is_none() {
                drain_final_reply(target).await;
            }
            return Err(e);
        }
    };
    if !source_reply.is_positive_completion() {
        return Err(FtpTransferError::CommandRejected(
            FtpCommand::RETR.name(),
            source_reply,
        ));
    }
    if !target_reply.is_positive_completion() {
        return Err(FtpTransferError::CommandRejected(
            store_cmd.name(),
            target_reply,
        ));
    }
    Ok(())
}

#[async_trait]
impl<S, D> VerifiedTransfer for FxpTransfer<'_, S, D>
where
    S: FtpSession,
    D: FtpSession,
{
    fn config(&self) -> &FtpClientConfig {
        self.source.state().config()
    }

    async fn attempt(
        &mut self,
        job: &mut TransferJob,
        mut progress: FtpProgressSink<'_>,
    ) -> Result<FtpStatus, FtpTransferError> {
        let Some((offset, exists)) = resolve_remote_offset(&mut *self.target, job).await? else {
            info!(
                "skip {} as it already exists on {}",
                job.dest_path,
                self.target.state().server()
            );
            progress.report_completed(&job.source_path, &job.dest_path);
            return Ok(FtpStatus::Skipped);
        };
        job.offset = offset;

        let file_size = self.source.file_size(&job.source_path).await?;
        if job.create_dest_dir && !exists {
            if let Some(dir) = path::parent(&job.dest_path) {
                self.target.create_directory(dir).await?;
            }
        }

        let track = progress.is_enabled() && file_size.is_some();
        let mut fxp = FtpFxpSession::open(&mut *self.source, &mut *self.target, track).await?;
        let r = run_fxp(&mut fxp, job, file_size, progress).await;
        fxp.dispose().await;
        r?;

        info!(
            "FXP transfer of {} to {}{} has completed",
            job.source_path,
            self.target.state().server(),
            job.dest_path
        );
        self.source.noop().await?;
        self.target.noop().await?;
        Ok(FtpStatus::Success)
    }

    async fn verify(&mut self, job: &TransferJob) -> Result<bool, FtpTransferError> {
        let Some(algorithm) = first_mutual_algorithm(
            self.source.state().feature(),
            self.target.state().feature(),
        ) else {
            info!("source and target have no common hash algorithm, skip verification");
            return Ok(true);
        };

        if !job.verify.contains(FtpVerify::ONLY_CHECKSUM) {
            let source_size = self.source.file_size(&job.source_path).await?;
            let target_size = self.target.file_size(&job.dest_path).await?;
            if source_size != target_size {
                debug!("size mismatch: {source_size:?} != {target_size:?}");
                return Ok(false);
            }
        }

        let Some(source_hash) =
            usable_hash(checksum(&mut *self.source, &job.source_path, algorithm).await)?
        else {
            return Ok(false);
        };
        let Some(target_hash) =
            usable_hash(checksum(&mut *self.target, &job.dest_path, algorithm).await)?
        else {
            return Ok(false);
        };
        Ok(source_hash.matches(&target_hash))
    }

    async fn delete_destination(&mut self, job: &TransferJob) -> Result<(), FtpTransferError> {
        self.target.delete_file(&job.dest_path).await
    }
}

/// Copy `source_path` on `source` to `dest_path` on `target` with FXP.
///
/// Returns [`FtpStatus::Failed`] only for a verification failure that is
/// neither retried into success nor configured to raise an error.
#[allow(clippy::too_many_arguments)]
pub async fn transfer_file<S, D>(
    source: &mut S,
    source_path: &str,
    target: &mut D,
    dest_path: &str,
    create_dest_dir: bool,
    exists: FtpRemoteExists,
    verify: FtpVerify,
    progress: FtpProgressSink<'_>,
) -> Result<FtpStatus, FtpTransferError>
where
    S: FtpSession,
    D: FtpSession,
{
    let mut job = TransferJob::new(source_path, dest_path, exists, verify);
    job.create_dest_dir = create_dest_dir;
    job.check_paths()?;
    if !source.is_connected() {
        return Err(FtpTransferError::NotConnected("source"));
    }
    if !target.is_connected() {
        return Err(FtpTransferError::NotConnected("target"));
    }
    if !source.file_exists(source_path).await? {
        return Err(FtpTransferError::SourceNotFound(source_path.to_string()));
    }

    let mut transfer = FxpTransfer::new(source, target);
    run_verified(&mut transfer, job, progress).await
}
