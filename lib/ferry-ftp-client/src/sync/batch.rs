/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::Path;

use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use super::{
    DownloadDirection, FtpResult, FtpResultOutcome, FtpSyncOptions, SyncDirection,
    UploadDirection, check_cancel, check_connected,
};
use crate::error::FtpTransferError;
use crate::path;
use crate::progress::{FtpProgressMeta, FtpProgressSink};
use crate::session::FtpSession;
use crate::transfer::FtpListItem;

struct BatchFile {
    item: FtpListItem,
    source_path: String,
}

/// Copy every file of `files` into `dest_dir`, keeping its file name.
///
/// A file the rules exclude is skipped. A file without a usable name is
/// recorded as failed.
async fn transfer_batch<D>(
    direction: &mut D,
    files: Vec<BatchFile>,
    dest_dir: &str,
    options: &FtpSyncOptions,
    mut progress: FtpProgressSink<'_>,
    cancel: &CancellationToken,
) -> Result<Vec<FtpResult>, FtpTransferError>
where
    D: SyncDirection,
{
    if dest_dir.trim().is_empty() {
        return Err(FtpTransferError::InvalidArgument("destination directory"));
    }
    let dest_dir = path::normalize_dir(dest_dir);
    check_cancel(cancel)?;

    let mut check_existence = true;
    if !direction.dest_dir_exists(&dest_dir).await? {
        direction.create_dest_dir(&dest_dir).await?;
        check_existence = false;
    }

    let file_count = files.len();
    let mut results = Vec::with_capacity(file_count);
    for file in &files {
        let name = path::file_name(&file.item.path);
        results.push(FtpResult::new(
            &file.item,
            file.source_path.clone(),
            path::join(&dest_dir, name),
        ));
    }
    debug!("transfer {file_count} files into {dest_dir}");

    for (n, (file, result)) in files.iter().zip(results.iter_mut()).enumerate() {
        if cancel.is_cancelled() {
            warn!("transfer of files into {dest_dir} cancelled");
            break;
        }
        if result.name().is_empty() {
            result.set_outcome(FtpResultOutcome::Failed(Some(
                FtpTransferError::InvalidArgument("source path"),
            )));
            continue;
        }
        if !options.passes_rules(&file.item) {
            info!("skip {} due to rule", result.source_path);
            result.set_outcome(FtpResultOutcome::Skipped { by_rule: true });
            continue;
        }
        let policy = if check_existence {
            options.exists
        } else {
            options.exists.to_no_check()
        };

        progress.set_meta(FtpProgressMeta::new(n, file_count));
        match direction
            .transfer_file(
                &result.source_path,
                &result.dest_path,
                policy,
                options.verify,
                progress.reborrow(),
            )
            .await
        {
            Ok(status) => result.set_status(status),
            Err(e) => {
                warn!("failed to transfer {}: {e}", result.source_path);
                result.set_outcome(FtpResultOutcome::Failed(Some(e)));
            }
        }
    }

    Ok(results)
}

/// Upload local files into one remote directory, created if missing.
///
/// The mode of `options` does not apply. Per file failures are recorded in
/// the returned rows, and if `cancel` fires the files not reached yet are
/// left unset.
pub async fn upload_files<S, P>(
    session: &mut S,
    local_paths: &[P],
    remote_dir: &str,
    options: &FtpSyncOptions,
    progress: FtpProgressSink<'_>,
    cancel: &CancellationToken,
) -> Result<Vec<FtpResult>, FtpTransferError>
where
    S: FtpSession,
    P: AsRef<Path>,
{
    check_connected(session, "session")?;
    let mut files = Vec::with_capacity(local_paths.len());
    for p in local_paths {
        let p = p.as_ref();
        let name = p
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let size = tokio::fs::metadata(p).await.ok().map(|m| m.len());
        files.push(BatchFile {
            item: FtpListItem::file(&name, size),
            source_path: p.to_string_lossy().to_string(),
        });
    }

    let mut direction = UploadDirection::new(session);
    transfer_batch(&mut direction, files, remote_dir, options, progress, cancel).await
}

/// Download remote files into one local directory, created if missing.
///
/// Only the skip, overwrite and resume policies apply to local files.
pub async fn download_files<S, P>(
    session: &mut S,
    remote_paths: &[P],
    local_dir: &Path,
    options: &FtpSyncOptions,
    progress: FtpProgressSink<'_>,
    cancel: &CancellationToken,
) -> Result<Vec<FtpResult>, FtpTransferError>
where
    S: FtpSession,
    P: AsRef<str>,
{
    check_connected(session, "session")?;
    if options.exists.appends() && !options.exists.is_resume() {
        return Err(FtpTransferError::UnsupportedExistsPolicy(options.exists));
    }
    let files = remote_paths
        .iter()
        .map(|p| {
            let p = p.as_ref();
            BatchFile {
                item: FtpListItem::file(path::file_name(p), None),
                source_path: p.to_string(),
            }
        })
        .collect();

    let local_dir = local_dir.to_string_lossy();
    let mut direction = DownloadDirection::new(session);
    transfer_batch(&mut direction, files, &local_dir, options, progress, cancel).await
}
