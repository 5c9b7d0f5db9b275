/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::collections::HashSet;
use std::path::Path;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::error::FtpTransferError;
use crate::path;
use crate::progress::{FtpProgressMeta, FtpProgressSink};
use crate::session::FtpSession;
use crate::transfer::{FtpListItem, FtpObjectType, FtpRemoteExists, FtpStatus};
use crate::verify::FtpVerify;

mod rule;
pub use rule::{COMMON_BLACKLISTED_FOLDERS, FtpRule, FtpRuleOperator};

mod direction;
pub use direction::{DownloadDirection, FxpDirection, UploadDirection};

mod batch;
pub use batch::{download_files, upload_files};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FtpFolderSyncMode {
    /// Delete destination files that are not in the source.
    Mirror,
    /// Leave extra destination files alone.
    #[default]
    Update,
}

impl FtpFolderSyncMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mirror" => Some(FtpFolderSyncMode::Mirror),
            "update" => Some(FtpFolderSyncMode::Update),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub enum FtpResultOutcome {
    /// never attempted
    #[default]
    Unset,
    Success,
    Skipped {
        by_rule: bool,
    },
    /// `None` if the transfer completed but could not be verified
    Failed(Option<FtpTransferError>),
}

/// One planned file or directory of a directory sync.
#[derive(Debug)]
pub struct FtpResult {
    kind: FtpObjectType,
    size: Option<u64>,
    name: String,
    source_path: String,
    dest_path: String,
    outcome: FtpResultOutcome,
}

impl FtpResult {
    fn new(item: &FtpListItem, source_path: String, dest_path: String) -> Self {
        FtpResult {
            kind: item.kind,
            size: item.size,
            name: path::file_name(&item.path).to_string(),
            source_path,
            dest_path,
            outcome: FtpResultOutcome::Unset,
        }
    }

    #[inline]
    pub fn kind(&self) -> FtpObjectType {
        self.kind
    }

    #[inline]
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    #[inline]
    pub fn dest_path(&self) -> &str {
        &self.dest_path
    }

    #[inline]
    pub fn outcome(&self) -> &FtpResultOutcome {
        &self.outcome
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, FtpResultOutcome::Success)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.outcome, FtpResultOutcome::Skipped { .. })
    }

    pub fn is_skipped_by_rule(&self) -> bool {
        matches!(self.outcome, FtpResultOutcome::Skipped { by_rule: true })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, FtpResultOutcome::Failed(_))
    }

    pub fn is_unset(&self) -> bool {
        matches!(self.outcome, FtpResultOutcome::Unset)
    }

    pub fn error(&self) -> Option<&FtpTransferError> {
        match &self.outcome {
            FtpResultOutcome::Failed(e) => e.as_ref(),
            _ => None,
        }
    }

    pub fn to_status(&self) -> Option<FtpStatus> {
        match self.outcome {
            FtpResultOutcome::Unset => None,
            FtpResultOutcome::Success => Some(FtpStatus::Success),
            FtpResultOutcome::Skipped { .. } => Some(FtpStatus::Skipped),
            FtpResultOutcome::Failed(_) => Some(FtpStatus::Failed),
        }
    }

    fn set_outcome(&mut self, outcome: FtpResultOutcome) {
        debug_assert!(self.is_unset(), "outcome of {} set twice", self.source_path);
        self.outcome = outcome;
    }

    fn set_status(&mut self, status: FtpStatus) {
        self.set_outcome(match status {
            FtpStatus::Success => FtpResultOutcome::Success,
            FtpStatus::Skipped => FtpResultOutcome::Skipped { by_rule: false },
            FtpStatus::Failed => FtpResultOutcome::Failed(None),
        });
    }
}

/// Per call options of a directory sync.
#[derive(Debug, Clone)]
pub struct FtpSyncOptions {
    pub mode: FtpFolderSyncMode,
    pub exists: FtpRemoteExists,
    pub verify: FtpVerify,
    pub rules: Vec<FtpRule>,
    /// In mirror mode, also delete destination files the rules exclude.
    pub delete_excluded: bool,
}

impl Default for FtpSyncOptions {
    fn default() -> Self {
        FtpSyncOptions {
            mode: FtpFolderSyncMode::Update,
            exists: FtpRemoteExists::Skip,
            verify: FtpVerify::NONE,
            rules: Vec::new(),
            delete_excluded: true,
        }
    }
}

impl FtpSyncOptions {
    fn passes_rules(&self, item: &FtpListItem) -> bool {
        FtpRule::is_all_allowed(&self.rules, item)
    }
}

/// The two ends of a directory sync.
///
/// All paths are `/` separated. Listings are relative to the given root.
#[async_trait]
pub trait SyncDirection: Send {
    async fn source_dir_exists(&mut self, dir: &str) -> Result<bool, FtpTransferError>;

    async fn list_source(&mut self, root: &str) -> Result<Vec<FtpListItem>, FtpTransferError>;

    async fn dest_dir_exists(&mut self, dir: &str) -> Result<bool, FtpTransferError>;

    /// Returns `false` if the directory was already there.
    async fn create_dest_dir(&mut self, dir: &str) -> Result<bool, FtpTransferError>;

    async fn list_dest(&mut self, root: &str) -> Result<Vec<FtpListItem>, FtpTransferError>;

    async fn delete_dest_file(&mut self, file: &str) -> Result<(), FtpTransferError>;

    async fn transfer_file(
        &mut self,
        source: &str,
        dest: &str,
        exists: FtpRemoteExists,
        verify: FtpVerify,
        progress: FtpProgressSink<'_>,
    ) -> Result<FtpStatus, FtpTransferError>;
}

fn check_cancel(cancel: &CancellationToken) -> Result<(), FtpTransferError> {
    if cancel.is_cancelled() {
        Err(FtpTransferError::Cancelled)
    } else {
        Ok(())
    }
}

/// Make the tree below `dest_root` match the one below `source_root`.
///
/// Per item failures are recorded in the returned rows. Only failing to
/// enumerate the source or to prepare the destination root is an error.
/// If `cancel` fires, the rows not reached yet are left unset.
pub async fn sync_directory<D>(
    direction: &mut D,
    source_root: &str,
    dest_root: &str,
    options: &FtpSyncOptions,
    mut progress: FtpProgressSink<'_>,
    cancel: &CancellationToken,
) -> Result<Vec<FtpResult>, FtpTransferError>
where
    D: SyncDirection,
{
    if source_root.trim().is_empty() {
        return Err(FtpTransferError::InvalidArgument("source directory"));
    }
    if dest_root.trim().is_empty() {
        return Err(FtpTransferError::InvalidArgument("destination directory"));
    }
    let source_root = path::normalize_dir(source_root);
    let dest_root = path::normalize_dir(dest_root);

    let mut results = Vec::new();
    check_cancel(cancel)?;
    if !direction.source_dir_exists(&source_root).await? {
        info!("source directory {source_root} does not exist");
        return Ok(results);
    }

    let mut check_existence = true;
    if !direction.dest_dir_exists(&dest_root).await? {
        direction.create_dest_dir(&dest_root).await?;
        check_existence = false;
    }

    let listing = direction.list_source(&source_root).await?;
    let dest_listing = if check_existence {
        Some(direction.list_dest(&dest_root).await?)
    } else {
        None
    };
    let dest_files: HashSet<String> = dest_listing
        .iter()
        .flatten()
        .filter(|i| i.is_file())
        .map(|i| i.path.to_lowercase())
        .collect();

    let mut dirs_to_create = Vec::new();
    let mut files_to_transfer = Vec::new();
    let mut should_exist = HashSet::new();
    for kind in [FtpObjectType::Directory, FtpObjectType::File] {
        for item in listing.iter().filter(|i| i.kind == kind) {
            let mut result = FtpResult::new(
                item,
                path::join(&source_root, &item.path),
                path::join(&dest_root, &item.path),
            );
            if !options.passes_rules(item) {
                info!("skip {} due to rule", result.source_path);
                result.set_outcome(FtpResultOutcome::Skipped { by_rule: true });
            } else if kind == FtpObjectType::Directory {
                dirs_to_create.push(results.len());
            } else {
                should_exist.insert(item.path.to_lowercase());
                files_to_transfer.push((results.len(), item.path.to_lowercase()));
            }
            results.push(result);
        }
    }
    debug!(
        "sync {source_root} -> {dest_root}: {} directories, {} files",
        dirs_to_create.len(),
        files_to_transfer.len()
    );

    for &i in &dirs_to_create {
        if cancel.is_cancelled() {
            warn!("sync of {source_root} cancelled");
            return Ok(results);
        }
        let result = &mut results[i];
        match direction.create_dest_dir(&result.dest_path).await {
            Ok(true) => result.set_outcome(FtpResultOutcome::Success),
            Ok(false) => result.set_outcome(FtpResultOutcome::Skipped { by_rule: false }),
            Err(e) => {
                warn!("failed to create directory {}: {e}", result.dest_path);
                result.set_outcome(FtpResultOutcome::Failed(Some(e)));
            }
        }
    }

    let file_count = files_to_transfer.len();
    for (n, (i, key)) in files_to_transfer.into_iter().enumerate() {
        if cancel.is_cancelled() {
            warn!("sync of {source_root} cancelled");
            return Ok(results);
        }
        let result = &mut results[i];
        let exists = dest_files.contains(&key);
        if exists && options.exists == FtpRemoteExists::Skip {
            info!("skip {} as it already exists", result.dest_path);
            result.set_outcome(FtpResultOutcome::Skipped { by_rule: false });
            continue;
        }
        let policy = if exists {
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

    if options.mode == FtpFolderSyncMode::Mirror
        && let Some(dest_listing) = dest_listing
    {
        for item in dest_listing.iter().filter(|i| i.is_file()) {
            if should_exist.contains(&item.path.to_lowercase()) {
                continue;
            }
            if !options.delete_excluded && !options.passes_rules(item) {
                debug!("keep excluded file {}", item.path);
                continue;
            }
            if cancel.is_cancelled() {
                warn!("sync of {source_root} cancelled");
                return Ok(results);
            }
            let file = path::join(&dest_root, &item.path);
            info!("delete extra file {file}");
            if let Err(e) = direction.delete_dest_file(&file).await {
                warn!("failed to delete extra file {file}: {e}");
            }
        }
    }

    Ok(results)
}

fn check_connected<S: FtpSession>(session: &S, name: &'static str) -> Result<(), FtpTransferError> {
    if session.is_connected() {
        Ok(())
    } else {
        Err(FtpTransferError::NotConnected(name))
    }
}

/// Sync a local directory up to the server.
pub async fn upload_directory<S>(
    session: &mut S,
    local_dir: &Path,
    remote_dir: &str,
    options: &FtpSyncOptions,
    progress: FtpProgressSink<'_>,
    cancel: &CancellationToken,
) -> Result<Vec<FtpResult>, FtpTransferError>
where
    S: FtpSession,
{
    check_connected(session, "session")?;
    let local_dir = local_dir.to_string_lossy();
    let mut direction = UploadDirection::new(session);
    sync_directory(&mut direction, &local_dir, remote_dir, options, progress, cancel).await
}

/// Sync a server directory down to the local file system.
pub async fn download_directory<S>(
    session: &mut S,
    remote_dir: &str,
    local_dir: &Path,
    options: &FtpSyncOptions,
    progress: FtpProgressSink<'_>,
    cancel: &CancellationToken,
) -> Result<Vec<FtpResult>, FtpTransferError>
where
    S: FtpSession,
{
    check_connected(session, "session")?;
    if options.exists.appends() && !options.exists.is_resume() {
        return Err(FtpTransferError::UnsupportedExistsPolicy(options.exists));
    }
    let local_dir = local_dir.to_string_lossy();
    let mut direction = DownloadDirection::new(session);
    sync_directory(&mut direction, remote_dir, &local_dir, options, progress, cancel).await
}

/// Sync a directory from one server to another with FXP.
pub async fn transfer_directory<S, D>(
    source: &mut S,
    source_dir: &str,
    target: &mut D,
    target_dir: &str,
    options: &FtpSyncOptions,
    progress: FtpProgressSink<'_>,
    cancel: &CancellationToken,
) -> Result<Vec<FtpResult>, FtpTransferError>
where
    S: FtpSession,
    D: FtpSession,
{
    check_connected(source, "source")?;
    check_connected(target, "target")?;
    let mut direction = FxpDirection::new(source, target);
    sync_directory(&mut direction, source_dir, target_dir, options, progress, cancel).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockServer;
    use crate::progress::FtpProgress;

    fn outcomes(results: &[FtpResult]) -> Vec<(&str, Option<FtpStatus>)> {
        results
            .iter()
            .map(|r| (r.name(), r.to_status()))
            .collect()
    }

    fn blacklist_options(mode: FtpFolderSyncMode) -> FtpSyncOptions {
        FtpSyncOptions {
            mode,
            rules: vec![FtpRule::folder_name(false, COMMON_BLACKLISTED_FOLDERS, 0)],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn fxp_mirror() {
        let src = MockServer::new();
        let dst = MockServer::new();
        src.add_file("/src/a.txt", b"aaa");
        src.add_file("/src/sub/b.bin", b"bbbb");
        src.add_file("/src/.git/config", b"[core]");
        let mut source = src.connected_session().await;
        let mut target = dst.connected_session().await;
        let options = blacklist_options(FtpFolderSyncMode::Mirror);
        let cancel = CancellationToken::new();

        let results = transfer_directory(
            &mut source,
            "/src",
            &mut target,
            "/dst",
            &options,
            FtpProgressSink::none(),
            &cancel,
        )
        .await
        .unwrap();
        assert_eq!(
            outcomes(&results),
            vec![
                (".git", Some(FtpStatus::Skipped)),
                ("sub", Some(FtpStatus::Success)),
                ("config", Some(FtpStatus::Skipped)),
                ("a.txt", Some(FtpStatus::Success)),
                ("b.bin", Some(FtpStatus::Success)),
            ]
        );
        assert!(results[0].is_skipped_by_rule());
        assert!(results[2].is_skipped_by_rule());
        assert_eq!(results[4].source_path(), "/src/sub/b.bin");
        assert_eq!(results[4].dest_path(), "/dst/sub/b.bin");
        assert_eq!(results[4].size(), Some(4));
        assert_eq!(dst.file("/dst/a.txt").unwrap(), b"aaa");
        assert_eq!(dst.file("/dst/sub/b.bin").unwrap(), b"bbbb");
        assert!(!dst.has_dir("/dst/.git"));
        // the destination root was just created, nothing to list
        assert_eq!(dst.count_command("MLSD"), 0);

        // a second run has nothing to do but removing the extra file
        dst.add_file("/dst/sub/old.txt", b"old");
        let results = transfer_directory(
            &mut source,
            "/src",
            &mut target,
            "/dst",
            &options,
            FtpProgressSink::none(),
            &cancel,
        )
        .await
        .unwrap();
        assert!(results.iter().all(|r| r.is_skipped()));
        assert!(!results[1].is_skipped_by_rule());
        assert_eq!(dst.count_command("STOR"), 2);
        assert!(dst.file("/dst/sub/old.txt").is_none());
        assert_eq!(dst.file("/dst/a.txt").unwrap(), b"aaa");
    }

    #[tokio::test]
    async fn mirror_keeps_excluded_files() {
        let src = MockServer::new();
        let dst = MockServer::new();
        src.add_file("/src/a.txt", b"aaa");
        dst.add_file("/dst/keep.tmp", b"tmp");
        dst.add_file("/dst/extra.txt", b"extra");
        let mut source = src.connected_session().await;
        let mut target = dst.connected_session().await;
        let cancel = CancellationToken::new();

        let mut options = FtpSyncOptions {
            mode: FtpFolderSyncMode::Mirror,
            rules: vec![FtpRule::file_extension(false, &["tmp"])],
            delete_excluded: false,
            ..Default::default()
        };
        let results = transfer_directory(
            &mut source,
            "/src",
            &mut target,
            "/dst",
            &options,
            FtpProgressSink::none(),
            &cancel,
        )
        .await
        .unwrap();
        assert_eq!(outcomes(&results), vec![("a.txt", Some(FtpStatus::Success))]);
        assert!(dst.file("/dst/keep.tmp").is_some());
        assert!(dst.file("/dst/extra.txt").is_none());

        options.delete_excluded = true;
        transfer_directory(
            &mut source,
            "/src",
            &mut target,
            "/dst",
            &options,
            FtpProgressSink::none(),
            &cancel,
        )
        .await
        .unwrap();
        assert!(dst.file("/dst/keep.tmp").is_none());
        assert!(dst.file("/dst/a.txt").is_some());
    }

    #[tokio::test]
    async fn update_keeps_extra_files() {
        let src = MockServer::new();
        let dst = MockServer::new();
        src.add_file("/src/a.txt", b"new");
        dst.add_file("/dst/a.txt", b"old");
        dst.add_file("/dst/extra.txt", b"extra");
        let mut source = src.connected_session().await;
        let mut target = dst.connected_session().await;
        let options = FtpSyncOptions {
            exists: FtpRemoteExists::Overwrite,
            ..Default::default()
        };

        let results = transfer_directory(
            &mut source,
            "/src/",
            &mut target,
            "/dst/",
            &options,
            FtpProgressSink::none(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(outcomes(&results), vec![("a.txt", Some(FtpStatus::Success))]);
        assert_eq!(dst.file("/dst/a.txt").unwrap(), b"new");
        assert!(dst.file("/dst/extra.txt").is_some());
        assert_eq!(dst.count_command("DELE"), 1);
    }

    #[tokio::test]
    async fn missing_source_and_bad_arguments() {
        let src = MockServer::new();
        let dst = MockServer::new();
        let mut source = src.connected_session().await;
        let mut target = dst.connected_session().await;
        let options = FtpSyncOptions::default();
        let cancel = CancellationToken::new();

        let results = transfer_directory(
            &mut source,
            "/nowhere",
            &mut target,
            "/dst",
            &options,
            FtpProgressSink::none(),
            &cancel,
        )
        .await
        .unwrap();
        assert!(results.is_empty());
        assert!(!dst.has_dir("/dst"));

        let e = transfer_directory(
            &mut source,
            "",
            &mut target,
            "/dst",
            &options,
            FtpProgressSink::none(),
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(e, FtpTransferError::InvalidArgument("source directory")));

        cancel.cancel();
        let e = transfer_directory(
            &mut source,
            "/src",
            &mut target,
            "/dst",
            &options,
            FtpProgressSink::none(),
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(e, FtpTransferError::Cancelled));

        target.close().await;
        let e = transfer_directory(
            &mut source,
            "/src",
            &mut target,
            "/dst",
            &options,
            FtpProgressSink::none(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(e, FtpTransferError::NotConnected("target")));
    }

    #[tokio::test]
    async fn upload_tree() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.txt"), b"aaa").unwrap();
        std::fs::write(dir.path().join("sub").join("b.txt"), b"bbbb").unwrap();
        std::fs::write(dir.path().join("skip.log"), b"log").unwrap();
        let server = MockServer::new();
        let mut session = server.connected_session().await;
        let options = FtpSyncOptions {
            rules: vec![FtpRule::file_extension(true, &["txt"])],
            ..Default::default()
        };

        let mut metas = Vec::new();
        let mut receiver = |p: &FtpProgress| metas.push((p.file_index(), p.file_count()));
        let results = upload_directory(
            &mut session,
            dir.path(),
            "/up",
            &options,
            FtpProgressSink::new(&mut receiver, FtpProgressMeta::single()),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(
            outcomes(&results),
            vec![
                ("sub", Some(FtpStatus::Success)),
                ("a.txt", Some(FtpStatus::Success)),
                ("skip.log", Some(FtpStatus::Skipped)),
                ("b.txt", Some(FtpStatus::Success)),
            ]
        );
        assert_eq!(server.file("/up/a.txt").unwrap(), b"aaa");
        assert_eq!(server.file("/up/sub/b.txt").unwrap(), b"bbbb");
        assert!(server.file("/up/skip.log").is_none());
        assert_eq!(metas.first(), Some(&(0, 2)));
        assert_eq!(metas.last(), Some(&(1, 2)));
    }

    #[tokio::test]
    async fn upload_cancelled_midway() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.txt", "b.txt", "c.txt"] {
            std::fs::write(dir.path().join(name), name.as_bytes()).unwrap();
        }
        let server = MockServer::new();
        server.add_dir("/up");
        let mut session = server.connected_session().await;
        let cancel = CancellationToken::new();

        let token = cancel.clone();
        let mut receiver = move |_: &FtpProgress| token.cancel();
        let results = upload_directory(
            &mut session,
            dir.path(),
            "/up",
            &FtpSyncOptions::default(),
            FtpProgressSink::new(&mut receiver, FtpProgressMeta::single()),
            &cancel,
        )
        .await
        .unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].is_success());
        assert!(results[1].is_unset());
        assert!(results[2].is_unset());
        assert_eq!(results[2].to_status(), None);
        assert_eq!(server.count_command("STOR"), 1);
    }

    #[tokio::test]
    async fn download_tree() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let server = MockServer::new();
        server.add_file("/pub/a.txt", b"aaa");
        server.add_file("/pub/bad.bin", b"bad");
        server.add_file("/pub/sub/b.txt", b"bbbb");
        server.set_reply("RETR /pub/bad.bin", 550, "Permission denied");
        let mut session = server.connected_session().await;
        let options = FtpSyncOptions::default();
        let cancel = CancellationToken::new();

        let results = download_directory(
            &mut session,
            "/pub",
            &out,
            &options,
            FtpProgressSink::none(),
            &cancel,
        )
        .await
        .unwrap();
        assert_eq!(
            outcomes(&results),
            vec![
                ("sub", Some(FtpStatus::Success)),
                ("a.txt", Some(FtpStatus::Success)),
                ("bad.bin", Some(FtpStatus::Failed)),
                ("b.txt", Some(FtpStatus::Success)),
            ]
        );
        assert!(matches!(
            results[2].error(),
            Some(FtpTransferError::CommandRejected("RETR", _))
        ));
        assert_eq!(std::fs::read(out.join("a.txt")).unwrap(), b"aaa");
        assert_eq!(std::fs::read(out.join("sub").join("b.txt")).unwrap(), b"bbbb");

        server.clear_reply("RETR /pub/bad.bin");
        let results = download_directory(
            &mut session,
            "/pub",
            &out,
            &options,
            FtpProgressSink::none(),
            &cancel,
        )
        .await
        .unwrap();
        assert_eq!(
            outcomes(&results),
            vec![
                ("sub", Some(FtpStatus::Skipped)),
                ("a.txt", Some(FtpStatus::Skipped)),
                ("bad.bin", Some(FtpStatus::Success)),
                ("b.txt", Some(FtpStatus::Skipped)),
            ]
        );

        let e = download_directory(
            &mut session,
            "/pub",
            &out,
            &FtpSyncOptions {
                exists: FtpRemoteExists::AddToEnd,
                ..Default::default()
            },
            FtpProgressSink::none(),
            &cancel,
        )
        .await
        .unwrap_err();
        assert!(matches!(e, FtpTransferError::UnsupportedExistsPolicy(_)));
    }
}
