/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use log::{debug, info};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::time::Instant;

use super::{
    FtpRemoteExists, FtpStatus, TransferJob, drain_final_reply, finish_data_command,
    open_data_stream, resolve_remote_offset,
};
use crate::channel::negotiate_data_channel;
use crate::config::FtpClientConfig;
use crate::control::FtpCommand;
use crate::error::FtpTransferError;
use crate::hash::{checksum, local_file_checksum};
use crate::path;
use crate::progress::FtpProgressSink;
use crate::session::{FtpSession, FtpSessionExt, clone_connected};
use crate::verify::{FtpVerify, VerifiedTransfer, run_verified, usable_hash};

/// Compare a local file with its remote copy.
///
/// Checksums are used when the server can compute one, the file size
/// otherwise unless only checksums are allowed.
async fn verify_local<S: FtpSession>(
    session: &mut S,
    local_path: &Path,
    remote_path: &str,
    verify: FtpVerify,
) -> Result<bool, FtpTransferError> {
    let algorithm = session.state().feature().checksum_algorithms().first();
    let only_checksum = verify.contains(FtpVerify::ONLY_CHECKSUM);

    if !only_checksum {
        let local_size = tokio::fs::metadata(local_path).await?.len();
        let remote_size = session.file_size(remote_path).await?;
        if remote_size != Some(local_size) {
            debug!("size mismatch: {local_size} != {remote_size:?}");
            return Ok(false);
        }
    }

    let Some(algorithm) = algorithm else {
        info!(
            "{} supports no hash algorithm, skip checksum verification",
            session.state().server()
        );
        return Ok(true);
    };
    let Some(remote_hash) = usable_hash(checksum(session, remote_path, algorithm).await)? else {
        return Ok(false);
    };
    let local_hash = local_file_checksum(local_path, algorithm).await?;
    Ok(local_hash.matches(&remote_hash))
}

pub(crate) struct UploadTransfer<'a, S> {
    session: &'a mut S,
    local_path: PathBuf,
}

impl<'a, S: FtpSession> UploadTransfer<'a, S> {
    pub(crate) fn new(session: &'a mut S, local_path: &Path) -> Self {
        UploadTransfer {
            session,
            local_path: local_path.to_path_buf(),
        }
    }
}

async fn upload_data<S: FtpSession>(
    session: &mut S,
    local_path: &Path,
    job: &TransferJob,
    local_len: u64,
    mut progress: FtpProgressSink<'_>,
) -> Result<(), FtpTransferError> {
    let config = session.state().config().transfer.clone();
    let local_position = if job.exists.is_resume() {
        job.offset.min(local_len)
    } else {
        0
    };
    let cmd = if job.offset == 0 && !job.exists.appends() {
        FtpCommand::STOR
    } else {
        FtpCommand::APPE
    };

    let mut file = tokio::fs::File::open(local_path).await?;
    if local_position > 0 {
        file.seek(SeekFrom::Start(local_position)).await?;
    }

    let channel =
        negotiate_data_channel(session, config.upload_data_type, config.data_connection_type)
            .await?;
    let mut data = open_data_stream(session, &channel, cmd, &job.dest_path).await?;

    let started = Instant::now();
    let mut buf = vec![0u8; config.buffer_size.max(512)];
    let mut sent = 0u64;
    let r = async {
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            data.write_all(&buf[..n])
                .await
                .map_err(FtpTransferError::DataConnectionFailed)?;
            sent += n as u64;
            progress.report_sample(
                Some(local_len - local_position),
                sent,
                started.elapsed(),
                &job.source_path,
                &job.dest_path,
            );
        }
        data.shutdown()
            .await
            .map_err(FtpTransferError::DataConnectionFailed)
    }
    .await;
    drop(data);
    if let Err(e) = r {
        drain_final_reply(session).await;
        return Err(e);
    }

    finish_data_command(session, cmd).await?;
    debug!(
        "uploaded {sent} bytes to {} at offset {}",
        job.dest_path, job.offset
    );
    Ok(())
}

#[async_trait]
impl<S: FtpSession> VerifiedTransfer for UploadTransfer<'_, S> {
    fn config(&self) -> &FtpClientConfig {
        self.session.state().config()
    }

    async fn attempt(
        &mut self,
        job: &mut TransferJob,
        mut progress: FtpProgressSink<'_>,
    ) -> Result<FtpStatus, FtpTransferError> {
        let Some((offset, exists)) = resolve_remote_offset(&mut *self.session, job).await? else {
            info!("skip upload of {} as it already exists", job.dest_path);
            progress.report_completed(&job.source_path, &job.dest_path);
            return Ok(FtpStatus::Skipped);
        };
        job.offset = offset;

        let local_len = tokio::fs::metadata(&self.local_path).await?.len();
        if job.exists.is_resume() && offset > 0 && offset == local_len {
            info!("skip upload of {} as it is complete", job.dest_path);
            progress.report_completed(&job.source_path, &job.dest_path);
            return Ok(FtpStatus::Skipped);
        }

        if job.create_dest_dir && !exists {
            if let Some(dir) = path::parent(&job.dest_path) {
                self.session.create_directory(dir).await?;
            }
        }

        if self.session.state().config().thread_safe_data_channels {
            let mut clone = clone_connected(&mut *self.session).await?;
            let r = upload_data(&mut clone, &self.local_path, job, local_len, progress).await;
            clone.close().await;
            r?;
        } else {
            upload_data(
                &mut *self.session,
                &self.local_path,
                job,
                local_len,
                progress,
            )
            .await?;
        }
        Ok(FtpStatus::Success)
    }

    async fn verify(&mut self, job: &TransferJob) -> Result<bool, FtpTransferError> {
        verify_local(&mut *self.session, &self.local_path, &job.dest_path, job.verify).await
    }

    async fn delete_destination(&mut self, job: &TransferJob) -> Result<(), FtpTransferError> {
        self.session.delete_file(&job.dest_path).await
    }
}

pub(crate) struct DownloadTransfer<'a, S> {
    session: &'a mut S,
    local_path: PathBuf,
}

impl<'a, S: FtpSession> DownloadTransfer<'a, S> {
    pub(crate) fn new(session: &'a mut S, local_path: &Path) -> Self {
        DownloadTransfer {
            session,
            local_path: local_path.to_path_buf(),
        }
    }
}

async fn download_data<S: FtpSession>(
    session: &mut S,
    local_path: &Path,
    job: &TransferJob,
    remote_len: Option<u64>,
    mut progress: FtpProgressSink<'_>,
) -> Result<(), FtpTransferError> {
    let config = session.state().config().transfer.clone();

    let mut file = if job.offset > 0 {
        tokio::fs::OpenOptions::new()
            .append(true)
            .open(local_path)
            .await?
    } else {
        tokio::fs::File::create(local_path).await?
    };

    let channel = negotiate_data_channel(
        session,
        config.download_data_type,
        config.data_connection_type,
    )
    .await?;
    if job.offset > 0 {
        let cmd = FtpCommand::REST;
        let reply = session
            .execute(&cmd.line_with(&job.offset.to_string()))
            .await?;
        if !reply.is_success() {
            return Err(FtpTransferError::CommandRejected(cmd.name(), reply));
        }
    }
    let mut data = open_data_stream(session, &channel, FtpCommand::RETR, &job.source_path).await?;

    let started = Instant::now();
    let total = remote_len.map(|n| n.saturating_sub(job.offset));
    let mut buf = vec![0u8; config.buffer_size.max(512)];
    let mut received = 0u64;
    let r = async {
        loop {
            let n = data
                .read(&mut buf)
                .await
                .map_err(FtpTransferError::DataConnectionFailed)?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n]).await?;
            received += n as u64;
            progress.report_sample(
                total,
                received,
                started.elapsed(),
                &job.dest_path,
                &job.source_path,
            );
        }
        file.flush().await.map_err(FtpTransferError::from)
    }
    .await;
    drop(data);
    if let Err(e) = r {
        drain_final_reply(session).await;
        return Err(e);
    }

    finish_data_command(session, FtpCommand::RETR).await?;
    debug!("downloaded {received} bytes of {}", job.source_path);
    Ok(())
}

#[async_trait]
impl<S: FtpSession> VerifiedTransfer for DownloadTransfer<'_, S> {
    fn config(&self) -> &FtpClientConfig {
        self.session.state().config()
    }

    async fn attempt(
        &mut self,
        job: &mut TransferJob,
        mut progress: FtpProgressSink<'_>,
    ) -> Result<FtpStatus, FtpTransferError> {
        let local_len = match tokio::fs::metadata(&self.local_path).await {
            Ok(m) => Some(m.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let offset = match (job.exists, local_len) {
            (FtpRemoteExists::Skip, Some(_)) => {
                info!("skip download of {} as it already exists", job.dest_path);
                progress.report_completed(&job.dest_path, &job.source_path);
                return Ok(FtpStatus::Skipped);
            }
            (FtpRemoteExists::Resume | FtpRemoteExists::ResumeNoCheck, Some(len)) => len,
            _ => 0,
        };
        job.offset = offset;

        let remote_len = self.session.file_size(&job.source_path).await?;
        if offset > 0 && remote_len == Some(offset) {
            info!("skip download of {} as it is complete", job.dest_path);
            progress.report_completed(&job.dest_path, &job.source_path);
            return Ok(FtpStatus::Skipped);
        }

        if job.create_dest_dir {
            if let Some(dir) = self.local_path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(dir).await?;
            }
        }

        if self.session.state().config().thread_safe_data_channels {
            let mut clone = clone_connected(&mut *self.session).await?;
            let r = download_data(&mut clone, &self.local_path, job, remote_len, progress).await;
            clone.close().await;
            r?;
        } else {
            download_data(
                &mut *self.session,
                &self.local_path,
                job,
                remote_len,
                progress,
            )
            .await?;
        }
        Ok(FtpStatus::Success)
    }

    async fn verify(&mut self, job: &TransferJob) -> Result<bool, FtpTransferError> {
        verify_local(&mut *self.session, &self.local_path, &job.source_path, job.verify).await
    }

    async fn delete_destination(&mut self, _job: &TransferJob) -> Result<(), FtpTransferError> {
        tokio::fs::remove_file(&self.local_path).await?;
        Ok(())
    }
}

fn check_session<S: FtpSession>(session: &S) -> Result<(), FtpTransferError> {
    if session.is_connected() {
        Ok(())
    } else {
        Err(FtpTransferError::NotConnected("session"))
    }
}

/// Upload a local file through a passive data channel.
pub async fn upload_file<S>(
    session: &mut S,
    local_path: &Path,
    remote_path: &str,
    create_remote_dir: bool,
    exists: FtpRemoteExists,
    verify: FtpVerify,
    progress: FtpProgressSink<'_>,
) -> Result<FtpStatus, FtpTransferError>
where
    S: FtpSession,
{
    let mut job = TransferJob::new(&local_path.to_string_lossy(), remote_path, exists, verify);
    job.create_dest_dir = create_remote_dir;
    job.check_paths()?;
    check_session(session)?;
    if !tokio::fs::try_exists(local_path).await? {
        return Err(FtpTransferError::SourceNotFound(job.source_path));
    }

    let mut transfer = UploadTransfer::new(session, local_path);
    run_verified(&mut transfer, job, progress).await
}

/// Download a remote file through a passive data channel.
///
/// Only the skip, overwrite and resume policies apply to local files.
pub async fn download_file<S>(
    session: &mut S,
    remote_path: &str,
    local_path: &Path,
    create_local_dir: bool,
    exists: FtpRemoteExists,
    verify: FtpVerify,
    progress: FtpProgressSink<'_>,
) -> Result<FtpStatus, FtpTransferError>
where
    S: FtpSession,
{
    if matches!(
        exists,
        FtpRemoteExists::AddToEnd | FtpRemoteExists::AddToEndNoCheck
    ) {
        return Err(FtpTransferError::UnsupportedExistsPolicy(exists));
    }
    let mut job = TransferJob::new(remote_path, &local_path.to_string_lossy(), exists, verify);
    job.create_dest_dir = create_local_dir;
    job.check_paths()?;
    check_session(session)?;

    let mut transfer = DownloadTransfer::new(session, local_path);
    run_verified(&mut transfer, job, progress).await
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::FtpDataConnectionType;
    use crate::mock::MockServer;
    use crate::progress::{FtpProgress, FtpProgressMeta};

    const HASH_FEAT: &[&str] = &["SIZE", "MLST type*;size*;", "HASH SHA-256*;MD5"];

    #[tokio::test]
    async fn upload_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.txt");
        std::fs::write(&local, b"hello world").unwrap();
        let server = MockServer::new();
        let mut session = server.connected_session().await;

        let status = upload_file(
            &mut session,
            &local,
            "/up/a.txt",
            true,
            FtpRemoteExists::Skip,
            FtpVerify::NONE,
            FtpProgressSink::none(),
        )
        .await
        .unwrap();
        assert_eq!(status, FtpStatus::Success);
        assert_eq!(server.file("/up/a.txt").unwrap(), b"hello world");
        assert_eq!(server.count_command("STOR"), 1);
        assert_eq!(server.count_command("PASV"), 1);
    }

    #[tokio::test]
    async fn upload_resume() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.bin");
        std::fs::write(&local, b"0123456789").unwrap();
        let server = MockServer::new();
        server.add_file("/a.bin", b"0123");
        let mut session = server.connected_session().await;

        let status = upload_file(
            &mut session,
            &local,
            "/a.bin",
            false,
            FtpRemoteExists::Resume,
            FtpVerify::NONE,
            FtpProgressSink::none(),
        )
        .await
        .unwrap();
        assert_eq!(status, FtpStatus::Success);
        assert_eq!(server.file("/a.bin").unwrap(), b"0123456789");
        assert_eq!(server.count_command("APPE"), 1);

        // nothing left to send
        let status = upload_file(
            &mut session,
            &local,
            "/a.bin",
            false,
            FtpRemoteExists::Resume,
            FtpVerify::NONE,
            FtpProgressSink::none(),
        )
        .await
        .unwrap();
        assert_eq!(status, FtpStatus::Skipped);
        assert_eq!(server.count_command("APPE"), 1);
    }

    #[tokio::test]
    async fn upload_append_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.log");
        std::fs::write(&local, b"line2\n").unwrap();
        let server = MockServer::new();
        server.add_file("/a.log", b"line1\n");
        let mut session = server.connected_session().await;

        let mut seen = Vec::new();
        let mut receiver = |p: &FtpProgress| seen.push(p.transferred_bytes());
        let status = upload_file(
            &mut session,
            &local,
            "/a.log",
            false,
            FtpRemoteExists::AddToEnd,
            FtpVerify::NONE,
            FtpProgressSink::new(&mut receiver, FtpProgressMeta::single()),
        )
        .await
        .unwrap();
        assert_eq!(status, FtpStatus::Success);
        assert_eq!(server.file("/a.log").unwrap(), b"line1\nline2\n");
        assert_eq!(server.count_command("SIZE /a.log"), 1);
        assert_eq!(server.count_command("APPE"), 1);
        assert_eq!(seen.last(), Some(&6));
    }

    #[tokio::test]
    async fn transfer_over_active_channel() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.bin");
        std::fs::write(&local, b"0123456789").unwrap();
        let server = MockServer::new();
        let mut session = server.connected_session().await;
        session.state_mut().config_mut().transfer.data_connection_type =
            FtpDataConnectionType::Port;

        let status = upload_file(
            &mut session,
            &local,
            "/a.bin",
            false,
            FtpRemoteExists::Overwrite,
            FtpVerify::NONE,
            FtpProgressSink::none(),
        )
        .await
        .unwrap();
        assert_eq!(status, FtpStatus::Success);
        assert_eq!(server.file("/a.bin").unwrap(), b"0123456789");
        assert_eq!(server.count_command("PORT"), 1);

        session.state_mut().config_mut().transfer.data_connection_type =
            FtpDataConnectionType::Eprt;
        let copy = dir.path().join("b.bin");
        let status = download_file(
            &mut session,
            "/a.bin",
            &copy,
            false,
            FtpRemoteExists::Overwrite,
            FtpVerify::NONE,
            FtpProgressSink::none(),
        )
        .await
        .unwrap();
        assert_eq!(status, FtpStatus::Success);
        assert_eq!(std::fs::read(&copy).unwrap(), b"0123456789");
        assert_eq!(server.count_command("EPRT"), 1);
        assert_eq!(server.count_command("PASV"), 0);
        assert_eq!(server.count_command("EPSV"), 0);
    }

    #[tokio::test]
    async fn upload_skip_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.txt");
        std::fs::write(&local, b"new").unwrap();
        let server = MockServer::new();
        server.add_file("/a.txt", b"old");
        let mut session = server.connected_session().await;

        let mut seen = Vec::new();
        let mut receiver = |p: &FtpProgress| seen.push(p.progress());
        let status = upload_file(
            &mut session,
            &local,
            "/a.txt",
            false,
            FtpRemoteExists::Skip,
            FtpVerify::NONE,
            FtpProgressSink::new(&mut receiver, FtpProgressMeta::single()),
        )
        .await
        .unwrap();
        assert_eq!(status, FtpStatus::Skipped);
        assert_eq!(seen, vec![100.0]);
        assert_eq!(server.file("/a.txt").unwrap(), b"old");

        let status = upload_file(
            &mut session,
            &local,
            "/a.txt",
            false,
            FtpRemoteExists::Overwrite,
            FtpVerify::NONE,
            FtpProgressSink::none(),
        )
        .await
        .unwrap();
        assert_eq!(status, FtpStatus::Success);
        assert_eq!(server.file("/a.txt").unwrap(), b"new");
        assert_eq!(server.count_command("DELE"), 1);
    }

    #[tokio::test]
    async fn upload_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::new();
        let mut session = server.connected_session().await;

        let e = upload_file(
            &mut session,
            &dir.path().join("missing"),
            "/a.txt",
            false,
            FtpRemoteExists::Overwrite,
            FtpVerify::NONE,
            FtpProgressSink::none(),
        )
        .await
        .unwrap_err();
        assert!(matches!(e, FtpTransferError::SourceNotFound(_)));
        assert_eq!(server.count_command("STOR"), 0);
    }

    #[tokio::test]
    async fn upload_verified() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.bin");
        std::fs::write(&local, b"0123456789").unwrap();
        let server = MockServer::with_feat(HASH_FEAT);
        let mut session = server.connected_session().await;

        let status = upload_file(
            &mut session,
            &local,
            "/a.bin",
            false,
            FtpRemoteExists::Overwrite,
            FtpVerify::RETRY,
            FtpProgressSink::none(),
        )
        .await
        .unwrap();
        assert_eq!(status, FtpStatus::Success);
        assert_eq!(server.count_command("OPTS HASH"), 1);
        assert_eq!(server.count_command("HASH"), 1);
        assert_eq!(server.count_command("STOR"), 1);
    }

    #[tokio::test]
    async fn upload_unverified_is_deleted() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.bin");
        std::fs::write(&local, b"0123456789").unwrap();
        let server = MockServer::with_feat(HASH_FEAT);
        server.set_corrupt_uploads(true);
        let mut session = server.connected_session().await;

        let status = upload_file(
            &mut session,
            &local,
            "/a.bin",
            false,
            FtpRemoteExists::Skip,
            FtpVerify::RETRY | FtpVerify::DELETE,
            FtpProgressSink::none(),
        )
        .await
        .unwrap();
        assert_eq!(status, FtpStatus::Failed);
        assert_eq!(server.count_command("STOR"), 3);
        assert!(server.file("/a.bin").is_none());
    }

    #[tokio::test]
    async fn upload_size_verification() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.bin");
        std::fs::write(&local, b"").unwrap();
        let server = MockServer::new();
        server.set_corrupt_uploads(true);
        let mut session = server.connected_session().await;

        let e = upload_file(
            &mut session,
            &local,
            "/a.bin",
            false,
            FtpRemoteExists::Overwrite,
            FtpVerify::THROW,
            FtpProgressSink::none(),
        )
        .await
        .unwrap_err();
        assert!(matches!(e, FtpTransferError::VerificationFailed(_)));
        assert_eq!(server.count_command("STOR"), 1);
    }

    #[tokio::test]
    async fn upload_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.bin");
        std::fs::write(&local, b"0123").unwrap();
        let server = MockServer::new();
        let mut session = server.connected_session().await;

        // parent directory is missing
        let e = upload_file(
            &mut session,
            &local,
            "/no/such/a.bin",
            false,
            FtpRemoteExists::NoCheck,
            FtpVerify::NONE,
            FtpProgressSink::none(),
        )
        .await
        .unwrap_err();
        match e {
            FtpTransferError::CommandRejected(cmd, reply) => {
                assert_eq!(cmd, "STOR");
                assert_eq!(reply.code(), 553);
            }
            e => panic!("unexpected error {e}"),
        }
    }

    #[tokio::test]
    async fn upload_with_cloned_session() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.bin");
        std::fs::write(&local, b"0123").unwrap();
        let server = MockServer::new();
        let mut session = server.connected_session().await;
        session.state_mut().config_mut().thread_safe_data_channels = true;

        let status = upload_file(
            &mut session,
            &local,
            "/a.bin",
            false,
            FtpRemoteExists::NoCheck,
            FtpVerify::NONE,
            FtpProgressSink::none(),
        )
        .await
        .unwrap();
        assert_eq!(status, FtpStatus::Success);
        assert_eq!(server.connect_count(), 2);
        assert_eq!(server.quit_count(), 1);
        assert!(session.is_connected());
    }

    #[tokio::test]
    async fn download_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("sub").join("a.txt");
        let server = MockServer::new();
        server.add_file("/pub/a.txt", b"hello world");
        let mut session = server.connected_session().await;

        let mut seen = Vec::new();
        let mut receiver = |p: &FtpProgress| seen.push(p.progress());
        let status = download_file(
            &mut session,
            "/pub/a.txt",
            &local,
            true,
            FtpRemoteExists::Overwrite,
            FtpVerify::NONE,
            FtpProgressSink::new(&mut receiver, FtpProgressMeta::single()),
        )
        .await
        .unwrap();
        assert_eq!(status, FtpStatus::Success);
        assert_eq!(std::fs::read(&local).unwrap(), b"hello world");
        assert_eq!(seen.last(), Some(&100.0));
        assert_eq!(server.count_command("REST"), 0);
    }

    #[tokio::test]
    async fn download_resume() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.bin");
        std::fs::write(&local, b"0123").unwrap();
        let server = MockServer::new();
        server.add_file("/a.bin", b"0123456789");
        let mut session = server.connected_session().await;

        let status = download_file(
            &mut session,
            "/a.bin",
            &local,
            false,
            FtpRemoteExists::Resume,
            FtpVerify::NONE,
            FtpProgressSink::none(),
        )
        .await
        .unwrap();
        assert_eq!(status, FtpStatus::Success);
        assert_eq!(std::fs::read(&local).unwrap(), b"0123456789");
        let cmds = server.commands();
        let rest = cmds.iter().position(|c| c == "REST 4").unwrap();
        assert_eq!(cmds[rest + 1], "RETR /a.bin");

        let status = download_file(
            &mut session,
            "/a.bin",
            &local,
            false,
            FtpRemoteExists::Resume,
            FtpVerify::NONE,
            FtpProgressSink::none(),
        )
        .await
        .unwrap();
        assert_eq!(status, FtpStatus::Skipped);
        assert_eq!(server.count_command("RETR"), 1);
    }

    #[tokio::test]
    async fn download_into_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::new();
        server.add_file("/a.txt", b"abc");
        let mut session = server.connected_session().await;

        let e = download_file(
            &mut session,
            "/a.txt",
            &dir.path().join("missing").join("a.txt"),
            false,
            FtpRemoteExists::Overwrite,
            FtpVerify::NONE,
            FtpProgressSink::none(),
        )
        .await
        .unwrap_err();
        assert!(matches!(e, FtpTransferError::LocalIo(_)));
        assert_eq!(server.count_command("RETR"), 0);
        assert_eq!(server.count_command("PASV"), 0);
        assert_eq!(session.file_size("/a.txt").await.unwrap(), Some(3));
    }

    #[tokio::test]
    async fn download_skip_existing() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.txt");
        std::fs::write(&local, b"old").unwrap();
        let server = MockServer::new();
        server.add_file("/a.txt", b"new");
        let mut session = server.connected_session().await;

        let status = download_file(
            &mut session,
            "/a.txt",
            &local,
            false,
            FtpRemoteExists::Skip,
            FtpVerify::NONE,
            FtpProgressSink::none(),
        )
        .await
        .unwrap();
        assert_eq!(status, FtpStatus::Skipped);
        assert_eq!(std::fs::read(&local).unwrap(), b"old");
        assert_eq!(server.count_command("RETR"), 0);
    }

    #[tokio::test]
    async fn download_rejects_append() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::new();
        let mut session = server.connected_session().await;

        let e = download_file(
            &mut session,
            "/a.txt",
            &dir.path().join("a.txt"),
            false,
            FtpRemoteExists::AddToEnd,
            FtpVerify::NONE,
            FtpProgressSink::none(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            e,
            FtpTransferError::UnsupportedExistsPolicy(FtpRemoteExists::AddToEnd)
        ));
        assert!(server.commands().is_empty());
    }

    #[tokio::test]
    async fn download_verified() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("a.bin");
        let server = MockServer::with_feat(HASH_FEAT);
        server.add_file("/a.bin", b"0123456789");
        let mut session = server.connected_session().await;

        let status = download_file(
            &mut session,
            "/a.bin",
            &local,
            false,
            FtpRemoteExists::Overwrite,
            FtpVerify::ONLY_CHECKSUM | FtpVerify::THROW,
            FtpProgressSink::none(),
        )
        .await
        .unwrap();
        assert_eq!(status, FtpStatus::Success);
        assert_eq!(server.count_command("HASH"), 1);
        assert_eq!(server.count_command("SIZE"), 1);
    }

    #[tokio::test]
    async fn download_end_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let server = MockServer::new();
        server.add_file("/a.bin", b"0123456789");
        server.set_transfer_delay(Duration::from_secs(3600));
        let mut session = server.connected_session().await;
        session.state_mut().config_mut().transfer.end_wait_timeout = Duration::from_millis(50);

        let e = download_file(
            &mut session,
            "/a.bin",
            &dir.path().join("a.bin"),
            false,
            FtpRemoteExists::Overwrite,
            FtpVerify::NONE,
            FtpProgressSink::none(),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            e,
            FtpTransferError::TimedOut("end of data transfer")
        ));
    }
}
