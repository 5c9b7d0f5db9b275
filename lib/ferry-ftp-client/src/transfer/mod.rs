/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use log::{debug, warn};

use crate::channel::DataChannelDescriptor;
use crate::control::{FtpCommand, FtpReply};
use crate::error::{FtpCommandError, FtpTransferError};
use crate::session::{FtpSession, FtpSessionExt};
use crate::verify::FtpVerify;

mod fxp;
pub use fxp::transfer_file;

mod local;
pub use local::{download_file, upload_file};

mod line;
pub use line::{list_directory, list_recursive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FtpDataType {
    Ascii,
    #[default]
    Binary,
}

impl FtpDataType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "a" | "ascii" => Some(FtpDataType::Ascii),
            "i" | "binary" | "image" => Some(FtpDataType::Binary),
            _ => None,
        }
    }
}

/// What to do if the destination file is already there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FtpRemoteExists {
    /// Do not look, just write it.
    NoCheck,
    /// Resume from the destination size without an existence query.
    ResumeNoCheck,
    /// Append to the destination without an existence query.
    AddToEndNoCheck,
    #[default]
    Skip,
    Overwrite,
    /// Continue from the size of the existing destination.
    Resume,
    /// Append the whole source to the existing destination.
    AddToEnd,
}

impl FtpRemoteExists {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "nocheck" => Some(FtpRemoteExists::NoCheck),
            "resumenocheck" => Some(FtpRemoteExists::ResumeNoCheck),
            "addtoendnocheck" | "appendnocheck" => Some(FtpRemoteExists::AddToEndNoCheck),
            "skip" => Some(FtpRemoteExists::Skip),
            "overwrite" => Some(FtpRemoteExists::Overwrite),
            "resume" => Some(FtpRemoteExists::Resume),
            "addtoend" | "append" => Some(FtpRemoteExists::AddToEnd),
            _ => None,
        }
    }

    /// Whether the existence query is skipped.
    pub fn is_no_check(&self) -> bool {
        matches!(
            self,
            FtpRemoteExists::NoCheck
                | FtpRemoteExists::ResumeNoCheck
                | FtpRemoteExists::AddToEndNoCheck
        )
    }

    pub fn is_resume(&self) -> bool {
        matches!(self, FtpRemoteExists::Resume | FtpRemoteExists::ResumeNoCheck)
    }

    /// Whether the data is appended even when starting at offset 0.
    pub fn appends(&self) -> bool {
        matches!(
            self,
            FtpRemoteExists::ResumeNoCheck
                | FtpRemoteExists::AddToEnd
                | FtpRemoteExists::AddToEndNoCheck
        )
    }

    /// The variant to use once the destination is known to be absent.
    pub fn to_no_check(self) -> Self {
        match self {
            FtpRemoteExists::Resume | FtpRemoteExists::ResumeNoCheck => {
                FtpRemoteExists::ResumeNoCheck
            }
            FtpRemoteExists::AddToEnd | FtpRemoteExists::AddToEndNoCheck => {
                FtpRemoteExists::AddToEndNoCheck
            }
            _ => FtpRemoteExists::NoCheck,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FtpStatus {
    Success,
    Failed,
    /// The destination existed and the policy said to leave it alone.
    Skipped,
}

/// One single file transfer, as tracked by the retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferJob {
    pub source_path: String,
    pub dest_path: String,
    pub create_dest_dir: bool,
    pub exists: FtpRemoteExists,
    pub verify: FtpVerify,
    /// resume offset resolved by the last attempt
    pub offset: u64,
    pub attempts_left: usize,
}

impl TransferJob {
    pub fn new(
        source_path: &str,
        dest_path: &str,
        exists: FtpRemoteExists,
        verify: FtpVerify,
    ) -> Self {
        TransferJob {
            source_path: source_path.to_string(),
            dest_path: dest_path.to_string(),
            create_dest_dir: false,
            exists,
            verify,
            offset: 0,
            attempts_left: 1,
        }
    }

    pub(crate) fn check_paths(&self) -> Result<(), FtpTransferError> {
        if self.source_path.trim().is_empty() {
            return Err(FtpTransferError::InvalidArgument("source path"));
        }
        if self.dest_path.trim().is_empty() {
            return Err(FtpTransferError::InvalidArgument("destination path"));
        }
        Ok(())
    }
}

async fn start_data_command<S: FtpSession>(
    session: &mut S,
    cmd: FtpCommand,
    param: &str,
) -> Result<(), FtpTransferError> {
    let reply = session.execute(&cmd.line_with(param)).await?;
    if reply.is_positive_preliminary() {
        Ok(())
    } else {
        Err(FtpTransferError::CommandRejected(cmd.name(), reply))
    }
}

/// Send a data command over `channel` and return the data stream.
///
/// Passive channels are connected before the command is sent, active ones
/// are accepted once the server has answered with its 1xx mark.
pub(crate) async fn open_data_stream<S: FtpSession>(
    session: &mut S,
    channel: &DataChannelDescriptor,
    cmd: FtpCommand,
    param: &str,
) -> Result<S::DataStream, FtpTransferError> {
    if !channel.kind().is_active() {
        let data = session.connect_data(channel).await?;
        start_data_command(session, cmd, param).await?;
        return Ok(data);
    }

    start_data_command(session, cmd, param).await?;
    match session.accept_data().await {
        Ok(data) => Ok(data),
        Err(e) => {
            drain_final_reply(session).await;
            Err(e.into())
        }
    }
}

/// Wait for the reply closing a data transfer.
pub(crate) async fn finish_data_command<S: FtpSession>(
    session: &mut S,
    cmd: FtpCommand,
) -> Result<FtpReply, FtpTransferError> {
    let timeout = session.state().config().transfer.end_wait_timeout;
    let reply = match tokio::time::timeout(timeout, session.read_reply()).await {
        Ok(r) => r?,
        Err(_) => {
            session.close().await;
            return Err(FtpTransferError::TimedOut("end of data transfer"));
        }
    };
    if reply.is_positive_completion() {
        Ok(reply)
    } else {
        Err(FtpTransferError::CommandRejected(cmd.name(), reply))
    }
}

/// Wait for the final reply of a data command, skipping 1xx marks.
pub(crate) async fn wait_final_reply<S: FtpSession>(
    session: &mut S,
) -> Result<FtpReply, FtpCommandError> {
    loop {
        let reply = session.read_reply().await?;
        if !reply.is_positive_preliminary() {
            return Ok(reply);
        }
    }
}

/// Consume the final reply of a data command that failed after its 1xx mark.
///
/// The session is closed if that reply does not arrive within the end wait
/// timeout, so no later command can be answered with it.
pub(crate) async fn drain_final_reply<S: FtpSession>(session: &mut S) {
    let timeout = session.state().config().transfer.end_wait_timeout;
    match tokio::time::timeout(timeout, wait_final_reply(&mut *session)).await {
        Ok(Ok(reply)) => debug!(
            "aborted data transfer on {} ended with {} {}",
            session.state().server(),
            reply.code(),
            reply.message()
        ),
        Ok(Err(e)) => {
            warn!(
                "no final reply for aborted data transfer on {}: {e}",
                session.state().server()
            );
            session.close().await;
        }
        Err(_) => {
            warn!(
                "timed out waiting for the end of aborted data transfer on {}",
                session.state().server()
            );
            session.close().await;
        }
    }
}

/// Resolve the exists policy of `job` against the server holding the
/// destination.
///
/// Returns the destination size for the resuming and appending policies,
/// whether the destination is known to exist, or `None` if the file is to
/// be skipped.
pub(crate) async fn resolve_remote_offset<S>(
    session: &mut S,
    job: &TransferJob,
) -> Result<Option<(u64, bool)>, FtpTransferError>
where
    S: FtpSession,
{
    let dest = job.dest_path.as_str();
    match job.exists {
        FtpRemoteExists::NoCheck => Ok(Some((0, false))),
        FtpRemoteExists::ResumeNoCheck | FtpRemoteExists::AddToEndNoCheck => {
            let offset = session.file_size(dest).await?.unwrap_or(0);
            Ok(Some((offset, false)))
        }
        policy => {
            if !session.file_exists(dest).await? {
                return Ok(Some((0, false)));
            }
            match policy {
                FtpRemoteExists::Skip => Ok(None),
                FtpRemoteExists::Overwrite => {
                    session.delete_file(dest).await?;
                    Ok(Some((0, true)))
                }
                FtpRemoteExists::Resume | FtpRemoteExists::AddToEnd => {
                    let offset = session.file_size(dest).await?.unwrap_or(0);
                    Ok(Some((offset, true)))
                }
                _ => Ok(Some((0, true))),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FtpObjectType {
    File,
    Directory,
}

/// A listed file system entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpListItem {
    /// relative to the listed root, `/` separated, no leading `/`
    pub path: String,
    pub kind: FtpObjectType,
    pub size: Option<u64>,
}

impl FtpListItem {
    pub fn file(path: &str, size: Option<u64>) -> Self {
        FtpListItem {
            path: path.to_string(),
            kind: FtpObjectType::File,
            size,
        }
    }

    pub fn directory(path: &str) -> Self {
        FtpListItem {
            path: path.to_string(),
            kind: FtpObjectType::Directory,
            size: None,
        }
    }

    #[inline]
    pub fn is_file(&self) -> bool {
        self.kind == FtpObjectType::File
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exists_policy() {
        assert_eq!(
            FtpRemoteExists::parse("resume-no-check"),
            Some(FtpRemoteExists::ResumeNoCheck)
        );
        assert_eq!(FtpRemoteExists::parse("append"), Some(FtpRemoteExists::AddToEnd));
        assert_eq!(FtpRemoteExists::parse("bogus"), None);

        assert_eq!(
            FtpRemoteExists::Resume.to_no_check(),
            FtpRemoteExists::ResumeNoCheck
        );
        assert_eq!(FtpRemoteExists::Skip.to_no_check(), FtpRemoteExists::NoCheck);
        assert_eq!(
            FtpRemoteExists::Overwrite.to_no_check(),
            FtpRemoteExists::NoCheck
        );
        assert!(FtpRemoteExists::AddToEndNoCheck.is_no_check());
        assert!(!FtpRemoteExists::Resume.is_no_check());
        assert!(FtpRemoteExists::ResumeNoCheck.appends());
        assert!(!FtpRemoteExists::Resume.appends());
    }

    #[test]
    fn job_paths() {
        let job = TransferJob::new(" ", "/b", FtpRemoteExists::Skip, FtpVerify::NONE);
        assert!(matches!(
            job.check_paths(),
            Err(FtpTransferError::InvalidArgument("source path"))
        ));
        let job = TransferJob::new("/a", "/b", FtpRemoteExists::Skip, FtpVerify::NONE);
        assert!(job.check_paths().is_ok());
    }
}
