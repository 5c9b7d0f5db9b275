/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::collections::VecDeque;
use std::io;
use std::path::Path;

use async_trait::async_trait;

use super::SyncDirection;
use crate::error::FtpTransferError;
use crate::path;
use crate::progress::FtpProgressSink;
use crate::session::{FtpSession, FtpSessionExt};
use crate::transfer::{self, FtpListItem, FtpRemoteExists, FtpStatus};
use crate::verify::FtpVerify;

async fn local_dir_exists(dir: &str) -> Result<bool, FtpTransferError> {
    match tokio::fs::metadata(dir).await {
        Ok(m) => Ok(m.is_dir()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

async fn create_local_dir(dir: &str) -> Result<bool, FtpTransferError> {
    if local_dir_exists(dir).await? {
        return Ok(false);
    }
    tokio::fs::create_dir_all(dir).await?;
    Ok(true)
}

/// Walk a local tree breadth first, symlinks are not followed.
async fn list_local(root: &str) -> Result<Vec<FtpListItem>, FtpTransferError> {
    let mut items = Vec::new();
    let mut pending = VecDeque::from([String::new()]);

    while let Some(rel_dir) = pending.pop_front() {
        let mut entries = tokio::fs::read_dir(path::join(root, &rel_dir)).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let rel = path::join(&rel_dir, &name.to_string_lossy());
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                items.push(FtpListItem::directory(&rel));
                pending.push_back(rel);
            } else if file_type.is_file() {
                let size = entry.metadata().await?.len();
                items.push(FtpListItem::file(&rel, Some(size)));
            }
        }
    }

    items.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(items)
}

/// Local source, remote destination.
pub struct UploadDirection<'a, S> {
    session: &'a mut S,
}

impl<'a, S: FtpSession> UploadDirection<'a, S> {
    pub fn new(session: &'a mut S) -> Self {
        UploadDirection { session }
    }
}

#[async_trait]
impl<S: FtpSession> SyncDirection for UploadDirection<'_, S> {
    async fn source_dir_exists(&mut self, dir: &str) -> Result<bool, FtpTransferError> {
        local_dir_exists(dir).await
    }

    async fn list_source(&mut self, root: &str) -> Result<Vec<FtpListItem>, FtpTransferError> {
        list_local(root).await
    }

    async fn dest_dir_exists(&mut self, dir: &str) -> Result<bool, FtpTransferError> {
        self.session.directory_exists(dir).await
    }

    async fn create_dest_dir(&mut self, dir: &str) -> Result<bool, FtpTransferError> {
        self.session.create_directory(dir).await
    }

    async fn list_dest(&mut self, root: &str) -> Result<Vec<FtpListItem>, FtpTransferError> {
        self.session.list_recursive(root).await
    }

    async fn delete_dest_file(&mut self, file: &str) -> Result<(), FtpTransferError> {
        self.session.delete_file(file).await
    }

    async fn transfer_file(
        &mut self,
        source: &str,
        dest: &str,
        exists: FtpRemoteExists,
        verify: FtpVerify,
        progress: FtpProgressSink<'_>,
    ) -> Result<FtpStatus, FtpTransferError> {
        transfer::upload_file(
            &mut *self.session,
            Path::new(source),
            dest,
            false,
            exists,
            verify,
            progress,
        )
        .await
    }
}

/// Remote source, local destination.
pub struct DownloadDirection<'a, S> {
    session: &'a mut S,
}

impl<'a, S: FtpSession> DownloadDirection<'a, S> {
    pub fn new(session: &'a mut S) -> Self {
        DownloadDirection { session }
    }
}

#[async_trait]
impl<S: FtpSession> SyncDirection for DownloadDirection<'_, S> {
    async fn source_dir_exists(&mut self, dir: &str) -> Result<bool, FtpTransferError> {
        self.session.directory_exists(dir).await
    }

    async fn list_source(&mut self, root: &str) -> Result<Vec<FtpListItem>, FtpTransferError> {
        self.session.list_recursive(root).await
    }

    async fn dest_dir_exists(&mut self, dir: &str) -> Result<bool, FtpTransferError> {
        local_dir_exists(dir).await
    }

    async fn create_dest_dir(&mut self, dir: &str) -> Result<bool, FtpTransferError> {
        create_local_dir(dir).await
    }

    async fn list_dest(&mut self, root: &str) -> Result<Vec<FtpListItem>, FtpTransferError> {
        list_local(root).await
    }

    async fn delete_dest_file(&mut self, file: &str) -> Result<(), FtpTransferError> {
        tokio::fs::remove_file(file).await?;
        Ok(())
    }

    async fn transfer_file(
        &mut self,
        source: &str,
        dest: &str,
        exists: FtpRemoteExists,
        verify: FtpVerify,
        progress: FtpProgressSink<'_>,
    ) -> Result<FtpStatus, FtpTransferError> {
        transfer::download_file(
            &mut *self.session,
            source,
            Path::new(dest),
            false,
            exists,
            verify,
            progress,
        )
        .await
    }
}

/// Server to server with FXP.
pub struct FxpDirection<'a, S, D> {
    source: &'a mut S,
    target: &'a mut D,
}

impl<'a, S: FtpSession, D: FtpSession> FxpDirection<'a, S, D> {
    pub fn new(source: &'a mut S, target: &'a mut D) -> Self {
        FxpDirection { source, target }
    }
}

#[async_trait]
impl<S: FtpSession, D: FtpSession> SyncDirection for FxpDirection<'_, S, D> {
    async fn source_dir_exists(&mut self, dir: &str) -> Result<bool, FtpTransferError> {
        self.source.directory_exists(dir).await
    }

    async fn list_source(&mut self, root: &str) -> Result<Vec<FtpListItem>, FtpTransferError> {
        self.source.list_recursive(root).await
    }

    async fn dest_dir_exists(&mut self, dir: &str) -> Result<bool, FtpTransferError> {
        self.target.directory_exists(dir).await
    }

    async fn create_dest_dir(&mut self, dir: &str) -> Result<bool, FtpTransferError> {
        self.target.create_directory(dir).await
    }

    async fn list_dest(&mut self, root: &str) -> Result<Vec<FtpListItem>, FtpTransferError> {
        self.target.list_recursive(root).await
    }

    async fn delete_dest_file(&mut self, file: &str) -> Result<(), FtpTransferError> {
        self.target.delete_file(file).await
    }

    async fn transfer_file(
        &mut self,
        source: &str,
        dest: &str,
        exists: FtpRemoteExists,
        verify: FtpVerify,
        progress: FtpProgressSink<'_>,
    ) -> Result<FtpStatus, FtpTransferError> {
        transfer::transfer_file(
            &mut *self.source,
            source,
            &mut *self.target,
            dest,
            false,
            exists,
            verify,
            progress,
        )
        .await
    }
}
