/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::path::Path;
use std::sync::Arc;

use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;

use crate::error::{FtpConnectError, FtpTransferError};
use crate::progress::FtpProgressSink;
use crate::session::FtpSession;
use crate::sync::{self, FtpResult, FtpSyncOptions};
use crate::transfer::{self, FtpRemoteExists, FtpStatus};
use crate::verify::FtpVerify;

/// Synchronous front-end driving a session on its own runtime.
///
/// Every call blocks the current thread until the async operation is done,
/// so none of them may be used from inside an async context.
pub struct BlockingFtpClient<S> {
    runtime: Arc<Runtime>,
    session: S,
}

impl<S: FtpSession> BlockingFtpClient<S> {
    /// Create a client with a private current thread runtime.
    pub fn new(session: S) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self::with_runtime(session, Arc::new(runtime)))
    }

    /// Create a client on a runtime shared with other clients.
    ///
    /// Clients taking part in the same FXP transfer must share the runtime.
    pub fn with_runtime(session: S, runtime: Arc<Runtime>) -> Self {
        BlockingFtpClient { runtime, session }
    }

    #[inline]
    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    #[inline]
    pub fn session(&self) -> &S {
        &self.session
    }

    #[inline]
    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn into_session(self) -> S {
        self.session
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    pub fn connect(&mut self) -> Result<(), FtpConnectError> {
        self.runtime.block_on(self.session.connect())
    }

    pub fn close(&mut self) {
        self.runtime.block_on(self.session.close())
    }

    pub fn upload_file(
        &mut self,
        local_path: &Path,
        remote_path: &str,
        create_remote_dir: bool,
        exists: FtpRemoteExists,
        verify: FtpVerify,
        progress: FtpProgressSink<'_>,
    ) -> Result<FtpStatus, FtpTransferError> {
        self.runtime.block_on(transfer::upload_file(
            &mut self.session,
            local_path,
            remote_path,
            create_remote_dir,
            exists,
            verify,
            progress,
        ))
    }

    pub fn download_file(
        &mut self,
        remote_path: &str,
        local_path: &Path,
        create_local_dir: bool,
        exists: FtpRemoteExists,
        verify: FtpVerify,
        progress: FtpProgressSink<'_>,
    ) -> Result<FtpStatus, FtpTransferError> {
        self.runtime.block_on(transfer::download_file(
            &mut self.session,
            remote_path,
            local_path,
            create_local_dir,
            exists,
            verify,
            progress,
        ))
    }

    fn check_shared_runtime<D>(
        &self,
        target: &BlockingFtpClient<D>,
    ) -> Result<(), FtpTransferError> {
        if Arc::ptr_eq(&self.runtime, &target.runtime) {
            Ok(())
        } else {
            Err(FtpTransferError::InvalidArgument("runtime"))
        }
    }

    /// FXP copy from this client's server to the one of `target`.
    #[allow(clippy::too_many_arguments)]
    pub fn transfer_file<D: FtpSession>(
        &mut self,
        source_path: &str,
        target: &mut BlockingFtpClient<D>,
        dest_path: &str,
        create_dest_dir: bool,
        exists: FtpRemoteExists,
        verify: FtpVerify,
        progress: FtpProgressSink<'_>,
    ) -> Result<FtpStatus, FtpTransferError> {
        self.check_shared_runtime(target)?;
        self.runtime.block_on(transfer::transfer_file(
            &mut self.session,
            source_path,
            &mut target.session,
            dest_path,
            create_dest_dir,
            exists,
            verify,
            progress,
        ))
    }

    pub fn upload_directory(
        &mut self,
        local_dir: &Path,
        remote_dir: &str,
        options: &FtpSyncOptions,
        progress: FtpProgressSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<FtpResult>, FtpTransferError> {
        self.runtime.block_on(sync::upload_directory(
            &mut self.session,
            local_dir,
            remote_dir,
            options,
            progress,
            cancel,
        ))
    }

    pub fn download_directory(
        &mut self,
        remote_dir: &str,
        local_dir: &Path,
        options: &FtpSyncOptions,
        progress: FtpProgressSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<FtpResult>, FtpTransferError> {
        self.runtime.block_on(sync::download_directory(
            &mut self.session,
            remote_dir,
            local_dir,
            options,
            progress,
            cancel,
        ))
    }

    pub fn upload_files<P: AsRef<Path>>(
        &mut self,
        local_paths: &[P],
        remote_dir: &str,
        options: &FtpSyncOptions,
        progress: FtpProgressSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<FtpResult>, FtpTransferError> {
        self.runtime.block_on(sync::upload_files(
            &mut self.session,
            local_paths,
            remote_dir,
            options,
            progress,
            cancel,
        ))
    }

    pub fn download_files<P: AsRef<str>>(
        &mut self,
        remote_paths: &[P],
        local_dir: &Path,
        options: &FtpSyncOptions,
        progress: FtpProgressSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<FtpResult>, FtpTransferError> {
        self.runtime.block_on(sync::download_files(
            &mut self.session,
            remote_paths,
            local_dir,
            options,
            progress,
            cancel,
        ))
    }

    pub fn transfer_directory<D: FtpSession>(
        &mut self,
        source_dir: &str,
        target: &mut BlockingFtpClient<D>,
        target_dir: &str,
        options: &FtpSyncOptions,
        progress: FtpProgressSink<'_>,
        cancel: &CancellationToken,
    ) -> Result<Vec<FtpResult>, FtpTransferError> {
        self.check_shared_runtime(target)?;
        self.runtime.block_on(sync::transfer_directory(
            &mut self.session,
            source_dir,
            &mut target.session,
            target_dir,
            options,
            progress,
            cancel,
        ))
    }
}
