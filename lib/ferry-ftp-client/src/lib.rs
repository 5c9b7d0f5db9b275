/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

mod debug;
pub use debug::{FTP_DEBUG_LOG_LEVEL, FTP_DEBUG_LOG_TARGET};

mod config;
pub use config::{
    FtpClientConfig, FtpControlConfig, FtpDataConnectionType, FtpFxpConfig, FtpTransferConfig,
};

mod error;
pub use error::{
    FtpCommandError, FtpConnectError, FtpFileFactsParseError, FtpRawResponseError,
    FtpTransferError,
};

mod connection;
pub use connection::FtpConnectionProvider;

mod control;
pub use control::FtpReply;

mod feature;
pub use feature::FtpServerFeature;

mod dialect;
pub use dialect::FtpServerDialect;

mod facts;
pub use facts::{FtpFileEntryType, FtpFileFacts};

mod path;

mod session;
pub use session::{
    FtpClientSession, FtpCredentials, FtpServerAddr, FtpSession, FtpSessionExt, FtpSessionState,
    clone_connected,
};

mod channel;
pub use channel::{
    DataChannelDescriptor, FtpDataChannelKind, negotiate_active, negotiate_data_channel,
    negotiate_extended_passive, negotiate_passive,
};

mod hash;
pub use hash::{FtpHash, FtpHashAlgorithm, checksum, local_file_checksum};

mod progress;
pub use progress::{FtpProgress, FtpProgressMeta, FtpProgressReceiver, FtpProgressSink};

mod verify;
pub use verify::FtpVerify;

mod fxp;
pub use fxp::FtpFxpSession;

mod transfer;
pub use transfer::{
    FtpDataType, FtpListItem, FtpObjectType, FtpRemoteExists, FtpStatus, TransferJob,
    download_file, list_directory, list_recursive, transfer_file, upload_file,
};

mod sync;
pub use sync::{
    COMMON_BLACKLISTED_FOLDERS, DownloadDirection, FtpFolderSyncMode, FtpResult, FtpResultOutcome,
    FtpRule, FtpRuleOperator, FtpSyncOptions, FxpDirection, SyncDirection, UploadDirection,
    download_directory, download_files, sync_directory, transfer_directory, upload_directory,
    upload_files,
};

mod blocking;
pub use blocking::BlockingFtpClient;

#[cfg(test)]
mod mock;
