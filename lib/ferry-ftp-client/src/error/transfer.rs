/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

use super::{FtpCommandError, FtpConnectError};
use crate::control::FtpReply;
use crate::transfer::FtpRemoteExists;

#[derive(Debug, Error)]
pub enum FtpTransferError {
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    #[error("{0} session is not connected")]
    NotConnected(&'static str),
    #[error("source file {0} not found")]
    SourceNotFound(String),
    #[error("exists policy {0:?} is not supported for this transfer")]
    UnsupportedExistsPolicy(FtpRemoteExists),
    #[error("malformed PASV response: {0}")]
    MalformedPassiveReply(FtpReply),
    #[error("command {0} rejected by server: {1}")]
    CommandRejected(&'static str, FtpReply),
    #[error("command failed: {0}")]
    CommandFailed(#[from] FtpCommandError),
    #[error("connect failed: {0}")]
    ConnectFailed(#[from] FtpConnectError),
    #[error("local io failed: {0:?}")]
    LocalIo(#[from] io::Error),
    #[error("data connection failed: {0:?}")]
    DataConnectionFailed(io::Error),
    #[error("invalid listing data: {0}")]
    InvalidListing(&'static str),
    #[error("no usable checksum method for {0}")]
    HashUnsupported(String),
    #[error("checksum verification failed for {0}")]
    VerificationFailed(String),
    #[error("timed out waiting for {0}")]
    TimedOut(&'static str),
    #[error("operation cancelled")]
    Cancelled,
}
