/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

use super::FtpRawResponseError;
use crate::control::FtpReply;

#[derive(Debug, Error)]
pub enum FtpCommandError {
    #[error("control connection is not open")]
    NotConnected,
    #[error("unable to send command: {0:?}")]
    SendFailed(io::Error),
    #[error("unable to recv reply: {0}")]
    RecvFailed(#[from] FtpRawResponseError),
    #[error("service not available")]
    ServiceNotAvailable,
    #[error("not logged in")]
    NotLoggedIn,
    #[error("unexpected reply to {0}: {1}")]
    UnexpectedReply(&'static str, FtpReply),
    #[error("invalid reply syntax to {0}: {1}")]
    InvalidReplySyntax(&'static str, FtpReply),
}

impl FtpCommandError {
    /// Map the reply codes every command shares, keeping the reply otherwise.
    pub(crate) fn from_reply(cmd: &'static str, reply: FtpReply) -> Self {
        match reply.code() {
            421 => FtpCommandError::ServiceNotAvailable,
            530 => FtpCommandError::NotLoggedIn,
            _ => FtpCommandError::UnexpectedReply(cmd, reply),
        }
    }
}
