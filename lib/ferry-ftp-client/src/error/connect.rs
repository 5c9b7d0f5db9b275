/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;

use thiserror::Error;

use crate::error::FtpCommandError;

#[derive(Debug, Error)]
pub enum FtpConnectError {
    #[error("connect failed: {0:?}")]
    ConnectIoError(io::Error),
    #[error("timed out to connect")]
    ConnectTimedOut,
    #[error("timed out to receive greetings")]
    GreetingTimedOut,
    #[error("greeting failed: {0}")]
    GreetingFailed(FtpCommandError),
    #[error("negotiation failed: {0}")]
    NegotiationFailed(FtpCommandError),
    #[error("login failed: {0}")]
    LoginFailed(FtpCommandError),
    #[error("service not available")]
    ServiceNotAvailable,
    #[error("not logged in")]
    NotLoggedIn,
    #[error("extra account is needed")]
    AccountIsNeeded,
}
