/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};

use crate::FtpControlConfig;
use crate::error::FtpCommandError;
use crate::feature::FtpServerFeature;

mod command;
pub(crate) use command::FtpCommand;

mod response;
pub(crate) use response::limited_read_until;
pub use response::FtpReply;

pub(crate) enum FtpAuthStatus {
    NotLoggedIn,
    LoggedIn,
    NeedPassword,
    NeedAccount,
}

pub(crate) struct FtpControlChannel<T>
where
    T: AsyncRead + AsyncWrite,
{
    config: FtpControlConfig,
    stream: BufStream<T>,
}

impl<T> FtpControlChannel<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    pub(crate) fn new(stream: T, config: FtpControlConfig) -> Self {
        FtpControlChannel {
            config,
            stream: BufStream::new(stream),
        }
    }

    pub(crate) async fn send_line(&mut self, line: &str) -> Result<(), FtpCommandError> {
        #[cfg(feature = "log-raw-io")]
        crate::debug::log_cmd(line);

        let mut buf: Vec<u8> = Vec::with_capacity(line.len() + 2);
        buf.extend_from_slice(line.as_bytes());
        buf.extend_from_slice(b"\r\n");

        self.stream
            .write_all(&buf)
            .await
            .map_err(FtpCommandError::SendFailed)?;
        self.stream
            .flush()
            .await
            .map_err(FtpCommandError::SendFailed)
    }

    pub(crate) async fn execute(&mut self, line: &str) -> Result<FtpReply, FtpCommandError> {
        self.send_line(line).await?;
        let reply = self.timed_read_reply("execute command").await?;
        Ok(reply)
    }

    pub(crate) async fn wait_greetings(&mut self) -> Result<FtpReply, FtpCommandError> {
        loop {
            let reply = self.read_reply().await?;
            return match reply.code() {
                120 => continue,
                220 => Ok(reply),
                421 => Err(FtpCommandError::ServiceNotAvailable),
                _ => Err(FtpCommandError::UnexpectedReply(
                    FtpCommand::GREETING.name(),
                    reply,
                )),
            };
        }
    }

    /// Returns `None` if the server does not implement FEAT.
    pub(crate) async fn check_server_feature(
        &mut self,
    ) -> Result<Option<FtpServerFeature>, FtpCommandError> {
        let cmd = FtpCommand::FEAT;
        self.send_line(cmd.name()).await?;

        let reply = self.timed_read_reply("check server feature").await?;
        match reply.code() {
            500 | 501 | 502 => Ok(None),
            211 => {
                let mut feature = FtpServerFeature::default();
                for line in reply.lines().iter().skip(1) {
                    if !line.starts_with(' ') {
                        break;
                    }
                    feature.parse_and_set(line.trim());
                }
                Ok(Some(feature))
            }
            _ => Err(FtpCommandError::from_reply(cmd.name(), reply)),
        }
    }

    pub(crate) async fn set_use_utf8(&mut self) -> Result<bool, FtpCommandError> {
        let cmd = FtpCommand::OPTS_UTF8_ON;
        let reply = self.execute(cmd.name()).await?;
        match reply.code() {
            500 | 501 | 502 | 504 => Ok(false),
            200 | 202 => Ok(true),
            _ => Err(FtpCommandError::from_reply(cmd.name(), reply)),
        }
    }

    pub(crate) async fn send_username(
        &mut self,
        username: &str,
    ) -> Result<FtpAuthStatus, FtpCommandError> {
        let cmd = FtpCommand::USER;
        let reply = self.execute(&cmd.line_with(username)).await?;
        match reply.code() {
            530 => Ok(FtpAuthStatus::NotLoggedIn),
            230 => Ok(FtpAuthStatus::LoggedIn),
            331 => Ok(FtpAuthStatus::NeedPassword),
            332 => Ok(FtpAuthStatus::NeedAccount),
            _ => Err(FtpCommandError::from_reply(cmd.name(), reply)),
        }
    }

    pub(crate) async fn send_password(
        &mut self,
        password: &str,
    ) -> Result<FtpAuthStatus, FtpCommandError> {
        let cmd = FtpCommand::PASS;
        let reply = self.execute(&cmd.line_with(password)).await?;
        match reply.code() {
            530 => Ok(FtpAuthStatus::NotLoggedIn),
            202 | 230 => Ok(FtpAuthStatus::LoggedIn),
            332 => Ok(FtpAuthStatus::NeedAccount),
            _ => Err(FtpCommandError::from_reply(cmd.name(), reply)),
        }
    }

    pub(crate) async fn send_quit(&mut self) -> Result<(), FtpCommandError> {
        let cmd = FtpCommand::QUIT;
        let reply = self.execute(cmd.name()).await?;
        match reply.code() {
            221 => Ok(()),
            _ => Err(FtpCommandError::from_reply(cmd.name(), reply)),
        }
    }
}
