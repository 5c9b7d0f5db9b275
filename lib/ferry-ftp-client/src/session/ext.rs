/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use async_trait::async_trait;
use log::debug;

use super::FtpSession;
use crate::control::FtpCommand;
use crate::error::{FtpCommandError, FtpTransferError};
use crate::facts::FtpFileFacts;
use crate::path;
use crate::transfer::{FtpDataType, FtpListItem};

/// Higher level commands built on top of [`FtpSession::execute`].
///
/// Implemented for every session, so dialect and caching rules live in one
/// place for network and in-memory sessions alike.
#[async_trait]
pub trait FtpSessionExt: FtpSession {
    /// Send TYPE unless the session is already in that mode.
    async fn set_data_type(&mut self, data_type: FtpDataType) -> Result<(), FtpTransferError>;

    async fn noop(&mut self) -> Result<(), FtpTransferError>;

    /// `None` if the server could not tell the size.
    async fn file_size(&mut self, path: &str) -> Result<Option<u64>, FtpTransferError>;

    async fn file_exists(&mut self, path: &str) -> Result<bool, FtpTransferError>;

    /// Check with CWD, restoring the working directory afterwards.
    async fn directory_exists(&mut self, path: &str) -> Result<bool, FtpTransferError>;

    /// Create `path` and every missing parent.
    ///
    /// Returns `false` if the directory was already there.
    async fn create_directory(&mut self, path: &str) -> Result<bool, FtpTransferError>;

    async fn delete_file(&mut self, path: &str) -> Result<(), FtpTransferError>;

    async fn working_directory(&mut self) -> Result<String, FtpTransferError>;

    async fn set_working_directory(&mut self, dir: &str) -> Result<(), FtpTransferError>;

    /// All entries below `dir`, with paths relative to it.
    async fn list_recursive(&mut self, dir: &str) -> Result<Vec<FtpListItem>, FtpTransferError>;
}

fn parse_pwd_reply(message: &str) -> Option<String> {
    let start = message.find('"')?;
    let mut dir = String::with_capacity(message.len());
    let mut chars = message[start + 1..].chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            if chars.peek() == Some(&'"') {
                chars.next();
                dir.push('"');
            } else {
                return Some(dir);
            }
        } else {
            dir.push(c);
        }
    }
    None
}

fn parse_size_reply(message: &str) -> Option<u64> {
    message.split_whitespace().next()?.parse().ok()
}

#[async_trait]
impl<S> FtpSessionExt for S
where
    S: FtpSession,
{
    async fn set_data_type(&mut self, data_type: FtpDataType) -> Result<(), FtpTransferError> {
        if self.state().data_type() == Some(data_type) {
            return Ok(());
        }
        let cmd = match data_type {
            FtpDataType::Ascii => FtpCommand::TYPE_A,
            FtpDataType::Binary => FtpCommand::TYPE_I,
        };
        let reply = self.execute(cmd.name()).await?;
        if reply.is_positive_completion() {
            self.state_mut().set_data_type(Some(data_type));
            Ok(())
        } else {
            Err(FtpTransferError::CommandRejected(cmd.name(), reply))
        }
    }

    async fn noop(&mut self) -> Result<(), FtpTransferError> {
        let cmd = FtpCommand::NOOP;
        let reply = self.execute(cmd.name()).await?;
        if reply.is_positive_completion() {
            Ok(())
        } else {
            Err(FtpCommandError::from_reply(cmd.name(), reply).into())
        }
    }

    async fn file_size(&mut self, path: &str) -> Result<Option<u64>, FtpTransferError> {
        let cmd = FtpCommand::SIZE;
        let reply = self.execute(&cmd.line_with(path)).await?;
        match reply.code() {
            213 => parse_size_reply(reply.message())
                .map(Some)
                .ok_or_else(|| FtpCommandError::InvalidReplySyntax(cmd.name(), reply).into()),
            500 | 501 | 502 | 504 | 550 => Ok(None),
            _ => Err(FtpCommandError::from_reply(cmd.name(), reply).into()),
        }
    }

    async fn file_exists(&mut self, path: &str) -> Result<bool, FtpTransferError> {
        let feature = self.state().feature().clone();
        if feature.support_mlst() {
            let cmd = FtpCommand::MLST;
            let reply = self.execute(&cmd.line_with(path)).await?;
            return match reply.code() {
                250 => Ok(reply
                    .lines()
                    .iter()
                    .skip(1)
                    .filter(|l| l.starts_with(' '))
                    .filter_map(|l| FtpFileFacts::parse_line(l).ok())
                    .any(|f| f.maybe_file())),
                450 | 550 => Ok(false),
                _ => Err(FtpCommandError::from_reply(cmd.name(), reply).into()),
            };
        }

        if !feature.support_size() && feature.support_mdtm() {
            let cmd = FtpCommand::MDTM;
            let reply = self.execute(&cmd.line_with(path)).await?;
            return match reply.code() {
                213 => Ok(true),
                550 => Ok(false),
                _ => Err(FtpCommandError::from_reply(cmd.name(), reply).into()),
            };
        }

        Ok(self.file_size(path).await?.is_some())
    }

    async fn directory_exists(&mut self, path: &str) -> Result<bool, FtpTransferError> {
        if path.is_empty() || path == "/" {
            return Ok(true);
        }

        let saved = self.working_directory().await?;
        let cmd = FtpCommand::CWD;
        let reply = self.execute(&cmd.line_with(path)).await?;
        match reply.code() {
            250 | 200 => {
                self.state_mut().set_working_directory(None);
                self.set_working_directory(&saved).await?;
                Ok(true)
            }
            550 => Ok(false),
            _ => Err(FtpCommandError::from_reply(cmd.name(), reply).into()),
        }
    }

    async fn create_directory(&mut self, path: &str) -> Result<bool, FtpTransferError> {
        let target = path.trim_end_matches('/');
        if target.is_empty() || self.directory_exists(target).await? {
            return Ok(false);
        }

        let state = self.state();
        if let Some(cmd) = state.dialect().recursive_mkdir_command(state.feature()) {
            let reply = self.execute(&format!("{cmd} {target}")).await?;
            if reply.is_positive_completion() {
                return Ok(true);
            }
            debug!("{cmd} {target} failed: {reply}, fall back to MKD");
        }

        let cmd = FtpCommand::MKD;
        for dir in path::prefixes(target) {
            let reply = self.execute(&cmd.line_with(&dir)).await?;
            match reply.code() {
                257 | 250 => {}
                // already exists
                521 | 550 if dir != target => {}
                550 => {
                    if !self.directory_exists(&dir).await? {
                        return Err(FtpTransferError::CommandRejected(cmd.name(), reply));
                    }
                }
                _ => return Err(FtpTransferError::CommandRejected(cmd.name(), reply)),
            }
        }
        Ok(true)
    }

    async fn delete_file(&mut self, path: &str) -> Result<(), FtpTransferError> {
        let cmd = FtpCommand::DELE;
        let reply = self.execute(&cmd.line_with(path)).await?;
        match reply.code() {
            200 | 250 => Ok(()),
            _ => Err(FtpTransferError::CommandRejected(cmd.name(), reply)),
        }
    }

    async fn working_directory(&mut self) -> Result<String, FtpTransferError> {
        if let Some(dir) = self.state().cached_working_directory() {
            return Ok(dir.to_string());
        }

        let cmd = FtpCommand::PWD;
        let reply = self.execute(cmd.name()).await?;
        if reply.code() != 257 {
            return Err(FtpCommandError::from_reply(cmd.name(), reply).into());
        }
        let Some(dir) = parse_pwd_reply(reply.message()) else {
            return Err(FtpCommandError::InvalidReplySyntax(cmd.name(), reply).into());
        };
        self.state_mut().set_working_directory(Some(dir.clone()));
        Ok(dir)
    }

    async fn set_working_directory(&mut self, dir: &str) -> Result<(), FtpTransferError> {
        if self.state().cached_working_directory() == Some(dir) {
            return Ok(());
        }

        let cmd = FtpCommand::CWD;
        let reply = self.execute(&cmd.line_with(dir)).await?;
        if !reply.is_positive_completion() {
            return Err(FtpTransferError::CommandRejected(cmd.name(), reply));
        }
        let cached = dir.starts_with('/').then(|| dir.to_string());
        self.state_mut().set_working_directory(cached);
        Ok(())
    }

    async fn list_recursive(&mut self, dir: &str) -> Result<Vec<FtpListItem>, FtpTransferError> {
        crate::transfer::list_recursive(self, dir).await
    }
}
