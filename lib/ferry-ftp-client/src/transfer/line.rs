/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::collections::VecDeque;

use log::{debug, trace};
use tokio::io::BufReader;

use super::{
    FtpDataType, FtpListItem, drain_final_reply, finish_data_command, open_data_stream,
};
use crate::channel::negotiate_data_channel;
use crate::control::{FtpCommand, limited_read_until};
use crate::error::FtpTransferError;
use crate::facts::{FtpFileEntryType, FtpFileFacts};
use crate::path;
use crate::session::FtpSession;

/// List one directory with MLSD.
///
/// The `.` and `..` entries and lines that fail to parse are left out.
pub async fn list_directory<S>(
    session: &mut S,
    dir: &str,
) -> Result<Vec<FtpFileFacts>, FtpTransferError>
where
    S: FtpSession,
{
    if !session.is_connected() {
        return Err(FtpTransferError::NotConnected("session"));
    }
    if !session.state().feature().support_mlst() {
        return Err(FtpTransferError::InvalidArgument(
            "server does not support machine listing",
        ));
    }
    let config = session.state().config().transfer.clone();

    let channel =
        negotiate_data_channel(session, FtpDataType::Ascii, config.data_connection_type).await?;
    let cmd = FtpCommand::MLSD;
    let data = open_data_stream(session, &channel, cmd, dir).await?;

    let mut reader = BufReader::new(data);
    let mut entries = Vec::new();
    let mut buf = Vec::with_capacity(256);
    let r = async {
        loop {
            buf.clear();
            let (found, len) =
                limited_read_until(&mut reader, b'\n', config.list_max_line_len, &mut buf)
                    .await
                    .map_err(FtpTransferError::DataConnectionFailed)?;
            if len == 0 {
                break;
            }
            if !found && len >= config.list_max_line_len {
                return Err(FtpTransferError::InvalidListing("line too long"));
            }

            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            match FtpFileFacts::parse_line(line) {
                Ok(facts) => match facts.entry_type() {
                    FtpFileEntryType::CurrentDir | FtpFileEntryType::ParentDir => {}
                    _ => {
                        if entries.len() >= config.list_max_entries {
                            return Err(FtpTransferError::InvalidListing("too many entries"));
                        }
                        entries.push(facts);
                    }
                },
                Err(e) => trace!("ignore listing line {line}: {e}"),
            }
        }
        Ok::<_, FtpTransferError>(())
    }
    .await;
    drop(reader);
    if let Err(e) = r {
        drain_final_reply(session).await;
        return Err(e);
    }

    finish_data_command(session, cmd).await?;
    debug!("listed {} entries in {dir}", entries.len());
    Ok(entries)
}

/// Walk the tree below `dir` breadth first.
///
/// Paths are relative to `dir` and sorted, so a directory always comes
/// before its children.
pub async fn list_recursive<S>(
    session: &mut S,
    dir: &str,
) -> Result<Vec<FtpListItem>, FtpTransferError>
where
    S: FtpSession,
{
    let root = path::normalize_dir(dir);
    let mut items = Vec::new();
    let mut pending = VecDeque::from([String::new()]);

    while let Some(rel_dir) = pending.pop_front() {
        let full = path::join(&root, &rel_dir);
        for facts in list_directory(session, &full).await? {
            let name = path::file_name(facts.entry_path());
            if name.is_empty() {
                continue;
            }
            let rel = path::join(&rel_dir, name);
            if facts.entry_type().is_sub_dir() {
                items.push(FtpListItem::directory(&rel));
                pending.push_back(rel);
            } else if facts.maybe_file() {
                items.push(FtpListItem::file(&rel, facts.size()));
            }
        }
    }

    items.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(items)
}
