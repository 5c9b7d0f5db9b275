/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use log::debug;

use super::{FtpSession, FtpSessionExt};
use crate::error::FtpTransferError;

/// Clone `session`, connect the clone and move it to the same directory.
///
/// The clone is marked auto-dispose. If anything fails after the clone got
/// connected it is closed before the error is returned.
pub async fn clone_connected<S>(session: &mut S) -> Result<S, FtpTransferError>
where
    S: FtpSession,
{
    let cwd = if session.is_connected() {
        Some(session.working_directory().await?)
    } else {
        session.state().cached_working_directory().map(str::to_string)
    };

    let mut clone = session.clone_unconnected();
    clone.state_mut().set_auto_dispose(true);
    clone.connect().await?;
    debug!("cloned session to {}", clone.state().server());

    if let Some(dir) = cwd {
        if let Err(e) = clone.set_working_directory(&dir).await {
            clone.close().await;
            return Err(e);
        }
    }
    Ok(clone)
}
