/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use log::debug;

use crate::channel::{
    DataChannelDescriptor, announce_active, negotiate_extended_passive, negotiate_passive,
};
use crate::error::FtpTransferError;
use crate::session::{FtpSession, FtpSessionExt, clone_connected};

enum SessionHandle<'a, S> {
    Borrowed(&'a mut S),
    Cloned(S),
}

impl<S: FtpSession> SessionHandle<'_, S> {
    fn get(&mut self) -> &mut S {
        match self {
            SessionHandle::Borrowed(s) => &mut **s,
            SessionHandle::Cloned(s) => s,
        }
    }

    async fn dispose(self) {
        if let SessionHandle::Cloned(mut s) = self {
            s.close().await;
        }
    }
}

async fn open_handle<S: FtpSession>(
    session: &mut S,
) -> Result<SessionHandle<'_, S>, FtpTransferError> {
    if session.state().config().thread_safe_data_channels {
        let clone = clone_connected(session).await?;
        Ok(SessionHandle::Cloned(clone))
    } else {
        Ok(SessionHandle::Borrowed(session))
    }
}

/// PASV on the target, PORT on the source.
async fn negotiate<S, D>(
    source: &mut S,
    target: &mut D,
) -> Result<DataChannelDescriptor, FtpTransferError>
where
    S: FtpSession,
    D: FtpSession,
{
    let config = source.state().config().fxp.clone();

    source.set_data_type(config.data_type).await?;
    let channel = if config.use_epsv {
        negotiate_extended_passive(target, config.data_type).await?
    } else {
        negotiate_passive(target, config.data_type).await?
    };
    debug!(
        "FXP data channel {} <- {}",
        channel.addr(),
        source.state().server()
    );
    announce_active(source, &channel).await?;
    Ok(channel)
}

/// The session group of one server to server transfer.
///
/// The target listens, the source connects out to it, so the data never
/// passes through this process. Must be released with [`Self::dispose`],
/// which closes every session cloned for it.
pub struct FtpFxpSession<'a, S, D>
where
    S: FtpSession,
    D: FtpSession,
{
    source: SessionHandle<'a, S>,
    target: SessionHandle<'a, D>,
    progress: Option<D>,
    channel: DataChannelDescriptor,
}

impl<'a, S, D> FtpFxpSession<'a, S, D>
where
    S: FtpSession,
    D: FtpSession,
{
    /// Set up the data channel between `source` and `target`.
    ///
    /// With `track_progress` a third session to the target is connected to
    /// poll the destination size. Nothing created here outlives an error.
    pub async fn open(
        source: &'a mut S,
        target: &'a mut D,
        track_progress: bool,
    ) -> Result<Self, FtpTransferError> {
        if !source.is_connected() {
            return Err(FtpTransferError::NotConnected("source"));
        }
        if !target.is_connected() {
            return Err(FtpTransferError::NotConnected("target"));
        }

        let mut source = open_handle(source).await?;
        let mut target = match open_handle(target).await {
            Ok(t) => t,
            Err(e) => {
                source.dispose().await;
                return Err(e);
            }
        };

        let channel = match negotiate(source.get(), target.get()).await {
            Ok(c) => c,
            Err(e) => {
                source.dispose().await;
                target.dispose().await;
                return Err(e);
            }
        };

        let progress = if track_progress {
            match clone_connected(target.get()).await {
                Ok(p) => Some(p),
                Err(e) => {
                    source.dispose().await;
                    target.dispose().await;
                    return Err(e);
                }
            }
        } else {
            None
        };

        Ok(FtpFxpSession {
            source,
            target,
            progress,
            channel,
        })
    }

    pub fn source(&mut self) -> &mut S {
        self.source.get()
    }

    pub fn target(&mut self) -> &mut D {
        self.target.get()
    }

    pub fn progress(&mut self) -> Option<&mut D> {
        self.progress.as_mut()
    }

    pub fn channel(&self) -> &DataChannelDescriptor {
        &self.channel
    }

    /// Borrow all sessions at once, for concurrent polling.
    pub(crate) fn parts(&mut self) -> (&mut S, &mut D, Option<&mut D>) {
        (
            self.source.get(),
            self.target.get(),
            self.progress.as_mut(),
        )
    }

    /// Close the sessions cloned for this transfer.
    pub async fn dispose(self) {
        if let Some(mut p) = self.progress {
            p.close().await;
        }
        self.source.dispose().await;
        self.target.dispose().await;
    }
}
