/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::marker::PhantomData;
use std::net::SocketAddr;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncWrite};

use super::{FtpCredentials, FtpServerAddr, FtpSession, FtpSessionState};
use crate::channel::DataChannelDescriptor;
use crate::config::FtpClientConfig;
use crate::connection::FtpConnectionProvider;
use crate::control::{FtpAuthStatus, FtpControlChannel, FtpReply};
use crate::dialect::FtpServerDialect;
use crate::error::{FtpCommandError, FtpConnectError};

/// A session over real control and data connections.
pub struct FtpClientSession<CP, T>
where
    CP: FtpConnectionProvider<T>,
    T: AsyncRead + AsyncWrite,
{
    provider: CP,
    state: FtpSessionState,
    control: Option<FtpControlChannel<T>>,
    _stream: PhantomData<fn() -> T>,
}

impl<CP, T> FtpClientSession<CP, T>
where
    CP: FtpConnectionProvider<T>,
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(
        provider: CP,
        server: FtpServerAddr,
        credentials: FtpCredentials,
        config: FtpClientConfig,
    ) -> Self {
        FtpClientSession {
            provider,
            state: FtpSessionState::new(server, credentials, config),
            control: None,
            _stream: PhantomData,
        }
    }

    fn from_state(provider: CP, state: FtpSessionState) -> Self {
        FtpClientSession {
            provider,
            state,
            control: None,
            _stream: PhantomData,
        }
    }

    async fn login(
        control: &mut FtpControlChannel<T>,
        credentials: &FtpCredentials,
    ) -> Result<(), FtpConnectError> {
        let status = control
            .send_username(credentials.username())
            .await
            .map_err(FtpConnectError::LoginFailed)?;
        let status = match status {
            FtpAuthStatus::NeedPassword => control
                .send_password(credentials.password())
                .await
                .map_err(FtpConnectError::LoginFailed)?,
            s => s,
        };
        match status {
            FtpAuthStatus::LoggedIn => Ok(()),
            FtpAuthStatus::NotLoggedIn | FtpAuthStatus::NeedPassword => {
                Err(FtpConnectError::NotLoggedIn)
            }
            FtpAuthStatus::NeedAccount => Err(FtpConnectError::AccountIsNeeded),
        }
    }

    async fn open_control(&mut self) -> Result<FtpControlChannel<T>, FtpConnectError> {
        let config = self.state.config().clone();

        let stream = tokio::time::timeout(
            config.connect_timeout,
            self.provider.new_control_connection(self.state.server()),
        )
        .await
        .map_err(|_| FtpConnectError::ConnectTimedOut)?
        .map_err(FtpConnectError::ConnectIoError)?;
        let mut control = FtpControlChannel::new(stream, config.control.clone());

        let greeting = tokio::time::timeout(config.greeting_timeout, control.wait_greetings())
            .await
            .map_err(|_| FtpConnectError::GreetingTimedOut)?
            .map_err(|e| match e {
                FtpCommandError::ServiceNotAvailable => FtpConnectError::ServiceNotAvailable,
                e => FtpConnectError::GreetingFailed(e),
            })?;
        let dialect = FtpServerDialect::detect(&greeting.text());
        debug!("server {} detected as {dialect}", self.state.server());
        self.state.set_dialect(dialect);

        let feature = match control
            .check_server_feature()
            .await
            .map_err(FtpConnectError::NegotiationFailed)?
        {
            Some(mut f) => {
                f.merge(&dialect.assumed_features());
                f
            }
            None => dialect.assumed_features(),
        };
        if feature.support_utf8() {
            control
                .set_use_utf8()
                .await
                .map_err(FtpConnectError::NegotiationFailed)?;
        }

        Self::login(&mut control, self.state.credentials()).await?;

        self.state.reset_connection_caches();
        self.state.set_last_hash_algorithm(feature.current_hash_algorithm());
        self.state.set_feature(feature);
        self.state.set_encrypted(self.provider.is_encrypted());
        self.state.set_peer_addr(self.provider.peer_addr());
        Ok(control)
    }
}

#[async_trait]
impl<CP, T> FtpSession for FtpClientSession<CP, T>
where
    CP: FtpConnectionProvider<T> + Send,
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    type DataStream = T;

    fn state(&self) -> &FtpSessionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FtpSessionState {
        &mut self.state
    }

    fn is_connected(&self) -> bool {
        self.control.is_some()
    }

    async fn connect(&mut self) -> Result<(), FtpConnectError> {
        if self.control.is_some() {
            self.close().await;
        }
        let control = self.open_control().await?;
        self.control = Some(control);
        Ok(())
    }

    async fn execute(&mut self, line: &str) -> Result<FtpReply, FtpCommandError> {
        let Some(control) = &mut self.control else {
            return Err(FtpCommandError::NotConnected);
        };
        match control.execute(line).await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                if matches!(e, FtpCommandError::SendFailed(_) | FtpCommandError::RecvFailed(_)) {
                    self.control = None;
                }
                Err(e)
            }
        }
    }

    async fn read_reply(&mut self) -> Result<FtpReply, FtpCommandError> {
        let Some(control) = &mut self.control else {
            return Err(FtpCommandError::NotConnected);
        };
        match control.read_reply().await {
            Ok(reply) => Ok(reply),
            Err(e) => {
                self.control = None;
                Err(e.into())
            }
        }
    }

    async fn connect_data(
        &mut self,
        channel: &DataChannelDescriptor,
    ) -> Result<T, FtpConnectError> {
        let timeout = self.state.config().connect_timeout;
        tokio::time::timeout(timeout, self.provider.new_data_connection(channel.addr()))
            .await
            .map_err(|_| FtpConnectError::ConnectTimedOut)?
            .map_err(FtpConnectError::ConnectIoError)
    }

    async fn listen_data(&mut self) -> Result<SocketAddr, FtpConnectError> {
        self.provider
            .listen_data()
            .await
            .map_err(FtpConnectError::ConnectIoError)
    }

    async fn accept_data(&mut self) -> Result<T, FtpConnectError> {
        let timeout = self.state.config().connect_timeout;
        tokio::time::timeout(timeout, self.provider.accept_data())
            .await
            .map_err(|_| FtpConnectError::ConnectTimedOut)?
            .map_err(FtpConnectError::ConnectIoError)
    }

    fn clone_unconnected(&self) -> Self {
        FtpClientSession::from_state(self.provider.clone(), self.state.clone_for_new_session())
    }

    async fn close(&mut self) {
        if let Some(mut control) = self.control.take() {
            if let Err(e) = control.send_quit().await {
                warn!("QUIT to {} failed: {e}", self.state.server());
            }
        }
        self.state.set_working_directory(None);
        self.state.reset_connection_caches();
    }
}
