/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::channel::DataChannelDescriptor;
use crate::config::FtpClientConfig;
use crate::control::FtpReply;
use crate::dialect::FtpServerDialect;
use crate::error::{FtpCommandError, FtpConnectError};
use crate::feature::FtpServerFeature;
use crate::hash::FtpHashAlgorithm;
use crate::transfer::FtpDataType;

mod client;
pub use client::FtpClientSession;

mod clone;
pub use clone::clone_connected;

mod ext;
pub use ext::FtpSessionExt;

const DEFAULT_FTP_PORT: u16 = 21;

/// Host and port of an FTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FtpServerAddr {
    host: String,
    port: u16,
}

impl FtpServerAddr {
    pub fn new<S: Into<String>>(host: S, port: u16) -> Self {
        FtpServerAddr {
            host: host.into(),
            port,
        }
    }

    #[inline]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[inline]
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for FtpServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl From<SocketAddr> for FtpServerAddr {
    fn from(addr: SocketAddr) -> Self {
        FtpServerAddr::new(addr.ip().to_string(), addr.port())
    }
}

impl FromStr for FtpServerAddr {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let s = s.strip_prefix("ftp://").unwrap_or(s);
        let s = s.trim_end_matches('/');
        if s.is_empty() {
            return Err("empty server address");
        }

        if let Some(left) = s.strip_prefix('[') {
            let Some((host, tail)) = left.split_once(']') else {
                return Err("no ending ']' found");
            };
            if IpAddr::from_str(host).is_err() {
                return Err("invalid ipv6 address");
            }
            let port = match tail.strip_prefix(':') {
                Some(p) => u16::from_str(p).map_err(|_| "invalid port")?,
                None if tail.is_empty() => DEFAULT_FTP_PORT,
                None => return Err("invalid trailing characters"),
            };
            return Ok(FtpServerAddr::new(host, port));
        }

        if let Ok(ip) = IpAddr::from_str(s) {
            return Ok(FtpServerAddr::new(ip.to_string(), DEFAULT_FTP_PORT));
        }
        match s.rsplit_once(':') {
            Some((host, port)) => {
                let port = u16::from_str(port).map_err(|_| "invalid port")?;
                if host.is_empty() {
                    return Err("empty host");
                }
                Ok(FtpServerAddr::new(host, port))
            }
            None => Ok(FtpServerAddr::new(s, DEFAULT_FTP_PORT)),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct FtpCredentials {
    username: String,
    password: String,
}

impl FtpCredentials {
    pub fn new<U: Into<String>, P: Into<String>>(username: U, password: P) -> Self {
        FtpCredentials {
            username: username.into(),
            password: password.into(),
        }
    }

    #[inline]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[inline]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl Default for FtpCredentials {
    fn default() -> Self {
        FtpCredentials::new("anonymous", "anonymous@")
    }
}

impl fmt::Debug for FtpCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FtpCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Everything a session knows about itself and its server.
///
/// Only the owning session mutates these caches. A clone starts from the
/// static facts and rebuilds the rest on demand.
#[derive(Debug, Clone)]
pub struct FtpSessionState {
    server: FtpServerAddr,
    credentials: FtpCredentials,
    config: FtpClientConfig,
    encrypted: bool,
    feature: FtpServerFeature,
    dialect: FtpServerDialect,
    data_type: Option<FtpDataType>,
    last_hash_algorithm: Option<FtpHashAlgorithm>,
    working_directory: Option<String>,
    peer_addr: Option<SocketAddr>,
    auto_dispose: bool,
}

impl FtpSessionState {
    pub fn new(
        server: FtpServerAddr,
        credentials: FtpCredentials,
        config: FtpClientConfig,
    ) -> Self {
        FtpSessionState {
            server,
            credentials,
            config,
            encrypted: false,
            feature: FtpServerFeature::default(),
            dialect: FtpServerDialect::default(),
            data_type: None,
            last_hash_algorithm: None,
            working_directory: None,
            peer_addr: None,
            auto_dispose: false,
        }
    }

    /// State for an independent session to the same server.
    ///
    /// Identity, config, dialect and the already known features are copied.
    /// Per-connection caches are left empty.
    pub fn clone_for_new_session(&self) -> Self {
        FtpSessionState {
            server: self.server.clone(),
            credentials: self.credentials.clone(),
            config: self.config.clone(),
            encrypted: false,
            feature: self.feature.clone(),
            dialect: self.dialect,
            data_type: None,
            last_hash_algorithm: None,
            working_directory: None,
            peer_addr: None,
            auto_dispose: false,
        }
    }

    #[inline]
    pub fn server(&self) -> &FtpServerAddr {
        &self.server
    }

    #[inline]
    pub fn credentials(&self) -> &FtpCredentials {
        &self.credentials
    }

    #[inline]
    pub fn config(&self) -> &FtpClientConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut FtpClientConfig {
        &mut self.config
    }

    #[inline]
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    pub(crate) fn set_encrypted(&mut self, encrypted: bool) {
        self.encrypted = encrypted;
    }

    #[inline]
    pub fn feature(&self) -> &FtpServerFeature {
        &self.feature
    }

    pub(crate) fn set_feature(&mut self, feature: FtpServerFeature) {
        self.feature = feature;
    }

    #[inline]
    pub fn dialect(&self) -> FtpServerDialect {
        self.dialect
    }

    pub(crate) fn set_dialect(&mut self, dialect: FtpServerDialect) {
        self.dialect = dialect;
    }

    #[inline]
    pub fn data_type(&self) -> Option<FtpDataType> {
        self.data_type
    }

    pub(crate) fn set_data_type(&mut self, data_type: Option<FtpDataType>) {
        self.data_type = data_type;
    }

    #[inline]
    pub fn last_hash_algorithm(&self) -> Option<FtpHashAlgorithm> {
        self.last_hash_algorithm
    }

    pub(crate) fn set_last_hash_algorithm(&mut self, algorithm: Option<FtpHashAlgorithm>) {
        self.last_hash_algorithm = algorithm;
    }

    /// The cached working directory, `None` until PWD or CWD succeeded.
    #[inline]
    pub fn cached_working_directory(&self) -> Option<&str> {
        self.working_directory.as_deref()
    }

    pub(crate) fn set_working_directory(&mut self, dir: Option<String>) {
        self.working_directory = dir;
    }

    #[inline]
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    pub(crate) fn set_peer_addr(&mut self, addr: Option<SocketAddr>) {
        self.peer_addr = addr;
    }

    /// Set on clones created for a single operation.
    #[inline]
    pub fn auto_dispose(&self) -> bool {
        self.auto_dispose
    }

    pub(crate) fn set_auto_dispose(&mut self, auto_dispose: bool) {
        self.auto_dispose = auto_dispose;
    }

    /// Forget everything learned over the previous control connection.
    pub(crate) fn reset_connection_caches(&mut self) {
        self.data_type = None;
        self.last_hash_algorithm = None;
        self.peer_addr = None;
        self.encrypted = false;
    }
}

/// One logical connection to one FTP server.
///
/// This is the only capability the orchestration layer needs. Network,
/// proxied and in-memory sessions are different implementations of it.
#[async_trait]
pub trait FtpSession: Send {
    type DataStream: AsyncRead + AsyncWrite + Unpin + Send;

    fn state(&self) -> &FtpSessionState;
    fn state_mut(&mut self) -> &mut FtpSessionState;

    fn is_connected(&self) -> bool;

    /// Connect and log in. Reconnects if already connected.
    async fn connect(&mut self) -> Result<(), FtpConnectError>;

    /// Send one command line and wait for its reply.
    async fn execute(&mut self, line: &str) -> Result<FtpReply, FtpCommandError>;

    /// Wait for the next reply without sending anything.
    ///
    /// There is no per-command timeout here, the caller bounds the wait.
    async fn read_reply(&mut self) -> Result<FtpReply, FtpCommandError>;

    /// Open the data connection described by a passive reply.
    async fn connect_data(
        &mut self,
        channel: &DataChannelDescriptor,
    ) -> Result<Self::DataStream, FtpConnectError>;

    /// Start listening for a data connection made by the server.
    ///
    /// Returns the address to announce with PORT or EPRT.
    async fn listen_data(&mut self) -> Result<SocketAddr, FtpConnectError>;

    /// Accept the data connection announced by the last `listen_data`.
    async fn accept_data(&mut self) -> Result<Self::DataStream, FtpConnectError>;

    /// A new, not yet connected, session to the same server.
    fn clone_unconnected(&self) -> Self
    where
        Self: Sized;

    /// Send QUIT if connected and drop the control connection.
    async fn close(&mut self);
}
