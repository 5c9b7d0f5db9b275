/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::session::FtpServerAddr;

/// Transport seam for [`crate::FtpClientSession`].
///
/// The provider opens both the control and the data connections, so TLS or
/// proxying is entirely up to the implementation. It must be cheap to clone,
/// as every cloned session gets its own copy.
#[async_trait]
pub trait FtpConnectionProvider<T: AsyncRead + AsyncWrite>: Clone + Send {
    async fn new_control_connection(&mut self, server: &FtpServerAddr) -> io::Result<T>;

    /// `addr` is the address announced by the server in its passive reply.
    async fn new_data_connection(&mut self, addr: SocketAddr) -> io::Result<T>;

    /// Bind a listener for an active mode data connection.
    ///
    /// Returns the address the server should connect to.
    async fn listen_data(&mut self) -> io::Result<SocketAddr> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "active data connection is not supported",
        ))
    }

    /// Accept one connection on the listener bound by `listen_data`.
    async fn accept_data(&mut self) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "active data connection is not supported",
        ))
    }

    /// The address of the control connection peer, if known.
    fn peer_addr(&self) -> Option<SocketAddr> {
        None
    }

    fn is_encrypted(&self) -> bool {
        false
    }
}
