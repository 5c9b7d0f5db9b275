/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpSocket, TcpStream};

use ferry_ftp_client::{FtpConnectionProvider, FtpServerAddr};

#[derive(Clone, Default)]
pub(crate) struct LocalConnectionProvider {
    bind_ip: Option<IpAddr>,
    remote_addr: Option<SocketAddr>,
    /// local end of the control connection, announced for active transfers
    local_addr: Option<SocketAddr>,
    listener: Option<Arc<TcpListener>>,
}

impl LocalConnectionProvider {
    pub(crate) fn set_bind_ip(&mut self, ip: IpAddr) {
        self.bind_ip = Some(ip);
    }

    async fn connect_to(&self, addr: SocketAddr) -> io::Result<TcpStream> {
        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        if let Some(ip) = self.bind_ip {
            socket.bind(SocketAddr::new(ip, 0))?;
        }
        socket.connect(addr).await
    }
}

#[async_trait]
impl FtpConnectionProvider<TcpStream> for LocalConnectionProvider {
    async fn new_control_connection(&mut self, server: &FtpServerAddr) -> io::Result<TcpStream> {
        let mut err = io::Error::new(io::ErrorKind::AddrNotAvailable, "no addr resolved");
        for addr in tokio::net::lookup_host((server.host(), server.port())).await? {
            match self.connect_to(addr).await {
                Ok(stream) => {
                    self.remote_addr = Some(addr);
                    self.local_addr = stream.local_addr().ok();
                    return Ok(stream);
                }
                Err(e) => err = e,
            }
        }

        Err(err)
    }

    async fn new_data_connection(&mut self, addr: SocketAddr) -> io::Result<TcpStream> {
        if self.remote_addr.is_none() {
            return Err(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no resolved upstream addr found",
            ));
        }
        self.connect_to(addr).await
    }

    async fn listen_data(&mut self) -> io::Result<SocketAddr> {
        let Some(local_addr) = self.local_addr else {
            return Err(io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                "no control connection local addr found",
            ));
        };
        let listener = TcpListener::bind(SocketAddr::new(local_addr.ip(), 0)).await?;
        let addr = listener.local_addr()?;
        self.listener = Some(Arc::new(listener));
        Ok(addr)
    }

    async fn accept_data(&mut self) -> io::Result<TcpStream> {
        let Some(listener) = self.listener.take() else {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                "no data listener bound",
            ));
        };
        let (stream, peer) = listener.accept().await?;
        if self.remote_addr.is_some_and(|addr| addr.ip() != peer.ip()) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("data connection from unexpected peer {peer}"),
            ));
        }
        Ok(stream)
    }

    fn peer_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }
}
