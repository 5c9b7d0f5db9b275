/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::config::FtpDataConnectionType;
use crate::control::{FtpCommand, FtpReply};
use crate::error::FtpTransferError;
use crate::session::{FtpSession, FtpSessionExt};
use crate::transfer::FtpDataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FtpDataChannelKind {
    /// negotiated with PASV or CPSV, announced with PORT
    Passive,
    /// negotiated with EPSV, announced with EPRT
    ExtendedPassive,
    /// local listener announced with PORT
    Active,
    /// local listener announced with EPRT
    ExtendedActive,
}

impl FtpDataChannelKind {
    /// Whether the server connects to us.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            FtpDataChannelKind::Active | FtpDataChannelKind::ExtendedActive
        )
    }
}

/// Where a data connection goes, valid for a single transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataChannelDescriptor {
    kind: FtpDataChannelKind,
    addr: SocketAddr,
    data_type: FtpDataType,
}

impl DataChannelDescriptor {
    pub fn new(kind: FtpDataChannelKind, addr: SocketAddr, data_type: FtpDataType) -> Self {
        DataChannelDescriptor {
            kind,
            addr,
            data_type,
        }
    }

    #[inline]
    pub fn kind(&self) -> FtpDataChannelKind {
        self.kind
    }

    #[inline]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    #[inline]
    pub fn data_type(&self) -> FtpDataType {
        self.data_type
    }

    /// The `h1,h2,h3,h4,p1,p2` argument of PORT, IPv4 only.
    pub fn port_argument(&self) -> Option<String> {
        let IpAddr::V4(ip) = self.addr.ip() else {
            return None;
        };
        let [h1, h2, h3, h4] = ip.octets();
        let port = self.addr.port();
        Some(format!(
            "{h1},{h2},{h3},{h4},{},{}",
            port >> 8,
            port & 0xff
        ))
    }

    /// The `|proto|ip|port|` argument of EPRT.
    pub fn eprt_argument(&self) -> String {
        let proto = match self.addr.ip() {
            IpAddr::V4(_) => 1,
            IpAddr::V6(_) => 2,
        };
        format!("|{proto}|{}|{}|", self.addr.ip(), self.addr.port())
    }
}

static PASV_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+),(\d+),(\d+),(\d+),(\d+),(\d+)").unwrap());
static EPSV_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([!-~])([!-~])([!-~])(\d+)([!-~])\)").unwrap());

fn parse_pasv_reply(reply: &FtpReply) -> Option<SocketAddr> {
    let text = reply.text();
    let caps = PASV_REGEX.captures(&text)?;
    let mut v = [0u8; 6];
    for (i, b) in v.iter_mut().enumerate() {
        *b = u8::from_str(caps.get(i + 1)?.as_str()).ok()?;
    }
    let ip = Ipv4Addr::new(v[0], v[1], v[2], v[3]);
    let port = ((v[4] as u16) << 8) | v[5] as u16;
    Some(SocketAddr::new(IpAddr::V4(ip), port))
}

fn parse_epsv_reply(reply: &FtpReply) -> Option<u16> {
    let text = reply.text();
    let caps = EPSV_REGEX.captures(&text)?;
    let delimiter = caps.get(1)?.as_str();
    if caps.get(2)?.as_str() != delimiter
        || caps.get(3)?.as_str() != delimiter
        || caps.get(5)?.as_str() != delimiter
    {
        return None;
    }
    u16::from_str(caps.get(4)?.as_str()).ok().filter(|p| *p != 0)
}

/// Negotiate a passive data channel with PASV, or CPSV if PASV is refused.
pub async fn negotiate_passive<S>(
    session: &mut S,
    data_type: FtpDataType,
) -> Result<DataChannelDescriptor, FtpTransferError>
where
    S: FtpSession,
{
    session.set_data_type(data_type).await?;

    let mut reply = session.execute(FtpCommand::PASV.name()).await?;
    if !reply.is_success() {
        debug!("PASV refused by {}: {reply}, try CPSV", session.state().server());
        let cpsv_reply = session.execute(FtpCommand::CPSV.name()).await?;
        if !cpsv_reply.is_success() {
            return Err(FtpTransferError::CommandRejected(
                FtpCommand::PASV.name(),
                reply,
            ));
        }
        reply = cpsv_reply;
    }

    match parse_pasv_reply(&reply) {
        Some(addr) => Ok(DataChannelDescriptor::new(
            FtpDataChannelKind::Passive,
            addr,
            data_type,
        )),
        None => Err(FtpTransferError::MalformedPassiveReply(reply)),
    }
}

/// Negotiate with EPSV, the address is the one of the control connection.
pub async fn negotiate_extended_passive<S>(
    session: &mut S,
    data_type: FtpDataType,
) -> Result<DataChannelDescriptor, FtpTransferError>
where
    S: FtpSession,
{
    session.set_data_type(data_type).await?;

    let cmd = FtpCommand::EPSV;
    let reply = session.execute(cmd.name()).await?;
    if reply.code() != 229 {
        return Err(FtpTransferError::CommandRejected(cmd.name(), reply));
    }
    let Some(port) = parse_epsv_reply(&reply) else {
        return Err(FtpTransferError::MalformedPassiveReply(reply));
    };

    let state = session.state();
    let ip = match state.peer_addr() {
        Some(addr) => addr.ip(),
        None => IpAddr::from_str(state.server().host())
            .map_err(|_| FtpTransferError::InvalidArgument("server ip for EPSV"))?,
    };
    Ok(DataChannelDescriptor::new(
        FtpDataChannelKind::ExtendedPassive,
        SocketAddr::new(ip, port),
        data_type,
    ))
}

/// Listen for a data connection and announce it with PORT, or EPRT if
/// `extended` is set.
pub async fn negotiate_active<S>(
    session: &mut S,
    data_type: FtpDataType,
    extended: bool,
) -> Result<DataChannelDescriptor, FtpTransferError>
where
    S: FtpSession,
{
    session.set_data_type(data_type).await?;

    let addr = session.listen_data().await?;
    let kind = if extended {
        FtpDataChannelKind::ExtendedActive
    } else {
        FtpDataChannelKind::Active
    };
    let channel = DataChannelDescriptor::new(kind, addr, data_type);
    announce_active(session, &channel).await?;
    Ok(channel)
}

/// Negotiate the data channel the way `connection_type` asks for.
pub async fn negotiate_data_channel<S>(
    session: &mut S,
    data_type: FtpDataType,
    connection_type: FtpDataConnectionType,
) -> Result<DataChannelDescriptor, FtpTransferError>
where
    S: FtpSession,
{
    match connection_type {
        FtpDataConnectionType::Pasv => negotiate_passive(session, data_type).await,
        FtpDataConnectionType::Epsv => negotiate_extended_passive(session, data_type).await,
        FtpDataConnectionType::Port => negotiate_active(session, data_type, false).await,
        FtpDataConnectionType::Eprt => negotiate_active(session, data_type, true).await,
        FtpDataConnectionType::AutoPassive => {
            if session.state().feature().support_epsv() {
                match negotiate_extended_passive(session, data_type).await {
                    Ok(d) => return Ok(d),
                    Err(FtpTransferError::CommandRejected(_, reply)) => {
                        debug!("EPSV refused: {reply}, fall back to PASV");
                    }
                    Err(e) => return Err(e),
                }
            }
            negotiate_passive(session, data_type).await
        }
    }
}

/// Tell `session` to connect to `channel` with PORT or EPRT.
pub(crate) async fn announce_active<S>(
    session: &mut S,
    channel: &DataChannelDescriptor,
) -> Result<(), FtpTransferError>
where
    S: FtpSession,
{
    let (cmd, arg) = match channel.kind() {
        FtpDataChannelKind::Passive | FtpDataChannelKind::Active => {
            match channel.port_argument() {
                Some(arg) => (FtpCommand::PORT, arg),
                None => (FtpCommand::EPRT, channel.eprt_argument()),
            }
        }
        FtpDataChannelKind::ExtendedPassive | FtpDataChannelKind::ExtendedActive => {
            (FtpCommand::EPRT, channel.eprt_argument())
        }
    };
    let reply = session.execute(&cmd.line_with(&arg)).await?;
    if reply.is_positive_completion() {
        Ok(())
    } else {
        Err(FtpTransferError::CommandRejected(cmd.name(), reply))
    }
}
