/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

//! An in-memory FTP server for the orchestration tests.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::atomic::{AtomicU16, AtomicU32, Ordering};
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

use crate::FtpClientConfig;
use crate::channel::DataChannelDescriptor;
use crate::control::FtpReply;
use crate::error::{FtpCommandError, FtpConnectError, FtpRawResponseError};
use crate::feature::FtpServerFeature;
use crate::hash::{FtpHashAlgorithm, checksum_bytes};
use crate::path;
use crate::session::{FtpCredentials, FtpServerAddr, FtpSession, FtpSessionState};

const DEFAULT_FEAT: &[&str] = &[
    "SIZE",
    "MDTM",
    "REST STREAM",
    "MLST type*;size*;modify*;",
    "UTF8",
];
const DATA_BUFFER_SIZE: usize = 4 << 20;

static NEXT_IP: AtomicU32 = AtomicU32::new(1);
static NEXT_PORT: AtomicU16 = AtomicU16::new(20000);
static NEXT_LISTEN_PORT: AtomicU16 = AtomicU16::new(40000);
const CLIENT_IP: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);

/// Data pushed by an FXP source, keyed by the passive address of the target.
static FXP_LINKS: LazyLock<Mutex<HashMap<SocketAddr, Option<Vec<u8>>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn links() -> MutexGuard<'static, HashMap<SocketAddr, Option<Vec<u8>>>> {
    FXP_LINKS.lock().unwrap()
}

fn command_matches(line: &str, prefix: &str) -> bool {
    line == prefix
        || line
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with(' '))
}

fn normalize(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for seg in path::segments(path) {
        match seg {
            "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

#[derive(Default)]
struct MockFs {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
}

impl MockFs {
    fn is_dir(&self, path: &str) -> bool {
        path == "/" || self.dirs.contains(path)
    }

    fn create_dirs(&mut self, path: &str) {
        for p in path::prefixes(path) {
            self.dirs.insert(p);
        }
    }

    fn parent_exists(&self, path: &str) -> bool {
        path::parent(path).is_none_or(|p| self.is_dir(p))
    }

    /// Direct children of `dir` as MLSD lines.
    fn listing(&self, dir: &str) -> Vec<String> {
        let mut lines = vec!["type=cdir;modify=20240101000000; .".to_string()];
        for d in &self.dirs {
            if path::parent(d) == Some(dir) {
                lines.push(format!(
                    "type=dir;modify=20240101000000; {}",
                    path::file_name(d)
                ));
            }
        }
        for (f, data) in &self.files {
            if path::parent(f) == Some(dir) {
                lines.push(format!(
                    "type=file;size={};modify=20240101000000; {}",
                    data.len(),
                    path::file_name(f)
                ));
            }
        }
        lines
    }
}

struct MockShared {
    ip: IpAddr,
    feat: Vec<String>,
    fs: MockFs,
    commands: Vec<String>,
    replies: Vec<(String, u16, String)>,
    connects: usize,
    quits: usize,
    closed: HashMap<usize, usize>,
    refuse_connections: bool,
    corrupt_uploads: bool,
    transfer_delay: Duration,
    transfer_result: Option<(u16, String)>,
}

/// Handle to one in-memory server, shared by all sessions to it.
#[derive(Clone)]
pub(crate) struct MockServer {
    shared: Arc<Mutex<MockShared>>,
}

impl MockServer {
    pub(crate) fn new() -> Self {
        Self::with_feat(DEFAULT_FEAT)
    }

    pub(crate) fn with_feat(feat: &[&str]) -> Self {
        let n = NEXT_IP.fetch_add(1, Ordering::Relaxed);
        let ip = IpAddr::V4(Ipv4Addr::new(10, 0, (n >> 8) as u8, (n & 0xff) as u8));
        MockServer {
            shared: Arc::new(Mutex::new(MockShared {
                ip,
                feat: feat.iter().map(|s| s.to_string()).collect(),
                fs: MockFs::default(),
                commands: Vec::new(),
                replies: Vec::new(),
                connects: 0,
                quits: 0,
                closed: HashMap::new(),
                refuse_connections: false,
                corrupt_uploads: false,
                transfer_delay: Duration::ZERO,
                transfer_result: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockShared> {
        self.shared.lock().unwrap()
    }

    pub(crate) fn ip(&self) -> IpAddr {
        self.lock().ip
    }

    pub(crate) fn add_file(&self, path: &str, data: &[u8]) {
        let path = normalize(path);
        let mut shared = self.lock();
        if let Some(parent) = path::parent(&path) {
            shared.fs.create_dirs(parent);
        }
        shared.fs.files.insert(path, data.to_vec());
    }

    pub(crate) fn add_dir(&self, path: &str) {
        self.lock().fs.create_dirs(&normalize(path));
    }

    pub(crate) fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().fs.files.get(&normalize(path)).cloned()
    }

    pub(crate) fn has_dir(&self, path: &str) -> bool {
        self.lock().fs.is_dir(&normalize(path))
    }

    /// Number of received commands with this command word(s).
    pub(crate) fn count_command(&self, prefix: &str) -> usize {
        self.lock()
            .commands
            .iter()
            .filter(|l| command_matches(l, prefix))
            .count()
    }

    pub(crate) fn commands(&self) -> Vec<String> {
        self.lock().commands.clone()
    }

    pub(crate) fn connect_count(&self) -> usize {
        self.lock().connects
    }

    pub(crate) fn quit_count(&self) -> usize {
        self.lock().quits
    }

    /// Close count per connection.
    pub(crate) fn closed_sessions(&self) -> HashMap<usize, usize> {
        self.lock().closed.clone()
    }

    /// Answer every command with this command word(s) with a fixed reply.
    pub(crate) fn set_reply(&self, prefix: &str, code: u16, message: &str) {
        let mut shared = self.lock();
        shared.replies.retain(|(p, _, _)| p != prefix);
        shared
            .replies
            .push((prefix.to_string(), code, message.to_string()));
    }

    pub(crate) fn clear_reply(&self, prefix: &str) {
        self.lock().replies.retain(|(p, _, _)| p != prefix);
    }

    pub(crate) fn set_refuse_connections(&self, refuse: bool) {
        self.lock().refuse_connections = refuse;
    }

    /// Flip the first byte of every stored upload.
    pub(crate) fn set_corrupt_uploads(&self, corrupt: bool) {
        self.lock().corrupt_uploads = corrupt;
    }

    /// Delay before the final reply of every data transfer.
    pub(crate) fn set_transfer_delay(&self, delay: Duration) {
        self.lock().transfer_delay = delay;
    }

    /// Final reply of every data transfer.
    pub(crate) fn set_transfer_result(&self, code: u16, message: &str) {
        self.lock().transfer_result = Some((code, message.to_string()));
    }

    pub(crate) fn session(&self) -> MockSession {
        let ip = self.ip();
        MockSession {
            server: self.clone(),
            state: FtpSessionState::new(
                FtpServerAddr::new(ip.to_string(), 21),
                FtpCredentials::default(),
                FtpClientConfig::default(),
            ),
            id: None,
            cwd: "/".to_string(),
            rest: 0,
            hash: None,
            passive: None,
            active: None,
            data: None,
            listening: None,
            accepted: None,
            upload: None,
            pending: VecDeque::new(),
        }
    }

    pub(crate) async fn connected_session(&self) -> MockSession {
        let mut session = self.session();
        session.connect().await.unwrap();
        session
    }

    fn store(&self, path: &str, append: bool, mut data: Vec<u8>) {
        let mut shared = self.lock();
        if shared.corrupt_uploads {
            match data.first_mut() {
                Some(b) => *b ^= 0xff,
                None => data.push(0),
            }
        }
        let file = shared.fs.files.entry(path.to_string()).or_default();
        if !append {
            file.clear();
        }
        file.extend_from_slice(&data);
    }

    fn final_reply(&self) -> FtpReply {
        match &self.lock().transfer_result {
            Some((code, msg)) => FtpReply::new(*code, msg.as_str()),
            None => FtpReply::new(226, "Transfer complete"),
        }
    }
}

struct PendingUpload {
    path: String,
    append: bool,
    stream: DuplexStream,
}

pub(crate) struct MockSession {
    server: MockServer,
    state: FtpSessionState,
    id: Option<usize>,
    cwd: String,
    rest: u64,
    hash: Option<FtpHashAlgorithm>,
    passive: Option<SocketAddr>,
    active: Option<SocketAddr>,
    data: Option<DuplexStream>,
    /// address handed out by `listen_data`
    listening: Option<SocketAddr>,
    /// client end of an active data connection, for `accept_data`
    accepted: Option<DuplexStream>,
    upload: Option<PendingUpload>,
    /// replies to be read after the one of the current command
    pending: VecDeque<FtpReply>,
}

fn parse_port_argument(arg: &str) -> Option<SocketAddr> {
    let v: Vec<u8> = arg
        .split(',')
        .map(|s| u8::from_str(s.trim()).ok())
        .collect::<Option<_>>()?;
    if v.len() != 6 {
        return None;
    }
    let ip = Ipv4Addr::new(v[0], v[1], v[2], v[3]);
    Some(SocketAddr::new(
        IpAddr::V4(ip),
        ((v[4] as u16) << 8) | v[5] as u16,
    ))
}

fn parse_eprt_argument(arg: &str) -> Option<SocketAddr> {
    let mut parts = arg.split('|');
    parts.next()?;
    parts.next()?;
    let ip = IpAddr::from_str(parts.next()?).ok()?;
    let port = u16::from_str(parts.next()?).ok()?;
    Some(SocketAddr::new(ip, port))
}

impl MockSession {
    fn resolve(&self, arg: &str) -> String {
        if arg.starts_with('/') {
            normalize(arg)
        } else {
            normalize(&path::join(&self.cwd, arg))
        }
    }

    fn open_passive(&mut self) -> SocketAddr {
        let port = NEXT_PORT.fetch_add(1, Ordering::Relaxed);
        let addr = SocketAddr::new(self.server.ip(), port);
        links().insert(addr, None);
        self.passive = Some(addr);
        addr
    }

    /// Connect to the client if PORT or EPRT named its listener.
    fn connect_active(&mut self) -> Option<DuplexStream> {
        if self.active.is_none() || self.active != self.listening {
            return None;
        }
        self.active = None;
        let (client, server) = tokio::io::duplex(DATA_BUFFER_SIZE);
        self.accepted = Some(client);
        Some(server)
    }

    fn file_data(&self, path: &str) -> Option<Vec<u8>> {
        self.server.file(path)
    }

    fn hash_reply(&self, path: &str, algorithm: FtpHashAlgorithm, draft: bool) -> FtpReply {
        let Some(data) = self.file_data(path) else {
            return FtpReply::new(550, "No such file");
        };
        let Some(hash) = checksum_bytes(&data, algorithm) else {
            return FtpReply::new(504, "Unknown algorithm");
        };
        if draft {
            FtpReply::new(
                213,
                format!(
                    "{} 0-{} {} {path}",
                    algorithm.hash_name().unwrap_or("?"),
                    data.len(),
                    hash.value()
                ),
            )
        } else {
            FtpReply::new(250, hash.value())
        }
    }

    async fn handle(&mut self, line: &str) -> FtpReply {
        let (cmd, arg) = match line.split_once(' ') {
            Some((c, a)) => (c.to_ascii_uppercase(), a.trim()),
            None => (line.to_ascii_uppercase(), ""),
        };

        match cmd.as_str() {
            "NOOP" => FtpReply::new(200, "NOOP ok"),
            "TYPE" => FtpReply::new(200, format!("Type set to {arg}")),
            "PWD" => FtpReply::new(257, format!("\"{}\" is the current directory", self.cwd)),
            "CWD" => {
                let dir = self.resolve(arg);
                if self.server.lock().fs.is_dir(&dir) {
                    self.cwd = dir;
                    FtpReply::new(250, "CWD command successful")
                } else {
                    FtpReply::new(550, "No such directory")
                }
            }
            "MKD" => {
                let dir = self.resolve(arg);
                let mut shared = self.server.lock();
                if shared.fs.is_dir(&dir) || shared.fs.files.contains_key(&dir) {
                    FtpReply::new(550, "File exists")
                } else if !shared.fs.parent_exists(&dir) {
                    FtpReply::new(550, "No such directory")
                } else {
                    shared.fs.dirs.insert(dir.clone());
                    FtpReply::new(257, format!("\"{dir}\" created"))
                }
            }
            "SITE" => match arg.split_once(' ') {
                Some((sub, dir)) if sub.eq_ignore_ascii_case("MKDIR") => {
                    let dir = self.resolve(dir);
                    self.server.lock().fs.create_dirs(&dir);
                    FtpReply::new(200, "SITE MKDIR successful")
                }
                _ => FtpReply::new(500, "Unknown SITE command"),
            },
            "DELE" => {
                let file = self.resolve(arg);
                if self.server.lock().fs.files.remove(&file).is_some() {
                    FtpReply::new(250, "DELE command successful")
                } else {
                    FtpReply::new(550, "No such file")
                }
            }
            "SIZE" => match self.file_data(&self.resolve(arg)) {
                Some(data) => FtpReply::new(213, data.len().to_string()),
                None => FtpReply::new(550, "No such file"),
            },
            "MDTM" => match self.file_data(&self.resolve(arg)) {
                Some(_) => FtpReply::new(213, "20240101000000"),
                None => FtpReply::new(550, "No such file"),
            },
            "MLST" => {
                let p = self.resolve(arg);
                let shared = self.server.lock();
                let facts = if let Some(data) = shared.fs.files.get(&p) {
                    format!(" type=file;size={};modify=20240101000000; {p}", data.len())
                } else if shared.fs.is_dir(&p) {
                    format!(" type=dir;modify=20240101000000; {p}")
                } else {
                    return FtpReply::new(550, "No such file or directory");
                };
                FtpReply::multi_line(
                    250,
                    vec![format!("Listing {p}"), facts, "End".to_string()],
                )
            }
            "MLSD" => {
                let dir = self.resolve(arg);
                let Some(listing) = ({
                    let shared = self.server.lock();
                    shared.fs.is_dir(&dir).then(|| shared.fs.listing(&dir))
                }) else {
                    return FtpReply::new(550, "No such directory");
                };
                let Some(mut stream) = self.connect_active().or_else(|| self.data.take()) else {
                    return FtpReply::new(425, "Use PORT or PASV first");
                };
                for l in listing {
                    let _ = stream.write_all(format!("{l}\r\n").as_bytes()).await;
                }
                drop(stream);
                self.pending.push_back(self.server.final_reply());
                FtpReply::new(150, "Opening data connection for MLSD")
            }
            "OPTS" => match arg.split_once(' ') {
                Some((opt, value)) if opt.eq_ignore_ascii_case("HASH") => {
                    let feature = self.state.feature();
                    match FtpHashAlgorithm::from_hash_name(value) {
                        Some(alg) if feature.hash_algorithms().contains(alg) => {
                            self.hash = Some(alg);
                            FtpReply::new(200, value)
                        }
                        _ => FtpReply::new(501, "Unknown algorithm"),
                    }
                }
                _ => FtpReply::new(200, "OK"),
            },
            "HASH" => {
                let feature = self.state.feature();
                let Some(alg) = self.hash.or(feature.current_hash_algorithm()) else {
                    return FtpReply::new(502, "HASH not supported");
                };
                self.hash_reply(&self.resolve(arg), alg, true)
            }
            "MD5" | "XMD5" | "MMD5" => {
                self.hash_reply(&self.resolve(arg), FtpHashAlgorithm::MD5, false)
            }
            "XSHA1" => self.hash_reply(&self.resolve(arg), FtpHashAlgorithm::SHA1, false),
            "XSHA256" => self.hash_reply(&self.resolve(arg), FtpHashAlgorithm::SHA256, false),
            "XSHA512" => self.hash_reply(&self.resolve(arg), FtpHashAlgorithm::SHA512, false),
            "XCRC" => self.hash_reply(&self.resolve(arg), FtpHashAlgorithm::CRC, false),
            "PASV" | "CPSV" => {
                let addr = self.open_passive();
                let IpAddr::V4(ip) = addr.ip() else {
                    return FtpReply::new(500, "IPv4 only");
                };
                let [a, b, c, d] = ip.octets();
                FtpReply::new(
                    227,
                    format!(
                        "Entering Passive Mode ({a},{b},{c},{d},{},{})",
                        addr.port() >> 8,
                        addr.port() & 0xff
                    ),
                )
            }
            "EPSV" => {
                let addr = self.open_passive();
                FtpReply::new(
                    229,
                    format!("Entering Extended Passive Mode (|||{}|)", addr.port()),
                )
            }
            "PORT" | "EPRT" => {
                let addr = if cmd == "PORT" {
                    parse_port_argument(arg)
                } else {
                    parse_eprt_argument(arg)
                };
                match addr {
                    Some(addr) => {
                        self.active = Some(addr);
                        FtpReply::new(200, format!("{cmd} command successful"))
                    }
                    None => FtpReply::new(501, "Illegal argument"),
                }
            }
            "REST" => match u64::from_str(arg) {
                Ok(n) => {
                    self.rest = n;
                    FtpReply::new(350, format!("Restarting at {n}"))
                }
                Err(_) => FtpReply::new(501, "Invalid offset"),
            },
            "RETR" => {
                let rest = std::mem::take(&mut self.rest) as usize;
                let Some(data) = self.file_data(&self.resolve(arg)) else {
                    return FtpReply::new(550, "No such file");
                };
                let data = data.get(rest..).unwrap_or_default().to_vec();
                if let Some(mut stream) = self.connect_active() {
                    let _ = stream.write_all(&data).await;
                } else if let Some(addr) = self.active.take() {
                    links().insert(addr, Some(data));
                } else if let Some(mut stream) = self.data.take() {
                    let _ = stream.write_all(&data).await;
                } else {
                    return FtpReply::new(425, "Use PORT or PASV first");
                }
                self.pending.push_back(self.server.final_reply());
                FtpReply::new(150, "Opening data connection")
            }
            "STOR" | "APPE" => {
                let file = self.resolve(arg);
                if !self.server.lock().fs.parent_exists(&file) {
                    return FtpReply::new(553, "No such directory");
                }
                let append = cmd == "APPE";
                if let Some(stream) = self.connect_active().or_else(|| self.data.take()) {
                    self.upload = Some(PendingUpload {
                        path: file,
                        append,
                        stream,
                    });
                    return FtpReply::new(150, "Ok to send data");
                }
                let Some(addr) = self.passive.take() else {
                    return FtpReply::new(425, "Use PORT or PASV first");
                };
                let Some(data) = links().remove(&addr).flatten() else {
                    return FtpReply::new(425, "No data connection");
                };
                self.server.store(&file, append, data);
                self.pending.push_back(self.server.final_reply());
                FtpReply::new(150, "Ok to receive data")
            }
            _ => FtpReply::new(502, "Command not implemented"),
        }
    }
}

#[async_trait]
impl FtpSession for MockSession {
    type DataStream = DuplexStream;

    fn state(&self) -> &FtpSessionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut FtpSessionState {
        &mut self.state
    }

    fn is_connected(&self) -> bool {
        self.id.is_some()
    }

    async fn connect(&mut self) -> Result<(), FtpConnectError> {
        let (ip, feature, id) = {
            let mut shared = self.server.lock();
            if shared.refuse_connections {
                return Err(FtpConnectError::ConnectIoError(io::Error::from(
                    io::ErrorKind::ConnectionRefused,
                )));
            }
            shared.connects += 1;
            let feature = FtpServerFeature::from_feat_lines(shared.feat.iter().map(|s| s.as_str()));
            (shared.ip, feature, shared.connects)
        };
        self.id = Some(id);
        self.cwd = "/".to_string();
        self.state.reset_connection_caches();
        self.state.set_working_directory(None);
        self.state
            .set_last_hash_algorithm(feature.current_hash_algorithm());
        self.state.set_feature(feature);
        self.state.set_peer_addr(Some(SocketAddr::new(ip, 21)));
        Ok(())
    }

    async fn execute(&mut self, line: &str) -> Result<FtpReply, FtpCommandError> {
        if self.id.is_none() {
            return Err(FtpCommandError::NotConnected);
        }
        let overridden = {
            let mut shared = self.server.lock();
            shared.commands.push(line.to_string());
            shared
                .replies
                .iter()
                .find(|(p, _, _)| command_matches(line, p))
                .map(|(_, code, msg)| FtpReply::new(*code, msg.as_str()))
        };
        let mut backlog = std::mem::take(&mut self.pending);
        let reply = match overridden {
            Some(reply) => reply,
            None => self.handle(line).await,
        };
        // a reply left unread answers this command instead
        let Some(stale) = backlog.pop_front() else {
            return Ok(reply);
        };
        backlog.push_back(reply);
        backlog.append(&mut self.pending);
        self.pending = backlog;
        Ok(stale)
    }

    async fn read_reply(&mut self) -> Result<FtpReply, FtpCommandError> {
        if self.id.is_none() {
            return Err(FtpCommandError::NotConnected);
        }
        let delay = self.server.lock().transfer_delay;

        if let Some(mut upload) = self.upload.take() {
            let mut data = Vec::new();
            upload
                .stream
                .read_to_end(&mut data)
                .await
                .map_err(|e| FtpCommandError::RecvFailed(FtpRawResponseError::ReadFailed(e)))?;
            self.server.store(&upload.path, upload.append, data);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            return Ok(self.server.final_reply());
        }

        let Some(reply) = self.pending.pop_front() else {
            return Err(FtpCommandError::RecvFailed(
                FtpRawResponseError::ConnectionClosed,
            ));
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(reply)
    }

    async fn connect_data(
        &mut self,
        channel: &DataChannelDescriptor,
    ) -> Result<DuplexStream, FtpConnectError> {
        if self.passive.take() != Some(channel.addr()) {
            return Err(FtpConnectError::ConnectIoError(io::Error::from(
                io::ErrorKind::ConnectionRefused,
            )));
        }
        links().remove(&channel.addr());
        let (client, server) = tokio::io::duplex(DATA_BUFFER_SIZE);
        self.data = Some(server);
        Ok(client)
    }

    async fn listen_data(&mut self) -> Result<SocketAddr, FtpConnectError> {
        let port = NEXT_LISTEN_PORT.fetch_add(1, Ordering::Relaxed);
        let addr = SocketAddr::new(IpAddr::V4(CLIENT_IP), port);
        self.listening = Some(addr);
        self.accepted = None;
        Ok(addr)
    }

    async fn accept_data(&mut self) -> Result<DuplexStream, FtpConnectError> {
        self.listening = None;
        self.accepted.take().ok_or_else(|| {
            FtpConnectError::ConnectIoError(io::Error::from(io::ErrorKind::TimedOut))
        })
    }

    fn clone_unconnected(&self) -> Self {
        let mut clone = self.server.session();
        clone.state = self.state.clone_for_new_session();
        clone
    }

    async fn close(&mut self) {
        let Some(id) = self.id.take() else {
            return;
        };
        {
            let mut shared = self.server.lock();
            shared.commands.push("QUIT".to_string());
            shared.quits += 1;
            *shared.closed.entry(id).or_default() += 1;
        }
        self.data = None;
        self.listening = None;
        self.accepted = None;
        self.upload = None;
        self.pending.clear();
        self.state.set_working_directory(None);
        self.state.reset_connection_caches();
    }
}
