/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, anyhow};
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use clap_complete::Shell;
use yaml_rust::YamlLoader;

use ferry_ftp_client::{
    FtpClientConfig, FtpClientSession, FtpCredentials, FtpDataConnectionType, FtpServerAddr,
    FtpSession,
};

mod connection;
mod logger;
mod opts;
mod progress;

mod cmd_fxp;
mod cmd_get;
mod cmd_hash;
mod cmd_list;
mod cmd_put;
mod cmd_sync;

use connection::LocalConnectionProvider;

pub(crate) type LocalSession = FtpClientSession<LocalConnectionProvider, tokio::net::TcpStream>;

const GLOBAL_ARG_COMPLETION: &str = "completion";
const GLOBAL_ARG_SERVER: &str = "server";
const GLOBAL_ARG_USERNAME: &str = "username";
const GLOBAL_ARG_PASSWORD: &str = "password";
const GLOBAL_ARG_SOURCE_IP: &str = "source-ip";
const GLOBAL_ARG_CONFIG: &str = "config";
const GLOBAL_ARG_DATA_CONNECTION: &str = "data-connection";
const GLOBAL_ARG_VERBOSE: &str = "verbose";

fn build_cli_args() -> Command {
    Command::new("ferry-ftp")
        .about("Move files between local disk and FTP servers, or between two FTP servers")
        .arg(
            Arg::new(GLOBAL_ARG_COMPLETION)
                .num_args(1)
                .value_name("SHELL")
                .long("completion")
                .value_parser(value_parser!(Shell))
                .exclusive(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_SERVER)
                .help("FTP server address")
                .num_args(1)
                .value_name("SERVER ADDRESS")
                .required_unless_present(GLOBAL_ARG_COMPLETION),
        )
        .arg(
            Arg::new(GLOBAL_ARG_USERNAME)
                .help("FTP username")
                .num_args(1)
                .value_name("USERNAME")
                .short('u')
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_PASSWORD)
                .help("FTP password")
                .num_args(1)
                .value_name("PASSWORD")
                .short('p')
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_SOURCE_IP)
                .help("source ip address")
                .num_args(1)
                .value_name("IP ADDRESS")
                .value_parser(value_parser!(IpAddr))
                .long("source")
                .short('s')
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_CONFIG)
                .help("client config file in yaml format")
                .num_args(1)
                .value_name("CONFIG FILE")
                .value_parser(value_parser!(PathBuf))
                .long("config")
                .short('c')
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_DATA_CONNECTION)
                .help("how to set up data connections, overriding the config file")
                .num_args(1)
                .value_name("TYPE")
                .value_parser(["auto", "pasv", "epsv", "port", "eprt"])
                .long("data-connection")
                .global(true),
        )
        .arg(
            Arg::new(GLOBAL_ARG_VERBOSE)
                .help("show verbose message")
                .num_args(0)
                .action(ArgAction::Count)
                .short('v')
                .global(true),
        )
        .subcommand(cmd_list::command())
        .subcommand(cmd_hash::command())
        .subcommand(cmd_get::command())
        .subcommand(cmd_put::command())
        .subcommand(cmd_fxp::command())
        .subcommand(cmd_sync::command())
}

fn load_config_file(args: &ArgMatches) -> anyhow::Result<FtpClientConfig> {
    let Some(path) = args.get_one::<PathBuf>(GLOBAL_ARG_CONFIG) else {
        return Ok(FtpClientConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {e}", path.display()))?;
    let docs = YamlLoader::load_from_str(&content)
        .map_err(|e| anyhow!("invalid yaml file {}: {e}", path.display()))?;
    match docs.first() {
        Some(doc) => FtpClientConfig::parse_yaml(doc)
            .context(format!("invalid client config in file {}", path.display())),
        None => Ok(FtpClientConfig::default()),
    }
}

fn load_config(args: &ArgMatches) -> anyhow::Result<FtpClientConfig> {
    let mut config = load_config_file(args)?;
    if let Some(s) = args.get_one::<String>(GLOBAL_ARG_DATA_CONNECTION) {
        config.transfer.data_connection_type = FtpDataConnectionType::parse(s)
            .ok_or_else(|| anyhow!("invalid data connection type {s}"))?;
    }
    Ok(config)
}

/// Everything needed to open one more session next to the main one.
pub(crate) struct SessionBuilder {
    provider: LocalConnectionProvider,
    config: FtpClientConfig,
}

impl SessionBuilder {
    pub(crate) async fn connect(
        &self,
        server: FtpServerAddr,
        credentials: FtpCredentials,
    ) -> anyhow::Result<LocalSession> {
        let mut session = FtpClientSession::new(
            self.provider.clone(),
            server.clone(),
            credentials,
            self.config.clone(),
        );
        session
            .connect()
            .await
            .context(format!("failed to connect to {server}"))?;
        Ok(session)
    }
}

pub(crate) fn credentials(username: Option<&String>, password: Option<&String>) -> FtpCredentials {
    match (username, password) {
        (Some(u), Some(p)) => FtpCredentials::new(u.as_str(), p.as_str()),
        (Some(u), None) => FtpCredentials::new(u.as_str(), ""),
        (None, _) => FtpCredentials::default(),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = build_cli_args().get_matches();

    if let Some(target) = args.get_one::<Shell>(GLOBAL_ARG_COMPLETION) {
        let mut app = build_cli_args();
        let bin_name = app.get_name().to_string();
        clap_complete::generate(*target, &mut app, bin_name, &mut io::stdout());
        return Ok(());
    }

    let verbose_level = args
        .get_one::<u8>(GLOBAL_ARG_VERBOSE)
        .copied()
        .unwrap_or_default();
    let logger = logger::SyncLogger::new(verbose_level);
    logger
        .into_global_logger()
        .map_err(|e| anyhow!("failed to set logger: {e}"))?;

    let server = args
        .get_one::<String>(GLOBAL_ARG_SERVER)
        .ok_or_else(|| anyhow!("no server address set"))?;
    let server = FtpServerAddr::from_str(server)
        .map_err(|e| anyhow!("invalid server address {server}: {e}"))?;
    let credentials = credentials(
        args.get_one::<String>(GLOBAL_ARG_USERNAME),
        args.get_one::<String>(GLOBAL_ARG_PASSWORD),
    );

    let mut provider = LocalConnectionProvider::default();
    if let Some(ip) = args.get_one::<IpAddr>(GLOBAL_ARG_SOURCE_IP) {
        provider.set_bind_ip(*ip);
    }
    let builder = SessionBuilder {
        provider,
        config: load_config(&args)?,
    };

    let Some((subcommand, args)) = args.subcommand() else {
        return Err(anyhow!("no subcommand found"));
    };

    let mut session = builder.connect(server, credentials).await?;
    let ret = match subcommand {
        cmd_list::COMMAND => cmd_list::run(&mut session, args).await,
        cmd_hash::COMMAND => cmd_hash::run(&mut session, args).await,
        cmd_get::COMMAND => cmd_get::run(&mut session, args).await,
        cmd_put::COMMAND => cmd_put::run(&mut session, args).await,
        cmd_fxp::COMMAND => cmd_fxp::run(&mut session, &builder, args).await,
        cmd_sync::COMMAND => cmd_sync::run(&mut session, &builder, args).await,
        cmd => Err(anyhow!("invalid subcommand {cmd}")),
    };
    session.close().await;

    ret
}
