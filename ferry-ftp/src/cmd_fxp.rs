/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;

use anyhow::anyhow;
use clap::{Arg, ArgMatches, Command};

use ferry_ftp_client::{
    FtpProgressMeta, FtpProgressSink, FtpServerAddr, FtpSession, transfer_file,
};

use super::{LocalSession, SessionBuilder, opts};
use crate::progress::StderrProgress;

pub(super) const COMMAND: &str = "fxp";

const COMMAND_ARG_SOURCE_PATH: &str = "source-path";
const COMMAND_ARG_TARGET_SERVER: &str = "target-server";
const COMMAND_ARG_TARGET_PATH: &str = "target-path";
const COMMAND_ARG_TARGET_USERNAME: &str = "target-username";
const COMMAND_ARG_TARGET_PASSWORD: &str = "target-password";

pub(super) fn append_target_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new(COMMAND_ARG_TARGET_USERNAME)
            .help("FTP username on the target server")
            .num_args(1)
            .value_name("USERNAME")
            .long("target-user"),
    )
    .arg(
        Arg::new(COMMAND_ARG_TARGET_PASSWORD)
            .help("FTP password on the target server")
            .num_args(1)
            .value_name("PASSWORD")
            .long("target-pass"),
    )
}

/// Connect to the target server named in `args`.
pub(super) async fn connect_target(
    builder: &SessionBuilder,
    args: &ArgMatches,
    server_arg: &str,
) -> anyhow::Result<LocalSession> {
    let server = args
        .get_one::<String>(server_arg)
        .ok_or_else(|| anyhow!("no target server set"))?;
    let server = FtpServerAddr::from_str(server)
        .map_err(|e| anyhow!("invalid target server address {server}: {e}"))?;
    let credentials = super::credentials(
        args.get_one::<String>(COMMAND_ARG_TARGET_USERNAME),
        args.get_one::<String>(COMMAND_ARG_TARGET_PASSWORD),
    );
    builder.connect(server, credentials).await
}

pub(super) fn command() -> Command {
    let cmd = Command::new(COMMAND)
        .about("Copy a file to another server without passing it through this host")
        .arg(
            Arg::new(COMMAND_ARG_SOURCE_PATH)
                .value_name("SOURCE PATH")
                .num_args(1)
                .required(true),
        )
        .arg(
            Arg::new(COMMAND_ARG_TARGET_SERVER)
                .value_name("TARGET SERVER")
                .num_args(1)
                .required(true),
        )
        .arg(
            Arg::new(COMMAND_ARG_TARGET_PATH)
                .value_name("TARGET PATH")
                .num_args(1)
                .required(true),
        );
    append_target_args(opts::append_create_dir_arg(opts::append_transfer_args(cmd)))
}

pub(super) async fn run(
    session: &mut LocalSession,
    builder: &SessionBuilder,
    args: &ArgMatches,
) -> anyhow::Result<()> {
    let source_path = args
        .get_one::<String>(COMMAND_ARG_SOURCE_PATH)
        .ok_or_else(|| anyhow!("no source path set"))?;
    let target_path = args
        .get_one::<String>(COMMAND_ARG_TARGET_PATH)
        .ok_or_else(|| anyhow!("no target path set"))?;
    let exists = opts::parse_exists(args)?;
    let verify = opts::parse_verify(args)?;

    let mut target = connect_target(builder, args, COMMAND_ARG_TARGET_SERVER).await?;

    let mut receiver = StderrProgress::default();
    let progress = if opts::show_progress(args) {
        FtpProgressSink::new(&mut receiver, FtpProgressMeta::single())
    } else {
        FtpProgressSink::none()
    };
    let r = transfer_file(
        session,
        source_path,
        &mut target,
        target_path,
        opts::create_dir(args),
        exists,
        verify,
        progress,
    )
    .await;
    drop(receiver);
    target.close().await;

    opts::report_status(target_path, r?)
}
