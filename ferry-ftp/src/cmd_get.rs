/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Arg, ArgMatches, Command, value_parser};

use ferry_ftp_client::{FtpProgressMeta, FtpProgressSink, download_file};

use super::{LocalSession, opts};
use crate::progress::StderrProgress;

pub(super) const COMMAND: &str = "get";

const COMMAND_ARG_REMOTE_PATH: &str = "remote-path";
const COMMAND_ARG_LOCAL_FILE: &str = "local-file";

pub(super) fn command() -> Command {
    let cmd = Command::new(COMMAND)
        .about("Download a remote file")
        .arg(
            Arg::new(COMMAND_ARG_REMOTE_PATH)
                .value_name("REMOTE PATH")
                .num_args(1)
                .required(true),
        )
        .arg(
            Arg::new(COMMAND_ARG_LOCAL_FILE)
                .help("defaults to the remote file name in the current directory")
                .value_name("LOCAL FILE")
                .value_parser(value_parser!(PathBuf))
                .num_args(1),
        );
    opts::append_create_dir_arg(opts::append_transfer_args(cmd))
}

pub(super) async fn run(session: &mut LocalSession, args: &ArgMatches) -> anyhow::Result<()> {
    let remote = args
        .get_one::<String>(COMMAND_ARG_REMOTE_PATH)
        .ok_or_else(|| anyhow!("no remote path set"))?;
    let local = match args.get_one::<PathBuf>(COMMAND_ARG_LOCAL_FILE) {
        Some(p) => p.clone(),
        None => {
            let name = remote.rsplit('/').next().unwrap_or_default();
            if name.is_empty() {
                return Err(anyhow!("no file name found in remote path {remote}"));
            }
            PathBuf::from(name)
        }
    };
    let exists = opts::parse_exists(args)?;
    let verify = opts::parse_verify(args)?;

    let mut receiver = StderrProgress::default();
    let progress = if opts::show_progress(args) {
        FtpProgressSink::new(&mut receiver, FtpProgressMeta::single())
    } else {
        FtpProgressSink::none()
    };
    let status = download_file(
        session,
        remote,
        &local,
        opts::create_dir(args),
        exists,
        verify,
        progress,
    )
    .await?;
    drop(receiver);
    opts::report_status(&local.to_string_lossy(), status)
}
