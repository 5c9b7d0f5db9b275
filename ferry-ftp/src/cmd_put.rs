/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Arg, ArgMatches, Command, value_parser};

use ferry_ftp_client::{FtpProgressMeta, FtpProgressSink, upload_file};

use super::{LocalSession, opts};
use crate::progress::StderrProgress;

pub(super) const COMMAND: &str = "put";

const COMMAND_ARG_LOCAL_FILE: &str = "local-file";
const COMMAND_ARG_REMOTE_PATH: &str = "remote-path";

pub(super) fn command() -> Command {
    let cmd = Command::new(COMMAND)
        .about("Upload a local file")
        .arg(
            Arg::new(COMMAND_ARG_LOCAL_FILE)
                .value_name("LOCAL FILE")
                .value_parser(value_parser!(PathBuf))
                .num_args(1)
                .required(true),
        )
        .arg(
            Arg::new(COMMAND_ARG_REMOTE_PATH)
                .value_name("REMOTE PATH")
                .num_args(1)
                .required(true),
        );
    opts::append_create_dir_arg(opts::append_transfer_args(cmd))
}

pub(super) async fn run(session: &mut LocalSession, args: &ArgMatches) -> anyhow::Result<()> {
    let local = args
        .get_one::<PathBuf>(COMMAND_ARG_LOCAL_FILE)
        .ok_or_else(|| anyhow!("no local file set"))?;
    let remote = args
        .get_one::<String>(COMMAND_ARG_REMOTE_PATH)
        .ok_or_else(|| anyhow!("no remote path set"))?;
    let exists = opts::parse_exists(args)?;
    let verify = opts::parse_verify(args)?;

    let mut receiver = StderrProgress::default();
    let progress = if opts::show_progress(args) {
        FtpProgressSink::new(&mut receiver, FtpProgressMeta::single())
    } else {
        FtpProgressSink::none()
    };
    let status = upload_file(
        session,
        local,
        remote,
        opts::create_dir(args),
        exists,
        verify,
        progress,
    )
    .await?;
    drop(receiver);
    opts::report_status(remote, status)
}
