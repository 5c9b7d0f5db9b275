/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use anyhow::anyhow;
use clap::{Arg, ArgAction, ArgMatches, Command};

use ferry_ftp_client::{FtpRemoteExists, FtpStatus, FtpVerify};

const ARG_EXISTS: &str = "exists";
const ARG_VERIFY: &str = "verify";
const ARG_CREATE_DIR: &str = "create-dir";
const ARG_PROGRESS: &str = "progress";

pub(crate) fn append_transfer_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new(ARG_EXISTS)
            .help("what to do if the destination exists: skip, overwrite, resume, append, no-check")
            .num_args(1)
            .value_name("POLICY")
            .long("exists")
            .short('e')
            .default_value("skip"),
    )
    .arg(
        Arg::new(ARG_VERIFY)
            .help("verify flags joined by ',': retry, delete, throw, only_checksum")
            .num_args(1)
            .value_name("FLAGS")
            .long("verify")
            .default_value("none"),
    )
    .arg(
        Arg::new(ARG_PROGRESS)
            .help("print transfer progress")
            .num_args(0)
            .action(ArgAction::SetTrue)
            .long("progress")
            .short('P'),
    )
}

pub(crate) fn append_create_dir_arg(cmd: Command) -> Command {
    cmd.arg(
        Arg::new(ARG_CREATE_DIR)
            .help("create the destination directory if missing")
            .num_args(0)
            .action(ArgAction::SetTrue)
            .long("create-dir"),
    )
}

pub(crate) fn parse_exists(args: &ArgMatches) -> anyhow::Result<FtpRemoteExists> {
    match args.get_one::<String>(ARG_EXISTS) {
        Some(s) => FtpRemoteExists::parse(s).ok_or_else(|| anyhow!("invalid exists policy {s}")),
        None => Ok(FtpRemoteExists::Skip),
    }
}

pub(crate) fn parse_verify(args: &ArgMatches) -> anyhow::Result<FtpVerify> {
    match args.get_one::<String>(ARG_VERIFY) {
        Some(s) => FtpVerify::parse(s).ok_or_else(|| anyhow!("invalid verify flags {s}")),
        None => Ok(FtpVerify::NONE),
    }
}

pub(crate) fn create_dir(args: &ArgMatches) -> bool {
    args.get_flag(ARG_CREATE_DIR)
}

pub(crate) fn show_progress(args: &ArgMatches) -> bool {
    args.get_flag(ARG_PROGRESS)
}

pub(crate) fn report_status(path: &str, status: FtpStatus) -> anyhow::Result<()> {
    match status {
        FtpStatus::Success => {
            println!("{path}: done");
            Ok(())
        }
        FtpStatus::Skipped => {
            println!("{path}: skipped");
            Ok(())
        }
        FtpStatus::Failed => Err(anyhow!("{path}: transferred but not verified")),
    }
}
