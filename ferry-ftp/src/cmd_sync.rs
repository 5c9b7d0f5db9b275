/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use log::warn;
use tokio_util::sync::CancellationToken;

use ferry_ftp_client::{
    COMMON_BLACKLISTED_FOLDERS, FtpFolderSyncMode, FtpProgressMeta, FtpProgressSink, FtpResult,
    FtpResultOutcome, FtpRule, FtpSession, FtpSyncOptions, download_directory, transfer_directory,
    upload_directory,
};

use super::{LocalSession, SessionBuilder, cmd_fxp, opts};
use crate::progress::StderrProgress;

pub(super) const COMMAND: &str = "sync";

const SUBCOMMAND_UP: &str = "up";
const SUBCOMMAND_DOWN: &str = "down";
const SUBCOMMAND_FXP: &str = "fxp";

const ARG_LOCAL_DIR: &str = "local-dir";
const ARG_REMOTE_DIR: &str = "remote-dir";
const ARG_TARGET_SERVER: &str = "target-server";
const ARG_TARGET_DIR: &str = "target-dir";

const ARG_MODE: &str = "mode";
const ARG_INCLUDE_EXT: &str = "include-ext";
const ARG_EXCLUDE_EXT: &str = "exclude-ext";
const ARG_EXCLUDE_FOLDER: &str = "exclude-folder";
const ARG_EXCLUDE_COMMON: &str = "exclude-common";
const ARG_KEEP_EXCLUDED: &str = "keep-excluded";

fn append_sync_args(cmd: Command) -> Command {
    opts::append_transfer_args(cmd)
        .arg(
            Arg::new(ARG_MODE)
                .help("mirror also deletes destination files missing in the source")
                .num_args(1)
                .value_name("MODE")
                .value_parser(["update", "mirror"])
                .long("mode")
                .default_value("update"),
        )
        .arg(
            Arg::new(ARG_INCLUDE_EXT)
                .help("only sync files with these extensions")
                .num_args(1..)
                .value_name("EXT")
                .long("include-ext")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new(ARG_EXCLUDE_EXT)
                .help("skip files with these extensions")
                .num_args(1..)
                .value_name("EXT")
                .long("exclude-ext")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new(ARG_EXCLUDE_FOLDER)
                .help("skip everything inside folders with these names")
                .num_args(1..)
                .value_name("NAME")
                .long("exclude-folder")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new(ARG_EXCLUDE_COMMON)
                .help("skip version control and dependency folders")
                .num_args(0)
                .action(ArgAction::SetTrue)
                .long("exclude-common"),
        )
        .arg(
            Arg::new(ARG_KEEP_EXCLUDED)
                .help("in mirror mode, keep destination files excluded by the rules")
                .num_args(0)
                .action(ArgAction::SetTrue)
                .long("keep-excluded"),
        )
}

fn dir_arg(name: &'static str, value_name: &'static str, local: bool) -> Arg {
    let arg = Arg::new(name)
        .value_name(value_name)
        .num_args(1)
        .required(true);
    if local {
        arg.value_parser(value_parser!(PathBuf))
    } else {
        arg
    }
}

pub(super) fn command() -> Command {
    Command::new(COMMAND)
        .about("Synchronise a directory tree")
        .subcommand_required(true)
        .subcommand(append_sync_args(
            Command::new(SUBCOMMAND_UP)
                .about("Local directory to the server")
                .arg(dir_arg(ARG_LOCAL_DIR, "LOCAL DIR", true))
                .arg(dir_arg(ARG_REMOTE_DIR, "REMOTE DIR", false)),
        ))
        .subcommand(append_sync_args(
            Command::new(SUBCOMMAND_DOWN)
                .about("Server directory to the local disk")
                .arg(dir_arg(ARG_REMOTE_DIR, "REMOTE DIR", false))
                .arg(dir_arg(ARG_LOCAL_DIR, "LOCAL DIR", true)),
        ))
        .subcommand(cmd_fxp::append_target_args(append_sync_args(
            Command::new(SUBCOMMAND_FXP)
                .about("Server directory to another server")
                .arg(dir_arg(ARG_REMOTE_DIR, "SOURCE DIR", false))
                .arg(dir_arg(ARG_TARGET_SERVER, "TARGET SERVER", false))
                .arg(dir_arg(ARG_TARGET_DIR, "TARGET DIR", false)),
        )))
}

fn collect_values(args: &ArgMatches, id: &str) -> Vec<String> {
    args.get_many::<String>(id)
        .map(|v| v.cloned().collect())
        .unwrap_or_default()
}

fn parse_options(args: &ArgMatches) -> anyhow::Result<FtpSyncOptions> {
    let mode = args
        .get_one::<String>(ARG_MODE)
        .and_then(|s| FtpFolderSyncMode::parse(s))
        .unwrap_or_default();

    let mut rules = Vec::new();
    let include = collect_values(args, ARG_INCLUDE_EXT);
    if !include.is_empty() {
        let exts: Vec<&str> = include.iter().map(|s| s.as_str()).collect();
        rules.push(FtpRule::file_extension(true, &exts));
    }
    let exclude = collect_values(args, ARG_EXCLUDE_EXT);
    if !exclude.is_empty() {
        let exts: Vec<&str> = exclude.iter().map(|s| s.as_str()).collect();
        rules.push(FtpRule::file_extension(false, &exts));
    }
    let mut folders = collect_values(args, ARG_EXCLUDE_FOLDER);
    if args.get_flag(ARG_EXCLUDE_COMMON) {
        folders.extend(COMMON_BLACKLISTED_FOLDERS.iter().map(|s| s.to_string()));
    }
    if !folders.is_empty() {
        let names: Vec<&str> = folders.iter().map(|s| s.as_str()).collect();
        rules.push(FtpRule::folder_name(false, &names, 0));
    }

    Ok(FtpSyncOptions {
        mode,
        exists: opts::parse_exists(args)?,
        verify: opts::parse_verify(args)?,
        rules,
        delete_excluded: !args.get_flag(ARG_KEEP_EXCLUDED),
    })
}

fn print_results(results: &[FtpResult]) -> anyhow::Result<()> {
    let mut failed = 0usize;
    let mut done = 0usize;
    let mut skipped = 0usize;
    for r in results {
        let status = match r.outcome() {
            FtpResultOutcome::Unset => "not done",
            FtpResultOutcome::Success => {
                done += 1;
                "done"
            }
            FtpResultOutcome::Skipped { by_rule: true } => {
                skipped += 1;
                "excluded"
            }
            FtpResultOutcome::Skipped { by_rule: false } => {
                skipped += 1;
                "skipped"
            }
            FtpResultOutcome::Failed(_) => {
                failed += 1;
                "FAILED"
            }
        };
        match r.error() {
            Some(e) => println!("{status:>8} {}: {e}", r.dest_path()),
            None => println!("{status:>8} {}", r.dest_path()),
        }
    }
    println!("{done} done, {skipped} skipped, {failed} failed");
    if failed > 0 {
        Err(anyhow!("{failed} items failed"))
    } else {
        Ok(())
    }
}

fn local_dir(args: &ArgMatches) -> anyhow::Result<&PathBuf> {
    args.get_one::<PathBuf>(ARG_LOCAL_DIR)
        .ok_or_else(|| anyhow!("no local directory set"))
}

fn remote_dir(args: &ArgMatches, id: &str) -> anyhow::Result<String> {
    args.get_one::<String>(id)
        .cloned()
        .ok_or_else(|| anyhow!("no remote directory set"))
}

pub(super) async fn run(
    session: &mut LocalSession,
    builder: &SessionBuilder,
    args: &ArgMatches,
) -> anyhow::Result<()> {
    let Some((subcommand, args)) = args.subcommand() else {
        return Err(anyhow!("no sync direction set"));
    };
    let options = parse_options(args)?;

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stop after the current file");
            cancel_on_signal.cancel();
        }
    });

    let mut receiver = StderrProgress::default();
    let progress = if opts::show_progress(args) {
        FtpProgressSink::new(&mut receiver, FtpProgressMeta::single())
    } else {
        FtpProgressSink::none()
    };
    let results = match subcommand {
        SUBCOMMAND_UP => {
            let local = local_dir(args)?;
            let remote = remote_dir(args, ARG_REMOTE_DIR)?;
            upload_directory(session, local, &remote, &options, progress, &cancel).await?
        }
        SUBCOMMAND_DOWN => {
            let remote = remote_dir(args, ARG_REMOTE_DIR)?;
            let local = local_dir(args)?;
            download_directory(session, &remote, local, &options, progress, &cancel).await?
        }
        SUBCOMMAND_FXP => {
            let source_dir = remote_dir(args, ARG_REMOTE_DIR)?;
            let target_dir = remote_dir(args, ARG_TARGET_DIR)?;
            let mut target = cmd_fxp::connect_target(builder, args, ARG_TARGET_SERVER).await?;
            let r = transfer_directory(
                session,
                &source_dir,
                &mut target,
                &target_dir,
                &options,
                progress,
                &cancel,
            )
            .await;
            target.close().await;
            r?
        }
        cmd => return Err(anyhow!("invalid sync direction {cmd}")),
    };
    drop(receiver);
    print_results(&results)
}
