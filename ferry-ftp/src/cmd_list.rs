/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use clap::{Arg, ArgAction, ArgMatches, Command};

use ferry_ftp_client::{FtpFileEntryType, FtpObjectType, list_directory, list_recursive};

use super::LocalSession;

pub(super) const COMMAND: &str = "list";

const COMMAND_ARG_PATH: &str = "path";
const COMMAND_ARG_RECURSIVE: &str = "recursive";

pub(super) fn command() -> Command {
    Command::new(COMMAND)
        .about("List path")
        .arg(
            Arg::new(COMMAND_ARG_PATH)
                .value_name("DIR PATH")
                .num_args(1),
        )
        .arg(
            Arg::new(COMMAND_ARG_RECURSIVE)
                .help("walk the whole tree")
                .num_args(0)
                .action(ArgAction::SetTrue)
                .long("recursive")
                .short('r'),
        )
}

pub(super) async fn run(session: &mut LocalSession, args: &ArgMatches) -> anyhow::Result<()> {
    let path = args
        .get_one::<String>(COMMAND_ARG_PATH)
        .map(|s| s.as_str())
        .unwrap_or("/");

    if args.get_flag(COMMAND_ARG_RECURSIVE) {
        for item in list_recursive(session, path).await? {
            match item.kind {
                FtpObjectType::Directory => println!("{:>12} {}/", "-", item.path),
                FtpObjectType::File => match item.size {
                    Some(size) => println!("{size:>12} {}", item.path),
                    None => println!("{:>12} {}", "?", item.path),
                },
            }
        }
        return Ok(());
    }

    for facts in list_directory(session, path).await? {
        let name = facts.entry_path();
        match facts.entry_type() {
            FtpFileEntryType::Directory => println!("{:>12} {name}/", "-"),
            _ => match facts.size() {
                Some(size) => println!("{size:>12} {name}"),
                None => println!("{:>12} {name}", "?"),
            },
        }
    }
    Ok(())
}
