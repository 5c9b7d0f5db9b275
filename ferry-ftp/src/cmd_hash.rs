/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Arg, ArgMatches, Command, value_parser};

use ferry_ftp_client::{FtpHashAlgorithm, FtpSession, checksum, local_file_checksum};

use super::LocalSession;

pub(super) const COMMAND: &str = "hash";

const COMMAND_ARG_PATH: &str = "path";
const COMMAND_ARG_ALGORITHM: &str = "algorithm";
const COMMAND_ARG_COMPARE: &str = "compare";

pub(super) fn command() -> Command {
    Command::new(COMMAND)
        .about("Get the checksum of a remote file")
        .arg(
            Arg::new(COMMAND_ARG_PATH)
                .value_name("FILE PATH")
                .num_args(1)
                .required(true),
        )
        .arg(
            Arg::new(COMMAND_ARG_ALGORITHM)
                .help("MD5, SHA-1, SHA-256, SHA-512 or CRC, the best supported one by default")
                .value_name("ALGORITHM")
                .num_args(1)
                .long("algorithm")
                .short('a'),
        )
        .arg(
            Arg::new(COMMAND_ARG_COMPARE)
                .help("compare with the checksum of this local file")
                .value_name("LOCAL FILE")
                .value_parser(value_parser!(PathBuf))
                .num_args(1)
                .long("compare"),
        )
}

pub(super) async fn run(session: &mut LocalSession, args: &ArgMatches) -> anyhow::Result<()> {
    let path = args
        .get_one::<String>(COMMAND_ARG_PATH)
        .ok_or_else(|| anyhow!("no file path set"))?;
    let algorithm = match args.get_one::<String>(COMMAND_ARG_ALGORITHM) {
        Some(s) => {
            FtpHashAlgorithm::from_hash_name(s).ok_or_else(|| anyhow!("invalid algorithm {s}"))?
        }
        None => session
            .state()
            .feature()
            .checksum_algorithms()
            .first()
            .ok_or_else(|| anyhow!("the server supports no hash algorithm"))?,
    };

    let remote = checksum(session, path, algorithm).await?;
    println!("{}  {path}", remote.value());

    if let Some(local_path) = args.get_one::<PathBuf>(COMMAND_ARG_COMPARE) {
        let local = local_file_checksum(local_path, algorithm).await?;
        println!("{}  {}", local.value(), local_path.display());
        if !local.matches(&remote) {
            return Err(anyhow!("checksum mismatch"));
        }
    }
    Ok(())
}
