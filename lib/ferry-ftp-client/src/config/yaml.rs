/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use humanize_rs::ParseError;
use humanize_rs::bytes::Bytes;
use yaml_rust::{Yaml, yaml};

use super::{
    FtpClientConfig, FtpControlConfig, FtpDataConnectionType, FtpFxpConfig, FtpTransferConfig,
};
use crate::transfer::FtpDataType;

fn foreach_kv<F>(table: &yaml::Hash, mut f: F) -> anyhow::Result<()>
where
    F: FnMut(&str, &Yaml) -> anyhow::Result<()>,
{
    for (k, v) in table.iter() {
        if let Yaml::String(key) = k {
            f(key, v).context(format!("failed to parse value of key {key}"))?;
        } else {
            return Err(anyhow!("key in hash should be string"));
        }
    }
    Ok(())
}

fn normalize_key(raw: &str) -> String {
    raw.to_lowercase().replace('-', "_")
}

fn as_humanize_usize(v: &Yaml) -> anyhow::Result<usize> {
    match v {
        Yaml::String(value) => {
            let v = value.parse::<Bytes>()?;
            Ok(v.size())
        }
        Yaml::Integer(value) => Ok(usize::try_from(*value)?),
        _ => Err(anyhow!(
            "yaml value type for humanize usize should be 'string' or 'integer'"
        )),
    }
}

fn as_usize(v: &Yaml) -> anyhow::Result<usize> {
    match v {
        Yaml::String(value) => Ok(usize::from_str(value)?),
        Yaml::Integer(value) => Ok(usize::try_from(*value)?),
        _ => Err(anyhow!(
            "yaml value type for usize should be 'string' or 'integer'"
        )),
    }
}

fn as_bool(v: &Yaml) -> anyhow::Result<bool> {
    match v {
        Yaml::String(s) => match s.to_lowercase().as_str() {
            "on" | "true" | "yes" | "1" => Ok(true),
            "off" | "false" | "no" | "0" => Ok(false),
            _ => Err(anyhow!("invalid yaml string value for 'bool': {s}")),
        },
        Yaml::Boolean(value) => Ok(*value),
        Yaml::Integer(i) => Ok(*i != 0),
        _ => Err(anyhow!(
            "yaml value type for 'bool' should be 'boolean' / 'string' / 'integer'"
        )),
    }
}

fn as_duration(v: &Yaml) -> anyhow::Result<Duration> {
    match v {
        Yaml::String(value) => match humanize_rs::duration::parse(value) {
            Ok(v) => Ok(v),
            Err(ParseError::MissingUnit) => {
                if let Ok(u) = u64::from_str(value) {
                    Ok(Duration::from_secs(u))
                } else {
                    Err(anyhow!("invalid duration string"))
                }
            }
            Err(e) => Err(anyhow!("invalid humanize duration string: {e}")),
        },
        Yaml::Integer(value) => {
            let u = u64::try_from(*value).map_err(|_| anyhow!("negative duration value"))?;
            Ok(Duration::from_secs(u))
        }
        _ => Err(anyhow!(
            "yaml value type for humanize duration should be 'string' or 'integer'"
        )),
    }
}

fn as_data_type(v: &Yaml) -> anyhow::Result<FtpDataType> {
    if let Yaml::String(s) = v {
        FtpDataType::parse(s).ok_or_else(|| anyhow!("invalid data type {s}"))
    } else {
        Err(anyhow!("yaml value type for data type should be 'string'"))
    }
}

impl FtpControlConfig {
    pub fn parse_yaml(value: &Yaml) -> anyhow::Result<Self> {
        if let Yaml::Hash(map) = value {
            let mut config = FtpControlConfig::default();
            foreach_kv(map, |k, v| match normalize_key(k).as_str() {
                "max_line_len" | "max_line_length" => {
                    config.max_line_len = as_humanize_usize(v)
                        .context(format!("invalid humanize usize value for key {k}"))?;
                    Ok(())
                }
                "max_multi_lines" => {
                    config.max_multi_lines =
                        as_usize(v).context(format!("invalid usize value for key {k}"))?;
                    Ok(())
                }
                "command_timeout" => {
                    config.command_timeout = as_duration(v)
                        .context(format!("invalid humanize duration value for key {k}"))?;
                    Ok(())
                }
                _ => Err(anyhow!("invalid key {k}")),
            })?;
            Ok(config)
        } else {
            Err(anyhow!("invalid yaml type"))
        }
    }
}

impl FtpTransferConfig {
    pub fn parse_yaml(value: &Yaml) -> anyhow::Result<Self> {
        if let Yaml::Hash(map) = value {
            let mut config = FtpTransferConfig::default();
            foreach_kv(map, |k, v| match normalize_key(k).as_str() {
                "list_max_line_len" | "list_max_line_length" => {
                    config.list_max_line_len = as_humanize_usize(v)
                        .context(format!("invalid humanize usize value for key {k}"))?;
                    Ok(())
                }
                "list_max_entries" => {
                    config.list_max_entries =
                        as_usize(v).context(format!("invalid usize value for key {k}"))?;
                    Ok(())
                }
                "end_wait_timeout" => {
                    config.end_wait_timeout = as_duration(v)
                        .context(format!("invalid humanize duration value for key {k}"))?;
                    Ok(())
                }
                "buffer_size" => {
                    config.buffer_size = as_humanize_usize(v)
                        .context(format!("invalid humanize usize value for key {k}"))?;
                    Ok(())
                }
                "data_connection_type" | "data_connection" => {
                    if let Yaml::String(s) = v {
                        config.data_connection_type = FtpDataConnectionType::parse(s)
                            .ok_or_else(|| anyhow!("invalid data connection type {s}"))?;
                        Ok(())
                    } else {
                        Err(anyhow!("invalid string value for key {k}"))
                    }
                }
                "upload_data_type" => {
                    config.upload_data_type =
                        as_data_type(v).context(format!("invalid data type value for key {k}"))?;
                    Ok(())
                }
                "download_data_type" => {
                    config.download_data_type =
                        as_data_type(v).context(format!("invalid data type value for key {k}"))?;
                    Ok(())
                }
                _ => Err(anyhow!("invalid key {k}")),
            })?;
            Ok(config)
        } else {
            Err(anyhow!("invalid yaml type"))
        }
    }
}

impl FtpFxpConfig {
    pub fn parse_yaml(value: &Yaml) -> anyhow::Result<Self> {
        if let Yaml::Hash(map) = value {
            let mut config = FtpFxpConfig::default();
            foreach_kv(map, |k, v| match normalize_key(k).as_str() {
                "data_type" => {
                    config.data_type =
                        as_data_type(v).context(format!("invalid data type value for key {k}"))?;
                    Ok(())
                }
                "progress_interval" => {
                    let interval = as_duration(v)
                        .context(format!("invalid humanize duration value for key {k}"))?;
                    if interval.is_zero() {
                        return Err(anyhow!("zero progress interval is not allowed"));
                    }
                    config.progress_interval = interval;
                    Ok(())
                }
                "transfer_timeout" => {
                    config.transfer_timeout = as_duration(v)
                        .context(format!("invalid humanize duration value for key {k}"))?;
                    Ok(())
                }
                "use_epsv" => {
                    config.use_epsv =
                        as_bool(v).context(format!("invalid bool value for key {k}"))?;
                    Ok(())
                }
                _ => Err(anyhow!("invalid key {k}")),
            })?;
            Ok(config)
        } else {
            Err(anyhow!("invalid yaml type"))
        }
    }
}

impl FtpClientConfig {
    pub fn parse_yaml(value: &Yaml) -> anyhow::Result<Self> {
        if let Yaml::Hash(map) = value {
            let mut config = FtpClientConfig::default();
            foreach_kv(map, |k, v| match normalize_key(k).as_str() {
                "control" => {
                    config.control = FtpControlConfig::parse_yaml(v).context(format!(
                        "invalid ftp control connection config value for key {k}"
                    ))?;
                    Ok(())
                }
                "transfer" => {
                    config.transfer = FtpTransferConfig::parse_yaml(v).context(format!(
                        "invalid ftp transfer connection config value for key {k}"
                    ))?;
                    Ok(())
                }
                "fxp" => {
                    config.fxp = FtpFxpConfig::parse_yaml(v)
                        .context(format!("invalid ftp fxp config value for key {k}"))?;
                    Ok(())
                }
                "connect_timeout" => {
                    config.connect_timeout = as_duration(v)
                        .context(format!("invalid humanize duration value for key {k}"))?;
                    Ok(())
                }
                "greeting_timeout" => {
                    config.greeting_timeout = as_duration(v)
                        .context(format!("invalid humanize duration value for key {k}"))?;
                    Ok(())
                }
                "retry_attempts" => {
                    config.retry_attempts =
                        as_usize(v).context(format!("invalid usize value for key {k}"))?;
                    Ok(())
                }
                "thread_safe_data_channels" => {
                    config.thread_safe_data_channels =
                        as_bool(v).context(format!("invalid bool value for key {k}"))?;
                    Ok(())
                }
                _ => Err(anyhow!("invalid key {k}")),
            })?;
            Ok(config)
        } else {
            Err(anyhow!("invalid yaml type"))
        }
    }
}
