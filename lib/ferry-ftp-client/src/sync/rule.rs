/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

use log::warn;
use regex::Regex;

use crate::path;
use crate::transfer::{FtpListItem, FtpObjectType};

/// Size comparison used by [`FtpRule::Size`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FtpRuleOperator {
    Equals(u64),
    NotEquals(u64),
    LessThan(u64),
    LessThanOrEquals(u64),
    MoreThan(u64),
    MoreThanOrEquals(u64),
    /// inclusive on both ends
    BetweenRange(u64, u64),
    OutsideRange(u64, u64),
}

impl FtpRuleOperator {
    pub fn validate(&self, value: u64) -> bool {
        match *self {
            FtpRuleOperator::Equals(x) => value == x,
            FtpRuleOperator::NotEquals(x) => value != x,
            FtpRuleOperator::LessThan(x) => value < x,
            FtpRuleOperator::LessThanOrEquals(x) => value <= x,
            FtpRuleOperator::MoreThan(x) => value > x,
            FtpRuleOperator::MoreThanOrEquals(x) => value >= x,
            FtpRuleOperator::BetweenRange(x, y) => value >= x && value <= y,
            FtpRuleOperator::OutsideRange(x, y) => value < x || value > y,
        }
    }
}

/// A filter applied to every entry of a directory sync.
///
/// Paths are matched relative to the sync root. A whitelist rule only lets
/// matching entries through, a blacklist rule drops them.
#[derive(Debug, Clone)]
pub enum FtpRule {
    /// Lower case extensions without the leading dot. Files only.
    FileExtension { whitelist: bool, exts: Vec<String> },
    /// Exact file names. Files only.
    FileName { whitelist: bool, names: Vec<String> },
    /// Names of any containing folder, skipping the first `start_segment`
    /// segments.
    FolderName {
        whitelist: bool,
        names: Vec<String>,
        start_segment: usize,
    },
    FileNameRegex { whitelist: bool, patterns: Vec<Regex> },
    FolderNameRegex { whitelist: bool, patterns: Vec<Regex> },
    /// File size in bytes. Files of unknown size pass.
    Size { operator: FtpRuleOperator },
}

/// Folder names commonly left out of uploads.
pub const COMMON_BLACKLISTED_FOLDERS: &[&str] = &[".git", ".svn", ".DS_Store", "node_modules"];

fn compile_patterns(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(r) => Some(r),
            Err(e) => {
                warn!("ignore invalid rule pattern {p}: {e}");
                None
            }
        })
        .collect()
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// The folder segments an entry lives in, including itself for folders.
fn folder_segments(item: &FtpListItem) -> Vec<&str> {
    match item.kind {
        FtpObjectType::Directory => path::segments(&item.path).collect(),
        FtpObjectType::File => path::parent(&item.path)
            .map(|p| path::segments(p).collect())
            .unwrap_or_default(),
    }
}

fn apply(whitelist: bool, matched: bool) -> bool {
    if whitelist { matched } else { !matched }
}

impl FtpRule {
    pub fn file_extension(whitelist: bool, exts: &[&str]) -> Self {
        FtpRule::FileExtension {
            whitelist,
            exts: exts
                .iter()
                .map(|s| s.trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    pub fn file_name(whitelist: bool, names: &[&str]) -> Self {
        FtpRule::FileName {
            whitelist,
            names: to_strings(names),
        }
    }

    pub fn folder_name(whitelist: bool, names: &[&str], start_segment: usize) -> Self {
        FtpRule::FolderName {
            whitelist,
            names: to_strings(names),
            start_segment,
        }
    }

    /// Invalid patterns are dropped.
    pub fn file_name_regex(whitelist: bool, patterns: &[&str]) -> Self {
        FtpRule::FileNameRegex {
            whitelist,
            patterns: compile_patterns(patterns),
        }
    }

    /// Invalid patterns are dropped.
    pub fn folder_name_regex(whitelist: bool, patterns: &[&str]) -> Self {
        FtpRule::FolderNameRegex {
            whitelist,
            patterns: compile_patterns(patterns),
        }
    }

    pub fn size(operator: FtpRuleOperator) -> Self {
        FtpRule::Size { operator }
    }

    pub fn is_allowed(&self, item: &FtpListItem) -> bool {
        match self {
            FtpRule::FileExtension { whitelist, exts } => {
                if !item.is_file() {
                    return true;
                }
                let name = path::file_name(&item.path);
                match name.rsplit_once('.') {
                    Some((_, ext)) if !ext.is_empty() => {
                        let ext = ext.to_lowercase();
                        apply(*whitelist, exts.contains(&ext))
                    }
                    _ => !*whitelist,
                }
            }
            FtpRule::FileName { whitelist, names } => {
                if !item.is_file() {
                    return true;
                }
                let name = path::file_name(&item.path);
                apply(*whitelist, names.iter().any(|n| n == name))
            }
            FtpRule::FolderName {
                whitelist,
                names,
                start_segment,
            } => {
                let matched = folder_segments(item)
                    .into_iter()
                    .skip(*start_segment)
                    .any(|seg| names.iter().any(|n| n == seg.trim()));
                apply(*whitelist, matched)
            }
            FtpRule::FileNameRegex {
                whitelist,
                patterns,
            } => {
                if !item.is_file() {
                    return true;
                }
                let name = path::file_name(&item.path);
                apply(*whitelist, patterns.iter().any(|r| r.is_match(name)))
            }
            FtpRule::FolderNameRegex {
                whitelist,
                patterns,
            } => {
                let matched = folder_segments(item)
                    .into_iter()
                    .any(|seg| patterns.iter().any(|r| r.is_match(seg)));
                apply(*whitelist, matched)
            }
            FtpRule::Size { operator } => match (item.kind, item.size) {
                (FtpObjectType::File, Some(size)) => operator.validate(size),
                _ => true,
            },
        }
    }

    /// Whether `item` passes every rule.
    pub fn is_all_allowed(rules: &[FtpRule], item: &FtpListItem) -> bool {
        rules.iter().all(|r| r.is_allowed(item))
    }
}
