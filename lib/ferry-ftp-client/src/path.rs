/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2023-2025 ByteDance and/or its affiliates.
 */

//! Helpers for `/` separated paths, used for both remote and local trees.

/// Append a trailing `/`, turning `\` into `/` on the way.
pub(crate) fn normalize_dir(path: &str) -> String {
    let mut s = path.replace('\\', "/");
    if !s.ends_with('/') {
        s.push('/');
    }
    s
}

/// Join a relative path to a directory.
pub(crate) fn join(dir: &str, rel: &str) -> String {
    let rel = rel.trim_start_matches('/');
    if dir.is_empty() {
        return rel.to_string();
    }
    if dir.ends_with('/') {
        format!("{dir}{rel}")
    } else {
        format!("{dir}/{rel}")
    }
}

/// The parent directory, or `None` for top level names.
pub(crate) fn parent(path: &str) -> Option<&str> {
    let path = path.trim_end_matches('/');
    match path.rfind('/') {
        Some(0) => Some("/"),
        Some(i) => Some(&path[..i]),
        None => None,
    }
}

pub(crate) fn file_name(path: &str) -> &str {
    let path = path.trim_end_matches('/');
    match path.rfind('/') {
        Some(i) => &path[i + 1..],
        None => path,
    }
}

/// Non-empty segments of the path.
pub(crate) fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Every ancestor directory of `path` plus the path itself, shortest first.
pub(crate) fn prefixes(path: &str) -> Vec<String> {
    let absolute = path.starts_with('/');
    let mut cur = String::with_capacity(path.len());
    let mut all = Vec::new();
    for seg in segments(path) {
        if absolute || !cur.is_empty() {
            cur.push('/');
        }
        cur.push_str(seg);
        all.push(cur.clone());
    }
    all
}
