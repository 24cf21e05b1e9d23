// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Logical path handling: filename rules, segment hashing, and request parsing.
//!
//! Requests and mount points are compared segment by segment through a
//! chained 64-bit hash: the hash of segment `n` is seeded with the hash of
//! segments `0..n`, so one value per depth identifies a whole prefix.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use stratum_core::vfs::Marker;
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Seed of the hash chain for the empty prefix.
pub const ROOT_HASH_SEED: u64 = 0xcbf2_9ce4_8422_2325;

/// Returns `true` for either flavour of path separator.
pub fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

/// Rules that decide when two filenames name the same thing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilenameRules {
    /// Separator used when the tree rebuilds a path (mount points, walker names).
    pub separator: char,
    /// When `false`, ASCII case is folded before segments are compared.
    pub case_sensitive: bool,
}

impl Default for FilenameRules {
    fn default() -> Self {
        Self {
            separator: '/',
            case_sensitive: true,
        }
    }
}

impl FilenameRules {
    /// Folds `segment` into its comparable form.
    pub fn fold<'s>(&self, segment: &'s str) -> Cow<'s, str> {
        if self.case_sensitive || !segment.bytes().any(|b| b.is_ascii_uppercase()) {
            Cow::Borrowed(segment)
        } else {
            Cow::Owned(segment.to_ascii_lowercase())
        }
    }

    /// Hashes one path segment, continuing the chain from `seed`.
    pub fn hash_segment(&self, segment: &str, seed: u64) -> u64 {
        xxh3_64_with_seed(self.fold(segment).as_bytes(), seed)
    }

    /// Hashes a whole sequence of segments from the root seed.
    pub fn hash_segments<'s, I>(&self, segments: I) -> u64
    where
        I: IntoIterator<Item = &'s str>,
    {
        segments
            .into_iter()
            .fold(ROOT_HASH_SEED, |seed, segment| self.hash_segment(segment, seed))
    }

    /// Returns `true` if both segments name the same thing under these rules.
    pub fn segments_equal(&self, a: &str, b: &str) -> bool {
        if self.case_sensitive {
            a == b
        } else {
            a.eq_ignore_ascii_case(b)
        }
    }
}

/// Splits `path` into segments, dropping `.` and resolving `..`.
///
/// `..` segments that would climb above the first segment are discarded.
pub fn simplify_segments(path: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    for segment in path.split(is_separator) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments
}

/// Normalizes a mount point prefix.
///
/// Leading separators are dropped and a trailing separator is added, so the
/// returned string can be prepended to a filesystem-relative name as is. The
/// root mount point is the empty string.
pub fn normalize_mount_point(prefix: &str, rules: &FilenameRules) -> (String, Vec<String>) {
    let segments: Vec<String> = simplify_segments(prefix)
        .into_iter()
        .map(str::to_owned)
        .collect();
    let mut rebuilt = String::with_capacity(prefix.len() + 1);
    for segment in &segments {
        rebuilt.push_str(segment);
        rebuilt.push(rules.separator);
    }
    (rebuilt, segments)
}

/// Returns the final segment of `path`.
pub fn file_name(path: &str) -> &str {
    path.rsplit(is_separator).next().unwrap_or(path)
}

/// Converts a path into the marker form used by path-keyed filesystems.
pub fn path_marker(path: &str) -> Marker {
    simplify_segments(path).join("/").into_bytes()
}

/// How a request selects the filesystems it is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestKind {
    /// Matched against every mount, then the default filesystem.
    Normal,
    /// `N:/…`: resolved against mount `N` only.
    MountQualified(u32),
    /// Absolute path or non-numeric stem (`c:/…`): default filesystem only.
    DefaultQualified,
    /// More than one stem; resolves to nothing.
    Malformed,
}

/// A request split into segments without copying.
#[derive(Debug, Clone)]
pub(crate) struct ParsedRequest<'a> {
    pub kind: RequestKind,
    /// The request exactly as the caller passed it.
    pub original: &'a str,
    /// The request with any mount-id stem removed.
    body: &'a str,
    /// Byte ranges of the surviving segments inside `body`.
    segments: Vec<(usize, usize)>,
    /// `true` once a `.` or `..` segment was removed, so `body` no longer
    /// spells the segments contiguously.
    simplified: bool,
}

impl<'a> ParsedRequest<'a> {
    pub fn parse(request: &'a str) -> Self {
        let mut stem: Option<(usize, usize)> = None;
        let mut segment_begin = 0usize;
        let mut absolute = false;

        let bytes = request.as_bytes();
        let mut i = 0usize;
        while i < bytes.len() {
            let c = bytes[i] as char;
            if c == ':' && i + 1 < bytes.len() && is_separator(bytes[i + 1] as char) {
                if stem.is_some() {
                    log::warn!("Multiple stems in pathname: {request}");
                    return Self::malformed(request);
                }
                stem = Some((segment_begin, i));
                i += 2;
                segment_begin = i;
            } else if is_separator(c) {
                absolute = i == segment_begin;
                break;
            } else {
                i += 1;
            }
        }

        let body = match stem {
            Some(_) => &request[segment_begin..],
            None => request,
        };

        let mut segments: Vec<(usize, usize)> = Vec::new();
        let mut simplified = false;
        let mut offset = 0usize;
        for piece in body.split(is_separator) {
            let start = offset;
            offset += piece.len() + 1;
            match piece {
                "" => {}
                "." => simplified = true,
                ".." => {
                    simplified = true;
                    if segments.pop().is_none() {
                        absolute = true;
                        break;
                    }
                }
                _ => segments.push((start, start + piece.len())),
            }
        }

        let kind = match stem {
            Some((begin, end)) => match request[begin..end].parse::<u32>() {
                Ok(id) => RequestKind::MountQualified(id),
                Err(_) => RequestKind::DefaultQualified,
            },
            None if absolute => RequestKind::DefaultQualified,
            None => RequestKind::Normal,
        };

        Self {
            kind,
            original: request,
            body,
            segments,
            simplified,
        }
    }

    fn malformed(request: &'a str) -> Self {
        Self {
            kind: RequestKind::Malformed,
            original: request,
            body: "",
            segments: Vec::new(),
            simplified: false,
        }
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn segment(&self, index: usize) -> &'a str {
        let (start, end) = self.segments[index];
        &self.body[start..end]
    }

    /// The request from segment `from` onwards, as handed to a filesystem.
    ///
    /// Borrowed from the caller's buffer unless `.`/`..` removal forces a rebuild.
    pub fn remainder(&self, from: usize) -> Cow<'a, str> {
        if from >= self.segments.len() {
            return Cow::Borrowed("");
        }
        if self.simplified {
            let joined = (from..self.segments.len())
                .map(|i| self.segment(i))
                .collect::<Vec<_>>()
                .join("/");
            Cow::Owned(joined)
        } else {
            let start = self.segments[from].0;
            let end = self.segments[self.segments.len() - 1].1;
            Cow::Borrowed(&self.body[start..end])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinary_request_is_split_in_place() {
        let parsed = ParsedRequest::parse("data/textures\\grass.dds");
        assert_eq!(parsed.kind, RequestKind::Normal);
        assert_eq!(parsed.segment_count(), 3);
        assert_eq!(parsed.segment(1), "textures");
        assert!(matches!(parsed.remainder(1), Cow::Borrowed("textures\\grass.dds")));
        assert_eq!(parsed.remainder(3), "");
    }

    #[test]
    fn dot_segments_are_resolved() {
        let parsed = ParsedRequest::parse("./data/old/../new/./file.txt");
        assert_eq!(parsed.kind, RequestKind::Normal);
        assert_eq!(parsed.segment_count(), 3);
        assert_eq!(parsed.remainder(0), "data/new/file.txt");
        assert_eq!(parsed.remainder(1), "new/file.txt");
    }

    #[test]
    fn climbing_above_the_root_falls_back_to_default() {
        let parsed = ParsedRequest::parse("data/../../secret.txt");
        assert_eq!(parsed.kind, RequestKind::DefaultQualified);
    }

    #[test]
    fn absolute_and_drive_paths_are_default_qualified() {
        assert_eq!(
            ParsedRequest::parse("/usr/share/file").kind,
            RequestKind::DefaultQualified
        );
        assert_eq!(
            ParsedRequest::parse("c:/games/file").kind,
            RequestKind::DefaultQualified
        );
    }

    #[test]
    fn numeric_stem_names_a_mount() {
        let parsed = ParsedRequest::parse("12:/models/ship.dae");
        assert_eq!(parsed.kind, RequestKind::MountQualified(12));
        assert_eq!(parsed.remainder(0), "models/ship.dae");
    }

    #[test]
    fn second_stem_is_malformed() {
        assert_eq!(
            ParsedRequest::parse("1:/2:/file").kind,
            RequestKind::Malformed
        );
    }

    #[test]
    fn mount_points_are_normalized() {
        let rules = FilenameRules::default();
        let (point, segments) = normalize_mount_point("/game//data/", &rules);
        assert_eq!(point, "game/data/");
        assert_eq!(segments, vec!["game", "data"]);

        let (root, none) = normalize_mount_point("", &rules);
        assert_eq!(root, "");
        assert!(none.is_empty());
    }

    #[test]
    fn chained_hashes_match_between_mounts_and_requests() {
        let rules = FilenameRules::default();
        let whole = rules.hash_segments(["game", "data"]);
        let chained = rules.hash_segment("data", rules.hash_segment("game", ROOT_HASH_SEED));
        assert_eq!(whole, chained);
        assert_ne!(whole, rules.hash_segments(["data", "game"]));
    }

    #[test]
    fn case_folding_follows_the_rules() {
        let sensitive = FilenameRules::default();
        let insensitive = FilenameRules {
            case_sensitive: false,
            ..FilenameRules::default()
        };
        assert_ne!(
            sensitive.hash_segment("Data", ROOT_HASH_SEED),
            sensitive.hash_segment("data", ROOT_HASH_SEED)
        );
        assert_eq!(
            insensitive.hash_segment("Data", ROOT_HASH_SEED),
            insensitive.hash_segment("data", ROOT_HASH_SEED)
        );
        assert!(insensitive.segments_equal("Data", "dATA"));
    }

    #[test]
    fn file_name_and_marker_helpers() {
        assert_eq!(file_name("a/b\\c.txt"), "c.txt");
        assert_eq!(file_name("c.txt"), "c.txt");
        assert_eq!(path_marker("/a//b/./c"), b"a/b/c".to_vec());
    }
}
