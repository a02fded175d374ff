// LedgerGit - Git objects on a remote ledger
// Copyright (C) 2025 LedgerGit Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! Line-based unified patches
//!
//! Patches are informational: they travel alongside a changed blob for
//! review and audit, while the stored content is always the full new blob.

use std::fmt::Write;

/// Lines of context around each hunk
pub const CONTEXT_LINES: usize = 3;

/// Above this many line pairs the LCS table is skipped and the whole file
/// is reported as replaced.
const MAX_LCS_CELLS: usize = 4_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Equal,
    Delete,
    Insert,
}

/// Unified diff of `old` against `new` for the file at `path`
///
/// Returns an empty string when the contents are identical.
///
/// # Examples
///
/// ```
/// use ledgergit_versioning::line_patch;
///
/// let patch = line_patch("notes.txt", "a\nb\nc\n", "a\nB\nc\n");
/// assert!(patch.contains("@@ -1,3 +1,3 @@"));
/// assert!(patch.contains("-b\n+B\n"));
/// ```
pub fn line_patch(path: &str, old: &str, new: &str) -> String {
    if old == new {
        return String::new();
    }

    let old_lines: Vec<&str> = old.split_inclusive('\n').collect();
    let new_lines: Vec<&str> = new.split_inclusive('\n').collect();
    let script = edit_script(&old_lines, &new_lines);

    let mut out = String::new();
    let _ = writeln!(out, "--- a/{}", path);
    let _ = writeln!(out, "+++ b/{}", path);

    // (old index, new index) before each op
    let mut positions = Vec::with_capacity(script.len() + 1);
    let (mut o, mut n) = (0usize, 0usize);
    for op in &script {
        positions.push((o, n));
        match op {
            Op::Equal => {
                o += 1;
                n += 1;
            }
            Op::Delete => o += 1,
            Op::Insert => n += 1,
        }
    }
    positions.push((o, n));

    for (start, end) in hunk_ranges(&script) {
        let old_len = script[start..end].iter().filter(|op| **op != Op::Insert).count();
        let new_len = script[start..end].iter().filter(|op| **op != Op::Delete).count();
        let (old_start, new_start) = positions[start];
        let _ = writeln!(
            out,
            "@@ -{} +{} @@",
            range_label(old_start, old_len),
            range_label(new_start, new_len)
        );

        for idx in start..end {
            let (oi, ni) = positions[idx];
            let (marker, line) = match script[idx] {
                Op::Equal => (' ', old_lines[oi]),
                Op::Delete => ('-', old_lines[oi]),
                Op::Insert => ('+', new_lines[ni]),
            };
            out.push(marker);
            out.push_str(line);
            if !line.ends_with('\n') {
                out.push_str("\n\\ No newline at end of file\n");
            }
        }
    }
    out
}

fn range_label(start: usize, len: usize) -> String {
    // Empty ranges point at the line before the hunk.
    let first = if len == 0 { start } else { start + 1 };
    format!("{},{}", first, len)
}

/// Shortest edit script via a longest-common-subsequence table
fn edit_script(old: &[&str], new: &[&str]) -> Vec<Op> {
    let (n, m) = (old.len(), new.len());
    if n.saturating_mul(m) > MAX_LCS_CELLS {
        let mut ops = vec![Op::Delete; n];
        ops.extend(std::iter::repeat(Op::Insert).take(m));
        return ops;
    }

    // lcs[i][j] = LCS length of old[i..] and new[j..]
    let width = m + 1;
    let mut lcs = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i * width + j] = if old[i] == new[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let mut ops = Vec::with_capacity(n + m);
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if old[i] == new[j] {
            ops.push(Op::Equal);
            i += 1;
            j += 1;
        } else if lcs[(i + 1) * width + j] >= lcs[i * width + j + 1] {
            ops.push(Op::Delete);
            i += 1;
        } else {
            ops.push(Op::Insert);
            j += 1;
        }
    }
    ops.extend(std::iter::repeat(Op::Delete).take(n - i));
    ops.extend(std::iter::repeat(Op::Insert).take(m - j));
    ops
}

/// Group changed ops into `[start, end)` ranges padded with context
fn hunk_ranges(script: &[Op]) -> Vec<(usize, usize)> {
    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for (idx, op) in script.iter().enumerate() {
        if *op == Op::Equal {
            continue;
        }
        let start = idx.saturating_sub(CONTEXT_LINES);
        let end = (idx + 1 + CONTEXT_LINES).min(script.len());
        match ranges.last_mut() {
            Some(last) if start <= last.1 => last.1 = end,
            _ => ranges.push((start, end)),
        }
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_is_empty() {
        assert_eq!(line_patch("f", "same\n", "same\n"), "");
    }

    #[test]
    fn test_new_file() {
        let patch = line_patch("README.md", "", "hello\n");
        assert_eq!(patch, "--- a/README.md\n+++ b/README.md\n@@ -0,0 +1,1 @@\n+hello\n");
    }

    #[test]
    fn test_missing_trailing_newline_marker() {
        let patch = line_patch("f", "a\n", "a");
        assert!(patch.contains("-a\n+a\n\\ No newline at end of file\n"));
    }

    #[test]
    fn test_distant_changes_make_two_hunks() {
        let old: String = (0..20).map(|i| format!("{}\n", i)).collect();
        let new: String = (0..20)
            .map(|i| match i {
                2 => "two\n".to_string(),
                17 => "seventeen\n".to_string(),
                _ => format!("{}\n", i),
            })
            .collect();
        let patch = line_patch("nums", &old, &new);
        assert_eq!(patch.matches("@@ ").count(), 2);
        assert!(patch.contains("@@ -1,6 +1,6 @@"));
    }

    #[test]
    fn test_close_changes_share_a_hunk() {
        let old = "1\n2\n3\n4\n5\n";
        let new = "1\nx\n3\ny\n5\n";
        let patch = line_patch("f", old, new);
        assert_eq!(patch.matches("@@ ").count(), 1);
        assert!(patch.contains("@@ -1,5 +1,5 @@"));
    }
}
