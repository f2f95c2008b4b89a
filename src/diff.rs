// src/diff.rs

//! Line-oriented diff rendering for notification payloads.
//!
//! Two snapshots are compared line by line; the result is rendered in one
//! of two shapes:
//!
//! - an annotated listing where changed lines carry `(removed)` /
//!   `(added)` / `(changed)` / `(into)` prefixes, filtered by the
//!   [`DiffOptions`] include flags, or
//! - a unified patch (`patch_format`) with `---` / `+++` headers and
//!   `@@` hunks, three lines of context.
//!
//! The opcode computation is exposed so tests can verify that replaying
//! the opcodes over the "before" lines reconstructs the "after" lines.

/// How one run of lines in the before-text maps to the after-text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpTag {
    Equal,
    Delete,
    Insert,
    Replace,
}

/// A half-open run `[a_start, a_end)` in the before lines mapped to
/// `[b_start, b_end)` in the after lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub tag: OpTag,
    pub a_start: usize,
    pub a_end: usize,
    pub b_start: usize,
    pub b_end: usize,
}

/// Options controlling which lines appear in the rendered diff.
#[derive(Debug, Clone)]
pub struct DiffOptions<'a> {
    pub include_equal: bool,
    pub include_removed: bool,
    pub include_added: bool,
    pub include_replaced: bool,
    /// Prefix changed lines with `(added)` / `(removed)` / `(changed)` /
    /// `(into)` markers.
    pub include_change_type_prefix: bool,
    /// Separator between rendered lines (`<br>` for HTML payloads).
    pub line_feed_sep: &'a str,
    /// Render as a unified patch instead of the annotated listing.
    pub patch_format: bool,
}

impl Default for DiffOptions<'static> {
    fn default() -> Self {
        Self {
            include_equal: false,
            include_removed: true,
            include_added: true,
            include_replaced: true,
            include_change_type_prefix: true,
            line_feed_sep: "\n",
            patch_format: false,
        }
    }
}

/// Render the difference between two versions of a snapshot.
///
/// Lines are compared with trailing whitespace stripped, matching how
/// snapshots are stored.
pub fn render_diff(previous: &str, current: &str, opts: &DiffOptions<'_>) -> String {
    let before: Vec<&str> = previous.lines().map(|l| l.trim_end()).collect();
    let after: Vec<&str> = current.lines().map(|l| l.trim_end()).collect();

    let ops = opcodes(&before, &after);

    let rendered = if opts.patch_format {
        unified_patch(&before, &after, &ops)
    } else {
        annotated_lines(&before, &after, &ops, opts)
    };

    rendered.join(opts.line_feed_sep)
}

/// Compute diff opcodes between two line slices.
///
/// Common prefix and suffix are trimmed first, then a longest-common-
/// subsequence walk produces `Equal`/`Delete`/`Insert` runs; an adjacent
/// delete+insert pair collapses into a single `Replace`.
pub fn opcodes(a: &[&str], b: &[&str]) -> Vec<Opcode> {
    // Trim common prefix.
    let mut prefix = 0;
    while prefix < a.len() && prefix < b.len() && a[prefix] == b[prefix] {
        prefix += 1;
    }
    // Trim common suffix (without overlapping the prefix).
    let mut suffix = 0;
    while suffix < a.len() - prefix && suffix < b.len() - prefix
        && a[a.len() - 1 - suffix] == b[b.len() - 1 - suffix]
    {
        suffix += 1;
    }

    let mid_a = &a[prefix..a.len() - suffix];
    let mid_b = &b[prefix..b.len() - suffix];

    let mut ops = Vec::new();
    if prefix > 0 {
        ops.push(Opcode {
            tag: OpTag::Equal,
            a_start: 0,
            a_end: prefix,
            b_start: 0,
            b_end: prefix,
        });
    }

    ops.extend(middle_opcodes(mid_a, mid_b, prefix));

    if suffix > 0 {
        ops.push(Opcode {
            tag: OpTag::Equal,
            a_start: a.len() - suffix,
            a_end: a.len(),
            b_start: b.len() - suffix,
            b_end: b.len(),
        });
    }

    coalesce(ops)
}

/// LCS-based opcodes for the trimmed middle section. `offset` shifts the
/// reported indices back into full-slice coordinates (the trimmed prefix
/// length is the same on both sides).
fn middle_opcodes(a: &[&str], b: &[&str], offset: usize) -> Vec<Opcode> {
    let n = a.len();
    let m = b.len();
    if n == 0 && m == 0 {
        return Vec::new();
    }

    // lcs[i][j] = length of the LCS of a[i..] and b[j..], flattened.
    let width = m + 1;
    let mut lcs = vec![0u32; (n + 1) * width];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i * width + j] = if a[i] == b[j] {
                lcs[(i + 1) * width + j + 1] + 1
            } else {
                lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
            };
        }
    }

    let mut ops = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n || j < m {
        if i < n && j < m && a[i] == b[j] {
            let (ai, bj) = (i, j);
            while i < n && j < m && a[i] == b[j] {
                i += 1;
                j += 1;
            }
            ops.push(Opcode {
                tag: OpTag::Equal,
                a_start: offset + ai,
                a_end: offset + i,
                b_start: offset + bj,
                b_end: offset + j,
            });
        } else if j >= m || (i < n && lcs[(i + 1) * width + j] >= lcs[i * width + j + 1]) {
            let ai = i;
            while i < n
                && (j >= m
                    || (a[i] != b[j] && lcs[(i + 1) * width + j] >= lcs[i * width + j + 1]))
            {
                i += 1;
            }
            ops.push(Opcode {
                tag: OpTag::Delete,
                a_start: offset + ai,
                a_end: offset + i,
                b_start: offset + j,
                b_end: offset + j,
            });
        } else {
            let bj = j;
            while j < m
                && (i >= n
                    || (a[i] != b[j] && lcs[(i + 1) * width + j] < lcs[i * width + j + 1]))
            {
                j += 1;
            }
            ops.push(Opcode {
                tag: OpTag::Insert,
                a_start: offset + i,
                a_end: offset + i,
                b_start: offset + bj,
                b_end: offset + j,
            });
        }
    }

    ops
}

/// Merge adjacent runs of the same tag and collapse delete+insert pairs
/// into `Replace` opcodes.
fn coalesce(ops: Vec<Opcode>) -> Vec<Opcode> {
    let mut out: Vec<Opcode> = Vec::with_capacity(ops.len());

    for op in ops {
        if let Some(last) = out.last_mut() {
            if last.tag == op.tag && last.a_end == op.a_start && last.b_end == op.b_start {
                last.a_end = op.a_end;
                last.b_end = op.b_end;
                continue;
            }
            let is_replace_pair = (last.tag == OpTag::Delete && op.tag == OpTag::Insert)
                || (last.tag == OpTag::Insert && op.tag == OpTag::Delete);
            if is_replace_pair && last.a_end == op.a_start && last.b_end == op.b_start {
                // Adjacent removal and insertion describe a replacement.
                last.tag = OpTag::Replace;
                last.a_end = op.a_end;
                last.b_end = op.b_end;
                continue;
            }
        }
        out.push(op);
    }

    out
}

fn annotated_lines(
    before: &[&str],
    after: &[&str],
    ops: &[Opcode],
    opts: &DiffOptions<'_>,
) -> Vec<String> {
    let mut lines = Vec::new();

    for op in ops {
        match op.tag {
            OpTag::Equal if opts.include_equal => {
                lines.extend(before[op.a_start..op.a_end].iter().map(|l| l.to_string()));
            }
            OpTag::Equal => {}
            OpTag::Delete if opts.include_removed => {
                for l in &before[op.a_start..op.a_end] {
                    lines.push(prefixed("(removed) ", l, opts));
                }
            }
            OpTag::Delete => {}
            OpTag::Insert if opts.include_added => {
                for l in &after[op.b_start..op.b_end] {
                    lines.push(prefixed("(added) ", l, opts));
                }
            }
            OpTag::Insert => {}
            OpTag::Replace if opts.include_replaced => {
                for l in &before[op.a_start..op.a_end] {
                    lines.push(prefixed("(changed) ", l, opts));
                }
                for l in &after[op.b_start..op.b_end] {
                    lines.push(prefixed("(into) ", l, opts));
                }
            }
            OpTag::Replace => {}
        }
    }

    lines
}

fn prefixed(prefix: &str, line: &str, opts: &DiffOptions<'_>) -> String {
    if opts.include_change_type_prefix {
        format!("{prefix}{line}")
    } else {
        line.to_string()
    }
}

/// Number of unchanged context lines around each patch hunk.
const PATCH_CONTEXT: usize = 3;

fn unified_patch(before: &[&str], after: &[&str], ops: &[Opcode]) -> Vec<String> {
    let groups = grouped_opcodes(ops);
    if groups.is_empty() {
        return Vec::new();
    }

    let mut lines = vec!["---".to_string(), "+++".to_string()];

    for group in groups {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        lines.push(format!(
            "@@ -{} +{} @@",
            format_range(first.a_start, last.a_end),
            format_range(first.b_start, last.b_end),
        ));

        for op in &group {
            match op.tag {
                OpTag::Equal => {
                    for l in &before[op.a_start..op.a_end] {
                        lines.push(format!(" {l}"));
                    }
                }
                _ => {
                    for l in &before[op.a_start..op.a_end] {
                        lines.push(format!("-{l}"));
                    }
                    for l in &after[op.b_start..op.b_end] {
                        lines.push(format!("+{l}"));
                    }
                }
            }
        }
    }

    lines
}

/// Split opcodes into hunk groups, clamping leading/trailing context to
/// [`PATCH_CONTEXT`] lines and splitting where an unchanged run is wide
/// enough to separate two hunks.
fn grouped_opcodes(ops: &[Opcode]) -> Vec<Vec<Opcode>> {
    let mut ops: Vec<Opcode> = ops
        .iter()
        .copied()
        .filter(|op| !(op.a_start == op.a_end && op.b_start == op.b_end))
        .collect();

    if ops.iter().all(|op| op.tag == OpTag::Equal) {
        return Vec::new();
    }

    // Clamp the leading and trailing equal runs.
    if let Some(first) = ops.first_mut() {
        if first.tag == OpTag::Equal {
            let len = first.a_end - first.a_start;
            if len > PATCH_CONTEXT {
                first.a_start = first.a_end - PATCH_CONTEXT;
                first.b_start = first.b_end - PATCH_CONTEXT;
            }
        }
    }
    if let Some(last) = ops.last_mut() {
        if last.tag == OpTag::Equal {
            let len = last.a_end - last.a_start;
            if len > PATCH_CONTEXT {
                last.a_end = last.a_start + PATCH_CONTEXT;
                last.b_end = last.b_start + PATCH_CONTEXT;
            }
        }
    }

    let mut groups = Vec::new();
    let mut group: Vec<Opcode> = Vec::new();

    for op in ops {
        if op.tag == OpTag::Equal && op.a_end - op.a_start > PATCH_CONTEXT * 2 && !group.is_empty()
        {
            // Wide unchanged run: close the current hunk with trailing
            // context and open the next with leading context.
            let mut tail = op;
            tail.a_end = tail.a_start + PATCH_CONTEXT;
            tail.b_end = tail.b_start + PATCH_CONTEXT;
            group.push(tail);
            groups.push(std::mem::take(&mut group));

            let mut head = op;
            head.a_start = head.a_end - PATCH_CONTEXT;
            head.b_start = head.b_end - PATCH_CONTEXT;
            group.push(head);
        } else {
            group.push(op);
        }
    }

    if group.iter().any(|op| op.tag != OpTag::Equal) {
        groups.push(group);
    }

    groups
}

/// Format a hunk range as `start,length` (1-based), omitting the length
/// when it is exactly one line.
fn format_range(start: usize, end: usize) -> String {
    let length = end - start;
    let begin = if length == 0 { start } else { start + 1 };
    if length == 1 {
        format!("{begin}")
    } else {
        format!("{begin},{length}")
    }
}
