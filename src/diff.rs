//! Incremental text-diff utility.
//!
//! Produces a minimal sequence of find-and-replace ops from two text
//! snapshots. Client editors use it to compress local edits into change
//! requests. Applying the returned ops left-to-right on the old text,
//! replacing the first occurrence of each target, yields the new text.

/// One find-and-replace record. `position` is a byte offset into the old
/// text, matching the change engine's first-occurrence semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOp {
    pub text_to_replace: String,
    pub new_text: String,
    pub position: usize,
}

/// Diff two snapshots into at most one replacement op.
///
/// Word-level pass first, then a character-level fallback, then a whole-text
/// replacement as the last resort. Identical inputs produce no ops.
pub fn diff(old_text: &str, new_text: &str) -> Vec<DiffOp> {
    if old_text == new_text {
        return Vec::new();
    }
    if let Some(op) = word_diff(old_text, new_text) {
        return vec![op];
    }
    if let Some(op) = char_diff(old_text, new_text) {
        return vec![op];
    }
    vec![DiffOp {
        text_to_replace: old_text.to_string(),
        new_text: new_text.to_string(),
        position: 0,
    }]
}

/// Apply ops with the engine's semantics: left-to-right, each replacing the
/// first occurrence of its target.
pub fn apply_ops(text: &str, ops: &[DiffOp]) -> String {
    let mut out = text.to_string();
    for op in ops {
        if let Some(pos) = out.find(&op.text_to_replace) {
            out.replace_range(pos..pos + op.text_to_replace.len(), &op.new_text);
        }
    }
    out
}

/// Split into alternating word and whitespace-run tokens, preserving
/// separators.
fn tokenize(s: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut current_is_ws: Option<bool> = None;
    for (i, ch) in s.char_indices() {
        let is_ws = ch.is_whitespace();
        match current_is_ws {
            Some(prev) if prev == is_ws => {}
            Some(_) => {
                tokens.push(&s[start..i]);
                start = i;
                current_is_ws = Some(is_ws);
            }
            None => current_is_ws = Some(is_ws),
        }
    }
    if current_is_ws.is_some() {
        tokens.push(&s[start..]);
    }
    tokens
}

/// Word-level pass: longest matching token prefix and suffix (non-
/// overlapping), one op for the differing middle.
fn word_diff(old_text: &str, new_text: &str) -> Option<DiffOp> {
    let a = tokenize(old_text);
    let b = tokenize(new_text);

    let mut prefix = 0;
    while prefix < a.len() && prefix < b.len() && a[prefix] == b[prefix] {
        prefix += 1;
    }
    let mut suffix = 0;
    while suffix < a.len() - prefix
        && suffix < b.len() - prefix
        && a[a.len() - 1 - suffix] == b[b.len() - 1 - suffix]
    {
        suffix += 1;
    }

    let old_mid: String = a[prefix..a.len() - suffix].concat();
    let new_mid: String = b[prefix..b.len() - suffix].concat();
    if old_mid.is_empty() && new_mid.is_empty() {
        // Token streams agree yet the strings differ; let the character
        // pass sort it out.
        return None;
    }

    // Fold prefix tokens back into the op until its target's first
    // occurrence lands exactly at the recorded position. Keeps the
    // round-trip guarantee when the middle repeats earlier in the text.
    for kept in (0..=prefix).rev() {
        let position: usize = a[..kept].iter().map(|t| t.len()).sum();
        let op_old: String = a[kept..a.len() - suffix].concat();
        let op_new: String = b[kept..b.len() - suffix].concat();
        if old_text.find(op_old.as_str()) == Some(position) {
            return Some(DiffOp {
                text_to_replace: op_old,
                new_text: op_new,
                position,
            });
        }
    }
    None
}

/// Character-level fallback: longest common prefix and suffix on char
/// boundaries, one op for the differing middle.
fn char_diff(old_text: &str, new_text: &str) -> Option<DiffOp> {
    let mut prefix = 0;
    for (ca, cb) in old_text.chars().zip(new_text.chars()) {
        if ca != cb {
            break;
        }
        prefix += ca.len_utf8();
    }

    let max_suffix = old_text.len().min(new_text.len()) - prefix;
    let mut suffix = 0;
    for (ca, cb) in old_text.chars().rev().zip(new_text.chars().rev()) {
        if ca != cb || suffix + ca.len_utf8() > max_suffix {
            break;
        }
        suffix += ca.len_utf8();
    }

    let old_mid = &old_text[prefix..old_text.len() - suffix];
    let new_mid = &new_text[prefix..new_text.len() - suffix];
    if old_mid.is_empty() && new_mid.is_empty() {
        return None;
    }

    // Same fold-back guard as the word pass, one char at a time.
    let mut kept = prefix;
    loop {
        let op_old = &old_text[kept..old_text.len() - suffix];
        if old_text.find(op_old) == Some(kept) {
            return Some(DiffOp {
                text_to_replace: op_old.to_string(),
                new_text: new_text[kept..new_text.len() - suffix].to_string(),
                position: kept,
            });
        }
        if kept == 0 {
            return None;
        }
        kept -= 1;
        while !old_text.is_char_boundary(kept) {
            kept -= 1;
        }
    }
}
