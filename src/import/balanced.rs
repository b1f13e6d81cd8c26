//! Nested span removal
//!
//! Templates, tables and file links nest to arbitrary depth, which a single
//! regular expression cannot track. These helpers match delimiters with an
//! explicit stack in one forward pass, collect the byte ranges to drop, and
//! rebuild the string from what is left. All delimiters are ASCII, so every
//! range boundary falls on a UTF-8 character boundary.

use std::ops::Range;

/// Handling of an opening delimiter that never closes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unclosed {
    /// Drop everything from the outermost unclosed opener to the end
    DropRest,
    /// Leave the unclosed opener and its content in place
    Keep,
}

/// Matched delimiter pairs as `open_start..close_end`, plus unclosed openers
fn matched_pairs(bytes: &[u8], open: &[u8], close: &[u8]) -> (Vec<Range<usize>>, Vec<usize>) {
    let mut stack = Vec::new();
    let mut pairs = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i..].starts_with(open) {
            stack.push(i);
            i += open.len();
        } else if bytes[i..].starts_with(close) {
            // A closer with nothing open is plain text
            if let Some(start) = stack.pop() {
                pairs.push(start..i + close.len());
            }
            i += close.len();
        } else {
            i += 1;
        }
    }

    (pairs, stack)
}

/// Rebuild `text` without the given ranges; overlapping and nested ranges are merged
fn remove_spans(text: &str, mut spans: Vec<Range<usize>>) -> String {
    if spans.is_empty() {
        return text.to_string();
    }
    spans.sort_by_key(|r| r.start);

    let mut result = String::with_capacity(text.len());
    let mut cursor = 0;
    for span in spans {
        if span.start >= cursor {
            result.push_str(&text[cursor..span.start]);
            cursor = span.end;
        } else if span.end > cursor {
            cursor = span.end;
        }
    }
    result.push_str(&text[cursor..]);
    result
}

/// Remove every `open ... close` span, however deeply nested.
///
/// `{{a{{b}}c}}` is removed as one span rather than stopping at the first `}}`.
pub fn remove_balanced(text: &str, open: &str, close: &str, unclosed: Unclosed) -> String {
    let (mut spans, open_stack) = matched_pairs(text.as_bytes(), open.as_bytes(), close.as_bytes());

    if unclosed == Unclosed::DropRest {
        if let Some(&first) = open_stack.first() {
            spans.push(first..text.len());
        }
    }

    remove_spans(text, spans)
}

/// Remove `[[prefix:...]]` links, counting single brackets so captions may
/// contain further `[...]` or `[[...]]` links at any depth.
///
/// Prefixes match case-insensitively and may be followed by spaces before the
/// colon. Unterminated links are left alone.
pub fn remove_prefixed_links(text: &str, prefixes: &[String]) -> String {
    let lowered: Vec<String> = prefixes.iter().map(|p| p.to_lowercase()).collect();
    let (pairs, _) = matched_pairs(text.as_bytes(), b"[", b"]");

    let spans = pairs
        .into_iter()
        .filter(|span| {
            let head = &text[span.start..];
            head.starts_with("[[") && starts_with_namespace(&head[2..], &lowered)
        })
        .collect();

    remove_spans(text, spans)
}

fn starts_with_namespace(target: &str, lowered_prefixes: &[String]) -> bool {
    lowered_prefixes.iter().any(|prefix| {
        let Some(head) = target.get(..prefix.len()) else {
            return false;
        };
        if head.to_lowercase() != *prefix {
            return false;
        }
        target[prefix.len()..].trim_start().starts_with(':')
    })
}
