//! Telegram Markdown escaping.
//!
//! Telegram's legacy Markdown parse mode assigns markup meaning to a fixed
//! set of characters. Message templates run their free-text fields (title,
//! excerpt, author line) through [`escape_markdown`] exactly once; URLs are
//! passed through untouched so Telegram can linkify them.

/// Characters Telegram treats as markup in `parse_mode: "Markdown"`.
/// The backslash itself is not in the set, so the pass is single-shot:
/// escaping already-escaped text double-escapes it.
const MARKDOWN_SPECIALS: [char; 18] = [
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Escape Telegram Markdown specials in a single left-to-right pass.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if MARKDOWN_SPECIALS.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
