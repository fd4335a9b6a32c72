use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Width of `s` in terminal columns (CJK and emoji count double).
///
/// ```
/// use charlist::util::display_width;
///
/// assert_eq!(display_width("Stitch"), 6);
/// assert_eq!(display_width("ミッキー"), 8);
/// ```
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Cut `s` down to at most `max_width` columns, ending in "..." when
/// something was dropped.
///
/// Widths too narrow for a character plus the ellipsis keep as many
/// leading characters as fit, without an ellipsis. Never splits a
/// character.
///
/// ```
/// use charlist::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Mickey Mouse", 20), "Mickey Mouse");
/// assert_eq!(truncate_to_width("Mickey Mouse", 9), "Mickey...");
/// assert_eq!(truncate_to_width("Mickey", 2), "Mi");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }
    if max_width <= ELLIPSIS_WIDTH {
        return Cow::Owned(take_columns(s, max_width).to_string());
    }
    let head = take_columns(s, max_width - ELLIPSIS_WIDTH);
    Cow::Owned(format!("{head}{ELLIPSIS}"))
}

/// Longest prefix of `s` that fits in `columns`.
fn take_columns(s: &str, columns: usize) -> &str {
    let mut used = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > columns {
            return &s[..idx];
        }
        used += w;
    }
    s
}

fn is_control(b: u8) -> bool {
    b == 0x7f || (b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r'))
}

/// Remove terminal control characters and ANSI escape sequences.
///
/// Character names come straight from the API and are printed to a
/// terminal, so CSI (`ESC [ ... final`) and OSC (`ESC ] ... BEL|ST`)
/// sequences, bare ESC, DEL and C0 controls other than tab, newline and
/// carriage return are dropped. Clean input is returned borrowed.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.bytes().any(|b| b == 0x1b || is_control(b)) {
        return Cow::Borrowed(s);
    }

    let bytes = s.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    let mut run_start = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if b != 0x1b && !is_control(b) {
            i += 1;
            continue;
        }

        // Flush the clean run; control bytes are ASCII so this is a char boundary
        out.push_str(&s[run_start..i]);

        i += 1;
        if b == 0x1b {
            match bytes.get(i) {
                Some(b'[') => {
                    i += 1;
                    while let Some(&c) = bytes.get(i) {
                        i += 1;
                        if (0x40..=0x7e).contains(&c) {
                            break;
                        }
                    }
                }
                Some(b']') => {
                    i += 1;
                    while let Some(&c) = bytes.get(i) {
                        if c == 0x07 {
                            i += 1;
                            break;
                        }
                        if c == 0x1b && bytes.get(i + 1) == Some(&b'\\') {
                            i += 2;
                            break;
                        }
                        i += 1;
                    }
                }
                _ => {}
            }
        }
        run_start = i;
    }
    out.push_str(&s[run_start..]);

    Cow::Owned(out)
}

/// Make API text safe for a single list row: strip control sequences and
/// fold line breaks and tabs into spaces.
pub fn single_line(s: &str) -> Cow<'_, str> {
    let stripped = strip_control_chars(s);
    if !stripped.contains(['\n', '\r', '\t']) {
        return stripped;
    }
    Cow::Owned(
        stripped
            .split(['\n', '\r', '\t'])
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" "),
    )
}
