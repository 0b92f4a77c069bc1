use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: &str = "…";
const ELLIPSIS_WIDTH: usize = 1;

/// Terminal columns occupied by `s` (CJK and emoji count double).
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Fit `s` into `max_width` columns, ending with "…" when cut.
///
/// Wide characters are never split; a cut that would land inside one drops
/// it entirely. Returns the input borrowed when it already fits.
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if display_width(s) <= max_width {
        return Cow::Borrowed(s);
    }
    if max_width < ELLIPSIS_WIDTH {
        return Cow::Borrowed("");
    }

    let budget = max_width - ELLIPSIS_WIDTH;
    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        end = idx + c.len_utf8();
    }

    let mut out = String::with_capacity(end + ELLIPSIS.len());
    out.push_str(&s[..end]);
    out.push_str(ELLIPSIS);
    Cow::Owned(out)
}

/// Drop terminal control characters and ANSI escape sequences.
///
/// Product text can come from a remote API and is drawn straight into the
/// terminal, so nothing that moves the cursor or changes modes may survive.
pub fn sanitize(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_control) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\x1b' => match chars.peek() {
                // CSI: parameters until a final byte in @..~
                Some('[') => {
                    chars.next();
                    for c in chars.by_ref() {
                        if ('@'..='~').contains(&c) {
                            break;
                        }
                    }
                }
                // OSC: until BEL or ESC \
                Some(']') => {
                    chars.next();
                    while let Some(c) = chars.next() {
                        if c == '\x07' {
                            break;
                        }
                        if c == '\x1b' && chars.peek() == Some(&'\\') {
                            chars.next();
                            break;
                        }
                    }
                }
                _ => {}
            },
            c if is_control(c) => {}
            c => out.push(c),
        }
    }
    Cow::Owned(out)
}

fn is_control(c: char) -> bool {
    c.is_control() && c != '\t'
}

/// Whole-unit price with thousands separators, e.g. `$1,099`.
pub fn format_price(price: u32) -> String {
    let digits = price.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    out.push('$');
    for (i, d) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(d);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fits_is_borrowed() {
        assert!(matches!(truncate_to_width("Desk Lamp", 20), Cow::Borrowed(_)));
        assert_eq!(truncate_to_width("12345", 5), "12345");
    }

    #[test]
    fn test_ascii_truncation() {
        assert_eq!(truncate_to_width("Wireless Headphones", 9), "Wireless…");
        assert_eq!(truncate_to_width("abc", 0), "");
        assert_eq!(truncate_to_width("abc", 1), "…");
    }

    #[test]
    fn test_wide_characters_are_not_split() {
        // Each ideograph is two columns.
        assert_eq!(display_width("电脑配件"), 8);
        assert_eq!(truncate_to_width("电脑配件", 5), "电脑…");
        assert_eq!(truncate_to_width("电脑配件", 6), "电脑…");
        assert_eq!(truncate_to_width("电脑配件", 7), "电脑配…");
    }

    #[test]
    fn test_truncated_output_fits() {
        for width in 0..20 {
            let cut = truncate_to_width("Ergonomic 办公椅 Pro 🎧", width);
            assert!(display_width(&cut) <= width, "width {width}: {cut}");
        }
    }

    #[test]
    fn test_sanitize_clean_text_is_borrowed() {
        assert!(matches!(sanitize("Coffee Grinder\twith timer"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_sanitize_strips_escapes_and_controls() {
        assert_eq!(sanitize("\x1b[31mRed\x1b[0m Kettle"), "Red Kettle");
        assert_eq!(sanitize("\x1b]0;title\x07Mug"), "Mug");
        assert_eq!(sanitize("\x1b]0;title\x1b\\Mug"), "Mug");
        assert_eq!(sanitize("line\nbreak\x00\x7f"), "linebreak");
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0), "$0");
        assert_eq!(format_price(349), "$349");
        assert_eq!(format_price(1099), "$1,099");
        assert_eq!(format_price(10_000), "$10,000");
        assert_eq!(format_price(1_234_567), "$1,234,567");
    }
}
