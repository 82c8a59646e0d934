//! IRC control-code markup to Telegram HTML.
//!
//! A single left-to-right scan with three independent toggle states (bold,
//! italic, underline). Color directives are swallowed, never rendered. The
//! output is always well-bracketed: a reset closes every open style in the
//! fixed order bold, italic, underline, and the same closure runs at end of
//! input for anything still open.

use tgbridge_proto::format::{BOLD, COLOR, ITALIC, RESET, UNDERLINE};

struct StyleTags {
    open: &'static str,
    close: &'static str,
}

/// Converter from IRC control codes to HTML tags.
///
/// When disabled the tags are empty: control codes are still consumed, only
/// the plain text (escaped for HTML) survives.
pub struct StyleConverter {
    bold: StyleTags,
    italic: StyleTags,
    underline: StyleTags,
}

impl StyleConverter {
    /// Create a converter; `enabled` selects real tags or empty ones.
    pub fn new(enabled: bool) -> Self {
        if enabled {
            Self {
                bold: StyleTags {
                    open: "<b>",
                    close: "</b>",
                },
                italic: StyleTags {
                    open: "<i>",
                    close: "</i>",
                },
                underline: StyleTags {
                    open: "<u>",
                    close: "</u>",
                },
            }
        } else {
            let empty = || StyleTags {
                open: "",
                close: "",
            };
            Self {
                bold: empty(),
                italic: empty(),
                underline: empty(),
            }
        }
    }

    /// Convert one message.
    pub fn convert(&self, text: &str) -> String {
        let mut bold = false;
        let mut italic = false;
        let mut underline = false;
        // Pending color digits to swallow after a color introducer.
        let mut skip_digits = 0u8;
        let mut out = String::with_capacity(text.len());

        for c in text.chars() {
            if skip_digits > 0 {
                if c.is_ascii_digit() {
                    skip_digits -= 1;
                    continue;
                }
                skip_digits = 0;
            }
            match c {
                BOLD => {
                    out.push_str(if bold { self.bold.close } else { self.bold.open });
                    bold = !bold;
                }
                COLOR => skip_digits = 2,
                RESET => {
                    if bold {
                        out.push_str(self.bold.close);
                    }
                    if italic {
                        out.push_str(self.italic.close);
                    }
                    if underline {
                        out.push_str(self.underline.close);
                    }
                    bold = false;
                    italic = false;
                    underline = false;
                }
                ITALIC => {
                    out.push_str(if italic {
                        self.italic.close
                    } else {
                        self.italic.open
                    });
                    italic = !italic;
                }
                UNDERLINE => {
                    out.push_str(if underline {
                        self.underline.close
                    } else {
                        self.underline.open
                    });
                    underline = !underline;
                }
                _ => push_escaped(&mut out, c),
            }
        }

        // Force-close anything left open so the output is well-bracketed
        // even when the input ended mid-style.
        if bold {
            out.push_str(self.bold.close);
        }
        if italic {
            out.push_str(self.italic.close);
        }
        if underline {
            out.push_str(self.underline.close);
        }
        out
    }
}

/// The three characters with syntactic meaning in HTML become numeric
/// character references; everything else passes through.
fn push_escaped(out: &mut String, c: char) {
    match c {
        '<' | '>' | '&' => {
            out.push_str("&#");
            out.push_str(&(c as u32).to_string());
            out.push(';');
        }
        _ => out.push(c),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled() -> StyleConverter {
        StyleConverter::new(true)
    }

    #[test]
    fn test_bold_toggles() {
        assert_eq!(enabled().convert("\x02bold\x02 plain"), "<b>bold</b> plain");
    }

    #[test]
    fn test_disabled_strips_codes() {
        let converter = StyleConverter::new(false);
        assert_eq!(converter.convert("\x02bold\x02 plain"), "bold plain");
        assert_eq!(converter.convert("\x034red\x0f text"), "red text");
    }

    #[test]
    fn test_italic_and_underline() {
        assert_eq!(enabled().convert("\x1ditalic\x1d"), "<i>italic</i>");
        assert_eq!(enabled().convert("\x1funder\x1f"), "<u>under</u>");
    }

    #[test]
    fn test_color_digits_swallowed() {
        assert_eq!(enabled().convert("\x034red"), "red");
        assert_eq!(enabled().convert("\x0304red"), "red");
        // Only up to two digits belong to the directive.
        assert_eq!(enabled().convert("\x03123"), "3");
    }

    #[test]
    fn test_color_without_digits() {
        // The first non-digit after the introducer is ordinary text.
        assert_eq!(enabled().convert("\x03text"), "text");
    }

    #[test]
    fn test_reset_closes_in_fixed_order() {
        assert_eq!(enabled().convert("\x02\x1dab\x0f"), "<b><i>ab</b></i>");
        // Reset with nothing open emits nothing.
        assert_eq!(enabled().convert("a\x0fb"), "ab");
    }

    #[test]
    fn test_eof_closes_open_styles() {
        assert_eq!(enabled().convert("\x02bold"), "<b>bold</b>");
        assert_eq!(enabled().convert("\x02\x1d\x1fx"), "<b><i><u>x</b></i></u>");
    }

    #[test]
    fn test_escapes_html() {
        assert_eq!(enabled().convert("<x> & y"), "&#60;x&#62; &#38; y");
    }

    #[test]
    fn test_escaping_applies_when_disabled() {
        let converter = StyleConverter::new(false);
        assert_eq!(converter.convert("a<b"), "a&#60;b");
    }

    #[test]
    fn test_output_always_balanced() {
        // Adversarial inputs: dangling toggles, bare resets, truncated colors.
        let inputs = [
            "\x02\x02\x02",
            "\x0f\x0f",
            "\x03",
            "\x02a\x1db\x1fc",
            "\x02\x03 9 9\x1d",
        ];
        for input in inputs {
            let out = enabled().convert(input);
            for tag in ["<b>", "<i>", "<u>"] {
                let close = format!("</{}", &tag[1..]);
                assert_eq!(
                    out.matches(tag).count(),
                    out.matches(&close).count(),
                    "unbalanced {tag} in output {out:?} for input {input:?}"
                );
            }
        }
    }
}
