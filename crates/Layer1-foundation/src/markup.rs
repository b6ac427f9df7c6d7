//! Terminal escape-sequence to client markup translation
//!
//! Process output carries ANSI SGR codes; the client renders a small
//! `<color=#RRGGBB>` / `<b>` markup instead. Anything not in the table is
//! dropped so raw escapes never reach the client.

use regex::{Captures, Regex};

lazy_static::lazy_static! {
    static ref ANSI_CODE: Regex = Regex::new(r"\x1b\[([\d;]*)([A-Za-z])").expect("valid ANSI regex");
}

/// Rewrite known color/style codes into markup, drop every other escape
pub fn translate(input: &str) -> String {
    if !input.contains('\x1b') {
        return input.to_string();
    }

    ANSI_CODE
        .replace_all(input, |caps: &Captures<'_>| match &caps[2] {
            "m" => caps[1].split(';').map(sgr_markup).collect::<String>(),
            _ => String::new(),
        })
        .into_owned()
}

/// Markup for a single SGR parameter
fn sgr_markup(code: &str) -> &'static str {
    match code {
        "" | "0" => "</color>",
        "30" => "<color=#000000>",
        "31" => "<color=#FF0000>",
        "32" => "<color=#00FF00>",
        "33" => "<color=#FFFF00>",
        "34" => "<color=#0000FF>",
        "35" => "<color=#FF00FF>",
        "36" => "<color=#00FFFF>",
        "37" => "<color=#FFFFFF>",
        "1" => "<b>",
        "22" => "</b>",
        _ => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(translate("hello world\n"), "hello world\n");
        assert_eq!(translate(""), "");
    }

    #[test]
    fn test_colors() {
        assert_eq!(
            translate("\x1b[31merror\x1b[0m"),
            "<color=#FF0000>error</color>"
        );
        assert_eq!(
            translate("\x1b[32mRunning program...\x1b[0m"),
            "<color=#00FF00>Running program...</color>"
        );
    }

    #[test]
    fn test_bold_and_compound() {
        assert_eq!(translate("\x1b[1mB\x1b[22m"), "<b>B</b>");
        assert_eq!(translate("\x1b[1;35mX"), "<b><color=#FF00FF>X");
        assert_eq!(translate("\x1b[mX"), "</color>X");
    }

    #[test]
    fn test_unknown_codes_dropped() {
        assert_eq!(translate("\x1b[91mbright\x1b[0m"), "bright</color>");
        assert_eq!(translate("a\x1b[2Kb\x1b[1Ac"), "abc");
        assert_eq!(translate("\x1b[4;31mu"), "<color=#FF0000>u");
    }
}
