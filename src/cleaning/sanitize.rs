//! スプレッドシートに書けない制御文字の除去

use regex::Regex;

/// 制御文字（タブ・改行以外）を除去
pub fn strip_control_chars(value: &str) -> String {
    lazy_static::lazy_static! {
        static ref CONTROL_RE: Regex = Regex::new(r"[\x00-\x08\x0B-\x1F]").unwrap();
    }

    CONTROL_RE.replace_all(value, "").into_owned()
}
