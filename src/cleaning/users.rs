//! ユーザー数の正規化
//!
//! 自由記述のユーザー数（"10,000+ students" や "2 crore" など）を数値文字列にそろえる。

use regex::Regex;

/// 1クロール = 10,000,000
const CRORE: f64 = 10_000_000.0;

/// ユーザー数を正規化
///
/// - "not stated" を含む → 空欄
/// - `keywords` のいずれかを含む → 先頭トークンから `,` と `+` を除去
/// - `+` を含む → `+` と `,` を除去
/// - "crore" を含む → 先頭の数値 × 10,000,000（数値でなければそのまま）
/// - それ以外 → `,` を除去
pub fn normalize_user_count<S: AsRef<str>>(value: &str, keywords: &[S]) -> Option<String> {
    lazy_static::lazy_static! {
        static ref NOT_STATED_RE: Regex = Regex::new(r"(?i)not\s+stated").unwrap();
        static ref CRORE_RE: Regex = Regex::new(r"(?i)crore").unwrap();
    }

    let lower = value.to_lowercase();

    if NOT_STATED_RE.is_match(value) {
        return None;
    }

    let mentions_keyword = keywords.iter().any(|k| {
        let k = k.as_ref().trim().to_lowercase();
        !k.is_empty() && lower.contains(&k)
    });
    if mentions_keyword {
        let first = value.split_whitespace().next().unwrap_or_default();
        return non_empty(first.replace([',', '+'], ""));
    }

    if value.contains('+') {
        return non_empty(value.replace(['+', ','], ""));
    }

    if CRORE_RE.is_match(value) {
        let first = value.split_whitespace().next().unwrap_or_default().replace(',', "");
        return match first.parse::<f64>() {
            Ok(n) => Some(format!("{}", (n * CRORE) as i64)),
            Err(_) => non_empty(value.to_string()),
        };
    }

    non_empty(value.replace(',', ""))
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STUDENTS: &[&str] = &["student", "pupil"];

    #[test]
    fn test_not_stated_is_blank() {
        assert_eq!(normalize_user_count("Not stated", STUDENTS), None);
        assert_eq!(normalize_user_count("users not  stated yet", STUDENTS), None);
    }

    #[test]
    fn test_keyword_keeps_first_token() {
        assert_eq!(
            normalize_user_count("10,000+ students across Kenya", STUDENTS),
            Some("10000".to_string())
        );
        assert_eq!(normalize_user_count("500 Pupils", STUDENTS), Some("500".to_string()));
    }

    #[test]
    fn test_any_keyword_matches() {
        assert_eq!(normalize_user_count("300 pupils enrolled", STUDENTS), Some("300".to_string()));
        assert_eq!(
            normalize_user_count("40 tutors on staff", &["teacher", "tutor"]),
            Some("40".to_string())
        );
        assert_eq!(
            normalize_user_count("300 pupils enrolled", &["student"]),
            Some("300 pupils enrolled".to_string())
        );
    }

    #[test]
    fn test_plus_and_separators() {
        assert_eq!(normalize_user_count("1,200+", STUDENTS), Some("1200".to_string()));
        assert_eq!(normalize_user_count("25,000", STUDENTS), Some("25000".to_string()));
    }

    #[test]
    fn test_crore() {
        assert_eq!(normalize_user_count("2 crore", STUDENTS), Some("20000000".to_string()));
        assert_eq!(normalize_user_count("1.5 Crore", STUDENTS), Some("15000000".to_string()));
        assert_eq!(normalize_user_count("many crore", STUDENTS), Some("many crore".to_string()));
    }

    #[test]
    fn test_plain_text_is_kept() {
        assert_eq!(normalize_user_count("Unknown", STUDENTS), Some("Unknown".to_string()));
    }
}
