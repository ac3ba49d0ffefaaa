//! あいまい文字列照合
//!
//! ラベルの表記揺れ（タイプミス・語順違い・余分な語）を吸収するための
//! 類似度スコア（0〜100の整数）と、参照語彙からの最良一致の選択を提供する。
//!
//! ## スコア
//! - 前処理: 英数字以外を空白に置換し、小文字化、前後の空白を除去
//! - `ratio`: 挿入・削除のみの編集距離に基づく正規化スコア
//!   `round(200 * LCS / (len_a + len_b))`（.5 は偶数側へ丸める）
//! - `token_sort_ratio`: トークンをアルファベット順に並べ替えてから `ratio`
//! - `token_set_ratio`: 共通トークン集合と差分を組み合わせた3通りの `ratio` の最大値
//!
//! ## 同点時の扱い
//! 参照語彙の列挙順で最初に最大スコアに達した候補を採用する。

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// 照合結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchResult {
    pub label: String,
    pub score: u8,
}

/// 類似度の算出方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scorer {
    /// 語順を無視（同一列内の兄弟値どうしの比較向け）
    #[default]
    TokenSort,
    /// 語の重複・余分な語を無視（正規語彙との比較向け）
    TokenSet,
}

impl Scorer {
    pub fn score(&self, a: &str, b: &str) -> u8 {
        match self {
            Scorer::TokenSort => token_sort_ratio(a, b),
            Scorer::TokenSet => token_set_ratio(a, b),
        }
    }
}

impl fmt::Display for Scorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scorer::TokenSort => write!(f, "token_sort"),
            Scorer::TokenSet => write!(f, "token_set"),
        }
    }
}

impl std::str::FromStr for Scorer {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "token_sort" | "sort" => Ok(Scorer::TokenSort),
            "token_set" | "set" => Ok(Scorer::TokenSet),
            _ => Err(format!("Unknown scorer: {}. Use token_sort or token_set", s)),
        }
    }
}

/// 比較用の前処理
pub fn full_process(s: &str) -> String {
    let replaced: String = s
        .chars()
        .flat_map(|c| {
            let keep = c.is_alphanumeric() || c == '_';
            let mapped: Vec<char> = if keep { c.to_lowercase().collect() } else { vec![' '] };
            mapped
        })
        .collect();
    replaced.trim().to_string()
}

/// 正規化スコア（0〜100）
///
/// `200 * LCS / (len_a + len_b)` をちょうど .5 のときは偶数側へ丸める。
pub fn ratio(a: &str, b: &str) -> u8 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let total = a_chars.len() + b_chars.len();
    if total == 0 {
        return 0;
    }

    let lcs = lcs_length(&a_chars, &b_chars);
    let (quotient, remainder) = ((200 * lcs) / total, (200 * lcs) % total);
    let rounded = match (2 * remainder).cmp(&total) {
        std::cmp::Ordering::Greater => quotient + 1,
        std::cmp::Ordering::Equal => quotient + quotient % 2,
        std::cmp::Ordering::Less => quotient,
    };
    rounded as u8
}

/// 最長共通部分列の長さ
fn lcs_length(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

fn sorted_tokens(processed: &str) -> String {
    let mut tokens: Vec<&str> = processed.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

/// 語順を無視したスコア
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    let pa = full_process(a);
    let pb = full_process(b);
    if pa.is_empty() || pb.is_empty() {
        return 0;
    }
    ratio(&sorted_tokens(&pa), &sorted_tokens(&pb))
}

/// トークン集合ベースのスコア
///
/// 一方が他方の語を包含する場合（例: "Homework Support" と
/// "Homework & Assignment Support"）に高スコアとなる。
pub fn token_set_ratio(a: &str, b: &str) -> u8 {
    let pa = full_process(a);
    let pb = full_process(b);
    if pa.is_empty() || pb.is_empty() {
        return 0;
    }

    let t1: BTreeSet<&str> = pa.split_whitespace().collect();
    let t2: BTreeSet<&str> = pb.split_whitespace().collect();

    let intersection: Vec<&str> = t1.intersection(&t2).copied().collect();
    let diff_1to2: Vec<&str> = t1.difference(&t2).copied().collect();
    let diff_2to1: Vec<&str> = t2.difference(&t1).copied().collect();

    let sorted_sect = intersection.join(" ");
    let combined_1to2 = format!("{} {}", sorted_sect, diff_1to2.join(" "))
        .trim()
        .to_string();
    let combined_2to1 = format!("{} {}", sorted_sect, diff_2to1.join(" "))
        .trim()
        .to_string();

    [
        ratio(&sorted_sect, &combined_1to2),
        ratio(&sorted_sect, &combined_2to1),
        ratio(&combined_1to2, &combined_2to1),
    ]
    .into_iter()
    .max()
    .unwrap_or(0)
}

/// 候補集合から最良一致を選ぶ
///
/// スコア計算は候補ごとに独立なので並列に行い、選択は列挙順で逐次に行う。
/// 全候補のスコアが0の場合は `None`。
pub fn best_match<S: AsRef<str> + Sync>(
    candidate: &str,
    universe: &[S],
    scorer: Scorer,
) -> Option<MatchResult> {
    let scores: Vec<u8> = universe
        .par_iter()
        .map(|target| scorer.score(candidate, target.as_ref()))
        .collect();

    let mut best: Option<(usize, u8)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if score > best.map(|(_, s)| s).unwrap_or(0) {
            best = Some((i, score));
        }
    }

    best.map(|(i, score)| MatchResult {
        label: universe[i].as_ref().to_string(),
        score,
    })
}

/// 参照集合に照らして候補を書き換えるべきか判定
///
/// - 候補がすでに参照集合に含まれていれば `None`（何もしない）
/// - 最良一致のスコアが `threshold` 以上ならその一致を返す
pub fn resolve<S: AsRef<str> + Sync>(
    candidate: &str,
    reference: &[S],
    threshold: u8,
    scorer: Scorer,
) -> Option<MatchResult> {
    if reference.iter().any(|r| r.as_ref() == candidate) {
        return None;
    }

    best_match(candidate, reference, scorer).filter(|m| m.score >= threshold)
}
