// 课次标签：去重、排序。全是数字时按数值排序，否则按可配置的比较方式稳定排序

use std::{cmp::Ordering, collections::BTreeMap};

use serde::{Deserialize, Serialize};

use crate::vocab::VocabRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Collation {
    /// 按 Unicode 码位
    #[default]
    Lexical,
    /// 数字段按数值比较（L2 < L10）
    Natural,
}

impl Collation {
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match self {
            Collation::Lexical => a.cmp(b),
            Collation::Natural => natural_cmp(a, b),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonCount {
    pub lesson: String,
    pub cards: usize,
}

fn is_numeric_label(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

pub fn sort_labels(labels: &mut [String], collation: Collation) {
    if labels.iter().all(|l| is_numeric_label(l)) {
        labels.sort_by(|a, b| numeric_cmp(a, b).then_with(|| a.cmp(b)));
    } else {
        labels.sort_by(|a, b| collation.compare(a, b));
    }
}

pub fn lesson_labels(records: &[VocabRecord], collation: Collation) -> Vec<String> {
    let mut labels: Vec<String> = Vec::new();
    for r in records {
        if !r.lesson.is_empty() && !labels.contains(&r.lesson) {
            labels.push(r.lesson.clone());
        }
    }
    sort_labels(&mut labels, collation);
    labels
}

pub fn lesson_counts(records: &[VocabRecord], collation: Collation) -> Vec<LessonCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for r in records.iter().filter(|r| !r.lesson.is_empty()) {
        *counts.entry(r.lesson.as_str()).or_default() += 1;
    }
    lesson_labels(records, collation)
        .into_iter()
        .map(|lesson| {
            let cards = counts.get(lesson.as_str()).copied().unwrap_or(0);
            LessonCount { lesson, cards }
        })
        .collect()
}

// 纯数字串比较，不经过整数转换，避免溢出
fn numeric_cmp(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ai = a.chars().peekable();
    let mut bi = b.chars().peekable();
    loop {
        match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let mut na = String::new();
                while let Some(c) = ai.next_if(|c| c.is_ascii_digit()) {
                    na.push(c);
                }
                let mut nb = String::new();
                while let Some(c) = bi.next_if(|c| c.is_ascii_digit()) {
                    nb.push(c);
                }
                let ord = numeric_cmp(&na, &nb);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                ai.next();
                bi.next();
            }
        }
    }
}
