// 合并每课一份的词表（第一課_漢字詞語表.csv … N4_第二十課_漢字詞語表.csv）
// 为一张带课次与等级的总表，输出可直接被 vocab 加载的 CSV

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

static LESSON_IN_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"第([零〇一二兩三四五六七八九十0-9]+)課").unwrap());

/// (表头中期望的中文列名, 对应的规范英文列名)
const EXPECTED_COLS: [(&str, &str); 3] = [
    ("漢字", "HanZi"),
    ("平假名", "Hiragana"),
    ("中文意思", "Chinese"),
];

/// 输出表头，与 MergedRow 的字段顺序一致
pub const OUTPUT_HEADER: [&str; 5] = ["Lesson", "HanZi", "Chinese", "Hiragana", "Level"];

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("文件名中找不到「第…課」: {0}")]
    NoLessonInName(String),
    #[error("{file} 缺少列: {missing:?}，实际列: {found:?}")]
    MissingColumns {
        file: String,
        missing: Vec<String>,
        found: Vec<String>,
    },
    #[error("没有任何文件读取成功")]
    NothingMerged,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MergedRow {
    #[serde(rename = "Lesson")]
    pub lesson: u32,
    #[serde(rename = "HanZi")]
    pub term: String,
    #[serde(rename = "Chinese")]
    pub chinese: String,
    #[serde(rename = "Hiragana")]
    pub hiragana: String,
    #[serde(rename = "Level")]
    pub level: String,
}

#[derive(Debug, Default)]
pub struct MergeReport {
    pub rows: Vec<MergedRow>,
    pub loaded: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

fn cn_digit(c: char) -> Option<u32> {
    Some(match c {
        '零' | '〇' => 0,
        '一' => 1,
        '二' | '兩' => 2,
        '三' => 3,
        '四' => 4,
        '五' => 5,
        '六' => 6,
        '七' => 7,
        '八' => 8,
        '九' => 9,
        _ => return None,
    })
}

/// 中文数字转整数，覆盖课次常见写法（一 … 九十九），含阿拉伯数字时直接取数字
pub fn chinese_numeral_to_int(s: &str) -> u32 {
    let s = s.trim();
    let digits: String = s
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if let Ok(n) = digits.parse::<u32>() {
        return n;
    }

    if let Some((left, right)) = s.split_once('十') {
        let tens = left.chars().next().and_then(cn_digit).unwrap_or(1);
        let ones = right.chars().next().and_then(cn_digit).unwrap_or(0);
        return tens * 10 + ones;
    }

    s.chars()
        .filter_map(cn_digit)
        .fold(0u32, |acc, d| acc.saturating_mul(10).saturating_add(d))
}

pub fn lesson_from_name(name: &str) -> Result<u32, MergeError> {
    LESSON_IN_NAME
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| chinese_numeral_to_int(m.as_str()))
        .ok_or_else(|| MergeError::NoLessonInName(name.to_string()))
}

pub fn level_from_name(name: &str) -> &'static str {
    if name.starts_with("N4_") {
        "N4"
    } else {
        "N5"
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// 先精确匹配（去掉空白），再宽松匹配（包含关键词）
fn map_columns(headers: &[String]) -> Vec<Option<usize>> {
    EXPECTED_COLS
        .iter()
        .map(|(need, canonical)| {
            headers
                .iter()
                .position(|h| {
                    let squashed: String = h.chars().filter(|c| !c.is_whitespace()).collect();
                    squashed == *need || squashed.eq_ignore_ascii_case(canonical)
                })
                .or_else(|| headers.iter().position(|h| h.contains(need)))
        })
        .collect()
}

pub fn parse_lesson_file(name: &str, content: &str) -> Result<Vec<MergedRow>> {
    let lesson = lesson_from_name(name)?;
    let level = level_from_name(name);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.trim_start_matches('\u{feff}').as_bytes());
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    let cols = map_columns(&headers);
    let missing: Vec<String> = EXPECTED_COLS
        .iter()
        .zip(&cols)
        .filter(|(_, c)| c.is_none())
        .map(|((need, _), _)| need.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(MergeError::MissingColumns {
            file: name.to_string(),
            missing,
            found: headers,
        }
        .into());
    }

    let mut rows = Vec::new();
    for rec in reader.records() {
        let rec = rec?;
        let get = |i: usize| -> String {
            cols[i]
                .and_then(|c| rec.get(c))
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };
        let row = MergedRow {
            lesson,
            term: get(0),
            hiragana: get(1),
            chinese: get(2),
            level: level.to_string(),
        };
        if row.term.is_empty() && row.hiragana.is_empty() && row.chinese.is_empty() {
            continue;
        }
        rows.push(row);
    }
    Ok(rows)
}

/// 目录展开为其中文件名含「第…課」的 .csv；文件原样保留
pub fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for p in inputs {
        if p.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(p)
                .with_context(|| format!("读取目录失败: {}", p.display()))?
                .filter_map(|e| e.ok().map(|e| e.path()))
                .filter(|f| {
                    f.extension().is_some_and(|e| e.eq_ignore_ascii_case("csv"))
                        && LESSON_IN_NAME.is_match(&file_name(f))
                })
                .collect();
            found.sort();
            out.extend(found);
        } else {
            out.push(p.clone());
        }
    }
    Ok(out)
}

pub fn merge_files(files: &[PathBuf]) -> Result<MergeReport> {
    let mut ordered: Vec<&PathBuf> = files.iter().collect();
    // N5 在前、N4 在后，同级按课次
    ordered.sort_by_key(|p| {
        let name = file_name(p);
        (
            level_from_name(&name) == "N4",
            lesson_from_name(&name).unwrap_or(u32::MAX),
        )
    });

    let mut report = MergeReport::default();
    let mut all = Vec::new();
    for path in ordered {
        let name = file_name(path);
        let parsed = fs::read_to_string(path)
            .with_context(|| format!("读取失败: {}", path.display()))
            .and_then(|content| parse_lesson_file(&name, &content));
        match parsed {
            Ok(rows) => {
                info!(file = %name, rows = rows.len(), "lesson file merged");
                all.extend(rows);
                report.loaded.push(path.clone());
            }
            Err(e) => {
                warn!(file = %name, error = %e, "lesson file skipped");
                report.failed.push((path.clone(), format!("{:#}", e)));
            }
        }
    }
    if report.loaded.is_empty() {
        return Err(MergeError::NothingMerged.into());
    }

    let mut seen = HashSet::new();
    all.retain(|r| seen.insert(r.clone()));
    all.sort_by(|a, b| {
        (&a.level, a.lesson, &a.term, &a.hiragana).cmp(&(&b.level, b.lesson, &b.term, &b.hiragana))
    });
    report.rows = all;
    Ok(report)
}

pub fn write_rows(path: &Path, rows: &[MergedRow]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    // 表头单独写出，没有数据行时也输出
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("写入失败: {}", path.display()))?;
    writer.write_record(OUTPUT_HEADER)?;
    for r in rows {
        writer.serialize(r)?;
    }
    writer.flush()?;
    Ok(())
}

/// `merge` 子命令
pub fn run(inputs: &[PathBuf], output: &Path, level: Option<&str>) -> Result<()> {
    let files = collect_inputs(inputs)?;
    if files.is_empty() {
        return Err(anyhow::anyhow!(
            "找不到任何符合「第…課」样式的 CSV 文件，请确认文件名与目录。"
        ));
    }
    let mut report = merge_files(&files)?;
    for p in &report.loaded {
        println!("读取成功：{}", file_name(p));
    }
    for (p, e) in &report.failed {
        println!("读取失败：{} -> {}", file_name(p), e);
    }
    if let Some(lv) = level {
        report.rows.retain(|r| r.level.eq_ignore_ascii_case(lv));
    }
    write_rows(output, &report.rows)?;
    println!("已输出：{}（{} 行）", output.display(), report.rows.len());
    Ok(())
}
