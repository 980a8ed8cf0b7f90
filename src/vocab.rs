// 词表加载：读取某个 Level 的 CSV，统一列名，丢弃没有任何显示字段的行

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tracing::info;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VocabRecord {
    pub lesson: String,
    pub term: String,
    pub chinese: String,
    pub hiragana: String,
}

impl VocabRecord {
    pub fn has_display_field(&self) -> bool {
        !(self.term.is_empty() && self.chinese.is_empty() && self.hiragana.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Lesson,
    HanZi,
    Chinese,
    Hiragana,
}

impl Column {
    pub const ALL: [Column; 4] = [
        Column::Lesson,
        Column::HanZi,
        Column::Chinese,
        Column::Hiragana,
    ];

    /// 规范列名与可接受的别名（含合并表的中文表头）
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Column::Lesson => &["lesson", "第幾課"],
            Column::HanZi => &["hanzi", "漢字"],
            Column::Chinese => &["chinese", "中文意思"],
            Column::Hiragana => &["hiragana", "平假名"],
        }
    }

    pub fn from_header(h: &str) -> Option<Column> {
        let key = h.trim().to_lowercase();
        Column::ALL
            .into_iter()
            .find(|c| c.aliases().iter().any(|a| *a == key))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub path: PathBuf,
    pub records: Vec<VocabRecord>,
}

impl Dataset {
    pub fn from_records(path: PathBuf, records: Vec<VocabRecord>) -> Self {
        Self { path, records }
    }

    /// 某课在 records 中的位置（保持文件顺序）
    pub fn lesson_deck(&self, lesson: &str) -> Vec<usize> {
        let lesson = lesson.trim();
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.lesson == lesson)
            .map(|(i, _)| i)
            .collect()
    }
}

pub fn load_dataset(path: &Path) -> Result<Dataset> {
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "找不到词表文件: {}\n提示: 使用 --dir 指定数据目录，或设置环境变量 VOCAB_DRILL_DIR。",
            path.display()
        ));
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("读取词表失败: {}", path.display()))?;
    let records =
        parse_records(&content).with_context(|| format!("解析 CSV 失败: {}", path.display()))?;
    info!(path = %path.display(), rows = records.len(), "vocabulary loaded");
    Ok(Dataset::from_records(path.to_path_buf(), records))
}

pub fn parse_records(content: &str) -> Result<Vec<VocabRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.trim_start_matches('\u{feff}').as_bytes());

    // 每个规范列对应的下标；同名列取第一个
    let headers = reader.headers()?.clone();
    let mut cols: [Option<usize>; 4] = [None; 4];
    for (i, h) in headers.iter().enumerate() {
        if let Some(c) = Column::from_header(h) {
            let slot = &mut cols[c as usize];
            if slot.is_none() {
                *slot = Some(i);
            }
        }
    }

    let mut out = Vec::new();
    for row in reader.records() {
        let row = row?;
        let field = |c: Column| -> String {
            cols[c as usize]
                .and_then(|i| row.get(i))
                .map(|s| s.trim().to_string())
                .unwrap_or_default()
        };
        let rec = VocabRecord {
            lesson: normalize_lesson(&field(Column::Lesson)),
            term: field(Column::HanZi),
            chinese: field(Column::Chinese),
            hiragana: field(Column::Hiragana),
        };
        if rec.has_display_field() {
            out.push(rec);
        }
    }
    Ok(out)
}

/// 表格导出的数字课次可能是 "3.0"，统一成 "3"
fn normalize_lesson(s: &str) -> String {
    if let Some(int) = s.strip_suffix(".0") {
        if !int.is_empty() && int.chars().all(|c| c.is_ascii_digit()) {
            return int.to_string();
        }
    }
    s.to_string()
}
