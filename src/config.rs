// ---------------- 配置：Level 文件映射 + 键位 ----------------

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::lessons::Collation;

pub const CONFIG_FILE: &str = "drill.toml";
pub const DATA_DIR_ENV: &str = "VOCAB_DRILL_DIR";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    FlipChinese,
    FlipHiragana,
    Next,
    Remember,
    PickLesson,
    NextLevel,
    PrevLevel,
    Reload,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub default_level: Option<String>,
    pub lesson_order: Collation,
    pub levels: BTreeMap<String, PathBuf>,
    pub keys: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct DrillConfig {
    pub data_dir: PathBuf,
    /// Level 名 -> 已解析的文件路径，按名字排序（切换 Level 时的顺序）
    pub levels: BTreeMap<String, PathBuf>,
    pub default_level: String,
    pub lesson_order: Collation,
    pub keymap: HashMap<char, KeyAction>,
}

impl DrillConfig {
    pub fn level_names(&self) -> Vec<String> {
        self.levels.keys().cloned().collect()
    }

    pub fn level_path(&self, level: &str) -> Option<&PathBuf> {
        self.levels.get(level)
    }

    /// 相邻 Level（循环），step 为 1 或 -1
    pub fn cycle_level(&self, current: Option<&str>, step: isize) -> Option<String> {
        let names = self.level_names();
        if names.is_empty() {
            return None;
        }
        let n = names.len() as isize;
        let idx = current
            .and_then(|c| names.iter().position(|x| x == c))
            .map(|i| (i as isize + step).rem_euclid(n))
            .unwrap_or(0);
        names.get(idx as usize).cloned()
    }
}

/// 数据目录优先级：--dir > 环境变量 > 配置文件所在目录 > 当前目录
pub fn resolve(
    file: ConfigFile,
    config_path: Option<&Path>,
    dir: Option<PathBuf>,
    env_dir: Option<PathBuf>,
) -> DrillConfig {
    let data_dir = dir
        .or(env_dir)
        .or_else(|| {
            config_path
                .and_then(|p| p.parent())
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
        })
        .unwrap_or_else(|| PathBuf::from("."));

    let mut levels = file.levels;
    if levels.is_empty() {
        levels.insert("N5".into(), PathBuf::from("N5.csv"));
        levels.insert("N4".into(), PathBuf::from("N4.csv"));
    }
    let levels: BTreeMap<String, PathBuf> = levels
        .into_iter()
        .map(|(name, p)| {
            let p = if p.is_absolute() { p } else { data_dir.join(p) };
            (name, p)
        })
        .collect();

    let default_level = file
        .default_level
        .filter(|l| levels.contains_key(l))
        .or_else(|| levels.contains_key("N5").then(|| "N5".to_string()))
        .or_else(|| levels.keys().next().cloned())
        .unwrap_or_default();

    DrillConfig {
        data_dir,
        levels,
        default_level,
        lesson_order: file.lesson_order,
        keymap: parse_keymap(file.keys),
    }
}

fn discover(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(p) = explicit {
        if !p.exists() {
            return Err(anyhow::anyhow!("配置文件不存在: {}", p.display()));
        }
        return Ok(Some(p.to_path_buf()));
    }
    // 探测 drill.toml：当前目录及向上
    if let Ok(cwd) = std::env::current_dir() {
        for anc in cwd.ancestors() {
            let p = anc.join(CONFIG_FILE);
            if p.exists() {
                return Ok(Some(p));
            }
        }
    }
    Ok(None)
}

pub fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let content =
        fs::read_to_string(path).with_context(|| format!("读取配置失败: {}", path.display()))?;
    let file: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("解析 {} 失败", path.display()))?;
    Ok(file)
}

pub fn load(explicit: Option<&Path>, dir: Option<PathBuf>) -> Result<DrillConfig> {
    let path = discover(explicit)?;
    let file = match &path {
        Some(p) => {
            info!(path = %p.display(), "config loaded");
            read_config_file(p)?
        }
        None => ConfigFile::default(),
    };
    let env_dir = std::env::var_os(DATA_DIR_ENV).map(PathBuf::from);
    Ok(resolve(file, path.as_deref(), dir, env_dir))
}

pub fn parse_keymap(map: HashMap<String, String>) -> HashMap<char, KeyAction> {
    let mut out = HashMap::new();
    for (k, v) in map {
        let mut chars = k.chars();
        match (chars.next(), chars.next(), action_from_str(&v)) {
            (Some(ch), None, Some(act)) => {
                out.insert(ch, act);
            }
            _ => warn!(key = %k, action = %v, "ignored keymap entry"),
        }
    }
    if out.is_empty() {
        out = default_keymap();
    }
    out
}

fn action_from_str(s: &str) -> Option<KeyAction> {
    use KeyAction::*;
    Some(match s {
        "flip_chinese" => FlipChinese,
        "flip_hiragana" => FlipHiragana,
        "next" => Next,
        "remember" => Remember,
        "pick_lesson" => PickLesson,
        "next_level" => NextLevel,
        "prev_level" => PrevLevel,
        "reload" => Reload,
        _ => return None,
    })
}

pub fn default_keymap() -> HashMap<char, KeyAction> {
    use KeyAction::*;
    let mut m = HashMap::new();
    m.insert('a', FlipChinese);
    m.insert('d', FlipHiragana);
    m.insert('n', Next);
    m.insert('r', Remember);
    m.insert('L', PickLesson); // 大写 L
    m.insert(']', NextLevel);
    m.insert('[', PrevLevel);
    m.insert('R', Reload); // 大写 R
    m
}
