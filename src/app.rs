// 展示层控制器：持有当前 Level 的词表、课次选择、抽卡会话与翻面状态

use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent, MouseButton, MouseEvent, MouseEventKind};
use ratatui::{layout::Rect, widgets::ListState};
use tracing::{debug, info, warn};

use crate::{
    config::{DrillConfig, KeyAction},
    deck::{Advance, DeckSession, DeckState, Draw, RngSource, Status},
    lessons,
    theme::Theme,
    vocab::{self, Dataset, VocabRecord},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackField {
    Chinese,
    Hiragana,
}

impl BackField {
    pub fn label(&self) -> &'static str {
        match self {
            BackField::Chinese => "中文（背面）",
            BackField::Hiragana => "平假名（背面）",
        }
    }

    pub fn value<'r>(&self, r: &'r VocabRecord) -> &'r str {
        match self {
            BackField::Chinese => &r.chinese,
            BackField::Hiragana => &r.hiragana,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Front,
    Back(BackField),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Picker,
    Drill,
}

#[derive(Debug)]
pub struct App {
    pub config: DrillConfig,
    pub theme: Theme,
    pub level: Option<String>,
    pub dataset: Dataset,
    pub lessons: Vec<String>,
    pub lesson_state: ListState,
    pub lesson: Option<String>,
    /// 当前课在 dataset.records 中的位置
    pub deck: Vec<usize>,
    pub session: DeckSession<RngSource>,
    pub face: Face,
    pub screen: Screen,
    pub message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// 上一帧卡片区域，用于鼠标点击判定
    pub card_area: Rect,
}

impl App {
    pub fn new(config: DrillConfig, theme: Theme, source: RngSource) -> Self {
        Self {
            config,
            theme,
            level: None,
            dataset: Dataset::default(),
            lessons: Vec::new(),
            lesson_state: ListState::default(),
            lesson: None,
            deck: Vec::new(),
            session: DeckSession::new(source),
            face: Face::Front,
            screen: Screen::Picker,
            message: None,
            started_at: None,
            finished_at: None,
            card_area: Rect::default(),
        }
    }

    /// 载入某个 Level；失败时保留界面并显示错误，用户可切换其他 Level
    pub fn load_level(&mut self, level: &str) {
        self.level = Some(level.to_string());
        self.lesson = None;
        self.deck.clear();
        self.session.build(&self.deck);
        self.face = Face::Front;
        self.started_at = None;
        self.finished_at = None;
        self.screen = Screen::Picker;

        let loaded = match self.config.level_path(level) {
            Some(path) => vocab::load_dataset(path),
            None => Err(anyhow::anyhow!("未配置 Level: {}", level)),
        };
        match loaded {
            Ok(ds) => {
                self.lessons = lessons::lesson_labels(&ds.records, self.config.lesson_order);
                self.dataset = ds;
                self.lesson_state
                    .select(if self.lessons.is_empty() { None } else { Some(0) });
                self.message = Some(if self.lessons.is_empty() {
                    "此 Level 没有任何 Lesson。".to_string()
                } else {
                    "请选择 Lesson 开始练习。".to_string()
                });
                info!(level = %level, lessons = self.lessons.len(), "level ready");
            }
            Err(e) => {
                warn!(level = %level, error = %format!("{:#}", e), "level load failed");
                self.dataset = Dataset::default();
                self.lessons.clear();
                self.lesson_state.select(None);
                self.message = Some(format!("自动载入失败：{:#}", e));
            }
        }
    }

    pub fn reload(&mut self) {
        if let Some(level) = self.level.clone() {
            let lesson = self.lesson.clone();
            self.load_level(&level);
            if let Some(l) = lesson {
                if self.lessons.contains(&l) {
                    self.select_lesson(&l);
                }
            }
        }
    }

    pub fn switch_level(&mut self, step: isize) {
        if let Some(next) = self.config.cycle_level(self.level.as_deref(), step) {
            self.load_level(&next);
        }
    }

    /// 选定课次：重建牌组与会话
    pub fn select_lesson(&mut self, label: &str) {
        self.lesson = Some(label.to_string());
        self.deck = self.dataset.lesson_deck(label);
        let state = self.session.build(&self.deck);
        self.face = Face::Front;
        self.started_at = Some(Utc::now());
        self.finished_at = None;
        self.screen = Screen::Drill;
        self.message = match state {
            DeckState::Empty => Some("此课没有资料。".to_string()),
            _ => None,
        };
        if let Some(i) = self.lessons.iter().position(|l| l == label) {
            self.lesson_state.select(Some(i));
        }
        info!(lesson = label, cards = self.deck.len(), "lesson deck built");
    }

    pub fn status(&self) -> Status {
        self.session.status()
    }

    pub fn deck_state(&self) -> DeckState {
        self.session.state()
    }

    pub fn current_record(&self) -> Option<&VocabRecord> {
        self.session
            .current(&self.deck)
            .and_then(|&i| self.dataset.records.get(i))
    }

    pub fn elapsed(&self) -> Option<chrono::Duration> {
        let start = self.started_at?;
        Some(self.finished_at.unwrap_or_else(Utc::now) - start)
    }

    // 正面时翻到指定背面；背面时任意翻面都回到正面
    pub fn flip(&mut self, field: BackField) {
        if self.deck_state() != DeckState::Active {
            return;
        }
        self.face = match self.face {
            Face::Front => Face::Back(field),
            Face::Back(_) => Face::Front,
        };
    }

    pub fn next_card(&mut self) {
        if self.deck.is_empty() {
            return;
        }
        if let Draw::Card(_) = self.session.draw() {
            self.face = Face::Front;
        }
        debug!(cursor = ?self.session.cursor(), "next card");
    }

    pub fn remember(&mut self) {
        if self.deck_state() != DeckState::Active {
            return;
        }
        match self.session.mark_current_known() {
            Ok(Advance::Next(_)) => self.face = Face::Front,
            Ok(Advance::Complete) => {
                self.finished_at = Some(Utc::now());
                info!(
                    lesson = self.lesson.as_deref().unwrap_or(""),
                    cards = self.deck.len(),
                    "lesson complete"
                );
            }
            Err(e) => self.message = Some(e.to_string()),
        }
    }

    pub fn open_picker(&mut self) {
        self.screen = Screen::Picker;
    }

    fn close_picker(&mut self) {
        if self.lesson.is_some() {
            self.screen = Screen::Drill;
        }
    }

    fn picker_move(&mut self, delta: isize) {
        let n = self.lessons.len();
        if n == 0 {
            return;
        }
        let cur = self.lesson_state.selected().unwrap_or(0) as isize;
        let next = (cur + delta).clamp(0, n as isize - 1);
        self.lesson_state.select(Some(next as usize));
    }

    fn picker_confirm(&mut self) {
        let label = self
            .lesson_state
            .selected()
            .and_then(|i| self.lessons.get(i))
            .cloned();
        if let Some(l) = label {
            self.select_lesson(&l);
        }
    }

    pub fn apply_action(&mut self, action: KeyAction) {
        match action {
            KeyAction::FlipChinese => self.flip(BackField::Chinese),
            KeyAction::FlipHiragana => self.flip(BackField::Hiragana),
            KeyAction::Next => self.next_card(),
            KeyAction::Remember => self.remember(),
            KeyAction::PickLesson => self.open_picker(),
            KeyAction::NextLevel => self.switch_level(1),
            KeyAction::PrevLevel => self.switch_level(-1),
            KeyAction::Reload => self.reload(),
        }
    }

    /// 返回 true 表示退出
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        let KeyEvent { code, .. } = key;
        if code == KeyCode::Char('q') {
            return true;
        }
        if code == KeyCode::Tab {
            self.switch_level(1);
            return false;
        }
        match self.screen {
            Screen::Picker => match code {
                KeyCode::Up | KeyCode::Char('k') => self.picker_move(-1),
                KeyCode::Down | KeyCode::Char('j') => self.picker_move(1),
                KeyCode::Enter => self.picker_confirm(),
                KeyCode::Esc => self.close_picker(),
                KeyCode::Char(ch) => match self.config.keymap.get(&ch).copied() {
                    // 选课界面只响应切换类动作
                    Some(
                        act @ (KeyAction::NextLevel | KeyAction::PrevLevel | KeyAction::Reload),
                    ) => self.apply_action(act),
                    _ => {}
                },
                _ => {}
            },
            Screen::Drill => match code {
                KeyCode::Left => self.flip(BackField::Chinese),
                KeyCode::Right => self.flip(BackField::Hiragana),
                KeyCode::Char(' ') => self.next_card(),
                KeyCode::Enter => self.remember(),
                KeyCode::Esc => self.open_picker(),
                KeyCode::Char(ch) => {
                    if let Some(action) = self.config.keymap.get(&ch).copied() {
                        self.apply_action(action);
                    }
                }
                _ => {}
            },
        }
        false
    }

    // 卡片点击：正面时左半=中文、右半=平假名；背面任意处回正面
    pub fn handle_mouse(&mut self, ev: MouseEvent) {
        if self.screen != Screen::Drill || ev.kind != MouseEventKind::Down(MouseButton::Left) {
            return;
        }
        let a = self.card_area;
        let inside = ev.column >= a.x
            && ev.column < a.x + a.width
            && ev.row >= a.y
            && ev.row < a.y + a.height;
        if !inside {
            return;
        }
        let field = if ev.column < a.x + a.width / 2 {
            BackField::Chinese
        } else {
            BackField::Hiragana
        };
        self.flip(field);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, ConfigFile};
    use crate::theme::{theme_of, ThemeKind};
    use crossterm::event::KeyModifiers;
    use std::fs;

    const N5: &str = "Lesson,HanZi,Chinese,Hiragana\n\
                      1,山,山,やま\n\
                      1,川,河,かわ\n\
                      1,木,樹,\n\
                      2,海,海,うみ\n\
                      10,空,天空,そら\n";

    fn app_in(dir: &std::path::Path) -> App {
        let cfg = resolve(
            ConfigFile::default(),
            None,
            Some(dir.to_path_buf()),
            None,
        );
        App::new(cfg, theme_of(ThemeKind::Dark), RngSource::seeded(5))
    }

    fn setup() -> (tempfile::TempDir, App) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("N5.csv"), N5).unwrap();
        let mut app = app_in(dir.path());
        app.load_level("N5");
        (dir, app)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn click(column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    #[test]
    fn level_load_lists_sorted_lessons() {
        let (_dir, app) = setup();
        assert_eq!(app.lessons, vec!["1", "2", "10"]);
        assert_eq!(app.screen, Screen::Picker);
        assert_eq!(app.lesson_state.selected(), Some(0));
        assert_eq!(app.deck_state(), DeckState::Empty);
    }

    #[test]
    fn missing_level_file_shows_message() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_in(dir.path());
        app.load_level("N4");
        assert!(app.lessons.is_empty());
        let msg = app.message.clone().unwrap();
        assert!(msg.starts_with("自动载入失败"));
        assert!(msg.contains("N4.csv"));
    }

    #[test]
    fn picker_enter_starts_drill() {
        let (_dir, mut app) = setup();
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Up));
        assert!(!app.handle_key(key(KeyCode::Enter)));
        assert_eq!(app.lesson.as_deref(), Some("2"));
        assert_eq!(app.screen, Screen::Drill);
        assert_eq!(app.deck_state(), DeckState::Active);
        assert_eq!(app.current_record().map(|r| r.term.as_str()), Some("海"));
    }

    #[test]
    fn remember_until_complete() {
        let (_dir, mut app) = setup();
        app.select_lesson("1");
        assert_eq!(app.status().total, 3);
        for _ in 0..3 {
            assert!(app.current_record().is_some());
            app.handle_key(key(KeyCode::Enter));
        }
        assert_eq!(app.deck_state(), DeckState::Complete);
        assert_eq!(app.status().known, 3);
        assert_eq!(app.status().remaining, 0);
        assert!(app.finished_at.is_some());

        // 完成后继续抽卡与记住都不改变状态
        app.handle_key(key(KeyCode::Char(' ')));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.deck_state(), DeckState::Complete);
        assert_eq!(app.status().known, 3);
    }

    #[test]
    fn flip_cycles_between_front_and_back() {
        let (_dir, mut app) = setup();
        app.select_lesson("1");
        assert_eq!(app.face, Face::Front);
        app.handle_key(key(KeyCode::Left));
        assert_eq!(app.face, Face::Back(BackField::Chinese));
        app.handle_key(key(KeyCode::Right));
        assert_eq!(app.face, Face::Front);
        app.handle_key(key(KeyCode::Char('d')));
        assert_eq!(app.face, Face::Back(BackField::Hiragana));
        // 抽下一张回到正面
        app.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(app.face, Face::Front);
    }

    #[test]
    fn empty_lesson_ignores_drill_keys() {
        let (_dir, mut app) = setup();
        app.select_lesson("99");
        assert_eq!(app.deck_state(), DeckState::Empty);
        assert_eq!(app.message.as_deref(), Some("此课没有资料。"));
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::Left));
        app.handle_key(key(KeyCode::Char(' ')));
        assert_eq!(app.face, Face::Front);
        assert_eq!(app.status().total, 0);
        assert!(app.current_record().is_none());
    }

    #[test]
    fn escape_returns_to_picker_and_back() {
        let (_dir, mut app) = setup();
        // 没选课时 Esc 不离开选课界面
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.screen, Screen::Picker);
        app.select_lesson("1");
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.screen, Screen::Picker);
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.screen, Screen::Drill);
        assert_eq!(app.lesson.as_deref(), Some("1"));
    }

    #[test]
    fn tab_switches_level_and_discards_session() {
        let (dir, mut app) = setup();
        fs::write(
            dir.path().join("N4.csv"),
            "Lesson,HanZi,Chinese,Hiragana\n3,雨,雨,あめ\n",
        )
        .unwrap();
        app.select_lesson("1");
        app.remember();
        app.handle_key(key(KeyCode::Tab));
        assert_eq!(app.level.as_deref(), Some("N4"));
        assert_eq!(app.lessons, vec!["3"]);
        assert_eq!(app.lesson, None);
        assert_eq!(app.status().total, 0);
        assert_eq!(app.screen, Screen::Picker);
    }

    #[test]
    fn reload_keeps_lesson_and_restarts_session() {
        let (_dir, mut app) = setup();
        app.select_lesson("1");
        app.remember();
        assert_eq!(app.status().known, 1);
        app.handle_key(key(KeyCode::Char('R')));
        assert_eq!(app.lesson.as_deref(), Some("1"));
        assert_eq!(app.status().known, 0);
        assert_eq!(app.status().total, 3);
    }

    #[test]
    fn mouse_click_flips_by_half() {
        let (_dir, mut app) = setup();
        app.select_lesson("1");
        app.card_area = Rect::new(10, 5, 40, 8);
        app.handle_mouse(click(12, 6));
        assert_eq!(app.face, Face::Back(BackField::Chinese));
        app.handle_mouse(click(45, 6));
        assert_eq!(app.face, Face::Front);
        app.handle_mouse(click(45, 6));
        assert_eq!(app.face, Face::Back(BackField::Hiragana));
        // 卡片外的点击无效
        app.handle_mouse(click(2, 2));
        assert_eq!(app.face, Face::Back(BackField::Hiragana));
    }

    #[test]
    fn q_quits_from_any_screen() {
        let (_dir, mut app) = setup();
        assert!(app.handle_key(key(KeyCode::Char('q'))));
        app.select_lesson("1");
        assert!(app.handle_key(key(KeyCode::Char('q'))));
    }

    #[test]
    fn unknown_level_in_config_is_reported() {
        let (_dir, mut app) = setup();
        app.load_level("C1");
        assert!(app.message.unwrap().contains("C1"));
        assert_eq!(app.level.as_deref(), Some("C1"));
    }
}
