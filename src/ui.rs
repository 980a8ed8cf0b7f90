use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::{
    app::{App, Face, Screen},
    deck::DeckState,
};

pub fn ui(f: &mut Frame, app: &mut App) {
    // 顶栏 + 主区 + 底栏
    let v = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(f.area());

    draw_header(f, v[0], app);
    draw_drill(f, v[1], app);
    if app.screen == Screen::Picker {
        draw_picker(f, v[1], app);
    }
    draw_footer(f, v[2], app);
}

fn format_elapsed(d: chrono::Duration) -> String {
    let secs = d.num_seconds().max(0);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
    let th = app.theme;
    let bg = Block::default()
        .borders(Borders::NONE)
        .style(Style::default().bg(th.bar_bg));
    f.render_widget(bg, area);

    let st = app.status();
    let mut segs = vec![
        Span::styled(
            " 单词卡 · Drill ",
            Style::default().fg(th.accent).add_modifier(Modifier::BOLD),
        ),
        Span::styled(" | level:", Style::default().fg(th.muted)),
        Span::styled(
            app.level.clone().unwrap_or_else(|| "-".into()),
            Style::default().fg(th.fg),
        ),
        Span::styled(" | lesson:", Style::default().fg(th.muted)),
        Span::styled(
            app.lesson.clone().unwrap_or_else(|| "-".into()),
            Style::default().fg(th.fg),
        ),
        Span::styled(" | 剩余 ", Style::default().fg(th.muted)),
        Span::styled(
            format!("{} / {}", st.remaining, st.total),
            Style::default().fg(th.fg),
        ),
        Span::styled(" | ", Style::default().fg(th.muted)),
        Span::styled(format!("已记住：{}", st.known), Style::default().fg(th.good)),
    ];
    if let Some(d) = app.elapsed() {
        segs.push(Span::styled(" | 用时 ", Style::default().fg(th.muted)));
        segs.push(Span::styled(format_elapsed(d), Style::default().fg(th.fg)));
    }
    let para = Paragraph::new(Line::from(segs)).style(Style::default().bg(th.bar_bg).fg(th.fg));
    f.render_widget(para, area);
}

fn draw_footer(f: &mut Frame, area: Rect, app: &App) {
    let th = app.theme;
    let bg = Block::default()
        .borders(Borders::NONE)
        .style(Style::default().bg(th.bar_bg));
    f.render_widget(bg, area);
    let tips = match app.screen {
        Screen::Picker => " [q]退出  [j/k]上下  [Enter]开始  [Esc]返回  [Tab/[/]]切换 Level ",
        Screen::Drill => {
            " [q]退出  [←/a]中文  [→/d]平假名  [Space/n]下一张  [Enter/r]记住  [Esc/L]选课  [Tab]Level  [R]重载 "
        }
    };
    let help = Paragraph::new(Line::from(vec![Span::styled(
        tips,
        Style::default().fg(th.muted),
    )]))
    .style(Style::default().bg(th.bar_bg));
    f.render_widget(help, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vert = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    let horiz = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vert[1]);
    horiz[1]
}

// 按内容显示宽度（CJK 占两列）决定卡片大小
fn card_rect(texts: &[&str], area: Rect) -> Rect {
    let content_w = texts
        .iter()
        .map(|t| UnicodeWidthStr::width(*t))
        .max()
        .unwrap_or(0) as u16;
    let width = content_w.saturating_add(8).max(30).min(area.width);
    let height = 9.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

fn draw_message(f: &mut Frame, area: Rect, app: &App, lines: Vec<Line>) {
    let th = app.theme;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(th.muted));
    let para = Paragraph::new(lines)
        .block(block)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false });
    f.render_widget(para, centered_rect(70, 50, area));
}

fn draw_drill(f: &mut Frame, area: Rect, app: &mut App) {
    let th = app.theme;
    app.card_area = Rect::default();
    if app.lesson.is_none() {
        if let Some(msg) = app.message.clone() {
            draw_message(f, area, app, vec![Line::from(Span::raw(msg))]);
        }
        return;
    }
    match app.deck_state() {
        DeckState::Empty => {
            let msg = app
                .message
                .clone()
                .unwrap_or_else(|| "此课没有资料。".to_string());
            draw_message(f, area, app, vec![Line::from(Span::raw(msg))]);
        }
        DeckState::Complete => {
            let mut lines = vec![
                Line::from(Span::styled(
                    "本课已全部记住 🎉",
                    Style::default().fg(th.good).add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::raw("请按 L 或 Esc 改选其他 Lesson。")),
            ];
            if let Some(d) = app.elapsed() {
                lines.push(Line::from(Span::styled(
                    format!("用时 {}", format_elapsed(d)),
                    Style::default().fg(th.muted),
                )));
            }
            draw_message(f, area, app, lines);
        }
        DeckState::Active => {
            let Some(rec) = app.current_record() else {
                return;
            };
            let term = if rec.term.is_empty() {
                "—".to_string()
            } else {
                rec.term.clone()
            };
            let (title, back_text, border) = match app.face {
                Face::Front => (" 正面 ".to_string(), None, th.accent),
                Face::Back(field) => (
                    format!(" {} ", field.label()),
                    Some(field.value(rec).to_string()),
                    th.back,
                ),
            };
            let rect = card_rect(
                &[term.as_str(), back_text.as_deref().unwrap_or("")],
                area,
            );
            let mut lines = vec![
                Line::from(""),
                Line::from(Span::styled(
                    term,
                    Style::default().fg(th.fg).add_modifier(Modifier::BOLD),
                )),
            ];
            if let Some(text) = back_text {
                lines.push(Line::from(""));
                // 字段为空时背面显示空白
                lines.push(Line::from(Span::styled(text, Style::default().fg(th.back))));
            }
            let block = Block::default()
                .title(Span::styled(title, Style::default().fg(border)))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border));
            let para = Paragraph::new(lines)
                .block(block)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: false });
            f.render_widget(para, rect);
            app.card_area = rect;
        }
    }
}

fn draw_picker(f: &mut Frame, area: Rect, app: &mut App) {
    let th = app.theme;
    let rect = centered_rect(50, 80, area);
    f.render_widget(Clear, rect);
    let block = Block::default()
        .title(Span::styled(
            " 选择 Lesson… ",
            Style::default().fg(th.accent),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(th.muted));

    if app.lessons.is_empty() {
        let msg = app
            .message
            .clone()
            .unwrap_or_else(|| "没有可选的 Lesson。".to_string());
        let para = Paragraph::new(msg)
            .block(block)
            .style(Style::default().fg(th.warn))
            .wrap(Wrap { trim: false });
        f.render_widget(para, rect);
        return;
    }

    let items: Vec<ListItem> = app
        .lessons
        .iter()
        .map(|l| {
            let cards = app.dataset.records.iter().filter(|r| &r.lesson == l).count();
            let mut spans = vec![Span::styled(
                format!("Lesson {}", l),
                Style::default().fg(th.fg),
            )];
            spans.push(Span::styled(
                format!("  ({} 张)", cards),
                Style::default().fg(th.muted),
            ));
            if app.lesson.as_ref() == Some(l) {
                spans.push(Span::styled("  ●", Style::default().fg(th.good)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(th.selection_bg)
                .fg(th.fg)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");
    f.render_stateful_widget(list, rect, &mut app.lesson_state);
}
