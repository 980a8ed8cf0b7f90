// 基于 ratatui + crossterm 的单词卡练习 TUI
// 功能：
// - 按 Level 读取词表（CSV，默认 N5.csv / N4.csv，可在 drill.toml 中配置）
// - 选择 Lesson 后随机抽卡，左右翻面看中文 / 平假名
// - 「记住」的卡不再出现，全部记住后本课结束
// - merge 子命令：把每课一份的词表合并为一张总表

mod app;
mod config;
mod deck;
mod lessons;
mod merge;
mod theme;
mod ui;
mod vocab;

use std::{fs::File, io, path::PathBuf, sync::Mutex, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    app::App,
    deck::RngSource,
    lessons::Collation,
    theme::{theme_of, ThemeKind},
};

#[derive(Debug, Clone, Parser)]
#[command(name = "vocab-drill", about = "单词卡练习 TUI 工具", version)]
struct Cli {
    /// 数据目录（词表文件所在处），默认读取环境变量 VOCAB_DRILL_DIR
    #[arg(long, short = 'd', global = true)]
    dir: Option<PathBuf>,

    /// 配置文件路径，默认在当前目录及上层目录查找 drill.toml
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// 启动时载入的 Level，例如 N5
    #[arg(long, short = 'l', global = true)]
    level: Option<String>,

    /// Lesson 排序方式（仅对非纯数字课次生效）
    #[arg(long = "lesson-order", value_enum, global = true)]
    lesson_order: Option<Collation>,

    /// 启动后直接进入的 Lesson
    #[arg(long)]
    lesson: Option<String>,

    /// 主题（外观）：dark | light
    #[arg(long = "theme", value_enum, default_value_t = ThemeKind::Dark)]
    theme: ThemeKind,

    /// 随机种子（可复现的抽卡顺序）
    #[arg(long)]
    seed: Option<u64>,

    /// 日志文件；TUI 模式下仅在指定时记录日志
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// 列出某个 Level 的 Lesson 及卡片数
    Lessons {
        /// 以 JSON 输出
        #[arg(long)]
        json: bool,
    },
    /// 合并每课一份的词表（第…課_漢字詞語表.csv）为一张总表
    Merge {
        /// 输入文件或目录（目录下查找文件名含「第…課」的 .csv）
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// 输出 CSV 路径
        #[arg(long, short = 'o')]
        output: PathBuf,
    },
}

fn init_logging(cli: &Cli) -> Result<()> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vocab_drill=info"))
    };
    if let Some(path) = &cli.log_file {
        let file = File::create(path)
            .with_context(|| format!("创建日志文件失败: {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else if cli.command.is_some() {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(io::stderr)
            .init();
    }
    // TUI 占用终端，未指定 --log-file 时不输出日志
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    // merge 不依赖 drill.toml，先于配置加载处理
    if let Some(Command::Merge { inputs, output }) = &cli.command {
        return merge::run(inputs, output, cli.level.as_deref());
    }

    let mut cfg = config::load(cli.config.as_deref(), cli.dir.clone())?;
    if let Some(order) = cli.lesson_order {
        cfg.lesson_order = order;
    }
    let level = cli.level.clone().unwrap_or_else(|| cfg.default_level.clone());
    info!(data_dir = %cfg.data_dir.display(), level = %level, "config resolved");

    if let Some(Command::Lessons { json }) = &cli.command {
        return print_lessons(&cfg, &level, *json);
    }

    let source = match cli.seed {
        Some(seed) => RngSource::seeded(seed),
        None => RngSource::from_os(),
    };
    let mut app = App::new(cfg, theme_of(cli.theme), source);
    app.load_level(&level);
    if let Some(lesson) = &cli.lesson {
        if app.lessons.contains(lesson) {
            app.select_lesson(lesson);
        } else {
            app.message = Some(format!("找不到 Lesson {}", lesson));
        }
    }
    info!(level = %level, "starting drill");

    // TUI 初始化
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // 退出还原
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    res
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui::ui(f, app))?;
        // 200ms 轮询，顺便刷新顶栏的用时
        if event::poll(Duration::from_millis(200))? {
            match event::read()? {
                Event::Key(k) if k.kind != KeyEventKind::Release => {
                    if app.handle_key(k) {
                        break;
                    }
                }
                Event::Mouse(m) => app.handle_mouse(m),
                _ => {}
            }
        }
    }
    Ok(())
}

fn print_lessons(cfg: &config::DrillConfig, level: &str, json: bool) -> Result<()> {
    let path = cfg
        .level_path(level)
        .ok_or_else(|| anyhow::anyhow!("未配置 Level: {}", level))?;
    let ds = vocab::load_dataset(path)?;
    let counts = lessons::lesson_counts(&ds.records, cfg.lesson_order);
    if json {
        println!("{}", serde_json::to_string_pretty(&counts)?);
        return Ok(());
    }
    println!(
        "Level {} ({}) · {} 个 Lesson",
        level,
        ds.path.display(),
        counts.len()
    );
    for c in &counts {
        println!("Lesson {}\t{} 张", c.lesson, c.cards);
    }
    Ok(())
}
