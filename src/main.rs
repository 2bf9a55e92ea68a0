mod app;
mod config;
mod document;
mod error;
mod helpers;
mod matrix;
mod parser;
mod scheduler;
mod symbols;
mod types;

use crate::{
    app::App,
    config::{MatrixOptions, PageConfig},
    document::Document,
    error::MatrixError,
    helpers::read_text_file,
    symbols::symbol_source,
    types::{LayoutStrategy, SourceFormat},
};

use anyhow::{Context, Result};
use clap::Parser;
use ratatui::{
    crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
};
use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
    sync::Mutex,
    time::Duration,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_TEXT: &str = "Hello,<br>World";
const DEFAULT_SURFACE: &str = "title";
const POLLING_RATE_MS: u64 = 16;

/// Matrix-style text scramble for the terminal
#[derive(Parser, Debug)]
#[command(name = "matrix-text", version)]
#[command(about = "Matrix-style text scramble for the terminal")]
struct Cli {
    /// Text to animate; `<br>` starts a new line
    text: Option<String>,

    /// Page file (TOML) with surfaces and options
    #[arg(short, long, conflicts_with_all = ["text", "text_file"])]
    page: Option<PathBuf>,

    /// Read the text to animate from a file
    #[arg(short = 'f', long, conflicts_with = "text")]
    text_file: Option<PathBuf>,

    /// Surface to animate (repeatable; default: the first surface)
    #[arg(short, long = "target")]
    targets: Vec<String>,

    /// Scramble alphabet
    #[arg(long)]
    chars: Option<String>,

    /// Milliseconds between letters
    #[arg(long)]
    letter_interval: Option<u64>,

    /// Milliseconds each letter scrambles for
    #[arg(long)]
    letter_duration: Option<u64>,

    /// Milliseconds before the first letter
    #[arg(long)]
    initial_delay: Option<u64>,

    #[arg(long, value_enum)]
    layout: Option<LayoutStrategy>,

    /// Treat input as plain text: newlines break lines, no markup
    #[arg(long)]
    plain: bool,

    /// Seed for the scramble symbols
    #[arg(long)]
    seed: Option<u64>,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn apply_to(&self, options: &mut MatrixOptions) {
        if let Some(chars) = &self.chars {
            options.chars = chars.clone();
        }
        if let Some(interval) = self.letter_interval {
            options.letter_interval = interval;
        }
        if let Some(duration) = self.letter_duration {
            options.letter_animation_duration = duration;
        }
        if let Some(delay) = self.initial_delay {
            options.initial_delay = delay;
        }
        if let Some(layout) = self.layout {
            options.layout = layout;
        }
        if self.plain {
            options.format = SourceFormat::Plain;
        }
    }

    fn page(&self) -> Result<PageConfig> {
        let mut page = if let Some(path) = &self.page {
            PageConfig::load(path)
                .with_context(|| format!("loading page {}", path.display()))?
        } else if let Some(path) = &self.text_file {
            PageConfig::single(DEFAULT_SURFACE, read_text_file(path)?)
        } else {
            let text = self.text.as_deref().unwrap_or(DEFAULT_TEXT);
            PageConfig::single(DEFAULT_SURFACE, text.to_string())
        };

        self.apply_to(&mut page.options);
        if !self.targets.is_empty() {
            page.animate = self.targets.clone();
        }

        if page.surfaces.is_empty() {
            return Err(MatrixError::EmptyPage.into());
        }

        Ok(page)
    }
}

fn init_tracing(log_file: Option<&Path>, verbose: u8) -> Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };

    let file =
        File::create(path).with_context(|| format!("creating log file {}", path.display()))?;
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("matrix_text={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}

fn build_document(page: &PageConfig, seed: Option<u64>) -> Result<Document> {
    let mut document = Document::from_page(page)?;

    for (i, target) in page.targets().iter().enumerate() {
        let symbols = symbol_source(seed.map(|seed| seed.wrapping_add(i as u64)));
        document
            .mount(target, page.options.clone(), symbols, 0)
            .with_context(|| format!("animating surface {target}"))?;
    }

    Ok(document)
}

fn run<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        app.tick();
        terminal.draw(|frame| app.draw_ui(frame))?;

        if event::poll(Duration::from_millis(POLLING_RATE_MS))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                match key.code {
                    KeyCode::Esc | KeyCode::Char('q') => break,
                    _ => app.handle_key(key),
                }
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref(), cli.verbose)?;

    let page = cli.page()?;
    let document = build_document(&page, cli.seed)?;
    let mut app = App::new(document);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    let result = run(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}
