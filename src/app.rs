use crate::{
    document::{Document, Section},
    helpers::{build_lines_from_layout, layout_nodes},
};

use ratatui::{
    crossterm::event::{self, KeyCode},
    prelude::*,
    widgets::*,
};
use std::time::Instant;
use tracing::debug;

/// Everything the running program needs: the page and its clock.
pub struct App {
    document: Document,
    started_at: Instant,
    now: u64,
}

impl App {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            started_at: Instant::now(),
            now: 0,
        }
    }

    #[cfg(test)]
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn tick(&mut self) {
        let now = self.started_at.elapsed().as_millis() as u64;
        self.tick_at(now);
    }

    pub fn tick_at(&mut self, now: u64) {
        self.now = now;
        self.document.tick(now);
    }

    pub fn handle_key(&mut self, key: event::KeyEvent) {
        match key.code {
            KeyCode::Char('r') => {
                debug!(at = self.now, "replay requested");
                self.document.start_all(self.now);
            }
            KeyCode::Char('s') => {
                debug!(at = self.now, "stop requested");
                self.document.stop_all(self.now);
            }
            _ => {}
        }
    }

    pub fn draw_ui(&self, f: &mut Frame) {
        let area = f.area();
        let content_width = area.width.saturating_sub(4).max(1);

        let layouts: Vec<_> = self
            .document
            .sections()
            .iter()
            .map(|section| (section, layout_nodes(section.nodes(), content_width)))
            .collect();

        let mut constraints = vec![Constraint::Length(1)]; // Title
        constraints.extend(
            layouts.iter().map(|(_, layout)| {
                Constraint::Length(u16::try_from(layout.len()).unwrap_or(u16::MAX).saturating_add(2))
            }),
        );
        constraints.push(Constraint::Min(0));
        constraints.push(Constraint::Length(3)); // Status

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .margin(1)
            .constraints(constraints)
            .split(area);

        let title = Paragraph::new("matrix-text").alignment(Alignment::Center);
        f.render_widget(title, chunks[0]);

        for (i, (section, layout)) in layouts.iter().enumerate() {
            let block = Block::default()
                .title(section.id().to_string())
                .borders(Borders::ALL);
            let lines = build_lines_from_layout(layout, section.nodes(), self.now);

            let paragraph = Paragraph::new(lines)
                .block(block)
                .alignment(Alignment::Center);
            f.render_widget(paragraph, chunks[i + 1]);
        }

        let state = if self.document.is_animating() {
            "Animating"
        } else {
            "Idle"
        };
        let progress: Vec<String> = self
            .document
            .sections()
            .iter()
            .filter_map(|section| match section {
                Section::Animated(matrix) => Some(format!(
                    "{} {}/{}",
                    matrix.id(),
                    matrix.current_index(),
                    matrix.slot_count()
                )),
                Section::Static(_) => None,
            })
            .collect();

        let status = format!(
            "{} {} | {:.1}s | r: replay  s: stop  q: quit",
            state,
            progress.join(" "),
            self.now as f64 / 1000.0
        );

        let status_block = Block::default().title("Status").borders(Borders::ALL);
        let status_paragraph = Paragraph::new(status).block(status_block);
        f.render_widget(status_paragraph, chunks[chunks.len() - 1]);
    }
}
