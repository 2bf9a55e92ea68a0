use crate::{
    error::{MatrixError, Result},
    types::{Glyph, Layout, Node},
};

use ratatui::prelude::*;
use std::{fs, path::Path};

const BASE_RGB: (u8, u8, u8) = (220, 220, 220);
const MATRIX_RGB: (u8, u8, u8) = (0, 255, 0);

pub fn read_text_file(path: &Path) -> Result<String> {
    let content = fs::read_to_string(path).map_err(|source| MatrixError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(content.replace("\r\n", "\n"))
}

/// Places surface nodes on rows no wider than `width`. Breaks always end a
/// row; otherwise rows wrap at spaces, and a word wider than the row is cut.
pub fn layout_nodes(nodes: &[Node], width: u16) -> Layout {
    let width = width.max(1) as usize;

    let mut lines: Layout = vec![Vec::new()];
    let mut col = 0usize;
    let mut wrapped = false;
    let mut i = 0usize;

    let is_word = |node: &Node| matches!(node, Node::Slot(slot) if !slot.is_space);

    while i < nodes.len() {
        match nodes[i] {
            Node::Break => {
                lines.push(Vec::new());
                col = 0;
                wrapped = false;
                i += 1;
            }

            Node::Slot(slot) if slot.is_space => {
                if col == 0 && wrapped {
                    i += 1;
                    continue;
                }

                if col + 1 > width {
                    lines.push(Vec::new());
                    col = 0;
                    wrapped = true;
                    i += 1;

                    continue;
                }

                if let Some(line) = lines.last_mut() {
                    line.push(Glyph { ch: slot.glyph, idx: i });
                }
                col += 1;
                i += 1;
            }

            Node::Slot(_) => {
                let start = i;
                while i < nodes.len() && is_word(&nodes[i]) {
                    i += 1;
                }

                let word_len = i - start;
                if col > 0 && col + word_len > width {
                    lines.push(Vec::new());
                    col = 0;
                    wrapped = true;
                }

                for (j, node) in nodes.iter().enumerate().take(i).skip(start) {
                    if col >= width {
                        lines.push(Vec::new());
                        col = 0;
                        wrapped = true;
                    }

                    if let (Node::Slot(slot), Some(line)) = (node, lines.last_mut()) {
                        line.push(Glyph { ch: slot.glyph, idx: j });
                    }
                    col += 1;
                }
            }
        }
    }

    lines
}

fn blend(from: (u8, u8, u8), to: (u8, u8, u8), level: f32) -> Color {
    let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * level).round() as u8;

    Color::Rgb(mix(from.0, to.0), mix(from.1, to.1), mix(from.2, to.2))
}

/// Style of a slot at `now`: colour eased towards green while highlighted,
/// bold standing in for the glow once mostly highlighted.
pub fn slot_style(node: &Node, now: u64) -> Style {
    let Node::Slot(slot) = node else {
        return Style::default();
    };

    let level = slot.highlight_level(now);
    let style = Style::default().fg(blend(BASE_RGB, MATRIX_RGB, level));

    if level > 0.5 {
        style.add_modifier(Modifier::BOLD)
    } else {
        style
    }
}

pub fn build_lines_from_layout(layout: &Layout, nodes: &[Node], now: u64) -> Vec<Line<'static>> {
    layout
        .iter()
        .map(|row| {
            let spans: Vec<Span<'static>> = row
                .iter()
                .map(|glyph| {
                    let style = nodes
                        .get(glyph.idx)
                        .map_or_else(Style::default, |node| slot_style(node, now));

                    Span::styled(glyph.ch.to_string(), style)
                })
                .collect();

            Line::from(spans)
        })
        .collect()
}
