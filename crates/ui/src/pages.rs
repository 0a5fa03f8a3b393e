//! Page rendering, one view per book kind.

use picturebook_core::icon::{self, Icon};
use picturebook_core::{BookKind, Page, Rgb};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::canvas::{Canvas, Circle, Line as CanvasLine};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use unicode_width::UnicodeWidthStr;

use crate::hit::{HitMap, Target};

const INK: Color = Color::Black;
const HIGHLIGHT: Color = Color::Rgb(0xFF, 0xEB, 0x3B);
const OBJECTS_PER_ROW: usize = 5;
const FALLBACK_GLYPH: &str = "●";

/// Per-frame state a view needs beyond the page itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PageScene {
    pub object_count: usize,
    pub highlight: Option<usize>,
}

pub(crate) trait PageView {
    fn render(&self, page: &Page, scene: &PageScene, area: Rect, frame: &mut Frame);
}

pub(crate) fn view_for(kind: BookKind) -> &'static dyn PageView {
    match kind {
        BookKind::Alphabet => &AlphabetView,
        BookKind::Numbers => &NumbersView,
        BookKind::Shapes => &ShapesView,
        BookKind::Picture => &PictureView,
    }
}

pub(crate) fn hex_color(value: &str, fallback: Color) -> Color {
    Rgb::parse_hex(value)
        .map(|Rgb(r, g, b)| Color::Rgb(r, g, b))
        .unwrap_or(fallback)
}

fn caption(text: Option<&str>) -> Option<Line<'static>> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| Line::styled(t.to_string(), Style::default().fg(INK)))
}

/// Renders `lines` centred both ways inside `area`.
fn render_centered(lines: Vec<Line<'static>>, area: Rect, frame: &mut Frame) {
    let height = (lines.len() as u16).min(area.height);
    let top = area.y + (area.height - height) / 2;
    let target = Rect::new(area.x, top, area.width, height);
    let paragraph = Paragraph::new(Text::from(lines))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, target);
}

struct AlphabetView;

impl PageView for AlphabetView {
    fn render(&self, page: &Page, _scene: &PageScene, area: Rect, frame: &mut Frame) {
        let letter = page
            .letter_color
            .as_deref()
            .map(|c| hex_color(c, INK))
            .unwrap_or(INK);
        let spaced: Vec<String> = page.title.chars().map(String::from).collect();
        let mut lines = Vec::new();
        if let Some(glyph) = page.glyph_at(0) {
            lines.push(Line::raw(glyph.to_string()));
            lines.push(Line::raw(""));
        }
        lines.push(Line::styled(
            spaced.join(" "),
            Style::default().fg(letter).add_modifier(Modifier::BOLD),
        ));
        lines.push(Line::raw(""));
        lines.extend(caption(page.subtitle.as_deref()));
        render_centered(lines, area, frame);
    }
}

struct NumbersView;

impl NumbersView {
    fn object_rows(page: &Page, scene: &PageScene) -> Vec<Line<'static>> {
        let objects: Vec<Span<'static>> = (0..scene.object_count)
            .map(|i| {
                let glyph = page.glyph_at(i).unwrap_or(FALLBACK_GLYPH).to_string();
                if scene.highlight == Some(i) {
                    Span::styled(
                        format!(" {glyph} "),
                        Style::default()
                            .bg(HIGHLIGHT)
                            .fg(INK)
                            .add_modifier(Modifier::BOLD),
                    )
                } else {
                    Span::raw(format!(" {glyph} "))
                }
            })
            .collect();
        objects
            .chunks(OBJECTS_PER_ROW)
            .map(|row| {
                let mut spans = Vec::with_capacity(row.len() * 2);
                for (i, span) in row.iter().enumerate() {
                    if i > 0 {
                        spans.push(Span::raw(" "));
                    }
                    spans.push(span.clone());
                }
                Line::from(spans)
            })
            .collect()
    }
}

impl PageView for NumbersView {
    fn render(&self, page: &Page, scene: &PageScene, area: Rect, frame: &mut Frame) {
        let mut lines = vec![
            Line::styled(
                page.title.clone(),
                Style::default().fg(INK).add_modifier(Modifier::BOLD),
            ),
            Line::raw(""),
        ];
        for row in Self::object_rows(page, scene) {
            lines.push(row);
            lines.push(Line::raw(""));
        }
        if let Some(i) = scene.highlight {
            lines.push(Line::styled(
                (i + 1).to_string(),
                Style::default().fg(INK).add_modifier(Modifier::BOLD),
            ));
        } else {
            lines.extend(caption(page.subtitle.as_deref()));
        }
        render_centered(lines, area, frame);
    }
}

struct ShapesView;

impl ShapesView {
    /// Largest rect with the icon's aspect ratio, given cells twice as tall as wide.
    fn fit(view_box: (f64, f64), area: Rect) -> Rect {
        let ratio = view_box.0 / view_box.1;
        let mut height = f64::from(area.height);
        let mut width = height * 2.0 * ratio;
        if width > f64::from(area.width) {
            width = f64::from(area.width);
            height = width / (2.0 * ratio);
        }
        let (width, height) = (width.floor() as u16, height.floor() as u16);
        Rect::new(
            area.x + (area.width - width) / 2,
            area.y + (area.height - height) / 2,
            width,
            height,
        )
    }

    fn draw_icon(icon: &Icon, area: Rect, frame: &mut Frame) {
        let (w, h) = icon.view_box;
        let canvas = Canvas::default()
            .marker(Marker::Braille)
            .x_bounds([0.0, w])
            .y_bounds([0.0, h])
            .paint(|ctx| {
                // View boxes grow downwards, the canvas upwards.
                for segment in &icon.segments {
                    let Rgb(r, g, b) = segment.color;
                    ctx.draw(&CanvasLine::new(
                        segment.from.0,
                        h - segment.from.1,
                        segment.to.0,
                        h - segment.to.1,
                        Color::Rgb(r, g, b),
                    ));
                }
                for dot in &icon.dots {
                    let Rgb(r, g, b) = dot.color;
                    ctx.draw(&Circle {
                        x: dot.center.0,
                        y: h - dot.center.1,
                        radius: dot.radius,
                        color: Color::Rgb(r, g, b),
                    });
                }
            });
        frame.render_widget(canvas, area);
    }
}

impl PageView for ShapesView {
    fn render(&self, page: &Page, _scene: &PageScene, area: Rect, frame: &mut Frame) {
        let sections = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(area);

        if let Some(icon) = icon::shape_icon(&page.title) {
            Self::draw_icon(&icon, Self::fit(icon.view_box, sections[0]), frame);
        }

        let mut lines = vec![Line::styled(
            page.title.clone(),
            Style::default().fg(INK).add_modifier(Modifier::BOLD),
        )];
        lines.extend(caption(page.subtitle.as_deref()));
        render_centered(lines, sections[1], frame);
    }
}

struct PictureView;

impl PageView for PictureView {
    fn render(&self, page: &Page, _scene: &PageScene, area: Rect, frame: &mut Frame) {
        let mut lines = Vec::new();
        if let Some(glyph) = page.glyph_at(0) {
            lines.push(Line::raw(glyph.to_string()));
            lines.push(Line::raw(""));
        }
        lines.push(Line::styled(
            page.title.clone(),
            Style::default().fg(INK).add_modifier(Modifier::BOLD),
        ));
        if let Some(subtitle) = caption(page.subtitle.as_deref()) {
            lines.push(Line::raw(""));
            lines.push(subtitle.style(Style::default().fg(INK).add_modifier(Modifier::ITALIC)));
        }
        render_centered(lines, area, frame);
    }
}

/// The index grid shared by every book kind. Items become click targets.
pub(crate) fn render_summary(page: &Page, area: Rect, frame: &mut Frame, hits: &mut HitMap) {
    let items = page.summary_items();
    let cell_width = items
        .iter()
        .map(|item| item.width() as u16)
        .max()
        .unwrap_or(1)
        .max(1)
        + 4;
    let cell_height = 3;
    let columns = (area.width / (cell_width + 1)).max(1) as usize;
    let rows = items.len().div_ceil(columns) as u16;

    let title_area = Rect::new(area.x, area.y, area.width, 2.min(area.height));
    frame.render_widget(
        Paragraph::new(Line::styled(
            page.title.clone(),
            Style::default().fg(INK).add_modifier(Modifier::BOLD),
        ))
        .alignment(Alignment::Center),
        title_area,
    );

    let grid_width = (columns as u16) * (cell_width + 1);
    let grid_height = rows * cell_height;
    let left = area.x + area.width.saturating_sub(grid_width) / 2;
    let top = area.y + 2 + area.height.saturating_sub(grid_height + 2) / 2;
    let bottom = area.y + area.height;

    for (i, item) in items.iter().enumerate() {
        let col = (i % columns) as u16;
        let row = (i / columns) as u16;
        let y = top + row * cell_height;
        if y + cell_height > bottom {
            break;
        }
        let rect = Rect::new(left + col * (cell_width + 1), y, cell_width, cell_height);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(INK));
        frame.render_widget(
            Paragraph::new(Line::styled(
                item.clone(),
                Style::default().fg(INK).add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center)
            .block(block),
            rect,
        );
        hits.push(rect, Target::SummaryItem(i));
    }
}
