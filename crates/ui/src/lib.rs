//! Terminal front end: the shelf, the reader, and pointer input.

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Context as _;
use crossterm::event::{
    DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event,
    KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{event, terminal};
use log::{debug, info};
use picturebook_application::{
    AppContext, Gesture, GestureRouter, PointerSample, Reader, VOLUME_STEP,
};
use picturebook_core::Settings;
use picturebook_narration::{NarrationEngine, Transport};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{
    Block, BorderType, Borders, Clear, HighlightSpacing, List, ListItem, ListState, Paragraph,
    Wrap,
};
use unicode_width::UnicodeWidthStr;

mod hit;
mod pages;

use hit::{HitMap, Target};
use pages::PageScene;

const ACCENT: Color = Color::Yellow;
const MAX_PAGE_DOTS: usize = 24;

/// Everything a frame shows; the screen is redrawn when this changes.
#[derive(Debug, Clone, PartialEq)]
struct ViewKey {
    reading: Option<(String, usize)>,
    picker: Option<usize>,
    transport: Transport,
    speaking: bool,
    highlight: Option<usize>,
    counting: bool,
    volume_percent: u32,
}

pub struct Ui {
    ctx: AppContext,
    engine: NarrationEngine,
    gestures: GestureRouter,
    hits: HitMap,
    picker_cursor: usize,
}

impl Ui {
    pub fn new(mut ctx: AppContext, engine: NarrationEngine) -> Self {
        ctx.settings.normalize();
        let gestures = GestureRouter::new(&ctx.settings.gestures);
        Self {
            ctx,
            engine,
            gestures,
            hits: HitMap::default(),
            picker_cursor: 0,
        }
    }

    /// Runs until the user quits and hands back the settings to persist.
    pub fn run(&mut self) -> anyhow::Result<Settings> {
        let mut terminal = setup_terminal()?;
        terminal.clear().ok();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            self.event_loop(&mut terminal)
        }));
        self.ctx.close_book(&mut self.engine);
        let restore_result = restore_terminal(&mut terminal);

        match (result, restore_result) {
            (Ok(Ok(())), Ok(())) => Ok(self.ctx.settings.clone()),
            (Ok(Ok(_)), Err(err)) => Err(err),
            (Ok(Err(err)), Ok(())) => Err(err),
            (Ok(Err(_)), Err(err)) => Err(err),
            (Err(panic), Ok(())) => Err(anyhow::anyhow!(panic_to_string(panic))),
            (Err(panic), Err(err)) => Err(anyhow::anyhow!(
                "{}\n(additionally failed to restore terminal: {err})",
                panic_to_string(panic)
            )),
        }
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    ) -> anyhow::Result<()> {
        let tick_rate = Duration::from_millis(50);
        let mut needs_redraw = true;
        let mut last_key = self.view_key();

        loop {
            self.ctx.tick(Instant::now(), &mut self.engine);
            let key = self.view_key();
            if key != last_key {
                needs_redraw = true;
                last_key = key;
            }

            if needs_redraw {
                terminal.draw(|frame| self.draw(frame.area(), frame))?;
                needs_redraw = false;
            }

            if !event::poll(tick_rate)? {
                continue;
            }

            match event::read()? {
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        continue;
                    }
                    needs_redraw = true;
                    let quit = if self.ctx.is_reading() {
                        self.handle_reader_key(key)?
                    } else {
                        self.handle_shelf_key(key)?
                    };
                    if quit {
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => {
                    needs_redraw = true;
                    self.handle_mouse(mouse)?;
                }
                Event::FocusLost => {
                    debug!("focus lost, dropping pointer state");
                    self.gestures.reset();
                }
                _ => {}
            }
        }
    }

    fn view_key(&self) -> ViewKey {
        let reader = self.ctx.reader.as_ref();
        ViewKey {
            reading: reader.map(|r| (r.book().id.clone(), r.page_index())),
            picker: reader
                .filter(|r| r.picker_open())
                .map(|_| self.picker_cursor),
            transport: self.engine.transport(),
            speaking: self.engine.is_speaking(),
            highlight: reader.and_then(Reader::highlight),
            counting: reader.is_some_and(Reader::is_counting),
            volume_percent: (self.engine.volume() * 100.0).round() as u32,
        }
    }

    /// Returns `true` when the key quits the app.
    fn handle_shelf_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Up | KeyCode::Left | KeyCode::Char('k') => self.ctx.select_previous(),
            KeyCode::Down | KeyCode::Right | KeyCode::Char('j') => self.ctx.select_next(),
            KeyCode::Enter => self.ctx.open_selected(&mut self.engine)?,
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.ctx.nudge_volume(VOLUME_STEP, &mut self.engine)
            }
            KeyCode::Char('-') => self.ctx.nudge_volume(-VOLUME_STEP, &mut self.engine),
            _ => {}
        }
        Ok(false)
    }

    fn handle_reader_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
        let now = Instant::now();
        let picker_open = self.ctx.reader.as_ref().is_some_and(Reader::picker_open);
        match key.code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('+') | KeyCode::Char('=') => {
                self.ctx.nudge_volume(VOLUME_STEP, &mut self.engine)
            }
            KeyCode::Char('-') => self.ctx.nudge_volume(-VOLUME_STEP, &mut self.engine),
            KeyCode::Esc if !picker_open => self.ctx.close_book(&mut self.engine),
            _ if picker_open => self.handle_picker_key(key),
            _ => {
                let Some(reader) = self.ctx.reader.as_mut() else {
                    return Ok(false);
                };
                match key.code {
                    KeyCode::Left | KeyCode::Char('h') => {
                        reader.go_previous(&mut self.engine);
                    }
                    KeyCode::Right | KeyCode::Char('l') => {
                        reader.go_next(&mut self.engine);
                    }
                    KeyCode::Enter => reader.tap_content(&mut self.engine, now),
                    KeyCode::Char(' ') => reader.toggle_narration(&mut self.engine),
                    KeyCode::Char('i') => {
                        reader.jump_to_summary(&mut self.engine);
                    }
                    KeyCode::Char('p') => {
                        self.picker_cursor = reader.page_index();
                        reader.open_picker();
                    }
                    _ => {}
                }
            }
        }
        Ok(false)
    }

    fn handle_picker_key(&mut self, key: KeyEvent) {
        let Some(reader) = self.ctx.reader.as_mut() else {
            return;
        };
        let last = reader.page_count().saturating_sub(1);
        match key.code {
            KeyCode::Esc | KeyCode::Char('p') => reader.close_picker(),
            KeyCode::Left | KeyCode::Up | KeyCode::Char('h') | KeyCode::Char('k') => {
                self.picker_cursor = self.picker_cursor.saturating_sub(1);
            }
            KeyCode::Right | KeyCode::Down | KeyCode::Char('l') | KeyCode::Char('j') => {
                self.picker_cursor = (self.picker_cursor + 1).min(last);
            }
            KeyCode::Enter => {
                reader.jump_to(self.picker_cursor, &mut self.engine);
            }
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> anyhow::Result<()> {
        let now = Instant::now();
        match mouse.kind {
            MouseEventKind::Down(button) => match self.hits.hit(mouse.column, mouse.row) {
                Some(Target::Content) => {
                    if let Some(sample) = self.pointer_sample(button, &mouse, now) {
                        self.gestures.pointer_down(sample);
                    }
                }
                Some(target) => self.activate(target, now)?,
                None => {}
            },
            MouseEventKind::Up(button) => {
                let Some(content) = self.hits.content() else {
                    self.gestures.reset();
                    return Ok(());
                };
                let Some(sample) = self.pointer_sample(button, &mouse, now) else {
                    return Ok(());
                };
                let gesture = self.gestures.pointer_up(sample, hit::width_pixels(content));
                if gesture != Gesture::NoAction {
                    debug!("gesture {gesture:?}");
                }
                if let Some(reader) = self.ctx.reader.as_mut() {
                    reader.apply_gesture(gesture, &mut self.engine, now);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn pointer_sample(
        &self,
        button: MouseButton,
        mouse: &MouseEvent,
        now: Instant,
    ) -> Option<PointerSample> {
        let content = self.hits.content()?;
        let (x, y) = hit::to_pixels(content, mouse.column, mouse.row);
        Some(PointerSample::new(pointer_id(button), x, y, now))
    }

    fn activate(&mut self, target: Target, now: Instant) -> anyhow::Result<()> {
        if let Target::Book(index) = target {
            self.ctx.select(index);
            return self.ctx.open_selected(&mut self.engine);
        }
        if target == Target::Back {
            self.ctx.close_book(&mut self.engine);
            return Ok(());
        }
        let Some(reader) = self.ctx.reader.as_mut() else {
            return Ok(());
        };
        match target {
            Target::Previous => {
                reader.go_previous(&mut self.engine);
            }
            Target::Next => {
                reader.go_next(&mut self.engine);
            }
            Target::Speaker => reader.toggle_narration(&mut self.engine),
            Target::Picker => {
                self.picker_cursor = reader.page_index();
                reader.toggle_picker();
            }
            Target::Summary => {
                reader.jump_to_summary(&mut self.engine);
            }
            Target::PickerPage(index) => {
                reader.jump_to(index, &mut self.engine);
            }
            Target::SummaryItem(index) => reader.tap_summary_item(index, &mut self.engine),
            Target::Backdrop => reader.close_picker(),
            Target::Content => reader.tap_content(&mut self.engine, now),
            Target::Book(_) | Target::Back => {}
        }
        Ok(())
    }

    fn draw(&mut self, area: Rect, frame: &mut ratatui::Frame) {
        frame.render_widget(Clear, area);
        let mut hits = HitMap::default();
        match self.ctx.reader.as_ref() {
            Some(reader) => self.draw_reader(reader, area, frame, &mut hits),
            None => self.draw_shelf(area, frame, &mut hits),
        }
        self.hits = hits;
    }

    fn draw_shelf(&self, area: Rect, frame: &mut ratatui::Frame, hits: &mut HitMap) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(area);

        let title = Paragraph::new(Text::from(vec![Line::styled(
            "Picturebook",
            Style::default().add_modifier(Modifier::BOLD),
        )]))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM));
        frame.render_widget(title, layout[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(layout[1]);

        let shelf = self.ctx.shelf();
        let block = Block::default().borders(Borders::ALL).title("Books");
        let inner = block.inner(body[0]);
        let items: Vec<ListItem> = shelf
            .iter()
            .map(|book| {
                let color = pages::hex_color(&book.color, Color::White);
                ListItem::new(Line::from(vec![
                    Span::raw(format!("{} ", book.cover)),
                    Span::styled(book.title.clone(), Style::default().fg(color)),
                ]))
            })
            .collect();
        let list = List::new(items)
            .block(block)
            .highlight_style(
                Style::default()
                    .fg(Color::Black)
                    .bg(ACCENT)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ")
            .highlight_spacing(HighlightSpacing::Always);
        let mut state = ListState::default();
        if !shelf.is_empty() {
            state.select(Some(self.ctx.selected.min(shelf.len() - 1)));
        }
        frame.render_stateful_widget(list, body[0], &mut state);

        for row in 0..inner.height {
            let index = state.offset() + row as usize;
            if index >= shelf.len() {
                break;
            }
            hits.push(
                Rect::new(inner.x, inner.y + row, inner.width, 1),
                Target::Book(index),
            );
        }

        frame.render_widget(self.shelf_details(), body[1]);

        let footer = Paragraph::new(Text::from(vec![help_line(&[
            ("↑/↓", "choose"),
            ("Enter", "open"),
            ("+/-", "volume"),
            ("q", "quit"),
        ])]))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
        frame.render_widget(footer, layout[2]);
    }

    fn shelf_details(&self) -> Paragraph<'static> {
        let block = Block::default().borders(Borders::ALL).title("Details");
        let Some(book) = self.ctx.selected_book() else {
            return Paragraph::new(Line::raw("The shelf is empty.")).block(block);
        };
        let lines = vec![
            Line::raw(book.cover.clone()),
            Line::raw(""),
            Line::styled(
                book.title.clone(),
                Style::default()
                    .fg(pages::hex_color(&book.color, Color::White))
                    .add_modifier(Modifier::BOLD),
            ),
            Line::raw(""),
            Line::raw(format!("{} pages", book.page_count())),
            Line::raw(format!("Kind: {}", book.kind)),
            Line::raw(format!(
                "Volume: {}%",
                (self.engine.volume() * 100.0).round() as u32
            )),
            Line::raw(""),
            Line::raw(if self.engine.can_speak() {
                "Narration ready."
            } else {
                "No speech synthesizer found; pages stay silent."
            }),
        ];
        Paragraph::new(Text::from(lines))
            .block(block)
            .wrap(Wrap { trim: true })
    }

    fn draw_reader(
        &self,
        reader: &Reader,
        area: Rect,
        frame: &mut ratatui::Frame,
        hits: &mut HitMap,
    ) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(area);

        self.draw_top_bar(reader, layout[0], frame, hits);
        self.draw_page(reader, layout[1], frame, hits);
        self.draw_bottom_bar(reader, layout[2], frame, hits);

        if reader.picker_open() {
            hits.push(area, Target::Backdrop);
            self.draw_picker(reader, area, frame, hits);
        }
    }

    fn draw_top_bar(
        &self,
        reader: &Reader,
        area: Rect,
        frame: &mut ratatui::Frame,
        hits: &mut HitMap,
    ) {
        let block = Block::default().borders(Borders::BOTTOM);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let back = "[◀ Shelf]".to_string();
        let mut right: Vec<(String, Target, bool)> = Vec::new();
        if reader.book().summary_index().is_some() {
            right.push(("[Aa]".to_string(), Target::Summary, false));
        }
        right.push(("[# Pages]".to_string(), Target::Picker, reader.picker_open()));
        right.push((
            speaker_label(reader, &self.engine),
            Target::Speaker,
            self.engine.is_speaking(),
        ));

        let mut constraints = vec![
            Constraint::Length(back.width() as u16),
            Constraint::Min(0),
        ];
        for (label, _, _) in &right {
            constraints.push(Constraint::Length(label.width() as u16 + 1));
        }
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(inner);

        frame.render_widget(button(&back, false), cells[0]);
        hits.push(cells[0], Target::Back);

        let title = Line::from(vec![
            Span::styled(
                reader.book().title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(
                "  ·  vol {}%",
                (self.engine.volume() * 100.0).round() as u32
            )),
        ]);
        frame.render_widget(
            Paragraph::new(title).alignment(Alignment::Center),
            cells[1],
        );

        for (i, (label, target, active)) in right.iter().enumerate() {
            let cell = cells[i + 2];
            frame.render_widget(button(label, *active).alignment(Alignment::Right), cell);
            hits.push(cell, *target);
        }
    }

    fn draw_page(
        &self,
        reader: &Reader,
        area: Rect,
        frame: &mut ratatui::Frame,
        hits: &mut HitMap,
    ) {
        let Some(page) = reader.page() else {
            return;
        };
        let background = pages::hex_color(&page.background, Color::White);
        frame.render_widget(
            Block::default().style(Style::default().bg(background)),
            area,
        );
        hits.push(area, Target::Content);

        let inner = Rect::new(
            area.x + 1,
            area.y,
            area.width.saturating_sub(2),
            area.height,
        );
        if page.is_summary() {
            pages::render_summary(page, inner, frame, hits);
            return;
        }
        let scene = PageScene {
            object_count: reader.kind().object_count(page),
            highlight: reader.highlight(),
        };
        pages::view_for(reader.kind()).render(page, &scene, inner, frame);
    }

    fn draw_bottom_bar(
        &self,
        reader: &Reader,
        area: Rect,
        frame: &mut ratatui::Frame,
        hits: &mut HitMap,
    ) {
        let block = Block::default().borders(Borders::TOP);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let previous = "[‹ Back]";
        let next = "[Next ›]";
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(previous.width() as u16),
                Constraint::Min(0),
                Constraint::Length(next.width() as u16),
            ])
            .split(inner);

        if !reader.is_first() {
            frame.render_widget(button(previous, false), cells[0]);
            hits.push(cells[0], Target::Previous);
        }
        frame.render_widget(
            Paragraph::new(Line::raw(page_dots(reader.page_index(), reader.page_count())))
                .alignment(Alignment::Center),
            cells[1],
        );
        if !reader.is_last() {
            frame.render_widget(button(next, false), cells[2]);
            hits.push(cells[2], Target::Next);
        }
    }

    fn draw_picker(
        &self,
        reader: &Reader,
        area: Rect,
        frame: &mut ratatui::Frame,
        hits: &mut HitMap,
    ) {
        let popup_area = centered_rect(70, 60, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .title(Span::styled(
                "Pages",
                Style::default().add_modifier(Modifier::BOLD),
            ));
        let inner = block.inner(popup_area);
        frame.render_widget(block, popup_area);

        let labels: Vec<String> = reader
            .book()
            .pages
            .iter()
            .enumerate()
            .map(|(i, page)| format!("{} {}", i + 1, page.title))
            .collect();
        let cell_width = labels
            .iter()
            .map(|l| l.width() as u16)
            .max()
            .unwrap_or(1)
            + 2;
        let columns = (inner.width / (cell_width + 1)).max(1);

        for (i, label) in labels.iter().enumerate() {
            let col = i as u16 % columns;
            let row = i as u16 / columns;
            if row >= inner.height {
                break;
            }
            let rect = Rect::new(
                inner.x + col * (cell_width + 1),
                inner.y + row,
                cell_width.min(inner.width),
                1,
            );
            let style = if i == self.picker_cursor {
                Style::default()
                    .fg(Color::Black)
                    .bg(ACCENT)
                    .add_modifier(Modifier::BOLD)
            } else if i == reader.page_index() {
                Style::default().add_modifier(Modifier::UNDERLINED)
            } else {
                Style::default()
            };
            frame.render_widget(Paragraph::new(Line::styled(label.clone(), style)), rect);
            hits.push(rect, Target::PickerPage(i));
        }
    }
}

fn speaker_label(reader: &Reader, engine: &NarrationEngine) -> String {
    if reader.is_counting() {
        return "[■ Stop]".to_string();
    }
    let label = match engine.transport() {
        Transport::Idle => "[▶ Read]",
        Transport::Speaking | Transport::ClipPlaying => "[❚❚ Pause]",
        Transport::SpeechPaused | Transport::ClipPaused => "[▶ Resume]",
        Transport::ClipLoading => "[… Loading]",
    };
    label.to_string()
}

fn button(label: &str, active: bool) -> Paragraph<'static> {
    let style = if active {
        Style::default()
            .fg(Color::Black)
            .bg(ACCENT)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::BOLD)
    };
    Paragraph::new(Line::styled(label.to_string(), style))
}

fn help_line(entries: &[(&str, &str)]) -> Line<'static> {
    let mut spans = Vec::with_capacity(entries.len() * 2);
    for (key, action) in entries {
        spans.push(Span::styled(
            key.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(format!(" {action}  ")));
    }
    Line::from(spans)
}

fn page_dots(current: usize, count: usize) -> String {
    if count > MAX_PAGE_DOTS {
        return format!("{} / {count}", current + 1);
    }
    (0..count)
        .map(|i| if i == current { "●" } else { "○" })
        .collect::<Vec<_>>()
        .join(" ")
}

fn pointer_id(button: MouseButton) -> u64 {
    match button {
        MouseButton::Left => 0,
        MouseButton::Right => 1,
        MouseButton::Middle => 2,
    }
}

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    terminal::enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    crossterm::execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableFocusChange
    )
    .context("enter alt screen")?;
    let backend = CrosstermBackend::new(stdout);
    info!("terminal ready");
    Terminal::new(backend).context("create terminal")
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    terminal::disable_raw_mode().context("disable raw mode")?;
    crossterm::execute!(
        terminal.backend_mut(),
        DisableFocusChange,
        DisableMouseCapture,
        LeaveAlternateScreen
    )
    .context("leave alt screen")?;
    Ok(())
}

fn panic_to_string(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: (unknown payload)".to_string()
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
