//! Application orchestration layer for Picturebook.

use std::time::Instant;

use anyhow::Context as _;
use log::info;
use picturebook_core::{Book, Catalog, Settings};
use picturebook_narration::NarrationEngine;

pub mod counting;
pub mod gesture;
pub mod reader;

pub use counting::{CountStep, CountingSession};
pub use gesture::{Gesture, GestureRouter, PointerSample};
pub use reader::Reader;

/// Volume step for the `+`/`-` keys.
pub const VOLUME_STEP: f32 = 0.1;

/// Shelf or reading mode, plus the settings the session runs with.
#[derive(Debug)]
pub struct AppContext {
    pub catalog: Catalog,
    pub settings: Settings,
    pub selected: usize,
    pub reader: Option<Reader>,
}

impl AppContext {
    pub fn new(catalog: Catalog, settings: Settings) -> Self {
        Self {
            catalog,
            settings,
            selected: 0,
            reader: None,
        }
    }

    pub fn shelf(&self) -> Vec<&Book> {
        self.catalog.shelf()
    }

    pub fn selected_book(&self) -> Option<&Book> {
        self.shelf().get(self.selected).copied()
    }

    pub fn select(&mut self, index: usize) {
        let len = self.catalog.shelf().len();
        self.selected = index.min(len.saturating_sub(1));
    }

    pub fn select_next(&mut self) {
        self.select(self.selected.saturating_add(1));
    }

    pub fn select_previous(&mut self) {
        self.select(self.selected.saturating_sub(1));
    }

    pub fn is_reading(&self) -> bool {
        self.reader.is_some()
    }

    pub fn open_book(&mut self, id: &str, engine: &mut NarrationEngine) -> anyhow::Result<()> {
        let book = self
            .catalog
            .find(id)
            .cloned()
            .with_context(|| format!("no book with id {id:?}"))?;
        let position = self.catalog.shelf().iter().position(|b| b.id == id);
        if let Some(index) = position {
            self.selected = index;
        }
        if let Some(mut reader) = self.reader.take() {
            reader.close(engine);
        }
        info!("opening {} ({} pages)", book.id, book.page_count());
        self.reader = Some(Reader::open(book, &self.settings, engine));
        Ok(())
    }

    pub fn open_selected(&mut self, engine: &mut NarrationEngine) -> anyhow::Result<()> {
        let id = self
            .selected_book()
            .map(|book| book.id.clone())
            .context("the shelf is empty")?;
        self.open_book(&id, engine)
    }

    /// Back to the shelf; the reader's narration and counting stop with it.
    pub fn close_book(&mut self, engine: &mut NarrationEngine) {
        if let Some(mut reader) = self.reader.take() {
            reader.close(engine);
        }
    }

    pub fn nudge_volume(&mut self, delta: f32, engine: &mut NarrationEngine) {
        self.settings.narration.nudge_volume(delta);
        engine.set_volume(self.settings.narration.volume);
    }

    pub fn tick(&mut self, now: Instant, engine: &mut NarrationEngine) {
        engine.tick(now);
        if let Some(reader) = self.reader.as_mut() {
            reader.tick(now, engine);
        }
    }
}
