//! Reading session for one open book.

use std::time::Instant;

use log::debug;
use picturebook_core::{Book, BookKind, CountingSettings, Page, Settings};
use picturebook_narration::{NarrationEngine, NarrationRequest};

use crate::counting::{CountStep, CountingSession};
use crate::gesture::Gesture;

#[derive(Debug)]
pub struct Reader {
    book: Book,
    page: usize,
    picker_open: bool,
    counting: Option<CountingSession>,
    rate: f32,
    pitch: f32,
    counting_settings: CountingSettings,
}

impl Reader {
    /// Opens `book` on its first page. Anything still playing is stopped.
    pub fn open(book: Book, settings: &Settings, engine: &mut NarrationEngine) -> Self {
        engine.begin_page();
        Self {
            book,
            page: 0,
            picker_open: false,
            counting: None,
            rate: settings.narration.rate,
            pitch: settings.narration.pitch,
            counting_settings: settings.counting.clone(),
        }
    }

    pub fn book(&self) -> &Book {
        &self.book
    }

    pub fn kind(&self) -> BookKind {
        self.book.kind
    }

    pub fn page_index(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        self.book.page_count()
    }

    pub fn page(&self) -> Option<&Page> {
        self.book.pages.get(self.page)
    }

    pub fn is_first(&self) -> bool {
        self.page == 0
    }

    pub fn is_last(&self) -> bool {
        self.page + 1 >= self.page_count()
    }

    pub fn picker_open(&self) -> bool {
        self.picker_open
    }

    pub fn is_counting(&self) -> bool {
        self.counting.is_some()
    }

    /// Object currently highlighted by a counting run.
    pub fn highlight(&self) -> Option<usize> {
        self.counting.as_ref().and_then(CountingSession::highlight)
    }

    pub fn speaking(&self, engine: &NarrationEngine) -> bool {
        engine.is_speaking()
    }

    /// What the speaker button plays for the current page.
    pub fn narration_request(&self, engine: &NarrationEngine) -> NarrationRequest {
        match self.page() {
            Some(page) => {
                NarrationRequest::speech(page.narration_text(), self.rate, self.pitch, engine.volume())
                    .with_audio(page.audio_url.clone())
            }
            None => NarrationRequest::speech("", self.rate, self.pitch, engine.volume()),
        }
    }

    pub fn go_previous(&mut self, engine: &mut NarrationEngine) -> bool {
        if self.is_first() {
            return false;
        }
        self.set_page(self.page - 1, engine)
    }

    pub fn go_next(&mut self, engine: &mut NarrationEngine) -> bool {
        if self.is_last() {
            return false;
        }
        self.set_page(self.page + 1, engine)
    }

    pub fn jump_to(&mut self, index: usize, engine: &mut NarrationEngine) -> bool {
        let index = index.min(self.page_count().saturating_sub(1));
        self.set_page(index, engine)
    }

    /// Jumps to the book's index page, if it has one.
    pub fn jump_to_summary(&mut self, engine: &mut NarrationEngine) -> bool {
        match self.book.summary_index() {
            Some(index) => self.set_page(index, engine),
            None => false,
        }
    }

    fn set_page(&mut self, index: usize, engine: &mut NarrationEngine) -> bool {
        self.picker_open = false;
        if index == self.page {
            return false;
        }
        self.cancel_counting();
        engine.begin_page();
        self.page = index;
        debug!("{}: page {}/{}", self.book.id, index + 1, self.page_count());
        true
    }

    /// The page itself was touched: count its objects or read it aloud.
    pub fn tap_content(&mut self, engine: &mut NarrationEngine, now: Instant) {
        let Some(page) = self.page() else {
            return;
        };
        if self.book.kind.counts_on_tap(page) {
            let count = self.book.kind.object_count(page);
            let intro = page.intro_phrase();
            self.cancel_counting();
            engine.speak_text(&intro, self.rate, self.pitch, engine.volume());
            self.counting = Some(CountingSession::start(
                &intro,
                count,
                &self.counting_settings,
                now,
            ));
            return;
        }
        let request = self.narration_request(engine);
        self.cancel_counting();
        engine.narrate(&request);
    }

    /// Speaks one entry of the index grid.
    pub fn tap_summary_item(&mut self, index: usize, engine: &mut NarrationEngine) {
        let Some(item) = self.page().and_then(|p| p.summary_items().get(index)) else {
            return;
        };
        let text = self.book.kind.item_narration(item);
        self.cancel_counting();
        engine.speak_text(&text, self.rate, self.pitch, engine.volume());
    }

    /// Speaker button.
    pub fn toggle_narration(&mut self, engine: &mut NarrationEngine) {
        if self.counting.is_some() {
            self.cancel_counting();
            engine.stop();
            return;
        }
        let request = self.narration_request(engine);
        engine.toggle(&request);
    }

    pub fn apply_gesture(&mut self, gesture: Gesture, engine: &mut NarrationEngine, now: Instant) {
        match gesture {
            Gesture::SwipePrevious | Gesture::TapLeftEdge => {
                self.go_previous(engine);
            }
            Gesture::SwipeNext | Gesture::TapRightEdge => {
                self.go_next(engine);
            }
            Gesture::TapPlain => self.tap_content(engine, now),
            Gesture::NoAction => {}
        }
    }

    pub fn open_picker(&mut self) {
        self.picker_open = true;
    }

    pub fn close_picker(&mut self) {
        self.picker_open = false;
    }

    pub fn toggle_picker(&mut self) {
        self.picker_open = !self.picker_open;
    }

    /// Advances the counting run, voicing each number as it is highlighted.
    pub fn tick(&mut self, now: Instant, engine: &mut NarrationEngine) {
        let Some(session) = self.counting.as_mut() else {
            return;
        };
        for step in session.tick(now) {
            if let CountStep::Highlight(i) = step {
                let number = (i + 1).to_string();
                engine.speak_text(&number, self.rate, self.pitch, engine.volume());
            }
        }
        if session.is_finished() {
            self.counting = None;
        }
    }

    pub fn close(&mut self, engine: &mut NarrationEngine) {
        self.cancel_counting();
        self.picker_open = false;
        engine.stop();
    }

    fn cancel_counting(&mut self) {
        if let Some(mut session) = self.counting.take() {
            session.cancel();
        }
    }
}
