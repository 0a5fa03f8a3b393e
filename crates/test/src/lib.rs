//! Test helpers and fixtures.

use picturebook_core::{Book, BookKind, Emoji, Page, PageKind, Settings};
use picturebook_narration::NarrationEngine;
use picturebook_narration::testing::{FakeHandle, fake_backends};

pub fn make_settings(volume: f32) -> Settings {
    let mut settings = Settings::default();
    settings.narration.volume = volume;
    settings.normalize();
    settings
}

pub fn content_page(title: &str, speech: Option<&str>) -> Page {
    Page {
        kind: PageKind::Content,
        title: title.to_string(),
        subtitle: None,
        background: "#FFFFFF".to_string(),
        letter_color: None,
        speech: speech.map(String::from),
        audio_url: None,
        emoji: Some(Emoji::One("⭐".to_string())),
        image_url: None,
    }
}

pub fn summary_page(title: &str, items: &[&str]) -> Page {
    Page {
        kind: PageKind::Summary {
            items: items.iter().map(|s| s.to_string()).collect(),
        },
        ..content_page(title, None)
    }
}

pub fn make_book(id: &str, kind: BookKind, pages: Vec<Page>) -> Book {
    Book {
        id: id.to_string(),
        title: id.to_string(),
        color: "#42A5F5".to_string(),
        cover: "📘".to_string(),
        kind,
        hidden: false,
        pages,
    }
}

/// Numbers book: a single object, three objects, then the index.
pub fn counting_book() -> Book {
    make_book(
        "count",
        BookKind::Numbers,
        vec![
            content_page("1", Some("One sun")),
            content_page("3", Some("Three ducks!... Let's count them")),
            summary_page("Numbers", &["1", "2", "3"]),
        ],
    )
}

/// Story book whose first page has a recording at `audio_url`.
pub fn story_book(audio_url: &str) -> Book {
    let mut first = content_page("Moon", Some("The sleepy moon... Once upon a time"));
    first.audio_url = Some(audio_url.to_string());
    make_book(
        "story",
        BookKind::Picture,
        vec![first, content_page("Owl", Some("Hoo! Hoo!"))],
    )
}

pub fn fake_engine(settings: &Settings) -> (NarrationEngine, FakeHandle) {
    let (speech, audio, handle) = fake_backends();
    let engine = NarrationEngine::new(Box::new(speech), Box::new(audio), &settings.narration);
    (engine, handle)
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use picturebook_application::{
        AppContext, CountingSession, Gesture, GestureRouter, PointerSample, Reader,
    };
    use picturebook_core::Catalog;
    use picturebook_narration::testing::Call;
    use picturebook_storage::SettingsStore;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn builds_settings() {
        let settings = make_settings(4.0);
        assert_eq!(settings.narration.volume, 1.0);
    }

    #[test]
    fn navigation_clamps_for_every_builtin_book() {
        let settings = make_settings(1.0);
        let (mut engine, _) = fake_engine(&settings);
        let catalog = Catalog::builtin().unwrap();
        for book in catalog.books() {
            let n = book.page_count();
            let mut reader = Reader::open(book.clone(), &settings, &mut engine);
            for i in 0..n {
                reader.jump_to(i, &mut engine);
                reader.go_next(&mut engine);
                assert_eq!(reader.page_index(), (i + 1).min(n - 1), "{}", book.id);
                reader.jump_to(i, &mut engine);
                reader.go_previous(&mut engine);
                assert_eq!(reader.page_index(), i.saturating_sub(1), "{}", book.id);
            }
        }
    }

    #[test]
    fn pointer_input_drives_the_reader() {
        let settings = make_settings(1.0);
        let (mut engine, fake) = fake_engine(&settings);
        let mut reader = Reader::open(counting_book(), &settings, &mut engine);
        let mut router = GestureRouter::new(&settings.gestures);
        let width = 800.0;
        let t0 = Instant::now();

        router.pointer_down(PointerSample::new(0, 400.0, 200.0, t0));
        let swipe = router.pointer_up(PointerSample::new(0, 350.0, 205.0, t0 + ms(150)), width);
        assert_eq!(swipe, Gesture::SwipeNext);
        reader.apply_gesture(swipe, &mut engine, t0);
        assert_eq!(reader.page_index(), 1);

        router.pointer_down(PointerSample::new(0, 50.0, 200.0, t0));
        let tap = router.pointer_up(PointerSample::new(0, 55.0, 205.0, t0 + ms(100)), width);
        assert_eq!(tap, Gesture::TapLeftEdge);
        reader.apply_gesture(tap, &mut engine, t0);
        assert_eq!(reader.page_index(), 0);

        router.pointer_down(PointerSample::new(0, 400.0, 200.0, t0));
        let diagonal = router.pointer_up(PointerSample::new(0, 425.0, 224.0, t0 + ms(100)), width);
        assert_eq!(diagonal, Gesture::NoAction);
        reader.apply_gesture(diagonal, &mut engine, t0);
        assert_eq!(reader.page_index(), 0);
        assert!(fake.spoken().is_empty());
    }

    #[test]
    fn switching_sources_stops_the_previous_one_first() {
        let settings = make_settings(1.0);
        let (mut engine, fake) = fake_engine(&settings);
        let t0 = Instant::now();
        let mut reader = Reader::open(story_book("moon.mp3"), &settings, &mut engine);

        reader.tap_content(&mut engine, t0);
        engine.tick(t0);
        let clip = fake.last_clip().unwrap();
        fake.clear_calls();

        reader.go_next(&mut engine);
        reader.tap_content(&mut engine, t0 + ms(50));
        let calls = fake.calls();
        let stopped = calls.iter().position(|c| *c == Call::Stop(clip)).unwrap();
        let spoke = calls
            .iter()
            .position(|c| matches!(c, Call::Speak(_)))
            .unwrap();
        assert!(stopped < spoke, "{calls:?}");
    }

    #[test]
    fn failed_recording_goes_straight_to_speech_on_the_same_page() {
        let settings = make_settings(1.0);
        let (mut engine, fake) = fake_engine(&settings);
        fake.fail_url("moon.mp3");
        let t0 = Instant::now();
        let mut reader = Reader::open(story_book("moon.mp3"), &settings, &mut engine);

        reader.tap_content(&mut engine, t0);
        engine.tick(t0);
        assert_eq!(fake.spoken(), vec!["The sleepy moon"]);

        fake.clear_calls();
        reader.tap_content(&mut engine, t0 + ms(500));
        let calls = fake.calls();
        assert!(!calls.iter().any(|c| matches!(c, Call::Load(_))), "{calls:?}");
        assert_eq!(fake.spoken(), vec!["The sleepy moon"]);

        // A new page view retries the recording.
        reader.go_next(&mut engine);
        reader.go_previous(&mut engine);
        fake.clear_calls();
        reader.tap_content(&mut engine, t0 + ms(900));
        assert!(fake.calls().contains(&Call::Load("moon.mp3".to_string())));
    }

    #[test]
    fn navigation_cancels_a_running_count() {
        let settings = make_settings(1.0);
        let (mut engine, fake) = fake_engine(&settings);
        let t0 = Instant::now();
        let mut reader = Reader::open(counting_book(), &settings, &mut engine);
        reader.go_next(&mut engine);
        reader.tap_content(&mut engine, t0);
        reader.tick(t0 + ms(1_200), &mut engine);
        assert_eq!(reader.highlight(), Some(0));

        reader.go_next(&mut engine);
        fake.clear_calls();
        let mut now = t0 + ms(1_200);
        for _ in 0..50 {
            now += ms(997);
            engine.tick(now);
            reader.tick(now, &mut engine);
            assert_eq!(reader.highlight(), None);
        }
        assert!(fake.spoken().is_empty(), "{:?}", fake.calls());
    }

    #[test]
    fn counting_three_schedules_four_steps() {
        let settings = make_settings(1.0);
        let t0 = Instant::now();
        let mut session =
            CountingSession::start("Three ducks!", 3, &settings.counting, t0);
        assert_eq!(session.pending_len(), 4);
        session.cancel();
        assert_eq!(session.pending_len(), 0);
        assert!(session.tick(t0 + ms(3_600_000)).is_empty());
    }

    #[test]
    fn clauses_wait_for_completion() {
        let settings = make_settings(1.0);
        let (mut engine, fake) = fake_engine(&settings);
        let mut now = Instant::now();
        engine.speak_text("A...B...C", 0.7, 1.4, 1.0);

        for expected in [vec!["A"], vec!["A", "B"], vec!["A", "B", "C"]] {
            for _ in 0..10 {
                now += ms(50);
                engine.tick(now);
            }
            assert_eq!(fake.spoken(), expected);
            fake.finish_utterance();
            for _ in 0..10 {
                now += ms(50);
                engine.tick(now);
            }
        }
        assert_eq!(fake.spoken(), vec!["A", "B", "C"]);
    }

    #[test]
    fn volume_changes_survive_a_restart() {
        let dir = std::env::temp_dir().join(format!(
            "picturebook-test-volume-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        let store = SettingsStore::open(&dir).unwrap();

        let settings = store.load_settings().unwrap();
        let (mut engine, _) = fake_engine(&settings);
        let mut app = AppContext::new(Catalog::builtin().unwrap(), settings);
        app.nudge_volume(-0.5, &mut engine);
        store.save_settings(&app.settings).unwrap();

        let reloaded = store.load_settings().unwrap();
        let (engine, _) = fake_engine(&reloaded);
        assert!((engine.volume() - 0.5).abs() < 1e-5);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn hidden_books_stay_off_the_shelf() {
        let catalog = Catalog::builtin().unwrap();
        let shelf: Vec<&str> = catalog.shelf().iter().map(|b| b.id.as_str()).collect();
        assert!(shelf.contains(&"numbers"));
        assert!(!shelf.contains(&"colors"));
        assert!(catalog.find("colors").is_some());
    }
}
