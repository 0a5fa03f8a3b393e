//! Pointer down/up pairs classified into navigation intents.

use std::time::{Duration, Instant};

use picturebook_core::GestureSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    SwipePrevious,
    SwipeNext,
    TapLeftEdge,
    TapRightEdge,
    /// A tap away from the edges: no navigation, the page itself was touched.
    TapPlain,
    NoAction,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub at: Instant,
}

impl PointerSample {
    pub fn new(id: u64, x: f32, y: f32, at: Instant) -> Self {
        Self { id, x, y, at }
    }
}

#[derive(Debug, Clone)]
pub struct GestureRouter {
    settings: GestureSettings,
    down: Option<PointerSample>,
}

impl GestureRouter {
    pub fn new(settings: &GestureSettings) -> Self {
        Self {
            settings: settings.clone(),
            down: None,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.down.is_some()
    }

    /// Starts tracking unless another pointer is already down.
    pub fn pointer_down(&mut self, sample: PointerSample) {
        if self.down.is_none() {
            self.down = Some(sample);
        }
    }

    pub fn pointer_up(&mut self, sample: PointerSample, width: f32) -> Gesture {
        match self.down {
            Some(down) if down.id == sample.id => {
                self.down = None;
                classify(
                    &self.settings,
                    sample.x - down.x,
                    sample.y - down.y,
                    sample.at.saturating_duration_since(down.at),
                    sample.x,
                    width,
                )
            }
            _ => Gesture::NoAction,
        }
    }

    pub fn pointer_cancel(&mut self, id: u64) {
        if self.down.is_some_and(|down| down.id == id) {
            self.down = None;
        }
    }

    /// Forgets any tracked pointer, e.g. when the terminal loses focus.
    pub fn reset(&mut self) {
        self.down = None;
    }
}

pub fn classify(
    settings: &GestureSettings,
    dx: f32,
    dy: f32,
    elapsed: Duration,
    x: f32,
    width: f32,
) -> Gesture {
    let (adx, ady) = (dx.abs(), dy.abs());

    if adx > settings.swipe_min_px && ady < adx * settings.swipe_ratio {
        return if dx < 0.0 {
            Gesture::SwipeNext
        } else {
            Gesture::SwipePrevious
        };
    }

    let quick = elapsed < Duration::from_millis(settings.tap_max_ms);
    if quick && adx < settings.tap_jitter_px && ady < settings.tap_jitter_px {
        if width <= 0.0 {
            return Gesture::TapPlain;
        }
        let fraction = x / width;
        return if fraction < settings.left_edge {
            Gesture::TapLeftEdge
        } else if fraction > settings.right_edge {
            Gesture::TapRightEdge
        } else {
            Gesture::TapPlain
        };
    }

    Gesture::NoAction
}

#[cfg(test)]
mod tests {
    use super::*;

    const WIDTH: f32 = 800.0;

    fn gesture(dx: f32, dy: f32, elapsed_ms: u64, x: f32) -> Gesture {
        classify(
            &GestureSettings::default(),
            dx,
            dy,
            Duration::from_millis(elapsed_ms),
            x,
            WIDTH,
        )
    }

    #[test]
    fn horizontal_swipes_navigate() {
        assert_eq!(gesture(-50.0, 5.0, 200, 300.0), Gesture::SwipeNext);
        assert_eq!(gesture(50.0, -5.0, 200, 300.0), Gesture::SwipePrevious);
        // Slow swipes still count.
        assert_eq!(gesture(-120.0, 0.0, 2_000, 300.0), Gesture::SwipeNext);
    }

    #[test]
    fn quick_taps_split_by_position() {
        assert_eq!(gesture(5.0, 5.0, 100, WIDTH * 0.10), Gesture::TapLeftEdge);
        assert_eq!(gesture(-3.0, 2.0, 100, WIDTH * 0.90), Gesture::TapRightEdge);
        assert_eq!(gesture(0.0, 0.0, 100, WIDTH * 0.50), Gesture::TapPlain);
    }

    #[test]
    fn diagonal_and_slow_movements_do_nothing() {
        assert_eq!(gesture(25.0, 24.0, 100, 300.0), Gesture::NoAction);
        assert_eq!(gesture(2.0, 2.0, 300, WIDTH * 0.05), Gesture::NoAction);
        assert_eq!(gesture(15.0, 0.0, 100, 300.0), Gesture::NoAction);
        assert_eq!(gesture(0.0, 40.0, 100, 300.0), Gesture::NoAction);
    }

    #[test]
    fn zero_width_never_taps_an_edge() {
        let tap = classify(
            &GestureSettings::default(),
            0.0,
            0.0,
            Duration::from_millis(10),
            0.0,
            0.0,
        );
        assert_eq!(tap, Gesture::TapPlain);
    }

    #[test]
    fn router_tracks_only_the_first_pointer() {
        let t0 = Instant::now();
        let later = t0 + Duration::from_millis(120);
        let mut router = GestureRouter::new(&GestureSettings::default());

        router.pointer_down(PointerSample::new(1, 400.0, 100.0, t0));
        router.pointer_down(PointerSample::new(2, 10.0, 100.0, t0));
        assert_eq!(
            router.pointer_up(PointerSample::new(2, 10.0, 100.0, later), WIDTH),
            Gesture::NoAction
        );
        assert!(router.is_tracking());
        assert_eq!(
            router.pointer_up(PointerSample::new(1, 340.0, 104.0, later), WIDTH),
            Gesture::SwipeNext
        );
        assert!(!router.is_tracking());
        assert_eq!(
            router.pointer_up(PointerSample::new(1, 340.0, 104.0, later), WIDTH),
            Gesture::NoAction
        );
    }

    #[test]
    fn cancel_and_reset_discard_the_press() {
        let t0 = Instant::now();
        let mut router = GestureRouter::new(&GestureSettings::default());

        router.pointer_down(PointerSample::new(1, 50.0, 50.0, t0));
        router.pointer_cancel(7);
        assert!(router.is_tracking());
        router.pointer_cancel(1);
        assert!(!router.is_tracking());

        router.pointer_down(PointerSample::new(3, 50.0, 50.0, t0));
        router.reset();
        assert_eq!(
            router.pointer_up(PointerSample::new(3, 50.0, 50.0, t0), WIDTH),
            Gesture::NoAction
        );
    }

    #[test]
    fn thresholds_come_from_settings() {
        let settings = GestureSettings {
            swipe_min_px: 100.0,
            ..GestureSettings::default()
        };
        let g = classify(&settings, -50.0, 0.0, Duration::from_millis(50), 0.0, WIDTH);
        assert_eq!(g, Gesture::NoAction);
    }
}
