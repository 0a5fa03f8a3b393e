//! Clickable regions recorded while drawing, looked up on mouse input.

use ratatui::layout::Rect;

/// Nominal pixel size of one terminal cell, for gesture thresholds.
pub(crate) const CELL_WIDTH_PX: f32 = 10.0;
pub(crate) const CELL_HEIGHT_PX: f32 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Target {
    Book(usize),
    Back,
    Previous,
    Next,
    Speaker,
    Picker,
    Summary,
    PickerPage(usize),
    SummaryItem(usize),
    /// Anything outside the picker while it is open.
    Backdrop,
    /// The page body, where swipes and taps are classified.
    Content,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct HitMap {
    regions: Vec<(Rect, Target)>,
}

impl HitMap {
    pub(crate) fn push(&mut self, rect: Rect, target: Target) {
        if rect.width > 0 && rect.height > 0 {
            self.regions.push((rect, target));
        }
    }

    /// Topmost target under the cell; later regions cover earlier ones.
    pub(crate) fn hit(&self, column: u16, row: u16) -> Option<Target> {
        self.regions
            .iter()
            .rev()
            .find(|(rect, _)| contains(*rect, column, row))
            .map(|(_, target)| *target)
    }

    pub(crate) fn content(&self) -> Option<Rect> {
        self.regions
            .iter()
            .find(|(_, target)| *target == Target::Content)
            .map(|(rect, _)| *rect)
    }
}

fn contains(rect: Rect, column: u16, row: u16) -> bool {
    column >= rect.x
        && row >= rect.y
        && u32::from(column) < u32::from(rect.x) + u32::from(rect.width)
        && u32::from(row) < u32::from(rect.y) + u32::from(rect.height)
}

/// Cell position relative to `area`, scaled to nominal pixels at the cell centre.
pub(crate) fn to_pixels(area: Rect, column: u16, row: u16) -> (f32, f32) {
    let x = (f32::from(column) - f32::from(area.x) + 0.5) * CELL_WIDTH_PX;
    let y = (f32::from(row) - f32::from(area.y) + 0.5) * CELL_HEIGHT_PX;
    (x, y)
}

pub(crate) fn width_pixels(area: Rect) -> f32 {
    f32::from(area.width) * CELL_WIDTH_PX
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_regions_win() {
        let mut hits = HitMap::default();
        hits.push(Rect::new(0, 0, 80, 20), Target::Content);
        hits.push(Rect::new(10, 5, 6, 3), Target::SummaryItem(2));
        hits.push(Rect::new(0, 0, 0, 5), Target::Back);

        assert_eq!(hits.hit(12, 6), Some(Target::SummaryItem(2)));
        assert_eq!(hits.hit(16, 6), Some(Target::Content));
        assert_eq!(hits.hit(0, 0), Some(Target::Content));
        assert_eq!(hits.hit(80, 0), None);
        assert_eq!(hits.content(), Some(Rect::new(0, 0, 80, 20)));
    }

    #[test]
    fn cells_scale_to_pixels() {
        let area = Rect::new(2, 3, 40, 10);
        assert_eq!(to_pixels(area, 2, 3), (5.0, 10.0));
        assert_eq!(to_pixels(area, 7, 4), (55.0, 30.0));
        assert_eq!(to_pixels(area, 0, 0), (-15.0, -50.0));
        assert_eq!(width_pixels(area), 400.0);
    }
}
