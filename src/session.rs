//! Per-session mutable state: capture history, stacking selection and the
//! last recognition result.
//!
//! Owned by the serving layer. The raster transformations never see this;
//! they are handed plain rasters in the order the session dictates.

use crate::error::AppError;
use image::RgbaImage;
use std::sync::Arc;

/// Most recent captures kept per session
pub const HISTORY_LIMIT: usize = 5;

/// One capture in the session history
#[derive(Clone)]
pub struct Capture {
    pub id: u64,
    pub image: Arc<RgbaImage>,
}

#[derive(Default)]
pub struct Session {
    history: Vec<Capture>,
    selection: Vec<u64>,
    last_text: Option<String>,
    next_id: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend a capture, trimming the history to [`HISTORY_LIMIT`].
    /// Evicted entries are also dropped from the stacking selection.
    pub fn push(&mut self, image: RgbaImage) -> Capture {
        self.next_id += 1;
        let capture = Capture {
            id: self.next_id,
            image: Arc::new(image),
        };
        self.history.insert(0, capture.clone());
        if self.history.len() > HISTORY_LIMIT {
            for evicted in self.history.drain(HISTORY_LIMIT..) {
                self.selection.retain(|id| *id != evicted.id);
            }
        }
        capture
    }

    /// History entries, most recent first
    pub fn history(&self) -> &[Capture] {
        &self.history
    }

    pub fn get(&self, id: u64) -> Option<&Capture> {
        self.history.iter().find(|capture| capture.id == id)
    }

    /// Toggle a history entry in the stacking selection. The selection keeps
    /// toggle order; the stacker receives images in exactly this order.
    pub fn toggle_selection(&mut self, id: u64) -> Result<&[u64], AppError> {
        if self.get(id).is_none() {
            return Err(AppError::HistoryEntryNotFound(id));
        }
        if let Some(position) = self.selection.iter().position(|selected| *selected == id) {
            self.selection.remove(position);
        } else {
            self.selection.push(id);
        }
        Ok(&self.selection)
    }

    pub fn selection(&self) -> &[u64] {
        &self.selection
    }

    /// Images for the pending stack, in selection order
    pub fn selected_images(&self) -> Vec<Arc<RgbaImage>> {
        self.selection
            .iter()
            .filter_map(|id| self.get(*id).map(|capture| capture.image.clone()))
            .collect()
    }

    /// Called after a successful stack; a failed stack leaves the selection
    /// for the user to retry
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn last_text(&self) -> Option<&str> {
        self.last_text.as_deref()
    }

    /// Record a successful recognition. Failed recognitions must not call
    /// this, so the previous result stays visible.
    pub fn set_last_text(&mut self, text: String) {
        self.last_text = Some(text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn raster(value: u8) -> RgbaImage {
        RgbaImage::from_pixel(4, 4, Rgba([value, value, value, 255]))
    }

    #[test]
    fn test_history_is_most_recent_first() {
        let mut session = Session::new();
        let first = session.push(raster(1));
        let second = session.push(raster(2));

        let ids: Vec<u64> = session.history().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut session = Session::new();
        for value in 0..8 {
            session.push(raster(value));
        }

        assert_eq!(session.history().len(), HISTORY_LIMIT);
        // The oldest three are gone; the newest survives at the front
        assert_eq!(session.history()[0].id, 8);
        assert_eq!(session.history()[HISTORY_LIMIT - 1].id, 4);
    }

    #[test]
    fn test_eviction_prunes_selection() {
        let mut session = Session::new();
        let oldest = session.push(raster(0));
        session.toggle_selection(oldest.id).unwrap();

        for value in 1..=HISTORY_LIMIT as u8 {
            session.push(raster(value));
        }

        assert!(session.get(oldest.id).is_none());
        assert!(session.selection().is_empty());
    }

    #[test]
    fn test_selection_keeps_toggle_order() {
        let mut session = Session::new();
        let a = session.push(raster(1));
        let b = session.push(raster(2));
        let c = session.push(raster(3));

        session.toggle_selection(c.id).unwrap();
        session.toggle_selection(a.id).unwrap();
        session.toggle_selection(b.id).unwrap();

        assert_eq!(session.selection(), &[c.id, a.id, b.id]);

        // Toggling again removes without disturbing the rest
        session.toggle_selection(a.id).unwrap();
        assert_eq!(session.selection(), &[c.id, b.id]);
    }

    #[test]
    fn test_toggle_unknown_id_fails() {
        let mut session = Session::new();
        assert!(matches!(
            session.toggle_selection(42),
            Err(AppError::HistoryEntryNotFound(42))
        ));
    }

    #[test]
    fn test_selected_images_follow_selection_order() {
        let mut session = Session::new();
        let a = session.push(raster(10));
        let b = session.push(raster(20));

        session.toggle_selection(b.id).unwrap();
        session.toggle_selection(a.id).unwrap();

        let images = session.selected_images();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].get_pixel(0, 0).0[0], 20);
        assert_eq!(images[1].get_pixel(0, 0).0[0], 10);
    }

    #[test]
    fn test_clear_selection() {
        let mut session = Session::new();
        let a = session.push(raster(1));
        session.toggle_selection(a.id).unwrap();

        session.clear_selection();
        assert!(session.selection().is_empty());
        // History itself is untouched
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_last_text_replaced_only_when_set() {
        let mut session = Session::new();
        assert!(session.last_text().is_none());

        session.set_last_text("first result".to_string());
        assert_eq!(session.last_text(), Some("first result"));

        // A failed recognition never calls set_last_text; the old value stays
        assert_eq!(session.last_text(), Some("first result"));
    }
}
