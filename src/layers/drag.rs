//! Clip drag editing
//!
//! A drag session captures the clip's placement and the pointer position
//! when the gesture starts; every pointer move recomputes the placement from
//! those start values so the edit never accumulates rounding drift. Release
//! commits, cancel restores the start values.

use tracing::debug;

use super::layer::{Layer, MIN_CLIP_DURATION};

/// What a drag gesture edits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    /// Move the whole clip along the timeline
    Move,
    /// Drag the left handle: offset and trim start move together
    TrimStart,
    /// Drag the right handle: trim end only
    TrimEnd,
}

/// Clip placement captured when a drag starts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub offset: f64,
    pub trim_start: f64,
    pub trim_end: f64,
}

impl Placement {
    pub fn of(layer: &Layer) -> Self {
        Self {
            offset: layer.offset,
            trim_start: layer.trim_start,
            trim_end: layer.trim_end,
        }
    }

    fn apply(&self, layer: &mut Layer) {
        layer.offset = self.offset;
        layer.trim_start = self.trim_start;
        layer.trim_end = self.trim_end;
    }
}

/// Placement after moving the clip by `dt` seconds
pub fn moved(start: Placement, dt: f64) -> Placement {
    Placement {
        offset: (start.offset + dt).max(0.0),
        ..start
    }
}

/// Placement after dragging the left handle by `dt` seconds
///
/// The clip's audible content stays anchored to the timeline: offset and
/// trim start shift together, limited so the trim stays in
/// `[0, source - trim_end - MIN_CLIP_DURATION]` and the offset stays >= 0.
pub fn trimmed_start(start: Placement, dt: f64, source_duration: f64) -> Placement {
    let max_trim_start = (source_duration - start.trim_end - MIN_CLIP_DURATION).max(0.0);
    let lo = -start.trim_start;
    let hi = (max_trim_start - start.trim_start).max(lo);
    let dt = dt.clamp(lo, hi).max(-start.offset);
    Placement {
        offset: start.offset + dt,
        trim_start: start.trim_start + dt,
        ..start
    }
}

/// Placement after dragging the right handle by `dt` seconds
pub fn trimmed_end(start: Placement, dt: f64, source_duration: f64) -> Placement {
    let max_trim_end = (source_duration - start.trim_start - MIN_CLIP_DURATION).max(0.0);
    Placement {
        trim_end: (start.trim_end - dt).clamp(0.0, max_trim_end),
        ..start
    }
}

/// Drag gesture state
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragSession {
    #[default]
    Idle,
    Dragging {
        layer_id: String,
        kind: DragKind,
        start: Placement,
        start_pointer_px: f64,
    },
}

impl DragSession {
    pub fn new() -> Self {
        Self::Idle
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self, DragSession::Dragging { .. })
    }

    /// Start a gesture on `layer` at pointer position `pointer_px`
    ///
    /// A gesture already in progress is replaced.
    pub fn begin(&mut self, layer: &Layer, kind: DragKind, pointer_px: f64) {
        debug!(layer_id = %layer.id, ?kind, "drag begin");
        *self = DragSession::Dragging {
            layer_id: layer.id.clone(),
            kind,
            start: Placement::of(layer),
            start_pointer_px: pointer_px,
        };
    }

    /// Apply a pointer move to `layer`
    ///
    /// Returns false when idle or when `layer` is not the dragged clip.
    pub fn update(&self, layer: &mut Layer, pointer_px: f64, px_per_sec: f64) -> bool {
        let (layer_id, kind, start, start_pointer_px) = match self {
            DragSession::Dragging {
                layer_id,
                kind,
                start,
                start_pointer_px,
            } => (layer_id, *kind, *start, *start_pointer_px),
            DragSession::Idle => return false,
        };
        if *layer_id != layer.id || !px_per_sec.is_finite() || px_per_sec <= 0.0 {
            return false;
        }

        let dt = (pointer_px - start_pointer_px) / px_per_sec;
        if !dt.is_finite() {
            return false;
        }
        let next = match kind {
            DragKind::Move => moved(start, dt),
            DragKind::TrimStart => trimmed_start(start, dt, layer.source_duration()),
            DragKind::TrimEnd => trimmed_end(start, dt, layer.source_duration()),
        };
        next.apply(layer);
        true
    }

    /// Finish the gesture, keeping the edit
    ///
    /// Returns the edited layer's id so the caller can schedule a save.
    pub fn commit(&mut self) -> Option<String> {
        match std::mem::take(self) {
            DragSession::Dragging { layer_id, .. } => {
                debug!(layer_id = %layer_id, "drag commit");
                Some(layer_id)
            }
            DragSession::Idle => None,
        }
    }

    /// Abort the gesture and restore the start placement
    pub fn cancel(&mut self, layer: &mut Layer) {
        if let DragSession::Dragging {
            layer_id, start, ..
        } = std::mem::take(self)
        {
            if layer_id == layer.id {
                start.apply(layer);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::buffer::{AudioBuffer, ChannelLayout};
    use approx::assert_abs_diff_eq;
    use std::sync::Arc;

    fn layer() -> Layer {
        let source = AudioBuffer::with_sample_rate(1000, ChannelLayout::Mono, 100);
        let mut layer = Layer::new("clip", Arc::new(source), Arc::from(Vec::new()));
        layer.offset = 3.0;
        layer.trim_start = 2.0;
        layer.trim_end = 1.0;
        layer
    }

    #[test]
    fn test_move_clamps_at_zero() {
        let mut l = layer();
        let mut drag = DragSession::new();
        drag.begin(&l, DragKind::Move, 500.0);
        assert!(drag.update(&mut l, 600.0, 100.0));
        assert_abs_diff_eq!(l.offset, 4.0, epsilon = 1e-12);
        assert!(drag.update(&mut l, 0.0, 100.0));
        assert_eq!(l.offset, 0.0);
        assert_eq!(drag.commit(), Some(l.id.clone()));
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_left_trim_moves_offset_and_trim_together() {
        let start = Placement {
            offset: 3.0,
            trim_start: 2.0,
            trim_end: 1.0,
        };
        let p = trimmed_start(start, 1.5, 10.0);
        assert_abs_diff_eq!(p.offset, 4.5, epsilon = 1e-12);
        assert_abs_diff_eq!(p.trim_start, 3.5, epsilon = 1e-12);

        // cannot reveal more than the source start
        let p = trimmed_start(start, -5.0, 10.0);
        assert_eq!(p.trim_start, 0.0);
        assert_eq!(p.offset, 1.0);

        // cannot trim past the minimum clip length
        let p = trimmed_start(start, 20.0, 10.0);
        assert_abs_diff_eq!(p.trim_start, 10.0 - 1.0 - MIN_CLIP_DURATION, epsilon = 1e-12);
    }

    #[test]
    fn test_left_trim_cannot_push_offset_negative() {
        let start = Placement {
            offset: 0.5,
            trim_start: 2.0,
            trim_end: 0.0,
        };
        let p = trimmed_start(start, -2.0, 10.0);
        assert_eq!(p.offset, 0.0);
        assert_abs_diff_eq!(p.trim_start, 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_right_trim_bounds() {
        let start = Placement {
            offset: 3.0,
            trim_start: 2.0,
            trim_end: 1.0,
        };
        assert_eq!(trimmed_end(start, 5.0, 10.0).trim_end, 0.0);
        assert_abs_diff_eq!(
            trimmed_end(start, -50.0, 10.0).trim_end,
            10.0 - 2.0 - MIN_CLIP_DURATION,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(trimmed_end(start, -0.5, 10.0).trim_end, 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_cancel_restores_start() {
        let mut l = layer();
        let mut drag = DragSession::new();
        drag.begin(&l, DragKind::TrimEnd, 100.0);
        drag.update(&mut l, 50.0, 100.0);
        assert_abs_diff_eq!(l.trim_end, 1.5, epsilon = 1e-12);
        drag.cancel(&mut l);
        assert_eq!(l.trim_end, 1.0);
        assert!(!drag.is_dragging());
    }

    #[test]
    fn test_update_ignores_other_layers() {
        let mut a = layer();
        let mut b = layer();
        let mut drag = DragSession::new();
        drag.begin(&a, DragKind::Move, 0.0);
        assert!(!drag.update(&mut b, 100.0, 100.0));
        assert!(drag.update(&mut a, 100.0, 100.0));
        assert!(!DragSession::Idle.update(&mut a, 100.0, 100.0));
    }
}
