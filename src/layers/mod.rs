//! Layer Model Module
//!
//! Clips on the shared timeline:
//! - `layer`: one placed clip with trims, gain and effects
//! - `timeline`: clip/project extents and pixel mappings
//! - `zoom`: logarithmic zoom slider mapping
//! - `drag`: move/trim drag sessions
//! - `project`: the layer collection and import

mod drag;
mod layer;
mod project;
mod timeline;
mod zoom;

pub use drag::{moved, trimmed_end, trimmed_start, DragKind, DragSession, Placement};
pub use layer::{Layer, MIN_CLIP_DURATION};
pub use project::{ImportFailure, ImportReport, Project, DEFAULT_PX_PER_SEC};
pub use timeline::{
    clamp_time, clip_duration, clip_width_px, project_duration, px_to_time, time_to_px,
    track_width_px, MIN_CLIP_WIDTH_PX,
};
pub use zoom::{clamp_zoom, slider_from_zoom, zoom_from_slider, ZOOM_MAX, ZOOM_MIN, ZOOM_SLIDER_MAX};
