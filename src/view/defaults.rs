//! Default sizes and settings for views (all in user units)

/// Distance of the link tools from the source end.
pub const LINK_TOOLS_OFFSET: f64 = 40.0;
/// Distance of the second tool set from the target end.
pub const DOUBLE_LINK_TOOLS_OFFSET: f64 = 60.0;
/// Links shorter than this get half-size tools at half the offset.
pub const SHORT_LINK_LENGTH: f64 = 100.0;
/// The second tool set is only drawn on links longer than this.
pub const LONG_LINK_LENGTH: f64 = 160.0;
pub const SHORT_LINK_TOOLS_SCALE: f64 = 0.5;

/// Arrowhead pointing at the path origin; its bbox is 10×10.
pub const MARKER_MARKUP: &str = "M 10 0 L 0 5 L 10 10 z";
pub const VERTEX_RADIUS: f64 = 10.0;
pub const PORT_RADIUS: f64 = 5.0;
pub const TOOL_RADIUS: f64 = 11.0;

/// Approximate glyph advance, as a fraction of the font size, for text
/// bounding boxes.
pub const CHAR_WIDTH: f64 = 0.6;
pub const FONT_SIZE: f64 = 14.0;

/// Upper bound on update passes per `Paper::update` call.
pub const MAX_UPDATE_PASSES: usize = 8;
/// Frame length for transitions, in milliseconds.
pub const FRAME_MS: f64 = 1000.0 / 60.0;
