/// Host page constants. Pixel values are CSS pixels unless noted otherwise.
pub const CANVAS_ID: &str = "lanyard";

/// Directory that `?config=<name>` overrides are fetched from.
pub const CONFIG_DIR: &str = "lanyard";

pub const ROPE_TEXTURE: &str = "assets/lanyard/lanyard.png";
pub const CARD_FRONT_TEXTURE: &str = "assets/lanyard/card-front.png";
pub const CARD_BACK_TEXTURE: &str = "assets/lanyard/card-back.png";

/// Rope width in line-resolution units; see `canvas::rope_width_px`.
pub const ROPE_WIDTH: f64 = 16.0;
pub const ROPE_FALLBACK_COLOR: &str = "#f4f4f5";
pub const CARD_FALLBACK_FRONT: &str = "#27272a";
pub const CARD_FALLBACK_BACK: &str = "#3f3f46";
pub const CONNECTOR_COLOR: &str = "#a1a1aa";
/// Connector radius in world units at full scale.
pub const CONNECTOR_RADIUS: f32 = 0.12;
