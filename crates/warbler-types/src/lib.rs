pub mod api;
pub mod models;

/// Maximum length of a message body, in characters.
pub const MAX_MESSAGE_LEN: usize = 140;

pub const DEFAULT_IMAGE_URL: &str = "/static/images/default-pic.png";
pub const DEFAULT_HEADER_IMAGE_URL: &str = "/static/images/warbler-hero.jpg";
