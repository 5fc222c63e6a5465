pub mod auth;
pub mod error;
pub mod flash;
pub mod likes;
pub mod messages;
pub mod middleware;
pub mod render;
pub mod routes;
pub mod users;

pub use auth::{AppState, AppStateInner};
pub use error::WebError;
pub use middleware::{CURR_USER_KEY, CurrentUser};
pub use routes::app;
