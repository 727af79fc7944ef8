mod add;
mod auth;

pub use add::cmd_add;
pub use auth::cmd_auth;
