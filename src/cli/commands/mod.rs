mod add;
mod auth;
mod export;
mod links;
mod list;
mod remove;
mod show;
mod stats;
mod update;

pub use add::cmd_add_anime;
pub use auth::{cmd_login, cmd_logout, cmd_reset_password, cmd_signup};
pub use export::cmd_export;
pub use links::{cmd_add_links, parse_link_arg};
pub use list::cmd_list_anime;
pub use remove::cmd_remove_anime;
pub use show::cmd_show_anime;
pub use stats::cmd_stats;
pub use update::cmd_update_anime;
