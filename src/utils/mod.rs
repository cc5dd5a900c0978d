pub mod config;
pub mod logger;
pub mod settings;
pub mod workspace_env;

pub use config::*;
pub use logger::{Colors, setup_logging};
pub use workspace_env::resolve_workspace_dir;
