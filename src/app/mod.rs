mod commands;
mod context;
mod state;

pub use commands::{Command, execute};
pub use context::AppContext;
pub use state::Screen;
