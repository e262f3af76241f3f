pub mod shell;
pub mod store;
pub mod style;

pub use shell::{Bubble, Shell};
pub use store::{StatePatch, Store, UiConfig, UiState};
pub use style::SHELL_CSS;
