pub mod logger;
pub mod redact;

pub use logger::{init_console_logger, init_logger};
pub use redact::{mask_key, redact};
