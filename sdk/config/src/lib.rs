pub mod env;
pub mod schema;
pub mod validation;

pub use env::apply_env;
pub use schema::SdkConfig;
pub use validation::{validate, ConfigError};
