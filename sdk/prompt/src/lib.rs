pub mod builder;
pub mod directives;
pub mod llm;

pub use builder::PromptBuilder;
pub use directives::{dispatch, parse_reply, Directive, ParsedReply};
pub use llm::{ChatCompletionProvider, StaticProvider};
