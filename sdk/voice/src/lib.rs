pub mod audio;
pub mod engine;
pub mod fallback;
pub mod scheduler;
pub mod session;
pub mod testing;
pub mod tts_ws;
pub mod turn;

pub use engine::SpeechSynth;
pub use fallback::LocalSynth;
pub use scheduler::GaplessScheduler;
pub use session::VoiceSession;
pub use tts_ws::{RemoteTts, TtsTransport, VoiceConfig, WsTransport};
pub use turn::{TurnEvent, TurnTaking, DEFAULT_SILENCE_THRESHOLD};
