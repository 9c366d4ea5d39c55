pub mod backend;
pub mod catalog;
pub mod custom;
pub mod engine;

pub use backend::{AudioBackend, TerminalAudio, Tone, Utterance, VoiceInfo};
pub use catalog::{AlertKind, AlertSpec, Priority, VoicePreset};
pub use custom::{CustomAudio, accept_upload};
pub use engine::{AlertEngine, AlertSession, EngineEvent, PlayPath};
