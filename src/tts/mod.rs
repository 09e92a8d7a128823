//! Speech synthesis adapter: forwards `speak` requests to ElevenLabs and
//! returns the audio as a `data:` URL.

mod client;

pub use client::{TtsClient, DEFAULT_TTS_MODEL, DEFAULT_VOICE_ID};
