//! Transcription adapter: decodes a `data:` URL and forwards it to the OpenAI
//! transcription endpoint as multipart form data.

mod client;

pub use client::{SttClient, TRANSCRIPTION_MODEL};
