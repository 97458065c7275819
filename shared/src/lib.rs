//! Core of the craft-assist backend: upstream clients, the tolerant
//! model-output pipeline and the use cases the HTTP service exposes.

pub mod analysis;
pub mod config;
pub mod dto;
pub mod error;
pub mod gemini_client;
pub mod json_relaxed;
pub mod json_repair;
pub mod messaging;
pub mod openai_client;
pub mod pipeline;
pub mod prompts;
pub mod schema;
pub mod speech_client;
pub mod transcription;
pub mod upstream;
pub mod vision_client;
pub mod whatsapp_client;
