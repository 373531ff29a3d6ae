mod client;
mod error;
mod worker;

pub use client::{LibreTranslateClient, MtClient};
pub use error::MtError;
pub use worker::TranslationWorker;
