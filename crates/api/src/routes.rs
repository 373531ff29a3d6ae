pub mod auth;
pub mod rooms;
pub mod transcripts;
pub mod votes;
