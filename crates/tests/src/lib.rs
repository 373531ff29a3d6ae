pub mod fixtures;

#[cfg(test)]
mod auth_tests;
#[cfg(test)]
mod rooms_tests;
#[cfg(test)]
mod transcripts_tests;
#[cfg(test)]
mod votes_tests;
