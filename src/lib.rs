//! subtrans - video subtitle translation workflow
//!
//! Extracts the audio of a video, transcribes it, translates the captions,
//! normalizes their timing for readability and attaches the result to the
//! video. The timing engine in [`timing`] is pure and usable on its own.

pub mod cli;
pub mod config;
pub mod error;
pub mod jobs;
pub mod media;
pub mod segment;
pub mod setup;
pub mod subtitle;
pub mod timing;
pub mod transcribe;
pub mod translate;
pub mod workflow;
