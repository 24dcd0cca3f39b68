pub mod app;
pub mod audio;
pub mod engine;
pub mod persistence;
pub mod state;

pub use app::{BriefingResult, Newscast};
