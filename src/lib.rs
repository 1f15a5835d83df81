pub mod catalog;
pub mod config;
pub mod domain;
pub mod download;
pub mod error;
pub mod output;
pub mod pacing;
pub mod pipeline;
pub mod sanitize;
pub mod species_state;
pub mod spectrogram;
pub mod store;
