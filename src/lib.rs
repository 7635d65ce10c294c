//! Activity tracker that decides, every second, whether what's on screen is productive and keeps a
//! running total of productive and overall time.
//!
//! A daemon samples the foreground window, answers right away from a category catalog and a cache,
//! and corrects itself once a slower classifier, backed by a remote zero-shot model and optional
//! OCR, has had a look. The cli starts, stops and inspects it.

pub mod accounting;
pub mod catalog;
pub mod classify;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod storage;
pub mod utils;
pub mod window_api;
