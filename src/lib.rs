// src/lib.rs

//! Sitewatch: web page change detection.
//!
//! Jobs name a page and a detection mode. Each run fetches every page once,
//! compares it against the state stored by the previous run, stores the new
//! state and raises one alert per detected transition.

pub mod detect;
pub mod error;
pub mod fetch;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod storage;
pub mod utils;

#[cfg(feature = "lambda")]
pub mod lambda;
