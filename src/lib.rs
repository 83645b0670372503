//! Pika - a voice assistant that drives a text editor and learns from use
//!
//! Recognized utterances are classified by a priority rule table
//! ([`command`]), dispatched to desktop capabilities ([`desktop`],
//! [`voice`]) and recorded in a persistent [`learning`] state that feeds
//! predictions, time-of-day suggestions and speech-rate adaptation.

pub mod command;
pub mod config;
pub mod desktop;
mod exec;
pub mod fuzzy;
pub mod learning;
pub mod listen;
pub mod session;
pub mod voice;
