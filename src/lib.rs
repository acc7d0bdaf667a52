//! intake-bot — single-session Telegram intake questionnaire.

pub mod channels;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod intake;
pub mod ops;
pub mod sink;
