//! Per-user questionnaire state machine and its stores.

pub mod echo;
pub mod engine;
pub mod session;

pub use echo::EchoPrefs;
pub use engine::IntakeEngine;
pub use session::{Advance, IntakeSession, SessionStore};
