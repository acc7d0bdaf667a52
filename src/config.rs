//! Configuration types.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default questionnaire, asked in order to every user.
pub const DEFAULT_QUESTIONS: [&str; 4] = [
    "what is your name?",
    "your Department?",
    "your phone number?",
    "about the bot?",
];

/// Default path for the append-only record log.
pub const DEFAULT_CSV_PATH: &str = "scoreplus_users.csv";

/// Bot configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Telegram bot token.
    pub bot_token: SecretString,
    /// Fixed question sequence, shared read-only by all sessions.
    pub questions: Vec<String>,
    /// Path of the CSV record log.
    pub csv_path: String,
    /// Optional chat id to notify when the bot starts polling.
    pub owner_chat_id: Option<String>,
    /// Whether to clear any registered webhook on startup.
    pub auto_clear_webhook: bool,
}

impl BotConfig {
    /// Build the configuration from environment variables.
    ///
    /// `TELEGRAM_BOT_TOKEN` is required; everything else has a default.
    /// Questions come from `INTAKE_QUESTIONS` (`;`-separated) when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .map_err(|_| ConfigError::MissingEnvVar("TELEGRAM_BOT_TOKEN".into()))?;

        let questions: Vec<String> = match std::env::var("INTAKE_QUESTIONS") {
            Ok(raw) => raw
                .split(';')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => DEFAULT_QUESTIONS.iter().map(|q| q.to_string()).collect(),
        };
        if questions.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "INTAKE_QUESTIONS".into(),
                message: "question list must not be empty".into(),
            });
        }

        let csv_path =
            std::env::var("INTAKE_CSV_PATH").unwrap_or_else(|_| DEFAULT_CSV_PATH.to_string());

        let owner_chat_id = std::env::var("OWNER_CHAT_ID")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let auto_clear_webhook = std::env::var("AUTO_CLEAR_WEBHOOK")
            .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(true);

        Ok(Self {
            bot_token: SecretString::from(bot_token),
            questions,
            csv_path,
            owner_chat_id,
            auto_clear_webhook,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_questions_are_nonempty() {
        assert_eq!(DEFAULT_QUESTIONS.len(), 4);
        assert!(DEFAULT_QUESTIONS.iter().all(|q| !q.is_empty()));
    }
}
