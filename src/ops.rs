//! Bootstrap/Ops — webhook maintenance and startup reconciliation.
//!
//! A registered webhook blocks getUpdates polling ("Conflict: terminated by
//! other getUpdates request"), so the bot clears it at startup and offers
//! CLI flags to inspect/clear it by hand. None of this touches the
//! conversation core.

use std::io::Write;

use async_trait::async_trait;
use clap::Parser;

use crate::channels::TelegramChannel;
use crate::error::ChannelError;

/// Maximum deleteWebhook attempts during startup reconciliation.
const RECONCILE_MAX_ATTEMPTS: u32 = 3;

/// Initial backoff between reconciliation attempts; doubles each time.
const RECONCILE_BASE_DELAY: std::time::Duration = std::time::Duration::from_secs(1);

/// Confirmation prompt for --clear-webhook.
const CLEAR_PROMPT: &str = "Are you sure you want to delete the webhook? Type 'yes' to confirm: ";

/// Confirmation prompt for --show-and-clear, asked after the info is shown.
const SHOW_AND_CLEAR_PROMPT: &str = "Proceed to delete the webhook? Type 'yes' to confirm: ";

/// The webhook calls ops needs from the platform client.
#[async_trait]
pub trait WebhookOps: Send + Sync {
    /// Fetch the raw getWebhookInfo response body.
    async fn webhook_info(&self) -> Result<String, ChannelError>;

    /// Delete any registered webhook; returns the raw response body.
    async fn delete_webhook(&self) -> Result<String, ChannelError>;
}

#[async_trait]
impl WebhookOps for TelegramChannel {
    async fn webhook_info(&self) -> Result<String, ChannelError> {
        TelegramChannel::webhook_info(self).await
    }

    async fn delete_webhook(&self) -> Result<String, ChannelError> {
        TelegramChannel::delete_webhook(self).await
    }
}

/// Command-line interface. With no flags the bot starts polling.
#[derive(Debug, Parser)]
#[command(name = "intake-bot", about = "Telegram intake questionnaire bot")]
pub struct Cli {
    /// Print getWebhookInfo and exit.
    #[arg(long)]
    pub show_webhook: bool,

    /// Call deleteWebhook and exit (asks for confirmation unless --force-clear).
    #[arg(long)]
    pub clear_webhook: bool,

    /// Show webhook info, then clear it, and exit.
    #[arg(long)]
    pub show_and_clear: bool,

    /// Skip confirmation when clearing the webhook.
    #[arg(long)]
    pub force_clear: bool,
}

impl Cli {
    /// Whether any maintenance flag was given (the bot then exits early).
    pub fn wants_webhook_maintenance(&self) -> bool {
        self.show_webhook || self.clear_webhook || self.show_and_clear
    }
}

/// Execute the requested webhook maintenance and return.
pub async fn run_webhook_maintenance(
    cli: &Cli,
    ops: &dyn WebhookOps,
) -> Result<(), ChannelError> {
    if cli.show_webhook || cli.show_and_clear {
        match ops.webhook_info().await {
            Ok(body) => println!("getWebhookInfo: {body}"),
            Err(e) => {
                eprintln!("Failed to call getWebhookInfo: {e}");
                if cli.show_webhook {
                    return Err(e);
                }
            }
        }
    }

    if cli.clear_webhook || cli.show_and_clear {
        let prompt = if cli.show_and_clear {
            SHOW_AND_CLEAR_PROMPT
        } else {
            CLEAR_PROMPT
        };
        if !cli.force_clear && !confirm(prompt) {
            println!("Aborted deleteWebhook.");
            return Ok(());
        }
        let body = ops.delete_webhook().await?;
        println!("deleteWebhook: {body}");
    }

    Ok(())
}

/// Ask for a literal `yes` on stdin.
fn confirm(prompt: &str) -> bool {
    print!("{prompt}");
    let _ = std::io::stdout().flush();

    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    answer.trim().eq_ignore_ascii_case("yes")
}

/// Startup reconciliation: log the current webhook state, then delete any
/// webhook so polling can take over. Bounded retry with exponential
/// backoff; gives up with a warning after the attempt budget.
pub async fn reconcile_webhook(ops: &dyn WebhookOps) -> Result<(), ChannelError> {
    match ops.webhook_info().await {
        Ok(body) => tracing::info!(response = %body, "getWebhookInfo"),
        Err(e) => tracing::warn!(error = %e, "Failed to call getWebhookInfo"),
    }

    let mut delay = RECONCILE_BASE_DELAY;
    let mut last_err = None;

    for attempt in 1..=RECONCILE_MAX_ATTEMPTS {
        match ops.delete_webhook().await {
            Ok(body) => {
                tracing::info!(attempt, response = %body, "deleteWebhook succeeded");
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(attempt, error = %e, "deleteWebhook attempt failed");
                last_err = Some(e);
            }
        }
        if attempt < RECONCILE_MAX_ATTEMPTS {
            tokio::time::sleep(delay).await;
            delay *= 2;
        }
    }

    tracing::warn!(
        attempts = RECONCILE_MAX_ATTEMPTS,
        "Giving up on webhook reconciliation; polling may conflict with a registered webhook"
    );
    Err(last_err.unwrap_or(ChannelError::WebhookFailed {
        op: "deleteWebhook".into(),
        reason: "no attempts made".into(),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    /// Stub whose deleteWebhook fails until `succeed_on_attempt` (0 = never).
    struct StubWebhookOps {
        info_calls: AtomicU32,
        delete_calls: AtomicU32,
        succeed_on_attempt: u32,
    }

    impl StubWebhookOps {
        fn failing() -> Self {
            Self::succeeding_on(0)
        }

        fn succeeding_on(attempt: u32) -> Self {
            Self {
                info_calls: AtomicU32::new(0),
                delete_calls: AtomicU32::new(0),
                succeed_on_attempt: attempt,
            }
        }
    }

    #[async_trait]
    impl WebhookOps for StubWebhookOps {
        async fn webhook_info(&self) -> Result<String, ChannelError> {
            self.info_calls.fetch_add(1, Ordering::SeqCst);
            Ok(r#"{"ok":true,"result":{"url":""}}"#.to_string())
        }

        async fn delete_webhook(&self) -> Result<String, ChannelError> {
            let attempt = self.delete_calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.succeed_on_attempt != 0 && attempt >= self.succeed_on_attempt {
                Ok(r#"{"ok":true,"result":true}"#.to_string())
            } else {
                Err(ChannelError::WebhookFailed {
                    op: "deleteWebhook".into(),
                    reason: format!("attempt {attempt} refused"),
                })
            }
        }
    }

    #[test]
    fn no_flags_means_normal_startup() {
        let cli = Cli::parse_from(["intake-bot"]);
        assert!(!cli.wants_webhook_maintenance());
        assert!(!cli.force_clear);
    }

    #[test]
    fn show_webhook_flag() {
        let cli = Cli::parse_from(["intake-bot", "--show-webhook"]);
        assert!(cli.show_webhook);
        assert!(cli.wants_webhook_maintenance());
    }

    #[test]
    fn clear_flags_combine_with_force() {
        let cli = Cli::parse_from(["intake-bot", "--show-and-clear", "--force-clear"]);
        assert!(cli.show_and_clear);
        assert!(cli.force_clear);
        assert!(cli.wants_webhook_maintenance());
    }

    #[test]
    fn clear_prompts_are_distinct() {
        // --clear-webhook and --show-and-clear ask differently.
        assert_ne!(CLEAR_PROMPT, SHOW_AND_CLEAR_PROMPT);
        assert!(CLEAR_PROMPT.starts_with("Are you sure you want to delete the webhook?"));
        assert!(SHOW_AND_CLEAR_PROMPT.starts_with("Proceed to delete the webhook?"));
    }

    #[tokio::test(start_paused = true)]
    async fn reconcile_gives_up_after_attempt_budget() {
        let ops = StubWebhookOps::failing();

        let result = reconcile_webhook(&ops).await;

        assert!(matches!(result, Err(ChannelError::WebhookFailed { .. })));
        assert_eq!(ops.delete_calls.load(Ordering::SeqCst), 3);
        assert_eq!(ops.info_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reconcile_stops_retrying_once_delete_succeeds() {
        let ops = StubWebhookOps::succeeding_on(2);

        let result = reconcile_webhook(&ops).await;

        assert!(result.is_ok());
        assert_eq!(ops.delete_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn reconcile_succeeds_first_try_without_sleeping() {
        let ops = StubWebhookOps::succeeding_on(1);

        let start = tokio::time::Instant::now();
        reconcile_webhook(&ops).await.unwrap();

        assert_eq!(ops.delete_calls.load(Ordering::SeqCst), 1);
        assert_eq!(start.elapsed(), std::time::Duration::ZERO);
    }

    #[tokio::test]
    async fn forced_maintenance_clears_without_prompting() {
        let cli = Cli::parse_from(["intake-bot", "--show-and-clear", "--force-clear"]);
        let ops = StubWebhookOps::succeeding_on(1);

        run_webhook_maintenance(&cli, &ops).await.unwrap();

        assert_eq!(ops.info_calls.load(Ordering::SeqCst), 1);
        assert_eq!(ops.delete_calls.load(Ordering::SeqCst), 1);
    }
}
