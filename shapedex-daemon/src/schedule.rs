//! Cron-driven sync scheduling.

use crate::bootstrap::BootError;
use chrono::Utc;
use cron::Schedule;
use shapedex_sync::Synchronizer;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

/// Parse a cron expression, accepting the conventional five-field form by
/// pinning the seconds field to zero.
pub fn parse_cron(expression: &str) -> Result<Schedule, cron::error::Error> {
    let normalized = if expression.split_whitespace().count() == 5 {
        format!("0 {}", expression)
    } else {
        expression.to_string()
    };
    Schedule::from_str(&normalized)
}

/// Spawn the scheduled sync task for a non-empty cron expression.
pub fn spawn_scheduled_sync(
    synchronizer: Arc<Synchronizer>,
    expression: &str,
) -> Result<tokio::task::JoinHandle<()>, BootError> {
    let schedule = parse_cron(expression)?;
    info!(cron = expression, "started scheduled profile sync");
    Ok(tokio::spawn(async move {
        loop {
            let Some(next) = schedule.upcoming(Utc).next() else {
                break;
            };
            let wait = (next - Utc::now()).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;
            synchronizer.synchronize().await;
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_field_expressions_are_accepted() {
        let schedule = parse_cron("*/5 * * * *").unwrap();
        assert!(schedule.upcoming(Utc).next().is_some());
    }

    #[test]
    fn six_field_expressions_pass_through() {
        assert!(parse_cron("0 0 3 * * *").is_ok());
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_cron("every full moon").is_err());
    }
}
