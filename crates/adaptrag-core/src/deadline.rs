//! Deadline- and cancellation-aware wrapper for external calls

use crate::error::{DegradedReason, Result, Stage};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Run `fut` for `stage`, giving up after `timeout` or when `cancel` fires.
///
/// Collaborator errors are classified into a [`DegradedReason`] so every
/// stage reports failures the same way.
pub async fn with_deadline<T, F>(
    stage: Stage,
    timeout: Duration,
    cancel: &CancellationToken,
    fut: F,
) -> std::result::Result<T, DegradedReason>
where
    F: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(DegradedReason::Cancelled { stage });
    }

    tokio::select! {
        biased; // Check cancellation first
        _ = cancel.cancelled() => Err(DegradedReason::Cancelled { stage }),
        outcome = tokio::time::timeout(timeout, fut) => match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(DegradedReason::from_error(stage, e)),
            Err(_) => Err(DegradedReason::Timeout {
                stage,
                after_ms: timeout.as_millis() as u64,
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AdaptragError;

    #[tokio::test]
    async fn test_passes_value_through() {
        let cancel = CancellationToken::new();
        let value = with_deadline(Stage::Search, Duration::from_secs(1), &cancel, async {
            Ok::<_, AdaptragError>(7)
        })
        .await;
        assert_eq!(value, Ok(7));
    }

    #[tokio::test]
    async fn test_classifies_errors() {
        let cancel = CancellationToken::new();
        let value: std::result::Result<u32, _> =
            with_deadline(Stage::Rerank, Duration::from_secs(1), &cancel, async {
                Err(AdaptragError::ExternalError("HTTP 503".to_string()))
            })
            .await;
        assert!(matches!(value, Err(DegradedReason::RerankUnavailable(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out() {
        let cancel = CancellationToken::new();
        let value: std::result::Result<u32, _> =
            with_deadline(Stage::Hyde, Duration::from_millis(50), &cancel, async {
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok(1)
            })
            .await;
        assert_eq!(
            value,
            Err(DegradedReason::Timeout {
                stage: Stage::Hyde,
                after_ms: 50
            })
        );
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let value = with_deadline(Stage::Rewrite, Duration::from_secs(1), &cancel, async {
            Ok::<_, AdaptragError>(1)
        })
        .await;
        assert_eq!(value, Err(DegradedReason::Cancelled { stage: Stage::Rewrite }));
    }

    #[tokio::test]
    async fn test_cancelled_in_flight() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let value: std::result::Result<u32, _> =
            with_deadline(Stage::Search, Duration::from_secs(30), &cancel, async {
                tokio::time::sleep(Duration::from_secs(20)).await;
                Ok(1)
            })
            .await;
        assert!(value.unwrap_err().is_cancelled());
    }
}
