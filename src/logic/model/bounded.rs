//! Bounded Inference - every collaborator call runs on the blocking pool
//! under a deadline.
//!
//! There is no retry. A call that misses its deadline keeps running on the
//! blocking pool but its result is discarded.

use std::time::Duration;

use super::{InferenceError, InferenceStage};
use crate::logic::error::{DiagnosticError, DiagnosticResult};

pub async fn run_bounded<T, F>(stage: InferenceStage, timeout: Duration, job: F) -> DiagnosticResult<T>
where
    F: FnOnce() -> Result<T, InferenceError> + Send + 'static,
    T: Send + 'static,
{
    let start = std::time::Instant::now();
    let handle = tokio::task::spawn_blocking(job);

    let result = match tokio::time::timeout(timeout, handle).await {
        Err(_) => {
            log::warn!("{} exceeded {} ms", stage, timeout.as_millis());
            return Err(DiagnosticError::InferenceTimeout {
                stage,
                timeout_ms: timeout.as_millis() as u64,
            });
        }
        Ok(Err(join_error)) => {
            return Err(DiagnosticError::InferenceFailed {
                stage,
                reason: format!("inference task aborted: {}", join_error),
            });
        }
        Ok(Ok(result)) => result,
    };

    log::debug!("{} finished in {} ms", stage, start.elapsed().as_millis());

    result.map_err(|e| DiagnosticError::InferenceFailed { stage, reason: e.0 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fast_job_passes_through() {
        let value = run_bounded(InferenceStage::Classification, Duration::from_secs(1), || Ok(7u32))
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_slow_job_times_out() {
        let err = run_bounded(InferenceStage::Detection, Duration::from_millis(20), || {
            std::thread::sleep(Duration::from_millis(200));
            Ok(())
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind(), "INFERENCE_TIMEOUT");
        match err {
            DiagnosticError::InferenceTimeout { stage, timeout_ms } => {
                assert_eq!(stage, InferenceStage::Detection);
                assert_eq!(timeout_ms, 20);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_collaborator_error_is_inference_failed() {
        let err = run_bounded::<(), _>(InferenceStage::Correction, Duration::from_secs(1), || {
            Err(InferenceError("bad tensor".to_string()))
        })
        .await
        .unwrap_err();

        assert_eq!(err.kind(), "INFERENCE_FAILED");
        assert!(err.to_string().contains("bad tensor"));
    }
}
