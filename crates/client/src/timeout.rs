//! Bounded waits around network calls

use std::future::Future;
use std::time::Duration;

use apiprobe_common::{Error, Result};

/// Run `fut`, turning expiry of `limit` into `Error::Timeout`
pub async fn within<T, F>(limit: Duration, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(Error::Timeout {
            operation: operation.to_string(),
            millis: limit.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_expiry_is_timeout() {
        let result: Result<()> = within(Duration::from_millis(10), "slow", async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        })
        .await;

        match result {
            Err(Error::Timeout { operation, millis }) => {
                assert_eq!(operation, "slow");
                assert_eq!(millis, 10);
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_inner_result_passes_through() {
        let ok = within(Duration::from_secs(1), "fast", async { Ok(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err: Result<()> = within(Duration::from_secs(1), "fast", async {
            Err(Error::InvalidConfig("x".to_string()))
        })
        .await;
        assert!(matches!(err, Err(Error::InvalidConfig(_))));
    }
}
