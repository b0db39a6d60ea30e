use crate::domain::ports::StopSignal;
use crate::utils::error::Result;

/// Placeholder watch shared by the AWS backends: neither service offers a
/// change feed here, so this only parks the caller until it is stopped.
pub async fn wait_for_stop(prefix: &str, wait_index: u64, stop: StopSignal) -> Result<u64> {
    tracing::debug!(
        "Watch on prefix '{}' (wait_index={}) is a no-op, waiting for stop",
        prefix,
        wait_index
    );

    // 發送端被丟棄時也視為停止
    let _ = stop.await;

    tracing::debug!("Watch on prefix '{}' stopped", prefix);
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_blocks_until_stopped() {
        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(async move { wait_for_stop("/app", 7, rx).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        tx.send(()).unwrap();
        let index = handle.await.unwrap().unwrap();
        assert_eq!(index, 0);
    }

    #[tokio::test]
    async fn test_does_not_time_out_on_its_own() {
        let (_tx, rx) = oneshot::channel::<()>();
        let result = tokio::time::timeout(Duration::from_millis(100), wait_for_stop("/app", 0, rx)).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_pending_until_signalled() {
        let (tx, rx) = oneshot::channel();
        let mut watch = tokio_test::task::spawn(wait_for_stop("/app", 1, rx));

        tokio_test::assert_pending!(watch.poll());
        tokio_test::assert_pending!(watch.poll());

        tx.send(()).unwrap();
        assert!(watch.is_woken());
        assert_eq!(tokio_test::assert_ready_ok!(watch.poll()), 0);
    }

    #[tokio::test]
    async fn test_dropped_sender_counts_as_stop() {
        let (tx, rx) = oneshot::channel::<()>();
        drop(tx);
        assert_eq!(wait_for_stop("/app", 3, rx).await.unwrap(), 0);
    }
}
