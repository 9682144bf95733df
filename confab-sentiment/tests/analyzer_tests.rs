//! Tests for the local sentiment analyzer's worker discipline.

use confab_sentiment::{
    AnalyzerError, LocalAnalyzerConfig, LocalSentimentAnalyzer, SentimentAnalyzer,
};
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// Bind a local server that accepts connections and never replies.
async fn silent_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else { break };
            tokio::spawn(async move {
                let mut buf = [0u8; 1024];
                while let Ok(n) = socket.read(&mut buf).await {
                    if n == 0 {
                        break;
                    }
                }
            });
        }
    });
    format!("http://{addr}")
}

fn analyzer_against(host: String, request_timeout: Duration) -> LocalSentimentAnalyzer {
    let mut config = LocalAnalyzerConfig::with_host(host, "llama3.2:3b");
    config.request_timeout = request_timeout;
    LocalSentimentAnalyzer::new(config)
}

#[tokio::test]
async fn test_caller_cancellation_leaves_worker_available() {
    let host = silent_backend().await;
    let analyzer = analyzer_against(host, Duration::from_millis(300));

    // First call: backend never replies, caller gives up after 100 ms.
    let cancel = CancellationToken::new();
    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let started = std::time::Instant::now();
    let err = analyzer.analyze(&cancel, "are you there", "Ada").await.err().unwrap();
    assert!(matches!(err, AnalyzerError::Cancelled));
    assert!(started.elapsed() < Duration::from_millis(250), "cancellation was not prompt");

    // Second call: the worker must still be serving. The silent backend
    // forces the per-request timeout, which proves the request ran.
    let cancel = CancellationToken::new();
    let err = analyzer.analyze(&cancel, "still there?", "Ada").await.err().unwrap();
    assert!(matches!(err, AnalyzerError::Backend(_)), "worker did not process a second request");
}

#[tokio::test]
async fn test_empty_text_rejected_before_enqueue() {
    let analyzer = analyzer_against("http://127.0.0.1:9".to_string(), Duration::from_secs(1));
    let cancel = CancellationToken::new();
    let err = analyzer.analyze(&cancel, "   ", "Ada").await.err().unwrap();
    assert!(matches!(err, AnalyzerError::EmptyText));
}

#[tokio::test]
async fn test_submissions_after_close_fail_with_cancellation() {
    let host = silent_backend().await;
    let analyzer = analyzer_against(host, Duration::from_millis(200));

    analyzer.close().await;
    // Give the worker a beat to observe cancellation and close the queue.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let cancel = CancellationToken::new();
    let err = analyzer.analyze(&cancel, "too late", "Ada").await.err().unwrap();
    assert!(matches!(err, AnalyzerError::Cancelled));
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let host = silent_backend().await;
    let analyzer = analyzer_against(host, Duration::from_millis(200));
    analyzer.close().await;
    analyzer.close().await;
}
