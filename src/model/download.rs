//! Weight download with progress reporting.

use std::path::Path;

use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;

use super::ProgressCallback;

/// Download `url` to `dest`, reporting progress as a fraction of the
/// advertised content length. Uses atomic write (tmp + rename).
pub async fn download_file(
    client: &Client,
    url: &str,
    dest: &Path,
    on_progress: &ProgressCallback,
) -> Result<()> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("HTTP request failed for {url}"))?;

    anyhow::ensure!(
        response.status().is_success(),
        "download failed with HTTP {}",
        response.status()
    );

    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let total_size = response.content_length().filter(|size| *size > 0);
    let tmp_path = dest.with_extension("part");

    tracing::info!(url, dest = %dest.display(), total_bytes = ?total_size, "downloading model weights");
    on_progress(0.0);

    let received = match write_body(response, &tmp_path, total_size, on_progress).await {
        Ok(received) => received,
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
                tracing::debug!(path = %tmp_path.display(), error = %cleanup, "no partial file to remove");
            }
            return Err(e);
        }
    };

    tokio::fs::rename(&tmp_path, dest)
        .await
        .context("failed to rename temp file")?;

    on_progress(1.0);
    tracing::info!(dest = %dest.display(), bytes = received, "model weights saved");
    Ok(())
}

/// Stream the response body into `tmp_path`, returning the bytes written.
async fn write_body(
    response: reqwest::Response,
    tmp_path: &Path,
    total_size: Option<u64>,
    on_progress: &ProgressCallback,
) -> Result<u64> {
    let mut file = tokio::fs::File::create(tmp_path)
        .await
        .with_context(|| format!("failed to create temp file: {}", tmp_path.display()))?;

    let mut received: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("error reading response")?;
        file.write_all(&chunk)
            .await
            .context("error writing to file")?;
        received += chunk.len() as u64;
        if let Some(total) = total_size {
            on_progress(fraction(received, total));
        }
    }

    file.flush().await?;
    Ok(received)
}

fn fraction(received: u64, total: u64) -> f32 {
    (received as f64 / total as f64).clamp(0.0, 1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::model::test_server::serve_once;

    fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<f32>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: ProgressCallback = Arc::new(move |p: f32| sink.lock().unwrap().push(p));
        (callback, seen)
    }

    #[tokio::test]
    async fn slow_download_completes_and_reports_progress() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dest = tmp.path().join("weights").join("model.gguf");
        let parts = (0..3)
            .map(|_| (Duration::from_millis(400), vec![7u8; 10]))
            .collect();
        let url = serve_once("HTTP/1.1 200 OK\r\ncontent-length: 30\r\n\r\n", parts).await;
        let client = Client::builder()
            .read_timeout(Duration::from_secs(1))
            .build()
            .unwrap();
        let (on_progress, seen) = recorder();

        download_file(&client, &url, &dest, &on_progress).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap().len(), 30);
        assert!(!dest.with_extension("part").exists());
        assert_eq!(seen.lock().unwrap().last().copied(), Some(1.0));
    }

    #[tokio::test]
    async fn truncated_download_leaves_no_partial_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dest = tmp.path().join("model.gguf");
        let url = serve_once(
            "HTTP/1.1 200 OK\r\ncontent-length: 100\r\nconnection: close\r\n\r\n",
            vec![(Duration::ZERO, vec![1u8; 10])],
        )
        .await;
        let (on_progress, _) = recorder();

        let result = download_file(&Client::new(), &url, &dest, &on_progress).await;

        assert!(result.is_err());
        assert!(!dest.exists());
        assert!(!dest.with_extension("part").exists());
    }

    #[test]
    fn fraction_is_clamped() {
        assert_eq!(fraction(0, 100), 0.0);
        assert!((fraction(50, 100) - 0.5).abs() < f32::EPSILON);
        assert_eq!(fraction(150, 100), 1.0);
    }
}
