use reqwest::{Client, StatusCode, Url};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use tempfile::TempPath;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const FALLBACK_FILE_NAME: &str = "installer";

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("download failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("server responded with {0}")]
    Status(StatusCode),
    #[error("could not write installer file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not start {}: {source}", .path.display())]
    Launch {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("installer exited with {0}")]
    Exit(ExitStatus),
    #[error("installer task stopped unexpectedly")]
    WorkerGone,
}

/// Progress reported by the worker. `Finished` is always the last event.
#[derive(Debug)]
pub enum InstallEvent {
    Downloading { url: String },
    Running { path: PathBuf },
    Finished(Result<(), InstallError>),
}

/// Streams `url` into a fresh temp file that keeps the download's extension.
/// The file is removed when the returned path is dropped or closed.
pub async fn download_to_temp(client: &Client, url: &str) -> Result<TempPath, InstallError> {
    let mut response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(InstallError::Status(status));
    }

    let (prefix, suffix) = temp_name_parts(url);
    let (file, path) = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(&suffix)
        .tempfile()?
        .into_parts();

    let mut file = tokio::fs::File::from_std(file);
    let mut written: u64 = 0;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    // The handle must be closed before the file can be executed.
    let file = file.into_std().await;
    file.sync_all()?;
    drop(file);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
    }

    tracing::info!("Downloaded {} bytes to {}", written, path.display());
    Ok(path)
}

/// Runs the downloaded file and waits for it. A non-zero exit is a failure.
pub async fn run_installer(path: &Path) -> Result<(), InstallError> {
    tracing::info!("Running {}", path.display());

    let status = tokio::process::Command::new(path)
        .status()
        .await
        .map_err(|source| InstallError::Launch {
            path: path.to_path_buf(),
            source,
        })?;

    if status.success() {
        Ok(())
    } else {
        Err(InstallError::Exit(status))
    }
}

/// Worker body: download, run, delete, then report `Finished`.
pub async fn install(client: Client, url: String, events: mpsc::UnboundedSender<InstallEvent>) {
    let result = download_and_run(&client, &url, &events).await;

    match &result {
        Ok(()) => tracing::info!("Installer finished successfully"),
        Err(e) => tracing::warn!("Install attempt failed: {}", e),
    }

    // The interface may already be gone; nothing left to report to.
    let _ = events.send(InstallEvent::Finished(result));
}

async fn download_and_run(
    client: &Client,
    url: &str,
    events: &mpsc::UnboundedSender<InstallEvent>,
) -> Result<(), InstallError> {
    let _ = events.send(InstallEvent::Downloading {
        url: url.to_string(),
    });
    let path = download_to_temp(client, url).await?;

    let _ = events.send(InstallEvent::Running {
        path: path.to_path_buf(),
    });
    let result = run_installer(&path).await;

    if let Err(e) = path.close() {
        tracing::debug!("Could not remove downloaded installer: {}", e);
    }

    result
}

/// Starts the one background worker for an install attempt.
pub fn spawn_install(client: Client, url: String) -> (JoinHandle<()>, mpsc::UnboundedReceiver<InstallEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(install(client, url, tx));
    (handle, rx)
}

/// Splits the URL's last path segment into a temp-file prefix and suffix,
/// e.g. `Setup.exe` becomes `("Setup-", ".exe")`.
fn temp_name_parts(url: &str) -> (String, String) {
    let name = Url::parse(url)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .map(|segment| {
            segment
                .chars()
                .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
                .collect::<String>()
        })
        .filter(|name| !name.trim_matches('.').is_empty())
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string());

    match name.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() => {
            // A bare `.exe` keeps its extension and must not become a hidden file.
            let stem = match stem.trim_start_matches('.') {
                "" => FALLBACK_FILE_NAME,
                stem => stem,
            };
            (format!("{}-", stem), format!(".{}", ext))
        }
        _ => (format!("{}-", name.trim_end_matches('.')), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;
    use axum::{http::StatusCode as AxumStatus, routing::get, Router};

    async fn collect(mut rx: mpsc::UnboundedReceiver<InstallEvent>) -> Vec<InstallEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn running_path(events: &[InstallEvent]) -> PathBuf {
        events
            .iter()
            .find_map(|event| match event {
                InstallEvent::Running { path } => Some(path.clone()),
                _ => None,
            })
            .expect("no Running event")
    }

    #[test]
    fn temp_name_keeps_the_extension() {
        assert_eq!(
            temp_name_parts("https://example.org/releases/download/MSS-Setup.exe"),
            ("MSS-Setup-".to_string(), ".exe".to_string())
        );
        assert_eq!(
            temp_name_parts("https://example.org/get/setup.sh?token=abc"),
            ("setup-".to_string(), ".sh".to_string())
        );
        assert_eq!(
            temp_name_parts("https://example.org/"),
            ("installer-".to_string(), String::new())
        );
        assert_eq!(
            temp_name_parts("https://example.org/bin/installer"),
            ("installer-".to_string(), String::new())
        );
        assert_eq!(
            temp_name_parts("https://example.org/dl/.exe"),
            ("installer-".to_string(), ".exe".to_string())
        );
        assert_eq!(
            temp_name_parts("https://example.org/dl/.setup.msi"),
            ("setup-".to_string(), ".msi".to_string())
        );
    }

    #[tokio::test]
    async fn http_errors_fail_the_download() {
        let router = Router::new().route("/setup.exe", get(|| async { AxumStatus::NOT_FOUND }));
        let addr = test_support::serve(router).await;

        let err = download_to_temp(&Client::new(), &format!("http://{}/setup.exe", addr))
            .await
            .unwrap_err();
        assert!(matches!(err, InstallError::Status(s) if s == StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn download_writes_the_body_to_a_temp_file() {
        let router = Router::new().route("/MSS-Setup.exe", get(|| async { "installer bytes" }));
        let addr = test_support::serve(router).await;

        let path = download_to_temp(&Client::new(), &format!("http://{}/MSS-Setup.exe", addr))
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "installer bytes");
        let file_name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(file_name.starts_with("MSS-Setup-"));
        assert!(file_name.ends_with(".exe"));

        let kept = path.to_path_buf();
        drop(path);
        assert!(!kept.exists());
    }

    #[tokio::test]
    async fn unreachable_host_reports_finished_with_error() {
        let (handle, rx) = spawn_install(Client::new(), "http://127.0.0.1:1/setup.exe".to_string());
        let events = collect(rx).await;
        handle.await.unwrap();

        assert!(matches!(events.first(), Some(InstallEvent::Downloading { .. })));
        assert!(!events.iter().any(|e| matches!(e, InstallEvent::Running { .. })));
        assert!(matches!(
            events.last(),
            Some(InstallEvent::Finished(Err(InstallError::Request(_))))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn successful_run_executes_and_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let script = format!("#!/bin/sh\necho done > '{}'\n", marker.display());
        let router = Router::new().route("/setup.sh", get(move || async move { script }));
        let addr = test_support::serve(router).await;

        let (handle, rx) = spawn_install(Client::new(), format!("http://{}/setup.sh", addr));
        let events = collect(rx).await;
        handle.await.unwrap();

        assert!(matches!(events.last(), Some(InstallEvent::Finished(Ok(())))));
        assert!(marker.exists(), "installer script did not run");
        assert!(!running_path(&events).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_a_failure_and_still_cleans_up() {
        let router = Router::new().route("/setup.sh", get(|| async { "#!/bin/sh\nexit 3\n" }));
        let addr = test_support::serve(router).await;

        let (handle, rx) = spawn_install(Client::new(), format!("http://{}/setup.sh", addr));
        let events = collect(rx).await;
        handle.await.unwrap();

        match events.last() {
            Some(InstallEvent::Finished(Err(InstallError::Exit(status)))) => {
                assert_eq!(status.code(), Some(3));
            }
            other => panic!("unexpected final event: {:?}", other),
        }
        assert!(!running_path(&events).exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn launch_failure_is_reported_and_still_cleans_up() {
        let router = Router::new().route(
            "/setup.bin",
            get(|| async { vec![0x00u8, 0x01, 0x02, 0xfe, 0xff, 0x00, 0x13, 0x37] }),
        );
        let addr = test_support::serve(router).await;

        let (handle, rx) = spawn_install(Client::new(), format!("http://{}/setup.bin", addr));
        let events = collect(rx).await;
        handle.await.unwrap();

        match events.last() {
            Some(InstallEvent::Finished(Err(err @ InstallError::Launch { .. }))) => {
                assert!(err.to_string().starts_with("could not start "), "got {}", err);
            }
            other => panic!("unexpected final event: {:?}", other),
        }
        assert!(!running_path(&events).exists());
    }
}
