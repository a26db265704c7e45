//! Agent main loop: streams the given files through one upload session.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use drivestream_protocol::{Notification, UploadReply};
use drivestream_transfer::{
    ChannelNotifier, SessionConfig, SessionError, UploadField, UploadSession, UploadSummary,
};
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;

use crate::config::Config;

/// Runs one session over `files` and prints the reply and folder listing.
pub async fn run(config: Config, files: Vec<PathBuf>) -> anyhow::Result<()> {
    let upload_dir = drivestream_file_ops::resolve_upload_dir(&config.upload_dir);
    let upload_dir = drivestream_file_ops::ensure_upload_dir(&upload_dir).await?;

    let (notifier, rx) = ChannelNotifier::channel();
    let pump = tokio::spawn(notification_pump(rx));

    let session_config = SessionConfig {
        upload_dir: upload_dir.clone(),
        subscriber: config.subscriber.clone(),
        message_delay: config.message_delay(),
        max_fields: config.max_fields,
    };
    let mut session = UploadSession::new(session_config, Arc::new(notifier));
    tracing::info!(session = %session.id(), files = files.len(), "session started");

    let cancel = session.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling uploads");
            cancel.cancel();
        }
    });

    let reply = upload_files(session, &files).await;
    // Dropping the session released the last notifier; the pump drains and exits.
    pump.await.context("notification pump panicked")?;

    println!("{}", reply.to_json()?);

    let listing = drivestream_file_ops::file_statuses(&upload_dir, &config.owner).await?;
    println!("{}", serde_json::to_string_pretty(&listing)?);

    if !reply.is_success() {
        anyhow::bail!("upload finished with status {}", reply.status);
    }
    Ok(())
}

/// Feeds every file to the session as one field and waits for all of them.
async fn upload_files(mut session: UploadSession, files: &[PathBuf]) -> UploadReply {
    let mut fields = Vec::with_capacity(files.len());
    for (index, path) in files.iter().enumerate() {
        fields.push(open_field(index, path).await);
    }

    if let Err(e) = session.ingest(futures_util::stream::iter(fields)).await {
        tracing::error!("rejected upload: {e}");
        session.cancel();
        // Let already started pipelines settle before replying.
        match session.await_all().await {
            Ok(summary) | Err(SessionError::PartialFailure(summary)) => log_abandoned(&summary),
            Err(other) => tracing::warn!("cancelled uploads did not settle: {other}"),
        }
        return e.to_reply();
    }

    match session.await_all().await {
        Ok(summary) => summary.to_reply(),
        Err(e) => e.to_reply(),
    }
}

fn log_abandoned(summary: &UploadSummary) {
    for o in &summary.outcomes {
        tracing::warn!(
            session = %summary.session_id,
            field = %o.field_name,
            path = %o.path.display(),
            status = ?o.status,
            error = o.error.as_deref().unwrap_or(""),
            "upload abandoned with rejected request"
        );
    }
}

async fn open_field(index: usize, path: &Path) -> anyhow::Result<UploadField> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("no file name in {}", path.display()))?;
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("cannot open {}", path.display()))?;

    Ok(UploadField::new(
        format!("file{index}"),
        filename,
        ReaderStream::new(file),
    ))
}

/// Drains outbound notifications, standing in for a socket write pump.
async fn notification_pump(mut rx: mpsc::Receiver<Notification>) {
    while let Some(msg) = rx.recv().await {
        match serde_json::to_string(&msg) {
            Ok(json) => tracing::info!(to = %msg.to, "emit {json}"),
            Err(e) => tracing::warn!("cannot encode notification: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &Path) -> Config {
        Config {
            upload_dir: dir.to_string_lossy().into_owned(),
            subscriber: "test".into(),
            message_delay_ms: 0,
            owner: "tester".into(),
            max_fields: None,
        }
    }

    #[tokio::test]
    async fn uploads_local_files() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let a = src.path().join("a.txt");
        std::fs::write(&a, b"alpha").unwrap();

        run(test_config(dst.path()), vec![a]).await.unwrap();

        assert_eq!(std::fs::read(dst.path().join("a.txt")).unwrap(), b"alpha");
    }

    #[tokio::test]
    async fn missing_source_is_reported() {
        let dst = tempfile::tempdir().unwrap();
        let missing = dst.path().join("does-not-exist.bin");

        let config = SessionConfig {
            upload_dir: dst.path().to_path_buf(),
            ..SessionConfig::default()
        };
        let session = UploadSession::new(config, Arc::new(drivestream_transfer::LogNotifier));
        let reply = upload_files(session, &[missing]).await;

        assert_eq!(reply.status, 400);
        assert!(reply.to_json().unwrap().contains("cannot open"));
    }

    #[tokio::test]
    async fn rejected_request_settles_accepted_fields() {
        let src = tempfile::tempdir().unwrap();
        let dst = tempfile::tempdir().unwrap();
        let good = src.path().join("good.txt");
        std::fs::write(&good, b"kept").unwrap();
        let missing = src.path().join("missing.bin");

        let config = SessionConfig {
            upload_dir: dst.path().to_path_buf(),
            ..SessionConfig::default()
        };
        let session = UploadSession::new(config, Arc::new(drivestream_transfer::LogNotifier));
        let reply = upload_files(session, &[good, missing]).await;

        assert_eq!(reply.status, 400);
        // The first field was accepted before the rejection and its file was closed.
        assert!(dst.path().join("good.txt").exists());
        assert!(!dst.path().join("missing.bin").exists());
    }
}
