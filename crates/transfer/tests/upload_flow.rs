//! End-to-end uploads through a session, using real files as sources.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use drivestream_protocol::ProgressPayload;
use drivestream_transfer::{
    ChannelNotifier, SessionConfig, SessionError, TransferStatus, UploadSession,
};
use futures_util::StreamExt;
use tempfile::TempDir;
use tokio_util::io::ReaderStream;

fn sample_data(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

#[tokio::test]
async fn streams_70500_bytes_to_empty_directory() {
    let src_dir = TempDir::new().unwrap();
    let upload_dir = TempDir::new().unwrap();

    let data = sample_data(70_500);
    let src_path = src_dir.path().join("source.bin");
    std::fs::write(&src_path, &data).unwrap();

    let (notifier, mut rx) = ChannelNotifier::channel();
    let config = SessionConfig {
        upload_dir: upload_dir.path().to_path_buf(),
        subscriber: "socket-42".into(),
        message_delay: Duration::ZERO,
        max_fields: None,
    };
    let mut session = UploadSession::new(config, Arc::new(notifier));

    let file = tokio::fs::File::open(&src_path).await.unwrap();
    // Small reads so the upload spans many chunks.
    let source = ReaderStream::with_capacity(file, 4096);
    session.accept("file", source, "video.mp4").unwrap();

    let summary = session.await_all().await.unwrap();
    assert_eq!(summary.total_bytes(), 70_500);

    let entries: Vec<_> = std::fs::read_dir(upload_dir.path()).unwrap().collect();
    assert_eq!(entries.len(), 1);

    let written = std::fs::read(upload_dir.path().join("video.mp4")).unwrap();
    assert_eq!(written.len(), 70_500);
    assert_eq!(written, data);

    // Progress is cumulative and ends at the full size.
    let mut last = 0;
    while let Ok(msg) = rx.try_recv() {
        let p: ProgressPayload = msg.parse_payload().unwrap();
        assert_eq!(p.filename, "video.mp4");
        assert!(p.processed_already > last);
        last = p.processed_already;
    }
    assert_eq!(last, 70_500);
}

#[tokio::test]
async fn failing_field_does_not_stop_sibling() {
    let upload_dir = TempDir::new().unwrap();
    let config = SessionConfig {
        upload_dir: upload_dir.path().to_path_buf(),
        subscriber: "socket-01".into(),
        ..SessionConfig::default()
    };
    let (notifier, _rx) = ChannelNotifier::channel();
    let mut session = UploadSession::new(config, Arc::new(notifier));

    let good_data = sample_data(10_000);
    let good = futures_util::stream::iter(
        good_data
            .chunks(1000)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect::<Vec<io::Result<Bytes>>>(),
    );
    let broken = futures_util::stream::iter(vec![
        Ok(Bytes::from_static(b"partial ")),
        Err(io::Error::new(io::ErrorKind::ConnectionAborted, "client went away")),
    ]);

    let mut good_handle = session.accept("good", good, "good.bin").unwrap();
    session.accept("bad", broken.boxed(), "bad.bin").unwrap();

    assert_eq!(good_handle.wait_terminal().await, TransferStatus::Completed);

    let err = session.await_all().await.unwrap_err();
    let SessionError::PartialFailure(summary) = err else {
        panic!("expected partial failure");
    };
    assert_eq!(summary.completed_count(), 1);
    assert_eq!(summary.failed_count(), 1);

    let bad = &summary.outcomes[1];
    assert_eq!(bad.field_name, "bad");
    assert_eq!(bad.status, TransferStatus::Failed);
    assert!(bad.error.as_deref().unwrap().contains("client went away"));

    let reply = summary.to_reply();
    assert_eq!(reply.status, 500);
    assert!(reply.to_json().unwrap().contains("\"field\":\"bad\""));

    // The successful file is intact; the broken one is left partial.
    let good_written = std::fs::read(upload_dir.path().join("good.bin")).unwrap();
    assert_eq!(good_written, good_data);
    let bad_written = std::fs::read(upload_dir.path().join("bad.bin")).unwrap();
    assert_eq!(bad_written, b"partial ");
}

#[tokio::test]
async fn same_filename_last_writer_wins() {
    let upload_dir = TempDir::new().unwrap();
    let config = SessionConfig {
        upload_dir: upload_dir.path().to_path_buf(),
        ..SessionConfig::default()
    };
    let notifier = Arc::new(drivestream_transfer::LogNotifier);

    let mut first = UploadSession::new(config.clone(), notifier.clone());
    let source = futures_util::stream::iter(vec![Ok(Bytes::from_static(b"first version"))]);
    first.accept("f", source, "same.txt").unwrap();
    first.await_all().await.unwrap();

    let mut second = UploadSession::new(config, notifier);
    let source = futures_util::stream::iter(vec![Ok(Bytes::from_static(b"second"))]);
    second.accept("f", source, "same.txt").unwrap();
    second.await_all().await.unwrap();

    let content = std::fs::read(upload_dir.path().join("same.txt")).unwrap();
    assert_eq!(content, b"second");
}
