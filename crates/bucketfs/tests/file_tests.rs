//! File behaviour against the in-memory store.

use bucketfs::{
    BucketFs, Error, FileNode, InMemoryStore, MIN_TIMESTAMP, NodeInfo, NodeType, ObjectStore,
    etag_sidecar,
};
use std::sync::Arc;
use tokio::io::AsyncReadExt;

fn service() -> (Arc<InMemoryStore>, BucketFs) {
    let store = Arc::new(InMemoryStore::with_bucket("tests"));
    let fs = BucketFs::new(store.clone());
    (store, fs)
}

async fn write_text(fs: &BucketFs, path: &str, text: &str) -> FileNode {
    let mut file = fs.file(path).await.unwrap();
    file.create_from_text(text).await.unwrap();
    file
}

#[tokio::test]
async fn create_and_delete_text_file() {
    let (_, fs) = service();
    write_text(&fs, "EnumerateTests\\text00.txt", "test00").await;

    let mut text00 = fs.file("EnumerateTests\\text00.txt").await.unwrap();
    assert!(text00.exists());
    assert!(text00.last_modified() > MIN_TIMESTAMP);
    assert_eq!(text00.length(), 6);
    assert_eq!(text00.node_type(), NodeType::File);

    text00.delete().await.unwrap();
    assert!(!text00.exists());
    assert_eq!(text00.last_modified(), MIN_TIMESTAMP);
    assert_eq!(text00.length(), 0);
}

#[tokio::test]
async fn longer_sibling_key_is_a_different_file() {
    let (_, fs) = service();
    write_text(&fs, "EnumerateTests\\Level11\\text11.txt", "test11").await;
    let mut user = write_text(&fs, "EnumerateTests\\Level11\\text11.txt.user", "00").await;

    let mut text11 = fs.file("EnumerateTests\\Level11\\text11.txt").await.unwrap();
    assert!(text11.exists());
    assert_eq!(text11.length(), 6);
    assert_eq!(text11.extension(), "txt");
    assert_eq!(user.length(), 2);
    assert_eq!(user.extension(), "user");

    text11.delete().await.unwrap();
    assert!(!text11.exists());

    user.refresh().await.unwrap();
    assert!(user.exists());
    user.delete().await.unwrap();
    assert!(!user.exists());
}

#[tokio::test]
async fn file_does_not_match_directory_marker() {
    let (_, fs) = service();
    fs.directory("report.txt")
        .await
        .unwrap()
        .create()
        .await
        .unwrap();

    let file = fs.file("report.txt").await.unwrap();
    assert!(!file.exists());
}

#[tokio::test]
async fn overwrite_replaces_content() {
    let (_, fs) = service();
    let mut file = write_text(&fs, "notes.md", "first draft").await;
    let first_etag = file.etag().map(str::to_string);

    file.create("v2").await.unwrap();
    assert_eq!(file.length(), 2);
    assert_ne!(file.etag().map(str::to_string), first_etag);

    let mut reader = file.open_for_reading().await.unwrap();
    let mut content = String::new();
    reader.read_to_string(&mut content).await.unwrap();
    assert_eq!(content, "v2");
}

#[tokio::test]
async fn upload_then_download_preserves_length() {
    let (_, fs) = service();
    let size = 3 * 1024 * 1024 + 17;
    let temp = tempfile::tempdir().unwrap();
    let source = temp.path().join("test_file.txt");
    tokio::fs::write(&source, vec![b'd'; size]).await.unwrap();

    let mut file = fs.file("EnumerateTests\\test_file.txt").await.unwrap();
    file.upload_from_local(&source).await.unwrap();
    assert!(file.exists());
    assert_eq!(file.length(), size as u64);

    let destination = temp.path().join("downloaded.txt");
    let written = file.download_to_local(&destination, true).await.unwrap();
    assert_eq!(written, size as u64);

    let metadata = tokio::fs::metadata(&destination).await.unwrap();
    assert_eq!(metadata.len(), file.length());

    let sidecar = tokio::fs::read_to_string(etag_sidecar(&destination))
        .await
        .unwrap();
    assert_eq!(Some(sidecar.as_str()), file.etag());
}

#[tokio::test]
async fn download_without_etag_writes_no_sidecar() {
    let (_, fs) = service();
    let file = write_text(&fs, "plain.txt", "abc").await;
    let temp = tempfile::tempdir().unwrap();
    let destination = temp.path().join("plain.txt");

    file.download_to_local(&destination, false).await.unwrap();
    assert!(destination.exists());
    assert!(!etag_sidecar(&destination).exists());
}

#[tokio::test]
async fn download_missing_object_fails() {
    let (_, fs) = service();
    let file = fs.file("missing.bin").await.unwrap();
    let temp = tempfile::tempdir().unwrap();

    let err = file
        .download_to_local(&temp.path().join("missing.bin"), false)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn directory_upload_places_file_by_name() {
    let (store, fs) = service();
    let temp = tempfile::tempdir().unwrap();
    let source = temp.path().join("photo.jpg");
    tokio::fs::write(&source, b"jpeg").await.unwrap();

    let mut dir = fs.directory("albums\\2024").await.unwrap();
    dir.create().await.unwrap();
    let file = dir.upload_file(&source).await.unwrap();

    assert_eq!(file.key(), "albums\\2024\\photo.jpg");
    assert_eq!(file.directory().key(), "albums\\2024\\");
    assert_eq!(file.full_name(), "tests:\\albums\\2024\\photo.jpg");
    assert!(store.head("albums/2024/photo.jpg").await.is_ok());
}

#[tokio::test]
async fn listing_populates_metadata_like_refresh() {
    let (_, fs) = service();
    let refreshed = write_text(&fs, "dir\\a.txt", "12345").await;

    let dir = fs.directory("dir").await.unwrap();
    let listed = dir.list_files().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].length(), refreshed.length());
    assert_eq!(listed[0].last_modified(), refreshed.last_modified());
    assert_eq!(listed[0].etag(), refreshed.etag());
}

#[test]
fn invalid_file_paths_are_rejected() {
    let store: Arc<dyn ObjectStore> = Arc::new(InMemoryStore::new());
    for path in ["", "\\", "dir\\", "a\\\\b.txt", "a/b.txt"] {
        match FileNode::new(store.clone(), path) {
            Err(Error::InvalidPath { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected InvalidPath for {path:?}, got {other:?}"),
        }
    }
}
