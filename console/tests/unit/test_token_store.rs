//! File token store tests

use buildzy::authn::token_store::{FileTokenStore, TokenStore};
use buildzy::filesys::file::File;
use secrecy::{ExposeSecret, SecretString};

#[tokio::test]
async fn test_file_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let file = File::new(dir.path().join("nested").join("token"));
    let store = FileTokenStore::new(file.clone());

    assert!(store.get_token().await.unwrap().is_none());

    store
        .set_token(&SecretString::from("abc123".to_string()))
        .await
        .unwrap();
    assert!(file.exists().await);
    let token = store.get_token().await.unwrap().unwrap();
    assert_eq!(token.expose_secret(), "abc123");

    store.clear_token().await.unwrap();
    assert!(!file.exists().await);
    assert!(store.get_token().await.unwrap().is_none());

    // clearing twice is fine
    store.clear_token().await.unwrap();
}

#[tokio::test]
async fn test_file_store_ignores_surrounding_whitespace() {
    let dir = tempfile::tempdir().unwrap();
    let file = File::new(dir.path().join("token"));
    file.write_string("  abc123\n").await.unwrap();

    let token = FileTokenStore::new(file).get_token().await.unwrap().unwrap();
    assert_eq!(token.expose_secret(), "abc123");
}

#[cfg(unix)]
#[tokio::test]
async fn test_file_store_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let file = File::new(dir.path().join("token"));
    FileTokenStore::new(file.clone())
        .set_token(&SecretString::from("abc123".to_string()))
        .await
        .unwrap();

    let mode = std::fs::metadata(file.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[cfg(unix)]
#[tokio::test]
async fn test_atomic_write_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let file = File::new(dir.path().join("token"));
    // a stale staging file left world-readable by an earlier crash
    std::fs::write(dir.path().join("token.tmp"), "old").unwrap();
    std::fs::set_permissions(
        dir.path().join("token.tmp"),
        std::fs::Permissions::from_mode(0o644),
    )
    .unwrap();

    file.write_atomic(b"secret").await.unwrap();

    let mode = std::fs::metadata(file.path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
    assert_eq!(std::fs::read_to_string(file.path()).unwrap(), "secret");
    assert!(!dir.path().join("token.tmp").exists());
}
