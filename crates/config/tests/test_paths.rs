//! Tests for path utilities

use agentseek_config::paths::{self, ensure_dir, expand_home};
use serial_test::serial;

#[test]
fn test_expand_home_absolute_untouched() {
    assert_eq!(expand_home("/var/tmp"), std::path::PathBuf::from("/var/tmp"));
}

#[test]
#[serial]
fn test_data_dir_override() {
    std::env::set_var(paths::HOME_ENV, "/tmp/agentseek-home");
    assert_eq!(paths::data_dir(), std::path::PathBuf::from("/tmp/agentseek-home"));
    assert_eq!(
        paths::config_path(),
        std::path::PathBuf::from("/tmp/agentseek-home/config.json")
    );
    assert!(paths::memory_dir().ends_with("conversations"));
    assert!(paths::prompts_dir().ends_with("prompts"));
    std::env::remove_var(paths::HOME_ENV);
}

#[tokio::test]
async fn test_ensure_dir_creates_nested() {
    let temp = tempfile::tempdir().unwrap();
    let nested = temp.path().join("a").join("b");
    ensure_dir(&nested).await.unwrap();
    assert!(nested.is_dir());
}
