//! Tests for the filesystem helpers

use m_zip::error::MZipError;
use m_zip::fsutil;
use tempfile::tempdir;

#[test]
fn make_dir_creates_nested_components() {
    let root = tempdir().unwrap();
    let target = root.path().join("a").join("b").join("c");

    fsutil::make_dir(&target).unwrap();
    assert!(target.is_dir());

    // already existing directories are fine
    fsutil::make_dir(&target).unwrap();
}

#[test]
fn make_dir_reports_file_in_the_way() {
    let root = tempdir().unwrap();
    let blocker = root.path().join("a");
    std::fs::write(&blocker, b"not a directory").unwrap();

    let target = blocker.join("b");
    assert!(matches!(
        fsutil::make_dir(&target),
        Err(MZipError::FileInTheWay(_))
    ));
}

#[test]
fn write_file_to_respects_overwrite_flag() {
    let root = tempdir().unwrap();
    let path = root.path().join("out.bin");

    assert!(fsutil::write_file_to(&path, b"first", false, None).unwrap());
    assert_eq!(std::fs::read(&path).unwrap(), b"first");

    // existing file, no overwrite
    assert!(!fsutil::write_file_to(&path, b"second", false, None).unwrap());
    assert_eq!(std::fs::read(&path).unwrap(), b"first");

    assert!(fsutil::write_file_to(&path, b"second", true, None).unwrap());
    assert_eq!(std::fs::read(&path).unwrap(), b"second");
}

#[test]
fn write_file_to_refuses_directories_and_creates_parents() {
    let root = tempdir().unwrap();

    // a directory at the target path is never overwritten
    assert!(!fsutil::write_file_to(root.path(), b"x", true, None).unwrap());

    let nested = root.path().join("deep").join("er").join("file.txt");
    assert!(fsutil::write_file_to(&nested, b"content", false, None).unwrap());
    assert_eq!(std::fs::read(&nested).unwrap(), b"content");
}

#[cfg(unix)]
#[test]
fn attributes_round_trip() {
    let root = tempdir().unwrap();
    let path = root.path().join("mode.bin");
    fsutil::write_file_to(&path, b"x", false, Some(0o640)).unwrap();
    assert_eq!(fsutil::get_attributes(&path).unwrap() & 0o777, 0o640);
}

#[test]
fn find_files_lists_recursively() {
    let root = tempdir().unwrap();
    std::fs::create_dir(root.path().join("sub")).unwrap();
    std::fs::write(root.path().join("top.txt"), b"1").unwrap();
    std::fs::write(root.path().join("sub").join("inner.txt"), b"2").unwrap();

    let mut found = fsutil::find_files(root.path()).unwrap();
    found.sort();

    assert_eq!(found.len(), 3);
    assert!(found.contains(&root.path().join("top.txt")));
    assert!(found.contains(&root.path().join("sub")));
    assert!(found.contains(&root.path().join("sub").join("inner.txt")));
}

#[cfg(feature = "async")]
mod async_tests {
    use m_zip::fsutil;
    use tempfile::tempdir;

    #[tokio::test]
    async fn async_write_respects_overwrite_flag() {
        let root = tempdir().unwrap();
        let path = root.path().join("out.bin");

        assert!(fsutil::write_file_to_async(&path, b"first", false, None)
            .await
            .unwrap());
        assert!(!fsutil::write_file_to_async(&path, b"second", false, None)
            .await
            .unwrap());
        assert_eq!(std::fs::read(&path).unwrap(), b"first");
    }
}
