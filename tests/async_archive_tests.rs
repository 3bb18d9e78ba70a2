//! Tests for the incremental (async) serialization path
//!
//! Run with: cargo test --features async

#[cfg(feature = "async")]
mod async_tests {
    use m_zip::{MZipError, Result, Zip};

    fn sample_zip() -> Zip {
        let mut zip = Zip::new();
        zip.add_file("b.txt", b"beta content").unwrap();
        zip.add_file("a.txt", b"alpha content").unwrap();
        zip.add_file("dir/", b"").unwrap();
        zip.add_file("dir/c.txt", b"gamma content").unwrap();
        zip
    }

    #[tokio::test]
    async fn async_output_matches_sync_output() -> Result<()> {
        let sync_bytes = sample_zip().to_buffer()?;
        let async_bytes = sample_zip().to_async_buffer(|_| {}, |_| {}).await?;
        assert_eq!(async_bytes, sync_bytes);
        Ok(())
    }

    #[tokio::test]
    async fn progress_callbacks_fire_per_entry_in_order() -> Result<()> {
        let mut zip = sample_zip();
        let mut started = Vec::new();
        let mut finished = Vec::new();

        zip.to_async_buffer(
            |name| started.push(name.to_string()),
            |name| finished.push(name.to_string()),
        )
        .await?;

        // same canonical order as the sync path
        assert_eq!(started, ["a.txt", "b.txt", "dir/", "dir/c.txt"]);
        assert_eq!(finished, started);
        Ok(())
    }

    #[tokio::test]
    async fn async_round_trip_reads_back() -> Result<()> {
        let bytes = sample_zip().to_async_buffer(|_| {}, |_| {}).await?;
        let mut reloaded = Zip::from_buffer(bytes)?;

        assert_eq!(reloaded.read_file_async("a.txt").await?, b"alpha content");
        assert_eq!(reloaded.read_file_async("dir/c.txt").await?, b"gamma content");
        Ok(())
    }

    #[tokio::test]
    async fn async_read_of_directory_reports_directory_content() -> Result<()> {
        let bytes = sample_zip().to_buffer()?;
        let mut reloaded = Zip::from_buffer(bytes)?;

        let dir = reloaded.archive_mut().get_entry_mut("dir/").unwrap();
        assert!(matches!(
            dir.get_data_async().await,
            Err(MZipError::DirectoryContent)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn async_read_of_missing_entry_reports_not_found() -> Result<()> {
        let mut zip = sample_zip();
        assert!(matches!(
            zip.read_file_async("missing.txt").await,
            Err(MZipError::EntryNotFound(_))
        ));
        Ok(())
    }
}
