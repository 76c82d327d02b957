/*!
Tests for error handling and error types.
*/

#[cfg(test)]
mod tests {
    use crate::error::RedisMcpError;
    use crate::store::StoreError;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_error_display() {
        let error = RedisMcpError::configuration("invalid glob pattern '[a'");
        assert_eq!(
            error.to_string(),
            "Configuration error: invalid glob pattern '[a'"
        );

        let error = RedisMcpError::compression("truncated gzip stream");
        assert_eq!(error.to_string(), "Compression error: truncated gzip stream");

        let error = RedisMcpError::storage("disk full");
        assert_eq!(error.to_string(), "Storage error: disk full");
    }

    #[test]
    fn test_not_found_names_the_path() {
        let error = RedisMcpError::NotFound(PathBuf::from("backups/missing.json"));
        assert_eq!(
            error.to_string(),
            "Backup file not found: backups/missing.json"
        );
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "read-only filesystem");
        let error = RedisMcpError::from(io_error);

        match error {
            RedisMcpError::Io(_) => {}
            _ => panic!("Expected Io error variant"),
        }
    }

    #[test]
    fn test_error_from_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error = RedisMcpError::from(json_error);

        match error {
            RedisMcpError::Json(_) => {}
            _ => panic!("Expected Json error variant"),
        }
    }

    #[test]
    fn test_error_from_store_error() {
        let error = RedisMcpError::from(StoreError::unavailable("connection reset"));
        assert!(matches!(error, RedisMcpError::Store(StoreError::Unavailable(_))));
        assert!(error.to_string().contains("connection reset"));
    }

    #[test]
    fn test_flush_failure_message() {
        let error = RedisMcpError::FlushFailed(StoreError::unavailable("READONLY replica"));
        assert_eq!(
            error.to_string(),
            "Failed to flush database before restore: store unavailable: READONLY replica"
        );
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<RedisMcpError>();
        assert_sync::<RedisMcpError>();
    }
}
