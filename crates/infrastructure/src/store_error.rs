use qatrail_core::AppError;

/// Maps a storage failure into the application taxonomy.
///
/// Connection-level failures are retryable with backoff; everything else
/// is an internal error.
pub(crate) fn store_error(context: &str, error: sqlx::Error) -> AppError {
    match error {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            AppError::Transient(format!("{context}: {error}"))
        }
        _ => AppError::Internal(format!("{context}: {error}")),
    }
}
