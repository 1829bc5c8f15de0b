//! Transaction isolation levels

/// Isolation level for a transaction
///
/// Both levels run against a private snapshot, so reads within one attempt
/// are always mutually consistent. The difference is commit-time behavior:
///
/// - `ReadCommitted` validates only the write set. A ref that was read but
///   never written may have advanced underneath the transaction without
///   forcing a retry.
/// - `Serializable` additionally validates the read set: every ref read
///   during the attempt must still be at its snapshot version when the
///   commit swap runs, otherwise the attempt conflicts and is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Isolation {
    /// Validate writes only (default)
    #[default]
    ReadCommitted,
    /// Validate reads and writes
    Serializable,
}

impl std::fmt::Display for Isolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Isolation::ReadCommitted => write!(f, "read-committed"),
            Isolation::Serializable => write!(f, "serializable"),
        }
    }
}
