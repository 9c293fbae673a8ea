// # Candidate Source Trait
//
// Defines the interface for obtaining candidate address lists.
//
// A source hands out an opaque archive blob and knows how to list and read
// its entries. Each entry is a newline-delimited list of addresses. Ordering
// and parsing of entries live in `crate::candidates`, not in the source.
//
// ## Implementations
//
// - Zip archive over HTTP: `edgepick-source-zip` crate

use async_trait::async_trait;

/// Trait for candidate archive sources
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// Any error returned here is fatal for the current domain's run: the engine
/// does not fall back to another source.
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Download the archive
    async fn fetch_archive(&self) -> Result<Vec<u8>, crate::Error>;

    /// List entry names in archive order
    ///
    /// Directory entries are not listed.
    fn list_entries(&self, archive: &[u8]) -> Result<Vec<String>, crate::Error>;

    /// Read the raw bytes of one entry
    fn read_entry(&self, archive: &[u8], name: &str) -> Result<Vec<u8>, crate::Error>;

    /// Get the source name (for logging/debugging)
    fn source_name(&self) -> &'static str;
}
