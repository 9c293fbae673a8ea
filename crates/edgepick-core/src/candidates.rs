//! Candidate pool extraction
//!
//! Turns an opaque archive from a [`CandidateSource`] into ordered pools of
//! addresses. Sources only list and read entries; which entry is tried first
//! and how its text is split is decided here.

use crate::error::Result;
use crate::traits::CandidateSource;

/// Ordered addresses read from one archive entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePool {
    /// Archive entry the addresses came from
    pub entry: String,
    /// Addresses in file order
    pub addresses: Vec<String>,
}

/// Order archive entries for a domain
///
/// With a filter, entries whose name contains it come first, then the rest.
/// Both groups keep archive order. Without a filter the archive order is
/// returned unchanged.
pub fn ordered_entries(entries: &[String], filter: Option<&str>) -> Vec<String> {
    match filter {
        Some(filter) => {
            let (preferred, rest): (Vec<&String>, Vec<&String>) =
                entries.iter().partition(|name| name.contains(filter));
            preferred.into_iter().chain(rest).cloned().collect()
        }
        None => entries.to_vec(),
    }
}

/// Split an entry's bytes into addresses
///
/// Lines are trimmed and blank lines dropped. Invalid UTF-8 is replaced
/// rather than rejected.
pub fn parse_pool(content: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(content)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lazily walks an archive's entries in domain order, yielding non-empty pools
pub struct PoolCursor<'a> {
    source: &'a dyn CandidateSource,
    archive: &'a [u8],
    names: std::vec::IntoIter<String>,
}

impl<'a> PoolCursor<'a> {
    /// List the archive's entries and order them for `filter`
    pub fn new(
        source: &'a dyn CandidateSource,
        archive: &'a [u8],
        filter: Option<&str>,
    ) -> Result<Self> {
        let entries = source.list_entries(archive)?;
        Ok(Self {
            source,
            archive,
            names: ordered_entries(&entries, filter).into_iter(),
        })
    }

    /// Read entries until one parses to at least one address
    ///
    /// Returns `Ok(None)` once every entry has been tried. A read failure is
    /// returned as an error and ends the walk for the caller.
    pub fn next_pool(&mut self) -> Result<Option<CandidatePool>> {
        for name in self.names.by_ref() {
            let content = self.source.read_entry(self.archive, &name)?;
            let addresses = parse_pool(&content);
            if addresses.is_empty() {
                tracing::debug!("Archive entry {} holds no addresses, skipping", name);
                continue;
            }
            return Ok(Some(CandidatePool {
                entry: name,
                addresses,
            }));
        }
        Ok(None)
    }
}
