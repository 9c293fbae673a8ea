// # DNS Provider Trait
//
// Defines the single-shot remote calls the update protocol is built from.
//
// ## Implementations
//
// - Cloudflare: `edgepick-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// let zone_id = provider.lookup_zone("example.com").await?;
// if let Some(record_id) = provider.lookup_record(&zone_id, "www.example.com", "A").await? {
//     provider.update_record(&zone_id, &record_id, "www.example.com", "1.2.3.4").await?;
// }
// ```

use async_trait::async_trait;

/// Trait for DNS provider implementations
///
/// Each method performs exactly one remote call and reports its outcome.
///
/// # Trust Level: Untrusted
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Decode provider-specific responses into typed schemas
/// - ✅ Return success or failure (the `Updater` handles retry)
///
/// ## Forbidden Capabilities
/// - ❌ Retry or back off (owned by `Updater`)
/// - ❌ Cache zone or record ids across calls (ids are resolved fresh on every attempt)
/// - ❌ Spawn tasks or threads
/// - ❌ Log credentials
///
/// An undecodable body or a missing id is an `Err`, so it follows the same
/// retry path as a transport failure.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Resolve the zone id for a registered domain
    ///
    /// # Returns
    ///
    /// - `Ok(String)`: id of the first zone returned
    /// - `Err(Error)`: transport failure, non-2xx, bad body, or no zone
    async fn lookup_zone(&self, zone_domain: &str) -> Result<String, crate::Error>;

    /// Find the id of the first record of `record_type` named `fqdn`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(id))`: a matching record exists
    /// - `Ok(None)`: the lookup succeeded but no record of that type exists
    /// - `Err(Error)`: transport failure, non-2xx, or bad body
    async fn lookup_record(
        &self,
        zone_id: &str,
        fqdn: &str,
        record_type: &str,
    ) -> Result<Option<String>, crate::Error>;

    /// Overwrite an existing "A" record's content
    ///
    /// Success is strictly an HTTP 200 reply; anything else is an `Err`.
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        fqdn: &str,
        content: &str,
    ) -> Result<(), crate::Error>;

    /// Create a new "A" record
    ///
    /// Only used when the missing-record policy asks for it.
    async fn create_record(
        &self,
        zone_id: &str,
        fqdn: &str,
        content: &str,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
