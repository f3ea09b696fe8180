/// Venue-level configuration.
///
/// Per-operation execution-time bounds are supplied at registration time;
/// this only carries venue-wide settings.
#[derive(Debug, Clone)]
pub struct VenueConfig {
    /// Label used in logs and metrics when a venue hosts multiple
    /// deployments in one process.
    pub name: String,
    /// Completed calls slower than this are logged at warn level.
    /// 0 disables the check.
    pub slow_call_warn_ms: u64,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            slow_call_warn_ms: 5_000,
        }
    }
}
