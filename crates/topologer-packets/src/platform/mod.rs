//! Platform-specific socket implementations.

#[cfg(unix)]
pub mod unix;

use crate::SourceSinkHandle;
use topologer_core::TopologyError;

/// Opens the ICMP listener first, then the UDP prober.
///
/// A listener that cannot be created (usually for lack of privileges) means
/// no probe is ever sent.
pub async fn new_source_sink() -> Result<SourceSinkHandle, TopologyError> {
    #[cfg(unix)]
    return unix::new_source_sink().await;

    #[cfg(not(unix))]
    return Err(TopologyError::Internal(
        "Unsupported platform".to_string(),
    ));
}
