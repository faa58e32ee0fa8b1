//! # Service Configuration & Constants
//!
//! Defaults shared by the core and the node binary. The node's CLI exposes
//! most of these as flags; the values here are what you get when nothing
//! is overridden.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// Default port for the ticket HTTP API.
pub const DEFAULT_API_PORT: u16 = 8640;

/// Default port for the Prometheus metrics endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 8641;

/// Default base URL of the payments service.
pub const DEFAULT_PAYMENTS_URL: &str = "http://127.0.0.1:8600";

/// Default Horizon endpoint (Stellar testnet).
pub const DEFAULT_HORIZON_URL: &str = "https://horizon-testnet.stellar.org";

/// Per-request timeout for calls to the payments service and Horizon.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Memo
// ---------------------------------------------------------------------------

/// Stellar caps text memos at 28 bytes. Longer text cannot come from a
/// valid transaction.
pub const MAX_TEXT_MEMO_BYTES: usize = 28;

// ---------------------------------------------------------------------------
// API
// ---------------------------------------------------------------------------

/// Header carrying the authenticated caller's user id. Set by the gateway in
/// front of the node; the node trusts it as-is.
pub const CALLER_ID_HEADER: &str = "x-user-id";
