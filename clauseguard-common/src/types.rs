//! Shared domain types for the contract-analysis pipeline
//!
//! These are the wire types exchanged between the API handlers, the
//! analysis invoker, and the document store. Field casing follows the
//! client contract (`blindSpot`, `documentId`), so serde renames are
//! applied where Rust naming differs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One flagged high-risk clause inside an analyzed document.
///
/// Always embedded in a [`Document`]; never independently addressable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFlag {
    /// Short label for the risk
    pub title: String,
    /// Verbatim clause excerpt, truncated to 120 words with an ellipsis
    pub clause: String,
    /// 1-based page number in the uploaded document
    pub page: u32,
    /// Supporting official sources; at least one per flag
    pub citations: Vec<String>,
    /// Overlooked-issue note for this clause
    #[serde(rename = "blindSpot")]
    pub blind_spot: String,
}

/// Validated output of the analysis backend: an executive summary plus
/// up to five ranked risk flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractAnalysis {
    pub summary: String,
    pub risks: Vec<RiskFlag>,
}

/// A persisted, immutable analysis record owned by a single user.
///
/// Re-analysis of the same file creates a new record; there is no update
/// path and no deletion path in this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub user_id: String,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
    pub summary: String,
    pub risks: Vec<RiskFlag>,
}

/// Trimmed history listing entry (no summary or risks payload).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub filename: String,
    pub uploaded_at: DateTime<Utc>,
}
