//! Migration phases.

use serde::{Deserialize, Serialize};

use shopfront_core::error::{Result, StoreError};

/// The four migration phases. Reads always go to the phase's primary store;
/// in the dual-write phases writes are replicated best-effort to the other
/// store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MigrationPhase {
    /// Document store only; the wide-column store is not touched.
    DocumentOnly,
    /// Document store primary, wide-column store catching up asynchronously.
    DualWriteDocumentPrimary,
    /// Wide-column store primary, document store kept as fallback.
    DualWriteWideColumnPrimary,
    /// Wide-column store only; the document store can be retired.
    WideColumnOnly,
}

impl MigrationPhase {
    pub const ALL: [Self; 4] = [
        Self::DocumentOnly,
        Self::DualWriteDocumentPrimary,
        Self::DualWriteWideColumnPrimary,
        Self::WideColumnOnly,
    ];

    /// Canonical wire form used by the operational surface.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DocumentOnly => "DOCUMENT_ONLY",
            Self::DualWriteDocumentPrimary => "DUAL_WRITE_DOCUMENT_PRIMARY",
            Self::DualWriteWideColumnPrimary => "DUAL_WRITE_WIDECOL_PRIMARY",
            Self::WideColumnOnly => "WIDECOL_ONLY",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|phase| phase.as_str() == value)
            .ok_or_else(|| StoreError::InvalidPhase(value.to_string()))
    }

    pub fn is_dual_write(self) -> bool {
        matches!(
            self,
            Self::DualWriteDocumentPrimary | Self::DualWriteWideColumnPrimary
        )
    }
}

impl std::fmt::Display for MigrationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MigrationPhase {
    type Err = StoreError;

    fn from_str(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}
