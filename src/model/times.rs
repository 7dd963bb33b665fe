//! Audit timestamps carried by every group and entry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Creation/modification/access bookkeeping plus expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditTimes {
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub accessed: DateTime<Utc>,
    /// When the node was last moved to a different parent.
    pub location_changed: DateTime<Utc>,
    /// Expiry instant; only meaningful while `expires_enabled` is set.
    pub expires: Option<DateTime<Utc>>,
    pub expires_enabled: bool,
    pub usage_count: u64,
}

impl AuditTimes {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            created: now,
            modified: now,
            accessed: now,
            location_changed: now,
            expires: None,
            expires_enabled: false,
            usage_count: 0,
        }
    }

    /// Record a use: bumps the access time and the usage counter.
    pub fn touch(&mut self) {
        self.accessed = Utc::now();
        self.usage_count += 1;
    }

    pub fn mark_modified(&mut self) {
        self.modified = Utc::now();
    }

    pub fn mark_moved(&mut self) {
        self.location_changed = Utc::now();
    }

    /// Set or clear the expiry instant.
    pub fn set_expires(&mut self, expires: Option<DateTime<Utc>>) {
        self.expires_enabled = expires.is_some();
        self.expires = expires;
    }

    pub fn is_expired(&self) -> bool {
        if !self.expires_enabled {
            return false;
        }
        self.expires.map(|exp| exp < Utc::now()).unwrap_or(false)
    }
}

impl Default for AuditTimes {
    fn default() -> Self {
        Self::new()
    }
}
