//! Application journeys and their notification templates

/// Kind of application a submission came through
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Journey {
    /// New application
    #[default]
    Standard,
    /// Appeal against an earlier decision
    Appeal,
    /// Renewal of an existing case
    Renewal,
}

/// Journey identifiers as they appear in submitted payloads
const JOURNEYS: &[(&str, Journey)] = &[
    ("apply", Journey::Standard),
    ("standard", Journey::Standard),
    ("appeal", Journey::Appeal),
    ("renew", Journey::Renewal),
    ("renewal", Journey::Renewal),
];

impl Journey {
    /// Resolves a journey identifier, falling back to `Standard` for missing
    /// or unknown identifiers
    #[must_use]
    pub fn from_id(id: Option<&str>) -> Self {
        id.and_then(|id| {
            JOURNEYS
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(id.trim()))
                .map(|(_, journey)| *journey)
        })
        .unwrap_or_default()
    }

    /// Stable name used in logs and email personalisation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Appeal => "appeal",
            Self::Renewal => "renewal",
        }
    }
}

/// Notification template ids per journey
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyTemplates {
    /// Template for standard applications
    pub standard: String,
    /// Template for appeals
    pub appeal: String,
    /// Template for renewals
    pub renewal: String,
}

impl NotifyTemplates {
    /// Template id for `journey`
    #[must_use]
    pub fn for_journey(&self, journey: Journey) -> &str {
        match journey {
            Journey::Standard => &self.standard,
            Journey::Appeal => &self.appeal,
            Journey::Renewal => &self.renewal,
        }
    }
}
