//! Service tiers and the capabilities attached to each

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named service level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Premium,
    Enterprise,
}

/// Optional panel capabilities unlocked by a tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Reports,
    Settings,
    MultiServer,
    ApiKeys,
}

impl Feature {
    pub fn as_str(self) -> &'static str {
        match self {
            Feature::Reports => "reports",
            Feature::Settings => "settings",
            Feature::MultiServer => "multi_server",
            Feature::ApiKeys => "api_keys",
        }
    }
}

/// Limits and features of a tier. `None` limits mean unlimited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierProfile {
    pub max_users: Option<u32>,
    pub max_servers: Option<u32>,
    pub features: &'static [Feature],
}

impl TierProfile {
    pub fn has(&self, feature: Feature) -> bool {
        self.features.contains(&feature)
    }

    /// Max-user ceiling as written into the panel config (-1 = unlimited)
    pub fn max_users_setting(&self) -> i64 {
        self.max_users.map(i64::from).unwrap_or(-1)
    }
}

const FREE: TierProfile = TierProfile {
    max_users: Some(10),
    max_servers: Some(1),
    features: &[],
};

const PREMIUM: TierProfile = TierProfile {
    max_users: None,
    max_servers: Some(5),
    features: &[Feature::Reports, Feature::Settings],
};

const ENTERPRISE: TierProfile = TierProfile {
    max_users: None,
    max_servers: None,
    features: &[
        Feature::Reports,
        Feature::Settings,
        Feature::MultiServer,
        Feature::ApiKeys,
    ],
};

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Free, Tier::Premium, Tier::Enterprise];

    /// Capability record for this tier
    pub fn profile(self) -> &'static TierProfile {
        match self {
            Tier::Free => &FREE,
            Tier::Premium => &PREMIUM,
            Tier::Enterprise => &ENTERPRISE,
        }
    }

    pub fn has(self, feature: Feature) -> bool {
        self.profile().has(feature)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Tier::Free => "free",
            Tier::Premium => "premium",
            Tier::Enterprise => "enterprise",
        }
    }

    /// Capitalised label for display
    pub fn label(self) -> &'static str {
        match self {
            Tier::Free => "Free",
            Tier::Premium => "Premium",
            Tier::Enterprise => "Enterprise",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "free" => Ok(Tier::Free),
            "premium" => Ok(Tier::Premium),
            "enterprise" => Ok(Tier::Enterprise),
            other => Err(format!("unknown tier: {}", other)),
        }
    }
}
