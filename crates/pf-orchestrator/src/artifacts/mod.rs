//! Artifact generation
//!
//! Renders the panel's file set for a tier. Tier-derived values (limits,
//! feature flags, navigation) are filled in here; database credentials and
//! the session signing key are left as placeholders in `config.php` and
//! substituted later by [`render_config`], so nothing in the generated set
//! depends on the run that delivers it.

use std::collections::BTreeMap;

use pf_core::{Feature, Tier};

use crate::shell::php_literal;

/// Configuration file holding the credential placeholders
pub const CONFIG_FILE: &str = "config.php";

/// Schema script loaded into the panel database
pub const SCHEMA_FILE: &str = "install.sql";

/// Generated file set, keyed by filename relative to the install path
pub type ArtifactSet = BTreeMap<String, String>;

struct Template {
    filename: &'static str,
    source: &'static str,
    /// Feature a tier must carry for this file to be included
    requires: Option<Feature>,
}

macro_rules! template {
    ($name:literal) => {
        Template {
            filename: $name,
            source: include_str!(concat!("../../templates/", $name)),
            requires: None,
        }
    };
    ($name:literal, $feature:expr) => {
        Template {
            filename: $name,
            source: include_str!(concat!("../../templates/", $name)),
            requires: Some($feature),
        }
    };
}

const TEMPLATES: &[Template] = &[
    template!("index.php"),
    template!("config.php"),
    template!("install.sql"),
    template!("login.php"),
    template!("logout.php"),
    template!("users.php"),
    template!("add_user.php"),
    template!("delete_user.php"),
    template!("api.php"),
    template!("style.css"),
    template!("script.js"),
    template!("reports.php", Feature::Reports),
    template!("settings.php", Feature::Settings),
    template!("multi_server.php", Feature::MultiServer),
    template!("api_keys.php", Feature::ApiKeys),
];

/// Page and navigation label for a feature
fn feature_page(feature: Feature) -> (&'static str, &'static str) {
    match feature {
        Feature::Reports => ("reports.php", "Reports"),
        Feature::Settings => ("settings.php", "Settings"),
        Feature::MultiServer => ("multi_server.php", "Servers"),
        Feature::ApiKeys => ("api_keys.php", "API Keys"),
    }
}

/// Tables a feature adds to the base schema
fn feature_schema(feature: Feature) -> Option<&'static str> {
    match feature {
        Feature::MultiServer => Some(
            "CREATE TABLE IF NOT EXISTS managed_servers (\n  \
             id INT AUTO_INCREMENT PRIMARY KEY,\n  \
             name VARCHAR(100) NOT NULL,\n  \
             address VARCHAR(255) NOT NULL,\n  \
             port INT DEFAULT 22,\n  \
             created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP\n);\n",
        ),
        Feature::ApiKeys => Some(
            "CREATE TABLE IF NOT EXISTS api_keys (\n  \
             id INT AUTO_INCREMENT PRIMARY KEY,\n  \
             label VARCHAR(100) NOT NULL,\n  \
             key_hash CHAR(64) UNIQUE NOT NULL,\n  \
             created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP\n);\n",
        ),
        Feature::Reports | Feature::Settings => None,
    }
}

/// Render the file set for `tier`.
///
/// Deterministic: the same tier always yields the same contents.
pub fn generate(tier: Tier) -> ArtifactSet {
    let profile = tier.profile();

    let nav_items: String = profile
        .features
        .iter()
        .map(|f| {
            let (page, label) = feature_page(*f);
            format!("        <a href=\"{}\" class=\"nav-item\">{}</a>\n", page, label)
        })
        .collect();
    let extra_schema: String = profile
        .features
        .iter()
        .filter_map(|f| feature_schema(*f))
        .collect::<Vec<_>>()
        .join("\n");
    let feature_list = profile
        .features
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(",");

    let values = [
        ("{{TIER}}", tier.as_str().to_string()),
        ("{{TIER_LABEL}}", tier.label().to_string()),
        ("{{MAX_USERS}}", profile.max_users_setting().to_string()),
        ("{{FEATURES}}", feature_list),
        ("{{NAV_ITEMS}}", nav_items.trim_end_matches('\n').to_string()),
        ("{{EXTRA_SCHEMA}}", extra_schema),
    ];

    TEMPLATES
        .iter()
        .filter(|t| t.requires.map_or(true, |feature| profile.has(feature)))
        .map(|t| (t.filename.to_string(), substitute(t.source, &values)))
        .collect()
}

/// Run-specific values written into `config.php`
pub struct ConfigSecrets<'a> {
    pub db_name: &'a str,
    pub db_user: &'a str,
    pub db_password: &'a str,
    pub app_secret: &'a str,
}

/// Fill the credential placeholders of a generated `config.php`.
///
/// Every value becomes a quoted PHP string literal.
pub fn render_config(template: &str, secrets: &ConfigSecrets<'_>) -> String {
    let values = [
        ("{{DB_NAME}}", php_literal(secrets.db_name)),
        ("{{DB_USER}}", php_literal(secrets.db_user)),
        ("{{DB_PASSWORD}}", php_literal(secrets.db_password)),
        ("{{APP_SECRET}}", php_literal(secrets.app_secret)),
    ];
    substitute(template, &values)
}

fn substitute(source: &str, values: &[(&str, String)]) -> String {
    values
        .iter()
        .fold(source.to_string(), |acc, (placeholder, value)| {
            acc.replace(placeholder, value)
        })
}
