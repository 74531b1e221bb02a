//! `/etc/os-release` parsing

/// The fields of `/etc/os-release` the OS check looks at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    pub id: String,
    pub id_like: Vec<String>,
    pub name: String,
    pub version_id: Option<String>,
}

impl OsRelease {
    /// Parse `KEY=value` lines, stripping optional quotes.
    ///
    /// Unknown keys, comments and malformed lines are ignored.
    pub fn parse(content: &str) -> Self {
        let mut release = OsRelease::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = unquote(value.trim());
            match key.trim() {
                "ID" => release.id = value.to_ascii_lowercase(),
                "ID_LIKE" => {
                    release.id_like = value
                        .split_whitespace()
                        .map(|s| s.to_ascii_lowercase())
                        .collect()
                }
                "NAME" => release.name = value,
                "VERSION_ID" => release.version_id = Some(value),
                _ => {}
            }
        }
        release
    }

    /// Whether `ID` or any `ID_LIKE` entry is in `supported`
    pub fn is_supported(&self, supported: &[String]) -> bool {
        supported.iter().any(|s| {
            let s = s.to_ascii_lowercase();
            self.id == s || self.id_like.contains(&s)
        })
    }

    /// Distribution name for messages, falling back to the id
    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            &self.name
        } else if !self.id.is_empty() {
            &self.id
        } else {
            "unknown"
        }
    }
}

fn unquote(value: &str) -> String {
    let stripped = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')));
    stripped.unwrap_or(value).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const UBUNTU: &str = r#"PRETTY_NAME="Ubuntu 22.04.4 LTS"
NAME="Ubuntu"
VERSION_ID="22.04"
ID=ubuntu
ID_LIKE=debian
"#;

    const CENTOS: &str = r#"NAME="CentOS Linux"
VERSION="7 (Core)"
ID="centos"
ID_LIKE="rhel fedora"
VERSION_ID="7"
"#;

    fn supported() -> Vec<String> {
        vec!["ubuntu".to_string(), "debian".to_string()]
    }

    #[test]
    fn test_parse_ubuntu() {
        let release = OsRelease::parse(UBUNTU);
        assert_eq!(release.id, "ubuntu");
        assert_eq!(release.id_like, vec!["debian".to_string()]);
        assert_eq!(release.name, "Ubuntu");
        assert_eq!(release.version_id.as_deref(), Some("22.04"));
        assert!(release.is_supported(&supported()));
    }

    #[test]
    fn test_centos_unsupported() {
        let release = OsRelease::parse(CENTOS);
        assert_eq!(release.display_name(), "CentOS Linux");
        assert!(!release.is_supported(&supported()));
    }

    #[test]
    fn test_derivative_matched_by_id_like() {
        let release = OsRelease::parse("ID=linuxmint\nID_LIKE=\"ubuntu debian\"\n");
        assert!(release.is_supported(&supported()));
    }

    #[test]
    fn test_empty_input() {
        let release = OsRelease::parse("");
        assert_eq!(release.display_name(), "unknown");
        assert!(!release.is_supported(&supported()));
    }
}
