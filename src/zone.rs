use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::record::RecordTTL;

/// Provider credentials.
///
/// ```yaml
/// type: api_key
/// value:
///   email: "ops@example.com"
///   key: "1234567890"
/// ```
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Auth {
    ApiToken(String),
    ApiKey { email: String, key: String },
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::ApiToken(_) => f.write_str("ApiToken(***)"),
            Auth::ApiKey { email, .. } => write!(f, "ApiKey({}, ***)", email),
        }
    }
}

/// Maps a fleet group onto a DNS name inside the zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMapping {
    #[serde(alias = "name")]
    pub fleet_group: String,

    /// `@` for the zone apex, otherwise a subdomain label.
    pub sub: String,

    #[serde(default = "default_srv_value")]
    pub priority: u16,

    #[serde(default = "default_srv_value")]
    pub weight: u16,
}

fn default_srv_value() -> u16 {
    1
}

impl GroupMapping {
    pub fn new(fleet_group: &str, sub: &str) -> Self {
        Self {
            fleet_group: fleet_group.to_string(),
            sub: sub.to_string(),
            priority: default_srv_value(),
            weight: default_srv_value(),
        }
    }

    pub fn is_apex(&self) -> bool {
        self.sub.starts_with('@')
    }

    pub fn target_subdomain(&self, domain_name: &str) -> String {
        if self.is_apex() {
            domain_name.to_string()
        } else {
            format!("{}.{}", self.sub, domain_name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    pub domain_name: String,

    pub zone_id: String,

    pub authentication: Auth,

    #[serde(default)]
    pub ttl: RecordTTL,

    #[serde(default)]
    pub groups: Vec<GroupMapping>,
}

fn default_enabled() -> bool {
    true
}

impl ZoneConfig {
    /// First mapping for `group`, if any.
    pub fn mapping(&self, group: &str) -> Option<&GroupMapping> {
        self.groups.iter().find(|m| m.fleet_group == group)
    }

    pub fn serves_any<S: AsRef<str>>(&self, groups: &[S]) -> bool {
        groups.iter().any(|g| self.mapping(g.as_ref()).is_some())
    }

    pub fn qualify(&self, label: &str) -> String {
        format!("{}.{}", label, self.domain_name)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if self.domain_name.trim().is_empty() {
            return Err(Error::Config(format!(
                "zone {}: domain_name must not be empty",
                self.zone_id
            )));
        }

        if self.zone_id.trim().is_empty() {
            return Err(Error::Config(format!(
                "zone {}: zone_id must not be empty",
                self.domain_name
            )));
        }

        let mut seen = HashSet::new();
        for mapping in &self.groups {
            if !seen.insert(mapping.fleet_group.as_str()) {
                return Err(Error::Config(format!(
                    "zone {}: group {} is mapped more than once",
                    self.domain_name, mapping.fleet_group
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(groups: Vec<GroupMapping>) -> ZoneConfig {
        ZoneConfig {
            enabled: true,
            domain_name: "example.com".to_string(),
            zone_id: "zone-1".to_string(),
            authentication: Auth::ApiToken("t".to_string()),
            ttl: RecordTTL::Auto,
            groups,
        }
    }

    #[test]
    fn test_target_subdomain() {
        let apex = GroupMapping::new("Lobby", "@");
        assert_eq!(apex.target_subdomain("example.com"), "example.com");

        let lobby = GroupMapping::new("Lobby", "lobby");
        assert_eq!(lobby.target_subdomain("example.com"), "lobby.example.com");
    }

    #[test]
    fn test_mapping_first_match_wins() {
        let z = zone(vec![
            GroupMapping::new("Lobby", "a"),
            GroupMapping::new("Lobby", "b"),
        ]);
        assert_eq!(z.mapping("Lobby").unwrap().sub, "a");
        assert!(z.mapping("Bedwars").is_none());
        assert!(z.serves_any(&["Bedwars", "Lobby"]));
        assert!(!z.serves_any(&["Bedwars"]));
    }

    #[test]
    fn test_validate() {
        assert!(zone(vec![GroupMapping::new("Lobby", "@")]).validate().is_ok());

        let dup = zone(vec![
            GroupMapping::new("Lobby", "a"),
            GroupMapping::new("Lobby", "b"),
        ]);
        assert!(matches!(dup.validate(), Err(Error::Config(_))));

        let mut empty = zone(vec![]);
        empty.zone_id = String::new();
        assert!(matches!(empty.validate(), Err(Error::Config(_))));

        empty.enabled = false;
        assert!(empty.validate().is_ok());
    }

    #[test]
    fn test_zone_deserialize() {
        let yaml = r#"
domain_name: example.com
zone_id: "023e105f4ecef8ad9ca31a8372d0c353"
authentication:
  type: api_key
  value:
    email: "test@example.com"
    key: "1234567890"
ttl: 120
groups:
  - name: Lobby
    sub: "@"
  - fleet_group: Bedwars
    sub: bw
    priority: 5
"#;
        let z: ZoneConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(z.enabled);
        assert_eq!(z.ttl, RecordTTL::Value(120));
        assert_eq!(
            z.authentication,
            Auth::ApiKey {
                email: "test@example.com".to_string(),
                key: "1234567890".to_string()
            }
        );
        assert_eq!(z.groups[0].fleet_group, "Lobby");
        assert!(z.groups[0].is_apex());
        assert_eq!(z.groups[1].priority, 5);
        assert_eq!(z.groups[1].weight, 1);
    }

    #[test]
    fn test_auth_debug_hides_secret() {
        let auth = Auth::ApiKey {
            email: "a@b.c".to_string(),
            key: "secret".to_string(),
        };
        assert!(!format!("{:?}", auth).contains("secret"));
    }
}
