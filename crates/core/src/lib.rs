pub mod domain;
pub mod fixtures;
pub mod remote;
pub mod store;
pub mod time;
pub mod views;

pub mod config {
    use crate::domain::Role;
    use crate::fixtures::Seed;
    use anyhow::Context;
    use std::path::Path;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub sentry_dsn: Option<String>,
        pub seed_path: Option<String>,
        pub default_role: Option<String>,
        pub api_url: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                seed_path: std::env::var("WEALTHDESK_SEED_PATH").ok(),
                default_role: std::env::var("WEALTHDESK_DEFAULT_ROLE").ok(),
                api_url: std::env::var("WEALTHDESK_API_URL").ok(),
            })
        }

        pub fn require_api_url(&self) -> anyhow::Result<&str> {
            self.api_url
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .context("WEALTHDESK_API_URL is required")
        }

        pub fn default_role(&self) -> anyhow::Result<Option<Role>> {
            self.default_role
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.parse::<Role>())
                .transpose()
                .context("WEALTHDESK_DEFAULT_ROLE is invalid")
        }

        /// Seed file when configured, built-in demo records otherwise, with the
        /// default role override applied.
        pub fn load_seed(&self) -> anyhow::Result<Seed> {
            let mut seed = match self.seed_path.as_deref().filter(|s| !s.trim().is_empty()) {
                Some(path) => Seed::from_json_file(Path::new(path))?,
                None => Seed::demo(),
            };
            if let Some(role) = self.default_role()? {
                seed.current_role = role;
            }
            Ok(seed)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn settings() -> Settings {
            Settings {
                sentry_dsn: None,
                seed_path: None,
                default_role: None,
                api_url: None,
            }
        }

        #[test]
        fn demo_seed_without_overrides() {
            let seed = settings().load_seed().unwrap();
            assert_eq!(seed.current_role, Role::RelationshipManager);
            assert_eq!(seed.clients.len(), 4);
        }

        #[test]
        fn default_role_override_applies() {
            let settings = Settings {
                default_role: Some("admin".to_string()),
                ..settings()
            };
            assert_eq!(
                settings.load_seed().unwrap().current_role,
                Role::Administrator
            );
        }

        #[test]
        fn invalid_role_and_missing_url_are_errors() {
            let settings = Settings {
                default_role: Some("auditor".to_string()),
                ..settings()
            };
            assert!(settings.load_seed().is_err());
            assert!(settings.require_api_url().is_err());
        }

        #[test]
        fn blank_api_url_counts_as_unset() {
            let blank = Settings {
                api_url: Some("  ".to_string()),
                ..settings()
            };
            assert!(blank.require_api_url().is_err());

            let set = Settings {
                api_url: Some("http://localhost:3000".to_string()),
                ..settings()
            };
            assert_eq!(set.require_api_url().unwrap(), "http://localhost:3000");
        }

        #[test]
        fn missing_seed_file_is_an_error() {
            let settings = Settings {
                seed_path: Some("/nonexistent/wealthdesk-seed.json".to_string()),
                ..settings()
            };
            assert!(settings.load_seed().is_err());
        }
    }
}
