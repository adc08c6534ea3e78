pub mod client;
pub mod dashboard;
pub mod endpoint;
pub mod normalize;
pub mod render;

pub mod config {
    use anyhow::Context;
    use std::fmt;
    use std::path::{Path, PathBuf};

    pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_API_KEY_FILE: &str = "API_KEY";
    pub const DEFAULT_PORT: u16 = 3000;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub alphavantage_api_key: Option<String>,
        pub api_key_file: PathBuf,
        pub base_url: String,
        pub timeout_secs: u64,
        pub sentry_dsn: Option<String>,
        pub port: u16,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let timeout_secs = match std::env::var("ALPHAVANTAGE_TIMEOUT_SECS") {
                Ok(s) => s
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("ALPHAVANTAGE_TIMEOUT_SECS is not a number: {s}"))?,
                Err(_) => DEFAULT_TIMEOUT_SECS,
            };

            Ok(Self {
                alphavantage_api_key: std::env::var("ALPHAVANTAGE_API_KEY")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
                api_key_file: std::env::var("ALPHAVANTAGE_API_KEY_FILE")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_API_KEY_FILE)),
                base_url: std::env::var("ALPHAVANTAGE_BASE_URL")
                    .ok()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                timeout_secs,
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                port: std::env::var("PORT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_PORT),
            })
        }

        /// Resolves the API key: hosted secret (`ALPHAVANTAGE_API_KEY`) first, then the
        /// local key file. Missing both is fatal for the caller.
        pub fn resolve_api_key(&self) -> anyhow::Result<ApiKey> {
            if let Some(key) = self.alphavantage_api_key.as_deref() {
                return Ok(ApiKey::new(key.trim(), KeySource::HostedSecret));
            }

            match read_key_file(&self.api_key_file)? {
                Some(key) => Ok(ApiKey::new(
                    &key,
                    KeySource::LocalFile(self.api_key_file.clone()),
                )),
                None => anyhow::bail!(
                    "API key not found: set ALPHAVANTAGE_API_KEY or create {} for local runs",
                    self.api_key_file.display()
                ),
            }
        }
    }

    fn read_key_file(path: &Path) -> anyhow::Result<Option<String>> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| format!("failed to read {}", path.display()))
            }
        };
        Ok(parse_key_file(&text))
    }

    /// Accepts either a bare key or an `api_key = "..."` assignment line.
    pub(crate) fn parse_key_file(text: &str) -> Option<String> {
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let value = match line.split_once('=') {
                Some((name, value)) if name.trim() == "api_key" => value.trim(),
                Some(_) => continue,
                None => line,
            };
            let value = value.trim_matches(|c| c == '"' || c == '\'').trim();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
        None
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum KeySource {
        HostedSecret,
        LocalFile(PathBuf),
    }

    impl fmt::Display for KeySource {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                KeySource::HostedSecret => write!(f, "hosted secret ALPHAVANTAGE_API_KEY"),
                KeySource::LocalFile(path) => write!(f, "local file {}", path.display()),
            }
        }
    }

    #[derive(Clone, PartialEq, Eq)]
    pub struct ApiKey {
        secret: String,
        source: KeySource,
    }

    impl ApiKey {
        pub fn new(secret: &str, source: KeySource) -> Self {
            Self {
                secret: secret.to_string(),
                source,
            }
        }

        pub fn expose(&self) -> &str {
            &self.secret
        }

        pub fn source(&self) -> &KeySource {
            &self.source
        }
    }

    impl fmt::Debug for ApiKey {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("ApiKey")
                .field("secret", &"***")
                .field("source", &self.source)
                .finish()
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn settings(key: Option<&str>, file: PathBuf) -> Settings {
            Settings {
                alphavantage_api_key: key.map(str::to_string),
                api_key_file: file,
                base_url: DEFAULT_BASE_URL.to_string(),
                timeout_secs: DEFAULT_TIMEOUT_SECS,
                sentry_dsn: None,
                port: DEFAULT_PORT,
            }
        }

        fn temp_key_file(name: &str, contents: &str) -> PathBuf {
            let path = std::env::temp_dir().join(format!(
                "vantage-key-{}-{name}",
                std::process::id()
            ));
            std::fs::write(&path, contents).unwrap();
            path
        }

        #[test]
        fn hosted_secret_wins_over_local_file() {
            let file = temp_key_file("both", "FROMFILE\n");
            let key = settings(Some("HOSTED"), file.clone())
                .resolve_api_key()
                .unwrap();
            assert_eq!(key.expose(), "HOSTED");
            assert_eq!(key.source(), &KeySource::HostedSecret);
            std::fs::remove_file(file).ok();
        }

        #[test]
        fn falls_back_to_local_file() {
            let file = temp_key_file("local", "  FROMFILE  \n");
            let key = settings(None, file.clone()).resolve_api_key().unwrap();
            assert_eq!(key.expose(), "FROMFILE");
            assert_eq!(key.source(), &KeySource::LocalFile(file.clone()));
            std::fs::remove_file(file).ok();
        }

        #[test]
        fn missing_both_sources_is_an_error() {
            let file = std::env::temp_dir().join("vantage-key-does-not-exist");
            let err = settings(None, file).resolve_api_key().unwrap_err();
            let msg = format!("{err:#}");
            assert!(msg.contains("ALPHAVANTAGE_API_KEY"), "{msg}");
        }

        #[test]
        fn parses_assignment_style_key_file() {
            let text = "# local dev key\napi_key = \"demo123\"\n";
            assert_eq!(parse_key_file(text).as_deref(), Some("demo123"));
            assert_eq!(parse_key_file("\n\n").as_deref(), None);
            assert_eq!(parse_key_file("other = \"x\"\n").as_deref(), None);
        }

        #[test]
        fn debug_output_redacts_secret() {
            let key = ApiKey::new("supersecret", KeySource::HostedSecret);
            let shown = format!("{key:?}");
            assert!(!shown.contains("supersecret"));
        }
    }
}
