// Configuration loading and parsing (auction.toml, credentials.toml).

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::Category;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub rules: RulesConfig,
    pub credentials: CredentialsConfig,
    pub ws_port: u16,
    pub db_path: String,
}

// ---------------------------------------------------------------------------
// auction.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire auction.toml file.
#[derive(Debug, Clone, Deserialize)]
struct AuctionFile {
    league: LeagueConfig,
    #[serde(default)]
    rules: RulesConfig,
    websocket: WebsocketSection,
    database: DatabaseSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    /// Currency code shown on viewer surfaces (e.g. "NPR").
    pub currency: String,
    /// Franchises seeded into the store on first open, in display order.
    pub teams: Vec<TeamSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeamSeed {
    /// Stable key (e.g. "janakpur_bolts").
    pub name: String,
    pub display_name: String,
    /// Opening purse for the team.
    pub purse: i64,
}

/// Bid rule tables, keyed by category code. Both tables are externally
/// configurable; legacy revisions of the control surface disagreed on which
/// grade carries the larger increment, so nothing is hard-coded here.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    /// Maximum bid per category. A category absent from this table has no
    /// ceiling and bids unbounded. LT never appears here: bidding is disabled
    /// for LT players outright.
    pub ceilings: HashMap<String, i64>,
    /// Per-category increment overrides.
    pub increments: HashMap<String, i64>,
    /// Increment for categories without an override.
    pub default_increment: i64,
}

impl Default for RulesConfig {
    fn default() -> Self {
        let mut ceilings = HashMap::new();
        ceilings.insert("S".to_string(), 2_000_000);
        ceilings.insert("A".to_string(), 1_500_000);
        ceilings.insert("B".to_string(), 1_000_000);
        ceilings.insert("C".to_string(), 500_000);

        let mut increments = HashMap::new();
        increments.insert("A".to_string(), 50_000);

        RulesConfig {
            ceilings,
            increments,
            default_increment: 25_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct WebsocketSection {
    port: u16,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    /// Shared secret admin connections present before issuing mutating
    /// commands. When absent, every connection is treated as an admin
    /// (trusted-network mode).
    pub admin_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/auction.toml` and (optionally)
/// `config/credentials.toml`, relative to the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy defaults.
/// Prefer `load_config()` which handles default initialization automatically.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- auction.toml (required) ---
    let auction_path = config_dir.join("auction.toml");
    let auction_text = read_file(&auction_path)?;
    let auction_file: AuctionFile =
        toml::from_str(&auction_text).map_err(|e| ConfigError::ParseError {
            path: auction_path.clone(),
            source: e,
        })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        league: auction_file.league,
        rules: auction_file.rules,
        credentials,
        ws_port: auction_file.websocket.port,
        db_path: auction_file.database.path,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };

        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.league.teams.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "league.teams".into(),
            message: "at least one team must be configured".into(),
        });
    }

    let mut seen = std::collections::HashSet::new();
    for team in &config.league.teams {
        if team.name.is_empty() {
            return Err(ConfigError::ValidationError {
                field: "league.teams.name".into(),
                message: "team key must not be empty".into(),
            });
        }
        if !seen.insert(team.name.as_str()) {
            return Err(ConfigError::ValidationError {
                field: "league.teams.name".into(),
                message: format!("duplicate team key `{}`", team.name),
            });
        }
        if team.purse <= 0 {
            return Err(ConfigError::ValidationError {
                field: "league.teams.purse".into(),
                message: format!("must be > 0 for `{}`, got {}", team.name, team.purse),
            });
        }
    }

    if config.rules.default_increment <= 0 {
        return Err(ConfigError::ValidationError {
            field: "rules.default_increment".into(),
            message: format!("must be > 0, got {}", config.rules.default_increment),
        });
    }

    for (table, map) in [
        ("rules.ceilings", &config.rules.ceilings),
        ("rules.increments", &config.rules.increments),
    ] {
        for (code, value) in map {
            if Category::from_code(code).is_none() {
                return Err(ConfigError::ValidationError {
                    field: table.to_string(),
                    message: format!("unknown category code `{code}`"),
                });
            }
            if *value <= 0 {
                return Err(ConfigError::ValidationError {
                    field: table.to_string(),
                    message: format!("value for `{code}` must be > 0, got {value}"),
                });
            }
        }
    }

    // LT players are free/direct-assign; a configured LT ceiling would imply
    // bidding is possible for them.
    if config.rules.ceilings.contains_key("LT") {
        return Err(ConfigError::ValidationError {
            field: "rules.ceilings".into(),
            message: "LT players are not biddable; remove the LT ceiling".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const MINIMAL_AUCTION_TOML: &str = r#"
[league]
name = "Test League Auction"
currency = "NPR"

[[league.teams]]
name = "janakpur_bolts"
display_name = "Janakpur Bolts"
purse = 5000000

[[league.teams]]
name = "karnali_yaks"
display_name = "Karnali Yaks"
purse = 5000000

[websocket]
port = 9100

[database]
path = "auction-console.db"
"#;

    /// Helper: write an auction.toml (and optionally credentials.toml) into a
    /// fresh temp config dir and return the base dir.
    fn temp_base(tag: &str, auction_toml: &str, credentials: Option<&str>) -> PathBuf {
        let tmp = std::env::temp_dir().join(format!("auction_config_test_{tag}"));
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("auction.toml"), auction_toml).unwrap();
        if let Some(creds) = credentials {
            fs::write(config_dir.join("credentials.toml"), creds).unwrap();
        }
        tmp
    }

    #[test]
    fn load_minimal_config_with_default_rules() {
        let base = temp_base("minimal", MINIMAL_AUCTION_TOML, None);
        let config = load_config_from(&base).expect("should load valid config");

        assert_eq!(config.league.name, "Test League Auction");
        assert_eq!(config.league.currency, "NPR");
        assert_eq!(config.league.teams.len(), 2);
        assert_eq!(config.league.teams[0].name, "janakpur_bolts");
        assert_eq!(config.ws_port, 9100);
        assert_eq!(config.db_path, "auction-console.db");

        // Default rule tables: ceilings for the four priced categories,
        // grade A carries the larger increment.
        assert_eq!(config.rules.ceilings.get("S"), Some(&2_000_000));
        assert_eq!(config.rules.ceilings.get("C"), Some(&500_000));
        assert!(!config.rules.ceilings.contains_key("LT"));
        assert_eq!(config.rules.increments.get("A"), Some(&50_000));
        assert_eq!(config.rules.default_increment, 25_000);

        // No credentials.toml -> no token configured.
        assert!(config.credentials.admin_token.is_none());

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn explicit_rules_override_defaults() {
        let toml = format!(
            "{MINIMAL_AUCTION_TOML}
[rules]
default_increment = 10000

[rules.ceilings]
S = 3000000

[rules.increments]
C = 50000
"
        );
        let base = temp_base("rules_override", &toml, None);
        let config = load_config_from(&base).expect("should load");

        // An explicit [rules] table fully replaces the built-in tables.
        assert_eq!(config.rules.ceilings.get("S"), Some(&3_000_000));
        assert_eq!(config.rules.ceilings.get("A"), None);
        assert_eq!(config.rules.increments.get("C"), Some(&50_000));
        assert_eq!(config.rules.default_increment, 10_000);

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn credentials_toml_with_admin_token() {
        let base = temp_base(
            "with_creds",
            MINIMAL_AUCTION_TOML,
            Some("admin_token = \"sekrit\"\n"),
        );
        let config = load_config_from(&base).expect("should load");
        assert_eq!(config.credentials.admin_token.as_deref(), Some("sekrit"));
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn rejects_empty_team_list() {
        let toml = r#"
[league]
name = "Empty"
currency = "NPR"
teams = []

[websocket]
port = 9100

[database]
path = "x.db"
"#;
        let base = temp_base("no_teams", toml, None);
        let err = load_config_from(&base).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "league.teams"),
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn rejects_duplicate_team_keys() {
        let toml = r#"
[league]
name = "Dup"
currency = "NPR"

[[league.teams]]
name = "janakpur_bolts"
display_name = "Janakpur Bolts"
purse = 5000000

[[league.teams]]
name = "janakpur_bolts"
display_name = "Janakpur Bolts Again"
purse = 5000000

[websocket]
port = 9100

[database]
path = "x.db"
"#;
        let base = temp_base("dup_teams", toml, None);
        let err = load_config_from(&base).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, message } => {
                assert_eq!(field, "league.teams.name");
                assert!(message.contains("duplicate"));
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn rejects_nonpositive_purse() {
        let toml = MINIMAL_AUCTION_TOML.replacen("purse = 5000000", "purse = 0", 1);
        let base = temp_base("zero_purse", &toml, None);
        let err = load_config_from(&base).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "league.teams.purse");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn rejects_unknown_category_in_rules() {
        let toml = format!(
            "{MINIMAL_AUCTION_TOML}
[rules.ceilings]
Z = 1000000
"
        );
        let base = temp_base("bad_category", &toml, None);
        let err = load_config_from(&base).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, message } => {
                assert_eq!(field, "rules.ceilings");
                assert!(message.contains("`Z`"));
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn rejects_lt_ceiling() {
        let toml = format!(
            "{MINIMAL_AUCTION_TOML}
[rules.ceilings]
LT = 100000
"
        );
        let base = temp_base("lt_ceiling", &toml, None);
        let err = load_config_from(&base).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "rules.ceilings"),
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn file_not_found_for_missing_auction_toml() {
        let tmp = std::env::temp_dir().join("auction_config_test_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::FileNotFound { path } => {
                assert!(path.ends_with("auction.toml"));
            }
            other => panic!("expected FileNotFound, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let base = temp_base("invalid", "this is not valid [[[ toml", None);
        let err = load_config_from(&base).unwrap_err();
        match &err {
            ConfigError::ParseError { path, .. } => {
                assert!(path.ends_with("auction.toml"));
            }
            other => panic!("expected ParseError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn ensure_config_files_copies_missing_files() {
        let tmp = std::env::temp_dir().join("auction_config_test_ensure_copies");
        let _ = fs::remove_dir_all(&tmp);

        let defaults_dir = tmp.join("defaults");
        fs::create_dir_all(&defaults_dir).unwrap();
        fs::write(defaults_dir.join("auction.toml"), MINIMAL_AUCTION_TOML).unwrap();
        // Example file must NOT be copied
        fs::write(
            defaults_dir.join("credentials.toml.example"),
            "admin_token = \"change-me\"\n",
        )
        .unwrap();

        assert!(!tmp.join("config").exists());

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert_eq!(copied.len(), 1);
        assert!(tmp.join("config/auction.toml").exists());
        assert!(!tmp.join("config/credentials.toml.example").exists());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_skips_existing() {
        let tmp = std::env::temp_dir().join("auction_config_test_ensure_skips");
        let _ = fs::remove_dir_all(&tmp);

        let defaults_dir = tmp.join("defaults");
        let config_dir = tmp.join("config");
        fs::create_dir_all(&defaults_dir).unwrap();
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(defaults_dir.join("auction.toml"), MINIMAL_AUCTION_TOML).unwrap();

        // Pre-create auction.toml in config/ with custom content
        fs::write(config_dir.join("auction.toml"), "# custom\n").unwrap();

        let copied = ensure_config_files(&tmp).expect("should succeed");
        assert!(copied.is_empty());

        let content = fs::read_to_string(config_dir.join("auction.toml")).unwrap();
        assert_eq!(content, "# custom\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_when_both_dirs_missing() {
        let tmp = std::env::temp_dir().join("auction_config_test_both_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let err = ensure_config_files(&tmp).unwrap_err();
        match &err {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("neither defaults/ nor config/"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }
}
