//! Startup configuration.
//!
//! Everything is read once, before the store is opened, and handed to the coordinator as plain
//! values. Any missing or unreadable input fails fast with a `ConfigError`.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Indexer endpoint used when no indexer directory is configured (local development network).
pub const DEVNET_INDEXER_URL: &str = "http://localhost:8980";
pub const DEVNET_INDEXER_TOKEN: &str =
	"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";

/// Env-file key: directory holding `indexer.net` and `indexer.token` (empty for devnet).
pub const INDEXER_PATH_KEY: &str = "IndexerPath";
/// Env-file key shared with the other pool services: algod data directory (empty for devnet).
/// Only consulted when `IndexerPath` is absent.
pub const ALGOD_PATH_KEY: &str = "AlgodPath";
/// Env-file key: directory holding `App.json`.
pub const APP_SETUP_DIR_KEY: &str = "AppSetupDirPath";
/// Env-file key: location of the transaction store.
pub const TXNS_DB_PATH_KEY: &str = "TxnsDbPath";

const APP_FILE: &str = "App.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("failed to read {path:?}: {source}")]
	Io {
		path: PathBuf,
		source: std::io::Error,
	},

	#[error("missing configuration key {0}")]
	MissingKey(&'static str),

	#[error("failed to parse {path:?}: {source}")]
	Json {
		path: PathBuf,
		source: serde_json::Error,
	},
}

/// Indexer URL and API token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerEndpoint {
	pub url: String,
	pub token: String,
}

/// Deployment facts about the pool application, read from `App.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSetup {
	/// Application id of the pool contract.
	pub id: u64,
	/// Round in which the application was created; ingestion never starts below it.
	pub creation_block: u64,
}

/// Fully resolved configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
	pub indexer: IndexerEndpoint,
	pub app: AppSetup,
	pub db_path: PathBuf,
}

impl AppConfig {
	/// Resolve the configuration from an env file.
	pub fn load(env_file: &Path) -> Result<Self, ConfigError> {
		let env = load_env(env_file)?;

		let indexer = resolve_indexer_endpoint(&env)?;

		let app_file = Path::new(required(&env, APP_SETUP_DIR_KEY)?).join(APP_FILE);
		let app = load_app_setup(&app_file)?;

		Ok(Self {
			indexer,
			app,
			db_path: PathBuf::from(required(&env, TXNS_DB_PATH_KEY)?),
		})
	}
}

/// Pick the indexer endpoint.
///
/// `IndexerPath` wins when present. An env file without it but with an empty `AlgodPath` (the
/// shared local-network setup) gets the devnet indexer. A non-empty `AlgodPath` says nothing about
/// where the indexer lives, so `IndexerPath` is then required.
fn resolve_indexer_endpoint(env: &HashMap<String, String>) -> Result<IndexerEndpoint, ConfigError> {
	let indexer_dir = match env.get(INDEXER_PATH_KEY) {
		Some(dir) => dir.as_str(),
		None => match env.get(ALGOD_PATH_KEY) {
			Some(algod_dir) if algod_dir.is_empty() => {
				warn!(
					"{} not set; using the devnet indexer because {} is empty",
					INDEXER_PATH_KEY, ALGOD_PATH_KEY
				);
				""
			}
			_ => return Err(ConfigError::MissingKey(INDEXER_PATH_KEY)),
		},
	};

	if indexer_dir.is_empty() {
		Ok(devnet_indexer_endpoint())
	} else {
		read_indexer_endpoint_from_dir(Path::new(indexer_dir))
	}
}

fn required<'a>(env: &'a HashMap<String, String>, key: &'static str) -> Result<&'a str, ConfigError> {
	env.get(key)
		.map(String::as_str)
		.ok_or(ConfigError::MissingKey(key))
}

/// Read key-value pairs from an env file.
pub fn load_env(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
	let contents = read_file(path)?;
	Ok(parse_env(&contents))
}

/// Parse env-file contents.
///
/// Each line is `key=value`, a comment starting with `#` or `//`, or blank. Lines without an
/// `=` are logged and skipped. Quotes around values are stripped.
pub fn parse_env(contents: &str) -> HashMap<String, String> {
	let mut env = HashMap::new();

	for line in contents.lines() {
		let line = line.trim();
		if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
			continue;
		}

		let Some((key, value)) = line.split_once('=') else {
			warn!("Malformed line in env file: {}", line);
			continue;
		};

		let value = value.trim().trim_matches(|c| c == '\'' || c == '"');
		env.insert(key.trim().to_string(), value.to_string());
	}

	env
}

/// Local development network defaults.
pub fn devnet_indexer_endpoint() -> IndexerEndpoint {
	IndexerEndpoint {
		url: DEVNET_INDEXER_URL.to_string(),
		token: DEVNET_INDEXER_TOKEN.to_string(),
	}
}

/// Read the indexer address (`indexer.net`) and token (`indexer.token`) from a data directory.
pub fn read_indexer_endpoint_from_dir(dir: &Path) -> Result<IndexerEndpoint, ConfigError> {
	let address = read_file(&dir.join("indexer.net"))?;
	let token = read_file(&dir.join("indexer.token"))?;

	Ok(IndexerEndpoint {
		url: format!("http://{}", address.trim()),
		token: token.trim().to_string(),
	})
}

/// Read the application id and creation round from `App.json`.
pub fn load_app_setup(path: &Path) -> Result<AppSetup, ConfigError> {
	let contents = read_file(path)?;
	serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
		path: path.to_path_buf(),
		source,
	})
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
	std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
		path: path.to_path_buf(),
		source,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_env() {
		let env = parse_env(
			"# comment\n\
			 // another comment\n\
			 \n\
			 TxnsDbPath = \"./txns.db\"\n\
			 AppSetupDirPath='../setup'\n\
			 not a pair\n\
			 IndexerPath=\n\
			 Url=http://host/?a=b\n",
		);
		assert_eq!(env.get("TxnsDbPath").unwrap(), "./txns.db");
		assert_eq!(env.get("AppSetupDirPath").unwrap(), "../setup");
		assert_eq!(env.get("IndexerPath").unwrap(), "");
		assert_eq!(env.get("Url").unwrap(), "http://host/?a=b");
		assert_eq!(env.len(), 4);
	}

	#[test]
	fn test_load_full_config() {
		let dir = tempfile::tempdir().unwrap();
		let setup_dir = dir.path().join("setup");
		let indexer_dir = dir.path().join("indexer");
		std::fs::create_dir_all(&setup_dir).unwrap();
		std::fs::create_dir_all(&indexer_dir).unwrap();

		std::fs::write(
			setup_dir.join("App.json"),
			r#"{"id": 1234, "creationBlock": 42, "name": "pool"}"#,
		)
		.unwrap();
		std::fs::write(indexer_dir.join("indexer.net"), "127.0.0.1:8980\n").unwrap();
		std::fs::write(indexer_dir.join("indexer.token"), "secret\n").unwrap();

		let env_file = dir.path().join(".env");
		std::fs::write(
			&env_file,
			format!(
				"IndexerPath={}\nAppSetupDirPath={}\nTxnsDbPath=/tmp/txns.db\n",
				indexer_dir.display(),
				setup_dir.display()
			),
		)
		.unwrap();

		let config = AppConfig::load(&env_file).unwrap();
		assert_eq!(
			config.indexer,
			IndexerEndpoint {
				url: "http://127.0.0.1:8980".to_string(),
				token: "secret".to_string(),
			}
		);
		assert_eq!(
			config.app,
			AppSetup {
				id: 1234,
				creation_block: 42
			}
		);
		assert_eq!(config.db_path, PathBuf::from("/tmp/txns.db"));
	}

	#[test]
	fn test_empty_indexer_path_uses_devnet() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(
			dir.path().join("App.json"),
			r#"{"id": 1, "creationBlock": 0}"#,
		)
		.unwrap();
		let env_file = dir.path().join(".env");
		std::fs::write(
			&env_file,
			format!(
				"IndexerPath=\nAppSetupDirPath={}\nTxnsDbPath=txns.db\n",
				dir.path().display()
			),
		)
		.unwrap();

		let config = AppConfig::load(&env_file).unwrap();
		assert_eq!(config.indexer, devnet_indexer_endpoint());
	}

	#[test]
	fn test_shared_env_without_indexer_path() {
		let dir = tempfile::tempdir().unwrap();
		std::fs::write(
			dir.path().join("App.json"),
			r#"{"id": 1, "creationBlock": 0}"#,
		)
		.unwrap();
		let env_file = dir.path().join(".env");

		std::fs::write(
			&env_file,
			format!(
				"AlgodPath=\nAppSetupDirPath={}\nTxnsDbPath=txns.db\n",
				dir.path().display()
			),
		)
		.unwrap();
		let config = AppConfig::load(&env_file).unwrap();
		assert_eq!(config.indexer, devnet_indexer_endpoint());

		std::fs::write(
			&env_file,
			format!(
				"AlgodPath=/var/lib/algod\nAppSetupDirPath={}\nTxnsDbPath=txns.db\n",
				dir.path().display()
			),
		)
		.unwrap();
		assert!(matches!(
			AppConfig::load(&env_file),
			Err(ConfigError::MissingKey(INDEXER_PATH_KEY))
		));
	}

	#[test]
	fn test_missing_inputs_fail_fast() {
		let dir = tempfile::tempdir().unwrap();
		let env_file = dir.path().join(".env");
		std::fs::write(&env_file, "IndexerPath=\n").unwrap();
		assert!(matches!(
			AppConfig::load(&env_file),
			Err(ConfigError::MissingKey(APP_SETUP_DIR_KEY))
		));

		assert!(matches!(
			AppConfig::load(&dir.path().join("absent.env")),
			Err(ConfigError::Io { .. })
		));

		std::fs::write(dir.path().join("App.json"), "{\"id\": 1}").unwrap();
		assert!(matches!(
			load_app_setup(&dir.path().join("App.json")),
			Err(ConfigError::Json { .. })
		));
	}
}
