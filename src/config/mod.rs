mod file_config;

pub use file_config::FileConfig;

use crate::error::ConfigError;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Region of the source buckets when `[S3] REGION` is not set.
pub const DEFAULT_S3_REGION: &str = "us-west-2";

/// How the cluster connection negotiates TLS, libpq `sslmode` names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SslMode {
    Disable,
    /// Try TLS, fall back to plaintext when the server does not offer it.
    #[default]
    Prefer,
    Require,
    /// Require TLS with a certificate chain and host name the system trusts.
    VerifyFull,
}

impl FromStr for SslMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "disable" => Ok(SslMode::Disable),
            "prefer" => Ok(SslMode::Prefer),
            "require" => Ok(SslMode::Require),
            "verify-full" => Ok(SslMode::VerifyFull),
            _ => Err("expected one of disable, prefer, require, verify-full".to_string()),
        }
    }
}

/// Connection parameters of the warehouse cluster, `[CLUSTER]` section.
#[derive(Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    pub host: String,
    pub db_name: String,
    pub db_user: String,
    pub db_password: String,
    pub db_port: u16,
    pub ssl_mode: SslMode,
}

impl fmt::Debug for ClusterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterConfig")
            .field("host", &self.host)
            .field("db_name", &self.db_name)
            .field("db_user", &self.db_user)
            .field("db_password", &"<redacted>")
            .field("db_port", &self.db_port)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Object storage locations of the raw data, `[S3]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Config {
    pub log_data: String,
    pub log_jsonpath: String,
    pub song_data: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DwhConfig {
    pub cluster: ClusterConfig,
    /// ARN of the role the cluster assumes to read the buckets.
    pub iam_role_arn: String,
    pub s3: S3Config,
}

impl DwhConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::resolve(&FileConfig::load(path.as_ref())?)
    }

    pub fn from_ini_str(content: &str) -> Result<Self, ConfigError> {
        Self::resolve(&FileConfig::parse(content)?)
    }

    /// Every value is required, nothing is defaulted except the bucket region
    /// and the TLS mode.
    pub fn resolve(file: &FileConfig) -> Result<Self, ConfigError> {
        let db_port = file.require("CLUSTER", "DB_PORT")?;
        let db_port = db_port
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidValue {
                section: "CLUSTER",
                key: "DB_PORT",
                value: db_port.clone(),
                reason: e.to_string(),
            })?;

        let ssl_mode = match file.get("CLUSTER", "SSLMODE") {
            Some(value) => value.parse::<SslMode>().map_err(|reason| ConfigError::InvalidValue {
                section: "CLUSTER",
                key: "SSLMODE",
                value: value.clone(),
                reason,
            })?,
            None => SslMode::default(),
        };

        let cluster = ClusterConfig {
            host: file.require("CLUSTER", "HOST")?,
            db_name: file.require("CLUSTER", "DB_NAME")?,
            db_user: file.require("CLUSTER", "DB_USER")?,
            db_password: file.require("CLUSTER", "DB_PASSWORD")?,
            db_port,
            ssl_mode,
        };

        let s3 = S3Config {
            log_data: file.require("S3", "LOG_DATA")?,
            log_jsonpath: file.require("S3", "LOG_JSONPATH")?,
            song_data: file.require("S3", "SONG_DATA")?,
            region: file
                .get("S3", "REGION")
                .unwrap_or_else(|| DEFAULT_S3_REGION.to_string()),
        };

        Ok(DwhConfig {
            cluster,
            iam_role_arn: file.require("IAM_ROLE", "ARN")?,
            s3,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const FULL_CONFIG: &str = r#"
[CLUSTER]
HOST=dwhcluster.abc123.us-west-2.redshift.amazonaws.com
DB_NAME=dwh
DB_USER=dwhuser
DB_PASSWORD=Passw0rd
DB_PORT=5439

[IAM_ROLE]
ARN='arn:aws:iam::123456789012:role/dwhRole'

[S3]
LOG_DATA='s3://udacity-dend/log_data'
LOG_JSONPATH='s3://udacity-dend/log_json_path.json'
SONG_DATA='s3://udacity-dend/song_data'
"#;

    #[test]
    fn parses_full_config() {
        let config = DwhConfig::from_ini_str(FULL_CONFIG).unwrap();
        assert_eq!(
            config.cluster.host,
            "dwhcluster.abc123.us-west-2.redshift.amazonaws.com"
        );
        assert_eq!(config.cluster.db_name, "dwh");
        assert_eq!(config.cluster.db_user, "dwhuser");
        assert_eq!(config.cluster.db_password, "Passw0rd");
        assert_eq!(config.cluster.db_port, 5439);
        assert_eq!(config.iam_role_arn, "arn:aws:iam::123456789012:role/dwhRole");
        assert_eq!(config.s3.log_data, "s3://udacity-dend/log_data");
        assert_eq!(config.s3.log_jsonpath, "s3://udacity-dend/log_json_path.json");
        assert_eq!(config.s3.song_data, "s3://udacity-dend/song_data");
        assert_eq!(config.s3.region, DEFAULT_S3_REGION);
        assert_eq!(config.cluster.ssl_mode, SslMode::Prefer);
    }

    #[test]
    fn ssl_mode_can_be_set() {
        for (value, expected) in [
            ("disable", SslMode::Disable),
            ("prefer", SslMode::Prefer),
            ("REQUIRE", SslMode::Require),
            ("verify-full", SslMode::VerifyFull),
        ] {
            let content =
                FULL_CONFIG.replace("DB_PORT=5439", &format!("DB_PORT=5439\nSSLMODE={}", value));
            let config = DwhConfig::from_ini_str(&content).unwrap();
            assert_eq!(config.cluster.ssl_mode, expected);
        }
    }

    #[test]
    fn rejects_unknown_ssl_mode() {
        let content =
            FULL_CONFIG.replace("DB_PORT=5439", "DB_PORT=5439\nSSLMODE=allow-anything");
        assert!(matches!(
            DwhConfig::from_ini_str(&content),
            Err(ConfigError::InvalidValue { key: "SSLMODE", .. })
        ));
    }

    #[test]
    fn region_can_be_overridden() {
        let content = FULL_CONFIG.replace("[S3]\n", "[S3]\nREGION=eu-central-1\n");
        let config = DwhConfig::from_ini_str(&content).unwrap();
        assert_eq!(config.s3.region, "eu-central-1");
    }

    #[test]
    fn every_required_key_is_enforced() {
        for (section, key) in [
            ("CLUSTER", "HOST"),
            ("CLUSTER", "DB_NAME"),
            ("CLUSTER", "DB_USER"),
            ("CLUSTER", "DB_PASSWORD"),
            ("CLUSTER", "DB_PORT"),
            ("IAM_ROLE", "ARN"),
            ("S3", "LOG_DATA"),
            ("S3", "LOG_JSONPATH"),
            ("S3", "SONG_DATA"),
        ] {
            let content: String = FULL_CONFIG
                .lines()
                .filter(|line| !line.starts_with(&format!("{}=", key)))
                .collect::<Vec<_>>()
                .join("\n");
            match DwhConfig::from_ini_str(&content) {
                Err(ConfigError::MissingKey {
                    section: s,
                    key: k,
                }) => {
                    assert_eq!((s, k), (section, key));
                }
                other => panic!("expected missing {}.{}, got {:?}", section, key, other),
            }
        }
    }

    #[test]
    fn missing_section_is_reported_as_missing_key() {
        let content = FULL_CONFIG.replace("[IAM_ROLE]", "[SOMETHING_ELSE]");
        assert!(matches!(
            DwhConfig::from_ini_str(&content),
            Err(ConfigError::MissingKey {
                section: "IAM_ROLE",
                key: "ARN"
            })
        ));
    }

    #[test]
    fn rejects_non_numeric_port() {
        let content = FULL_CONFIG.replace("DB_PORT=5439", "DB_PORT=redshift");
        assert!(matches!(
            DwhConfig::from_ini_str(&content),
            Err(ConfigError::InvalidValue { key: "DB_PORT", .. })
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let result = DwhConfig::load(dir.path().join("dwh.cfg"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn loads_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(FULL_CONFIG.as_bytes()).unwrap();
        let config = DwhConfig::load(file.path()).unwrap();
        assert_eq!(config.cluster.db_port, 5439);
    }

    #[test]
    fn debug_output_redacts_password() {
        let config = DwhConfig::from_ini_str(FULL_CONFIG).unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("Passw0rd"));
        assert!(debug.contains("<redacted>"));
    }
}
