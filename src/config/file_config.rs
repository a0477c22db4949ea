use crate::error::ConfigError;
use ini::{Ini, ParseOption, Properties};
use std::path::Path;

/// Raw key-value view of the INI config file. Lookups go through
/// [`FileConfig::require`], which enforces that every value is present.
pub struct FileConfig {
    ini: Ini,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        // Passwords may contain quotes and backslashes, keep them verbatim.
        let options = ParseOption {
            enabled_quote: false,
            enabled_escape: false,
            ..ParseOption::default()
        };
        let ini = Ini::load_from_str_opt(content, options)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(FileConfig { ini })
    }

    fn properties(&self, section: &str) -> Option<&Properties> {
        self.ini.section(Some(section))
    }

    /// Case-insensitive key lookup, empty values count as absent.
    pub fn get(&self, section: &'static str, key: &'static str) -> Option<String> {
        self.properties(section)?
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| unquote(v.trim()).to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn require(&self, section: &'static str, key: &'static str) -> Result<String, ConfigError> {
        self.get(section, key)
            .ok_or(ConfigError::MissingKey { section, key })
    }
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .unwrap_or(value)
}
