use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::SaopayConfig;

pub const DEFAULT_CONFIG_PATHS: &[&str] = &["saopay.toml", "config/saopay.toml"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// 显式路径不存在时报错；未指定时依次查找默认路径，都不存在则使用默认配置。
pub fn load_config(path: Option<PathBuf>) -> Result<SaopayConfig, ConfigError> {
    let config = match path {
        Some(explicit) => match try_load_file(&explicit)? {
            Some(config) => config,
            None => {
                return Err(ConfigError::Io {
                    path: explicit,
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                });
            }
        },
        None => load_first_default()?,
    };
    config.validate()?;
    Ok(config)
}

fn load_first_default() -> Result<SaopayConfig, ConfigError> {
    for candidate in DEFAULT_CONFIG_PATHS.iter().map(PathBuf::from) {
        if let Some(config) = try_load_file(&candidate)? {
            return Ok(config);
        }
    }
    Ok(SaopayConfig::default())
}

fn try_load_file(path: &Path) -> Result<Option<SaopayConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config: SaopayConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Some(config))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn explicit_path_is_loaded_and_validated() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[global]\nrpc_urls = [\"https://rpc-a.example\", \"https://rpc-b.example\"]\n\n[fees]\npercent_to_charge = \"2.5\"\n"
        )
        .unwrap();

        let config = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.global.rpc_urls.len(), 2);
        assert_eq!(config.fees.percent_to_charge.to_string(), "2.5");
    }

    #[test]
    fn missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn malformed_toml_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[global\nrpc_urls = 1").unwrap();
        let err = load_config(Some(file.path().to_path_buf())).unwrap_err();
        match err {
            ConfigError::Parse { path, .. } => assert_eq!(path, file.path()),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rates]\nrefresh_interval_secs = 0").unwrap();
        let err = load_config(Some(file.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
