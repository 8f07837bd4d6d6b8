use anyhow::Context;
use numguess_core::{Address, LotteryConfig};
use std::path::{Path, PathBuf};

const RPC_URL_ENV: &str = "NUMGUESS_RPC_URL";

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub rpc_url: Option<String>,
    pub contract: Option<String>,
    pub no_animation: bool,
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("numguess")
        .join("config.json")
}

/// Resolve the effective config: file, then environment, then flags.
///
/// An explicitly given file must exist; the default location is optional.
pub fn load(path: Option<&Path>, overrides: Overrides) -> anyhow::Result<LotteryConfig> {
    let mut config = match path {
        Some(path) => LotteryConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            let default_path = default_config_path();
            if default_path.exists() {
                LotteryConfig::from_file(&default_path).with_context(|| {
                    format!("Failed to load config from {}", default_path.display())
                })?
            } else {
                LotteryConfig::default()
            }
        }
    };

    let env_url = std::env::var(RPC_URL_ENV).ok().filter(|url| !url.is_empty());
    apply(&mut config, overrides, env_url)?;
    config.validate()?;
    Ok(config)
}

fn apply(
    config: &mut LotteryConfig,
    overrides: Overrides,
    env_url: Option<String>,
) -> anyhow::Result<()> {
    if let Some(url) = overrides.rpc_url.or(env_url) {
        config.rpc_url = Some(url);
    }
    if let Some(contract) = overrides.contract {
        let address: Address = contract.parse()?;
        config.contract_address = address;
    }
    if overrides.no_animation {
        config.animate = false;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_flags_override_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"rpc_url": "http://file:8545"}}"#).unwrap();

        let overrides = Overrides {
            rpc_url: Some("http://flag:8545".to_string()),
            contract: Some("0x00000000000000000000000000000000000000Aa".to_string()),
            no_animation: true,
        };
        let config = load(Some(file.path()), overrides).unwrap();
        assert_eq!(config.rpc_url.as_deref(), Some("http://flag:8545"));
        assert_eq!(
            config.contract_address.to_string(),
            "0x00000000000000000000000000000000000000aa"
        );
        assert!(!config.animate);
    }

    #[test]
    fn test_env_used_when_flag_missing() {
        let mut config = LotteryConfig::default();
        apply(
            &mut config,
            Overrides::default(),
            Some("http://env:8545".to_string()),
        )
        .unwrap();
        assert_eq!(config.rpc_url.as_deref(), Some("http://env:8545"));
    }

    #[test]
    fn test_bad_contract_rejected() {
        let mut config = LotteryConfig::default();
        let overrides = Overrides {
            contract: Some("0x1234".to_string()),
            ..Overrides::default()
        };
        assert!(apply(&mut config, overrides, None).is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(load(Some(&missing), Overrides::default()).is_err());
    }
}
