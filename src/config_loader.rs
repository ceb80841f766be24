use crate::config::{AttackKind, Config};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use log::{debug, info};
use std::path::Path;
use std::time::Duration;

/// Load and parse configuration from a YAML file
pub fn load_config(config_path: &Path) -> Result<Config> {
    info!("Loading configuration from: {:?}", config_path);

    let content = std::fs::read_to_string(config_path)
        .wrap_err_with(|| format!("Failed to read configuration file {}", config_path.display()))?;

    // An empty document selects the reference scenario
    let config: Config = if content.trim().is_empty() {
        debug!("Configuration file is empty, using defaults");
        Config::default()
    } else {
        serde_yaml::from_str(&content)
            .wrap_err_with(|| format!("Failed to parse configuration file {}", config_path.display()))?
    };

    config.validate()?;

    Ok(config)
}

/// Load `config_path` when given, otherwise start from the reference scenario
pub fn load_or_default(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(path) => load_config(path),
        None => {
            info!("No configuration file given, using the reference scenario");
            Ok(Config::default())
        }
    }
}

/// CLI arguments that can override YAML settings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub sensors: Option<u32>,
    pub sim_duration: Option<Duration>,
    pub attack: Option<AttackKind>,
    pub attack_start: Option<Duration>,
    pub attack_stop: Option<Duration>,
    pub seed: Option<u64>,
}

/// Apply CLI overrides to a configuration
pub fn apply_overrides(config: &mut Config, overrides: &CliOverrides) -> Result<()> {
    if let Some(sensors) = overrides.sensors {
        info!("Overriding sensor count: {} -> {}", config.sensors.count, sensors);
        config.sensors.count = sensors;
    }

    if let Some(sim_duration) = overrides.sim_duration {
        info!(
            "Overriding simulation duration: {:?} -> {:?}",
            config.general.sim_duration, sim_duration
        );
        config.general.sim_duration = sim_duration;
    }

    if let Some(attack) = overrides.attack {
        info!("Overriding attack mode: {} -> {}", config.attack.mode, attack);
        config.attack.mode = attack;
    }

    if let Some(start) = overrides.attack_start {
        config.attack.start = Some(start);
    }
    if let Some(stop) = overrides.attack_stop {
        config.attack.stop = Some(stop);
    }

    if let Some(seed) = overrides.seed {
        config.general.seed = seed;
    }

    // Re-validate after applying overrides
    config.validate()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::DataRate;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config() {
        let yaml = r#"
general:
  sim_duration: "30s"
  seed: 7
network:
  bandwidth: "10Mbps"
  delay: "2us"
sensors:
  count: 8
  rate: "16kbps"
attack:
  mode: flooder
  start: "5s"
  stop: "25s"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.general.sim_duration, Duration::from_secs(30));
        assert_eq!(config.general.seed, 7);
        assert_eq!(config.network.bandwidth, DataRate::from_mbps(10));
        assert_eq!(config.network.delay, Duration::from_micros(2));
        assert_eq!(config.network.queue_capacity, 100);
        assert_eq!(config.sensors.count, 8);
        assert_eq!(config.sensors.rate, DataRate::from_kbps(16));
        assert_eq!(config.sensors.payload_size, 64);
        assert_eq!(config.attack.mode, AttackKind::Flooder);
        assert_eq!(config.attack_window(), Some((Duration::from_secs(5), Duration::from_secs(25))));
    }

    #[test]
    fn test_empty_file_gives_reference_scenario() {
        let temp_file = NamedTempFile::new().unwrap();
        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let yaml = r#"
attack:
  mode: jammer
  start: "50s"
  stop: "10s"
"#;
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "{}", yaml).unwrap();
        assert!(load_config(temp_file.path()).is_err());
    }

    #[test]
    fn test_malformed_yaml_rejected() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "network:\n  bandwidth: \"fast\"\n").unwrap();
        let err = load_config(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse configuration file"));
    }

    #[test]
    fn test_missing_file() {
        assert!(load_config(Path::new("/nonexistent/bussim.yaml")).is_err());
        assert_eq!(load_or_default(None).unwrap(), Config::default());
    }

    #[test]
    fn test_apply_overrides() {
        let mut config = Config::default();
        let overrides = CliOverrides {
            sensors: Some(10),
            sim_duration: Some(Duration::from_secs(120)),
            attack: Some(AttackKind::None),
            seed: Some(42),
            ..CliOverrides::default()
        };

        apply_overrides(&mut config, &overrides).unwrap();
        assert_eq!(config.sensors.count, 10);
        assert_eq!(config.general.sim_duration, Duration::from_secs(120));
        assert_eq!(config.attack.mode, AttackKind::None);
        assert_eq!(config.general.seed, 42);
        assert_eq!(config.attack_mode().unwrap(), None);
    }

    #[test]
    fn test_overrides_are_revalidated() {
        let mut config = Config::default();
        let overrides = CliOverrides {
            attack_start: Some(Duration::from_secs(30)),
            attack_stop: Some(Duration::from_secs(20)),
            ..CliOverrides::default()
        };
        assert!(apply_overrides(&mut config, &overrides).is_err());
    }
}
