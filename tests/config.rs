use std::time::Duration;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;
use xc_harvest::config::{Config, ConfigLoader, ConfigOverrides};
use xc_harvest::error::HarvestError;

fn species_config() -> Config {
    Config {
        species: vec!["Otus sunia".to_string(), " Caprimulgus jotaka ".to_string()],
        country: Some("China".to_string()),
        quality: Some("q:A".to_string()),
        output_dir: Some("birds".to_string()),
        api_key: Some("from-file".to_string()),
        ..Config::default()
    }
}

#[test]
fn parse_config_file_shape() {
    let json = r#"{
        "species": ["Otus sunia"],
        "country": "China",
        "quality": "q:A",
        "request_delay_secs": 0.5,
        "max_component_length": 60
    }"#;
    let config: Config = serde_json::from_str(json).unwrap();
    let resolved = ConfigLoader::resolve_config(config, ConfigOverrides::default()).unwrap();
    assert_eq!(resolved.species, vec!["Otus sunia".to_string()]);
    assert_eq!(resolved.request_delay, Duration::from_millis(500));
    assert_eq!(resolved.limits.recording, 60);
    assert_eq!(resolved.limits.species, 50);
    assert!(resolved.api_key.is_none());
}

#[test]
fn overrides_win_over_file() {
    let overrides = ConfigOverrides {
        country: Some("Japan".to_string()),
        quality: None,
        output_dir: Some("elsewhere".to_string()),
        api_key: Some("from-env".to_string()),
    };
    let resolved = ConfigLoader::resolve_config(species_config(), overrides).unwrap();
    assert_eq!(resolved.species[1], "Caprimulgus jotaka");
    assert_eq!(resolved.country.as_deref(), Some("Japan"));
    assert_eq!(resolved.quality.as_deref(), Some("q:A"));
    assert_eq!(resolved.output_dir, Utf8PathBuf::from("elsewhere"));
    assert_eq!(resolved.api_key.as_deref(), Some("from-env"));
}

#[test]
fn empty_species_list_is_invalid() {
    let config = Config {
        species: vec!["  ".to_string()],
        ..Config::default()
    };
    assert_matches!(
        ConfigLoader::resolve_config(config, ConfigOverrides::default()),
        Err(HarvestError::InvalidConfig(_))
    );
}

#[test]
fn negative_delay_is_invalid() {
    let config = Config {
        request_delay_secs: Some(-1.0),
        ..species_config()
    };
    let err = ConfigLoader::resolve_config(config, ConfigOverrides::default()).unwrap_err();
    assert_matches!(err, HarvestError::InvalidConfig(_));
    assert!(err.is_fatal());
}

#[test]
fn zero_component_length_is_invalid() {
    let config = Config {
        species_component_length: Some(0),
        ..species_config()
    };
    assert_matches!(
        ConfigLoader::resolve_config(config, ConfigOverrides::default()),
        Err(HarvestError::InvalidConfig(_))
    );
}

#[test]
fn unreadable_and_malformed_files() {
    let temp = tempfile::tempdir().unwrap();
    let missing = temp.path().join("absent.json");
    assert_matches!(
        ConfigLoader::resolve(missing.to_str(), ConfigOverrides::default()),
        Err(HarvestError::ConfigRead(_))
    );

    let broken = temp.path().join("broken.json");
    std::fs::write(&broken, "{ species: ").unwrap();
    assert_matches!(
        ConfigLoader::resolve(broken.to_str(), ConfigOverrides::default()),
        Err(HarvestError::ConfigParse(_))
    );
}
