//! Parameter file discovery and loading

use std::fs;
use std::path::{Path, PathBuf};

use smokesim_core::config::{EventBuilder, SimulationBuilder, SimulationConfig, TreatmentBuilder};
use smokesim_core::error::ConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("invalid parameters in {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    #[error("failed to serialize template: {0}")]
    Serialize(String),
}

fn is_parameter_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "yaml" || ext == "yml")
}

/// Expand the given paths into parameter files.
///
/// Files are taken as given; directories contribute their `*.yaml` and
/// `*.yml` entries in name order. Unreadable directories are logged and
/// skipped.
pub fn discover_parameter_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if !path.is_dir() {
            files.push(path.clone());
            continue;
        }
        match fs::read_dir(path) {
            Ok(entries) => {
                let mut found: Vec<PathBuf> = entries
                    .flatten()
                    .map(|entry| entry.path())
                    .filter(|p| p.is_file() && is_parameter_file(p))
                    .collect();
                found.sort();
                if found.is_empty() {
                    tracing::warn!(dir = %path.display(), "No parameter files found");
                }
                files.extend(found);
            }
            Err(e) => {
                tracing::warn!(dir = %path.display(), error = %e, "Failed to read directory");
            }
        }
    }
    files
}

pub fn parse_config(path: &Path, yaml: &str) -> Result<SimulationConfig, LoadError> {
    let config: SimulationConfig = serde_saphyr::from_str(yaml).map_err(|e| LoadError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    config.validate().map_err(|source| LoadError::Invalid {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(config)
}

/// Read, parse and validate one parameter file
pub fn load_config(path: &Path) -> Result<SimulationConfig, LoadError> {
    let yaml = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(path, &yaml)
}

/// A quiescent parameter set with one example of every definition kind
pub fn template_config() -> Result<SimulationConfig, ConfigError> {
    SimulationBuilder::new()
        .event(EventBuilder::new("Example Event"))
        .intervention(TreatmentBuilder::new("Example Intervention"))
        .prophylaxis(TreatmentBuilder::new("Example Prophylaxis"))
        .build()
}

pub fn template_yaml() -> Result<String, LoadError> {
    let config = template_config().map_err(|e| LoadError::Serialize(e.to_string()))?;
    serde_saphyr::to_string(&config).map_err(|e| LoadError::Serialize(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_discovers_yaml_in_directory() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.yaml"), "").unwrap();
        fs::write(dir.path().join("a.yml"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = discover_parameter_files(&[dir.path().to_path_buf()]);
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.yml", "b.yaml"]);
    }

    #[test]
    fn test_explicit_file_kept() {
        let files = discover_parameter_files(&[PathBuf::from("cohort.yaml")]);
        assert_eq!(files, vec![PathBuf::from("cohort.yaml")]);
    }

    #[test]
    fn test_template_round_trips() {
        let yaml = template_yaml().unwrap();
        let config = parse_config(Path::new("template.yaml"), &yaml).unwrap();
        assert_eq!(config, template_config().unwrap());
        assert_eq!(config.events[0].name, "Example Event");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let yaml = "run:\n  run_size: 25\n  max_age_years: 90\n";
        let config = parse_config(Path::new("partial.yaml"), yaml).unwrap();
        assert_eq!(config.run.run_size, 25);
        assert_eq!(config.run.max_age_years, 90);
        assert!(config.events.is_empty());
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let yaml = "run:\n  run_size: 0\n";
        let err = parse_config(Path::new("bad.yaml"), yaml).unwrap_err();
        assert!(matches!(err, LoadError::Invalid { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let err = load_config(&dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }
}
