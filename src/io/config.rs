//! JSON run configuration files.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::domain::RunConfig;
use crate::error::PanelError;

/// Read a `RunConfig` from JSON. Omitted fields take their defaults.
pub fn load_run_config(path: &Path) -> Result<RunConfig, PanelError> {
    let file = File::open(path)
        .map_err(|e| PanelError::Config(format!("failed to open config '{}': {e}", path.display())))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| PanelError::Config(format!("invalid config '{}': {e}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StrategyKind;
    use crate::domain::schema::GDP;

    #[test]
    fn partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(
            &path,
            r#"{"end_year": 2040, "strategies": {"gdp_usd_bn": "average_growth"}}"#,
        )
        .unwrap();

        let config = load_run_config(&path).unwrap();
        assert_eq!(config.start_year, 2000);
        assert_eq!(config.end_year, 2040);
        assert_eq!(config.strategies.len(), 1);
        assert_eq!(config.strategies[GDP], StrategyKind::AverageGrowth);
        // Replacing the strategy table drops the other assignments.
        assert!(config.resolve().is_err());
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_run_config(&path).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
