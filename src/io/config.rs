//! Read `EstimatorArgs` JSON files.
//!
//! Every key is optional; missing keys take their defaults. Values are checked
//! later, against the methods that will actually read them.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::domain::EstimatorArgs;
use crate::error::EstimatorError;

/// Read estimator args from a JSON file.
pub fn read_args_json(path: &Path) -> Result<EstimatorArgs, EstimatorError> {
    let file = File::open(path).map_err(|source| EstimatorError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| EstimatorError::Config {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("irm-config-{}-{name}.json", std::process::id()))
    }

    #[test]
    fn present_keys_override_defaults() {
        let path = temp_path("keys");
        std::fs::write(&path, r#"{"lr": 0.01, "n_iterations": 500, "reg_grid": [0.0, 0.5]}"#).unwrap();
        let args = read_args_json(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!((args.lr - 0.01).abs() < 1e-15);
        assert_eq!(args.n_iterations, 500);
        assert_eq!(args.reg_grid, vec![0.0, 0.5]);
        assert_eq!(args.n_classifiers, EstimatorArgs::default().n_classifiers);
    }

    #[test]
    fn invalid_json_maps_to_config_error() {
        let path = temp_path("invalid");
        std::fs::write(&path, "{ not json").unwrap();
        let err = read_args_json(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(matches!(err, EstimatorError::Config { .. }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn values_for_other_methods_are_not_checked_on_load() {
        // An IRM-only config may carry an alpha ICP would reject.
        let path = temp_path("other-method");
        std::fs::write(&path, r#"{"alpha": -1.0}"#).unwrap();
        let args = read_args_json(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert!(args.validate_irm().is_ok());
        assert!(args.validate_icp().is_err());
    }

    #[test]
    fn missing_file_maps_to_io_error() {
        let err = read_args_json(Path::new("/nonexistent/irm/args.json")).unwrap_err();
        assert_eq!(err.exit_code(), 5);
    }
}
