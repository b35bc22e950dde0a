//! INI file configuration adapter.

use crate::domain::error::BacktestError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BacktestError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| BacktestError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, BacktestError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| BacktestError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config
            .get(section, key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    const FULL_CONFIG: &str = r#"
[backtest]
symbol = BTCUSD
data_dir = ./data
initial_capital = 1000.0

[indicator]
rsi_window = 14
ma_window = 9

[strategy]
kind = stop_loss
stop_loss_pct = 1.5

[sweep]
rsi_windows = 7, 14 ,21
parallel = yes
"#;

    #[test]
    fn from_string_parses_config() {
        let adapter = FileConfigAdapter::from_string(FULL_CONFIG).unwrap();
        assert_eq!(
            adapter.get_string("backtest", "symbol"),
            Some("BTCUSD".to_string())
        );
        assert_eq!(
            adapter.get_string("strategy", "kind"),
            Some("stop_loss".to_string())
        );
        assert_eq!(
            adapter.get_string("indicator", "rsi_window"),
            Some("14".to_string())
        );
        assert_eq!(
            adapter.get_string("strategy", "stop_loss_pct"),
            Some("1.5".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_or_blank_key() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\nsymbol =\ninitial_capital = 100\n")
                .unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("backtest", "symbol"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_bool_values() {
        let adapter = FileConfigAdapter::from_string(
            "[sweep]\na = true\nb = yes\nc = 1\nd = false\ne = no\nf = 0\ng = maybe\n",
        )
        .unwrap();
        assert!(adapter.get_bool("sweep", "a", false));
        assert!(adapter.get_bool("sweep", "b", false));
        assert!(adapter.get_bool("sweep", "c", false));
        assert!(!adapter.get_bool("sweep", "d", true));
        assert!(!adapter.get_bool("sweep", "e", true));
        assert!(!adapter.get_bool("sweep", "f", true));
        assert!(adapter.get_bool("sweep", "g", true));
        assert!(!adapter.get_bool("sweep", "missing", false));
    }

    #[test]
    fn get_list_splits_and_trims() {
        let adapter = FileConfigAdapter::from_string(FULL_CONFIG).unwrap();
        assert_eq!(adapter.get_list("sweep", "rsi_windows"), vec!["7", "14", "21"]);
        assert!(adapter.get_list("sweep", "ma_windows").is_empty());
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config(FULL_CONFIG);
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("backtest", "data_dir"),
            Some("./data".to_string())
        );
        assert!(adapter.get_bool("sweep", "parallel", false));
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/config.ini");
        assert!(matches!(result, Err(BacktestError::ConfigParse { .. })));
    }
}
