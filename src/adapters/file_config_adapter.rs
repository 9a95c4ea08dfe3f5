//! INI file configuration adapter.

use crate::domain::error::VoltraderError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, VoltraderError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(VoltraderError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("config file not found: {}", path.display()),
            )));
        }
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| VoltraderError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, VoltraderError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| VoltraderError::ConfigParse {
                file: "<inline>".to_string(),
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

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_deref()
            .and_then(Self::parse_bool)
            .unwrap_or(default)
    }

    fn sections(&self) -> Vec<String> {
        let mut sections = self.config.sections();
        sections.sort();
        sections
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

    #[test]
    fn from_string_parses_config() {
        let content = r#"
[instrument]
symbol = BTCUSDT
contract_unit = 0.001

[strategy]
rule = emac
fast_span = 16
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("instrument", "symbol"),
            Some("BTCUSDT".to_string())
        );
        assert_eq!(adapter.get_double("instrument", "contract_unit", 1.0), 0.001);
        assert_eq!(adapter.get_int("strategy", "fast_span", 8), 16);
    }

    #[test]
    fn keys_are_case_insensitive() {
        let adapter = FileConfigAdapter::from_string("[Account]\nTrading_Capital = 5000\n").unwrap();
        assert_eq!(adapter.get_double("account", "trading_capital", 0.0), 5000.0);
    }

    #[test]
    fn missing_and_blank_values_are_none() {
        let adapter =
            FileConfigAdapter::from_string("[costs]\nfee_pct = 0.05\nslippage_pct =\n").unwrap();
        assert_eq!(adapter.get_string("costs", "missing"), None);
        assert_eq!(adapter.get_string("costs", "slippage_pct"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn numeric_getters_fall_back_to_default() {
        let adapter =
            FileConfigAdapter::from_string("[strategy]\nvol_span = abc\n").unwrap();
        assert_eq!(adapter.get_int("strategy", "vol_span", 35), 35);
        assert_eq!(adapter.get_int("strategy", "missing", 10), 10);
        assert_eq!(adapter.get_double("strategy", "vol_span", 0.5), 0.5);
    }

    #[test]
    fn get_bool_values() {
        let adapter = FileConfigAdapter::from_string(
            "[report]\na = true\nb = yes\nc = 1\nd = off\ne = maybe\n",
        )
        .unwrap();
        assert!(adapter.get_bool("report", "a", false));
        assert!(adapter.get_bool("report", "b", false));
        assert!(adapter.get_bool("report", "c", false));
        assert!(!adapter.get_bool("report", "d", true));
        assert!(adapter.get_bool("report", "e", true));
        assert!(!adapter.get_bool("report", "missing", false));
    }

    #[test]
    fn sections_are_listed() {
        let adapter =
            FileConfigAdapter::from_string("[report]\nx = 1\n[data]\ny = 2\n").unwrap();
        assert_eq!(adapter.sections(), vec!["data", "report"]);
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config("[data]\nsource = csv\ncsv_dir = /tmp/prices\n");
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("data", "csv_dir"),
            Some("/tmp/prices".to_string())
        );
    }

    #[test]
    fn from_file_missing_is_io_error() {
        assert!(matches!(
            FileConfigAdapter::from_file("/nonexistent/path/config.ini"),
            Err(VoltraderError::Io(_))
        ));
    }
}
