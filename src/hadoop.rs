//! Host (Hadoop) configuration as rendered by the debug endpoints.
//!
//! The configuration is a flat key/value table assembled from `*.properties`
//! files; the facade exposes it as plain text or as an HTML table.

use crate::error::NyalaError;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub const CONF_DIR_ENV: &str = "HADOOP_CONF_DIR";

#[derive(Debug, Clone, Default)]
pub struct HadoopConfig {
    sources: Vec<String>,
    entries: BTreeMap<String, String>,
}

impl HadoopConfig {
    pub fn empty() -> HadoopConfig {
        HadoopConfig::default()
    }

    /// Loads `key=value` lines from each file, in order; later files win on
    /// duplicate keys. Blank lines and `#` comments are ignored.
    pub fn load(paths: &[PathBuf]) -> Result<HadoopConfig, NyalaError> {
        let mut config = HadoopConfig::default();
        for path in paths {
            let raw = std::fs::read_to_string(path)?;
            config.sources.push(display_name(path));
            for line in raw.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((key, value)) = line.split_once('=') {
                    config
                        .entries
                        .insert(key.trim().to_string(), value.trim().to_string());
                }
            }
        }
        Ok(config)
    }

    /// Loads every `*.properties` file under the directory, sorted by name.
    pub fn load_dir(dir: &Path) -> Result<HadoopConfig, NyalaError> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "properties"))
            .collect();
        paths.sort();
        HadoopConfig::load(&paths)
    }

    /// Reads the conf-dir environment variable; unset means an empty
    /// configuration, not an error.
    pub fn from_env() -> Result<HadoopConfig, NyalaError> {
        match std::env::var(CONF_DIR_ENV) {
            Ok(dir) => HadoopConfig::load_dir(Path::new(&dir)),
            Err(_) => Ok(HadoopConfig::empty()),
        }
    }

    /// Lookup with an empty-string default, so foreign callers never see a
    /// null.
    pub fn get(&self, key: &str) -> String {
        self.entries.get(key).cloned().unwrap_or_default()
    }

    fn source_summary(&self) -> String {
        format!("Configuration: {}", self.sources.join(", "))
    }

    /// All parameters as a table of keys and values, in raw text or HTML.
    pub fn render(&self, as_text: bool) -> String {
        let mut output = String::new();
        if as_text {
            output.push_str("Hadoop Configuration\n");
            // The set of files that make up the configuration
            output.push_str(&self.source_summary());
            output.push_str("\n\n");
            for (key, value) in &self.entries {
                let _ = writeln!(output, "{key}={value}");
            }
            output.push('\n');
        } else {
            output.push_str("<h2>Hadoop Configuration</h2>");
            output.push_str(&self.source_summary());
            output.push_str("\n\n");
            output.push_str("<table class='table table-bordered table-hover'>");
            output.push_str("<tr><th>Key</th><th>Value</th></tr>");
            for (key, value) in &self.entries {
                let _ = write!(output, "<tr><td>{key}</td><td>{value}</td></tr>");
            }
            output.push_str("</table>");
        }
        output
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample() -> (tempfile::TempDir, HadoopConfig) {
        let dir = tempfile::tempdir().expect("tempdir");
        let core = dir.path().join("core-site.properties");
        let mut file = std::fs::File::create(&core).expect("create");
        writeln!(file, "# comment").expect("write");
        writeln!(file, "fs.defaultFS=hdfs://nn:8020").expect("write");
        writeln!(file, "io.file.buffer.size=65536").expect("write");
        let config = HadoopConfig::load_dir(dir.path()).expect("load");
        (dir, config)
    }

    #[test]
    fn text_rendering_shape() {
        let (_dir, config) = sample();
        let text = config.render(true);
        assert!(text.starts_with("Hadoop Configuration\n"));
        assert!(text.contains("Configuration: core-site.properties"));
        assert!(text.contains("fs.defaultFS=hdfs://nn:8020\n"));
        assert!(text.ends_with("\n\n"));
    }

    #[test]
    fn html_rendering_shape() {
        let (_dir, config) = sample();
        let html = config.render(false);
        assert!(html.starts_with("<h2>Hadoop Configuration</h2>"));
        assert!(html.contains("<tr><th>Key</th><th>Value</th></tr>"));
        assert!(html.contains("<tr><td>fs.defaultFS</td><td>hdfs://nn:8020</td></tr>"));
        assert!(html.ends_with("</table>"));
    }

    #[test]
    fn missing_keys_render_as_empty_string() {
        let (_dir, config) = sample();
        assert_eq!(config.get("io.file.buffer.size"), "65536");
        assert_eq!(config.get("absent.key"), "");
    }
}
