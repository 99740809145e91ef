use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::pipeline::RunConfig;
use crate::record::Schema;

pub const INITIAL_PAGE_URL: &str =
    "https://www.hellowork.mhlw.go.jp/kensaku/GECA110010.do?action=initDisp&screenId=GECA110010";
const SETTINGS_FILE: &str = "hellowork";
const ENV_PREFIX: &str = "HELLOWORK";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Replay the search form over plain HTTP.
    Http,
    /// Drive a real browser; the search is done by hand.
    Browser,
}

/// One search form field to force, written as a `[[search_fields]]` table.
/// Names are matched exactly, case included.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FormField {
    pub name: String,
    pub value: String,
}

/// Everything a run can be configured with. Defaults, then `hellowork.toml`
/// (or `--config`), then `HELLOWORK_*` environment variables, then CLI flags.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub initial_url: String,
    pub output_dir: PathBuf,
    pub csv_filename: String,
    pub excel_filename: String,
    pub normalize: bool,
    pub schema: Option<Schema>,
    pub max_pages: Option<usize>,
    pub page_load_timeout_secs: u64,
    pub request_wait_secs: u64,
    pub write_wait_ms: u64,
    pub convert_to_excel: bool,
    pub transport: TransportKind,
    pub user_agent: String,
    pub search_form_selector: String,
    pub search_button: String,
    pub search_fields: Vec<FormField>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            initial_url: INITIAL_PAGE_URL.to_string(),
            output_dir: PathBuf::from("output"),
            csv_filename: "hellowork_jobs_list.csv".to_string(),
            excel_filename: "hellowork_jobs_list.xlsx".to_string(),
            normalize: true,
            schema: None,
            max_pages: None,
            page_load_timeout_secs: 15,
            request_wait_secs: 2,
            write_wait_ms: 0,
            convert_to_excel: true,
            transport: TransportKind::Http,
            user_agent: concat!("hellowork_scraper/", env!("CARGO_PKG_VERSION")).to_string(),
            search_form_selector: "form#ID_form_1".to_string(),
            search_button: "searchBtn".to_string(),
            search_fields: Vec::new(),
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p),
            None => File::with_name(SETTINGS_FILE).required(false),
        };
        Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to read settings")?
            .try_deserialize()
            .context("Invalid settings")
    }

    /// Column order follows the normalize flag unless pinned explicitly.
    pub fn schema(&self) -> Schema {
        self.schema.unwrap_or(if self.normalize {
            Schema::Normalized
        } else {
            Schema::Raw
        })
    }

    pub fn csv_path(&self) -> PathBuf {
        self.output_dir.join(&self.csv_filename)
    }

    pub fn excel_path(&self) -> PathBuf {
        self.output_dir.join(&self.excel_filename)
    }

    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            initial_url: self.initial_url.clone(),
            store_path: self.csv_path(),
            normalize: self.normalize,
            schema: self.schema(),
            max_pages: self.max_pages,
            page_load_timeout: self.page_load_timeout(),
            request_wait: Duration::from_secs(self.request_wait_secs),
            write_wait: Duration::from_millis(self.write_wait_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_site() {
        let s = Settings::default();
        assert_eq!(s.csv_path(), PathBuf::from("output/hellowork_jobs_list.csv"));
        assert_eq!(s.schema(), Schema::Normalized);
        let run = s.run_config();
        assert_eq!(run.page_load_timeout, Duration::from_secs(15));
        assert_eq!(run.request_wait, Duration::from_secs(2));
        assert_eq!(run.max_pages, None);
    }

    #[test]
    fn raw_schema_follows_normalize_flag() {
        let s = Settings {
            normalize: false,
            ..Default::default()
        };
        assert_eq!(s.schema(), Schema::Raw);
        let pinned = Settings {
            normalize: false,
            schema: Some(Schema::Normalized),
            ..Default::default()
        };
        assert_eq!(pinned.schema(), Schema::Normalized);
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(
            &path,
            "max_pages = 3\nnormalize = false\noutput_dir = \"data\"\n",
        )
        .unwrap();
        let s = Settings::load(Some(&path)).unwrap();
        assert_eq!(s.max_pages, Some(3));
        assert!(!s.normalize);
        assert_eq!(s.output_dir, PathBuf::from("data"));
        assert!(s.search_fields.is_empty());
        // Untouched keys keep their defaults.
        assert_eq!(s.request_wait_secs, 2);
    }

    #[test]
    fn search_fields_keep_their_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.toml");
        std::fs::write(
            &path,
            "[[search_fields]]\nname = \"tDFK1CmbBox\"\nvalue = \"13\"\n\n\
             [[search_fields]]\nname = \"kSNoJo\"\nvalue = \"\"\n",
        )
        .unwrap();
        let s = Settings::load(Some(&path)).unwrap();
        assert_eq!(
            s.search_fields,
            vec![
                FormField {
                    name: "tDFK1CmbBox".into(),
                    value: "13".into()
                },
                FormField {
                    name: "kSNoJo".into(),
                    value: String::new()
                },
            ]
        );
    }
}
