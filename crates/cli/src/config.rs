//! Command-line configuration for the `stockroom` binary.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `STOCKROOM_DATABASE` | stockroom.db | SQLite database path, or `:memory:` |
//! | `STOCKROOM_LOG_LEVEL` | info | Log level |
//! | `STOCKROOM_DEFAULT_PAGE_SIZE` | 25 | Page size when the request gives none |
//! | `STOCKROOM_MAX_PAGE_SIZE` | 100 | Largest page size a request may ask for |
//! | `STOCKROOM_LOW_STOCK_THRESHOLD` | 10 | Threshold for the stock filters |

use std::collections::HashMap;

use clap::Parser;
use stockroom_search::SearchConfig;
use stockroom_search::error::StorageResult;
use stockroom_search::types::SearchParams;

/// Runs an inventory search and prints the page as JSON.
#[derive(Debug, Clone, Parser)]
#[command(name = "stockroom")]
#[command(about = "Inventory search over a stockroom database")]
pub struct CliConfig {
    /// SQLite database path, or `:memory:`.
    #[arg(long, env = "STOCKROOM_DATABASE", default_value = "stockroom.db")]
    pub database: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "STOCKROOM_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Default page size for search results.
    #[arg(long, env = "STOCKROOM_DEFAULT_PAGE_SIZE", default_value = "25")]
    pub default_page_size: u32,

    /// Maximum page size for search results.
    #[arg(long, env = "STOCKROOM_MAX_PAGE_SIZE", default_value = "100")]
    pub max_page_size: u32,

    /// Low-stock threshold used when the request gives none.
    #[arg(long, env = "STOCKROOM_LOW_STOCK_THRESHOLD", default_value = "10")]
    pub low_stock_threshold: i64,

    /// Search parameters as a JSON object.
    #[arg(long, conflicts_with = "param")]
    pub params: Option<String>,

    /// A single search parameter as `key=value`. May be repeated.
    #[arg(long = "param", value_parser = parse_key_value)]
    pub param: Vec<(String, String)>,

    /// Print the query instead of running it.
    #[arg(long)]
    pub explain: bool,

    /// Create the schema before searching.
    #[arg(long)]
    pub init_schema: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            database: "stockroom.db".to_string(),
            log_level: "info".to_string(),
            default_page_size: 25,
            max_page_size: 100,
            low_stock_threshold: 10,
            params: None,
            param: Vec::new(),
            explain: false,
            init_schema: false,
        }
    }
}

impl CliConfig {
    /// Validates the configuration, collecting every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = self.search_config().validate().err().unwrap_or_default();

        if self.database.trim().is_empty() {
            errors.push("Database path cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// The search engine configuration.
    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            default_per_page: self.default_page_size,
            max_per_page: self.max_page_size,
            low_stock_threshold: self.low_stock_threshold,
        }
    }

    /// Parses the search parameters given on the command line.
    pub fn search_params(&self) -> StorageResult<SearchParams> {
        match &self.params {
            Some(json) => SearchParams::from_json(json),
            None => {
                let pairs: HashMap<String, String> = self.param.iter().cloned().collect();
                SearchParams::from_map(&pairs)
            }
        }
    }

    /// Returns true if the database lives only in memory.
    pub fn is_memory(&self) -> bool {
        self.database == ":memory:"
    }
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {:?}", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in {:?}", raw));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_search::types::StockFilter;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.database, "stockroom.db");
        assert!(!config.is_memory());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_collects_errors() {
        let config = CliConfig {
            database: " ".to_string(),
            default_page_size: 500,
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("Database")));
    }

    #[test]
    fn test_parse_repeated_params() {
        let config = CliConfig::try_parse_from([
            "stockroom",
            "--param",
            "stockFilter=outOfStock",
            "--param",
            "min_price=10",
        ])
        .unwrap();

        let params = config.search_params().unwrap();
        assert_eq!(params.stock_filter, Some(StockFilter::OutOfStock));
        assert_eq!(params.min_price, Some(10.0));
    }

    #[test]
    fn test_parse_json_params() {
        let config = CliConfig::try_parse_from([
            "stockroom",
            "--database",
            ":memory:",
            "--params",
            r#"{"keyword": "bolt", "perPage": 5}"#,
        ])
        .unwrap();

        assert!(config.is_memory());
        let params = config.search_params().unwrap();
        assert_eq!(params.keyword(), Some("bolt"));
        assert_eq!(params.per_page, Some(5));
    }

    #[test]
    fn test_json_and_pairs_conflict() {
        let result = CliConfig::try_parse_from([
            "stockroom",
            "--params",
            "{}",
            "--param",
            "page=2",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("lotCode=A=1").unwrap(),
            ("lotCode".to_string(), "A=1".to_string())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[test]
    fn test_search_config_mirrors_flags() {
        let config = CliConfig {
            max_page_size: 40,
            low_stock_threshold: 3,
            ..Default::default()
        };
        let search = config.search_config();
        assert_eq!(search.max_per_page, 40);
        assert_eq!(search.low_stock_threshold, 3);
    }
}
