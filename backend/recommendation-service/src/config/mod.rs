use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub model: ModelConfig,
    pub recommendation: RecommendationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

/// Where snapshots live and how the vectorizer is fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub snapshot_dir: String,
    pub vectorizer: VectorizerConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VectorizerConfig {
    /// Vocabulary cap, highest corpus frequency first
    pub max_features: usize,
    pub min_df: usize,
    /// Largest n-gram size; the smallest is always 1
    pub ngram_max: usize,
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            max_features: 1000,
            min_df: 1,
            ngram_max: 2,
        }
    }
}

/// Scoring and request-shaping parameters.
///
/// The purchase boost and view window have no derivation behind them; they are
/// tunables, not truths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecommendationConfig {
    pub purchase_boost: f64,
    pub view_weight: f64,
    pub view_history_limit: usize,
    pub seed_interactions: usize,
    pub neighbors_per_seed: usize,
    pub default_limit: usize,
    pub max_limit: usize,
    pub source_timeout_ms: u64,
    pub train_timeout_ms: u64,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            purchase_boost: 1.5,
            view_weight: 1.0,
            view_history_limit: 20,
            seed_interactions: 5,
            neighbors_per_seed: 20,
            default_limit: 10,
            max_limit: 100,
            source_timeout_ms: 5_000,
            train_timeout_ms: 30_000,
        }
    }
}

impl RecommendationConfig {
    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.source_timeout_ms)
    }

    pub fn train_timeout(&self) -> Duration {
        Duration::from_millis(self.train_timeout_ms)
    }

    /// Resolve a caller-supplied limit: absent means the default, anything
    /// else is capped at `max_limit`. Zero stays zero and yields no results.
    pub fn resolve_limit(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let rec_defaults = RecommendationConfig::default();
        let vec_defaults = VectorizerConfig::default();

        Ok(Config {
            app: AppConfig {
                env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                port: parse_var("APP_PORT", 5002)?,
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?,
                max_connections: parse_var("DATABASE_MAX_CONNECTIONS", 10)?,
            },
            model: ModelConfig {
                snapshot_dir: env::var("MODEL_SNAPSHOT_DIR")
                    .unwrap_or_else(|_| "./models".to_string()),
                vectorizer: VectorizerConfig {
                    max_features: parse_var("TFIDF_MAX_FEATURES", vec_defaults.max_features)?,
                    min_df: parse_var("TFIDF_MIN_DF", vec_defaults.min_df)?,
                    ngram_max: parse_var("TFIDF_NGRAM_MAX", vec_defaults.ngram_max)?,
                },
            },
            recommendation: RecommendationConfig {
                purchase_boost: parse_weight("PURCHASE_BOOST", rec_defaults.purchase_boost)?,
                view_weight: parse_weight("VIEW_WEIGHT", rec_defaults.view_weight)?,
                view_history_limit: parse_var(
                    "VIEW_HISTORY_LIMIT",
                    rec_defaults.view_history_limit,
                )?,
                seed_interactions: parse_var("SEED_INTERACTIONS", rec_defaults.seed_interactions)?,
                neighbors_per_seed: parse_var(
                    "NEIGHBORS_PER_SEED",
                    rec_defaults.neighbors_per_seed,
                )?,
                default_limit: parse_var("DEFAULT_LIMIT", rec_defaults.default_limit)?,
                max_limit: parse_var("MAX_LIMIT", rec_defaults.max_limit)?,
                source_timeout_ms: parse_var("SOURCE_TIMEOUT_MS", rec_defaults.source_timeout_ms)?,
                train_timeout_ms: parse_var("TRAIN_TIMEOUT_MS", rec_defaults.train_timeout_ms)?,
            },
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw,
        }),
        Err(_) => Ok(default),
    }
}

/// Scoring weights must be finite and non-negative so scores stay non-negative.
fn parse_weight(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    let weight: f64 = parse_var(name, default)?;
    if weight.is_finite() && weight >= 0.0 {
        Ok(weight)
    } else {
        Err(ConfigError::Invalid {
            name,
            value: weight.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_recommendation_config() {
        let config = RecommendationConfig::default();
        assert_eq!(config.purchase_boost, 1.5);
        assert_eq!(config.view_history_limit, 20);
        assert_eq!(config.seed_interactions, 5);
        assert_eq!(config.neighbors_per_seed, 20);
    }

    #[test]
    fn test_resolve_limit() {
        let config = RecommendationConfig::default();
        assert_eq!(config.resolve_limit(None), 10);
        assert_eq!(config.resolve_limit(Some(3)), 3);
        assert_eq!(config.resolve_limit(Some(0)), 0);
        assert_eq!(config.resolve_limit(Some(100_000)), 100);
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        std::env::set_var("RECSVC_TEST_BAD_PORT", "not-a-port");
        let result: Result<u16, _> = parse_var("RECSVC_TEST_BAD_PORT", 80);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
        std::env::remove_var("RECSVC_TEST_BAD_PORT");

        let fallback: u16 = parse_var("RECSVC_TEST_UNSET_PORT", 80).unwrap();
        assert_eq!(fallback, 80);
    }

    #[test]
    fn test_parse_weight_rejects_negative_and_nan() {
        for raw in ["-1", "-0.5", "NaN", "inf"] {
            std::env::set_var("RECSVC_TEST_BAD_WEIGHT", raw);
            let result = parse_weight("RECSVC_TEST_BAD_WEIGHT", 1.5);
            assert!(
                matches!(result, Err(ConfigError::Invalid { name: "RECSVC_TEST_BAD_WEIGHT", .. })),
                "{raw} was accepted"
            );
        }
        std::env::remove_var("RECSVC_TEST_BAD_WEIGHT");

        std::env::set_var("RECSVC_TEST_ZERO_WEIGHT", "0");
        assert_eq!(parse_weight("RECSVC_TEST_ZERO_WEIGHT", 1.5).unwrap(), 0.0);
        std::env::remove_var("RECSVC_TEST_ZERO_WEIGHT");

        assert_eq!(parse_weight("RECSVC_TEST_UNSET_WEIGHT", 1.5).unwrap(), 1.5);
    }
}
