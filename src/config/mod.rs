use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    pub social_graph: SocialGraphConfig,
    pub ownership: OwnershipConfig,
    pub verifier: VerifierConfig,
    #[serde(default)]
    pub aggregation: AggregationConfig,
    pub collection: CollectionConfig,
    pub frame: FrameConfig,
    pub action: ActionConfig,
}

impl ApiConfig {
    pub fn load() -> Result<Self> {
        let configured_path =
            std::env::var("PERK_API_CONFIG").unwrap_or_else(|_| "config/api.toml".to_string());
        assert!(
            !configured_path.is_empty(),
            "Configuration path must be non-empty"
        );
        assert!(
            configured_path.len() < 4096,
            "Configuration path length exceeds hard limit"
        );

        let mut builder = Config::builder()
            .add_source(File::new(&configured_path, FileFormat::Toml).required(true));

        if let Ok(env_override) = std::env::var("PERK_API_ENV") {
            if !env_override.is_empty() {
                let env_file = format!("config/api.{}.toml", env_override);
                if Path::new(&env_file).exists() {
                    builder = builder.add_source(File::new(&env_file, FileFormat::Toml));
                }
            }
        }

        // API keys are expected to arrive this way, e.g. PERK_SOCIAL_GRAPH__API_KEY.
        builder = builder.add_source(environment());

        Self::from_builder(builder, &configured_path)
    }

    #[cfg(test)]
    pub fn from_toml(source: &str) -> Result<Self> {
        Self::from_builder(
            Config::builder().add_source(File::from_str(source, FileFormat::Toml)),
            "<inline>",
        )
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>, path: &str) -> Result<Self> {
        let settings = builder
            .build()
            .map_err(|err| map_config_error(err, path))?;
        let mut config: Self = settings
            .try_deserialize()
            .context("Failed to deserialize API configuration")?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&mut self) -> Result<()> {
        assert!(
            self.server.port > 0,
            "Server port must be greater than zero"
        );
        ensure!(
            !self.social_graph.base_url.is_empty(),
            "social_graph.base_url must be specified"
        );
        ensure!(
            !self.ownership.base_url.is_empty(),
            "ownership.base_url must be specified"
        );
        ensure!(
            !self.ownership.token_address.trim().is_empty(),
            "ownership.token_address must be specified"
        );
        ensure!(
            !self.verifier.hub_url.is_empty(),
            "verifier.hub_url must be specified"
        );
        self.social_graph.base_url = trim_base_url(&self.social_graph.base_url);
        self.ownership.base_url = trim_base_url(&self.ownership.base_url);
        self.verifier.hub_url = trim_base_url(&self.verifier.hub_url);
        self.frame.public_url = trim_base_url(&self.frame.public_url);

        self.upstream.ensure_bounds()?;
        self.aggregation.ensure_bounds()?;
        self.collection.ensure_bounds()?;
        self.frame.ensure_bounds()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: Option<IpAddr>,
    pub port: u16,
}

impl ServerConfig {
    pub fn address(&self) -> SocketAddr {
        let host = self.host.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert!(self.port != 0, "HTTP port cannot be zero");
        SocketAddr::new(host, self.port)
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpstreamConfig {
    pub request_timeout_ms: Option<u64>,
}

impl UpstreamConfig {
    pub fn request_timeout(&self) -> Duration {
        let millis = self.request_timeout_ms.unwrap_or(3_000);
        assert!(millis >= 100, "Upstream timeout must be at least 100ms");
        assert!(millis <= 60_000, "Upstream timeout cannot exceed 60 seconds");
        Duration::from_millis(millis)
    }

    fn ensure_bounds(&self) -> Result<()> {
        if let Some(millis) = self.request_timeout_ms {
            ensure!(
                (100..=60_000).contains(&millis),
                "upstream.request_timeout_ms must be between 100 and 60000"
            );
        }
        Ok(())
    }
}

/// Social-graph (Neynar v2) endpoint used for identity lookups.
#[derive(Debug, Clone, Deserialize)]
pub struct SocialGraphConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
}

/// NFT ownership (Reservoir) endpoint and the single tracked token.
#[derive(Debug, Clone, Deserialize)]
pub struct OwnershipConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    pub token_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifierConfig {
    pub hub_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "VerifierConfig::default_api_key_header")]
    pub api_key_header: String,
}

impl VerifierConfig {
    fn default_api_key_header() -> String {
        "x-airstack-hubs".to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregationConfig {
    #[serde(default = "AggregationConfig::default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "AggregationConfig::default_total_timeout_ms")]
    pub total_timeout_ms: u64,
    #[serde(default)]
    pub retry_attempts: u32,
    #[serde(default = "AggregationConfig::default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            concurrency: Self::default_concurrency(),
            total_timeout_ms: Self::default_total_timeout_ms(),
            retry_attempts: 0,
            retry_backoff_ms: Self::default_retry_backoff_ms(),
        }
    }
}

impl AggregationConfig {
    pub fn total_timeout(&self) -> Duration {
        Duration::from_millis(self.total_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    fn ensure_bounds(&self) -> Result<()> {
        ensure!(
            (1..=16).contains(&self.concurrency),
            "aggregation.concurrency must be between 1 and 16"
        );
        ensure!(
            (100..=60_000).contains(&self.total_timeout_ms),
            "aggregation.total_timeout_ms must be between 100 and 60000"
        );
        ensure!(
            self.retry_attempts <= 5,
            "aggregation.retry_attempts must not exceed 5"
        );
        ensure!(
            self.retry_backoff_ms <= 10_000,
            "aggregation.retry_backoff_ms must not exceed 10000"
        );
        Ok(())
    }

    const fn default_concurrency() -> usize {
        1
    }

    const fn default_total_timeout_ms() -> u64 {
        10_000
    }

    const fn default_retry_backoff_ms() -> u64 {
        250
    }
}

/// Copy and labels identifying the tracked collection.
#[derive(Debug, Clone, Deserialize)]
pub struct CollectionConfig {
    pub title: String,
    /// Label used in the action message, e.g. `DP #5`.
    pub suffix_label: String,
    /// Label used on the rendered result card, e.g. `$DP#5`.
    pub frame_label: String,
    #[serde(default = "CollectionConfig::default_message_budget")]
    pub message_budget: usize,
    #[serde(default)]
    pub creator: Option<String>,
}

impl CollectionConfig {
    fn ensure_bounds(&self) -> Result<()> {
        ensure!(
            !self.suffix_label.trim().is_empty(),
            "collection.suffix_label must be specified"
        );
        ensure!(
            self.message_budget >= 8,
            "collection.message_budget must be at least 8"
        );
        Ok(())
    }

    const fn default_message_budget() -> usize {
        30
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrameConfig {
    /// Absolute URL the frame is reachable at, including the base path.
    pub public_url: String,
    #[serde(default = "FrameConfig::default_base_path")]
    pub base_path: String,
    pub action_slug: String,
    #[serde(default)]
    pub action_install_url: Option<String>,
    #[serde(default)]
    pub share_url: Option<String>,
    #[serde(default)]
    pub channel_url: Option<String>,
}

impl FrameConfig {
    fn ensure_bounds(&self) -> Result<()> {
        ensure!(
            self.base_path.starts_with('/') && self.base_path.len() > 1,
            "frame.base_path must start with '/' and must not be the root"
        );
        ensure!(
            !self.base_path.ends_with('/'),
            "frame.base_path must not end with '/'"
        );
        ensure!(
            !self.action_slug.is_empty()
                && self
                    .action_slug
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "frame.action_slug must be a non-empty url-safe segment"
        );
        ensure!(
            !self.public_url.is_empty(),
            "frame.public_url must be specified"
        );
        Ok(())
    }

    fn default_base_path() -> String {
        "/api".to_string()
    }
}

/// Descriptor served to clients installing the cast action.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionConfig {
    pub name: String,
    pub icon: String,
    pub description: String,
    #[serde(default)]
    pub about_url: Option<String>,
}

fn environment() -> Environment {
    Environment::with_prefix("PERK")
        .prefix_separator("_")
        .separator("__")
}

fn trim_base_url(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

fn map_config_error(err: ConfigError, path: &str) -> ConfigError {
    match err {
        ConfigError::NotFound(_) => ConfigError::NotFound(path.to_string()),
        other => other,
    }
}

#[cfg(test)]
pub(crate) const SAMPLE_CONFIG: &str = r#"
[server]
port = 8080

[social_graph]
base_url = "https://api.neynar.com/v2/farcaster/"
api_key = "neynar-key"

[ownership]
base_url = "https://api.reservoir.tools"
api_key = "reservoir-key"
token_address = "0xabc0000000000000000000000000000000000001:5"

[verifier]
hub_url = "https://hubs.airstack.xyz"
api_key = "airstack-key"

[collection]
title = "DP Rewards Checker"
suffix_label = "DP #5"
frame_label = "$DP#5"
creator = "@0x94t3z"

[frame]
public_url = "https://perk.example/api/"
action_slug = "decentral-perk"
action_install_url = "https://warpcast.com/~/add-cast-action?url=https://perk.example/api/decentral-perk"
share_url = "https://warpcast.com/~/compose?text=DP%20Rewards%20Checker"
channel_url = "https://warpcast.com/~/channel/decentral-perk"

[action]
name = "DP Rewards Checker"
icon = "search"
description = "Action to check followers NFT Decentral Perk Rewards Card"
about_url = "https://github.com/Mr94t3z/decentral-perk"
"#;
