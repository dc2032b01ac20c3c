//! Core library for the `weather-pool` CLI.
//!
//! This crate defines:
//! - A registry of weather providers with hourly quotas
//! - Circuit breaking with timed re-enable for failing providers
//! - Random selection among eligible providers and single-attempt dispatch
//! - Normalizers mapping each provider's payload into one canonical schema
//! - Configuration & credentials handling
//!
//! It is used by `weather-pool-cli`, but can also be embedded by other binaries or services.

pub mod aggregator;
pub mod breaker;
pub mod config;
pub mod error;
pub mod model;
pub mod normalize;
pub mod provider;
pub mod quota;
pub mod registry;
pub mod selector;

pub use aggregator::{Aggregator, AggregatorBuilder, ProviderStatus};
pub use config::{Config, CredentialSource, EnvCredentials, ProviderConfig, Settings};
pub use error::FetchError;
pub use model::{WeatherQuery, WeatherSnapshot};
pub use provider::{AdapterTable, ProviderAdapter, ProviderDescriptor, ProviderKind};
pub use registry::ProviderRegistry;
