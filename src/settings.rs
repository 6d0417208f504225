//! Settings for the `cwreport` binary.
//!
//! Loaded from an optional TOML/JSON/YAML file, then overridden by
//! `CWREPORT_*` environment variables. Nested keys use a double underscore:
//! `CWREPORT_REPORTER__NAMESPACE=orders` sets `reporter.namespace`.
//!
//! ```toml
//! [reporter]
//! namespace = "orders-service"
//! duration_unit = "ms"
//! percentiles = [0.5, 0.99]
//! instance_id = { fixed = "web-1" }
//!
//! [[dimensions]]
//! name = "Stage"
//! value = "prod"
//!
//! [transport]
//! kind = "http"
//! endpoint = "https://metrics.internal/put"
//! timeout = "5s"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use cwreport_sdk::{
    FileTransport, HttpTransport, MetricFilter, ReporterConfig, StaticDimensionAdder, Transport,
};
use cwreport_types::Dimension;

use crate::duration::parse_interval;
use crate::stdout::StdoutTransport;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "CWREPORT";

/// Everything the binary needs to run reporting cycles.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Reporter options, as accepted by [`ReporterConfig`].
    pub reporter: ReporterConfig,

    /// Extra dimensions attached to every datapoint, after the instance id.
    pub dimensions: Vec<DimensionSetting>,

    /// Only report metrics whose name starts with this prefix.
    pub metric_prefix: Option<String>,

    /// Where batches go.
    pub transport: TransportSettings,
}

/// A fixed dimension from the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DimensionSetting {
    pub name: String,
    pub value: String,
}

/// Transport selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransportSettings {
    /// POST each batch as JSON.
    Http {
        endpoint: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        /// Request timeout, e.g. "10s".
        #[serde(default)]
        timeout: Option<String>,
    },
    /// Append each batch as a JSON line to a file.
    File { path: PathBuf },
    /// Print each batch as a JSON line.
    #[default]
    Stdout,
}

impl Settings {
    /// Load settings from `path` (if given) and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("reporter.percentiles"),
        );

        let settings = builder
            .build()
            .context("Failed to load settings")?
            .try_deserialize()
            .context("Invalid settings")?;
        Ok(settings)
    }

    /// The reporter configuration with dimensions and the metric filter applied.
    pub fn reporter_config(&self) -> ReporterConfig {
        let mut config = self.reporter.clone();

        if let Some(prefix) = &self.metric_prefix {
            config = config.with_filter(MetricFilter::prefix(prefix.clone()));
        }
        if !self.dimensions.is_empty() {
            let dimensions = self
                .dimensions
                .iter()
                .map(|d| Dimension::new(d.name.clone(), d.value.clone()));
            config = config.with_dimension_adder(StaticDimensionAdder::new(dimensions));
        }

        config
    }

    /// Build the configured transport.
    pub fn build_transport(&self) -> Result<Box<dyn Transport>> {
        let transport: Box<dyn Transport> = match &self.transport {
            TransportSettings::Http {
                endpoint,
                headers,
                timeout,
            } => {
                let mut http = HttpTransport::new(endpoint.clone());
                for (name, value) in headers {
                    http = http.header(name.clone(), value.clone());
                }
                if let Some(timeout) = timeout {
                    let timeout = parse_interval(timeout)
                        .with_context(|| format!("Invalid transport timeout: {}", timeout))?;
                    http = http.timeout(timeout);
                }
                Box::new(http)
            }
            TransportSettings::File { path } => Box::new(FileTransport::new(path.clone())),
            TransportSettings::Stdout => Box::new(StdoutTransport::new()),
        };
        Ok(transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cwreport_sdk::{InstanceIdSetting, MetricRef};
    use cwreport_types::{CounterSnapshot, TimeUnit};
    use std::io::Write;
    use tempfile::Builder;

    fn write_config(ext: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(ext).tempfile().unwrap();
        write!(file, "{}", content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_defaults_without_file() {
        let settings = Settings::default();
        assert_eq!(settings.transport, TransportSettings::Stdout);
        assert!(settings.dimensions.is_empty());
        assert_eq!(settings.reporter.percentiles, vec![0.5, 0.95, 0.99]);
    }

    #[test]
    fn test_load_toml() {
        let file = write_config(
            ".toml",
            r#"
                metric_prefix = "app."

                [reporter]
                namespace = "orders"
                duration_unit = "s"
                percentiles = [0.5, 0.999]
                timer_summary = true
                instance_id = { fixed = "web-1" }

                [[dimensions]]
                name = "Stage"
                value = "prod"

                [transport]
                kind = "file"
                path = "/tmp/datapoints.ndjson"
            "#,
        );

        let settings = Settings::load(Some(file.path())).unwrap();

        assert_eq!(settings.reporter.namespace, "orders");
        assert_eq!(settings.reporter.duration_unit, TimeUnit::Seconds);
        assert_eq!(settings.reporter.percentiles, vec![0.5, 0.999]);
        assert!(settings.reporter.timer_summary);
        assert!(settings.reporter.one_minute_rate);
        assert_eq!(
            settings.reporter.instance_id,
            Some(InstanceIdSetting::Fixed("web-1".to_string()))
        );
        assert_eq!(
            settings.dimensions,
            vec![DimensionSetting {
                name: "Stage".to_string(),
                value: "prod".to_string()
            }]
        );
        assert_eq!(
            settings.transport,
            TransportSettings::File {
                path: PathBuf::from("/tmp/datapoints.ndjson")
            }
        );
    }

    #[test]
    fn test_load_http_transport() {
        let file = write_config(
            ".toml",
            r#"
                [reporter]
                namespace = "orders"

                [transport]
                kind = "http"
                endpoint = "http://localhost:4000/put"
                timeout = "2s"

                [transport.headers]
                authorization = "Bearer token"
            "#,
        );

        let settings = Settings::load(Some(file.path())).unwrap();
        let TransportSettings::Http {
            endpoint,
            headers,
            timeout,
        } = &settings.transport
        else {
            panic!("expected http transport");
        };
        assert_eq!(endpoint, "http://localhost:4000/put");
        assert_eq!(headers["authorization"], "Bearer token");
        assert_eq!(timeout.as_deref(), Some("2s"));
        assert!(settings.build_transport().is_ok());
    }

    #[test]
    fn test_bad_timeout_is_rejected() {
        let settings = Settings {
            transport: TransportSettings::Http {
                endpoint: "http://localhost".to_string(),
                headers: BTreeMap::new(),
                timeout: Some("whenever".to_string()),
            },
            ..Settings::default()
        };
        assert!(settings.build_transport().is_err());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let settings = Settings {
            transport: TransportSettings::Http {
                endpoint: "http://localhost".to_string(),
                headers: BTreeMap::new(),
                timeout: Some("0s".to_string()),
            },
            ..Settings::default()
        };
        let err = settings.build_transport().err().unwrap();
        assert!(format!("{err:#}").contains("greater than zero"));
    }

    #[test]
    fn test_reporter_config_applies_prefix_and_dimensions() {
        let mut settings = Settings::default();
        settings.reporter.namespace = "orders".to_string();
        settings.metric_prefix = Some("app.".to_string());
        settings.dimensions.push(DimensionSetting {
            name: "Stage".to_string(),
            value: "prod".to_string(),
        });

        let config = settings.reporter_config();
        let counter = CounterSnapshot::new(1);

        assert!(config.filter.matches("app.requests", MetricRef::Counter(&counter)));
        assert!(!config.filter.matches("jvm.threads", MetricRef::Counter(&counter)));
        assert_eq!(config.dimension_adders.len(), 1);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(Settings::load(Some(Path::new("/nonexistent/cwreport.toml"))).is_err());
    }
}
