//! Instance metadata lookup.

use crate::error::MetadataError;

/// Something that can tell which instance the process runs on.
pub trait MetadataSource: Send + Sync {
    /// Look up the instance identifier.
    fn instance_id(&self) -> Result<String, MetadataError>;
}

impl<F> MetadataSource for F
where
    F: Fn() -> Result<String, MetadataError> + Send + Sync,
{
    fn instance_id(&self) -> Result<String, MetadataError> {
        self()
    }
}

/// Reads the instance id from the EC2 instance metadata service.
///
/// Only answers when running inside EC2. Elsewhere the request times out
/// after [`Ec2MetadataSource::DEFAULT_TIMEOUT`].
#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct Ec2MetadataSource {
    url: String,
    timeout: std::time::Duration,
}

#[cfg(feature = "http")]
impl Ec2MetadataSource {
    /// Default metadata endpoint for the instance id.
    pub const DEFAULT_URL: &'static str = "http://169.254.169.254/latest/meta-data/instance-id";

    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(2);

    /// Create a source for the standard metadata endpoint.
    pub fn new() -> Self {
        Self {
            url: Self::DEFAULT_URL.to_string(),
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Use a different endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Use a different request timeout.
    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(feature = "http")]
impl Default for Ec2MetadataSource {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "http")]
impl MetadataSource for Ec2MetadataSource {
    fn instance_id(&self) -> Result<String, MetadataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;
        let response = client.get(&self.url).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(MetadataError::Status(status.as_u16()));
        }

        let id = response.text()?.trim().to_string();
        if id.is_empty() {
            return Err(MetadataError::Empty);
        }
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_sources() {
        let source = || Ok::<_, MetadataError>("i-0abc".to_string());
        assert_eq!(source.instance_id().unwrap(), "i-0abc");

        let failing = || Err::<String, _>(MetadataError::Empty);
        assert!(failing.instance_id().is_err());
    }

    #[cfg(feature = "http")]
    #[test]
    fn ec2_source_defaults() {
        let source = Ec2MetadataSource::new();
        assert_eq!(source.url, Ec2MetadataSource::DEFAULT_URL);
        assert_eq!(source.timeout, Ec2MetadataSource::DEFAULT_TIMEOUT);
    }

    #[cfg(feature = "http")]
    #[test]
    fn ec2_source_reports_connection_failure() {
        // Nothing listens on the discard port.
        let source = Ec2MetadataSource::new()
            .with_url("http://127.0.0.1:9/latest/meta-data/instance-id")
            .with_timeout(std::time::Duration::from_millis(200));
        assert!(matches!(
            source.instance_id(),
            Err(MetadataError::Http(_))
        ));
    }
}
