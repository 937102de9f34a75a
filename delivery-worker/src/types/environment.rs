use std::{env, path::PathBuf, time::Duration};

use compression::PdfCompressionOptions;
use submission_storage::queue::QueueConfig;

use crate::{
    journey::NotifyTemplates, notify::NotifyConfig, orchestrator::DeliverySettings,
    poller::PollerConfig,
};

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses `LocalStack`)
    Development,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Production => f.write_str("production"),
            Self::Staging => f.write_str("staging"),
            Self::Development => f.write_str("development"),
        }
    }
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        Self::parse(&env).unwrap_or_else(|| panic!("Invalid environment: {env}"))
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "production" => Some(Self::Production),
            "staging" => Some(Self::Staging),
            "development" => Some(Self::Development),
            _ => None,
        }
    }

    /// Returns the endpoint URL to use for AWS services
    #[must_use]
    pub const fn override_aws_endpoint_url(&self) -> Option<&str> {
        match self {
            // Regular AWS endpoints for production and staging
            Self::Production | Self::Staging => None,
            // LocalStack endpoint for development
            Self::Development => Some("http://localhost:4566"),
        }
    }

    /// Whether logs should be emitted as JSON
    #[must_use]
    pub const fn json_logs(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }

    /// Whether S3 requests use path-style addressing
    ///
    /// `LocalStack` does not serve virtual-hosted bucket URLs.
    #[must_use]
    pub const fn s3_force_path_style(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Returns the submission queue configuration
    ///
    /// # Panics
    ///
    /// Panics if the `SUBMISSION_QUEUE_URL` environment variable is not set in production/staging
    #[must_use]
    pub fn submission_queue_config(&self) -> QueueConfig {
        let queue_url = match self {
            Self::Production | Self::Staging => env::var("SUBMISSION_QUEUE_URL")
                .expect("SUBMISSION_QUEUE_URL environment variable is not set"),
            Self::Development => {
                "http://localhost:4566/000000000000/submission-queue".to_string()
            }
        };

        QueueConfig {
            queue_url,
            default_max_messages: parse_var("POLLER_MAX_MESSAGES").unwrap_or(10),
            default_wait_time_seconds: 20, // Enable long polling by default
        }
    }

    /// Returns the poller configuration
    ///
    /// # Panics
    ///
    /// Panics if `POLLER_BASE_VISIBILITY_SECS` is set but not a valid number
    #[must_use]
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            base_visibility_timeout_seconds: parse_var("POLLER_BASE_VISIBILITY_SECS")
                .unwrap_or(120),
            ..PollerConfig::default()
        }
    }

    /// Returns the bucket submitted attachments are read from
    ///
    /// # Panics
    ///
    /// Panics if the `ATTACHMENT_BUCKET_NAME` environment variable is not set in production/staging
    #[must_use]
    pub fn attachment_bucket(&self) -> String {
        match self {
            Self::Production | Self::Staging => env::var("ATTACHMENT_BUCKET_NAME")
                .expect("ATTACHMENT_BUCKET_NAME environment variable is not set"),
            Self::Development => "case-attachments".to_string(),
        }
    }

    /// Returns the bucket delivered documents are written to
    ///
    /// # Panics
    ///
    /// Panics if the `DOCUMENT_BUCKET_NAME` environment variable is not set in production/staging
    #[must_use]
    pub fn document_bucket(&self) -> String {
        match self {
            Self::Production | Self::Staging => env::var("DOCUMENT_BUCKET_NAME")
                .expect("DOCUMENT_BUCKET_NAME environment variable is not set"),
            Self::Development => "case-documents".to_string(),
        }
    }

    /// Returns the notification service configuration
    ///
    /// # Panics
    ///
    /// Panics if `NOTIFY_API_KEY` is not set in production/staging
    #[must_use]
    pub fn notify_config(&self) -> NotifyConfig {
        let (base_url, api_key) = match self {
            Self::Production | Self::Staging => (
                env::var("NOTIFY_BASE_URL")
                    .unwrap_or_else(|_| "https://api.notifications.service.gov.uk".to_string()),
                env::var("NOTIFY_API_KEY").expect("NOTIFY_API_KEY environment variable is not set"),
            ),
            Self::Development => (
                env::var("NOTIFY_BASE_URL").unwrap_or_else(|_| "http://localhost:8025".to_string()),
                env::var("NOTIFY_API_KEY").unwrap_or_else(|_| "development-key".to_string()),
            ),
        };

        NotifyConfig {
            base_url,
            api_key,
            request_timeout: Duration::from_secs(parse_var("NOTIFY_TIMEOUT_SECS").unwrap_or(30)),
        }
    }

    /// Returns the delivery settings used by the orchestrator
    ///
    /// # Panics
    ///
    /// Panics if `CASEWORK_EMAIL_ADDRESS` is not set in production/staging
    #[must_use]
    pub fn delivery_settings(&self) -> DeliverySettings {
        let casework_email = match self {
            Self::Production | Self::Staging => env::var("CASEWORK_EMAIL_ADDRESS")
                .expect("CASEWORK_EMAIL_ADDRESS environment variable is not set"),
            Self::Development => "casework@example.com".to_string(),
        };

        let template = |name: &str, fallback: &str| {
            env::var(name).unwrap_or_else(|_| fallback.to_string())
        };

        DeliverySettings {
            casework_email,
            templates: NotifyTemplates {
                standard: template("NOTIFY_TEMPLATE_STANDARD", "standard-template"),
                appeal: template("NOTIFY_TEMPLATE_APPEAL", "appeal-template"),
                renewal: template("NOTIFY_TEMPLATE_RENEWAL", "renewal-template"),
            },
            ..DeliverySettings::default()
        }
    }

    /// Returns the external PDF compressor options
    #[must_use]
    pub fn pdf_compression_options(&self) -> PdfCompressionOptions {
        PdfCompressionOptions {
            external_tool_path: env::var("GHOSTSCRIPT_PATH")
                .map_or_else(|_| PathBuf::from("gs"), PathBuf::from),
            ..PdfCompressionOptions::default()
        }
    }

    /// Returns the port for the health check server
    ///
    /// # Panics
    ///
    /// Panics if `PORT` is set but not a valid port number
    #[must_use]
    pub fn health_port(&self) -> u16 {
        parse_var("PORT").unwrap_or(8001)
    }

    /// Returns the DogStatsD agent address, if metrics are enabled
    #[must_use]
    pub fn dogstatsd_address(&self) -> Option<String> {
        env::var("DD_AGENT_HOST")
            .ok()
            .map(|host| format!("{host}:{}", parse_var::<u16>("DD_DOGSTATSD_PORT").unwrap_or(8125)))
    }
}

/// Parses an optional numeric variable, panicking on malformed values
fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().map(|value| {
        value
            .trim()
            .parse()
            .unwrap_or_else(|_| panic!("{name} environment variable is not a valid number"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_environment() {
        assert_eq!(Environment::parse("production"), Some(Environment::Production));
        assert_eq!(Environment::parse("staging"), Some(Environment::Staging));
        assert_eq!(Environment::parse("development"), Some(Environment::Development));
        assert_eq!(Environment::parse("qa"), None);
    }

    #[test]
    fn test_development_defaults() {
        let env = Environment::Development;
        assert_eq!(env.override_aws_endpoint_url(), Some("http://localhost:4566"));
        assert!(!env.json_logs());
        assert_eq!(env.attachment_bucket(), "case-attachments");
        assert!(env
            .submission_queue_config()
            .queue_url
            .ends_with("/submission-queue"));
        assert_eq!(env.submission_queue_config().default_wait_time_seconds, 20);
    }

    #[test]
    fn test_production_uses_real_endpoints() {
        assert_eq!(Environment::Production.override_aws_endpoint_url(), None);
        assert!(!Environment::Production.s3_force_path_style());
        assert!(Environment::Development.s3_force_path_style());
        assert!(Environment::Production.json_logs());
        assert_eq!(Environment::Staging.to_string(), "staging");
    }
}
