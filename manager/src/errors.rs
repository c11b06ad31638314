//! Custom error types for the stats manager
//!
//! Provides structured errors for the failure scenarios callers need to tell
//! apart (bad configuration, REST failures, job conflicts). Application code
//! carries them inside `anyhow::Error` and downcasts where it matters.

use std::fmt;

/// Main error type for the stats manager
#[derive(Debug)]
pub enum ManagerError {
    /// Configuration-related errors
    Config(ConfigError),

    /// REST API errors from the GIS server or portal
    Gis(GisError),

    /// Job dispatch errors
    Job(JobError),

    /// Other errors with context
    Other(String),
}

/// Configuration error variants
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to load configuration file
    LoadFailed { path: String, reason: String },

    /// Invalid configuration value
    InvalidValue { field: String, reason: String },

    /// Missing required configuration
    MissingRequired { field: String },

    /// Configuration parsing error
    ParseError { path: String, reason: String },
}

/// REST API error variants
#[derive(Debug)]
pub enum GisError {
    /// Request could not be sent or the connection failed
    ConnectionFailed { url: String, reason: String },

    /// Server answered with a non-success HTTP status
    HttpStatus { url: String, status: u16 },

    /// Body was not the JSON document we expected
    InvalidResponse { url: String, reason: String },

    /// Admin API error object (`{"status": "error", "messages": [...]}`)
    ServerError { url: String, messages: Vec<String> },

    /// Portal / feature service error object (`{"error": {...}}`)
    ApiError {
        url: String,
        code: i64,
        message: String,
        details: Vec<String>,
    },
}

/// Job dispatch error variants
#[derive(Debug)]
pub enum JobError {
    /// Job name is not one of the known jobs
    UnknownJob { job: String },

    /// Server name is not configured
    UnknownServer { server: String },

    /// Per-server job started without naming a server
    MissingServer { job: String },

    /// Target is already running the job
    Busy { target: String, running_for: String },
}

impl fmt::Display for ManagerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagerError::Config(e) => write!(f, "Configuration error: {}", e),
            ManagerError::Gis(e) => write!(f, "GIS API error: {}", e),
            ManagerError::Job(e) => write!(f, "Job error: {}", e),
            ManagerError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::LoadFailed { path, reason } => {
                write!(f, "Failed to load config from '{}': {}", path, reason)
            }
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
            ConfigError::MissingRequired { field } => {
                write!(f, "Missing required field: {}", field)
            }
            ConfigError::ParseError { path, reason } => {
                write!(f, "Failed to parse config '{}': {}", path, reason)
            }
        }
    }
}

impl fmt::Display for GisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GisError::ConnectionFailed { url, reason } => {
                write!(f, "Request to {} failed: {}", url, reason)
            }
            GisError::HttpStatus { url, status } => {
                write!(f, "{} returned HTTP {}", url, status)
            }
            GisError::InvalidResponse { url, reason } => {
                write!(f, "Invalid response from {}: {}", url, reason)
            }
            GisError::ServerError { url, messages } => {
                write!(f, "{} returned an error: {}", url, messages.join("; "))
            }
            GisError::ApiError {
                url,
                code,
                message,
                details,
            } => {
                if details.is_empty() {
                    write!(f, "{} returned error {}: {}", url, code, message)
                } else {
                    write!(
                        f,
                        "{} returned error {}: {} ({})",
                        url,
                        code,
                        message,
                        details.join("; ")
                    )
                }
            }
        }
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::UnknownJob { job } => write!(f, "Unknown job '{}'", job),
            JobError::UnknownServer { server } => {
                write!(f, "Server '{}' is not configured", server)
            }
            JobError::MissingServer { job } => {
                write!(f, "Job '{}' needs a server name", job)
            }
            JobError::Busy {
                target,
                running_for,
            } => write!(
                f,
                "{} is already running (started {} ago)",
                target, running_for
            ),
        }
    }
}

impl std::error::Error for ManagerError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for GisError {}
impl std::error::Error for JobError {}

impl From<anyhow::Error> for ManagerError {
    fn from(err: anyhow::Error) -> Self {
        ManagerError::Other(format!("{:#}", err))
    }
}

impl From<ConfigError> for ManagerError {
    fn from(err: ConfigError) -> Self {
        ManagerError::Config(err)
    }
}

impl From<GisError> for ManagerError {
    fn from(err: GisError) -> Self {
        ManagerError::Gis(err)
    }
}

impl From<JobError> for ManagerError {
    fn from(err: JobError) -> Self {
        ManagerError::Job(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display_includes_details() {
        let err = GisError::ApiError {
            url: "https://portal/generateToken".to_string(),
            code: 400,
            message: "Unable to generate token.".to_string(),
            details: vec!["Invalid username or password.".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "https://portal/generateToken returned error 400: Unable to generate token. (Invalid username or password.)"
        );
    }

    #[test]
    fn test_manager_error_wraps_job_error() {
        let err: ManagerError = JobError::UnknownServer {
            server: "public".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Job error: Server 'public' is not configured");
    }
}
