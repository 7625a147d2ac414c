use crate::{FileTransport, Mailer, MailerError, SmtpTransport};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailerConfig {
    pub transport: TransportConfig,
    pub from_address: String,
    pub from_name: Option<String>,
    pub app_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransportConfig {
    Smtp(SmtpSettings),
    File { output_dir: PathBuf },
}

/// Where and how to reach the SMTP relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpSettings {
    pub host: String,
    /// Defaults to the port implied by `tls`.
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default)]
    pub tls: TlsType,
}

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TlsType {
    /// Plaintext. Only for a local relay.
    None,
    #[default]
    StartTls,
    /// Implicit TLS, usually port 465.
    Tls,
}

impl std::str::FromStr for TlsType {
    type Err = MailerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(TlsType::None),
            "starttls" => Ok(TlsType::StartTls),
            "tls" => Ok(TlsType::Tls),
            other => Err(MailerError::Config(format!(
                "Unknown MAILER_SMTP_TLS value: {other}"
            ))),
        }
    }
}

impl MailerConfig {
    /// Build a configuration from `MAILER_*` environment variables.
    ///
    /// `MAILER_SMTP_HOST` selects SMTP; otherwise `MAILER_FILE_OUTPUT_DIR` (or
    /// `./emails` when unset) selects the file transport.
    pub fn from_env() -> Result<Self, MailerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, MailerError> {
        let transport = if let Some(host) = var("MAILER_SMTP_HOST") {
            let port = var("MAILER_SMTP_PORT")
                .map(|p| {
                    p.parse::<u16>()
                        .map_err(|e| MailerError::Config(format!("Invalid MAILER_SMTP_PORT: {e}")))
                })
                .transpose()?;
            let tls = var("MAILER_SMTP_TLS")
                .map(|t| t.parse())
                .transpose()?
                .unwrap_or_default();

            TransportConfig::Smtp(SmtpSettings {
                host,
                port,
                username: var("MAILER_SMTP_USERNAME"),
                password: var("MAILER_SMTP_PASSWORD"),
                tls,
            })
        } else {
            TransportConfig::File {
                output_dir: var("MAILER_FILE_OUTPUT_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./emails")),
            }
        };

        Ok(Self {
            transport,
            from_address: var("MAILER_FROM_ADDRESS")
                .unwrap_or_else(|| "noreply@example.com".to_string()),
            from_name: var("MAILER_FROM_NAME"),
            app_name: var("MAILER_APP_NAME").unwrap_or_else(|| "Tessera".to_string()),
        })
    }

    pub fn build_transport(&self) -> Result<Box<dyn Mailer>, MailerError> {
        match &self.transport {
            TransportConfig::Smtp(settings) => Ok(Box::new(SmtpTransport::connect(settings)?)),
            TransportConfig::File { output_dir } => Ok(Box::new(FileTransport::new(output_dir)?)),
        }
    }

    pub fn get_from_address(&self) -> String {
        if let Some(name) = &self.from_name {
            format!("{} <{}>", name, self.from_address)
        } else {
            self.from_address.clone()
        }
    }
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            transport: TransportConfig::File {
                output_dir: PathBuf::from("./emails"),
            },
            from_address: "noreply@example.com".to_string(),
            from_name: None,
            app_name: "Tessera".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_to_file_transport() {
        let config = MailerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.from_address, "noreply@example.com");
        assert_eq!(config.app_name, "Tessera");

        match config.transport {
            TransportConfig::File { output_dir } => {
                assert_eq!(output_dir, PathBuf::from("./emails"));
            }
            _ => panic!("Expected file transport"),
        }
    }

    #[test]
    fn test_smtp_from_vars() {
        let config = MailerConfig::from_lookup(lookup(&[
            ("MAILER_SMTP_HOST", "smtp.example.com"),
            ("MAILER_SMTP_PORT", "2525"),
            ("MAILER_SMTP_TLS", "StartTLS"),
            ("MAILER_FROM_NAME", "Blog"),
        ]))
        .unwrap();

        match config.transport {
            TransportConfig::Smtp(ref settings) => {
                assert_eq!(settings.host, "smtp.example.com");
                assert_eq!(settings.port, Some(2525));
                assert_eq!(settings.tls, TlsType::StartTls);
            }
            _ => panic!("Expected SMTP transport"),
        }
        assert_eq!(config.get_from_address(), "Blog <noreply@example.com>");
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = MailerConfig::from_lookup(lookup(&[
            ("MAILER_SMTP_HOST", "smtp.example.com"),
            ("MAILER_SMTP_PORT", "smtp"),
        ]));
        assert!(matches!(result, Err(MailerError::Config(_))));
    }

    #[test]
    fn test_build_file_transport() {
        let dir = std::env::temp_dir().join("tessera-mailer-config-test");
        let config = MailerConfig {
            transport: TransportConfig::File { output_dir: dir },
            ..MailerConfig::default()
        };
        assert!(config.build_transport().is_ok());
    }
}
