use anyhow::Result;
use dotenvy::dotenv;
use secrecy::Secret;
use serde::Deserialize;
use std::env;

#[derive(Deserialize, Clone, Debug)]
pub struct Config {
    pub server: ServerConfig,
    pub fbr: FbrConfig,
    pub service_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// FBR digital-invoicing settings.
///
/// `environment` selects which endpoint block a submission uses and is
/// validated at submission time; anything other than `sandbox` or
/// `production` is a configuration error surfaced to the caller before any
/// network attempt.
#[derive(Deserialize, Clone, Debug)]
pub struct FbrConfig {
    pub enabled: bool,
    pub environment: String,
    pub sandbox: FbrEndpoint,
    pub production: FbrEndpoint,
}

#[derive(Deserialize, Clone, Debug)]
pub struct FbrEndpoint {
    pub api_url: String,
    pub security_token: Secret<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let host = env::var("EINVOICE_SERVICE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("EINVOICE_SERVICE_PORT")
            .unwrap_or_else(|_| "3011".to_string())
            .parse()?;

        let enabled = env::var("FBR_ENABLED")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);
        let environment = env::var("FBR_ENVIRONMENT").unwrap_or_else(|_| "sandbox".to_string());

        let sandbox_api_url = env::var("FBR_SANDBOX_API_URL").unwrap_or_else(|_| {
            "https://gw.fbr.gov.pk/di_data/v1/di/postinvoicedata_sb".to_string()
        });
        let sandbox_token = env::var("FBR_SANDBOX_SECURITY_TOKEN").unwrap_or_default();

        let production_api_url = env::var("FBR_PRODUCTION_API_URL")
            .unwrap_or_else(|_| "https://gw.fbr.gov.pk/di_data/v1/di/postinvoicedata".to_string());
        let production_token = env::var("FBR_PRODUCTION_SECURITY_TOKEN").unwrap_or_default();

        Ok(Self {
            server: ServerConfig { host, port },
            fbr: FbrConfig {
                enabled,
                environment,
                sandbox: FbrEndpoint {
                    api_url: sandbox_api_url,
                    security_token: Secret::new(sandbox_token),
                },
                production: FbrEndpoint {
                    api_url: production_api_url,
                    security_token: Secret::new(production_token),
                },
            },
            service_name: "einvoice-service".to_string(),
        })
    }
}
