use std::env;

/// How the S3 client resolves credentials
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CredentialSource {
    /// Explicit key pair, optionally with a session token
    Static {
        access_key: String,
        secret_key: String,
        session_token: Option<String>,
    },
    /// Named profile from the shared credentials file
    Profile(String),
    /// The default AWS provider chain (environment, shared file, IMDS, ...)
    #[default]
    DefaultChain,
}

impl CredentialSource {
    /// Static when both halves of the key pair are present, else the profile
    /// when one is named, else the default chain
    pub fn select(
        access_key: Option<String>,
        secret_key: Option<String>,
        session_token: Option<String>,
        profile: Option<String>,
    ) -> Self {
        match (access_key, secret_key, profile) {
            (Some(access_key), Some(secret_key), _)
                if !access_key.is_empty() && !secret_key.is_empty() =>
            {
                Self::Static {
                    access_key,
                    secret_key,
                    session_token: session_token.filter(|t| !t.is_empty()),
                }
            },
            (_, _, Some(profile)) if !profile.is_empty() => Self::Profile(profile),
            _ => Self::DefaultChain,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Custom endpoint such as a MinIO server; forces path-style addressing
    pub endpoint: Option<String>,
    pub region: String,
    pub bucket: String,
    pub credentials: CredentialSource,
}

impl StoreConfig {
    /// Read `S3_ENDPOINT`, `S3_REGION`, `S3_BUCKET`, `S3_ACCESS_KEY` and
    /// `S3_SECRET_KEY`
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var("S3_ENDPOINT").ok(),
            region: env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            bucket: env::var("S3_BUCKET").unwrap_or_else(|_| "boxshelf-test".to_string()),
            credentials: CredentialSource::select(
                env::var("S3_ACCESS_KEY").ok(),
                env::var("S3_SECRET_KEY").ok(),
                None,
                None,
            ),
        }
    }
}
