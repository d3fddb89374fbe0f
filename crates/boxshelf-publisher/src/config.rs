//! Publish configuration
//!
//! [`PublishSettings`] is the raw input as it arrives from flags, environment
//! or a caller. [`PublishConfig`] is the validated form the orchestrator runs
//! on. Every problem found during validation is reported at once.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::storage::{ObjectStore, PutOptions, JSON_CONTENT_TYPE};
use crate::upload::{RetryPolicy, UploadOptions, MIN_PART_SIZE, MULTIPART_THRESHOLD};
use crate::url::{UrlPolicy, UrlResolver};

// ============================================================================
// Defaults
// ============================================================================

/// Canned ACL applied to boxes and the manifest when none is configured
pub const DEFAULT_ACL: &str = "public-read";

pub const DEFAULT_STORAGE_CLASS: &str = "STANDARD";

/// Longest lifetime S3 allows for a presigned URL
pub const MAX_SIGNED_EXPIRY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// All configuration problems, reported together
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigErrors(pub Vec<String>);

impl ConfigErrors {
    pub fn problems(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ConfigErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} configuration error(s):", self.0.len())?;
        for problem in &self.0 {
            write!(f, "\n  * {}", problem)?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigErrors {}

/// Unvalidated publish settings
#[derive(Debug, Clone, Default)]
pub struct PublishSettings {
    pub region: Option<String>,
    pub bucket: Option<String>,
    /// Key of the manifest document
    pub manifest: Option<String>,
    pub box_name: Option<String>,
    /// Key prefix boxes are stored under
    pub box_dir: Option<String>,
    pub version: Option<String>,
    pub acl: Option<String>,
    pub storage_class: Option<String>,
    /// CDN host that serves the bucket
    pub cloudfront: Option<String>,
    pub signed_expiry: Option<Duration>,
    pub part_size: Option<u64>,
    pub concurrency: Option<usize>,
    pub endpoint: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl PublishSettings {
    /// Problems that can be found without talking to the store
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();

        let required = [
            ("region", &self.region),
            ("bucket", &self.bucket),
            ("manifest", &self.manifest),
            ("box_name", &self.box_name),
            ("box_dir", &self.box_dir),
        ];
        for (field, value) in required {
            if non_empty(value).is_none() {
                problems.push(format!("{} must be set", field));
            }
        }

        if non_empty(&self.cloudfront).is_some() && self.signed_expiry.is_some() {
            problems.push("cloudfront and signed_expiry are mutually exclusive".to_string());
        }

        match self.signed_expiry {
            Some(ttl) if ttl.is_zero() => {
                problems.push("signed_expiry must be greater than zero".to_string());
            },
            Some(ttl) if ttl > MAX_SIGNED_EXPIRY => {
                problems.push(format!("signed_expiry must be at most 7 days, got {:?}", ttl));
            },
            _ => {},
        }

        if let Some(part_size) = self.part_size {
            if part_size < MIN_PART_SIZE {
                problems.push(format!(
                    "part_size must be at least {} bytes, got {}",
                    MIN_PART_SIZE, part_size
                ));
            }
        }

        if self.concurrency == Some(0) {
            problems.push("concurrency must be greater than 0".to_string());
        }

        if let Some(version) = non_empty(&self.version) {
            if let Err(e) = semver::Version::parse(version) {
                problems.push(format!("version '{}' is not a semantic version: {}", version, e));
            }
        }

        problems
    }
}

/// Validated publish configuration
#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub region: String,
    pub bucket: String,
    pub manifest_key: String,
    pub box_name: String,
    pub box_dir: String,
    /// Explicit version; `None` bumps the manifest's latest minor
    pub version: Option<String>,
    pub acl: String,
    pub storage_class: String,
    pub url_policy: UrlPolicy,
    pub endpoint: Option<String>,
    pub upload: UploadOptions,
}

impl PublishConfig {
    /// Validate settings without contacting the store
    pub fn from_settings(settings: PublishSettings) -> Result<Self, ConfigErrors> {
        let problems = settings.problems();
        if !problems.is_empty() {
            return Err(ConfigErrors(problems));
        }
        Ok(Self::build(settings))
    }

    /// Validate settings and check that the bucket is reachable through
    /// `store`. Store access failures are reported with the other problems.
    pub async fn from_settings_checked(
        settings: PublishSettings,
        store: &dyn ObjectStore,
    ) -> Result<Self, ConfigErrors> {
        let mut problems = settings.problems();

        if let Err(e) = store.head_bucket().await {
            problems.push(format!(
                "Unable to access the bucket {}: {}. Make sure your credentials are valid and have sufficient permissions",
                store.bucket(),
                e
            ));
        }

        if !problems.is_empty() {
            return Err(ConfigErrors(problems));
        }
        Ok(Self::build(settings))
    }

    fn build(settings: PublishSettings) -> Self {
        let take = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let url_policy = match (take(settings.cloudfront), settings.signed_expiry) {
            (Some(host), _) => UrlPolicy::Cdn(host),
            (None, Some(ttl)) => UrlPolicy::Presigned(ttl),
            (None, None) => UrlPolicy::Plain,
        };

        let defaults = UploadOptions::default();

        Self {
            region: take(settings.region).unwrap_or_default(),
            bucket: take(settings.bucket).unwrap_or_default(),
            manifest_key: take(settings.manifest).unwrap_or_default(),
            box_name: take(settings.box_name).unwrap_or_default(),
            box_dir: take(settings.box_dir)
                .map(|d| d.trim_end_matches('/').to_string())
                .unwrap_or_default(),
            version: take(settings.version),
            acl: take(settings.acl).unwrap_or_else(|| DEFAULT_ACL.to_string()),
            storage_class: take(settings.storage_class)
                .unwrap_or_else(|| DEFAULT_STORAGE_CLASS.to_string()),
            url_policy,
            endpoint: take(settings.endpoint),
            upload: UploadOptions {
                part_size: settings.part_size.unwrap_or(defaults.part_size),
                concurrency: settings.concurrency.unwrap_or(defaults.concurrency),
                multipart_threshold: MULTIPART_THRESHOLD,
                retry: RetryPolicy::default(),
            },
        }
    }

    pub fn url_resolver(&self) -> UrlResolver {
        UrlResolver::new(
            &self.region,
            &self.bucket,
            self.endpoint.clone(),
            self.url_policy.clone(),
        )
    }

    /// `{box_dir}/{version}/{basename}`
    pub fn box_key(&self, version: &str, box_path: &Path) -> String {
        let basename = box_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        format!("{}/{}/{}", self.box_dir, version, basename)
    }

    pub fn box_put_options(&self) -> PutOptions {
        PutOptions {
            acl: Some(self.acl.clone()),
            content_type: None,
            storage_class: Some(self.storage_class.clone()),
        }
    }

    pub fn manifest_put_options(&self) -> PutOptions {
        PutOptions {
            acl: Some(self.acl.clone()),
            content_type: Some(JSON_CONTENT_TYPE.to_string()),
            storage_class: None,
        }
    }
}

/// Parse a duration such as `3600`, `90s`, `30m`, `12h`, `7d` or `1h30m`.
/// A bare number is seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("empty duration".to_string());
    }

    if let Ok(secs) = input.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }

    let mut total = Duration::ZERO;
    let mut digits = String::new();

    for c in input.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }

        let amount: u64 = digits
            .parse()
            .map_err(|_| format!("invalid duration '{}'", input))?;
        let unit_secs: u64 = match c {
            's' => 1,
            'm' => 60,
            'h' => 60 * 60,
            'd' => 24 * 60 * 60,
            _ => return Err(format!("unknown unit '{}' in duration '{}'", c, input)),
        };
        total = amount
            .checked_mul(unit_secs)
            .and_then(|secs| total.checked_add(Duration::from_secs(secs)))
            .ok_or_else(|| format!("duration '{}' is too large", input))?;
        digits.clear();
    }

    if !digits.is_empty() {
        return Err(format!("missing unit after '{}' in duration '{}'", digits, input));
    }

    Ok(total)
}
