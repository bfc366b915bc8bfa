//! Bucket configuration registry
//!
//! Validates the configured bucket list once at startup and answers routing
//! questions afterwards: which bucket serves public or private uploads, what
//! size limit applies to a given file, and which folder prefixes its keys.

use std::collections::HashMap;

use offsite_core::{BucketConfig, Visibility, DEFAULT_UPLOAD_FOLDER};

use crate::traits::{StorageError, StorageResult};

/// Extensions treated as images when picking a size limit. Matching is
/// case-sensitive, so `JPG` falls under the general file limit.
pub const IMAGE_EXTENSIONS: [&str; 11] = [
    "jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp", "heif", "heic", "svg",
];

#[derive(Debug, Clone, Copy)]
struct SizeLimits {
    image_kb: u64,
    file_kb: u64,
}

/// Validated view over the configured buckets.
#[derive(Debug, Clone)]
pub struct BucketRegistry {
    buckets: Vec<BucketConfig>,
    limits: HashMap<String, SizeLimits>,
    default_public: Option<String>,
    default_private: Option<String>,
}

impl BucketRegistry {
    /// Validate the configured buckets and build the registry.
    ///
    /// Every bucket must carry exactly one of the default-public and
    /// default-private flags. All violations are collected before failing
    /// so a broken config surfaces in one pass.
    pub fn load(buckets: Vec<BucketConfig>) -> StorageResult<Self> {
        let mut violations = Vec::new();
        for bucket in &buckets {
            if bucket.is_default_public && bucket.is_default_private {
                violations.push(format!(
                    "bucket {} is flagged both default-public and default-private",
                    bucket.name
                ));
            } else if !bucket.is_default_public && !bucket.is_default_private {
                violations.push(format!(
                    "bucket {} must be flagged default-public or default-private",
                    bucket.name
                ));
            }
        }
        if !violations.is_empty() {
            return Err(StorageError::InvalidBucketConfig { violations });
        }

        let mut limits = HashMap::new();
        let mut default_public = None;
        let mut default_private = None;
        for bucket in &buckets {
            limits.insert(
                bucket.name.clone(),
                SizeLimits {
                    image_kb: bucket.max_image_size_kb,
                    file_kb: bucket.max_file_size_kb,
                },
            );
            // First bucket in configured order wins; later duplicates are
            // ignored.
            if bucket.is_default_public && default_public.is_none() {
                default_public = Some(bucket.name.clone());
            }
            if bucket.is_default_private && default_private.is_none() {
                default_private = Some(bucket.name.clone());
            }
        }

        Ok(Self {
            buckets,
            limits,
            default_public,
            default_private,
        })
    }

    /// Bucket that serves uploads of the given visibility, if one is
    /// configured.
    pub fn default_bucket_for(&self, visibility: Visibility) -> Option<&str> {
        match visibility {
            Visibility::Public => self.default_public.as_deref(),
            Visibility::Private => self.default_private.as_deref(),
        }
    }

    /// Size limit in KB for a file with the given extension landing in
    /// `bucket`. Image extensions get the image limit, everything else the
    /// general file limit.
    pub fn size_limit_kb(&self, bucket: &str, extension: &str) -> StorageResult<u64> {
        let limits = self
            .limits
            .get(bucket)
            .ok_or_else(|| StorageError::UnknownBucket(bucket.to_string()))?;
        if self.is_image_extension(extension) {
            Ok(limits.image_kb)
        } else {
            Ok(limits.file_kb)
        }
    }

    pub fn is_image_extension(&self, extension: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&extension)
    }

    /// Base folder for keys in `bucket`. Falls back to the standard upload
    /// folder when the bucket is unknown or has no folder configured.
    pub fn default_folder(&self, bucket: &str) -> &str {
        self.buckets
            .iter()
            .find(|b| b.name == bucket)
            .and_then(|b| b.default_folder.as_deref())
            .filter(|folder| !folder.is_empty())
            .unwrap_or(DEFAULT_UPLOAD_FOLDER)
    }

    pub fn buckets(&self) -> &[BucketConfig] {
        &self.buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bucket(name: &str, public: bool, private: bool) -> BucketConfig {
        BucketConfig {
            name: name.to_string(),
            is_default_public: public,
            is_default_private: private,
            max_image_size_kb: 5120,
            max_file_size_kb: 10240,
            default_folder: None,
        }
    }

    #[test]
    fn test_load_collects_every_violation() {
        let err = BucketRegistry::load(vec![
            bucket("both", true, true),
            bucket("neither", false, false),
            bucket("ok", true, false),
        ])
        .unwrap_err();

        match err {
            StorageError::InvalidBucketConfig { violations } => {
                assert_eq!(violations.len(), 2);
                assert!(violations[0].contains("both"));
                assert!(violations[1].contains("neither"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_first_configured_default_wins() {
        let registry = BucketRegistry::load(vec![
            bucket("pub-one", true, false),
            bucket("pub-two", true, false),
            bucket("priv", false, true),
        ])
        .unwrap();

        assert_eq!(
            registry.default_bucket_for(Visibility::Public),
            Some("pub-one")
        );
        assert_eq!(
            registry.default_bucket_for(Visibility::Private),
            Some("priv")
        );
    }

    #[test]
    fn test_missing_default_is_none() {
        let registry = BucketRegistry::load(vec![bucket("pub", true, false)]).unwrap();
        assert_eq!(registry.default_bucket_for(Visibility::Private), None);
    }

    #[test]
    fn test_size_limit_routes_by_extension() {
        let registry = BucketRegistry::load(vec![bucket("media", true, false)]).unwrap();

        for ext in IMAGE_EXTENSIONS {
            assert_eq!(registry.size_limit_kb("media", ext).unwrap(), 5120);
        }
        assert_eq!(registry.size_limit_kb("media", "pdf").unwrap(), 10240);
        assert_eq!(registry.size_limit_kb("media", "").unwrap(), 10240);
        // Matching is case-sensitive, uppercase goes to the file limit.
        assert_eq!(registry.size_limit_kb("media", "JPG").unwrap(), 10240);
    }

    #[test]
    fn test_size_limit_unknown_bucket() {
        let registry = BucketRegistry::load(vec![bucket("media", true, false)]).unwrap();
        assert!(matches!(
            registry.size_limit_kb("missing", "jpg"),
            Err(StorageError::UnknownBucket(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_default_folder_fallbacks() {
        let mut custom = bucket("custom", true, false);
        custom.default_folder = Some("assets".to_string());
        let mut blank = bucket("blank", false, true);
        blank.default_folder = Some(String::new());

        let registry = BucketRegistry::load(vec![custom, blank]).unwrap();

        assert_eq!(registry.default_folder("custom"), "assets");
        assert_eq!(registry.default_folder("blank"), DEFAULT_UPLOAD_FOLDER);
        assert_eq!(registry.default_folder("unknown"), DEFAULT_UPLOAD_FOLDER);
    }

    #[test]
    fn test_empty_config_is_valid() {
        let registry = BucketRegistry::load(Vec::new()).unwrap();
        assert_eq!(registry.default_bucket_for(Visibility::Public), None);
        assert!(registry.buckets().is_empty());
    }
}
