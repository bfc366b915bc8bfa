use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::str::FromStr;
use uuid::Uuid;

/// Whether a stored object is served without authentication (public) or
/// requires gated access (private). The upload ACL is derived one-to-one
/// from this.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
}

impl Display for Visibility {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Visibility::Public => write!(f, "public"),
            Visibility::Private => write!(f, "private"),
        }
    }
}

impl FromStr for Visibility {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            _ => Err(anyhow::anyhow!("Invalid visibility: {}", s)),
        }
    }
}

/// Back-reference to the host record a file is attached to. After a
/// migration the new remote URL is written into `owner_field` of that
/// record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnerRef {
    pub owner_type: String,
    pub owner_id: String,
    pub owner_field: String,
}

/// Where a migrated file lives in object storage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteLocation {
    pub url: String,
    pub key: String,
    pub bucket: String,
}

/// A host-owned file record, seen through the fields this workspace reads
/// and writes. The host persists these; the migration scheduler populates
/// the remote fields exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub file_name: String,
    /// Path of the local bytes; absent for files created directly in
    /// object storage.
    pub local_path: Option<PathBuf>,
    pub size_bytes: u64,
    pub visibility: Visibility,
    /// Whether this record is eligible for migration to object storage.
    pub use_object_storage: bool,
    pub remote_url: Option<String>,
    pub remote_key: Option<String>,
    pub remote_bucket: Option<String>,
    pub owner: Option<OwnerRef>,
}

impl FileRecord {
    /// A file counts as migrated once its remote key is non-empty.
    /// Migration treats such records as a no-op.
    pub fn is_migrated(&self) -> bool {
        self.remote_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Bucket and key of the stored object, when both are populated.
    pub fn remote_location(&self) -> Option<(&str, &str)> {
        match (self.remote_bucket.as_deref(), self.remote_key.as_deref()) {
            (Some(bucket), Some(key)) if !bucket.is_empty() && !key.is_empty() => {
                Some((bucket, key))
            }
            _ => None,
        }
    }
}

/// Fields for creating a record for bytes uploaded straight to object
/// storage (no local copy ever exists).
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    pub file_name: String,
    pub size_bytes: u64,
    pub visibility: Visibility,
    pub remote: RemoteLocation,
    pub owner: Option<OwnerRef>,
}
