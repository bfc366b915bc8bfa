//! Object key construction
//!
//! Keys follow one layout: `{base_folder}[/{folder}]/{uuid}[.{ext}]`. The
//! unique component is freshly generated per call, so uploading the same
//! filename twice never collides.

use uuid::Uuid;

/// Split the extension off a filename, taking everything after the last
/// dot. No dot, or an empty trailing segment, means no extension.
pub fn file_extension(file_name: &str) -> Option<&str> {
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// Build a fresh object key under `base_folder`, nesting under `folder`
/// when one is given.
pub fn object_key(base_folder: &str, folder: Option<&str>, file_name: &str) -> String {
    let unique = match file_extension(file_name) {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
        None => Uuid::new_v4().to_string(),
    };
    match folder {
        Some(folder) if !folder.is_empty() => {
            format!("{}{}/{}", base_folder, normalize_folder(folder), unique)
        }
        _ => format!("{}/{}", base_folder, unique),
    }
}

fn normalize_folder(folder: &str) -> String {
    if folder.starts_with('/') {
        folder.to_string()
    } else {
        format!("/{}", folder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("photo.jpg"), Some("jpg"));
        assert_eq!(file_extension("archive.tar.gz"), Some("gz"));
        assert_eq!(file_extension(".gitignore"), Some("gitignore"));
        assert_eq!(file_extension("README"), None);
        assert_eq!(file_extension("trailing."), None);
    }

    #[test]
    fn test_key_carries_extension_as_is() {
        let key = object_key("uploads", None, "PHOTO.JPG");
        assert!(key.starts_with("uploads/"));
        assert!(key.ends_with(".JPG"));

        let stem = key
            .strip_prefix("uploads/")
            .unwrap()
            .strip_suffix(".JPG")
            .unwrap();
        assert!(Uuid::parse_str(stem).is_ok());
    }

    #[test]
    fn test_key_without_extension_has_no_dot() {
        let key = object_key("uploads", None, "README");
        let stem = key.strip_prefix("uploads/").unwrap();
        assert!(Uuid::parse_str(stem).is_ok());
    }

    #[test]
    fn test_folder_is_nested_and_normalized() {
        let nested = object_key("uploads", Some("reports/2024"), "a.pdf");
        assert!(nested.starts_with("uploads/reports/2024/"));

        let already_slashed = object_key("uploads", Some("/reports"), "a.pdf");
        assert!(already_slashed.starts_with("uploads/reports/"));

        let empty = object_key("uploads", Some(""), "a.pdf");
        assert!(empty.starts_with("uploads/"));
        assert_eq!(empty.matches('/').count(), 1);
    }

    #[test]
    fn test_repeated_keys_never_collide() {
        let first = object_key("uploads", None, "photo.jpg");
        let second = object_key("uploads", None, "photo.jpg");
        assert_ne!(first, second);
    }
}
