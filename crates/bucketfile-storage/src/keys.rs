//! Shared key generation for storage backends.
//!
//! Key format: `{id}/{stem}/{file}` where `id` is a fresh UUID v4 and `stem` is the
//! file name without its last extension. Requests carrying a logical sub-path get
//! it prepended: `{path}/{id}/{stem}/{file}`.

use object_store::path::Path as ObjectPath;
use std::path::Path;

use uuid::Uuid;

use crate::traits::{StorageError, StorageResult};

/// Generate a unique object identifier.
pub fn generate_object_id() -> String {
    Uuid::new_v4().to_string()
}

/// Final path component of `name`.
pub fn file_name(name: &str) -> Option<String> {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .map(String::from)
        .filter(|n| !n.is_empty())
}

/// File name without its last extension (`"a/report.tar.gz"` -> `"report.tar"`).
pub fn file_stem(name: &str) -> Option<String> {
    Path::new(name)
        .file_stem()
        .and_then(|n| n.to_str())
        .map(String::from)
        .filter(|n| !n.is_empty())
}

/// Last extension of `name` without the dot. Dotfiles have none.
pub fn file_extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .and_then(normalize_extension)
}

/// Strip leading dots and whitespace from an explicit extension.
pub fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim().trim_start_matches('.');
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_string())
    }
}

fn normalize_prefix(path: Option<&str>) -> Option<&str> {
    path.map(|p| p.trim().trim_matches('/')).filter(|p| !p.is_empty())
}

/// Key for an uploaded local file: `{id}/{stem}/{original_name}`.
pub fn upload_key(id: &str, original_name: &str) -> Option<String> {
    let name = file_name(original_name)?;
    let stem = file_stem(&name)?;
    Some(format!("{}/{}/{}", id, stem, name))
}

/// Key for streamed content: `[{path}/]{id}/{stem}/{stem}[.{ext}]`.
///
/// The extension is taken as given; callers decide whether one is required.
pub fn object_key(path: Option<&str>, id: &str, name: &str, ext: Option<&str>) -> Option<String> {
    let stem = file_stem(name)?;
    let file = match ext.and_then(normalize_extension) {
        Some(ext) => format!("{}.{}", stem, ext),
        None => stem.clone(),
    };

    Some(match normalize_prefix(path) {
        Some(prefix) => format!("{}/{}/{}/{}", prefix, id, stem, file),
        None => format!("{}/{}/{}", id, stem, file),
    })
}

/// Reject keys that are empty, absolute, or contain `.`/`..` segments.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.trim().is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.starts_with('/') {
        return Err(StorageError::InvalidKey(
            "Storage key must not start with '/'".to_string(),
        ));
    }
    if key.split('/').any(|segment| segment == ".." || segment == ".") {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid path segments".to_string(),
        ));
    }
    Ok(())
}

/// Validate `key` and turn it into a store location that names the object verbatim.
///
/// `Path::from` would percent-encode characters such as `#` or `[`, storing the
/// object under a name that differs from the key handed back to callers.
pub fn object_path(key: &str) -> StorageResult<ObjectPath> {
    validate_key(key)?;
    let location = ObjectPath::parse(key).map_err(|e| StorageError::InvalidKey(e.to_string()))?;
    if location.as_ref() != key {
        return Err(StorageError::InvalidKey(format!(
            "Storage key is not a canonical object path: {}",
            key
        )));
    }
    Ok(location)
}

/// Percent-encode each key segment for use in a URL, keeping `/` separators.
pub fn encode_key(key: &str) -> String {
    key.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_key_keeps_original_name() {
        assert_eq!(upload_key("id", "a.txt").as_deref(), Some("id/a/a.txt"));
        assert_eq!(
            upload_key("id", "archive.tar.gz").as_deref(),
            Some("id/archive.tar/archive.tar.gz")
        );
        assert_eq!(upload_key("id", "README").as_deref(), Some("id/README/README"));
    }

    #[test]
    fn upload_key_uses_final_component() {
        assert_eq!(
            upload_key("id", "nested/dir/photo.jpg").as_deref(),
            Some("id/photo/photo.jpg")
        );
        assert_eq!(upload_key("id", ""), None);
    }

    #[test]
    fn object_key_with_and_without_extension() {
        assert_eq!(
            object_key(None, "id", "path/to/mock-file", Some("txt")).as_deref(),
            Some("id/mock-file/mock-file.txt")
        );
        assert_eq!(
            object_key(None, "id", "report.csv", Some("json")).as_deref(),
            Some("id/report/report.json")
        );
        assert_eq!(
            object_key(None, "id", "notes", None).as_deref(),
            Some("id/notes/notes")
        );
        assert_eq!(
            object_key(None, "id", "image", Some(".png")).as_deref(),
            Some("id/image/image.png")
        );
    }

    #[test]
    fn object_key_prefixes_logical_path() {
        assert_eq!(
            object_key(Some("/exports/2024/"), "id", "orders.csv", Some("csv")).as_deref(),
            Some("exports/2024/id/orders/orders.csv")
        );
        assert_eq!(
            object_key(Some("  "), "id", "orders", Some("csv")).as_deref(),
            Some("id/orders/orders.csv")
        );
    }

    #[test]
    fn extensions() {
        assert_eq!(file_extension("a.txt").as_deref(), Some("txt"));
        assert_eq!(file_extension("a.tar.gz").as_deref(), Some("gz"));
        assert_eq!(file_extension(".env"), None);
        assert_eq!(file_extension("noext"), None);
        assert_eq!(normalize_extension(" .json "), Some("json".to_string()));
        assert_eq!(normalize_extension("..."), None);
    }

    #[test]
    fn stems() {
        assert_eq!(file_stem("report.csv").as_deref(), Some("report"));
        assert_eq!(file_stem(".env").as_deref(), Some(".env"));
        assert_eq!(file_stem("a/b/c.d.e").as_deref(), Some("c.d"));
    }

    #[test]
    fn validate_key_rejects_traversal() {
        assert!(validate_key("id/a/a.txt").is_ok());
        assert!(matches!(validate_key(""), Err(StorageError::InvalidKey(_))));
        assert!(matches!(validate_key("/etc/passwd"), Err(StorageError::InvalidKey(_))));
        assert!(matches!(validate_key("a/../b"), Err(StorageError::InvalidKey(_))));
    }

    #[test]
    fn object_path_keeps_key_verbatim() {
        let key = "id/report#1~[v2]/report#1~[v2].txt";
        assert_eq!(object_path(key).unwrap().as_ref(), key);
        assert_eq!(
            object_path("id/50% off/50% off.txt").unwrap().as_ref(),
            "id/50% off/50% off.txt"
        );
        assert!(matches!(object_path("id//a.txt"), Err(StorageError::InvalidKey(_))));
        assert!(matches!(object_path("id/a/"), Err(StorageError::InvalidKey(_))));
        assert!(matches!(object_path("a/../b"), Err(StorageError::InvalidKey(_))));
    }

    #[test]
    fn encode_key_keeps_separators() {
        assert_eq!(encode_key("id/my file/my file.txt"), "id/my%20file/my%20file.txt");
        assert_eq!(encode_key("id/a/a.txt"), "id/a/a.txt");
    }

    #[test]
    fn generated_ids_are_unique_uuids() {
        let a = generate_object_id();
        let b = generate_object_id();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }
}
