//! Object storage addressing.
//!
//! Files live either in Cloudflare R2 (served back through the proxy
//! endpoint) or on local disk under `/uploads`. This module decides object
//! keys, the public URL handed to clients, and how to map a stored URL back
//! to a location when the file must be deleted.

use std::fmt;

use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

/// Path segment of the proxy endpoint that streams R2 objects.
pub const PROXY_PATH: &str = "/api/materials/proxy/";
/// Path prefix under which local files are served.
pub const UPLOADS_PATH: &str = "/uploads/";
const FILE_NAME_MAX: usize = 100;

/// Where an object is physically kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Cloudflare R2 bucket.
    R2,
    /// Local upload directory.
    Local,
}

/// Raised when a key would escape its storage root.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("object key is not a safe relative path: {key}")]
pub struct ObjectKeyError {
    key: String,
}

/// Relative, slash-separated object key with no `..` or empty segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Validate a key.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, ObjectKeyError> {
        let raw = raw.as_ref();
        let safe = !raw.is_empty()
            && !raw.starts_with('/')
            && !raw.contains('\\')
            && !raw.contains('\0')
            && raw
                .split('/')
                .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
        if safe {
            Ok(Self(raw.to_owned()))
        } else {
            Err(ObjectKeyError {
                key: raw.to_owned(),
            })
        }
    }

    /// Build a fresh key as `{folder}/{millis}-{nonce}-{sanitised name}`.
    ///
    /// # Examples
    /// ```
    /// use digidiploma::domain::ObjectKey;
    ///
    /// let key = ObjectKey::generate("materials", "Unit 1 Notes (final).pdf", 1_700_000_000_000, "a1b2c3d4");
    /// assert_eq!(key.as_ref(), "materials/1700000000000-a1b2c3d4-Unit_1_Notes_final_.pdf");
    /// ```
    pub fn generate(folder: &str, original_name: &str, unix_millis: i64, nonce: &str) -> Self {
        let folder = sanitise_folder(folder);
        let name = sanitise_file_name(original_name);
        Self(format!("{folder}/{unix_millis}-{nonce}-{name}"))
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ObjectKey> for String {
    fn from(value: ObjectKey) -> Self {
        value.0
    }
}

impl TryFrom<String> for ObjectKey {
    type Error = ObjectKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

/// Replace anything outside `[A-Za-z0-9._-]` with `_`, collapse runs, cap length.
pub fn sanitise_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw).trim();
    let mut out = String::with_capacity(base.len());
    for c in base.chars() {
        let mapped = if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
            c
        } else {
            '_'
        };
        if mapped == '_' && out.ends_with('_') {
            continue;
        }
        out.push(mapped);
    }
    let trimmed = out.trim_start_matches('.');
    let mut name: String = trimmed.chars().take(FILE_NAME_MAX).collect();
    if name.is_empty() || name.chars().all(|c| c == '_') {
        name = "file".to_owned();
    }
    name
}

fn sanitise_folder(raw: &str) -> String {
    let segments: Vec<String> = raw
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "." && *s != "..")
        .map(|s| {
            s.chars()
                .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
                .collect()
        })
        .collect();
    if segments.is_empty() {
        "misc".to_owned()
    } else {
        segments.join("/")
    }
}

/// A file as recorded on an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    /// URL handed to clients.
    pub url: String,
    pub key: ObjectKey,
    pub backend: StorageBackend,
    pub size: u64,
    pub content_type: String,
    pub original_name: String,
}

/// Public addresses used to recognise stored URLs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageAddressing {
    /// Base of this API, e.g. `https://api.digidiploma.in`.
    pub public_base_url: String,
    /// Public bucket URL, e.g. `https://pub-xyz.r2.dev`.
    pub r2_public_url: Option<String>,
    pub r2_account_id: Option<String>,
    pub r2_bucket: Option<String>,
}

impl StorageAddressing {
    /// URL clients use to fetch an R2 object through the proxy endpoint.
    pub fn proxy_url(&self, key: &ObjectKey) -> String {
        format!(
            "{}{PROXY_PATH}{}",
            self.public_base_url.trim_end_matches('/'),
            key
        )
    }

    /// URL clients use to fetch a local file.
    pub fn local_url(key: &ObjectKey) -> String {
        format!("{UPLOADS_PATH}{key}")
    }

    /// Map a stored URL back to where the object lives.
    pub fn locate(&self, url: &str) -> StorageLocation {
        let url = url.trim();
        let without_query = url.split(['?', '#']).next().unwrap_or(url);

        if let Some((_, rest)) = without_query.split_once(PROXY_PATH) {
            return remote(rest);
        }
        if let Some(rest) = self
            .r2_public_url
            .as_deref()
            .map(|base| base.trim_end_matches('/'))
            .filter(|base| !base.is_empty())
            .and_then(|base| without_query.strip_prefix(base))
            .and_then(|rest| rest.strip_prefix('/'))
        {
            return remote(rest);
        }
        if let Some(rest) = self.strip_r2_endpoint(without_query) {
            return remote(rest);
        }
        if let Some(rest) = without_query
            .strip_prefix(UPLOADS_PATH)
            .or_else(|| without_query.strip_prefix("uploads/"))
        {
            return local(rest);
        }
        StorageLocation::Unrecognised
    }

    fn strip_r2_endpoint<'a>(&self, url: &'a str) -> Option<&'a str> {
        let account = self.r2_account_id.as_deref()?;
        let bucket = self.r2_bucket.as_deref()?;
        let host = format!("https://{account}.r2.cloudflarestorage.com/{bucket}/");
        url.strip_prefix(host.as_str())
    }
}

fn decode(raw: &str) -> Option<ObjectKey> {
    let decoded = percent_decode_str(raw).decode_utf8().ok()?;
    ObjectKey::parse(decoded.as_ref()).ok()
}

fn remote(raw: &str) -> StorageLocation {
    decode(raw).map_or(StorageLocation::Unrecognised, StorageLocation::Remote)
}

fn local(raw: &str) -> StorageLocation {
    decode(raw).map_or(StorageLocation::Unrecognised, StorageLocation::Local)
}

/// Result of mapping a URL back to storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageLocation {
    /// Object in the R2 bucket.
    Remote(ObjectKey),
    /// File under the local upload directory.
    Local(ObjectKey),
    /// Anything else, such as a Google Drive link.
    Unrecognised,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn addressing() -> StorageAddressing {
        StorageAddressing {
            public_base_url: "https://api.digidiploma.in/".into(),
            r2_public_url: Some("https://pub-123.r2.dev".into()),
            r2_account_id: Some("acc42".into()),
            r2_bucket: Some("digidiploma".into()),
        }
    }

    fn key(raw: &str) -> ObjectKey {
        ObjectKey::parse(raw).expect("valid key")
    }

    #[rstest]
    #[case(
        "https://api.digidiploma.in/api/materials/proxy/materials/1-ab-notes.pdf",
        StorageLocation::Remote(key("materials/1-ab-notes.pdf"))
    )]
    #[case(
        "http://localhost:5000/api/materials/proxy/materials/1-ab-my%20notes.pdf?download=1",
        StorageLocation::Remote(key("materials/1-ab-my notes.pdf"))
    )]
    #[case(
        "https://pub-123.r2.dev/avatars/2-cd-me.png",
        StorageLocation::Remote(key("avatars/2-cd-me.png"))
    )]
    #[case(
        "https://acc42.r2.cloudflarestorage.com/digidiploma/notices/3-ef-a.pdf",
        StorageLocation::Remote(key("notices/3-ef-a.pdf"))
    )]
    #[case("/uploads/materials/4-gh-b.pdf", StorageLocation::Local(key("materials/4-gh-b.pdf")))]
    #[case("uploads/materials/4-gh-b.pdf", StorageLocation::Local(key("materials/4-gh-b.pdf")))]
    #[case("https://drive.google.com/file/d/abc/view", StorageLocation::Unrecognised)]
    #[case("/uploads/../etc/passwd", StorageLocation::Unrecognised)]
    #[case("", StorageLocation::Unrecognised)]
    fn locates_stored_urls(
        addressing: StorageAddressing,
        #[case] url: &str,
        #[case] expected: StorageLocation,
    ) {
        assert_eq!(addressing.locate(url), expected);
    }

    #[rstest]
    fn proxy_url_trims_trailing_slash(addressing: StorageAddressing) {
        let url = addressing.proxy_url(&key("materials/x.pdf"));
        assert_eq!(url, "https://api.digidiploma.in/api/materials/proxy/materials/x.pdf");
    }

    #[rstest]
    #[case("../../secret.txt", "secret.txt")]
    #[case("C:\\Users\\me\\résumé final.docx", "r_sum_final.docx")]
    #[case("???", "file")]
    #[case(".htaccess", "htaccess")]
    fn sanitises_file_names(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(sanitise_file_name(raw), expected);
    }

    #[rstest]
    #[case("")]
    #[case("/abs/path")]
    #[case("a//b")]
    #[case("a/../b")]
    fn rejects_unsafe_keys(#[case] raw: &str) {
        assert!(ObjectKey::parse(raw).is_err());
    }

    #[rstest]
    fn generated_keys_are_safe() {
        let key = ObjectKey::generate("../projects", "../../x.zip", 5, "n0nce");
        assert_eq!(key.as_ref(), "projects/5-n0nce-x.zip");
        assert!(ObjectKey::parse(key.as_ref()).is_ok());
    }
}
