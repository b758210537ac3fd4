//! Object storage adapters behind the [`BlobStore`](crate::domain::ports::BlobStore) port.
//!
//! - [`R2BlobStore`]: Cloudflare R2 through its S3-compatible API.
//! - [`LocalBlobStore`]: a directory on local disk, served at `/uploads`.

mod local;
mod r2;

pub use local::LocalBlobStore;
pub use r2::{R2BlobStore, R2Config};
