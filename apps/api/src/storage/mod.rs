//! Image storage for posting pictures.
//!
//! Handlers only see the `ImageStore` trait; the S3/MinIO implementation is
//! wired in `main.rs`, and tests plug in an in-memory store.

use async_trait::async_trait;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::errors::AppError;

/// An image received from a multipart form.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl UploadedImage {
    /// Rejects anything whose declared type is not `image/*`.
    pub fn validate(&self) -> Result<(), AppError> {
        if !self.content_type.starts_with("image/") {
            return Err(AppError::Validation(format!(
                "Only image uploads are allowed, got '{}'",
                self.content_type
            )));
        }
        if self.bytes.is_empty() {
            return Err(AppError::Validation("Uploaded image is empty".to_string()));
        }
        Ok(())
    }

    /// Object key under `prefix`, keeping the original extension.
    pub fn object_key(&self, prefix: &str) -> String {
        let ext = self
            .file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "bin".to_string());
        format!("{}/{}.{}", prefix.trim_end_matches('/'), Uuid::new_v4(), ext)
    }
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Stores the image and returns its public URL.
    async fn put(&self, prefix: &str, image: UploadedImage) -> Result<String, AppError>;

    /// Removes the object behind a URL previously returned by `put`.
    async fn delete(&self, url: &str) -> Result<(), AppError>;
}

// ────────────────────────────────────────────────────────────────────────────
// S3ImageStore: MinIO locally, AWS in production
// ────────────────────────────────────────────────────────────────────────────

pub struct S3ImageStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    public_url: String,
}

impl S3ImageStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String, public_url: String) -> Self {
        Self {
            client,
            bucket,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    fn key_from_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.public_url.as_str())
            .map(|rest| rest.trim_start_matches('/'))
            .filter(|key| !key.is_empty())
    }
}

#[async_trait]
impl ImageStore for S3ImageStore {
    async fn put(&self, prefix: &str, image: UploadedImage) -> Result<String, AppError> {
        image.validate()?;
        let key = image.object_key(prefix);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(image.bytes))
            .content_type(image.content_type)
            .send()
            .await
            .map_err(|e| AppError::S3(format!("upload of {key} failed: {e}")))?;

        info!("Uploaded image to s3://{}/{}", self.bucket, key);
        Ok(format!("{}/{}", self.public_url, key))
    }

    async fn delete(&self, url: &str) -> Result<(), AppError> {
        let Some(key) = self.key_from_url(url) else {
            warn!("Not deleting {url}: outside of bucket {}", self.bucket);
            return Ok(());
        };

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::S3(format!("delete of {key} failed: {e}")))?;

        info!("Deleted s3://{}/{}", self.bucket, key);
        Ok(())
    }
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
pub async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "jobboard-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.s3_region.clone()))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO serves buckets by path, not by virtual host.
    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}

/// Removes an image, logging instead of failing. Used on cleanup paths.
pub async fn delete_quietly(store: &dyn ImageStore, url: &str) {
    if let Err(e) = store.delete(url).await {
        warn!("Failed to remove image {url}: {e}");
    }
}


#[cfg(test)]
mod tests {
    use super::memory::InMemoryImageStore;
    use super::*;

    fn image(name: &str, content_type: &str) -> UploadedImage {
        UploadedImage {
            file_name: name.to_string(),
            content_type: content_type.to_string(),
            bytes: Bytes::from_static(b"\x89PNG fake"),
        }
    }

    #[test]
    fn test_object_key_keeps_extension() {
        let key = image("Shop Front.PNG", "image/png").object_key("postings/");
        assert!(key.starts_with("postings/"));
        assert!(key.ends_with(".png"));
    }

    #[test]
    fn test_object_key_without_extension() {
        let key = image("photo", "image/jpeg").object_key("postings");
        assert!(key.ends_with(".bin"));
    }

    #[test]
    fn test_non_image_rejected() {
        let err = image("cv.pdf", "application/pdf").validate().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_in_memory_put_and_delete() {
        let store = InMemoryImageStore::default();
        let url = store.put("postings", image("a.jpg", "image/jpeg")).await.unwrap();
        assert!(store.objects.lock().unwrap().contains_key(&url));
        delete_quietly(&store, &url).await;
        assert!(store.objects.lock().unwrap().is_empty());
    }

    #[test]
    fn test_key_from_url_strips_public_prefix() {
        let conf = aws_sdk_s3::Config::builder()
            .behavior_version(aws_config::BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();
        let store = S3ImageStore::new(
            aws_sdk_s3::Client::from_conf(conf),
            "postings".to_string(),
            "http://localhost:9000/postings/".to_string(),
        );
        assert_eq!(
            store.key_from_url("http://localhost:9000/postings/postings/abc.png"),
            Some("postings/abc.png")
        );
        assert_eq!(store.key_from_url("https://elsewhere/abc.png"), None);
    }
}
