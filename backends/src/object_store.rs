use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, ObjectCannedAcl};
use backup_rotator_core::{Error, Result};
use bytes::Bytes;

/// One uploaded part of a multipart session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPart {
    pub part_number: i32,
    pub e_tag: String,
}

#[derive(Debug, Clone, Default)]
pub struct ObjectListing {
    pub keys: Vec<String>,
    pub truncated: bool,
}

/// The remote calls the object-store backend needs. Implemented for the AWS
/// SDK below; tests substitute a recording double.
#[async_trait]
pub trait ObjectStoreClient: Send + Sync {
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<()>;

    /// Returns the upload id of the new session.
    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> Result<String>;

    /// Returns the part's ETag.
    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<String>;

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[UploadedPart],
    ) -> Result<()>;

    async fn list_objects(&self, bucket: &str, prefix: &str, max_keys: i32) -> Result<ObjectListing>;

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool>;

    async fn copy_object(&self, bucket: &str, source_key: &str, target_key: &str) -> Result<()>;

    /// Must succeed when the key does not exist.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;
}

pub struct AwsS3Client {
    client: Client,
}

impl AwsS3Client {
    /// Uses the default AWS credential chain unless explicit credentials are
    /// given.
    pub async fn connect(region: &str, credentials: Option<(String, String)>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));
        if let Some((key, secret)) = credentials {
            loader = loader.credentials_provider(Credentials::new(key, secret, None, None, "backup-rotator"));
        }
        let config = loader.load().await;
        Self {
            client: Client::new(&config),
        }
    }
}

#[async_trait]
impl ObjectStoreClient for AwsS3Client {
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| Error::Backend(format!("Failed to upload {}: {}", key, e)))?;
        Ok(())
    }

    async fn create_multipart_upload(&self, bucket: &str, key: &str) -> Result<String> {
        let response = self
            .client
            .create_multipart_upload()
            .acl(ObjectCannedAcl::Private)
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Error::Backend(format!("Failed to start multipart upload of {}: {}", key, e)))?;
        response
            .upload_id()
            .map(str::to_string)
            .ok_or_else(|| Error::Backend("No upload ID returned".to_string()))
    }

    async fn upload_part(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        part_number: i32,
        body: Bytes,
    ) -> Result<String> {
        let response = self
            .client
            .upload_part()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| Error::Backend(format!("Failed to upload part {} of {}: {}", part_number, key, e)))?;
        response
            .e_tag()
            .map(str::to_string)
            .ok_or_else(|| Error::Backend(format!("No ETag returned for part {}", part_number)))
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        parts: &[UploadedPart],
    ) -> Result<()> {
        let completed_parts = parts
            .iter()
            .map(|part| {
                CompletedPart::builder()
                    .part_number(part.part_number)
                    .e_tag(&part.e_tag)
                    .build()
            })
            .collect();
        let completed_upload = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(completed_upload)
            .send()
            .await
            .map_err(|e| Error::Backend(format!("Failed to complete multipart upload of {}: {}", key, e)))?;
        Ok(())
    }

    async fn list_objects(&self, bucket: &str, prefix: &str, max_keys: i32) -> Result<ObjectListing> {
        let response = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .max_keys(max_keys)
            .send()
            .await
            .map_err(|e| Error::Backend(format!("Failed to list {}: {}", prefix, e)))?;

        Ok(ObjectListing {
            keys: response
                .contents()
                .iter()
                .filter_map(|object| object.key().map(str::to_string))
                .collect(),
            truncated: response.is_truncated().unwrap_or(false),
        })
    }

    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(e) => {
                if e.as_service_error().is_some_and(|err| err.is_not_found()) {
                    Ok(false)
                } else {
                    Err(Error::Backend(format!("Failed to check existence of {}: {}", key, e)))
                }
            }
        }
    }

    async fn copy_object(&self, bucket: &str, source_key: &str, target_key: &str) -> Result<()> {
        self.client
            .copy_object()
            .bucket(bucket)
            .copy_source(format!("{}/{}", bucket, source_key))
            .key(target_key)
            .send()
            .await
            .map_err(|e| Error::Backend(format!("Failed to copy {} to {}: {}", source_key, target_key, e)))?;
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Error::Backend(format!("Failed to delete {}: {}", key, e)))?;
        Ok(())
    }
}
