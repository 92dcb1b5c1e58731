use crate::backend::{Backend, BackendType, CopyOutcome};
use crate::object_store::{AwsS3Client, ObjectStoreClient, UploadedPart};
use async_trait::async_trait;
use backup_rotator_core::naming::{
    MODIFIER_SEPARATOR, extract_modifier, modified_file_name, split_file_name, validate_modifier,
};
use backup_rotator_core::{EngineConfig, Error, Result};
use bytes::{Bytes, BytesMut};
use tracing::{debug, info};

/// Chunk size advertised to callers. Matches the part threshold so most
/// chunks flush as soon as they arrive.
pub const S3_CHUNK_SIZE_KB: usize = 5120;

/// Smallest part S3 accepts in a multipart upload (all but the last part).
pub const MINIMUM_MULTIPART_SIZE_KB: usize = 5120;

/// Longest object key S3 accepts, in bytes.
pub const MAX_KEY_LENGTH: usize = 1024;

/// Listing this many copies is treated as a fault rather than paginated.
pub const MAX_LISTED_COPIES: usize = 1000;

/// How the current upload is being transferred. Moves forward only:
/// `Unknown -> Upload` or `Unknown -> Multipart`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadMode {
    /// Still buffering, no transfer decided yet.
    Unknown,
    /// Sent in one `put_object` call.
    Upload,
    /// A multipart session is open.
    Multipart,
}

/// Uploads the backup to a bucket, switching to a multipart upload once the
/// buffered data reaches the minimum part size.
pub struct S3Backend<C = AwsS3Client> {
    client: C,
    bucket: String,
    key: String,
    mode: UploadMode,
    upload_id: Option<String>,
    parts: Vec<UploadedPart>,
    cache: BytesMut,
    min_part_size: usize,
    finished: bool,
}

impl S3Backend<AwsS3Client> {
    /// Builds a backend from `region`, `bucket` and `filename`, plus the
    /// optional `aws_key`/`aws_secret` pair and `multipart_threshold_kb`.
    pub async fn from_config(config: &EngineConfig) -> Result<Self> {
        let credentials = match (config.optional_str("aws_key")?, config.optional_str("aws_secret")?) {
            (Some(key), Some(secret)) => Some((key.to_string(), secret.to_string())),
            (None, None) => None,
            _ => {
                return Err(Error::Config(
                    "Both aws_key and aws_secret need to be present to use custom credentials".to_string(),
                ));
            }
        };
        let region = config.require_str("region")?;
        let bucket = config.require_str("bucket")?;
        let filename = config.require_str("filename")?;
        let threshold_kb = config.optional_count("multipart_threshold_kb")?;

        let client = AwsS3Client::connect(region, credentials).await;
        let mut backend = S3Backend::with_client(client, bucket, filename);
        if let Some(kb) = threshold_kb {
            backend = backend.with_min_part_size(kb as usize * 1024);
        }
        Ok(backend)
    }
}

impl<C: ObjectStoreClient> S3Backend<C> {
    pub fn with_client(client: C, bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            key: key.into(),
            mode: UploadMode::Unknown,
            upload_id: None,
            parts: Vec::new(),
            cache: BytesMut::new(),
            min_part_size: MINIMUM_MULTIPART_SIZE_KB * 1024,
            finished: false,
        }
    }

    /// Overrides the multipart threshold, in bytes.
    pub fn with_min_part_size(mut self, bytes: usize) -> Self {
        self.min_part_size = bytes.max(1);
        self
    }

    pub fn mode(&self) -> UploadMode {
        self.mode
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn cached_bytes(&self) -> usize {
        self.cache.len()
    }

    fn split_key(&self) -> (&str, &str) {
        match self.key.rfind('/') {
            Some(pos) => self.key.split_at(pos + 1),
            None => ("", self.key.as_str()),
        }
    }

    pub fn modified_key(&self, modifier: &str) -> Result<String> {
        validate_modifier(modifier)?;
        let (directory, file_name) = self.split_key();
        let key = format!("{}{}", directory, modified_file_name(file_name, modifier));
        if key.len() > MAX_KEY_LENGTH {
            return Err(Error::KeyTooLong {
                length: key.len(),
                key,
                max: MAX_KEY_LENGTH,
            });
        }
        Ok(key)
    }

    async fn initialize_multipart(&mut self) -> Result<String> {
        debug!("Initializing multipart upload {} in {}", self.key, self.bucket);
        let upload_id = self.client.create_multipart_upload(&self.bucket, &self.key).await?;
        debug!("Using upload ID {}", upload_id);
        self.mode = UploadMode::Multipart;
        self.upload_id = Some(upload_id.clone());
        Ok(upload_id)
    }

    /// Sends the whole cache as the next part, opening the multipart session
    /// first if needed.
    async fn upload_cached_part(&mut self) -> Result<()> {
        let upload_id = match (self.mode, self.upload_id.clone()) {
            (UploadMode::Upload, _) => {
                return Err(Error::Protocol(
                    "chunk received in upload mode - file already uploaded".to_string(),
                ));
            }
            (UploadMode::Multipart, Some(upload_id)) => upload_id,
            (UploadMode::Unknown, _) => self.initialize_multipart().await?,
            (UploadMode::Multipart, None) => {
                return Err(Error::Protocol("multipart mode without an upload ID".to_string()));
            }
        };
        if self.cache.is_empty() {
            return Ok(());
        }

        let part_number = self.parts.len() as i32 + 1;
        let body = self.cache.split().freeze();
        debug!(part_number, size = body.len(), "Sending part");
        let e_tag = self
            .client
            .upload_part(&self.bucket, &self.key, &upload_id, part_number, body)
            .await?;
        self.parts.push(UploadedPart { part_number, e_tag });
        Ok(())
    }

    async fn complete_multipart(&mut self) -> Result<()> {
        let upload_id = self
            .upload_id
            .as_deref()
            .ok_or_else(|| Error::Protocol("multipart mode without an upload ID".to_string()))?;
        info!(
            parts = self.parts.len(),
            "Finalizing multipart upload of {} to {}", self.key, self.bucket
        );
        self.client
            .complete_multipart_upload(&self.bucket, &self.key, upload_id, &self.parts)
            .await
    }

    async fn upload_cache_single(&mut self) -> Result<()> {
        if self.mode == UploadMode::Multipart {
            return Err(Error::Protocol(
                "single upload requested in multipart mode".to_string(),
            ));
        }
        self.mode = UploadMode::Upload;
        let body = self.cache.split().freeze();
        self.client.put_object(&self.bucket, &self.key, body).await
    }
}

#[async_trait]
impl<C: ObjectStoreClient> Backend for S3Backend<C> {
    async fn on_chunk(&mut self, chunk: Bytes, index: u64) -> Result<()> {
        if self.finished {
            return Err(Error::Protocol(format!(
                "chunk {} received after upload of {} was finalized",
                index, self.key
            )));
        }
        self.cache.extend_from_slice(&chunk);
        debug!("Got chunk {}, cache is now {} bytes", index, self.cache.len());
        if self.cache.len() >= self.min_part_size {
            self.upload_cached_part().await?;
        }
        Ok(())
    }

    async fn on_end(&mut self) -> Result<()> {
        if self.finished {
            return Err(Error::Protocol(match self.mode {
                UploadMode::Upload => "on_end called after a single upload already occurred".to_string(),
                _ => format!("on_end called twice for {}", self.key),
            }));
        }
        match self.mode {
            UploadMode::Unknown if self.cache.is_empty() => {
                debug!("No upload was initialized for {} in {}", self.key, self.bucket);
            }
            UploadMode::Unknown => {
                info!(
                    "File size under multipart limit - uploading {} in one call to {}",
                    self.key, self.bucket
                );
                self.upload_cache_single().await?;
            }
            UploadMode::Upload => {
                return Err(Error::Protocol(
                    "on_end called after a single upload already occurred".to_string(),
                ));
            }
            UploadMode::Multipart => {
                self.upload_cached_part().await?;
                self.complete_multipart().await?;
            }
        }
        self.finished = true;
        Ok(())
    }

    async fn existing_copy_modifiers(&self) -> Result<Vec<String>> {
        let (directory, file_name) = self.split_key();
        let (base, _) = split_file_name(file_name);
        let prefix = format!("{}{}{}", directory, base, MODIFIER_SEPARATOR);

        let listing = self
            .client
            .list_objects(&self.bucket, &prefix, MAX_LISTED_COPIES as i32)
            .await?;
        if listing.truncated || listing.keys.len() >= MAX_LISTED_COPIES {
            return Err(Error::TooManyCopies {
                limit: MAX_LISTED_COPIES,
            });
        }

        Ok(listing
            .keys
            .iter()
            .filter_map(|key| key.strip_prefix(directory))
            .filter(|name| !name.contains('/'))
            .filter_map(|name| extract_modifier(file_name, name))
            .map(str::to_string)
            .collect())
    }

    async fn copy_with_modifier(&self, modifier: &str, allow_overwrite: bool) -> Result<CopyOutcome> {
        let target = self.modified_key(modifier)?;
        let exists = self.client.object_exists(&self.bucket, &target).await?;
        if exists && !allow_overwrite {
            info!("Skipped overwriting existing copy at s3://{}/{}", self.bucket, target);
            return Ok(CopyOutcome::Skipped);
        }
        self.client.copy_object(&self.bucket, &self.key, &target).await?;
        if exists {
            info!("Overwrote existing copy at s3://{}/{}", self.bucket, target);
            Ok(CopyOutcome::Overwritten)
        } else {
            info!("Created new copy at s3://{}/{}", self.bucket, target);
            Ok(CopyOutcome::Created)
        }
    }

    async fn delete_with_modifier(&self, modifier: &str) -> Result<()> {
        let target = self.modified_key(modifier)?;
        info!("Removing copy at s3://{}/{}", self.bucket, target);
        self.client.delete_object(&self.bucket, &target).await
    }

    fn chunk_size_kb(&self) -> usize {
        S3_CHUNK_SIZE_KB
    }

    fn storage_key(&self) -> String {
        format!("s3://{}/{}", self.bucket, self.key)
    }

    fn backend_type(&self) -> BackendType {
        BackendType::S3
    }
}
