pub mod backend;
pub mod local;
pub mod object_store;
pub mod registry;
pub mod s3;

pub use backend::{Backend, BackendSink, BackendType, CopyOutcome, backup_source, stream_to_backend};
pub use local::LocalBackend;
pub use object_store::{AwsS3Client, ObjectListing, ObjectStoreClient, UploadedPart};
pub use registry::{BackendFactory, BackendRegistry, build_backend, default_registry};
pub use s3::{S3Backend, UploadMode};
