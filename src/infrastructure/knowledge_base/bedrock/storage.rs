//! Document bucket

use std::path::Path;

use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use tracing::{debug, info, warn};

use super::{describe, BedrockControlPlane};
use crate::domain::DomainError;

impl BedrockControlPlane {
    pub(super) async fn ensure_bucket(&self, bucket: &str) -> Result<(), DomainError> {
        let mut request = self.s3.create_bucket().bucket(bucket);

        // us-east-1 rejects an explicit location constraint
        if self.settings.region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(
                        self.settings.region.as_str(),
                    ))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                info!(bucket = %bucket, "Created document bucket");
                Ok(())
            }
            Err(e)
                if e.as_service_error()
                    .map(|se| se.is_bucket_already_owned_by_you())
                    .unwrap_or(false) =>
            {
                debug!(bucket = %bucket, "Document bucket already exists");
                Ok(())
            }
            Err(e) => Err(DomainError::provisioning(format!(
                "Failed to create bucket '{}': {}",
                bucket,
                describe(&e)
            ))),
        }
    }

    pub(super) async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
    ) -> Result<(), DomainError> {
        let body = ByteStream::from_path(path).await.map_err(|e| {
            DomainError::not_found(format!("Cannot read '{}': {}", path.display(), e))
        })?;

        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .to_string();

        self.s3
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                DomainError::network(format!(
                    "Failed to upload '{}' to bucket '{}': {}",
                    key,
                    bucket,
                    describe(&e)
                ))
            })?;

        debug!(bucket = %bucket, key = %key, "Uploaded object");
        Ok(())
    }

    /// Delete every object, then the bucket; a missing bucket is skipped
    pub(super) async fn empty_and_delete_bucket(&self, bucket: &str) -> Result<(), DomainError> {
        let mut continuation: Option<String> = None;

        loop {
            let page = match self
                .s3
                .list_objects_v2()
                .bucket(bucket)
                .set_continuation_token(continuation.take())
                .send()
                .await
            {
                Ok(page) => page,
                Err(e)
                    if e.as_service_error()
                        .map(|se| se.is_no_such_bucket())
                        .unwrap_or(false) =>
                {
                    warn!(bucket = %bucket, "Bucket not found, skipping deletion");
                    return Ok(());
                }
                Err(e) => {
                    return Err(DomainError::network(format!(
                        "Failed to list bucket '{}': {}",
                        bucket,
                        describe(&e)
                    )))
                }
            };

            for key in page.contents().iter().filter_map(|object| object.key()) {
                self.s3
                    .delete_object()
                    .bucket(bucket)
                    .key(key)
                    .send()
                    .await
                    .map_err(|e| {
                        DomainError::network(format!(
                            "Failed to delete '{}' from '{}': {}",
                            key,
                            bucket,
                            describe(&e)
                        ))
                    })?;
            }

            match (page.is_truncated(), page.next_continuation_token()) {
                (Some(true), Some(token)) => continuation = Some(token.to_string()),
                _ => break,
            }
        }

        self.s3
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| {
                DomainError::network(format!(
                    "Failed to delete bucket '{}': {}",
                    bucket,
                    describe(&e)
                ))
            })?;

        info!(bucket = %bucket, "Deleted document bucket");
        Ok(())
    }
}
