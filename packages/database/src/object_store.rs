//! S3-compatible object store backend.
//!
//! Each record is written as one JSON object at
//! `{prefix}/{collection}/{id}.json`. `PutObject` replaces any existing
//! object at the same key, which gives upsert-by-identifier for free.

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::{
    Credentials, RequestChecksumCalculation, StalledStreamProtectionConfig,
};
use aws_sdk_s3::operation::head_bucket::HeadBucketError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use copilot_metrics_database_models::ObjectStoreConfig;
use copilot_metrics_models::{Identified, MetricsRecord, SeatAssignment, UsageSummary};
use serde::Serialize;

use crate::{BatchOutcome, Repository, RepositoryError};

/// Object-store-backed [`Repository`].
#[derive(Debug, Clone)]
pub struct ObjectStoreRepository {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
    region: String,
}

impl ObjectStoreRepository {
    /// Builds a client from connection settings.
    ///
    /// With both static keys set, the client is configured entirely from
    /// `config`. Otherwise credentials and region come from the standard
    /// AWS environment and profile chain.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Config`] if no bucket is configured.
    pub async fn from_config(config: &ObjectStoreConfig) -> Result<Self, RepositoryError> {
        if config.bucket.trim().is_empty() {
            return Err(RepositoryError::Config {
                message: "object store bucket is not set".to_string(),
            });
        }

        let region = Region::new(config.region.clone());

        let s3_config = if let (Some(access_key), Some(secret_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            let creds = Credentials::new(
                access_key,
                secret_key,
                None,
                None,
                "copilot-metrics-config",
            );
            let mut builder = aws_sdk_s3::Config::builder()
                .region(region)
                .credentials_provider(creds)
                .force_path_style(true)
                .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
                .stalled_stream_protection(StalledStreamProtectionConfig::disabled());
            if let Some(endpoint) = &config.endpoint {
                builder = builder.endpoint_url(endpoint);
            }
            builder.build()
        } else {
            let shared = aws_config::defaults(BehaviorVersion::latest())
                .region(region)
                .load()
                .await;
            let mut builder = aws_sdk_s3::config::Builder::from(&shared)
                .force_path_style(true)
                .request_checksum_calculation(RequestChecksumCalculation::WhenRequired);
            if let Some(endpoint) = &config.endpoint {
                builder = builder.endpoint_url(endpoint);
            }
            builder.build()
        };

        Ok(Self {
            client: aws_sdk_s3::Client::from_conf(s3_config),
            bucket: config.bucket.trim().to_string(),
            prefix: config.prefix.trim_matches('/').to_string(),
            region: config.region.trim().to_string(),
        })
    }

    async fn put<T: Identified + Serialize + Sync>(
        &self,
        record: &T,
    ) -> Result<(), RepositoryError> {
        if record.id().is_empty() {
            return Err(RepositoryError::MissingId {
                kind: T::COLLECTION,
            });
        }

        let key = object_key(&self.prefix, T::COLLECTION, record.id());
        let body = serde_json::to_vec(record)?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| RepositoryError::ObjectStore {
                op: "PutObject",
                key: key.clone(),
                source: Box::new(e),
            })?;

        log::debug!("Wrote s3://{}/{key}", self.bucket);
        Ok(())
    }

    async fn save_all<T: Identified + Serialize + Sync>(&self, records: &[T]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for record in records {
            let result = self.put(record).await;
            outcome.record(record.id(), result);
        }
        outcome
    }

    async fn create_bucket(&self) -> Result<(), RepositoryError> {
        log::info!("Creating object store bucket {}", self.bucket);

        let mut request = self.client.create_bucket().bucket(&self.bucket);
        if let Some(region) = location_constraint(&self.region) {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(region))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => Ok(()),
            Err(err)
                if err.as_service_error().is_some_and(|e| {
                    e.is_bucket_already_owned_by_you() || e.is_bucket_already_exists()
                }) =>
            {
                log::debug!("Bucket {} already exists", self.bucket);
                Ok(())
            }
            Err(err) => Err(RepositoryError::ObjectStore {
                op: "CreateBucket",
                key: self.bucket.clone(),
                source: Box::new(err),
            }),
        }
    }
}

/// Returns the location constraint to send when creating a bucket in
/// `region`. `us-east-1` and `auto` (and an empty region) take none.
#[must_use]
pub fn location_constraint(region: &str) -> Option<&str> {
    let region = region.trim();
    if region.is_empty()
        || region.eq_ignore_ascii_case("us-east-1")
        || region.eq_ignore_ascii_case("auto")
    {
        None
    } else {
        Some(region)
    }
}

/// Returns the object key for a record.
#[must_use]
pub fn object_key(prefix: &str, collection: &str, id: &str) -> String {
    if prefix.is_empty() {
        format!("{collection}/{id}.json")
    } else {
        format!("{prefix}/{collection}/{id}.json")
    }
}

#[async_trait]
impl Repository for ObjectStoreRepository {
    fn name(&self) -> &str {
        "object_store"
    }

    async fn initialize(&self) -> Result<(), RepositoryError> {
        let head = self.client.head_bucket().bucket(&self.bucket).send().await;

        match head {
            Ok(_) => {
                log::info!("Object store bucket {} is ready", self.bucket);
                Ok(())
            }
            Err(err) if err.as_service_error().is_some_and(HeadBucketError::is_not_found) => {
                self.create_bucket().await
            }
            Err(err) => Err(RepositoryError::ObjectStore {
                op: "HeadBucket",
                key: self.bucket.clone(),
                source: Box::new(err),
            }),
        }
    }

    async fn save_metrics(
        &self,
        records: &[MetricsRecord],
    ) -> Result<BatchOutcome, RepositoryError> {
        Ok(self.save_all(records).await)
    }

    async fn save_seats(&self, snapshot: &SeatAssignment) -> Result<BatchOutcome, RepositoryError> {
        Ok(self.save_all(std::slice::from_ref(snapshot)).await)
    }

    async fn save_usage(
        &self,
        summaries: &[UsageSummary],
    ) -> Result<BatchOutcome, RepositoryError> {
        Ok(self.save_all(summaries).await)
    }

    async fn close(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn repository(server: &MockServer) -> ObjectStoreRepository {
        repository_in(server, "us-east-1").await
    }

    async fn repository_in(server: &MockServer, region: &str) -> ObjectStoreRepository {
        ObjectStoreRepository::from_config(&ObjectStoreConfig {
            bucket: "metrics".to_string(),
            prefix: "/copilot-metrics/".to_string(),
            endpoint: Some(server.uri()),
            region: region.to_string(),
            access_key_id: Some("test-key".to_string()),
            secret_access_key: Some("test-secret".to_string()),
        })
        .await
        .unwrap()
    }

    #[test]
    fn builds_object_keys() {
        assert_eq!(
            object_key("copilot-metrics", "usage_history", "2024-01-01-ORG-acme"),
            "copilot-metrics/usage_history/2024-01-01-ORG-acme.json"
        );
        assert_eq!(
            object_key("", "seats_history", "2024-01-01-XXX"),
            "seats_history/2024-01-01-XXX.json"
        );
    }

    #[tokio::test]
    async fn puts_one_object_per_record() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(
                "/metrics/copilot-metrics/metrics_history/2024-01-01-ORG-acme.json",
            ))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let mut record = MetricsRecord {
            date: "2024-01-01".to_string(),
            organization: Some("acme".to_string()),
            ..MetricsRecord::default()
        };
        record.assign_id();

        let repository = repository(&server).await;
        let outcome = repository
            .save_metrics(&[record.clone(), record])
            .await
            .unwrap();

        assert_eq!(outcome.saved, 2);
        assert!(outcome.is_complete());
    }

    #[tokio::test]
    async fn missing_id_is_rejected_without_a_request() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let repository = repository(&server).await;
        let outcome = repository
            .save_usage(&[UsageSummary::new("2024-01-01")])
            .await
            .unwrap();

        assert_eq!(outcome.failed, 1);
        assert!(matches!(
            outcome.first_error,
            Some(RepositoryError::MissingId { kind: "usage_history" })
        ));
    }

    #[tokio::test]
    async fn existing_bucket_initializes() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/metrics"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let repository = repository(&server).await;
        repository.initialize().await.unwrap();
        repository.initialize().await.unwrap();
        repository.close().await.unwrap();
    }

    #[test]
    fn location_constraint_skips_default_regions() {
        assert_eq!(location_constraint("us-east-1"), None);
        assert_eq!(location_constraint("AUTO"), None);
        assert_eq!(location_constraint(""), None);
        assert_eq!(location_constraint(" eu-west-1 "), Some("eu-west-1"));
    }

    async fn missing_bucket(server: &MockServer) {
        Mock::given(method("HEAD"))
            .and(path("/metrics"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn missing_bucket_is_created() {
        let server = MockServer::start().await;
        missing_bucket(&server).await;
        Mock::given(method("PUT"))
            .and(path("/metrics"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        repository(&server).await.initialize().await.unwrap();
    }

    #[tokio::test]
    async fn missing_bucket_is_created_in_configured_region() {
        let server = MockServer::start().await;
        missing_bucket(&server).await;
        Mock::given(method("PUT"))
            .and(path("/metrics"))
            .and(body_string_contains(
                "<LocationConstraint>eu-west-1</LocationConstraint>",
            ))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        repository_in(&server, "eu-west-1")
            .await
            .initialize()
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn bucket_created_concurrently_still_initializes() {
        let server = MockServer::start().await;
        missing_bucket(&server).await;
        Mock::given(method("PUT"))
            .and(path("/metrics"))
            .respond_with(
                ResponseTemplate::new(409)
                    .insert_header("Content-Type", "application/xml")
                    .set_body_string(
                        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
                         <Error><Code>BucketAlreadyOwnedByYou</Code>\
                         <Message>Bucket exists</Message>\
                         <BucketName>metrics</BucketName><RequestId>1</RequestId></Error>",
                    ),
            )
            .expect(1)
            .mount(&server)
            .await;

        repository(&server).await.initialize().await.unwrap();
    }

    #[tokio::test]
    async fn failed_bucket_creation_is_an_error() {
        let server = MockServer::start().await;
        missing_bucket(&server).await;
        Mock::given(method("PUT"))
            .and(path("/metrics"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("Content-Type", "application/xml")
                    .set_body_string(
                        "<Error><Code>AccessDenied</Code><Message>Access Denied</Message></Error>",
                    ),
            )
            .mount(&server)
            .await;

        let result = repository(&server).await.initialize().await;
        assert!(matches!(
            result,
            Err(RepositoryError::ObjectStore { op: "CreateBucket", .. })
        ));
    }
}
