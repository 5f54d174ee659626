use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::{StreamExt, TryStreamExt};
use reqwest::{
    Body, Client, RequestBuilder, StatusCode,
    header::{CONTENT_LENGTH, CONTENT_TYPE},
};
use serde::Deserialize;
use tokio_util::io::ReaderStream;

use std::{io, time::Duration};

use super::{BlobInfo, BlobStore, BlobStream, StorageError, UploadedFile, is_valid_key, new_key};

/// Talks to an S3-compatible object gateway over plain REST.
///
/// Objects live at `{base_url}/{bucket}/{key}`. Listing uses the ListObjectsV2
/// query form. When `auth_bearer` is set every request carries it as a bearer
/// token; otherwise the bucket must accept anonymous access (presigning
/// gateways, or a private network bucket).
pub struct HttpObjectStore {
    client: Client,
    bucket_url: String,
    auth_bearer: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBucketResult {
    #[serde(default)]
    contents: Vec<ListedObject>,
    #[serde(default)]
    is_truncated: bool,
    next_continuation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListedObject {
    key: String,
    last_modified: String,
}

impl HttpObjectStore {
    pub fn new(
        base_url: &str,
        bucket: &str,
        auth_bearer: Option<String>,
    ) -> Result<Self, StorageError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            client,
            bucket_url: format!("{}/{}", base_url.trim_end_matches('/'), bucket),
            auth_bearer: auth_bearer.filter(|token| !token.is_empty()),
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.bucket_url, key)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_bearer {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn list_page(
        &self,
        continuation: Option<&str>,
    ) -> Result<ListBucketResult, StorageError> {
        let mut request = self
            .client
            .get(&self.bucket_url)
            .query(&[("list-type", "2")]);
        if let Some(token) = continuation {
            request = request.query(&[("continuation-token", token)]);
        }

        let response = self.authorize(request).send().await?;
        if !response.status().is_success() {
            return Err(StorageError::Status(response.status()));
        }

        let body = response.text().await?;
        Ok(parse_listing(&body)?)
    }
}

fn parse_listing(body: &str) -> Result<ListBucketResult, quick_xml::DeError> {
    quick_xml::de::from_str(body)
}

fn parse_last_modified(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value).map_or_else(
        |e| {
            tracing::warn!("Unparseable LastModified '{value}' in object listing: {e}");
            Utc::now()
        },
        |ts| ts.with_timezone(&Utc),
    )
}

#[async_trait]
impl BlobStore for HttpObjectStore {
    async fn upload(&self, file: &UploadedFile) -> Result<String, StorageError> {
        let spooled = tokio::fs::File::open(&file.path).await?;
        let length = spooled.metadata().await?.len();
        let key = new_key();

        let mut request = self
            .client
            .put(self.object_url(&key))
            .header(CONTENT_LENGTH, length)
            .body(Body::wrap_stream(ReaderStream::new(spooled)));
        if let Some(content_type) = &file.content_type {
            request = request.header(CONTENT_TYPE, content_type);
        }

        let response = self.authorize(request).send().await?;
        if !response.status().is_success() {
            return Err(StorageError::Status(response.status()));
        }

        Ok(key)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        if !is_valid_key(key) {
            return Ok(());
        }

        let request = self.client.delete(self.object_url(key));
        let response = self.authorize(request).send().await?;

        match response.status() {
            status if status.is_success() || status == StatusCode::NOT_FOUND => Ok(()),
            status => Err(StorageError::Status(status)),
        }
    }

    async fn read_stream(&self, key: &str) -> Result<Option<BlobStream>, StorageError> {
        if !is_valid_key(key) {
            return Ok(None);
        }

        let request = self.client.get(self.object_url(key));
        let response = self.authorize(request).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(
                response.bytes_stream().map_err(io::Error::other).boxed(),
            )),
            status => Err(StorageError::Status(status)),
        }
    }

    async fn list(&self) -> Result<Vec<BlobInfo>, StorageError> {
        let mut blobs = Vec::new();
        let mut continuation: Option<String> = None;

        loop {
            let page = self.list_page(continuation.as_deref()).await?;
            blobs.extend(page.contents.into_iter().map(|object| BlobInfo {
                modified: parse_last_modified(&object.last_modified),
                key: object.key,
            }));

            match page.next_continuation_token {
                Some(token) if page.is_truncated => continuation = Some(token),
                _ => break,
            }
        }

        Ok(blobs)
    }
}
