use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{ObjectInfo, ObjectStore, ObjectStoreError, StoredObject};
use crate::context::RequestContext;
use crate::encoding::path_segment;

const STORAGE_API: &str = "https://storage.googleapis.com";

/// Google Cloud Storage object store backend. Buckets are GCS buckets.
pub struct GcsStore {
    client: Client,
    access_token: tokio::sync::RwLock<String>,
    credentials_file: Option<String>,
}

#[derive(Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    token_uri: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Subset of the JSON API object resource. `size` is a decimal string.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GcsObjectResource {
    size: String,
    content_type: Option<String>,
}

impl GcsStore {
    pub async fn new(credentials_file: Option<&str>) -> Result<Self, anyhow::Error> {
        let client = Client::builder().build()?;

        let store = Self {
            client,
            access_token: tokio::sync::RwLock::new(String::new()),
            credentials_file: credentials_file.map(|s| s.to_string()),
        };

        store.refresh_token().await?;
        Ok(store)
    }

    async fn refresh_token(&self) -> Result<(), anyhow::Error> {
        let token = if let Some(ref creds_path) = self.credentials_file {
            self.token_from_service_account(creds_path).await?
        } else {
            self.token_from_metadata_server().await?
        };

        let mut lock = self.access_token.write().await;
        *lock = token;
        Ok(())
    }

    async fn token_from_service_account(&self, path: &str) -> Result<String, anyhow::Error> {
        let key_json = tokio::fs::read_to_string(path).await?;
        let key: ServiceAccountKey = serde_json::from_str(&key_json)?;

        let now = chrono::Utc::now().timestamp();
        let claims = serde_json::json!({
            "iss": key.client_email,
            "scope": "https://www.googleapis.com/auth/devstorage.read_write",
            "aud": key.token_uri,
            "iat": now,
            "exp": now + 3600,
        });

        let header = base64_url_encode(&serde_json::to_vec(&serde_json::json!({
            "alg": "RS256",
            "typ": "JWT"
        }))?);
        let payload = base64_url_encode(&serde_json::to_vec(&claims)?);
        let unsigned = format!("{header}.{payload}");

        let signature = sign_rs256(unsigned.as_bytes(), &key.private_key)?;
        let jwt = format!("{unsigned}.{}", base64_url_encode(&signature));

        let resp: TokenResponse = self
            .client
            .post(&key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", &jwt),
            ])
            .send()
            .await?
            .json()
            .await?;

        Ok(resp.access_token)
    }

    async fn token_from_metadata_server(&self) -> Result<String, anyhow::Error> {
        let resp: TokenResponse = self
            .client
            .get("http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token")
            .header("Metadata-Flavor", "Google")
            .send()
            .await?
            .json()
            .await?;

        Ok(resp.access_token)
    }

    fn upload_url(bucket: &str, key: &str) -> String {
        format!(
            "{STORAGE_API}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            path_segment(bucket),
            path_segment(key)
        )
    }

    fn object_url(bucket: &str, key: &str) -> String {
        format!(
            "{STORAGE_API}/storage/v1/b/{}/o/{}",
            path_segment(bucket),
            path_segment(key)
        )
    }

    async fn token(&self) -> String {
        self.access_token.read().await.clone()
    }
}

async fn failure(op: &str, resp: reqwest::Response) -> ObjectStoreError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    ObjectStoreError::Backend(format!("GCS {op} failed ({status}): {body}"))
}

fn transport(e: reqwest::Error) -> ObjectStoreError {
    ObjectStoreError::Backend(e.to_string())
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn put(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let token = self.token().await;

        let resp = ctx
            .run(
                self.client
                    .post(Self::upload_url(bucket, key))
                    .bearer_auth(&token)
                    .header("Content-Type", content_type)
                    .body(data)
                    .send(),
            )
            .await?
            .map_err(transport)?;

        if !resp.status().is_success() {
            return Err(failure("upload", resp).await);
        }

        Ok(())
    }

    async fn get(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
    ) -> Result<StoredObject, ObjectStoreError> {
        let info = self.stat(ctx, bucket, key).await?;
        let token = self.token().await;

        let resp = ctx
            .run(
                self.client
                    .get(format!("{}?alt=media", Self::object_url(bucket, key)))
                    .bearer_auth(&token)
                    .send(),
            )
            .await?
            .map_err(transport)?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::not_found(bucket, key));
        }

        if !resp.status().is_success() {
            return Err(failure("download", resp).await);
        }

        let body = resp
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
            .boxed();

        Ok(StoredObject { info, body })
    }

    async fn stat(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
    ) -> Result<ObjectInfo, ObjectStoreError> {
        let token = self.token().await;

        let resp = ctx
            .run(
                self.client
                    .get(Self::object_url(bucket, key))
                    .bearer_auth(&token)
                    .send(),
            )
            .await?
            .map_err(transport)?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::not_found(bucket, key));
        }

        if !resp.status().is_success() {
            return Err(failure("stat", resp).await);
        }

        let resource: GcsObjectResource = resp.json().await.map_err(transport)?;
        let size = resource
            .size
            .parse()
            .map_err(|_| ObjectStoreError::Backend(format!("GCS reported size {:?}", resource.size)))?;

        Ok(ObjectInfo {
            size,
            content_type: resource
                .content_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
        })
    }

    async fn delete(
        &self,
        ctx: &RequestContext,
        bucket: &str,
        key: &str,
    ) -> Result<(), ObjectStoreError> {
        let token = self.token().await;

        let resp = ctx
            .run(
                self.client
                    .delete(Self::object_url(bucket, key))
                    .bearer_auth(&token)
                    .send(),
            )
            .await?
            .map_err(transport)?;

        // 404 is fine -- object already gone
        if !resp.status().is_success() && resp.status() != StatusCode::NOT_FOUND {
            return Err(failure("delete", resp).await);
        }

        Ok(())
    }
}

fn base64_url_encode(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(data)
}

fn sign_rs256(data: &[u8], private_key_pem: &str) -> Result<Vec<u8>, anyhow::Error> {
    // Strip PEM armour and decode the base64 body to PKCS#8 DER
    let der_b64: String = private_key_pem
        .lines()
        .filter(|line| !line.starts_with("-----"))
        .collect();
    let der = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &der_b64)?;

    let key_pair = ring::signature::RsaKeyPair::from_pkcs8(&der)
        .map_err(|e| anyhow::anyhow!("Failed to parse RSA key: {e}"))?;

    let mut signature = vec![0u8; key_pair.public().modulus_len()];
    key_pair
        .sign(
            &ring::signature::RSA_PKCS1_SHA256,
            &ring::rand::SystemRandom::new(),
            data,
            &mut signature,
        )
        .map_err(|e| anyhow::anyhow!("Failed to sign: {e}"))?;

    Ok(signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_url_encodes_key() {
        assert_eq!(
            GcsStore::object_url("images", "a/b c.png"),
            "https://storage.googleapis.com/storage/v1/b/images/o/a%2Fb%20c.png"
        );
    }

    #[test]
    fn test_upload_url() {
        assert_eq!(
            GcsStore::upload_url("documents", "k.pdf"),
            "https://storage.googleapis.com/upload/storage/v1/b/documents/o?uploadType=media&name=k.pdf"
        );
    }

    #[test]
    fn test_object_resource_parses_camel_case() {
        let resource: GcsObjectResource =
            serde_json::from_str(r#"{"size":"10","contentType":"image/png","name":"k"}"#).unwrap();
        assert_eq!(resource.size, "10");
        assert_eq!(resource.content_type.as_deref(), Some("image/png"));
    }
}
