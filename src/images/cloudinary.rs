/**
 * Cloudinary upload API client
 *
 * Signed uploads: parameters are sorted, joined as `k=v&k=v`, suffixed with
 * the API secret and hashed with SHA-256.
 */
use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use super::{Derivative, HostedImage, ImageHost};
use crate::config::CloudinaryConfig;
use crate::error::ImageHostError;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct UploadResult {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResult {
    result: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorMessage,
}

#[derive(Debug, Deserialize)]
struct ApiErrorMessage {
    message: String,
}

pub struct CloudinaryHost {
    client: reqwest::Client,
    config: CloudinaryConfig,
    base_url: String,
}

impl CloudinaryHost {
    pub fn new(config: CloudinaryConfig) -> Result<Self, ImageHostError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let base_url = format!("{API_BASE}/{}/image", config.cloud_name);

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    fn signed_form(&self, mut params: BTreeMap<&'static str, String>) -> Form {
        params.insert("timestamp", chrono::Utc::now().timestamp().to_string());
        let signature = sign(&params, &self.config.api_secret);

        let mut form = Form::new();
        for (key, value) in params {
            form = form.text(key, value);
        }
        form.text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256")
    }

    fn upload_params(&self, derivative: Derivative) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("folder", derivative.folder(&self.config.folder)),
            ("transformation", derivative.transformation().to_string()),
        ])
    }

    async fn send_upload(&self, form: Form) -> Result<HostedImage, ImageHostError> {
        let response = self
            .client
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let result: UploadResult = read_json(response).await?;
        Ok(HostedImage {
            url: result.secure_url,
            public_id: result.public_id,
        })
    }
}

#[async_trait]
impl ImageHost for CloudinaryHost {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        derivative: Derivative,
    ) -> Result<HostedImage, ImageHostError> {
        let file = Part::bytes(bytes).file_name(filename.to_string());
        let form = self
            .signed_form(self.upload_params(derivative))
            .part("file", file);
        self.send_upload(form).await
    }

    async fn upload_from_url(
        &self,
        url: &str,
        derivative: Derivative,
    ) -> Result<HostedImage, ImageHostError> {
        let form = self
            .signed_form(self.upload_params(derivative))
            .text("file", url.to_string());
        self.send_upload(form).await
    }

    async fn destroy(&self, public_id: &str) -> Result<(), ImageHostError> {
        let form = self.signed_form(BTreeMap::from([("public_id", public_id.to_string())]));
        let response = self
            .client
            .post(format!("{}/destroy", self.base_url))
            .multipart(form)
            .send()
            .await?;

        let result: DestroyResult = read_json(response).await?;
        match result.result.as_str() {
            // Already gone is as good as deleted.
            "ok" | "not found" => Ok(()),
            other => Err(ImageHostError::Protocol(format!(
                "unexpected destroy result: {other}"
            ))),
        }
    }

    fn public_id_from_url(&self, url: &str) -> Option<String> {
        let (_, path) = url.split_once("/upload/")?;
        // Delivery URLs may carry a version segment before the id.
        let path = match path.split_once('/') {
            Some((version, rest))
                if version.len() > 1
                    && version.starts_with('v')
                    && version[1..].bytes().all(|b| b.is_ascii_digit()) =>
            {
                rest
            }
            _ => path,
        };
        let id = path.rsplit_once('.').map_or(path, |(stem, _)| stem);
        id.starts_with(&format!("{}/", self.config.folder))
            .then(|| id.to_string())
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ImageHostError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or(body);
        return Err(ImageHostError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str(&body).map_err(|e| ImageHostError::Protocol(e.to_string()))
}

/// Request signature over every signed parameter, sorted by key.
fn sign(params: &BTreeMap<&'static str, String>, api_secret: &str) -> String {
    let payload = params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}
