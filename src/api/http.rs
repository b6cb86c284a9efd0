//! `reqwest` implementation of [`Backend`].

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, multipart};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{ApiError, Backend, CalculateRequest, CalculateResponse, Session, Upload};
use crate::config::Config;
use crate::model::Product;
use crate::order::{CreateOrderRequest, CreatedOrder};

/// Multipart field name the upload endpoint reads files from.
const UPLOAD_FIELD: &str = "images";

/// HTTP client for the shop backend.
///
/// Calls are never retried; a failed call is reported and the user decides.
pub struct HttpBackend {
    client: Client,
    config: Config,
}

/// Bodies the backend wraps in an envelope are accepted bare as well.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Product { product: T },
    Order { order: T },
    Data { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::Product { product } => product,
            Envelope::Order { order } => order,
            Envelope::Data { data } => data,
            Envelope::Bare(inner) => inner,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UploadBody {
    Paths(Vec<String>),
    Wrapped {
        #[serde(alias = "paths", alias = "images", alias = "files")]
        urls: Vec<String>,
    },
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "error")]
    message: String,
}

impl HttpBackend {
    pub fn new(config: Config) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn authorized(request: RequestBuilder, session: &Session) -> RequestBuilder {
        match session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Map non-2xx responses to [`ApiError::Status`], pulling the backend's message if any.
    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map(|b| b.message)
            .unwrap_or_else(|_| body.chars().take(200).collect());

        warn!(status = %status, message = %message, "backend call failed");

        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let body = Self::check(response).await?.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn get_product_by_id(&self, product_id: &str) -> Result<Product, ApiError> {
        let url = self.config.endpoint(&format!("products/{product_id}"));
        debug!(url = %url, "fetching product");

        let response = self.client.get(url).send().await?;
        let envelope: Envelope<Product> = Self::decode(response).await?;
        Ok(envelope.into_inner())
    }

    async fn upload_images(
        &self,
        session: &Session,
        files: Vec<Upload>,
    ) -> Result<Vec<String>, ApiError> {
        let expected = files.len();
        let mut form = multipart::Form::new();
        for file in files {
            let part = multipart::Part::bytes(file.bytes)
                .file_name(file.file_name)
                .mime_str(&file.content_type)?;
            form = form.part(UPLOAD_FIELD, part);
        }

        let request = self
            .client
            .post(self.config.endpoint("upload"))
            .multipart(form);
        let response = Self::authorized(request, session).send().await?;
        let paths = match Self::decode::<UploadBody>(response).await? {
            UploadBody::Paths(paths) | UploadBody::Wrapped { urls: paths } => paths,
        };

        if paths.len() != expected {
            return Err(ApiError::Decode(format!(
                "uploaded {expected} files but received {} paths",
                paths.len()
            )));
        }
        Ok(paths)
    }

    async fn calculate_installment(
        &self,
        session: &Session,
        request: &CalculateRequest,
    ) -> Result<CalculateResponse, ApiError> {
        let http = self
            .client
            .post(self.config.endpoint("installment/calculate"))
            .json(request);
        let response = Self::authorized(http, session).send().await?;

        // Validation failures come back as 4xx with the same body shape.
        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            if let Ok(parsed) = serde_json::from_str::<CalculateResponse>(&body) {
                if parsed.message.is_some() {
                    return Ok(parsed);
                }
            }
            return Err(ApiError::Status {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        Self::decode(response).await
    }

    async fn create_order(
        &self,
        session: &Session,
        request: &CreateOrderRequest,
    ) -> Result<CreatedOrder, ApiError> {
        let http = self.client.post(self.config.endpoint("orders")).json(request);
        let response = Self::authorized(http, session).send().await?;
        let envelope: Envelope<CreatedOrder> = Self::decode(response).await?;
        Ok(envelope.into_inner())
    }
}
