//! Backend REST API.
//!
//! The workflow only ever talks to the backend through [`Backend`], so tests and
//! benches can swap the HTTP implementation for an in-memory one.

use async_trait::async_trait;

use crate::model::Product;
use crate::order::{CreateOrderRequest, CreatedOrder};

mod error;
pub use error::ApiError;

mod http;
pub use http::HttpBackend;

pub mod wire;
pub use wire::{CalculateRequest, CalculateResponse};

/// Credentials for authenticated calls, passed explicitly to every call that needs them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: Option<String>,
}

impl Session {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }
}

/// A file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = content_type_for(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }
}

fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Operations the installment workflow consumes from the backend.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Product detail: price, images, variants.
    async fn get_product_by_id(&self, product_id: &str) -> Result<Product, ApiError>;

    /// Upload files, returning their server-relative paths in order.
    async fn upload_images(
        &self,
        session: &Session,
        files: Vec<Upload>,
    ) -> Result<Vec<String>, ApiError>;

    /// Authoritative installment arithmetic.
    async fn calculate_installment(
        &self,
        session: &Session,
        request: &CalculateRequest,
    ) -> Result<CalculateResponse, ApiError>;

    async fn create_order(
        &self,
        session: &Session,
        request: &CreateOrderRequest,
    ) -> Result<CreatedOrder, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_guesses_content_type() {
        assert_eq!(Upload::new("front.JPG", vec![]).content_type, "image/jpeg");
        assert_eq!(Upload::new("income.pdf", vec![]).content_type, "application/pdf");
        assert_eq!(
            Upload::new("noext", vec![]).content_type,
            "application/octet-stream"
        );
    }

    #[test]
    fn anonymous_session_has_no_token() {
        assert_eq!(Session::anonymous().token(), None);
    }
}
