//! In-memory [`Backend`] for tests and benches.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::Amount;
use crate::api::{ApiError, Backend, CalculateRequest, CalculateResponse, Session, Upload};
use crate::model::{FinancingMethod, MonthlyRate, Product, Variant};
use crate::order::{CreateOrderRequest, CreatedInstallment, CreatedOrder};

/// Card rate the fake quotes when the request carries none.
pub const FAKE_CARD_RATE: MonthlyRate = MonthlyRate::from_hundredths(150);

#[derive(Default)]
struct FakeState {
    products: HashMap<String, Product>,
    fail_uploads: bool,
    uploads: usize,
    calculation_override: Option<CalculateResponse>,
    calculations: Vec<CalculateRequest>,
    failing_orders: usize,
    orders: Vec<CreateOrderRequest>,
}

/// Backend double computing flat-interest plans.
///
/// Seeded with product `p1` priced 20,000,000 with variant `v1` at 23,000,000.
pub struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let backend = Self {
            state: Mutex::new(FakeState::default()),
        };
        backend.add_product(Product {
            id: "p1".into(),
            name: "Phone".into(),
            price: Amount::from_whole(20_000_000),
            images: vec!["/uploads/phone.jpg".into()],
            variants: vec![Variant {
                id: "v1".into(),
                name: "256GB".into(),
                price: Amount::from_whole(23_000_000),
            }],
        });
        backend
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_product(&self, product: Product) {
        self.state().products.insert(product.id.clone(), product);
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.state().fail_uploads = fail;
    }

    /// Answer every calculation with `response` instead of computing one.
    pub fn respond_to_calculation(&self, response: CalculateResponse) {
        self.state().calculation_override = Some(response);
    }

    /// Reject the next `count` order submissions.
    pub fn fail_next_orders(&self, count: usize) {
        self.state().failing_orders = count;
    }

    pub fn upload_count(&self) -> usize {
        self.state().uploads
    }

    pub fn calculations(&self) -> Vec<CalculateRequest> {
        self.state().calculations.clone()
    }

    pub fn orders(&self) -> Vec<CreateOrderRequest> {
        self.state().orders.clone()
    }

    fn quote(state: &FakeState, request: &CalculateRequest) -> Result<CalculateResponse, ApiError> {
        let product = state
            .products
            .get(&request.product_id)
            .ok_or_else(|| ApiError::Status {
                status: 404,
                message: "product not found".into(),
            })?;
        let principal = request
            .variant_id
            .as_deref()
            .and_then(|id| product.variant(id))
            .map_or(product.price, |v| v.price);

        if request.upfront > principal {
            return Ok(CalculateResponse {
                success: false,
                message: Some("down payment exceeds price".into()),
                ..Default::default()
            });
        }

        let months = request.months.months();
        let rate = request.interest_rate.unwrap_or(FAKE_CARD_RATE);
        let financed = principal - request.upfront;
        let interest = financed.to_float() * rate.as_percent() / 100.0 * months as f64;
        let repaid = financed.to_float() + interest;
        let monthly = Amount::from_float(repaid / months as f64);
        let extra_info = match request.method {
            FinancingMethod::FinanceCompany => {
                Some("A consultant will call to verify your documents".to_string())
            }
            FinancingMethod::Card => None,
        };

        Ok(CalculateResponse {
            success: true,
            monthly_payment: Some(monthly),
            total_payment: Some(request.upfront + Amount::from_float(repaid)),
            upfront: Some(request.upfront),
            months: Some(months),
            interest_rate: Some(rate),
            detail: Some(format!("{months} x {monthly}")),
            extra_info,
            message: None,
        })
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn get_product_by_id(&self, product_id: &str) -> Result<Product, ApiError> {
        self.state()
            .products
            .get(product_id)
            .cloned()
            .ok_or_else(|| ApiError::Status {
                status: 404,
                message: "product not found".into(),
            })
    }

    async fn upload_images(
        &self,
        _session: &Session,
        files: Vec<Upload>,
    ) -> Result<Vec<String>, ApiError> {
        let mut state = self.state();
        if state.fail_uploads {
            return Err(ApiError::Status {
                status: 500,
                message: "upload failed".into(),
            });
        }
        state.uploads += files.len();
        Ok(files
            .into_iter()
            .map(|f| format!("/uploads/{}", f.file_name))
            .collect())
    }

    async fn calculate_installment(
        &self,
        _session: &Session,
        request: &CalculateRequest,
    ) -> Result<CalculateResponse, ApiError> {
        let mut state = self.state();
        state.calculations.push(request.clone());
        match &state.calculation_override {
            Some(response) => Ok(response.clone()),
            None => Self::quote(&state, request),
        }
    }

    async fn create_order(
        &self,
        _session: &Session,
        request: &CreateOrderRequest,
    ) -> Result<CreatedOrder, ApiError> {
        let mut state = self.state();
        if state.failing_orders > 0 {
            state.failing_orders -= 1;
            return Err(ApiError::Status {
                status: 503,
                message: "order service unavailable".into(),
            });
        }
        state.orders.push(request.clone());
        Ok(CreatedOrder {
            id: format!("order-{}", state.orders.len()),
            status: Some("pending".into()),
            installment: Some(CreatedInstallment {
                finance_status: request.installment.finance_status.clone(),
                transaction_id: request
                    .installment
                    .transaction_id
                    .as_ref()
                    .map(|t| t.as_str().to_string()),
            }),
        })
    }
}
