//! Request and response bodies of the calculation endpoint.

use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::Amount;
use crate::model::{
    CardApplicant, Documents, FinanceApplicant, FinancingMethod, MonthlyRate,
    PlanCalculationResult, ProductId, Term,
};

/// Finance applicant as the calculator expects it: personal data plus document paths.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceInfo {
    #[serde(flatten)]
    pub applicant: FinanceApplicant,
    pub documents: Documents,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateRequest {
    pub product_id: ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    pub upfront: Amount,
    pub months: Term,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<MonthlyRate>,
    #[serde(rename = "type")]
    pub method: FinancingMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_info: Option<CardApplicant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finance_info: Option<FinanceInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateResponse {
    #[serde(default)]
    pub success: bool,
    pub monthly_payment: Option<Amount>,
    pub total_payment: Option<Amount>,
    pub upfront: Option<Amount>,
    pub months: Option<u32>,
    pub interest_rate: Option<MonthlyRate>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub extra_info: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl CalculateResponse {
    /// Turn the raw body into a result, failing on `success: false` or missing figures.
    pub fn into_result(self) -> Result<PlanCalculationResult, ApiError> {
        if !self.success {
            return Err(ApiError::Rejected(
                self.message
                    .unwrap_or_else(|| "installment calculation was rejected".to_string()),
            ));
        }

        let missing = |field: &str| ApiError::Decode(format!("calculation missing `{field}`"));
        let months = self.months.ok_or_else(|| missing("months"))?;
        let term = Term::try_from(months)
            .map_err(|m| ApiError::Decode(format!("calculation returned unsupported term {m}")))?;

        Ok(PlanCalculationResult {
            monthly_payment: self.monthly_payment.ok_or_else(|| missing("monthlyPayment"))?,
            total_payment: self.total_payment.ok_or_else(|| missing("totalPayment"))?,
            upfront: self.upfront.ok_or_else(|| missing("upfront"))?,
            term,
            rate: self.interest_rate,
            detail: self.detail.unwrap_or_default(),
            extra_info: self.extra_info.filter(|s| !s.trim().is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_uses_backend_field_names() {
        let request = CalculateRequest {
            product_id: "p1".into(),
            variant_id: None,
            upfront: Amount::from_whole(5_000_000),
            months: Term::try_from(6).unwrap(),
            interest_rate: Some(MonthlyRate::from_hundredths(167)),
            method: FinancingMethod::FinanceCompany,
            card_info: None,
            finance_info: Some(FinanceInfo {
                applicant: FinanceApplicant {
                    full_name: "Nguyen Van A".into(),
                    ..Default::default()
                },
                documents: Documents::default(),
            }),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["productId"], "p1");
        assert_eq!(json["upfront"], 5_000_000);
        assert_eq!(json["months"], 6);
        assert_eq!(json["interestRate"], 1.67);
        assert_eq!(json["type"], "finance");
        assert_eq!(json["financeInfo"]["fullName"], "Nguyen Van A");
        assert!(json.get("cardInfo").is_none());
        assert!(json.get("variantId").is_none());
    }

    #[test]
    fn successful_response_becomes_result() {
        let body = r#"{"success":true,"monthlyPayment":2750000,"totalPayment":21500000,
            "upfront":5000000,"months":6,"detail":"6 x 2,750,000"}"#;
        let response: CalculateResponse = serde_json::from_str(body).unwrap();
        let result = response.into_result().unwrap();
        assert_eq!(result.monthly_payment, Amount::from_whole(2_750_000));
        assert_eq!(result.upfront, Amount::from_whole(5_000_000));
        assert_eq!(result.term.months(), 6);
        assert_eq!(result.extra_info, None);
    }

    #[test]
    fn unsuccessful_response_is_rejected_with_message() {
        let body = r#"{"success":false,"message":"term not offered"}"#;
        let response: CalculateResponse = serde_json::from_str(body).unwrap();
        let err = response.into_result().unwrap_err();
        assert!(matches!(err, ApiError::Rejected(ref m) if m == "term not offered"));
    }

    #[test]
    fn missing_figures_are_a_decode_error() {
        let body = r#"{"success":true,"months":6}"#;
        let response: CalculateResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(response.into_result(), Err(ApiError::Decode(_))));
    }

    #[test]
    fn unsupported_term_is_a_decode_error() {
        let body = r#"{"success":true,"monthlyPayment":1,"totalPayment":1,"upfront":0,"months":7}"#;
        let response: CalculateResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(response.into_result(), Err(ApiError::Decode(_))));
    }
}
