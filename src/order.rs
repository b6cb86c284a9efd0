//! Order payload composition for installment purchases.

use serde::{Deserialize, Serialize};

use crate::Amount;
use crate::model::{
    ApplicantInfo, Documents, FinancingMethod, InstallmentPlan, MonthlyRate, OrderId,
    PlanCalculationResult, Product, ProductId, Term, TransactionToken, Variant,
};

/// Payment method tag the backend uses for installment orders.
pub const PAYMENT_METHOD: &str = "installment";

/// Status a finance company application starts in.
pub const FINANCE_STATUS_PENDING: &str = "pending";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product: ProductId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    pub name: String,
    pub quantity: u32,
    pub price: Amount,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentDetails {
    #[serde(rename = "type")]
    pub method: FinancingMethod,
    pub months: Term,
    pub monthly_payment: Amount,
    pub total_payment: Amount,
    pub upfront: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interest_rate: Option<MonthlyRate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<TransactionToken>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_last4: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finance_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<Documents>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<OrderItem>,
    pub address: String,
    pub phone: String,
    pub note: String,
    pub payment_method: String,
    pub total: Amount,
    pub installment: InstallmentDetails,
}

/// Installment section echoed back on a created order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedInstallment {
    #[serde(default)]
    pub finance_status: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
    #[serde(rename = "_id", alias = "id")]
    pub id: OrderId,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub installment: Option<CreatedInstallment>,
}

/// Build the order for a calculated plan.
///
/// The token is only consulted for card plans; checking that it exists is the
/// caller's job.
pub fn compose(
    product: &Product,
    variant: Option<&Variant>,
    plan: &InstallmentPlan,
    applicant: &ApplicantInfo,
    result: &PlanCalculationResult,
    token: Option<&TransactionToken>,
) -> CreateOrderRequest {
    let item = OrderItem {
        product: product.id.clone(),
        variant: variant.map(|v| v.id.clone()),
        name: match variant {
            Some(v) if !v.name.is_empty() => format!("{} ({})", product.name, v.name),
            _ => product.name.clone(),
        },
        quantity: 1,
        price: plan.principal,
    };

    let mut installment = InstallmentDetails {
        method: plan.method,
        months: result.term,
        monthly_payment: result.monthly_payment,
        total_payment: result.total_payment,
        upfront: result.upfront,
        interest_rate: result.rate.or(plan.rate),
        transaction_id: None,
        card_last4: None,
        finance_status: None,
        documents: None,
    };

    match applicant {
        ApplicantInfo::Card(card) => {
            installment.transaction_id = token.cloned();
            installment.card_last4 = Some(last_four(&card.card_number));
        }
        ApplicantInfo::Finance(finance) => {
            installment.finance_status = Some(FINANCE_STATUS_PENDING.to_string());
            installment.documents = Some(finance.documents.clone());
        }
    }

    CreateOrderRequest {
        items: vec![item],
        address: applicant.address().trim().to_string(),
        phone: applicant.phone().trim().to_string(),
        note: note(plan.method, result.term),
        payment_method: PAYMENT_METHOD.to_string(),
        total: result.total_payment,
        installment,
    }
}

fn note(method: FinancingMethod, term: Term) -> String {
    let via = match method {
        FinancingMethod::Card => "credit card",
        FinancingMethod::FinanceCompany => "finance company",
    };
    format!("Installment purchase via {via}, {term} months")
}

/// Last four digits of a card number, ignoring separators.
pub fn last_four(card_number: &str) -> String {
    let digits: Vec<char> = card_number.chars().filter(|c| c.is_ascii_digit()).collect();
    digits[digits.len().saturating_sub(4)..].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CardApplicant, DocumentSlot, FinanceApplicant};

    fn product() -> Product {
        Product {
            id: "p1".into(),
            name: "Phone".into(),
            price: Amount::from_whole(20_000_000),
            images: vec![],
            variants: vec![Variant {
                id: "v1".into(),
                name: "256GB".into(),
                price: Amount::from_whole(23_000_000),
            }],
        }
    }

    fn result(months: u32) -> PlanCalculationResult {
        PlanCalculationResult {
            monthly_payment: Amount::from_whole(2_750_000),
            total_payment: Amount::from_whole(21_500_000),
            upfront: Amount::from_whole(5_000_000),
            term: Term::try_from(months).unwrap(),
            rate: None,
            detail: String::new(),
            extra_info: None,
        }
    }

    #[test]
    fn finance_order_is_pending_with_documents() {
        let product = product();
        let mut plan = InstallmentPlan::new(FinancingMethod::FinanceCompany, product.price);
        plan.term = Term::try_from(6).unwrap();
        plan.rate = InstallmentPlan::rate_for(plan.method, plan.term);

        let mut finance = FinanceApplicant {
            address: " 1 Le Loi ".into(),
            phone: "0900000000".into(),
            ..Default::default()
        };
        finance
            .documents
            .set(DocumentSlot::IdFront, Some("/uploads/f.jpg".into()));
        let applicant = ApplicantInfo::Finance(finance);

        let order = compose(&product, None, &plan, &applicant, &result(6), None);

        assert_eq!(order.items.len(), 1);
        assert_eq!(order.items[0].quantity, 1);
        assert_eq!(order.address, "1 Le Loi");
        assert_eq!(order.payment_method, "installment");
        assert_eq!(order.total, Amount::from_whole(21_500_000));
        assert_eq!(order.installment.finance_status.as_deref(), Some("pending"));
        assert_eq!(order.installment.transaction_id, None);
        assert_eq!(
            order.installment.interest_rate,
            Some(MonthlyRate::from_hundredths(167))
        );
        assert!(order.note.contains("6 months"));

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["installment"]["financeStatus"], "pending");
        assert_eq!(json["installment"]["documents"]["idCardFront"], "/uploads/f.jpg");
    }

    #[test]
    fn card_order_carries_token_and_masks_card() {
        let product = product();
        let variant = product.variant("v1");
        let plan = InstallmentPlan::new(FinancingMethod::Card, Amount::from_whole(23_000_000));
        let applicant = ApplicantInfo::Card(CardApplicant {
            card_number: "4111 1111 1111 1234".into(),
            ..Default::default()
        });
        let token = TransactionToken::new("TXN-1-abc");

        let order = compose(&product, variant, &plan, &applicant, &result(12), Some(&token));

        assert_eq!(order.items[0].variant.as_deref(), Some("v1"));
        assert_eq!(order.items[0].name, "Phone (256GB)");
        assert_eq!(order.items[0].price, Amount::from_whole(23_000_000));
        assert_eq!(order.installment.transaction_id, Some(token));
        assert_eq!(order.installment.card_last4.as_deref(), Some("1234"));
        assert_eq!(order.installment.finance_status, None);

        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["installment"]["type"], "card");
        assert_eq!(json["installment"]["transactionId"], "TXN-1-abc");
        assert!(json.to_string().find("4111").is_none());
    }

    #[test]
    fn last_four_handles_short_numbers() {
        assert_eq!(last_four("12"), "12");
        assert_eq!(last_four("4111-1111-1111-9876"), "9876");
        assert_eq!(last_four(""), "");
    }

    #[test]
    fn created_order_accepts_both_id_spellings() {
        let a: CreatedOrder = serde_json::from_str(r#"{"_id":"o1"}"#).unwrap();
        let b: CreatedOrder =
            serde_json::from_str(r#"{"id":"o2","installment":{"financeStatus":"pending"}}"#)
                .unwrap();
        assert_eq!(a.id, "o1");
        assert_eq!(
            b.installment.and_then(|i| i.finance_status).as_deref(),
            Some("pending")
        );
    }
}
