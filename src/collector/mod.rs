//! Plan input collection.
//!
//! Gathers the financing method, term, down payment and method-specific
//! applicant data, and decides when the plan is complete enough to calculate.

use tracing::{info, warn};

use crate::Amount;
use crate::api::{Backend, Session, Upload};
use crate::model::{
    ApplicantInfo, CardApplicant, DocumentSlot, FinanceApplicant, FinancingMethod,
    InstallmentPlan, Term,
};

mod error;
pub use error::{UploadError, ValidationError};

/// Card fields in the order they are checked.
const CARD_REQUIRED: [&str; 7] = [
    "card_number",
    "card_holder",
    "expiry_date",
    "cvv",
    "bank",
    "address",
    "phone",
];

/// Finance fields in the order they are checked; the rest are optional.
const FINANCE_REQUIRED: [&str; 5] = [
    "full_name",
    "id_number",
    "phone",
    "address",
    "monthly_income",
];

/// Editable plan plus applicant data.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanCollector {
    plan: InstallmentPlan,
    applicant: ApplicantInfo,
}

/// Public API
impl PlanCollector {
    pub fn new(method: FinancingMethod, principal: Amount) -> Self {
        Self {
            plan: InstallmentPlan::new(method, principal),
            applicant: ApplicantInfo::empty(method),
        }
    }

    pub fn plan(&self) -> &InstallmentPlan {
        &self.plan
    }

    pub fn applicant(&self) -> &ApplicantInfo {
        &self.applicant
    }

    pub fn method(&self) -> FinancingMethod {
        self.plan.method
    }

    /// Switch financing method.
    ///
    /// Fields the new method does not use are dropped; address and phone carry over.
    /// The rate is recomputed for the current term.
    pub fn select_method(&mut self, method: FinancingMethod) {
        if method == self.plan.method {
            return;
        }

        let address = self.applicant.address().to_string();
        let phone = self.applicant.phone().to_string();
        self.applicant = match method {
            FinancingMethod::Card => ApplicantInfo::Card(CardApplicant {
                address,
                phone,
                ..Default::default()
            }),
            FinancingMethod::FinanceCompany => ApplicantInfo::Finance(FinanceApplicant {
                address,
                phone,
                ..Default::default()
            }),
        };
        self.plan.method = method;
        self.plan.rate = InstallmentPlan::rate_for(method, self.plan.term);

        info!(method = %method, rate = ?self.plan.rate, "financing method selected");
    }

    pub fn set_term(&mut self, months: u32) -> Result<(), ValidationError> {
        let term = Term::try_from(months).map_err(ValidationError::UnsupportedTerm)?;
        self.plan.term = term;
        self.plan.rate = InstallmentPlan::rate_for(self.plan.method, term);
        Ok(())
    }

    /// Accepts any non-negative amount; the bound against the price is checked in
    /// [`validate_for_submission`](Self::validate_for_submission).
    pub fn set_down_payment(&mut self, amount: Amount) -> Result<(), ValidationError> {
        if amount.is_negative() {
            return Err(ValidationError::NegativeDownPayment);
        }
        self.plan.down_payment = amount;
        Ok(())
    }

    /// Current value of a named field of the active applicant record.
    pub fn applicant_field(&self, field: &str) -> Result<&str, ValidationError> {
        let value = match &self.applicant {
            ApplicantInfo::Card(card) => card_field(card, field),
            ApplicantInfo::Finance(finance) => finance_field(finance, field),
        };
        value.ok_or_else(|| ValidationError::UnknownField {
            field: field.to_string(),
            method: self.plan.method,
        })
    }

    /// Set a named field of the active applicant record.
    pub fn set_applicant_field(
        &mut self,
        field: &str,
        value: impl Into<String>,
    ) -> Result<(), ValidationError> {
        let method = self.plan.method;
        let slot = match &mut self.applicant {
            ApplicantInfo::Card(card) => card_field_mut(card, field),
            ApplicantInfo::Finance(finance) => finance_field_mut(finance, field),
        };
        let slot = slot.ok_or_else(|| ValidationError::UnknownField {
            field: field.to_string(),
            method,
        })?;
        *slot = value.into();
        Ok(())
    }

    /// Upload a supporting document and remember its server path.
    ///
    /// The slot is cleared first, so a failed upload leaves it unresolved.
    pub async fn upload_document<B: Backend + ?Sized>(
        &mut self,
        backend: &B,
        session: &Session,
        slot: DocumentSlot,
        file: Upload,
    ) -> Result<String, UploadError> {
        let ApplicantInfo::Finance(finance) = &mut self.applicant else {
            return Err(UploadError::NotApplicable(self.plan.method));
        };
        finance.documents.set(slot, None);

        let file_name = file.file_name.clone();
        let paths = backend
            .upload_images(session, vec![file])
            .await
            .map_err(|source| {
                warn!(slot = %slot, file = %file_name, reason = %source, "document upload failed");
                UploadError::Api { slot, source }
            })?;
        let path = paths
            .into_iter()
            .next()
            .filter(|p| !p.trim().is_empty())
            .ok_or(UploadError::NoPath(slot))?;

        info!(slot = %slot, path = %path, "document uploaded");
        finance.documents.set(slot, Some(path.clone()));
        Ok(path)
    }

    /// Check that the active method's mandatory data is all present.
    ///
    /// Reports the first missing field.
    pub fn validate_for_submission(&self) -> Result<(), ValidationError> {
        match &self.applicant {
            ApplicantInfo::Card(card) => {
                for name in CARD_REQUIRED {
                    if is_blank(card_field(card, name)) {
                        return Err(ValidationError::MissingField(name));
                    }
                }
            }
            ApplicantInfo::Finance(finance) => {
                for name in FINANCE_REQUIRED {
                    if is_blank(finance_field(finance, name)) {
                        return Err(ValidationError::MissingField(name));
                    }
                }
                for slot in DocumentSlot::ALL.into_iter().filter(|s| s.is_mandatory()) {
                    if is_blank(finance.documents.get(slot)) {
                        return Err(ValidationError::MissingDocument(slot));
                    }
                }
            }
        }

        if self.plan.down_payment > self.plan.principal {
            return Err(ValidationError::DownPaymentExceedsPrincipal {
                down_payment: self.plan.down_payment,
                principal: self.plan.principal,
            });
        }

        Ok(())
    }
}

// field tables

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|v| v.trim().is_empty())
}

fn card_field<'a>(card: &'a CardApplicant, name: &str) -> Option<&'a str> {
    let value = match name {
        "card_number" => &card.card_number,
        "card_holder" => &card.card_holder,
        "expiry_date" => &card.expiry_date,
        "cvv" => &card.cvv,
        "bank" => &card.bank,
        "address" => &card.address,
        "phone" => &card.phone,
        _ => return None,
    };
    Some(value.as_str())
}

fn card_field_mut<'a>(card: &'a mut CardApplicant, name: &str) -> Option<&'a mut String> {
    let value = match name {
        "card_number" => &mut card.card_number,
        "card_holder" => &mut card.card_holder,
        "expiry_date" => &mut card.expiry_date,
        "cvv" => &mut card.cvv,
        "bank" => &mut card.bank,
        "address" => &mut card.address,
        "phone" => &mut card.phone,
        _ => return None,
    };
    Some(value)
}

fn finance_field<'a>(finance: &'a FinanceApplicant, name: &str) -> Option<&'a str> {
    let value = match name {
        "full_name" => &finance.full_name,
        "id_number" => &finance.id_number,
        "phone" => &finance.phone,
        "email" => &finance.email,
        "address" => &finance.address,
        "monthly_income" => &finance.monthly_income,
        "relative_phone_1" => &finance.relative_phone_1,
        "relative_phone_2" => &finance.relative_phone_2,
        _ => return None,
    };
    Some(value.as_str())
}

fn finance_field_mut<'a>(
    finance: &'a mut FinanceApplicant,
    name: &str,
) -> Option<&'a mut String> {
    let value = match name {
        "full_name" => &mut finance.full_name,
        "id_number" => &mut finance.id_number,
        "phone" => &mut finance.phone,
        "email" => &mut finance.email,
        "address" => &mut finance.address,
        "monthly_income" => &mut finance.monthly_income,
        "relative_phone_1" => &mut finance.relative_phone_1,
        "relative_phone_2" => &mut finance.relative_phone_2,
        _ => return None,
    };
    Some(value)
}
