//! Core domain types for the installment workflow.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::Amount;

/// Backend product identifier.
pub type ProductId = String;

/// Backend order identifier.
pub type OrderId = String;

/// The installment mechanism chosen by the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FinancingMethod {
    /// Credit-card installment plan; needs a payment authorization before ordering.
    #[serde(rename = "card")]
    Card,
    /// Third-party finance company plan; needs supporting documents.
    #[serde(rename = "finance")]
    FinanceCompany,
}

impl FinancingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinancingMethod::Card => "card",
            FinancingMethod::FinanceCompany => "finance",
        }
    }
}

impl fmt::Display for FinancingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FinancingMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "card" => Ok(FinancingMethod::Card),
            "finance" | "finance_company" => Ok(FinancingMethod::FinanceCompany),
            other => Err(format!("unknown financing method '{other}'")),
        }
    }
}

/// Repayment term in months, restricted to the offered set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Term(u8);

impl Term {
    pub const ALLOWED: [u8; 6] = [3, 6, 9, 12, 18, 24];

    /// Every offered term, shortest first.
    pub fn all() -> impl Iterator<Item = Term> {
        Self::ALLOWED.into_iter().map(Term)
    }

    pub fn months(self) -> u32 {
        self.0 as u32
    }
}

impl Default for Term {
    fn default() -> Self {
        Term(12)
    }
}

impl TryFrom<u32> for Term {
    type Error = u32;

    fn try_from(months: u32) -> Result<Self, Self::Error> {
        Self::ALLOWED
            .into_iter()
            .find(|allowed| *allowed as u32 == months)
            .map(Term)
            .ok_or(months)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Term {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.0)
    }
}

impl<'de> Deserialize<'de> for Term {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let months = u32::deserialize(deserializer)?;
        Term::try_from(months)
            .map_err(|m| serde::de::Error::custom(format!("unsupported term of {m} months")))
    }
}

/// Monthly interest rate in hundredths of a percent (`167` is 1.67%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub struct MonthlyRate(u32);

impl MonthlyRate {
    pub const fn from_hundredths(value: u32) -> Self {
        MonthlyRate(value)
    }

    pub fn hundredths(self) -> u32 {
        self.0
    }

    pub fn as_percent(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for MonthlyRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}%", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for MonthlyRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_percent())
    }
}

impl<'de> Deserialize<'de> for MonthlyRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let percent = f64::deserialize(deserializer)?;
        let hundredths = (percent * 100.0).round();
        if !percent.is_finite() || percent < 0.0 || hundredths > f64::from(u32::MAX) {
            return Err(serde::de::Error::custom(format!(
                "invalid interest rate {percent}"
            )));
        }
        Ok(MonthlyRate(hundredths as u32))
    }
}

/// Monthly rate charged by the finance company for a given term.
///
/// Product policy, not derived from anything.
pub fn finance_rate(term: Term) -> MonthlyRate {
    let hundredths = match term.months() {
        3 => 150,
        6 => 167,
        9 => 183,
        12 => 200,
        18 => 217,
        _ => 233,
    };
    MonthlyRate::from_hundredths(hundredths)
}

/// The customer's in-progress financing selection.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallmentPlan {
    pub method: FinancingMethod,
    pub principal: Amount,
    pub down_payment: Amount,
    pub term: Term,
    /// Table value for the finance company; `None` for cards until the backend quotes one.
    pub rate: Option<MonthlyRate>,
}

impl InstallmentPlan {
    pub fn new(method: FinancingMethod, principal: Amount) -> Self {
        let term = Term::default();
        Self {
            method,
            principal,
            down_payment: Amount::ZERO,
            term,
            rate: Self::rate_for(method, term),
        }
    }

    /// Rate shown before calculation for the given method and term.
    pub fn rate_for(method: FinancingMethod, term: Term) -> Option<MonthlyRate> {
        match method {
            FinancingMethod::FinanceCompany => Some(finance_rate(term)),
            FinancingMethod::Card => None,
        }
    }

    /// Amount left to repay after the down payment.
    pub fn financed_amount(&self) -> Amount {
        self.principal.saturating_sub(self.down_payment)
    }
}

/// Supporting document kinds for a finance company application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentSlot {
    IdFront,
    IdBack,
    HouseholdRegistration,
    IncomeProof,
}

impl DocumentSlot {
    pub const ALL: [DocumentSlot; 4] = [
        DocumentSlot::IdFront,
        DocumentSlot::IdBack,
        DocumentSlot::HouseholdRegistration,
        DocumentSlot::IncomeProof,
    ];

    pub fn is_mandatory(self) -> bool {
        !matches!(self, DocumentSlot::HouseholdRegistration)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentSlot::IdFront => "id_front",
            DocumentSlot::IdBack => "id_back",
            DocumentSlot::HouseholdRegistration => "household_registration",
            DocumentSlot::IncomeProof => "income_proof",
        }
    }
}

impl fmt::Display for DocumentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentSlot::ALL
            .into_iter()
            .find(|slot| slot.as_str() == s.trim())
            .ok_or_else(|| format!("unknown document slot '{s}'"))
    }
}

/// Server-side paths of uploaded documents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Documents {
    #[serde(rename = "idCardFront", skip_serializing_if = "Option::is_none")]
    pub id_front: Option<String>,
    #[serde(rename = "idCardBack", skip_serializing_if = "Option::is_none")]
    pub id_back: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub household_registration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub income_proof: Option<String>,
}

impl Documents {
    pub fn get(&self, slot: DocumentSlot) -> Option<&str> {
        match slot {
            DocumentSlot::IdFront => self.id_front.as_deref(),
            DocumentSlot::IdBack => self.id_back.as_deref(),
            DocumentSlot::HouseholdRegistration => self.household_registration.as_deref(),
            DocumentSlot::IncomeProof => self.income_proof.as_deref(),
        }
    }

    pub fn set(&mut self, slot: DocumentSlot, path: Option<String>) {
        let entry = match slot {
            DocumentSlot::IdFront => &mut self.id_front,
            DocumentSlot::IdBack => &mut self.id_back,
            DocumentSlot::HouseholdRegistration => &mut self.household_registration,
            DocumentSlot::IncomeProof => &mut self.income_proof,
        };
        *entry = path;
    }
}

/// Applicant data for a card plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardApplicant {
    pub card_number: String,
    pub card_holder: String,
    pub expiry_date: String,
    pub cvv: String,
    pub bank: String,
    pub address: String,
    pub phone: String,
}

/// Applicant data for a finance company plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceApplicant {
    pub full_name: String,
    pub id_number: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub monthly_income: String,
    pub relative_phone_1: String,
    pub relative_phone_2: String,
    #[serde(skip)]
    pub documents: Documents,
}

/// Method-specific applicant data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplicantInfo {
    Card(CardApplicant),
    Finance(FinanceApplicant),
}

impl ApplicantInfo {
    /// Empty applicant record for the given method.
    pub fn empty(method: FinancingMethod) -> Self {
        match method {
            FinancingMethod::Card => ApplicantInfo::Card(CardApplicant::default()),
            FinancingMethod::FinanceCompany => ApplicantInfo::Finance(FinanceApplicant::default()),
        }
    }

    pub fn method(&self) -> FinancingMethod {
        match self {
            ApplicantInfo::Card(_) => FinancingMethod::Card,
            ApplicantInfo::Finance(_) => FinancingMethod::FinanceCompany,
        }
    }

    pub fn address(&self) -> &str {
        match self {
            ApplicantInfo::Card(card) => &card.address,
            ApplicantInfo::Finance(finance) => &finance.address,
        }
    }

    pub fn phone(&self) -> &str {
        match self {
            ApplicantInfo::Card(card) => &card.phone,
            ApplicantInfo::Finance(finance) => &finance.phone,
        }
    }
}

/// Figures returned by the backend calculator.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanCalculationResult {
    pub monthly_payment: Amount,
    /// Everything the customer pays, upfront included.
    pub total_payment: Amount,
    pub upfront: Amount,
    pub term: Term,
    /// Rate the backend applied, when it reports one.
    pub rate: Option<MonthlyRate>,
    pub detail: String,
    pub extra_info: Option<String>,
}

/// A purchasable variant of a product.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Variant {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub price: Amount,
}

/// Product detail as served by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Product {
    #[serde(rename = "_id", alias = "id")]
    pub id: ProductId,
    pub name: String,
    pub price: Amount,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl Product {
    pub fn variant(&self, id: &str) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }
}

/// Identifier minted by a payment authorization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TransactionToken(String);

impl TransactionToken {
    pub fn new(value: impl Into<String>) -> Self {
        TransactionToken(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for TransactionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
