use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::Amount;
use crate::model::{DocumentSlot, FinancingMethod, Term, finance_rate};

/// Errors that can occur when reading script rows
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("cannot open script {path}: {source}")]
    Open { path: PathBuf, source: csv::Error },

    #[error("line {line}: failed to parse row: {source}")]
    Parse { line: usize, source: csv::Error },

    #[error("line {line}: unrecognized action '{action}'")]
    UnrecognizedAction { line: usize, action: String },

    #[error("line {line}: {action} missing {what}")]
    MissingValue {
        line: usize,
        action: String,
        what: &'static str,
    },

    #[error("line {line}: {action}: {reason}")]
    InvalidValue {
        line: usize,
        action: String,
        reason: String,
    },
}

/// One user action in a workflow script.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Open {
        product_id: String,
        variant_id: Option<String>,
    },
    Method(FinancingMethod),
    Term(u32),
    DownPayment(Amount),
    Set {
        field: String,
        value: String,
    },
    Upload {
        slot: DocumentSlot,
        path: PathBuf,
    },
    Calculate,
    Authorize,
    Acknowledge,
    Submit,
    Cancel,
}

#[derive(Debug, Deserialize)]
struct InputRow {
    action: String,
    field: Option<String>,
    value: Option<String>,
}

/// Final workflow state, one row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub stage: String,
    pub method: String,
    pub term: String,
    pub rate: String,
    pub monthly_payment: String,
    pub total_payment: String,
    pub upfront: String,
    pub order_id: String,
}

#[derive(Debug, Serialize)]
struct RateRow {
    months: u32,
    monthly_rate: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl InputRow {
    fn into_action(self, line: usize) -> Result<Action, ScriptError> {
        let action = self.action.to_ascii_lowercase();
        let field = non_empty(self.field);
        let value = non_empty(self.value);

        let require = |value: Option<String>, what: &'static str| {
            value.ok_or_else(|| ScriptError::MissingValue {
                line,
                action: action.clone(),
                what,
            })
        };
        let invalid = |reason: String| ScriptError::InvalidValue {
            line,
            action: action.clone(),
            reason,
        };

        match action.as_str() {
            "open" => Ok(Action::Open {
                product_id: require(value, "product id")?,
                variant_id: field,
            }),
            "method" => require(value, "method")?
                .parse()
                .map(Action::Method)
                .map_err(invalid),
            "term" => {
                let raw = require(value, "months")?;
                raw.trim()
                    .parse()
                    .map(Action::Term)
                    .map_err(|_| invalid(format!("'{raw}' is not a number of months")))
            }
            "down_payment" => require(value, "amount")?
                .parse()
                .map(Action::DownPayment)
                .map_err(|e: crate::amount::ParseAmountError| invalid(e.to_string())),
            "set" => Ok(Action::Set {
                field: require(field, "field")?,
                value: value.unwrap_or_default(),
            }),
            "upload" => {
                let slot = require(field, "document slot")?.parse().map_err(invalid)?;
                Ok(Action::Upload {
                    slot,
                    path: PathBuf::from(require(value, "file path")?),
                })
            }
            "calculate" => Ok(Action::Calculate),
            "authorize" => Ok(Action::Authorize),
            "acknowledge" => Ok(Action::Acknowledge),
            "submit" => Ok(Action::Submit),
            "cancel" => Ok(Action::Cancel),
            _ => Err(ScriptError::UnrecognizedAction {
                line,
                action: self.action,
            }),
        }
    }
}

/// Read actions from a csv script with header `action,field,value`
pub fn read_actions(
    path: impl AsRef<Path>,
) -> Result<impl Iterator<Item = Result<Action, ScriptError>>, ScriptError> {
    let path = path.as_ref();
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|source| ScriptError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(reader
        .into_deserialize::<InputRow>()
        .enumerate()
        .map(|(idx, result)| {
            let line = idx + 2; // 1-indexed, skip header
            let row = result.map_err(|source| ScriptError::Parse { line, source })?;
            row.into_action(line)
        }))
}

/// Write the workflow summary in csv format
pub fn write_summary(writer: impl io::Write, summary: &Summary) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.serialize(summary)?;
    writer.flush()?;
    Ok(())
}

/// Write the finance company rate table in csv format
pub fn write_rates(writer: impl io::Write) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    for term in Term::all() {
        writer.serialize(RateRow {
            months: term.months(),
            monthly_rate: finance_rate(term).to_string(),
        })?;
    }
    writer.flush()?;
    Ok(())
}
