use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use shared_models::error::AppError;

// ==============================================================================
// BILL STATUS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BillStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
}

impl BillStatus {
    /// Status is a pure function of what has been paid against what is owed:
    /// nothing paid is `Unpaid`, covering a positive total is `Paid`,
    /// anything in between is `PartiallyPaid`.
    pub fn derive(grand_total: Decimal, total_paid: Decimal) -> Self {
        if total_paid <= Decimal::ZERO {
            BillStatus::Unpaid
        } else if grand_total > Decimal::ZERO && total_paid >= grand_total {
            BillStatus::Paid
        } else {
            BillStatus::PartiallyPaid
        }
    }
}

impl fmt::Display for BillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillStatus::Unpaid => write!(f, "unpaid"),
            BillStatus::PartiallyPaid => write!(f, "partially_paid"),
            BillStatus::Paid => write!(f, "paid"),
        }
    }
}

// ==============================================================================
// PAYMENT MODE
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    #[default]
    Cash,
    Card,
    Upi,
    BankTransfer,
    Cheque,
    Other,
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMode::Cash => write!(f, "cash"),
            PaymentMode::Card => write!(f, "card"),
            PaymentMode::Upi => write!(f, "upi"),
            PaymentMode::BankTransfer => write!(f, "bank_transfer"),
            PaymentMode::Cheque => write!(f, "cheque"),
            PaymentMode::Other => write!(f, "other"),
        }
    }
}

impl FromStr for PaymentMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "" | "cash" => Ok(PaymentMode::Cash),
            "card" | "credit_card" | "debit_card" => Ok(PaymentMode::Card),
            "upi" => Ok(PaymentMode::Upi),
            "bank_transfer" | "neft" | "imps" => Ok(PaymentMode::BankTransfer),
            "cheque" | "check" => Ok(PaymentMode::Cheque),
            "other" => Ok(PaymentMode::Other),
            _ => Err(AppError::ValidationError(format!("Invalid payment mode: {}", s))),
        }
    }
}

// ==============================================================================
// STORE ROWS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Bill {
    pub id: i64,
    pub visit_id: i64,
    pub bill_number: String,
    pub grand_total: Decimal,
    pub status: BillStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all(serialize = "camelCase"))]
pub struct Payment {
    pub id: i64,
    pub bill_id: i64,
    pub amount: Decimal,
    pub mode: PaymentMode,
    pub received_by: Option<Uuid>,
    pub paid_at: DateTime<Utc>,
}

// ==============================================================================
// API SHAPES
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillSummary {
    #[serde(flatten)]
    pub bill: Bill,
    pub total_paid: Decimal,
    pub balance: Decimal,
    pub payments: Vec<Payment>,
}

impl BillSummary {
    pub fn new(bill: Bill, payments: Vec<Payment>) -> Self {
        let total_paid = total_paid(&payments);
        let balance = bill.grand_total - total_paid;
        Self {
            bill,
            total_paid,
            balance,
            payments,
        }
    }
}

/// Result of `add_payment`: `status` is the bill status after the payment.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub status: BillStatus,
    pub payment_id: i64,
    #[serde(rename = "billNumber")]
    pub bill_number: String,
    #[serde(rename = "totalPaid")]
    pub total_paid: Decimal,
    pub balance: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddPaymentRequest {
    pub amount: Option<Value>,
    pub mode: Option<String>,
}

pub fn total_paid(payments: &[Payment]) -> Decimal {
    payments.iter().map(|p| p.amount).sum()
}

/// Accepts a JSON number or numeric string; rejects anything missing,
/// non-numeric, non-positive, or finer than paise.
pub fn parse_amount(raw: Option<&Value>) -> Result<Decimal, AppError> {
    let text = match raw {
        None | Some(Value::Null) => {
            return Err(AppError::ValidationError("amount is required".to_string()))
        }
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(_) => return Err(AppError::ValidationError("amount must be a number".to_string())),
    };

    let amount = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| AppError::ValidationError(format!("amount must be a number, got {:?}", text)))?;

    if amount <= Decimal::ZERO {
        return Err(AppError::ValidationError("amount must be greater than zero".to_string()));
    }

    if amount.normalize().scale() > 2 {
        return Err(AppError::ValidationError(
            "amount cannot have more than two decimal places".to_string(),
        ));
    }

    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    fn d(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn test_status_follows_payment_sum() {
        assert_eq!(BillStatus::derive(d(2500), d(0)), BillStatus::Unpaid);
        assert_eq!(BillStatus::derive(d(2500), d(1000)), BillStatus::PartiallyPaid);
        assert_eq!(BillStatus::derive(d(2500), d(2500)), BillStatus::Paid);
        assert_eq!(BillStatus::derive(d(2500), d(3000)), BillStatus::Paid);
    }

    #[test]
    fn test_zero_total_bill() {
        assert_eq!(BillStatus::derive(d(0), d(0)), BillStatus::Unpaid);
        // paid requires a positive total
        assert_eq!(BillStatus::derive(d(0), d(100)), BillStatus::PartiallyPaid);
    }

    #[test]
    fn test_parse_amount_accepts_numbers_and_strings() {
        assert_eq!(parse_amount(Some(&json!(1000))).unwrap(), d(1000));
        assert_eq!(parse_amount(Some(&json!("1500.50"))).unwrap(), Decimal::new(150050, 2));
        assert_eq!(parse_amount(Some(&json!(" 250 "))).unwrap(), d(250));
    }

    #[test]
    fn test_parse_amount_rejects_bad_input() {
        assert_matches!(parse_amount(None), Err(AppError::ValidationError(_)));
        assert_matches!(parse_amount(Some(&Value::Null)), Err(AppError::ValidationError(_)));
        assert_matches!(parse_amount(Some(&json!("abc"))), Err(AppError::ValidationError(_)));
        assert_matches!(parse_amount(Some(&json!(0))), Err(AppError::ValidationError(_)));
        assert_matches!(parse_amount(Some(&json!(-10))), Err(AppError::ValidationError(_)));
        assert_matches!(parse_amount(Some(&json!("10.005"))), Err(AppError::ValidationError(_)));
        assert_matches!(parse_amount(Some(&json!([100]))), Err(AppError::ValidationError(_)));
    }

    #[test]
    fn test_payment_mode_parsing() {
        assert_eq!("UPI".parse::<PaymentMode>().unwrap(), PaymentMode::Upi);
        assert_eq!("bank transfer".parse::<PaymentMode>().unwrap(), PaymentMode::BankTransfer);
        assert_eq!("".parse::<PaymentMode>().unwrap(), PaymentMode::Cash);
        assert!("barter".parse::<PaymentMode>().is_err());
    }

    #[test]
    fn test_summary_balance() {
        let bill = Bill {
            id: 1,
            visit_id: 10,
            bill_number: "BILL-2024-001".to_string(),
            grand_total: d(2500),
            status: BillStatus::PartiallyPaid,
            created_at: Utc::now(),
        };
        let payment = Payment {
            id: 1,
            bill_id: 1,
            amount: d(1000),
            mode: PaymentMode::Cash,
            received_by: None,
            paid_at: Utc::now(),
        };

        let summary = BillSummary::new(bill, vec![payment]);
        assert_eq!(summary.total_paid, d(1000));
        assert_eq!(summary.balance, d(1500));

        let wire = serde_json::to_value(&summary).unwrap();
        assert_eq!(wire["billNumber"], "BILL-2024-001");
        assert_eq!(wire["balance"], "1500");
        assert_eq!(wire["status"], "partially_paid");
    }
}
