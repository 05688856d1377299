use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use shared_models::error::AppError;
use shared_utils::validation::require_non_empty;

/// Catalog entry; `price` is the current per-sitting price.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Treatment {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTreatment {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    pub price: Decimal,
}

impl NewTreatment {
    /// Trims the title and checks the price.
    pub fn validated(self) -> Result<Self, AppError> {
        let title = require_non_empty("title", &self.title)?;
        check_price(self.price)?;
        Ok(Self { title, ..self })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTreatmentRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub price: Option<Decimal>,
}

pub fn check_price(price: Decimal) -> Result<(), AppError> {
    if price < Decimal::ZERO {
        return Err(AppError::ValidationError("price cannot be negative".to_string()));
    }
    if price.normalize().scale() > 2 {
        return Err(AppError::ValidationError(
            "price cannot have more than two decimal places".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn test_price_accepts_number_or_string() {
        let a: NewTreatment = serde_json::from_value(json!({ "title": "Nasyam", "price": 800 })).unwrap();
        let b: NewTreatment = serde_json::from_value(json!({ "title": "Nasyam", "price": "800.00" })).unwrap();
        assert_eq!(a.price, b.price);
        assert_eq!(a.description, "");
    }

    #[test]
    fn test_validation() {
        let ok = NewTreatment {
            title: "  Kizhi ".into(),
            description: String::new(),
            image: String::new(),
            price: Decimal::from(1800),
        };
        assert_eq!(ok.validated().unwrap().title, "Kizhi");

        let blank = NewTreatment {
            title: " ".into(),
            description: String::new(),
            image: String::new(),
            price: Decimal::ZERO,
        };
        assert_matches!(blank.validated(), Err(AppError::ValidationError(_)));

        assert_matches!(check_price(Decimal::from(-1)), Err(AppError::ValidationError(_)));
        assert_matches!(check_price(Decimal::new(1005, 3)), Err(AppError::ValidationError(_)));
        assert!(check_price(Decimal::ZERO).is_ok());
    }
}
