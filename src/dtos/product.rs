// src/dtos/product.rs
use serde::{Deserialize, Serialize};

// Column limits of the products table.
pub const CODE_MAX_CHARS: usize = 30;
pub const NAME_MAX_CHARS: usize = 50;
const PRICE_LIMIT: f64 = 1e10;

/// Quantity as typed into the product form: a JSON number or a digit string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum QuantityInput {
    Whole(i64),
    Text(String),
    Other(serde_json::Value),
}

impl Default for QuantityInput {
    fn default() -> Self {
        QuantityInput::Text(String::new())
    }
}

impl QuantityInput {
    fn parse(&self) -> Option<i32> {
        match self {
            QuantityInput::Whole(n) => i32::try_from(*n).ok().filter(|n| *n >= 0),
            QuantityInput::Text(s) => {
                let s = s.trim();
                if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
                    return None;
                }
                s.parse().ok()
            }
            QuantityInput::Other(_) => None,
        }
    }
}

/// Body of both create and update; an update replaces every field.
#[derive(Debug, Deserialize)]
pub struct ProductRequest {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub quantity: QuantityInput,
    pub price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidProduct {
    pub code: String,
    pub name: String,
    pub quantity: i32,
    pub price: Option<f64>,
}

impl ProductRequest {
    /// Checks every field and reports all problems at once.
    pub fn validate(&self) -> Result<ValidProduct, Vec<String>> {
        let mut errors = Vec::new();

        let code = self.code.trim();
        if code.is_empty() || code.chars().count() > CODE_MAX_CHARS {
            errors.push("Invalid Product code".to_string());
        }
        let name = self.name.trim();
        if name.is_empty() || name.chars().count() > NAME_MAX_CHARS {
            errors.push("Invalid Product Name".to_string());
        }
        let quantity = self.quantity.parse();
        if quantity.is_none() {
            errors.push("Invalid Product Quantity".to_string());
        }
        if matches!(self.price, Some(p) if !p.is_finite() || !(0.0..PRICE_LIMIT).contains(&p)) {
            errors.push("Invalid Product Price".to_string());
        }

        match quantity {
            Some(quantity) if errors.is_empty() => Ok(ValidProduct {
                code: code.to_string(),
                name: name.to_string(),
                quantity,
                price: self.price,
            }),
            _ => Err(errors),
        }
    }
}

pub fn error_summary(errors: &[String]) -> String {
    format!("Please check errors. [ {} ]", errors.join(","))
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub quantity: i32,
    pub price: Option<f64>,
    pub created_at: String,
    pub updated_at: String,
}

// Convert from Model to Response DTO
impl From<crate::models::product::Product> for ProductResponse {
    fn from(product: crate::models::product::Product) -> Self {
        Self {
            id: product.id,
            code: product.code,
            name: product.name,
            quantity: product.quantity,
            price: product.price,
            created_at: product.created_at.to_rfc3339(),
            updated_at: product.updated_at.to_rfc3339(),
        }
    }
}
