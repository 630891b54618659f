use serde::{Deserialize, Serialize};

pub const FULLNAME_MAX_CHARS: usize = 100;
const BALANCE_LIMIT: f64 = 1e12;

#[derive(Debug, Deserialize)]
pub struct CustomerRequest {
    #[serde(default)]
    pub fullname: String,
    pub balance: Option<f64>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidCustomer {
    pub fullname: String,
    pub balance: f64,
    pub remarks: Option<String>,
}

impl CustomerRequest {
    pub fn validate(&self) -> Result<ValidCustomer, Vec<String>> {
        let mut errors = Vec::new();

        let fullname = self.fullname.trim();
        if fullname.is_empty() || fullname.chars().count() > FULLNAME_MAX_CHARS {
            errors.push("Invalid Customer Name".to_string());
        }
        let balance = self.balance.unwrap_or(0.0);
        if !balance.is_finite() || balance.abs() >= BALANCE_LIMIT {
            errors.push("Invalid Customer Balance".to_string());
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(ValidCustomer {
            fullname: fullname.to_string(),
            balance,
            remarks: self
                .remarks
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CustomerResponse {
    pub id: i64,
    pub fullname: String,
    pub balance: f64,
    pub remarks: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<crate::models::customer::Customer> for CustomerResponse {
    fn from(customer: crate::models::customer::Customer) -> Self {
        Self {
            id: customer.id,
            fullname: customer.fullname,
            balance: customer.balance,
            remarks: customer.remarks,
            created_at: customer.created_at.to_rfc3339(),
            updated_at: customer.updated_at.to_rfc3339(),
        }
    }
}
