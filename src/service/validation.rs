//! Request validation from catalog rules.

use crate::catalog::ValidationRule;
use crate::error::AppError;
use chrono::{DateTime, NaiveDate};
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate body against per-column rules. All required fields must be present.
    pub fn validate(
        body: &HashMap<String, Value>,
        rules: &HashMap<String, ValidationRule>,
    ) -> Result<(), AppError> {
        for (col, rule) in sorted(rules) {
            let val = body.get(col);
            if rule.required == Some(true) && (val.is_none() || val == Some(&Value::Null)) {
                return Err(AppError::Validation(format!("{} is required", col)));
            }
            if let Some(v) = val {
                validate_field(col, v, rule)?;
            }
        }
        Ok(())
    }

    /// Validate only the fields present in body (for PUT/PATCH). Required is not enforced for missing fields.
    pub fn validate_partial(
        body: &HashMap<String, Value>,
        rules: &HashMap<String, ValidationRule>,
    ) -> Result<(), AppError> {
        for (col, rule) in sorted(rules) {
            let Some(v) = body.get(col) else { continue };
            if rule.required == Some(true) && v.is_null() {
                return Err(AppError::Validation(format!("{} cannot be null", col)));
            }
            validate_field(col, v, rule)?;
        }
        Ok(())
    }
}

fn sorted(rules: &HashMap<String, ValidationRule>) -> Vec<(&String, &ValidationRule)> {
    let mut out: Vec<_> = rules.iter().collect();
    out.sort_by(|a, b| a.0.cmp(b.0));
    out
}

/// Numbers arrive as JSON numbers or numeric strings from form posts.
fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn validate_field(col: &str, v: &Value, rule: &ValidationRule) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    if let Some(format) = &rule.format {
        validate_format(col, v, format)?;
    }
    if let Some(max) = rule.max_length {
        if let Some(s) = v.as_str() {
            if s.chars().count() > max as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at most {} characters",
                    col, max
                )));
            }
        }
    }
    if let Some(min) = rule.min_length {
        if let Some(s) = v.as_str() {
            if s.chars().count() < min as usize {
                return Err(AppError::Validation(format!(
                    "{} must be at least {} characters",
                    col, min
                )));
            }
        }
    }
    if let Some(ref pattern) = rule.pattern {
        let re = Regex::new(pattern).map_err(|_| AppError::Validation(format!("invalid pattern for {}", col)))?;
        if let Some(s) = v.as_str() {
            if !re.is_match(s) {
                return Err(AppError::Validation(format!("{} does not match required pattern", col)));
            }
        }
    }
    if let Some(ref allowed) = rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            let names: Vec<String> = allowed
                .iter()
                .map(|a| a.as_str().map(str::to_string).unwrap_or_else(|| a.to_string()))
                .collect();
            return Err(AppError::Validation(format!(
                "{} must be one of: {}",
                col,
                names.join(", ")
            )));
        }
    }
    if rule.minimum.is_some() || rule.maximum.is_some() {
        let n = as_number(v).ok_or_else(|| AppError::Validation(format!("{} must be a number", col)))?;
        if let Some(min) = rule.minimum {
            if n < min {
                return Err(AppError::Validation(format!("{} must be at least {}", col, min)));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                return Err(AppError::Validation(format!("{} must be at most {}", col, max)));
            }
        }
    }
    Ok(())
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(s), Value::String(t)) => s == t,
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn is_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
        || DateTime::parse_from_rfc3339(s).is_ok()
        || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
        || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").is_ok()
}

fn validate_format(col: &str, v: &Value, format: &str) -> Result<(), AppError> {
    match format.to_lowercase().as_str() {
        "date" => {
            if !v.as_str().is_some_and(is_date) {
                return Err(AppError::Validation(format!("{} must be a valid date", col)));
            }
        }
        "email" => {
            if let Some(s) = v.as_str() {
                if !s.contains('@') || s.len() < 3 {
                    return Err(AppError::Validation(format!("{} must be a valid email", col)));
                }
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use serde_json::json;

    fn body(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn transaction_rules() -> HashMap<String, ValidationRule> {
        Catalog::builtin().unwrap().entity("transactions").unwrap().validation.clone()
    }

    #[test]
    fn full_validation_requires_fields() {
        let err = RequestValidator::validate(&body(&[("type", json!("deposit"))]), &transaction_rules())
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(m) if m == "amount is required"));
    }

    #[test]
    fn valid_transaction_passes() {
        let b = body(&[
            ("type", json!("withdraw")),
            ("amount", json!("150.00")),
            ("transaction_date", json!("2024-05-01")),
        ]);
        RequestValidator::validate(&b, &transaction_rules()).unwrap();
    }

    #[test]
    fn enumerated_values_enforced() {
        let b = body(&[
            ("type", json!("refund")),
            ("amount", json!(10)),
            ("transaction_date", json!("2024-05-01")),
        ]);
        let err = RequestValidator::validate(&b, &transaction_rules()).unwrap_err();
        assert!(matches!(err, AppError::Validation(m) if m == "type must be one of: deposit, withdraw"));
    }

    #[test]
    fn minimum_and_numeric_checks() {
        let rules = transaction_rules();
        let low = body(&[("amount", json!(0))]);
        assert!(RequestValidator::validate_partial(&low, &rules).is_err());
        let text = body(&[("amount", json!("lots"))]);
        let err = RequestValidator::validate_partial(&text, &rules).unwrap_err();
        assert!(matches!(err, AppError::Validation(m) if m == "amount must be a number"));
    }

    #[test]
    fn partial_only_checks_present_fields() {
        let rules = transaction_rules();
        RequestValidator::validate_partial(&body(&[("description", json!("PayPal"))]), &rules).unwrap();
        let err = RequestValidator::validate_partial(&body(&[("type", Value::Null)]), &rules).unwrap_err();
        assert!(matches!(err, AppError::Validation(m) if m == "type cannot be null"));
    }

    #[test]
    fn date_format() {
        let rules = transaction_rules();
        assert!(RequestValidator::validate_partial(&body(&[("transaction_date", json!("yesterday"))]), &rules).is_err());
        RequestValidator::validate_partial(&body(&[("transaction_date", json!("2024-02-29"))]), &rules).unwrap();
    }
}
