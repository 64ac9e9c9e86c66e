use lazy_static::lazy_static;
use regex::Regex;

use super::repo_types::Plan;
use crate::error::ApiError;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// An absent or blank plan means the free tier.
pub(crate) fn requested_plan(plan: Option<&str>) -> Result<Plan, ApiError> {
    match plan.map(str::trim).filter(|p| !p.is_empty()) {
        None => Ok(Plan::default()),
        Some(p) => p
            .parse()
            .map_err(|_| ApiError::Validation("Invalid plan".into())),
    }
}
