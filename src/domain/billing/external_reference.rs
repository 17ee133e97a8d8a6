//! External reference correlating gateway payments to subscriptions.
//!
//! Set once at payment-preference creation as `"{userId}-{planId}"` and
//! echoed back by the gateway on every payment detail. Parsing failures
//! are permanent: a reference that does not parse today will not parse on
//! redelivery either, so callers skip instead of retrying.

use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{PlanId, UserId, ValidationError};

/// Parsed `external_reference` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalReference {
    pub user_id: UserId,
    pub plan_id: PlanId,
}

impl ExternalReference {
    pub fn new(user_id: UserId, plan_id: PlanId) -> Self {
        Self { user_id, plan_id }
    }
}

impl fmt::Display for ExternalReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.user_id, self.plan_id)
    }
}

impl FromStr for ExternalReference {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(ValidationError::empty_field("external_reference"));
        }

        let (user_part, plan_part) = s.split_once('-').ok_or_else(|| {
            ValidationError::invalid_format(
                "external_reference",
                "expected \"{userId}-{planId}\"",
            )
        })?;

        let user_id = user_part.parse::<UserId>().map_err(|_| {
            ValidationError::invalid_format("external_reference", "user id is not a positive number")
        })?;
        let plan_id = plan_part.parse::<PlanId>().map_err(|_| {
            ValidationError::invalid_format("external_reference", "plan id is not a positive number")
        })?;

        Ok(Self { user_id, plan_id })
    }
}
