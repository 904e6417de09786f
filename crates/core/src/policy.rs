//! Policy document vocabulary.

use crate::types::Date;

define_text_enum! {
    PolicyDocumentType {
        PolicyMemorandum => "policy_memorandum",
        ExecutiveOrder => "executive_order",
        Ordinance => "ordinance",
        Resolution => "resolution",
        Guideline => "guideline",
        Procedure => "procedure",
        Standard => "standard",
    }
}

define_text_enum! {
    PolicyCategory {
        Infrastructure => "infrastructure",
        Health => "health",
        Education => "education",
        Agriculture => "agriculture",
        Social => "social",
        Environment => "environment",
        Transportation => "transportation",
        General => "general",
    }
}

define_text_enum! {
    PolicyStatus {
        Draft => "draft",
        Published => "published",
        Archived => "archived",
        Expired => "expired",
    }
}

impl PolicyStatus {
    /// Drafts and archived policies may be (re)published.
    pub fn can_publish(self) -> bool {
        matches!(self, PolicyStatus::Draft | PolicyStatus::Archived)
    }
}

pub fn validate_policy_dates(effective: Option<Date>, expiry: Option<Date>) -> Result<(), String> {
    if let (Some(effective), Some(expiry)) = (effective, expiry) {
        if expiry <= effective {
            return Err("Expiry date must be after the effective date".to_string());
        }
    }
    Ok(())
}
