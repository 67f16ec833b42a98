//! Member model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Library member
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Member {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub joined_date: Option<NaiveDate>,
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Create member request (also the body of a full `PUT`)
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateMember {
    #[validate(length(min = 1, max = 100, message = "First name must be between 1 and 100 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name must be between 1 and 100 characters"))]
    pub last_name: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[serde(default)]
    #[validate(length(max = 15, message = "Phone must be at most 15 characters"))]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    pub joined_date: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Partial update request (`PATCH`)
///
/// `joined_date` distinguishes an absent key (keep) from an explicit `null` (clear).
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateMember {
    #[validate(length(min = 1, max = 100, message = "First name must be between 1 and 100 characters"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Last name must be between 1 and 100 characters"))]
    pub last_name: Option<String>,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: Option<String>,
    #[validate(length(max = 15, message = "Phone must be at most 15 characters"))]
    pub phone: Option<String>,
    pub address: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>, format = Date)]
    pub joined_date: Option<Option<NaiveDate>>,
    pub is_active: Option<bool>,
}

/// Full update request (`PUT`)
///
/// Omitted optional fields keep their stored value.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ReplaceMember {
    #[validate(length(min = 1, max = 100, message = "First name must be between 1 and 100 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name must be between 1 and 100 characters"))]
    pub last_name: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(max = 15, message = "Phone must be at most 15 characters"))]
    pub phone: Option<String>,
    pub address: Option<String>,
    #[serde(default, with = "::serde_with::rust::double_option")]
    #[schema(value_type = Option<String>, format = Date)]
    pub joined_date: Option<Option<NaiveDate>>,
    pub is_active: Option<bool>,
}

impl From<ReplaceMember> for UpdateMember {
    fn from(data: ReplaceMember) -> Self {
        Self {
            first_name: Some(data.first_name),
            last_name: Some(data.last_name),
            email: Some(data.email),
            phone: data.phone,
            address: data.address,
            joined_date: data.joined_date,
            is_active: data.is_active,
        }
    }
}

/// Member list query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct MemberQuery {
    /// Terms matched against first name, last name and email
    pub search: Option<String>,
}

impl Member {
    /// Merge a partial update into this record
    pub fn apply(&mut self, patch: &UpdateMember) {
        if let Some(ref first_name) = patch.first_name {
            self.first_name = first_name.clone();
        }
        if let Some(ref last_name) = patch.last_name {
            self.last_name = last_name.clone();
        }
        if let Some(ref email) = patch.email {
            self.email = email.clone();
        }
        if let Some(ref phone) = patch.phone {
            self.phone = phone.clone();
        }
        if let Some(ref address) = patch.address {
            self.address = address.clone();
        }
        if let Some(joined_date) = patch.joined_date {
            self.joined_date = joined_date;
        }
        if let Some(is_active) = patch.is_active {
            self.is_active = is_active;
        }
    }
}
