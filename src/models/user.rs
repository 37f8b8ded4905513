//! Member (user) model, roles and authentication claims

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::AppError;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Doctor,
    Student,
    Nurse,
    Pharmacy,
    Laboratory,
    General,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Student => "student",
            Role::Nurse => "nurse",
            Role::Pharmacy => "pharmacy",
            Role::Laboratory => "laboratory",
            Role::General => "general",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "doctor" => Ok(Role::Doctor),
            "student" => Ok(Role::Student),
            "nurse" => Ok(Role::Nurse),
            "pharmacy" => Ok(Role::Pharmacy),
            "laboratory" => Ok(Role::Laboratory),
            "general" => Ok(Role::General),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

text_column!(Role);

/// Library membership status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum MembershipStatus {
    Active,
    Inactive,
    Suspended,
    Expired,
}

impl MembershipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MembershipStatus::Active => "ACTIVE",
            MembershipStatus::Inactive => "INACTIVE",
            MembershipStatus::Suspended => "SUSPENDED",
            MembershipStatus::Expired => "EXPIRED",
        }
    }
}

impl std::str::FromStr for MembershipStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Ok(MembershipStatus::Active),
            "INACTIVE" => Ok(MembershipStatus::Inactive),
            "SUSPENDED" => Ok(MembershipStatus::Suspended),
            "EXPIRED" => Ok(MembershipStatus::Expired),
            _ => Err(format!("Invalid membership status: {}", s)),
        }
    }
}

text_column!(MembershipStatus);

/// Member as seen by the reservation workflow
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Member {
    pub id: i32,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub membership_status: MembershipStatus,
    pub reservation_limit: i32,
    /// Running total of fines posted to this member
    #[schema(value_type = String)]
    pub fines: Decimal,
}

impl Member {
    pub fn may_reserve(&self) -> bool {
        self.membership_status == MembershipStatus::Active
    }
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Sign the claims into a JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }
}
