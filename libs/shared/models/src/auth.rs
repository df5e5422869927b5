use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Claims of a session token issued by the hosted auth service. Only the
/// ones the admin console relies on are read.
#[derive(Debug, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub exp: Option<i64>,
    pub iat: Option<i64>,
    pub email: Option<String>,
    pub role: Option<String>,
}

/// Staff member signed in to the admin console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub role: Option<String>,
    pub signed_in_at: Option<DateTime<Utc>>,
}

impl User {
    /// Name used in audit log lines.
    pub fn display_name(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.id)
    }
}
