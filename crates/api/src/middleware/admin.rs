//! Admin identity extractor.
//!
//! Authentication happens upstream (the dashboard's identity provider sits
//! in front of this service); the verified identity is forwarded in
//! `x-admin-*` headers and trusted here.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use islandboard_core::approval::Actor;
use islandboard_core::entry::ApprovalLevel;

use crate::error::AppError;
use crate::state::AppState;

pub const ADMIN_ID_HEADER: &str = "x-admin-id";
pub const ADMIN_EMAIL_HEADER: &str = "x-admin-email";
/// `island_admin` or `super_admin`.
pub const ADMIN_LEVEL_HEADER: &str = "x-admin-level";
/// Comma-separated island ids an island admin may act on.
pub const ADMIN_ISLANDS_HEADER: &str = "x-admin-islands";

/// The admin making the request.
///
/// Use this as an extractor parameter in any handler that changes
/// approval state:
///
/// ```ignore
/// async fn my_handler(admin: AdminUser) -> AppResult<Json<()>> {
///     tracing::info!(admin = %admin.email, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user_id: String,
    pub email: String,
    pub level: ApprovalLevel,
    pub islands: Vec<String>,
    /// First hop of `x-forwarded-for`, when present.
    pub ip_address: Option<String>,
}

impl AdminUser {
    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id.clone(),
            email: self.email.clone(),
            level: self.level,
            islands: self.islands.clone(),
            ip_address: self.ip_address.clone(),
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;

        let user_id = header(headers, ADMIN_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized(format!("Missing {ADMIN_ID_HEADER} header")))?;
        let email = header(headers, ADMIN_EMAIL_HEADER).ok_or_else(|| {
            AppError::Unauthorized(format!("Missing {ADMIN_EMAIL_HEADER} header"))
        })?;
        let level = match header(headers, ADMIN_LEVEL_HEADER) {
            Some(raw) => raw
                .parse()
                .map_err(|_| AppError::Unauthorized(format!("Invalid admin level '{raw}'")))?,
            None => ApprovalLevel::IslandAdmin,
        };
        let islands = header(headers, ADMIN_ISLANDS_HEADER)
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let ip_address = header(headers, "x-forwarded-for")
            .and_then(|raw| raw.split(',').next())
            .map(|ip| ip.trim().to_string());

        Ok(AdminUser {
            user_id: user_id.to_string(),
            email: email.to_string(),
            level,
            islands,
            ip_address,
        })
    }
}
