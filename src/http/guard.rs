use crate::error::Error;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::HeaderMap;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    Admin,
    ProjectCoordinator,
    Faculty,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "project_coordinator" => Some(Role::ProjectCoordinator),
            "faculty" => Some(Role::Faculty),
            _ => None,
        }
    }
}

pub const ADMIN: &[Role] = &[Role::Admin];
pub const PANEL_MANAGERS: &[Role] = &[Role::Admin, Role::ProjectCoordinator];
pub const COORDINATOR: &[Role] = &[Role::ProjectCoordinator];
pub const FACULTY: &[Role] = &[Role::Faculty, Role::ProjectCoordinator];

/// Caller identity as established by the authentication proxy.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub employee_id: String,
    pub role: Role,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl CurrentUser {
    fn from_headers(headers: &HeaderMap) -> Result<Self, Error> {
        let (Some(employee_id), Some(role)) = (header(headers, USER_ID_HEADER), header(headers, USER_ROLE_HEADER))
        else {
            return Err(Error::Unauthorized);
        };
        let role = Role::parse(role).ok_or_else(|| Error::Forbidden("Access denied.".into()))?;
        Ok(Self {
            employee_id: employee_id.to_owned(),
            role,
        })
    }
}

/// Reject callers whose role is not in `roles`, and make the caller
/// available to handlers as a [`CurrentUser`].
pub async fn require_roles(
    State(roles): State<&'static [Role]>,
    mut request: Request,
    next: Next,
) -> Result<Response, Error> {
    let user = CurrentUser::from_headers(request.headers())?;
    if !roles.contains(&user.role) {
        debug!(employee_id = %user.employee_id, role = ?user.role, path = %request.uri().path(), "access denied");
        return Err(Error::Forbidden("Access denied.".into()));
    }
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(Error::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_identity_from_headers() {
        let mut headers = HeaderMap::new();
        assert!(matches!(
            CurrentUser::from_headers(&headers),
            Err(Error::Unauthorized)
        ));
        headers.insert(USER_ID_HEADER, HeaderValue::from_static(" F001 "));
        headers.insert(USER_ROLE_HEADER, HeaderValue::from_static("faculty"));
        let user = CurrentUser::from_headers(&headers).unwrap();
        assert_eq!(user.employee_id, "F001");
        assert_eq!(user.role, Role::Faculty);
        headers.insert(USER_ROLE_HEADER, HeaderValue::from_static("student"));
        assert!(matches!(
            CurrentUser::from_headers(&headers),
            Err(Error::Forbidden(_))
        ));
    }
}
