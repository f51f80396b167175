/// Team endpoints
///
/// Every member can see the roster. Only leads add members, change roles or
/// account status, and remove members. Nobody can remove their own account.
///
/// # Endpoints
///
/// - `GET /team` - List members with their role
/// - `POST /team` - Add a member (lead)
/// - `PATCH /team?userId=<uuid>&action=role` - Body `{"role": "lead" | "non_lead"}` (lead)
/// - `PATCH /team?userId=<uuid>&action=status` - Body `{"status": "active" | "inactive"}` (lead)
/// - `DELETE /team?userId=<uuid>` - Remove a member (lead)
///
/// `id` is accepted as an alias for `userId`.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{Data, Deleted},
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use opsdesk_shared::{
    auth::{
        identity::Caller,
        password,
        policy::{authorize, forbid_self_deletion, Operation, Resource},
    },
    models::{
        role::Role,
        user::{CreateUser, TeamMember, User, UserStatus},
    },
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

/// Add-member request
#[derive(Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct CreateMemberRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Checked against the password length bounds
    pub password: String,

    #[validate(length(max = 255, message = "full_name must be at most 255 characters"))]
    pub full_name: Option<String>,

    /// Defaults to `non_lead`
    pub role: Option<Role>,
}

/// `?userId=&action=` on PATCH and DELETE
#[derive(Debug, Default, Deserialize)]
pub struct TeamQuery {
    #[serde(rename = "userId", alias = "id")]
    pub user_id: Option<Uuid>,

    pub action: Option<String>,
}

impl TeamQuery {
    fn require_user_id(&self) -> Result<Uuid, ApiError> {
        self.user_id
            .ok_or_else(|| ApiError::BadRequest("userId query parameter is required".to_string()))
    }
}

/// What a PATCH changes, selected by `action`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamAction {
    Role,
    Status,
}

impl TeamAction {
    pub fn parse(action: Option<&str>) -> Result<Self, ApiError> {
        match action {
            Some("role") => Ok(TeamAction::Role),
            Some("status") => Ok(TeamAction::Status),
            Some(other) => Err(ApiError::BadRequest(format!(
                "Unknown action '{}': expected 'role' or 'status'",
                other
            ))),
            None => Err(ApiError::BadRequest(
                "action query parameter is required".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoleChange {
    pub role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatusChange {
    pub status: UserStatus,
}

fn parse_body<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::invalid_field("body", e.to_string()))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(_caller): Extension<Caller>,
) -> ApiResult<Json<Data<Vec<TeamMember>>>> {
    let members = TeamMember::list(&state.db).await?;
    Ok(Json(Data::new(members)))
}

/// Add a member
///
/// ```text
/// POST /team
///
/// {
///   "email": "sam@example.com",
///   "password": "hunter22",
///   "full_name": "Sam Rivera",
///   "role": "non_lead"
/// }
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not a lead
/// - `400 Bad Request`: Invalid email or password length
/// - `409 Conflict`: Email already exists (case-insensitive)
pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    payload: Result<Json<CreateMemberRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Data<TeamMember>>)> {
    authorize(Resource::Team, &caller, Operation::Create, None)?;

    let Json(req) = payload?;
    req.validate()?;
    password::validate_password_length(&req.password)
        .map_err(|msg| ApiError::invalid_field("password", msg))?;

    // Argon2 is CPU-bound; keep it off the async workers
    let plain = req.password;
    let password_hash =
        tokio::task::spawn_blocking(move || password::hash_password(&plain)).await??;

    let role = req.role.unwrap_or_default();
    let member = TeamMember::create(
        &state.db,
        CreateUser {
            email: req.email,
            password_hash,
            full_name: req.full_name,
        },
        role,
    )
    .await?;

    info!(member_id = %member.id, role = %member.role, by = %caller.user_id, "Team member added");
    Ok((StatusCode::CREATED, Json(Data::new(member))))
}

/// Change a member's role or status
///
/// Role and status take effect on the member's next request; tokens already
/// issued stay valid but resolve to the new role, and an inactive member is
/// refused.
pub async fn update(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<TeamQuery>, QueryRejection>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> ApiResult<Json<Data<TeamMember>>> {
    let Query(query) = query?;
    let user_id = query.require_user_id()?;
    let action = TeamAction::parse(query.action.as_deref())?;

    authorize(Resource::Team, &caller, Operation::Update, None)?;

    let Json(body) = payload?;

    let member = match action {
        TeamAction::Role => {
            let change: RoleChange = parse_body(body)?;
            TeamMember::set_role(&state.db, user_id, change.role).await?
        }
        TeamAction::Status => {
            let change: StatusChange = parse_body(body)?;
            TeamMember::set_status(&state.db, user_id, change.status).await?
        }
    }
    .ok_or_else(|| ApiError::NotFound("Team member not found".to_string()))?;

    info!(
        member_id = %member.id,
        role = %member.role,
        status = ?member.status,
        by = %caller.user_id,
        "Team member updated"
    );
    Ok(Json(Data::new(member)))
}

/// Remove a member
///
/// Self-removal is refused with 400 before the role check, so it fails the
/// same way for leads and non-leads.
pub async fn delete(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    query: Result<Query<TeamQuery>, QueryRejection>,
) -> ApiResult<Json<Deleted>> {
    let Query(query) = query?;
    let user_id = query.require_user_id()?;

    forbid_self_deletion(&caller, user_id)?;
    authorize(Resource::Team, &caller, Operation::Delete, None)?;

    if !User::delete(&state.db, user_id).await? {
        return Err(ApiError::NotFound("Team member not found".to_string()));
    }

    info!(member_id = %user_id, by = %caller.user_id, "Team member removed");
    Ok(Json(Deleted::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_action_parse() {
        assert_eq!(TeamAction::parse(Some("role")).unwrap(), TeamAction::Role);
        assert_eq!(TeamAction::parse(Some("status")).unwrap(), TeamAction::Status);
        assert!(matches!(TeamAction::parse(Some("promote")), Err(ApiError::BadRequest(_))));
        assert!(matches!(TeamAction::parse(None), Err(ApiError::BadRequest(_))));
    }

    #[test]
    fn test_team_query_accepts_id_alias() {
        let id = Uuid::new_v4();

        let query: TeamQuery =
            serde_json::from_value(serde_json::json!({ "userId": id, "action": "role" })).unwrap();
        assert_eq!(query.user_id, Some(id));

        let query: TeamQuery = serde_json::from_value(serde_json::json!({ "id": id })).unwrap();
        assert_eq!(query.require_user_id().unwrap(), id);

        assert!(TeamQuery::default().require_user_id().is_err());
    }

    #[test]
    fn test_change_bodies() {
        let change: RoleChange = parse_body(serde_json::json!({ "role": "lead" })).unwrap();
        assert_eq!(change.role, Role::Lead);

        let change: StatusChange = parse_body(serde_json::json!({ "status": "inactive" })).unwrap();
        assert_eq!(change.status, UserStatus::Inactive);

        assert!(parse_body::<RoleChange>(serde_json::json!({ "role": "admin" })).is_err());
        assert!(parse_body::<StatusChange>(serde_json::json!({})).is_err());
    }

    #[test]
    fn test_create_member_validation() {
        let req: CreateMemberRequest = serde_json::from_value(serde_json::json!({
            "email": "not-an-email",
            "password": "secret1"
        }))
        .unwrap();
        assert!(req.validate().is_err());

        let req: CreateMemberRequest = serde_json::from_value(serde_json::json!({
            "email": "sam@example.com",
            "password": "secret1",
            "role": "lead"
        }))
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.role, Some(Role::Lead));
    }
}
