//! Member endpoints

use axum::{extract::State, http::StatusCode};

use super::{
    extract::{AppJson, AppPath, AppQuery},
    response::ApiResponse,
};
use crate::{
    error::AppResult,
    models::member::{CreateMember, Member, MemberQuery, ReplaceMember, UpdateMember},
    AppState,
};

/// List members
#[utoipa::path(
    get,
    path = "/members",
    tag = "members",
    params(MemberQuery),
    responses(
        (status = 200, description = "Members ordered by name", body = Vec<Member>)
    )
)]
pub async fn list_members(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<MemberQuery>,
) -> AppResult<ApiResponse<Vec<Member>>> {
    let members = state.services.members.list(&query).await?;
    Ok(ApiResponse::ok(members))
}

/// Get member by ID
#[utoipa::path(
    get,
    path = "/members/{id}",
    tag = "members",
    params(("id" = i32, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Member details", body = Member),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_member(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> AppResult<ApiResponse<Member>> {
    let member = state.services.members.get_by_id(id).await?;
    Ok(ApiResponse::ok(member))
}

/// Create a member
#[utoipa::path(
    post,
    path = "/members",
    tag = "members",
    request_body = CreateMember,
    responses(
        (status = 201, description = "Member created", body = Member),
        (status = 400, description = "Invalid input or duplicate email", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_member(
    State(state): State<AppState>,
    AppJson(data): AppJson<CreateMember>,
) -> AppResult<ApiResponse<Member>> {
    let member = state.services.members.create(&data).await?;
    Ok(ApiResponse::created(member))
}

/// Replace a member
#[utoipa::path(
    put,
    path = "/members/{id}",
    tag = "members",
    params(("id" = i32, Path, description = "Member ID")),
    request_body = ReplaceMember,
    responses(
        (status = 200, description = "Member updated", body = Member),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn replace_member(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(data): AppJson<ReplaceMember>,
) -> AppResult<ApiResponse<Member>> {
    let member = state.services.members.replace(id, data).await?;
    Ok(ApiResponse::ok(member))
}

/// Partially update a member
#[utoipa::path(
    patch,
    path = "/members/{id}",
    tag = "members",
    params(("id" = i32, Path, description = "Member ID")),
    request_body = UpdateMember,
    responses(
        (status = 200, description = "Member updated", body = Member),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_member(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
    AppJson(data): AppJson<UpdateMember>,
) -> AppResult<ApiResponse<Member>> {
    let member = state.services.members.update(id, &data).await?;
    Ok(ApiResponse::ok(member))
}

/// Delete a member
#[utoipa::path(
    delete,
    path = "/members/{id}",
    tag = "members",
    params(("id" = i32, Path, description = "Member ID")),
    responses(
        (status = 204, description = "Member deleted"),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Member has borrowings", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_member(
    State(state): State<AppState>,
    AppPath(id): AppPath<i32>,
) -> AppResult<StatusCode> {
    state.services.members.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
