use actix_web::{HttpResponse, web};
use std::collections::HashMap;

use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::notification::{self, Scope};

fn scope_from_query<'a>(query: &'a HashMap<String, String>) -> Result<Scope<'a>, AppError> {
    let scope = Scope {
        user_id: query.get("user_id").and_then(|v| v.parse().ok()),
        department: query.get("department").map(|s| s.as_str()),
    };
    if scope.user_id.is_none() && scope.department.is_none() {
        return Err(AppError::Validation(
            "user_id or department query parameter required".to_string(),
        ));
    }
    Ok(scope)
}

/// GET /api/notifications?user_id=&department=&page=&per_page=
pub async fn list(
    pool: web::Data<DbPool>,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    let scope = scope_from_query(&query)?;
    let page = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let per_page = query.get("per_page").and_then(|p| p.parse().ok()).unwrap_or(25);

    let conn = pool.get()?;
    let items = notification::list_for_scope(&conn, scope, page, per_page)?;
    Ok(HttpResponse::Ok().json(items))
}

/// GET /api/notifications/unread-count?user_id=&department=
pub async fn unread_count(
    pool: web::Data<DbPool>,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    let scope = scope_from_query(&query)?;
    let conn = pool.get()?;
    let count = notification::unread_count(&conn, scope)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "unread": count })))
}

/// POST /api/notifications/{id}/read
pub async fn mark_read(
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let conn = pool.get()?;
    notification::mark_read(&conn, path.into_inner())?;
    Ok(HttpResponse::NoContent().finish())
}

/// POST /api/notifications/read-all?user_id=&department=
pub async fn mark_all_read(
    pool: web::Data<DbPool>,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    let scope = scope_from_query(&query)?;
    let conn = pool.get()?;
    let updated = notification::mark_all_read(&conn, scope)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "marked_read": updated })))
}
