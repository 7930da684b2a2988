use actix_web::{HttpResponse, web};
use serde::Deserialize;
use std::collections::HashMap;

use crate::db::DbPool;
use crate::errors::AppError;
use crate::models::sequence;
use crate::models::stage;
use crate::models::status::NewOrderWorkflow;
use crate::workflow::{self, Actor};

fn parse_order_path(order_type: &str) -> Result<(), AppError> {
    workflow::sequence_type_for(order_type).map(|_| ())
}

#[derive(Deserialize)]
pub struct CreateStatusRequest {
    pub order_number: String,
    pub department: Option<String>,
    pub assigned_to_user: Option<i64>,
    pub priority_level: Option<String>,
}

/// POST /api/orders/{order_type}/{order_id}/workflow
/// Called once by the order-save collaborator when an order is persisted.
pub async fn create_status(
    pool: web::Data<DbPool>,
    path: web::Path<(String, i64)>,
    body: web::Json<CreateStatusRequest>,
) -> Result<HttpResponse, AppError> {
    let (order_type, order_id) = path.into_inner();
    parse_order_path(&order_type)?;

    let mut conn = pool.get()?;
    let status = workflow::create_status(
        &mut conn,
        &NewOrderWorkflow {
            order_id,
            order_type,
            order_number: body.order_number.clone(),
            department: body.department.clone(),
            assigned_to_user: body.assigned_to_user,
            priority_level: body.priority_level.clone(),
        },
    )?;
    Ok(HttpResponse::Created().json(status))
}

/// GET /api/orders/{order_type}/{order_id}/workflow
pub async fn get_status(
    pool: web::Data<DbPool>,
    path: web::Path<(String, i64)>,
) -> Result<HttpResponse, AppError> {
    let (order_type, order_id) = path.into_inner();
    parse_order_path(&order_type)?;

    let conn = pool.get()?;
    let status = workflow::status_for_order(&conn, order_id, &order_type)?;
    Ok(HttpResponse::Ok().json(status))
}

#[derive(Deserialize)]
pub struct AdvanceRequest {
    pub performed_by: String,
    pub department: Option<String>,
    pub notes: Option<String>,
}

/// POST /api/orders/{order_type}/{order_id}/workflow/advance
pub async fn advance(
    pool: web::Data<DbPool>,
    path: web::Path<(String, i64)>,
    body: web::Json<AdvanceRequest>,
) -> Result<HttpResponse, AppError> {
    let (order_type, order_id) = path.into_inner();
    parse_order_path(&order_type)?;

    let mut conn = pool.get()?;
    let status = workflow::advance(
        &mut conn,
        order_id,
        &order_type,
        Actor {
            username: &body.performed_by,
            department: body.department.as_deref(),
            notes: body.notes.as_deref(),
        },
    )?;
    Ok(HttpResponse::Ok().json(status))
}

#[derive(Deserialize)]
pub struct RejectRequest {
    pub performed_by: String,
    pub department: Option<String>,
    pub reason: String,
    pub notes: Option<String>,
}

/// POST /api/orders/{order_type}/{order_id}/workflow/reject
pub async fn reject(
    pool: web::Data<DbPool>,
    path: web::Path<(String, i64)>,
    body: web::Json<RejectRequest>,
) -> Result<HttpResponse, AppError> {
    let (order_type, order_id) = path.into_inner();
    parse_order_path(&order_type)?;

    let mut conn = pool.get()?;
    let status = workflow::reject(
        &mut conn,
        order_id,
        &order_type,
        Actor {
            username: &body.performed_by,
            department: body.department.as_deref(),
            notes: body.notes.as_deref(),
        },
        &body.reason,
    )?;
    Ok(HttpResponse::Ok().json(status))
}

/// GET /api/orders/{order_type}/{order_id}/workflow/history
pub async fn history(
    pool: web::Data<DbPool>,
    path: web::Path<(String, i64)>,
) -> Result<HttpResponse, AppError> {
    let (order_type, order_id) = path.into_inner();
    parse_order_path(&order_type)?;

    let conn = pool.get()?;
    let entries = workflow::history_for_order(&conn, order_id, &order_type)?;
    Ok(HttpResponse::Ok().json(entries))
}

/// GET /api/workflow/stages
pub async fn list_stages(pool: web::Data<DbPool>) -> Result<HttpResponse, AppError> {
    let conn = pool.get()?;
    let stages = stage::find_all_active(&conn)?;
    Ok(HttpResponse::Ok().json(stages))
}

/// GET /api/workflow/sequences
pub async fn list_sequences(pool: web::Data<DbPool>) -> Result<HttpResponse, AppError> {
    let conn = pool.get()?;
    let sequences = sequence::find_all_active(&conn)?;
    Ok(HttpResponse::Ok().json(sequences))
}

/// GET /api/workflow/stages/{stage_id}/orders?department=
pub async fn orders_by_stage(
    pool: web::Data<DbPool>,
    path: web::Path<i64>,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    let stage_id = path.into_inner();
    let conn = pool.get()?;
    let orders = workflow::orders_by_stage(&conn, stage_id, query.get("department").map(|s| s.as_str()))?;
    Ok(HttpResponse::Ok().json(orders))
}

/// GET /api/workflow/statistics?department=
pub async fn statistics(
    pool: web::Data<DbPool>,
    query: web::Query<HashMap<String, String>>,
) -> Result<HttpResponse, AppError> {
    let conn = pool.get()?;
    let stats = workflow::statistics(&conn, query.get("department").map(|s| s.as_str()))?;
    Ok(HttpResponse::Ok().json(stats))
}

/// POST /api/workflow/sweep — run the overdue sweep now (cron hook).
pub async fn sweep_overdue(pool: web::Data<DbPool>) -> Result<HttpResponse, AppError> {
    let conn = pool.get()?;
    let flagged = crate::workflow::overdue::sweep(&conn)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "flagged": flagged })))
}

/// GET /api/workflow/validate — publish-time configuration checks.
pub async fn validate(pool: web::Data<DbPool>) -> Result<HttpResponse, AppError> {
    let conn = pool.get()?;
    let findings = sequence::validate_all(&conn)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "valid": findings.is_empty(),
        "findings": findings,
    })))
}
