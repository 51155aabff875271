use crate::AppState;
use crate::api::error::{AppError, FieldError};
use crate::entities::{prelude::*, upload_records};
use crate::utils::validation::{
    is_valid_cid, is_valid_transaction_hash, is_valid_wallet_address,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

const DEFAULT_PAGE_LIMIT: u64 = 10;

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUploadRequest {
    pub cid: Option<String>,
    pub file_name: Option<String>,
    pub file_size: Option<i64>,
    pub file_type: Option<String>,
    pub wallet_address: Option<String>,
    pub transaction_hash: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct CreateUploadResponse {
    pub success: bool,
    pub message: String,
    pub upload: upload_records::Model,
}

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    pub success: bool,
    pub upload: upload_records::Model,
}

#[derive(Deserialize, ToSchema, Validate)]
pub struct PageQuery {
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<u64>,
    pub skip: Option<u64>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: u64,
    pub limit: u64,
    pub skip: u64,
    pub has_more: bool,
}

#[derive(Serialize, ToSchema)]
pub struct ListUploadsResponse {
    pub success: bool,
    pub uploads: Vec<upload_records::Model>,
    pub pagination: Pagination,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Shape checks for the create payload; every violation is collected so the
/// client sees the full list at once. Fields are reported under their wire
/// (camelCase) names.
fn validate_create(req: &CreateUploadRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();

    match req.cid.as_deref().map(str::trim) {
        None | Some("") => errors.push(FieldError::new("cid", "CID is required")),
        Some(cid) if !is_valid_cid(cid) => errors.push(FieldError::new(
            "cid",
            format!("{} is not a valid IPFS CID (CIDv0 or CIDv1)", cid),
        )),
        Some(_) => {}
    }

    if let Some(address) = req.wallet_address.as_deref().map(str::trim)
        && !address.is_empty()
        && !is_valid_wallet_address(address)
    {
        errors.push(FieldError::new(
            "walletAddress",
            "Wallet address must be 0x followed by 40 hex characters",
        ));
    }

    if let Some(hash) = req.transaction_hash.as_deref().map(str::trim)
        && !hash.is_empty()
        && !is_valid_transaction_hash(hash)
    {
        errors.push(FieldError::new(
            "transactionHash",
            "Transaction hash must be 0x followed by 64 hex characters",
        ));
    }

    if req.file_size.is_some_and(|size| size < 0) {
        errors.push(FieldError::new(
            "fileSize",
            "File size must be a positive number",
        ));
    }

    errors
}

#[utoipa::path(
    post,
    path = "/api/upload",
    request_body = CreateUploadRequest,
    responses(
        (status = 201, description = "Record created", body = CreateUploadResponse),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "CID already exists")
    ),
    tag = "uploads"
)]
pub async fn create_upload(
    State(state): State<AppState>,
    Json(req): Json<CreateUploadRequest>,
) -> Result<(StatusCode, Json<CreateUploadResponse>), AppError> {
    let errors = validate_create(&req);
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let now = Utc::now();
    let record = upload_records::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        cid: Set(req.cid.as_deref().unwrap_or_default().trim().to_string()),
        file_name: Set(non_empty(req.file_name)),
        file_size: Set(req.file_size),
        file_type: Set(non_empty(req.file_type)),
        wallet_address: Set(non_empty(req.wallet_address).map(|a| a.to_lowercase())),
        transaction_hash: Set(non_empty(req.transaction_hash)),
        created_at: Set(now),
        updated_at: Set(now),
    };

    // The unique index is the arbiter; concurrent inserts of the same CID
    // race at the database, never in application code
    let stored = match record.insert(&state.db).await {
        Ok(model) => model,
        Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
            return Err(AppError::Duplicate("CID already exists".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(cid = %stored.cid, "upload record created");

    Ok((
        StatusCode::CREATED,
        Json(CreateUploadResponse {
            success: true,
            message: "Upload record created successfully".to_string(),
            upload: stored,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/upload/cid/{cid}",
    params(
        ("cid" = String, Path, description = "Content identifier")
    ),
    responses(
        (status = 200, description = "Record found", body = UploadResponse),
        (status = 404, description = "No record for this CID")
    ),
    tag = "uploads"
)]
pub async fn get_by_cid(
    State(state): State<AppState>,
    Path(cid): Path<String>,
) -> Result<Json<UploadResponse>, AppError> {
    let record = UploadRecords::find()
        .filter(upload_records::Column::Cid.eq(cid.trim()))
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Upload not found".to_string()))?;

    Ok(Json(UploadResponse {
        success: true,
        upload: record,
    }))
}

async fn paginate(
    db: &DatabaseConnection,
    wallet_address: Option<String>,
    query: PageQuery,
) -> Result<ListUploadsResponse, AppError> {
    query.validate()?;
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    let skip = query.skip.unwrap_or(0);

    let mut select = UploadRecords::find();
    if let Some(address) = wallet_address {
        select = select.filter(upload_records::Column::WalletAddress.eq(address));
    }

    let total = select.clone().count(db).await?;
    let uploads = select
        .order_by_desc(upload_records::Column::CreatedAt)
        .limit(limit)
        .offset(skip)
        .all(db)
        .await?;

    let has_more = skip + (uploads.len() as u64) < total;

    Ok(ListUploadsResponse {
        success: true,
        uploads,
        pagination: Pagination {
            total,
            limit,
            skip,
            has_more,
        },
    })
}

#[utoipa::path(
    get,
    path = "/api/upload/wallet/{address}",
    params(
        ("address" = String, Path, description = "Wallet address, case-insensitive"),
        ("limit" = Option<u64>, Query, description = "Page size, 1-100"),
        ("skip" = Option<u64>, Query, description = "Records to skip")
    ),
    responses(
        (status = 200, description = "Records for this wallet", body = ListUploadsResponse),
        (status = 400, description = "Invalid pagination")
    ),
    tag = "uploads"
)]
pub async fn list_by_wallet(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ListUploadsResponse>, AppError> {
    let address = address.trim().to_lowercase();
    let page = paginate(&state.db, Some(address), query).await?;
    Ok(Json(page))
}

#[utoipa::path(
    get,
    path = "/api/upload",
    params(
        ("limit" = Option<u64>, Query, description = "Page size, 1-100"),
        ("skip" = Option<u64>, Query, description = "Records to skip")
    ),
    responses(
        (status = 200, description = "All records, newest first", body = ListUploadsResponse),
        (status = 400, description = "Invalid pagination")
    ),
    tag = "uploads"
)]
pub async fn list_uploads(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ListUploadsResponse>, AppError> {
    let page = paginate(&state.db, None, query).await?;
    Ok(Json(page))
}
