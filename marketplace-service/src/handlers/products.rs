use super::{load_customer, load_product, own_customer_id, target_seller};
use crate::dtos::products::{CreateProductRequest, ProductResponse, UpdateProductRequest};
use crate::models::{Customer, Product, Role};
use crate::policy::{Action, Principal, Resource};
use crate::pricing::resolve_unit_price;
use crate::services::store::ProductFilter;
use crate::startup::AppState;
use crate::utils::validation::{QueryParams, ValidatedJson};
use axum::extract::{Path, State};
use chrono::Utc;
use serde::Deserialize;
use service_core::error::AppError;
use service_core::response::ApiResponse;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductListParams {
    pub seller_id: Option<String>,
}

fn product_resource(product: &Product) -> Resource<'_> {
    Resource::Product {
        seller_id: &product.seller_id,
    }
}

/// The customer account, and its parent for branches, that prices resolve
/// against.
async fn pricing_accounts(
    state: &AppState,
    principal: &Principal,
) -> Result<(Customer, Option<Customer>), AppError> {
    let customer = load_customer(state, own_customer_id(principal)?).await?;
    let parent = match &customer.parent_customer_id {
        Some(parent_id) => state.store.get_customer(parent_id).await?,
        None => None,
    };
    Ok((customer, parent))
}

/// Customers see their seller's active catalogue at their own prices.
///
/// GET /api/products
pub async fn list_products(
    State(state): State<AppState>,
    principal: Principal,
    QueryParams(params): QueryParams<ProductListParams>,
) -> Result<ApiResponse<Vec<ProductResponse>>, AppError> {
    if principal.role == Role::Customer {
        let (customer, parent) = pricing_accounts(&state, &principal).await?;
        let products = state
            .store
            .list_products(&ProductFilter {
                seller_id: Some(customer.seller_id.clone()),
                active_only: true,
            })
            .await?;
        let priced = products
            .into_iter()
            .map(|p| {
                let price = resolve_unit_price(&p, &customer, parent.as_ref());
                ProductResponse::priced(p, price)
            })
            .collect();
        return Ok(ApiResponse::ok(priced));
    }

    let seller_id = match principal.seller_scope() {
        Some(own) => Some(own.to_string()),
        None => params.seller_id,
    };
    let products = state
        .store
        .list_products(&ProductFilter {
            seller_id,
            active_only: false,
        })
        .await?;

    Ok(ApiResponse::ok(products.into_iter().map(Into::into).collect()))
}

/// POST /api/products
pub async fn create_product(
    State(state): State<AppState>,
    principal: Principal,
    ValidatedJson(req): ValidatedJson<CreateProductRequest>,
) -> Result<ApiResponse<ProductResponse>, AppError> {
    principal.require_role(&[Role::Seller, Role::Admin])?;
    let seller_id = target_seller(&principal, req.seller_id)?;

    let now = Utc::now();
    let product = Product {
        id: Uuid::new_v4().to_string(),
        seller_id,
        name: req.name.trim().to_string(),
        sku: req.sku,
        unit: req.unit,
        price: crate::ledger::round_money(req.price),
        active: req.active.unwrap_or(true),
        created_at: now,
        updated_at: now,
    };

    state.store.insert_product(&product).await?;
    tracing::info!(product_id = %product.id, seller_id = %product.seller_id, "Product created");

    Ok(ApiResponse::created(product.into()))
}

/// GET /api/products/{id}
pub async fn get_product(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<ApiResponse<ProductResponse>, AppError> {
    let product = load_product(&state, &id).await?;
    principal.require(product_resource(&product), Action::Read)?;

    if principal.role == Role::Customer {
        if !product.active {
            return Err(AppError::not_found(format!("Product {} not found", id)));
        }
        let (customer, parent) = pricing_accounts(&state, &principal).await?;
        let price = resolve_unit_price(&product, &customer, parent.as_ref());
        return Ok(ApiResponse::ok(ProductResponse::priced(product, price)));
    }

    Ok(ApiResponse::ok(product.into()))
}

/// PUT /api/products/{id}
pub async fn update_product(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateProductRequest>,
) -> Result<ApiResponse<ProductResponse>, AppError> {
    let mut product = load_product(&state, &id).await?;
    principal.require(product_resource(&product), Action::Update)?;

    if let Some(name) = req.name {
        product.name = name.trim().to_string();
    }
    if req.sku.is_some() {
        product.sku = req.sku;
    }
    if req.unit.is_some() {
        product.unit = req.unit;
    }
    if let Some(price) = req.price {
        product.price = crate::ledger::round_money(price);
    }
    if let Some(active) = req.active {
        product.active = active;
    }
    product.updated_at = Utc::now();

    state.store.update_product(&product).await?;
    tracing::info!(product_id = %product.id, "Product updated");

    Ok(ApiResponse::ok(product.into()))
}

/// Existing orders keep their own copy of name and price.
///
/// DELETE /api/products/{id}
pub async fn delete_product(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let product = load_product(&state, &id).await?;
    principal.require(product_resource(&product), Action::Delete)?;

    state.store.delete_product(&product.id).await?;
    tracing::info!(product_id = %product.id, "Product deleted");

    Ok(ApiResponse::ok(serde_json::json!({ "deleted": true })))
}
