use super::{customer_resource, load_customer, own_customer_id, target_seller};
use crate::dtos::customers::{
    CreateBranchRequest, CreateCustomerRequest, CustomerListParams, CustomerResponse,
    UpdateCustomerRequest,
};
use crate::ledger::order_ledger::is_outstanding;
use crate::models::{Customer, Role, User};
use crate::policy::{Action, Principal};
use crate::services::password::hash_password;
use crate::services::store::{CustomerFilter, OrderFilter};
use crate::startup::AppState;
use crate::utils::validation::{QueryParams, ValidatedJson};
use axum::extract::{Path, State};
use chrono::Utc;
use secrecy::Secret;
use service_core::error::AppError;
use service_core::response::ApiResponse;
use uuid::Uuid;

/// GET /api/customers
pub async fn list_customers(
    State(state): State<AppState>,
    principal: Principal,
    QueryParams(params): QueryParams<CustomerListParams>,
) -> Result<ApiResponse<Vec<CustomerResponse>>, AppError> {
    if principal.role == Role::Customer {
        // A customer sees its own account and its branches.
        let own = load_customer(&state, own_customer_id(&principal)?).await?;
        let branches = state
            .store
            .list_customers(&CustomerFilter {
                seller_id: Some(own.seller_id.clone()),
                parent_customer_id: Some(own.id.clone()),
            })
            .await?;
        let customers = std::iter::once(own).chain(branches).map(Into::into).collect();
        return Ok(ApiResponse::ok(customers));
    }

    let seller_id = match principal.seller_scope() {
        Some(own) => Some(own.to_string()),
        None => params.seller_id,
    };
    let customers = state
        .store
        .list_customers(&CustomerFilter {
            seller_id,
            parent_customer_id: params.parent_id,
        })
        .await?;

    Ok(ApiResponse::ok(customers.into_iter().map(Into::into).collect()))
}

/// Create a customer, optionally with its own login.
///
/// POST /api/customers
pub async fn create_customer(
    State(state): State<AppState>,
    principal: Principal,
    ValidatedJson(req): ValidatedJson<CreateCustomerRequest>,
) -> Result<ApiResponse<CustomerResponse>, AppError> {
    principal.require_role(&[Role::Seller, Role::Admin])?;
    let seller_id = target_seller(&principal, req.seller_id)?;

    let now = Utc::now();
    let mut customer = Customer {
        id: Uuid::new_v4().to_string(),
        seller_id,
        business_name: req.business_name.trim().to_string(),
        contact_name: req.contact_name,
        email: req.email,
        phone: req.phone,
        address: req.address,
        vat_number: req.vat_number,
        prices: req.prices.unwrap_or_default(),
        parent_customer_id: None,
        user_id: None,
        payment_terms_days: req.payment_terms_days,
        created_at: now,
        updated_at: now,
    };

    if let Some(login) = req.login {
        let password_hash = hash_password(&Secret::new(login.password))?;
        let user = User::new_customer(
            login.email,
            password_hash,
            customer.seller_id.clone(),
            customer.id.clone(),
        );
        state.store.insert_user(&user).await?;
        customer.user_id = Some(user.id);
    }

    state.store.insert_customer(&customer).await?;
    tracing::info!(
        customer_id = %customer.id,
        seller_id = %customer.seller_id,
        has_login = customer.user_id.is_some(),
        "Customer created"
    );

    Ok(ApiResponse::created(customer.into()))
}

/// The caller's own customer account.
///
/// GET /api/customers/me
pub async fn my_customer(
    State(state): State<AppState>,
    principal: Principal,
) -> Result<ApiResponse<CustomerResponse>, AppError> {
    principal.require_role(&[Role::Customer])?;
    let customer = load_customer(&state, own_customer_id(&principal)?).await?;
    Ok(ApiResponse::ok(customer.into()))
}

/// GET /api/customers/{id}
pub async fn get_customer(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<ApiResponse<CustomerResponse>, AppError> {
    let customer = load_customer(&state, &id).await?;
    principal.require(customer_resource(&customer), Action::Read)?;
    Ok(ApiResponse::ok(customer.into()))
}

/// PUT /api/customers/{id}
pub async fn update_customer(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateCustomerRequest>,
) -> Result<ApiResponse<CustomerResponse>, AppError> {
    let mut customer = load_customer(&state, &id).await?;
    principal.require(customer_resource(&customer), Action::Update)?;

    if let Some(name) = req.business_name {
        customer.business_name = name.trim().to_string();
    }
    if req.contact_name.is_some() {
        customer.contact_name = req.contact_name;
    }
    if req.email.is_some() {
        customer.email = req.email;
    }
    if req.phone.is_some() {
        customer.phone = req.phone;
    }
    if req.address.is_some() {
        customer.address = req.address;
    }
    if req.vat_number.is_some() {
        customer.vat_number = req.vat_number;
    }
    if let Some(prices) = req.prices {
        customer.prices = prices;
    }
    if req.payment_terms_days.is_some() {
        customer.payment_terms_days = req.payment_terms_days;
    }
    customer.updated_at = Utc::now();

    state.store.update_customer(&customer).await?;
    tracing::info!(customer_id = %customer.id, "Customer updated");

    Ok(ApiResponse::ok(customer.into()))
}

/// Refused while the customer still has branches or owes money.
///
/// DELETE /api/customers/{id}
pub async fn delete_customer(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let customer = load_customer(&state, &id).await?;
    principal.require(customer_resource(&customer), Action::Delete)?;

    let branches = state
        .store
        .list_customers(&CustomerFilter {
            seller_id: Some(customer.seller_id.clone()),
            parent_customer_id: Some(customer.id.clone()),
        })
        .await?;
    if !branches.is_empty() {
        return Err(AppError::conflict(format!(
            "Customer has {} branch account(s); delete them first",
            branches.len()
        )));
    }

    let orders = state
        .store
        .list_orders(&OrderFilter {
            customer_id: Some(customer.id.clone()),
            ..Default::default()
        })
        .await?;
    if orders.iter().any(is_outstanding) {
        return Err(AppError::conflict("Customer has an open balance"));
    }

    state.store.delete_customer(&customer.id).await?;
    tracing::info!(customer_id = %customer.id, deleted_by = %principal.user_id, "Customer deleted");

    Ok(ApiResponse::ok(serde_json::json!({ "deleted": true })))
}

/// GET /api/customers/{id}/branches
pub async fn list_branches(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<ApiResponse<Vec<CustomerResponse>>, AppError> {
    let parent = load_customer(&state, &id).await?;
    principal.require(customer_resource(&parent), Action::Read)?;

    let branches = state
        .store
        .list_customers(&CustomerFilter {
            seller_id: Some(parent.seller_id.clone()),
            parent_customer_id: Some(parent.id.clone()),
        })
        .await?;

    Ok(ApiResponse::ok(branches.into_iter().map(Into::into).collect()))
}

/// Branches hang directly off a top-level account.
///
/// POST /api/customers/{id}/branches
pub async fn create_branch(
    State(state): State<AppState>,
    principal: Principal,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<CreateBranchRequest>,
) -> Result<ApiResponse<CustomerResponse>, AppError> {
    let parent = load_customer(&state, &id).await?;
    principal.require(customer_resource(&parent), Action::Update)?;
    if parent.is_branch() {
        return Err(AppError::bad_request("A branch cannot have branches of its own"));
    }

    let now = Utc::now();
    let branch = Customer {
        id: Uuid::new_v4().to_string(),
        seller_id: parent.seller_id.clone(),
        business_name: req.business_name.trim().to_string(),
        contact_name: req.contact_name,
        email: None,
        phone: req.phone,
        address: req.address,
        vat_number: parent.vat_number.clone(),
        prices: req.prices.unwrap_or_default(),
        parent_customer_id: Some(parent.id.clone()),
        user_id: None,
        payment_terms_days: parent.payment_terms_days,
        created_at: now,
        updated_at: now,
    };

    state.store.insert_customer(&branch).await?;
    tracing::info!(customer_id = %branch.id, parent_id = %parent.id, "Branch created");

    Ok(ApiResponse::created(branch.into()))
}
