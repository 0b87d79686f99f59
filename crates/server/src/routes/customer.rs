//! Customer account handlers.
//!
//! Request DTOs are validated at this boundary before any service call;
//! a request that fails validation never reaches the repository.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tower_sessions::Session;
use uuid::Uuid;

use kram_core::{CustomerId, Email};

use crate::error::{AppError, Result};
use crate::middleware::{OptionalAuth, RequireAuth, clear_current_customer, set_current_customer};
use crate::models::{CurrentCustomer, Customer, ProfilePatch};
use crate::routes::views::{CustomerDetails, CustomerSummary, ResponseBody};
use crate::services::customers::{AddressInput, Registration};
use crate::state::AppState;

/// Registration request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl RegisterRequest {
    fn validate(self) -> Result<Registration> {
        let mut problems = Vec::new();
        if self.password.len() < 8 {
            problems.push("password must be at least 8 characters".to_owned());
        }

        match Email::parse(&self.email) {
            Ok(email) if problems.is_empty() => Ok(Registration {
                email,
                password: self.password,
                first_name: self.first_name,
                last_name: self.last_name,
            }),
            Ok(_) => Err(AppError::Validation(problems)),
            Err(e) => {
                problems.push(format!("email: {e}"));
                Err(AppError::Validation(problems))
            }
        }
    }
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Password-change request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Password-reset request body.
#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub email: String,
}

/// Shipping-address request body, shared by add and edit.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRequest {
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone_number: String,
    pub city: String,
    #[serde(default)]
    pub street_name: String,
    #[serde(default)]
    pub carrier_office: String,
    #[serde(default)]
    pub is_default: bool,
}

impl AddressRequest {
    fn validate(self) -> Result<AddressInput> {
        let mut problems = Vec::new();
        if self.first_name.trim().is_empty() {
            problems.push("firstName is required".to_owned());
        }
        if self.city.trim().is_empty() {
            problems.push("city is required".to_owned());
        }
        if !problems.is_empty() {
            return Err(AppError::Validation(problems));
        }

        Ok(AddressInput {
            first_name: self.first_name,
            last_name: self.last_name,
            phone_number: self.phone_number,
            city: self.city,
            street_name: self.street_name,
            carrier_office: self.carrier_office,
            is_default: self.is_default,
        })
    }
}

/// Profile-update request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

impl ProfileRequest {
    fn validate(self) -> Result<ProfilePatch> {
        let patch = ProfilePatch {
            first_name: self.first_name,
            last_name: self.last_name,
            phone_number: self.phone_number,
        };
        if patch.is_empty() {
            return Err(AppError::Validation(vec![
                "at least one profile field is required".to_owned(),
            ]));
        }
        Ok(patch)
    }
}

/// GET /customer - summary of the current customer, or null when
/// anonymous.
pub async fn current(
    State(state): State<AppState>,
    OptionalAuth(current): OptionalAuth,
) -> Result<impl IntoResponse> {
    let summary = match current {
        Some(current) => state
            .customers()
            .get_by_id(current.id)
            .await?
            .map(|c| CustomerSummary::from(&c)),
        None => None,
    };

    Ok(Json(ResponseBody { data: summary }))
}

/// GET /customer/details - full account view.
pub async fn details(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<impl IntoResponse> {
    let customer = load_customer(&state, current.id).await?;
    Ok(Json(ResponseBody {
        data: CustomerDetails::from(&customer),
    }))
}

/// POST /customer/register - create an account and open a session.
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse> {
    let input = body.validate()?;
    let customer = state.customer_service().register(input).await?;

    open_session(&session, &customer).await?;

    Ok((
        StatusCode::CREATED,
        Json(ResponseBody {
            data: CustomerSummary::from(&customer),
        }),
    ))
}

/// POST /customer/login - verify credentials and open a session.
///
/// The last-login stamp is spawned off so a slow or failing write never
/// delays or fails the login response.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let customer = state
        .auth_service()
        .login(&body.email, &body.password)
        .await?;

    let service = state.customer_service();
    let id = customer.id;
    tokio::spawn(async move {
        service.update_last_logged_in(id).await;
    });

    open_session(&session, &customer).await?;

    Ok(Json(ResponseBody {
        data: CustomerSummary::from(&customer),
    }))
}

/// POST /customer/logout - destroy the session.
pub async fn logout(
    RequireAuth(_current): RequireAuth,
    session: Session,
) -> Result<impl IntoResponse> {
    clear_current_customer(&session)
        .await
        .map_err(session_error)?;
    session.flush().await.map_err(session_error)?;

    Ok(Json(ResponseBody { data: true }))
}

/// POST /customer/password - change the password after re-verifying the
/// current one.
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse> {
    let customer = load_customer(&state, current.id).await?;
    state
        .auth_service()
        .verify_current_password(&customer, &body.current_password)?;

    let updated = state
        .customer_service()
        .update_password(current.id, &body.new_password)
        .await?;

    Ok(Json(ResponseBody {
        data: CustomerSummary::from(&updated),
    }))
}

/// POST /customer/reset - request a password-reset email.
///
/// Registered and unregistered emails get the same response shape.
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(body): Json<ResetRequest>,
) -> Result<impl IntoResponse> {
    let email = Email::parse(&body.email)
        .map_err(|e| AppError::Validation(vec![format!("email: {e}")]))?;

    state
        .customer_service()
        .reset_password_by_request(&email)
        .await?;

    Ok(Json(ResponseBody { data: true }))
}

/// POST /customer/send-confirm-email - issue and send a fresh
/// confirmation token.
pub async fn send_confirm_email(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
) -> Result<impl IntoResponse> {
    let customer = load_customer(&state, current.id).await?;
    state
        .customer_service()
        .send_email_confirmation(&customer)
        .await?;

    Ok(Json(ResponseBody { data: true }))
}

/// POST /customer/address - add a shipping address.
pub async fn add_address(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Json(body): Json<AddressRequest>,
) -> Result<impl IntoResponse> {
    let input = body.validate()?;
    let customer = load_customer(&state, current.id).await?;
    let updated = state
        .customer_service()
        .add_shipping_address(&customer, input)
        .await?;

    Ok(Json(ResponseBody {
        data: CustomerDetails::from(&updated),
    }))
}

/// PUT /customer/address/{id} - replace an existing shipping address.
pub async fn edit_address(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Path(address_id): Path<Uuid>,
    Json(body): Json<AddressRequest>,
) -> Result<impl IntoResponse> {
    let input = body.validate()?;
    let customer = load_customer(&state, current.id).await?;
    let updated = state
        .customer_service()
        .edit_shipping_address(&customer, address_id, input)
        .await?;

    Ok(Json(ResponseBody {
        data: CustomerDetails::from(&updated),
    }))
}

/// PATCH /customer - update profile fields.
pub async fn update_profile(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    Json(body): Json<ProfileRequest>,
) -> Result<impl IntoResponse> {
    let patch = body.validate()?;
    let updated = state
        .customer_service()
        .update_profile(current.id, patch)
        .await?;

    Ok(Json(ResponseBody {
        data: CustomerSummary::from(&updated),
    }))
}

async fn load_customer(state: &AppState, id: CustomerId) -> Result<Customer> {
    state
        .customers()
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("customer {id}")))
}

async fn open_session(session: &Session, customer: &Customer) -> Result<()> {
    let current = CurrentCustomer {
        id: customer.id,
        email: customer.email.clone(),
    };
    set_current_customer(session, &current)
        .await
        .map_err(session_error)
}

fn session_error(e: tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("session error: {e}"))
}
