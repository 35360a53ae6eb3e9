use crate::authenticate::{assign_client, ClientId, LoginPayload};
use crate::booker::{
    Confirmation, Dashboard, DraftView, FinishPayload, Navigation, ParkingApp, PaymentResult,
    QuoteRequest, SessionStatus,
};
use crate::draft::DraftForm;
use crate::error::FlowError;
use crate::payment::PaymentMethod;
use crate::pricing::Quote;
use crate::spots::ParkingSpot;
use aide::{
    axum::{
        routing::{get, post},
        ApiRouter,
    },
    openapi::{Info, OpenApi},
    redoc::Redoc,
};
use axum::{
    debug_handler,
    extract::{Json, State},
    middleware,
    response::IntoResponse,
    Extension, Router,
};
use std::sync::Arc;

type AppState = Arc<ParkingApp>;

pub const OPENAPI_PATH: &str = "/api/docs/openapi.json";

#[debug_handler]
async fn handle_login(
    State(app): State<AppState>,
    client: ClientId,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<Navigation>, FlowError> {
    app.login(&client, payload).await.map(Json)
}

async fn check_login(State(app): State<AppState>, client: ClientId) -> Json<SessionStatus> {
    Json(app.status(&client))
}

async fn handle_logout(State(app): State<AppState>, client: ClientId) -> Json<Navigation> {
    Json(app.logout(&client))
}

async fn handle_home(
    State(app): State<AppState>,
    client: ClientId,
) -> Result<Json<Dashboard>, FlowError> {
    app.home(&client).map(Json)
}

async fn handle_spots(
    State(app): State<AppState>,
    client: ClientId,
) -> Result<Json<Vec<ParkingSpot>>, FlowError> {
    app.spots(&client).map(|spots| Json(spots.to_vec()))
}

async fn handle_quote(Json(request): Json<QuoteRequest>) -> Result<Json<Quote>, FlowError> {
    ParkingApp::quote(&request).map(Json)
}

#[debug_handler]
async fn handle_register(
    State(app): State<AppState>,
    client: ClientId,
    Json(form): Json<DraftForm>,
) -> Result<Json<DraftView>, FlowError> {
    app.register(&client, form).map(Json)
}

async fn handle_summary(
    State(app): State<AppState>,
    client: ClientId,
) -> Result<Json<DraftView>, FlowError> {
    app.summary(&client).map(Json)
}

async fn handle_payment(
    State(app): State<AppState>,
    client: ClientId,
) -> Result<Json<DraftView>, FlowError> {
    app.payment(&client).map(Json)
}

#[debug_handler]
async fn handle_pay(
    State(app): State<AppState>,
    client: ClientId,
    Json(method): Json<PaymentMethod>,
) -> Result<Json<PaymentResult>, FlowError> {
    app.pay(&client, method).await.map(Json)
}

async fn handle_success(
    State(app): State<AppState>,
    client: ClientId,
) -> Result<Json<Confirmation>, FlowError> {
    app.success(&client).map(Json)
}

async fn handle_finish(
    State(app): State<AppState>,
    client: ClientId,
    Json(payload): Json<FinishPayload>,
) -> Result<Json<Navigation>, FlowError> {
    app.finish(&client, payload.next).map(Json)
}

async fn serve_api(Extension(api): Extension<Arc<OpenApi>>) -> impl IntoResponse {
    Json(api.as_ref().clone())
}

fn auth_api() -> ApiRouter<AppState> {
    ApiRouter::new()
        .api_route("/api/login", post(handle_login).get(check_login))
        .api_route("/api/logout", post(handle_logout))
        .api_route("/api/home", get(handle_home))
}

fn booking_api() -> ApiRouter<AppState> {
    ApiRouter::new()
        .api_route("/api/spots", get(handle_spots))
        .api_route("/api/quote", post(handle_quote))
        .api_route("/api/book/register", post(handle_register))
        .api_route("/api/book/summary", get(handle_summary))
        .api_route("/api/book/payment", get(handle_payment))
        .api_route("/api/book/pay", post(handle_pay))
        .api_route("/api/book/success", get(handle_success))
        .api_route("/api/book/finish", post(handle_finish))
}

/// Every API route plus the generated docs, with client cookies assigned.
pub fn app(parking: AppState) -> Router {
    let mut api = OpenApi {
        info: Info {
            title: "parkbook".to_string(),
            description: Some("Demo parking reservation flow".to_string()),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ..Info::default()
        },
        ..OpenApi::default()
    };

    auth_api()
        .merge(booking_api())
        .route("/api/docs", Redoc::new(OPENAPI_PATH).axum_route())
        .finish_api(&mut api)
        .route(OPENAPI_PATH, axum::routing::get(serve_api))
        .layer(Extension(Arc::new(api)))
        .layer(middleware::from_fn(assign_client))
        .with_state(parking)
}
