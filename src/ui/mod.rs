// Server-rendered site: catalog, wizards, admin dashboard.
// Askama templates, plain form posts, redirect-after-post.

mod templates;

use askama::Template;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use futures::Stream;
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;

use crate::api::auth::{self, SessionEvent, SESSION_COOKIE};
use crate::api::validation::{
    CONDITIONS, CONTACT_CHANNELS, FUEL_TYPES, TRANSMISSIONS, URGENCY_LEVELS,
};
use crate::db::{Car, CarFilters, ContactRequest, LeadStats, PendingCar, User, LEAD_STATUSES};
use crate::guard::{self, AccessDecision};
use crate::wizard::{ContactForm, SellCarForm, SubmitStatus, Wizard, WizardForm};
use crate::{AppState, WizardSession};

pub use templates::*;

// Anonymous wizard sessions are keyed by this cookie
const WIZARD_COOKIE: &str = "pd_wizard";

// Helper to render templates and handle errors
fn render_template<T: Template>(template: T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Template error: {}", e),
        )
            .into_response(),
    }
}

pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(index))
        .route("/car/:id", get(car_detail))
        .route("/car/:id/contact", get(contact_page))
        .route("/car/:id/contact", post(contact_submit))
        .route("/sell", get(sell_page))
        .route("/sell", post(sell_submit))
        .route("/creditos", get(creditos))
        .route("/seguros", get(seguros))
        .route("/login", get(login_page))
        .route("/login", post(login_submit))
        .route("/signup", get(signup_page))
        .route("/signup", post(signup_submit))
        .route("/logout", get(logout))
        .route("/admin", get(admin_dashboard))
        .route("/admin/leads/:id/status", post(admin_update_status))
        .route("/admin/access/stream", get(admin_access_stream))
        .fallback(not_found)
}

fn wizard_key(jar: CookieJar) -> (CookieJar, String) {
    if let Some(cookie) = jar.get(WIZARD_COOKIE) {
        let key = cookie.value().to_string();
        return (jar, key);
    }
    let key = uuid::Uuid::new_v4().to_string();
    let cookie = Cookie::build((WIZARD_COOKIE, key.clone()))
        .path("/")
        .http_only(true)
        .build();
    (jar.add(cookie), key)
}

fn flatten_errors(errors: &crate::wizard::FieldErrors) -> Vec<String> {
    let mut messages: Vec<String> = errors.values().flatten().cloned().collect();
    messages.sort();
    messages
}

fn option_labels(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn session_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

// Catalog

async fn index(
    State(state): State<Arc<AppState>>,
    Query(filters): Query<CarFilters>,
) -> Response {
    let cars = match Car::list(&state.db, &filters).await {
        Ok(cars) => cars,
        Err(e) => {
            tracing::error!("car listing query failed: {e}");
            Vec::new()
        }
    };
    render_template(IndexTemplate {
        cars,
        filters,
        fuel_types: option_labels(&FUEL_TYPES),
        transmissions: option_labels(&TRANSMISSIONS),
    })
}

async fn car_detail(State(state): State<Arc<AppState>>, Path(id): Path<i64>) -> Response {
    match Car::find_by_id(&state.db, id).await {
        Ok(Some(car)) => {
            let images = car.image_urls();
            let features = car.feature_list();
            render_template(CarDetailTemplate {
                car,
                images,
                features,
            })
        }
        Ok(None) => not_found().await.into_response(),
        Err(e) => {
            tracing::error!("car lookup failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response()
        }
    }
}

// Sell-your-car wizard

#[derive(Debug, Deserialize)]
struct SellStepInput {
    action: String,
    make: Option<String>,
    model: Option<String>,
    year: Option<String>,
    price: Option<String>,
    condition: Option<String>,
    mileage: Option<String>,
    fuel_type: Option<String>,
    transmission: Option<String>,
    description: Option<String>,
    photo: Option<String>,
    photo_index: Option<String>,
    seller_name: Option<String>,
    seller_phone: Option<String>,
    seller_email: Option<String>,
    location: Option<String>,
}

fn parse_i64(input: &Option<String>) -> Option<i64> {
    input.as_ref().and_then(|s| s.trim().parse().ok())
}

fn set_if_present(target: &mut String, input: &Option<String>) {
    if let Some(value) = input {
        *target = value.trim().to_string();
    }
}

impl SellStepInput {
    fn apply(&self, wizard: &mut Wizard<SellCarForm>) {
        set_if_present(&mut wizard.form.make, &self.make);
        set_if_present(&mut wizard.form.model, &self.model);
        set_if_present(&mut wizard.form.condition, &self.condition);
        set_if_present(&mut wizard.form.fuel_type, &self.fuel_type);
        set_if_present(&mut wizard.form.transmission, &self.transmission);
        set_if_present(&mut wizard.form.description, &self.description);
        set_if_present(&mut wizard.form.seller_name, &self.seller_name);
        set_if_present(&mut wizard.form.seller_phone, &self.seller_phone);
        set_if_present(&mut wizard.form.seller_email, &self.seller_email);
        set_if_present(&mut wizard.form.location, &self.location);
        if let Some(year) = parse_i64(&self.year) {
            wizard.form.year = year;
        }
        if let Some(price) = parse_i64(&self.price) {
            wizard.form.price = price;
        }
        if let Some(mileage) = parse_i64(&self.mileage) {
            wizard.form.mileage = mileage;
        }
    }
}

fn sell_template(state: &AppState, wizard: &Wizard<SellCarForm>, submitted: bool) -> SellWizardTemplate {
    let failure = match wizard.status() {
        SubmitStatus::Failed(message) => Some(message.clone()),
        _ => None,
    };
    SellWizardTemplate {
        step: wizard.step(),
        step_count: SellCarForm::STEP_COUNT,
        form: wizard.form.clone(),
        errors: flatten_errors(wizard.errors()),
        photos: wizard.photos().to_vec(),
        failure,
        submitted,
        conditions: option_labels(&CONDITIONS),
        fuel_types: option_labels(&FUEL_TYPES),
        transmissions: option_labels(&TRANSMISSIONS),
        max_photos: state.config.site.max_photos,
    }
}

#[derive(Debug, Default, Deserialize)]
struct SellPageQuery {
    #[serde(default)]
    enviado: bool,
}

async fn sell_page(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SellPageQuery>,
    jar: CookieJar,
) -> Response {
    let (jar, key) = wizard_key(jar);
    let wizard = state
        .sell_wizards
        .get(&key)
        .map(|entry| entry.wizard.clone())
        .unwrap_or_default();
    let template = sell_template(&state, &wizard, query.enviado);
    (jar, render_template(template)).into_response()
}

async fn sell_submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(input): Form<SellStepInput>,
) -> Response {
    let (jar, key) = wizard_key(jar);

    // Apply the post through the shared entry so an in-flight submit is
    // visible to a concurrent post before any awaited work starts. The map
    // guard must not be held across an await.
    let payload = {
        let mut session = state.sell_wizards.entry(key.clone()).or_default();
        session.touch();
        let wizard = &mut session.wizard;
        input.apply(wizard);
        match input.action.as_str() {
            "back" => {
                wizard.retreat();
                None
            }
            "next" => {
                let _ = wizard.advance();
                None
            }
            "add_photo" => {
                if let Some(photo) = input.photo.as_deref().filter(|p| !p.trim().is_empty()) {
                    let _ = wizard.add_photo(photo.trim(), state.config.site.max_photos);
                }
                None
            }
            "remove_photo" => {
                if let Some(index) = parse_i64(&input.photo_index) {
                    wizard.remove_photo(index as usize);
                }
                None
            }
            "submit" => wizard
                .begin_submit()
                .ok()
                .map(|_| wizard.form.clone().into_pending_car(wizard.photos().to_vec())),
            _ => None,
        }
    };

    if let Some(payload) = payload {
        match PendingCar::create(&state.db, &payload).await {
            Ok(id) => {
                tracing::info!(pending_car_id = id, "sell wizard completed");
                state.sell_wizards.remove(&key);
                return (jar, Redirect::to("/sell?enviado=true")).into_response();
            }
            Err(e) => {
                tracing::error!("sell submission failed: {e}");
                if let Some(mut session) = state.sell_wizards.get_mut(&key) {
                    session
                        .wizard
                        .submit_failed("No pudimos guardar tu vehículo. Intenta de nuevo.");
                }
            }
        }
    }

    let wizard = state
        .sell_wizards
        .get(&key)
        .map(|entry| entry.wizard.clone())
        .unwrap_or_default();
    let template = sell_template(&state, &wizard, false);
    (jar, render_template(template)).into_response()
}

// Buyer contact wizard

#[derive(Debug, Deserialize)]
struct ContactStepInput {
    action: String,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    budget_min: Option<String>,
    budget_max: Option<String>,
    financing_needed: Option<String>,
    urgency_level: Option<String>,
    preferred_contact: Option<String>,
    message: Option<String>,
    available_times: Option<String>,
    current_car_trade: Option<String>,
    cash_available: Option<String>,
}

fn checkbox(input: &Option<String>) -> bool {
    matches!(input.as_deref(), Some("on") | Some("true") | Some("1"))
}

impl ContactStepInput {
    fn apply(&self, wizard: &mut Wizard<ContactForm>) {
        set_if_present(&mut wizard.form.name, &self.name);
        set_if_present(&mut wizard.form.email, &self.email);
        set_if_present(&mut wizard.form.phone, &self.phone);
        set_if_present(&mut wizard.form.urgency_level, &self.urgency_level);
        set_if_present(&mut wizard.form.preferred_contact, &self.preferred_contact);
        set_if_present(&mut wizard.form.message, &self.message);
        if let Some(min) = parse_i64(&self.budget_min) {
            wizard.form.budget_min = min;
        }
        if let Some(max) = parse_i64(&self.budget_max) {
            wizard.form.budget_max = max;
        }
        if let Some(times) = &self.available_times {
            wizard.form.available_times = times
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
        }
        // Checkboxes only appear on step 2; absent means unchecked there
        if wizard.step() == 2 {
            wizard.form.financing_needed = checkbox(&self.financing_needed);
            wizard.form.current_car_trade = checkbox(&self.current_car_trade);
            wizard.form.cash_available = checkbox(&self.cash_available);
        }
    }
}

fn contact_template(
    car: Car,
    wizard: &Wizard<ContactForm>,
    submitted: bool,
) -> ContactWizardTemplate {
    let failure = match wizard.status() {
        SubmitStatus::Failed(message) => Some(message.clone()),
        _ => None,
    };
    ContactWizardTemplate {
        car,
        step: wizard.step(),
        step_count: ContactForm::STEP_COUNT,
        form: wizard.form.clone(),
        errors: flatten_errors(wizard.errors()),
        failure,
        submitted,
        urgency_levels: option_labels(&URGENCY_LEVELS),
        contact_channels: option_labels(&CONTACT_CHANNELS),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ContactPageQuery {
    #[serde(default)]
    enviado: bool,
}

async fn contact_page(
    State(state): State<Arc<AppState>>,
    Path(car_id): Path<i64>,
    Query(query): Query<ContactPageQuery>,
    jar: CookieJar,
) -> Response {
    let Ok(Some(car)) = Car::find_by_id(&state.db, car_id).await else {
        return not_found().await.into_response();
    };
    let (jar, key) = wizard_key(jar);
    let map_key = format!("{key}:{car_id}");
    // Render only; a session is stored once the visitor actually posts
    let wizard = state
        .contact_wizards
        .get(&map_key)
        .map(|entry| entry.wizard.clone())
        .unwrap_or_else(|| prefilled_contact_wizard(&car));
    let template = contact_template(car, &wizard, query.enviado);
    (jar, render_template(template)).into_response()
}

fn prefilled_contact_wizard(car: &Car) -> Wizard<ContactForm> {
    let mut wizard = Wizard::new();
    wizard.form = ContactForm::for_car(&car.title());
    wizard
}

async fn contact_submit(
    State(state): State<Arc<AppState>>,
    Path(car_id): Path<i64>,
    jar: CookieJar,
    Form(input): Form<ContactStepInput>,
) -> Response {
    let Ok(Some(car)) = Car::find_by_id(&state.db, car_id).await else {
        return not_found().await.into_response();
    };
    let (jar, key) = wizard_key(jar);
    let map_key = format!("{key}:{car_id}");

    // Same shared-entry discipline as the sell wizard
    let payload = {
        let mut session = state
            .contact_wizards
            .entry(map_key.clone())
            .or_insert_with(|| WizardSession::new(prefilled_contact_wizard(&car)));
        session.touch();
        let wizard = &mut session.wizard;
        input.apply(wizard);
        match input.action.as_str() {
            "back" => {
                wizard.retreat();
                None
            }
            "next" => {
                let _ = wizard.advance();
                None
            }
            "submit" => wizard
                .begin_submit()
                .ok()
                .map(|_| wizard.form.clone().into_contact_request(car_id)),
            _ => None,
        }
    };

    if let Some(payload) = payload {
        match ContactRequest::create(&state.db, &payload).await {
            Ok(id) => {
                tracing::info!(lead_id = %id, car_id, "contact wizard completed");
                state.contact_wizards.remove(&map_key);
                let target = format!("/car/{car_id}/contact?enviado=true");
                return (jar, Redirect::to(&target)).into_response();
            }
            Err(e) => {
                tracing::error!("contact submission failed: {e}");
                if let Some(mut session) = state.contact_wizards.get_mut(&map_key) {
                    session
                        .wizard
                        .submit_failed("No pudimos enviar tu solicitud. Intenta de nuevo.");
                }
            }
        }
    }

    let wizard = state
        .contact_wizards
        .get(&map_key)
        .map(|entry| entry.wizard.clone())
        .unwrap_or_else(|| prefilled_contact_wizard(&car));
    let template = contact_template(car, &wizard, false);
    (jar, render_template(template)).into_response()
}

// Financing calculator

#[derive(Debug, Default, Deserialize)]
struct CreditQuery {
    #[serde(default)]
    price: i64,
    #[serde(default)]
    down_payment: i64,
    #[serde(default)]
    months: i64,
    #[serde(default)]
    rate: f64,
}

/// Standard annuity payment over the financed amount.
fn monthly_payment(principal: i64, annual_rate: f64, months: i64) -> i64 {
    if principal <= 0 || months <= 0 {
        return 0;
    }
    if annual_rate <= 0.0 {
        return principal / months;
    }
    let r = annual_rate / 100.0 / 12.0;
    let n = months as f64;
    let payment = principal as f64 * r / (1.0 - (1.0 + r).powf(-n));
    payment.round() as i64
}

async fn creditos(Query(query): Query<CreditQuery>) -> Response {
    let months = if query.months > 0 { query.months } else { 60 };
    let annual_rate = if query.rate > 0.0 { query.rate } else { 18.0 };
    let principal = query.price - query.down_payment;
    render_template(CreditosTemplate {
        price: query.price,
        down_payment: query.down_payment,
        months,
        annual_rate,
        monthly_payment: monthly_payment(principal, annual_rate, months),
        computed: query.price > 0,
    })
}

async fn seguros() -> Response {
    render_template(SegurosTemplate)
}

// Auth pages

async fn login_page() -> Response {
    render_template(LoginTemplate { error: None })
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

async fn login_submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let user: Option<User> = match sqlx::query_as("SELECT * FROM users WHERE email = ?")
        .bind(&form.email)
        .fetch_optional(&state.db)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            tracing::error!("login lookup failed: {e}");
            None
        }
    };

    let Some(user) = user.filter(|u| auth::verify_password(&form.password, &u.password_hash))
    else {
        return render_template(LoginTemplate {
            error: Some("Correo o contraseña incorrectos".to_string()),
        });
    };

    let token = match auth::create_session(&state.db, &user.id, state.config.auth.session_ttl_days)
        .await
    {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("session creation failed: {e}");
            return render_template(LoginTemplate {
                error: Some("Error interno, intenta de nuevo".to_string()),
            });
        }
    };
    let _ = state.session_events.send(SessionEvent::SignedIn {
        user_id: user.id.clone(),
    });

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .build();
    let target = if user.role == "admin" { "/admin" } else { "/" };
    (jar.add(cookie), Redirect::to(target)).into_response()
}

async fn signup_page() -> Response {
    render_template(SignupTemplate { error: None })
}

#[derive(Debug, Deserialize)]
struct SignupForm {
    email: String,
    password: String,
}

async fn signup_submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> Response {
    if crate::api::validation::validate_email(&form.email).is_err() {
        return render_template(SignupTemplate {
            error: Some("Correo electrónico inválido".to_string()),
        });
    }
    if form.password.len() < 8 {
        return render_template(SignupTemplate {
            error: Some("La contraseña debe tener al menos 8 caracteres".to_string()),
        });
    }

    let result = async {
        let existing: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(&form.email)
            .fetch_optional(&state.db)
            .await?;
        if existing.is_some() {
            return Ok::<Option<String>, sqlx::Error>(None);
        }
        let id = uuid::Uuid::new_v4().to_string();
        let hash = auth::hash_password(&form.password)
            .map_err(|_| sqlx::Error::Protocol("password hash failed".into()))?;
        sqlx::query("INSERT INTO users (id, email, password_hash, role) VALUES (?, ?, ?, 'client')")
            .bind(&id)
            .bind(&form.email)
            .bind(&hash)
            .execute(&state.db)
            .await?;
        Ok(Some(id))
    }
    .await;

    match result {
        Ok(Some(user_id)) => {
            match auth::create_session(&state.db, &user_id, state.config.auth.session_ttl_days)
                .await
            {
                Ok(token) => {
                    let _ = state
                        .session_events
                        .send(SessionEvent::SignedIn { user_id });
                    let cookie = Cookie::build((SESSION_COOKIE, token))
                        .path("/")
                        .http_only(true)
                        .build();
                    (jar.add(cookie), Redirect::to("/")).into_response()
                }
                Err(_) => Redirect::to("/login").into_response(),
            }
        }
        Ok(None) => render_template(SignupTemplate {
            error: Some("Ya existe una cuenta con este correo".to_string()),
        }),
        Err(e) => {
            tracing::error!("signup failed: {e}");
            render_template(SignupTemplate {
                error: Some("Error interno, intenta de nuevo".to_string()),
            })
        }
    }
}

async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    if let Some(token) = session_token(&jar) {
        match auth::destroy_session(&state.db, &token).await {
            Ok(Some(user_id)) => {
                let _ = state.session_events.send(SessionEvent::SignedOut { user_id });
            }
            Ok(None) => {}
            Err(e) => tracing::error!("logout failed: {e}"),
        }
    }
    let jar = jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build());
    (jar, Redirect::to("/")).into_response()
}

// Admin dashboard

#[derive(Debug, Default, Deserialize)]
struct AdminQuery {
    #[serde(default)]
    status: String,
}

async fn admin_dashboard(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AdminQuery>,
    jar: CookieJar,
) -> Response {
    let token = session_token(&jar);
    match guard::check_access(&state.db, token.as_deref(), Some("admin")).await {
        AccessDecision::Granted { .. } => {}
        AccessDecision::Redirect(target) => return Redirect::to(target).into_response(),
    }

    let leads = match ContactRequest::list_with_car_info(&state.db, &query.status).await {
        Ok(leads) => leads,
        Err(e) => {
            tracing::error!("lead listing failed: {e}");
            Vec::new()
        }
    };
    let stats = match LeadStats::calculate(&state.db, state.config.site.commission_rate).await {
        Ok(stats) => stats,
        Err(e) => {
            tracing::error!("lead stats failed: {e}");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Error interno").into_response();
        }
    };

    render_template(AdminTemplate {
        leads,
        stats,
        status_filter: query.status,
        statuses: option_labels(&LEAD_STATUSES),
    })
}

#[derive(Debug, Deserialize)]
struct StatusForm {
    status: String,
    #[serde(default)]
    filter: String,
}

async fn admin_update_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    jar: CookieJar,
    Form(form): Form<StatusForm>,
) -> Response {
    let token = session_token(&jar);
    match guard::check_access(&state.db, token.as_deref(), Some("admin")).await {
        AccessDecision::Granted { .. } => {}
        AccessDecision::Redirect(target) => return Redirect::to(target).into_response(),
    }

    if crate::api::validation::validate_lead_status(&form.status).is_ok() {
        if let Err(e) = ContactRequest::update_status(&state.db, &id, &form.status).await {
            tracing::error!("lead status update failed: {e}");
        }
    }

    let target = if form.filter.is_empty() {
        "/admin".to_string()
    } else {
        format!("/admin?status={}", form.filter)
    };
    Redirect::to(&target).into_response()
}

/// Server-sent events feed that tells an open admin page when its access
/// is revoked. Emits one event per decision; the stream ends after a
/// redirect decision since the page is about to navigate away.
async fn admin_access_stream(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let token = session_token(&jar);
    let mut watcher = guard::AccessWatcher::new(
        state.db.clone(),
        state.session_events.subscribe(),
        token,
        Some("admin".to_string()),
    );

    let stream = async_stream::stream! {
        let mut decision = watcher.current().await;
        loop {
            let (name, data) = match &decision {
                AccessDecision::Granted { .. } => ("granted", String::new()),
                AccessDecision::Redirect(target) => ("redirect", target.to_string()),
            };
            yield Ok(Event::default().event(name).data(data));
            if matches!(decision, AccessDecision::Redirect(_)) {
                break;
            }
            match watcher.next_decision().await {
                Some(next) => decision = next,
                None => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, render_template(NotFoundTemplate))
}
