//! HTTP surface: plan endpoints, credentials and the OpenAPI document.
//!
//! Every route is served both at the root (`/meal`) and under `/api`
//! (`/api/meal`), the paths the web client calls.

use std::sync::Arc;

use actix_web::cookie::Cookie;
use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse, get, post, web};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};

use crate::auth::{AuthAction, AuthError, CredentialStore, SessionClaims, TOKEN_COOKIE, TokenIssuer, bearer_token};
use crate::chat::{ChatMessage, ChatRole};
use crate::config::AppConfig;
use crate::error::{ApiError, ErrorResponse};
use crate::gateway::{CompletionGateway, GenAiGateway, create_genai_client};
use crate::plan::{Exercise, Macros, MealPlan, MealPlanRequest, Recipe, WorkoutDay, WorkoutPlan, WorkoutPlanRequest};
use crate::processor::PlanProcessor;

/// Shared, read-only state handed to every handler.
pub struct AppState {
    pub processor: PlanProcessor,
    pub credentials: CredentialStore,
    pub tokens: TokenIssuer,
    pub require_auth: bool,
}

impl AppState {
    /// Wires the production gateway from configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        let client = create_genai_client(config.api_key.as_deref());
        let gateway = GenAiGateway::new(client, config.model.clone(), config.upstream_timeout);
        tracing::info!("Completion model: {}", gateway.model());
        Self::with_gateway(config, Arc::new(gateway))
    }

    /// Builds the state around any gateway.
    #[must_use]
    pub fn with_gateway(
        config: &AppConfig,
        gateway: Arc<dyn CompletionGateway>,
    ) -> Self {
        let secret = config.token_secret.clone().unwrap_or_else(|| {
            tracing::warn!("TOKEN_SECRET is not set; sessions will not survive a restart");
            format!("{}{}", uuid::Uuid::new_v4().simple(), uuid::Uuid::new_v4().simple())
        });

        Self {
            processor: PlanProcessor::new(gateway, config.validate_plans),
            credentials: CredentialStore::new(),
            tokens: TokenIssuer::new(secret.as_bytes(), config.token_ttl),
            require_auth: config.require_auth,
        }
    }

    /// Validates the bearer token or `token` cookie of `req`.
    fn session(
        &self,
        req: &HttpRequest,
    ) -> Result<SessionClaims, AuthError> {
        let bearer = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .map(str::to_string);

        let token = bearer
            .or_else(|| req.cookie(TOKEN_COOKIE).map(|cookie| cookie.value().to_string()))
            .ok_or(AuthError::MissingToken)?;

        self.tokens.verify(token.trim())
    }

    fn authorize(
        &self,
        req: &HttpRequest,
    ) -> Result<(), ApiError> {
        if self.require_auth {
            let claims = self.session(req)?;
            tracing::info!("Authorized plan request for {}", claims.sub);
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone)]
pub struct AuthRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub action: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct AuthResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct SessionResponse {
    pub username: String,
    pub expires_at: u64,
}

#[utoipa::path(
    post,
    path = "/meal",
    request_body = MealPlanRequest,
    responses(
        (status = 200, description = "Meal plan: cuisine name to three recipes", body = MealPlan),
        (status = 400, description = "Malformed request body", body = ErrorResponse),
        (status = 500, description = "Plan generation failed", body = ErrorResponse)
    )
)]
#[post("/meal")]
async fn meal(
    state: web::Data<AppState>,
    http: HttpRequest,
    req: web::Json<MealPlanRequest>,
) -> Result<HttpResponse, ApiError> {
    state.authorize(&http)?;
    let request = req.into_inner();
    tracing::info!(
        "Meal plan requested for {} cuisine(s)",
        request.cuisine_preferences.len()
    );

    let plan = state.processor.generate(&request).await?;
    Ok(HttpResponse::Ok().json(plan))
}

#[utoipa::path(
    post,
    path = "/chat",
    request_body = WorkoutPlanRequest,
    responses(
        (status = 200, description = "Workout plan", body = WorkoutPlan),
        (status = 400, description = "Malformed request body", body = ErrorResponse),
        (status = 500, description = "Plan generation failed", body = ErrorResponse)
    )
)]
#[post("/chat")]
async fn workout(
    state: web::Data<AppState>,
    http: HttpRequest,
    req: web::Json<WorkoutPlanRequest>,
) -> Result<HttpResponse, ApiError> {
    state.authorize(&http)?;
    let request = req.into_inner();
    tracing::info!("Workout plan requested for {} day(s) per week", request.days_per_week);

    let plan = state.processor.generate(&request).await?;
    Ok(HttpResponse::Ok().json(plan))
}

#[utoipa::path(
    post,
    path = "/auth",
    request_body = AuthRequest,
    responses(
        (status = 200, description = "Logged in; token also set as an http-only cookie", body = AuthResponse),
        (status = 201, description = "Signed up", body = AuthResponse),
        (status = 400, description = "Missing fields, invalid action or existing user", body = ErrorResponse),
        (status = 401, description = "Invalid username or password", body = ErrorResponse)
    )
)]
#[post("/auth")]
async fn auth(
    state: web::Data<AppState>,
    req: web::Json<AuthRequest>,
) -> Result<HttpResponse, ApiError> {
    let AuthRequest {
        username,
        password,
        action,
    } = req.into_inner();

    if username.is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials.into());
    }
    let action: AuthAction = action.parse().map_err(|_| AuthError::InvalidAction)?;

    // Argon2 is CPU bound; keep it off the async workers.
    let state = state.into_inner();
    let outcome = web::block(move || match action {
        AuthAction::Signup => state.credentials.register(&username, &password).map(|()| None),
        AuthAction::Login => {
            state.credentials.verify(&username, &password)?;
            state.tokens.issue(&username).map(Some)
        }
    })
    .await
    .map_err(|e| ApiError::internal_server_error(e.to_string()))??;

    match outcome {
        None => Ok(HttpResponse::Created().json(AuthResponse {
            message: Some("Signup successful".to_string()),
            token: None,
        })),
        Some(token) => {
            let cookie = Cookie::build(TOKEN_COOKIE, token.clone())
                .http_only(true)
                .secure(true)
                .path("/")
                .finish();

            Ok(HttpResponse::Ok().cookie(cookie).json(AuthResponse {
                message: None,
                token: Some(token),
            }))
        }
    }
}

#[utoipa::path(
    get,
    path = "/session",
    responses(
        (status = 200, description = "The session behind the presented token", body = SessionResponse),
        (status = 401, description = "Missing, invalid or expired token", body = ErrorResponse)
    )
)]
#[get("/session")]
async fn session(
    state: web::Data<AppState>,
    http: HttpRequest,
) -> Result<HttpResponse, ApiError> {
    let claims = state.session(&http)?;
    Ok(HttpResponse::Ok().json(SessionResponse {
        username: claims.sub,
        expires_at: claims.exp,
    }))
}

/// Registers the routes and the JSON body rules. The caller supplies
/// `web::Data<AppState>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        tracing::warn!("Rejected request body: {err}");
        ApiError::bad_request(err.to_string()).into()
    });

    cfg.app_data(json_config)
        .service(meal)
        .service(workout)
        .service(auth)
        .service(session)
        .service(
            web::scope("/api")
                .service(meal)
                .service(workout)
                .service(auth)
                .service(session),
        );
}

#[derive(OpenApi)]
#[openapi(
    paths(meal, workout, auth, session),
    components(schemas(
        MealPlanRequest,
        WorkoutPlanRequest,
        MealPlan,
        Recipe,
        Macros,
        WorkoutPlan,
        WorkoutDay,
        Exercise,
        ChatMessage,
        ChatRole,
        AuthRequest,
        AuthResponse,
        SessionResponse,
        ErrorResponse
    ))
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayError;
    use crate::gateway::testing::StubGateway;
    use actix_web::http::StatusCode;
    use actix_web::{App, test as atest};
    use serde_json::{Value, json};

    fn recipe(name: &str) -> Value {
        json!({
            "mealName": name,
            "totalCalories": 450,
            "ingredients": "quinoa: 1 cup, chickpeas: 1/2 cup",
            "caloriesPerServing": 225,
            "macros": { "protein": "18g", "carbs": "50g", "fats": "9g" },
            "note": "Balanced and filling."
        })
    }

    fn meal_body(cuisines: &[&str]) -> Value {
        json!({
            "messages": [{ "role": "user", "content": "Generate my meal plan" }],
            "dietaryRestrictions": "Vegetarian",
            "calorieGoal": "1800",
            "cuisinePreferences": cuisines,
            "height": "65",
            "weight": "150",
            "age": "28",
            "goal": "Lose Weight"
        })
    }

    fn workout_body() -> Value {
        json!({
            "messages": [{ "role": "user", "content": "Generate my workout plan" }],
            "daysPerWeek": "1",
            "timePerDay": "45",
            "exerciseConstraints": "Dumbbells Only",
            "height": "65",
            "weight": "150",
            "age": "28",
            "goal": "Gain Weight"
        })
    }

    fn config(require_auth: bool) -> AppConfig {
        AppConfig {
            require_auth,
            token_secret: Some("test-secret".to_string()),
            ..AppConfig::default()
        }
    }

    macro_rules! app {
        ($stub:expr) => {
            app!($stub, false)
        };
        ($stub:expr, $require_auth:expr) => {
            atest::init_service(
                App::new()
                    .app_data(web::Data::new(AppState::with_gateway(&config($require_auth), $stub.clone())))
                    .configure(configure),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_meal_plan_round_trips_unmodified() {
        let plan = json!({
            "Italian": [recipe("a"), recipe("b"), recipe("c")],
            "Thai": [recipe("d"), recipe("e"), recipe("f")],
            "Mexican": [recipe("g"), recipe("h"), recipe("i")]
        });
        let stub = Arc::new(StubGateway::replying(&plan.to_string()));
        let app = app!(stub);

        let req = atest::TestRequest::post()
            .uri("/meal")
            .set_json(meal_body(&["Italian", "Thai", "Mexican"]))
            .to_request();
        let resp = atest::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body = atest::read_body(resp).await;
        assert_eq!(body, plan.to_string().as_bytes());
    }

    #[actix_web::test]
    async fn test_api_prefix_serves_workout_plan() {
        let plan = json!({
            "workoutSplit": "Full Body",
            "schedule": {
                "Day 1": {
                    "bodyParts": "Full body",
                    "exercises": [
                        { "name": "Goblet Squat", "sets": 3, "reps": "10-12", "rest": "60 sec", "intensity": "moderate" }
                    ],
                    "notes": "Low stress session."
                }
            },
            "recovery": "Walk and stretch on rest days."
        });
        let stub = Arc::new(StubGateway::replying(&plan.to_string()));
        let app = app!(stub);

        let req = atest::TestRequest::post()
            .uri("/api/chat")
            .set_json(workout_body())
            .to_request();
        let resp = atest::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = atest::read_body_json(resp).await;
        assert_eq!(body, plan);
        assert!(stub.last_messages()[0].content.contains("Dumbbells Only"));
    }

    #[actix_web::test]
    async fn test_missing_field_is_bad_request_without_upstream_call() {
        let stub = Arc::new(StubGateway::replying("{}"));
        let app = app!(stub);

        let mut body = meal_body(&["Thai"]);
        body.as_object_mut().unwrap().remove("calorieGoal");
        let req = atest::TestRequest::post().uri("/meal").set_json(body).to_request();
        let resp = atest::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = atest::read_body_json(resp).await;
        assert_eq!(error.error, "BAD_REQUEST");
        assert!(error.message.contains("calorieGoal"));
        assert_eq!(stub.calls(), 0);
    }

    #[actix_web::test]
    async fn test_invalid_json_is_bad_request() {
        let stub = Arc::new(StubGateway::replying("{}"));
        let app = app!(stub);

        let req = atest::TestRequest::post()
            .uri("/chat")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = atest::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(stub.calls(), 0);
    }

    #[actix_web::test]
    async fn test_prose_completion_is_a_server_error() {
        let stub = Arc::new(StubGateway::replying(r#"Sure! Here's your plan: {"Thai": []}"#));
        let app = app!(stub);

        let req = atest::TestRequest::post()
            .uri("/meal")
            .set_json(meal_body(&["Thai"]))
            .to_request();
        let resp = atest::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let error: ErrorResponse = atest::read_body_json(resp).await;
        assert_eq!(error.error, "MALFORMED_COMPLETION");
        assert_eq!(error.message, "Failed to process chat request");
    }

    #[actix_web::test]
    async fn test_upstream_failure_is_masked() {
        let stub = Arc::new(StubGateway::failing(|| {
            GatewayError::Upstream("401 invalid api key sk-live-123".to_string())
        }));
        let app = app!(stub);

        let req = atest::TestRequest::post()
            .uri("/chat")
            .set_json(workout_body())
            .to_request();
        let resp = atest::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = atest::read_body(resp).await;
        let text = std::str::from_utf8(&body).unwrap();
        assert!(text.contains("UPSTREAM_ERROR"));
        assert!(!text.contains("sk-live-123"));
    }

    #[actix_web::test]
    async fn test_empty_messages_succeed() {
        let stub = Arc::new(StubGateway::replying(
            &json!({ "Thai": [recipe("a"), recipe("b"), recipe("c")] }).to_string(),
        ));
        let app = app!(stub);

        let mut body = meal_body(&["Thai"]);
        body["messages"] = json!([]);
        let req = atest::TestRequest::post().uri("/meal").set_json(body).to_request();
        let resp = atest::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(stub.last_messages().len(), 1);
    }

    #[actix_web::test]
    async fn test_concurrent_requests_do_not_share_state() {
        // Answers with whichever cuisine the system prompt asked for.
        let stub = Arc::new(StubGateway::new(|messages| {
            let prompt = &messages[0].content;
            let cuisine = if prompt.contains("- Thai") { "Thai" } else { "Italian" };
            let mut plan = serde_json::Map::new();
            plan.insert(cuisine.to_string(), json!([recipe(cuisine), recipe(cuisine), recipe(cuisine)]));
            Ok(Value::Object(plan).to_string())
        }));
        let app = app!(stub);

        let italian = atest::TestRequest::post()
            .uri("/meal")
            .set_json(meal_body(&["Italian"]))
            .to_request();
        let thai = atest::TestRequest::post()
            .uri("/meal")
            .set_json(meal_body(&["Thai"]))
            .to_request();

        let (italian, thai) = futures::join!(atest::call_service(&app, italian), atest::call_service(&app, thai));

        let italian: Value = atest::read_body_json(italian).await;
        let thai: Value = atest::read_body_json(thai).await;

        assert_eq!(italian.as_object().unwrap().keys().collect::<Vec<_>>(), vec!["Italian"]);
        assert_eq!(thai.as_object().unwrap().keys().collect::<Vec<_>>(), vec!["Thai"]);
        assert_eq!(stub.calls(), 2);
    }

    #[actix_web::test]
    async fn test_signup_login_and_session() {
        let stub = Arc::new(StubGateway::replying("{}"));
        let app = app!(stub);
        let credentials = json!({ "username": "maya", "password": "hunter2" });

        let mut signup = credentials.clone();
        signup["action"] = json!("signup");
        let resp = atest::call_service(
            &app,
            atest::TestRequest::post().uri("/api/auth").set_json(&signup).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = atest::call_service(
            &app,
            atest::TestRequest::post().uri("/auth").set_json(&signup).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let mut login = credentials.clone();
        login["action"] = json!("login");
        let resp = atest::call_service(
            &app,
            atest::TestRequest::post().uri("/auth").set_json(&login).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.response().cookies().any(|c| c.name() == "token" && c.http_only() == Some(true)));
        let body: AuthResponse = atest::read_body_json(resp).await;
        let token = body.token.unwrap();

        let resp = atest::call_service(
            &app,
            atest::TestRequest::get()
                .uri("/session")
                .insert_header((header::AUTHORIZATION, format!("Bearer {token}")))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: SessionResponse = atest::read_body_json(resp).await;
        assert_eq!(body.username, "maya");

        let resp = atest::call_service(
            &app,
            atest::TestRequest::get()
                .uri("/api/session")
                .insert_header((header::AUTHORIZATION, format!("bearer {token}")))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[actix_web::test]
    async fn test_auth_rejections() {
        let stub = Arc::new(StubGateway::replying("{}"));
        let app = app!(stub);

        let cases = [
            (json!({ "username": "maya", "action": "signup" }), StatusCode::BAD_REQUEST),
            (json!({ "username": "maya", "password": "pw", "action": "logout" }), StatusCode::BAD_REQUEST),
            (json!({ "username": "ghost", "password": "pw", "action": "login" }), StatusCode::UNAUTHORIZED),
        ];

        for (body, expected) in cases {
            let resp = atest::call_service(
                &app,
                atest::TestRequest::post().uri("/auth").set_json(&body).to_request(),
            )
            .await;
            assert_eq!(resp.status(), expected, "body: {body}");
        }

        let resp = atest::call_service(&app, atest::TestRequest::get().uri("/session").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_required_auth_guards_plan_endpoints() {
        let stub = Arc::new(StubGateway::replying(
            &json!({ "Thai": [recipe("a"), recipe("b"), recipe("c")] }).to_string(),
        ));
        let app = app!(stub, true);

        let resp = atest::call_service(
            &app,
            atest::TestRequest::post()
                .uri("/meal")
                .set_json(meal_body(&["Thai"]))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(stub.calls(), 0);

        let token = TokenIssuer::new(b"test-secret", crate::auth::DEFAULT_TOKEN_TTL)
            .issue("maya")
            .unwrap();
        let resp = atest::call_service(
            &app,
            atest::TestRequest::post()
                .uri("/meal")
                .cookie(Cookie::new(TOKEN_COOKIE, token))
                .set_json(meal_body(&["Thai"]))
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(stub.calls(), 1);
    }

    #[test]
    fn test_openapi_lists_plan_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/meal"));
        assert!(doc.paths.paths.contains_key("/chat"));
        assert!(doc.paths.paths.contains_key("/auth"));
    }
}
