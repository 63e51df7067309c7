use std::collections::BTreeSet;
use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pantry_api::{
    db::{Cache, CacheWriterHandle, InMemoryStore},
    routes::{create_router, AppDependencies, AppState},
    services::{
        providers::SpoonacularProvider, retry::RetryPolicy, BackgroundTasks,
        BackgroundTasksHandle, CacheSettings, EnhancementGateway,
    },
};

struct TestApp {
    server: TestServer,
    tasks: BackgroundTasks,
    store: InMemoryStore,
    _handles: (BackgroundTasksHandle, CacheWriterHandle),
}

async fn create_test_app(provider_server: &MockServer) -> TestApp {
    let store = InMemoryStore::new();
    let (cache, cache_handle) = Cache::in_memory();
    let (tasks, tasks_handle) = BackgroundTasks::new(4);

    let provider = SpoonacularProvider::new(
        "test-key".to_string(),
        provider_server.uri(),
        Duration::from_secs(2),
        RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(5)),
    )
    .unwrap();

    let settings = CacheSettings {
        batch_pause: Duration::from_millis(1),
        ..CacheSettings::default()
    };

    let state = AppState::new(AppDependencies {
        store: Arc::new(store.clone()),
        provider: Arc::new(provider),
        gateway: EnhancementGateway::disabled(tasks.clone()),
        cache,
        tasks: tasks.clone(),
        cache_settings: settings,
        search_history_limit: 10,
    });

    TestApp {
        server: TestServer::new(create_router(state)).unwrap(),
        tasks,
        store,
        _handles: (tasks_handle, cache_handle),
    }
}

fn user_header(user_id: Uuid) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-user-id"),
        HeaderValue::from_str(&user_id.to_string()).unwrap(),
    )
}

fn recipe_ids(suggestions: &Value) -> BTreeSet<i64> {
    suggestions["recipes"]
        .as_array()
        .map(|recipes| recipes.iter().filter_map(|r| r["id"].as_i64()).collect())
        .unwrap_or_default()
}

fn stub(id: i64, title: &str, used: &[&str], missed: &[&str]) -> Value {
    json!({
        "id": id,
        "title": title,
        "usedIngredientCount": used.len(),
        "missedIngredientCount": missed.len(),
        "usedIngredients": used.iter().map(|n| json!({"name": n})).collect::<Vec<_>>(),
        "missedIngredients": missed.iter().map(|n| json!({"name": n})).collect::<Vec<_>>(),
        "likes": 10
    })
}

fn detail(id: i64, title: &str, ingredients: &[&str], dish_types: &[&str]) -> Value {
    json!({
        "id": id,
        "title": title,
        "readyInMinutes": 30,
        "servings": 2,
        "extendedIngredients": ingredients
            .iter()
            .map(|n| json!({"name": n, "amount": 1, "unit": "cup"}))
            .collect::<Vec<_>>(),
        "dishTypes": dish_types,
        "aggregateLikes": 10
    })
}

async fn mount_search(server: &MockServer, stubs: Vec<Value>, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/recipes/findByIngredients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(stubs)))
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, id: i64, body: Value) {
    Mock::given(method("GET"))
        .and(path(format!("/recipes/{}/information", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn mount_chicken_rice(server: &MockServer, search_calls: u64) {
    mount_search(
        server,
        vec![
            stub(101, "Chicken Fried Rice", &["chicken", "rice"], &["soy sauce"]),
            stub(102, "Chicken and Rice Soup", &["chicken", "rice"], &["egg"]),
        ],
        search_calls,
    )
    .await;
    mount_detail(
        server,
        101,
        detail(
            101,
            "Chicken Fried Rice",
            &["chicken breast", "rice", "soy sauce"],
            &["main course"],
        ),
    )
    .await;
    mount_detail(
        server,
        102,
        detail(
            102,
            "Chicken and Rice Soup",
            &["chicken", "rice", "Egg"],
            &["soup"],
        ),
    )
    .await;
}

#[tokio::test]
async fn test_health_check() {
    let provider = MockServer::start().await;
    let app = create_test_app(&provider).await;

    let response = app.server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let provider = MockServer::start().await;
    let app = create_test_app(&provider).await;

    let response = app
        .server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("trace-42"),
        )
        .await;
    assert_eq!(response.header("x-request-id"), "trace-42");
}

#[tokio::test]
async fn test_second_search_is_served_without_provider() {
    let provider = MockServer::start().await;
    mount_chicken_rice(&provider, 1).await;
    let app = create_test_app(&provider).await;

    let body = json!({"ingredients": ["Chicken", " rice ", "chicken"], "count": 2});

    let first = app.server.post("/api/v1/recipes/suggestions").json(&body).await;
    first.assert_status_ok();
    let first: Value = first.json();
    assert_eq!(first["source"], "provider");
    assert_eq!(first["count"], 2);
    assert_eq!(first["enhanced"], false);

    app.tasks.wait_idle().await;
    assert_eq!(app.store.recipe_count().await, 2);

    let second = app.server.post("/api/v1/recipes/suggestions").json(&body).await;
    second.assert_status_ok();
    let second: Value = second.json();
    assert_eq!(second["source"], "cache");
    assert_eq!(second["count"], 2);
    assert_eq!(recipe_ids(&second), recipe_ids(&first));
    assert_eq!(recipe_ids(&first), BTreeSet::from([101, 102]));
}

#[tokio::test]
async fn test_empty_ingredients_rejected() {
    let provider = MockServer::start().await;
    mount_search(&provider, vec![], 0).await;
    let app = create_test_app(&provider).await;

    let response = app
        .server
        .post("/api/v1/recipes/suggestions")
        .json(&json!({"ingredients": ["  ", ""]}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_provider_quota_maps_to_too_many_requests() {
    let provider = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/recipes/findByIngredients"))
        .respond_with(ResponseTemplate::new(402))
        .expect(1)
        .mount(&provider)
        .await;
    let app = create_test_app(&provider).await;

    let response = app
        .server
        .post("/api/v1/recipes/suggestions")
        .json(&json!({"ingredients": ["egg"]}))
        .await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_recipe_details_and_tips_fallback() {
    let provider = MockServer::start().await;
    mount_chicken_rice(&provider, 0).await;
    let app = create_test_app(&provider).await;

    let response = app.server.get("/api/v1/recipes/101").await;
    response.assert_status_ok();
    let recipe: Value = response.json();
    assert_eq!(recipe["external_id"], 101);
    assert_eq!(recipe["title"], "Chicken Fried Rice");

    let response = app.server.get("/api/v1/recipes/101/tips").await;
    response.assert_status_ok();
    let tips: Value = response.json();
    assert_eq!(tips["enhanced"], false);
}

#[tokio::test]
async fn test_unknown_recipe_is_not_found() {
    let provider = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/recipes/999/information"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&provider)
        .await;
    let app = create_test_app(&provider).await;

    let response = app.server.get("/api/v1/recipes/999").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rating_replaces_previous_rating_from_same_user() {
    let provider = MockServer::start().await;
    mount_chicken_rice(&provider, 0).await;
    let app = create_test_app(&provider).await;
    let (name, value) = user_header(Uuid::new_v4());

    let response = app
        .server
        .post("/api/v1/recipes/101/rating")
        .add_header(name.clone(), value.clone())
        .json(&json!({"rating": 4}))
        .await;
    response.assert_status_ok();

    let response = app
        .server
        .post("/api/v1/recipes/101/rating")
        .add_header(name, value)
        .json(&json!({"rating": 2}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["rating_count"], 1);
    assert_eq!(body["average_rating"], 2.0);

    let response = app.server.get("/api/v1/recipes/trending?limit=5").await;
    response.assert_status_ok();
    let trending: Vec<Value> = response.json();
    assert_eq!(trending.len(), 1);
    assert_eq!(trending[0]["external_id"], 101);
}

#[tokio::test]
async fn test_out_of_range_rating_rejected() {
    let provider = MockServer::start().await;
    mount_chicken_rice(&provider, 0).await;
    let app = create_test_app(&provider).await;
    let (name, value) = user_header(Uuid::new_v4());

    let response = app
        .server
        .post("/api/v1/recipes/101/rating")
        .add_header(name, value)
        .json(&json!({"rating": 6}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rating_requires_user_header() {
    let provider = MockServer::start().await;
    let app = create_test_app(&provider).await;

    let response = app
        .server
        .post("/api/v1/recipes/101/rating")
        .json(&json!({"rating": 4}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_favorite_toggles() {
    let provider = MockServer::start().await;
    mount_chicken_rice(&provider, 0).await;
    let app = create_test_app(&provider).await;
    let (name, value) = user_header(Uuid::new_v4());

    let first: Value = app
        .server
        .post("/api/v1/recipes/102/favorite")
        .add_header(name.clone(), value.clone())
        .await
        .json();
    assert_eq!(first["favorite"], true);

    let second: Value = app
        .server
        .post("/api/v1/recipes/102/favorite")
        .add_header(name, value)
        .await
        .json();
    assert_eq!(second["favorite"], false);
}

#[tokio::test]
async fn test_ingredient_analysis_falls_back_locally() {
    let provider = MockServer::start().await;
    let app = create_test_app(&provider).await;

    let response = app
        .server
        .post("/api/v1/ingredients/analyze")
        .json(&json!({"ingredients": ["2 cups diced tomatoes", "basil", "mozzarella"]}))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["enhanced"], false);
    assert!(body["analysis"].is_object());
}

#[tokio::test]
async fn test_meal_plan_needs_seven_candidates() {
    let provider = MockServer::start().await;
    mount_chicken_rice(&provider, 1).await;
    let app = create_test_app(&provider).await;
    let (name, value) = user_header(Uuid::new_v4());

    let response = app
        .server
        .post("/api/v1/meal-plans")
        .add_header(name, value)
        .json(&json!({"ingredients": ["chicken", "rice"]}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_meal_plan_without_history_rejected() {
    let provider = MockServer::start().await;
    let app = create_test_app(&provider).await;
    let (name, value) = user_header(Uuid::new_v4());

    let response = app
        .server
        .post("/api/v1/meal-plans")
        .add_header(name, value)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_meal_plan_and_shopping_list_from_plan() {
    let provider = MockServer::start().await;
    let dishes = [
        (201, "Oat Porridge", "breakfast", "oats"),
        (202, "Egg Muffins", "breakfast", "egg"),
        (203, "Tomato Soup", "soup", "tomato"),
        (204, "Caesar Salad", "salad", "lettuce"),
        (205, "Roast Chicken", "main course", "chicken"),
        (206, "Beef Stew", "main course", "beef"),
        (207, "Veggie Curry", "main course", "rice"),
    ];

    mount_search(
        &provider,
        dishes
            .iter()
            .map(|(id, title, _, ingredient)| stub(*id, title, &[ingredient], &[]))
            .collect(),
        1,
    )
    .await;
    for (id, title, dish_type, ingredient) in dishes {
        mount_detail(
            &provider,
            id,
            detail(id, title, &[ingredient, "salt"], &[dish_type]),
        )
        .await;
    }

    let app = create_test_app(&provider).await;
    let (name, value) = user_header(Uuid::new_v4());

    let response = app
        .server
        .post("/api/v1/meal-plans")
        .add_header(name.clone(), value.clone())
        .json(&json!({"ingredients": ["chicken", "rice", "egg"]}))
        .await;
    response.assert_status(StatusCode::CREATED);
    let plan: Value = response.json();
    assert_eq!(plan["entries"].as_array().map(Vec::len), Some(21));
    assert_eq!(plan["enhanced"], false);

    let response = app
        .server
        .get("/api/v1/meal-plans/current")
        .add_header(name.clone(), value.clone())
        .await;
    response.assert_status_ok();

    let response = app
        .server
        .post("/api/v1/shopping-list")
        .add_header(name, value)
        .json(&json!({"from_meal_plan": true}))
        .await;
    response.assert_status_ok();
    let list: Value = response.json();
    assert_eq!(list["recipe_count"], 7);
    let items: Vec<String> = serde_json::from_value(list["items"].clone()).unwrap();
    assert!(items.contains(&"salt".to_string()));
    assert_eq!(items.iter().filter(|i| *i == "salt").count(), 1);
}

#[tokio::test]
async fn test_current_meal_plan_not_found() {
    let provider = MockServer::start().await;
    let app = create_test_app(&provider).await;
    let (name, value) = user_header(Uuid::new_v4());

    let response = app
        .server
        .get("/api/v1/meal-plans/current")
        .add_header(name, value)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_shopping_list_consolidates_recipe_ingredients() {
    let provider = MockServer::start().await;
    mount_chicken_rice(&provider, 0).await;
    let app = create_test_app(&provider).await;

    let response = app
        .server
        .post("/api/v1/shopping-list")
        .json(&json!({"recipe_ids": [101, "102"]}))
        .await;
    response.assert_status_ok();
    let list: Value = response.json();
    assert_eq!(
        list["items"],
        json!(["chicken", "chicken breast", "egg", "rice", "soy sauce"])
    );
    assert_eq!(list["recipe_count"], 2);
    assert!(list.get("categorized").is_none());
}

#[tokio::test]
async fn test_shopping_list_requires_a_source() {
    let provider = MockServer::start().await;
    let app = create_test_app(&provider).await;

    let response = app
        .server
        .post("/api/v1/shopping-list")
        .json(&json!({}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_preferences_update_excludes_allergens_from_suggestions() {
    let provider = MockServer::start().await;
    mount_chicken_rice(&provider, 1).await;
    let app = create_test_app(&provider).await;
    let (name, value) = user_header(Uuid::new_v4());

    let response = app
        .server
        .put("/api/v1/preferences")
        .add_header(name.clone(), value.clone())
        .json(&json!({"allergies": [" Egg "]}))
        .await;
    response.assert_status_ok();
    let prefs: Value = response.json();
    assert_eq!(prefs["allergies"], json!(["egg"]));

    let response = app
        .server
        .get("/api/v1/preferences")
        .add_header(name.clone(), value.clone())
        .await;
    response.assert_status_ok();
    let prefs: Value = response.json();
    assert_eq!(prefs["allergies"], json!(["egg"]));

    let response = app
        .server
        .post("/api/v1/recipes/suggestions")
        .add_header(name, value)
        .json(&json!({"ingredients": ["chicken", "rice"], "count": 2}))
        .await;
    response.assert_status_ok();
    let suggestions: Value = response.json();
    assert_eq!(recipe_ids(&suggestions), BTreeSet::from([101]));
}

#[tokio::test]
async fn test_preferences_require_user_header() {
    let provider = MockServer::start().await;
    let app = create_test_app(&provider).await;

    let response = app
        .server
        .put("/api/v1/preferences")
        .json(&json!({"allergies": ["egg"]}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}
