//! End-to-end engine tests against mocked upstreams

use async_trait::async_trait;
use query_bridge::buffer::LogBuffer;
use query_bridge::cache::ResultCache;
use query_bridge::engine::executors::{RequestContext, SqlExecutor};
use query_bridge::engine::registry::SystemRegistry;
use query_bridge::engine::{EngineConfig, QueryEngine};
use query_bridge::error::EngineResult;
use query_bridge::logger::ExecutionLogger;
use query_bridge::models::{
    AuthConfig, CustomQuery, ExecuteRequest, ExecutionStatus, ExternalSystem, HealthCheckConfig,
    Protocol, QueryMethod, Visibility,
};
use query_bridge::store::MemoryStore;
use query_bridge::transform::{
    AggregationSpec, FilterOperator, FilterPredicate, MetricFunction, MetricSpec, SortKey,
    TransformConfig,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    store: Arc<MemoryStore>,
    logger: Arc<ExecutionLogger>,
    engine: QueryEngine,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let (tx, _) = broadcast::channel(64);
    let logger = Arc::new(ExecutionLogger::new(LogBuffer::new(1_000), tx));
    let engine = QueryEngine::new(
        Arc::new(SystemRegistry::new(store.clone())),
        store.clone(),
        Arc::new(ResultCache::new()),
        logger.clone(),
        EngineConfig::default(),
    )
    .unwrap();

    Harness {
        store,
        logger,
        engine,
    }
}

fn params(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn tracker(base_url: &str) -> ExternalSystem {
    let mut search = QueryMethod::new("search", Protocol::HttpGet, "/search");
    search.query_param = Some("jql".into());
    search.result_path = Some("data.issues".into());

    let mut system = ExternalSystem::new("Tracker", base_url);
    system.auth = AuthConfig::Bearer {
        token: Some("t-123".into()),
    };
    system.methods = vec![
        search,
        QueryMethod::new("gql", Protocol::GraphQl, "/graphql"),
        QueryMethod::new("warehouse", Protocol::Sql, ""),
    ];
    system
}

fn issues_response() -> Value {
    json!({"data": {"issues": [
        {"key": "OPS-1", "status": "open", "points": 3},
        {"key": "OPS-2", "status": "closed", "points": 5},
        {"key": "OPS-3", "status": "open", "points": 8}
    ]}})
}

async fn mount_search(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(header("authorization", "Bearer t-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(issues_response()))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_get_with_params_and_result_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("project", "OPS"))
        .and(query_param("jql", "project = OPS AND status = open"))
        .and(header("authorization", "Bearer t-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(issues_response()))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness();
    let system = tracker(&server.uri());
    let system_id = system.id;
    h.store.put_system(system);

    let mut request = ExecuteRequest::new(system_id, "project = {{project}} AND status = {{ status }}");
    request.parameters = params(json!({"project": "OPS", "status": "open"}));

    let result = h.engine.execute_query(&request, None).await;

    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.metadata.record_count, 3);
    assert_eq!(result.metadata.method.as_deref(), Some("search"));
    assert_eq!(result.metadata.system_name.as_deref(), Some("Tracker"));
    assert!(!result.metadata.cache_hit);
    assert_eq!(result.data.unwrap()[0]["key"], json!("OPS-1"));
}

#[tokio::test]
async fn test_cache_hit_then_force_refresh() {
    let server = MockServer::start().await;
    let before = json!({"data": {"issues": [{"key": "OPS-1", "status": "open", "points": 3}]}});
    let after = issues_response();
    // Serves the first fetch only, then falls through to the refreshed body
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(before))
        .up_to_n_times(1)
        .with_priority(2)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(after))
        .with_priority(3)
        .expect(1)
        .mount(&server)
        .await;

    let h = harness();
    let system = tracker(&server.uri());
    let system_id = system.id;
    h.store.put_system(system);

    let mut request = ExecuteRequest::new(system_id, "status = open");
    request.cache_ttl_secs = Some(60);

    let first = h.engine.execute_query(&request, None).await;
    let second = h.engine.execute_query(&request, None).await;
    assert!(!first.metadata.cache_hit);
    assert!(second.metadata.cache_hit);
    assert_eq!(first.data, second.data);
    assert_eq!(second.metadata.record_count, 1);

    request.force_refresh = true;
    let third = h.engine.execute_query(&request, None).await;
    assert!(third.success, "{:?}", third.error);
    assert!(!third.metadata.cache_hit);
    assert_eq!(third.metadata.record_count, 3);

    // The forced call replaced the stored entry
    request.force_refresh = false;
    let fourth = h.engine.execute_query(&request, None).await;
    assert!(fourth.metadata.cache_hit);
    assert_eq!(fourth.metadata.record_count, 3);
    assert_eq!(fourth.data, third.data);
    assert_ne!(fourth.data, first.data);

    // Different parameters never share an entry
    request.parameters = params(json!({"page": 2}));
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(issues_response()))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    let other = h.engine.execute_query(&request, None).await;
    assert!(!other.metadata.cache_hit);
}

fn with_open_only(mut system: ExternalSystem) -> ExternalSystem {
    system.transforms.insert(
        "open_only".into(),
        TransformConfig::Filter {
            conditions: vec![FilterPredicate::new(
                "status",
                FilterOperator::Equals,
                json!("open"),
            )],
        },
    );
    system
}

#[tokio::test]
async fn test_transforms_never_share_cached_results() {
    let server = MockServer::start().await;
    mount_search(&server, 4).await;

    let h = harness();
    let system = with_open_only(tracker(&server.uri()));
    let system_id = system.id;
    h.store.put_system(system);

    let owner = Uuid::new_v4();
    let mut filtered = saved_query(system_id, owner, Visibility::Public);
    filtered.transformations = vec!["open_only".into()];
    let plain = saved_query(system_id, owner, Visibility::Public);
    let (filtered_id, plain_id) = (filtered.id, plain.id);
    h.store.put_query(filtered);
    h.store.put_query(plain);

    let a = h.engine.execute_custom_query(filtered_id, None, false).await;
    assert!(a.success, "{:?}", a.error);
    assert_eq!(a.metadata.record_count, 2);
    assert_eq!(a.metadata.transformations_applied, vec!["open_only"]);

    let b = h.engine.execute_custom_query(plain_id, None, false).await;
    assert!(b.success, "{:?}", b.error);
    assert!(!b.metadata.cache_hit);
    assert_eq!(b.metadata.record_count, 3);
    assert!(b.metadata.transformations_applied.is_empty());

    let b_again = h.engine.execute_custom_query(plain_id, None, false).await;
    assert!(b_again.metadata.cache_hit);
    assert_eq!(b_again.metadata.record_count, 3);
    assert!(b_again.metadata.transformations_applied.is_empty());

    // Ad-hoc requests differing only in transforms
    let mut adhoc = ExecuteRequest::new(system_id, "status = open");
    adhoc.cache_ttl_secs = Some(60);
    adhoc.transformations = vec!["open_only".into()];
    let narrowed = h.engine.execute_query(&adhoc, None).await;
    assert_eq!(narrowed.metadata.record_count, 2);

    adhoc.transformations.clear();
    let raw = h.engine.execute_query(&adhoc, None).await;
    assert!(!raw.metadata.cache_hit);
    assert_eq!(raw.metadata.record_count, 3);
}

#[tokio::test]
async fn test_undeclared_method_is_validation_error() {
    let server = MockServer::start().await;
    mount_search(&server, 0).await;

    let h = harness();
    let system = tracker(&server.uri());
    let system_id = system.id;
    h.store.put_system(system);

    let mut request = ExecuteRequest::new(system_id, "anything");
    request.method = Some("delete_everything".into());

    let result = h.engine.execute_query(&request, None).await;
    assert!(!result.success);
    assert!(result.data.is_none());
    assert_eq!(result.error_kind(), Some("validation_error"));
    assert!(result.error.unwrap().message.contains("delete_everything"));
}

#[tokio::test]
async fn test_graphql_errors_fail_the_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_json(json!({
            "query": "{ issues(project: \"OPS\") { key } }",
            "variables": {"project": "OPS"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{"message": "Field 'issues' missing"}, {"message": "Unauthorized"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness();
    let system = tracker(&server.uri());
    let system_id = system.id;
    h.store.put_system(system);

    let mut request = ExecuteRequest::new(system_id, "{ issues(project: \"{{project}}\") { key } }");
    request.method = Some("gql".into());
    request.parameters = params(json!({"project": "OPS"}));

    let result = h.engine.execute_query(&request, None).await;
    assert_eq!(result.error_kind(), Some("graphql_error"));
    let message = result.error.unwrap().message;
    assert!(message.contains("Field 'issues' missing; Unauthorized"), "{}", message);
}

#[tokio::test]
async fn test_slow_upstream_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(issues_response())
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let h = harness();
    let system = tracker(&server.uri());
    let system_id = system.id;
    h.store.put_system(system);

    let mut request = ExecuteRequest::new(system_id, "status = open");
    request.timeout_ms = Some(50);

    let result = h.engine.execute_query(&request, None).await;
    assert_eq!(result.error_kind(), Some("timeout_error"));
    assert!(result.metadata.execution_time_ms < 500);
}

#[tokio::test]
async fn test_post_body_merges_defaults_params_and_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/search"))
        .and(header("x-api-key", "k-1"))
        .and(body_json(json!({
            "limit": 10,
            "filters": {"project": "OPS"},
            "jql": "project = OPS"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": [{"id": 1}]})))
        .expect(1)
        .mount(&server)
        .await;

    let mut post = QueryMethod::new("post_search", Protocol::Rest, "/api/search");
    post.query_field = Some("jql".into());
    post.params_field = Some("filters".into());
    post.default_payload = Some(params(json!({"limit": 10})));

    let mut system = ExternalSystem::new("Tracker", server.uri());
    system.auth = AuthConfig::ApiKey {
        key: Some("k-1".into()),
        header_name: None,
    };
    system.methods = vec![post];
    let system_id = system.id;

    let h = harness();
    h.store.put_system(system);

    let mut request = ExecuteRequest::new(system_id, "project = {{project}}");
    request.parameters = params(json!({"project": "OPS"}));

    let result = h.engine.execute_query(&request, None).await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.metadata.record_count, 1);
}

#[tokio::test]
async fn test_upstream_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let h = harness();
    let system = tracker(&server.uri());
    let system_id = system.id;
    h.store.put_system(system);

    let result = h
        .engine
        .execute_query(&ExecuteRequest::new(system_id, "x"), None)
        .await;
    assert_eq!(result.error_kind(), Some("upstream_error"));
    assert!(result.error.unwrap().message.contains("503"));
}

#[tokio::test]
async fn test_declared_transforms_run_in_request_order() {
    let server = MockServer::start().await;
    mount_search(&server, 1).await;

    let mut system = tracker(&server.uri());
    system.transforms.insert(
        "by_status".into(),
        TransformConfig::Aggregate(AggregationSpec {
            group_by: vec!["status".into()],
            metrics: vec![
                MetricSpec::new(MetricFunction::Count, None),
                MetricSpec::new(MetricFunction::Sum, Some("points")).with_alias("points"),
            ],
            sort: vec![SortKey::desc("points")],
            ..Default::default()
        }),
    );
    let system_id = system.id;

    let h = harness();
    h.store.put_system(system);

    let mut request = ExecuteRequest::new(system_id, "status = open");
    request.transformations = vec!["not_declared".into(), "by_status".into()];

    let result = h.engine.execute_query(&request, None).await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.metadata.transformations_applied, vec!["by_status"]);
    assert_eq!(result.metadata.record_count, 2);

    let data = result.data.unwrap();
    assert_eq!(data["metadata"]["original_count"], json!(3));
    assert_eq!(data["data"][0]["status"], json!("open"));
    assert_eq!(data["data"][0]["count"], json!(2));
    assert_eq!(data["data"][0]["points"], json!(11));
}

#[tokio::test]
async fn test_sql_method_is_configuration_error() {
    let h = harness();
    let system = tracker("http://127.0.0.1:9");
    let system_id = system.id;
    h.store.put_system(system);

    let mut request = ExecuteRequest::new(system_id, "SELECT 1");
    request.method = Some("warehouse".into());

    let result = h.engine.execute_query(&request, None).await;
    assert_eq!(result.error_kind(), Some("configuration_error"));
}

struct RowsSql;

#[async_trait]
impl SqlExecutor for RowsSql {
    async fn execute(&self, ctx: &RequestContext<'_>) -> EngineResult<Value> {
        Ok(json!({"rows": [{"sql": ctx.query}], "results": [{"n": 1}, {"n": 2}]}))
    }
}

#[tokio::test]
async fn test_injected_sql_executor() {
    let h = harness();
    let engine = h.engine.with_sql_executor(Arc::new(RowsSql));
    let system = tracker("http://127.0.0.1:9");
    let system_id = system.id;
    h.store.put_system(system);

    let mut request = ExecuteRequest::new(system_id, "SELECT * FROM t WHERE id = {{id}}");
    request.method = Some("warehouse".into());
    request.parameters = params(json!({"id": 7}));

    let result = engine.execute_query(&request, None).await;
    assert!(result.success, "{:?}", result.error);
    assert_eq!(result.metadata.record_count, 2);
    assert_eq!(
        result.data.unwrap()["rows"][0]["sql"],
        json!("SELECT * FROM t WHERE id = 7")
    );
}

#[tokio::test]
async fn test_inactive_and_unknown_systems() {
    let h = harness();
    let mut system = tracker("http://127.0.0.1:9");
    system.is_active = false;
    let system_id = system.id;
    h.store.put_system(system);

    let inactive = h
        .engine
        .execute_query(&ExecuteRequest::new(system_id, "x"), None)
        .await;
    assert_eq!(inactive.error_kind(), Some("system_inactive_error"));

    let unknown = h
        .engine
        .execute_query(&ExecuteRequest::new(Uuid::new_v4(), "x"), None)
        .await;
    assert_eq!(unknown.error_kind(), Some("not_found"));
}

#[tokio::test]
async fn test_missing_credentials_are_authentication_errors() {
    let h = harness();
    let mut system = tracker("http://127.0.0.1:9");
    system.auth = AuthConfig::Bearer { token: None };
    let system_id = system.id;
    h.store.put_system(system);

    let result = h
        .engine
        .execute_query(&ExecuteRequest::new(system_id, "x"), None)
        .await;
    assert_eq!(result.error_kind(), Some("authentication_error"));
}

fn saved_query(system_id: Uuid, owner_id: Uuid, visibility: Visibility) -> CustomQuery {
    CustomQuery {
        id: Uuid::new_v4(),
        owner_id,
        system_id,
        method: Some("search".into()),
        query_text: "status = open".into(),
        parameters: Map::new(),
        transformations: vec![],
        refresh_interval_secs: 300,
        cache_enabled: true,
        visibility,
        tags: vec!["ops".into()],
        is_active: true,
    }
}

#[tokio::test]
async fn test_private_query_only_runs_for_owner() {
    let server = MockServer::start().await;
    mount_search(&server, 1).await;

    let h = harness();
    let system = tracker(&server.uri());
    let system_id = system.id;
    h.store.put_system(system);

    let owner = Uuid::new_v4();
    let query = saved_query(system_id, owner, Visibility::Private);
    let query_id = query.id;
    h.store.put_query(query);

    let stranger = h
        .engine
        .execute_custom_query(query_id, Some(Uuid::new_v4()), false)
        .await;
    assert_eq!(stranger.error_kind(), Some("access_denied"));

    let anonymous = h.engine.execute_custom_query(query_id, None, false).await;
    assert_eq!(anonymous.error_kind(), Some("access_denied"));

    let mine = h.engine.execute_custom_query(query_id, Some(owner), false).await;
    assert!(mine.success, "{:?}", mine.error);

    let missing = h
        .engine
        .execute_custom_query(Uuid::new_v4(), Some(owner), false)
        .await;
    assert_eq!(missing.error_kind(), Some("not_found"));
}

#[tokio::test]
async fn test_refused_saved_queries_are_logged() {
    let h = harness();
    let system = tracker("http://127.0.0.1:9");
    let system_id = system.id;
    h.store.put_system(system);

    let owner = Uuid::new_v4();
    let private = saved_query(system_id, owner, Visibility::Private);
    let mut retired = saved_query(system_id, owner, Visibility::Public);
    retired.is_active = false;
    let (private_id, retired_id) = (private.id, retired.id);
    h.store.put_query(private);
    h.store.put_query(retired);

    let stranger = Uuid::new_v4();
    let denied = h
        .engine
        .execute_custom_query(private_id, Some(stranger), false)
        .await;
    assert_eq!(denied.error_kind(), Some("access_denied"));
    let inactive = h.engine.execute_custom_query(retired_id, Some(owner), false).await;
    assert_eq!(inactive.error_kind(), Some("validation_error"));

    // Unknown ids have no system to attribute the attempt to
    h.engine
        .execute_custom_query(Uuid::new_v4(), Some(owner), false)
        .await;

    assert_eq!(h.logger.stats().failed, 2);
    assert_eq!(h.logger.buffer().len(), 2);
    assert_eq!(h.logger.flush(h.store.as_ref(), 100).await, 2);

    let logs = h.store.logs();
    assert!(logs.iter().all(|l| l.status == ExecutionStatus::Failed));
    assert!(logs.iter().all(|l| l.system_id == system_id));
    assert_eq!(logs[0].query_id, Some(private_id));
    assert_eq!(logs[0].user_id, Some(stranger));
    assert!(logs[0].error_message.as_deref().unwrap().contains("private"));
    assert_eq!(logs[1].query_id, Some(retired_id));
    assert!(logs[1].error_message.as_deref().unwrap().contains("deactivated"));
}

#[tokio::test]
async fn test_invalidate_query_forces_fresh_execution() {
    let server = MockServer::start().await;
    mount_search(&server, 2).await;

    let h = harness();
    let system = tracker(&server.uri());
    let system_id = system.id;
    h.store.put_system(system);

    let query = saved_query(system_id, Uuid::new_v4(), Visibility::Public);
    let query_id = query.id;
    h.store.put_query(query);

    let first = h.engine.execute_custom_query(query_id, None, false).await;
    let cached = h.engine.execute_custom_query(query_id, None, false).await;
    assert!(!first.metadata.cache_hit);
    assert!(cached.metadata.cache_hit);

    assert_eq!(h.engine.invalidate_query(query_id), 1);

    let fresh = h.engine.execute_custom_query(query_id, None, false).await;
    assert!(fresh.success);
    assert!(!fresh.metadata.cache_hit);

    // Deleted queries are rejected before the cache is consulted
    h.store.remove_query(query_id);
    h.engine.invalidate_query(query_id);
    let deleted = h.engine.execute_custom_query(query_id, None, false).await;
    assert_eq!(deleted.error_kind(), Some("not_found"));
}

#[tokio::test]
async fn test_clear_cache_drops_results_and_config() {
    let server = MockServer::start().await;
    mount_search(&server, 2).await;

    let h = harness();
    let system = tracker(&server.uri());
    let system_id = system.id;
    h.store.put_system(system);

    let mut request = ExecuteRequest::new(system_id, "status = open");
    request.cache_ttl_secs = Some(60);

    h.engine.execute_query(&request, None).await;
    assert_eq!(h.engine.registry().len(), 1);
    assert_eq!(h.engine.cache().len(), 1);

    h.engine.clear_cache(Some(system_id));
    assert!(h.engine.registry().is_empty());
    assert!(h.engine.cache().is_empty());

    let again = h.engine.execute_query(&request, None).await;
    assert!(!again.metadata.cache_hit);
}

#[tokio::test]
async fn test_every_attempt_is_logged() {
    let server = MockServer::start().await;
    mount_search(&server, 1).await;

    let h = harness();
    let system = tracker(&server.uri());
    let system_id = system.id;
    h.store.put_system(system);

    let user = Uuid::new_v4();
    let mut request = ExecuteRequest::new(system_id, "status = open");
    request.cache_ttl_secs = Some(60);

    h.engine.execute_query(&request, Some(user)).await;
    h.engine.execute_query(&request, Some(user)).await;

    let mut bad = request.clone();
    bad.method = Some("nope".into());
    h.engine.execute_query(&bad, Some(user)).await;

    assert_eq!(h.logger.flush(h.store.as_ref(), 100).await, 3);

    let logs = h.store.logs();
    let statuses: Vec<ExecutionStatus> = logs.iter().map(|l| l.status).collect();
    assert_eq!(
        statuses,
        vec![
            ExecutionStatus::Completed,
            ExecutionStatus::Cached,
            ExecutionStatus::Failed
        ]
    );
    assert!(logs.iter().all(|l| l.user_id == Some(user) && l.system_id == system_id));
    assert_eq!(logs[0].record_count, 3);
    assert!(logs[0].result_snapshot.is_some());
    assert!(logs[2].error_message.as_deref().unwrap().contains("nope"));
}

#[tokio::test]
async fn test_connection_checks_health_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/status"))
        .and(header("authorization", "Bearer t-123"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let h = harness();
    let mut up = tracker(&server.uri());
    up.health_check = Some(HealthCheckConfig {
        endpoint: Some("/status".into()),
        method: None,
        expected_status: None,
        timeout_ms: None,
    });
    let up_id = up.id;

    let mut down = tracker(&server.uri());
    down.health_check = Some(HealthCheckConfig {
        endpoint: Some("/down".into()),
        method: Some("GET".into()),
        expected_status: Some(200),
        timeout_ms: Some(2_000),
    });
    let down_id = down.id;

    h.store.put_system(up);
    h.store.put_system(down);

    let ok = h.engine.test_connection(up_id).await;
    assert!(ok.success, "{}", ok.message);
    assert_eq!(ok.details["status_code"], json!(200));

    let failed = h.engine.test_connection(down_id).await;
    assert!(!failed.success);
    assert_eq!(failed.details["status_code"], json!(503));

    let unknown = h.engine.test_connection(Uuid::new_v4()).await;
    assert!(!unknown.success);
    assert_eq!(unknown.details["kind"], json!("not_found"));
}
