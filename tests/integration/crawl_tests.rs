use crawl_agent::config::{parse_config, Config};
use crawl_agent::crawler::{
    build_http_client, crawl_one_person, import_listing, CrawlContext, HttpFetcher,
    PersonOutcome, Scheduler,
};
use crawl_agent::rpc::HttpCoordinator;
use crawl_agent::storage::{load_list, load_optional};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a configuration where the mock server plays every remote role
fn create_test_config(server: &MockServer, dir: &Path) -> Config {
    let uri = server.uri();
    let toml = format!(
        r#"
[coordinator]
server-addr = "{uri}"

[crawler]
entries-per-loop = 10
rest-seconds = 0
max-loops = 1
fetch-timeout-secs = 5

[fetcher]
doc-service = "{uri}"
github-api = "{uri}"
bitbucket-api = "{uri}"

[black-packages]
enabled = true
filename = "{black}"

[fast-mode]
enabled = true
filename = "{pushed}"

[import]
listing-url = "{uri}/packages"
chunk-size = 2
appended-file = "{appended}"
"#,
        uri = uri,
        black = dir.join("black_pkgs.json").display(),
        pushed = dir.join("pushed_pkgs.json").display(),
        appended = dir.join("appended_pkgs.json").display(),
    );
    parse_config(&toml).unwrap()
}

fn context(config: &Config) -> (reqwest::Client, Arc<HttpCoordinator>, CrawlContext) {
    let client = build_http_client(config).unwrap();
    let coordinator = Arc::new(HttpCoordinator::new(
        client.clone(),
        &config.coordinator.server_addr,
    ));
    let fetcher = Arc::new(HttpFetcher::new(client.clone(), &config.fetcher));
    let ctx = CrawlContext::new(coordinator.clone(), fetcher, config.crawler.fetch_timeout())
        .with_blacklist(load_optional(config.blacklist_file()))
        .with_seen(load_optional(config.pushed_file()));
    (client, coordinator, ctx)
}

async fn mount_rpc(server: &MockServer, call: &str, result: serde_json::Value, times: u64) {
    Mock::given(method("POST"))
        .and(path(format!("/rpc/{}", call)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": result })))
        .expect(times)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_cycle_with_bad_package() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    mount_rpc(&server, "FetchPackageList", json!(["a.com/x", "b.com/y"]), 1).await;
    mount_rpc(&server, "FetchPersonList", json!(["github.com:me"]), 1).await;
    mount_rpc(&server, "PushPackage", json!(null), 1).await;
    mount_rpc(&server, "PushPerson", json!({"NewPackage": false}), 1).await;

    Mock::given(method("POST"))
        .and(path("/rpc/ReportBadPackage"))
        .and(body_json(json!({"Path": "a.com/x"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": null})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/package"))
        .and(query_param("path", "a.com/x"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/package"))
        .and(query_param("path", "b.com/y"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "y",
            "import_path": "b.com/y",
            "synopsis": "Package y does things.",
            "imports": ["fmt"]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/users/me/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"full_name": "me/proj"}])))
        .mount(&server)
        .await;

    let (_client, _coordinator, ctx) = context(&config);
    let summary = Scheduler::new(Arc::new(ctx), &config.crawler).run().await;

    assert_eq!(summary.cycles, 1);
    assert_eq!(summary.rests, 1);
    assert_eq!(summary.report.packages_pushed, 1);
    assert_eq!(summary.report.persons_pushed, 1);
    assert_eq!(summary.report.bad_packages, 1);

    let blacklist = load_list(&dir.path().join("black_pkgs.json")).unwrap();
    assert_eq!(blacklist, vec!["a.com/x".to_string()]);

    let pushed = load_list(&dir.path().join("pushed_pkgs.json")).unwrap();
    assert_eq!(pushed, vec!["b.com/y".to_string()]);
}

#[tokio::test]
async fn test_unreachable_coordinator_rests_and_stops() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let (_client, _coordinator, ctx) = context(&config);
    let summary = Scheduler::new(Arc::new(ctx), &config.crawler).run().await;

    assert_eq!(summary.cycles, 1);
    assert_eq!(summary.rests, 1);
    assert!(!dir.path().join("black_pkgs.json").exists());
}

#[tokio::test]
async fn test_person_command_against_bitbucket() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    Mock::given(method("GET"))
        .and(path("/repositories/team"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{"full_name": "team/a"}, {"full_name": "team/b"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rpc/PushPerson"))
        .and(body_json(json!({
            "Id": "bitbucket.org:team",
            "Packages": ["bitbucket.org/team/a", "bitbucket.org/team/b"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": {"NewPackage": true}})))
        .expect(1)
        .mount(&server)
        .await;

    let (_client, _coordinator, ctx) = context(&config);
    let outcome = crawl_one_person(&ctx, "bitbucket.org:team").await.unwrap();
    assert_eq!(outcome, PersonOutcome::Pushed { new_package: true });
}

#[tokio::test]
async fn test_import_skips_blacklisted_and_records_appended() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("black_pkgs.json"), r#"["a.com/bad"]"#).unwrap();
    let config = create_test_config(&server, dir.path());

    Mock::given(method("GET"))
        .and(path("/packages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"path": "a.com/bad"},
                {"path": "a.com/x"},
                {"path": "b.com/y"},
                {"path": "c.com/z"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rpc/AppendPackages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 1})))
        .expect(2)
        .mount(&server)
        .await;

    let (client, coordinator, ctx) = context(&config);
    let appended = load_optional(config.appended_file());
    let summary = import_listing(
        &client,
        coordinator.as_ref(),
        &config.import,
        ctx.blacklist.as_deref(),
        appended.as_deref(),
    )
    .await
    .unwrap();

    assert_eq!(summary.listed, 4);
    assert_eq!(summary.selected, 3);
    assert_eq!(summary.appended, 3);
    assert_eq!(summary.new_packages, 2);
    assert!(summary.completed);

    let recorded = load_list(&dir.path().join("appended_pkgs.json")).unwrap();
    assert_eq!(
        recorded,
        vec!["a.com/x".to_string(), "b.com/y".to_string(), "c.com/z".to_string()]
    );
    assert!(!dir.path().join("pushed_pkgs.json").exists());
}

#[tokio::test]
async fn test_imported_package_is_crawled_in_fast_mode() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    Mock::given(method("GET"))
        .and(path("/packages"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"results": [{"path": "a.com/new"}]})),
        )
        .mount(&server)
        .await;
    mount_rpc(&server, "AppendPackages", json!(1), 1).await;
    mount_rpc(&server, "FetchPackageList", json!(["a.com/new"]), 1).await;
    mount_rpc(&server, "FetchPersonList", json!([]), 1).await;
    mount_rpc(&server, "PushPackage", json!(null), 1).await;
    Mock::given(method("GET"))
        .and(path("/package"))
        .and(query_param("path", "a.com/new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "new",
            "import_path": "a.com/new"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (client, coordinator, ctx) = context(&config);
    let appended = load_optional(config.appended_file());
    let imported = import_listing(
        &client,
        coordinator.as_ref(),
        &config.import,
        ctx.blacklist.as_deref(),
        appended.as_deref(),
    )
    .await
    .unwrap();
    assert_eq!(imported.appended, 1);

    let summary = Scheduler::new(Arc::new(ctx), &config.crawler).run().await;
    assert_eq!(summary.report.packages_pushed, 1);

    let pushed = load_list(&dir.path().join("pushed_pkgs.json")).unwrap();
    assert_eq!(pushed, vec!["a.com/new".to_string()]);
}
