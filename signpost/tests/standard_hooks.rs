use pretty_assertions::assert_eq;
use signpost::{
    FailureKind, Gateway, HookRegistry, RouteDefinition, SpawnEvent,
    testing::{CallLog, MockClientFactory, MockLabClient, RecordingHook, SlowHook},
};
use std::{sync::Arc, time::Duration};

mod common;
use common::{mapping, settings, standard_gateway};

fn github_route() -> RouteDefinition {
    RouteDefinition::new(
        "/notebooks/github.com/",
        "${base_url}/nb/user/${user}/lab/tree/notebooks/on-demand/github.com/${path}.ipynb",
    )
    .with_hooks(["ensure_autostart_lab", "github_notebook"])
}

fn system_test_route() -> RouteDefinition {
    RouteDefinition::new(
        "/system-test/",
        "${base_url}/nb/user/${user}/lab/tree/notebooks/on-demand/system-test/${path}.ipynb",
    )
    .with_hooks(["ensure_running_lab", "system_test"])
}

#[tokio::test]
async fn test_github_notebook_after_spawning_lab() {
    let client = Arc::new(
        MockLabClient::new()
            .stopped(true)
            .spawn_events(vec![SpawnEvent {
                message: "ready".to_string(),
                ready: true,
            }])
            .python_output("1\n"),
    );
    let gateway = standard_gateway(vec![github_route()], client.clone());

    let redirect = gateway
        .resolve_for(
            "/notebooks/github.com/lsst/tutorial-notebooks/DP02_01.ipynb@main",
            "rachel",
            "token",
        )
        .await
        .unwrap();

    assert_eq!(
        redirect.location,
        "https://rsp.example.org/nb/user/rachel/lab/tree/notebooks/on-demand/github.com/lsst/tutorial-notebooks/DP02_01-1.ipynb"
    );
    assert_eq!(redirect.unique_id.as_deref(), Some("1"));
    assert_eq!(
        client.calls(),
        vec![
            "auth_to_hub",
            "is_lab_stopped",
            "spawn_lab",
            "spawn_progress",
            "auth_to_hub",
            "auth_to_lab",
            "run_python",
        ]
    );
    assert!(client.scripts()[0].contains("github.com/lsst/tutorial-notebooks/DP02_01@main"));
}

#[tokio::test]
async fn test_github_notebook_rejects_foreign_owner() {
    let client = Arc::new(MockLabClient::new());
    let gateway = standard_gateway(vec![github_route()], client.clone());

    let err = gateway
        .resolve_for("/notebooks/github.com/evil/repo/nb", "rachel", "token")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::HookFailure);
    assert_eq!(err.hook(), Some("github_notebook"));
    assert!(client.scripts().is_empty());
}

#[tokio::test]
async fn test_system_test_serial_flows_into_redirect() {
    let client = Arc::new(MockLabClient::new().python_output("4\n"));
    let gateway = standard_gateway(vec![system_test_route()], client);

    let redirect = gateway
        .resolve_for("/system-test/Firefly", "rachel", "token")
        .await
        .unwrap();
    assert_eq!(
        redirect.location,
        "https://rsp.example.org/nb/user/rachel/lab/tree/notebooks/on-demand/system-test/Firefly-4.ipynb"
    );
}

#[tokio::test]
async fn test_portal_query_failure_stops_redirect() {
    let client = Arc::new(MockLabClient::new().head_status(404).post_status(500));
    let gateway = standard_gateway(
        vec![
            RouteDefinition::new("/queries/", "${base_url}/nb/user/${user}/lab/tree/queries/portal_${path}.ipynb")
                .with_hooks(["ensure_running_lab", "portal_query"]),
        ],
        client.clone(),
    );

    let err = gateway
        .resolve_for("/queries/q42", "rachel", "token")
        .await
        .unwrap_err();
    assert_eq!(err.hook(), Some("portal_query"));
    assert_eq!(client.posts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_configured_hook_timeout_applies() {
    let registry = HookRegistry::builder()
        .register("sluggish", SlowHook::new(Duration::from_secs(120)))
        .build();
    let gateway = Gateway::from_parts(
        signpost::Settings {
            hook_timeout_secs: 5,
            ..settings()
        },
        registry,
        &mapping(vec![RouteDefinition::new("/slow/", "${base_url}/${path}").with_hooks(["sluggish"])]),
        Arc::new(MockClientFactory::new(Arc::new(MockLabClient::new()))),
    )
    .unwrap_or_else(|e| panic!("{e}"));

    let err = gateway.resolve_for("/slow/x", "rachel", "token").await.unwrap_err();
    assert_eq!(err.to_string(), "hook `sluggish` failed: hook timed out after 5s");
}

#[tokio::test]
async fn test_rejected_token_is_upstream_unavailable() {
    let log = CallLog::new();
    let recorder = RecordingHook::new("recorder", log.clone());
    let registry = HookRegistry::builder()
        .register("recorder", recorder.clone())
        .build();
    let gateway = Gateway::from_parts(
        settings(),
        registry,
        &mapping(vec![RouteDefinition::new("/tutorials/", common::TUTORIAL_TARGET).with_hooks(["recorder"])]),
        Arc::new(MockClientFactory::rejecting()),
    )
    .unwrap_or_else(|e| panic!("{e}"));

    let err = gateway
        .resolve_for("/tutorials/intro", "rachel", "bad-token")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::UpstreamUnavailable);
    assert_eq!(err.kind().status_code(), 502);
    assert_eq!(recorder.count(), 0);
    assert!(log.entries().is_empty());
}

#[tokio::test]
async fn test_stopped_lab_is_sent_to_spawner_before_checkout() {
    let client = Arc::new(MockLabClient::new().stopped(true));
    let gateway = standard_gateway(
        vec![
            RouteDefinition::new(
                "/notebooks/github.com/",
                "${base_url}/nb/user/${user}/lab/tree/notebooks/on-demand/github.com/${path}.ipynb",
            )
            .with_hooks(["signpost.hooks.ensure_running_lab", "github_notebook"]),
        ],
        client.clone(),
    );

    let redirect = gateway
        .resolve_for("/notebooks/github.com/lsst/tutorial-notebooks/DP02_01", "rachel", "token")
        .await
        .unwrap();

    assert_eq!(
        redirect.location,
        "https://rsp.example.org/nb/user/rachel/rubin/ghostwriter/notebooks/github.com/lsst/tutorial-notebooks/DP02_01"
    );
    assert_eq!(redirect.unique_id, None);
    assert_eq!(client.calls(), vec!["auth_to_hub", "is_lab_stopped"]);
    assert!(client.scripts().is_empty());
}
