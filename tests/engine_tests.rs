// ABOUTME: Integration tests for the entrypoint run engine
// ABOUTME: Tests the inline render pass, the concurrent file pass and the assembled handoff

use serial_test::serial;
use std::path::PathBuf;
use std::sync::Arc;

use entrypoint::engine::{render_inline, EntrypointError, ErrorKind, TemplateScheduler};
use entrypoint::resolver::load_vars_document;
use entrypoint::{Config, Entrypoint, MissingKeyPolicy, TemplateContext, TemplateEngine, VariableSnapshot};

mod common;
use common::{empty_providers, providers, FakeObjects, FakeSecrets, TestEnvironment};

fn snapshot(pairs: &[(&str, &str)]) -> VariableSnapshot {
    VariableSnapshot::from_pairs(pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())))
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_greeting_end_to_end() {
    let env = TestEnvironment::new();
    env.write("a.conf.tmpl", "Value: {{EnvVars.E2E_GREETING}}\n");

    let snapshot = snapshot(&[
        ("E2E_GREETING", "{{upper \"hello\"}}"),
        ("ENTRYPOINT_TEMPLATES", &env.template_list(&["a.conf.tmpl"])),
        ("PATH", "/usr/bin:/bin"),
    ]);
    let config = Config::from_snapshot(&snapshot).unwrap();
    let entrypoint = Entrypoint::new(config, snapshot, empty_providers());

    let handoff = entrypoint
        .prepare(PathBuf::from("/usr/bin/env"), vec!["env".to_string()])
        .await
        .unwrap();

    assert_eq!(handoff.env.get("E2E_GREETING").map(String::as_str), Some("HELLO"));
    assert!(handoff.env_list().contains(&"E2E_GREETING=HELLO".to_string()));
    assert!(!handoff.env.contains_key("ENTRYPOINT_TEMPLATES"));
    assert_eq!(handoff.args, vec!["env"]);
    assert_eq!(env.read("a.conf"), "Value: HELLO\n");

    assert_eq!(std::env::var("E2E_GREETING").unwrap(), "HELLO");
    std::env::remove_var("E2E_GREETING");
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_vars_document_feeds_both_passes() {
    let env = TestEnvironment::new();
    let vars_file = env.write(
        "vars.yml",
        "{{EnvVars.STAGE}}:\n  web:\n    db: {{EnvVars.STAGE}}-db1\n",
    );
    env.write(
        "db.ini.tpl",
        "host = {{#with (lookup Vars EnvVars.STAGE)}}{{web.db}}{{/with}}\npassword = {{EnvVars.VARS_DB_PASSWORD}}\n",
    );

    let snapshot = snapshot(&[
        ("STAGE", "staging"),
        ("VARS_DB_URL", "{{Vars.staging.web.db}}"),
        ("VARS_DB_PASSWORD", "{{getSecret \"staging/db\"}}"),
        ("ENTRYPOINT_VARS_FILE", vars_file.to_str().unwrap()),
        ("ENTRYPOINT_TEMPLATES", &env.template_list(&["db.ini.tpl"])),
    ]);
    let config = Config::from_snapshot(&snapshot).unwrap();
    let secrets = FakeSecrets::default().with("staging/db", "s3cr3t");
    let entrypoint = Entrypoint::new(config, snapshot, providers(secrets, FakeObjects::default()));

    let handoff = entrypoint
        .prepare(PathBuf::from("/bin/sh"), vec!["sh".to_string()])
        .await
        .unwrap();

    assert_eq!(handoff.env["VARS_DB_URL"], "staging-db1");
    assert_eq!(handoff.env["VARS_DB_PASSWORD"], "s3cr3t");
    assert!(!handoff.env.contains_key("ENTRYPOINT_VARS_FILE"));
    assert_eq!(env.read("db.ini"), "host = staging-db1\npassword = s3cr3t\n");

    std::env::remove_var("VARS_DB_URL");
    std::env::remove_var("VARS_DB_PASSWORD");
}

#[tokio::test(flavor = "multi_thread")]
#[serial]
async fn test_control_variables_visible_to_both_passes() {
    let env = TestEnvironment::new();
    env.write("policy.conf.tmpl", "policy={{EnvVars.ENTRYPOINT_TMPL_OPTION}}\n");

    let snapshot = snapshot(&[
        ("CONTROL_POLICY", "{{EnvVars.ENTRYPOINT_TMPL_OPTION}}"),
        ("ENTRYPOINT_TMPL_OPTION", "error"),
        ("ENTRYPOINT_TEMPLATES", &env.template_list(&["policy.conf.tmpl"])),
    ]);
    let config = Config::from_snapshot(&snapshot).unwrap();
    let entrypoint = Entrypoint::new(config, snapshot, empty_providers());

    let handoff = entrypoint
        .prepare(PathBuf::from("/bin/true"), vec!["true".to_string()])
        .await
        .unwrap();

    assert_eq!(handoff.env["CONTROL_POLICY"], "error");
    assert_eq!(env.read("policy.conf"), "policy=error\n");
    assert!(!handoff.env.contains_key("ENTRYPOINT_TMPL_OPTION"));
    assert!(!handoff.env.contains_key("ENTRYPOINT_TEMPLATES"));

    std::env::remove_var("CONTROL_POLICY");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_go_style_syntax_is_a_render_error() {
    let snapshot = snapshot(&[("PIPELINE", "{{ \"hello\" | upper }}")]);
    let config = Config::from_snapshot(&snapshot).unwrap();
    let entrypoint = Entrypoint::new(config, snapshot, empty_providers());

    let err = entrypoint
        .prepare(PathBuf::from("/bin/true"), vec!["true".to_string()])
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Render);
    assert_eq!(err.exit_code(), 5);
    assert!(err.to_string().contains("environment variable PIPELINE"), "{}", err);
    assert!(err.to_string().contains("parse"), "{}", err);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_vars_document_from_object_store() {
    let snapshot = snapshot(&[
        ("ENTRYPOINT_VARS_FILE", "s3://config-bucket/app/vars.yml"),
        ("BASE", "2"),
    ]);
    let config = Config::from_snapshot(&snapshot).unwrap();
    let objects = FakeObjects::default().with(
        "config-bucket",
        "app/vars.yml",
        "replicas: {{add EnvVars.BASE 1}}\nregion: {{getRegion}}\n",
    );
    let providers = providers(FakeSecrets::default(), objects);
    let engine = Arc::new(TemplateEngine::new(config.missing_key, &providers));

    let document = load_vars_document(
        config.vars_location.as_ref().unwrap(),
        engine,
        &snapshot,
        &providers,
    )
    .await
    .unwrap();

    assert_eq!(document.value()["replicas"], 3);
    assert_eq!(document.value()["region"], "us-west-2");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_object_is_a_fetch_error() {
    let snapshot = snapshot(&[("ENTRYPOINT_VARS_FILE", "s3://config-bucket/missing.yml")]);
    let config = Config::from_snapshot(&snapshot).unwrap();
    let entrypoint = Entrypoint::new(config, snapshot, empty_providers());

    let err = entrypoint
        .prepare(PathBuf::from("/bin/sh"), vec!["sh".to_string()])
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Fetch);
    assert_eq!(err.exit_code(), 3);
    assert!(err.to_string().contains("s3://config-bucket/missing.yml"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_local_vars_file_is_a_fetch_error() {
    let env = TestEnvironment::new();
    let missing = env.path("nope.yml");
    let snapshot = snapshot(&[("ENTRYPOINT_VARS_FILE", missing.to_str().unwrap())]);
    let config = Config::from_snapshot(&snapshot).unwrap();
    let entrypoint = Entrypoint::new(config, snapshot, empty_providers());

    let err = entrypoint
        .prepare(PathBuf::from("/bin/sh"), vec!["sh".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, EntrypointError::VarsFileRead { .. }));
    assert_eq!(err.exit_code(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_malformed_vars_document_is_a_parse_error() {
    let env = TestEnvironment::new();
    let vars_file = env.write("vars.yml", "key: [unclosed\n");
    let snapshot = snapshot(&[("ENTRYPOINT_VARS_FILE", vars_file.to_str().unwrap())]);
    let config = Config::from_snapshot(&snapshot).unwrap();
    let entrypoint = Entrypoint::new(config, snapshot, empty_providers());

    let err = entrypoint
        .prepare(PathBuf::from("/bin/sh"), vec!["sh".to_string()])
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert_eq!(err.exit_code(), 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_inline_candidates_see_the_same_snapshot() {
    let snapshot = snapshot(&[
        ("FIRST", "{{EnvVars.SECOND}}"),
        ("SECOND", "{{upper \"x\"}}"),
        ("MIXED", "prefix {{upper \"x\"}}"),
        ("ENTRYPOINT_LOG_LEVEL", "{{upper \"debug\"}}"),
    ]);
    let engine = TemplateEngine::new(MissingKeyPolicy::Error, &empty_providers());

    let outcome = tokio::task::spawn_blocking(move || render_inline(&engine, &snapshot, None))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(outcome.environment["SECOND"], "X");
    assert_eq!(outcome.environment["FIRST"], "{{upper \"x\"}}");
    assert_eq!(outcome.environment["MIXED"], "prefix {{upper \"x\"}}");
    assert!(!outcome.environment.contains_key("ENTRYPOINT_LOG_LEVEL"));
    assert_eq!(outcome.rendered, vec!["FIRST", "SECOND"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_inline_failure_names_the_variable() {
    let snapshot = snapshot(&[("BROKEN", "{{EnvVars.NOT_SET}}")]);
    let engine = TemplateEngine::new(MissingKeyPolicy::Error, &empty_providers());

    let err = tokio::task::spawn_blocking(move || render_inline(&engine, &snapshot, None))
        .await
        .unwrap()
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Render);
    assert!(err.to_string().contains("environment variable BROKEN"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_inline_missing_key_placeholder() {
    let snapshot = snapshot(&[("OPTIONAL", "{{EnvVars.NOT_SET}}")]);
    let engine = TemplateEngine::new(MissingKeyPolicy::Default, &empty_providers());

    let outcome = tokio::task::spawn_blocking(move || render_inline(&engine, &snapshot, None))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outcome.environment["OPTIONAL"], "<no value>");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_file_pass_renders_every_template() {
    let env = TestEnvironment::new();
    let templates: Vec<PathBuf> = (0..16)
        .map(|i| env.write(&format!("conf{}.cfg.tmpl", i), &format!("id={} greeting={{{{EnvVars.GREETING}}}}\n", i)))
        .collect();

    let engine = Arc::new(TemplateEngine::new(MissingKeyPolicy::Error, &empty_providers()));
    let context = Arc::new(TemplateContext::new(
        [("GREETING".to_string(), "hi".to_string())].into_iter().collect(),
    ));

    let outputs = TemplateScheduler::new(engine)
        .render_all(&templates, context)
        .await
        .unwrap();

    assert_eq!(outputs.len(), 16);
    for i in 0..16 {
        assert_eq!(env.read(&format!("conf{}.cfg", i)), format!("id={} greeting=hi\n", i));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_file_pass_failure_does_not_cancel_siblings() {
    let env = TestEnvironment::new();
    let good_a = env.write("a.conf.tmpl", "a={{EnvVars.GREETING}}");
    let bad = env.write("bad.conf.tmpl", "bad={{EnvVars.MISSING}}");
    let good_b = env.write("b.conf.tpl", "b={{upper EnvVars.GREETING}}");
    env.write("bad.conf", "previous");

    let engine = Arc::new(TemplateEngine::new(MissingKeyPolicy::Error, &empty_providers()));
    let context = Arc::new(TemplateContext::new(
        [("GREETING".to_string(), "hi".to_string())].into_iter().collect(),
    ));

    let err = TemplateScheduler::new(engine)
        .render_all(&[good_a, bad.clone(), good_b], context)
        .await
        .unwrap_err();

    match &err {
        EntrypointError::TemplatePass { total, failures } => {
            assert_eq!(*total, 3);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].template, bad);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.exit_code(), 5);

    assert_eq!(env.read("a.conf"), "a=hi");
    assert_eq!(env.read("b.conf"), "b=HI");
    assert_eq!(env.read("bad.conf"), "previous");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_file_pass_with_shared_output_paths() {
    let env = TestEnvironment::new();
    let tmpl = env.write("x.conf.tmpl", "greeting={{EnvVars.GREETING}}");
    let tpl = env.write("x.conf.tpl", "greeting={{EnvVars.GREETING}}");
    let templates = vec![tmpl.clone(), tpl, tmpl.clone(), tmpl];

    let engine = Arc::new(TemplateEngine::new(MissingKeyPolicy::Error, &empty_providers()));
    let context = Arc::new(TemplateContext::new(
        [("GREETING".to_string(), "hi".to_string())].into_iter().collect(),
    ));

    let outputs = TemplateScheduler::new(engine)
        .render_all(&templates, context)
        .await
        .unwrap();

    assert_eq!(outputs.len(), 4);
    assert_eq!(env.read("x.conf"), "greeting=hi");
    let leftovers: Vec<_> = std::fs::read_dir(env.temp_dir.path())
        .unwrap()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_file_pass_with_no_templates() {
    let engine = Arc::new(TemplateEngine::new(MissingKeyPolicy::Error, &empty_providers()));
    let outputs = TemplateScheduler::new(engine)
        .render_all(&[], Arc::new(TemplateContext::default()))
        .await
        .unwrap();
    assert!(outputs.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_template_file_is_reported() {
    let env = TestEnvironment::new();
    let engine = Arc::new(TemplateEngine::new(MissingKeyPolicy::Error, &empty_providers()));

    let err = TemplateScheduler::new(engine)
        .render_all(&[env.path("absent.conf.tmpl")], Arc::new(TemplateContext::default()))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("absent.conf.tmpl"));
}
