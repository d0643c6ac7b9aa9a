mod helpers;

use helpers::*;
use permissions_migration::{build, expand};
use permissions_migration::errors::MigrationError;
use permissions_migration::mapping::{BindingMapper, HdfsMapper, RangerHivePlugin, RangerMapper};
use permissions_migration::merge::PermissionMerge;
use permissions_migration::models::{
    BindingsDocument, IamBinding, Policy, Principal, PrincipalsDocument, ResourceType, Rule,
    Service, Table, Target, TargetRoles,
};
use permissions_migration::rules::Action;
use permissions_migration::source::VecSource;
use std::collections::BTreeMap;

fn hive_mapper(
    target: Target,
    tables: Vec<Table>,
    principals: Vec<Principal>,
    services: Vec<Service>,
    policies: Vec<Policy>,
) -> Result<RangerMapper<RangerHivePlugin>, MigrationError> {
    let roles = match target {
        Target::Gcs => TargetRoles::gcs_defaults(),
        Target::Bq => TargetRoles::bq_defaults(),
    };
    RangerMapper::new(
        RangerHivePlugin::new(),
        target,
        roles,
        &[Rule::map_when("true")],
        Box::new(VecSource::new(tables)),
        &VecSource::new(principals),
        &VecSource::new(services),
        &VecSource::new(policies),
    )
}

fn summary(bindings: &[IamBinding]) -> Vec<(ResourceType, &str, &str, &str, i32)> {
    bindings
        .iter()
        .map(|b| {
            (
                b.resource_type,
                b.resource_path.as_str(),
                b.principal.as_str(),
                b.role.as_str(),
                b.priority,
            )
        })
        .collect()
}

#[test]
fn test_hdfs_owner_binding_end_to_end() {
    let table = TableBuilder::new("s", "t").hdfs_path("/data/s/t").build();
    let mapper = HdfsMapper::new(
        Target::Bq,
        TargetRoles::bq_defaults(),
        &[Rule::map_when("true")],
        Box::new(VecSource::new(vec![table])),
        Box::new(VecSource::new(vec![hdfs_permission("/data/s/t", "alice", "eng", "rwxr-x---")])),
        &VecSource::new(vec![PrincipalBuilder::user("alice@example.com")
            .source("hdfs/user", "alice")
            .build()]),
    )
    .unwrap();

    let mappers: Vec<Box<dyn BindingMapper>> = vec![Box::new(mapper)];
    let bindings = PermissionMerge::new(mappers, &BTreeMap::new()).unwrap().run().unwrap();
    assert_eq!(
        summary(&bindings),
        vec![(
            ResourceType::BqTable,
            "proj.s.t",
            "user:alice@example.com",
            "roles/bigquery.dataEditor",
            10
        )]
    );
}

#[test]
fn test_hdfs_group_binding_needs_group_principal() {
    let table = TableBuilder::new("s", "t").hdfs_path("/data/s/t").build();
    let mapper = HdfsMapper::new(
        Target::Bq,
        TargetRoles::bq_defaults(),
        &[Rule::map_when("true")],
        Box::new(VecSource::new(vec![table])),
        Box::new(VecSource::new(vec![hdfs_permission("/data/s/t", "alice", "eng", "rwxr-x---")])),
        &VecSource::new(vec![
            PrincipalBuilder::user("alice@example.com").source("hdfs/user", "alice").build(),
            PrincipalBuilder::group("eng@example.com").source("hdfs/group", "eng").build(),
        ]),
    )
    .unwrap();

    let results = mapper.run().unwrap();
    let principals: Vec<(&str, &str)> = results
        .iter()
        .map(|r| (r.binding.principal.as_str(), r.binding.role.as_str()))
        .collect();
    assert_eq!(
        principals,
        vec![
            ("user:alice@example.com", "roles/bigquery.dataEditor"),
            ("group:eng@example.com", "roles/bigquery.dataViewer"),
        ]
    );
}

#[test]
fn test_ranger_hive_select_grants_read() {
    let policy = PolicyBuilder::hive("sales read")
        .resource("database", &["s"], false)
        .resource("table", &["*"], false)
        .allow(&["select"])
        .group("analysts")
        .build();
    let mapper = hive_mapper(
        Target::Bq,
        vec![TableBuilder::new("s", "t").build()],
        vec![PrincipalBuilder::group("analysts@example.com")
            .source("ranger/group", "analysts")
            .build()],
        vec![hive_service()],
        vec![policy],
    )
    .unwrap();

    let results = mapper.run().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].action, Action::Map);
    let binding = &results[0].binding;
    assert_eq!(binding.principal, "group:analysts@example.com");
    assert_eq!(binding.role, "roles/bigquery.dataViewer");
    assert_eq!(binding.priority, 0);
    assert_eq!(binding.source_permissions["ranger"][0]["name"], "sales read");
    assert_eq!(binding.source_principals["ranger"][0]["type"], "GROUP");
}

#[test]
fn test_ranger_policies_of_other_services_and_disabled_ignored() {
    let hdfs_policy = PolicyBuilder::hdfs("hdfs everything")
        .resource("path", &["/"], true)
        .allow(&["read"])
        .group("ghosts")
        .build();
    let disabled = PolicyBuilder::hive("old")
        .resource("database", &["*"], false)
        .allow(&["select"])
        .group("ghosts")
        .disabled()
        .build();
    let mapper = hive_mapper(
        Target::Bq,
        vec![TableBuilder::new("s", "t").build()],
        vec![],
        vec![hive_service(), hdfs_service()],
        vec![hdfs_policy, disabled],
    )
    .unwrap();
    assert!(mapper.run().unwrap().is_empty());
}

#[test]
fn test_unregistered_ranger_principal_is_fatal() {
    let policy = PolicyBuilder::hive("sales read")
        .resource("database", &["s"], false)
        .allow(&["select"])
        .group("nobody")
        .build();
    let mapper = hive_mapper(
        Target::Bq,
        vec![TableBuilder::new("s", "t").build()],
        vec![],
        vec![hive_service()],
        vec![policy],
    )
    .unwrap();

    let err = mapper.run().unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(
        err.to_string(),
        "Ranger Hive policy 'sales read' refers to an invalid Ranger principal group 'nobody'"
    );

    let mappers: Vec<Box<dyn BindingMapper>> = vec![Box::new(mapper)];
    let merge = PermissionMerge::new(mappers, &BTreeMap::new()).unwrap();
    assert!(matches!(merge.run(), Err(MigrationError::DanglingPrincipal { .. })));
}

#[test]
fn test_skipped_ranger_principal_dropped() {
    let policy = PolicyBuilder::hive("sales read")
        .resource("database", &["s"], false)
        .allow(&["select"])
        .user("etl")
        .build();
    let mapper = hive_mapper(
        Target::Bq,
        vec![TableBuilder::new("s", "t").build()],
        vec![PrincipalBuilder::user("unused").source("ranger/user", "etl").skipped().build()],
        vec![hive_service()],
        vec![policy],
    )
    .unwrap();
    assert!(mapper.run().unwrap().is_empty());
}

#[test]
fn test_higher_priority_source_wins_on_shared_resource() {
    let table = TableBuilder::new("s", "t").hdfs_path("/data/s/t").build();
    let principals = vec![
        PrincipalBuilder::user("alice@example.com").source("hdfs/user", "alice").build(),
        PrincipalBuilder::group("analysts@example.com")
            .source("ranger/group", "analysts")
            .build(),
    ];
    let policy = PolicyBuilder::hive("sales write")
        .resource("database", &["s"], false)
        .allow(&["select", "update"])
        .group("analysts")
        .build();

    let ranger = hive_mapper(
        Target::Bq,
        vec![table.clone()],
        principals.clone(),
        vec![hive_service()],
        vec![policy],
    )
    .unwrap();
    let hdfs = HdfsMapper::new(
        Target::Bq,
        TargetRoles::bq_defaults(),
        &[Rule::map_when("true")],
        Box::new(VecSource::new(vec![table])),
        Box::new(VecSource::new(vec![hdfs_permission("/data/s/t", "alice", "eng", "r--------")])),
        &VecSource::new(principals),
    )
    .unwrap();

    let mappers: Vec<Box<dyn BindingMapper>> = vec![Box::new(ranger), Box::new(hdfs)];
    let bindings = PermissionMerge::new(mappers, &BTreeMap::new()).unwrap().run().unwrap();
    assert_eq!(
        summary(&bindings),
        vec![(
            ResourceType::BqTable,
            "proj.s.t",
            "user:alice@example.com",
            "roles/bigquery.dataViewer",
            10
        )]
    );
}

const RULESET: &str = r#"
gcs:
  ranger_hive_rules:
    - map: {}
bq:
  hdfs_rules:
    - when: "source_principal.type == 'GROUP' && source_principal.name == 'hadoop'"
      skip: true
    - map: {}
  ranger_hive_rules:
    - log: "true"
      map: {}
roles:
  roles/bigquery.dataEditor:
    includes: [roles/bigquery.dataViewer]
"#;

fn sales_fixture() -> Fixture {
    let fixture = Fixture::new();
    fixture
        .tables(&[
            TableBuilder::new("sales", "orders")
                .hdfs_path("hdfs://nn:8020/data/sales/orders")
                .gcs_path("gs://lake/sales/orders")
                .build(),
            TableBuilder::new("sales", "returns")
                .hdfs_path("hdfs://nn:8020/data/sales/returns")
                .build(),
        ])
        .principals(&[
            PrincipalBuilder::user("alice@example.com")
                .source("hdfs/user", "alice")
                .source("ranger/user", "alice")
                .build(),
            PrincipalBuilder::group("analysts@example.com")
                .source("hdfs/group", "analysts")
                .source("ranger/group", "analysts")
                .build(),
            PrincipalBuilder::group("hadoop-admins@example.com")
                .source("hdfs/group", "hadoop")
                .build(),
        ])
        .ranger(
            &[hive_service()],
            &[PolicyBuilder::hive("sales read")
                .resource("database", &["sales"], false)
                .resource("table", &["*"], false)
                .allow(&["select"])
                .group("analysts")
                .build()],
        )
        .hdfs(&[
            hdfs_permission("/data/sales/returns", "bob", "analysts", "rwxr-----"),
            hdfs_permission("/data/sales/orders", "alice", "hadoop", "rwxr-x---"),
        ])
        .ruleset(RULESET);
    fixture
}

#[tokio::test]
async fn test_build_writes_merged_json_document() {
    let fixture = sales_fixture();
    let settings = fixture.settings("permissions.json");

    let document = build::run(settings).await.unwrap();
    assert_eq!(
        summary(&document.bindings),
        vec![
            (
                ResourceType::GcsManagedFolder,
                "gs://lake/sales/orders",
                "group:analysts@example.com",
                "roles/storage.objectViewer",
                0
            ),
            (
                ResourceType::BqTable,
                "proj.sales.orders",
                "user:alice@example.com",
                "roles/bigquery.dataEditor",
                10
            ),
            (
                ResourceType::BqTable,
                "proj.sales.returns",
                "group:analysts@example.com",
                "roles/bigquery.dataViewer",
                10
            ),
        ]
    );

    let written: BindingsDocument = serde_json::from_str(
        &std::fs::read_to_string(fixture.output_path("permissions.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(written, document);
}

#[tokio::test]
async fn test_build_writes_yaml_by_default() {
    let fixture = sales_fixture();
    build::run(fixture.settings("permissions.yaml")).await.unwrap();

    let written: BindingsDocument = serde_yaml::from_str(
        &std::fs::read_to_string(fixture.output_path("permissions.yaml")).unwrap(),
    )
    .unwrap();
    assert_eq!(written.bindings.len(), 3);
}

#[tokio::test]
async fn test_build_isolates_broken_ranger_dump() {
    let fixture = sales_fixture();
    fixture.raw_policies("{\"name\": \"truncated\"\n");

    let document = build::run(fixture.settings("permissions.json")).await.unwrap();
    let sources: Vec<&str> = document
        .bindings
        .iter()
        .flat_map(|b| b.source_permissions.keys().map(String::as_str))
        .collect();
    assert_eq!(document.bindings.len(), 2);
    assert!(sources.iter().all(|s| *s == "hdfs"));
}

#[tokio::test]
async fn test_build_aborts_without_output_on_dangling_principal() {
    let fixture = sales_fixture();
    fixture.ranger(
        &[hive_service()],
        &[PolicyBuilder::hive("mystery")
            .resource("database", &["sales"], false)
            .allow(&["select"])
            .user("mallory")
            .build()],
    );

    let err = build::run(fixture.settings("permissions.json")).await.unwrap_err();
    assert!(matches!(err, MigrationError::DanglingPrincipal { .. }));
    assert!(!fixture.output_path("permissions.json").exists());
}

#[tokio::test]
async fn test_build_timeout_is_fatal_and_writes_nothing() {
    let fixture = sales_fixture();
    let mut settings = fixture.settings("permissions.json");
    settings.run.timeout_seconds = 1;

    let err = build::run_with(settings, |settings| {
        std::thread::sleep(std::time::Duration::from_secs(2));
        build::compute(settings)
    })
    .await
    .unwrap_err();
    assert!(matches!(err, MigrationError::Timeout(1)));
    assert!(err.is_fatal());
    assert!(!fixture.output_path("permissions.json").exists());
}

const PRINCIPAL_RULESET: &str = r#"
hdfs:
  user_rules:
    - when: "user.name == 'bob'"
      skip: true
    - map:
        email_address:
          expression: "user.name + '@example.com'"
  group_rules:
    - when: "group.name == 'hadoop'"
      map:
        email_address:
          value: hadoop-admins@example.com
    - map:
        email_address:
          expression: "group.name + '@example.com'"
  other_rules:
    - skip: true
ranger:
  user_rules:
    - map: {}
  group_rules:
    - map:
        email_address:
          expression: "group.name + '@example.com'"
"#;

#[tokio::test]
async fn test_expand_then_build_from_expanded_principals() {
    let fixture = sales_fixture();
    fixture
        .identities(
            &[serde_json::json!({ "name": "alice", "emailAddress": "alice@example.com" })],
            &[serde_json::json!({ "name": "analysts" })],
            &[],
        )
        .principal_ruleset(PRINCIPAL_RULESET);
    let mut settings = fixture.settings("permissions.yaml");
    settings.output.principals = settings.inputs.principals.clone();

    let document = expand::run(settings.clone()).await.unwrap();
    let identities: Vec<Option<String>> = document
        .principals
        .iter()
        .map(Principal::target_identity)
        .collect();
    assert_eq!(
        identities,
        vec![
            Some("group:analysts@example.com".to_string()),
            Some("group:hadoop-admins@example.com".to_string()),
            Some("user:alice@example.com".to_string()),
            None,
        ]
    );
    assert_eq!(document.principals[0].sources["hdfs/group"], vec!["analysts"]);
    assert_eq!(document.principals[0].sources["ranger/group"], vec!["analysts"]);
    let skipped = &document.principals[3];
    assert!(skipped.is_skipped());
    assert_eq!(skipped.sources["hdfs/user"], vec!["bob"]);
    assert_eq!(skipped.sources["hdfs/other"], vec!["other"]);

    let written: PrincipalsDocument = serde_yaml::from_str(
        &std::fs::read_to_string(&settings.output.principals).unwrap(),
    )
    .unwrap();
    assert_eq!(written, document);

    let bindings = build::run(settings).await.unwrap();
    assert_eq!(bindings.bindings.len(), 3);
}

#[tokio::test]
async fn test_expand_without_ruleset_writes_nothing() {
    let fixture = sales_fixture();
    let mut settings = fixture.settings("permissions.yaml");
    settings.output.principals = fixture.output_path("expanded.yaml");

    let err = expand::run(settings).await.unwrap_err();
    assert!(matches!(err, MigrationError::ReadError { .. }));
    assert!(!fixture.output_path("expanded.yaml").exists());
}
