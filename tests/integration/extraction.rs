//! Extraction, deduplication and dependency validation across documents

use gatecheck::error::GateError;
use gatecheck::models::TestStatus;
use gatecheck::pipeline::GateRun;

use super::helpers::{route, status_of, test, verification, Project};

fn shared_block() -> String {
    verification(
        "shared",
        &[test(
            "readme",
            &["TEST: test -n ok", "REQUIRED: true", "ERROR: e", "DESCRIPTION: d"],
        )],
    )
}

#[test]
fn test_identical_block_in_two_documents_is_extracted_once() {
    let project = Project::new();
    project.write("one.md", &format!("# One\n\n{}", shared_block()));
    // Indentation differences do not change a block's identity
    let reindented = shared_block().replace("\n  ", "\n      ");
    project.write("two.md", &format!("# Two\n\n{reindented}"));

    let report = GateRun::execute(project.explicit(&["one.md", "two.md"])).unwrap();
    assert_eq!(report.results.len(), 1);
    assert_eq!(report.cache.parsed, 1);
    assert_eq!(report.cache.hits, 1);
    assert_eq!(status_of(&report, "shared/readme"), TestStatus::Pass);
}

#[test]
fn test_shared_block_reached_by_two_routes() {
    let project = Project::new();
    project.write(
        "AGENTS.md",
        &format!(
            "{}{}",
            route("to-api", "api", "@api.md"),
            route("to-db", "database", "@db.md")
        ),
    );
    project.write("api.md", &shared_block());
    project.write("db.md", &shared_block());

    let report = GateRun::execute(project.routed("AGENTS.md", &["api", "database"])).unwrap();
    assert_eq!(report.documents.len(), 3);
    assert_eq!(report.results.len(), 1);
}

#[test]
fn test_fenced_examples_are_not_tests() {
    let project = Project::new();
    let fenced = verification(
        "example",
        &[test("sample", &["TEST: false", "REQUIRED: true", "ERROR: e", "DESCRIPTION: d"])],
    );
    project.write(
        "guide.md",
        &format!("# Guide\n\nSyntax:\n\n```markdown\n{fenced}```\n\n{}", shared_block()),
    );

    let report = GateRun::execute(project.explicit(&["guide.md"])).unwrap();
    let ids: Vec<&str> = report.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["shared/readme"]);
}

#[test]
fn test_cross_block_dependencies_order_execution() {
    let project = Project::new();
    project.write(
        "deps.md",
        &format!(
            "{}{}",
            verification(
                "api",
                &[test(
                    "routes",
                    &[
                        "TEST: true",
                        "REQUIRED: true",
                        "ERROR: e",
                        "DESCRIPTION: d",
                        "DEPENDS_ON: db/schema",
                    ],
                )],
            ),
            verification(
                "db",
                &[test("schema", &["TEST: true", "REQUIRED: true", "ERROR: e", "DESCRIPTION: d"])],
            ),
        ),
    );

    let report = GateRun::execute(project.explicit(&["deps.md"])).unwrap();
    let ids: Vec<&str> = report.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["db/schema", "api/routes"]);
}

#[test]
fn test_unknown_dependency_is_structural() {
    let project = Project::new();
    project.write(
        "deps.md",
        &verification(
            "api",
            &[test(
                "routes",
                &[
                    "TEST: true",
                    "REQUIRED: true",
                    "ERROR: e",
                    "DESCRIPTION: d",
                    "DEPENDS_ON: db/schema",
                ],
            )],
        ),
    );

    let err = GateRun::execute(project.explicit(&["deps.md"])).unwrap_err();
    assert!(matches!(err, GateError::Structural { .. }));
    assert!(err.to_string().contains("not part of this batch"), "{err}");
}

#[test]
fn test_dependency_cycle_is_structural() {
    let project = Project::new();
    project.write(
        "deps.md",
        &verification(
            "loop",
            &[
                test(
                    "a",
                    &["TEST: true", "REQUIRED: true", "ERROR: e", "DESCRIPTION: d", "DEPENDS_ON: b"],
                ),
                test(
                    "b",
                    &["TEST: true", "REQUIRED: true", "ERROR: e", "DESCRIPTION: d", "DEPENDS_ON: a"],
                ),
            ],
        ),
    );

    let err = GateRun::execute(project.explicit(&["deps.md"])).unwrap_err();
    assert!(err.to_string().contains("dependency cycle"), "{err}");
}

#[test]
fn test_missing_required_field_is_structural() {
    let project = Project::new();
    project.write(
        "bad.md",
        &verification("bad", &[test("t", &["TEST: true", "ERROR: e", "DESCRIPTION: d"])]),
    );

    let err = GateRun::execute(project.explicit(&["bad.md"])).unwrap_err();
    assert!(err.to_string().contains("missing required field REQUIRED"), "{err}");
}

#[test]
fn test_plan_lists_tests_without_running_them() {
    let project = Project::new();
    let marker = project.root().join("marker");
    project.write(
        "plan.md",
        &verification(
            "plan",
            &[test(
                "probe",
                &[
                    &format!("TEST: test -e {}", marker.display()),
                    "REQUIRED: true",
                    "ERROR: e",
                    "DESCRIPTION: d",
                ],
            )],
        ),
    );

    let plan = GateRun::plan(project.explicit(&["plan.md"])).unwrap();
    assert_eq!(plan.tests.len(), 1);
    let commands = plan.tests[0].commands().unwrap();
    assert_eq!(commands.command, format!("test -e {}", marker.display()));
    assert!(!marker.exists());
}
