//! Routing from an entry document

use gatecheck::error::GateError;
use gatecheck::pipeline::GateRun;

use super::helpers::{route, test, verification, Project};

fn passing(block: &str, name: &str) -> String {
    verification(
        block,
        &[test(name, &["TEST: true", "REQUIRED: true", "ERROR: e", "DESCRIPTION: d"])],
    )
}

fn project_with_routes() -> Project {
    let project = Project::new();
    project.write(
        "AGENTS.md",
        &format!(
            "# Agents\n\n{}\n{}",
            route("db-routing", "database|migration", "@docs/db.md"),
            route("ui-routing", "frontend", "@docs/ui.md"),
        ),
    );
    project.write(
        "docs/db.md",
        &format!(
            "# Database\n\n{}\n{}",
            passing("db", "schema"),
            route("db-deep", "database", "deep/more.md"),
        ),
    );
    project.write("docs/deep/more.md", &passing("deep", "indexes"));
    project.write(
        "docs/ui.md",
        &verification(
            "ui",
            &[test("lint", &["TEST: false", "REQUIRED: true", "ERROR: e", "DESCRIPTION: d"])],
        ),
    );
    project
}

#[test]
fn test_routing_follows_matching_conditions_only() {
    let project = project_with_routes();
    let report = GateRun::execute(project.routed("AGENTS.md", &["Database"])).unwrap();

    assert_eq!(
        report.documents,
        vec!["AGENTS.md", "docs/db.md", "docs/deep/more.md"]
    );
    let ids: Vec<&str> = report.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["db/schema", "deep/indexes"]);
    assert_eq!(report.exit_code, 0);
}

#[test]
fn test_no_matching_keywords_runs_nothing() {
    let project = project_with_routes();
    let report = GateRun::execute(project.routed("AGENTS.md", &["styling"])).unwrap();
    assert_eq!(report.documents, vec!["AGENTS.md"]);
    assert!(report.results.is_empty());
    assert_eq!(report.exit_code, 0);
}

#[test]
fn test_routing_cycle_is_rejected_without_results() {
    let project = Project::new();
    project.write("a.md", &route("to-b", "loop", "@b.md"));
    project.write("b.md", &route("to-a", "loop", "@a.md"));

    let err = GateRun::execute(project.routed("a.md", &["loop"])).unwrap_err();
    assert!(matches!(err, GateError::Structural { .. }));
    assert!(err.to_string().contains("routing cycle detected"), "{err}");
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_self_route_is_a_cycle() {
    let project = Project::new();
    project.write("a.md", &route("to-self", "loop", "@a.md"));

    let err = GateRun::execute(project.routed("a.md", &["loop"])).unwrap_err();
    assert!(err.to_string().contains("routing cycle detected"), "{err}");
}

#[test]
fn test_routing_deeper_than_three_hops_is_rejected() {
    let project = Project::new();
    for n in 0..4 {
        project.write(
            &format!("d{n}.md"),
            &route(&format!("hop-{n}"), "deep", &format!("@d{}.md", n + 1)),
        );
    }
    project.write("d4.md", &passing("bottom", "reached"));

    let err = GateRun::execute(project.routed("d0.md", &["deep"])).unwrap_err();
    assert!(err.to_string().contains("routing exceeds 3 hops"), "{err}");
}

#[test]
fn test_section_reference_narrows_extraction() {
    let project = Project::new();
    project.write("AGENTS.md", &route("db-routing", "database", "@docs/db.md#migrations"));
    project.write(
        "docs/db.md",
        &format!(
            "# Database\n\n## Migrations\n\n{}\n## Seeds\n\n{}",
            passing("migrations", "reversible"),
            passing("seeds", "idempotent"),
        ),
    );

    let report = GateRun::execute(project.routed("AGENTS.md", &["database"])).unwrap();
    let ids: Vec<&str> = report.results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["migrations/reversible"]);
}

#[test]
fn test_missing_route_target_is_structural() {
    let project = Project::new();
    project.write("AGENTS.md", &route("gone", "database", "@docs/missing.md"));

    let err = GateRun::execute(project.routed("AGENTS.md", &["database"])).unwrap_err();
    assert!(matches!(err, GateError::Structural { .. }));
    assert!(err.to_string().contains("does not exist"), "{err}");
}
