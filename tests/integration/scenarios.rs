//! End-to-end gate decisions

use gatecheck::error::GateError;
use gatecheck::models::TestStatus;
use gatecheck::pipeline::GateRun;
use gatecheck::report::{GateDecision, GateMode};

use super::helpers::{status_of, test, verification, Project};

#[test]
fn test_blocking_failure_skips_dependent_and_fails_gate() {
    let project = Project::new();
    let doc = verification(
        "gate",
        &[
            test(
                "a",
                &[
                    "TEST: exit 1",
                    "REQUIRED: true",
                    "BLOCKING: true",
                    "ERROR: a is broken",
                    "DESCRIPTION: blocking check",
                ],
            ),
            test(
                "b",
                &[
                    "TEST: true",
                    "REQUIRED: true",
                    "ERROR: b is broken",
                    "DESCRIPTION: depends on a",
                    "DEPENDS_ON: a",
                ],
            ),
        ],
    );
    project.write("standards.md", &doc);

    let report = GateRun::execute(project.explicit(&["standards.md"])).unwrap();

    assert_eq!(status_of(&report, "gate/a"), TestStatus::Blocked);
    assert_eq!(status_of(&report, "gate/b"), TestStatus::Skipped);
    assert_eq!(report.decision, GateDecision::Fail);
    assert_eq!(report.exit_code, 1);
    assert_eq!(report.halted_by.as_ref().map(|id| id.as_str()), Some("gate/a"));
}

#[test]
fn test_unresolved_variable_is_scoped_to_one_test() {
    let project = Project::new();
    let doc = verification(
        "coverage",
        &[
            test(
                "c",
                &[
                    "TEST: test ${PROJECT_COVERAGE} -ge 80",
                    "REQUIRED: false",
                    "ERROR: coverage too low",
                    "DESCRIPTION: coverage threshold",
                ],
            ),
            test(
                "d",
                &[
                    "TEST: true",
                    "REQUIRED: true",
                    "ERROR: d failed",
                    "DESCRIPTION: plain check",
                ],
            ),
        ],
    );
    project.write("coverage.md", &doc);

    let report = GateRun::execute(project.explicit(&["coverage.md"])).unwrap();

    let c = report.results.iter().find(|r| r.id.as_str() == "coverage/c").unwrap();
    assert_eq!(c.status, TestStatus::Fail);
    assert_eq!(c.unresolved_variables, vec!["PROJECT_COVERAGE"]);
    assert_eq!(c.attempts, 0);
    assert_eq!(status_of(&report, "coverage/d"), TestStatus::Pass);

    assert_eq!(report.variable_errors.len(), 1);
    assert_eq!(report.variable_errors[0].test, "coverage/c");
    // Optional test: a gate failure, not malformed input
    assert_eq!(report.decision, GateDecision::Fail);
    assert_eq!(report.exit_code, 1);
}

#[test]
fn test_unresolved_variable_on_required_test_is_malformed() {
    let project = Project::new();
    let doc = verification(
        "coverage",
        &[test(
            "c",
            &[
                "TEST: test ${PROJECT_COVERAGE} -ge 80",
                "REQUIRED: true",
                "ERROR: coverage too low",
                "DESCRIPTION: coverage threshold",
            ],
        )],
    );
    project.write("coverage.md", &doc);

    let report = GateRun::execute(project.explicit(&["coverage.md"])).unwrap();
    assert_eq!(report.decision, GateDecision::Malformed);
    assert_eq!(report.exit_code, 2);
}

#[test]
fn test_override_resolves_variable() {
    let project = Project::new();
    let doc = verification(
        "coverage",
        &[test(
            "c",
            &[
                "TEST: test ${PROJECT_COVERAGE} -ge 80",
                "REQUIRED: true",
                "ERROR: coverage ${PROJECT_COVERAGE} too low",
                "DESCRIPTION: coverage threshold",
            ],
        )],
    );
    project.write("coverage.md", &doc);

    let overrides = [("PROJECT_COVERAGE".to_string(), "91".to_string())].into();
    let request = project.explicit(&["coverage.md"]).with_overrides(overrides);
    let report = GateRun::execute(request).unwrap();
    assert_eq!(status_of(&report, "coverage/c"), TestStatus::Pass);
    assert_eq!(report.decision, GateDecision::Pass);
    assert_eq!(report.exit_code, 0);
}

#[test]
fn test_duplicate_id_with_different_content_aborts_before_execution() {
    let project = Project::new();
    project.write(
        "one.md",
        &verification(
            "dup-id",
            &[test("first", &["TEST: true", "REQUIRED: true", "ERROR: e", "DESCRIPTION: d"])],
        ),
    );
    project.write(
        "two.md",
        &verification(
            "dup-id",
            &[test("second", &["TEST: false", "REQUIRED: true", "ERROR: e", "DESCRIPTION: d"])],
        ),
    );

    let err = GateRun::execute(project.explicit(&["one.md", "two.md"])).unwrap_err();
    assert!(matches!(err, GateError::Structural { .. }), "{err}");
    assert!(err.to_string().contains("ambiguous identity for context-check 'dup-id'"));
    assert!(err.to_string().contains("two.md"));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_advisory_mode_reports_failures_and_exits_zero() {
    let project = Project::new();
    let failing = |name: &str, fix: Option<&str>| {
        let error = format!("ERROR: {name} missing under ${{SOURCE_DIR}}");
        let mut fields = vec![
            "TEST: exit 1".to_string(),
            "REQUIRED: true".to_string(),
            "BLOCKING: false".to_string(),
            error,
            "DESCRIPTION: required check".to_string(),
        ];
        if let Some(fix) = fix {
            fields.push(format!("FIX_COMMAND: {fix}"));
        }
        let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
        test(name, &fields)
    };
    project.write(
        "advisory.md",
        &verification(
            "advisory",
            &[
                failing("one", Some("mkdir -p ${SOURCE_DIR}/one")),
                failing("two", None),
                failing("three", Some("touch three")),
            ],
        ),
    );

    let overrides = [("SOURCE_DIR".to_string(), "src".to_string())].into();
    let request = project
        .explicit(&["advisory.md"])
        .with_mode(GateMode::Advisory)
        .with_overrides(overrides);
    let report = GateRun::execute(request).unwrap();

    assert_eq!(report.exit_code, 0);
    assert_eq!(report.decision, GateDecision::Fail);
    let failures: Vec<_> = report.failures().collect();
    assert_eq!(failures.len(), 3);
    assert_eq!(failures[0].error_message.as_deref(), Some("one missing under src"));
    assert_eq!(failures[0].fix_command.as_deref(), Some("mkdir -p src/one"));
    assert_eq!(failures[1].fix_command, None);
    assert_eq!(failures[2].fix_command.as_deref(), Some("touch three"));
    assert!(!project.root().join("three").exists(), "fix commands are never run");
}

#[test]
fn test_rerun_produces_identical_report() {
    let project = Project::new();
    project.write(
        "stable.md",
        &verification(
            "stable",
            &[
                test("ok", &["TEST: true", "REQUIRED: true", "ERROR: e", "DESCRIPTION: d"]),
                test(
                    "bad",
                    &["TEST: exit 2", "REQUIRED: false", "ERROR: e", "DESCRIPTION: d"],
                ),
                test(
                    "after",
                    &[
                        "TEST: true",
                        "REQUIRED: true",
                        "ERROR: e",
                        "DESCRIPTION: d",
                        "DEPENDS_ON: bad",
                    ],
                ),
            ],
        ),
    );

    let normalized = || {
        let report = GateRun::execute(project.explicit(&["stable.md"])).unwrap();
        let mut json = serde_json::to_value(&report).unwrap();
        for result in json["results"].as_array_mut().unwrap() {
            result.as_object_mut().unwrap().remove("duration_ms");
        }
        json
    };
    assert_eq!(normalized(), normalized());
}

#[test]
fn test_blocking_timeout_fails_and_halts() {
    let project = Project::new();
    project.write(
        "slow.md",
        &verification(
            "slow",
            &[
                test(
                    "sleeper",
                    &[
                        "TEST: sleep 5",
                        "REQUIRED: true",
                        "BLOCKING: true",
                        "ERROR: too slow",
                        "DESCRIPTION: d",
                    ],
                ),
                test("other", &["TEST: true", "REQUIRED: true", "ERROR: e", "DESCRIPTION: d"]),
            ],
        ),
    );

    let mut request = project.explicit(&["slow.md"]);
    request.executor = request
        .executor
        .with_timeout(std::time::Duration::from_secs(1))
        .with_max_parallel(1);
    let report = GateRun::execute(request).unwrap();

    let sleeper = report.results.iter().find(|r| r.id.as_str() == "slow/sleeper").unwrap();
    assert_eq!(sleeper.status, TestStatus::Fail);
    assert!(sleeper.timed_out);
    assert_eq!(sleeper.message, "timed out after 1s");
    let other = report.results.iter().find(|r| r.id.as_str() == "slow/other").unwrap();
    assert_eq!(other.status, TestStatus::Skipped);
    assert_eq!(other.message, "halted by slow/sleeper");
    assert_eq!(report.halted_by.as_ref().map(|id| id.as_str()), Some("slow/sleeper"));
    assert_eq!(report.exit_code, 1);
}
