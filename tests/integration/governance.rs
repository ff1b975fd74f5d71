//! Command policy enforcement before execution

use gatecheck::config::{GateConfig, PolicyConfig};
use gatecheck::error::GateError;
use gatecheck::models::TestStatus;
use gatecheck::pipeline::GateRun;

use super::helpers::{status_of, test, verification, Project};

fn single(command: &str) -> String {
    verification(
        "gov",
        &[test(
            "probe",
            &[
                &format!("TEST: {command}"),
                "REQUIRED: true",
                "ERROR: e",
                "DESCRIPTION: d",
                "FIX_COMMAND: rm -rf build && mkdir build",
            ],
        )],
    )
}

fn governance_class(err: &GateError) -> &str {
    match err {
        GateError::Governance { class, .. } => class.as_str(),
        other => panic!("expected governance error, got {other}"),
    }
}

#[test]
fn test_network_command_is_rejected_before_execution() {
    let project = Project::new();
    project.write("net.md", &single("curl -fsS http://localhost:8080/health"));

    let err = GateRun::execute(project.explicit(&["net.md"])).unwrap_err();
    assert_eq!(governance_class(&err), "network");
    assert!(err.to_string().contains("net.md"), "{err}");
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn test_package_install_is_rejected() {
    let project = Project::new();
    project.write("pkg.md", &single("test -d node_modules || npm install"));

    let err = GateRun::execute(project.explicit(&["pkg.md"])).unwrap_err();
    assert_eq!(governance_class(&err), "package-install");
}

#[test]
fn test_rendered_command_is_checked_again() {
    let project = Project::new();
    project.write("render.md", &single("${CHECK_COMMAND}"));

    let overrides = [("CHECK_COMMAND".to_string(), "rm -rf target".to_string())].into();
    let request = project.explicit(&["render.md"]).with_overrides(overrides);
    let err = GateRun::execute(request).unwrap_err();
    assert_eq!(governance_class(&err), "filesystem-mutation");
}

#[test]
fn test_read_only_commands_and_fix_commands_are_allowed() {
    let project = Project::new();
    project.write("ok.md", &single("grep -q rm ok.md 2>/dev/null || true"));

    let report = GateRun::execute(project.explicit(&["ok.md"])).unwrap();
    assert_eq!(status_of(&report, "gov/probe"), TestStatus::Pass);
    assert!(!project.root().join("build").exists(), "fix commands are never run");
}

#[test]
fn test_config_deny_and_allow_lists() {
    let project = Project::new();
    project.write("docker.md", &single("docker ps"));
    project.write("mkdir.md", &single("mkdir -p scratch"));

    let mut denied = project.explicit(&["docker.md"]);
    denied.config = GateConfig {
        policy: PolicyConfig {
            allow: Vec::new(),
            deny: vec![r"\bdocker\b".to_string()],
        },
        ..GateConfig::default()
    };
    let err = GateRun::execute(denied).unwrap_err();
    assert_eq!(governance_class(&err), "custom");

    let mut allowed = project.explicit(&["mkdir.md"]);
    allowed.config = GateConfig {
        policy: PolicyConfig {
            allow: vec![r"^mkdir -p scratch$".to_string()],
            deny: Vec::new(),
        },
        ..GateConfig::default()
    };
    let report = GateRun::execute(allowed).unwrap();
    assert_eq!(status_of(&report, "gov/probe"), TestStatus::Pass);
}

#[test]
fn test_nested_shell_mutation_is_rejected_before_running() {
    let project = Project::new();
    project.write("victim", "keep me");
    project.write("nested.md", &single("sh -c 'rm -f victim'"));

    let err = GateRun::execute(project.explicit(&["nested.md"])).unwrap_err();
    assert_eq!(governance_class(&err), "filesystem-mutation");
    assert_eq!(err.exit_code(), 2);
    assert!(project.root().join("victim").exists());
}
