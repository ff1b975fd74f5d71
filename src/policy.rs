//! Command governance: reject command classes that must never run in a gate.
//!
//! Patterns are matched at command positions only: the start of the command,
//! after a separator or pipe, inside a subshell or command substitution, after
//! a wrapper such as `sudo`, `xargs` or `find -exec`, and inside the script of
//! a nested shell (`sh -c '...'`, `eval "..."`). So `grep -q rm notes.txt` is
//! fine while `true && rm -rf build` and `bash -c 'rm -rf build'` are not.

use std::fmt;

use regex::Regex;

use crate::config::PolicyConfig;
use crate::error::{GateError, Location};

/// Prefix matching a command position, plus any `VAR=value` assignments
/// and an optional directory in front of the command word.
const COMMAND_POSITION: &str = concat!(
    r"(?:^|[;&|(`]|\$\(",
    r"|\b(?:sudo|xargs|env|exec|command|nohup|time)\s+(?:-\S+\s+)*",
    r"|\s-(?:exec|execdir|ok|okdir)\s+",
    r"|\b(?:sh|bash|zsh|dash|ksh|eval)\s+(?:-\S+\s+)*",
    // A quoted script starts a command too
    r#")\s*['"]?"#,
    r"(?:[A-Za-z_][A-Za-z0-9_]*=\S*\s+)*(?:\S*/)?",
);

/// Suffix ending the command word
const WORD_END: &str = r#"(?:\s|$|[;&|)'"])"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyClass {
    Network,
    PackageInstall,
    FilesystemMutation,
    Custom,
}

impl fmt::Display for PolicyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PolicyClass::Network => "network",
            PolicyClass::PackageInstall => "package-install",
            PolicyClass::FilesystemMutation => "filesystem-mutation",
            PolicyClass::Custom => "custom",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub class: PolicyClass,
    /// Text that triggered the rule
    pub matched: String,
}

#[derive(Debug)]
pub struct CommandPolicy {
    rules: Vec<(PolicyClass, Regex)>,
    url: Regex,
    redirection: Regex,
    quoted: Regex,
    nested_shell: Regex,
    allow: Vec<Regex>,
    deny: Vec<Regex>,
}

fn at_command_position(body: &str) -> Regex {
    Regex::new(&format!("{COMMAND_POSITION}(?:{body}){WORD_END}")).expect("static policy pattern")
}

fn compile_all(patterns: &[String], key: &str) -> Result<Vec<Regex>, String> {
    patterns
        .iter()
        .map(|p| Regex::new(p).map_err(|e| format!("invalid policy.{key} pattern '{p}': {e}")))
        .collect()
}

impl CommandPolicy {
    pub fn new(config: &PolicyConfig) -> Result<Self, String> {
        let rules = vec![
            (
                PolicyClass::Network,
                at_command_position(
                    r"curl|wget|nc|ncat|netcat|ssh|scp|sftp|rsync|telnet|ftp|ping|git\s+(?:-\S+\s+)*(?:clone|fetch|pull|push)",
                ),
            ),
            (
                PolicyClass::PackageInstall,
                at_command_position(
                    r"(?:npm|pnpm|yarn)\s+(?:install|i|add|ci)|pip3?\s+install|python3?\s+-m\s+pip\s+install|cargo\s+(?:install|add)|go\s+(?:get|install)|(?:apt|apt-get|yum|dnf|apk|brew)\s+(?:install|add)|gem\s+install|composer\s+(?:install|require)|poetry\s+add",
                ),
            ),
            (
                PolicyClass::FilesystemMutation,
                at_command_position(
                    concat!(
                        r"rm|rmdir|mv|cp|mkdir|touch|chmod|chown|ln|dd|truncate|shred|tee",
                        r"|(?:sed|perl)\s(?:[^;&|]*\s)?-[A-Za-z]*i\S*",
                        r"|find\s(?:[^;&|]*\s)?-delete",
                        r"|git\s+(?:-\S+\s+)*(?:clean|reset\s(?:[^;&|]*\s)?--hard|checkout\s(?:[^;&|]*\s)?--)",
                    ),
                ),
            ),
        ];

        Ok(Self {
            rules,
            url: Regex::new(r"\bhttps?://").expect("static url pattern"),
            redirection: Regex::new(r"[0-9]*>>?\s*(&[0-9-]*|[^\s;&|()<>]*)")
                .expect("static redirection pattern"),
            quoted: Regex::new(r#"'[^']*'|"(?:[^"\\]|\\.)*""#).expect("static quote pattern"),
            nested_shell: Regex::new(r"\b(?:sh|bash|zsh|dash|ksh|eval)\s")
                .expect("static shell pattern"),
            allow: compile_all(&config.allow, "allow")?,
            deny: compile_all(&config.deny, "deny")?,
        })
    }

    /// Classify a command, returning the first violated rule.
    pub fn check(&self, command: &str) -> Result<(), Violation> {
        if self.allow.iter().any(|re| re.is_match(command)) {
            return Ok(());
        }

        let violation = |class, matched: &str| {
            Err(Violation {
                class,
                matched: matched.trim().to_string(),
            })
        };

        for re in &self.deny {
            if let Some(m) = re.find(command) {
                return violation(PolicyClass::Custom, m.as_str());
            }
        }
        if let Some(m) = self.url.find(command) {
            return violation(PolicyClass::Network, m.as_str());
        }
        for (class, re) in &self.rules {
            if let Some(m) = re.find(command) {
                return violation(*class, m.as_str());
            }
        }

        // Quoted text is data, unless a nested shell will run it as a script
        let scanned = if self.nested_shell.is_match(command) {
            command.into()
        } else {
            self.quoted.replace_all(command, "''")
        };
        for caps in self.redirection.captures_iter(&scanned) {
            let target = caps.get(1).map_or("", |m| m.as_str());
            let discarded = target.trim_end_matches(['\'', '"']) == "/dev/null";
            if !(target.is_empty() || target.starts_with('&') || discarded) {
                return violation(PolicyClass::FilesystemMutation, &caps[0]);
            }
        }

        Ok(())
    }

    /// [`check`](Self::check) mapped to a governance error at `location`.
    pub fn enforce(&self, command: &str, location: &Location) -> Result<(), GateError> {
        self.check(command).map_err(|v| GateError::Governance {
            location: location.clone(),
            command: command.to_string(),
            class: v.class.to_string(),
            pattern: v.matched,
        })
    }
}
