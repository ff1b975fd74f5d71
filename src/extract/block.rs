//! Parsing of `<test>` elements inside a verification block

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use regex::Regex;

use crate::document::RawBlock;
use crate::error::{GateError, Location};
use crate::models::{TestDefinition, TestId, VerificationBlock};
use crate::variables::template::{is_valid_name, Template};

use super::validation::{parse_bool, split_list, strip_quotes, validate_id};

const KNOWN_FIELDS: [&str; 8] = [
    "TEST",
    "REQUIRED",
    "BLOCKING",
    "ERROR",
    "FIX_COMMAND",
    "DESCRIPTION",
    "DEPENDS_ON",
    "VARIABLES",
];

const REQUIRED_FIELDS: [&str; 4] = ["TEST", "REQUIRED", "ERROR", "DESCRIPTION"];

pub struct BlockParser {
    open_test: Regex,
    name_attribute: Regex,
}

impl Default for BlockParser {
    fn default() -> Self {
        Self::new()
    }
}

/// `KEY: value` lines of one test, with the line each came from
struct Fields {
    values: BTreeMap<String, (String, usize)>,
}

impl Fields {
    fn get(&self, key: &str) -> Option<&(String, usize)> {
        self.values.get(key)
    }
}

impl BlockParser {
    pub fn new() -> Self {
        Self {
            open_test: Regex::new(r"<test\b([^>]*)>").expect("static test tag pattern"),
            name_attribute: Regex::new(r#"\bname\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
                .expect("static name pattern"),
        }
    }

    pub fn parse(&self, raw: &RawBlock, path: &Path) -> Result<VerificationBlock, GateError> {
        let block_location = Location::at_line(path, raw.line);
        let context_check = raw.require_attribute("context-check", path)?.to_string();
        validate_id(&context_check)
            .map_err(|e| GateError::structural(block_location.clone(), format!("invalid context-check: {e}")))?;

        let body = raw.body.as_str();
        let line_at = |offset: usize| raw.line + body[..offset].matches('\n').count();

        let mut tests: Vec<TestDefinition> = Vec::new();
        let mut names: HashSet<String> = HashSet::new();
        let mut cursor = 0;

        while let Some(caps) = self.open_test.captures_at(body, cursor) {
            let open = caps.get(0).expect("group 0 always present");
            self.expect_blank(&body[cursor..open.start()], cursor, &line_at, path)?;
            let line = line_at(open.start());
            let location = Location::at_line(path, line);

            let inner_start = open.end();
            let inner_end = body[inner_start..]
                .find("</test>")
                .map(|p| inner_start + p)
                .ok_or_else(|| GateError::structural(location.clone(), "unterminated <test>: missing </test>"))?;
            let inner = &body[inner_start..inner_end];
            if inner.contains("<test") {
                return Err(GateError::structural(location, "<test> elements cannot be nested"));
            }

            let name = self
                .name_attribute
                .captures(&caps[1])
                .and_then(|c| c.get(1).or_else(|| c.get(2)))
                .map(|m| m.as_str().trim().to_string())
                .ok_or_else(|| GateError::structural(location.clone(), "<test> is missing the 'name' attribute"))?;
            validate_id(&name)
                .map_err(|e| GateError::structural(location.clone(), format!("invalid test name: {e}")))?;
            if !names.insert(name.clone()) {
                return Err(GateError::structural(
                    location,
                    format!("duplicate test name '{name}' in block '{context_check}'"),
                ));
            }

            let fields = parse_fields(inner, line_at(inner_start), path)?;
            tests.push(build_test(&context_check, name, &fields, line, path)?);
            cursor = inner_end + "</test>".len();
        }
        self.expect_blank(&body[cursor..], cursor, &line_at, path)?;

        if tests.is_empty() {
            return Err(GateError::structural(
                block_location,
                format!("verification block '{context_check}' declares no tests"),
            ));
        }

        Ok(VerificationBlock {
            context_check,
            location: block_location,
            fingerprint: raw.fingerprint(),
            tests,
        })
    }

    fn expect_blank(
        &self,
        text: &str,
        offset: usize,
        line_at: &dyn Fn(usize) -> usize,
        path: &Path,
    ) -> Result<(), GateError> {
        match text.find(|c: char| !c.is_whitespace()) {
            Some(pos) => Err(GateError::structural(
                Location::at_line(path, line_at(offset + pos)),
                "unexpected content outside <test> element",
            )),
            None => Ok(()),
        }
    }
}

fn parse_fields(inner: &str, first_line: usize, path: &Path) -> Result<Fields, GateError> {
    let mut values = BTreeMap::new();
    for (index, line) in inner.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let line_no = first_line + index;
        let location = Location::at_line(path, line_no);

        let (key, value) = trimmed
            .split_once(':')
            .filter(|(key, _)| !key.is_empty() && key.chars().all(|c| c.is_ascii_uppercase() || c == '_'))
            .ok_or_else(|| GateError::structural(location.clone(), format!("malformed line '{trimmed}': expected KEY: value")))?;

        if !KNOWN_FIELDS.contains(&key) {
            return Err(GateError::structural(location, format!("unknown field '{key}'")));
        }
        if values
            .insert(key.to_string(), (strip_quotes(value).to_string(), line_no))
            .is_some()
        {
            return Err(GateError::structural(location, format!("duplicate field '{key}'")));
        }
    }
    Ok(Fields { values })
}

fn build_test(
    context_check: &str,
    name: String,
    fields: &Fields,
    line: usize,
    path: &Path,
) -> Result<TestDefinition, GateError> {
    let missing = |key: &str| {
        GateError::structural(
            Location::at_line(path, line),
            format!("test '{name}' is missing required field {key}"),
        )
    };

    let template = |key: &str| -> Result<Option<Template>, GateError> {
        let Some((value, line)) = fields.get(key) else {
            return Ok(None);
        };
        Template::parse(value).map(Some).map_err(|e| {
            GateError::structural(
                Location::at_line(path, *line),
                format!("invalid template in {key}: {e}"),
            )
        })
    };

    let boolean = |key: &str| -> Result<Option<bool>, GateError> {
        fields
            .get(key)
            .map(|(value, line)| {
                parse_bool(value).map_err(|e| {
                    GateError::structural(Location::at_line(path, *line), format!("{key}: {e}"))
                })
            })
            .transpose()
    };

    for key in REQUIRED_FIELDS {
        if fields.get(key).is_none() {
            return Err(missing(key));
        }
    }

    let command = template("TEST")?.ok_or_else(|| missing("TEST"))?;
    if command.source().trim().is_empty() {
        return Err(GateError::structural(
            Location::at_line(path, line),
            format!("test '{name}' has an empty TEST command"),
        ));
    }
    let error_message = template("ERROR")?.ok_or_else(|| missing("ERROR"))?;
    let required = boolean("REQUIRED")?.ok_or_else(|| missing("REQUIRED"))?;
    let blocking = boolean("BLOCKING")?.unwrap_or(false);
    let fix_command = template("FIX_COMMAND")?;
    let description = fields
        .get("DESCRIPTION")
        .map(|(value, _)| value.clone())
        .ok_or_else(|| missing("DESCRIPTION"))?;

    let mut depends_on = Vec::new();
    if let Some((value, line)) = fields.get("DEPENDS_ON") {
        for reference in split_list(value) {
            let valid = reference.split('/').count() <= 2
                && reference.split('/').all(|part| validate_id(part).is_ok());
            if !valid {
                return Err(GateError::structural(
                    Location::at_line(path, *line),
                    format!("invalid DEPENDS_ON reference '{reference}'"),
                ));
            }
            depends_on.push(TestId::qualify(context_check, &reference));
        }
    }

    let mut variables = Vec::new();
    if let Some((value, line)) = fields.get("VARIABLES") {
        for var in split_list(value) {
            let var = var.trim_start_matches("${").trim_end_matches('}').to_string();
            if !is_valid_name(&var) {
                return Err(GateError::structural(
                    Location::at_line(path, *line),
                    format!("invalid variable name '{var}' in VARIABLES"),
                ));
            }
            variables.push(var);
        }
    }

    Ok(TestDefinition {
        name,
        command,
        required,
        blocking,
        error_message,
        fix_command,
        description,
        depends_on,
        variables,
        line,
    })
}
