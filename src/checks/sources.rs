// Checks that the dashboard sources display the values of the datasheet.

use std::fs;

use log::{debug, info};
use regex::Regex;
use snafu::prelude::*;

use crate::checks::config_reader::SourceCheck;
use crate::checks::io_common::simplify_file_name;
use crate::checks::{CheckResult, InvalidPatternSnafu, OpeningSourceSnafu};

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum FieldOutcome {
    Match { found: String },
    Mismatch { found: String },
    NotFound,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct FieldCheck {
    pub name: String,
    pub expected: String,
    pub outcome: FieldOutcome,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct LiteralCheck {
    pub text: String,
    /// The text or alternative that was found.
    pub found: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct SourceReport {
    pub path: String,
    pub file_name: String,
    pub fields: Vec<FieldCheck>,
    pub literals: Vec<LiteralCheck>,
}

impl SourceReport {
    pub fn failures(&self) -> Vec<String> {
        let mut res = Vec::new();
        for f in self.fields.iter() {
            match &f.outcome {
                FieldOutcome::Match { .. } => {}
                FieldOutcome::Mismatch { found } => res.push(format!(
                    "{}: {}: {:?} (expected {:?})",
                    self.file_name, f.name, found, f.expected
                )),
                FieldOutcome::NotFound => {
                    res.push(format!("{}: {}: not found", self.file_name, f.name))
                }
            }
        }
        for l in self.literals.iter().filter(|l| l.found.is_none()) {
            res.push(format!("{}: missing text {:?}", self.file_name, l.text));
        }
        res
    }
}

pub fn check_source_file(check: &SourceCheck) -> CheckResult<SourceReport> {
    info!("Checking source file {:?}", check.file_path);
    let content = fs::read_to_string(&check.file_path).context(OpeningSourceSnafu {
        path: check.file_path.as_str(),
    })?;
    check_source_content(&check.file_path, &content, check)
}

pub fn check_source_content(
    path: &str,
    content: &str,
    check: &SourceCheck,
) -> CheckResult<SourceReport> {
    let mut fields = Vec::new();
    for (name, expected) in check.fields.iter() {
        let outcome = match find_field(content, name)? {
            Some(found) if values_match(&found, expected) => FieldOutcome::Match { found },
            Some(found) => FieldOutcome::Mismatch { found },
            None => FieldOutcome::NotFound,
        };
        debug!("check_source_content: {}: {:?}", name, outcome);
        fields.push(FieldCheck {
            name: name.clone(),
            expected: expected.clone(),
            outcome,
        });
    }

    let literals = check
        .literals
        .iter()
        .map(|l| LiteralCheck {
            text: l.text.clone(),
            found: std::iter::once(&l.text)
                .chain(l.alternatives.iter())
                .find(|t| content.contains(t.as_str()))
                .cloned(),
        })
        .collect();

    Ok(SourceReport {
        path: path.to_string(),
        file_name: simplify_file_name(path),
        fields,
        literals,
    })
}

/// Finds the value assigned to a field, as in `name: 'value'` or `name: 123`.
pub fn find_field(content: &str, name: &str) -> CheckResult<Option<String>> {
    let escaped = regex::escape(name);
    let pattern = format!(
        r#"{0}:\s*['"](.*?)['"]|{0}:\s*(\d+)"#,
        escaped
    );
    let re = Regex::new(&pattern).context(InvalidPatternSnafu { field: name })?;
    Ok(re.captures(content).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string())
    }))
}

/// Integers are compared by value, everything else as exact text.
fn values_match(found: &str, expected: &str) -> bool {
    match (found.trim().parse::<i64>(), expected.trim().parse::<i64>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => found == expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::config_reader::ExpectedLiteral;
    use std::collections::BTreeMap;

    const QUESTIONS_MAP: &str = r#"
export const technicalSheet = {
  period: '15 de abril al 01 de junio de 2025',
  methodology: "Web, mediante SurveyMonkey",
  sampleSize: 1445,
  universeTotal: 24067,
  confidenceLevel: '95%',
  marginOfError: '±2,50%',
  responseRate: '6%'
};
export const metrics = ['Claridad de la Información (Atención)', 'Satisfacción General', 'Recomendación'];
"#;

    fn check(fields: &[(&str, &str)], literals: Vec<ExpectedLiteral>) -> SourceCheck {
        SourceCheck {
            file_path: "src/data/questionsMap.ts".to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<String, String>>(),
            literals,
        }
    }

    #[test]
    fn datasheet_fields() {
        let c = check(
            &[
                ("period", "15 de abril al 01 de junio de 2025"),
                ("methodology", "Web, mediante SurveyMonkey"),
                ("sampleSize", "1445"),
                ("universeTotal", "24,067"),
                ("marginOfError", "±2,50%"),
                ("responseRate", "6,00%"),
                ("fieldworkDays", "48"),
            ],
            vec![],
        );
        let r = check_source_content(&c.file_path, QUESTIONS_MAP, &c).unwrap();
        assert_eq!(r.file_name, "questionsMap.ts");
        let outcome = |name: &str| {
            r.fields
                .iter()
                .find(|f| f.name == name)
                .map(|f| f.outcome.clone())
                .unwrap()
        };
        assert!(matches!(outcome("period"), FieldOutcome::Match { .. }));
        assert!(matches!(outcome("methodology"), FieldOutcome::Match { .. }));
        assert!(matches!(outcome("sampleSize"), FieldOutcome::Match { .. }));
        assert!(matches!(outcome("marginOfError"), FieldOutcome::Match { .. }));
        // Not an integer on the expected side: compared as text
        assert_eq!(
            outcome("universeTotal"),
            FieldOutcome::Mismatch {
                found: "24067".to_string()
            }
        );
        assert_eq!(
            outcome("responseRate"),
            FieldOutcome::Mismatch {
                found: "6%".to_string()
            }
        );
        assert_eq!(outcome("fieldworkDays"), FieldOutcome::NotFound);
        assert_eq!(r.failures().len(), 3);
    }

    #[test]
    fn literals_and_alternatives() {
        let c = check(
            &[],
            vec![
                ExpectedLiteral {
                    text: "Satisfacción General".to_string(),
                    alternatives: vec![],
                },
                ExpectedLiteral {
                    text: "Nivel de Recomendación".to_string(),
                    alternatives: vec!["Recomendación".to_string()],
                },
                ExpectedLiteral {
                    text: "Lealtad del Cliente".to_string(),
                    alternatives: vec![],
                },
            ],
        );
        let r = check_source_content(&c.file_path, QUESTIONS_MAP, &c).unwrap();
        assert_eq!(r.literals[0].found.as_deref(), Some("Satisfacción General"));
        assert_eq!(r.literals[1].found.as_deref(), Some("Recomendación"));
        assert_eq!(r.literals[2].found, None);
        assert_eq!(r.failures(), vec!["questionsMap.ts: missing text \"Lealtad del Cliente\""]);
    }

    #[test]
    fn field_names_are_literal() {
        assert_eq!(find_field("a.b: 3", "a.b").unwrap(), Some("3".to_string()));
        assert_eq!(find_field("axb: 3", "a.b").unwrap(), None);
    }

    #[test]
    fn missing_source_file() {
        let c = SourceCheck {
            file_path: "/nonexistent/questionsMap.ts".to_string(),
            fields: BTreeMap::new(),
            literals: vec![],
        };
        assert!(check_source_file(&c).is_err());
    }
}
