//! `${name}` variable substitution applied to document text before parsing.

use std::collections::BTreeMap;

use crate::{ProjectError, ProjectResult};

/// Variables available to a document template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateVars {
    vars: BTreeMap<String, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Parse `name=value`, as given on a command line.
    pub fn parse_assignment(assignment: &str) -> ProjectResult<(String, String)> {
        match assignment.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => Ok((name.trim().to_string(), value.to_string())),
            _ => Err(ProjectError::Template {
                what: format!("expected name=value, got '{assignment}'"),
            }),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TemplateVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Replace every `${name}` in `text`. `$${` is kept as a literal `${`.
pub fn substitute(text: &str, vars: &TemplateVars) -> ProjectResult<String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('$') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix("$${") {
            out.push_str("${");
            rest = after;
        } else if let Some(after) = tail.strip_prefix("${") {
            let end = after.find('}').ok_or_else(|| ProjectError::Template {
                what: format!(
                    "unterminated variable near '{}'",
                    tail.chars().take(24).collect::<String>()
                ),
            })?;
            let name = after[..end].trim();
            let value = vars.get(name).ok_or_else(|| ProjectError::UnknownVariable {
                name: name.to_string(),
            })?;
            out.push_str(value);
            rest = &after[end + 1..];
        } else {
            out.push('$');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> TemplateVars {
        [("input", "scene.tif"), ("limit", "0.5")].into_iter().collect()
    }

    #[test]
    fn substitutes_known_variables() {
        let text = "path: ${input}\nthreshold: ${ limit }\ncost: $5";
        assert_eq!(
            substitute(text, &vars()).unwrap(),
            "path: scene.tif\nthreshold: 0.5\ncost: $5"
        );
    }

    #[test]
    fn escaped_marker_is_literal() {
        assert_eq!(substitute("a $${input} b", &vars()).unwrap(), "a ${input} b");
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let err = substitute("${nope}", &vars()).unwrap_err();
        assert!(matches!(err, ProjectError::UnknownVariable { name } if name == "nope"));
    }

    #[test]
    fn unterminated_variable_is_an_error() {
        assert!(matches!(
            substitute("x: ${input", &vars()),
            Err(ProjectError::Template { .. })
        ));
    }

    #[test]
    fn parse_assignment_splits_once() {
        assert_eq!(
            TemplateVars::parse_assignment("expr=a=b").unwrap(),
            ("expr".to_string(), "a=b".to_string())
        );
        assert!(TemplateVars::parse_assignment("novalue").is_err());
        assert!(TemplateVars::parse_assignment("=x").is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn text_without_markers_is_unchanged(text in "[^$]*") {
                prop_assert_eq!(substitute(&text, &vars()).unwrap(), text);
            }

            #[test]
            fn substituted_value_is_inserted_verbatim(value in "[a-zA-Z0-9 ._/-]{0,32}") {
                let vars: TemplateVars = [("v", value.as_str())].into_iter().collect();
                prop_assert_eq!(substitute("<${v}>", &vars).unwrap(), format!("<{value}>"));
            }
        }
    }
}
