//! JSDoc comment parsing.
//!
//! A JSDoc block splits into free text (the description) and `@tag` lines.
//! Tags that map to JSON Schema keywords are applied to a node's
//! [`Annotations`]; the rest (`@param`, `@returns`, `@template`, ...) are
//! kept but ignored when lowering.

use schemagen_schemas::Annotations;
use serde_json::{Number, Value};

/// A parsed JSDoc block.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Doc {
    pub description: Option<String>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Tag {
    pub name: String,
    pub text: String,
}

/// Parses the raw body of a `/** ... */` block (delimiters excluded).
pub(crate) fn parse(raw: &str) -> Doc {
    let mut description = Vec::new();
    let mut tags: Vec<(String, Vec<&str>)> = Vec::new();

    for line in raw.lines() {
        let line = strip_gutter(line);
        if let Some(rest) = line.strip_prefix('@') {
            let (name, text) = rest
                .split_once(char::is_whitespace)
                .unwrap_or((rest, ""));
            tags.push((name.to_string(), vec![text.trim()]));
        } else if let Some((_, text)) = tags.last_mut() {
            text.push(line.trim());
        } else {
            description.push(line);
        }
    }

    Doc {
        description: join_lines(&description),
        tags: tags
            .into_iter()
            .map(|(name, lines)| Tag {
                name,
                text: join_lines(&lines).unwrap_or_default(),
            })
            .collect(),
    }
}

/// Strips leading whitespace and the conventional `*` gutter.
fn strip_gutter(line: &str) -> &str {
    let line = line.trim_start();
    let line = line.strip_prefix('*').unwrap_or(line);
    line.strip_prefix(' ').unwrap_or(line).trim_end()
}

/// Joins lines with `\n`, dropping blank lines at either end.
fn join_lines(lines: &[&str]) -> Option<String> {
    let first = lines.iter().position(|l| !l.trim().is_empty())?;
    let last = lines.iter().rposition(|l| !l.trim().is_empty())?;
    Some(lines[first..=last].join("\n").trim().to_string())
}

/// Interprets tag text as JSON, falling back to a plain string.
fn json_or_string(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.into()))
}

impl Doc {
    /// Copies the description and schema-relevant tags onto `annotations`.
    ///
    /// Tag values that do not parse (e.g. `@minimum abc`) are skipped.
    pub(crate) fn apply(&self, annotations: &mut Annotations) {
        if let Some(description) = &self.description {
            annotations.description = Some(description.clone());
        }
        for tag in &self.tags {
            let text = tag.text.as_str();
            match tag.name.as_str() {
                "description" if !text.is_empty() => {
                    annotations.description = Some(text.to_string());
                }
                "title" if !text.is_empty() => {
                    annotations.title = Some(text.to_string());
                }
                "default" => annotations.default = Some(json_or_string(text)),
                "deprecated" => annotations.deprecated = true,
                "example" | "examples" => {
                    annotations.examples.push(json_or_string(text));
                }
                "minimum" => annotations.minimum = text.parse::<Number>().ok(),
                "maximum" => annotations.maximum = text.parse::<Number>().ok(),
                "minLength" => annotations.min_length = text.parse().ok(),
                "maxLength" => annotations.max_length = text.parse().ok(),
                "pattern" if !text.is_empty() => {
                    annotations.pattern = Some(text.to_string());
                }
                "format" if !text.is_empty() => {
                    annotations.format = Some(text.to_string());
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn single_line_description() {
        let doc = parse(" Maximum number of retry attempts ");
        assert_eq!(
            doc.description.as_deref(),
            Some("Maximum number of retry attempts")
        );
        assert!(doc.tags.is_empty());
    }

    #[test]
    fn multi_line_description_stops_at_tags() {
        let raw = "
 * Base workflow interface
 *
 * Creating a run IS starting it.
 *
 * @template Output - The type of result
 * @param prompt - The input
 *   continued here
 ";
        let doc = parse(raw);
        assert_eq!(
            doc.description.as_deref(),
            Some("Base workflow interface\n\nCreating a run IS starting it.")
        );
        assert_eq!(doc.tags.len(), 2);
        assert_eq!(doc.tags[0].name, "template");
        assert_eq!(doc.tags[0].text, "Output - The type of result");
        assert_eq!(doc.tags[1].text, "prompt - The input\ncontinued here");
    }

    #[test]
    fn tag_only_block_has_no_description() {
        let doc = parse("\n * @deprecated\n ");
        assert_eq!(doc.description, None);
        assert_eq!(doc.tags[0].name, "deprecated");
        assert_eq!(doc.tags[0].text, "");
    }

    #[test]
    fn applies_schema_tags() {
        let raw = "
 * Attempt count
 * @default 3
 * @minimum 0
 * @maximum 10.5
 * @maxLength 4
 * @example [1, 2]
 * @example not json
 * @format uri
 * @param ignored - not a keyword
 ";
        let mut annotations = Annotations::default();
        parse(raw).apply(&mut annotations);

        assert_eq!(annotations.description.as_deref(), Some("Attempt count"));
        assert_eq!(annotations.default, Some(json!(3)));
        assert_eq!(annotations.minimum, Some(Number::from(0)));
        assert_eq!(annotations.maximum.map(|n| n.as_f64()), Some(Some(10.5)));
        assert_eq!(annotations.max_length, Some(4));
        assert_eq!(annotations.examples, [json!([1, 2]), json!("not json")]);
        assert_eq!(annotations.format.as_deref(), Some("uri"));
        assert!(!annotations.deprecated);
    }

    #[test]
    fn unparseable_numeric_tags_are_skipped() {
        let mut annotations = Annotations::default();
        parse(" @minimum lots\n @minLength -1").apply(&mut annotations);
        assert_eq!(annotations.minimum, None);
        assert_eq!(annotations.min_length, None);
    }
}
