use crate::core::section::{read_sections, Section, Verb};
use crate::utils::error::{Result, SapperError};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Merges an incoming brick's section into the matching section of an existing file.
pub fn merge_section(base: &Section, incoming: &Section) -> Result<String> {
    if base.name != incoming.name {
        return Err(SapperError::SectionNameMismatch {
            base: base.name.clone(),
            incoming: incoming.name.clone(),
        });
    }
    if base.verb.is_some() {
        return Err(SapperError::BaseVerbDefined {
            name: base.name.clone(),
        });
    }

    match incoming.verb {
        Some(Verb::Replace) => Ok(incoming.content.clone()),
        Some(Verb::Prepend) => Ok(join_blocks(&incoming.content, &base.content)),
        Some(Verb::Append) => Ok(join_blocks(&base.content, &incoming.content)),
        Some(Verb::Merge) => {
            let mut lines: Vec<&str> = base.content.lines().collect();
            let mut seen: HashSet<&str> = lines.iter().copied().collect();
            for line in incoming.content.lines() {
                if seen.insert(line) {
                    lines.push(line);
                }
            }
            Ok(lines.join("\n"))
        }
        None => Err(SapperError::InvalidIncomingVerb {
            name: base.name.clone(),
        }),
    }
}

/// `first`, a blank line if both are non-empty, then `second`.
fn join_blocks(first: &str, second: &str) -> String {
    let mut content = String::with_capacity(first.len() + second.len() + 2);
    content.push_str(first);
    if !first.is_empty() && !second.is_empty() {
        content.push_str("\n\n");
    }
    content.push_str(second);
    content
}

/// Rebuilds `content` with every section that has a same-named incoming section replaced by
/// the merge result. Everything outside matched sections is copied verbatim.
pub fn merge_sections(content: &str, incoming: &HashMap<String, Section>) -> Result<String> {
    let base_sections = read_sections(content)?;
    let lines: Vec<&str> = content.lines().collect();
    let mut output = String::with_capacity(content.len());

    let mut next = 0;
    for section in &base_sections {
        copy_lines(&mut output, &lines[next..section.line_begin]);
        match incoming.get(&section.name) {
            Some(incoming_section) => {
                let merged = merge_section(section, incoming_section)?;
                if !merged.is_empty() {
                    output.push_str(&merged);
                    output.push('\n');
                }
            }
            None => copy_lines(&mut output, &lines[section.line_begin..section.line_end]),
        }
        next = section.line_end;
    }
    copy_lines(&mut output, &lines[next..]);

    if !content.ends_with('\n') && output.ends_with('\n') {
        output.pop();
    }
    Ok(output)
}

fn copy_lines(output: &mut String, lines: &[&str]) {
    for line in lines {
        output.push_str(line);
        output.push('\n');
    }
}

/// Replaces every `<<<NAME>>>` placeholder with its value. Unknown placeholders stay as they are.
pub fn replace_parameters(content: &str, parameters: &BTreeMap<String, String>) -> String {
    let mut content = content.to_string();
    for (name, value) in parameters {
        let pattern = format!("<<<{}>>>", name);
        if content.contains(&pattern) {
            content = content.replace(&pattern, value);
        }
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::section::index_by_name;

    fn section(name: &str, verb: Option<Verb>, content: &str) -> Section {
        Section {
            name: name.to_string(),
            verb,
            line_begin: 0,
            line_end: 0,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_replace_discards_base() {
        let base = section("A", None, "old");
        let incoming = section("A", Some(Verb::Replace), "new");
        assert_eq!(merge_section(&base, &incoming).unwrap(), "new");
    }

    #[test]
    fn test_prepend_and_append() {
        let base = section("A", None, "base");
        let prepend = section("A", Some(Verb::Prepend), "first");
        let append = section("A", Some(Verb::Append), "last");
        assert_eq!(merge_section(&base, &prepend).unwrap(), "first\n\nbase");
        assert_eq!(merge_section(&base, &append).unwrap(), "base\n\nlast");
    }

    #[test]
    fn test_append_to_empty_base_has_no_separator() {
        let base = section("A", None, "");
        let append = section("A", Some(Verb::Append), "only");
        assert_eq!(merge_section(&base, &append).unwrap(), "only");

        let empty_incoming = section("A", Some(Verb::Prepend), "");
        let base = section("A", None, "kept");
        assert_eq!(merge_section(&base, &empty_incoming).unwrap(), "kept");
    }

    #[test]
    fn test_merge_unions_lines() {
        let base = section("A", None, "a");
        let incoming = section("A", Some(Verb::Merge), "a\nb");
        assert_eq!(merge_section(&base, &incoming).unwrap(), "a\nb");
    }

    #[test]
    fn test_merge_keeps_base_order_and_appends_novel_lines_in_order() {
        let base = section("A", None, "c\na\nc");
        let incoming = section("A", Some(Verb::Merge), "b\na\nd\nb");
        assert_eq!(merge_section(&base, &incoming).unwrap(), "c\na\nc\nb\nd");
    }

    #[test]
    fn test_base_with_verb_is_rejected() {
        let base = section("A", Some(Verb::Append), "x");
        let incoming = section("A", Some(Verb::Append), "y");
        assert!(matches!(
            merge_section(&base, &incoming),
            Err(SapperError::BaseVerbDefined { .. })
        ));
    }

    #[test]
    fn test_name_mismatch_is_rejected() {
        let base = section("A", None, "x");
        let incoming = section("B", Some(Verb::Append), "y");
        assert!(matches!(
            merge_section(&base, &incoming),
            Err(SapperError::SectionNameMismatch { .. })
        ));
    }

    #[test]
    fn test_missing_incoming_verb_is_rejected() {
        let base = section("A", None, "x");
        let incoming = section("A", None, "y");
        let err = merge_section(&base, &incoming).unwrap_err();
        assert!(matches!(err, SapperError::InvalidIncomingVerb { .. }));
        assert_eq!(
            err.to_string(),
            "unable to merge section A: incoming operation is missing"
        );
    }

    #[test]
    fn test_merge_sections_without_tags_is_identity() {
        let content = "int main() {\n  return 0;\n}\n";
        assert_eq!(merge_sections(content, &HashMap::new()).unwrap(), content);

        let no_trailing_newline = "a\nb";
        assert_eq!(
            merge_sections(no_trailing_newline, &HashMap::new()).unwrap(),
            no_trailing_newline
        );
    }

    #[test]
    fn test_merge_sections_append_keeps_tags() {
        let base = "head\n// <<<SAPPER SECTION BEGIN INCLUDES>>>\n#include <a>\n// <<<SAPPER SECTION END INCLUDES>>>\ntail\n";
        let incoming_text = "// <<<SAPPER SECTION BEGIN APPEND INCLUDES>>>\n#include <b>\n// <<<SAPPER SECTION END INCLUDES>>>\n";
        let incoming = index_by_name(read_sections(incoming_text).unwrap());

        let merged = merge_sections(base, &incoming).unwrap();
        assert_eq!(
            merged,
            "head\n// <<<SAPPER SECTION BEGIN INCLUDES>>>\n#include <a>\n\n#include <b>\n// <<<SAPPER SECTION END INCLUDES>>>\ntail\n"
        );
    }

    #[test]
    fn test_merge_sections_leaves_unmatched_sections() {
        let base = "<<<SAPPER SECTION BEGIN A>>>\na\n<<<SAPPER SECTION END A>>>\n<<<SAPPER SECTION BEGIN B>>>\nb\n<<<SAPPER SECTION END B>>>\n";
        let incoming = index_by_name(vec![section("B", Some(Verb::Replace), "b2")]);
        let merged = merge_sections(base, &incoming).unwrap();
        assert_eq!(
            merged,
            "<<<SAPPER SECTION BEGIN A>>>\na\n<<<SAPPER SECTION END A>>>\n<<<SAPPER SECTION BEGIN B>>>\nb2\n<<<SAPPER SECTION END B>>>\n"
        );
    }

    #[test]
    fn test_merge_sections_replace_with_empty_content() {
        let base = "<<<SAPPER SECTION BEGIN A>>>\na\n<<<SAPPER SECTION END A>>>\n";
        let incoming = index_by_name(vec![section("A", Some(Verb::Replace), "")]);
        assert_eq!(
            merge_sections(base, &incoming).unwrap(),
            "<<<SAPPER SECTION BEGIN A>>>\n<<<SAPPER SECTION END A>>>\n"
        );
    }

    #[test]
    fn test_merge_sections_propagates_errors() {
        let base = "<<<SAPPER SECTION BEGIN A>>>\na\n<<<SAPPER SECTION END A>>>\n";
        let incoming = index_by_name(vec![section("A", None, "b")]);
        assert!(merge_sections(base, &incoming).is_err());

        assert!(merge_sections("<<<SAPPER SECTION END A>>>\n", &HashMap::new()).is_err());
    }

    #[test]
    fn test_replace_parameters() {
        let mut parameters = BTreeMap::new();
        parameters.insert("NAME".to_string(), "orders".to_string());
        parameters.insert("PORT".to_string(), "8080".to_string());

        let content = "project(<<<NAME>>>) # <<<NAME>>> on <<<PORT>>>\n<<<UNKNOWN>>>";
        assert_eq!(
            replace_parameters(content, &parameters),
            "project(orders) # orders on 8080\n<<<UNKNOWN>>>"
        );
    }
}
