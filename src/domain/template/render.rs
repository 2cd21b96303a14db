//! Three-pass renderer: conditionals, then loops, then variables.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use super::condition::evaluate_condition;
use super::path::{lookup, stringify};
use super::Vars;

static BLOCK_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*(if\s+[^{}]*?|else|endif|for\s+[^{}]*?|endfor)\s*\}\}")
        .expect("block tag pattern is valid")
});

static FOR_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^for\s+([A-Za-z_][A-Za-z0-9_]*)\s+in\s+(.+)$").expect("for header pattern is valid")
});

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{\s*([^{}]+?)\s*\}\}").expect("placeholder pattern is valid"));

/// Renders `template` against `vars`.
///
/// Conditional blocks are resolved first, so a chosen branch may contain
/// loops and placeholders. Loop bodies are rendered recursively once per
/// item with `x` and `x_index` bound. Remaining placeholders are replaced
/// last; unresolved paths become empty text.
pub fn render(template: &str, vars: &Vars) -> String {
    if !template.contains("{{") {
        return template.to_string();
    }
    let resolved = resolve_conditionals(template, vars);
    let expanded = expand_loops(&resolved, vars);
    substitute_variables(&expanded, vars)
}

/// A matched `open ... [else ...] close` region in a string.
#[derive(Debug, PartialEq, Eq)]
struct Block<'a> {
    start: usize,
    header: &'a str,
    body_start: usize,
    else_tag: Option<(usize, usize)>,
    body_end: usize,
    end: usize,
}

/// Finds the first top-level block opened by `open` and closed by `close`.
///
/// Returns `None` when there is no opening tag or it is never closed.
fn next_block<'a>(text: &'a str, open: &str, close: &str) -> Option<Block<'a>> {
    let mut depth = 0usize;
    let mut start = 0;
    let mut header = "";
    let mut body_start = 0;
    let mut else_tag = None;

    for caps in BLOCK_TAG.captures_iter(text) {
        let (Some(tag), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let keyword = inner.as_str().split_whitespace().next().unwrap_or_default();

        if keyword == open {
            if depth == 0 {
                start = tag.start();
                header = inner.as_str();
                body_start = tag.end();
                else_tag = None;
            }
            depth += 1;
        } else if keyword == close && depth > 0 {
            depth -= 1;
            if depth == 0 {
                return Some(Block {
                    start,
                    header,
                    body_start,
                    else_tag,
                    body_end: tag.start(),
                    end: tag.end(),
                });
            }
        } else if keyword == "else" && open == "if" && depth == 1 && else_tag.is_none() {
            else_tag = Some((tag.start(), tag.end()));
        }
    }
    None
}

fn resolve_conditionals(template: &str, vars: &Vars) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(block) = next_block(rest, "if", "endif") {
        out.push_str(&rest[..block.start]);

        let expr = block.header.strip_prefix("if").unwrap_or_default().trim();
        let branch = match (evaluate_condition(expr, vars), block.else_tag) {
            (true, Some((else_start, _))) => &rest[block.body_start..else_start],
            (true, None) => &rest[block.body_start..block.body_end],
            (false, Some((_, else_end))) => &rest[else_end..block.body_end],
            (false, None) => "",
        };
        out.push_str(&resolve_conditionals(branch, vars));

        rest = &rest[block.end..];
    }

    out.push_str(rest);
    out
}

fn expand_loops(template: &str, vars: &Vars) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(block) = next_block(rest, "for", "endfor") {
        out.push_str(&rest[..block.start]);

        let body = &rest[block.body_start..block.body_end];
        if let Some(caps) = FOR_HEADER.captures(block.header.trim()) {
            let item_name = &caps[1];
            if let Some(Value::Array(items)) = lookup(vars, &caps[2]) {
                for (index, item) in items.iter().enumerate() {
                    let mut scope = vars.clone();
                    scope.insert(item_name.to_string(), item.clone());
                    scope.insert(format!("{}_index", item_name), Value::from(index));
                    out.push_str(&render(body, &scope));
                }
            }
        }

        rest = &rest[block.end..];
    }

    out.push_str(rest);
    out
}

fn substitute_variables(template: &str, vars: &Vars) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            lookup(vars, &caps[1]).map(stringify).unwrap_or_default()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn vars(value: serde_json::Value) -> Vars {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn substitutes_plain_and_nested_placeholders() {
        let vars = vars(json!({"name": "Ana", "order": {"id": 7, "total": 12.5}}));
        assert_eq!(
            render("Hi {{ name }}, order {{order.id}} costs {{order.total}}", &vars),
            "Hi Ana, order 7 costs 12.5"
        );
    }

    #[test]
    fn missing_placeholder_renders_empty() {
        let vars = vars(json!({}));
        assert_eq!(render("Hello {{nobody}}!", &vars), "Hello !");
    }

    #[test]
    fn loop_binds_item_and_index() {
        let vars = vars(json!({"items": [{"name": "Tea"}, {"name": "Cake"}]}));
        assert_eq!(
            render("{{for it in items}}{{it_index}}:{{it.name}};{{endfor}}", &vars),
            "0:Tea;1:Cake;"
        );
    }

    #[test]
    fn loop_over_missing_or_scalar_expands_to_nothing() {
        let vars = vars(json!({"count": 3}));
        assert_eq!(render("[{{for x in missing}}{{x}}{{endfor}}]", &vars), "[]");
        assert_eq!(render("[{{for x in count}}{{x}}{{endfor}}]", &vars), "[]");
    }

    #[test]
    fn nested_loops_render_recursively() {
        let vars = vars(json!({"groups": [{"tags": ["a", "b"]}, {"tags": ["c"]}]}));
        assert_eq!(
            render(
                "{{for g in groups}}({{for t in g.tags}}{{t}}{{endfor}}){{endfor}}",
                &vars
            ),
            "(ab)(c)"
        );
    }

    #[test]
    fn conditional_picks_branch() {
        let vars = vars(json!({"vip": "yes", "tier": "gold"}));
        assert_eq!(
            render("{{if tier == 'gold'}}Gold{{else}}Standard{{endif}} member", &vars),
            "Gold member"
        );
        assert_eq!(
            render("{{if tier == 'silver'}}Silver{{else}}Other{{endif}}", &vars),
            "Other"
        );
        assert_eq!(render("{{if missing}}shown{{endif}}!", &vars), "!");
    }

    #[test]
    fn conditional_content_may_contain_loops_and_variables() {
        let vars = vars(json!({"items": ["x", "y"], "name": "Bo"}));
        assert_eq!(
            render(
                "{{if items}}{{name}}: {{for i in items}}{{i}}{{endfor}}{{endif}}",
                &vars
            ),
            "Bo: xy"
        );
    }

    #[test]
    fn nested_conditionals_resolve() {
        let vars = vars(json!({"a": "1", "b": ""}));
        assert_eq!(
            render("{{if a}}A{{if b}}B{{else}}!B{{endif}}{{endif}}", &vars),
            "A!B"
        );
    }

    #[test]
    fn unclosed_blocks_degrade_without_raw_tags() {
        let vars = vars(json!({"x": "1"}));
        assert_eq!(render("start {{if x}} body", &vars), "start  body");
        assert_eq!(render("{{for i in x}} body", &vars), " body");
    }

    proptest! {
        #[test]
        fn text_without_placeholders_is_unchanged(text in "[^{}]*") {
            let vars = Vars::new();
            prop_assert_eq!(render(&text, &vars), text);
        }

        #[test]
        fn absent_paths_never_leave_raw_placeholders(
            prefix in "[a-z ]{0,10}",
            path in "[a-z]{1,8}(\\.[a-z]{1,5}){0,2}",
            suffix in "[a-z ]{0,10}",
        ) {
            let head = path.split('.').next().unwrap_or_default();
            prop_assume!(!matches!(head, "if" | "else" | "endif" | "for" | "endfor"));
            let vars = Vars::new();
            let rendered = render(&format!("{}{{{{{}}}}}{}", prefix, path, suffix), &vars);
            prop_assert_eq!(rendered, format!("{}{}", prefix, suffix));
        }
    }
}
