//! Boolean condition evaluation.
//!
//! Grammar, loosely:
//!
//! ```text
//! expr       := term (("AND" | "OR") term)*      evaluated left to right
//! term       := "(" expr ")" | comparison | path
//! comparison := path op literal
//! op         := "==" | "!=" | ">=" | "<=" | ">" | "<"
//! literal    := 'text' | "text" | bare-word
//! ```

use serde_json::Value;

use super::path::{as_number, is_truthy, lookup, stringify};
use super::Vars;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connective {
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Comparator {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
}

impl Comparator {
    fn symbol(self) -> &'static str {
        match self {
            Comparator::Eq => "==",
            Comparator::Ne => "!=",
            Comparator::Gt => ">",
            Comparator::Lt => "<",
            Comparator::Ge => ">=",
            Comparator::Le => "<=",
        }
    }
}

// Two-character operators first so `>=` is not read as `>`.
const COMPARATORS: [Comparator; 6] = [
    Comparator::Eq,
    Comparator::Ne,
    Comparator::Ge,
    Comparator::Le,
    Comparator::Gt,
    Comparator::Lt,
];

/// Evaluates `expr` against `vars`.
///
/// Malformed expressions evaluate to `false`.
pub fn evaluate_condition(expr: &str, vars: &Vars) -> bool {
    let expr = expr.trim();
    if expr.is_empty() {
        return false;
    }

    let Some((first, rest)) = split_connectives(expr) else {
        return false;
    };

    rest.into_iter()
        .fold(evaluate_term(first, vars), |acc, (connective, term)| {
            match connective {
                Connective::And => acc && evaluate_term(term, vars),
                Connective::Or => acc || evaluate_term(term, vars),
            }
        })
}

/// Splits on top-level `AND`/`OR` outside quotes and parentheses.
///
/// Returns `None` for unbalanced parentheses or quotes.
fn split_connectives(expr: &str) -> Option<(&str, Vec<(Connective, &str)>)> {
    let bytes = expr.as_bytes();
    let mut depth = 0i32;
    let mut quote: Option<u8> = None;
    let mut pieces = Vec::new();
    let mut pending: Option<Connective> = None;
    let mut term_start = 0;
    let mut first: Option<&str> = None;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'\'' | b'"' => quote = Some(b),
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth < 0 {
                    return None;
                }
            }
            _ if depth == 0 && b.is_ascii_whitespace() => {
                if let Some((connective, len)) = connective_at(expr, i + 1) {
                    let term = expr[term_start..i].trim();
                    match pending {
                        None => first = Some(term),
                        Some(prev) => pieces.push((prev, term)),
                    }
                    pending = Some(connective);
                    term_start = i + 1 + len;
                    i = term_start;
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }

    if depth != 0 || quote.is_some() {
        return None;
    }

    let last = expr[term_start..].trim();
    match pending {
        None => first = Some(last),
        Some(prev) => pieces.push((prev, last)),
    }
    first.map(|f| (f, pieces))
}

/// Recognizes `AND ` / `OR ` (any case) starting at `at`.
fn connective_at(expr: &str, at: usize) -> Option<(Connective, usize)> {
    let tail = expr.get(at..)?;
    for (word, connective) in [("AND", Connective::And), ("OR", Connective::Or)] {
        let is_word = tail
            .get(..word.len())
            .is_some_and(|w| w.eq_ignore_ascii_case(word));
        let followed_by_space = tail
            .as_bytes()
            .get(word.len())
            .is_some_and(|b| b.is_ascii_whitespace());
        if is_word && followed_by_space {
            return Some((connective, word.len()));
        }
    }
    None
}

fn evaluate_term(term: &str, vars: &Vars) -> bool {
    let term = term.trim();
    if term.is_empty() {
        return false;
    }

    if let Some(inner) = term.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        return evaluate_condition(inner, vars);
    }

    match find_comparator(term) {
        Some((at, comparator)) => {
            let path = term[..at].trim();
            let literal = term[at + comparator.symbol().len()..].trim();
            compare(lookup(vars, path), comparator, &parse_literal(literal, vars))
        }
        None => is_truthy(lookup(vars, term)),
    }
}

/// Finds the first comparator outside quotes.
fn find_comparator(term: &str) -> Option<(usize, Comparator)> {
    let mut quote: Option<char> = None;
    for (i, c) in term.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None => {
                let rest = &term[i..];
                if let Some(comparator) = COMPARATORS
                    .iter()
                    .find(|cmp| rest.starts_with(cmp.symbol()))
                {
                    return Some((i, *comparator));
                }
            }
        }
    }
    None
}

fn parse_literal(literal: &str, vars: &Vars) -> Value {
    for q in ['\'', '"'] {
        if literal.len() >= 2 && literal.starts_with(q) && literal.ends_with(q) {
            return Value::String(literal[1..literal.len() - 1].to_string());
        }
    }
    match lookup(vars, literal) {
        Some(value) => value.clone(),
        None => Value::String(literal.to_string()),
    }
}

fn compare(left: Option<&Value>, comparator: Comparator, right: &Value) -> bool {
    let left = left.cloned().unwrap_or(Value::Null);
    match comparator {
        Comparator::Eq => loosely_equal(&left, right),
        Comparator::Ne => !loosely_equal(&left, right),
        ordered => {
            let (Some(l), Some(r)) = (as_number(&left), as_number(right)) else {
                return false;
            };
            match ordered {
                Comparator::Gt => l > r,
                Comparator::Lt => l < r,
                Comparator::Ge => l >= r,
                Comparator::Le => l <= r,
                Comparator::Eq | Comparator::Ne => false,
            }
        }
    }
}

fn loosely_equal(left: &Value, right: &Value) -> bool {
    if let (Some(l), Some(r)) = (as_number(left), as_number(right)) {
        return l == r;
    }
    stringify(left) == stringify(right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(value: serde_json::Value) -> Vars {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn equality_with_either_quote_style() {
        let vars = vars(json!({"plan": "pro"}));
        assert!(evaluate_condition("plan == 'pro'", &vars));
        assert!(evaluate_condition("plan == \"pro\"", &vars));
        assert!(!evaluate_condition("plan != 'pro'", &vars));
        assert!(evaluate_condition("plan != 'free'", &vars));
    }

    #[test]
    fn compound_and_or() {
        let matching = vars(json!({"a": "1", "b": "2"}));
        assert!(evaluate_condition("a == '1' AND b == '2'", &matching));

        let left_off = vars(json!({"a": "9", "b": "2"}));
        let right_off = vars(json!({"a": "1", "b": "9"}));
        assert!(!evaluate_condition("a == '1' AND b == '2'", &left_off));
        assert!(!evaluate_condition("a == '1' AND b == '2'", &right_off));

        assert!(evaluate_condition("a == '1' OR b == '2'", &left_off));
        assert!(evaluate_condition("a == '1' OR b == '2'", &right_off));
        let none = vars(json!({"a": "0", "b": "0"}));
        assert!(!evaluate_condition("a == '1' OR b == '2'", &none));
    }

    #[test]
    fn connectives_evaluate_left_to_right() {
        let vars = vars(json!({"a": "1", "b": "0", "c": "1"}));
        // (a OR b) AND c, not a OR (b AND c)
        assert!(evaluate_condition("a OR b AND c", &vars));
        assert!(!evaluate_condition("b AND c OR b", &vars));
    }

    #[test]
    fn parenthesized_sub_expression() {
        let vars = vars(json!({"a": "1", "b": "", "c": ""}));
        assert!(evaluate_condition("a AND (b OR a)", &vars));
        assert!(!evaluate_condition("(b OR c) AND a", &vars));
    }

    #[test]
    fn quoted_connectives_do_not_split() {
        let vars = vars(json!({"phrase": "salt AND pepper"}));
        assert!(evaluate_condition("phrase == 'salt AND pepper'", &vars));
    }

    #[test]
    fn numeric_comparisons_coerce() {
        let vars = vars(json!({"age": "21", "score": 7.5}));
        assert!(evaluate_condition("age >= 18", &vars));
        assert!(evaluate_condition("age > '20'", &vars));
        assert!(!evaluate_condition("age < 21", &vars));
        assert!(evaluate_condition("age <= 21", &vars));
        assert!(evaluate_condition("score > 7", &vars));
        assert!(evaluate_condition("score == '7.5'", &vars));
    }

    #[test]
    fn failed_numeric_coercion_is_false() {
        let vars = vars(json!({"age": "unknown"}));
        assert!(!evaluate_condition("age > 18", &vars));
        assert!(!evaluate_condition("age < 18", &vars));
        assert!(!evaluate_condition("missing >= 0", &vars));
    }

    #[test]
    fn bare_path_is_truthiness() {
        let vars = vars(json!({"yes": "y", "no": "false", "zero": 0, "list": [1]}));
        assert!(evaluate_condition("yes", &vars));
        assert!(!evaluate_condition("no", &vars));
        assert!(!evaluate_condition("zero", &vars));
        assert!(evaluate_condition("list", &vars));
        assert!(!evaluate_condition("absent", &vars));
    }

    #[test]
    fn missing_path_equals_empty_string() {
        let vars = vars(json!({}));
        assert!(evaluate_condition("name == ''", &vars));
        assert!(!evaluate_condition("name == 'x'", &vars));
    }

    #[test]
    fn malformed_expressions_are_false() {
        let vars = vars(json!({"a": "1"}));
        assert!(!evaluate_condition("", &vars));
        assert!(!evaluate_condition("(a", &vars));
        assert!(!evaluate_condition("a == 'unterminated", &vars));
        assert!(!evaluate_condition("a AND", &vars));
    }

    #[test]
    fn non_ascii_words_are_not_mistaken_for_connectives() {
        let vars = vars(json!({"city": "Oé", "name": "Añez"}));
        assert!(evaluate_condition("city == Oé", &vars));
        assert!(evaluate_condition("city == 'Oé'", &vars));
        assert!(!evaluate_condition("city == ANé", &vars));
        assert!(evaluate_condition("name == 'Añez' OR city == 'x'", &vars));
        assert!(!evaluate_condition("missing == Añ", &vars));
        assert!(!evaluate_condition("x ORé", &vars));
    }
}
