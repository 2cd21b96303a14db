//! Template and expression evaluator.
//!
//! Renders outgoing text containing `{{path}}` placeholders, iteration
//! blocks (`{{for x in items}}...{{endfor}}`) and conditional blocks
//! (`{{if expr}}...{{else}}...{{endif}}`) against a variable map, and
//! evaluates standalone conditions used as flow-step skip guards.
//!
//! Every lookup is best-effort: unresolved paths render as empty text and
//! malformed expressions evaluate to `false`. Nothing here returns an error.
//!
//! ```
//! use chatflow::domain::template::{render, Vars};
//! use serde_json::json;
//!
//! let vars: Vars = json!({"name": "Ana", "items": [{"sku": "A1"}, {"sku": "B2"}]})
//!     .as_object()
//!     .cloned()
//!     .unwrap();
//! let text = render("Hi {{name}}: {{for i in items}}{{i.sku}} {{endfor}}", &vars);
//! assert_eq!(text, "Hi Ana: A1 B2 ");
//! ```

mod condition;
mod path;
mod render;

pub use condition::evaluate_condition;
pub use path::{is_truthy, lookup, stringify};
pub use render::render;

/// Variable-name-to-value mapping used for rendering and conditions.
pub type Vars = serde_json::Map<String, serde_json::Value>;
