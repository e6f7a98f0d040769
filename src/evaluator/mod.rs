//! Value coercion, comparison operators and the restricted arithmetic
//! evaluator shared by the helper catalogs.

pub mod expression;
pub mod operators;
pub mod type_coercion;

pub use expression::{check_allowed, evaluate, evaluate_with, substitute_variables};
pub use operators::{compare, contains, equal};
pub use type_coercion::{
    format_number, is_blank, is_truthy, lookup_path, number_value, to_display_string, to_f64,
    to_f64_or_zero, type_name,
};
