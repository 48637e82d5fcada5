//! Declarative conditions and their compilation into WHERE predicates.
//!
//! A condition is an ordered map from key to value. Keys carry the column and an
//! optional operator suffix (`"age >="`, `"tags @>"`, `"profile ->> name ilike"`);
//! the special keys `and` / `or` hold nested condition groups.

pub mod compiler;
pub mod key;
pub mod operator;
pub mod value;

pub use compiler::{compile_where, CompiledPredicate, PredicateCompiler};
pub use key::{parse_key, ConditionKey};
pub use operator::{escape_like, OperatorDescriptor};
pub use value::{ConditionValue, Conditions};
