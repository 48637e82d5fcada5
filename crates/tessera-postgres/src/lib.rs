//! Typed condition compiler and value codec for PostgreSQL.
//!
//! Declarative condition objects (`{"age >=": 18, "or": [...]}`) are compiled into
//! parameterized SQL with placeholders numbered in document order, and values
//! travel between application types and PostgreSQL's text formats through a
//! codec driven by per-column field kinds.
//!
//! # Architecture
//!
//! ```text
//! Conditions + FieldKinds ──> condition::compile_where ──┐
//! QueryOptions ─────────────> query::compile_* ──────────┼─> TableQuery::build_* ─> Executor
//! values ───────────────────> codec::encode_param ───────┘
//! rows (text literals) ─────> codec::decode_*
//! ```
//!
//! # Usage Examples
//!
//! ## Compiling a WHERE clause
//!
//! ```rust,ignore
//! use tessera_postgres::{compile_where, Conditions, FieldKind, FieldKinds};
//!
//! let kinds = FieldKinds::new().with("favourites", FieldKind::Array);
//! let conditions = Conditions::new()
//!     .with("membership", "bronze")
//!     .or(vec![
//!         Conditions::new().with("name", "BC"),
//!         Conditions::new().with("favourites", "food").with("name", "E"),
//!     ]);
//!
//! let compiled = compile_where(&conditions, &kinds, "\"users\"", 0)?;
//! // "membership" = $1 AND (("name" = $2) OR ($3 = ANY("favourites") AND "name" = $4))
//! ```
//!
//! ## Running a statement
//!
//! ```rust,ignore
//! use tessera_postgres::{Conditions, PgExecutor, QueryOptions, TableQuery};
//!
//! # async fn example(pool: sqlx::PgPool) -> tessera_postgres::Result<()> {
//! let executor = PgExecutor::new(pool);
//! let users = TableQuery::new("users")?;
//! let rows = users
//!     .find(&executor, &Conditions::new().with("age >", 30), &QueryOptions::new().limit(10))
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Safety
//!
//! Values are always bound as parameters. Table names are validated; column
//! names are quoted with embedded quotes doubled unless escaping is turned off,
//! in which case only minimal checks apply.

/// Bind values and per-column field kinds.
pub mod types;

/// Text-format array/composite decoding and bind-parameter encoding.
pub mod codec;

/// Operator registry, condition keys, condition trees and the WHERE compiler.
pub mod condition;

/// Query options and the per-table statement builder.
pub mod query;

/// Compiler configuration.
pub mod config;

/// Execution seam with a retrying sqlx implementation.
pub mod executor;

pub use codec::{
    coerce_date, decode_array, decode_bool_array, decode_checked_number_array, decode_composite,
    decode_composite_array, decode_date_array, decode_json_array, decode_number_array,
    decode_text_value, encode_param, parse_checked_number, parse_number, parse_timestamp,
    MAX_SAFE_INTEGER,
};
pub use condition::{
    compile_where, parse_key, CompiledPredicate, ConditionKey, ConditionValue, Conditions,
    OperatorDescriptor, PredicateCompiler,
};
pub use config::{CompilerConfig, ForceEscapeColumns, UndefinedPolicy};
pub use executor::{Executor, ExecutorConfig, PgExecutor};
pub use query::{
    compile_fields, compile_query_options, escape_identifier, quote_identifier, Fields, GroupBy,
    OrderBy, QueryOptions, SortDirection, TableQuery,
};
pub use types::{bind_all, ExtractedValue, FieldKind, FieldKindLookup, FieldKinds};

pub use tessera_common::{Result, TesseraError};
