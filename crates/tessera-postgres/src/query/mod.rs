//! Statement building on top of the condition compiler.
//!
//! # Examples
//!
//! ## SELECT Query
//!
//! ```ignore
//! use tessera_postgres::{Conditions, FieldKind, FieldKinds, QueryOptions, TableQuery};
//!
//! let query = TableQuery::new("users")?
//!     .with_field_kinds(FieldKinds::new().with("favourites", FieldKind::Array));
//!
//! let conditions = Conditions::new()
//!     .with("age >=", 18)
//!     .with("favourites", "food");
//! let options = QueryOptions::new().fields(["id", "name"]).order_by("-age").limit(10);
//!
//! let (sql, params) = query.build_select(&conditions, &options)?;
//! // SELECT "id", "name" FROM "users" WHERE "age" >= $1 AND $2 = ANY("favourites") ORDER BY "age" DESC LIMIT 10
//! ```
//!
//! ## UPDATE Query
//!
//! ```ignore
//! let values = vec![("name".to_string(), ExtractedValue::from("Bob"))];
//! let (sql, params) = query.build_update(&Conditions::new().with("id", 42), &values)?;
//! // UPDATE "users" SET "name" = $1 WHERE "id" = $2
//! ```

mod builder;
mod helpers;
mod modify;
mod options;
mod select;


pub use builder::TableQuery;
pub use helpers::{
    check_unescaped, escape_identifier, quote_identifier, validate_identifier,
    validate_identifier_part,
};
pub use options::{
    compile_fields, compile_query_options, Fields, GroupBy, OrderBy, QueryOptions, SortDirection,
};
