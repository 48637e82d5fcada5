//! Value codec between application values and PostgreSQL's text representation.
//!
//! - [`decode`] parses array and composite literals as returned by the server,
//!   with typed helpers layered on top (booleans, numbers, dates, JSON).
//! - [`encode`] prepares bind parameters from a value and the column's
//!   [`FieldKind`](crate::FieldKind).

pub mod decode;
pub mod encode;

pub use decode::{
    decode_array, decode_bool_array, decode_checked_number_array, decode_composite,
    decode_composite_array, decode_date_array, decode_json_array, decode_number_array,
    decode_text_value, parse_checked_number, parse_number, parse_timestamp, MAX_SAFE_INTEGER,
};
pub use encode::{coerce_date, encode_param};
