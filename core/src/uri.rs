//! Table API path construction.

/// Path prefix shared by every table resource.
pub const TABLE_API_PREFIX: &str = "/api/now/table/";

/// Build `/api/now/table/<resource>[?<query>]`.
///
/// An absent or empty query adds nothing, so there is never a bare trailing
/// `?`. The resource name is used verbatim; an empty one yields the bare
/// prefix.
pub fn table_uri(resource: &str, query: Option<&str>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("{TABLE_API_PREFIX}{resource}?{q}"),
        _ => format!("{TABLE_API_PREFIX}{resource}"),
    }
}
