//! API constants

pub const API_VERSION: &str = "v0";

/// Prefix every API route is nested under.
pub const API_PREFIX: &str = "/api/v0";

pub const OPENAPI_JSON_PATH: &str = "/api/openapi.json";
