//! Payload attribute names shared by handlers and backends.

pub const ACCESS_TOKEN: &str = "access_token";
pub const ATTRIBUTE: &str = "attribute";
pub const AUTHORIZATION: &str = "Authorization";
pub const ACCEPT_API_VERSION: &str = "Accept-API-Version";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const APPLICATION_JSON: &str = "application/json";
pub const DATA: &str = "data";
pub const DESCRIPTION: &str = "description";
pub const HEADERS: &str = "headers";
pub const ID: &str = "id";
pub const LABEL: &str = "label";
pub const OPERATOR: &str = "operator";
pub const OWNER: &str = "owner";
pub const PATH: &str = "path";
pub const PERMISSIONS: &str = "permissions";
pub const POLICY: &str = "policy";
pub const QUERY: &str = "query";
pub const QUERY_PARAMS: &str = "query_params";
pub const RESULT: &str = "result";
pub const RESULTS: &str = "results";
pub const SCOPES: &str = "scopes";
pub const SSO_TOKEN: &str = "sso_token";
pub const SUBJECT: &str = "subject";
pub const TOKEN_ID: &str = "tokenId";
pub const UID: &str = "uid";
pub const VALUE: &str = "value";

/// Search operators understood by the document store.
pub const OPERATOR_EQUAL: &str = "equal";
pub const OPERATOR_EQ: &str = "eq";
pub const OPERATOR_NONE: &str = "none";
pub const OPERATOR_ALL: &str = "all";

/// Attributes of Authorization Server registration records.
pub mod registration {
    pub const ID: &str = "_id";
    pub const REV: &str = "_rev";
    pub const RESOURCE_SERVER: &str = "resourceServer";
    pub const RESOURCE_OWNER_ID: &str = "resourceOwnerId";
    pub const LABELS: &str = "labels";
}

/// Dotted paths into resource store records and session replies.
pub mod paths {
    pub const REGISTER: &str = "data.register";
    pub const LABEL: &str = "data.meta.label";
    pub const DESCRIPTION: &str = "data.meta.description";
    pub const DISCOVERABLE: &str = "data.meta.discoverable";
    pub const TOKEN_ID: &str = "data.tokenId";
}

/// Query parameters of the Authorization Server search API.
pub mod params {
    pub const SORT_KEYS: &str = "_sortKeys";
    pub const QUERY_FILTER: &str = "_queryFilter";
}
