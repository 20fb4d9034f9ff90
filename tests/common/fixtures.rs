//! Configuration and record fixtures.

use serde_json::{Value, json};
use std::sync::Arc;
use uma_resource_server::{
    Backend, HandlerRegistry, InMemoryDocumentStore, ResourceServerBuilder, ServerConfig,
};

pub const RS_ID: &str = "UMA-Resource-Server";
pub const COOKIE: &str = "iPlanetDirectoryPro";
pub const RESOURCE_SET_PATH: &str = "uma/realms/root/resource_set";
pub const AUTHENTICATE_PATH: &str = "json/realms/root/authenticate";
pub const ADMIN_TOKEN: &str = "AQIC5wM-admin";

/// Configuration with every key the default handlers need.
pub fn config_value() -> Value {
    json!({
        "rs": {"id": RS_ID},
        "as": {
            "connect": {"base_url": "http://127.0.0.1:9/openam", "timeout_secs": 1},
            "cookie": COOKIE,
            "uma": {
                "resource_set": {"path": RESOURCE_SET_PATH},
                "policies": {"path": "json/realms/root/users/{owner}/uma/policies"},
                "sharedwithme": {
                    "path": "json/realms/root/users/{owner}/oauth2/resources/sets",
                    "accept": "protocol=1.0,resource=1.0",
                    "sortkeys": "name",
                    "queryfilter": "! resourceOwnerId eq \"{owner}\""
                }
            },
            "admin": {"user": "amadmin", "password": "password", "authenticate_path": AUTHENTICATE_PATH}
        }
    })
}

pub fn server_config() -> ServerConfig {
    ServerConfig::from_value(config_value()).unwrap()
}

/// Registry over the given Authorization Server and store backends.
pub fn registry(authz: Arc<dyn Backend>, store: Arc<dyn Backend>) -> HandlerRegistry {
    ResourceServerBuilder::new(server_config())
        .with_authz_backend(authz)
        .with_store_backend(store)
        .build()
        .unwrap()
}

/// A registration as listed by the Authorization Server's shared-with search.
pub fn shared_entry(id: &str, owner: &str, resource_server: &str) -> Value {
    json!({
        "_id": id,
        "_rev": "1364060076",
        "resourceServer": resource_server,
        "name": format!("Resource {}", id),
        "resourceOwnerId": owner,
        "scopes": ["view", "meta", "markup"],
        "type": "healthcare-report",
        "icon_uri": "https://rs.example.com/icons/report.png",
        "labels": []
    })
}

/// Store a resource record linked to `register_id`; returns its uid.
pub async fn store_resource(
    store: &InMemoryDocumentStore,
    uid: &str,
    register_id: &str,
    discoverable: bool,
) -> String {
    store
        .insert(
            uid,
            json!({
                "register": register_id,
                "meta": {
                    "label": format!("Label {}", register_id),
                    "description": format!("Description {}", register_id),
                    "discoverable": discoverable
                }
            }),
        )
        .await;
    uid.to_string()
}
