//! Mock WebDAV server helpers
//!
//! Mounts wiremock responders for the five requests the WebDAV store makes.
//! All helpers require the basic auth header built from [`USERNAME`] and
//! [`PASSWORD`], so a request without credentials falls through to a 404.

use davsnap_backup::WebDavStore;
use davsnap_core::StoreConfig;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "secret";

/// `Basic base64("alice:secret")`
pub const AUTH_HEADER: &str = "Basic YWxpY2U6c2VjcmV0";

/// Create a store pointed at the mock server
pub fn store_for(server: &MockServer, backup_path: &str) -> WebDavStore {
    let config = StoreConfig::new(server.uri(), USERNAME, PASSWORD).with_backup_path(backup_path);
    WebDavStore::new(config).expect("store client should build")
}

/// Multistatus body listing `names` under `collection`, plus the collection itself
pub fn multistatus(collection: &str, names: &[&str]) -> String {
    let mut body = String::from(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<d:multistatus xmlns:d=\"DAV:\">\n",
    );
    body.push_str(&format!(
        "  <d:response><d:href>{}/</d:href><d:propstat><d:prop><d:resourcetype><d:collection/></d:resourcetype></d:prop></d:propstat></d:response>\n",
        collection
    ));
    for name in names {
        body.push_str(&format!(
            "  <d:response><d:href>{}/{}</d:href><d:propstat><d:prop><d:resourcetype/></d:prop></d:propstat></d:response>\n",
            collection, name
        ));
    }
    body.push_str("</d:multistatus>\n");
    body
}

/// Respond to `MKCOL <url_path>` with `status`
pub async fn mock_mkcol(server: &MockServer, url_path: &str, status: u16) {
    Mock::given(method("MKCOL"))
        .and(path(url_path))
        .and(header("authorization", AUTH_HEADER))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Respond to `PROPFIND <collection>/` with a multistatus listing of `names`
pub async fn mock_listing(server: &MockServer, collection: &str, names: &[&str]) {
    Mock::given(method("PROPFIND"))
        .and(path(format!("{}/", collection)))
        .and(header("authorization", AUTH_HEADER))
        .and(header("depth", "1"))
        .respond_with(
            ResponseTemplate::new(207)
                .insert_header("content-type", "application/xml; charset=utf-8")
                .set_body_string(multistatus(collection, names)),
        )
        .mount(server)
        .await;
}

/// Respond to `PROPFIND <collection>/` with a bare `status`
pub async fn mock_listing_status(server: &MockServer, collection: &str, status: u16) {
    Mock::given(method("PROPFIND"))
        .and(path(format!("{}/", collection)))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Serve `content` for `GET <url_path>`
pub async fn mock_object(server: &MockServer, url_path: &str, content: &[u8]) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .and(header("authorization", AUTH_HEADER))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(content))
        .mount(server)
        .await;
}

/// Respond to `<verb> <url_path>` with `status`, expecting exactly one call
pub async fn mock_once(server: &MockServer, verb: &str, url_path: &str, status: u16) {
    Mock::given(method(verb))
        .and(path(url_path))
        .and(header("authorization", AUTH_HEADER))
        .respond_with(ResponseTemplate::new(status))
        .expect(1)
        .mount(server)
        .await;
}
