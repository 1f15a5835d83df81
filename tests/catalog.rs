use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

use assert_matches::assert_matches;
use xc_harvest::catalog::{CatalogClient, PageRequest, XenoCantoClient, parse_page};
use xc_harvest::domain::ApiKey;
use xc_harvest::error::HarvestError;

fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 1024];
        while !request.windows(4).any(|window| window == b"\r\n\r\n") {
            let read = stream.read(&mut chunk).unwrap();
            if read == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..read]);
        }
        let response = format!(
            "HTTP/1.1 {status}\r\nContent-Length: {}\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).unwrap();
        stream.flush().unwrap();
        String::from_utf8_lossy(&request).into_owned()
    });
    (format!("http://{addr}/api/3/recordings"), handle)
}

#[test]
fn parses_string_counts_and_protocol_relative_urls() {
    let body = r#"{
        "numRecordings": "1234",
        "numSpecies": "1",
        "page": 1,
        "numPages": "3",
        "recordings": [
            {
                "id": "812465",
                "gen": "Phylloscopus",
                "sp": "borealis",
                "file": "//xeno-canto.org/812465/download",
                "file-name": "XC812465-230622_005_10.50_Ph.phoen.mp3"
            },
            {
                "id": 900001,
                "file": "https://xeno-canto.org/900001/download",
                "file-name": "XC900001-b.mp3"
            }
        ]
    }"#;

    let page = parse_page(body, 1).unwrap();
    assert_eq!(page.num_recordings, 1234);
    assert_eq!(page.num_pages, 3);
    assert_eq!(page.discarded, 0);
    assert_eq!(page.recordings.len(), 2);
    assert_eq!(
        page.recordings[0].audio_url,
        "https://xeno-canto.org/812465/download"
    );
    assert_eq!(
        page.recordings[0].file_name,
        "XC812465-230622_005_10.50_Ph.phoen.mp3"
    );
    assert_eq!(page.recordings[1].id, "900001");
}

#[test]
fn incomplete_records_are_discarded() {
    let body = r#"{
        "numRecordings": 4,
        "numPages": 1,
        "recordings": [
            {"id": "1", "file": "//xeno-canto.org/1/download"},
            {"id": "2", "file-name": "XC2-b.mp3"},
            {"file": "//xeno-canto.org/3/download", "file-name": "XC3-c.mp3"},
            {"id": "4", "file": "//xeno-canto.org/4/download", "file-name": "../XC4.mp3"}
        ]
    }"#;

    let page = parse_page(body, 1).unwrap();
    assert!(page.recordings.is_empty());
    assert_eq!(page.discarded, 4);
    assert_eq!(page.num_recordings, 4);
}

#[test]
fn missing_counts_use_defaults() {
    let body = r#"{"recordings": [{"id": "1", "file": "//x/1", "file-name": "XC1-a.mp3"}]}"#;
    let page = parse_page(body, 2).unwrap();
    assert_eq!(page.page, 2);
    assert_eq!(page.num_pages, 1);
    assert_eq!(page.num_recordings, 1);
}

#[test]
fn error_payload_is_an_api_error() {
    let body = r#"{"error": {"code": "invalid_key", "message": "No valid API key provided"}}"#;
    assert_matches!(
        parse_page(body, 1),
        Err(HarvestError::CatalogApi(message)) if message == "No valid API key provided"
    );
}

#[test]
fn non_json_body_is_a_parse_error() {
    assert_matches!(
        parse_page("<html>502 Bad Gateway</html>", 1),
        Err(HarvestError::CatalogParse(_))
    );
}

#[test]
fn client_sends_query_key_and_page() {
    let (endpoint, server) = serve_once(
        "200 OK",
        r#"{"numRecordings": "3", "numPages": "2", "page": 2, "recordings": [
            {"id": "3", "file": "//xeno-canto.org/3/download", "file-name": "XC3-c.mp3"}
        ]}"#,
    );
    let client = XenoCantoClient::new(endpoint).unwrap();
    let key = ApiKey::new(Some("secret")).unwrap();

    let page = client
        .fetch_page(&PageRequest {
            query: "gen:Otus sp:sunia cnt:China",
            api_key: &key,
            page: 2,
        })
        .unwrap();

    let request = server.join().unwrap();
    let request_line = request.lines().next().unwrap();
    assert!(request_line.starts_with("GET /api/3/recordings?"), "{request_line}");
    assert!(request_line.contains("query=gen%3AOtus+sp%3Asunia+cnt%3AChina"), "{request_line}");
    assert!(request_line.contains("key=secret"), "{request_line}");
    assert!(request_line.contains("page=2"), "{request_line}");
    assert_eq!(page.page, 2);
    assert_eq!(page.num_pages, 2);
    assert_eq!(page.recordings[0].audio_url, "https://xeno-canto.org/3/download");
}

#[test]
fn error_status_carries_payload_message() {
    let (endpoint, server) = serve_once(
        "401 Unauthorized",
        r#"{"error": {"code": "missing_parameter", "message": "No API key provided"}}"#,
    );
    let client = XenoCantoClient::new(endpoint).unwrap();
    let key = ApiKey::new(Some("secret")).unwrap();

    let err = client
        .fetch_page(&PageRequest {
            query: "gen:Otus sp:sunia",
            api_key: &key,
            page: 1,
        })
        .unwrap_err();

    server.join().unwrap();
    assert_matches!(
        err,
        HarvestError::CatalogStatus { status: 401, message } if message == "No API key provided"
    );
}

#[test]
fn error_status_without_payload_keeps_body() {
    let (endpoint, server) = serve_once("503 Service Unavailable", "upstream down");
    let client = XenoCantoClient::new(endpoint).unwrap();
    let key = ApiKey::new(Some("secret")).unwrap();

    let err = client
        .fetch_page(&PageRequest {
            query: "gen:Otus sp:sunia",
            api_key: &key,
            page: 1,
        })
        .unwrap_err();

    server.join().unwrap();
    assert_matches!(
        err,
        HarvestError::CatalogStatus { status: 503, message } if message == "upstream down"
    );
}
