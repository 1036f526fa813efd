//! HttpLedger against a local stub server speaking the ledger's wire format.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;

use osprey_ledger::{
    Error, FolderFlag, HttpConnector, Ledger, LedgerConnector, NewFolder, Update,
};
use osprey_meta::LedgerConfig;
use pretty_assertions::assert_eq;

/// One recorded request: method, path and decoded form fields.
#[derive(Debug, Clone)]
struct Request {
    method: String,
    path: String,
    form: HashMap<String, String>,
}

/// Serve canned `(status, body)` responses by path until `expected` requests arrive.
fn stub(routes: Vec<(&'static str, u16, String)>, expected: usize) -> (String, Arc<Mutex<Vec<Request>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let log = Arc::new(Mutex::new(Vec::new()));
    let seen = log.clone();

    thread::spawn(move || {
        for stream in listener.incoming().take(expected) {
            let mut stream = stream.unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut parts = request_line.split_whitespace();
            let method = parts.next().unwrap_or_default().to_string();
            let path = parts.next().unwrap_or_default().to_string();

            let mut length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                if let Some((name, value)) = line.split_once(':')
                    && name.eq_ignore_ascii_case("content-length")
                {
                    length = value.trim().parse().unwrap();
                }
            }
            let mut body = vec![0; length];
            reader.read_exact(&mut body).unwrap();
            let form = String::from_utf8(body)
                .unwrap()
                .split('&')
                .filter(|p| !p.is_empty())
                .filter_map(|pair| pair.split_once('='))
                .map(|(k, v)| (k.to_string(), v.replace('+', " ")))
                .collect();

            let (status, payload) = routes
                .iter()
                .find(|(route, _, _)| *route == path)
                .map(|(_, status, body)| (*status, body.clone()))
                .unwrap_or((404, "not found".to_string()));
            let response = format!(
                "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
                payload.len()
            );
            seen.lock().unwrap().push(Request { method, path, form });
            stream.write_all(response.as_bytes()).unwrap();
        }
    });
    (url, log)
}

fn connector(url: &str) -> HttpConnector {
    let config = LedgerConfig {
        url: url.to_string(),
        api_key: "k123".into(),
        timeout_secs: 5,
        expected_version: None,
    };
    HttpConnector::new(&config, "botany")
}

#[test]
fn handshake_fetch_and_update() {
    let (url, log) = stub(
        vec![
            ("/api/", 200, r#"{"sys_ver": "2.8.1"}"#.to_string()),
            (
                "/api/projects/botany",
                200,
                r#"{"project_id": 4, "project_alias": "botany", "project_checks": "jhove,raw_pair",
                    "folders": [{"folder_id": 9, "folder": "f1", "folder_path": "/s/f1", "delivered_to_dams": null}]}"#
                    .to_string(),
            ),
            ("/api/update/botany", 200, r#"{"result": true}"#.to_string()),
            ("/api/new/botany", 200, r#"{"result": [{"folder_id": "12"}]}"#.to_string()),
        ],
        4,
    );
    let ledger = connector(&url).connect().unwrap();

    assert_eq!(ledger.server_version().unwrap(), "2.8.1");

    let project = ledger.fetch_project().unwrap();
    assert_eq!(project.project_id, 4);
    assert!(project.checks().contains(osprey_meta::CheckName::RawPair));
    assert_eq!(project.find_folder("f1", "/s/f1").unwrap().folder_id, 9);

    ledger
        .update(&Update::FolderFlag {
            folder_id: 9,
            flag: FolderFlag::CheckingFolder,
            value: 1,
        })
        .unwrap();

    let folder_id = ledger
        .create_folder(&NewFolder {
            folder: "f2".into(),
            folder_path: "/s/f2".into(),
            folder_date: Some("2024-01-05".into()),
            project_id: 4,
        })
        .unwrap();
    assert_eq!(folder_id, 12);

    let requests = log.lock().unwrap().clone();
    assert_eq!(requests.len(), 4);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[1].method, "POST");
    assert_eq!(requests[1].form.get("api_key").map(String::as_str), Some("k123"));

    let update = &requests[2].form;
    assert_eq!(update.get("type").map(String::as_str), Some("folder"));
    assert_eq!(update.get("property").map(String::as_str), Some("checking_folder"));
    assert_eq!(update.get("folder_id").map(String::as_str), Some("9"));
    assert_eq!(update.get("value").map(String::as_str), Some("1"));

    let created = &requests[3].form;
    assert_eq!(created.get("folder_date").map(String::as_str), Some("2024-01-05"));
}

#[test]
fn server_errors_are_typed() {
    let (url, _log) = stub(
        vec![
            ("/api/folders/3", 500, "Internal Server Error".to_string()),
            ("/api/update/botany", 200, r#"{"result": false}"#.to_string()),
            ("/api/projects/botany/files", 200, "<html>".to_string()),
        ],
        3,
    );
    let ledger = connector(&url).connect().unwrap();

    match ledger.fetch_folder(3).unwrap_err() {
        Error::Status { code, body, .. } => {
            assert_eq!(code, 500);
            assert_eq!(body, "Internal Server Error");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(matches!(
        ledger.update(&Update::FolderStats { folder_id: 3 }).unwrap_err(),
        Error::Rejected { .. }
    ));
    assert!(matches!(
        ledger.fetch_project_files().unwrap_err(),
        Error::Malformed { .. }
    ));
}
