//! End-to-end tests against a mock articulation API.

use assist_transfers::acquisition::articulation::ArticulationFetcher;
use assist_transfers::acquisition::directory::fetch_institutions;
use assist_transfers::acquisition::http_client::HttpClient;
use assist_transfers::cli::harvest_cmd::{execute, HarvestArgs};
use assist_transfers::config::{HarvestSettings, InitialData};
use assist_transfers::error::FetchError;
use assist_transfers::harvest::rate_limiter::RateLimiter;
use assist_transfers::model::{Department, Institution};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const YEAR: u32 = 75;
const TARGET: u32 = 132;

fn settings(server: &MockServer) -> HarvestSettings {
    HarvestSettings::new(&server.uri(), 5, None, 0).unwrap()
}

fn institution(name: &str, id: u32) -> Institution {
    Institution {
        name: name.to_string(),
        id,
    }
}

fn initial(departments: &[(&str, u32)]) -> InitialData {
    InitialData {
        target_institution_id: TARGET,
        year_id: YEAR,
        departments: departments
            .iter()
            .map(|(name, id)| (name.to_string(), *id))
            .collect::<HashMap<_, _>>(),
    }
}

/// One `Course` articulation whose first group holds the given sending courses.
fn entry(prefix: &str, number: &str, sending: &[(&str, &str)]) -> Value {
    let items: Vec<Value> = sending
        .iter()
        .map(|(p, n)| json!({"type": "Course", "prefix": p, "courseNumber": n}))
        .collect();
    json!({
        "type": "Course",
        "course": {"prefix": prefix, "courseNumber": number},
        "sendingArticulation": json!({"items": [{"items": items}]}).to_string()
    })
}

/// An agreement body the way the API sends it: nested arrays string-encoded.
fn agreement_body(entries: Vec<Value>) -> String {
    json!({
        "result": {
            "name": "All Departments",
            "articulations": Value::Array(entries).to_string()
        },
        "isSuccessful": true
    })
    .to_string()
}

fn agreement_key(sending: u32, department: u32) -> String {
    format!("{YEAR}/{sending}/to/{TARGET}/Department/{department}")
}

async fn mount_agreement(server: &MockServer, sending: u32, department: u32, resp: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/api/articulation/Agreements"))
        .and(query_param("Key", agreement_key(sending, department).as_str()))
        .respond_with(resp)
        .mount(server)
        .await;
}

fn fetcher(server: &MockServer) -> ArticulationFetcher {
    let settings = Arc::new(settings(server));
    let client = HttpClient::new(settings.request_timeout).unwrap();
    ArticulationFetcher::new(client, settings, Arc::new(RateLimiter::unlimited()))
}

#[tokio::test]
async fn test_fetch_institutions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/institutions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 110, "names": [{"name": "Cabrillo College"}]},
            {"id": 113, "names": [{"name": "De Anza College"}, {"name": "De Anza"}]}
        ])))
        .mount(&server)
        .await;

    let client = HttpClient::new(None).unwrap();
    let institutions = fetch_institutions(&client, &settings(&server)).await.unwrap();
    assert_eq!(
        institutions,
        vec![institution("Cabrillo College", 110), institution("De Anza College", 113)]
    );
}

#[tokio::test]
async fn test_fetch_institutions_failures_are_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/institutions"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = HttpClient::new(None).unwrap();
    let err = fetch_institutions(&client, &settings(&server)).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 500, .. }));

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/institutions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = fetch_institutions(&client, &settings(&server)).await.unwrap_err();
    assert!(matches!(err, FetchError::Decode { .. }));
}

#[tokio::test]
async fn test_failed_institution_does_not_affect_others() {
    let server = MockServer::start().await;
    let cse = Department {
        name: "CSE".to_string(),
        id: 11,
    };

    mount_agreement(
        &server,
        110,
        cse.id,
        ResponseTemplate::new(200).set_body_string(agreement_body(vec![entry("CSE", "20", &[("CS", "1")])])),
    )
    .await;
    mount_agreement(&server, 113, cse.id, ResponseTemplate::new(503)).await;
    mount_agreement(
        &server,
        121,
        cse.id,
        ResponseTemplate::new(200).set_body_string(agreement_body(vec![
            entry("CSE", "20", &[("CIS", "22A")]),
            entry("CSE", "30", &[("CIS", "41")]),
        ])),
    )
    .await;

    let institutions = vec![
        institution("Cabrillo College", 110),
        institution("De Anza College", 113),
        institution("Foothill College", 121),
    ];
    let harvest = fetcher(&server)
        .fetch_for_department(&cse, &institutions, &initial(&[("CSE", 11)]))
        .await;

    assert_eq!(harvest.institutions_attempted, 3);
    assert_eq!(harvest.institutions_skipped, 1);
    assert_eq!(harvest.transfers.equivalent_count(), 3);

    let cse20: Vec<_> = harvest
        .transfers
        .get("CSE 20")
        .unwrap()
        .iter()
        .map(|c| (c.institution_name.as_str(), c.dept_code.as_str(), c.course_number.as_str()))
        .collect();
    assert_eq!(
        cse20,
        vec![("Cabrillo College", "CS", "1"), ("Foothill College", "CIS", "22A")]
    );
    assert!(harvest
        .transfers
        .iter()
        .flat_map(|(_, courses)| courses)
        .all(|c| c.institution_name != "De Anza College"));
}

#[tokio::test]
async fn test_undecodable_agreement_is_skipped() {
    let server = MockServer::start().await;
    let math = Department {
        name: "MATH".to_string(),
        id: 23,
    };

    mount_agreement(
        &server,
        110,
        math.id,
        ResponseTemplate::new(200).set_body_string("{\"result\": \"[{broken"),
    )
    .await;
    // Whole body delivered as one quoted JSON string.
    let quoted = Value::String(agreement_body(vec![entry("MATH", "19A", &[("MATH", "5A")])])).to_string();
    mount_agreement(&server, 113, math.id, ResponseTemplate::new(200).set_body_string(quoted)).await;

    let institutions = vec![institution("Cabrillo College", 110), institution("De Anza College", 113)];
    let harvest = fetcher(&server)
        .fetch_for_department(&math, &institutions, &initial(&[("MATH", 23)]))
        .await;

    assert_eq!(harvest.institutions_skipped, 1);
    let equivalents = harvest.transfers.get("MATH 19A").unwrap();
    assert_eq!(equivalents.len(), 1);
    assert_eq!(equivalents[0].institution_name, "De Anza College");
}

#[tokio::test]
async fn test_harvest_writes_merged_map() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/institutions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 110, "names": [{"name": "Cabrillo College"}]},
            {"id": 113, "names": [{"name": "De Anza College"}]}
        ])))
        .mount(&server)
        .await;

    // CSE (11): both institutions answer. MATH (23): only De Anza. AM (4): nothing.
    mount_agreement(
        &server,
        110,
        11,
        ResponseTemplate::new(200).set_body_string(agreement_body(vec![entry("CSE", "20", &[("CS", "1")])])),
    )
    .await;
    mount_agreement(
        &server,
        113,
        11,
        ResponseTemplate::new(200).set_body_string(agreement_body(vec![entry("CSE", "20", &[("CIS", "22A")])])),
    )
    .await;
    mount_agreement(
        &server,
        113,
        23,
        ResponseTemplate::new(200).set_body_string(agreement_body(vec![entry("MATH", "19A", &[("MATH", "1A")])])),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("assist-data.json");
    std::fs::write(
        &config,
        json!({"ucsc_id": TARGET, "current_year": YEAR, "departments": {"CSE": 11, "MATH": 23, "AM": 4}})
            .to_string(),
    )
    .unwrap();
    let output = dir.path().join("transfers.json");
    let ledger = dir.path().join("runs.jsonl");

    let report = execute(&HarvestArgs {
        config,
        output: output.clone(),
        settings: settings(&server),
        ledger: Some(ledger.clone()),
    })
    .await
    .unwrap();

    assert_eq!(report.institutions, 2);
    assert_eq!(report.outcome.departments.len(), 3);
    assert!(report.outcome.failed_departments.is_empty());
    // Unmatched requests get wiremock's 404: AM twice, MATH from Cabrillo once.
    assert_eq!(report.outcome.institutions_skipped(), 3);

    let written: Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    let keys: Vec<_> = written.as_object().unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["CSE 20", "MATH 19A"]);
    assert_eq!(written["CSE 20"].as_array().unwrap().len(), 2);
    assert_eq!(written["MATH 19A"][0]["institution"], "De Anza College");
    assert_eq!(written["MATH 19A"][0]["deptCode"], "MATH");
    assert_eq!(written["MATH 19A"][0]["courseNumber"], "1A");

    let ledger_lines = std::fs::read_to_string(&ledger).unwrap();
    assert_eq!(ledger_lines.lines().count(), 1);
    let record: Value = serde_json::from_str(ledger_lines.trim()).unwrap();
    assert_eq!(record["courses"], 2);
    assert_eq!(record["equivalents"], 3);
}

#[tokio::test]
async fn test_directory_failure_aborts_before_writing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/institutions"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("assist-data.json");
    std::fs::write(
        &config,
        json!({"ucsc_id": TARGET, "current_year": YEAR, "departments": {"CSE": 11}}).to_string(),
    )
    .unwrap();
    let output = dir.path().join("transfers.json");

    let err = execute(&HarvestArgs {
        config,
        output: output.clone(),
        settings: settings(&server),
        ledger: None,
    })
    .await
    .unwrap_err();

    assert!(err.to_string().contains("institution directory"));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_missing_config_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;

    let err = execute(&HarvestArgs {
        config: dir.path().join("nope.json"),
        output: dir.path().join("transfers.json"),
        settings: settings(&server),
        ledger: None,
    })
    .await
    .unwrap_err();

    assert!(err.to_string().contains("failed to read data file"));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_no_departments_writes_empty_map() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/institutions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 110, "names": [{"name": "Cabrillo College"}]}
        ])))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("assist-data.json");
    std::fs::write(
        &config,
        json!({"ucsc_id": TARGET, "current_year": YEAR, "departments": {}}).to_string(),
    )
    .unwrap();
    let output = dir.path().join("transfers.json");

    let report = execute(&HarvestArgs {
        config,
        output: output.clone(),
        settings: settings(&server),
        ledger: None,
    })
    .await
    .unwrap();

    assert!(report.outcome.departments.is_empty());
    assert!(report.outcome.transfers.is_empty());
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "{}");
}
