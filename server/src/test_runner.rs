#![cfg(test)]

//! End-to-end tests of the dashboard API.
//!
//! The runner starts a server backed by the fixture clients in `fixtures/` and a fresh scan store
//! in a temporary directory, then drives it over HTTP the way the dashboard page does. Each
//! case is reported separately, and the test fails if any case fails.

use super::Options;
use ansi_term::Color;
use anyhow::Error;
use async_std::task::{sleep, spawn};
use geogrid::{
    fixtures_dir,
    report::CSV_HEADER,
    scan::{self, new_scan_id, ScanId},
    store,
};
use portpicker::pick_unused_port;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::fmt::{self, Display, Formatter};
use std::time::Duration;
use surf::{http::StatusCode, Client};
use tempfile::TempDir;

#[async_std::test]
async fn dashboard_api_test_cases() -> Result<(), Error> {
    geogrid::init_logging();

    // Start a server.
    let port = pick_unused_port().unwrap();
    let store_dir = TempDir::new()?;
    let opt = Options {
        port,
        apis: scan::Options {
            fixtures: Some(fixtures_dir()),
            delay_ms: 0,
            ..Default::default()
        },
        store: store::Options {
            dir: store_dir.path().join("scans"),
        },
    };
    spawn(async move {
        opt.serve().await.unwrap();
        tracing::warn!("server exited");
    });

    // Connect a client.
    let client: Client = surf::Config::default()
        .set_base_url(format!("http://localhost:{port}").parse().unwrap())
        .try_into()
        .unwrap();
    // Wait for the server to come up.
    wait_for_server(&client).await?;

    let results = vec![
        TestResult::new("dashboard", dashboard(&client).await),
        TestResult::new("invalid_request", invalid_request(&client).await),
        TestResult::new("unknown_scan", unknown_scan(&client).await),
        TestResult::new("scan_workflow", scan_workflow(&client).await),
    ];
    for result in &results {
        println!("{}", result);
    }
    if results.iter().any(TestResult::failed) {
        Err(Error::msg(format!("{}", Color::Red.paint("tests failed"))))
    } else {
        println!("All test cases passed.");
        Ok(())
    }
}

fn scan_request() -> Value {
    json!({
        "business": "Bean There Cafe",
        "radius_km": 0.5,
        "step_km": 0.5,
        "keywords": ["coffee shop near me", "espresso bar\ncafé"],
    })
}

async fn dashboard(client: &Client) -> Result<(), Error> {
    let mut res = client.get("/").await.map_err(Error::msg)?;
    expect_status(res.status(), StatusCode::Ok)?;
    let page = res.body_string().await.map_err(Error::msg)?;
    if !page.contains("Run Scan") {
        return Err(Error::msg("dashboard is missing the scan form"));
    }
    Ok(())
}

async fn invalid_request(client: &Client) -> Result<(), Error> {
    for body in [
        json!({ "business": "  ", "keywords": ["coffee"] }),
        json!({ "business": "Bean There Cafe", "keywords": [] }),
        json!({ "business": "Bean There Cafe", "keywords": ["coffee"], "radius_km": 50 }),
        json!({ "keywords": "not a list" }),
    ] {
        let mut res = post_scan(client, &body).await?;
        expect_status(res.status(), StatusCode::BadRequest)?;
        let err: Value = res.body_json().await.map_err(Error::msg)?;
        if err["error"].as_str().unwrap_or_default().is_empty() {
            return Err(Error::msg(format!("expected an error message for {body}")));
        }
    }
    Ok(())
}

async fn unknown_scan(client: &Client) -> Result<(), Error> {
    let id = new_scan_id();
    for path in [
        format!("/scans/{id}"),
        format!("/scans/{id}/progress"),
        format!("/scans/{id}/summary"),
        format!("/scans/{id}/results.csv"),
        format!("/scans/{id}/map/organic"),
        format!("/compare/{id}/{id}"),
        "/scans/not-an-id".to_string(),
    ] {
        let res = client.get(&path).await.map_err(Error::msg)?;
        expect_status(res.status(), StatusCode::NotFound)
            .map_err(|err| Error::msg(format!("{path}: {err}")))?;
    }
    Ok(())
}

async fn scan_workflow(client: &Client) -> Result<(), Error> {
    let first = run_scan(client).await?;
    let second = run_scan(client).await?;

    // The full scan.
    let scan: Value = get_json(client, &format!("/scans/{first}")).await?;
    let checks = scan["checks"]
        .as_array()
        .ok_or_else(|| Error::msg(format!("scan has no checks: {scan}")))?
        .len();
    if checks == 0 || checks % 3 != 0 {
        return Err(Error::msg(format!("expected checks for 3 keywords, got {checks}")));
    }
    if scan["target_place_id"] != "place-bean-there" {
        return Err(Error::msg(format!(
            "wrong target place: {}",
            scan["target_place_id"]
        )));
    }

    // Progress of a finished scan.
    let progress: Value = get_json(client, &format!("/scans/{first}/progress")).await?;
    if progress["state"] != "done" || progress["completed"] != checks {
        return Err(Error::msg(format!("unexpected progress {progress}")));
    }

    // Downloads.
    let mut res = client
        .get(format!("/scans/{first}/results.csv"))
        .await
        .map_err(Error::msg)?;
    expect_status(res.status(), StatusCode::Ok)?;
    let disposition = res
        .header("Content-Disposition")
        .map(|value| value.to_string())
        .unwrap_or_default();
    if !disposition.contains("results.csv") {
        return Err(Error::msg(format!("bad Content-Disposition {disposition:?}")));
    }
    let csv = res.body_string().await.map_err(Error::msg)?;
    if !csv.starts_with(&CSV_HEADER.join(",")) || csv.lines().count() != checks + 1 {
        return Err(Error::msg(format!("unexpected CSV:\n{csv}")));
    }
    let rows: Vec<Value> = get_json(client, &format!("/scans/{first}/results.json")).await?;
    if rows.len() != checks {
        return Err(Error::msg(format!("expected {checks} JSON rows, got {}", rows.len())));
    }

    // Maps.
    for mode in ["organic", "lp_rank", "maps"] {
        let mut res = client
            .get(format!("/scans/{first}/map/{mode}"))
            .await
            .map_err(Error::msg)?;
        expect_status(res.status(), StatusCode::Ok)?;
        let html = res.body_string().await.map_err(Error::msg)?;
        if !html.contains("L.map") {
            return Err(Error::msg(format!("{mode} map is not a map")));
        }
    }
    let res = client
        .get(format!("/scans/{first}/map/bogus"))
        .await
        .map_err(Error::msg)?;
    expect_status(res.status(), StatusCode::BadRequest)?;

    // Summary.
    let summary: Value = get_json(client, &format!("/scans/{first}/summary")).await?;
    let org_pct = summary["summary"]["org_pct"].as_f64().unwrap_or_default();
    if summary["summary"]["total_checks"] != checks || (org_pct - 200.0 / 3.0).abs() > 1e-9 {
        return Err(Error::msg(format!("unexpected summary {summary}")));
    }
    if summary["by_keyword"]["espresso bar"]["lp_pct"] != 100.0 {
        return Err(Error::msg(format!("unexpected keyword summary {summary}")));
    }

    // History.
    let list: Vec<Value> = get_json(client, "/scans").await?;
    let ids = list
        .iter()
        .map(|info| info["id"].as_str().unwrap_or_default().to_string())
        .collect::<Vec<_>>();
    if ids != [first.to_string(), second.to_string()] {
        return Err(Error::msg(format!("unexpected scan list {ids:?}")));
    }

    // The fixtures do not change between scans.
    let cmp: Value = get_json(client, &format!("/compare/{first}/{second}")).await?;
    if cmp["matched"] != checks {
        return Err(Error::msg(format!("unexpected comparison {cmp}")));
    }
    for mode in cmp["modes"].as_array().into_iter().flatten() {
        if mode["pct_delta"] != 0.0 || mode["improved"] != 0 || mode["declined"] != 0 {
            return Err(Error::msg(format!("unexpected comparison {mode}")));
        }
    }

    Ok(())
}

/// Start a scan and wait for it to finish.
async fn run_scan(client: &Client) -> Result<ScanId, Error> {
    const MAX_POLLS: usize = 100;

    let mut res = post_scan(client, &scan_request()).await?;
    expect_status(res.status(), StatusCode::Accepted)?;
    let started: Value = res.body_json().await.map_err(Error::msg)?;
    let id: ScanId = started["id"]
        .as_str()
        .ok_or_else(|| Error::msg(format!("missing scan id: {started}")))?
        .parse()?;

    for _ in 0..MAX_POLLS {
        let progress: Value = get_json(client, &format!("/scans/{id}/progress")).await?;
        match progress["state"].as_str() {
            Some("done") => return Ok(id),
            Some("running") => sleep(Duration::from_millis(100)).await,
            _ => return Err(Error::msg(format!("scan failed: {progress}"))),
        }
    }
    Err(Error::msg("timed out waiting for scan"))
}

async fn post_scan(client: &Client, body: &Value) -> Result<surf::Response, Error> {
    client
        .post("/scans")
        .body_json(body)
        .map_err(Error::msg)?
        .send()
        .await
        .map_err(Error::msg)
}

async fn get_json<T: DeserializeOwned>(client: &Client, path: &str) -> Result<T, Error> {
    let mut res = client.get(path).await.map_err(Error::msg)?;
    expect_status(res.status(), StatusCode::Ok)
        .map_err(|err| Error::msg(format!("{path}: {err}")))?;
    res.body_json()
        .await
        .map_err(|err| Error::msg(format!("cannot parse {path} as JSON: {err}")))
}

fn expect_status(actual: StatusCode, expected: StatusCode) -> Result<(), Error> {
    if actual == expected {
        Ok(())
    } else {
        Err(Error::msg(format!("expected status {expected}, got {actual}")))
    }
}

struct TestResult {
    name: &'static str,
    failure: Option<Error>,
}

impl TestResult {
    fn new(name: &'static str, result: Result<(), Error>) -> Self {
        Self {
            name,
            failure: result.err(),
        }
    }

    fn failed(&self) -> bool {
        self.failure.is_some()
    }
}

impl Display for TestResult {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}...", self.name)?;
        if let Some(err) = &self.failure {
            writeln!(f, "{}", Color::Red.paint("FAILED"))?;
            write!(f, "{err}")?;
        } else {
            write!(f, "{}", Color::Green.paint("OK"))?;
        }
        Ok(())
    }
}

async fn wait_for_server(client: &Client) -> Result<(), Error> {
    const MAX_CONNECT_RETRIES: usize = 60;

    for _ in 0..MAX_CONNECT_RETRIES {
        match client.get("/").await {
            Ok(_) => return Ok(()),
            Err(err) => {
                tracing::warn!("waiting for server to start: {err}");
                sleep(Duration::from_secs(1)).await;
            }
        }
    }

    Err(Error::msg("timed out waiting for server"))
}
