use anyhow::Error;
use async_std::{sync::RwLock, task::spawn};
use clap::Parser;
use geogrid::{
    init_logging, report,
    scan::{self, new_scan_id, DynScanner, Mode, Progress, Scan, ScanId, ScanRequest},
    store::{self, Store},
    summary::{Comparison, Summary},
};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tide::{http::mime, Body, Request, Response, StatusCode};

mod pages;
mod test_runner;

/// Start the geo-grid dashboard.
#[derive(Clone, Debug, Parser)]
struct Options {
    /// The port where the app should be served.
    #[clap(short, long, env = "GEOGRID_PORT", default_value = "8080")]
    port: u16,

    #[clap(flatten)]
    apis: scan::Options,

    #[clap(flatten)]
    store: store::Options,
}

impl Options {
    async fn serve(&self) -> Result<(), Error> {
        let state = State {
            scanner: Arc::new(self.apis.scanner()?),
            store: self.store.open()?,
            jobs: Default::default(),
        };

        let mut app = tide::with_state(state);
        app.at("/").get(|_| async {
            Ok(Response::builder(StatusCode::Ok)
                .body(pages::dashboard())
                .content_type(mime::HTML)
                .build())
        });
        app.at("/scans").post(start_scan).get(list_scans);
        app.at("/scans/:id").get(get_scan);
        app.at("/scans/:id/progress").get(get_progress);
        app.at("/scans/:id/summary").get(get_summary);
        app.at("/scans/:id/results.csv").get(get_csv);
        app.at("/scans/:id/results.json").get(get_json);
        app.at("/scans/:id/map/:mode").get(get_map);
        app.at("/compare/:before/:after").get(compare);

        tracing::info!("serving on port {}", self.port);
        app.listen(format!("0.0.0.0:{}", self.port)).await?;
        Ok(())
    }
}

/// How long the error of a failed scan is kept for progress queries.
const FAILED_JOB_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Clone)]
struct State {
    scanner: Arc<DynScanner>,
    store: Store,
    jobs: Arc<RwLock<HashMap<ScanId, Job>>>,
}

/// A scan started by this server which is still running, or which failed.
///
/// Finished scans are dropped as soon as they are saved; from then on the store answers for them.
struct Job {
    progress: Arc<Tracker>,
    state: JobState,
    error: Option<String>,
    finished: Option<Instant>,
}

impl Job {
    fn running(progress: Arc<Tracker>) -> Self {
        Self {
            progress,
            state: JobState::Running,
            error: None,
            finished: None,
        }
    }
}

/// Forget failed jobs older than [`FAILED_JOB_TTL`].
fn evict_failed(jobs: &mut HashMap<ScanId, Job>, now: Instant) {
    jobs.retain(|_, job| match job.finished {
        Some(finished) => now.saturating_duration_since(finished) < FAILED_JOB_TTL,
        None => true,
    });
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum JobState {
    Running,
    Done,
    Failed,
}

/// Progress of a running scan, updated from inside the scan.
#[derive(Debug, Default)]
struct Tracker {
    completed: AtomicUsize,
    total: AtomicUsize,
}

impl Tracker {
    fn update(&self, progress: Progress) {
        self.total.store(progress.total, Ordering::Relaxed);
        self.completed.store(progress.completed, Ordering::Relaxed);
    }

    fn get(&self) -> Progress {
        Progress {
            completed: self.completed.load(Ordering::Relaxed),
            total: self.total.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Serialize)]
struct JobStatus {
    id: ScanId,
    state: JobState,
    completed: usize,
    total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl State {
    async fn run(self, id: ScanId, request: ScanRequest, tracker: Arc<Tracker>) {
        let result = self
            .scanner
            .run(id, &request, |progress| tracker.update(progress))
            .await
            .and_then(|scan| self.store.save(&scan));

        let mut jobs = self.jobs.write().await;
        match result {
            Ok(()) => {
                jobs.remove(&id);
            }
            Err(err) => {
                tracing::error!(scan = %id, "scan failed: {err:#}");
                if let Some(job) = jobs.get_mut(&id) {
                    job.state = JobState::Failed;
                    job.error = Some(format!("{err:#}"));
                    job.finished = Some(Instant::now());
                }
            }
        }
    }

    fn load(&self, id: ScanId) -> tide::Result<Scan> {
        self.store
            .load(id)?
            .ok_or_else(|| {
                tide::Error::from_str(StatusCode::NotFound, format!("no such scan {id}"))
            })
    }
}

fn scan_id(req: &Request<State>, param: &str) -> tide::Result<ScanId> {
    req.param(param)?
        .parse()
        .map_err(|err| {
            tide::Error::from_str(StatusCode::NotFound, format!("no such scan: {err}"))
        })
}

fn json_response(status: StatusCode, body: &impl Serialize) -> tide::Result {
    Ok(Response::builder(status)
        .body(Body::from_json(body)?)
        .build())
}

fn bad_request(err: impl std::fmt::Display) -> tide::Result {
    json_response(StatusCode::BadRequest, &json!({ "error": err.to_string() }))
}

async fn start_scan(mut req: Request<State>) -> tide::Result {
    let request = match req.body_json::<ScanRequest>().await {
        Ok(request) => request.normalized(),
        Err(err) => return bad_request(err),
    };
    if let Err(err) = request.validate() {
        return bad_request(err);
    }

    let id = new_scan_id();
    let tracker = Arc::new(Tracker::default());
    let state = req.state().clone();
    {
        let mut jobs = state.jobs.write().await;
        evict_failed(&mut jobs, Instant::now());
        jobs.insert(id, Job::running(tracker.clone()));
    }
    tracing::info!(scan = %id, "starting scan for {:?}", request.business);
    spawn(state.run(id, request, tracker));

    json_response(StatusCode::Accepted, &json!({ "id": id }))
}

async fn list_scans(req: Request<State>) -> tide::Result {
    json_response(StatusCode::Ok, &req.state().store.list()?)
}

async fn get_scan(req: Request<State>) -> tide::Result {
    let scan = req.state().load(scan_id(&req, "id")?)?;
    json_response(StatusCode::Ok, &scan)
}

async fn get_progress(req: Request<State>) -> tide::Result {
    let id = scan_id(&req, "id")?;
    let status = match req.state().jobs.read().await.get(&id) {
        Some(job) => {
            let progress = job.progress.get();
            JobStatus {
                id,
                state: job.state,
                completed: progress.completed,
                total: progress.total,
                error: job.error.clone(),
            }
        }
        None => {
            // Finished scans are only in the store.
            let scan = req.state().load(id)?;
            JobStatus {
                id,
                state: JobState::Done,
                completed: scan.checks.len(),
                total: scan.checks.len(),
                error: None,
            }
        }
    };
    json_response(StatusCode::Ok, &status)
}

async fn get_summary(req: Request<State>) -> tide::Result {
    let scan = req.state().load(scan_id(&req, "id")?)?;
    json_response(
        StatusCode::Ok,
        &json!({
            "summary": Summary::of(&scan.checks),
            "by_keyword": Summary::by_keyword(&scan.checks),
        }),
    )
}

fn download(body: String, content_type: &str, file_name: &str) -> tide::Result {
    Ok(Response::builder(StatusCode::Ok)
        .body(body)
        .content_type(content_type)
        .header(
            "Content-Disposition",
            format!("attachment; filename=\"{file_name}\""),
        )
        .build())
}

async fn get_csv(req: Request<State>) -> tide::Result {
    let scan = req.state().load(scan_id(&req, "id")?)?;
    download(report::csv(&scan.checks), "text/csv", "results.csv")
}

async fn get_json(req: Request<State>) -> tide::Result {
    let scan = req.state().load(scan_id(&req, "id")?)?;
    download(report::json(&scan.checks)?, "application/json", "results.json")
}

async fn get_map(req: Request<State>) -> tide::Result {
    let scan = req.state().load(scan_id(&req, "id")?)?;
    let mode = match req.param("mode")?.parse::<Mode>() {
        Ok(mode) => mode,
        Err(_) => return bad_request(format!("unknown mode {}", req.param("mode")?)),
    };
    Ok(Response::builder(StatusCode::Ok)
        .body(report::map(&scan.checks, scan.center, mode))
        .content_type(mime::HTML)
        .build())
}

async fn compare(req: Request<State>) -> tide::Result {
    let before = req.state().load(scan_id(&req, "before")?)?;
    let after = req.state().load(scan_id(&req, "after")?)?;
    json_response(StatusCode::Ok, &Comparison::between(&before, &after))
}

#[async_std::main]
async fn main() -> Result<(), Error> {
    init_logging();
    Options::parse().serve().await
}
