//! In-memory Figshare stand-in for integration tests.
//!
//! Implements the account API (articles, files, completion, deletion) and the
//! upload service (partition plans and part PUTs) behind the `Transport`
//! trait, so the whole replace flow runs without a network.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use areadata::api::{Body, Credential, HttpRequest, HttpResponse, Method, SessionClient, Transport};
use areadata::replace::ResourceReplacer;
use areadata::upload::{PartTransferEngine, RetryPolicy};
use areadata::UploadResult;

pub const BASE_URL: &str = "https://api.fake/v2";
pub const UPLOAD_BASE: &str = "https://uploads.fake/upload";

#[derive(Debug, Clone)]
pub struct FakeFile {
    pub article_id: u64,
    pub name: String,
    pub md5: String,
    pub size: u64,
    pub complete: bool,
    pub plan: Vec<(u32, u64, u64)>,
    pub received: HashMap<u32, Vec<u8>>,
    /// Successful PUTs per part number.
    pub accepted: HashMap<u32, usize>,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    articles: BTreeMap<u64, String>,
    files: BTreeMap<u64, FakeFile>,
    /// Scripted statuses per (file name, part number).
    faults: HashMap<(String, u32), VecDeque<u16>>,
    /// Tokens cancelled when a (file name, part number) PUT arrives.
    cancel_at: HashMap<(String, u32), CancellationToken>,
    /// File names whose computed MD5 is reported wrongly.
    corrupt: Vec<String>,
    log: Vec<(Method, String)>,
}

/// Fake account plus upload service.
pub struct FakeFigshare {
    part_size: u64,
    inner: Mutex<Inner>,
}

impl FakeFigshare {
    /// Service splitting uploads into parts of `part_size` bytes.
    pub fn new(part_size: u64) -> Arc<Self> {
        Arc::new(Self {
            part_size,
            inner: Mutex::new(Inner {
                next_id: 1000,
                ..Inner::default()
            }),
        })
    }

    pub fn add_article(&self, id: u64, title: &str) {
        self.inner.lock().unwrap().articles.insert(id, title.to_string());
    }

    /// Attach an already complete file to an article.
    pub fn seed_file(&self, article_id: u64, name: &str, size: u64) -> u64 {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.files.insert(
            id,
            FakeFile {
                article_id,
                name: name.to_string(),
                md5: String::new(),
                size,
                complete: true,
                plan: Vec::new(),
                received: HashMap::new(),
                accepted: HashMap::new(),
            },
        );
        id
    }

    /// Answer the next PUTs of `part` of the file called `name` with `statuses`.
    pub fn fail_part(&self, name: &str, part: u32, statuses: &[u16]) {
        self.inner
            .lock()
            .unwrap()
            .faults
            .insert((name.to_string(), part), statuses.iter().copied().collect());
    }

    /// Cancel `token` when the first PUT of `part` of `name` arrives, and
    /// answer that PUT with 503 so the client would otherwise retry.
    pub fn cancel_at_part(&self, name: &str, part: u32, token: &CancellationToken) {
        self.inner
            .lock()
            .unwrap()
            .cancel_at
            .insert((name.to_string(), part), token.clone());
    }

    /// Report a wrong server-side MD5 for `name` after completion.
    pub fn corrupt_digest(&self, name: &str) {
        self.inner.lock().unwrap().corrupt.push(name.to_string());
    }

    pub fn files_in(&self, article_id: u64) -> Vec<(u64, FakeFile)> {
        self.inner
            .lock()
            .unwrap()
            .files
            .iter()
            .filter(|(_, f)| f.article_id == article_id)
            .map(|(id, f)| (*id, f.clone()))
            .collect()
    }

    /// Requests seen so far, in order.
    pub fn log(&self) -> Vec<(Method, String)> {
        self.inner.lock().unwrap().log.clone()
    }

    pub fn count(&self, method: Method, url_suffix: &str) -> usize {
        self.log()
            .iter()
            .filter(|(m, u)| *m == method && u.ends_with(url_suffix))
            .count()
    }

    fn route(&self, inner: &mut Inner, request: &HttpRequest) -> (u16, Value) {
        if let Some(rest) = request.url.strip_prefix(UPLOAD_BASE) {
            return self.upload_route(inner, request, rest);
        }
        let Some(rest) = request.url.strip_prefix(BASE_URL) else {
            return (404, json!({"message": "unknown host"}));
        };
        let segments: Vec<&str> = rest.trim_matches('/').split('/').collect();

        match (request.method, segments.as_slice()) {
            (Method::Get, ["account", "articles"]) => {
                let list: Vec<Value> = inner
                    .articles
                    .iter()
                    .map(|(id, title)| article_json(*id, title))
                    .collect();
                (200, Value::Array(list))
            }
            (Method::Post, ["account", "articles"]) => {
                let title = json_body(request)["title"].as_str().unwrap_or("").to_string();
                inner.next_id += 1;
                let id = inner.next_id;
                inner.articles.insert(id, title);
                (
                    201,
                    json!({"location": format!("{}/account/articles/{}", BASE_URL, id)}),
                )
            }
            (Method::Get, ["account", "articles", id]) => match parse_id(id)
                .and_then(|id| inner.articles.get(&id).map(|t| article_json(id, t)))
            {
                Some(article) => (200, article),
                None => not_found(),
            },
            (method, ["account", "articles", article, "files"]) => {
                let Some(article_id) = parse_id(article).filter(|a| inner.articles.contains_key(a))
                else {
                    return not_found();
                };
                match method {
                    Method::Get => {
                        let list: Vec<Value> = inner
                            .files
                            .iter()
                            .filter(|(_, f)| f.article_id == article_id)
                            .map(|(id, f)| file_json(*id, f, &inner.corrupt))
                            .collect();
                        (200, Value::Array(list))
                    }
                    Method::Post => self.register(inner, article_id, &json_body(request)),
                    _ => (405, json!({})),
                }
            }
            (method, ["account", "articles", article, "files", file]) => {
                let (Some(article_id), Some(file_id)) = (parse_id(article), parse_id(file)) else {
                    return not_found();
                };
                let owned = inner
                    .files
                    .get(&file_id)
                    .is_some_and(|f| f.article_id == article_id);
                if !owned {
                    return not_found();
                }
                match method {
                    Method::Get => {
                        let file = &inner.files[&file_id];
                        (200, file_json(file_id, file, &inner.corrupt))
                    }
                    Method::Post => complete(inner, file_id),
                    Method::Delete => {
                        inner.files.remove(&file_id);
                        (204, Value::Null)
                    }
                    Method::Put => (405, json!({})),
                }
            }
            _ => not_found(),
        }
    }

    fn register(&self, inner: &mut Inner, article_id: u64, body: &Value) -> (u16, Value) {
        let name = body["name"].as_str().unwrap_or("").to_string();
        let md5 = body["md5"].as_str().unwrap_or("").to_string();
        let size = body["size"].as_u64().unwrap_or(0);
        if name.is_empty() || size == 0 {
            return (400, json!({"message": "name and size are required"}));
        }

        let plan = (0..size)
            .step_by(self.part_size as usize)
            .enumerate()
            .map(|(i, start)| (i as u32 + 1, start, (start + self.part_size).min(size) - 1))
            .collect();

        inner.next_id += 1;
        let id = inner.next_id;
        inner.files.insert(
            id,
            FakeFile {
                article_id,
                name,
                md5,
                size,
                complete: false,
                plan,
                received: HashMap::new(),
                accepted: HashMap::new(),
            },
        );
        let location = format!("{}/account/articles/{}/files/{}", BASE_URL, article_id, id);
        (201, json!({ "location": location }))
    }

    fn upload_route(&self, inner: &mut Inner, request: &HttpRequest, rest: &str) -> (u16, Value) {
        let segments: Vec<&str> = rest.trim_matches('/').split('/').collect();
        match (request.method, segments.as_slice()) {
            (Method::Get, [file]) => {
                let Some(file) = parse_id(file).and_then(|id| inner.files.get(&id)) else {
                    return not_found();
                };
                let parts: Vec<Value> = file
                    .plan
                    .iter()
                    .map(|(n, s, e)| json!({"partNo": n, "startOffset": s, "endOffset": e}))
                    .collect();
                (200, json!({"size": file.size, "parts": parts}))
            }
            (Method::Put, [file, part]) => {
                let (Some(file_id), Some(part)) = (parse_id(file), part.parse::<u32>().ok()) else {
                    return not_found();
                };
                let Some(name) = inner.files.get(&file_id).map(|f| f.name.clone()) else {
                    return not_found();
                };
                if let Some(token) = inner.cancel_at.remove(&(name.clone(), part)) {
                    token.cancel();
                    return (503, json!({"message": "cancelled mid-transfer"}));
                }
                if let Some(status) = inner
                    .faults
                    .get_mut(&(name, part))
                    .and_then(|q| q.pop_front())
                {
                    return (status, json!({"message": "injected fault"}));
                }

                let Body::Binary(bytes) = &request.body else {
                    return (400, json!({"message": "expected binary body"}));
                };
                let Some(file) = inner.files.get_mut(&file_id) else {
                    return not_found();
                };
                let Some((_, start, end)) = file.plan.iter().find(|(n, _, _)| *n == part).copied()
                else {
                    return (400, json!({"message": "unknown part"}));
                };
                if bytes.len() as u64 != end - start + 1 {
                    return (400, json!({"message": "part length mismatch"}));
                }
                file.received.insert(part, bytes.clone());
                *file.accepted.entry(part).or_default() += 1;
                (200, Value::Null)
            }
            _ => not_found(),
        }
    }
}

impl Transport for FakeFigshare {
    fn execute(&self, request: &HttpRequest) -> UploadResult<HttpResponse> {
        let mut inner = self.inner.lock().unwrap();
        inner.log.push((request.method, request.url.clone()));
        assert_eq!(request.authorization, "token test-token");

        let (status, body) = self.route(&mut inner, request);
        let body = if body.is_null() {
            Vec::new()
        } else {
            serde_json::to_vec(&body).unwrap()
        };
        Ok(HttpResponse { status, body })
    }
}

fn complete(inner: &mut Inner, file_id: u64) -> (u16, Value) {
    let Some(file) = inner.files.get_mut(&file_id) else {
        return not_found();
    };
    if file.plan.iter().any(|(n, _, _)| !file.received.contains_key(n)) {
        return (400, json!({"message": "missing parts"}));
    }
    file.complete = true;
    (202, Value::Null)
}

fn assembled(file: &FakeFile) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(file.size as usize);
    for (n, _, _) in &file.plan {
        bytes.extend_from_slice(&file.received[n]);
    }
    bytes
}

fn file_json(id: u64, file: &FakeFile, corrupt: &[String]) -> Value {
    let computed_md5 = if file.complete && !file.plan.is_empty() {
        if corrupt.contains(&file.name) {
            "00000000000000000000000000000000".to_string()
        } else {
            format!("{:x}", md5::compute(assembled(file)))
        }
    } else {
        String::new()
    };
    json!({
        "id": id,
        "name": file.name,
        "status": if file.complete { "available" } else { "created" },
        "size": file.size,
        "upload_url": format!("{}/{}", UPLOAD_BASE, id),
        "computed_md5": computed_md5,
        "supplied_md5": file.md5,
    })
}

fn article_json(id: u64, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "url": format!("{}/account/articles/{}", BASE_URL, id),
    })
}

fn json_body(request: &HttpRequest) -> Value {
    match &request.body {
        Body::Json(bytes) => serde_json::from_slice(bytes).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn parse_id(segment: &str) -> Option<u64> {
    segment.parse().ok()
}

fn not_found() -> (u16, Value) {
    (404, json!({"message": "Entity not found"}))
}

/// Client authenticated against `fake`.
pub fn client(fake: &Arc<FakeFigshare>) -> SessionClient {
    SessionClient::new(
        Arc::clone(fake) as Arc<dyn Transport>,
        BASE_URL,
        Credential::new("test-token"),
    )
}

/// Replacer with zero-delay retries and the given part concurrency.
pub fn replacer(fake: &Arc<FakeFigshare>, concurrency: usize) -> ResourceReplacer {
    let client = client(fake);
    let engine = PartTransferEngine::new(client.clone())
        .with_policy(RetryPolicy::exponential(3).with_initial_delay(Duration::ZERO))
        .with_concurrency(concurrency);
    ResourceReplacer::new(client).with_engine(engine)
}

/// Write `size` bytes of deterministic content to `dir/name`.
pub fn data_file(dir: &TempDir, name: &str, size: usize) -> PathBuf {
    let path = dir.path().join(name);
    let data: Vec<u8> = (0..size).map(|i| (i * 7 % 256) as u8).collect();
    fs::write(&path, data).unwrap();
    path
}

pub fn md5_of(path: &Path) -> String {
    format!("{:x}", md5::compute(fs::read(path).unwrap()))
}
