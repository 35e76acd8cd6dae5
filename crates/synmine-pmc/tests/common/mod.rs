//! Stub corpus host: a directory listing plus gzipped bulk files

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};

use flate2::Compression;
use flate2::write::GzEncoder;

/// Canned response: status code and body
pub type Route = (u16, Vec<u8>);

pub fn article(pmc: u64, body: &str) -> String {
    format!(
        "<article article-type=\"research-article\"><front><article-meta>\
         <article-id pub-id-type=\"pmc\">{pmc}</article-id>\
         <title-group><article-title>Study {pmc}</article-title></title-group>\
         </article-meta></front><body><p>{body}</p></body></article>\n"
    )
}

pub fn gz_corpus(articles: &[String]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::fast());
    enc.write_all(b"<?xml version=\"1.0\"?>\n<pmc-articleset>\n").unwrap();
    for a in articles {
        enc.write_all(a.as_bytes()).unwrap();
    }
    enc.write_all(b"</pmc-articleset>\n").unwrap();
    enc.finish().unwrap()
}

pub fn listing(files: &[&str]) -> Vec<u8> {
    let mut html = String::from("<html><body><pre>\n");
    for f in files {
        html.push_str(&format!("<a href=\"{f}\">{f}</a>   2024-03-01 10:00  1K\n"));
    }
    html.push_str("</pre></body></html>\n");
    html.into_bytes()
}

pub struct StubServer {
    base: String,
    hits: Arc<Mutex<HashMap<String, usize>>>,
}

impl StubServer {
    pub fn start(routes: HashMap<String, Vec<Route>>) -> Self {
        Self::start_with(routes, |_| {})
    }

    /// Serve `routes` until the test process exits, calling `on_request`
    /// with each path before answering. A route's last response repeats;
    /// unknown paths get 404.
    pub fn start_with(
        routes: HashMap<String, Vec<Route>>,
        on_request: impl Fn(&str) + Send + 'static,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let hits: Arc<Mutex<HashMap<String, usize>>> = Arc::default();
        let counter = Arc::clone(&hits);

        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else { continue };
                let mut lines = BufReader::new(stream.try_clone().unwrap()).lines();
                let Some(Ok(request_line)) = lines.next() else { continue };
                // Drain headers up to the blank line
                for line in lines.by_ref() {
                    if line.map_or(true, |l| l.is_empty()) {
                        break;
                    }
                }
                let path = request_line.split(' ').nth(1).unwrap_or("/").to_string();
                on_request(&path);

                let n = {
                    let mut hits = counter.lock().unwrap();
                    let n = hits.entry(path.clone()).or_insert(0);
                    *n += 1;
                    *n - 1
                };
                let (status, body) = routes
                    .get(&path)
                    .and_then(|script| script.get(n).or(script.last()))
                    .cloned()
                    .unwrap_or((404, b"not found".to_vec()));

                let head = format!(
                    "HTTP/1.1 {status} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes());
                let _ = stream.write_all(&body);
                let _ = stream.flush();
            }
        });

        Self { base, hits }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}
