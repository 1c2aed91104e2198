//! Shared fixtures: a small corpus and an in-process HTTP responder

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use concept_rag::{Manifest, RagDocument};

/// Two themes, three stock relations
pub fn corpus() -> Vec<RagDocument> {
    vec![
        RagDocument::theme_overview(
            "theme.cowos.overview",
            "theme.cowos",
            "先進封裝（CoWoS）",
            "主題：先進封裝（CoWoS）\n說明：晶圓級封裝產能。",
        ),
        RagDocument::theme_overview(
            "theme.cooling.overview",
            "theme.cooling",
            "資料中心散熱",
            "主題：資料中心散熱\n說明：風冷與液冷方案。",
        ),
        RagDocument::theme_to_stock(
            "theme.cowos__台積電_TSMC",
            "theme.cowos",
            "先進封裝（CoWoS）",
            "2330",
            "台積電 TSMC",
            "台積電 TSMC 與「先進封裝（CoWoS）」主題相關。",
        ),
        RagDocument::theme_to_stock(
            "theme.cooling__奇鋐_AVC",
            "theme.cooling",
            "資料中心散熱",
            "3017",
            "奇鋐 AVC",
            "奇鋐 AVC 與「資料中心散熱」主題相關。",
        ),
        RagDocument::theme_to_stock(
            "theme.cooling__雙鴻_Auras",
            "theme.cooling",
            "資料中心散熱",
            "3324",
            "雙鴻 Auras",
            "雙鴻 Auras 與「資料中心散熱」主題相關。",
        ),
    ]
}

pub fn manifest() -> Manifest {
    Manifest::new(2, 3)
}

pub fn docs_jsonl(documents: &[RagDocument]) -> String {
    documents
        .iter()
        .map(|doc| serde_json::to_string(doc).unwrap())
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn manifest_json(manifest: &Manifest) -> String {
    serde_json::to_string(manifest).unwrap()
}

/// Serves fixed bodies by path; anything else is a 404.
/// Returns the base URL, e.g. `http://127.0.0.1:PORT`.
pub async fn serve(routes: HashMap<String, (u16, String)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let routes = Arc::new(routes);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let routes = routes.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => request.extend_from_slice(&buf[..n]),
                    }
                }

                let request = String::from_utf8_lossy(&request);
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                let (status, body) = routes
                    .get(&path)
                    .cloned()
                    .unwrap_or((404, "not found".to_string()));

                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    if status == 200 { "OK" } else { "Error" },
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    format!("http://{}", addr)
}

/// Routes for a corpus served under `/rag`
pub fn rag_routes(manifest: &Manifest, documents: &[RagDocument]) -> HashMap<String, (u16, String)> {
    HashMap::from([
        ("/rag/manifest.json".to_string(), (200, manifest_json(manifest))),
        ("/rag/docs.jsonl".to_string(), (200, docs_jsonl(documents))),
    ])
}
