//! End-to-end summary run against a mock Ollama server
//!
//! Exercises extraction, hierarchical chunking, embedding, retrieval, rerank
//! and synthesis through the real providers over HTTP.

use serde_json::{json, Value};
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, Request, Respond, ResponseTemplate,
};

use kisum_engine::conductor::{SectionPlan, SummaryOrchestrator};
use kisum_engine::config::Config;
use kisum_engine::secrets::SecretManager;
use sdk::errors::EngineError;

/// One embedding per input text; texts mentioning "risk" point one way,
/// everything else the other
struct EmbedResponder {
    texts_seen: Arc<AtomicUsize>,
}

impl Respond for EmbedResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let inputs = body["input"].as_array().cloned().unwrap_or_default();
        self.texts_seen.fetch_add(inputs.len(), Ordering::SeqCst);

        let embeddings: Vec<Vec<f32>> = inputs
            .iter()
            .map(|t| {
                if t.as_str().unwrap_or_default().contains("risk") {
                    vec![1.0, 0.0]
                } else {
                    vec![0.2, 1.0]
                }
            })
            .collect();

        ResponseTemplate::new(200).set_body_json(json!({ "embeddings": embeddings }))
    }
}

/// Rerank prompts get a document choice; everything else a fixed answer
struct ChatResponder;

impl Respond for ChatResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap_or(Value::Null);
        let last = body["messages"]
            .as_array()
            .and_then(|m| m.last())
            .and_then(|m| m["content"].as_str())
            .unwrap_or_default()
            .to_string();

        let content = if last.starts_with("A list of documents") {
            "Doc: 1, Relevance: 8".to_string()
        } else if last.contains("Query:") {
            "The study drug may cause nausea.".to_string()
        } else {
            "This research studies a new drug.\n\n---\n".to_string()
        };

        ResponseTemplate::new(200).set_body_json(json!({
            "model": "llama3.1:8b",
            "message": {"role": "assistant", "content": content},
            "done": true
        }))
    }
}

fn document() -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
    for i in 0..120 {
        writeln!(
            file,
            "Paragraph {} describes visit schedules, the main risk of nausea, and costs.",
            i
        )
        .unwrap();
    }
    file
}

/// The same study as a Word document, one paragraph per line
fn word_document(dir: &std::path::Path) -> std::path::PathBuf {
    let paragraphs: String = (0..60)
        .map(|i| {
            format!(
                "<w:p><w:r><w:t>Paragraph {} lists the main risk of nausea &amp; the visit costs.</w:t></w:r></w:p>",
                i
            )
        })
        .collect();
    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        paragraphs
    );

    let path = dir.join("consent.docx");
    let mut writer = zip::ZipWriter::new(std::fs::File::create(&path).unwrap());
    writer
        .start_file("word/document.xml", zip::write::SimpleFileOptions::default())
        .unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    writer.finish().unwrap();
    path
}

fn config(server: &MockServer) -> Config {
    let mut config = Config::default_config();
    config.llm.default_provider = "ollama".to_string();
    config.llm.ollama.base_url = server.uri();
    config
}

#[tokio::test]
async fn test_end_to_end_summary_with_builtin_plan() {
    let server = MockServer::start().await;
    let texts_seen = Arc::new(AtomicUsize::new(0));

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(EmbedResponder {
            texts_seen: Arc::clone(&texts_seen),
        })
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ChatResponder)
        .mount(&server)
        .await;

    let plan = Arc::new(SectionPlan::builtin().unwrap());
    let fallbacks = plan.fallback_policy().missing_defaults().clone();
    let orchestrator =
        SummaryOrchestrator::from_config(&config(&server), &SecretManager::new("kisum-test"), Arc::clone(&plan))
            .unwrap();

    let doc = document();
    let summary = orchestrator.generate(doc.path()).await.unwrap();

    let ids: Vec<&str> = summary.sections.iter().map(|s| s.section.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "section1", "section2", "section3", "section4", "section5", "section6", "section7",
            "section8", "section9"
        ]
    );

    for section in &summary.sections {
        match fallbacks.get(&section.section) {
            Some(text) => assert_eq!(&section.text, text),
            None => assert_eq!(section.text, "This research studies a new drug."),
        }
    }

    let text = summary.text();
    assert!(text.starts_with("This research studies a new drug.\n\n"));
    assert_eq!(text.matches("\n\n").count(), 8);

    // Every leaf chunk plus one embedding per context question
    let context_questions: usize = plan.sections().iter().map(|s| s.context_queries().len()).sum();
    assert!(texts_seen.load(Ordering::SeqCst) > context_questions);
}

#[tokio::test]
async fn test_end_to_end_summary_from_word_document() {
    let server = MockServer::start().await;
    let texts_seen = Arc::new(AtomicUsize::new(0));

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(EmbedResponder {
            texts_seen: Arc::clone(&texts_seen),
        })
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ChatResponder)
        .mount(&server)
        .await;

    let orchestrator = SummaryOrchestrator::from_config(
        &config(&server),
        &SecretManager::new("kisum-test"),
        Arc::new(SectionPlan::builtin().unwrap()),
    )
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let summary = orchestrator
        .generate(&word_document(dir.path()))
        .await
        .unwrap();

    let expected: Vec<String> = (0..60)
        .map(|i| format!("Paragraph {} lists the main risk of nausea & the visit costs.", i))
        .collect();
    assert_eq!(
        summary.digest,
        kisum_engine::ingest::document_digest(&expected.join("\n"))
    );
    assert_eq!(summary.sections.len(), 9);
    assert!(texts_seen.load(Ordering::SeqCst) > 0);
}

#[tokio::test]
async fn test_unsupported_document_fails_before_any_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let orchestrator = SummaryOrchestrator::from_config(
        &config(&server),
        &SecretManager::new("kisum-test"),
        Arc::new(SectionPlan::builtin().unwrap()),
    )
    .unwrap();

    let file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
    let err = orchestrator.generate(file.path()).await.unwrap_err();

    assert!(matches!(err, EngineError::UnsupportedDocument(_)));
}

#[tokio::test]
async fn test_embedding_outage_is_indexing_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let orchestrator = SummaryOrchestrator::from_config(
        &config(&server),
        &SecretManager::new("kisum-test"),
        Arc::new(SectionPlan::builtin().unwrap()),
    )
    .unwrap();

    let doc = document();
    let err = orchestrator.generate(doc.path()).await.unwrap_err();

    assert!(matches!(err, EngineError::Indexing(_)));
}

#[tokio::test]
async fn test_chat_outage_leaves_only_fallbacks() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(EmbedResponder {
            texts_seen: Arc::new(AtomicUsize::new(0)),
        })
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let plan = Arc::new(SectionPlan::builtin().unwrap());
    let orchestrator =
        SummaryOrchestrator::from_config(&config(&server), &SecretManager::new("kisum-test"), plan)
            .unwrap();

    let doc = document();
    let summary = orchestrator.generate(doc.path()).await.unwrap();

    let ids: Vec<&str> = summary.sections.iter().map(|s| s.section.as_str()).collect();
    assert_eq!(ids, vec!["section2", "section3"]);
}
