use std::io::Read;
use std::thread;
use std::time::Duration;

use tiny_http::{Header, Response, Server};
use xctranslate::{
    LanguageCode, ProviderError, ProviderKind, ProviderSettings, RetryPolicy, provider,
};

// ---------------------------------------------------------------------------
// Local mock server
// ---------------------------------------------------------------------------

struct Reply {
    status: u16,
    body: &'static str,
    headers: Vec<(&'static str, &'static str)>,
    delay: Option<Duration>,
}

fn reply(status: u16, body: &'static str) -> Reply {
    Reply {
        status,
        body,
        headers: Vec::new(),
        delay: None,
    }
}

#[derive(Debug)]
struct Recorded {
    method: String,
    url: String,
    body: String,
    authorization: Option<String>,
}

/// Serves `replies` in order, one per request, and returns what it saw.
fn spawn_server(replies: Vec<Reply>) -> (String, thread::JoinHandle<Vec<Recorded>>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let url = format!("http://{addr}");

    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        for reply in replies {
            let Ok(mut request) = server.recv() else { break };
            let mut body = String::new();
            let _ = request.as_reader().read_to_string(&mut body);
            seen.push(Recorded {
                method: request.method().to_string(),
                url: request.url().to_string(),
                body,
                authorization: request
                    .headers()
                    .iter()
                    .find(|h| h.field.equiv("Authorization"))
                    .map(|h| h.value.as_str().to_string()),
            });
            if let Some(delay) = reply.delay {
                thread::sleep(delay);
            }
            let mut response = Response::from_string(reply.body).with_status_code(reply.status);
            for (name, value) in reply.headers {
                response = response.with_header(Header::from_bytes(name.as_bytes(), value.as_bytes()).unwrap());
            }
            let _ = request.respond(response);
        }
        seen
    });
    (url, handle)
}

fn settings(kind: ProviderKind, endpoint: String) -> ProviderSettings {
    let mut settings = ProviderSettings::new(kind);
    settings.endpoint = Some(endpoint);
    settings.timeout = Duration::from_secs(5);
    settings.retry = RetryPolicy {
        max_attempts: 3,
        base_backoff: Duration::from_millis(10),
        max_backoff: Duration::from_millis(50),
        throttle_cooldown: Duration::from_millis(20),
        min_interval: Duration::ZERO,
    };
    settings
}

fn code(s: &str) -> LanguageCode {
    LanguageCode::parse(s).unwrap()
}

// ---------------------------------------------------------------------------
// MyMemory
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_mymemory_translates_with_mapped_codes() {
    let (url, handle) = spawn_server(vec![reply(
        200,
        r#"{"responseData":{"translatedText":"&quot;取消&quot;","match":1},"responseStatus":200,"responseDetails":""}"#,
    )]);
    let mut settings = settings(ProviderKind::MyMemory, format!("{url}/get"));
    settings.email = Some("dev@example.com".to_string());
    let translator = provider::build(&settings).unwrap();

    let result = translator
        .translate("\"Cancel\"", &code("en"), &code("zh-Hans"))
        .await;
    assert_eq!(result, Ok("\"取消\"".to_string()));

    let seen = handle.join().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, "GET");
    assert!(seen[0].url.starts_with("/get?"));
    assert!(seen[0].url.contains("langpair=en%7Czh-CN"), "{}", seen[0].url);
    assert!(seen[0].url.contains("de=dev%40example.com"), "{}", seen[0].url);
}

#[tokio::test]
async fn test_mymemory_quota_is_not_retried() {
    let (url, handle) = spawn_server(vec![reply(
        200,
        r#"{"responseData":{"translatedText":"MYMEMORY WARNING: YOU USED ALL AVAILABLE FREE TRANSLATIONS FOR TODAY"},"responseStatus":429,"quotaFinished":true}"#,
    )]);
    let translator = provider::build(&settings(ProviderKind::MyMemory, format!("{url}/get"))).unwrap();

    let result = translator.translate("Hello", &code("en"), &code("de")).await;
    assert!(matches!(result, Err(ProviderError::QuotaExceeded(_))));
    assert_eq!(handle.join().unwrap().len(), 1);
}

#[tokio::test]
async fn test_server_errors_are_retried_until_success() {
    let (url, handle) = spawn_server(vec![
        reply(503, "unavailable"),
        reply(502, "bad gateway"),
        reply(
            200,
            r#"{"responseData":{"translatedText":"Hallo"},"responseStatus":"200"}"#,
        ),
    ]);
    let translator = provider::build(&settings(ProviderKind::MyMemory, format!("{url}/get"))).unwrap();

    let result = translator.translate("Hello", &code("en"), &code("de")).await;
    assert_eq!(result, Ok("Hallo".to_string()));
    assert_eq!(handle.join().unwrap().len(), 3);
}

#[tokio::test]
async fn test_throttle_then_success() {
    let mut throttled = reply(429, "slow down");
    throttled.headers.push(("Retry-After", "0"));
    let (url, handle) = spawn_server(vec![
        throttled,
        reply(200, r#"{"responseData":{"translatedText":"Hallo"},"responseStatus":200}"#),
    ]);
    let translator = provider::build(&settings(ProviderKind::MyMemory, format!("{url}/get"))).unwrap();

    let result = translator.translate("Hello", &code("en"), &code("de")).await;
    assert_eq!(result, Ok("Hallo".to_string()));
    assert_eq!(handle.join().unwrap().len(), 2);
}

#[tokio::test]
async fn test_persistent_failures_are_exhausted() {
    let (url, handle) = spawn_server(vec![
        reply(500, "boom"),
        reply(500, "boom"),
        reply(500, "boom"),
    ]);
    let translator = provider::build(&settings(ProviderKind::MyMemory, format!("{url}/get"))).unwrap();

    match translator.translate("Hello", &code("en"), &code("de")).await {
        Err(ProviderError::Exhausted {
            text,
            attempts,
            last_error,
        }) => {
            assert_eq!(text, "Hello");
            assert_eq!(attempts, 3);
            assert!(last_error.contains("500"), "{last_error}");
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(handle.join().unwrap().len(), 3);
}

#[tokio::test]
async fn test_timeouts_are_transient() {
    let mut slow = reply(200, r#"{"responseData":{"translatedText":"Hallo"},"responseStatus":200}"#);
    slow.delay = Some(Duration::from_millis(600));
    let (url, handle) = spawn_server(vec![slow]);

    let mut settings = settings(ProviderKind::MyMemory, format!("{url}/get"));
    settings.timeout = Duration::from_millis(100);
    settings.retry.max_attempts = 1;
    let translator = provider::build(&settings).unwrap();

    match translator.translate("Hello", &code("en"), &code("de")).await {
        Err(ProviderError::Exhausted { attempts, .. }) => assert_eq!(attempts, 1),
        other => panic!("unexpected result: {other:?}"),
    }
    handle.join().unwrap();
}

// ---------------------------------------------------------------------------
// Google
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_google_joins_segments() {
    let (url, handle) = spawn_server(vec![reply(
        200,
        r#"[[["Hallo Welt. ","Hello world. ",null,null,10],["Bis bald.","See you.",null,null,10]],null,"en"]"#,
    )]);
    let translator = provider::build(&settings(ProviderKind::Google, format!("{url}/translate_a/single"))).unwrap();

    let result = translator
        .translate("Hello world. See you.", &code("en"), &code("pt-BR"))
        .await;
    assert_eq!(result, Ok("Hallo Welt. Bis bald.".to_string()));

    let seen = handle.join().unwrap();
    assert!(seen[0].url.contains("client=gtx"));
    assert!(seen[0].url.contains("tl=pt&"), "{}", seen[0].url);
    assert!(seen[0].url.contains("dt=t"));
}

#[tokio::test]
async fn test_google_bad_request_is_rejected() {
    let (url, handle) = spawn_server(vec![reply(400, "Bad language pair")]);
    let translator = provider::build(&settings(ProviderKind::Google, format!("{url}/translate_a/single"))).unwrap();

    let result = translator.translate("Hello", &code("en"), &code("xx")).await;
    assert!(matches!(result, Err(ProviderError::Rejected(_))));
    assert_eq!(handle.join().unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// DeepL
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_deepl_sends_key_and_json_body() {
    let (url, handle) = spawn_server(vec![reply(
        200,
        r#"{"translations":[{"detected_source_language":"EN","text":"Abbrechen"}]}"#,
    )]);
    let mut settings = settings(ProviderKind::DeepL, format!("{url}/v2/translate"));
    settings.api_key = Some("secret:fx".to_string());
    let translator = provider::build(&settings).unwrap();

    let result = translator.translate("Cancel", &code("en"), &code("de")).await;
    assert_eq!(result, Ok("Abbrechen".to_string()));

    let seen = handle.join().unwrap();
    assert_eq!(seen[0].method, "POST");
    assert_eq!(seen[0].url, "/v2/translate");
    assert_eq!(seen[0].authorization.as_deref(), Some("DeepL-Auth-Key secret:fx"));
    let body: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
    assert_eq!(
        body,
        serde_json::json!({ "text": ["Cancel"], "source_lang": "EN", "target_lang": "DE" })
    );
}

#[tokio::test]
async fn test_deepl_quota_status() {
    let (url, handle) = spawn_server(vec![reply(456, "Quota exceeded")]);
    let mut settings = settings(ProviderKind::DeepL, format!("{url}/v2/translate"));
    settings.api_key = Some("secret".to_string());
    let translator = provider::build(&settings).unwrap();

    let result = translator.translate("Cancel", &code("en"), &code("de")).await;
    assert!(matches!(result, Err(ProviderError::QuotaExceeded(_))));
    assert_eq!(handle.join().unwrap().len(), 1);
}
