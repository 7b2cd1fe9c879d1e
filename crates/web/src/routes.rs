use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::{header, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use translator::{Question, QuestionError, Translate, TranslateOutcome};

use crate::pages::{self, OutputView, ResultsView};

const STYLE_CSS: &str = include_str!("../assets/style.css");
const LOGO_SVG: &str = include_str!("../assets/logo.svg");

pub(crate) const MSG_INVALID_QUESTION: &str =
    "That question could not be read. Please use plain text.";
pub(crate) const MSG_QUESTION_TOO_LONG: &str = "That question is too long. Please shorten it.";
pub(crate) const MSG_TRANSLATOR_FAILED: &str = "The translator could not process this question.";
pub(crate) const MSG_TRANSLATOR_TIMEOUT: &str = "The translator took too long to answer.";

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) translator: Arc<dyn Translate>,
    pub(crate) max_question_chars: usize,
}

/// Query pairs in request order. Kept as a list so a repeated `question`
/// resolves to its last value instead of failing to deserialize.
pub(crate) type QueryPairs = Vec<(String, String)>;

fn last_question(pairs: QueryPairs) -> Option<String> {
    pairs
        .into_iter()
        .rev()
        .find(|(key, _)| key == "question")
        .map(|(_, value)| value)
}

pub(crate) fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/index.html", get(home))
        .route("/results", get(results))
        .route("/about", get(about))
        .route("/documentation", get(documentation))
        .route("/health", get(health))
        .route("/css/style.css", get(stylesheet))
        .route("/res/logo.svg", get(logo))
        .fallback(not_found)
        .with_state(state)
        .layer(middleware::from_fn(log_http_request))
}

async fn home() -> Html<String> {
    Html(pages::home_page())
}

async fn about() -> Html<String> {
    Html(pages::about_page())
}

async fn documentation() -> Html<String> {
    Html(pages::documentation_page())
}

async fn health() -> &'static str {
    "ok"
}

async fn stylesheet() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLE_CSS)
}

async fn logo() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/svg+xml")], LOGO_SVG)
}

async fn not_found() -> (StatusCode, Html<String>) {
    (StatusCode::NOT_FOUND, Html(pages::not_found_page()))
}

pub(crate) async fn results(
    State(state): State<AppState>,
    params: Result<Query<QueryPairs>, QueryRejection>,
) -> Response {
    let raw = match params {
        Ok(Query(pairs)) => last_question(pairs),
        Err(err) => {
            tracing::warn!(event = "results.bad_query", error = %err, "unreadable query string");
            return render(
                StatusCode::BAD_REQUEST,
                None,
                OutputView::Message(MSG_INVALID_QUESTION),
            );
        }
    };

    let question = match Question::parse(raw.as_deref(), state.max_question_chars) {
        Ok(question) => question,
        Err(QuestionError::Missing) => {
            return render(StatusCode::OK, None, OutputView::Placeholder);
        }
        Err(err) => {
            tracing::info!(event = "results.rejected", reason = %err, "question rejected");
            let message = match err {
                QuestionError::TooLong { .. } => MSG_QUESTION_TOO_LONG,
                _ => MSG_INVALID_QUESTION,
            };
            return render(StatusCode::BAD_REQUEST, None, OutputView::Message(message));
        }
    };

    let outcome = state.translator.translate(&question).await;
    let (status, output) = outcome_view(outcome);
    render(status, Some(question.as_str().to_string()), output)
}

pub(crate) fn outcome_view(outcome: TranslateOutcome) -> (StatusCode, OutputView) {
    match outcome {
        TranslateOutcome::Translated { text, truncated } => {
            (StatusCode::OK, OutputView::Query { text, truncated })
        }
        TranslateOutcome::Failed { .. } | TranslateOutcome::Unavailable { .. } => (
            StatusCode::BAD_GATEWAY,
            OutputView::Message(MSG_TRANSLATOR_FAILED),
        ),
        TranslateOutcome::TimedOut { .. } => (
            StatusCode::GATEWAY_TIMEOUT,
            OutputView::Message(MSG_TRANSLATOR_TIMEOUT),
        ),
    }
}

fn render(status: StatusCode, question: Option<String>, output: OutputView) -> Response {
    let view = ResultsView { question, output };
    (status, Html(pages::results_page(&view))).into_response()
}

async fn log_http_request(req: Request<Body>, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(req).await;
    // Only the path: the query string carries the user's question.
    tracing::info!(
        method = %method,
        path = %path,
        status = %response.status(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "http request"
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    struct CannedTranslator {
        outcome: TranslateOutcome,
        calls: AtomicUsize,
        seen: Mutex<Vec<String>>,
    }

    impl CannedTranslator {
        fn new(outcome: TranslateOutcome) -> Arc<Self> {
            Arc::new(Self {
                outcome,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Translate for CannedTranslator {
        async fn translate(&self, question: &Question) -> TranslateOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(question.as_str().to_string());
            self.outcome.clone()
        }
    }

    fn state(translator: Arc<CannedTranslator>) -> AppState {
        AppState {
            translator,
            max_question_chars: 50,
        }
    }

    fn params(question: Option<&str>) -> Result<Query<QueryPairs>, QueryRejection> {
        let mut pairs = vec![("submit".to_string(), "SUBMIT".to_string())];
        if let Some(question) = question {
            pairs.insert(0, ("question".to_string(), question.to_string()));
        }
        Ok(Query(pairs))
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    const PARIS_QUERY: &str = "MATCH (w:Weather)-[:IN]->(c:City {name:'Paris'}) RETURN w";
    const PARIS_ESCAPED: &str =
        "MATCH (w:Weather)-[:IN]-&gt;(c:City {name:&#39;Paris&#39;}) RETURN w";

    #[tokio::test]
    async fn translated_question_is_shown() {
        let translator = CannedTranslator::new(TranslateOutcome::translated(PARIS_QUERY));
        let response = results(
            State(state(Arc::clone(&translator))),
            params(Some("weather in Paris")),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains(&format!("<h2 id=\"output\">{PARIS_ESCAPED}</h2>")));
        assert_eq!(
            *translator.seen.lock().unwrap(),
            vec!["weather in Paris".to_string()]
        );
    }

    #[tokio::test]
    async fn missing_or_empty_question_renders_placeholder_without_translating() {
        let translator = CannedTranslator::new(TranslateOutcome::translated("unused"));
        for question in [None, Some(""), Some("   ")] {
            let response = results(State(state(Arc::clone(&translator))), params(question)).await;
            assert_eq!(response.status(), StatusCode::OK);
            let body = body_text(response).await;
            assert!(body.contains(pages::QUESTION_PLACEHOLDER));
        }
        assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn overlong_and_control_character_questions_are_rejected() {
        let translator = CannedTranslator::new(TranslateOutcome::translated("unused"));
        let long = "a".repeat(51);
        for question in [long.as_str(), "who\u{0}acted"] {
            let response =
                results(State(state(Arc::clone(&translator))), params(Some(question))).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
        assert_eq!(translator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failures_show_generic_messages_only() {
        let cases = [
            (
                TranslateOutcome::failed(Some(1), Some("Traceback: secret path".to_string())),
                StatusCode::BAD_GATEWAY,
                MSG_TRANSLATOR_FAILED,
            ),
            (
                TranslateOutcome::unavailable("failed to spawn python3: not found"),
                StatusCode::BAD_GATEWAY,
                MSG_TRANSLATOR_FAILED,
            ),
            (
                TranslateOutcome::TimedOut {
                    after: Duration::from_secs(10),
                },
                StatusCode::GATEWAY_TIMEOUT,
                MSG_TRANSLATOR_TIMEOUT,
            ),
        ];
        for (outcome, status, message) in cases {
            let translator = CannedTranslator::new(outcome);
            let response = results(State(state(translator)), params(Some("anything"))).await;
            assert_eq!(response.status(), status);
            let body = body_text(response).await;
            assert!(body.contains(message));
            assert!(!body.contains("Traceback"));
            assert!(!body.contains("python3"));
        }
    }

    #[tokio::test]
    async fn script_in_question_or_output_is_escaped() {
        let translator =
            CannedTranslator::new(TranslateOutcome::translated("<script>alert(2)</script>"));
        let response = results(
            State(state(translator)),
            params(Some("<script>alert(1)</script>")),
        )
        .await;
        let body = body_text(response).await;
        assert!(!body.contains("<script>"));
        assert!(body.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(body.contains("&lt;script&gt;alert(2)&lt;/script&gt;"));
    }

    async fn http_get(router: Router, target: &str) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let request =
            format!("GET {target} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        server.abort();
        String::from_utf8_lossy(&response).into_owned()
    }

    #[tokio::test]
    async fn form_submission_round_trip_over_http() {
        let translator = CannedTranslator::new(TranslateOutcome::translated(PARIS_QUERY));
        let router = build_router(state(Arc::clone(&translator)));
        let response = http_get(
            router,
            "/results?question=weather+in+Paris&submit=SUBMIT",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains(PARIS_ESCAPED));
        assert_eq!(
            *translator.seen.lock().unwrap(),
            vec!["weather in Paris".to_string()]
        );
    }

    #[test]
    fn repeated_question_takes_last_value() {
        let pairs = vec![
            ("question".to_string(), "first".to_string()),
            ("submit".to_string(), "SUBMIT".to_string()),
            ("question".to_string(), "second".to_string()),
        ];
        assert_eq!(last_question(pairs), Some("second".to_string()));
        assert_eq!(
            last_question(vec![("submit".to_string(), "SUBMIT".to_string())]),
            None
        );
    }

    #[tokio::test]
    async fn repeated_question_over_http_uses_last_value() {
        let translator = CannedTranslator::new(TranslateOutcome::translated(PARIS_QUERY));
        let response = http_get(
            build_router(state(Arc::clone(&translator))),
            "/results?question=weather+in+Rome&question=weather+in+Paris",
        )
        .await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains(PARIS_ESCAPED));
        assert_eq!(
            *translator.seen.lock().unwrap(),
            vec!["weather in Paris".to_string()]
        );
    }

    #[tokio::test]
    async fn empty_question_over_http_renders() {
        let translator = CannedTranslator::new(TranslateOutcome::translated("unused"));
        let response = http_get(build_router(state(translator)), "/results?question=").await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains(pages::QUESTION_PLACEHOLDER));
    }

    #[tokio::test]
    async fn static_routes_are_served() {
        let translator = CannedTranslator::new(TranslateOutcome::translated("unused"));
        let router = build_router(state(translator));
        let css = http_get(router.clone(), "/css/style.css").await;
        assert!(css.starts_with("HTTP/1.1 200"));
        assert!(css.to_ascii_lowercase().contains("content-type: text/css"));
        let missing = http_get(router.clone(), "/results.php").await;
        assert!(missing.starts_with("HTTP/1.1 404"));
        let health = http_get(router, "/health").await;
        assert!(health.ends_with("ok"));
    }
}
