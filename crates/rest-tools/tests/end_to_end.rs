//! A service validating its arguments with `ArgumentHandler`, called through
//! `RestClient`.

use std::convert::Infallible;
use std::sync::Arc;

use bytes::Bytes;
use http::{Request, Response, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use rest_tools::prelude::*;
use serde_json::{json, Map, Value};
use tokio::net::TcpListener;

struct Service {
    jobs: ArgumentHandler,
    search: ArgumentHandler,
}

impl Service {
    fn new() -> Self {
        let mut jobs = ArgumentHandler::new(ArgumentSource::JsonBodyArguments);
        jobs.add_argument(ArgumentSpec::new("dataset")).unwrap();
        jobs.add_argument(
            ArgumentSpec::new("priority")
                .default(json!(0))
                .arg_type(ArgType::Integer)
                .choices([json!(0), json!(1), json!(2)]),
        )
        .unwrap();
        jobs.add_argument(
            ArgumentSpec::new("tags")
                .default(json!([]))
                .arg_type(ArgType::List),
        )
        .unwrap();

        let mut search = ArgumentHandler::new(ArgumentSource::QueryArguments);
        search.add_argument(ArgumentSpec::new("q")).unwrap();
        search
            .add_argument(
                ArgumentSpec::new("limit")
                    .default(json!(10))
                    .arg_type(ArgType::Integer),
            )
            .unwrap();
        search
            .add_argument(
                ArgumentSpec::new("exact")
                    .default(json!(false))
                    .arg_type(ArgType::Boolean),
            )
            .unwrap();

        Self { jobs, search }
    }

    fn handle(&self, request: Request<Bytes>) -> Response<Bytes> {
        let handler = match request.uri().path() {
            "/jobs" => &self.jobs,
            "/search" => &self.search,
            _ => {
                let mut response = Response::new(Bytes::new());
                *response.status_mut() = StatusCode::NOT_FOUND;
                return response;
            }
        };

        match handler.parse_args(&RequestContext::from(request)) {
            Ok(args) => {
                let body: Map<String, Value> = args
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.clone()))
                    .collect();
                Response::new(Bytes::from(Value::Object(body).to_string()))
            }
            Err(err) => ArgumentRejection::from(err).into_response(),
        }
    }
}

async fn spawn_service() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let service = Arc::new(Service::new());

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                continue;
            };
            let service = service.clone();

            tokio::spawn(async move {
                let svc = service_fn(move |req: Request<Incoming>| {
                    let service = service.clone();
                    async move {
                        let (parts, body) = req.into_parts();
                        let body = body
                            .collect()
                            .await
                            .map(|collected| collected.to_bytes())
                            .unwrap_or_default();
                        let response = service.handle(Request::from_parts(parts, body));
                        Ok::<_, Infallible>(response.map(Full::new))
                    }
                });

                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), svc)
                    .await;
            });
        }
    });

    format!("http://{addr}")
}

async fn client() -> RestClient {
    let address = spawn_service().await;
    let mut config = ClientConfig::new(address);
    config.retries = 0;
    RestClient::new(config).unwrap()
}

fn rejection(err: ClientError) -> (u16, Value) {
    match err {
        ClientError::Status { status, body } => (status, serde_json::from_str(&body).unwrap()),
        other => panic!("expected a status error, got {other}"),
    }
}

#[tokio::test]
async fn json_body_arguments_are_coerced_and_defaulted() {
    let client = client().await;

    let response = client
        .request(
            Method::POST,
            "/jobs",
            Some(&json!({"dataset": "d1", "priority": "2"})),
        )
        .await
        .unwrap();

    assert_eq!(response, json!({"dataset": "d1", "priority": 2, "tags": []}));
}

#[tokio::test]
async fn missing_argument_is_a_400() {
    let client = client().await;

    let err = client
        .request(Method::POST, "/jobs", Some(&json!({"priority": 1})))
        .await
        .unwrap_err();

    let (status, body) = rejection(err);
    assert_eq!(status, 400);
    assert_eq!(body["code"], "MISSING_ARGUMENT");
    assert_eq!(
        body["message"],
        "the following arguments are required: dataset"
    );
}

#[tokio::test]
async fn unrecognized_arguments_are_listed_in_order() {
    let client = client().await;

    let err = client
        .request(
            Method::POST,
            "/jobs",
            Some(&json!({"dataset": "d1", "xtra": 1, "another": true})),
        )
        .await
        .unwrap_err();

    let (status, body) = rejection(err);
    assert_eq!(status, 400);
    assert_eq!(body["message"], "unrecognized arguments: xtra, another");
}

#[tokio::test]
async fn choice_violation_is_a_400() {
    let client = client().await;

    let err = client
        .request(
            Method::POST,
            "/jobs",
            Some(&json!({"dataset": "d1", "priority": 3})),
        )
        .await
        .unwrap_err();

    let (_, body) = rejection(err);
    assert_eq!(body["code"], "INVALID_CHOICE");
    assert_eq!(
        body["message"],
        "argument priority: invalid choice: 3 (choose from 0, 1, 2)"
    );
}

#[tokio::test]
async fn query_arguments_are_coerced() {
    let client = client().await;

    let response = client
        .request(
            Method::GET,
            "/search",
            Some(&json!({"q": "icecube", "limit": 5, "exact": "no"})),
        )
        .await
        .unwrap();

    assert_eq!(response, json!({"q": "icecube", "limit": 5, "exact": false}));
}

#[tokio::test]
async fn query_type_error_is_a_400() {
    let client = client().await;

    let err = client
        .request(
            Method::GET,
            "/search",
            Some(&json!({"q": "icecube", "limit": "many"})),
        )
        .await
        .unwrap_err();

    let (status, body) = rejection(err);
    assert_eq!(status, 400);
    assert_eq!(body["code"], "INVALID_TYPE");
    assert_eq!(body["message"], "argument limit: invalid type");
}
