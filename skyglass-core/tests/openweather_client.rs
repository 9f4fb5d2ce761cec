use skyglass_core::{
    Coordinate, OpenWeatherClient, PlaceNamer, Units, WeatherClient, WeatherError,
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    task::JoinHandle,
};

const ONE_CALL: &str = include_str!("fixtures/onecall.json");
const CITIES: &str = include_str!("fixtures/direct_geocoding.json");

const ISTANBUL: Coordinate = Coordinate::new(41.0082, 28.9784);

/// Serve one canned HTTP response; the handle yields the request target received.
async fn serve_once(status: &str, body: &str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut head = Vec::new();
        let mut chunk = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            head.extend_from_slice(&chunk[..n]);
        }
        socket.write_all(response.as_bytes()).await.ok();
        socket.shutdown().await.ok();

        let head = String::from_utf8_lossy(&head).into_owned();
        let request_line = head.lines().next().unwrap_or_default();
        request_line.split(' ').nth(1).unwrap_or_default().to_string()
    });

    (format!("http://{addr}"), handle)
}

fn client(base_url: &str) -> OpenWeatherClient {
    OpenWeatherClient::with_base_url("TEST_KEY".to_string(), base_url)
        .with_http_client(reqwest::Client::builder().no_proxy().build().unwrap())
}

#[tokio::test]
async fn fetch_weather_decodes_snapshot() {
    let (base, server) = serve_once("200 OK", ONE_CALL).await;

    let snapshot = client(&base).fetch_weather(ISTANBUL, Units::Metric).await.unwrap();
    let target = server.await.unwrap();

    assert!(target.starts_with("/data/3.0/onecall?"));
    assert!(target.contains("exclude=minutely"));
    assert!(target.contains("units=metric"));
    assert!(target.contains("appid=TEST_KEY"));
    assert_eq!(snapshot.current.temperature, 11.37);
    assert_eq!(snapshot.hourly.len(), 2);
    assert_eq!(snapshot.daily.len(), 2);
}

#[tokio::test]
async fn unauthorized_wins_over_a_decodable_body() {
    let (base, server) = serve_once("401 Unauthorized", ONE_CALL).await;

    let err = client(&base).fetch_weather(ISTANBUL, Units::Metric).await.unwrap_err();
    server.await.unwrap();

    assert!(matches!(err, WeatherError::InvalidCredentials));
}

#[tokio::test]
async fn unauthorized_with_error_body_is_not_a_decode_failure() {
    let body = r#"{"cod":401,"message":"Invalid API key."}"#;
    let (base, server) = serve_once("401 Unauthorized", body).await;

    let err = client(&base).fetch_weather(ISTANBUL, Units::Metric).await.unwrap_err();
    server.await.unwrap();

    assert!(matches!(err, WeatherError::InvalidCredentials));
}

#[tokio::test]
async fn empty_body_is_empty_response() {
    let (base, server) = serve_once("200 OK", "").await;

    let err = client(&base).fetch_weather(ISTANBUL, Units::Metric).await.unwrap_err();
    server.await.unwrap();

    assert!(matches!(err, WeatherError::EmptyResponse));
}

#[tokio::test]
async fn malformed_body_keeps_raw_payload() {
    let body = r#"{"current":{"temp":"warm"}}"#;
    let (base, server) = serve_once("200 OK", body).await;

    let err = client(&base).fetch_weather(ISTANBUL, Units::Metric).await.unwrap_err();
    server.await.unwrap();

    match err {
        WeatherError::DecodeFailure { raw_body, .. } => assert_eq!(raw_body, body),
        other => panic!("expected DecodeFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn server_error_is_a_transport_failure() {
    let (base, server) = serve_once("503 Service Unavailable", "{}").await;

    let err = client(&base).fetch_weather(ISTANBUL, Units::Metric).await.unwrap_err();
    server.await.unwrap();

    match err {
        WeatherError::TransportFailure(e) => {
            assert_eq!(e.status(), Some(reqwest::StatusCode::SERVICE_UNAVAILABLE));
        }
        other => panic!("expected TransportFailure, got {other:?}"),
    }
}

#[tokio::test]
async fn refused_connection_is_a_transport_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = client(&format!("http://{addr}"))
        .fetch_weather(ISTANBUL, Units::Metric)
        .await
        .unwrap_err();

    assert!(matches!(err, WeatherError::TransportFailure(_)));
}

#[tokio::test]
async fn search_encodes_query_and_keeps_order() {
    let (base, server) = serve_once("200 OK", CITIES).await;

    let cities = client(&base).search_city("São Paulo").await.unwrap();
    let target = server.await.unwrap();

    assert!(target.starts_with("/geo/1.0/direct?"));
    assert!(target.is_ascii());
    assert!(!target.contains(' '));
    assert!(target.contains("q=S%C3%A3o+Paulo"));
    assert!(target.contains("limit=5"));

    let labels: Vec<String> = cities.iter().map(|c| c.label()).collect();
    assert_eq!(
        labels,
        [
            "London, England, GB",
            "London, Ontario, CA",
            "London, Ohio, US",
            "London, Kentucky, US",
            "Londres, AR",
        ]
    );
}

#[tokio::test]
async fn search_unauthorized_is_invalid_credentials() {
    let (base, server) = serve_once("401 Unauthorized", "").await;

    let err = client(&base).search_city("Ankara").await.unwrap_err();
    server.await.unwrap();

    assert!(matches!(err, WeatherError::InvalidCredentials));
}

#[tokio::test]
async fn search_with_no_matches_is_empty() {
    let (base, server) = serve_once("200 OK", "[]").await;

    let cities = client(&base).search_city("Qwxyzzy").await.unwrap();
    server.await.unwrap();

    assert!(cities.is_empty());
}

#[tokio::test]
async fn reverse_geocoding_names_a_coordinate() {
    let body = r#"[{"name":"Fatih","lat":41.0186,"lon":28.9397,"country":"TR"}]"#;
    let (base, server) = serve_once("200 OK", body).await;

    let name = client(&base).place_name(ISTANBUL).await;
    let target = server.await.unwrap();

    assert!(target.starts_with("/geo/1.0/reverse?"));
    assert_eq!(name.as_deref(), Some("Fatih"));
}

#[tokio::test]
async fn reverse_geocoding_failure_is_absent_name() {
    let (base, server) = serve_once("401 Unauthorized", "").await;

    let name = client(&base).place_name(ISTANBUL).await;
    server.await.unwrap();

    assert_eq!(name, None);
}
