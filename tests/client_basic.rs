//! Request/response happy paths and wire format checks.


use bowler::client::USER_AGENT;
use bowler::{Body, Client, ReasonPhrase, Request};
use http::{header, Method, StatusCode, Uri};

use mock::{TestConnector, TestStream};

const RESP_200_EMPTY: &str = "HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n";

#[test]
fn test_request_returns_response() {
    smol::block_on(async {
        let stream = TestStream::new("HTTP/1.1 200 OK\r\nContent-Length: 13\r\n\r\nresponse body");
        let client = Client::with_connector(TestConnector::new(stream));

        let mut req = Request::new(Body::empty());
        *req.uri_mut() = "http://localhost".parse::<Uri>().unwrap();

        let res = client.request(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.body(), b"response body");
    });
}

#[test]
fn test_reason_phrase_is_kept() {
    smol::block_on(async {
        let stream = TestStream::new("HTTP/1.1 404 Not Found Here\r\nContent-Length: 0\r\n\r\n");
        let client = Client::with_connector(TestConnector::new(stream));

        let mut req = Request::new(Body::empty());
        *req.uri_mut() = "http://localhost".parse::<Uri>().unwrap();

        let res = client.request(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            res.extensions().get::<ReasonPhrase>().unwrap().as_str(),
            "Not Found Here",
        );
    });
}

#[test]
fn test_get_wire_format() {
    smol::block_on(async {
        let stream = TestStream::new(RESP_200_EMPTY);
        let client = Client::with_connector(TestConnector::new(stream.clone()));

        let mut req = Request::new(Body::empty());
        *req.uri_mut() = "http://localhost".parse::<Uri>().unwrap();
        req.headers_mut()
            .insert(header::CONNECTION, "close".parse().unwrap());

        client.request(req).await.unwrap();

        // no body: neither content-length nor transfer-encoding
        let expected = format!(
            "GET / HTTP/1.1\r\n\
             host: localhost\r\n\
             user-agent: {}\r\n\
             accept-encoding: {}\r\n\
             connection: close\r\n\
             \r\n",
            USER_AGENT,
            client.accepted_encodings(),
        );
        stream.assert_written(&expected);
    });
}

#[test]
fn test_fixed_body_written_directly_with_content_length() {
    smol::block_on(async {
        let stream = TestStream::new(RESP_200_EMPTY);
        let client = Client::with_connector(TestConnector::new(stream.clone()));

        let req = http::Request::builder()
            .method(Method::POST)
            .uri("http://localhost")
            .body(Body::from("out"))
            .unwrap();

        client.request(req).await.unwrap();

        let expected = format!(
            "POST / HTTP/1.1\r\n\
             host: localhost\r\n\
             user-agent: {}\r\n\
             accept-encoding: {}\r\n\
             content-length: 3\r\n\
             \r\n\
             out",
            USER_AGENT,
            client.accepted_encodings(),
        );
        stream.assert_written(&expected);
    });
}

#[test]
fn test_streamed_body_written_chunked() {
    smol::block_on(async {
        let stream = TestStream::new(RESP_200_EMPTY);
        let client = Client::with_connector(TestConnector::new(stream.clone()));

        let body = Body::from_reader(futures_util::io::Cursor::new(b"out".to_vec()));
        let req = http::Request::builder()
            .method(Method::POST)
            .uri("http://localhost")
            .body(body)
            .unwrap();

        client.request(req).await.unwrap();

        let expected = format!(
            "POST / HTTP/1.1\r\n\
             host: localhost\r\n\
             user-agent: {}\r\n\
             accept-encoding: {}\r\n\
             transfer-encoding: chunked\r\n\
             \r\n\
             3\r\nout\r\n0\r\n\r\n",
            USER_AGENT,
            client.accepted_encodings(),
        );
        stream.assert_written(&expected);
    });
}

#[test]
fn test_proxy_style_request_line_omits_host() {
    smol::block_on(async {
        let stream = TestStream::new(RESP_200_EMPTY);
        let client = Client::with_connector(TestConnector::new(stream.clone())).proxy_style(true);

        let req = http::Request::builder()
            .method(Method::POST)
            .uri("http://localhost/path")
            .body(Body::from("out"))
            .unwrap();

        client.request(req).await.unwrap();

        let expected = format!(
            "POST http://localhost/path HTTP/1.1\r\n\
             user-agent: {}\r\n\
             accept-encoding: {}\r\n\
             content-length: 3\r\n\
             \r\n\
             out",
            USER_AGENT,
            client.accepted_encodings(),
        );
        stream.assert_written(&expected);
    });
}

#[test]
fn test_uri_query_and_existing_host_header_pass_through() {
    smol::block_on(async {
        let stream = TestStream::new(RESP_200_EMPTY);
        let client = Client::with_connector(TestConnector::new(stream.clone()));

        let mut req = Request::new(Body::empty());
        *req.uri_mut() = "http://localhost/foo/bar?one=two".parse::<Uri>().unwrap();
        req.headers_mut()
            .insert(header::HOST, "example.org".parse().unwrap());

        client.request(req).await.unwrap();

        let expected = format!(
            "GET /foo/bar?one=two HTTP/1.1\r\n\
             host: example.org\r\n\
             user-agent: {}\r\n\
             accept-encoding: {}\r\n\
             \r\n",
            USER_AGENT,
            client.accepted_encodings(),
        );
        stream.assert_written(&expected);
    });
}

#[test]
fn test_connection_closed_only_when_header_says_close() {
    smol::block_on(async {
        // response says close
        let stream =
            TestStream::new("HTTP/1.1 200 OK\r\nContent-Length: 4\r\nConnection: close\r\n\r\ntest");
        let client = Client::with_connector(TestConnector::new(stream.clone()));

        let mut req = Request::new(Body::empty());
        *req.uri_mut() = "http://localhost".parse::<Uri>().unwrap();

        let res = client.request(req).await.unwrap();
        assert_eq!(res.body(), b"test");
        assert!(stream.is_closed());

        // nobody says close
        let stream = TestStream::new("HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\ntest");
        let client = Client::with_connector(TestConnector::new(stream.clone()));

        let mut req = Request::new(Body::empty());
        *req.uri_mut() = "http://localhost".parse::<Uri>().unwrap();

        client.request(req).await.unwrap();
        assert!(!stream.is_closed());
    });
}

#[test]
fn test_default_port_derived_from_scheme() {
    smol::block_on(async {
        let stream = TestStream::new(RESP_200_EMPTY);
        let connector = TestConnector::new(stream);
        let client = Client::with_connector(connector.clone());

        let mut req = Request::new(Body::empty());
        *req.uri_mut() = "http://localhost".parse::<Uri>().unwrap();

        client.request(req).await.unwrap();

        let targets = connector.targets();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].host, "localhost");
        assert_eq!(targets[0].port, 80);
    });
}
