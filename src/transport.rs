//! TCP, UDP, and HTTP fronts onto the [`forwarder`] and [`vessel`] store.
//!
//! Each server here is a thin adapter: it turns an accepted connection (TCP),
//! an addressed datagram stream (UDP), or an HTTP request (the API surface)
//! into a [`forwarder::Subscription`] or a direct vessel-store query. None
//! of them know anything about sentence framing or assembly.

use std::net::{Ipv6Addr, SocketAddr};
use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context as TaskContext, Poll};
use std::time::{Duration, Instant};

use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Frame, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::mpsc;

use crate::forwarder;
use crate::spatial::Point;
use crate::vessel::{self, VesselStore};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to bind listener: {0}")]
    Bind(#[source] std::io::Error),
    #[error("listener I/O error: {0}")]
    Io(#[source] std::io::Error),
    #[error(transparent)]
    Forwarder(#[from] forwarder::Error),
}

/// Subscriptions time out (and are evicted) after this much silence.
pub const UDP_TIMEOUT: Duration = Duration::from_secs(5);
const UDP_EVICTION_TICK: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------
// TCP
// ---------------------------------------------------------------------

/// Accept loop: every connection becomes a forwarder subscriber whose sink
/// is the socket itself.
pub async fn tcp_server(addr: SocketAddr, handle: forwarder::Handle) -> Result<(), Error> {
    let listener = TcpListener::bind(addr).await.map_err(Error::Bind)?;
    log::info!("tcp forwarding listening on {addr}");
    loop {
        let (socket, peer) = listener.accept().await.map_err(Error::Io)?;
        log::debug!("tcp subscriber connected from {peer}");
        let subscription = handle.subscribe().await?;
        tokio::spawn(forwarder::run_subscriber_task(subscription, socket));
    }
}

// ---------------------------------------------------------------------
// UDP
// ---------------------------------------------------------------------

const STATUS_RUNNING: u8 = 0;
const STATUS_STOP_REQUESTED: u8 = 1;
const STATUS_STOPPED: u8 = 2;

struct UdpEntry {
    last_seen: Instant,
    status: Arc<AtomicU8>,
}

/// Accepts only private, loopback, or link-local source addresses - an
/// integral invariant of the UDP server, not an optional layer, so that an
/// open relay can't be used to amplify traffic toward an arbitrary victim.
fn is_allowed_source(ip: std::net::IpAddr) -> bool {
    match ip {
        std::net::IpAddr::V4(v4) => v4.is_loopback() || v4.is_private() || v4.is_link_local(),
        std::net::IpAddr::V6(v6) => v6.is_loopback() || is_unique_local_v6(v6) || is_unicast_link_local_v6(v6),
    }
}

fn is_unique_local_v6(addr: Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xfe00) == 0xfc00
}

fn is_unicast_link_local_v6(addr: Ipv6Addr) -> bool {
    (addr.segments()[0] & 0xffc0) == 0xfe80
}

async fn run_udp_subscriber_task(
    socket: Arc<UdpSocket>,
    addr: SocketAddr,
    mut subscription: forwarder::Subscription,
    status: Arc<AtomicU8>,
) {
    while let Some(packet) = subscription.queue.recv().await {
        if status.load(Ordering::Acquire) != STATUS_RUNNING {
            status.store(STATUS_STOPPED, Ordering::Release);
            let _ = subscription.closer.try_send(subscription.token);
            return;
        }
        if socket.send_to(&packet, addr).await.is_err() {
            let _ = subscription.closer.try_send(subscription.token);
            return;
        }
    }
}

/// Single listening socket; each new source address becomes a subscriber,
/// a ticker evicts subscribers silent for longer than [`UDP_TIMEOUT`].
pub async fn udp_server(addr: SocketAddr, handle: forwarder::Handle) -> Result<(), Error> {
    let socket = Arc::new(UdpSocket::bind(addr).await.map_err(Error::Bind)?);
    log::info!("udp forwarding listening on {addr}");
    let subscribers: Mutex<std::collections::HashMap<SocketAddr, UdpEntry>> = Mutex::new(std::collections::HashMap::new());
    let mut buf = [0u8; 4096];
    let mut ticker = tokio::time::interval(UDP_EVICTION_TICK);

    loop {
        tokio::select! {
            received = socket.recv_from(&mut buf) => {
                let (_, src) = received.map_err(Error::Io)?;
                if !is_allowed_source(src.ip()) {
                    log::trace!("rejecting udp datagram from disallowed source {src}");
                    continue;
                }
                let is_new = {
                    let mut map = subscribers.lock().expect("udp subscriber map poisoned");
                    if let Some(entry) = map.get_mut(&src) {
                        entry.last_seen = Instant::now();
                        false
                    } else {
                        true
                    }
                };
                if is_new {
                    let subscription = handle.subscribe().await?;
                    let status = Arc::new(AtomicU8::new(STATUS_RUNNING));
                    {
                        let mut map = subscribers.lock().expect("udp subscriber map poisoned");
                        map.insert(src, UdpEntry { last_seen: Instant::now(), status: Arc::clone(&status) });
                    }
                    tokio::spawn(run_udp_subscriber_task(Arc::clone(&socket), src, subscription, status));
                }
            }
            _ = ticker.tick() => {
                let mut map = subscribers.lock().expect("udp subscriber map poisoned");
                let now = Instant::now();
                map.retain(|_, entry| {
                    if now.duration_since(entry.last_seen) > UDP_TIMEOUT {
                        entry.status.store(STATUS_STOP_REQUESTED, Ordering::Release);
                        false
                    } else {
                        true
                    }
                });
            }
        }
    }
}

// ---------------------------------------------------------------------
// HTTP
// ---------------------------------------------------------------------

type ResponseBody = BoxBody<Bytes, std::io::Error>;

struct AppState {
    forwarder: forwarder::Handle,
    vessels: Arc<VesselStore>,
}

/// Streams a subscriber's queue as the HTTP response body; each frame is
/// one forwarded packet, flushed as its own chunk. Dropping the body (the
/// client disconnected, or the connection task was cancelled) reports the
/// subscription's token back to the forwarder exactly like a write error
/// would for a TCP/UDP subscriber.
struct RawStreamBody(forwarder::Subscription);

impl hyper::body::Body for RawStreamBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Result<Frame<Bytes>, Self::Error>>> {
        let this = self.get_mut();
        match this.0.queue.poll_recv(cx) {
            Poll::Ready(Some(packet)) => Poll::Ready(Some(Ok(Frame::data(packet)))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for RawStreamBody {
    fn drop(&mut self) {
        let _ = self.0.closer.try_send(self.0.token);
    }
}

fn full_body(bytes: Vec<u8>) -> ResponseBody {
    Full::new(Bytes::from(bytes))
        .map_err(|never: std::convert::Infallible| match never {})
        .boxed()
}

fn plain_response(status: StatusCode, message: &'static str) -> Response<ResponseBody> {
    Response::builder()
        .status(status)
        .body(full_body(message.as_bytes().to_vec()))
        .expect("static response is always well-formed")
}

fn json_response(status: StatusCode, value: &serde_json::Value) -> Response<ResponseBody> {
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    Response::builder()
        .status(status)
        .header(hyper::header::CONTENT_TYPE, "application/geo+json")
        .body(full_body(bytes))
        .expect("json response is always well-formed")
}

fn query_param<'a>(query: &'a str, key: &str) -> Option<&'a str> {
    query.split('&').find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        (name == key).then_some(value)
    })
}

/// Parses `<sw_lon>,<sw_lat>,<ne_lon>,<ne_lat>`, validating latitude range
/// and ordering. Longitude normalization and antimeridian handling happen
/// downstream in [`VesselStore::find_within`].
fn parse_bbox(raw: &str) -> Option<(Point, Point)> {
    let mut fields = raw.split(',');
    let sw_lon: f64 = fields.next()?.parse().ok()?;
    let sw_lat: f64 = fields.next()?.parse().ok()?;
    let ne_lon: f64 = fields.next()?.parse().ok()?;
    let ne_lat: f64 = fields.next()?.parse().ok()?;
    if fields.next().is_some() {
        return None;
    }
    if !sw_lon.is_finite() || !ne_lon.is_finite() {
        return None;
    }
    if !(-90.0..=90.0).contains(&sw_lat) || !(-90.0..=90.0).contains(&ne_lat) || sw_lat > ne_lat {
        return None;
    }
    Some((Point::new(sw_lat, sw_lon), Point::new(ne_lat, ne_lon)))
}

async fn raw_stream_response(state: &AppState) -> Response<ResponseBody> {
    match state.forwarder.subscribe().await {
        Ok(subscription) => Response::builder()
            .status(StatusCode::OK)
            .header(hyper::header::CONTENT_TYPE, "application/octet-stream")
            .body(RawStreamBody(subscription).boxed())
            .expect("streaming response is always well-formed"),
        Err(_) => plain_response(StatusCode::INTERNAL_SERVER_ERROR, "forwarder unavailable"),
    }
}

fn in_area_response(state: &AppState, path_coords: Option<&str>, query: Option<&str>) -> Response<ResponseBody> {
    let raw = path_coords
        .map(str::to_string)
        .or_else(|| query.and_then(|q| query_param(q, "bbox")).map(str::to_string));
    let Some(raw) = raw else {
        return plain_response(StatusCode::BAD_REQUEST, "missing bounding box");
    };
    match parse_bbox(&raw) {
        Some((sw, ne)) => json_response(StatusCode::OK, &state.vessels.find_within(sw, ne)),
        None => plain_response(StatusCode::BAD_REQUEST, "invalid bounding box"),
    }
}

fn with_mmsi_response(state: &AppState, digits: &str) -> Response<ResponseBody> {
    let Ok(mmsi) = digits.parse::<u32>() else {
        return plain_response(StatusCode::BAD_REQUEST, "invalid mmsi");
    };
    match state.vessels.select(mmsi) {
        Ok(geojson) => json_response(StatusCode::OK, &geojson),
        Err(vessel::Error::NotFound(_)) => plain_response(StatusCode::NOT_FOUND, "unknown mmsi"),
    }
}

async fn route(req: Request<Incoming>, state: Arc<AppState>) -> Result<Response<ResponseBody>, std::convert::Infallible> {
    let path = req.uri().path().to_string();
    if path.split('/').any(|segment| segment == "..") {
        return Ok(plain_response(StatusCode::FORBIDDEN, "forbidden"));
    }

    let wrong_method = req.method() != Method::GET;

    let response = if path == "/api/v1/raw" {
        if wrong_method {
            plain_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
        } else {
            raw_stream_response(&state).await
        }
    } else if let Some(rest) = path.strip_prefix("/api/v1/in_area/") {
        if wrong_method {
            plain_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
        } else {
            in_area_response(&state, Some(rest), req.uri().query())
        }
    } else if path == "/api/v1/in_area" {
        if wrong_method {
            plain_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
        } else {
            in_area_response(&state, None, req.uri().query())
        }
    } else if let Some(rest) = path.strip_prefix("/api/v1/with_mmsi/") {
        if wrong_method {
            plain_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
        } else {
            with_mmsi_response(&state, rest)
        }
    } else {
        plain_response(StatusCode::NOT_FOUND, "not found")
    };
    Ok(response)
}

/// Accept loop for the HTTP API surface (`/api/v1/raw`, `/api/v1/in_area/…`,
/// `/api/v1/with_mmsi/…`); one `hyper` connection task per accepted socket.
pub async fn http_server(addr: SocketAddr, handle: forwarder::Handle, vessels: Arc<VesselStore>) -> Result<(), Error> {
    let listener = TcpListener::bind(addr).await.map_err(Error::Bind)?;
    log::info!("http api listening on {addr}");
    let state = Arc::new(AppState { forwarder: handle, vessels });
    loop {
        let (stream, peer) = listener.accept().await.map_err(Error::Io)?;
        let io = TokioIo::new(stream);
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            let service = service_fn(move |req| route(req, Arc::clone(&state)));
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                log::debug!("http connection from {peer} ended: {err}");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes as TestBytes;
    use std::net::{IpAddr, Ipv4Addr};
    use tokio::io::AsyncReadExt;

    #[test]
    fn loopback_and_private_sources_are_allowed() {
        assert!(is_allowed_source(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))));
        assert!(is_allowed_source(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 4))));
        assert!(is_allowed_source(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1))));
        assert!(is_allowed_source(IpAddr::V4(Ipv4Addr::new(169, 254, 1, 1))));
    }

    #[test]
    fn public_sources_are_rejected() {
        assert!(!is_allowed_source(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8))));
    }

    #[test]
    fn bbox_parses_valid_coordinates() {
        let (sw, ne) = parse_bbox("-10,-10,10,10").unwrap();
        assert_eq!(sw, Point::new(-10.0, -10.0));
        assert_eq!(ne, Point::new(10.0, 10.0));
    }

    #[test]
    fn bbox_rejects_inverted_latitude() {
        assert!(parse_bbox("-10,10,10,-10").is_none());
    }

    #[test]
    fn bbox_rejects_out_of_range_latitude() {
        assert!(parse_bbox("-10,-95,10,10").is_none());
    }

    #[test]
    fn bbox_rejects_malformed_input() {
        assert!(parse_bbox("not,a,bbox").is_none());
        assert!(parse_bbox("1,2,3").is_none());
    }

    #[test]
    fn query_param_finds_named_value() {
        assert_eq!(query_param("bbox=1,2,3,4&other=x", "bbox"), Some("1,2,3,4"));
        assert_eq!(query_param("other=x", "bbox"), None);
    }

    #[tokio::test]
    async fn tcp_subscriber_receives_broadcast_packets() {
        let (handle, actor) = forwarder::spawn();
        tokio::spawn(actor);

        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let listener = TcpListener::bind(addr).await.unwrap();
        let bound = listener.local_addr().unwrap();
        let forwarder_handle = handle.clone();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let subscription = forwarder_handle.subscribe().await.unwrap();
            forwarder::run_subscriber_task(subscription, socket).await;
        });

        let mut client = tokio::net::TcpStream::connect(bound).await.unwrap();
        // Give the accept loop a chance to register the subscriber.
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.broadcast(TestBytes::from_static(b"!AIVDM,1,1,,A,x,0*00\r\n")).await.unwrap();

        let mut buf = [0u8; 64];
        let n = client.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"!AIVDM,1,1,,A,x,0*00\r\n");
    }
}
