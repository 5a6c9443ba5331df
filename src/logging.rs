use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{error, info, warn};
use rocket::{
    fairing::{Fairing, Info, Kind},
    http::StatusClass,
    request::{FromRequest, Outcome},
    Data, Orbit, Request, Response, Rocket,
};

/// Header a kiosk sends to identify itself.
pub const KIOSK_ID_HEADER: &str = "X-Kiosk-Id";

/// A unique identifier for a particular request.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct RequestId(pub usize);

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl RequestId {
    /// Atomically get the next ID. This wraps around back to zero if you somehow exceed a usize.
    pub fn next() -> RequestId {
        static REQUEST_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);
        RequestId(REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Allow the ID to be accessed via request guard.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for &'r RequestId {
    type Error = (); // No errors possible, use the `!` type once stabilised.

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(req.local_cache(RequestId::next))
    }
}

/// Prefix naming the kiosk a request came from, or nothing if it did not say.
fn kiosk_tag(req: &Request<'_>) -> String {
    req.headers()
        .get_one(KIOSK_ID_HEADER)
        .map(|kiosk| format!(" [kiosk {kiosk}]"))
        .unwrap_or_default()
}

/// A rocket fairing that does global logging, e.g. logging every request and response.
#[derive(Debug, Copy, Clone)]
pub struct LoggerFairing;

#[rocket::async_trait]
impl Fairing for LoggerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Logger",
            kind: Kind::Liftoff | Kind::Request | Kind::Response | Kind::Shutdown,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let protocol = if rocket.config().tls_enabled() {
            "https"
        } else {
            "http"
        };
        let ip = &rocket.config().address;
        let port = &rocket.config().port;
        info!("Kiosk server launched on {protocol}://{ip}:{port}");
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        // Assign an ID.
        let id = req.local_cache(RequestId::next);
        let method = req.method();
        let uri = req.uri();
        let kiosk = kiosk_tag(req);
        // Log the incoming request.
        info!("->req{id}{kiosk} {method} {uri}");
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        // Get the ID.
        let id = req.local_cache(RequestId::next);
        let code = res.status();
        let kiosk = kiosk_tag(req);
        // Get the matched route.
        let route = match req.route() {
            Some(r) => {
                let mut str = r.uri.to_string();
                if let Some(ref name) = r.name {
                    str = format!("{name} ({str})");
                }
                str
            }
            None => "UNKNOWN ROUTE".to_string(),
        };
        // Log the outgoing response.
        let log_msg = format!("<-rsp{id}{kiosk} {code} {route}");
        match code.class() {
            StatusClass::ServerError => error!("{log_msg}"),
            StatusClass::ClientError => warn!("{log_msg}"),
            _ => info!("{log_msg}"),
        }
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        warn!("Shutdown requested, stopping gracefully...");
    }
}

#[cfg(test)]
mod tests {
    use rocket::{http::Header, local::asynchronous::Client};

    use super::*;

    #[get("/request-id")]
    fn request_id(id: &RequestId) -> String {
        id.to_string()
    }

    #[test]
    fn request_ids_increase() {
        let first = RequestId::next();
        let second = RequestId::next();
        assert!(second > first);
    }

    #[rocket::async_test]
    async fn kiosk_tag_from_header() {
        let client = Client::untracked(rocket::build()).await.unwrap();

        let request = client
            .get("/parties")
            .header(Header::new(KIOSK_ID_HEADER, "hall-3"));
        assert_eq!(kiosk_tag(&request), " [kiosk hall-3]");
        assert_eq!(kiosk_tag(&client.get("/parties")), "");
    }

    #[rocket::async_test]
    async fn request_ids_differ_between_requests() {
        let rocket = rocket::build()
            .mount("/", routes![request_id])
            .attach(LoggerFairing);
        let client = Client::tracked(rocket).await.unwrap();

        let first: usize = client
            .get("/request-id")
            .dispatch()
            .await
            .into_string()
            .await
            .unwrap()
            .parse()
            .unwrap();
        let second: usize = client
            .get("/request-id")
            .dispatch()
            .await
            .into_string()
            .await
            .unwrap()
            .parse()
            .unwrap();
        assert!(second > first);
    }
}
