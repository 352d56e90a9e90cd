//! Test doubles for the HTTP seam.
//!
//! Together with [`MemoryStore`](crate::store::MemoryStore) and
//! [`ManualClock`](crate::clock::ManualClock) this lets a whole run execute
//! offline against canned upstream bodies.

use crate::error::{SyncError, SyncResult};
use crate::http::{Request, Transport};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Canned upstream answer.
#[derive(Debug, Clone)]
pub enum Reply {
    Json(Value),
    Text(String),
    /// Non-2xx status.
    Status(u16),
}

#[derive(Debug)]
struct Route {
    pattern: String,
    replies: VecDeque<Reply>,
}

/// Answers requests whose URL contains a registered pattern.
///
/// Routes are tried in registration order. Registering the same pattern twice
/// queues a second reply; the last queued reply is repeated once the queue is
/// down to one. An unmatched URL fails as a network error.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(self, pattern: &str, reply: Reply) -> Self {
        {
            let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
            match routes.iter_mut().find(|r| r.pattern == pattern) {
                Some(route) => route.replies.push_back(reply),
                None => routes.push(Route {
                    pattern: pattern.to_string(),
                    replies: VecDeque::from([reply]),
                }),
            }
        }
        self
    }

    /// Append the routes of `other` after this transport's own, so patterns
    /// registered here take precedence.
    pub fn with_fallback(self, other: ScriptedTransport) -> Self {
        {
            let extra = other.routes.into_inner().unwrap_or_else(|e| e.into_inner());
            self.routes
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .extend(extra);
        }
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn count_matching(&self, pattern: &str) -> usize {
        self.requests()
            .iter()
            .filter(|url| url.contains(pattern))
            .count()
    }

    fn reply_for(&self, url: &str) -> SyncResult<Reply> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());

        let mut routes = self.routes.lock().unwrap_or_else(|e| e.into_inner());
        let route = routes
            .iter_mut()
            .find(|r| url.contains(&r.pattern))
            .ok_or_else(|| SyncError::network(url, "no scripted reply"))?;
        let reply = if route.replies.len() > 1 {
            route.replies.pop_front()
        } else {
            route.replies.front().cloned()
        };
        reply.ok_or_else(|| SyncError::network(url, "no scripted reply"))
    }
}

impl Transport for ScriptedTransport {
    fn get_json(&self, request: &Request) -> SyncResult<Value> {
        match self.reply_for(&request.url)? {
            Reply::Json(v) => Ok(v),
            Reply::Text(t) => serde_json::from_str(&t)
                .map_err(|e| SyncError::ResponseFormat(format!("invalid JSON: {e}"))),
            Reply::Status(status) => Err(SyncError::HttpStatus {
                url: request.url.clone(),
                status,
            }),
        }
    }

    fn get_text(&self, request: &Request) -> SyncResult<String> {
        match self.reply_for(&request.url)? {
            Reply::Text(t) => Ok(t),
            Reply::Json(v) => Ok(v.to_string()),
            Reply::Status(status) => Err(SyncError::HttpStatus {
                url: request.url.clone(),
                status,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn req(url: &str) -> Request {
        Request::get(url, Duration::from_secs(1))
    }

    #[test]
    fn queued_replies_are_served_in_order_then_repeat() {
        let t = ScriptedTransport::new()
            .on("/a", Reply::Json(json!(1)))
            .on("/a", Reply::Json(json!(2)));
        assert_eq!(t.get_json(&req("http://x/a")).unwrap(), json!(1));
        assert_eq!(t.get_json(&req("http://x/a")).unwrap(), json!(2));
        assert_eq!(t.get_json(&req("http://x/a")).unwrap(), json!(2));
        assert_eq!(t.count_matching("/a"), 3);
    }

    #[test]
    fn own_routes_win_over_fallback() {
        let t = ScriptedTransport::new()
            .on("/a", Reply::Status(500))
            .with_fallback(
                ScriptedTransport::new()
                    .on("/a", Reply::Json(json!(1)))
                    .on("/b", Reply::Json(json!(2))),
            );
        assert!(t.get_json(&req("http://x/a")).is_err());
        assert_eq!(t.get_json(&req("http://x/b")).unwrap(), json!(2));
    }

    #[test]
    fn unmatched_url_is_network_error() {
        let t = ScriptedTransport::new();
        assert!(matches!(
            t.get_text(&req("http://x/none")).unwrap_err(),
            SyncError::Network { .. }
        ));
    }

    #[test]
    fn status_reply_maps_to_http_error() {
        let t = ScriptedTransport::new().on("/b", Reply::Status(503));
        assert!(matches!(
            t.get_json(&req("http://x/b")).unwrap_err(),
            SyncError::HttpStatus { status: 503, .. }
        ));
    }
}
