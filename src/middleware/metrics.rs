use std::collections::VecDeque;
use std::fmt::{self, Write as _};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use dashmap::DashMap;

use super::{Handler, Middleware};
use crate::context::Context;

/// Route pattern label used when no route matched
pub const UNKNOWN_ROUTE: &str = "unknown";

/// Quantiles reported for every key by [`MetricsMiddleware::render_prometheus`]
pub const QUANTILES: [f64; 5] = [0.5, 0.75, 0.9, 0.99, 0.999];

/// Latency observations kept per key for quantile estimation
pub const MAX_LATENCY_SAMPLES: usize = 1024;

const METRIC_NAME: &str = "segroute_request_duration_milliseconds";

/// Key for per-route statistics: (route pattern, method, status)
pub type RouteKey = (String, String, u16);

/// Counters for one [`RouteKey`]
///
/// Count and total latency cover every observation. Quantiles are computed
/// over the most recent [`MAX_LATENCY_SAMPLES`] observations only.
#[derive(Debug, Default)]
pub struct RouteStats {
    count: AtomicUsize,
    total_latency_ns: AtomicU64,
    recent_ns: Mutex<VecDeque<u64>>,
}

impl RouteStats {
    /// Requests observed for this key
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    /// Mean latency across all observations, zero when none were recorded
    pub fn average_latency(&self) -> Duration {
        let count = self.count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    /// Latency at quantile `q` (0.0 to 1.0) over the recent window, using the
    /// nearest-rank method. `None` before the first observation.
    pub fn latency_quantile(&self, q: f64) -> Option<Duration> {
        let mut sorted: Vec<u64> = self.recent().iter().copied().collect();
        sorted.sort_unstable();
        nearest_rank(&sorted, q).map(Duration::from_nanos)
    }

    fn record(&self, nanos: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ns.fetch_add(nanos, Ordering::Relaxed);
        let mut recent = self.recent();
        if recent.len() == MAX_LATENCY_SAMPLES {
            recent.pop_front();
        }
        recent.push_back(nanos);
    }

    fn recent(&self) -> std::sync::MutexGuard<'_, VecDeque<u64>> {
        self.recent_ns.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn nearest_rank(sorted: &[u64], q: f64) -> Option<u64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (q * sorted.len() as f64).ceil() as usize;
    sorted.get(rank.clamp(1, sorted.len()) - 1).copied()
}

fn millis(nanos: u64) -> f64 {
    nanos as f64 / 1_000_000.0
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// Middleware collecting request counts and latency
///
/// Totals are kept in atomics and per-route statistics in a `DashMap`, so one
/// instance can be shared by every request thread without extra locking.
/// Keep an `Arc` to the instance to read the numbers back.
#[derive(Debug, Default)]
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    total_latency_ns: AtomicU64,
    routes: DashMap<RouteKey, RouteStats>,
}

impl MetricsMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the total number of requests processed
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Calculate the average request latency over all routes
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    /// Number of requests observed for one route pattern, method and status
    pub fn route_count(&self, route: &str, method: &str, status: u16) -> usize {
        self.routes
            .get(&(route.to_string(), method.to_string(), status))
            .map(|s| s.count())
            .unwrap_or(0)
    }

    /// Snapshot of `(key, count, average latency)` for every observed key
    pub fn snapshot(&self) -> Vec<(RouteKey, usize, Duration)> {
        let mut out: Vec<_> = self
            .routes
            .iter()
            .map(|entry| (entry.key().clone(), entry.count(), entry.average_latency()))
            .collect();
        out.sort_by(|a, b| a.0.cmp(&b.0));
        out
    }

    /// Latency quantile for one key, see [`RouteStats::latency_quantile`]
    pub fn route_latency_quantile(
        &self,
        route: &str,
        method: &str,
        status: u16,
        q: f64,
    ) -> Option<Duration> {
        self.routes
            .get(&(route.to_string(), method.to_string(), status))
            .and_then(|s| s.latency_quantile(q))
    }

    /// Render all keys in the Prometheus text exposition format
    ///
    /// Each key becomes one summary series labelled `pattern`, `method` and
    /// `status`, with latency in milliseconds at every entry of [`QUANTILES`]
    /// followed by `_sum` and `_count`. Keys are sorted.
    pub fn render_prometheus(&self) -> String {
        let mut out = String::new();
        if self.write_prometheus(&mut out).is_err() {
            out.clear();
        }
        out
    }

    fn write_prometheus(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "# HELP segroute_requests_total Total number of handled requests")?;
        writeln!(out, "# TYPE segroute_requests_total counter")?;
        writeln!(out, "segroute_requests_total {}", self.request_count())?;
        writeln!(out, "# HELP {METRIC_NAME} Request latency in milliseconds")?;
        writeln!(out, "# TYPE {METRIC_NAME} summary")?;

        let mut keys: Vec<RouteKey> = self.routes.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        for key in keys {
            let Some(stats) = self.routes.get(&key) else {
                continue;
            };
            let (pattern, method, status) = &key;
            let labels = format!(
                "pattern=\"{}\",method=\"{}\",status=\"{}\"",
                escape_label(pattern),
                escape_label(method),
                status
            );
            let mut sorted: Vec<u64> = stats.recent().iter().copied().collect();
            sorted.sort_unstable();
            for q in QUANTILES {
                let value = nearest_rank(&sorted, q).map(millis).unwrap_or(f64::NAN);
                writeln!(out, "{METRIC_NAME}{{{labels},quantile=\"{q}\"}} {value}")?;
            }
            let sum = millis(stats.total_latency_ns.load(Ordering::Relaxed));
            writeln!(out, "{METRIC_NAME}_sum{{{labels}}} {sum}")?;
            writeln!(out, "{METRIC_NAME}_count{{{labels}}} {}", stats.count())?;
        }
        Ok(())
    }

    fn observe(&self, ctx: &Context, latency: Duration) {
        let route = if ctx.matched_route.is_empty() {
            UNKNOWN_ROUTE
        } else {
            ctx.matched_route.as_str()
        };
        self.observe_key(route, ctx.req.method().as_str(), ctx.resp_status, latency);
    }

    fn observe_key(&self, route: &str, method: &str, status: u16, latency: Duration) {
        let nanos = latency.as_nanos() as u64;
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ns.fetch_add(nanos, Ordering::Relaxed);
        self.routes
            .entry((route.to_string(), method.to_string(), status))
            .or_default()
            .record(nanos);
    }

    /// Middleware timing the rest of the chain. Every clone of the returned
    /// value records into this instance.
    pub fn build(self: &Arc<Self>) -> Middleware {
        let this = Arc::clone(self);
        Arc::new(move |next: Handler| {
            let this = Arc::clone(&this);
            Arc::new(move |ctx: &mut Context| {
                let start = Instant::now();
                next(ctx);
                this.observe(ctx, start.elapsed());
            }) as Handler
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{chain, handler_fn};

    #[test]
    fn test_counts_per_route_and_status() {
        let metrics = Arc::new(MetricsMiddleware::new());
        let handler = chain(
            &[metrics.build()],
            handler_fn(|ctx| {
                std::thread::sleep(Duration::from_millis(1));
                ctx.resp_status = 200;
            }),
        );

        for _ in 0..2 {
            let mut ctx = Context::default();
            ctx.matched_route = "/user/:id".to_string();
            handler(&mut ctx);
        }
        let mut ctx = Context::default();
        handler(&mut ctx);

        assert_eq!(metrics.request_count(), 3);
        assert_eq!(metrics.route_count("/user/:id", "GET", 200), 2);
        assert_eq!(metrics.route_count(UNKNOWN_ROUTE, "GET", 200), 1);
        assert!(metrics.average_latency() >= Duration::from_millis(1));
        assert_eq!(metrics.snapshot().len(), 2);
    }

    #[test]
    fn test_zero_latency_without_requests() {
        let metrics = MetricsMiddleware::new();
        assert_eq!(metrics.average_latency(), Duration::from_nanos(0));
        assert_eq!(metrics.route_count("/", "GET", 200), 0);
    }

    #[test]
    fn test_latency_quantiles_nearest_rank() {
        let metrics = MetricsMiddleware::new();
        for ms in 1..=100 {
            metrics.observe_key("/user/:id", "GET", 200, Duration::from_millis(ms));
        }
        let q = |q| metrics.route_latency_quantile("/user/:id", "GET", 200, q);
        assert_eq!(q(0.5), Some(Duration::from_millis(50)));
        assert_eq!(q(0.9), Some(Duration::from_millis(90)));
        assert_eq!(q(0.999), Some(Duration::from_millis(100)));
        assert_eq!(q(0.0), Some(Duration::from_millis(1)));
        assert_eq!(metrics.route_latency_quantile("/other", "GET", 200, 0.5), None);
    }

    #[test]
    fn test_latency_window_is_bounded() {
        let metrics = MetricsMiddleware::new();
        for _ in 0..MAX_LATENCY_SAMPLES {
            metrics.observe_key("/slow", "GET", 200, Duration::from_millis(500));
        }
        for _ in 0..MAX_LATENCY_SAMPLES {
            metrics.observe_key("/slow", "GET", 200, Duration::from_millis(1));
        }
        assert_eq!(metrics.route_count("/slow", "GET", 200), 2 * MAX_LATENCY_SAMPLES);
        assert_eq!(
            metrics.route_latency_quantile("/slow", "GET", 200, 0.999),
            Some(Duration::from_millis(1))
        );
    }

    #[test]
    fn test_render_prometheus_text_format() {
        let metrics = MetricsMiddleware::new();
        for ms in 1..=4 {
            metrics.observe_key("/user/:id", "GET", 200, Duration::from_millis(ms));
        }
        metrics.observe_key(UNKNOWN_ROUTE, "POST", 404, Duration::from_millis(2));
        metrics.observe_key(r"/v/:n(\d+)", "GET", 200, Duration::from_millis(1));

        let text = metrics.render_prometheus();
        assert!(text.contains("# TYPE segroute_requests_total counter\nsegroute_requests_total 6\n"));
        assert!(text.contains("# TYPE segroute_request_duration_milliseconds summary\n"));
        let labels = r#"pattern="/user/:id",method="GET",status="200""#;
        for (q, value) in [("0.5", "2"), ("0.75", "3"), ("0.9", "4"), ("0.99", "4"), ("0.999", "4")] {
            let line = format!(
                "segroute_request_duration_milliseconds{{{labels},quantile=\"{q}\"}} {value}\n"
            );
            assert!(text.contains(&line), "missing {line} in\n{text}");
        }
        assert!(text.contains(&format!("segroute_request_duration_milliseconds_sum{{{labels}}} 10\n")));
        assert!(text.contains(&format!("segroute_request_duration_milliseconds_count{{{labels}}} 4\n")));
        assert!(text.contains(
            r#"segroute_request_duration_milliseconds_count{pattern="unknown",method="POST",status="404"} 1"#
        ));
        assert!(text.contains(r#"pattern="/v/:n(\\d+)""#));

        let user = text.find(labels).unwrap();
        let unknown = text.find(r#"pattern="unknown""#).unwrap();
        assert!(user < unknown);
    }
}
