//! Priority-ordered middleware stage registration.
//!
//! Stages are registered with a plain numeric sort key and applied to an
//! axum [`Router`] in one pass at startup. Lower priority means earlier
//! (outermost) execution; registration order is irrelevant. This replaces
//! per-filter priority plumbing with one explicit, sorted list.

use axum::Router;

/// Conventional priorities for the stages this crate ships.
pub mod priority {
    /// Correlation assigner: earliest, so every later stage observes the id.
    pub const CORRELATION: i32 = -1000;
    /// Request logger: ahead of business middleware, so operational paths
    /// are logged even when a later stage short-circuits.
    pub const REQUEST_LOG: i32 = -100;
}

struct Stage {
    priority: i32,
    name: &'static str,
    apply: Box<dyn FnOnce(Router) -> Router + Send>,
}

/// An ordered list of middleware stages, assembled at startup.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stage. `apply` usually wraps the router in a layer:
    /// `|r| r.layer(...)`.
    #[must_use]
    pub fn register<F>(mut self, priority: i32, name: &'static str, apply: F) -> Self
    where
        F: FnOnce(Router) -> Router + Send + 'static,
    {
        self.stages.push(Stage {
            priority,
            name,
            apply: Box::new(apply),
        });
        self
    }

    /// Apply all stages to `router`, lowest priority outermost.
    #[must_use]
    pub fn apply(self, router: Router) -> Router {
        let mut stages = self.stages;
        stages.sort_by_key(|stage| stage.priority);

        // Axum layers added later wrap everything added before, so the
        // lowest-priority (outermost) stage is applied last.
        let mut router = router;
        for stage in stages.into_iter().rev() {
            tracing::debug!(
                stage = stage.name,
                priority = stage.priority,
                "applying middleware stage"
            );
            router = (stage.apply)(router);
        }
        router
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::extract::Request;
    use axum::middleware::{from_fn, Next};
    use axum::response::Response;
    use axum::routing::get;
    use tower::util::ServiceExt;

    use super::*;

    fn mark(req: &mut Request, tag: &str) {
        let trail = req
            .headers()
            .get("x-trail")
            .and_then(|v| v.to_str().ok())
            .map_or_else(|| tag.to_owned(), |prev| format!("{prev},{tag}"));
        req.headers_mut().insert("x-trail", trail.parse().unwrap());
    }

    async fn mark_a(mut req: Request, next: Next) -> Response {
        mark(&mut req, "a");
        next.run(req).await
    }

    async fn mark_b(mut req: Request, next: Next) -> Response {
        mark(&mut req, "b");
        next.run(req).await
    }

    async fn trail(req: Request) -> String {
        req.headers()
            .get("x-trail")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_owned()
    }

    #[tokio::test]
    async fn stages_run_in_priority_order_not_registration_order() {
        let router = Router::new().route("/", get(trail));
        // Registered out of order on purpose.
        let router = Pipeline::new()
            .register(10, "b", |r| r.layer(from_fn(mark_b)))
            .register(-10, "a", |r| r.layer(from_fn(mark_a)))
            .apply(router);

        let response = router
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"a,b");
    }
}
