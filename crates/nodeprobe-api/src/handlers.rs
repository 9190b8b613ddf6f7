//! Probe handler.
//!
//! Each request evaluates the bound strategy in its own task, so a panic
//! inside a strategy surfaces as a `500` instead of tearing down the
//! connection.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{debug, error, info};

use nodeprobe_core::Verdict;

use crate::ProbeState;

/// GET /healthz, /healthz_block, /readiness
pub async fn probe(State(state): State<ProbeState>) -> Response {
    let name = state.prober.name();
    let prober = state.prober.clone();
    let targets = state.targets.clone();
    let policy = state.policy.clone();

    let task = tokio::spawn(async move { prober.evaluate(&targets, &policy).await });

    match task.await {
        Ok(Ok(verdict)) => {
            if verdict.healthy {
                debug!(probe = name, reason = %verdict.reason, "probe healthy");
            } else {
                info!(probe = name, reason = %verdict.reason, "probe unhealthy");
            }
            render(verdict)
        }
        Ok(Err(e)) => {
            error!(probe = name, error = %e, "probe failed");
            internal_error(&e.to_string())
        }
        Err(e) => {
            error!(probe = name, error = %e, "probe task aborted");
            internal_error("probe task aborted")
        }
    }
}

fn render(verdict: Verdict) -> Response {
    let status =
        StatusCode::from_u16(verdict.http_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, verdict.reason).into_response()
}

fn internal_error(msg: &str) -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, msg.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    use nodeprobe_core::{ProbeError, ProbePolicy, ProbeResult, ProbeTargets};
    use nodeprobe_health::Prober;

    use crate::{ProbeSet, router_with};

    enum Fixed {
        Verdict(Verdict),
        Error(ProbeError),
        Panic,
    }

    #[async_trait]
    impl Prober for Fixed {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn evaluate(&self, _: &ProbeTargets, _: &ProbePolicy) -> ProbeResult<Verdict> {
            match self {
                Fixed::Verdict(v) => Ok(v.clone()),
                Fixed::Error(e) => Err(e.clone()),
                Fixed::Panic => panic!("strategy bug"),
            }
        }
    }

    fn state(prober: Fixed) -> ProbeState {
        ProbeState {
            prober: Arc::new(prober),
            targets: Arc::new(ProbeTargets::new(vec![], vec![])),
            policy: Arc::new(ProbePolicy::default()),
        }
    }

    async fn body_text(resp: Response) -> String {
        let bytes = to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn healthy_is_200() {
        let resp = probe(State(state(Fixed::Verdict(Verdict::healthy("all good"))))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "all good");
    }

    #[tokio::test]
    async fn unhealthy_is_503() {
        let resp = probe(State(state(Fixed::Verdict(Verdict::unhealthy("stalled"))))).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_text(resp).await, "stalled");
    }

    #[tokio::test]
    async fn strategy_error_is_500() {
        let fault = ProbeError::Internal("lock poisoned".into());
        let resp = probe(State(state(Fixed::Error(fault)))).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(resp).await.contains("lock poisoned"));
    }

    #[tokio::test]
    async fn strategy_panic_is_500() {
        let resp = probe(State(state(Fixed::Panic))).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn routes_bind_their_strategy() {
        let router = router_with(
            ProbeSet {
                liveness: Arc::new(Fixed::Verdict(Verdict::healthy("live"))),
                liveness_block: Arc::new(Fixed::Verdict(Verdict::unhealthy("block stale"))),
                readiness: Arc::new(Fixed::Verdict(Verdict::healthy("ready"))),
            },
            ProbeTargets::new(vec![], vec![]),
            ProbePolicy::default(),
        );

        for (uri, status, body) in [
            ("/healthz", StatusCode::OK, "live"),
            ("/healthz_block", StatusCode::SERVICE_UNAVAILABLE, "block stale"),
            ("/readiness", StatusCode::OK, "ready"),
        ] {
            let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let resp = router.clone().oneshot(req).await.unwrap();
            assert_eq!(resp.status(), status, "{uri}");
            assert_eq!(body_text(resp).await, body);
        }

        let req = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let resp = router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
