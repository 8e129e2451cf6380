// Provider-attempt adapters: mount one provider's embed into a container and report whether it rendered

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::config::{ProviderConfig, TimingConfig};
use crate::dom::{Dom, FrameEvent, IframeSpec, Node, ScriptTag};
use crate::provider::{AttemptError, EmbedProvider, LoadAttemptResult};

pub const CALENDLY_FRAME_ID: &str = "booking-iframe";
const CALENDLY_FRAME_TITLE: &str = "Schedule a meeting with AIT LABS";
const CALENDLY_FRAME_ALLOW: &str = "camera; microphone; autoplay; fullscreen; picture-in-picture";
const CALENDLY_FRAME_HEIGHT_PX: u32 = 700;
const CAL_MOUNT_HEIGHT_PX: u32 = 600;

// Seam between the orchestrator and whatever actually mounts embeds
#[async_trait]
pub trait AttemptProvider: Send + Sync + 'static {
    // Resolves with `success = false` when the embed does not render in time.
    // Errs only when the container is missing.
    async fn attempt_provider<'a>(
        &self,
        provider: EmbedProvider,
        container_id: &'a str,
    ) -> Result<LoadAttemptResult<'a>, AttemptError>;
}

pub struct CalendarIntegrationService<D: Dom> {
    dom: Arc<D>,
    providers: ProviderConfig,
    timing: TimingConfig,
}

impl<D: Dom> CalendarIntegrationService<D> {
    pub fn new(dom: Arc<D>, providers: ProviderConfig, timing: TimingConfig) -> Self {
        Self {
            dom,
            providers,
            timing,
        }
    }

    // Cal.com: script embed. Success means the loader rendered children into our mount node.
    async fn load_script_embed<'a>(
        &self,
        container_id: &'a str,
    ) -> Result<LoadAttemptResult<'a>, AttemptError> {
        let provider = EmbedProvider::CalCom;
        let mount_id = self.providers.cal_mount_id();

        self.dom
            .replace_content(
                container_id,
                Node::MountPoint {
                    id: mount_id.clone(),
                    height_px: CAL_MOUNT_HEIGHT_PX,
                },
            )
            .map_err(|_| AttemptError::ContainerNotFound(container_id.to_string()))?;
        self.dom
            .append_head_script(ScriptTag::Inline(self.cal_loader_script(&mount_id)));
        debug!(%provider, container = container_id, mount = %mount_id, "cal.com loader injected");

        let Some(mut children) = self.dom.watch_children(&mount_id) else {
            return Ok(LoadAttemptResult::failed(
                provider,
                container_id,
                AttemptError::ProviderLoadFailed {
                    provider,
                    reason: format!("mount node {mount_id} missing after insert"),
                },
            ));
        };

        let budget = self.timing.script_render_timeout();
        let rendered = timeout(budget, children.wait_for(|count| *count > 0))
            .await
            .map(|waited| waited.is_ok());

        Ok(match rendered {
            Ok(true) => LoadAttemptResult::loaded(provider, container_id),
            Ok(false) => LoadAttemptResult::failed(
                provider,
                container_id,
                AttemptError::ProviderLoadFailed {
                    provider,
                    reason: "mount node removed before rendering".to_string(),
                },
            ),
            Err(_) => LoadAttemptResult::failed(
                provider,
                container_id,
                AttemptError::ProviderLoadTimedOut {
                    provider,
                    after_ms: self.timing.script_render_timeout_ms,
                },
            ),
        })
    }

    // Calendly: iframe. Success needs an observed load event; attaching the frame is not enough.
    async fn load_iframe<'a>(
        &self,
        container_id: &'a str,
    ) -> Result<LoadAttemptResult<'a>, AttemptError> {
        let provider = EmbedProvider::Calendly;
        let frame = IframeSpec {
            id: CALENDLY_FRAME_ID.to_string(),
            src: self.providers.calendly_url.clone(),
            title: CALENDLY_FRAME_TITLE.to_string(),
            height_px: CALENDLY_FRAME_HEIGHT_PX,
            allow: CALENDLY_FRAME_ALLOW.to_string(),
        };

        self.dom
            .replace_content(container_id, Node::Iframe(frame))
            .map_err(|_| AttemptError::ContainerNotFound(container_id.to_string()))?;
        debug!(%provider, container = container_id, src = %self.providers.calendly_url, "iframe attached");

        let Some(events) = self.dom.frame_events(CALENDLY_FRAME_ID) else {
            return Ok(LoadAttemptResult::failed(
                provider,
                container_id,
                AttemptError::ProviderLoadFailed {
                    provider,
                    reason: "iframe events unavailable".to_string(),
                },
            ));
        };

        let failed = |reason: &str| {
            LoadAttemptResult::failed(
                provider,
                container_id,
                AttemptError::ProviderLoadFailed {
                    provider,
                    reason: reason.to_string(),
                },
            )
        };

        Ok(match timeout(self.timing.iframe_timeout(), events).await {
            Ok(Ok(FrameEvent::Load)) => LoadAttemptResult::loaded(provider, container_id),
            Ok(Ok(FrameEvent::Error)) => failed("iframe error event"),
            Ok(Err(_)) => failed("iframe removed before loading"),
            Err(_) => LoadAttemptResult::failed(
                provider,
                container_id,
                AttemptError::ProviderLoadTimedOut {
                    provider,
                    after_ms: self.timing.iframe_timeout_ms,
                },
            ),
        })
    }

    fn cal_loader_script(&self, mount_id: &str) -> String {
        let ns = json!(self.providers.cal_namespace);
        let init = json!({ "origin": self.providers.cal_origin });
        let inline = json!({
            "elementOrSelector": format!("#{mount_id}"),
            "config": { "layout": "month_view", "theme": "light" },
            "calLink": self.providers.cal_link,
        });
        let ui = json!({ "theme": "light", "hideEventTypeDetails": false, "layout": "month_view" });

        format!(
            r#"(function (C, A, L) {{ let p = function (a, ar) {{ a.q.push(ar); }}; let d = C.document; C.Cal = C.Cal || function () {{ let cal = C.Cal; let ar = arguments; if (!cal.loaded) {{ cal.ns = {{}}; cal.q = cal.q || []; d.head.appendChild(d.createElement("script")).src = A; cal.loaded = true; }} if (ar[0] === L) {{ const api = function () {{ p(api, arguments); }}; const namespace = ar[1]; api.q = api.q || []; if (typeof namespace === "string") {{ cal.ns[namespace] = cal.ns[namespace] || api; p(cal.ns[namespace], ar); p(cal, ["initNamespace", namespace]); }} else p(cal, ar); return; }} p(cal, ar); }}; }})(window, {script}, "init");
Cal("init", {ns}, {init});
Cal.ns[{ns}]("inline", {inline});
Cal.ns[{ns}]("ui", {ui});"#,
            script = json!(self.providers.cal_embed_script),
        )
    }
}

#[async_trait]
impl<D: Dom> AttemptProvider for CalendarIntegrationService<D> {
    async fn attempt_provider<'a>(
        &self,
        provider: EmbedProvider,
        container_id: &'a str,
    ) -> Result<LoadAttemptResult<'a>, AttemptError> {
        if !self.dom.contains(container_id) {
            warn!(%provider, container = container_id, "booking container not found");
            return Err(AttemptError::ContainerNotFound(container_id.to_string()));
        }

        let started = Instant::now();
        let result = match provider {
            EmbedProvider::CalCom => self.load_script_embed(container_id).await?,
            EmbedProvider::Calendly => self.load_iframe(container_id).await?,
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result.failure {
            None => info!(%provider, container = container_id, elapsed_ms, "embed loaded"),
            Some(err) => warn!(%provider, container = container_id, elapsed_ms, error = %err, "embed failed"),
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDocument;
    use std::time::Duration;

    const CONTAINER: &str = "cal-iframe-container";

    fn assert_elapsed(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(5),
            "elapsed {actual:?}, expected about {expected:?}"
        );
    }

    fn service(doc: &Arc<MemoryDocument>) -> CalendarIntegrationService<MemoryDocument> {
        CalendarIntegrationService::new(
            doc.clone(),
            ProviderConfig::default(),
            TimingConfig::default(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_container_is_an_error() {
        let doc = Arc::new(MemoryDocument::new());
        let err = service(&doc)
            .attempt_provider(EmbedProvider::CalCom, "missing")
            .await
            .unwrap_err();
        assert_eq!(err, AttemptError::ContainerNotFound("missing".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_script_embed_succeeds_once_children_render() {
        let doc = Arc::new(MemoryDocument::with_container(CONTAINER));
        let svc = service(&doc);

        let host = {
            let doc = doc.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(1500)).await;
                assert!(doc.render_children("my-cal-inline-30min", 1));
            }
        };

        let started = Instant::now();
        let (result, _) = futures::join!(svc.attempt_provider(EmbedProvider::CalCom, CONTAINER), host);
        let result = result.unwrap();

        assert!(result.success);
        assert_eq!(result.provider, EmbedProvider::CalCom);
        assert_eq!(result.container, CONTAINER);
        assert!(started.elapsed() < Duration::from_secs(5));

        match doc.head_scripts().as_slice() {
            [ScriptTag::Inline(code)] => {
                assert!(code.contains(r#""calLink":"argentino-luca/30min""#));
                assert!(code.contains("https://app.cal.com/embed/embed.js"));
                assert!(code.contains("#my-cal-inline-30min"));
            }
            other => panic!("unexpected head scripts: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_script_embed_times_out_when_mount_stays_empty() {
        let doc = Arc::new(MemoryDocument::with_container(CONTAINER));
        let started = Instant::now();

        let result = service(&doc)
            .attempt_provider(EmbedProvider::CalCom, CONTAINER)
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(
            result.failure,
            Some(AttemptError::ProviderLoadTimedOut {
                provider: EmbedProvider::CalCom,
                after_ms: 5000
            })
        );
        assert_elapsed(started.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_iframe_requires_load_event() {
        let doc = Arc::new(MemoryDocument::with_container(CONTAINER));
        let svc = service(&doc);

        let host = {
            let doc = doc.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                assert!(doc.fire_frame_event(CALENDLY_FRAME_ID, FrameEvent::Load));
            }
        };

        let (result, _) =
            futures::join!(svc.attempt_provider(EmbedProvider::Calendly, CONTAINER), host);
        let result = result.unwrap();

        assert!(result.success);
        match doc.content(CONTAINER) {
            Some(Node::Iframe(frame)) => {
                assert_eq!(frame.src, "https://calendly.com/ait-labs/30min");
                assert_eq!(frame.id, CALENDLY_FRAME_ID);
            }
            other => panic!("unexpected container content: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_iframe_error_event_fails() {
        let doc = Arc::new(MemoryDocument::with_container(CONTAINER));
        let svc = service(&doc);

        let host = {
            let doc = doc.clone();
            async move {
                tokio::task::yield_now().await;
                doc.fire_frame_event(CALENDLY_FRAME_ID, FrameEvent::Error);
            }
        };

        let (result, _) =
            futures::join!(svc.attempt_provider(EmbedProvider::Calendly, CONTAINER), host);
        let result = result.unwrap();

        assert!(!result.success);
        assert!(matches!(
            result.failure,
            Some(AttemptError::ProviderLoadFailed { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_iframe_without_events_times_out() {
        let doc = Arc::new(MemoryDocument::with_container(CONTAINER));
        let started = Instant::now();

        let result = service(&doc)
            .attempt_provider(EmbedProvider::Calendly, CONTAINER)
            .await
            .unwrap();

        assert!(!result.success);
        assert!(matches!(
            result.failure,
            Some(AttemptError::ProviderLoadTimedOut { after_ms: 6000, .. })
        ));
        assert_elapsed(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_container_torn_down_mid_attempt() {
        let doc = Arc::new(MemoryDocument::with_container(CONTAINER));
        let svc = service(&doc);

        let host = {
            let doc = doc.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                doc.remove_container(CONTAINER);
            }
        };

        let (result, _) =
            futures::join!(svc.attempt_provider(EmbedProvider::Calendly, CONTAINER), host);
        let result = result.unwrap();

        assert!(!result.success);
        assert!(doc.content(CONTAINER).is_none());
        assert!(!doc.fire_frame_event(CALENDLY_FRAME_ID, FrameEvent::Load));
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_attempt_replaces_previous_content() {
        let doc = Arc::new(MemoryDocument::with_container(CONTAINER));
        let svc = service(&doc);

        let _ = svc
            .attempt_provider(EmbedProvider::CalCom, CONTAINER)
            .await
            .unwrap();
        assert!(matches!(doc.content(CONTAINER), Some(Node::MountPoint { .. })));

        let _ = svc
            .attempt_provider(EmbedProvider::Calendly, CONTAINER)
            .await
            .unwrap();
        assert!(matches!(doc.content(CONTAINER), Some(Node::Iframe(_))));
        assert!(!doc.contains("my-cal-inline-30min"));
    }
}
