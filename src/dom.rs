// Host page port. Adapters reach the document only through `Dom`, keyed by element id.

use std::borrow::Cow;

use dashmap::DashMap;
use parking_lot::Mutex;
use quick_xml::escape::escape;
use thiserror::Error;
use tokio::sync::{oneshot, watch};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    #[error("Element {0} not found")]
    ElementNotFound(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEvent {
    Load,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IframeSpec {
    pub id: String,
    pub src: String,
    pub title: String,
    pub height_px: u32,
    pub allow: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptTag {
    External(String),
    Inline(String),
}

// Whatever a container currently holds. Replacing it drops the previous node entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Iframe(IframeSpec),
    MountPoint { id: String, height_px: u32 },
    Markup(String),
}

impl Node {
    pub fn to_html(&self) -> Cow<'_, str> {
        match self {
            Node::Iframe(frame) => Cow::Owned(format!(
                r#"<iframe id="{}" src="{}" title="{}" width="100%" height="{}px" allow="{}" style="border:none;border-radius:12px;min-height:{}px"></iframe>"#,
                escape(&frame.id),
                escape(&frame.src),
                escape(&frame.title),
                frame.height_px,
                escape(&frame.allow),
                frame.height_px,
            )),
            Node::MountPoint { id, height_px } => Cow::Owned(format!(
                r#"<div style="width:100%;height:{}px;overflow:scroll" id="{}"></div>"#,
                height_px,
                escape(id),
            )),
            Node::Markup(markup) => Cow::Borrowed(markup),
        }
    }
}

pub trait Dom: Send + Sync + 'static {
    fn contains(&self, id: &str) -> bool;

    // Clears the element and mounts `node` as its only content
    fn replace_content(&self, id: &str, node: Node) -> Result<(), DomError>;

    fn append_head_script(&self, script: ScriptTag);

    // Load/error notification for a mounted iframe. Can be taken once per mounted frame.
    fn frame_events(&self, frame_id: &str) -> Option<oneshot::Receiver<FrameEvent>>;

    // Child count of a mount node, updated as the third-party script renders into it
    fn watch_children(&self, id: &str) -> Option<watch::Receiver<usize>>;
}

struct MountState {
    owner: String,
    children: watch::Sender<usize>,
}

struct FrameState {
    owner: String,
    sender: Option<oneshot::Sender<FrameEvent>>,
    receiver: Option<oneshot::Receiver<FrameEvent>>,
}

/// In-process document.
///
/// Containers are registered by the host; nodes mounted into them live exactly as long as the
/// container content they belong to. Replacing or removing a container drops its frames and mount
/// nodes, so pending waits on them resolve as failures and late renders are ignored.
#[derive(Default)]
pub struct MemoryDocument {
    containers: DashMap<String, Option<Node>>,
    mounts: DashMap<String, MountState>,
    frames: DashMap<String, FrameState>,
    head: Mutex<Vec<ScriptTag>>,
}

impl MemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(id: &str) -> Self {
        let doc = Self::new();
        doc.insert_container(id);
        doc
    }

    pub fn insert_container(&self, id: &str) {
        self.containers.insert(id.to_string(), None);
    }

    pub fn remove_container(&self, id: &str) -> bool {
        let removed = self.containers.remove(id).is_some();
        self.drop_owned_by(id);
        removed
    }

    pub fn content(&self, id: &str) -> Option<Node> {
        self.containers.get(id).and_then(|slot| slot.value().clone())
    }

    pub fn head_scripts(&self) -> Vec<ScriptTag> {
        self.head.lock().clone()
    }

    // Simulates the browser firing load/error on a mounted iframe
    pub fn fire_frame_event(&self, frame_id: &str, event: FrameEvent) -> bool {
        let sender = self
            .frames
            .get_mut(frame_id)
            .and_then(|mut frame| frame.sender.take());

        match sender {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    // Simulates a third-party script rendering `count` children into a mount node
    pub fn render_children(&self, mount_id: &str, count: usize) -> bool {
        match self.mounts.get(mount_id) {
            Some(mount) => {
                mount.children.send_replace(count);
                true
            }
            None => false,
        }
    }

    fn drop_owned_by(&self, container_id: &str) {
        self.mounts.retain(|_, mount| mount.owner != container_id);
        self.frames.retain(|_, frame| frame.owner != container_id);
    }
}

impl Dom for MemoryDocument {
    fn contains(&self, id: &str) -> bool {
        self.containers.contains_key(id) || self.mounts.contains_key(id)
    }

    fn replace_content(&self, id: &str, node: Node) -> Result<(), DomError> {
        if !self.containers.contains_key(id) {
            return Err(DomError::ElementNotFound(id.to_string()));
        }

        self.drop_owned_by(id);

        match &node {
            Node::MountPoint { id: mount_id, .. } => {
                let (children, _) = watch::channel(0);
                self.mounts.insert(
                    mount_id.clone(),
                    MountState {
                        owner: id.to_string(),
                        children,
                    },
                );
            }
            Node::Iframe(frame) => {
                let (tx, rx) = oneshot::channel();
                self.frames.insert(
                    frame.id.clone(),
                    FrameState {
                        owner: id.to_string(),
                        sender: Some(tx),
                        receiver: Some(rx),
                    },
                );
            }
            Node::Markup(_) => {}
        }

        // the container may have been torn down between the check and here
        match self.containers.get_mut(id) {
            Some(mut slot) => {
                *slot = Some(node);
                Ok(())
            }
            None => {
                self.drop_owned_by(id);
                Err(DomError::ElementNotFound(id.to_string()))
            }
        }
    }

    fn append_head_script(&self, script: ScriptTag) {
        self.head.lock().push(script);
    }

    fn frame_events(&self, frame_id: &str) -> Option<oneshot::Receiver<FrameEvent>> {
        self.frames
            .get_mut(frame_id)
            .and_then(|mut frame| frame.receiver.take())
    }

    fn watch_children(&self, id: &str) -> Option<watch::Receiver<usize>> {
        self.mounts.get(id).map(|mount| mount.children.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(id: &str) -> Node {
        Node::Iframe(IframeSpec {
            id: id.to_string(),
            src: "https://calendly.com/ait-labs/30min".to_string(),
            title: "Booking".to_string(),
            height_px: 700,
            allow: "fullscreen".to_string(),
        })
    }

    #[test]
    fn test_replace_content_requires_container() {
        let doc = MemoryDocument::new();
        let err = doc
            .replace_content("missing", Node::Markup("<p>hi</p>".to_string()))
            .unwrap_err();
        assert_eq!(err, DomError::ElementNotFound("missing".to_string()));
    }

    #[test]
    fn test_replacing_content_drops_previous_mount_node() {
        let doc = MemoryDocument::with_container("booking");
        doc.replace_content(
            "booking",
            Node::MountPoint {
                id: "my-cal-inline-30min".to_string(),
                height_px: 600,
            },
        )
        .unwrap();
        assert!(doc.contains("my-cal-inline-30min"));

        doc.replace_content("booking", frame("booking-iframe")).unwrap();

        assert!(!doc.contains("my-cal-inline-30min"));
        assert!(!doc.render_children("my-cal-inline-30min", 2));
        assert!(matches!(doc.content("booking"), Some(Node::Iframe(_))));
    }

    #[tokio::test]
    async fn test_frame_event_delivered_once() {
        let doc = MemoryDocument::with_container("booking");
        doc.replace_content("booking", frame("booking-iframe")).unwrap();

        let rx = doc.frame_events("booking-iframe").unwrap();
        assert!(doc.frame_events("booking-iframe").is_none());

        assert!(doc.fire_frame_event("booking-iframe", FrameEvent::Load));
        assert!(!doc.fire_frame_event("booking-iframe", FrameEvent::Error));
        assert_eq!(rx.await.unwrap(), FrameEvent::Load);
    }

    #[tokio::test]
    async fn test_removing_container_closes_pending_frame() {
        let doc = MemoryDocument::with_container("booking");
        doc.replace_content("booking", frame("booking-iframe")).unwrap();
        let rx = doc.frame_events("booking-iframe").unwrap();

        assert!(doc.remove_container("booking"));
        assert!(rx.await.is_err());
        assert!(!doc.contains("booking"));
    }

    #[test]
    fn test_children_watch_sees_renders() {
        let doc = MemoryDocument::with_container("booking");
        doc.replace_content(
            "booking",
            Node::MountPoint {
                id: "mount".to_string(),
                height_px: 600,
            },
        )
        .unwrap();

        let rx = doc.watch_children("mount").unwrap();
        assert_eq!(*rx.borrow(), 0);
        assert!(doc.render_children("mount", 3));
        assert_eq!(*rx.borrow(), 3);
    }

    #[test]
    fn test_node_html_escapes_attributes() {
        let html = Node::Iframe(IframeSpec {
            id: "f".to_string(),
            src: "https://example.com/?a=1&b=2".to_string(),
            title: "A \"quoted\" title".to_string(),
            height_px: 700,
            allow: "camera".to_string(),
        })
        .to_html()
        .into_owned();

        assert!(html.contains("a=1&amp;b=2"));
        assert!(html.contains("A &quot;quoted&quot; title"));
        assert!(html.contains(r#"height="700px""#));
    }
}
