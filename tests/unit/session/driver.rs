use super::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::command::history::{SharedHistory, UndoHistory};
use crate::document::content::ContentHandle;
use crate::document::node::{MemoryNode, NodeKind, NodeRef};
use crate::document::renderer::RecordingRenderer;
use crate::foundation::core::{Affine, NodeId, Rect};
use crate::schedule::scheduler::SchedulerOpts;
use crate::session::extra::TransformExtra;
use crate::session::jobs::{StrokeSetup, StrokeState};
use crate::transform::affine::{AffineParams, AffineRoutine};

const RED: [u8; 4] = [200, 0, 0, 255];
const GREEN: [u8; 4] = [0, 200, 0, 255];

struct Fixture {
    driver: StrokeDriver,
    nodes: Vec<NodeRef>,
    history: SharedHistory,
    renderer: Arc<RecordingRenderer>,
    bounds: Arc<Mutex<Option<Rect>>>,
}

fn red_square() -> ContentHandle {
    ContentHandle::solid(LodLevel::FULL, Rect::new(0.0, 0.0, 8.0, 8.0), RED)
}

fn green_square() -> ContentHandle {
    ContentHandle::solid(LodLevel::FULL, Rect::new(4.0, 4.0, 12.0, 12.0), GREEN)
}

fn two_nodes() -> Vec<NodeRef> {
    vec![
        MemoryNode::new(NodeId(1), red_square()).into_ref(),
        MemoryNode::new(NodeId(2), green_square()).into_ref(),
    ]
}

fn fixture(nodes: Vec<NodeRef>, preview_lod: LodLevel, throttle: Duration) -> Fixture {
    let renderer = Arc::new(RecordingRenderer::new());
    let history = UndoHistory::default().shared();
    history.lock().unwrap().set_busy(true);
    let bounds = Arc::new(Mutex::new(None));
    let seen = Arc::clone(&bounds);

    let state = StrokeState::new(StrokeSetup {
        label: "Transform".to_owned(),
        nodes: nodes.clone(),
        root: nodes[0].id(),
        routine: Arc::new(AffineRoutine::default()),
        renderer: renderer.clone(),
        history: Arc::clone(&history),
        overridden: None,
        preview_lod,
        selection: None,
        status: Arc::new(Mutex::new(SessionState::Initializing)),
        on_initialized: Some(Box::new(move |r: Rect| *seen.lock().unwrap() = Some(r))),
    });
    let scheduler = Scheduler::new(&SchedulerOpts {
        parallel: false,
        threads: None,
    })
    .unwrap();
    let driver = StrokeDriver::new(
        scheduler,
        state,
        PreviewCoordinator::new(throttle),
        AffineParams::identity().into_handle(),
        preview_lod,
        false,
    );
    Fixture {
        driver,
        nodes,
        history,
        renderer,
        bounds,
    }
}

fn update(revision: u64, params: AffineParams) -> Request {
    Request::Update {
        params: Revisioned {
            revision,
            params: params.into_handle(),
        },
        force: false,
    }
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn start_clears_publishes_and_shows_initial_preview() {
    let mut fx = fixture(two_nodes(), LodLevel::FULL, ms(100));
    fx.driver.start(Instant::now()).unwrap();

    assert_eq!(fx.driver.phase(), SessionState::Previewing);
    assert_eq!(
        *fx.bounds.lock().unwrap(),
        Some(Rect::new(0.0, 0.0, 12.0, 12.0))
    );
    // identity preview reproduces the original pixels
    assert_eq!(fx.nodes[0].content_snapshot(), red_square());
    assert_eq!(fx.nodes[1].content_snapshot(), green_square());
    assert!(!fx.renderer.notices().is_empty());

    let stats = fx.driver.stats();
    assert_eq!(stats.recomputes, 0);
    assert_eq!(stats.last_applied_revision, 0);
}

#[test]
fn updates_inside_the_interval_coalesce_into_one_recompute() {
    let mut fx = fixture(two_nodes(), LodLevel::FULL, ms(100));
    let t0 = Instant::now();
    fx.driver.start(t0).unwrap();

    assert!(fx.driver.handle(update(1, AffineParams::translate(2.0, 0.0)), t0 + ms(10)));
    assert!(fx.driver.handle(update(2, AffineParams::translate(5.0, 0.0)), t0 + ms(20)));
    fx.driver.pump(t0 + ms(50)).unwrap();
    assert_eq!(fx.driver.stats().recomputes, 0);

    fx.driver.pump(t0 + ms(100)).unwrap();
    let stats = fx.driver.stats();
    assert_eq!(stats.recomputes, 1);
    assert_eq!(stats.coalesced, 1);
    assert_eq!(stats.last_applied_revision, 2);
    assert_eq!(
        fx.nodes[0].content_snapshot(),
        ContentHandle::solid(LodLevel::FULL, Rect::new(5.0, 0.0, 13.0, 8.0), RED)
    );
}

#[test]
fn matching_full_resolution_preview_is_promoted() {
    let mut fx = fixture(two_nodes(), LodLevel::FULL, Duration::ZERO);
    let t0 = Instant::now();
    fx.driver.start(t0).unwrap();
    fx.driver
        .handle(update(1, AffineParams::translate(3.0, 0.0)), t0 + ms(1));
    assert_eq!(fx.driver.stats().recomputes, 1);

    let outcome = fx.driver.commit().unwrap();
    assert_eq!(outcome.stats().final_passes, 0);
    assert_eq!(fx.driver.phase(), SessionState::Committed);

    let history = fx.history.lock().unwrap();
    assert!(!history.is_busy());
    let top = history.last_committed().unwrap();
    assert_eq!(Some(top.id()), outcome.macro_id());
    let labels: Vec<&str> = top.children().iter().map(|c| c.label()).collect();
    assert_eq!(
        labels,
        vec!["Clear", "Clear", "Transform separator", "Transform", "Transform"]
    );
    let extra = top.extra_as::<TransformExtra>().unwrap();
    assert_eq!(extra.root, NodeId(1));
    assert_eq!(extra.nodes, vec![NodeId(1), NodeId(2)]);
}

#[test]
fn lod_preview_is_recomputed_at_full_resolution_on_commit() {
    let mut fx = fixture(two_nodes(), LodLevel(2), Duration::ZERO);
    let t0 = Instant::now();
    fx.driver.start(t0).unwrap();
    fx.driver
        .handle(update(1, AffineParams::translate(4.0, 0.0)), t0 + ms(1));
    assert_eq!(fx.nodes[0].content_snapshot().lod(), LodLevel(2));

    let outcome = fx.driver.commit().unwrap();
    assert_eq!(outcome.stats().final_passes, 1);
    assert_eq!(
        fx.nodes[0].content_snapshot(),
        ContentHandle::solid(LodLevel::FULL, Rect::new(4.0, 0.0, 12.0, 8.0), RED)
    );
    assert_eq!(
        fx.nodes[1].content_snapshot(),
        ContentHandle::solid(LodLevel::FULL, Rect::new(8.0, 4.0, 16.0, 12.0), GREEN)
    );
}

#[test]
fn decorated_nodes_always_get_a_final_pass() {
    let nodes = vec![
        MemoryNode::new(NodeId(7), red_square())
            .with_kind(NodeKind::Decorated)
            .into_ref(),
    ];
    let mut fx = fixture(nodes, LodLevel::FULL, Duration::ZERO);
    let t0 = Instant::now();
    fx.driver.start(t0).unwrap();
    fx.driver
        .handle(update(1, AffineParams::translate(1.0, 1.0)), t0 + ms(1));

    let outcome = fx.driver.commit().unwrap();
    assert_eq!(outcome.stats().final_passes, 1);
    assert_eq!(fx.history.lock().unwrap().len(), 1);
}

#[test]
fn identity_commit_rolls_back_without_history() {
    let mut fx = fixture(two_nodes(), LodLevel::FULL, ms(100));
    fx.driver.start(Instant::now()).unwrap();

    let outcome = fx.driver.commit().unwrap();
    assert!(matches!(outcome, CommitOutcome::Identity { .. }));
    assert_eq!(fx.driver.phase(), SessionState::Cancelled);
    let history = fx.history.lock().unwrap();
    assert!(history.is_empty());
    assert!(!history.is_busy());
    drop(history);
    assert_eq!(fx.nodes[0].content_snapshot(), red_square());
}

#[test]
fn structural_change_commits_an_identity_transform() {
    let nodes = vec![
        MemoryNode::new(NodeId(1), red_square())
            .with_structural_change()
            .into_ref(),
    ];
    let mut fx = fixture(nodes, LodLevel::FULL, ms(100));
    fx.driver.start(Instant::now()).unwrap();

    let outcome = fx.driver.commit().unwrap();
    assert!(outcome.macro_id().is_some());
    assert_eq!(fx.history.lock().unwrap().len(), 1);
}

#[test]
fn cancel_restores_content_and_rejects_a_second_cancel() {
    let mut fx = fixture(two_nodes(), LodLevel(1), Duration::ZERO);
    let t0 = Instant::now();
    fx.driver.start(t0).unwrap();
    fx.driver
        .handle(update(1, AffineParams::translate(6.0, 2.0)), t0 + ms(1));

    fx.driver.cancel().unwrap();
    assert_eq!(fx.driver.phase(), SessionState::Cancelled);
    assert_eq!(fx.nodes[0].content_snapshot(), red_square());
    assert_eq!(fx.nodes[1].content_snapshot(), green_square());
    assert!(!fx.history.lock().unwrap().is_busy());

    assert!(fx.driver.cancel().unwrap_err().is_precondition());
    assert!(fx.driver.commit().unwrap_err().is_precondition());
}

#[test]
fn routine_failure_keeps_the_previous_preview() {
    let mut fx = fixture(two_nodes(), LodLevel::FULL, Duration::ZERO);
    let t0 = Instant::now();
    fx.driver.start(t0).unwrap();
    fx.driver
        .handle(update(1, AffineParams::translate(3.0, 0.0)), t0 + ms(1));
    let shown = fx.nodes[0].content_snapshot();

    let collapse = AffineParams::new(Affine::scale(0.0));
    fx.driver.handle(update(2, collapse), t0 + ms(2));

    let stats = fx.driver.stats();
    assert_eq!(stats.recomputes, 2);
    assert_eq!(stats.failed_transforms, 2);
    assert_eq!(stats.last_applied_revision, 1);
    assert_eq!(fx.driver.phase(), SessionState::Previewing);
    assert_eq!(fx.nodes[0].content_snapshot(), shown);

    fx.driver.cancel().unwrap();
    assert_eq!(fx.nodes[0].content_snapshot(), red_square());
}

#[test]
fn failed_final_pass_restores_the_preview_and_records_nothing() {
    let mut fx = fixture(two_nodes(), LodLevel(1), Duration::ZERO);
    let t0 = Instant::now();
    fx.driver.start(t0).unwrap();
    fx.driver
        .handle(update(1, AffineParams::translate(2.0, 2.0)), t0 + ms(1));
    let shown = fx.nodes[0].content_snapshot();
    assert_eq!(shown.lod(), LodLevel(1));
    fx.driver
        .handle(update(2, AffineParams::new(Affine::scale(0.0))), t0 + ms(2));

    let err = fx.driver.commit().unwrap_err();
    assert!(err.is_routine());
    assert_eq!(fx.driver.phase(), SessionState::Previewing);
    assert_eq!(fx.nodes[0].content_snapshot(), shown);
    assert!(fx.history.lock().unwrap().is_empty());
    assert_eq!(fx.driver.stats().failed_transforms, 4);

    fx.driver
        .handle(update(3, AffineParams::translate(4.0, 0.0)), t0 + ms(3));
    let outcome = fx.driver.commit().unwrap();
    assert!(matches!(outcome, CommitOutcome::Committed { .. }));
    let history = fx.history.lock().unwrap();
    let children = history.last_committed().unwrap().children();
    let labels: Vec<&str> = children.iter().map(|c| c.label()).collect();
    assert_eq!(labels, ["Clear", "Clear", "Transform separator", "Transform", "Transform"]);
}

#[test]
fn updates_after_the_stroke_ended_are_ignored() {
    let mut fx = fixture(two_nodes(), LodLevel::FULL, Duration::ZERO);
    let t0 = Instant::now();
    fx.driver.start(t0).unwrap();
    fx.driver.cancel().unwrap();

    assert!(!fx.driver.handle(update(1, AffineParams::translate(1.0, 0.0)), t0 + ms(5)));
    assert_eq!(fx.driver.stats().recomputes, 0);
    assert_eq!(fx.nodes[0].content_snapshot(), red_square());
}
