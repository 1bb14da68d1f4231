use std::sync::Arc;

use kurbo::Point;
use signflow_editor::{
    CommitOutcome, EditKind, EditorSession, EditorSettings, Key, KeyOutcome, KeyPress, NoCapture,
    PageSize, PointerTarget, RawTextItem, ReleaseOutcome, RenderOutcome, ResizeHandle,
};
use signflow_store::{DocumentStore, MemoryDocumentStore, NewDocument, OwnerId};

const PAGE: PageSize = PageSize {
    width: 600.0,
    height: 800.0,
};

fn raw(text: &str, x: f64, y: f64, width: f64, height: f64) -> RawTextItem {
    RawTextItem {
        text: text.to_string(),
        transform: [height, 0.0, 0.0, height, x, y + height],
        width,
    }
}

fn session_at(scale: f64, items: &[RawTextItem]) -> EditorSession {
    let settings = EditorSettings {
        initial_scale: scale,
        ..EditorSettings::default()
    };
    let mut session = EditorSession::new(2, Arc::new(settings)).unwrap();
    let ticket = session.request_render();
    assert!(matches!(
        session.apply_render(ticket, PAGE, items),
        RenderOutcome::Applied { .. }
    ));
    session
}

fn drag(session: &mut EditorSession, from: (f64, f64), to: (f64, f64)) -> ReleaseOutcome {
    assert!(session.pointer_down(Point::new(from.0, from.1), PointerTarget::Canvas));
    session.pointer_move(Point::new(to.0, to.1));
    session.pointer_up()
}

fn enter() -> KeyPress {
    KeyPress {
        key: Key::Enter,
        modifier_held: false,
    }
}

fn close(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 0.05
}

#[test]
fn drag_over_a_run_opens_a_merge_edit_in_pdf_units() {
    let mut session = session_at(1.5, &[raw("Invoice", 100.0, 200.0, 50.0, 18.0)]);

    let outcome = drag(&mut session, (90.0, 190.0), (160.0, 220.0));
    assert_eq!(outcome, ReleaseOutcome::Opened(EditKind::Merge));

    let edit = session.active_edit().unwrap();
    assert_eq!(edit.text, "Invoice");
    assert!(close(edit.bounds.x, 60.0));
    assert!(close(edit.bounds.y, 126.7));
    assert!(close(edit.bounds.width, 46.7));
    assert!(close(edit.bounds.height, 20.0));
}

#[test]
fn click_on_empty_area_opens_default_box() {
    let mut session = session_at(2.0, &[]);

    let outcome = drag(&mut session, (300.0, 300.0), (300.0, 300.0));
    assert_eq!(outcome, ReleaseOutcome::Opened(EditKind::Empty));

    let edit = session.active_edit().unwrap();
    assert_eq!(
        (edit.bounds.x, edit.bounds.y, edit.bounds.width, edit.bounds.height),
        (150.0, 150.0, 90.0, 16.0)
    );
    assert_eq!(edit.font_size_pdf, session.settings().default_font_size);
    assert_eq!(edit.font_size_pixel, session.settings().default_font_size * 2.0);
}

#[test]
fn merge_commit_replaces_runs_and_saves_in_order() {
    let mut session = session_at(
        1.0,
        &[
            raw("Due", 10.0, 10.0, 30.0, 12.0),
            raw("date:", 45.0, 10.0, 40.0, 12.0),
            raw("Signed", 10.0, 100.0, 50.0, 12.0),
        ],
    );
    session.sync_run(2, "Approved").unwrap();

    drag(&mut session, (5.0, 5.0), (90.0, 25.0));
    assert_eq!(session.active_edit().unwrap().text, "Due date:");
    session.set_active_text("  Due 1 March  ");
    let outcome = session.handle_key(enter());
    assert!(matches!(
        outcome,
        KeyOutcome::Commit(CommitOutcome::Committed(_))
    ));

    let blocks = session.build_replace_blocks();
    let texts: Vec<_> = blocks.iter().map(|block| block.text.as_str()).collect();
    assert_eq!(texts, ["", "", "Approved", "Due 1 March"]);
    assert!(blocks.iter().all(|block| block.font_size >= 8));

    let store = MemoryDocumentStore::new();
    let record = store
        .insert(NewDocument {
            owner_id: OwnerId::new_v7(),
            file_name: "invoice.pdf".to_string(),
            bytes: b"%PDF-1.7".to_vec(),
        })
        .unwrap();
    assert!(session.save(&store, record.id).unwrap().is_some());
    assert_eq!(store.replacement_batches(record.id).unwrap()[0], blocks);
}

#[test]
fn escape_and_blank_commits_leave_runs_alone() {
    let mut session = session_at(1.0, &[raw("Keep", 10.0, 10.0, 30.0, 12.0)]);

    drag(&mut session, (5.0, 5.0), (50.0, 25.0));
    session.handle_key(KeyPress {
        key: Key::Escape,
        modifier_held: false,
    });
    assert!(session.active_edit().is_none());

    drag(&mut session, (5.0, 5.0), (50.0, 25.0));
    session.set_active_text("   ");
    assert_eq!(session.commit_active(), CommitOutcome::Discarded);

    assert!(session.build_replace_blocks().is_empty());
    let store = MemoryDocumentStore::new();
    let record = store
        .insert(NewDocument {
            owner_id: OwnerId::new_v7(),
            file_name: "keep.pdf".to_string(),
            bytes: Vec::new(),
        })
        .unwrap();
    assert!(session.save(&store, record.id).unwrap().is_none());
    assert_eq!(store.get(record.id).unwrap(), record);
}

#[test]
fn signature_flow_produces_a_page_space_placement() {
    let session = session_at(1.5, &[]);
    let mut signing = session.start_signature(Arc::new(NoCapture)).unwrap();
    signing.placement.set_canvas_size(900.0, 1200.0);

    signing.pad.begin_stroke(Point::new(10.0, 75.0));
    signing.pad.stroke_to(Point::new(340.0, 80.0));
    signing.pad.end_stroke();
    assert!(signing.apply().unwrap());

    signing
        .placement
        .begin_resize(ResizeHandle::Nw, Point::new(100.0, 100.0));
    signing.placement.pointer_move(Point::new(-500.0, -500.0));
    signing.placement.pointer_up();

    let placement = signing.confirm().unwrap();
    assert_eq!((placement.x, placement.y), (0.0, 0.0));
    assert_eq!((placement.width, placement.height), (200.0, 133.0));
    assert_eq!(placement.page, 1);
}
