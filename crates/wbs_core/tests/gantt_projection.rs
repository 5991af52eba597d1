mod common;

use common::{day, element, id, loaded_service, record_events, row_ids, site_package, FakeRepo, PACKAGE};
use futures::executor::block_on;
use wbs_core::{BarShape, ElementType, EngineConfig, PackageId, RowTone, Status, StoreEvent, WbsService};

fn gantt_ids(service: &WbsService<FakeRepo>) -> Vec<String> {
    service
        .gantt_rows()
        .into_iter()
        .map(|row| row.id.as_str().to_string())
        .collect()
}

#[test]
fn chart_rows_align_with_list_rows() {
    let service = loaded_service(site_package());
    assert_eq!(gantt_ids(&service), row_ids(&service));

    let depths: Vec<usize> = service.gantt_rows().iter().map(|row| row.depth).collect();
    let list_depths: Vec<usize> = service.list_rows().iter().map(|row| row.depth).collect();
    assert_eq!(depths, list_depths);
}

#[test]
fn milestones_render_as_diamonds_and_empty_spans_widen() {
    let mut elements = site_package();
    let mut instant = element("t6", ElementType::SimpleTask, Some("s2"), Some(2));
    instant.planned_end_date = instant.planned_start_date;
    instant.status = Status::Delayed;
    elements.push(instant);
    let service = loaded_service(elements);

    let rows = service.gantt_rows();
    let milestone = rows.iter().find(|row| row.id == id("m1")).unwrap();
    assert_eq!(milestone.shape, BarShape::Diamond);
    assert_eq!(milestone.start, milestone.end);

    let widened = rows.iter().find(|row| row.id == id("t6")).unwrap();
    assert_eq!(widened.shape, BarShape::Bar);
    assert_eq!(widened.start, day(0));
    assert_eq!(widened.end, day(1));
    assert_eq!(widened.tone, RowTone::Danger);
    assert_eq!(widened.tone.color_hex(), "#ef4444");

    let regular = rows.iter().find(|row| row.id == id("t1")).unwrap();
    assert_eq!(regular.end, day(3));
    assert_eq!(regular.tone, RowTone::Neutral);
}

#[test]
fn collapsing_a_group_hides_its_subtree_in_both_views() {
    let service = loaded_service(site_package());
    let events = record_events(&service);

    assert!(!service.toggle_group(&id("g1")).unwrap());

    assert_eq!(row_ids(&service), vec!["g1", "g2"]);
    assert_eq!(gantt_ids(&service), vec!["g1", "g2"]);
    assert_eq!(*events.borrow(), vec![StoreEvent::ExpansionChanged]);

    assert!(service.toggle_group(&id("g1")).unwrap());
    assert_eq!(row_ids(&service).len(), site_package().len());
}

#[test]
fn subgroups_do_not_collapse() {
    let service = loaded_service(site_package());

    let events = record_events(&service);

    assert!(!service.toggle_group(&id("s1")).unwrap());
    assert!(!service.toggle_group(&id("t1")).unwrap());

    assert!(!service.is_expanded(&id("s1")));
    assert_eq!(row_ids(&service).len(), site_package().len());
    assert!(events.borrow().is_empty());
    assert!(service.toggle_group(&id("ghost")).is_err());
}

#[test]
fn collapse_all_and_expand_all() {
    let service = loaded_service(site_package());

    service.collapse_all();
    assert_eq!(row_ids(&service), vec!["g1", "g2"]);
    assert!(!service.is_expanded(&id("g1")));

    service.expand_all();
    assert_eq!(gantt_ids(&service), row_ids(&service));
    assert_eq!(row_ids(&service).len(), site_package().len());
}

#[test]
fn groups_can_start_collapsed() {
    let config = EngineConfig {
        expand_groups_on_load: false,
        ..EngineConfig::default()
    };
    let service = WbsService::new(
        FakeRepo::with_elements(site_package()),
        PackageId::new(PACKAGE),
        config,
    );
    block_on(service.refetch()).unwrap();

    assert_eq!(row_ids(&service), vec!["g1", "g2"]);

    service.expand_all();
    block_on(service.refetch()).unwrap();
    assert_eq!(row_ids(&service).len(), site_package().len());
}

#[test]
fn drafts_under_collapsed_groups_are_hidden() {
    let service = loaded_service(site_package());
    let draft = service
        .create_draft(ElementType::SimpleTask, Some(id("s2")))
        .unwrap();
    service.toggle_group(&id("g1")).unwrap();

    assert!(service.gantt_rows().iter().all(|row| row.id != draft.id));
    assert!(service.element(&draft.id).is_some());
}
