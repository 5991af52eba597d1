mod common;

use common::{assert_dense, day, element, id, loaded_service, row_ids, site_package};
use futures::executor::block_on;
use wbs_core::{
    ElementId, ElementType, NewElement, Priority, RepoError, ServiceError, StoreEvent,
    ValidationError,
};

fn orders(service: &wbs_core::WbsService<common::FakeRepo>, ids: &[&str]) -> Vec<Option<i64>> {
    ids.iter()
        .map(|value| service.element(&id(value)).unwrap().sort_order)
        .collect()
}

#[test]
fn move_to_front_renumbers_bucket_densely() {
    let service = loaded_service(site_package());

    let outcome = block_on(service.reorder(&id("t3"), Some(&id("s1")), 0)).unwrap();

    assert_eq!(outcome.updated.len(), 3);
    assert!(outcome.failed.is_empty());
    assert!(outcome.refetched);
    assert_eq!(orders(&service, &["t3", "t1", "t2"]), vec![Some(1), Some(2), Some(3)]);
    assert_dense(service.repo(), Some("s1"), ElementType::SimpleTask);
    assert_eq!(service.repo().list_call_count(), 1);
}

#[test]
fn only_changed_siblings_are_written() {
    let service = loaded_service(site_package());

    block_on(service.reorder(&id("t3"), Some(&id("s1")), 1)).unwrap();

    let written: Vec<ElementId> = service
        .repo()
        .update_calls()
        .into_iter()
        .map(|(element_id, _)| element_id)
        .collect();
    assert_eq!(written, vec![id("t3"), id("t2")]);
}

#[test]
fn dropping_in_place_sends_nothing() {
    let service = loaded_service(site_package());

    let outcome = block_on(service.reorder(&id("t2"), Some(&id("s1")), 1)).unwrap();

    assert!(outcome.updated.is_empty());
    assert!(!outcome.refetched);
    assert!(service.repo().calls().is_empty());
}

#[test]
fn index_past_the_end_appends() {
    let service = loaded_service(site_package());

    block_on(service.reorder(&id("t1"), Some(&id("s1")), 99)).unwrap();

    assert_eq!(orders(&service, &["t2", "t3", "t1"]), vec![Some(1), Some(2), Some(3)]);
}

#[test]
fn cross_parent_move_reindexes_target_and_leaves_source_gap() {
    let service = loaded_service(site_package());

    block_on(service.reorder(&id("t1"), Some(&id("s2")), 0)).unwrap();

    let moved = service.element(&id("t1")).unwrap();
    assert_eq!(moved.parent_id, Some(id("s2")));
    assert_eq!(moved.sort_order, Some(1));
    assert_eq!(service.element(&id("t4")).unwrap().sort_order, Some(2));
    assert_eq!(
        service.repo().bucket_orders(Some("s1"), ElementType::SimpleTask),
        vec![Some(2), Some(3)]
    );

    let (_, patch) = service
        .repo()
        .update_calls()
        .into_iter()
        .find(|(element_id, _)| element_id == &id("t1"))
        .unwrap();
    assert_eq!(patch.parent_id, Some(Some(id("s2"))));
}

#[test]
fn other_types_in_the_same_parent_are_untouched() {
    let service = loaded_service(site_package());

    block_on(service.reorder(&id("t3"), Some(&id("s1")), 0)).unwrap();

    assert!(service
        .repo()
        .update_calls()
        .iter()
        .all(|(element_id, _)| element_id != &id("m1")));
    assert_eq!(service.element(&id("m1")).unwrap().sort_order, Some(1));
}

#[test]
fn moves_are_visible_while_writes_are_in_flight() {
    let service = loaded_service(site_package());
    let gate = service.repo().gate_update("t1");

    block_on(async {
        let t3 = id("t3");
        let s1 = id("s1");
        let reorder = service.reorder(&t3, Some(&s1), 0);
        let check = async {
            let rows = row_ids(&service);
            let position = |value: &str| rows.iter().position(|row| row == value).unwrap();
            assert!(position("t3") < position("t1"));
            assert_eq!(service.element(&id("t1")).unwrap().sort_order, Some(2));
            assert_eq!(service.store().authoritative(&id("t1")).unwrap().sort_order, Some(1));
            gate.send(()).unwrap();
        };
        let (outcome, ()) = futures::join!(reorder, check);
        assert!(outcome.unwrap().failed.is_empty());
    });

    assert!(service.store().overlay().is_empty());
}

#[test]
fn failed_sibling_is_rolled_back_and_state_reconciled() {
    let service = loaded_service(site_package());
    let events = common::record_events(&service);
    service.repo().fail_next_update(
        "t2",
        RepoError::Http {
            status: 500,
            payload: None,
        },
    );

    let outcome = block_on(service.reorder(&id("t3"), Some(&id("s1")), 0)).unwrap();

    assert_eq!(outcome.failed, vec![id("t2")]);
    assert_eq!(outcome.updated.len(), 2);
    assert!(outcome.refetched);
    assert_eq!(orders(&service, &["t3", "t1", "t2"]), vec![Some(1), Some(2), Some(2)]);
    assert!(service.store().overlay().is_empty());
    assert!(events.borrow().contains(&StoreEvent::Reordered {
        moved: id("t3"),
        failed: 1,
    }));
}

#[test]
fn illegal_targets_are_rejected_before_any_call() {
    let mut elements = site_package();
    elements.push(element("s1a", ElementType::Subgroup, Some("s1"), Some(1)));
    let service = loaded_service(elements);

    let at_root = block_on(service.reorder(&id("t1"), None, 0)).unwrap_err();
    assert!(matches!(
        at_root,
        ServiceError::Validation(ValidationError::IllegalParent { .. })
    ));

    let under_milestone = block_on(service.reorder(&id("t1"), Some(&id("m1")), 0)).unwrap_err();
    assert!(matches!(
        under_milestone,
        ServiceError::Validation(ValidationError::IllegalParent { .. })
    ));

    let into_own_subtree = block_on(service.reorder(&id("s1"), Some(&id("s1a")), 0)).unwrap_err();
    assert!(matches!(
        into_own_subtree,
        ServiceError::Validation(ValidationError::CycleDetected { .. })
    ));

    let unknown = block_on(service.reorder(&id("nope"), Some(&id("s1")), 0)).unwrap_err();
    assert_eq!(
        unknown,
        ServiceError::Validation(ValidationError::UnknownElement(id("nope")))
    );

    assert!(service.repo().calls().is_empty());
}

#[test]
fn drafts_cannot_be_reordered() {
    let service = loaded_service(site_package());
    let draft = service
        .create_draft(ElementType::SimpleTask, Some(id("s1")))
        .unwrap();

    let err = block_on(service.reorder(&draft.id, Some(&id("s1")), 0)).unwrap_err();
    assert_eq!(
        err,
        ServiceError::Validation(ValidationError::DraftNotPersisted(draft.id.clone()))
    );
    assert!(service.repo().calls().is_empty());
}

#[test]
fn groups_swap_at_root() {
    let service = loaded_service(site_package());

    block_on(service.reorder(&id("g2"), None, 0)).unwrap();

    assert_eq!(orders(&service, &["g2", "g1"]), vec![Some(1), Some(2)]);
    assert_eq!(row_ids(&service).first().map(String::as_str), Some("g2"));
    assert_dense(service.repo(), None, ElementType::Group);
}

fn new_task(parent: &str, name: &str) -> NewElement {
    NewElement {
        kind: ElementType::SimpleTask,
        parent_id: Some(id(parent)),
        name: name.to_string(),
        planned_start_date: day(1),
        planned_end_date: day(2),
        priority: Priority::Medium,
    }
}

#[test]
fn buckets_stay_dense_across_appends_moves_and_reorders() {
    let service = loaded_service(site_package());

    let appended = block_on(service.create_element(new_task("s2", "Backfill"))).unwrap();
    assert_eq!(appended.sort_order, Some(2));
    assert_dense(service.repo(), Some("s2"), ElementType::SimpleTask);

    block_on(service.reorder(&id("t1"), Some(&id("s2")), 0)).unwrap();
    assert_dense(service.repo(), Some("s2"), ElementType::SimpleTask);
    assert_eq!(
        service.repo().bucket_orders(Some("s1"), ElementType::SimpleTask),
        vec![Some(2), Some(3)]
    );

    block_on(service.reorder(&id("t3"), Some(&id("s1")), 0)).unwrap();
    assert_dense(service.repo(), Some("s1"), ElementType::SimpleTask);

    let gate = service.repo().gate_update("el-2");
    let draft = service
        .create_draft(ElementType::SimpleTask, Some(id("s1")))
        .unwrap();
    block_on(async {
        let direct = service.create_element(new_task("s1", "Curing"));
        let confirm = service.confirm_draft(&draft.id, "Stripping");
        let release = async {
            gate.send(()).unwrap();
        };
        let (direct, confirm, ()) = futures::join!(direct, confirm, release);
        direct.unwrap();
        confirm.unwrap();
    });

    assert_eq!(
        service.repo().bucket_orders(Some("s1"), ElementType::SimpleTask).len(),
        4
    );
    for parent in ["s1", "s2"] {
        assert_dense(service.repo(), Some(parent), ElementType::SimpleTask);
    }
    assert_dense(service.repo(), Some("s1"), ElementType::Milestone);
    assert_dense(service.repo(), Some("g1"), ElementType::Subgroup);
    assert_dense(service.repo(), None, ElementType::Group);
    assert!(service.store().overlay().is_empty());
}
