#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use futures::channel::oneshot;
use futures::executor::block_on;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use wbs_core::{
    CreateDependencyRequest, CreateTaskElementRequest, DependencyEdge, ElementId, ElementPatch,
    ElementType, EngineConfig, PackageId, RepoError, RepoResult, StoreEvent, TaskElement,
    TaskElementRecord, TaskRepository, WbsService,
};

pub const PACKAGE: &str = "pkg-1";

/// Remote call as observed by the fake.
#[derive(Debug, Clone, PartialEq)]
pub enum RepoCall {
    Create(CreateTaskElementRequest),
    Update(ElementId, ElementPatch),
    Delete(ElementId),
    CreateDependency(CreateDependencyRequest),
    List(PackageId),
}

#[derive(Default)]
struct FakeState {
    elements: Vec<TaskElement>,
    edges: Vec<DependencyEdge>,
    calls: Vec<RepoCall>,
    update_failures: HashMap<ElementId, RepoError>,
    delete_failures: HashMap<ElementId, RepoError>,
    create_failure: Option<RepoError>,
    dependency_failure: Option<RepoError>,
    list_failure: Option<RepoError>,
    update_gates: HashMap<ElementId, VecDeque<oneshot::Receiver<()>>>,
    dependency_gates: VecDeque<oneshot::Receiver<()>>,
    next_id: u64,
}

/// In-memory remote store that records calls and applies writes.
#[derive(Clone, Default)]
pub struct FakeRepo {
    state: Rc<RefCell<FakeState>>,
}

impl FakeRepo {
    pub fn with_elements(elements: Vec<TaskElement>) -> Self {
        let repo = Self::default();
        {
            let mut state = repo.state.borrow_mut();
            for element in &elements {
                for edge in &element.predecessor_edges {
                    if !state.edges.contains(edge) {
                        state.edges.push(edge.clone());
                    }
                }
            }
            state.elements = elements
                .into_iter()
                .map(|mut element| {
                    element.predecessor_edges.clear();
                    element.successor_edges.clear();
                    element
                })
                .collect();
        }
        repo
    }

    pub fn calls(&self) -> Vec<RepoCall> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn update_calls(&self) -> Vec<(ElementId, ElementPatch)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RepoCall::Update(id, patch) => Some((id, patch)),
                _ => None,
            })
            .collect()
    }

    pub fn delete_calls(&self) -> Vec<ElementId> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                RepoCall::Delete(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn list_call_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, RepoCall::List(_)))
            .count()
    }

    /// Next update of `id` fails with `err`.
    pub fn fail_next_update(&self, id: &str, err: RepoError) {
        self.state
            .borrow_mut()
            .update_failures
            .insert(ElementId::new(id), err);
    }

    /// Next delete of `id` fails with `err`.
    pub fn fail_next_delete(&self, id: &str, err: RepoError) {
        self.state
            .borrow_mut()
            .delete_failures
            .insert(ElementId::new(id), err);
    }

    pub fn fail_next_create(&self, err: RepoError) {
        self.state.borrow_mut().create_failure = Some(err);
    }

    pub fn fail_next_dependency(&self, err: RepoError) {
        self.state.borrow_mut().dependency_failure = Some(err);
    }

    pub fn fail_next_list(&self, err: RepoError) {
        self.state.borrow_mut().list_failure = Some(err);
    }

    /// Holds the next update of `id` until the returned sender fires.
    pub fn gate_update(&self, id: &str) -> oneshot::Sender<()> {
        let (sender, receiver) = oneshot::channel();
        self.state
            .borrow_mut()
            .update_gates
            .entry(ElementId::new(id))
            .or_default()
            .push_back(receiver);
        sender
    }

    /// Holds the next dependency create until the returned sender fires.
    pub fn gate_dependency(&self) -> oneshot::Sender<()> {
        let (sender, receiver) = oneshot::channel();
        self.state.borrow_mut().dependency_gates.push_back(receiver);
        sender
    }

    pub fn server_element(&self, id: &str) -> Option<TaskElement> {
        let id = ElementId::new(id);
        self.state
            .borrow()
            .elements
            .iter()
            .find(|element| element.id == id)
            .cloned()
    }

    /// Simulates a concurrent remote delete.
    pub fn remove_server_element(&self, id: &str) {
        let id = ElementId::new(id);
        self.state
            .borrow_mut()
            .elements
            .retain(|element| element.id != id);
    }

    pub fn server_edges(&self) -> Vec<DependencyEdge> {
        self.state.borrow().edges.clone()
    }

    /// Server-side sort orders of `parent`'s `kind` children, ascending.
    pub fn bucket_orders(&self, parent: Option<&str>, kind: ElementType) -> Vec<Option<i64>> {
        let parent = parent.map(ElementId::new);
        let mut orders: Vec<Option<i64>> = self
            .state
            .borrow()
            .elements
            .iter()
            .filter(|element| element.parent_id == parent && element.kind == kind)
            .map(|element| element.sort_order)
            .collect();
        orders.sort();
        orders
    }

    fn record_of(&self, element: &TaskElement) -> TaskElementRecord {
        let state = self.state.borrow();
        let dependencies = state
            .edges
            .iter()
            .filter(|edge| edge.predecessor_id == element.id || edge.successor_id == element.id)
            .cloned()
            .collect();
        to_record(element, dependencies)
    }
}

impl TaskRepository for FakeRepo {
    async fn create_task_element(
        &self,
        request: &CreateTaskElementRequest,
    ) -> RepoResult<TaskElementRecord> {
        let created = {
            let mut state = self.state.borrow_mut();
            state.calls.push(RepoCall::Create(request.clone()));
            if let Some(err) = state.create_failure.take() {
                return Err(err);
            }
            state.next_id += 1;
            let mut element = TaskElement::new(
                ElementId::new(format!("el-{}", state.next_id)),
                request.package_id.clone(),
                request.kind,
                request.name.clone(),
                request.planned_start_date,
                request.planned_end_date,
            )
            .with_parent(request.parent_id.clone());
            element.priority = request.priority;
            state.elements.push(element.clone());
            element
        };
        Ok(self.record_of(&created))
    }

    async fn update_task_element(
        &self,
        id: &ElementId,
        patch: &ElementPatch,
    ) -> RepoResult<TaskElementRecord> {
        let gate = {
            let mut state = self.state.borrow_mut();
            state.calls.push(RepoCall::Update(id.clone(), patch.clone()));
            state
                .update_gates
                .get_mut(id)
                .and_then(|gates| gates.pop_front())
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let updated = {
            let mut state = self.state.borrow_mut();
            if let Some(err) = state.update_failures.remove(id) {
                return Err(err);
            }
            let element = state
                .elements
                .iter_mut()
                .find(|element| &element.id == id)
                .ok_or_else(|| RepoError::NotFound(id.clone()))?;
            patch.apply_to(element);
            element.clone()
        };
        Ok(self.record_of(&updated))
    }

    async fn delete_task_element(&self, id: &ElementId) -> RepoResult<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(RepoCall::Delete(id.clone()));
        if let Some(err) = state.delete_failures.remove(id) {
            return Err(err);
        }
        let index = state
            .elements
            .iter()
            .position(|element| &element.id == id)
            .ok_or_else(|| RepoError::NotFound(id.clone()))?;
        state.elements.remove(index);
        state
            .edges
            .retain(|edge| &edge.predecessor_id != id && &edge.successor_id != id);
        Ok(())
    }

    async fn create_task_dependency(
        &self,
        request: &CreateDependencyRequest,
    ) -> RepoResult<DependencyEdge> {
        let gate = {
            let mut state = self.state.borrow_mut();
            state.calls.push(RepoCall::CreateDependency(request.clone()));
            state.dependency_gates.pop_front()
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let mut state = self.state.borrow_mut();
        if let Some(err) = state.dependency_failure.take() {
            return Err(err);
        }
        state.next_id += 1;
        let mut edge = DependencyEdge::new(
            request.predecessor_id.clone(),
            request.successor_id.clone(),
            request.kind,
            request.lag_days,
        );
        edge.id = Some(format!("dep-{}", state.next_id));
        state.edges.push(edge.clone());
        Ok(edge)
    }

    async fn list_task_elements_by_package(
        &self,
        package_id: &PackageId,
    ) -> RepoResult<Vec<TaskElementRecord>> {
        let elements = {
            let mut state = self.state.borrow_mut();
            state.calls.push(RepoCall::List(package_id.clone()));
            if let Some(err) = state.list_failure.take() {
                return Err(err);
            }
            state
                .elements
                .iter()
                .filter(|element| &element.package_id == package_id)
                .cloned()
                .collect::<Vec<_>>()
        };
        Ok(elements
            .iter()
            .map(|element| self.record_of(element))
            .collect())
    }
}

pub fn to_record(element: &TaskElement, dependencies: Vec<DependencyEdge>) -> TaskElementRecord {
    TaskElementRecord {
        id: element.id.clone(),
        name: Some(element.name.clone()),
        kind: element.kind,
        parent_id: element.parent_id.clone(),
        package_id: Some(element.package_id.clone()),
        planned_start_date: Some(element.planned_start_date),
        planned_end_date: Some(element.planned_end_date),
        priority: Some(element.priority),
        status: Some(element.status),
        sort_order: element.sort_order,
        progress_percentage: Some(f64::from(element.progress_percentage)),
        predecessor_edges: Vec::new(),
        successor_edges: Vec::new(),
        dependencies,
        comments_count: Some(element.comments_count),
        assignee_refs: element.assignee_refs.clone(),
        updated_at: element.updated_at,
        children: Vec::new(),
    }
}

/// Day `offset` of the test calendar, at midnight UTC.
pub fn day(offset: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap() + Duration::days(offset)
}

pub fn id(value: &str) -> ElementId {
    ElementId::new(value)
}

pub fn element(
    id: &str,
    kind: ElementType,
    parent: Option<&str>,
    sort_order: Option<i64>,
) -> TaskElement {
    let mut element = TaskElement::new(
        ElementId::new(id),
        PackageId::new(PACKAGE),
        kind,
        format!("{id} name"),
        day(0),
        day(3),
    )
    .with_parent(parent.map(ElementId::new));
    element.sort_order = sort_order;
    element
}

/// Site package used by most tests.
///
/// ```text
/// g1 (GROUP)
///   s1 (SUBGROUP)
///     t1, t2, t3 (SIMPLE_TASK, orders 1..3)
///     m1 (MILESTONE)
///   s2 (SUBGROUP)
///     t4 (SIMPLE_TASK)
///   t5 (SIMPLE_TASK)
/// g2 (GROUP)
/// ```
pub fn site_package() -> Vec<TaskElement> {
    vec![
        element("g1", ElementType::Group, None, Some(1)),
        element("g2", ElementType::Group, None, Some(2)),
        element("s1", ElementType::Subgroup, Some("g1"), Some(1)),
        element("s2", ElementType::Subgroup, Some("g1"), Some(2)),
        element("t1", ElementType::SimpleTask, Some("s1"), Some(1)),
        element("t2", ElementType::SimpleTask, Some("s1"), Some(2)),
        element("t3", ElementType::SimpleTask, Some("s1"), Some(3)),
        element("m1", ElementType::Milestone, Some("s1"), Some(1)),
        element("t4", ElementType::SimpleTask, Some("s2"), Some(1)),
        element("t5", ElementType::SimpleTask, Some("g1"), Some(1)),
    ]
}

/// Service loaded from `elements`, with the load call cleared.
pub fn loaded_service(elements: Vec<TaskElement>) -> WbsService<FakeRepo> {
    let service = WbsService::new(
        FakeRepo::with_elements(elements),
        PackageId::new(PACKAGE),
        EngineConfig::default(),
    );
    block_on(service.refetch()).unwrap();
    service.repo().clear_calls();
    service
}

/// Collects every event emitted by `service`.
pub fn record_events(service: &WbsService<FakeRepo>) -> Rc<RefCell<Vec<StoreEvent>>> {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    service.subscribe(move |event| sink.borrow_mut().push(event.clone()));
    events
}

/// Ids of the current list rows, in display order.
pub fn row_ids(service: &WbsService<FakeRepo>) -> Vec<String> {
    service
        .list_rows()
        .into_iter()
        .map(|row| row.id.as_str().to_string())
        .collect()
}

/// Asserts a bucket is numbered `1..n` server-side.
pub fn assert_dense(repo: &FakeRepo, parent: Option<&str>, kind: ElementType) {
    let orders = repo.bucket_orders(parent, kind);
    let expected: Vec<Option<i64>> = (1..=orders.len() as i64).map(Some).collect();
    assert_eq!(orders, expected, "bucket {parent:?}/{kind} is not dense");
}
