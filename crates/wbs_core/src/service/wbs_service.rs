//! WBS use-case service.
//!
//! # Responsibility
//! - Run every user intent (edit, reorder, draft, confirm, delete, link)
//!   against the local store and the remote repository.
//! - Show optimistic state immediately and reconcile it with the server
//!   outcome.
//! - Notify subscribers after each state change.
//!
//! # Invariants
//! - Validation runs before any local state change or remote call.
//! - A store borrow is never held across an `.await`.
//! - A failed write leaves the view equal to the authoritative cache plus
//!   any newer pending patches.
//! - A failed draft confirm leaves no draft behind.
//! - Remote error text is surfaced verbatim when present.
//!
//! # See also
//! - `crate::overlay` for patch generations.
//! - `crate::ordering` for sibling reindexing.

use crate::config::EngineConfig;
use crate::dependency::{dependency_candidates, validate_new_edge, DependencyGraph};
use crate::events::{EventHub, StoreEvent, SubscriptionId};
use crate::gantt::{GanttRow, ListRow};
use crate::hierarchy::{subtree_post_order, HierarchyEntry};
use crate::model::dependency::{DependencyEdge, DependencyType};
use crate::model::element::{
    ElementId, ElementPatch, ElementType, PackageId, Priority, TaskElement,
};
use crate::model::record::{narrow_record, narrow_records};
use crate::model::validation::ValidationError;
use crate::ordering::{self, ensure_not_descendant, next_sort_order, validate_placement, SiblingBucket};
use crate::overlay::OverlayTicket;
use crate::repo::task_repo::{
    CreateDependencyRequest, CreateTaskElementRequest, RepoError, TaskRepository,
};
use crate::store::WbsStore;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::{debug, info, warn};
use std::cell::{Ref, RefCell};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Service error for WBS use-cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Rejected locally; nothing was sent and nothing changed.
    Validation(ValidationError),
    /// Remote call failed; optimistic state has been rolled back.
    Remote(RepoError),
}

impl ServiceError {
    /// Text to show the user: the server's own message when it sent one,
    /// otherwise `generic` for remote failures.
    pub fn user_message(&self, generic: &str) -> String {
        match self {
            Self::Validation(err) => err.to_string(),
            Self::Remote(err) => err
                .server_message()
                .map(str::to_string)
                .unwrap_or_else(|| generic.to_string()),
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Remote(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Remote(err) => Some(err),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        Self::Remote(value)
    }
}

/// Result type used by service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Delete scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
    /// Delete only the node. The server may refuse if children remain.
    NodeOnly,
    /// Delete the node and its subtree, children first.
    Cascade,
}

/// Direct create input, bypassing the draft flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewElement {
    pub kind: ElementType,
    pub parent_id: Option<ElementId>,
    pub name: String,
    pub planned_start_date: DateTime<Utc>,
    pub planned_end_date: DateTime<Utc>,
    pub priority: Priority,
}

/// Per-sibling result of a reorder batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReorderOutcome {
    /// Siblings whose write was confirmed.
    pub updated: Vec<ElementId>,
    /// Siblings whose write was rejected and rolled back.
    pub failed: Vec<ElementId>,
    /// Whether the reconciling refetch succeeded.
    pub refetched: bool,
}

/// WBS service facade for one task package.
pub struct WbsService<R: TaskRepository> {
    repo: R,
    config: EngineConfig,
    store: RefCell<WbsStore>,
    events: EventHub,
}

impl<R: TaskRepository> WbsService<R> {
    /// Creates a service with an empty cache. Call [`Self::refetch`] to load.
    pub fn new(repo: R, package_id: PackageId, config: EngineConfig) -> Self {
        let store = WbsStore::new(package_id, config.expand_groups_on_load);
        Self {
            repo,
            config,
            store: RefCell::new(store),
            events: EventHub::new(),
        }
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn package_id(&self) -> PackageId {
        self.store.borrow().package_id().clone()
    }

    /// Read access to the underlying state. Do not hold across an `.await`.
    pub fn store(&self) -> Ref<'_, WbsStore> {
        self.store.borrow()
    }

    /// User-facing text for `err`, falling back to the configured generic
    /// message.
    pub fn user_message(&self, err: &ServiceError) -> String {
        err.user_message(&self.config.generic_error_message)
    }

    pub fn subscribe(&self, listener: impl Fn(&StoreEvent) + 'static) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Element as currently shown: draft, or cache with pending patches.
    pub fn element(&self, id: &ElementId) -> Option<TaskElement> {
        self.store.borrow().element(id)
    }

    pub fn ordered_hierarchy(&self) -> Vec<HierarchyEntry> {
        self.store.borrow().ordered_hierarchy()
    }

    pub fn gantt_rows(&self) -> Vec<GanttRow> {
        self.store.borrow().gantt_rows(self.config.min_bar_span_days)
    }

    pub fn list_rows(&self) -> Vec<ListRow> {
        self.store.borrow().list_rows()
    }

    /// Persisted incoming edges of `id`.
    pub fn predecessors(&self, id: &ElementId) -> Vec<DependencyEdge> {
        let graph = self.store.borrow().dependency_graph();
        graph.predecessors(id).into_iter().cloned().collect()
    }

    /// Persisted outgoing edges of `id`.
    pub fn successors(&self, id: &ElementId) -> Vec<DependencyEdge> {
        let graph = self.store.borrow().dependency_graph();
        graph.successors(id).into_iter().cloned().collect()
    }

    /// Elements that may be linked to `id`.
    pub fn dependency_candidates(&self, id: &ElementId) -> ServiceResult<Vec<TaskElement>> {
        let store = self.store.borrow();
        let node = store
            .element(id)
            .ok_or_else(|| ValidationError::UnknownElement(id.clone()))?;
        let view = store.persisted_view();
        Ok(dependency_candidates(&view, &node)
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn is_expanded(&self, id: &ElementId) -> bool {
        self.store.borrow().is_expanded(id)
    }

    /// Flips a group's expansion and returns the new state.
    ///
    /// Only groups collapse. Any other kind is left alone and reports
    /// `false`, since it never holds an expansion state.
    pub fn toggle_group(&self, id: &ElementId) -> ServiceResult<bool> {
        let expanded = {
            let mut store = self.store.borrow_mut();
            let element = store
                .element(id)
                .ok_or_else(|| ValidationError::UnknownElement(id.clone()))?;
            if element.kind != ElementType::Group {
                debug!(
                    "event=group_toggle module=service status=skipped element_id={} kind={}",
                    id, element.kind
                );
                return Ok(store.is_expanded(id));
            }
            store.toggle_group(id)
        };
        self.events.emit(&StoreEvent::ExpansionChanged);
        Ok(expanded)
    }

    pub fn expand_all(&self) {
        self.store.borrow_mut().expand_all();
        self.events.emit(&StoreEvent::ExpansionChanged);
    }

    pub fn collapse_all(&self) {
        self.store.borrow_mut().collapse_all();
        self.events.emit(&StoreEvent::ExpansionChanged);
    }

    /// Replaces the authoritative cache with the server's current package.
    ///
    /// Returns the number of elements loaded.
    pub async fn refetch(&self) -> ServiceResult<usize> {
        let package_id = self.package_id();
        let started = Instant::now();
        let records = match self.repo.list_task_elements_by_package(&package_id).await {
            Ok(records) => records,
            Err(err) => {
                warn!(
                    "event=package_fetch module=service status=error package_id={} duration_ms={} error={}",
                    package_id,
                    started.elapsed().as_millis(),
                    err
                );
                return Err(err.into());
            }
        };

        let elements = narrow_records(records, &package_id, Utc::now());
        let element_count = elements.len();
        self.store.borrow_mut().replace_elements(elements);
        info!(
            "event=package_fetch module=service status=ok package_id={} element_count={} duration_ms={}",
            package_id,
            element_count,
            started.elapsed().as_millis()
        );
        self.events.emit(&StoreEvent::Loaded { element_count });
        Ok(element_count)
    }

    /// Applies a partial update optimistically, then persists it.
    ///
    /// Draft ids are edited locally; a committed non-blank name on a draft
    /// confirms it instead.
    pub async fn update_element(&self, id: &ElementId, patch: ElementPatch) -> ServiceResult<()> {
        if id.is_draft() {
            return self.edit_draft(id, patch).await;
        }

        let (ticket, patch) = {
            let mut store = self.store.borrow_mut();
            let current = store
                .element(id)
                .ok_or_else(|| ValidationError::UnknownElement(id.clone()))?;
            let mut patch = patch.normalized_for(&current);
            if let Some(name) = patch.name.take() {
                patch.name = Some(normalize_name(&name)?);
            }
            if let Some(parent_id) = &patch.parent_id {
                let view = store.persisted_view();
                validate_placement(&view, current.kind, &current.package_id, parent_id.as_ref())?;
                if let Some(parent_id) = parent_id {
                    ensure_not_descendant(&view, id, parent_id)?;
                }
            }
            if patch.is_empty() {
                return Ok(());
            }
            (store.apply_patch(id, &patch), patch)
        };
        self.events.emit(&StoreEvent::PatchApplied(id.clone()));

        let started = Instant::now();
        let result = self.repo.update_task_element(id, &patch).await;
        let success = result.is_ok();
        {
            let mut store = self.store.borrow_mut();
            if success {
                store.confirm_patch(&ticket);
            } else {
                store.discard_patch(&ticket);
            }
        }
        self.events.emit(&StoreEvent::PatchSettled {
            id: id.clone(),
            success,
        });

        match result {
            Ok(_) => {
                info!(
                    "event=element_update module=service status=ok element_id={} duration_ms={}",
                    id,
                    started.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                warn!(
                    "event=element_update module=service status=error element_id={} duration_ms={} error={}",
                    id,
                    started.elapsed().as_millis(),
                    err
                );
                Err(err.into())
            }
        }
    }

    async fn edit_draft(&self, id: &ElementId, patch: ElementPatch) -> ServiceResult<()> {
        let commit_name = {
            let mut store = self.store.borrow_mut();
            let current = store
                .drafts()
                .get(id)
                .cloned()
                .ok_or_else(|| ValidationError::UnknownDraft(id.clone()))?;
            let mut local = patch.normalized_for(&current);
            let commit_name = local
                .name
                .take()
                .map(|name| name.trim().to_string())
                .filter(|name| !name.is_empty() && name != &current.name);
            if !local.is_empty() {
                store.drafts_mut().edit(id, &local);
            }
            commit_name
        };

        match commit_name {
            Some(name) => self.confirm_draft(id, &name).await.map(|_| ()),
            None => {
                self.events.emit(&StoreEvent::PatchApplied(id.clone()));
                Ok(())
            }
        }
    }

    /// Moves `moved_id` to `new_index` among the same-type children of
    /// `new_parent_id` and persists the changed sibling orders in parallel.
    ///
    /// Per-sibling failures roll back only that sibling. A reconciling
    /// refetch always follows the batch.
    pub async fn reorder(
        &self,
        moved_id: &ElementId,
        new_parent_id: Option<&ElementId>,
        new_index: usize,
    ) -> ServiceResult<ReorderOutcome> {
        let writes: Vec<(ElementId, ElementPatch, OverlayTicket)> = {
            let mut store = self.store.borrow_mut();
            let patches = ordering::reorder(&store.persisted_view(), moved_id, new_parent_id, new_index)?;
            patches
                .into_iter()
                .map(|write| {
                    let patch = write.to_element_patch();
                    let ticket = store.apply_patch(&write.id, &patch);
                    (write.id, patch, ticket)
                })
                .collect()
        };
        if writes.is_empty() {
            debug!(
                "event=reorder module=service status=noop element_id={}",
                moved_id
            );
            return Ok(ReorderOutcome::default());
        }
        for (id, _, _) in &writes {
            self.events.emit(&StoreEvent::PatchApplied(id.clone()));
        }

        let started = Instant::now();
        let results = join_all(
            writes
                .iter()
                .map(|(id, patch, _)| self.repo.update_task_element(id, patch)),
        )
        .await;

        let mut outcome = ReorderOutcome::default();
        {
            let mut store = self.store.borrow_mut();
            for ((id, _, ticket), result) in writes.iter().zip(results) {
                match result {
                    Ok(_) => {
                        store.confirm_patch(ticket);
                        outcome.updated.push(id.clone());
                    }
                    Err(err) => {
                        warn!(
                            "event=reorder_write module=service status=error element_id={} error={}",
                            id, err
                        );
                        store.discard_patch(ticket);
                        outcome.failed.push(id.clone());
                    }
                }
            }
        }
        info!(
            "event=reorder module=service status={} element_id={} updated={} failed={} duration_ms={}",
            if outcome.failed.is_empty() { "ok" } else { "partial" },
            moved_id,
            outcome.updated.len(),
            outcome.failed.len(),
            started.elapsed().as_millis()
        );

        outcome.refetched = match self.refetch().await {
            Ok(_) => true,
            Err(err) => {
                warn!(
                    "event=reorder_refetch module=service status=error element_id={} error={}",
                    moved_id, err
                );
                false
            }
        };
        self.events.emit(&StoreEvent::Reordered {
            moved: moved_id.clone(),
            failed: outcome.failed.len(),
        });
        Ok(outcome)
    }

    /// Adds a local, unnamed draft under `parent_id`. No remote call.
    pub fn create_draft(
        &self,
        kind: ElementType,
        parent_id: Option<ElementId>,
    ) -> ServiceResult<TaskElement> {
        let draft = {
            let mut store = self.store.borrow_mut();
            let package_id = store.package_id().clone();
            validate_placement(&store.persisted_view(), kind, &package_id, parent_id.as_ref())?;
            store.drafts_mut().create(
                package_id,
                kind,
                parent_id,
                Utc::now(),
                self.config.draft_duration_days,
            )
        };
        debug!(
            "event=draft_create module=service status=ok draft_id={} kind={}",
            draft.id, draft.kind
        );
        self.events.emit(&StoreEvent::DraftCreated(draft.id.clone()));
        Ok(draft)
    }

    /// Drops a draft locally. A draft whose confirm is in flight cannot be
    /// discarded.
    pub fn discard_draft(&self, id: &ElementId) -> ServiceResult<()> {
        {
            let mut store = self.store.borrow_mut();
            if store.drafts().is_confirming(id) {
                return Err(ValidationError::DraftConfirmInFlight(id.clone()).into());
            }
            store
                .drafts_mut()
                .remove(id)
                .ok_or_else(|| ValidationError::UnknownDraft(id.clone()))?;
        }
        debug!(
            "event=draft_discard module=service status=ok draft_id={}",
            id
        );
        self.events.emit(&StoreEvent::DraftDiscarded(id.clone()));
        Ok(())
    }

    /// Persists a draft under `name`.
    ///
    /// On success the draft is replaced by the created element, which is
    /// stamped with the next sibling order, and the package is refetched.
    /// On any failure after validation the draft is discarded.
    pub async fn confirm_draft(&self, draft_id: &ElementId, name: &str) -> ServiceResult<TaskElement> {
        let name = normalize_name(name)?;
        let prepared = {
            let mut store = self.store.borrow_mut();
            let draft = store.drafts_mut().begin_confirm(draft_id)?;
            let placement = validate_placement(
                &store.persisted_view(),
                draft.kind,
                &draft.package_id,
                draft.parent_id.as_ref(),
            );
            match placement {
                Ok(()) => {
                    store
                        .drafts_mut()
                        .edit(draft_id, &ElementPatch::rename(name.clone()));
                    Ok(CreateTaskElementRequest::from_draft(
                        &draft,
                        name,
                        &self.config.created_by,
                    ))
                }
                Err(err) => {
                    store.drafts_mut().remove(draft_id);
                    Err(err)
                }
            }
        };

        let request = match prepared {
            Ok(request) => request,
            Err(err) => {
                warn!(
                    "event=draft_confirm module=service status=error draft_id={} error={}",
                    draft_id, err
                );
                self.events.emit(&StoreEvent::DraftDiscarded(draft_id.clone()));
                return Err(err.into());
            }
        };
        self.events.emit(&StoreEvent::PatchApplied(draft_id.clone()));
        self.persist_new(&request, Some(draft_id)).await
    }

    /// Creates an element directly, without a draft.
    pub async fn create_element(&self, new: NewElement) -> ServiceResult<TaskElement> {
        let name = normalize_name(&new.name)?;
        let request = {
            let store = self.store.borrow();
            validate_placement(
                &store.persisted_view(),
                new.kind,
                store.package_id(),
                new.parent_id.as_ref(),
            )?;
            let planned_end_date = if new.kind == ElementType::Milestone {
                new.planned_start_date
            } else {
                new.planned_end_date
            };
            CreateTaskElementRequest {
                package_id: store.package_id().clone(),
                parent_id: new.parent_id,
                name,
                kind: new.kind,
                planned_start_date: new.planned_start_date,
                planned_end_date,
                priority: new.priority,
                created_by: self.config.created_by.clone(),
            }
        };
        self.persist_new(&request, None).await
    }

    /// Create, stamp `sort_order`, refetch.
    ///
    /// The stamp sits in the overlay while its write is in flight, so a
    /// concurrent append to the same bucket counts it.
    async fn persist_new(
        &self,
        request: &CreateTaskElementRequest,
        draft_id: Option<&ElementId>,
    ) -> ServiceResult<TaskElement> {
        let package_id = self.package_id();
        let started = Instant::now();
        let created = self
            .repo
            .create_task_element(request)
            .await
            .map_err(ServiceError::from)
            .and_then(|record| {
                narrow_record(record, &package_id, Utc::now()).map_err(ServiceError::from)
            });

        let mut element = match created {
            Ok(element) => element,
            Err(err) => {
                if let Some(draft_id) = draft_id {
                    self.store.borrow_mut().drafts_mut().remove(draft_id);
                    self.events.emit(&StoreEvent::DraftDiscarded(draft_id.clone()));
                }
                warn!(
                    "event=element_create module=service status=error kind={} duration_ms={} error={}",
                    request.kind,
                    started.elapsed().as_millis(),
                    err
                );
                return Err(err);
            }
        };

        let (sort_order, stamp, ticket) = {
            let mut store = self.store.borrow_mut();
            if let Some(draft_id) = draft_id {
                store.drafts_mut().remove(draft_id);
            }
            let sort_order = next_sort_order(&store.persisted_view(), &SiblingBucket::of(&element));
            store.upsert_into_cache(element.clone());
            let stamp = ElementPatch::sort_order(sort_order);
            let ticket = store.apply_patch(&element.id, &stamp);
            (sort_order, stamp, ticket)
        };
        info!(
            "event=element_create module=service status=ok element_id={} kind={} duration_ms={}",
            element.id,
            element.kind,
            started.elapsed().as_millis()
        );
        if let Some(draft_id) = draft_id {
            self.events.emit(&StoreEvent::DraftConfirmed {
                draft_id: draft_id.clone(),
                element_id: element.id.clone(),
            });
        }

        match self.repo.update_task_element(&element.id, &stamp).await {
            Ok(_) => {
                self.store.borrow_mut().confirm_patch(&ticket);
                stamp.apply_to(&mut element);
            }
            Err(err) => {
                self.store.borrow_mut().discard_patch(&ticket);
                warn!(
                    "event=sort_order_stamp module=service status=error element_id={} sort_order={} error={}",
                    element.id, sort_order, err
                );
            }
        }

        if let Err(err) = self.refetch().await {
            warn!(
                "event=element_create_refetch module=service status=error element_id={} error={}",
                element.id, err
            );
        }
        Ok(element)
    }

    /// Deletes an element, or its whole subtree in [`DeleteMode::Cascade`].
    ///
    /// Targets are hidden at once. A cascade deletes children before their
    /// parent. A target the server no longer has counts as deleted and
    /// triggers a reconciling refetch. Any other failure restores every
    /// target not yet deleted.
    pub async fn delete_element(&self, id: &ElementId, mode: DeleteMode) -> ServiceResult<()> {
        if id.is_draft() {
            return self.discard_draft(id);
        }

        let (targets, drafts_below) = {
            let mut store = self.store.borrow_mut();
            if store.element(id).is_none() {
                return Err(ValidationError::UnknownElement(id.clone()).into());
            }
            let subtree = match mode {
                DeleteMode::NodeOnly => vec![id.clone()],
                DeleteMode::Cascade => subtree_post_order(&store.view_elements(), id),
            };
            let (drafts_below, targets): (Vec<ElementId>, Vec<ElementId>) =
                subtree.into_iter().partition(ElementId::is_draft);
            store.hide_pending_deletes(&targets);
            (targets, drafts_below)
        };
        self.events.emit(&StoreEvent::DeletePending(targets.clone()));

        let mut stale = false;
        for (index, target) in targets.iter().enumerate() {
            let started = Instant::now();
            match self.repo.delete_task_element(target).await {
                Ok(()) => {
                    self.store.borrow_mut().remove_from_cache(target);
                    info!(
                        "event=element_delete module=service status=ok element_id={} duration_ms={}",
                        target,
                        started.elapsed().as_millis()
                    );
                    self.events.emit(&StoreEvent::Deleted(target.clone()));
                }
                Err(err) if err.is_not_found() => {
                    stale = true;
                    self.store.borrow_mut().remove_from_cache(target);
                    info!(
                        "event=element_delete module=service status=stale element_id={} duration_ms={}",
                        target,
                        started.elapsed().as_millis()
                    );
                    self.events.emit(&StoreEvent::Deleted(target.clone()));
                }
                Err(err) => {
                    let remaining = targets[index..].to_vec();
                    self.store.borrow_mut().restore_pending_deletes(&remaining);
                    warn!(
                        "event=element_delete module=service status=error element_id={} restored={} duration_ms={} error={}",
                        target,
                        remaining.len(),
                        started.elapsed().as_millis(),
                        err
                    );
                    self.events.emit(&StoreEvent::DeleteRolledBack(remaining));
                    if index > 0 || stale {
                        if let Err(refetch_err) = self.refetch().await {
                            warn!(
                                "event=element_delete_refetch module=service status=error element_id={} error={}",
                                id, refetch_err
                            );
                        }
                    }
                    return Err(err.into());
                }
            }
        }

        {
            let mut store = self.store.borrow_mut();
            for draft_id in &drafts_below {
                store.drafts_mut().remove(draft_id);
            }
        }
        for draft_id in drafts_below {
            self.events.emit(&StoreEvent::DraftDiscarded(draft_id));
        }

        if stale {
            if let Err(err) = self.refetch().await {
                warn!(
                    "event=element_delete_refetch module=service status=error element_id={} error={}",
                    id, err
                );
            }
        }
        Ok(())
    }

    /// Links `predecessor -> successor`.
    ///
    /// The edge is shown as pending until the server answers; it becomes a
    /// persisted edge on success and disappears on failure.
    pub async fn add_dependency(
        &self,
        predecessor: &ElementId,
        successor: &ElementId,
        kind: DependencyType,
        lag_days: i32,
    ) -> ServiceResult<DependencyEdge> {
        {
            let mut store = self.store.borrow_mut();
            let view = store.persisted_view();
            let graph = DependencyGraph::from_elements(&view);
            validate_new_edge(&graph, store.pending_edges(), predecessor, successor)?;
            let mut package = None;
            for id in [predecessor, successor] {
                if id.is_draft() {
                    return Err(ValidationError::DraftNotPersisted(id.clone()).into());
                }
                let element = view
                    .iter()
                    .find(|element| &element.id == id)
                    .ok_or_else(|| ValidationError::UnknownElement(id.clone()))?;
                match &package {
                    None => package = Some(element.package_id.clone()),
                    Some(expected) if expected != &element.package_id => {
                        return Err(ValidationError::CrossPackage {
                            element: id.clone(),
                            expected: expected.clone(),
                            actual: element.package_id.clone(),
                        }
                        .into());
                    }
                    Some(_) => {}
                }
            }
            store.pending_edges_mut().insert(DependencyEdge::new(
                predecessor.clone(),
                successor.clone(),
                kind,
                lag_days,
            ));
        }
        self.events.emit(&StoreEvent::DependencyPending {
            predecessor: predecessor.clone(),
            successor: successor.clone(),
        });

        let request = CreateDependencyRequest {
            predecessor_id: predecessor.clone(),
            successor_id: successor.clone(),
            kind,
            lag_days,
            created_by: self.config.created_by.clone(),
        };
        let started = Instant::now();
        let result = self.repo.create_task_dependency(&request).await;
        {
            let mut store = self.store.borrow_mut();
            store.pending_edges_mut().remove(predecessor, successor);
            if let Ok(edge) = &result {
                store.attach_edge(edge);
            }
        }
        self.events.emit(&StoreEvent::DependencySettled {
            predecessor: predecessor.clone(),
            successor: successor.clone(),
            success: result.is_ok(),
        });

        match result {
            Ok(edge) => {
                info!(
                    "event=dependency_create module=service status=ok predecessor_id={} successor_id={} duration_ms={}",
                    predecessor,
                    successor,
                    started.elapsed().as_millis()
                );
                Ok(edge)
            }
            Err(err) => {
                warn!(
                    "event=dependency_create module=service status=error predecessor_id={} successor_id={} duration_ms={} error={}",
                    predecessor,
                    successor,
                    started.elapsed().as_millis(),
                    err
                );
                Err(err.into())
            }
        }
    }
}

fn normalize_name(name: &str) -> Result<String, ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankName);
    }
    Ok(trimmed.to_string())
}
