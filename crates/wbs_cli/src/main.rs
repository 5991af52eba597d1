//! Snapshot viewer for a task package.
//!
//! # Responsibility
//! - Load a package export (flat or nested JSON records) through the engine.
//! - Print the list rows and chart rows the engine derives from it.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use wbs_core::{
    init_logging, CreateDependencyRequest, CreateTaskElementRequest, DependencyEdge, ElementId,
    ElementPatch, EngineConfig, PackageId, RepoError, RepoResult, TaskElementRecord,
    TaskRepository, WbsService,
};

#[derive(Debug, Parser)]
#[command(
    name = "wbs_cli",
    about = "Print the list and chart rows derived from a task package export",
    version
)]
struct Cli {
    /// Package export: a JSON array of task element records, flat or nested.
    package_file: PathBuf,

    /// Package to load. Defaults to the first record's `packageId`.
    package_id: Option<String>,

    /// Engine configuration as JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Read-only repository over one exported package file.
struct SnapshotRepository {
    records: Vec<TaskElementRecord>,
}

impl SnapshotRepository {
    fn read_only<T>() -> RepoResult<T> {
        Err(RepoError::Transport("snapshot repository is read-only".to_string()))
    }
}

impl TaskRepository for SnapshotRepository {
    async fn create_task_element(
        &self,
        _request: &CreateTaskElementRequest,
    ) -> RepoResult<TaskElementRecord> {
        Self::read_only()
    }

    async fn update_task_element(
        &self,
        _id: &ElementId,
        _patch: &ElementPatch,
    ) -> RepoResult<TaskElementRecord> {
        Self::read_only()
    }

    async fn delete_task_element(&self, _id: &ElementId) -> RepoResult<()> {
        Self::read_only()
    }

    async fn create_task_dependency(
        &self,
        _request: &CreateDependencyRequest,
    ) -> RepoResult<DependencyEdge> {
        Self::read_only()
    }

    async fn list_task_elements_by_package(
        &self,
        _package_id: &PackageId,
    ) -> RepoResult<Vec<TaskElementRecord>> {
        Ok(self.records.clone())
    }
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("wbs_cli: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Cli) -> Result<(), String> {
    let config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|err| format!("cannot read config `{}`: {err}", path.display()))?;
            EngineConfig::from_json_str(&raw)
                .map_err(|err| format!("invalid config `{}`: {err}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    init_logging(&config.logging)?;

    let raw = std::fs::read_to_string(&args.package_file).map_err(|err| {
        format!("cannot read package `{}`: {err}", args.package_file.display())
    })?;
    let records: Vec<TaskElementRecord> = serde_json::from_str(&raw).map_err(|err| {
        format!("invalid package `{}`: {err}", args.package_file.display())
    })?;

    let package_id = args
        .package_id
        .map(PackageId::new)
        .or_else(|| records.iter().find_map(|record| record.package_id.clone()))
        .ok_or("package id missing: pass it as the second argument")?;
    log::info!(
        "event=cli_load module=cli status=start package_id={} record_count={}",
        package_id,
        records.len()
    );

    let service = WbsService::new(SnapshotRepository { records }, package_id, config);
    futures::executor::block_on(service.refetch()).map_err(|err| service.user_message(&err))?;

    let output = serde_json::json!({
        "version": wbs_core::core_version(),
        "list": service.list_rows(),
        "gantt": service.gantt_rows(),
    });
    let rendered = serde_json::to_string_pretty(&output).map_err(|err| err.to_string())?;
    println!("{rendered}");
    Ok(())
}
