// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Consolidator (§4.F): analyze per-participant diffs, detect conflicts,
//! derive a recommended strategy, resolve into a merge plan, and export it
//! onto a fresh checkout of the base revision.

use crate::event_bus::EventBus;
use orc_adapters::{DiffHunk, FileDiff, VcsAdapter};
use orc_core::{
    Clock, Consolidation, ConsolidationId, ConsolidationStatus, ConflictKind, ConflictRecord, Event,
    FileMetrics, FileQuality, Hunk, IdGen, MergePlan, MergePreview, MergeResult, OrcError,
    PlannedFile, QualityScore, Resolution, ResolutionAction, WorkerId,
};
use orc_storage::ConsolidationStore;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One worker's contribution to a consolidation: its worktree and branch.
#[derive(Debug, Clone)]
pub struct Participant {
    pub worker: WorkerId,
    pub worktree: PathBuf,
    pub branch: String,
}

/// The Consolidator: merges the divergent work of several workers into one
/// integrated revision on a target branch.
pub struct Consolidator<V, I>
where
    V: VcsAdapter,
    I: IdGen,
{
    store: Arc<ConsolidationStore>,
    events: EventBus,
    vcs: V,
    clock: Arc<dyn Clock>,
    id_gen: I,
}

impl<V, I> Consolidator<V, I>
where
    V: VcsAdapter,
    I: IdGen,
{
    pub fn new(store: ConsolidationStore, events: EventBus, vcs: V, clock: Arc<dyn Clock>, id_gen: I) -> Self {
        Self {
            store: Arc::new(store),
            events,
            vcs,
            clock,
            id_gen,
        }
    }

    /// Analyze every participant's diff against `base_revision`, score each
    /// changed file, detect cross-participant conflicts, and persist the
    /// resulting preview. Transitions `pending -> analyzing -> analyzed`.
    pub async fn analyze(
        &self,
        project: PathBuf,
        base_revision: String,
        participants: Vec<Participant>,
    ) -> Result<ConsolidationId, OrcError> {
        let id = ConsolidationId::new(self.id_gen.next());
        let now = self.clock.epoch_ms();
        let mut consolidation = Consolidation::new(
            id.clone(),
            project,
            base_revision.clone(),
            participants.iter().map(|p| p.worker.clone()).collect(),
            now,
        );
        consolidation.set_status(ConsolidationStatus::Analyzing);
        self.persist(&consolidation)?;
        self.events.publish(Event::ConsolidationAnalyzing { id: id.clone() });

        let mut per_path: HashMap<PathBuf, Vec<(WorkerId, FileDiff)>> = HashMap::new();
        for participant in &participants {
            let diffs = self
                .vcs
                .diff(&participant.worktree, &base_revision)
                .await
                .map_err(|e| OrcError::VcsFailure(e.to_string()))?;
            for diff in diffs {
                per_path
                    .entry(diff.path.clone())
                    .or_default()
                    .push((participant.worker.clone(), diff));
            }
        }

        let mut files = Vec::new();
        for (path, entries) in &per_path {
            let metrics: Vec<(WorkerId, FileMetrics)> = entries
                .iter()
                .map(|(worker, diff)| (worker.clone(), file_metrics(diff)))
                .collect();
            let single = metrics.len() == 1;
            for (worker, diff) in entries {
                let this_metrics = metrics
                    .iter()
                    .find(|(w, _)| w == worker)
                    .map(|(_, m)| m.clone())
                    .unwrap_or_else(|| file_metrics(diff));
                let consistency = if single {
                    1.0
                } else {
                    1.0 - stddev(&metrics.iter().map(|(_, m)| contribution_score(m)).collect::<Vec<_>>())
                };
                let score = QualityScore::new(
                    consistency,
                    test_coverage_score(&this_metrics),
                    code_quality_score(&this_metrics),
                    efficiency_score(&this_metrics),
                );
                files.push(FileQuality {
                    path: path.clone(),
                    worker: worker.clone(),
                    score,
                    metrics: this_metrics,
                    content: diff.content.clone(),
                });
            }
        }

        let conflicts = detect_conflicts(&per_path);
        let conflicting_paths: HashSet<&PathBuf> =
            conflicts.iter().map(|c| &c.path).collect();

        let preview = MergePreview {
            total_files: per_path.len(),
            auto_mergeable: per_path.len() - conflicting_paths.len(),
            conflicting: conflicting_paths.len(),
            files,
            conflicts,
        };

        consolidation.default_strategy = recommended_strategy(&preview.conflicts);
        consolidation.preview = Some(preview.clone());
        consolidation.set_status(ConsolidationStatus::Analyzed);
        self.persist(&consolidation)?;
        self.events.publish(Event::ConsolidationAnalyzed {
            id: id.clone(),
            total_files: preview.total_files,
            conflicting: preview.conflicting,
        });

        Ok(id)
    }

    /// Validate caller-supplied resolutions against the preview and produce
    /// a Merge Plan. Transitions `analyzed -> ready`.
    pub fn resolve(&self, id: &ConsolidationId, resolutions: Vec<Resolution>) -> Result<MergePlan, OrcError> {
        let mut consolidation = self.get(id)?;
        let preview = consolidation
            .preview
            .clone()
            .ok_or_else(|| OrcError::Conflict(format!("{id} has not been analyzed")))?;

        let known_paths: HashSet<&PathBuf> =
            preview.files.iter().map(|f| &f.path).collect();

        let mut files = Vec::new();
        let mut rejected = Vec::new();
        for resolution in &resolutions {
            if !known_paths.contains(&resolution.path) {
                return Err(OrcError::Validation(format!(
                    "path {} does not appear in the merge preview",
                    resolution.path.display()
                )));
            }
            match resolution.action {
                ResolutionAction::Reject => rejected.push(resolution.path.clone()),
                ResolutionAction::Manual => {
                    files.push(PlannedFile {
                        path: resolution.path.clone(),
                        source_worker: resolution
                            .chosen_worker
                            .clone()
                            .unwrap_or_else(|| WorkerId::new("manual")),
                        manual_content: resolution.manual_content.clone(),
                    });
                }
                ResolutionAction::Union => {
                    let union_content = union_content(&preview, &resolution.path);
                    files.push(PlannedFile {
                        path: resolution.path.clone(),
                        source_worker: preview
                            .files
                            .iter()
                            .find(|f| f.path == resolution.path)
                            .map(|f| f.worker.clone())
                            .unwrap_or_else(|| WorkerId::new("union")),
                        manual_content: Some(union_content),
                    });
                }
                ResolutionAction::Merge
                | ResolutionAction::KeepOurs
                | ResolutionAction::KeepTheirs
                | ResolutionAction::Voting => {
                    let source_worker = resolution.chosen_worker.clone().ok_or_else(|| {
                        OrcError::Validation(format!(
                            "resolution for {} requires a chosen worker",
                            resolution.path.display()
                        ))
                    })?;
                    files.push(PlannedFile {
                        path: resolution.path.clone(),
                        source_worker,
                        manual_content: None,
                    });
                }
            }
        }

        let plan = MergePlan { files, rejected };
        consolidation.plan = Some(plan.clone());
        consolidation.set_status(ConsolidationStatus::Ready);
        self.persist(&consolidation)?;
        self.events.publish(Event::ConsolidationReady { id: id.clone() });

        Ok(plan)
    }

    /// Apply the Merge Plan onto a fresh checkout of the base revision.
    /// Transitions `ready -> completed`; a per-file failure is recorded in
    /// the result but does not abort the export.
    pub async fn export(
        &self,
        id: &ConsolidationId,
        scratch_path: &Path,
        commit_message: &str,
        worktree_for: impl Fn(&WorkerId) -> Option<PathBuf>,
    ) -> Result<MergeResult, OrcError> {
        let mut consolidation = self.get(id)?;
        let plan = consolidation
            .plan
            .clone()
            .ok_or_else(|| OrcError::Conflict(format!("{id} has no merge plan; call resolve first")))?;

        let mut apply_files = Vec::new();
        let mut unresolved = Vec::new();
        for planned in &plan.files {
            match planned.manual_content.clone() {
                Some(content) => apply_files.push((planned.path.clone(), PathBuf::new(), Some(content))),
                None => match worktree_for(&planned.source_worker) {
                    Some(worktree) => apply_files.push((planned.path.clone(), worktree, None)),
                    None => unresolved.push((
                        planned.path.clone(),
                        format!("no known worktree for {}", planned.source_worker),
                    )),
                },
            }
        }

        let outcome = self
            .vcs
            .export(
                &consolidation.project,
                scratch_path,
                &consolidation.base_revision,
                &apply_files,
                commit_message,
            )
            .await;

        let result = match outcome {
            Ok(export_outcome) => {
                let failed_paths: HashSet<&PathBuf> =
                    export_outcome.failed.iter().map(|(p, _)| p).collect();
                let merged = apply_files
                    .iter()
                    .map(|(p, ..)| p.clone())
                    .filter(|p| !failed_paths.contains(p))
                    .collect();
                let mut failed = export_outcome.failed;
                failed.extend(unresolved);
                MergeResult {
                    merged,
                    failed,
                    commit_id: Some(export_outcome.commit_id),
                }
            }
            Err(e) => {
                self.events.publish(Event::ConsolidationFailed {
                    id: id.clone(),
                    error: e.to_string(),
                });
                return Err(OrcError::MergeFailure(e.to_string()));
            }
        };

        consolidation.result = Some(result.clone());
        consolidation.set_status(ConsolidationStatus::Completed);
        consolidation.completed_at_ms = Some(self.clock.epoch_ms());
        self.persist(&consolidation)?;

        self.events.publish(Event::ConsolidationCompleted {
            id: id.clone(),
            merged: result.merged.len(),
            failed: result.failed.len(),
        });

        Ok(result)
    }

    pub fn get(&self, id: &ConsolidationId) -> Result<Consolidation, OrcError> {
        self.store
            .get(id)
            .map_err(|e| OrcError::PersistenceFailure(e.to_string()))?
            .ok_or_else(|| OrcError::NotFound(format!("consolidation {id} not found")))
    }

    pub fn list(&self) -> Result<Vec<Consolidation>, OrcError> {
        self.store
            .load_all()
            .map_err(|e| OrcError::PersistenceFailure(e.to_string()))
    }

    pub fn delete(&self, id: &ConsolidationId) -> Result<(), OrcError> {
        let removed = self
            .store
            .delete(id)
            .map_err(|e| OrcError::PersistenceFailure(e.to_string()))?;
        if !removed {
            return Err(OrcError::NotFound(format!("consolidation {id} not found")));
        }
        Ok(())
    }

    fn persist(&self, consolidation: &Consolidation) -> Result<(), OrcError> {
        self.store
            .upsert(consolidation.clone())
            .map_err(|e| OrcError::PersistenceFailure(e.to_string()))
    }
}

fn file_metrics(diff: &FileDiff) -> FileMetrics {
    let content = diff.content.as_deref().unwrap_or("");
    let lines: Vec<&str> = content.lines().collect();
    let line_count = lines.len();
    let lengths: Vec<usize> = lines.iter().map(|l| l.len()).collect();
    let avg_line_length = if lengths.is_empty() {
        0.0
    } else {
        lengths.iter().sum::<usize>() as f64 / lengths.len() as f64
    };
    let max_line_length = lengths.iter().copied().max().unwrap_or(0);
    let complexity = content
        .split(|c: char| !c.is_alphanumeric())
        .filter(|tok| matches!(*tok, "if" | "for" | "while" | "case" | "catch"))
        .count();
    let has_comments = content.contains("//") || content.contains('#') || content.contains("/*");
    let is_test_file = is_test_path(&diff.path);
    let test_line_ratio = if is_test_file { 1.0 } else { 0.0 };
    let added: i64 = diff.hunks.iter().map(|h| h.added as i64).sum();
    let removed: i64 = diff.hunks.iter().map(|h| h.removed as i64).sum();

    FileMetrics {
        line_count,
        avg_line_length,
        max_line_length,
        complexity,
        has_comments,
        is_test_file,
        test_line_ratio,
        net_change: added - removed,
    }
}

fn is_test_path(path: &Path) -> bool {
    let s = path.to_string_lossy();
    s.contains("/tests/")
        || s.starts_with("tests/")
        || path
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|s| s.ends_with("_test") || s.ends_with(".test"))
}

fn contribution_score(metrics: &FileMetrics) -> f64 {
    code_quality_score(metrics)
}

fn stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn test_coverage_score(metrics: &FileMetrics) -> f64 {
    let bonus = if metrics.is_test_file { 0.25 } else { 0.0 };
    (metrics.test_line_ratio + bonus).min(1.0)
}

fn code_quality_score(metrics: &FileMetrics) -> f64 {
    let length_score = 1.0 - (metrics.max_line_length as f64 / 120.0).min(1.0);
    let complexity_score = 1.0 - (metrics.complexity as f64 / 20.0).min(1.0);
    let comment_score = if metrics.has_comments { 1.0 } else { 0.5 };
    ((length_score + complexity_score + comment_score) / 3.0).clamp(0.0, 1.0)
}

fn efficiency_score(metrics: &FileMetrics) -> f64 {
    let magnitude = metrics.net_change.unsigned_abs() as f64;
    (1.0 / (1.0 + magnitude / 200.0)).clamp(0.0, 1.0)
}

fn detect_conflicts(per_path: &HashMap<PathBuf, Vec<(WorkerId, FileDiff)>>) -> Vec<ConflictRecord> {
    let mut conflicts = Vec::new();
    for (path, entries) in per_path {
        if entries.len() < 2 {
            continue;
        }
        for i in 0..entries.len() {
            for j in (i + 1)..entries.len() {
                let (worker_a, diff_a) = &entries[i];
                let (worker_b, diff_b) = &entries[j];
                conflicts.extend(pairwise_conflicts(path, worker_a, diff_a, worker_b, diff_b));
            }
        }
    }
    conflicts
}

fn as_conflict_hunk(hunk: &DiffHunk) -> Hunk {
    Hunk {
        start_line: hunk.start_line,
        line_count: hunk.line_count,
    }
}

fn pairwise_conflicts(
    path: &Path,
    worker_a: &WorkerId,
    diff_a: &FileDiff,
    worker_b: &WorkerId,
    diff_b: &FileDiff,
) -> Vec<ConflictRecord> {
    let mut out = Vec::new();

    if diff_a.deleted != diff_b.deleted && (diff_a.deleted || diff_b.deleted) {
        let hunk_a = diff_a.hunks.first().map(as_conflict_hunk).unwrap_or(Hunk { start_line: 0, line_count: 0 });
        let hunk_b = diff_b.hunks.first().map(as_conflict_hunk).unwrap_or(Hunk { start_line: 0, line_count: 0 });
        out.push(ConflictRecord {
            path: path.to_path_buf(),
            kind: ConflictKind::DeleteModify,
            worker_a: worker_a.clone(),
            worker_b: worker_b.clone(),
            hunk_a,
            hunk_b,
            overlap_start: None,
            overlap_end: None,
        });
        return out;
    }

    for hunk_a in &diff_a.hunks {
        for hunk_b in &diff_b.hunks {
            let core_a = as_conflict_hunk(hunk_a);
            let core_b = as_conflict_hunk(hunk_b);
            if let Some((start, end)) = core_a.overlap(&core_b) {
                out.push(ConflictRecord {
                    path: path.to_path_buf(),
                    kind: ConflictKind::SameLine,
                    worker_a: worker_a.clone(),
                    worker_b: worker_b.clone(),
                    hunk_a: core_a,
                    hunk_b: core_b,
                    overlap_start: Some(start),
                    overlap_end: Some(end),
                });
            }
        }
    }

    if let (Some(_), Some(_)) = (diff_a.content.as_ref(), diff_b.content.as_ref()) {
        let added_a = added_lines(diff_a);
        let added_b = added_lines(diff_b);

        out.extend(name_collisions(
            path,
            worker_a,
            worker_b,
            &collect_names(&added_a, parse_import_name),
            &collect_names(&added_b, parse_import_name),
            ConflictKind::ImportConflict,
        ));
        out.extend(name_collisions(
            path,
            worker_a,
            worker_b,
            &collect_names(&added_a, parse_export_name),
            &collect_names(&added_b, parse_export_name),
            ConflictKind::ExportConflict,
        ));
        out.extend(name_collisions(
            path,
            worker_a,
            worker_b,
            &collect_names(&added_a, parse_signature_name),
            &collect_names(&added_b, parse_signature_name),
            ConflictKind::Structural,
        ));
    }

    out
}

/// The lines a diff added or changed in the new file, by hunk line range.
fn added_lines(diff: &FileDiff) -> Vec<&str> {
    let lines: Vec<&str> = diff.content.as_deref().unwrap_or("").lines().collect();
    let mut out = Vec::new();
    for hunk in &diff.hunks {
        if hunk.start_line == 0 || hunk.line_count == 0 {
            continue;
        }
        let start = (hunk.start_line - 1) as usize;
        let end = (start + hunk.line_count as usize).min(lines.len());
        if start < lines.len() {
            out.extend_from_slice(&lines[start..end]);
        }
    }
    out
}

/// Map declared name -> the full trimmed statement that declared it, for
/// whichever lines `parse` recognizes.
fn collect_names<'a>(lines: &[&'a str], parse: fn(&str) -> Option<String>) -> HashMap<String, &'a str> {
    let mut names = HashMap::new();
    for line in lines {
        let trimmed = line.trim();
        if let Some(name) = parse(trimmed) {
            names.entry(name).or_insert(trimmed);
        }
    }
    names
}

/// Names declared by both sides under distinct statement text: one
/// conflict per colliding name, in deterministic (sorted) order.
fn name_collisions(
    path: &Path,
    worker_a: &WorkerId,
    worker_b: &WorkerId,
    a: &HashMap<String, &str>,
    b: &HashMap<String, &str>,
    kind: ConflictKind,
) -> Vec<ConflictRecord> {
    let mut colliding: Vec<&String> = Vec::new();
    for (name, stmt_a) in a {
        if let Some(stmt_b) = b.get(name) {
            if stmt_a != stmt_b {
                colliding.push(name);
            }
        }
    }
    colliding.sort();

    colliding
        .into_iter()
        .map(|_| ConflictRecord {
            path: path.to_path_buf(),
            kind,
            worker_a: worker_a.clone(),
            worker_b: worker_b.clone(),
            hunk_a: Hunk { start_line: 0, line_count: 0 },
            hunk_b: Hunk { start_line: 0, line_count: 0 },
            overlap_start: None,
            overlap_end: None,
        })
        .collect()
}

fn first_identifier(s: &str) -> Option<String> {
    let ident: String = s
        .trim_start()
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if ident.is_empty() {
        None
    } else {
        Some(ident)
    }
}

fn last_identifier(s: &str) -> Option<String> {
    let segment = s.rsplit(['.', ':', '/']).next()?;
    first_identifier(segment)
}

/// Top-level import statement name, covering ES module / Python / Rust /
/// CommonJS spellings.
fn parse_import_name(line: &str) -> Option<String> {
    if let Some(rest) = line.strip_prefix("import ") {
        if let Some(idx) = rest.find(" from ") {
            return first_identifier(rest[..idx].trim_start_matches(['{', '*', ' ']));
        }
        return last_identifier(rest.trim_end_matches(';'));
    }
    if line.starts_with("from ") {
        if let Some(idx) = line.find(" import ") {
            return first_identifier(&line[idx + " import ".len()..]);
        }
    }
    if let Some(rest) = line.strip_prefix("use ") {
        return last_identifier(rest.trim_end_matches(';').trim_end_matches('}'));
    }
    if line.contains("require(") {
        let lhs = line.split('=').next()?.trim();
        let lhs = lhs
            .trim_start_matches("const ")
            .trim_start_matches("let ")
            .trim_start_matches("var ");
        return first_identifier(lhs);
    }
    None
}

/// Top-level export statement name (ES modules; Rust's `pub` items count
/// as exports of a module).
fn parse_export_name(line: &str) -> Option<String> {
    if let Some(rest) = line.strip_prefix("export ") {
        let rest = rest.strip_prefix("default ").unwrap_or(rest);
        for kw in ["const ", "let ", "var ", "function ", "class ", "async function "] {
            if let Some(r) = rest.strip_prefix(kw) {
                return first_identifier(r);
            }
        }
        return first_identifier(rest);
    }
    if let Some(rest) = line.strip_prefix("pub ") {
        for kw in ["fn ", "struct ", "enum ", "const ", "static ", "trait ", "async fn "] {
            if let Some(r) = rest.strip_prefix(kw) {
                return first_identifier(r);
            }
        }
    }
    None
}

/// Declared function/class/interface name, for structural-signature
/// comparison (match by name, compare the whole declaration text).
fn parse_signature_name(line: &str) -> Option<String> {
    const KEYWORDS: &[&str] = &[
        "pub async fn ",
        "pub fn ",
        "async fn ",
        "fn ",
        "function ",
        "def ",
        "class ",
        "pub struct ",
        "struct ",
        "pub enum ",
        "enum ",
        "interface ",
        "pub trait ",
        "trait ",
    ];
    for kw in KEYWORDS {
        if let Some(rest) = line.strip_prefix(kw) {
            return first_identifier(rest);
        }
    }
    None
}

fn recommended_strategy(conflicts: &[ConflictRecord]) -> String {
    if conflicts.is_empty() {
        return "auto".to_string();
    }
    if conflicts.iter().any(|c| c.kind == ConflictKind::DeleteModify) {
        return "manual".to_string();
    }
    let same_line = conflicts.iter().filter(|c| c.kind == ConflictKind::SameLine).count();
    let import_export = conflicts
        .iter()
        .filter(|c| matches!(c.kind, ConflictKind::ImportConflict | ConflictKind::ExportConflict))
        .count();
    if same_line * 2 >= conflicts.len() {
        "voting".to_string()
    } else if import_export == conflicts.len() {
        "union".to_string()
    } else {
        "manual".to_string()
    }
}

/// A real line-level union of every contributing worker's content for
/// `path`: each distinct line kept once, in worker-id order.
fn union_content(preview: &MergePreview, path: &Path) -> String {
    let mut contributions: Vec<&FileQuality> =
        preview.files.iter().filter(|f| f.path == path).collect();
    contributions.sort_by(|a, b| a.worker.as_str().cmp(b.worker.as_str()));

    let mut seen = HashSet::new();
    let mut lines = Vec::new();
    for file in contributions {
        let Some(content) = file.content.as_deref() else {
            continue;
        };
        for line in content.lines() {
            if seen.insert(line) {
                lines.push(line);
            }
        }
    }

    if lines.is_empty() {
        return String::new();
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
#[path = "consolidator_tests.rs"]
mod tests;
