//! Query plan auditing.
//!
//! In debug mode every guarded statement is explained with sequential scans
//! disabled for the explaining transaction. If the planner still picks a
//! `Seq Scan`, no index can serve the statement and the enclosing operation
//! aborts with [`Fatal::SeqScan`].

use crate::config::GuardConfig;
use crate::error::{Fatal, GuardError, GuardResult};
use crate::text::contains_ignore_case;
use crate::validate::SEQ_SCAN_CHECK_DISABLE;
use deadpool_postgres::Pool;
use serde::Deserialize;
use tokio_postgres::types::ToSql;

/// How many levels below the root plan node are inspected.
///
/// Nodes nested deeper than this are ignored.
pub const MAX_PLAN_DEPTH: usize = 10;

const SEQ_SCAN: &str = "Seq Scan";

/// One node of an `EXPLAIN (FORMAT json)` plan tree.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlanNode {
    #[serde(rename = "Node Type")]
    pub node_type: String,
    #[serde(rename = "Plans", default)]
    pub plans: Vec<PlanNode>,
}

#[derive(Debug, Deserialize)]
struct ExplainEntry {
    #[serde(rename = "Plan")]
    plan: PlanNode,
}

impl PlanNode {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            plans: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: PlanNode) -> Self {
        self.plans.push(child);
        self
    }

    pub fn is_seq_scan(&self) -> bool {
        contains_ignore_case(&self.node_type, SEQ_SCAN)
    }

    /// Returns `true` if this node, or a descendant at most `max_depth`
    /// levels below it, is a sequential scan.
    pub fn has_seq_scan_within(&self, max_depth: usize) -> bool {
        if self.is_seq_scan() {
            return true;
        }
        max_depth > 0
            && self
                .plans
                .iter()
                .any(|child| child.has_seq_scan_within(max_depth - 1))
    }

    /// [`has_seq_scan_within`](Self::has_seq_scan_within) bounded by [`MAX_PLAN_DEPTH`].
    pub fn has_seq_scan(&self) -> bool {
        self.has_seq_scan_within(MAX_PLAN_DEPTH)
    }

    /// Node types in depth-first order, bounded by [`MAX_PLAN_DEPTH`].
    pub fn node_types(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_node_types(MAX_PLAN_DEPTH, &mut out);
        out
    }

    fn collect_node_types<'a>(&'a self, depth: usize, out: &mut Vec<&'a str>) {
        out.push(&self.node_type);
        if depth > 0 {
            for child in &self.plans {
                child.collect_node_types(depth - 1, out);
            }
        }
    }
}

/// Decode the `EXPLAIN (FORMAT json)` document into its single root plan.
///
/// The document must be a one-element array of `{"Plan": {...}}`.
pub fn decode_plan(document: serde_json::Value) -> GuardResult<PlanNode> {
    let mut entries: Vec<ExplainEntry> =
        serde_json::from_value(document).map_err(|e| Fatal::PlanDecode(e.to_string()))?;
    if entries.len() != 1 {
        return Err(Fatal::PlanDecode(format!(
            "explain result json is not 1 child (got {})",
            entries.len()
        ))
        .into());
    }
    Ok(entries.remove(0).plan)
}

/// Runs `EXPLAIN` for guarded statements and reports sequential scans.
#[derive(Clone)]
pub struct PlanAuditor {
    pool: Pool,
    config: GuardConfig,
}

impl std::fmt::Debug for PlanAuditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanAuditor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PlanAuditor {
    pub fn new(pool: Pool, config: GuardConfig) -> Self {
        Self { pool, config }
    }

    /// Returns `true` when the check is skipped for this statement.
    pub fn is_exempt(&self, sql: &str) -> bool {
        !self.config.seq_scan_check || contains_ignore_case(sql, SEQ_SCAN_CHECK_DISABLE)
    }

    /// Explain `sql` and return `Ok(true)` if its plan is free of sequential
    /// scans (or the statement is exempt).
    ///
    /// Only valid in debug mode. The explaining transaction is always rolled
    /// back; `enable_seqscan` is switched off with `SET LOCAL` so other
    /// statements on the pooled connection are unaffected.
    pub async fn audit(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> GuardResult<bool> {
        if self.is_exempt(sql) {
            return Ok(true);
        }
        if !self.config.is_debug() {
            return Err(Fatal::DebugOnly {
                operation: "plan audit",
            }
            .into());
        }

        let plan = self.explain(sql, params).await?;
        if plan.has_seq_scan() {
            tracing::warn!(
                target: "pgguard.plan",
                sql,
                nodes = ?plan.node_types(),
                "sequential scan in query plan"
            );
            return Ok(false);
        }
        tracing::debug!(target: "pgguard.plan", sql, nodes = ?plan.node_types(), "plan ok");
        Ok(true)
    }

    /// Audit and turn a sequential scan into [`Fatal::SeqScan`].
    pub async fn enforce(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> GuardResult<()> {
        if self.audit(sql, params).await? {
            Ok(())
        } else {
            Err(Fatal::SeqScan {
                sql: sql.to_string(),
            }
            .into())
        }
    }

    async fn explain(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> GuardResult<PlanNode> {
        let mut client = self.pool.get().await?;
        let tx = client.transaction().await.map_err(Fatal::Begin)?;

        tx.batch_execute("SET LOCAL enable_seqscan TO 'off'")
            .await
            .map_err(|e| GuardError::from_driver(e, "SET LOCAL enable_seqscan TO 'off'"))?;

        // ANALYZE false: the statement is planned, never executed.
        let explain_sql = format!("EXPLAIN (ANALYZE false, FORMAT json) {sql}");
        let rows = tx
            .query(explain_sql.as_str(), params)
            .await
            .map_err(|e| GuardError::from_driver(e, sql))?;

        tx.rollback().await.map_err(|e| Fatal::Rollback {
            cause: "plan audit".to_string(),
            source: e,
        })?;

        if rows.len() != 1 {
            return Err(Fatal::PlanDecode(format!(
                "explain result is not 1 row (got {})",
                rows.len()
            ))
            .into());
        }
        let document: serde_json::Value = rows[0]
            .try_get(0)
            .map_err(|e| Fatal::PlanDecode(e.to_string()))?;
        decode_plan(document)
    }
}
