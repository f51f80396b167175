/// Dashboard aggregation
///
/// Summarizes budgets, invoices, tasks, notes, and the team for one caller.
/// Every counter goes through the same read scope as the matching list
/// endpoint, so a non-lead's dashboard only counts what they could list.
///
/// The six sub-queries run concurrently and the first failure fails the
/// whole call. An `as_of` instant is read from the database once up front
/// and every query ignores rows created after it, which keeps inserts that
/// land mid-call out of every counter.
///
/// That cutoff is the only consistency it gives. Each query runs on its own
/// connection and sees its own snapshot, so a delete or status change that
/// commits while the queries are in flight can show up in one counter and
/// not another (`pendingTasks` against `recentItems`, for example). Same
/// stance as writes: last commit wins, no snapshot across the whole call.
///
/// # Example
///
/// ```no_run
/// use opsdesk_shared::auth::identity::Caller;
/// use opsdesk_shared::dashboard::get_dashboard;
/// use opsdesk_shared::models::role::Role;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let caller = Caller { user_id: Uuid::new_v4(), role: Role::Lead };
/// let dashboard = get_dashboard(&pool, &caller).await?;
/// println!("{} pending tasks", dashboard.stats.pending_tasks);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

use crate::auth::identity::Caller;
use crate::auth::policy::{ReadScope, Resource};
use crate::models::{push_scope, task::Task};

/// Length of the recent activity list
pub const RECENT_ITEMS_LIMIT: i64 = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_budgets: i64,
    pub active_budgets: i64,
    pub total_invoices: i64,
    pub unpaid_invoices: i64,
    pub total_tasks: i64,
    pub pending_tasks: i64,
    pub total_notes: i64,
    pub team_members: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub stats: DashboardStats,
    pub recent_items: Vec<Task>,
    pub as_of: DateTime<Utc>,
}

/// Builds a single-row query returning `COUNT(*)` and a filtered count
///
/// `extra` is a trusted SQL condition; it is never built from input.
fn count_query(
    table: &str,
    extra: &str,
    scope: ReadScope,
    as_of: DateTime<Utc>,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::<Postgres>::new(format!(
        "SELECT COUNT(*), COUNT(*) FILTER (WHERE {extra}) FROM {table}"
    ));
    push_scope(&mut qb, scope);
    qb.push(" AND created_at <= ").push_bind(as_of);
    qb
}

async fn count_pair(
    pool: &PgPool,
    table: &str,
    extra: &str,
    scope: ReadScope,
    as_of: DateTime<Utc>,
) -> Result<(i64, i64), sqlx::Error> {
    let mut qb = count_query(table, extra, scope, as_of);
    qb.build_query_as::<(i64, i64)>().fetch_one(pool).await
}

/// Aggregates the dashboard for `caller`
pub async fn get_dashboard(pool: &PgPool, caller: &Caller) -> Result<Dashboard, sqlx::Error> {
    // Database clock, so the cutoff is comparable with row timestamps
    let as_of: DateTime<Utc> = sqlx::query_scalar("SELECT NOW()").fetch_one(pool).await?;

    let budget_scope = ReadScope::for_caller(Resource::Budget, caller);
    let invoice_scope = ReadScope::for_caller(Resource::Invoice, caller);
    let task_scope = ReadScope::for_caller(Resource::Task, caller);
    let note_scope = ReadScope::for_caller(Resource::Note, caller);
    let team_scope = ReadScope::for_caller(Resource::Team, caller);

    let (budgets, invoices, tasks, notes, team, recent_items) = tokio::try_join!(
        count_pair(pool, "budgets", "status = 'active'", budget_scope, as_of),
        count_pair(pool, "invoices", "status = 'unpaid'", invoice_scope, as_of),
        count_pair(pool, "tasks", "status <> 'done'", task_scope, as_of),
        count_pair(pool, "notes", "TRUE", note_scope, as_of),
        count_pair(pool, "users", "TRUE", team_scope, as_of),
        Task::recent(pool, task_scope, as_of, RECENT_ITEMS_LIMIT),
    )?;

    let stats = DashboardStats {
        total_budgets: budgets.0,
        active_budgets: budgets.1,
        total_invoices: invoices.0,
        unpaid_invoices: invoices.1,
        total_tasks: tasks.0,
        pending_tasks: tasks.1,
        total_notes: notes.0,
        team_members: team.0,
    };

    debug!(user_id = %caller.user_id, ?stats, "Built dashboard");

    Ok(Dashboard {
        stats,
        recent_items,
        as_of,
    })
}
