//! One-way synchronization of the employee directory.
//!
//! A run pages the external directory, keeps records whose email domain
//! belongs to the organization, and upserts them into the local employees
//! table keyed by the stable directory object ID. Each record commits on its
//! own; a failing record is counted and skipped, never aborting the run.
//!
//! The scheduler is Idle -> Running -> Idle with a single atomic guard: a
//! trigger received while a run is in flight is a no-op. The periodic timer
//! re-arms from the last completed run.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;

use crate::db::DbPool;
use crate::entities::employee;
use crate::errors::ServiceError;
use crate::graph::{employee_fields_from_graph, GraphClient, GraphUser};
use crate::services::countries;

/// Seconds between wake-ups of the periodic timer
const WAKE_INTERVAL_SECS: u64 = 3600;

/// Statistics for one completed sync run
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct SyncStats {
    /// Users returned by the directory
    pub total_fetched: u64,
    /// Users passing the organization-domain filter
    pub matched: u64,
    pub created: u64,
    pub updated: u64,
    pub errors: u64,
    pub countries_created: u64,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Result of triggering a sync
pub enum SyncOutcome {
    Completed(SyncStats),
    /// A run was already in flight; the trigger was a no-op
    AlreadyRunning,
}

/// True when the email's domain belongs to the organization
///
/// The check is an exact match of the configured token against the
/// dot-separated labels of the domain, so "it.primefire.us" matches while
/// "notprimefire.com" does not.
pub fn is_organization_email(email: &str, domain_token: &str) -> bool {
    let Some((_, domain)) = email.rsplit_once('@') else {
        return false;
    };
    domain
        .to_lowercase()
        .split('.')
        .any(|label| label == domain_token)
}

struct UpsertOutcome {
    created: bool,
    country_created: bool,
}

/// Executes sync runs against the local database
pub struct DirectorySync {
    graph: Arc<GraphClient>,
    db: DbPool,
    domain_token: String,
}

impl DirectorySync {
    pub fn new(graph: Arc<GraphClient>, db: DbPool, domain_token: String) -> Self {
        Self {
            graph,
            db,
            domain_token: domain_token.to_lowercase(),
        }
    }

    /// Run a full directory sync
    ///
    /// Fails only when the directory itself cannot be listed; individual
    /// record failures are counted in the stats.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<SyncStats, ServiceError> {
        info!("Starting directory sync");
        let users = self.graph.list_users().await?;

        let mut stats = SyncStats {
            total_fetched: users.len() as u64,
            ..Default::default()
        };

        for user in &users {
            let Some(email) = user.email() else {
                debug!(user_id = %user.id, "Skipping directory user without email");
                continue;
            };
            if !is_organization_email(email, &self.domain_token) {
                debug!(%email, "Skipping user outside organization domains");
                continue;
            }
            stats.matched += 1;

            match self.upsert_user(user).await {
                Ok(outcome) => {
                    if outcome.created {
                        stats.created += 1;
                    } else {
                        stats.updated += 1;
                    }
                    if outcome.country_created {
                        stats.countries_created += 1;
                    }
                }
                Err(err) => {
                    warn!(%email, error = %err, "Failed to sync directory record; skipping");
                    stats.errors += 1;
                }
            }
        }

        stats.completed_at = Some(Utc::now());
        info!(
            total = stats.total_fetched,
            matched = stats.matched,
            created = stats.created,
            updated = stats.updated,
            errors = stats.errors,
            "Directory sync completed"
        );
        Ok(stats)
    }

    /// Pull one directory record into an existing employee row
    pub async fn pull_employee(
        &self,
        current: employee::Model,
    ) -> Result<employee::Model, ServiceError> {
        let oid = current.azure_oid.clone().ok_or_else(|| {
            ServiceError::InvalidInput(
                "Employee has no directory identity to sync from".to_string(),
            )
        })?;

        let user = self.graph.get_user(&oid).await?;
        let outcome = self.upsert_user(&user).await?;
        debug!(employee_id = current.id, created = outcome.created, "Pulled directory record");

        employee::Entity::find_by_id(current.id)
            .one(&self.db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Employee", current.id))
    }

    /// Upsert one directory record by its stable object ID
    ///
    /// Fields present in the mapping overwrite local values; absent fields
    /// keep whatever is stored locally.
    async fn upsert_user(&self, user: &GraphUser) -> Result<UpsertOutcome, ServiceError> {
        let fields = employee_fields_from_graph(user);
        let now = Utc::now();

        let mut country_created = false;
        let country_id = match user.country_input() {
            Some(input) => match countries::get_or_create(&self.db, input).await? {
                Some((id, created)) => {
                    country_created = created;
                    Some(id)
                }
                None => None,
            },
            None => None,
        };

        let existing = employee::Entity::find()
            .filter(employee::Column::AzureOid.eq(fields.azure_oid.as_str()))
            .one(&self.db)
            .await?;

        match existing {
            Some(model) => {
                let mut active: employee::ActiveModel = model.into();
                if fields.azure_upn.is_some() {
                    active.azure_upn = Set(fields.azure_upn);
                }
                if fields.first_name.is_some() {
                    active.first_name = Set(fields.first_name);
                }
                if fields.last_name.is_some() {
                    active.last_name = Set(fields.last_name);
                }
                if fields.display_name.is_some() {
                    active.display_name = Set(fields.display_name);
                }
                if fields.title.is_some() {
                    active.title = Set(fields.title);
                }
                if fields.department.is_some() {
                    active.department = Set(fields.department);
                }
                if fields.office.is_some() {
                    active.office = Set(fields.office);
                }
                if fields.email.is_some() {
                    active.email = Set(fields.email);
                }
                if fields.mobile_phone.is_some() {
                    active.mobile_phone = Set(fields.mobile_phone);
                }
                if fields.office_phone.is_some() {
                    active.office_phone = Set(fields.office_phone);
                }
                if fields.street_address.is_some() {
                    active.street_address = Set(fields.street_address);
                }
                if fields.city.is_some() {
                    active.city = Set(fields.city);
                }
                if fields.state.is_some() {
                    active.state = Set(fields.state);
                }
                if fields.postal_code.is_some() {
                    active.postal_code = Set(fields.postal_code);
                }
                if country_id.is_some() {
                    active.country_id = Set(country_id);
                }
                active.last_synced_at = Set(Some(now));
                active.update(&self.db).await?;

                Ok(UpsertOutcome {
                    created: false,
                    country_created,
                })
            }
            None => {
                employee::ActiveModel {
                    azure_oid: Set(Some(fields.azure_oid)),
                    azure_upn: Set(fields.azure_upn),
                    first_name: Set(fields.first_name),
                    last_name: Set(fields.last_name),
                    display_name: Set(fields.display_name),
                    title: Set(fields.title),
                    department: Set(fields.department),
                    office: Set(fields.office),
                    email: Set(fields.email),
                    mobile_phone: Set(fields.mobile_phone),
                    office_phone: Set(fields.office_phone),
                    street_address: Set(fields.street_address),
                    city: Set(fields.city),
                    state: Set(fields.state),
                    postal_code: Set(fields.postal_code),
                    country_id: Set(country_id),
                    last_synced_at: Set(Some(now)),
                    created_at: Set(now),
                    ..Default::default()
                }
                .insert(&self.db)
                .await?;

                Ok(UpsertOutcome {
                    created: true,
                    country_created,
                })
            }
        }
    }
}

/// Snapshot of the scheduler state for the status endpoint
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SyncStatus {
    pub running: bool,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_stats: Option<SyncStats>,
    pub interval_hours: u64,
}

/// Guards sync runs and drives the periodic timer
pub struct SyncScheduler {
    sync: Arc<DirectorySync>,
    interval: ChronoDuration,
    interval_hours: u64,
    running: AtomicBool,
    last_completed: RwLock<Option<DateTime<Utc>>>,
    last_stats: RwLock<Option<SyncStats>>,
}

impl SyncScheduler {
    pub fn new(sync: Arc<DirectorySync>, interval_hours: u64) -> Self {
        Self {
            sync,
            interval: ChronoDuration::hours(interval_hours as i64),
            interval_hours,
            running: AtomicBool::new(false),
            last_completed: RwLock::new(None),
            last_stats: RwLock::new(None),
        }
    }

    pub fn service(&self) -> &DirectorySync {
        &self.sync
    }

    /// Trigger a sync run; a no-op while one is already in flight
    pub async fn trigger(&self) -> Result<SyncOutcome, ServiceError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            info!("Sync trigger ignored; a run is already in flight");
            return Ok(SyncOutcome::AlreadyRunning);
        }

        let result = self.sync.run().await;
        self.running.store(false, Ordering::SeqCst);

        match result {
            Ok(stats) => {
                *self.last_completed.write().await = Some(Utc::now());
                *self.last_stats.write().await = Some(stats.clone());
                Ok(SyncOutcome::Completed(stats))
            }
            Err(err) => Err(err),
        }
    }

    pub async fn status(&self) -> SyncStatus {
        SyncStatus {
            running: self.running.load(Ordering::SeqCst),
            last_synced_at: *self.last_completed.read().await,
            last_stats: self.last_stats.read().await.clone(),
            interval_hours: self.interval_hours,
        }
    }

    /// Run an initial sync, then keep re-arming the periodic timer
    ///
    /// The interval is measured from the last completed run; wake-ups that
    /// find the interval not yet elapsed go back to sleep.
    pub fn spawn_periodic(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            if let Err(err) = self.trigger().await {
                error!(error = %err, "Initial directory sync failed");
            }

            loop {
                tokio::time::sleep(Duration::from_secs(WAKE_INTERVAL_SECS)).await;

                let due = match *self.last_completed.read().await {
                    None => true,
                    Some(last) => Utc::now() - last >= self.interval,
                };
                if !due {
                    continue;
                }

                if let Err(err) = self.trigger().await {
                    error!(error = %err, "Periodic directory sync failed");
                }
            }
        })
    }
}
