//! In-memory store
//!
//! Mirrors the Postgres semantics the services rely on: soft deletes,
//! foreign key checks, case-insensitive unique emails, and compare-and-swap
//! updates on `version`. Writes take one lock over all tables, so a
//! conditional update is atomic just like the single SQL statement it stands
//! in for.
//!
//! [`MemoryStore::set_unavailable`] simulates an outage;
//! [`MemoryStore::set_writes_unavailable`] fails only the writes, leaving
//! reads working.

use super::{ProjectStore, Reference, Store, StoreError, TaskStore, UserStore};
use crate::models::{
    CreateProject, CreateTask, CreateUser, Project, Task, TaskStatus, UpdateProject, UpdateTask,
    User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

struct Row<T> {
    value: T,
    seq: u64,
    deleted_at: Option<DateTime<Utc>>,
}

impl<T> Row<T> {
    fn live(&self) -> Option<&T> {
        self.deleted_at.is_none().then_some(&self.value)
    }
}

#[derive(Default)]
struct Tables {
    next_seq: u64,
    users: HashMap<Uuid, Row<User>>,
    projects: HashMap<Uuid, Row<Project>>,
    tasks: HashMap<Uuid, Row<Task>>,
}

impl Tables {
    fn row<T>(&mut self, value: T) -> Row<T> {
        self.next_seq += 1;
        Row {
            value,
            seq: self.next_seq,
            deleted_at: None,
        }
    }
}

/// Sorts live rows by insertion order and clones them out
fn live_sorted<'a, T, I>(rows: I) -> Vec<T>
where
    T: Clone + 'a,
    I: Iterator<Item = &'a Row<T>>,
{
    let mut live: Vec<&Row<T>> = rows.filter(|row| row.deleted_at.is_none()).collect();
    live.sort_by_key(|row| row.seq);
    live.into_iter().map(|row| row.value.clone()).collect()
}

/// Thread-safe in-memory store
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
    writes_unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every operation fails with [`StoreError::Unavailable`]
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory store marked unavailable".to_string(),
            ));
        }
        Ok(())
    }

    /// While set, operations that modify rows fail with
    /// [`StoreError::Unavailable`]; reads still succeed
    pub fn set_writes_unavailable(&self, unavailable: bool) {
        self.writes_unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_write(&self) -> Result<(), StoreError> {
        self.check()?;
        if self.writes_unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "in-memory store rejecting writes".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets a task's status and due date without touching its version
    ///
    /// Test fixture helper for arranging sweep scenarios.
    pub async fn force_task_schedule(
        &self,
        id: Uuid,
        status: TaskStatus,
        due_date: Option<DateTime<Utc>>,
    ) -> bool {
        let mut tables = self.tables.write().await;
        match tables.tasks.get_mut(&id) {
            Some(row) => {
                row.value.status = status;
                row.value.due_date = due_date;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError> {
        self.check_write()?;
        let mut tables = self.tables.write().await;

        let taken = tables
            .users
            .values()
            .filter_map(Row::live)
            .any(|user| user.email.eq_ignore_ascii_case(&data.email));
        if taken {
            return Err(StoreError::Duplicate("email"));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: data.email,
            password_hash: data.password_hash,
            name: data.name,
            role: data.role,
            created_at: now,
            updated_at: now,
        };
        let row = tables.row(user.clone());
        tables.users.insert(user.id, row);
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.users.get(&id).and_then(Row::live).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .filter_map(Row::live)
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(live_sorted(tables.users.values()))
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn create_project(&self, data: CreateProject) -> Result<Project, StoreError> {
        self.check_write()?;
        let mut tables = self.tables.write().await;

        if !tables.users.contains_key(&data.owner_id) {
            return Err(StoreError::MissingReference(Reference::Owner));
        }

        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            name: data.name,
            description: data.description,
            owner_id: data.owner_id,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        let row = tables.row(project.clone());
        tables.projects.insert(project.id, row);
        Ok(project)
    }

    async fn find_project(&self, id: Uuid) -> Result<Option<Project>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.projects.get(&id).and_then(Row::live).cloned())
    }

    async fn list_projects(&self, limit: i64, offset: i64) -> Result<Vec<Project>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        let mut projects = live_sorted(tables.projects.values());
        projects.reverse();
        Ok(projects
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_projects(&self) -> Result<i64, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.projects.values().filter_map(Row::live).count() as i64)
    }

    async fn update_project(
        &self,
        id: Uuid,
        expected_version: i32,
        patch: &UpdateProject,
    ) -> Result<Option<Project>, StoreError> {
        self.check_write()?;
        let mut tables = self.tables.write().await;

        let Some(row) = tables.projects.get_mut(&id) else {
            return Ok(None);
        };
        if row.deleted_at.is_some() || row.value.version != expected_version {
            return Ok(None);
        }

        patch.apply_to(&mut row.value);
        row.value.version += 1;
        row.value.updated_at = Utc::now();
        Ok(Some(row.value.clone()))
    }

    async fn project_version(&self, id: Uuid) -> Result<Option<i32>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .projects
            .get(&id)
            .and_then(Row::live)
            .map(|project| project.version))
    }

    async fn delete_project(&self, id: Uuid) -> Result<bool, StoreError> {
        self.check_write()?;
        let mut tables = self.tables.write().await;
        match tables.projects.get_mut(&id) {
            Some(row) if row.deleted_at.is_none() => {
                row.deleted_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create_task(&self, data: CreateTask) -> Result<Task, StoreError> {
        self.check_write()?;
        let mut tables = self.tables.write().await;

        if !tables.projects.contains_key(&data.project_id) {
            return Err(StoreError::MissingReference(Reference::Project));
        }
        if let Some(assignee_id) = data.assignee_id {
            if !tables.users.contains_key(&assignee_id) {
                return Err(StoreError::MissingReference(Reference::Assignee));
            }
        }

        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            title: data.title,
            description: data.description,
            status: data.status,
            due_date: data.due_date,
            project_id: data.project_id,
            assignee_id: data.assignee_id,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        let row = tables.row(task.clone());
        tables.tasks.insert(task.id, row);
        Ok(task)
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.tasks.get(&id).and_then(Row::live).cloned())
    }

    async fn list_tasks_by_project(&self, project_id: Uuid) -> Result<Vec<Task>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(live_sorted(
            tables
                .tasks
                .values()
                .filter(|row| row.value.project_id == project_id),
        ))
    }

    async fn list_tasks_by_project_and_assignee(
        &self,
        project_id: Uuid,
        assignee_id: Uuid,
    ) -> Result<Vec<Task>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(live_sorted(tables.tasks.values().filter(|row| {
            row.value.project_id == project_id && row.value.assignee_id == Some(assignee_id)
        })))
    }

    async fn list_tasks_by_assignee(&self, assignee_id: Uuid) -> Result<Vec<Task>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(live_sorted(
            tables
                .tasks
                .values()
                .filter(|row| row.value.assignee_id == Some(assignee_id)),
        ))
    }

    async fn update_task(
        &self,
        id: Uuid,
        expected_version: i32,
        patch: &UpdateTask,
    ) -> Result<Option<Task>, StoreError> {
        self.check_write()?;
        let mut tables = self.tables.write().await;

        // A row that misses on id or version never reaches the foreign key
        let matched = tables
            .tasks
            .get(&id)
            .is_some_and(|row| row.deleted_at.is_none() && row.value.version == expected_version);
        if !matched {
            return Ok(None);
        }

        if let Some(assignee_id) = patch.assignee_id {
            if !tables.users.contains_key(&assignee_id) {
                return Err(StoreError::MissingReference(Reference::Assignee));
            }
        }

        let Some(row) = tables.tasks.get_mut(&id) else {
            return Ok(None);
        };

        patch.apply_to(&mut row.value);
        row.value.version += 1;
        row.value.updated_at = Utc::now();
        Ok(Some(row.value.clone()))
    }

    async fn task_version(&self, id: Uuid) -> Result<Option<i32>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.tasks.get(&id).and_then(Row::live).map(|task| task.version))
    }

    async fn delete_task(&self, id: Uuid) -> Result<Option<Uuid>, StoreError> {
        self.check_write()?;
        let mut tables = self.tables.write().await;
        match tables.tasks.get_mut(&id) {
            Some(row) if row.deleted_at.is_none() => {
                row.deleted_at = Some(Utc::now());
                Ok(Some(row.value.project_id))
            }
            _ => Ok(None),
        }
    }

    async fn overdue_project_ids(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, StoreError> {
        self.check()?;
        let tables = self.tables.read().await;
        let ids: BTreeSet<Uuid> = tables
            .tasks
            .values()
            .filter_map(Row::live)
            .filter(|task| task.is_overdue_at(now))
            .map(|task| task.project_id)
            .collect();
        Ok(ids.into_iter().collect())
    }

    async fn mark_overdue(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        self.check_write()?;
        let mut tables = self.tables.write().await;
        let updated_at = Utc::now();
        let mut affected = 0;

        for row in tables.tasks.values_mut() {
            if row.deleted_at.is_none() && row.value.is_overdue_at(now) {
                row.value.status = TaskStatus::Overdue;
                row.value.version += 1;
                row.value.updated_at = updated_at;
                affected += 1;
            }
        }

        Ok(affected)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.check()
    }
}
