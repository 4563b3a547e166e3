//! Project directory storage: projects, contracts, and role assignments.
//!
//! The workflow reads these to resolve project references, find a contract
//! to seal under, and decide who may act on a report.

use jiff::Timestamp;
use rusqlite::{OptionalExtension, Row};

use crate::model::{Assignment, Contract, Project, ProjectRef};

use super::{Result, Storage, parse_timestamp};

impl Storage {
    /// Inserts a project and returns its id.
    pub fn insert_project(&self, project_number: Option<&str>, name: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO projects (project_number, name) VALUES (?1, ?2)",
            rusqlite::params![project_number, name],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Looks up a project by id or project number.
    pub fn find_project(&self, reference: &ProjectRef) -> Result<Option<Project>> {
        let row = match reference {
            ProjectRef::Id(id) => self
                .conn
                .query_row(
                    "SELECT id, project_number, name FROM projects WHERE id = ?1",
                    [id],
                    project_from_row,
                )
                .optional()?,
            ProjectRef::Number(number) => self
                .conn
                .query_row(
                    "SELECT id, project_number, name FROM projects
                     WHERE project_number = ?1 LIMIT 1",
                    [number],
                    project_from_row,
                )
                .optional()?,
        };
        Ok(row)
    }

    /// Resolves a project reference to its numeric id.
    pub fn resolve_project_id(&self, reference: &ProjectRef) -> Result<Option<i64>> {
        Ok(self.find_project(reference)?.map(|p| p.id))
    }

    /// Lists every project, newest first.
    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, project_number, name FROM projects ORDER BY id DESC")?;
        let projects = stmt
            .query_map([], project_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    /// Lists projects where `user_id` holds any workflow role, newest first.
    pub fn list_projects_for_user(&self, user_id: i64) -> Result<Vec<Project>> {
        let mut stmt = self.conn.prepare(
            "SELECT p.id, p.project_number, p.name
             FROM project_workflow_assignments a
             JOIN projects p ON p.id = a.project_id
             WHERE a.siteagent_id = ?1
                OR a.inspector_id = ?1
                OR a.are_id = ?1
                OR a.re_id = ?1
             ORDER BY p.id DESC",
        )?;
        let projects = stmt
            .query_map([user_id], project_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(projects)
    }

    /// Inserts a contract for a project and returns its id.
    pub fn insert_contract(&self, project_id: i64, contract_number: Option<&str>) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO contracts (project_id, contract_number, created_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![project_id, contract_number, Timestamp::now().to_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Loads a contract by id.
    pub fn get_contract(&self, id: i64) -> Result<Option<Contract>> {
        self.query_contract(
            "SELECT id, project_id, contract_number, created_at FROM contracts WHERE id = ?1",
            id,
        )
    }

    /// The most recently created contract for a project.
    pub fn latest_contract(&self, project_id: i64) -> Result<Option<Contract>> {
        self.query_contract(
            "SELECT id, project_id, contract_number, created_at FROM contracts
             WHERE project_id = ?1 ORDER BY id DESC LIMIT 1",
            project_id,
        )
    }

    fn query_contract(&self, sql: &str, param: i64) -> Result<Option<Contract>> {
        let raw = self
            .conn
            .query_row(sql, [param], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })
            .optional()?;
        let Some((id, project_id, contract_number, created_at)) = raw else {
            return Ok(None);
        };
        Ok(Some(Contract {
            id,
            project_id,
            contract_number,
            created_at: parse_timestamp("created_at", &created_at)?,
        }))
    }

    /// Replaces a project's role assignment.
    pub fn save_assignment(&self, assignment: &Assignment) -> Result<()> {
        self.conn.execute(
            "INSERT INTO project_workflow_assignments
                (project_id, siteagent_id, inspector_id, are_id, re_id)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (project_id) DO UPDATE SET
                siteagent_id = excluded.siteagent_id,
                inspector_id = excluded.inspector_id,
                are_id = excluded.are_id,
                re_id = excluded.re_id",
            rusqlite::params![
                assignment.project_id,
                assignment.siteagent_id,
                assignment.inspector_id,
                assignment.are_id,
                assignment.re_id,
            ],
        )?;
        Ok(())
    }

    /// Who holds each workflow role on a project. `None` if unassigned.
    pub fn resolve_assignment(&self, project_id: i64) -> Result<Option<Assignment>> {
        Ok(self
            .conn
            .query_row(
                "SELECT project_id, siteagent_id, inspector_id, are_id, re_id
                 FROM project_workflow_assignments WHERE project_id = ?1",
                [project_id],
                |row| {
                    Ok(Assignment {
                        project_id: row.get(0)?,
                        siteagent_id: row.get(1)?,
                        inspector_id: row.get(2)?,
                        are_id: row.get(3)?,
                        re_id: row.get(4)?,
                    })
                },
            )
            .optional()?)
    }
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        project_number: row.get(1)?,
        name: row.get(2)?,
    })
}
