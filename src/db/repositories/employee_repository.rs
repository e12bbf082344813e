use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};

use crate::error::{AppError, AppResult};
use crate::models::employee::{Employee, EmployeeRole, EmployeeStatus};

#[derive(Debug, Clone)]
pub struct EmployeeRow {
    pub user_id: String,
    pub name: String,
    pub line_display_name: Option<String>,
    pub registered_at: String,
    pub status: String,
    pub role: String,
}

impl EmployeeRow {
    pub fn into_employee(self) -> AppResult<Employee> {
        let status = EmployeeStatus::try_from(self.status.as_str()).map_err(AppError::validation)?;
        let role = EmployeeRole::try_from(self.role.as_str()).map_err(AppError::validation)?;

        Ok(Employee {
            user_id: self.user_id,
            name: self.name,
            line_display_name: self.line_display_name,
            registered_at: self.registered_at,
            status,
            role,
        })
    }
}

impl TryFrom<&Row<'_>> for EmployeeRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            line_display_name: row.get("line_display_name")?,
            registered_at: row.get("registered_at")?,
            status: row.get("status")?,
            role: row.get("role")?,
        })
    }
}

pub struct EmployeeRepository;

impl EmployeeRepository {
    pub fn insert(conn: &Connection, employee: &Employee) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO employees (
                    user_id,
                    name,
                    line_display_name,
                    registered_at,
                    status,
                    role
                ) VALUES (
                    :user_id,
                    :name,
                    :line_display_name,
                    :registered_at,
                    :status,
                    :role
                )
            "#,
            named_params! {
                ":user_id": &employee.user_id,
                ":name": &employee.name,
                ":line_display_name": &employee.line_display_name,
                ":registered_at": &employee.registered_at,
                ":status": employee.status.as_str(),
                ":role": employee.role.as_str(),
            },
        )?;

        Ok(())
    }

    pub fn find(conn: &Connection, user_id: &str) -> AppResult<Option<Employee>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT user_id, name, line_display_name, registered_at, status, role
                FROM employees
                WHERE user_id = :user_id
            "#,
        )?;

        let row = stmt
            .query_row(named_params! {":user_id": user_id}, |row| {
                EmployeeRow::try_from(row)
            })
            .optional()?;

        row.map(EmployeeRow::into_employee).transpose()
    }

    pub fn list_all(conn: &Connection) -> AppResult<Vec<Employee>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT user_id, name, line_display_name, registered_at, status, role
                FROM employees
                ORDER BY registered_at ASC, user_id ASC
            "#,
        )?;

        let employees = stmt
            .query_map([], |row| EmployeeRow::try_from(row))?
            .map(|row| {
                row.map_err(AppError::from)
                    .and_then(|row| row.into_employee())
            })
            .collect::<AppResult<Vec<_>>>()?;

        Ok(employees)
    }

    /// Returns the number of rows touched; zero means the employee does not exist.
    pub fn update_role(conn: &Connection, user_id: &str, role: EmployeeRole) -> AppResult<usize> {
        let changed = conn.execute(
            "UPDATE employees SET role = :role WHERE user_id = :user_id",
            named_params! {":role": role.as_str(), ":user_id": user_id},
        )?;
        Ok(changed)
    }

    pub fn update_status(
        conn: &Connection,
        user_id: &str,
        status: EmployeeStatus,
    ) -> AppResult<usize> {
        let changed = conn.execute(
            "UPDATE employees SET status = :status WHERE user_id = :user_id",
            named_params! {":status": status.as_str(), ":user_id": user_id},
        )?;
        Ok(changed)
    }
}
