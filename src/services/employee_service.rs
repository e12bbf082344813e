use std::sync::Arc;

use tracing::info;

use crate::db::repositories::employee_repository::EmployeeRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::employee::{Employee, EmployeeRegisterInput, EmployeeRole, EmployeeStatus};
use crate::utils::clock::Clock;

pub struct EmployeeService {
    db: DbPool,
    clock: Arc<dyn Clock>,
}

impl EmployeeService {
    pub fn new(db: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub fn register(&self, input: EmployeeRegisterInput) -> AppResult<Employee> {
        let user_id = input.user_id.trim().to_string();
        let name = input.name.trim().to_string();
        if user_id.is_empty() {
            return Err(AppError::validation("缺少使用者 ID"));
        }
        if name.is_empty() {
            return Err(AppError::validation("請輸入員工姓名"));
        }

        let employee = Employee {
            user_id,
            name,
            line_display_name: input.line_display_name,
            registered_at: self.clock.now().to_rfc3339(),
            status: EmployeeStatus::Active,
            role: EmployeeRole::Employee,
        };

        self.db.with_connection(|conn| {
            if EmployeeRepository::find(conn, &employee.user_id)?.is_some() {
                return Err(AppError::conflict("此帳號已註冊"));
            }
            EmployeeRepository::insert(conn, &employee)
        })?;

        info!(target: "app::employee", user_id = %employee.user_id, name = %employee.name, "employee registered");
        Ok(employee)
    }

    pub fn find(&self, user_id: &str) -> AppResult<Option<Employee>> {
        self.db
            .with_connection(|conn| EmployeeRepository::find(conn, user_id))
    }

    pub fn get(&self, user_id: &str) -> AppResult<Employee> {
        self.find(user_id)?
            .ok_or_else(|| AppError::not_found(format!("找不到員工: {user_id}")))
    }

    pub fn list_all(&self) -> AppResult<Vec<Employee>> {
        self.db.with_connection(EmployeeRepository::list_all)
    }

    pub fn list_active(&self) -> AppResult<Vec<Employee>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(Employee::is_active)
            .collect())
    }

    pub fn list_active_admins(&self) -> AppResult<Vec<Employee>> {
        Ok(self
            .list_active()?
            .into_iter()
            .filter(Employee::is_admin)
            .collect())
    }

    pub fn set_role(&self, user_id: &str, role: EmployeeRole) -> AppResult<Employee> {
        let changed = self
            .db
            .with_connection(|conn| EmployeeRepository::update_role(conn, user_id, role))?;
        if changed == 0 {
            return Err(AppError::not_found(format!("找不到員工: {user_id}")));
        }
        info!(target: "app::employee", %user_id, role = %role, "employee role changed");
        self.get(user_id)
    }

    pub fn set_status(&self, user_id: &str, status: EmployeeStatus) -> AppResult<Employee> {
        let changed = self
            .db
            .with_connection(|conn| EmployeeRepository::update_status(conn, user_id, status))?;
        if changed == 0 {
            return Err(AppError::not_found(format!("找不到員工: {user_id}")));
        }
        info!(target: "app::employee", %user_id, status = %status, "employee status changed");
        self.get(user_id)
    }
}
