//! Staff directory service
//!
//! Account management for the hotel's staff. Accounts are deactivated, not
//! deleted; billing history keeps referencing them.

use chrono::NaiveDate;
use innkeep_core::{
    models::{Staff, StaffRole},
    traits::{Repository, StaffRepository},
    AppError, AppResult,
};
use std::sync::Arc;
use tracing::{info, instrument};

/// Staff directory
pub struct StaffDirectory<S: StaffRepository> {
    staff_repo: Arc<S>,
}

impl<S: StaffRepository> StaffDirectory<S> {
    /// Create a new staff directory
    pub fn new(staff_repo: Arc<S>) -> Self {
        Self { staff_repo }
    }

    /// Add a staff member
    #[instrument(skip(self))]
    pub async fn add_member(
        &self,
        full_name: String,
        email: String,
        role: StaffRole,
        phone: Option<String>,
        hire_date: NaiveDate,
        notes: Option<String>,
    ) -> AppResult<Staff> {
        if full_name.trim().is_empty() {
            return Err(AppError::MissingField("full_name".to_string()));
        }
        if email.trim().is_empty() {
            return Err(AppError::MissingField("email".to_string()));
        }

        let mut staff = Staff::new(full_name, email, role, phone, hire_date);
        staff.notes = notes;
        let created = self.staff_repo.create(&staff).await?;
        info!("Added staff member {} as {}", created.email, created.role);
        Ok(created)
    }

    /// Fetch a staff member or fail
    pub async fn get_member(&self, id: i32) -> AppResult<Staff> {
        self.staff_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::StaffNotFound(id))
    }

    /// All staff, active or not
    pub async fn list_members(&self, limit: i64, offset: i64) -> AppResult<Vec<Staff>> {
        self.staff_repo.find_all(limit, offset).await
    }

    /// Active staff, optionally filtered by role
    pub async fn active_members(&self, role: Option<&str>) -> AppResult<Vec<Staff>> {
        self.staff_repo.find_active(role).await
    }

    /// Change a member's name, contact details, role, or notes
    #[instrument(skip(self))]
    pub async fn update_member(
        &self,
        id: i32,
        full_name: Option<String>,
        email: Option<String>,
        phone: Option<String>,
        role: Option<StaffRole>,
        notes: Option<String>,
    ) -> AppResult<Staff> {
        let mut staff = self.get_member(id).await?;

        if let Some(v) = full_name {
            staff.full_name = v;
        }
        if let Some(v) = email {
            staff.email = v;
        }
        if let Some(v) = phone {
            staff.phone = Some(v);
        }
        if let Some(r) = role {
            staff.role = r;
        }
        if let Some(v) = notes {
            staff.notes = Some(v);
        }

        self.staff_repo.update(&staff).await
    }

    /// Deactivate an account as of the given date, keeping its history
    #[instrument(skip(self))]
    pub async fn deactivate_member(&self, id: i32, date: NaiveDate) -> AppResult<Staff> {
        let mut staff = self.get_member(id).await?;

        if !staff.deactivate(date) {
            return Err(AppError::StateConflict(format!(
                "Staff member {} is already inactive",
                id
            )));
        }

        let updated = self.staff_repo.update(&staff).await?;
        info!("Deactivated staff member {}", id);
        Ok(updated)
    }

    /// Reactivate a previously deactivated account
    #[instrument(skip(self))]
    pub async fn activate_member(&self, id: i32) -> AppResult<Staff> {
        let mut staff = self.get_member(id).await?;

        if !staff.activate() {
            return Err(AppError::StateConflict(format!(
                "Staff member {} is already active",
                id
            )));
        }

        let updated = self.staff_repo.update(&staff).await?;
        info!("Reactivated staff member {}", id);
        Ok(updated)
    }
}
