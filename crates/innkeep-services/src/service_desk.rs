//! Service desk service
//!
//! Manages the price list and the per-visit service orders. Order state
//! changes that affect money (completion, cancellation of a completed line)
//! update the owning visit's running totals in the same transaction.

use innkeep_core::{
    models::{Service, ServiceOrder},
    traits::{Repository, ServiceOrderRepository, ServiceRepository, VisitRepository},
    AppError, AppResult,
};
use innkeep_db::repositories::{
    guest_repo::PgVisitRepository, service_repo::PgServiceOrderRepository,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Service desk
pub struct ServiceDesk<S: ServiceRepository, O: ServiceOrderRepository, V: VisitRepository> {
    service_repo: Arc<S>,
    order_repo: Arc<O>,
    visit_repo: Arc<V>,
    pool: Arc<PgPool>,
}

impl<S: ServiceRepository, O: ServiceOrderRepository, V: VisitRepository> ServiceDesk<S, O, V> {
    /// Create a new service desk
    pub fn new(
        service_repo: Arc<S>,
        order_repo: Arc<O>,
        visit_repo: Arc<V>,
        pool: Arc<PgPool>,
    ) -> Self {
        Self {
            service_repo,
            order_repo,
            visit_repo,
            pool,
        }
    }

    /// Add a service to the price list
    #[instrument(skip(self))]
    pub async fn add_service(
        &self,
        code: String,
        title: String,
        base_price: Decimal,
    ) -> AppResult<Service> {
        if code.trim().is_empty() {
            return Err(AppError::MissingField("code".to_string()));
        }
        if base_price < Decimal::ZERO {
            return Err(AppError::InvalidInput("base_price cannot be negative".to_string()));
        }

        let service = Service::new(code, title, base_price);
        let created = self.service_repo.create(&service).await?;
        info!("Added service {} at {}", created.code, created.base_price);
        Ok(created)
    }

    /// Fetch a service or fail
    pub async fn get_service(&self, id: i32) -> AppResult<Service> {
        self.service_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::ServiceNotFound(id))
    }

    /// Full price list
    pub async fn list_services(&self, limit: i64, offset: i64) -> AppResult<Vec<Service>> {
        self.service_repo.find_all(limit, offset).await
    }

    /// Active services only
    pub async fn active_services(&self) -> AppResult<Vec<Service>> {
        self.service_repo.find_active().await
    }

    /// Update price-list attributes. Existing orders keep their snapshots.
    #[instrument(skip(self))]
    pub async fn update_service(
        &self,
        id: i32,
        title: Option<String>,
        base_price: Option<Decimal>,
        is_active: Option<bool>,
    ) -> AppResult<Service> {
        let mut service = self.get_service(id).await?;

        if let Some(t) = title {
            service.title = t;
        }
        if let Some(p) = base_price {
            if p < Decimal::ZERO {
                return Err(AppError::InvalidInput("base_price cannot be negative".to_string()));
            }
            service.base_price = p;
        }
        if let Some(a) = is_active {
            service.is_active = a;
        }

        self.service_repo.update(&service).await
    }

    /// Place an order against an open visit.
    ///
    /// The unit price is snapshotted from the current price list; quantity
    /// is coerced to at least 1.
    #[instrument(skip(self))]
    pub async fn place_order(
        &self,
        visit_id: i32,
        service_id: i32,
        quantity: i32,
        note: Option<String>,
    ) -> AppResult<ServiceOrder> {
        let visit = self
            .visit_repo
            .find_by_id(visit_id)
            .await?
            .ok_or(AppError::VisitNotFound(visit_id))?;

        if !visit.is_open() {
            return Err(AppError::StateConflict(format!(
                "Visit {} is closed, no further orders",
                visit_id
            )));
        }

        let service = self.get_service(service_id).await?;
        if !service.is_active {
            return Err(AppError::StateConflict(format!(
                "Service {} is not offered",
                service.code
            )));
        }

        let order = ServiceOrder::new(visit_id, service_id, quantity, service.base_price, note);
        let created = self.order_repo.create(&order).await?;

        info!(
            "Placed order {} ({} x{}) for visit {}",
            created.id, service.code, created.quantity, visit_id
        );

        Ok(created)
    }

    /// Fetch an order or fail
    pub async fn get_order(&self, id: i32) -> AppResult<ServiceOrder> {
        self.order_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::ServiceOrderNotFound(id))
    }

    /// Orders for one visit
    pub async fn visit_orders(&self, visit_id: i32) -> AppResult<Vec<ServiceOrder>> {
        self.visit_repo
            .find_by_id(visit_id)
            .await?
            .ok_or(AppError::VisitNotFound(visit_id))?;
        self.order_repo.find_by_visit(visit_id).await
    }

    /// Mark an order delivered and fold it into the visit's totals
    #[instrument(skip(self))]
    pub async fn complete_order(&self, id: i32) -> AppResult<ServiceOrder> {
        let mut order = self.get_order(id).await?;

        if !order.complete() {
            return Err(AppError::StateConflict(format!(
                "Order {} is cancelled and cannot be completed",
                id
            )));
        }

        self.apply_order_change(&order).await
    }

    /// Cancel a pending order. Completed orders cannot be cancelled.
    #[instrument(skip(self))]
    pub async fn cancel_order(&self, id: i32) -> AppResult<ServiceOrder> {
        let mut order = self.get_order(id).await?;

        if !order.cancel() {
            return Err(AppError::StateConflict(format!(
                "Order {} is completed and cannot be cancelled",
                id
            )));
        }

        self.apply_order_change(&order).await
    }

    /// Persist an order state change together with the owning visit's
    /// recomputed totals.
    async fn apply_order_change(&self, order: &ServiceOrder) -> AppResult<ServiceOrder> {
        let mut visit = self
            .visit_repo
            .find_by_id(order.visit_id)
            .await?
            .ok_or(AppError::VisitNotFound(order.visit_id))?;

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        let updated = PgServiceOrderRepository::update_in_tx(&mut tx, order).await?;

        let orders = PgServiceOrderRepository::find_by_visit_in_tx(&mut tx, visit.id).await?;
        visit.recalc_totals(&orders);
        PgVisitRepository::update_in_tx(&mut tx, &visit).await?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit order transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        info!(
            "Order {} now {}, visit {} services total {}",
            updated.id, updated.status, visit.id, visit.services_amount
        );

        Ok(updated)
    }
}
