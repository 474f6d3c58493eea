use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::db::CopyStore;
use crate::errors::AppError;
use crate::models::{
    MasterApplication, MasterSummary, MasterTrader, PerformancePoint, Signal, MAX_AMOUNT,
};

const MAX_PAGE_SIZE: i64 = 100;
const DEFAULT_PAGE_SIZE: i64 = 20;
const DETAIL_SIGNALS: i64 = 20;
const DETAIL_PERFORMANCE_ROWS: i64 = 30;

#[derive(Debug, Serialize)]
pub struct MasterPage {
    pub masters: Vec<MasterSummary>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct MasterDetail {
    pub master: MasterTrader,
    pub recent_signals: Vec<Signal>,
    pub performance_history: Vec<PerformancePoint>,
}

/// Master applications, admin approval and the public directory.
#[derive(Clone)]
pub struct MasterService {
    store: Arc<dyn CopyStore>,
    default_base_allocation: Decimal,
}

impl MasterService {
    pub fn new(store: Arc<dyn CopyStore>, default_base_allocation: Decimal) -> Self {
        Self {
            store,
            default_base_allocation,
        }
    }

    pub async fn apply(
        &self,
        user_id: Uuid,
        application: MasterApplication,
    ) -> Result<MasterTrader, AppError> {
        if application.strategy_name.trim().is_empty() {
            return Err(AppError::Validation("strategy_name is required".into()));
        }
        let fee = application.performance_fee_percentage;
        if fee < Decimal::ZERO || fee > Decimal::ONE_HUNDRED {
            return Err(AppError::Validation(
                "performance_fee_percentage must be in [0, 100]".into(),
            ));
        }
        let base_allocation = application
            .base_allocation
            .unwrap_or(self.default_base_allocation);
        validate_base_allocation(base_allocation)?;

        let master = self
            .store
            .insert_master_application(user_id, &application, base_allocation)
            .await?
            .ok_or_else(|| AppError::Conflict("Master trader application already exists".into()))?;

        tracing::info!(
            master_id = %master.id,
            user_id = %user_id,
            strategy = %master.strategy_name,
            "Master trader application submitted"
        );
        Ok(master)
    }

    pub async fn approve(
        &self,
        master_id: Uuid,
        base_allocation: Option<Decimal>,
    ) -> Result<MasterTrader, AppError> {
        let existing = self
            .store
            .get_master(master_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Master trader not found".into()))?;

        let base_allocation = base_allocation.unwrap_or(existing.base_allocation);
        validate_base_allocation(base_allocation)?;

        let master = self
            .store
            .approve_master(master_id, base_allocation)
            .await?
            .ok_or_else(|| AppError::NotFound("Master trader not found".into()))?;

        tracing::info!(master_id = %master.id, base_allocation = %base_allocation, "Master trader approved");
        Ok(master)
    }

    pub async fn deactivate(&self, master_id: Uuid) -> Result<MasterTrader, AppError> {
        let master = self
            .store
            .set_master_active(master_id, false)
            .await?
            .ok_or_else(|| AppError::NotFound("Master trader not found".into()))?;

        tracing::warn!(master_id = %master.id, "Master trader deactivated, propagation disabled");
        Ok(master)
    }

    pub async fn list(&self, page: Option<i64>, limit: Option<i64>) -> Result<MasterPage, AppError> {
        let page = page.unwrap_or(1).max(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = (page - 1)
            .checked_mul(limit)
            .ok_or_else(|| AppError::Validation("page is out of range".into()))?;

        let masters = self.store.list_public_masters(limit, offset).await?;
        let total = self.store.count_public_masters().await?;

        Ok(MasterPage {
            masters,
            page,
            limit,
            total,
        })
    }

    pub async fn detail(&self, master_id: Uuid) -> Result<MasterDetail, AppError> {
        let master = self
            .store
            .get_master(master_id)
            .await?
            .filter(|m| m.is_active)
            .ok_or_else(|| AppError::NotFound("Master trader not found".into()))?;

        let recent_signals = self.store.recent_signals(master_id, DETAIL_SIGNALS).await?;
        let performance_history = self
            .store
            .performance_history(master_id, DETAIL_PERFORMANCE_ROWS)
            .await?;

        Ok(MasterDetail {
            master,
            recent_signals,
            performance_history,
        })
    }
}

fn validate_base_allocation(amount: Decimal) -> Result<(), AppError> {
    if amount <= Decimal::ZERO || amount > MAX_AMOUNT {
        return Err(AppError::Validation(format!(
            "base_allocation must be in (0, {MAX_AMOUNT}]"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::models::RiskLevel;
    use rust_decimal_macros::dec;

    fn application() -> MasterApplication {
        MasterApplication {
            strategy_name: "momentum".into(),
            strategy_description: Some("trend following".into()),
            risk_level: RiskLevel::Aggressive,
            performance_fee_percentage: dec!(20),
            base_allocation: None,
        }
    }

    #[tokio::test]
    async fn test_apply_then_approve_makes_public() {
        let service = MasterService::new(Arc::new(MemoryStore::new()), dec!(10000));
        let master = service.apply(Uuid::new_v4(), application()).await.unwrap();
        assert_eq!(master.base_allocation, dec!(10000));

        // Pending masters are hidden
        assert!(matches!(service.detail(master.id).await, Err(AppError::NotFound(_))));

        service.approve(master.id, Some(dec!(25000))).await.unwrap();
        let page = service.list(None, None).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.masters[0].master.base_allocation, dec!(25000));
    }

    #[tokio::test]
    async fn test_duplicate_application_conflicts() {
        let service = MasterService::new(Arc::new(MemoryStore::new()), dec!(10000));
        let user = Uuid::new_v4();
        service.apply(user, application()).await.unwrap();
        assert!(matches!(
            service.apply(user, application()).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_apply_rejects_bad_fee() {
        let service = MasterService::new(Arc::new(MemoryStore::new()), dec!(10000));
        let mut app = application();
        app.performance_fee_percentage = dec!(101);
        assert!(matches!(
            service.apply(Uuid::new_v4(), app).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_list_clamps_limit() {
        let service = MasterService::new(Arc::new(MemoryStore::new()), dec!(10000));
        let page = service.list(Some(0), Some(1000)).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.limit, 100);
    }

    #[tokio::test]
    async fn test_list_rejects_unreachable_page() {
        let service = MasterService::new(Arc::new(MemoryStore::new()), dec!(10000));
        assert!(matches!(
            service.list(Some(i64::MAX), Some(100)).await,
            Err(AppError::Validation(_))
        ));

        let page = service.list(Some(i64::MAX), Some(1)).await.unwrap();
        assert!(page.masters.is_empty());
    }

    #[tokio::test]
    async fn test_base_allocation_bounds() {
        let service = MasterService::new(Arc::new(MemoryStore::new()), dec!(10000));
        let mut app = application();
        app.base_allocation = Some(MAX_AMOUNT + Decimal::ONE);
        assert!(matches!(
            service.apply(Uuid::new_v4(), app).await,
            Err(AppError::Validation(_))
        ));

        let master = service.apply(Uuid::new_v4(), application()).await.unwrap();
        assert!(matches!(
            service.approve(master.id, Some(Decimal::ZERO)).await,
            Err(AppError::Validation(_))
        ));
    }
}
