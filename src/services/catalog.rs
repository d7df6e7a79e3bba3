use std::time::Duration;

use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};

use crate::db::with_timeout;
use crate::entities::service;
use crate::error::{AppError, AppResult};

/// Active services ordered by category then name.
pub async fn list_services(
    db: &DatabaseConnection,
    timeout: Duration,
    category: Option<&str>,
) -> AppResult<Vec<service::Model>> {
    let category = category.map(str::trim).filter(|c| !c.is_empty());

    with_timeout("list_services", timeout, async {
        let mut query = service::Entity::find().filter(service::Column::IsActive.eq(true));

        if let Some(category) = category {
            query = query.filter(service::Column::Category.eq(category));
        }

        Ok(query
            .order_by_asc(service::Column::Category)
            .order_by_asc(service::Column::Name)
            .all(db)
            .await?)
    })
    .await
}

pub async fn find_active_service(
    db: &DatabaseConnection,
    timeout: Duration,
    id: i32,
) -> AppResult<service::Model> {
    with_timeout("find_service", timeout, active_service(db, id)).await
}

/// Missing and retired services are both NotFound.
pub(crate) async fn active_service<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> AppResult<service::Model> {
    service::Entity::find_by_id(id)
        .filter(service::Column::IsActive.eq(true))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::NotFound("Service not found".to_string()))
}
