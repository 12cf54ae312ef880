use anyhow::anyhow;
use chrono::Utc;
use eventboard_core::AppError;
use eventboard_models::{
    CreateEventDto, Event, EventFilterParams, EventSearchParams, UpdateEventDto,
};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;
use uuid::Uuid;

/// Columns of [`Event`], with the registration count computed per row.
const EVENT_COLUMNS: &str = r#"
    e.id, e.title, e.description, e.category, e.location, e.starts_at, e.ends_at, e.capacity,
    (SELECT COUNT(*) FROM registrations r WHERE r.event_id = e.id) AS registration_count,
    e.created_at, e.updated_at
"#;

pub struct EventService;

impl EventService {
    #[instrument(skip(db))]
    pub async fn list_events(
        db: &PgPool,
        params: &EventFilterParams,
    ) -> Result<(Vec<Event>, i64), AppError> {
        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {EVENT_COLUMNS} FROM events e WHERE TRUE"
        ));
        push_list_filters(&mut query, params);
        query
            .push(" ORDER BY e.starts_at ASC, e.id ASC LIMIT ")
            .push_bind(params.pagination.limit())
            .push(" OFFSET ")
            .push_bind(params.pagination.offset());

        let events = query
            .build_query_as::<Event>()
            .fetch_all(db)
            .await
            .map_err(AppError::database)?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM events e WHERE TRUE");
        push_list_filters(&mut count, params);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(db)
            .await
            .map_err(AppError::database)?;

        Ok((events, total))
    }

    /// Case-insensitive text search over title, description and location.
    #[instrument(skip(db))]
    pub async fn search_events(
        db: &PgPool,
        params: &EventSearchParams,
    ) -> Result<(Vec<Event>, i64), AppError> {
        if let (Some(from), Some(to)) = (params.from, params.to) {
            if from > to {
                return Err(AppError::bad_request(anyhow!(
                    "'from' must not be after 'to'"
                )));
            }
        }

        let mut query = QueryBuilder::<Postgres>::new(format!(
            "SELECT {EVENT_COLUMNS} FROM events e WHERE TRUE"
        ));
        push_search_filters(&mut query, params);
        query
            .push(" ORDER BY e.starts_at ASC, e.id ASC LIMIT ")
            .push_bind(params.pagination.limit())
            .push(" OFFSET ")
            .push_bind(params.pagination.offset());

        let events = query
            .build_query_as::<Event>()
            .fetch_all(db)
            .await
            .map_err(AppError::database)?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM events e WHERE TRUE");
        push_search_filters(&mut count, params);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(db)
            .await
            .map_err(AppError::database)?;

        Ok((events, total))
    }

    #[instrument(skip(db))]
    pub async fn get_event(db: &PgPool, id: Uuid) -> Result<Event, AppError> {
        sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events e WHERE e.id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow!("Event not found")))
    }

    #[instrument(skip(db, dto), fields(title = %dto.title))]
    pub async fn create_event(db: &PgPool, dto: CreateEventDto) -> Result<Event, AppError> {
        if !dto.has_valid_time_range() {
            return Err(AppError::unprocessable(anyhow!(
                "ends_at must not be before starts_at"
            )));
        }

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO events (title, description, category, location, starts_at, ends_at, capacity)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(&dto.title)
        .bind(&dto.description)
        .bind(&dto.category)
        .bind(&dto.location)
        .bind(dto.starts_at)
        .bind(dto.ends_at)
        .bind(dto.capacity)
        .fetch_one(db)
        .await
        .map_err(AppError::database)?;

        Self::get_event(db, id).await
    }

    /// Applies the fields present in `dto` on top of the stored event.
    #[instrument(skip(db, dto))]
    pub async fn update_event(
        db: &PgPool,
        id: Uuid,
        dto: UpdateEventDto,
    ) -> Result<Event, AppError> {
        let existing = Self::get_event(db, id).await?;

        let starts_at = dto.starts_at.unwrap_or(existing.starts_at);
        let ends_at = dto.ends_at.unwrap_or(existing.ends_at);
        if ends_at < starts_at {
            return Err(AppError::unprocessable(anyhow!(
                "ends_at must not be before starts_at"
            )));
        }

        let capacity = dto.capacity.or(existing.capacity);
        if let Some(capacity) = capacity {
            if i64::from(capacity) < existing.registration_count {
                return Err(AppError::conflict(anyhow!(
                    "Capacity is below the current number of registrations"
                )));
            }
        }

        let result = sqlx::query(
            r#"
            UPDATE events
            SET title = $1, description = $2, category = $3, location = $4,
                starts_at = $5, ends_at = $6, capacity = $7, updated_at = $8
            WHERE id = $9
            "#,
        )
        .bind(dto.title.unwrap_or(existing.title))
        .bind(dto.description.or(existing.description))
        .bind(dto.category.unwrap_or(existing.category))
        .bind(dto.location.unwrap_or(existing.location))
        .bind(starts_at)
        .bind(ends_at)
        .bind(capacity)
        .bind(Utc::now())
        .bind(id)
        .execute(db)
        .await
        .map_err(AppError::database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Event not found")));
        }

        Self::get_event(db, id).await
    }

    #[instrument(skip(db))]
    pub async fn delete_event(db: &PgPool, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(db)
            .await
            .map_err(AppError::database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Event not found")));
        }

        Ok(())
    }
}

fn push_list_filters(query: &mut QueryBuilder<'_, Postgres>, params: &EventFilterParams) {
    if let Some(category) = &params.category {
        query.push(" AND e.category = ").push_bind(category.clone());
    }
    if params.upcoming == Some(true) {
        query.push(" AND e.ends_at >= ").push_bind(Utc::now());
    }
}

fn push_search_filters(query: &mut QueryBuilder<'_, Postgres>, params: &EventSearchParams) {
    if let Some(q) = &params.q {
        let pattern = format!("%{}%", escape_like(q));
        query
            .push(" AND (e.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR e.description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR e.location ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(category) = &params.category {
        query.push(" AND e.category = ").push_bind(category.clone());
    }
    if let Some(from) = params.from {
        query.push(" AND e.starts_at >= ").push_bind(from);
    }
    if let Some(to) = params.to {
        query.push(" AND e.starts_at <= ").push_bind(to);
    }
}

/// Escapes `LIKE` wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
