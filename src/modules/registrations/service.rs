use anyhow::anyhow;
use eventboard_core::AppError;
use eventboard_models::{CreateRegistrationDto, Registration};
use sqlx::PgPool;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Result of a registration attempt that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationOutcome {
    Created(Registration),
    /// The email was already registered for this event.
    Existing(Registration),
}

impl RegistrationOutcome {
    pub fn into_inner(self) -> Registration {
        match self {
            Self::Created(r) | Self::Existing(r) => r,
        }
    }
}

pub struct RegistrationService;

impl RegistrationService {
    /// Registers an attendee, at most once per email and event.
    ///
    /// The event row is locked for the duration of the transaction, so
    /// concurrent registrations cannot overfill it.
    #[instrument(skip(db, dto))]
    pub async fn register(
        db: &PgPool,
        event_id: Uuid,
        dto: CreateRegistrationDto,
    ) -> Result<RegistrationOutcome, AppError> {
        let email = dto.normalized_email();
        let mut tx = db.begin().await.map_err(AppError::database)?;

        let capacity: Option<i32> =
            sqlx::query_scalar("SELECT capacity FROM events WHERE id = $1 FOR UPDATE")
                .bind(event_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(AppError::database)?
                .ok_or_else(|| AppError::not_found(anyhow!("Event not found")))?;

        let existing = sqlx::query_as::<_, Registration>(
            r#"
            SELECT id, event_id, name, email, created_at
            FROM registrations
            WHERE event_id = $1 AND email = $2
            "#,
        )
        .bind(event_id)
        .bind(&email)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::database)?;

        if let Some(registration) = existing {
            tx.commit().await.map_err(AppError::database)?;
            debug!(registration.id = %registration.id, "Registration already exists");
            return Ok(RegistrationOutcome::Existing(registration));
        }

        if let Some(capacity) = capacity {
            let taken: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM registrations WHERE event_id = $1")
                    .bind(event_id)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(AppError::database)?;

            if taken >= i64::from(capacity) {
                return Err(AppError::conflict(anyhow!("Event is full")));
            }
        }

        let registration = sqlx::query_as::<_, Registration>(
            r#"
            INSERT INTO registrations (event_id, name, email)
            VALUES ($1, $2, $3)
            RETURNING id, event_id, name, email, created_at
            "#,
        )
        .bind(event_id)
        .bind(dto.name.trim())
        .bind(&email)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::database)?;

        tx.commit().await.map_err(AppError::database)?;
        Ok(RegistrationOutcome::Created(registration))
    }

    #[instrument(skip(db))]
    pub async fn list_registrations(
        db: &PgPool,
        event_id: Uuid,
    ) -> Result<Vec<Registration>, AppError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)")
            .bind(event_id)
            .fetch_one(db)
            .await
            .map_err(AppError::database)?;

        if !exists {
            return Err(AppError::not_found(anyhow!("Event not found")));
        }

        sqlx::query_as::<_, Registration>(
            r#"
            SELECT id, event_id, name, email, created_at
            FROM registrations
            WHERE event_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(event_id)
        .fetch_all(db)
        .await
        .map_err(AppError::database)
    }
}
