// src/db.rs

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::{PgPool, Row, postgres::PgPoolOptions, postgres::PgRow};
use uuid::Uuid;

use crate::config::Config;
use crate::models::{
    Appointment, AppointmentStatus, BookedSlot, Doctor, NewAppointment, Role, SessionRow,
};
use crate::store::{AppointmentStore, StoreError};

pub async fn connect_pg(cfg: &Config) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_max_connections)
        .acquire_timeout(cfg.storage_timeout)
        .connect(&cfg.database_url)
        .await?;

    sqlx::migrate!().run(&pool).await?;
    tracing::info!("database ready (max_connections={})", cfg.db_max_connections);
    Ok(pool)
}

/// Postgres-backed [`AppointmentStore`]. Every call is bounded by `timeout`.
pub struct PgStore {
    pool: PgPool,
    timeout: Duration,
}

const APPOINTMENT_SELECT: &str = r#"
    SELECT
      a.id,
      a.doctor_id,
      a.patient_id,
      to_char(a.appt_date, 'YYYY-MM-DD') AS date,
      to_char(a.appt_time, 'HH24:MI')    AS time,
      a.status,
      a.created_at,
      a.updated_at,
      d.name       AS doctor_name,
      d.city       AS city,
      d.fee::float8 AS fee,
      s.name       AS specialty
    FROM appointments a
    JOIN doctors d ON d.id = a.doctor_id
    LEFT JOIN specialties s ON s.id = d.specialty_id
"#;

const DOCTOR_SELECT: &str = r#"
    SELECT d.id, d.user_id, d.name, d.city, d.fee::float8 AS fee, s.name AS specialty
    FROM doctors d
    LEFT JOIN specialties s ON s.id = d.specialty_id
"#;

impl PgStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>> + Send,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(res) => res.map_err(map_sqlx),
            Err(_) => {
                tracing::warn!("storage call exceeded {:?}", self.timeout);
                Err(StoreError::Unavailable(format!(
                    "storage call exceeded {:?}",
                    self.timeout
                )))
            }
        }
    }

    async fn fetch_appointments(&self, filter: &str, id: i64) -> Result<Vec<Appointment>, StoreError> {
        let sql = format!("{APPOINTMENT_SELECT} {filter} ORDER BY a.appt_date ASC, a.appt_time ASC, a.id ASC");
        let rows = self
            .bounded(sqlx::query(&sql).bind(id).fetch_all(&self.pool))
            .await?;
        rows.iter().map(appointment_from_row).collect()
    }
}

fn map_sqlx(e: sqlx::Error) -> StoreError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::UniqueViolation,
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StoreError::MissingReference,
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(format!("db error: {e}"))
        }
        _ => StoreError::Database(format!("db error: {e}")),
    }
}

fn internal_row(e: sqlx::Error) -> StoreError {
    StoreError::Database(format!("row decode error: {e}"))
}

fn parse_date(date: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| StoreError::Database(format!("bad date {date}: {e}")))
}

fn parse_time(time: &str) -> Result<NaiveTime, StoreError> {
    NaiveTime::parse_from_str(time, "%H:%M")
        .map_err(|e| StoreError::Database(format!("bad time {time}: {e}")))
}

fn parse_status(raw: &str) -> Result<AppointmentStatus, StoreError> {
    raw.parse::<AppointmentStatus>().map_err(StoreError::Database)
}

fn appointment_from_row(r: &PgRow) -> Result<Appointment, StoreError> {
    let status: String = r.try_get("status").map_err(internal_row)?;
    Ok(Appointment {
        id: r.try_get("id").map_err(internal_row)?,
        doctor_id: r.try_get("doctor_id").map_err(internal_row)?,
        patient_id: r.try_get("patient_id").map_err(internal_row)?,
        date: r.try_get("date").map_err(internal_row)?,
        time: r.try_get("time").map_err(internal_row)?,
        status: parse_status(&status)?,
        doctor_name: r.try_get("doctor_name").map_err(internal_row)?,
        city: r.try_get("city").map_err(internal_row)?,
        fee: r.try_get("fee").map_err(internal_row)?,
        specialty: r.try_get("specialty").map_err(internal_row)?,
        created_at: r.try_get("created_at").map_err(internal_row)?,
        updated_at: r.try_get("updated_at").map_err(internal_row)?,
    })
}

fn doctor_from_row(r: &PgRow) -> Result<Doctor, StoreError> {
    Ok(Doctor {
        id: r.try_get("id").map_err(internal_row)?,
        user_id: r.try_get("user_id").map_err(internal_row)?,
        name: r.try_get("name").map_err(internal_row)?,
        city: r.try_get("city").map_err(internal_row)?,
        fee: r.try_get("fee").map_err(internal_row)?,
        specialty: r.try_get("specialty").map_err(internal_row)?,
    })
}

#[async_trait]
impl AppointmentStore for PgStore {
    async fn find_session(&self, token_hash: &str) -> Result<Option<SessionRow>, StoreError> {
        let row = self
            .bounded(
                sqlx::query(
                    r#"
                    SELECT st.session_token_id, st.user_id, u.role
                    FROM session_tokens st
                    JOIN users u ON u.id = st.user_id
                    WHERE st.session_token_hash = $1
                      AND st.revoked_at IS NULL
                      AND st.expires_at > now()
                    "#,
                )
                .bind(token_hash)
                .fetch_optional(&self.pool),
            )
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let role: String = row.try_get("role").map_err(internal_row)?;
        Ok(Some(SessionRow {
            session_token_id: row.try_get::<Uuid, _>("session_token_id").map_err(internal_row)?,
            user_id: row.try_get("user_id").map_err(internal_row)?,
            role: role.parse::<Role>().map_err(StoreError::Database)?,
        }))
    }

    async fn touch_session(&self, session_token_id: Uuid) -> Result<(), StoreError> {
        self.bounded(
            sqlx::query(
                r#"
                UPDATE session_tokens
                SET last_seen_at = now()
                WHERE session_token_id = $1
                "#,
            )
            .bind(session_token_id)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn find_doctor_by_id(&self, id: i64) -> Result<Option<Doctor>, StoreError> {
        let sql = format!("{DOCTOR_SELECT} WHERE d.id = $1");
        let row = self
            .bounded(sqlx::query(&sql).bind(id).fetch_optional(&self.pool))
            .await?;
        row.as_ref().map(doctor_from_row).transpose()
    }

    async fn find_doctor_by_user_id(&self, user_id: i64) -> Result<Option<Doctor>, StoreError> {
        let sql = format!("{DOCTOR_SELECT} WHERE d.user_id = $1");
        let row = self
            .bounded(sqlx::query(&sql).bind(user_id).fetch_optional(&self.pool))
            .await?;
        row.as_ref().map(doctor_from_row).transpose()
    }

    async fn list_appointments(&self, doctor_id: i64, date: &str) -> Result<Vec<BookedSlot>, StoreError> {
        let day = parse_date(date)?;
        let rows = self
            .bounded(
                sqlx::query(
                    r#"
                    SELECT id, to_char(appt_time, 'HH24:MI') AS time, status
                    FROM appointments
                    WHERE doctor_id = $1 AND appt_date = $2
                    ORDER BY appt_time ASC
                    "#,
                )
                .bind(doctor_id)
                .bind(day)
                .fetch_all(&self.pool),
            )
            .await?;

        rows.iter()
            .map(|r| {
                let status: String = r.try_get("status").map_err(internal_row)?;
                Ok(BookedSlot {
                    id: r.try_get("id").map_err(internal_row)?,
                    time: r.try_get("time").map_err(internal_row)?,
                    status: parse_status(&status)?,
                })
            })
            .collect()
    }

    async fn find_conflict(
        &self,
        doctor_id: i64,
        date: &str,
        time: &str,
    ) -> Result<Option<Appointment>, StoreError> {
        let sql = format!(
            "{APPOINTMENT_SELECT}
             WHERE a.doctor_id = $1 AND a.appt_date = $2 AND a.appt_time = $3
               AND lower(a.status) IN ('booked', 'confirmed')
             LIMIT 1"
        );
        let row = self
            .bounded(
                sqlx::query(&sql)
                    .bind(doctor_id)
                    .bind(parse_date(date)?)
                    .bind(parse_time(time)?)
                    .fetch_optional(&self.pool),
            )
            .await?;
        row.as_ref().map(appointment_from_row).transpose()
    }

    async fn insert_appointment(&self, new: NewAppointment) -> Result<i64, StoreError> {
        let row = self
            .bounded(
                sqlx::query(
                    r#"
                    INSERT INTO appointments (doctor_id, patient_id, appt_date, appt_time, status)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING id
                    "#,
                )
                .bind(new.doctor_id)
                .bind(new.patient_id)
                .bind(parse_date(&new.date)?)
                .bind(parse_time(&new.time)?)
                .bind(new.status.as_str())
                .fetch_one(&self.pool),
            )
            .await?;
        row.try_get("id").map_err(internal_row)
    }

    async fn find_appointment_by_id(&self, id: i64) -> Result<Option<Appointment>, StoreError> {
        Ok(self
            .fetch_appointments("WHERE a.id = $1", id)
            .await?
            .into_iter()
            .next())
    }

    async fn update_appointment_status(&self, id: i64, status: AppointmentStatus) -> Result<(), StoreError> {
        self.bounded(
            sqlx::query(
                r#"
                UPDATE appointments
                SET status = $2, updated_at = now()
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn update_appointment_date_time(
        &self,
        id: i64,
        date: &str,
        time: &str,
        status: AppointmentStatus,
    ) -> Result<(), StoreError> {
        self.bounded(
            sqlx::query(
                r#"
                UPDATE appointments
                SET appt_date = $2, appt_time = $3, status = $4, updated_at = now()
                WHERE id = $1
                "#,
            )
            .bind(id)
            .bind(parse_date(date)?)
            .bind(parse_time(time)?)
            .bind(status.as_str())
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn list_by_patient(&self, patient_id: i64) -> Result<Vec<Appointment>, StoreError> {
        self.fetch_appointments("WHERE a.patient_id = $1", patient_id).await
    }

    async fn list_by_doctor(&self, doctor_id: i64) -> Result<Vec<Appointment>, StoreError> {
        self.fetch_appointments("WHERE a.doctor_id = $1", doctor_id).await
    }
}

#[cfg(test)]
mod tests {
    use sqlx::error::{DatabaseError, ErrorKind};

    use super::*;

    /// Stand-in for a Postgres constraint error (23505 / 23503).
    #[derive(Debug, thiserror::Error)]
    #[error("constraint violated")]
    struct ConstraintError {
        unique: bool,
    }

    impl DatabaseError for ConstraintError {
        fn message(&self) -> &str {
            "constraint violated"
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            if self.unique {
                ErrorKind::UniqueViolation
            } else {
                ErrorKind::ForeignKeyViolation
            }
        }
    }

    #[test]
    fn constraint_violations_map_to_their_kinds() {
        let unique = sqlx::Error::Database(Box::new(ConstraintError { unique: true }));
        let foreign = sqlx::Error::Database(Box::new(ConstraintError { unique: false }));
        assert!(matches!(map_sqlx(unique), StoreError::UniqueViolation));
        assert!(matches!(map_sqlx(foreign), StoreError::MissingReference));
    }

    #[test]
    fn pool_timeouts_are_retryable() {
        assert!(matches!(map_sqlx(sqlx::Error::PoolTimedOut), StoreError::Unavailable(_)));
        assert!(matches!(map_sqlx(sqlx::Error::PoolClosed), StoreError::Unavailable(_)));
        assert!(matches!(map_sqlx(sqlx::Error::RowNotFound), StoreError::Database(_)));
    }

    #[test]
    fn stored_status_is_read_case_insensitively() {
        assert_eq!(parse_status("Cancelled").unwrap(), AppointmentStatus::Cancelled);
        assert_eq!(parse_status("BOOKED").unwrap(), AppointmentStatus::Booked);
        assert!(parse_status("no-show").is_err());
    }
}
