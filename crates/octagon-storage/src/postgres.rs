//! Postgres-backed [`Store`] built on sqlx.

use async_trait::async_trait;
use chrono::Utc;
use octagon_core::{
    Event, EventPatch, ExternalIds, Fight, FightPatch, Fighter, FighterPatch, NewEvent, NewFight,
    NewFighter, NewOrganization, Organization, OrganizationPatch,
};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Row, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::{EntityKind, FieldValue, Predicate, Store, StoreError, Upserted};

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    async fn find_row(
        &self,
        kind: EntityKind,
        pred: &Predicate,
    ) -> Result<Option<PgRow>, StoreError> {
        pred.validate(kind)?;
        let mut qb = select_matching(kind, pred);
        qb.push(" ORDER BY created_at LIMIT 1");
        qb.build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| map_sqlx(kind, err))
    }

    async fn begin(&self) -> Result<Transaction<'static, Postgres>, StoreError> {
        self.pool
            .begin()
            .await
            .map_err(|err| StoreError::Unavailable(err.to_string()))
    }
}

fn table(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Organization => "organizations",
        EntityKind::Event => "events",
        EntityKind::Fighter => "fighters",
        EntityKind::Fight => "fights",
    }
}

fn select_matching(kind: EntityKind, pred: &Predicate) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!("SELECT * FROM {} WHERE ", table(kind)));
    push_predicate(&mut qb, pred);
    qb
}

fn push_predicate(qb: &mut QueryBuilder<'static, Postgres>, pred: &Predicate) {
    match pred {
        Predicate::Eq(field, FieldValue::Text(value)) => {
            qb.push(field.column()).push(" = ").push_bind(value.clone());
        }
        Predicate::Eq(field, FieldValue::Id(id)) => {
            qb.push(field.column()).push(" = ").push_bind(*id);
        }
        Predicate::Contains(field, needle) => {
            qb.push(format!("strpos({}, ", field.column()))
                .push_bind(needle.clone())
                .push(") > 0");
        }
        Predicate::ExternalId { provider, id } => {
            qb.push("external_ids ->> ")
                .push_bind(provider.clone())
                .push(" = ")
                .push_bind(id.clone());
        }
        Predicate::HasExternalId(provider) => {
            qb.push("external_ids ->> ")
                .push_bind(provider.clone())
                .push(" IS NOT NULL");
        }
        Predicate::Id(id) => {
            qb.push("id = ").push_bind(*id);
        }
        Predicate::Any(preds) => push_group(qb, preds, " OR ", "FALSE"),
        Predicate::All(preds) => push_group(qb, preds, " AND ", "TRUE"),
    }
}

fn push_group(
    qb: &mut QueryBuilder<'static, Postgres>,
    preds: &[Predicate],
    joiner: &str,
    empty: &str,
) {
    if preds.is_empty() {
        qb.push(empty);
        return;
    }
    qb.push("(");
    for (i, pred) in preds.iter().enumerate() {
        if i > 0 {
            qb.push(joiner);
        }
        push_predicate(qb, pred);
    }
    qb.push(")");
}

fn map_sqlx(kind: EntityKind, err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            let field = match db.constraint() {
                Some("organizations_name_key") => "name",
                Some("events_slug_key") => "slug",
                _ => "unknown",
            };
            StoreError::UniqueViolation {
                entity: kind.as_str(),
                field,
                value: db.message().to_string(),
            }
        }
        sqlx::Error::Database(db) => StoreError::InvalidData(db.message().to_string()),
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(err.to_string()),
        sqlx::Error::RowNotFound => StoreError::InvalidData(err.to_string()),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::InvalidData(err.to_string())
        }
        _ => StoreError::Database(err.to_string()),
    }
}

fn parse_text<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>().map_err(|err| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(err),
    })
}

fn external_ids(row: &PgRow) -> Result<ExternalIds, sqlx::Error> {
    let Json(ids): Json<ExternalIds> = row.try_get("external_ids")?;
    Ok(ids)
}

fn organization_from_row(row: &PgRow) -> Result<Organization, sqlx::Error> {
    Ok(Organization {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        short_name: row.try_get("short_name")?,
        country: row.try_get("country")?,
        city: row.try_get("city")?,
        website_url: row.try_get("website_url")?,
        logo_url: row.try_get("logo_url")?,
        level: parse_text(row, "level")?,
        external_ids: external_ids(row)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn event_from_row(row: &PgRow) -> Result<Event, sqlx::Error> {
    Ok(Event {
        id: row.try_get("id")?,
        organization_id: row.try_get("organization_id")?,
        name: row.try_get("name")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
        venue: row.try_get("venue")?,
        city: row.try_get("city")?,
        country: row.try_get("country")?,
        date_time_utc: row.try_get("date_time_utc")?,
        status: parse_text(row, "status")?,
        is_amateur_event: row.try_get("is_amateur_event")?,
        poster_url: row.try_get("poster_url")?,
        external_ids: external_ids(row)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn fighter_from_row(row: &PgRow) -> Result<Fighter, sqlx::Error> {
    Ok(Fighter {
        id: row.try_get("id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        nickname: row.try_get("nickname")?,
        country: row.try_get("country")?,
        city: row.try_get("city")?,
        team: row.try_get("team")?,
        height_cm: row.try_get("height_cm")?,
        reach_cm: row.try_get("reach_cm")?,
        stance: parse_text(row, "stance")?,
        weight_class: row.try_get("weight_class")?,
        is_pro: row.try_get("is_pro")?,
        image_url: row.try_get("image_url")?,
        pro_wins: row.try_get("pro_wins")?,
        pro_losses: row.try_get("pro_losses")?,
        pro_draws: row.try_get("pro_draws")?,
        pro_no_contests: row.try_get("pro_no_contests")?,
        external_ids: external_ids(row)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn fight_from_row(row: &PgRow) -> Result<Fight, sqlx::Error> {
    Ok(Fight {
        id: row.try_get("id")?,
        event_id: row.try_get("event_id")?,
        fighter_a_id: row.try_get("fighter_a_id")?,
        fighter_b_id: row.try_get("fighter_b_id")?,
        weight_class: row.try_get("weight_class")?,
        is_title_fight: row.try_get("is_title_fight")?,
        is_main_event: row.try_get("is_main_event")?,
        is_co_main_event: row.try_get("is_co_main_event")?,
        card_section: parse_text(row, "card_section")?,
        order: row.try_get("fight_order")?,
        result_status: parse_text(row, "result_status")?,
        winner_id: row.try_get("winner_id")?,
        method: row.try_get("method")?,
        round: row.try_get("round")?,
        time: row.try_get("time")?,
        external_ids: external_ids(row)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Locks the first matching row for the rest of the transaction.
async fn lock_matching(
    tx: &mut Transaction<'static, Postgres>,
    kind: EntityKind,
    pred: &Predicate,
) -> Result<Option<PgRow>, StoreError> {
    pred.validate(kind)?;
    let mut qb = select_matching(kind, pred);
    qb.push(" ORDER BY created_at LIMIT 1 FOR UPDATE");
    qb.build()
        .fetch_optional(&mut **tx)
        .await
        .map_err(|err| map_sqlx(kind, err))
}

async fn write_organization(
    tx: &mut Transaction<'static, Postgres>,
    org: &Organization,
    created: bool,
    new_ids: &ExternalIds,
) -> Result<PgRow, sqlx::Error> {
    let sql = if created {
        "INSERT INTO organizations (id, name, short_name, country, city, website_url, logo_url, \
         level, external_ids, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10) RETURNING *"
    } else {
        "UPDATE organizations SET name = $2, short_name = $3, country = $4, city = $5, \
         website_url = $6, logo_url = $7, level = $8, external_ids = external_ids || $9, \
         updated_at = $10 WHERE id = $1 RETURNING *"
    };
    sqlx::query(sql)
        .bind(org.id)
        .bind(&org.name)
        .bind(&org.short_name)
        .bind(&org.country)
        .bind(&org.city)
        .bind(&org.website_url)
        .bind(&org.logo_url)
        .bind(org.level.as_str())
        .bind(Json(new_ids))
        .bind(org.updated_at)
        .fetch_one(&mut **tx)
        .await
}

async fn write_event(
    tx: &mut Transaction<'static, Postgres>,
    event: &Event,
    created: bool,
    new_ids: &ExternalIds,
) -> Result<PgRow, sqlx::Error> {
    let sql = if created {
        "INSERT INTO events (id, organization_id, name, slug, description, venue, city, country, \
         date_time_utc, status, is_amateur_event, poster_url, external_ids, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $14) RETURNING *"
    } else {
        "UPDATE events SET organization_id = $2, name = $3, slug = $4, description = $5, \
         venue = $6, city = $7, country = $8, date_time_utc = $9, status = $10, \
         is_amateur_event = $11, poster_url = $12, external_ids = external_ids || $13, \
         updated_at = $14 WHERE id = $1 RETURNING *"
    };
    sqlx::query(sql)
        .bind(event.id)
        .bind(event.organization_id)
        .bind(&event.name)
        .bind(&event.slug)
        .bind(&event.description)
        .bind(&event.venue)
        .bind(&event.city)
        .bind(&event.country)
        .bind(event.date_time_utc)
        .bind(event.status.as_str())
        .bind(event.is_amateur_event)
        .bind(&event.poster_url)
        .bind(Json(new_ids))
        .bind(event.updated_at)
        .fetch_one(&mut **tx)
        .await
}

async fn write_fighter<'c, E>(
    executor: E,
    fighter: &Fighter,
    created: bool,
    new_ids: &ExternalIds,
) -> Result<PgRow, sqlx::Error>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    let sql = if created {
        "INSERT INTO fighters (id, first_name, last_name, nickname, country, city, team, \
         height_cm, reach_cm, stance, weight_class, is_pro, image_url, pro_wins, pro_losses, \
         pro_draws, pro_no_contests, external_ids, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
         $18, $19, $19) RETURNING *"
    } else {
        "UPDATE fighters SET first_name = $2, last_name = $3, nickname = $4, country = $5, \
         city = $6, team = $7, height_cm = $8, reach_cm = $9, stance = $10, weight_class = $11, \
         is_pro = $12, image_url = $13, pro_wins = $14, pro_losses = $15, pro_draws = $16, \
         pro_no_contests = $17, external_ids = external_ids || $18, updated_at = $19 \
         WHERE id = $1 RETURNING *"
    };
    sqlx::query(sql)
        .bind(fighter.id)
        .bind(&fighter.first_name)
        .bind(&fighter.last_name)
        .bind(&fighter.nickname)
        .bind(&fighter.country)
        .bind(&fighter.city)
        .bind(&fighter.team)
        .bind(fighter.height_cm)
        .bind(fighter.reach_cm)
        .bind(fighter.stance.as_str())
        .bind(&fighter.weight_class)
        .bind(fighter.is_pro)
        .bind(&fighter.image_url)
        .bind(fighter.pro_wins)
        .bind(fighter.pro_losses)
        .bind(fighter.pro_draws)
        .bind(fighter.pro_no_contests)
        .bind(Json(new_ids))
        .bind(fighter.updated_at)
        .fetch_one(executor)
        .await
}

async fn write_fight(
    tx: &mut Transaction<'static, Postgres>,
    fight: &Fight,
    created: bool,
    new_ids: &ExternalIds,
) -> Result<PgRow, sqlx::Error> {
    let sql = if created {
        "INSERT INTO fights (id, event_id, fighter_a_id, fighter_b_id, weight_class, \
         is_title_fight, is_main_event, is_co_main_event, card_section, fight_order, \
         result_status, winner_id, method, round, time, external_ids, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $17) \
         RETURNING *"
    } else {
        "UPDATE fights SET event_id = $2, fighter_a_id = $3, fighter_b_id = $4, \
         weight_class = $5, is_title_fight = $6, is_main_event = $7, is_co_main_event = $8, \
         card_section = $9, fight_order = $10, result_status = $11, winner_id = $12, \
         method = $13, round = $14, time = $15, external_ids = external_ids || $16, \
         updated_at = $17 WHERE id = $1 RETURNING *"
    };
    sqlx::query(sql)
        .bind(fight.id)
        .bind(fight.event_id)
        .bind(fight.fighter_a_id)
        .bind(fight.fighter_b_id)
        .bind(&fight.weight_class)
        .bind(fight.is_title_fight)
        .bind(fight.is_main_event)
        .bind(fight.is_co_main_event)
        .bind(fight.card_section.as_str())
        .bind(fight.order)
        .bind(fight.result_status.as_str())
        .bind(fight.winner_id)
        .bind(&fight.method)
        .bind(fight.round)
        .bind(&fight.time)
        .bind(Json(new_ids))
        .bind(fight.updated_at)
        .fetch_one(&mut **tx)
        .await
}

#[async_trait]
impl Store for PgStore {
    async fn find_organization(&self, pred: &Predicate) -> Result<Option<Organization>, StoreError> {
        let kind = EntityKind::Organization;
        self.find_row(kind, pred)
            .await?
            .map(|row| organization_from_row(&row))
            .transpose()
            .map_err(|err| map_sqlx(kind, err))
    }

    async fn upsert_organization(
        &self,
        pred: &Predicate,
        create: NewOrganization,
        update: OrganizationPatch,
    ) -> Result<Upserted<Organization>, StoreError> {
        let kind = EntityKind::Organization;
        let err = |e| map_sqlx(kind, e);
        let mut tx = self.begin().await?;
        let now = Utc::now();
        let (org, new_ids, created) = match lock_matching(&mut tx, kind, pred).await? {
            Some(row) => {
                let mut org = organization_from_row(&row).map_err(err)?;
                let ids = update.external_ids.clone();
                org.apply(update, now);
                (org, ids, false)
            }
            None => {
                let ids = create.external_ids.clone();
                (create.into_entity(Uuid::new_v4(), now), ids, true)
            }
        };
        let row = write_organization(&mut tx, &org, created, &new_ids)
            .await
            .map_err(err)?;
        tx.commit().await.map_err(err)?;
        debug!(id = %org.id, created, "organization upserted");
        Ok(Upserted {
            record: organization_from_row(&row).map_err(err)?,
            created,
        })
    }

    async fn find_event(&self, pred: &Predicate) -> Result<Option<Event>, StoreError> {
        let kind = EntityKind::Event;
        self.find_row(kind, pred)
            .await?
            .map(|row| event_from_row(&row))
            .transpose()
            .map_err(|err| map_sqlx(kind, err))
    }

    async fn upsert_event(
        &self,
        pred: &Predicate,
        create: NewEvent,
        update: EventPatch,
    ) -> Result<Upserted<Event>, StoreError> {
        let kind = EntityKind::Event;
        let err = |e| map_sqlx(kind, e);
        let mut tx = self.begin().await?;
        let now = Utc::now();
        let (event, new_ids, created) = match lock_matching(&mut tx, kind, pred).await? {
            Some(row) => {
                let mut event = event_from_row(&row).map_err(err)?;
                let ids = update.external_ids.clone();
                event.apply(update, now);
                (event, ids, false)
            }
            None => {
                let ids = create.external_ids.clone();
                (create.into_entity(Uuid::new_v4(), now), ids, true)
            }
        };
        let row = write_event(&mut tx, &event, created, &new_ids)
            .await
            .map_err(err)?;
        tx.commit().await.map_err(err)?;
        debug!(id = %event.id, slug = %event.slug, created, "event upserted");
        Ok(Upserted {
            record: event_from_row(&row).map_err(err)?,
            created,
        })
    }

    async fn find_fighter(&self, pred: &Predicate) -> Result<Option<Fighter>, StoreError> {
        let kind = EntityKind::Fighter;
        self.find_row(kind, pred)
            .await?
            .map(|row| fighter_from_row(&row))
            .transpose()
            .map_err(|err| map_sqlx(kind, err))
    }

    async fn upsert_fighter(
        &self,
        pred: &Predicate,
        create: NewFighter,
        update: FighterPatch,
    ) -> Result<Upserted<Fighter>, StoreError> {
        let kind = EntityKind::Fighter;
        let err = |e| map_sqlx(kind, e);
        let mut tx = self.begin().await?;
        let now = Utc::now();
        let (fighter, new_ids, created) = match lock_matching(&mut tx, kind, pred).await? {
            Some(row) => {
                let mut fighter = fighter_from_row(&row).map_err(err)?;
                let ids = update.external_ids.clone();
                fighter.apply(update, now);
                (fighter, ids, false)
            }
            None => {
                let ids = create.external_ids.clone();
                (create.into_entity(Uuid::new_v4(), now), ids, true)
            }
        };
        let row = write_fighter(&mut *tx, &fighter, created, &new_ids)
            .await
            .map_err(err)?;
        tx.commit().await.map_err(err)?;
        Ok(Upserted {
            record: fighter_from_row(&row).map_err(err)?,
            created,
        })
    }

    async fn update_fighter(&self, id: Uuid, patch: FighterPatch) -> Result<Fighter, StoreError> {
        let kind = EntityKind::Fighter;
        let err = |e| map_sqlx(kind, e);
        let mut tx = self.begin().await?;
        let row = lock_matching(&mut tx, kind, &Predicate::Id(id))
            .await?
            .ok_or(StoreError::NotFound {
                entity: "fighter",
                id,
            })?;
        let mut fighter = fighter_from_row(&row).map_err(err)?;
        let ids = patch.external_ids.clone();
        fighter.apply(patch, Utc::now());
        let row = write_fighter(&mut *tx, &fighter, false, &ids)
            .await
            .map_err(err)?;
        tx.commit().await.map_err(err)?;
        fighter_from_row(&row).map_err(err)
    }

    async fn list_fighters(&self, pred: Option<&Predicate>) -> Result<Vec<Fighter>, StoreError> {
        let kind = EntityKind::Fighter;
        let mut qb = match pred {
            Some(pred) => {
                pred.validate(kind)?;
                select_matching(kind, pred)
            }
            None => QueryBuilder::new("SELECT * FROM fighters WHERE TRUE"),
        };
        qb.push(" ORDER BY created_at");
        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|err| map_sqlx(kind, err))?;
        rows.iter()
            .map(fighter_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| map_sqlx(kind, err))
    }

    async fn find_fight(&self, pred: &Predicate) -> Result<Option<Fight>, StoreError> {
        let kind = EntityKind::Fight;
        self.find_row(kind, pred)
            .await?
            .map(|row| fight_from_row(&row))
            .transpose()
            .map_err(|err| map_sqlx(kind, err))
    }

    async fn upsert_fight(
        &self,
        pred: &Predicate,
        create: NewFight,
        update: FightPatch,
    ) -> Result<Upserted<Fight>, StoreError> {
        let kind = EntityKind::Fight;
        let err = |e| map_sqlx(kind, e);
        let mut tx = self.begin().await?;
        let now = Utc::now();
        let (fight, new_ids, created) = match lock_matching(&mut tx, kind, pred).await? {
            Some(row) => {
                let mut fight = fight_from_row(&row).map_err(err)?;
                let ids = update.external_ids.clone();
                fight.apply(update, now);
                (fight, ids, false)
            }
            None => {
                let ids = create.external_ids.clone();
                (create.into_entity(Uuid::new_v4(), now), ids, true)
            }
        };
        let row = write_fight(&mut tx, &fight, created, &new_ids)
            .await
            .map_err(err)?;
        tx.commit().await.map_err(err)?;
        Ok(Upserted {
            record: fight_from_row(&row).map_err(err)?,
            created,
        })
    }

    async fn count(&self, kind: EntityKind) -> Result<u64, StoreError> {
        let row = sqlx::query(&format!("SELECT COUNT(*) AS n FROM {}", table(kind)))
            .fetch_one(&self.pool)
            .await
            .map_err(|err| map_sqlx(kind, err))?;
        let n: i64 = row.try_get("n").map_err(|err| map_sqlx(kind, err))?;
        Ok(n.max(0) as u64)
    }
}
