//! PostgreSQL content store.
//!
//! Each table is mapped by hand: one `INSERT` per entity type and one row
//! decoder per entity type. Selection is generic over table and column, both
//! of which come from static descriptors and never from input.

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::trace;
use uuid::Uuid;

use cadence_core::{
    Account, ContentStore, ContentTx, Entity, EntityKind, Error, Instrument, InstrumentAudio,
    InstrumentMeme, Library, Program, ProgramMeme, ProgramSequence, ProgramSequenceBinding,
    ProgramSequenceBindingMeme, ProgramSequenceChord, ProgramSequenceChordVoicing,
    ProgramSequencePattern, ProgramSequencePatternEvent, ProgramVoice, ProgramVoiceTrack, Ref,
    Result, Template, TemplateBinding,
};

/// Content store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ContentStore for PgContentStore {
    async fn begin(&self) -> Result<Box<dyn ContentTx>> {
        let tx = self.pool.begin().await.map_err(Error::Database)?;
        Ok(Box::new(PgContentTx { tx: Some(tx) }))
    }
}

/// One PostgreSQL transaction. Dropped uncommitted, it rolls back.
pub struct PgContentTx {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgContentTx {
    fn conn(&mut self) -> Result<&mut Transaction<'static, Postgres>> {
        self.tx
            .as_mut()
            .ok_or_else(|| Error::Internal("transaction already committed".to_string()))
    }
}

#[async_trait]
impl ContentTx for PgContentTx {
    async fn select(
        &mut self,
        kind: EntityKind,
        field: Ref,
        values: &[Uuid],
    ) -> Result<Vec<Entity>> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ANY($1) ORDER BY id",
            kind.table(),
            field.column()
        );
        let tx = self.conn()?;
        let rows = sqlx::query(&sql)
            .bind(values)
            .fetch_all(&mut **tx)
            .await?;
        rows.iter().map(|row| decode(kind, row)).collect()
    }

    async fn find(&mut self, kind: EntityKind, id: Uuid) -> Result<Option<Entity>> {
        let sql = format!("SELECT * FROM {} WHERE id = $1", kind.table());
        let tx = self.conn()?;
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;
        row.map(|r| decode(kind, &r)).transpose()
    }

    async fn insert(&mut self, entity: &Entity) -> Result<()> {
        trace!(
            subsystem = "db",
            component = "postgres",
            op = "insert",
            entity_kind = %entity.kind(),
            id = %entity.id(),
            "Inserting row"
        );
        let tx = self.conn()?;
        insert(tx, entity).await
    }

    async fn commit(&mut self) -> Result<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| Error::Internal("transaction already committed".to_string()))?;
        tx.commit().await.map_err(Error::Database)
    }
}

// =============================================================================
// ROW DECODING
// =============================================================================

fn text<T: FromStr<Err = String>>(row: &PgRow, column: &str) -> Result<T> {
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(Error::Serialization)
}

fn decode(kind: EntityKind, r: &PgRow) -> Result<Entity> {
    let entity = match kind {
        EntityKind::Account => Entity::Account(Account {
            id: r.try_get("id")?,
            name: r.try_get("name")?,
        }),
        EntityKind::Library => Entity::Library(Library {
            id: r.try_get("id")?,
            account_id: r.try_get("account_id")?,
            name: r.try_get("name")?,
            is_deleted: r.try_get("is_deleted")?,
        }),
        EntityKind::Program => Entity::Program(Program {
            id: r.try_get("id")?,
            library_id: r.try_get("library_id")?,
            state: text(r, "state")?,
            key: r.try_get("key")?,
            tempo: r.try_get("tempo")?,
            program_type: text(r, "type")?,
            name: r.try_get("name")?,
            density: r.try_get("density")?,
            config: r.try_get("config")?,
            is_deleted: r.try_get("is_deleted")?,
        }),
        EntityKind::ProgramMeme => Entity::ProgramMeme(ProgramMeme {
            id: r.try_get("id")?,
            program_id: r.try_get("program_id")?,
            name: r.try_get("name")?,
        }),
        EntityKind::ProgramVoice => Entity::ProgramVoice(ProgramVoice {
            id: r.try_get("id")?,
            program_id: r.try_get("program_id")?,
            voice_type: text(r, "type")?,
            name: r.try_get("name")?,
            order: r.try_get("order")?,
        }),
        EntityKind::ProgramVoiceTrack => Entity::ProgramVoiceTrack(ProgramVoiceTrack {
            id: r.try_get("id")?,
            program_id: r.try_get("program_id")?,
            program_voice_id: r.try_get("program_voice_id")?,
            name: r.try_get("name")?,
            order: r.try_get("order")?,
        }),
        EntityKind::ProgramSequence => Entity::ProgramSequence(ProgramSequence {
            id: r.try_get("id")?,
            program_id: r.try_get("program_id")?,
            name: r.try_get("name")?,
            key: r.try_get("key")?,
            density: r.try_get("density")?,
            total: r.try_get("total")?,
        }),
        EntityKind::ProgramSequenceChord => Entity::ProgramSequenceChord(ProgramSequenceChord {
            id: r.try_get("id")?,
            program_id: r.try_get("program_id")?,
            program_sequence_id: r.try_get("program_sequence_id")?,
            name: r.try_get("name")?,
            position: r.try_get("position")?,
        }),
        EntityKind::ProgramSequenceChordVoicing => {
            Entity::ProgramSequenceChordVoicing(ProgramSequenceChordVoicing {
                id: r.try_get("id")?,
                program_id: r.try_get("program_id")?,
                program_sequence_chord_id: r.try_get("program_sequence_chord_id")?,
                program_voice_id: r.try_get("program_voice_id")?,
                notes: r.try_get("notes")?,
            })
        }
        EntityKind::ProgramSequenceBinding => {
            Entity::ProgramSequenceBinding(ProgramSequenceBinding {
                id: r.try_get("id")?,
                program_id: r.try_get("program_id")?,
                program_sequence_id: r.try_get("program_sequence_id")?,
                offset: r.try_get("offset")?,
            })
        }
        EntityKind::ProgramSequenceBindingMeme => {
            Entity::ProgramSequenceBindingMeme(ProgramSequenceBindingMeme {
                id: r.try_get("id")?,
                program_id: r.try_get("program_id")?,
                program_sequence_binding_id: r.try_get("program_sequence_binding_id")?,
                name: r.try_get("name")?,
            })
        }
        EntityKind::ProgramSequencePattern => {
            Entity::ProgramSequencePattern(ProgramSequencePattern {
                id: r.try_get("id")?,
                program_id: r.try_get("program_id")?,
                program_sequence_id: r.try_get("program_sequence_id")?,
                program_voice_id: r.try_get("program_voice_id")?,
                name: r.try_get("name")?,
                total: r.try_get("total")?,
            })
        }
        EntityKind::ProgramSequencePatternEvent => {
            Entity::ProgramSequencePatternEvent(ProgramSequencePatternEvent {
                id: r.try_get("id")?,
                program_id: r.try_get("program_id")?,
                program_sequence_pattern_id: r.try_get("program_sequence_pattern_id")?,
                program_voice_track_id: r.try_get("program_voice_track_id")?,
                velocity: r.try_get("velocity")?,
                position: r.try_get("position")?,
                duration: r.try_get("duration")?,
                tones: r.try_get("tones")?,
            })
        }
        EntityKind::Instrument => Entity::Instrument(Instrument {
            id: r.try_get("id")?,
            library_id: r.try_get("library_id")?,
            instrument_type: text(r, "type")?,
            mode: text(r, "mode")?,
            state: text(r, "state")?,
            name: r.try_get("name")?,
            density: r.try_get("density")?,
            config: r.try_get("config")?,
            is_deleted: r.try_get("is_deleted")?,
        }),
        EntityKind::InstrumentMeme => Entity::InstrumentMeme(InstrumentMeme {
            id: r.try_get("id")?,
            instrument_id: r.try_get("instrument_id")?,
            name: r.try_get("name")?,
        }),
        EntityKind::InstrumentAudio => Entity::InstrumentAudio(InstrumentAudio {
            id: r.try_get("id")?,
            instrument_id: r.try_get("instrument_id")?,
            name: r.try_get("name")?,
            waveform_key: r.try_get("waveform_key")?,
            transient_seconds: r.try_get("transient_seconds")?,
            loop_beats: r.try_get("loop_beats")?,
            tempo: r.try_get("tempo")?,
            intensity: r.try_get("intensity")?,
            volume: r.try_get("volume")?,
            tones: r.try_get("tones")?,
            event: r.try_get("event")?,
        }),
        EntityKind::Template => Entity::Template(Template {
            id: r.try_get("id")?,
            account_id: r.try_get("account_id")?,
            name: r.try_get("name")?,
            ship_key: r.try_get("ship_key")?,
            template_type: text(r, "type")?,
            config: r.try_get("config")?,
            is_deleted: r.try_get("is_deleted")?,
        }),
        EntityKind::TemplateBinding => Entity::TemplateBinding(TemplateBinding {
            id: r.try_get("id")?,
            template_id: r.try_get("template_id")?,
            binding_type: text(r, "type")?,
            target_id: r.try_get("target_id")?,
        }),
    };
    Ok(entity)
}

// =============================================================================
// INSERTS
// =============================================================================

async fn insert(tx: &mut Transaction<'static, Postgres>, entity: &Entity) -> Result<()> {
    match entity {
        Entity::Account(e) => {
            sqlx::query("INSERT INTO account (id, name) VALUES ($1, $2)")
                .bind(e.id)
                .bind(&e.name)
                .execute(&mut **tx)
                .await?;
        }
        Entity::Library(e) => {
            sqlx::query(
                "INSERT INTO library (id, account_id, name, is_deleted) VALUES ($1, $2, $3, $4)",
            )
            .bind(e.id)
            .bind(e.account_id)
            .bind(&e.name)
            .bind(e.is_deleted)
            .execute(&mut **tx)
            .await?;
        }
        Entity::Program(e) => {
            sqlx::query(
                r#"INSERT INTO program
                   (id, library_id, state, key, tempo, type, name, density, config, is_deleted)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
            )
            .bind(e.id)
            .bind(e.library_id)
            .bind(e.state.as_str())
            .bind(&e.key)
            .bind(e.tempo)
            .bind(e.program_type.as_str())
            .bind(&e.name)
            .bind(e.density)
            .bind(&e.config)
            .bind(e.is_deleted)
            .execute(&mut **tx)
            .await?;
        }
        Entity::ProgramMeme(e) => {
            sqlx::query("INSERT INTO program_meme (id, program_id, name) VALUES ($1, $2, $3)")
                .bind(e.id)
                .bind(e.program_id)
                .bind(&e.name)
                .execute(&mut **tx)
                .await?;
        }
        Entity::ProgramVoice(e) => {
            sqlx::query(
                r#"INSERT INTO program_voice (id, program_id, type, name, "order")
                   VALUES ($1, $2, $3, $4, $5)"#,
            )
            .bind(e.id)
            .bind(e.program_id)
            .bind(e.voice_type.as_str())
            .bind(&e.name)
            .bind(e.order)
            .execute(&mut **tx)
            .await?;
        }
        Entity::ProgramVoiceTrack(e) => {
            sqlx::query(
                r#"INSERT INTO program_voice_track (id, program_id, program_voice_id, name, "order")
                   VALUES ($1, $2, $3, $4, $5)"#,
            )
            .bind(e.id)
            .bind(e.program_id)
            .bind(e.program_voice_id)
            .bind(&e.name)
            .bind(e.order)
            .execute(&mut **tx)
            .await?;
        }
        Entity::ProgramSequence(e) => {
            sqlx::query(
                r#"INSERT INTO program_sequence (id, program_id, name, key, density, total)
                   VALUES ($1, $2, $3, $4, $5, $6)"#,
            )
            .bind(e.id)
            .bind(e.program_id)
            .bind(&e.name)
            .bind(&e.key)
            .bind(e.density)
            .bind(e.total)
            .execute(&mut **tx)
            .await?;
        }
        Entity::ProgramSequenceChord(e) => {
            sqlx::query(
                r#"INSERT INTO program_sequence_chord
                   (id, program_id, program_sequence_id, name, position)
                   VALUES ($1, $2, $3, $4, $5)"#,
            )
            .bind(e.id)
            .bind(e.program_id)
            .bind(e.program_sequence_id)
            .bind(&e.name)
            .bind(e.position)
            .execute(&mut **tx)
            .await?;
        }
        Entity::ProgramSequenceChordVoicing(e) => {
            sqlx::query(
                r#"INSERT INTO program_sequence_chord_voicing
                   (id, program_id, program_sequence_chord_id, program_voice_id, notes)
                   VALUES ($1, $2, $3, $4, $5)"#,
            )
            .bind(e.id)
            .bind(e.program_id)
            .bind(e.program_sequence_chord_id)
            .bind(e.program_voice_id)
            .bind(&e.notes)
            .execute(&mut **tx)
            .await?;
        }
        Entity::ProgramSequenceBinding(e) => {
            sqlx::query(
                r#"INSERT INTO program_sequence_binding (id, program_id, program_sequence_id, "offset")
                   VALUES ($1, $2, $3, $4)"#,
            )
            .bind(e.id)
            .bind(e.program_id)
            .bind(e.program_sequence_id)
            .bind(e.offset)
            .execute(&mut **tx)
            .await?;
        }
        Entity::ProgramSequenceBindingMeme(e) => {
            sqlx::query(
                r#"INSERT INTO program_sequence_binding_meme
                   (id, program_id, program_sequence_binding_id, name)
                   VALUES ($1, $2, $3, $4)"#,
            )
            .bind(e.id)
            .bind(e.program_id)
            .bind(e.program_sequence_binding_id)
            .bind(&e.name)
            .execute(&mut **tx)
            .await?;
        }
        Entity::ProgramSequencePattern(e) => {
            sqlx::query(
                r#"INSERT INTO program_sequence_pattern
                   (id, program_id, program_sequence_id, program_voice_id, name, total)
                   VALUES ($1, $2, $3, $4, $5, $6)"#,
            )
            .bind(e.id)
            .bind(e.program_id)
            .bind(e.program_sequence_id)
            .bind(e.program_voice_id)
            .bind(&e.name)
            .bind(e.total)
            .execute(&mut **tx)
            .await?;
        }
        Entity::ProgramSequencePatternEvent(e) => {
            sqlx::query(
                r#"INSERT INTO program_sequence_pattern_event
                   (id, program_id, program_sequence_pattern_id, program_voice_track_id,
                    velocity, position, duration, tones)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
            )
            .bind(e.id)
            .bind(e.program_id)
            .bind(e.program_sequence_pattern_id)
            .bind(e.program_voice_track_id)
            .bind(e.velocity)
            .bind(e.position)
            .bind(e.duration)
            .bind(&e.tones)
            .execute(&mut **tx)
            .await?;
        }
        Entity::Instrument(e) => {
            sqlx::query(
                r#"INSERT INTO instrument
                   (id, library_id, type, mode, state, name, density, config, is_deleted)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
            )
            .bind(e.id)
            .bind(e.library_id)
            .bind(e.instrument_type.as_str())
            .bind(e.mode.as_str())
            .bind(e.state.as_str())
            .bind(&e.name)
            .bind(e.density)
            .bind(&e.config)
            .bind(e.is_deleted)
            .execute(&mut **tx)
            .await?;
        }
        Entity::InstrumentMeme(e) => {
            sqlx::query(
                "INSERT INTO instrument_meme (id, instrument_id, name) VALUES ($1, $2, $3)",
            )
            .bind(e.id)
            .bind(e.instrument_id)
            .bind(&e.name)
            .execute(&mut **tx)
            .await?;
        }
        Entity::InstrumentAudio(e) => {
            sqlx::query(
                r#"INSERT INTO instrument_audio
                   (id, instrument_id, name, waveform_key, transient_seconds, loop_beats,
                    tempo, intensity, volume, tones, event)
                   VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"#,
            )
            .bind(e.id)
            .bind(e.instrument_id)
            .bind(&e.name)
            .bind(&e.waveform_key)
            .bind(e.transient_seconds)
            .bind(e.loop_beats)
            .bind(e.tempo)
            .bind(e.intensity)
            .bind(e.volume)
            .bind(&e.tones)
            .bind(&e.event)
            .execute(&mut **tx)
            .await?;
        }
        Entity::Template(e) => {
            sqlx::query(
                r#"INSERT INTO template (id, account_id, name, ship_key, type, config, is_deleted)
                   VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
            )
            .bind(e.id)
            .bind(e.account_id)
            .bind(&e.name)
            .bind(&e.ship_key)
            .bind(e.template_type.as_str())
            .bind(&e.config)
            .bind(e.is_deleted)
            .execute(&mut **tx)
            .await?;
        }
        Entity::TemplateBinding(e) => {
            sqlx::query(
                "INSERT INTO template_binding (id, template_id, type, target_id) VALUES ($1, $2, $3, $4)",
            )
            .bind(e.id)
            .bind(e.template_id)
            .bind(e.binding_type.as_str())
            .bind(e.target_id)
            .execute(&mut **tx)
            .await?;
        }
    }
    Ok(())
}
