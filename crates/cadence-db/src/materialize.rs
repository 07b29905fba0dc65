//! Voices and tracks for sub-aggregates cloned into another program.
//!
//! Sequences, patterns, and chords reference voices and tracks of their
//! program, which are not part of the sub-aggregate. When the clone stays in
//! the source program those rows are shared and map to themselves. When it
//! moves to another program, each needed voice resolves to a target voice of
//! the same instrument type, and each needed track to a track of the same
//! name under that voice; either is created when the target has none.

use std::collections::HashMap;

use tracing::debug;
use uuid::Uuid;

use cadence_core::{
    new_v7, ContentTx, ContentTxExt, Entity, EntityKind, IdentityMap, ProgramVoice,
    ProgramVoiceTrack, Ref, Result,
};

/// Resolves source voices and tracks to the target program, lazily.
pub struct Materializer {
    source_program: Uuid,
    target_program: Uuid,
    source_voices: HashMap<Uuid, ProgramVoice>,
    source_tracks: HashMap<Uuid, ProgramVoiceTrack>,
    target: Option<TargetRows>,
    created: Vec<Entity>,
}

struct TargetRows {
    voices: Vec<ProgramVoice>,
    tracks: Vec<ProgramVoiceTrack>,
}

impl Materializer {
    /// Load the voices and tracks of the source program.
    pub async fn load(
        tx: &mut dyn ContentTx,
        source_program: Uuid,
        target_program: Uuid,
    ) -> Result<Self> {
        let voices: Vec<ProgramVoice> = tx.select_by(Ref::ProgramId, source_program).await?;
        let tracks: Vec<ProgramVoiceTrack> = tx.select_by(Ref::ProgramId, source_program).await?;
        Ok(Self {
            source_program,
            target_program,
            source_voices: voices.into_iter().map(|v| (v.id, v)).collect(),
            source_tracks: tracks.into_iter().map(|t| (t.id, t)).collect(),
            target: None,
            created: Vec::new(),
        })
    }

    pub fn is_same_program(&self) -> bool {
        self.source_program == self.target_program
    }

    /// A voice of the source program, by id.
    pub fn source_voice(&self, id: Uuid) -> Option<&ProgramVoice> {
        self.source_voices.get(&id)
    }

    /// Voices and tracks created so far, in creation order. Drains the list.
    pub fn take_created(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.created)
    }

    async fn target_rows(&mut self, tx: &mut dyn ContentTx) -> Result<&mut TargetRows> {
        let rows = match self.target.take() {
            Some(rows) => rows,
            None => TargetRows {
                voices: tx.select_by(Ref::ProgramId, self.target_program).await?,
                tracks: tx.select_by(Ref::ProgramId, self.target_program).await?,
            },
        };
        Ok(self.target.insert(rows))
    }

    /// Target voice for `source_voice`, recording it in `map`.
    ///
    /// Returns `None` when the voice does not belong to the source program.
    /// Voices are matched by instrument type, so two source voices of the
    /// same type land on one target voice.
    pub async fn voice(
        &mut self,
        tx: &mut dyn ContentTx,
        map: &mut IdentityMap,
        source_voice: Uuid,
    ) -> Result<Option<Uuid>> {
        if let Some(id) = map.get(EntityKind::ProgramVoice, source_voice) {
            return Ok(Some(id));
        }
        let Some(source) = self.source_voices.get(&source_voice).cloned() else {
            return Ok(None);
        };
        if self.is_same_program() {
            map.record(EntityKind::ProgramVoice, source_voice, source_voice);
            return Ok(Some(source_voice));
        }

        let target_program = self.target_program;
        let rows = self.target_rows(tx).await?;
        if let Some(existing) = rows.voices.iter().find(|v| v.voice_type == source.voice_type) {
            let id = existing.id;
            map.record(EntityKind::ProgramVoice, source_voice, id);
            return Ok(Some(id));
        }

        let voice = ProgramVoice {
            id: new_v7(),
            program_id: target_program,
            ..source
        };
        let entity = Entity::ProgramVoice(voice.clone());
        tx.insert(&entity).await?;
        debug!(
            subsystem = "clone",
            component = "materializer",
            op = "materialize_voice",
            voice_type = %voice.voice_type,
            source_id = %source_voice,
            target_id = %voice.id,
            "Created voice in target program"
        );
        map.record(EntityKind::ProgramVoice, source_voice, voice.id);
        let id = voice.id;
        self.target_rows(tx).await?.voices.push(voice);
        self.created.push(entity);
        Ok(Some(id))
    }

    /// Target track for `source_track`, recording it (and its voice) in `map`.
    ///
    /// Returns `None` when the track does not belong to the source program.
    pub async fn track(
        &mut self,
        tx: &mut dyn ContentTx,
        map: &mut IdentityMap,
        source_track: Uuid,
    ) -> Result<Option<Uuid>> {
        if let Some(id) = map.get(EntityKind::ProgramVoiceTrack, source_track) {
            return Ok(Some(id));
        }
        let Some(source) = self.source_tracks.get(&source_track).cloned() else {
            return Ok(None);
        };
        let Some(target_voice) = self.voice(tx, map, source.program_voice_id).await? else {
            return Ok(None);
        };
        if target_voice == source.program_voice_id {
            map.record(EntityKind::ProgramVoiceTrack, source_track, source_track);
            return Ok(Some(source_track));
        }

        let target_program = self.target_program;
        let rows = self.target_rows(tx).await?;
        if let Some(existing) = rows
            .tracks
            .iter()
            .find(|t| t.program_voice_id == target_voice && t.name == source.name)
        {
            let id = existing.id;
            map.record(EntityKind::ProgramVoiceTrack, source_track, id);
            return Ok(Some(id));
        }

        let track = ProgramVoiceTrack {
            id: new_v7(),
            program_id: target_program,
            program_voice_id: target_voice,
            ..source
        };
        let entity = Entity::ProgramVoiceTrack(track.clone());
        tx.insert(&entity).await?;
        debug!(
            subsystem = "clone",
            component = "materializer",
            op = "materialize_track",
            track_name = %track.name,
            source_id = %source_track,
            target_id = %track.id,
            "Created track in target voice"
        );
        map.record(EntityKind::ProgramVoiceTrack, source_track, track.id);
        let id = track.id;
        self.target_rows(tx).await?.tracks.push(track);
        self.created.push(entity);
        Ok(Some(id))
    }
}
