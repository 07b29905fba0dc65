//! Per-aggregate clone rules: templates, sequences, patterns, chords, and
//! instruments, in the same program and across programs.

use cadence_db::test_fixtures::{ContentBuilder, ProgramGraph};
use cadence_db::{
    AccessContext, AggregateKind, ChordAttributes, CloneManager, CloneRequest,
    ContentBindingType, Entity, EntityKind, Error, HubGate, InstrumentType, MemoryContentStore,
    PatternAttributes, Ref, RootOverrides, SequenceAttributes, TemplateAttributes, TemplateType,
};
use uuid::Uuid;

struct World {
    store: MemoryContentStore,
    library: Uuid,
    graph: ProgramGraph,
    /// A second program with a drum voice only.
    other_program: Uuid,
    other_drum_voice: Uuid,
    other_sequence: Uuid,
}

fn world() -> World {
    let store = MemoryContentStore::new();
    let mut content = ContentBuilder::new();
    let account = content.account("Aural");
    let library = content.library(account, "Beats");
    let graph = ProgramGraph::build(&mut content, library);
    let other_program = content.program(library, "Bare");
    let other_drum_voice = content.voice(other_program, InstrumentType::Drum, "Kit");
    let other_sequence = content.sequence(other_program, "Intro", 4);
    content.seed_memory(&store).unwrap();
    World {
        store,
        library,
        graph,
        other_program,
        other_drum_voice,
        other_sequence,
    }
}

fn manager(store: &MemoryContentStore) -> CloneManager<MemoryContentStore, HubGate> {
    CloneManager::new(store.clone(), HubGate::new())
}

fn internal() -> AccessContext {
    AccessContext::internal()
}

// =============================================================================
// TEMPLATE
// =============================================================================

#[tokio::test]
async fn test_template_clone_is_preview_with_bumped_ship_key() {
    let store = MemoryContentStore::new();
    let mut content = ContentBuilder::new();
    let account = content.account("Aural");
    let library = content.library(account, "Beats");
    let template = content.template(account, "Embed", "embed5leaves");
    content.template_binding(template, ContentBindingType::Library, library);
    content.seed_memory(&store).unwrap();

    let cloned = manager(&store)
        .clone_template(&internal(), CloneRequest::verbatim(template))
        .await
        .unwrap();

    let Entity::Template(root) = &cloned.root else {
        panic!("root is not a template");
    };
    assert_eq!(root.template_type, TemplateType::Preview);
    assert_eq!(root.ship_key, "embed5leaves2");
    assert_eq!(root.name, "Embed");

    assert_eq!(cloned.included.len(), 1);
    let Entity::TemplateBinding(binding) = &cloned.included[0] else {
        panic!("expected a template binding");
    };
    assert_eq!(binding.template_id, root.id);
    assert_eq!(binding.target_id, library, "binding target is copied verbatim");
}

#[tokio::test]
async fn test_template_ship_key_override_is_normalized() {
    let store = MemoryContentStore::new();
    let mut content = ContentBuilder::new();
    let account = content.account("Aural");
    let template = content.template(account, "Embed", "embed5leaves");
    content.seed_memory(&store).unwrap();

    let cloned = manager(&store)
        .clone_template(
            &internal(),
            CloneRequest::new(
                template,
                TemplateAttributes {
                    ship_key: Some("Buns & Jams".to_string()),
                    ..Default::default()
                },
            ),
        )
        .await
        .unwrap();

    let Entity::Template(root) = cloned.root else {
        panic!("root is not a template");
    };
    assert_eq!(root.ship_key, "buns_jams");
}

#[tokio::test]
async fn test_template_clone_with_live_ship_key_conflicts() {
    let store = MemoryContentStore::new();
    let mut content = ContentBuilder::new();
    let account = content.account("Aural");
    let template = content.template(account, "Embed", "slaps");
    content.template(account, "Embed Two", "slaps2");
    content.seed_memory(&store).unwrap();

    let err = manager(&store)
        .clone_template(&internal(), CloneRequest::verbatim(template))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Conflict(_)), "{:?}", err);
    assert_eq!(store.count(EntityKind::Template).unwrap(), 2);
}

// =============================================================================
// SEQUENCE
// =============================================================================

#[tokio::test]
async fn test_sequence_clone_in_place_shares_voices_and_tracks() {
    let w = world();
    let cloned = manager(&w.store)
        .clone_sequence(
            &internal(),
            CloneRequest::new(
                w.graph.verse,
                SequenceAttributes {
                    name: Some("Verse Two".to_string()),
                    ..Default::default()
                },
            ),
        )
        .await
        .unwrap();

    // 2 chords, 3 voicings, a binding and its meme, 2 patterns, 3 events.
    assert_eq!(cloned.included.len(), 12);
    assert_eq!(cloned.root.reference(Ref::ProgramId), Some(w.graph.program));
    assert_eq!(w.store.count(EntityKind::ProgramVoice).unwrap(), 3);
    assert_eq!(w.store.count(EntityKind::ProgramVoiceTrack).unwrap(), 2);

    for row in &cloned.included {
        assert_eq!(row.reference(Ref::ProgramId), Some(w.graph.program));
        if let Some(voice) = row.reference(Ref::ProgramVoiceId) {
            assert!(voice == w.graph.bass_voice || voice == w.graph.drum_voice);
        }
        if let Some(track) = row.reference(Ref::ProgramVoiceTrackId) {
            assert!(track == w.graph.bass_track || track == w.graph.kick_track);
        }
    }
}

#[tokio::test]
async fn test_sequence_clone_into_other_program_materializes_missing_voices() {
    let w = world();
    let cloned = manager(&w.store)
        .clone_sequence(
            &internal(),
            CloneRequest::new(
                w.graph.verse,
                SequenceAttributes {
                    program_id: Some(w.other_program),
                    ..Default::default()
                },
            ),
        )
        .await
        .unwrap();

    let created_voices: Vec<&Entity> = cloned
        .included
        .iter()
        .filter(|r| r.kind() == EntityKind::ProgramVoice)
        .collect();
    assert_eq!(created_voices.len(), 1, "only the bass voice is missing");
    let Entity::ProgramVoice(bass) = created_voices[0] else {
        unreachable!();
    };
    assert_eq!(bass.voice_type, InstrumentType::Bass);
    assert_eq!(bass.program_id, w.other_program);

    // BASS under the new voice and KICK under the existing drum voice.
    let tracks: Vec<&Entity> = cloned
        .included
        .iter()
        .filter(|r| r.kind() == EntityKind::ProgramVoiceTrack)
        .collect();
    assert_eq!(tracks.len(), 2);

    for row in &cloned.included {
        assert_eq!(row.reference(Ref::ProgramId), Some(w.other_program));
        if let Some(voice) = row.reference(Ref::ProgramVoiceId) {
            assert!(voice == bass.id || voice == w.other_drum_voice);
        }
    }
    assert_eq!(cloned.included.len(), 12 + 1 + 2);
}

// =============================================================================
// PATTERN
// =============================================================================

#[tokio::test]
async fn test_pattern_clone_keeps_source_total() {
    let w = world();
    let cloned = manager(&w.store)
        .clone_pattern(
            &internal(),
            CloneRequest::new(
                w.graph.bass_pattern,
                PatternAttributes {
                    program_sequence_id: Some(w.graph.chorus),
                    name: Some("Walk Again".to_string()),
                    ..Default::default()
                },
            ),
        )
        .await
        .unwrap();

    let Entity::ProgramSequencePattern(root) = &cloned.root else {
        panic!("root is not a pattern");
    };
    assert_eq!(root.total, 16);
    assert_eq!(root.name, "Walk Again");
    assert_eq!(root.program_sequence_id, w.graph.chorus);
    assert_eq!(root.program_voice_id, w.graph.bass_voice);

    assert_eq!(cloned.included.len(), 2);
    for row in &cloned.included {
        assert_eq!(row.reference(Ref::ProgramSequencePatternId), Some(root.id));
        assert_eq!(row.reference(Ref::ProgramVoiceTrackId), Some(w.graph.bass_track));
    }
}

#[tokio::test]
async fn test_pattern_clone_into_other_program_creates_voice_and_track() {
    let w = world();
    let cloned = manager(&w.store)
        .clone_pattern(
            &internal(),
            CloneRequest::new(
                w.graph.bass_pattern,
                PatternAttributes {
                    program_sequence_id: Some(w.other_sequence),
                    ..Default::default()
                },
            ),
        )
        .await
        .unwrap();

    let Entity::ProgramSequencePattern(root) = &cloned.root else {
        panic!("root is not a pattern");
    };
    assert_eq!(root.program_id, w.other_program);
    assert_ne!(root.program_voice_id, w.graph.bass_voice);

    let kinds: Vec<EntityKind> = cloned.included.iter().map(Entity::kind).collect();
    assert_eq!(
        kinds,
        vec![
            EntityKind::ProgramVoice,
            EntityKind::ProgramVoiceTrack,
            EntityKind::ProgramSequencePatternEvent,
            EntityKind::ProgramSequencePatternEvent,
        ]
    );
    assert_eq!(cloned.included[0].id(), root.program_voice_id);
    let track = cloned.included[1].id();
    assert_eq!(cloned.included[1].reference(Ref::ProgramVoiceId), Some(root.program_voice_id));
    assert_eq!(cloned.included[2].reference(Ref::ProgramVoiceTrackId), Some(track));
}

#[tokio::test]
async fn test_pattern_clone_into_other_program_reuses_voice_of_same_type() {
    let w = world();
    let cloned = manager(&w.store)
        .clone_pattern(
            &internal(),
            CloneRequest::new(
                w.graph.drum_pattern,
                PatternAttributes {
                    program_sequence_id: Some(w.other_sequence),
                    ..Default::default()
                },
            ),
        )
        .await
        .unwrap();

    assert_eq!(
        cloned.root.reference(Ref::ProgramVoiceId),
        Some(w.other_drum_voice)
    );
    // No voice created, one KICK track under the existing drum voice.
    let kinds: Vec<EntityKind> = cloned.included.iter().map(Entity::kind).collect();
    assert_eq!(
        kinds,
        vec![
            EntityKind::ProgramVoiceTrack,
            EntityKind::ProgramSequencePatternEvent
        ]
    );
    assert_eq!(cloned.included[0].name(), Some("KICK"));
}

#[tokio::test]
async fn test_pattern_voice_override_from_another_program_is_rejected() {
    let w = world();
    let before = w.store.total_rows().unwrap();
    let err = manager(&w.store)
        .clone_pattern(
            &internal(),
            CloneRequest::new(
                w.graph.bass_pattern,
                PatternAttributes {
                    program_voice_id: Some(w.other_drum_voice),
                    ..Default::default()
                },
            ),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(_)), "{:?}", err);
    assert_eq!(w.store.total_rows().unwrap(), before);
}

#[tokio::test]
async fn test_pattern_voice_override_moves_events_to_matching_track() {
    let w = world();
    let cloned = manager(&w.store)
        .clone_pattern(
            &internal(),
            CloneRequest::new(
                w.graph.bass_pattern,
                PatternAttributes {
                    program_voice_id: Some(w.graph.drum_voice),
                    ..Default::default()
                },
            ),
        )
        .await
        .unwrap();

    assert_eq!(cloned.root.reference(Ref::ProgramVoiceId), Some(w.graph.drum_voice));
    // The drum voice has no BASS track yet, so one is created for the events.
    let track = &cloned.included[0];
    assert_eq!(track.kind(), EntityKind::ProgramVoiceTrack);
    assert_eq!(track.reference(Ref::ProgramVoiceId), Some(w.graph.drum_voice));
    assert_eq!(track.name(), Some("BASS"));
    for event in &cloned.included[1..] {
        assert_eq!(event.reference(Ref::ProgramVoiceTrackId), Some(track.id()));
    }
}

// =============================================================================
// CHORD
// =============================================================================

#[tokio::test]
async fn test_chord_clone_onto_occupied_position_conflicts() {
    let w = world();
    let before = w.store.total_rows().unwrap();
    let err = manager(&w.store)
        .clone_chord(&internal(), CloneRequest::verbatim(w.graph.c_minor), None)
        .await
        .unwrap_err();

    match err {
        Error::Conflict(message) => {
            assert_eq!(message, "Found Chord in sequence at position 0")
        }
        other => panic!("expected conflict, got {:?}", other),
    }
    assert_eq!(w.store.total_rows().unwrap(), before);
}

#[tokio::test]
async fn test_chord_clone_to_free_position_in_same_sequence() {
    let w = world();
    let cloned = manager(&w.store)
        .clone_chord(
            &internal(),
            CloneRequest::new(
                w.graph.c_minor,
                ChordAttributes {
                    position: Some(8.0),
                    ..Default::default()
                },
            ),
            None,
        )
        .await
        .unwrap();

    let Entity::ProgramSequenceChord(root) = &cloned.root else {
        panic!("root is not a chord");
    };
    assert_eq!(root.program_sequence_id, w.graph.verse);
    assert_eq!(root.position, 8.0);
    assert_eq!(root.name, "Cm");
    assert_eq!(cloned.included.len(), 2);
}

#[tokio::test]
async fn test_chord_clone_into_other_program_maps_voices_by_type() {
    let w = world();
    let cloned = manager(&w.store)
        .clone_chord(
            &internal(),
            CloneRequest::new(
                w.graph.c_minor,
                ChordAttributes {
                    program_sequence_id: Some(w.other_sequence),
                    ..Default::default()
                },
            ),
            None,
        )
        .await
        .unwrap();

    assert_eq!(cloned.root.reference(Ref::ProgramId), Some(w.other_program));
    let kinds: Vec<EntityKind> = cloned.included.iter().map(Entity::kind).collect();
    assert_eq!(
        kinds,
        vec![
            EntityKind::ProgramVoice,
            EntityKind::ProgramSequenceChordVoicing,
            EntityKind::ProgramSequenceChordVoicing,
        ]
    );
    let new_bass = cloned.included[0].id();
    assert_eq!(cloned.included[1].reference(Ref::ProgramVoiceId), Some(new_bass));
    assert_eq!(
        cloned.included[2].reference(Ref::ProgramVoiceId),
        Some(w.other_drum_voice)
    );
}

#[tokio::test]
async fn test_chord_clone_into_missing_sequence_is_not_found() {
    let w = world();
    let err = manager(&w.store)
        .clone_chord(
            &internal(),
            CloneRequest::new(
                w.graph.c_minor,
                ChordAttributes {
                    program_sequence_id: Some(Uuid::from_u128(404)),
                    ..Default::default()
                },
            ),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

// =============================================================================
// DISPATCH
// =============================================================================

#[tokio::test]
async fn test_dispatch_runs_the_matching_aggregate() {
    let w = world();
    let overrides: RootOverrides = serde_json::from_value(serde_json::json!({
        "aggregate": "chord",
        "attributes": { "program_sequence_id": w.graph.chorus },
        "voicing_types": ["drum"],
    }))
    .unwrap();

    let cloned = manager(&w.store)
        .clone(&internal(), AggregateKind::Chord, w.graph.c_minor, overrides)
        .await
        .unwrap();

    assert_eq!(cloned.root.kind(), EntityKind::ProgramSequenceChord);
    assert_eq!(cloned.included.len(), 1);
    assert_eq!(
        cloned.included[0].reference(Ref::ProgramVoiceId),
        Some(w.graph.drum_voice)
    );
}

#[tokio::test]
async fn test_dispatch_rejects_mismatched_overrides() {
    let w = world();
    let err = manager(&w.store)
        .clone(
            &internal(),
            AggregateKind::Program,
            w.graph.program,
            RootOverrides::empty(AggregateKind::Library),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(w.store.insert_attempts(), 0);
}

// =============================================================================
// INSTRUMENT
// =============================================================================

#[tokio::test]
async fn test_instrument_clone_copies_memes_and_audio() {
    let w = world();
    let store = w.store;
    let mut content = ContentBuilder::new();
    let kit = content.instrument(w.library, InstrumentType::Drum, "Kit");
    content.instrument_meme(kit, "DARK");
    content.instrument_audio(kit, "kick");
    content.instrument_audio(kit, "snare");
    content.seed_memory(&store).unwrap();

    let cloned = manager(&store)
        .clone_instrument(&internal(), CloneRequest::verbatim(kit))
        .await
        .unwrap();

    assert_eq!(cloned.included.len(), 3);
    for row in &cloned.included {
        assert_eq!(row.reference(Ref::InstrumentId), Some(cloned.root.id()));
    }
    assert_eq!(cloned.root.reference(Ref::LibraryId), Some(w.library));
}
