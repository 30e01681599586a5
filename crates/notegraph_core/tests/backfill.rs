use notegraph_core::config::ProjectionConfig;
use notegraph_core::db::open_db_in_memory;
use notegraph_core::embedding::HashEmbeddingModel;
use notegraph_core::{
    BackfillOrchestrator, CoordinateReducer, EmbeddingError, EmbeddingGenerator, EmbeddingModel,
    EmbeddingStore, Note, NoteGraphService, NoteRepository, NoteScope, ServiceError,
    SqliteEmbeddingStore, SqliteNoteRepository,
};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const DIM: usize = 8;
const POISON: &str = "poison";

/// Hash model that records every text it embeds and refuses any call
/// containing the poison marker.
struct RecordingModel {
    inner: HashEmbeddingModel,
    seen: Mutex<Vec<String>>,
}

impl RecordingModel {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: HashEmbeddingModel::new(DIM),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

impl EmbeddingModel for RecordingModel {
    fn name(&self) -> &str {
        "recording"
    }

    fn dimensions(&self) -> usize {
        DIM
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.iter().any(|text| text.contains(POISON)) {
            return Err(EmbeddingError::ModelUnavailable("poisoned input".into()));
        }
        self.seen.lock().unwrap().extend(texts.iter().cloned());
        self.inner.embed(texts)
    }
}

fn insert_notes(conn: &Connection, owner: Uuid, contents: &[&str]) -> Vec<Note> {
    let repo = SqliteNoteRepository::new(conn);
    contents
        .iter()
        .enumerate()
        .map(|(index, content)| {
            let note = Note::with_id(
                Uuid::new_v4(),
                owner,
                *content,
                1_700_000_000_000 + index as i64,
            );
            repo.insert_note(&note).unwrap();
            note
        })
        .collect()
}

fn basis(index: usize) -> Vec<f32> {
    let mut vector = vec![0.0; DIM];
    vector[index % DIM] = 1.0;
    vector
}

#[test]
fn only_missing_notes_are_generated() {
    let conn = open_db_in_memory().unwrap();
    let notes_repo = SqliteNoteRepository::new(&conn);
    let store = SqliteEmbeddingStore::with_dimensions(&conn, DIM);
    let owner = Uuid::new_v4();
    let notes = insert_notes(
        &conn,
        owner,
        &["first", "second", "third", "fourth", "fifth"],
    );
    for (index, note) in notes[..3].iter().enumerate() {
        store.put(note.id, &basis(index)).unwrap();
    }
    let before: Vec<String> = notes[..3]
        .iter()
        .map(|note| stored_text(&conn, note.id))
        .collect();

    let model = RecordingModel::new();
    let generator = EmbeddingGenerator::with_model(model.clone());
    let reducer = CoordinateReducer::from_config(&ProjectionConfig::default());
    let orchestrator = BackfillOrchestrator::new(&notes_repo, &store, &generator, &reducer);

    let report = orchestrator
        .generate_missing(&NoteScope::owner(owner))
        .unwrap();

    assert_eq!(report.generated, 2);
    assert_eq!(report.total, 5);
    assert!(report.failed.is_empty());
    assert_eq!(model.seen(), vec!["fourth".to_string(), "fifth".to_string()]);
    for (note, text) in notes[..3].iter().zip(&before) {
        assert_eq!(&stored_text(&conn, note.id), text);
    }
    assert_eq!(store.count(owner).unwrap(), 5);
}

#[test]
fn second_pass_is_a_noop() {
    let conn = open_db_in_memory().unwrap();
    let notes_repo = SqliteNoteRepository::new(&conn);
    let store = SqliteEmbeddingStore::with_dimensions(&conn, DIM);
    let owner = Uuid::new_v4();
    insert_notes(&conn, owner, &["alpha", "beta"]);

    let model = RecordingModel::new();
    let generator = EmbeddingGenerator::with_model(model.clone());
    let reducer = CoordinateReducer::from_config(&ProjectionConfig::default());
    let orchestrator = BackfillOrchestrator::new(&notes_repo, &store, &generator, &reducer);

    assert_eq!(
        orchestrator
            .generate_missing(&NoteScope::owner(owner))
            .unwrap()
            .generated,
        2
    );
    let second = orchestrator
        .generate_missing(&NoteScope::owner(owner))
        .unwrap();
    assert_eq!(second.generated, 0);
    assert_eq!(second.total, 2);
    assert_eq!(model.seen().len(), 2);
}

#[test]
fn failing_note_does_not_discard_successes() {
    let conn = open_db_in_memory().unwrap();
    let notes_repo = SqliteNoteRepository::new(&conn);
    let store = SqliteEmbeddingStore::with_dimensions(&conn, DIM);
    let owner = Uuid::new_v4();
    let notes = insert_notes(&conn, owner, &["good one", "poison pill", "good two"]);

    let generator = EmbeddingGenerator::with_model(RecordingModel::new());
    let reducer = CoordinateReducer::from_config(&ProjectionConfig::default());
    let orchestrator = BackfillOrchestrator::new(&notes_repo, &store, &generator, &reducer);

    let report = orchestrator
        .generate_missing(&NoteScope::owner(owner))
        .unwrap();

    assert_eq!(report.generated, 2);
    assert_eq!(report.failed, vec![notes[1].id]);
    let ids: Vec<Uuid> = notes.iter().map(|note| note.id).collect();
    let missing = store.get_missing(&ids).unwrap();
    assert_eq!(missing.into_iter().collect::<Vec<_>>(), vec![notes[1].id]);
}

#[test]
fn store_dimension_mismatch_is_reported_per_note() {
    let conn = open_db_in_memory().unwrap();
    let notes_repo = SqliteNoteRepository::new(&conn);
    let store = SqliteEmbeddingStore::with_dimensions(&conn, DIM * 2);
    let owner = Uuid::new_v4();
    let notes = insert_notes(&conn, owner, &["alpha"]);

    let generator = EmbeddingGenerator::with_model(RecordingModel::new());
    let reducer = CoordinateReducer::from_config(&ProjectionConfig::default());
    let orchestrator = BackfillOrchestrator::new(&notes_repo, &store, &generator, &reducer);

    let report = orchestrator
        .generate_missing(&NoteScope::owner(owner))
        .unwrap();
    assert_eq!(report.generated, 0);
    assert_eq!(report.failed, vec![notes[0].id]);
}

#[test]
fn run_generates_then_persists_coordinates() {
    let conn = open_db_in_memory().unwrap();
    let notes_repo = SqliteNoteRepository::new(&conn);
    let store = SqliteEmbeddingStore::with_dimensions(&conn, DIM);
    let owner = Uuid::new_v4();
    insert_notes(
        &conn,
        owner,
        &[
            "rust ownership",
            "rust borrowing",
            "garden tomatoes",
            "garden compost",
            "weekly budget",
        ],
    );

    let generator = EmbeddingGenerator::with_model(RecordingModel::new());
    let reducer = CoordinateReducer::from_config(&ProjectionConfig::default());
    let orchestrator = BackfillOrchestrator::new(&notes_repo, &store, &generator, &reducer);

    let report = orchestrator.run(&NoteScope::owner(owner)).unwrap();
    assert_eq!(report.generation.generated, 5);
    assert_eq!(report.coordinates, 5);

    let items = store.list_all(&NoteScope::owner(owner)).unwrap();
    assert_eq!(items.len(), 5);
    let mut values = Vec::new();
    for item in &items {
        let spatial = item.coordinates.spatial.expect("spatial coordinates");
        let cluster = item.coordinates.cluster.expect("cluster coordinates");
        values.extend(spatial);
        values.extend(cluster);
    }
    assert!(values.iter().all(|value| (-1.0..=1.0).contains(value)));
    assert!(values.iter().any(|value| value.abs() == 1.0));
}

#[test]
fn recompute_on_empty_scope_writes_nothing() {
    let conn = open_db_in_memory().unwrap();
    let notes_repo = SqliteNoteRepository::new(&conn);
    let store = SqliteEmbeddingStore::with_dimensions(&conn, DIM);
    let generator = EmbeddingGenerator::with_model(RecordingModel::new());
    let reducer = CoordinateReducer::from_config(&ProjectionConfig::default());
    let orchestrator = BackfillOrchestrator::new(&notes_repo, &store, &generator, &reducer);

    assert_eq!(
        orchestrator
            .recompute_coordinates(&NoteScope::owner(Uuid::new_v4()))
            .unwrap(),
        0
    );
}

#[test]
fn lifecycle_embeds_on_create_and_deletes_atomically() {
    let conn = open_db_in_memory().unwrap();
    let notes_repo = SqliteNoteRepository::new(&conn);
    let store = SqliteEmbeddingStore::with_dimensions(&conn, DIM);
    let generator = EmbeddingGenerator::with_model(RecordingModel::new());
    let reducer = CoordinateReducer::from_config(&ProjectionConfig::default());
    let service = NoteGraphService::new(&notes_repo, &store, &generator, &reducer);
    let owner = Uuid::new_v4();

    let saved = service.lifecycle().create_note(owner, "hello graph").unwrap();
    assert!(saved.embedded);
    assert_eq!(store.get(saved.note.id).unwrap().len(), DIM);

    service.lifecycle().delete_note(saved.note.id).unwrap();
    assert!(notes_repo.get_note(saved.note.id).unwrap().is_none());
    assert_eq!(store.count(owner).unwrap(), 0);

    assert!(matches!(
        service.lifecycle().delete_note(saved.note.id),
        Err(ServiceError::NoteNotFound(id)) if id == saved.note.id
    ));
}

#[test]
fn note_creation_survives_unavailable_model() {
    let conn = open_db_in_memory().unwrap();
    let notes_repo = SqliteNoteRepository::new(&conn);
    let store = SqliteEmbeddingStore::with_dimensions(&conn, DIM);
    let generator = EmbeddingGenerator::new(DIM, || {
        Err(EmbeddingError::ModelUnavailable("offline".into()))
    });
    let reducer = CoordinateReducer::from_config(&ProjectionConfig::default());
    let service = NoteGraphService::new(&notes_repo, &store, &generator, &reducer);
    let owner = Uuid::new_v4();

    let saved = service.lifecycle().create_note(owner, "kept anyway").unwrap();
    assert!(!saved.embedded);
    assert!(notes_repo.get_note(saved.note.id).unwrap().is_some());

    let report = service.generate_missing(&NoteScope::owner(owner)).unwrap();
    assert_eq!(report.generated, 0);
    assert_eq!(report.failed, vec![saved.note.id]);
}

#[test]
fn service_exposes_graph_and_validates_inputs() {
    let conn = open_db_in_memory().unwrap();
    let notes_repo = SqliteNoteRepository::new(&conn);
    let store = SqliteEmbeddingStore::with_dimensions(&conn, DIM);
    let generator = EmbeddingGenerator::with_model(RecordingModel::new());
    let reducer = CoordinateReducer::from_config(&ProjectionConfig::default());
    let service = NoteGraphService::new(&notes_repo, &store, &generator, &reducer)
        .with_default_threshold(-2.0);
    let owner = Uuid::new_v4();
    insert_notes(&conn, owner, &["one", "two", "three"]);
    service.run_backfill(&NoteScope::owner(owner)).unwrap();

    assert_eq!(service.embeddings(&NoteScope::owner(owner)).unwrap().len(), 3);

    let graph = service
        .similarity_graph(&NoteScope::owner(owner), None)
        .unwrap();
    assert_eq!(graph.nodes.len(), 3);
    assert_eq!(graph.edges.len() + graph.stats.pairs_excluded, 3);

    assert!(matches!(
        service.similarity_graph(&NoteScope::owner(owner), Some(f64::NAN)),
        Err(ServiceError::Graph(_))
    ));
    assert!(matches!(
        service.embeddings(&NoteScope::owner(owner).with_month(0)),
        Err(ServiceError::InvalidScope(_))
    ));
}

fn stored_text(conn: &Connection, note_id: Uuid) -> String {
    conn.query_row(
        "SELECT embedding FROM note_embeddings WHERE note_id = ?1;",
        [note_id.to_string()],
        |row| row.get(0),
    )
    .unwrap()
}
