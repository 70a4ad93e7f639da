//! End-to-end flow: build a long tool-using conversation, compact it,
//! render it for the wire and checkpoint it.

use parley::api::wire::MessageRole;
use parley::api::{ChatCompletionsAdapter, GenerationConfig, ProtocolAdapter};
use parley::error::TokenizerError;
use parley::history::{CompactionAction, CompactionConfig, Compactor, ToolPairing};
use parley::session::{CheckpointGateway, FileCheckpointStore, MemoryCheckpointStore, Session};
use parley::tokens::{TokenAccountant, Tokenizer};
use parley::types::{History, Part, Role, Turn};
use serde_json::json;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn count_tokens(&self, text: &str) -> Result<usize, TokenizerError> {
        Ok(text.split_whitespace().count())
    }
}

fn words(count: usize) -> String {
    vec!["w"; count].join(" ")
}

/// A user prompt, a model call, the tool answer and a model summary, repeated.
fn tool_heavy_history(rounds: usize) -> History {
    let mut history = History::new();
    for round in 0..rounds {
        let id = format!("call_{round}");
        history.push(Turn::user(words(200)));
        history.push(Turn::new(
            Role::Model,
            vec![Part::function_call(
                id.clone(),
                "ls",
                json!({"path": "/tmp"}).as_object().cloned().unwrap_or_default(),
            )],
        ));
        history.push(Turn::new(
            Role::Tool,
            vec![Part::function_response(
                id,
                "ls",
                json!({"output": words(300)}).as_object().cloned().unwrap_or_default(),
            )],
        ));
        history.push(Turn::model(words(100)));
    }
    history
}

fn compactor(config: CompactionConfig) -> Compactor {
    Compactor::new(config, TokenAccountant::new(WordTokenizer))
}

#[test]
fn truncated_history_renders_without_orphaned_tool_messages() {
    let mut session = Session::new(tool_heavy_history(12));
    let config = CompactionConfig {
        compress_after: 1_000,
        truncate_after: 2_000,
        truncate_by: Some(0.5),
        min_starting_tokens: 300,
        additional_compressed: 0,
        ..CompactionConfig::default()
    };
    let compactor = compactor(config);
    let report = compactor.compact(&mut session);

    assert_eq!(report.action, CompactionAction::Truncated);
    assert!(report.tokens_after <= 1_000, "{report:?}");
    assert!(report.turns_after < report.turns_before);

    let pairing = ToolPairing::build(session.history.turns());
    assert!(pairing.orphan_responses().is_empty());

    let request = ChatCompletionsAdapter::new()
        .render_request(&session.history, &GenerationConfig::default());
    for (idx, message) in request.messages.iter().enumerate() {
        if message.role != MessageRole::Tool {
            continue;
        }
        let id = message.tool_call_id.as_deref().unwrap_or_default();
        let declared = request.messages[..idx].iter().rev().any(|prev| {
            prev.tool_calls
                .iter()
                .flatten()
                .any(|call| call.id == id)
        });
        assert!(declared, "tool message {id} has no preceding declaration");
    }
}

#[test]
fn history_under_budget_is_left_alone() {
    let original = tool_heavy_history(2);
    let mut session = Session::new(original.clone());
    let report = compactor(CompactionConfig::default()).compact(&mut session);
    assert_eq!(report.action, CompactionAction::Unchanged);
    assert_eq!(session.history, original);
    assert!(session.tag.is_none());
}

#[tokio::test]
async fn compacted_session_survives_a_checkpoint_round_trip() {
    let store = MemoryCheckpointStore::new();
    let mut session = Session::new(tool_heavy_history(8));
    let first = session.persist(&store).await.unwrap();

    let config = CompactionConfig {
        compress_after: 800,
        truncate_after: 1_200,
        min_starting_tokens: 300,
        truncate_new_tag: true,
        ..CompactionConfig::default()
    };
    let report = compactor(config).compact(&mut session);
    assert!(report.tag_forked);
    let second = session.persist(&store).await.unwrap();
    assert_ne!(first, second);

    assert_eq!(store.latest().await.unwrap(), Some(second.clone()));
    let restored = Session::restore(&store, second).await.unwrap();
    assert_eq!(restored.history, session.history);
    assert_eq!(store.load(&first).await.unwrap().len(), 32);
}

#[tokio::test]
async fn file_store_persists_between_handles() {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    let root: PathBuf = std::env::temp_dir().join(format!("parley-flow-{millis}"));

    let mut session = Session::new(tool_heavy_history(1));
    let tag = {
        let store = FileCheckpointStore::open(&root).await.unwrap();
        session.persist(&store).await.unwrap()
    };

    let reopened = FileCheckpointStore::open(&root).await.unwrap();
    assert_eq!(reopened.latest().await.unwrap(), Some(tag.clone()));
    let restored = Session::restore(&reopened, tag).await.unwrap();
    assert_eq!(restored.history, session.history);

    let _ = std::fs::remove_dir_all(&root);
}
