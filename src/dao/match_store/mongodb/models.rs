use mongodb::bson::{Binary, Bson, DateTime, Document, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    Approval, MatchEntity, MatchGuard, MatchPatch, MatchSettingsEntity, MatchStatus,
    ParticipantResultEntity,
};

/// Persisted shape of a match record in the `matches` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMatchDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    game_code: String,
    host_id: Uuid,
    joined_id: Option<Uuid>,
    settings: MatchSettingsEntity,
    status: MatchStatus,
    approval: Approval,
    ready: bool,
    host_result: Option<ParticipantResultEntity>,
    joined_result: Option<ParticipantResultEntity>,
    created_at: DateTime,
    expires_at: DateTime,
    started_at: Option<DateTime>,
    updated_at: DateTime,
}

impl From<MatchEntity> for MongoMatchDocument {
    fn from(value: MatchEntity) -> Self {
        Self {
            id: value.id,
            game_code: value.game_code,
            host_id: value.host_id,
            joined_id: value.joined_id,
            settings: value.settings,
            status: value.status,
            approval: value.approval,
            ready: value.ready,
            host_result: value.host_result,
            joined_result: value.joined_result,
            created_at: DateTime::from_system_time(value.created_at),
            expires_at: DateTime::from_system_time(value.expires_at),
            started_at: value.started_at.map(DateTime::from_system_time),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<MongoMatchDocument> for MatchEntity {
    fn from(value: MongoMatchDocument) -> Self {
        Self {
            id: value.id,
            game_code: value.game_code,
            host_id: value.host_id,
            joined_id: value.joined_id,
            settings: value.settings,
            status: value.status,
            approval: value.approval,
            ready: value.ready,
            host_result: value.host_result,
            joined_result: value.joined_result,
            created_at: value.created_at.to_system_time(),
            expires_at: value.expires_at.to_system_time(),
            started_at: value.started_at.map(|at| at.to_system_time()),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

pub fn uuid_as_binary(id: Uuid) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.into_bytes().to_vec(),
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": uuid_as_binary(id)}
}

// The string representations below must stay in sync with the snake_case
// serde renames on the entity enums.
fn status_str(status: MatchStatus) -> &'static str {
    match status {
        MatchStatus::Waiting => "waiting",
        MatchStatus::OpponentJoined => "opponent_joined",
        MatchStatus::InProgress => "in_progress",
        MatchStatus::Finished => "finished",
    }
}

fn approval_str(approval: Approval) -> &'static str {
    match approval {
        Approval::Pending => "pending",
        Approval::Accepted => "accepted",
        Approval::Rejected => "rejected",
    }
}

fn settings_doc(settings: &MatchSettingsEntity) -> Document {
    let mode = match settings.mode {
        crate::dao::models::GameMode::Vocab => "vocab",
        crate::dao::models::GameMode::Sentence => "sentence",
    };
    doc! {
        "category": &settings.category,
        "subcategory": settings.subcategory as i64,
        "num_questions": settings.num_questions as i64,
        "timer_secs": settings.timer_secs as i64,
        "mode": mode,
    }
}

fn result_bson(result: &Option<ParticipantResultEntity>) -> Bson {
    match result {
        None => Bson::Null,
        Some(result) => Bson::Document(doc! {
            "score": result.score,
            "questions": result.questions as i64,
            "correct": result.correct as i64,
            "wrong": result.wrong as i64,
            "fastest_ms": result.fastest_ms as i64,
            "slowest_ms": result.slowest_ms as i64,
        }),
    }
}

/// Translate a guard into the filter document of a conditional write.
pub fn guard_filter(id: Uuid, guard: &MatchGuard) -> Document {
    let mut filter = doc_id(id);
    if let Some(status) = guard.status {
        filter.insert("status", status_str(status));
    }
    if let Some(approval) = guard.approval {
        filter.insert("approval", approval_str(approval));
    }
    if let Some(ready) = guard.ready {
        filter.insert("ready", ready);
    }
    if let Some(host) = guard.host_id {
        filter.insert("host_id", uuid_as_binary(host));
    }
    if let Some(joined) = guard.joined_id {
        filter.insert("joined_id", uuid_as_binary(joined));
    } else if let Some(present) = guard.joined_present {
        // `joined_id` and `joined_present` share a key; an exact identity
        // guard subsumes the presence check.
        let condition = if present {
            Bson::Document(doc! {"$ne": Bson::Null})
        } else {
            Bson::Null
        };
        filter.insert("joined_id", condition);
    }
    if let Some(instant) = guard.not_expired_at {
        filter.insert(
            "expires_at",
            doc! {"$gt": DateTime::from_system_time(instant)},
        );
    }
    filter
}

/// Translate a patch into a `$set` update document, stamping `updated_at`.
pub fn patch_update(patch: &MatchPatch) -> Document {
    let mut set = Document::new();
    if let Some(status) = patch.status.value() {
        set.insert("status", status_str(*status));
    }
    if let Some(approval) = patch.approval.value() {
        set.insert("approval", approval_str(*approval));
    }
    if let Some(ready) = patch.ready.value() {
        set.insert("ready", *ready);
    }
    if let Some(joined) = patch.joined_id.value() {
        let value = match joined {
            Some(id) => Bson::Binary(uuid_as_binary(*id)),
            None => Bson::Null,
        };
        set.insert("joined_id", value);
    }
    if let Some(settings) = patch.settings.value() {
        set.insert("settings", settings_doc(settings));
    }
    if let Some(result) = patch.host_result.value() {
        set.insert("host_result", result_bson(result));
    }
    if let Some(result) = patch.joined_result.value() {
        set.insert("joined_result", result_bson(result));
    }
    if let Some(started) = patch.started_at.value() {
        let value = match started {
            Some(at) => Bson::DateTime(DateTime::from_system_time(*at)),
            None => Bson::Null,
        };
        set.insert("started_at", value);
    }
    set.insert("updated_at", DateTime::now());
    doc! {"$set": set}
}
