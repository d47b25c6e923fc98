pub mod chat;
pub mod envelope;
pub mod reference;
pub mod report;

pub use chat::{
    CLIENT_SENDER_ID, ClientReply, ConversationId, LatencyRecord, LinkedMessage, ManagerAverage,
    Message, MessageRecord, NormalizedReply, PrecedingMessage, RawTimestamp, SenderId,
};
pub use envelope::{
    CommandEnvelope, ENVELOPE_SCHEMA_VERSION, EnvelopeCommandFailure, EnvelopeMeta,
    EnvelopeNotice,
};
pub use reference::{
    Manager, ManagerId, ManagerRecord, RawId, Supervisor, SupervisorId, SupervisorRecord,
    parse_reference_id,
};
pub use report::{PipelineStats, REPORT_SCHEMA_VERSION, ReportArtifact, ReportRow};

/// JSON Schemas for the import record shapes and the report artifact.
#[must_use]
pub fn json_schemas() -> serde_json::Value {
    serde_json::json!({
        "message_record": schemars::schema_for!(MessageRecord),
        "manager_record": schemars::schema_for!(ManagerRecord),
        "supervisor_record": schemars::schema_for!(SupervisorRecord),
        "report_artifact": schemars::schema_for!(ReportArtifact),
    })
}
