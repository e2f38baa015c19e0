// SPDX-FileCopyrightText: 2026 Quad Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport wire protocol.
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`.
//!
//! Client -> Server:
//! ```json
//! {"event": "join", "data": "alice"}
//! {"event": "message:send", "data": {"receiverId": "bob", "text": "hi", "media": []}}
//! {"event": "call-user", "data": {"userToCall": "bob", "from": "alice", "signalData": {}, "type": "video"}}
//! ```
//!
//! Server -> Client:
//! ```json
//! {"event": "join:success", "data": {"userId": "alice", "connectionId": "...", "onlineCount": 2}}
//! {"event": "message:status", "data": {"messageId": "...", "status": "delivered"}}
//! {"event": "call-connected", "data": {"startTime": "2026-01-01T00:00:00Z"}}
//! ```
//!
//! Signaling payloads (`signalData`, `signal`, `candidate`) are relayed
//! opaquely. Required signaling fields are optional at the serde level so a
//! missing field surfaces as a `call-error` rather than an undecodable frame.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{CallId, CallType, ConnectionId, Message, MessageId, MessageStatus, UserId};

/// Why a call ended, attached to `call-ended`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    /// One party hung up.
    Hangup,
    /// Nobody answered inside the ring window.
    Timeout,
    /// A participant's connection dropped.
    Disconnect,
}

/// Payload of `message:send`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    pub receiver_id: UserId,
    pub text: String,
    #[serde(default)]
    pub media: Vec<String>,
}

/// Payload of `message:read`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadMessage {
    pub message_id: MessageId,
}

/// Payload of `message:history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRequest {
    pub peer_id: UserId,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// Payload of `call-user`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallUser {
    #[serde(default)]
    pub user_to_call: Option<UserId>,
    #[serde(default)]
    pub from: Option<UserId>,
    #[serde(default)]
    pub from_user: Option<Value>,
    #[serde(default)]
    pub signal_data: Option<Value>,
    #[serde(default, rename = "type")]
    pub call_type: Option<CallType>,
}

/// Payload of `answer-call`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerCall {
    #[serde(default)]
    pub to: Option<UserId>,
    #[serde(default)]
    pub signal: Option<Value>,
}

/// Payload of `reject-call` and `end-call`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallTarget {
    #[serde(default)]
    pub to: Option<UserId>,
}

/// Payload of client `ice-candidate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceCandidate {
    #[serde(default)]
    pub to: Option<UserId>,
    #[serde(default)]
    pub candidate: Option<Value>,
}

/// Intents sent by a client over its connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "join")]
    Join(UserId),
    #[serde(rename = "message:send")]
    MessageSend(SendMessage),
    #[serde(rename = "message:read")]
    MessageRead(ReadMessage),
    #[serde(rename = "message:history")]
    MessageHistory(HistoryRequest),
    #[serde(rename = "call-user")]
    CallUser(CallUser),
    #[serde(rename = "answer-call")]
    AnswerCall(AnswerCall),
    #[serde(rename = "reject-call")]
    RejectCall(CallTarget),
    #[serde(rename = "end-call")]
    EndCall(CallTarget),
    #[serde(rename = "ice-candidate")]
    IceCandidate(IceCandidate),
}

impl ClientEvent {
    /// Wire name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Join(_) => "join",
            ClientEvent::MessageSend(_) => "message:send",
            ClientEvent::MessageRead(_) => "message:read",
            ClientEvent::MessageHistory(_) => "message:history",
            ClientEvent::CallUser(_) => "call-user",
            ClientEvent::AnswerCall(_) => "answer-call",
            ClientEvent::RejectCall(_) => "reject-call",
            ClientEvent::EndCall(_) => "end-call",
            ClientEvent::IceCandidate(_) => "ice-candidate",
        }
    }
}

/// Events emitted by the server to one connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "join:success", rename_all = "camelCase")]
    JoinSuccess {
        user_id: UserId,
        connection_id: ConnectionId,
        online_count: usize,
    },
    /// Tells a superseded connection to re-authenticate or disconnect.
    #[serde(rename = "session:replaced")]
    SessionReplaced {},
    #[serde(rename = "user:online")]
    UserOnline(UserId),
    #[serde(rename = "user:offline")]
    UserOffline(UserId),
    #[serde(rename = "message:status", rename_all = "camelCase")]
    MessageStatus {
        message_id: MessageId,
        status: MessageStatus,
    },
    #[serde(rename = "message:new")]
    MessageNew(Message),
    #[serde(rename = "message:history", rename_all = "camelCase")]
    MessageHistory {
        peer_id: UserId,
        messages: Vec<Message>,
    },
    #[serde(rename = "incoming-call", rename_all = "camelCase")]
    IncomingCall {
        from: UserId,
        from_user: Value,
        signal_data: Value,
        #[serde(rename = "type")]
        call_type: CallType,
    },
    /// Confirms to the caller that the callee's connection was reached.
    #[serde(rename = "call-ringing", rename_all = "camelCase")]
    CallRinging { to: UserId, call_id: CallId },
    /// Call target has no live connection.
    #[serde(rename = "user-offline", rename_all = "camelCase")]
    CallUserOffline { user_id: Option<UserId> },
    #[serde(rename = "user-busy", rename_all = "camelCase")]
    UserBusy {
        user_id: Option<UserId>,
        message: String,
    },
    #[serde(rename = "call-error")]
    CallError { message: String },
    #[serde(rename = "call-accepted")]
    CallAccepted(Value),
    /// Carries the single shared connect timestamp sent to both parties.
    #[serde(rename = "call-connected", rename_all = "camelCase")]
    CallConnected { start_time: DateTime<Utc> },
    #[serde(rename = "call-rejected")]
    CallRejected {},
    #[serde(rename = "call-ended")]
    CallEnded {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<EndReason>,
    },
    #[serde(rename = "ice-candidate")]
    IceCandidate(Value),
    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerEvent {
    /// Wire name of the event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::JoinSuccess { .. } => "join:success",
            ServerEvent::SessionReplaced {} => "session:replaced",
            ServerEvent::UserOnline(_) => "user:online",
            ServerEvent::UserOffline(_) => "user:offline",
            ServerEvent::MessageStatus { .. } => "message:status",
            ServerEvent::MessageNew(_) => "message:new",
            ServerEvent::MessageHistory { .. } => "message:history",
            ServerEvent::IncomingCall { .. } => "incoming-call",
            ServerEvent::CallRinging { .. } => "call-ringing",
            ServerEvent::CallUserOffline { .. } => "user-offline",
            ServerEvent::UserBusy { .. } => "user-busy",
            ServerEvent::CallError { .. } => "call-error",
            ServerEvent::CallAccepted(_) => "call-accepted",
            ServerEvent::CallConnected { .. } => "call-connected",
            ServerEvent::CallRejected {} => "call-rejected",
            ServerEvent::CallEnded { .. } => "call-ended",
            ServerEvent::IceCandidate(_) => "ice-candidate",
            ServerEvent::Error { .. } => "error",
        }
    }
}
